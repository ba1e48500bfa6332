use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};

use super::etr290::{Etr290Analyzer, Etr290Counters, Etr290Stats, SectionError};
use super::jitter::{analyze_pcr_samples, JitterAnalysis};
use super::pid_state::PidState;
use super::report;
use crate::error::Error;
use crate::mpegts::ts::{PatResult, PesHeader, PmtResult, TsPacket};
use crate::mpegts::{Pid, StreamType};

/// Cooperative cancellation handle shared between a scan and its owner.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Random-access supply of 188-byte packets.
pub trait PacketSource {
    /// Total size of the underlying stream in bytes.
    fn size_bytes(&self) -> u64;

    /// Reads the packet at the given index, `None` past the last whole
    /// packet. A trailing partial packet counts as end of stream.
    fn read_packet_at(&mut self, index: u64) -> Result<Option<[u8; TsPacket::SIZE]>, Error>;
}

/// Packet source backed by a seekable file.
#[derive(Debug)]
pub struct FileSource {
    file: File,
    size: u64,
}

impl FileSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(FileSource { file, size })
    }
}

impl PacketSource for FileSource {
    fn size_bytes(&self) -> u64 {
        self.size
    }

    fn read_packet_at(&mut self, index: u64) -> Result<Option<[u8; TsPacket::SIZE]>, Error> {
        let offset = index * TsPacket::SIZE as u64;
        if offset + TsPacket::SIZE as u64 > self.size {
            return Ok(None);
        }
        let mut raw = [0u8; TsPacket::SIZE];
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(&mut raw)?;
        Ok(Some(raw))
    }
}

/// Packet source over an in-memory byte buffer.
#[derive(Debug)]
pub struct MemorySource {
    data: Vec<u8>,
}

impl MemorySource {
    pub fn new(data: Vec<u8>) -> Self {
        MemorySource { data }
    }
}

impl PacketSource for MemorySource {
    fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_packet_at(&mut self, index: u64) -> Result<Option<[u8; TsPacket::SIZE]>, Error> {
        let offset = index as usize * TsPacket::SIZE;
        let Some(slice) = self.data.get(offset..offset + TsPacket::SIZE) else {
            return Ok(None);
        };
        let mut raw = [0u8; TsPacket::SIZE];
        raw.copy_from_slice(slice);
        Ok(Some(raw))
    }
}

/// One elementary stream inside a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEntry {
    pub stream_type: StreamType,
    pub description: String,
}

/// A program from the PAT with the detail its PMT filled in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgramEntry {
    pub pmt_pid: Pid,
    pub pcr_pid: Option<Pid>,
    pub streams: BTreeMap<Pid, StreamEntry>,
}

/// Knobs for a scan run.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Stop after this many packets; the stream up to there still counts
    /// as a completed analysis.
    pub max_packets: Option<u64>,
    pub cancel: CancelToken,
}

/// Everything one pass over a stream produced.
#[derive(Debug)]
pub struct TsAnalysis {
    /// False when the scan was cancelled before the end of the stream.
    pub completed: bool,
    pub packet_count: u64,
    pub file_size: u64,
    pub duration_secs: f64,
    /// Display label of the source, usually the file path.
    pub source: String,

    pub programs: BTreeMap<u16, ProgramEntry>,
    pub pid_stats: BTreeMap<Pid, PidState>,
    pub counters: Etr290Counters,
    pub stats: Etr290Stats,
    pub jitter: BTreeMap<Pid, JitterAnalysis>,

    /// Rendered report, one line per entry.
    pub report: Vec<String>,
}

impl TsAnalysis {
    /// Overall stream bitrate over the PCR-derived duration, bits per
    /// second. `None` when the stream carried no usable PCRs.
    pub fn bitrate(&self) -> Option<f64> {
        (self.duration_secs > 0.0).then(|| {
            self.packet_count as f64 * (TsPacket::SIZE * 8) as f64 / self.duration_secs
        })
    }
}

/// Scans a file from disk. See [`scan`].
pub fn scan_file<P: AsRef<Path>>(path: P, options: ScanOptions) -> Result<TsAnalysis, Error> {
    let label = path.as_ref().display().to_string();
    let source = FileSource::open(path)?;
    scan(source, &label, options)
}

/// Runs the full analysis pass over a packet source.
///
/// Protocol damage (bad sync bytes, CRC failures, continuity breaks) is
/// counted in the result, never returned as `Err`. A read failure mid-scan
/// ends the pass with `completed == false`; the statistics gathered up to
/// that point are still returned.
pub fn scan<S: PacketSource>(
    mut source: S,
    label: &str,
    options: ScanOptions,
) -> Result<TsAnalysis, Error> {
    let file_size = source.size_bytes();
    info!("scanning {label} ({file_size} bytes)");

    let mut etr = Etr290Analyzer::new();
    let mut programs: BTreeMap<u16, ProgramEntry> = BTreeMap::new();
    let mut pid_stats: BTreeMap<Pid, PidState> = BTreeMap::new();

    let mut index = 0u64;
    let mut completed = false;

    loop {
        if options.cancel.is_cancelled() {
            warn!("scan of {label} cancelled after {index} packets");
            break;
        }
        if options.max_packets.is_some_and(|max| index >= max) {
            completed = true;
            break;
        }
        // A mid-scan read failure stops the pass and leaves it marked
        // incomplete; only opening the source is fatal to the caller.
        let raw = match source.read_packet_at(index) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                completed = true;
                break;
            }
            Err(err) => {
                warn!("read failed at packet {index}: {err}");
                break;
            }
        };

        if !etr.process_packet(index, &raw) {
            index += 1;
            continue;
        }

        let packet = TsPacket::parse(&raw);
        let header = &packet.header;
        let pid = header.pid;
        let offset = index * TsPacket::SIZE as u64;

        let state = pid_stats.entry(pid).or_default();
        state.packets += 1;
        state.note_arrival(offset);
        if header.transport_scrambling_control.is_scrambled() {
            state.note_scrambled();
        }
        let has_payload = header.adaptation_field_control.has_payload();
        if !pid.is_null() && state.note_continuity(header.continuity_counter, has_payload) {
            etr.note_continuity_error();
        }
        if let Some(pcr) = packet.adaptation_field.as_ref().and_then(|af| af.pcr) {
            state.note_pcr(offset, pcr.as_secs_f64());
        }

        let pusi = header.payload_unit_start_indicator;
        if pid == Pid::PAT && pusi && !packet.payload.is_empty() {
            handle_pat(&mut etr, &mut programs, packet.payload);
        } else if pusi && !packet.payload.is_empty() {
            if let Some(program) = programs.values_mut().find(|p| p.pmt_pid == pid) {
                handle_pmt(&mut etr, program, packet.payload);
            } else if let Some(pes) = PesHeader::parse(packet.payload) {
                let state = pid_stats.entry(pid).or_default();
                state.note_pes_len(pes.packet_len);
                if let Some(pts) = pes.pts {
                    state.note_pts(pts.as_secs_f64());
                }
            }
        }

        index += 1;
    }

    // Duration from the earliest and latest PCR seen on any PID.
    let first_pcr = pid_stats
        .values()
        .filter_map(|s| s.pcr_samples.first().map(|&(_, t)| t))
        .fold(f64::MAX, f64::min);
    let last_pcr = pid_stats
        .values()
        .filter_map(|s| s.pcr_samples.last().map(|&(_, t)| t))
        .fold(f64::MIN, f64::max);
    let duration_secs = if last_pcr > first_pcr {
        last_pcr - first_pcr
    } else {
        0.0
    };

    let mut jitter = BTreeMap::new();
    if completed {
        etr.finalize(duration_secs, file_size);
        for (&pid, state) in &pid_stats {
            if let Some(analysis) = analyze_pcr_samples(&state.pcr_samples) {
                if analysis.is_meaningful() && analysis.exceeds_accuracy_limit() {
                    etr.counters.pcr_accuracy_error = 1;
                }
                jitter.insert(pid, analysis);
            }
        }
    }

    let mut analysis = TsAnalysis {
        completed,
        packet_count: index,
        file_size,
        duration_secs,
        source: label.to_string(),
        programs,
        pid_stats,
        counters: etr.counters,
        stats: etr.stats,
        jitter,
        report: Vec::new(),
    };
    analysis.report = report::render(&analysis);

    info!(
        "scan of {label} done: {} packets, {} programs, {} priority-1 errors",
        analysis.packet_count,
        analysis.programs.len(),
        analysis.counters.priority1_total()
    );
    Ok(analysis)
}

fn handle_pat(
    etr: &mut Etr290Analyzer,
    programs: &mut BTreeMap<u16, ProgramEntry>,
    payload: &[u8],
) {
    let Some(pat) = PatResult::parse(payload) else {
        return;
    };
    if !pat.valid_table_id {
        etr.report_section_error(Pid::PAT, SectionError::TableId);
        return;
    }
    if pat.crc.is_invalid() {
        warn!("PAT section failed its CRC check");
        etr.report_section_error(Pid::PAT, SectionError::Crc);
        return;
    }
    for assoc in &pat.table {
        let entry = programs.entry(assoc.program_num).or_insert_with(|| {
            debug!(
                "program {} announced on PMT PID {:?}",
                assoc.program_num, assoc.program_map_pid
            );
            ProgramEntry {
                pmt_pid: assoc.program_map_pid,
                ..ProgramEntry::default()
            }
        });
        if entry.pmt_pid != assoc.program_map_pid {
            // Remap invalidates everything learned from the old PMT.
            *entry = ProgramEntry {
                pmt_pid: assoc.program_map_pid,
                ..ProgramEntry::default()
            };
        }
        etr.register_pmt_pid(assoc.program_map_pid);
    }
}

fn handle_pmt(etr: &mut Etr290Analyzer, program: &mut ProgramEntry, payload: &[u8]) {
    let Some(pmt) = PmtResult::parse(payload) else {
        return;
    };
    let pid = program.pmt_pid;
    if !pmt.valid_table_id {
        etr.report_section_error(pid, SectionError::TableId);
        return;
    }
    if pmt.crc.is_invalid() {
        warn!("PMT section on {pid:?} failed its CRC check");
        etr.report_section_error(pid, SectionError::Crc);
        return;
    }
    program.pcr_pid = pmt.pcr_pid;
    for es in &pmt.es_info {
        program.streams.entry(es.elementary_pid).or_insert_with(|| {
            debug!(
                "stream {} on {:?} ({})",
                pmt.program_num, es.elementary_pid, es.stream_type
            );
            StreamEntry {
                stream_type: es.stream_type,
                description: es.stream_type.to_string(),
            }
        });
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn file_source_reports_end_of_stream() {
        let mut source = MemorySource::new(vec![0x47; TsPacket::SIZE * 2 + 10]);
        assert!(source.read_packet_at(0).unwrap().is_some());
        assert!(source.read_packet_at(1).unwrap().is_some());
        // Trailing partial packet is end of stream.
        assert!(source.read_packet_at(2).unwrap().is_none());
    }

    #[test]
    fn empty_program_entry_points_nowhere() {
        let entry = ProgramEntry::default();
        assert!(entry.pmt_pid.is_null());
        assert_eq!(entry.pcr_pid, None);
        assert!(entry.streams.is_empty());
    }

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
