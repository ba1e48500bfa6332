//! ETSI TR 101 290 conformance checks.
//!
//! Priority 1 covers errors that break decodability outright, priority 2
//! covers errors a decoder usually survives but a broadcaster should fix.
//! Interval checks collect event byte offsets during the scan and convert
//! them to timestamps in [`Etr290Analyzer::finalize`] once the overall
//! byte rate of the stream is known.

use std::collections::{HashMap, HashSet};

use crate::mpegts::ts::{payload_offset, TsPacket};
use crate::mpegts::Pid;

/// Maximum allowed gap between PAT sections, seconds.
pub const PAT_INTERVAL_LIMIT: f64 = 0.5;
/// Maximum allowed gap between PMT sections, seconds.
pub const PMT_INTERVAL_LIMIT: f64 = 0.5;
/// Maximum allowed gap between PCR values on a PID, seconds.
pub const PCR_REPETITION_LIMIT: f64 = 0.040;
/// A PCR gap beyond this without a signalled discontinuity is an error.
pub const PCR_DISCONTINUITY_LIMIT: f64 = 0.1;
/// Maximum allowed gap between PTS values on a PID, seconds.
pub const PTS_INTERVAL_LIMIT: f64 = 0.7;
/// PCR accuracy limit, nanoseconds.
pub const PCR_ACCURACY_LIMIT_NS: f64 = 500.0;

/// Error counters, one per TR 101 290 check.
///
/// `ts_sync_loss`, `pid_error` and `cat_error` stay at zero in a file
/// scan, which has no wall-clock arrival times to judge them by. They
/// are still part of the counter set so the report lists every check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Etr290Counters {
    // Priority 1
    pub ts_sync_loss: u64,
    pub sync_byte_error: u64,
    pub pat_error: u64,
    pub continuity_count_error: u64,
    pub pmt_error: u64,
    pub pid_error: u64,
    // Priority 2
    pub transport_error: u64,
    pub crc_error: u64,
    pub pcr_repetition_error: u64,
    pub pcr_discontinuity_error: u64,
    pub pcr_accuracy_error: u64,
    pub pts_error: u64,
    pub cat_error: u64,
}

impl Etr290Counters {
    pub fn priority1(&self) -> [(&'static str, u64); 6] {
        [
            ("TS_sync_loss", self.ts_sync_loss),
            ("Sync_byte_error", self.sync_byte_error),
            ("PAT_error", self.pat_error),
            ("Continuity_count_error", self.continuity_count_error),
            ("PMT_error", self.pmt_error),
            ("PID_error", self.pid_error),
        ]
    }

    pub fn priority2(&self) -> [(&'static str, u64); 7] {
        [
            ("Transport_error", self.transport_error),
            ("CRC_error", self.crc_error),
            ("PCR_repetition_error", self.pcr_repetition_error),
            ("PCR_discontinuity_error", self.pcr_discontinuity_error),
            ("PCR_accuracy_error", self.pcr_accuracy_error),
            ("PTS_error", self.pts_error),
            ("CAT_error", self.cat_error),
        ]
    }

    pub fn priority1_total(&self) -> u64 {
        self.priority1().iter().map(|(_, n)| n).sum()
    }

    pub fn priority2_total(&self) -> u64 {
        self.priority2().iter().map(|(_, n)| n).sum()
    }
}

/// Min/max/average of a measured repetition interval, milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IntervalMeasure {
    pub min_ms: f64,
    pub max_ms: f64,
    pub avg_ms: f64,
}

/// Measured repetition intervals, filled in by [`Etr290Analyzer::finalize`].
///
/// For the per-PID checks (PMT, PCR, PTS) the stored measure is the one
/// with the worst maximum across all carrying PIDs.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Etr290Stats {
    pub pat_interval: Option<IntervalMeasure>,
    pub pmt_interval: Option<IntervalMeasure>,
    pub pcr_interval: Option<IntervalMeasure>,
    pub pcr_discontinuity: Option<IntervalMeasure>,
    pub pts_interval: Option<IntervalMeasure>,
}

/// Kind of damage found in a PSI section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionError {
    /// CRC32 over the section did not check out.
    Crc,
    /// The section carried an unexpected table_id.
    TableId,
}

/// Accumulates TR 101 290 state over one pass of the stream.
#[derive(Debug, Default)]
pub struct Etr290Analyzer {
    pub counters: Etr290Counters,
    pub stats: Etr290Stats,

    pat_offsets: Vec<u64>,
    pmt_offsets: HashMap<Pid, Vec<u64>>,
    pcr_offsets: HashMap<Pid, Vec<u64>>,
    pts_offsets: HashMap<Pid, Vec<u64>>,
    pmt_pids: HashSet<Pid>,
}

impl Etr290Analyzer {
    pub fn new() -> Self {
        Etr290Analyzer::default()
    }

    /// Marks a PID as carrying a PMT, so its sections get the
    /// scrambling and repetition checks.
    pub fn register_pmt_pid(&mut self, pid: Pid) {
        self.pmt_pids.insert(pid);
    }

    /// Records a damaged PAT or PMT section found by the table parsers.
    pub fn report_section_error(&mut self, pid: Pid, error: SectionError) {
        match error {
            SectionError::Crc => self.counters.crc_error += 1,
            SectionError::TableId => {
                if pid == Pid::PAT {
                    self.counters.pat_error += 1;
                } else {
                    self.counters.pmt_error += 1;
                }
            }
        }
    }

    pub fn note_continuity_error(&mut self) {
        self.counters.continuity_count_error += 1;
    }

    /// Runs the per-packet checks on one raw 188-byte packet.
    ///
    /// Returns `false` when the sync byte is wrong; nothing else in the
    /// packet can be trusted in that case and the caller should skip it.
    pub fn process_packet(&mut self, index: u64, raw: &[u8]) -> bool {
        let offset = index * TsPacket::SIZE as u64;

        if raw[0] != TsPacket::SYNC_BYTE {
            self.counters.sync_byte_error += 1;
            return false;
        }

        let tei = raw[1] & 0x80 != 0;
        let pusi = raw[1] & 0x40 != 0;
        let pid = Pid::new(u16::from_be_bytes([raw[1], raw[2]]));
        let scrambling = (raw[3] >> 6) & 0b11;
        let afc = (raw[3] >> 4) & 0b11;

        if tei {
            self.counters.transport_error += 1;
        }

        if pid == Pid::PAT {
            if scrambling != 0 {
                self.counters.pat_error += 1;
            }
            if pusi {
                self.pat_offsets.push(offset);
            }
        } else if self.pmt_pids.contains(&pid) {
            if scrambling != 0 {
                self.counters.pmt_error += 1;
            }
            if pusi {
                self.pmt_offsets.entry(pid).or_default().push(offset);
            }
        }

        // PCR presence: adaptation field with a non-zero length and the
        // PCR flag set.
        if afc & 0b10 != 0 && raw[4] > 0 && raw[5] & 0x10 != 0 {
            self.pcr_offsets.entry(pid).or_default().push(offset);
        }

        // PTS presence: peek at the PES optional-header flags without a
        // full parse, enough room for the start code and flag bytes.
        if pusi && afc & 0b01 != 0 {
            let off = payload_offset(raw);
            if off + 9 <= raw.len()
                && raw[off] == 0x00
                && raw[off + 1] == 0x00
                && raw[off + 2] == 0x01
                && raw[off + 7] & 0x80 != 0
            {
                self.pts_offsets.entry(pid).or_default().push(offset);
            }
        }

        true
    }

    /// Converts the collected event offsets into interval measurements
    /// and violation counts, given the stream duration and size.
    pub fn finalize(&mut self, duration_secs: f64, file_size: u64) {
        if duration_secs <= 0.0 || file_size == 0 {
            return;
        }
        let byte_rate = file_size as f64 / duration_secs;

        let (violations, measure) =
            check_interval(&self.pat_offsets, byte_rate, PAT_INTERVAL_LIMIT);
        self.counters.pat_error += violations;
        self.stats.pat_interval = measure;

        for offsets in self.pmt_offsets.values() {
            let (violations, measure) = check_interval(offsets, byte_rate, PMT_INTERVAL_LIMIT);
            self.counters.pmt_error += violations;
            merge_worst(&mut self.stats.pmt_interval, measure);
        }

        for offsets in self.pcr_offsets.values() {
            let (violations, measure) =
                check_interval(offsets, byte_rate, PCR_REPETITION_LIMIT);
            self.counters.pcr_repetition_error += violations;
            merge_worst(&mut self.stats.pcr_interval, measure);

            let (violations, measure) =
                check_interval(offsets, byte_rate, PCR_DISCONTINUITY_LIMIT);
            self.counters.pcr_discontinuity_error += violations;
            merge_worst(&mut self.stats.pcr_discontinuity, measure);
        }

        for offsets in self.pts_offsets.values() {
            let (violations, measure) = check_interval(offsets, byte_rate, PTS_INTERVAL_LIMIT);
            self.counters.pts_error += violations;
            merge_worst(&mut self.stats.pts_interval, measure);
        }
    }
}

/// Keeps whichever measure has the larger maximum interval.
fn merge_worst(slot: &mut Option<IntervalMeasure>, candidate: Option<IntervalMeasure>) {
    if let Some(candidate) = candidate {
        match slot {
            Some(current) if current.max_ms >= candidate.max_ms => {}
            _ => *slot = Some(candidate),
        }
    }
}

/// Measures the gaps between consecutive event offsets, in stream time,
/// counting every gap above `limit_secs` as one violation.
///
/// Needs at least two events to produce anything.
fn check_interval(offsets: &[u64], byte_rate: f64, limit_secs: f64) -> (u64, Option<IntervalMeasure>) {
    if offsets.len() < 2 {
        return (0, None);
    }

    let mut violations = 0;
    let mut min = f64::MAX;
    let mut max: f64 = 0.0;
    let mut sum = 0.0;
    let mut count = 0u64;

    for pair in offsets.windows(2) {
        let gap = (pair[1] - pair[0]) as f64 / byte_rate;
        if gap > limit_secs {
            violations += 1;
        }
        min = min.min(gap);
        max = max.max(gap);
        sum += gap;
        count += 1;
    }

    let measure = IntervalMeasure {
        min_ms: min * 1000.0,
        max_ms: max * 1000.0,
        avg_ms: sum / count as f64 * 1000.0,
    };
    (violations, Some(measure))
}

#[cfg(test)]
mod test {
    use super::*;

    fn packet(pid: u16, pusi: bool) -> [u8; 188] {
        let mut raw = [0xFFu8; 188];
        raw[0] = 0x47;
        raw[1] = ((pid >> 8) as u8 & 0x1F) | if pusi { 0x40 } else { 0 };
        raw[2] = pid as u8;
        raw[3] = 0x10;
        raw
    }

    #[test]
    fn bad_sync_byte_stops_the_packet() {
        let mut etr = Etr290Analyzer::new();
        let mut raw = packet(0x100, false);
        raw[0] = 0x00;
        raw[1] |= 0x80;
        assert!(!etr.process_packet(0, &raw));
        assert!(!etr.process_packet(1, &raw));
        assert_eq!(etr.counters.sync_byte_error, 2);
        // Nothing else in a desynced packet is trusted.
        assert_eq!(etr.counters.transport_error, 0);
        assert_eq!(etr.counters.ts_sync_loss, 0);
    }

    #[test]
    fn transport_error_indicator_counted() {
        let mut etr = Etr290Analyzer::new();
        let mut raw = packet(0x100, false);
        raw[1] |= 0x80;
        assert!(etr.process_packet(0, &raw));
        assert_eq!(etr.counters.transport_error, 1);
    }

    #[test]
    fn scrambled_pat_is_a_pat_error() {
        let mut etr = Etr290Analyzer::new();
        let mut raw = packet(0, true);
        raw[3] |= 0x80;
        etr.process_packet(0, &raw);
        assert_eq!(etr.counters.pat_error, 1);
    }

    #[test]
    fn pat_interval_violations() {
        let mut etr = Etr290Analyzer::new();
        // One PAT every ~0.6s at 1 MB/s: every gap exceeds the 0.5s limit.
        let raw = packet(0, true);
        for offset in (0..=6_000_000u64).step_by(600_000) {
            etr.process_packet(offset / 188, &raw);
        }
        etr.finalize(6.0, 6_000_000);
        // 10 gaps of ~0.6s in stream time.
        assert_eq!(etr.counters.pat_error, 10);
        let measure = etr.stats.pat_interval.unwrap();
        assert!(measure.max_ms > 500.0);
    }

    #[test]
    fn pcr_flag_is_detected() {
        let mut etr = Etr290Analyzer::new();
        let mut raw = packet(0x100, false);
        raw[3] = 0x20; // adaptation field only
        raw[4] = 7;
        raw[5] = 0x10;
        etr.process_packet(0, &raw);
        etr.process_packet(100, &raw);
        etr.finalize(1.0, 188 * 101);
        assert!(etr.stats.pcr_interval.is_some());
    }

    #[test]
    fn two_events_minimum_for_intervals() {
        let (violations, measure) = check_interval(&[0], 1_000_000.0, 0.5);
        assert_eq!(violations, 0);
        assert_eq!(measure, None);
    }
}
