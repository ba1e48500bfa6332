//! Markdown report rendering.
//!
//! Produces the analysis report as a list of lines so callers can print
//! it, write it to a file, or feed it to a pager without caring about
//! line endings.

use super::etr290::{IntervalMeasure, PCR_ACCURACY_LIMIT_NS};
use super::scan::TsAnalysis;
use crate::mpegts::Pid;

const SI_TABLES: [(Pid, &str); 7] = [
    (Pid::PAT, "PAT (Program Association Table)"),
    (Pid::CAT, "CAT (Conditional Access Table)"),
    (Pid::TSDT, "TSDT (TS Description Table)"),
    (Pid::NIT, "NIT (Network Information Table)"),
    (Pid::SDT, "SDT (Service Description Table)"),
    (Pid::EIT, "EIT (Event Information Table)"),
    (Pid::TDT, "TDT/TOT (Time Date Table)"),
];

/// Renders the full analysis report.
pub fn render(analysis: &TsAnalysis) -> Vec<String> {
    if analysis.packet_count == 0 {
        return vec!["No packets scanned.".to_string()];
    }

    let mut lines = Vec::new();
    header(analysis, &mut lines);
    psi_structure(analysis, &mut lines);
    pid_statistics(analysis, &mut lines);
    pcr_analysis(analysis, &mut lines);
    pts_analysis(analysis, &mut lines);
    etr290_report(analysis, &mut lines);
    lines
}

/// Human description of a PID, from the tables the scan discovered.
fn describe_pid(analysis: &TsAnalysis, pid: Pid) -> String {
    if pid == Pid::PAT {
        return "PAT".to_string();
    }
    if pid.is_null() {
        return "Null Packet".to_string();
    }
    if analysis.programs.values().any(|p| p.pmt_pid == pid) {
        return "PMT".to_string();
    }
    for program in analysis.programs.values() {
        if let Some(stream) = program.streams.get(&pid) {
            return stream.description.clone();
        }
    }
    for (si_pid, name) in SI_TABLES {
        if pid == si_pid {
            return name.to_string();
        }
    }
    "Unknown".to_string()
}

fn header(analysis: &TsAnalysis, lines: &mut Vec<String>) {
    lines.push("# MPEG2-TS Analysis Report".to_string());
    lines.push(format!("- **File**: {}", analysis.source));
    lines.push(format!("- **Total Packets**: {}", analysis.packet_count));
    lines.push(format!("- **File Size**: {} bytes", analysis.file_size));
    if !analysis.completed {
        lines.push("- **Note**: scan was interrupted; results cover a prefix of the stream".to_string());
    }

    if analysis.duration_secs > 0.0 {
        lines.push(format!(
            "- **Estimated Duration**: {:.2} sec",
            analysis.duration_secs
        ));
        if let Some(bps) = analysis.bitrate() {
            lines.push(format!("- **Overall Bitrate**: {:.2} Mbps", bps / 1_000_000.0));
        }

        let mut video_pkts = 0u64;
        let mut audio_pkts = 0u64;
        for program in analysis.programs.values() {
            for (pid, stream) in &program.streams {
                let count = analysis.pid_stats.get(pid).map_or(0, |s| s.packets);
                if stream.stream_type.is_video() {
                    video_pkts += count;
                }
                if stream.stream_type.is_audio() {
                    audio_pkts += count;
                }
            }
        }
        if video_pkts > 0 {
            lines.push(format!(
                "- **Video Packets**: {} ({:.1} pps)",
                video_pkts,
                video_pkts as f64 / analysis.duration_secs
            ));
        }
        if audio_pkts > 0 {
            lines.push(format!(
                "- **Audio Packets**: {} ({:.1} pps)",
                audio_pkts,
                audio_pkts as f64 / analysis.duration_secs
            ));
        }
    }
    lines.push(String::new());
}

fn psi_structure(analysis: &TsAnalysis, lines: &mut Vec<String>) {
    lines.push("## 1. PSI/SI Structure".to_string());

    let found: Vec<String> = SI_TABLES
        .iter()
        .filter_map(|&(pid, name)| {
            analysis
                .pid_stats
                .get(&pid)
                .map(|s| format!("- **{}**: Found ({} packets)", name, s.packets))
        })
        .collect();
    if !found.is_empty() {
        lines.push("### Detected Tables".to_string());
        lines.extend(found);
        lines.push(String::new());
    }

    lines.push("### PAT & Program Hierarchy".to_string());
    if analysis.pid_stats.contains_key(&Pid::PAT) && !analysis.programs.is_empty() {
        lines.push("- **PAT (PID 0x0000)**".to_string());
        for (&prog_num, program) in &analysis.programs {
            lines.push(format!("  - **Program {prog_num}**"));
            lines.push(format!("    - PMT PID: 0x{:04X}", program.pmt_pid.as_u16()));
            if let Some(pcr_pid) = program.pcr_pid {
                lines.push(format!("    - PCR PID: 0x{:04X}", pcr_pid.as_u16()));
            }
            if program.streams.is_empty() {
                lines.push("    - (No components found or PMT not parsed)".to_string());
            } else {
                for (&pid, stream) in &program.streams {
                    let role = if Some(pid) == program.pcr_pid {
                        " (PCR)"
                    } else {
                        ""
                    };
                    lines.push(format!(
                        "    - PID 0x{:04X}: {}{}",
                        pid.as_u16(),
                        stream.description,
                        role
                    ));
                }
            }
        }
    } else {
        lines.push("- **PAT not found** (Stream might be partial or invalid)".to_string());
    }
    lines.push(String::new());
}

fn pid_statistics(analysis: &TsAnalysis, lines: &mut Vec<String>) {
    lines.push("## 2. PID Statistics & Errors".to_string());
    lines.push(
        "| PID | Type | Count | Usage | Avg Intv (ms) | Avg PES Len | CC Err | Scrambled |"
            .to_string(),
    );
    lines.push("|:---:|:---|---:|---:|---:|---:|:---:|:---:|".to_string());

    let byte_rate = if analysis.duration_secs > 0.0 {
        analysis.file_size as f64 / analysis.duration_secs
    } else {
        0.0
    };

    let mut by_count: Vec<_> = analysis.pid_stats.iter().collect();
    by_count.sort_by(|a, b| b.1.packets.cmp(&a.1.packets).then(a.0.cmp(b.0)));

    for (&pid, state) in by_count {
        let percent = state.packets as f64 / analysis.packet_count as f64 * 100.0;

        let avg_intv = match state.arrival.avg() {
            Some(avg_bytes) if byte_rate > 0.0 => {
                format!("{:.2}", avg_bytes / byte_rate * 1000.0)
            }
            _ => "-".to_string(),
        };
        let pes_len = if state.pes_count > 0 {
            format!("{:.0}", state.pes_len_sum as f64 / state.pes_count as f64)
        } else {
            "-".to_string()
        };
        let cc = if state.continuity_errors > 0 {
            format!("**{}**", state.continuity_errors)
        } else {
            "0".to_string()
        };
        let scrambled = if state.scrambled_count > 0 { "Yes" } else { "No" };

        lines.push(format!(
            "| 0x{:04X} | {} | {} | {:.1}% | {} | {} | {} | {} |",
            pid.as_u16(),
            describe_pid(analysis, pid),
            state.packets,
            percent,
            avg_intv,
            pes_len,
            cc,
            scrambled
        ));
    }
    lines.push(String::new());
}

fn pcr_analysis(analysis: &TsAnalysis, lines: &mut Vec<String>) {
    lines.push("## 3. PCR Analysis (Timing)".to_string());
    let mut has_pcr = false;

    for (&pid, state) in &analysis.pid_stats {
        if state.pcr_samples.is_empty() {
            continue;
        }
        has_pcr = true;

        lines.push(format!("### PID 0x{:04X}", pid.as_u16()));
        lines.push(format!("- **Packet Count**: {}", state.pcr_samples.len()));

        if !state.pcr_intervals.is_empty() {
            let min = state.pcr_intervals.iter().cloned().fold(f64::MAX, f64::min) * 1000.0;
            let max = state.pcr_intervals.iter().cloned().fold(f64::MIN, f64::max) * 1000.0;
            let avg =
                state.pcr_intervals.iter().sum::<f64>() / state.pcr_intervals.len() as f64 * 1000.0;
            lines.push(format!(
                "- **Interval**: Min {min:.2}ms / Max {max:.2}ms / Avg {avg:.2}ms"
            ));
            if max > 40.0 {
                lines.push("  - Warning: Max Interval > 40ms (DVB recommended)".to_string());
            }
        }

        match analysis.jitter.get(&pid) {
            Some(jitter) if jitter.is_meaningful() => {
                lines.push(format!(
                    "- **Calculated Bitrate**: {:.4} Mbps",
                    jitter.bitrate / 1_000_000.0
                ));
                lines.push("- **Timing Jitter (PCR Accuracy)**:".to_string());
                lines.push(format!("  - Min: {:.0} ns", jitter.min_jitter_ns));
                lines.push(format!("  - Max: {:.0} ns", jitter.max_jitter_ns));
                if jitter.max_alignment_jitter_ns > 0.0 {
                    lines.push(format!(
                        "- **Alignment Jitter**: Max {:.0} ns",
                        jitter.max_alignment_jitter_ns
                    ));
                }
                if jitter.max_jitter_ns.abs() > PCR_ACCURACY_LIMIT_NS
                    || jitter.min_jitter_ns.abs() > PCR_ACCURACY_LIMIT_NS
                {
                    lines.push("  - **Fail**: Exceeds ISO limit (+/-500ns)".to_string());
                } else {
                    lines.push("  - **Pass**: Within ISO limit".to_string());
                }
            }
            _ => lines.push("- **Jitter**: Not enough samples.".to_string()),
        }
        lines.push(String::new());
    }

    if !has_pcr {
        lines.push("No PCR packets found.".to_string());
    }
}

fn pts_analysis(analysis: &TsAnalysis, lines: &mut Vec<String>) {
    lines.push("## 4. PTS Analysis (Presentation Timing)".to_string());
    let mut has_pts = false;

    for (&pid, state) in &analysis.pid_stats {
        if state.pts_intervals.is_empty() {
            continue;
        }
        has_pts = true;

        let avg_sec = state.pts_intervals.iter().sum::<f64>() / state.pts_intervals.len() as f64;
        let desc = describe_pid(analysis, pid);
        let is_video = analysis
            .programs
            .values()
            .filter_map(|p| p.streams.get(&pid))
            .any(|s| s.stream_type.is_video());

        lines.push(format!("* **PID 0x{:04X} ({})**", pid.as_u16(), desc));
        lines.push(format!("  - Count: {}", state.pts_intervals.len() + 1));
        lines.push(format!("  - Avg Interval: {:.2} ms", avg_sec * 1000.0));
        if is_video && avg_sec > 0.0 {
            lines.push(format!("  - **Estimated FPS**: {:.2}", 1.0 / avg_sec));
        }
    }

    if !has_pts {
        lines.push("No PTS found.".to_string());
    }
    lines.push(String::new());
}

fn etr290_report(analysis: &TsAnalysis, lines: &mut Vec<String>) {
    lines.push("## ETR-290 Analysis Report".to_string());

    let max_note = |measure: Option<IntervalMeasure>| match measure {
        Some(m) => format!(" (Max: {:.2}ms)", m.max_ms),
        None => String::new(),
    };
    let stat_for = |name: &str| -> Option<IntervalMeasure> {
        match name {
            "PAT_error" => analysis.stats.pat_interval,
            "PMT_error" => analysis.stats.pmt_interval,
            "PCR_repetition_error" => analysis.stats.pcr_interval,
            "PCR_discontinuity_error" => analysis.stats.pcr_discontinuity,
            "PTS_error" => analysis.stats.pts_interval,
            _ => None,
        }
    };

    lines.push("### Priority 1 (Critical)".to_string());
    for (name, count) in analysis.counters.priority1() {
        let status = if count == 0 {
            "OK".to_string()
        } else {
            format!("**{count} Errors**")
        };
        lines.push(format!("- **{}**: {}{}", name, status, max_note(stat_for(name))));
    }
    if analysis.counters.priority1_total() == 0 {
        lines.push("> **Result**: Stream is Decodable (No Priority 1 Errors)".to_string());
    } else {
        lines.push("> **Result**: Stream may have decoding issues.".to_string());
    }
    lines.push(String::new());

    lines.push("### Priority 2 (Recommended)".to_string());
    for (name, count) in analysis.counters.priority2() {
        let status = if count == 0 {
            "OK".to_string()
        } else {
            format!("**{count} Errors**")
        };
        lines.push(format!("- **{}**: {}{}", name, status, max_note(stat_for(name))));
    }
    lines.push(String::new());

    lines.push("### Detailed Measurement Statistics".to_string());
    lines.push("| Type | Min (ms) | Max (ms) | Avg (ms) | Note |".to_string());
    lines.push("|:---|---:|---:|---:|:---|".to_string());
    let rows = [
        ("PCR Interval", analysis.stats.pcr_interval),
        ("PCR Discont Check", analysis.stats.pcr_discontinuity),
        ("PTS Interval", analysis.stats.pts_interval),
        ("PAT Interval", analysis.stats.pat_interval),
        ("PMT Interval", analysis.stats.pmt_interval),
    ];
    for (label, measure) in rows {
        match measure {
            Some(m) => lines.push(format!(
                "| {} | {:.2} | {:.2} | {:.2} | - |",
                label, m.min_ms, m.max_ms, m.avg_ms
            )),
            None => lines.push(format!("| {label} | - | - | - | No Data |")),
        }
    }
}
