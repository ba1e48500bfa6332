//! Transport stream analysis.
//!
//! A single synchronous pass over the packets of a stream feeds the
//! per-PID statistics, ETSI TR 101 290 error counters and PCR jitter
//! measurements, and is rendered into a text report at the end.

mod etr290;
mod jitter;
mod pid_state;
mod report;
mod scan;

pub use self::etr290::{
    Etr290Analyzer, Etr290Counters, Etr290Stats, IntervalMeasure, SectionError,
    PCR_ACCURACY_LIMIT_NS,
};
pub use self::jitter::{analyze_pcr_samples, JitterAnalysis};
pub use self::pid_state::{IntervalStats, PidState};
pub use self::scan::{
    scan, scan_file, CancelToken, FileSource, MemorySource, PacketSource, ProgramEntry,
    ScanOptions, StreamEntry, TsAnalysis,
};
