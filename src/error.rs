/// Analyzer error.
///
/// Only resource-level failures surface here. Protocol damage found in the
/// stream itself (sync loss, CRC mismatches, continuity gaps) is counted by
/// the conformance analyzer and never aborts a scan.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scan worker terminated unexpectedly")]
    WorkerLost,
}
