mod analysis;
mod error;
mod mpegts;

pub use analysis::{
    CancelToken, Etr290Analyzer, Etr290Counters, Etr290Stats, FileSource, IntervalMeasure,
    IntervalStats, JitterAnalysis, MemorySource, PCR_ACCURACY_LIMIT_NS, PacketSource, PidState,
    ProgramEntry, ScanOptions, SectionError, StreamEntry, TsAnalysis, analyze_pcr_samples, scan,
    scan_file,
};
pub use error::Error;
pub use mpegts::{
    Clock, ContinuityCounter, PCR, Pid, PtsDts, StreamType, Timestamp, crc32_mpeg2,
    ts::{
        AdaptationField, AdaptationFieldControl, CrcStatus, EsInfo, PatResult, PesHeader,
        PmtResult, ProgramAssociation, SectionCrc, StreamId, TransportScramblingControl, TsHeader,
        TsPacket, payload_offset,
    },
};
