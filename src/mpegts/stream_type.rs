use std::fmt;

/// Elementary stream type from the PMT stream loop (ISO/IEC 13818-1).
///
/// Only the codes the report cares about get a named variant; everything
/// else is carried through as `Unknown` so the hierarchy still renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamType {
    Reserved,
    Mpeg1Video,
    Mpeg2Video,
    Mpeg1Audio,
    Mpeg2Audio,
    PrivateData,
    AdtsAac,
    H264,
    H265,
    Ac3,
    Unknown(u8),
}

impl StreamType {
    pub fn from_u8(n: u8) -> Self {
        match n {
            0x00 => StreamType::Reserved,
            0x01 => StreamType::Mpeg1Video,
            0x02 => StreamType::Mpeg2Video,
            0x03 => StreamType::Mpeg1Audio,
            0x04 => StreamType::Mpeg2Audio,
            0x06 => StreamType::PrivateData,
            0x0F => StreamType::AdtsAac,
            0x1B => StreamType::H264,
            0x24 => StreamType::H265,
            0x81 => StreamType::Ac3,
            v => StreamType::Unknown(v),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            StreamType::Reserved => 0x00,
            StreamType::Mpeg1Video => 0x01,
            StreamType::Mpeg2Video => 0x02,
            StreamType::Mpeg1Audio => 0x03,
            StreamType::Mpeg2Audio => 0x04,
            StreamType::PrivateData => 0x06,
            StreamType::AdtsAac => 0x0F,
            StreamType::H264 => 0x1B,
            StreamType::H265 => 0x24,
            StreamType::Ac3 => 0x81,
            StreamType::Unknown(v) => *v,
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(
            self,
            StreamType::Mpeg1Video | StreamType::Mpeg2Video | StreamType::H264 | StreamType::H265
        )
    }

    pub fn is_audio(&self) -> bool {
        matches!(
            self,
            StreamType::Mpeg1Audio | StreamType::Mpeg2Audio | StreamType::AdtsAac | StreamType::Ac3
        )
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StreamType::Reserved => f.write_str("Reserved"),
            StreamType::Mpeg1Video => f.write_str("MPEG-1 Video"),
            StreamType::Mpeg2Video => f.write_str("MPEG-2 Video"),
            StreamType::Mpeg1Audio => f.write_str("MPEG-1 Audio"),
            StreamType::Mpeg2Audio => f.write_str("MPEG-2 Audio"),
            StreamType::PrivateData => f.write_str("Private Data"),
            StreamType::AdtsAac => f.write_str("AAC Audio"),
            StreamType::H264 => f.write_str("H.264 (AVC)"),
            StreamType::H265 => f.write_str("H.265 (HEVC)"),
            StreamType::Ac3 => f.write_str("AC3 Audio"),
            StreamType::Unknown(v) => write!(f, "Unknown (0x{v:02X})"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for code in [0x00u8, 0x01, 0x02, 0x03, 0x04, 0x06, 0x0F, 0x1B, 0x24, 0x81, 0x42] {
            assert_eq!(StreamType::from_u8(code).as_u8(), code);
        }
    }

    #[test]
    fn descriptions() {
        assert_eq!(StreamType::H264.to_string(), "H.264 (AVC)");
        assert_eq!(StreamType::Unknown(0x42).to_string(), "Unknown (0x42)");
        assert!(StreamType::H265.is_video());
        assert!(StreamType::Ac3.is_audio());
        assert!(!StreamType::PrivateData.is_video());
    }
}
