use bytes::Buf;

use crate::mpegts::timestamp::{PtsDts, Timestamp};

/// PES packet start code prefix.
pub const PACKET_START_CODE_PREFIX: u32 = 0x00_0001;

/// PES stream identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(u8);

impl StreamId {
    pub const fn new(id: u8) -> Self {
        StreamId(id)
    }

    pub const fn as_u8(&self) -> u8 {
        self.0
    }

    /// Audio (0xC0..=0xDF), video (0xE0..=0xEF) and private-stream-1
    /// (0xBD) packets carry the optional PES header with PTS/DTS.
    pub const fn has_optional_header(&self) -> bool {
        matches!(self.0, 0xC0..=0xEF | 0xBD)
    }

    pub const fn is_video(&self) -> bool {
        matches!(self.0, 0xE0..=0xEF)
    }

    pub const fn is_audio(&self) -> bool {
        matches!(self.0, 0xC0..=0xDF)
    }
}

/// PES packet header.
///
/// Note that `PesHeader` contains the fields that belong to the optional
/// PES header.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PesHeader {
    pub stream_id: StreamId,

    /// Declared PES packet length; 0 means unbounded, which is legal for
    /// video streams.
    pub packet_len: u16,

    pub pts: Option<Timestamp<PtsDts>>,
    pub dts: Option<Timestamp<PtsDts>>,
}

impl PesHeader {
    /// Decodes a PES header from the start of a packet payload.
    ///
    /// Returns `None` when the 0x000001 start-code prefix is missing or
    /// the buffer is too short for the fields the flags announce;
    /// malformed units produce no data rather than an error.
    pub fn parse(payload: &[u8]) -> Option<PesHeader> {
        if payload.len() < 6 {
            return None;
        }

        let mut reader = payload;
        if reader.get_uint(3) as u32 != PACKET_START_CODE_PREFIX {
            return None;
        }

        let stream_id = StreamId::new(reader.get_u8());
        let packet_len = reader.get_u16();

        let mut header = PesHeader {
            stream_id,
            packet_len,
            pts: None,
            dts: None,
        };

        if !stream_id.has_optional_header() || payload.len() <= 9 {
            return Some(header);
        }

        let pts_dts_flags = (payload[7] >> 6) & 0b11;
        // payload[8] is pes_header_data_length; the timestamp fields are
        // bounds-checked directly instead.
        match pts_dts_flags {
            0b10 if payload.len() >= 14 => {
                header.pts = Some(Timestamp::from_encoded((&payload[9..14]).get_uint(5)));
            }
            0b11 if payload.len() >= 19 => {
                header.pts = Some(Timestamp::from_encoded((&payload[9..14]).get_uint(5)));
                header.dts = Some(Timestamp::from_encoded((&payload[14..19]).get_uint(5)));
            }
            _ => {}
        }

        Some(header)
    }
}

/// Encodes a 33-bit tick value into the 5-byte PTS/DTS wire form.
#[cfg(test)]
pub(crate) fn encode_pts(prefix: u8, ticks: u64) -> [u8; 5] {
    let n0 = (ticks >> 30) & 0b111;
    let n1 = (ticks >> 15) & 0x7FFF;
    let n2 = ticks & 0x7FFF;
    [
        (prefix << 4) | ((n0 as u8) << 1) | 1,
        (n1 >> 7) as u8,
        ((n1 as u8) << 1) | 1,
        (n2 >> 7) as u8,
        ((n2 as u8) << 1) | 1,
    ]
}

#[cfg(test)]
mod test {
    use super::*;

    fn pes_with_pts(ticks: u64) -> Vec<u8> {
        let mut payload = vec![0x00, 0x00, 0x01, 0xE0, 0x00, 0x00, 0x80, 0x80, 0x05];
        payload.extend_from_slice(&encode_pts(0b0010, ticks));
        payload
    }

    #[test]
    fn pts_only() {
        let header = PesHeader::parse(&pes_with_pts(900_000)).unwrap();
        assert_eq!(header.stream_id.as_u8(), 0xE0);
        assert!(header.stream_id.is_video());
        assert_eq!(header.pts.unwrap().as_u64(), 900_000);
        assert_eq!(header.dts, None);
    }

    #[test]
    fn pts_and_dts() {
        let mut payload = vec![0x00, 0x00, 0x01, 0xC0, 0x00, 0x00, 0x80, 0xC0, 0x0A];
        payload.extend_from_slice(&encode_pts(0b0011, 180_000));
        payload.extend_from_slice(&encode_pts(0b0001, 90_000));

        let header = PesHeader::parse(&payload).unwrap();
        assert!(header.stream_id.is_audio());
        assert_eq!(header.pts.unwrap().as_u64(), 180_000);
        assert_eq!(header.dts.unwrap().as_u64(), 90_000);
    }

    #[test]
    fn missing_start_code_is_none() {
        assert_eq!(PesHeader::parse(&[0x00, 0x00, 0x02, 0xE0, 0x00, 0x00]), None);
    }

    #[test]
    fn padding_stream_has_no_timestamps() {
        // 0xBE (padding stream) has no optional header.
        let payload = [0x00, 0x00, 0x01, 0xBE, 0x00, 0x10, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
        let header = PesHeader::parse(&payload).unwrap();
        assert_eq!(header.pts, None);
    }

    #[test]
    fn truncated_pts_field_is_dropped() {
        let mut payload = pes_with_pts(900_000);
        payload.truncate(12);
        let header = PesHeader::parse(&payload).unwrap();
        assert_eq!(header.pts, None);
    }
}
