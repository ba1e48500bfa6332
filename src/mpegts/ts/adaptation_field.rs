use bytes::Buf;

use crate::mpegts::timestamp::{Clock, PCR, Timestamp};

/// Adaptation field.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AdaptationField {
    pub length: u8,

    /// Set `true` if current TS packet is in a discontinuity state with
    /// respect to either the continuity counter or the program clock
    /// reference.
    pub discontinuity_indicator: bool,

    /// Set `true` when the stream may be decoded without errors from this
    /// point.
    pub random_access_indicator: bool,

    /// Set `true` when this stream should be considered "high priority".
    pub es_priority_indicator: bool,

    pub pcr_flag: bool,
    pub opcr_flag: bool,
    pub splicing_point_flag: bool,

    pub pcr: Option<Timestamp<Clock<PCR>>>,
    pub opcr: Option<Timestamp<Clock<PCR>>>,
}

impl AdaptationField {
    /// Decodes the adaptation field of a 188-byte packet.
    ///
    /// Returns `None` when the control bits say there is none. A zero
    /// `length` means the field carries nothing besides the length byte,
    /// so no flags are read even if later bytes would claim otherwise;
    /// PCR/OPCR fields are only read when the declared length actually
    /// covers them.
    pub fn parse(packet: &[u8], control: AdaptationFieldControl) -> Option<AdaptationField> {
        if !control.has_adaptation_field() || packet.len() < 5 {
            return None;
        }

        let length = packet[4];
        let mut field = AdaptationField {
            length,
            ..AdaptationField::default()
        };
        if length == 0 {
            return Some(field);
        }

        let end = (5 + length as usize).min(packet.len());
        let mut reader = &packet[5..end];
        if reader.remaining() < 1 {
            return Some(field);
        }

        let b = reader.get_u8();
        field.discontinuity_indicator = (b & 0b1000_0000) != 0;
        field.random_access_indicator = (b & 0b0100_0000) != 0;
        field.es_priority_indicator = (b & 0b0010_0000) != 0;
        field.pcr_flag = (b & 0b0001_0000) != 0;
        field.opcr_flag = (b & 0b0000_1000) != 0;
        field.splicing_point_flag = (b & 0b0000_0100) != 0;

        if field.pcr_flag && reader.remaining() >= 6 {
            field.pcr = Some(Timestamp::from_base_ext(reader.get_uint(6)));
        }
        if field.opcr_flag && reader.remaining() >= 6 {
            field.opcr = Some(Timestamp::from_base_ext(reader.get_uint(6)));
        }

        Some(field)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AdaptationFieldControl {
    Reserved,
    PayloadOnly,
    AdaptationFieldOnly,
    AdaptationFieldAndPayload,
}

impl AdaptationFieldControl {
    /// An adaptation field is present iff bit 1 of the control is set.
    pub fn has_adaptation_field(&self) -> bool {
        matches!(
            self,
            AdaptationFieldControl::AdaptationFieldOnly
                | AdaptationFieldControl::AdaptationFieldAndPayload
        )
    }

    /// A payload is present iff bit 0 of the control is set.
    pub fn has_payload(&self) -> bool {
        matches!(
            self,
            AdaptationFieldControl::PayloadOnly | AdaptationFieldControl::AdaptationFieldAndPayload
        )
    }

    pub fn from_u8(n: u8) -> Self {
        match n & 0b11 {
            0b00 => AdaptationFieldControl::Reserved,
            0b01 => AdaptationFieldControl::PayloadOnly,
            0b10 => AdaptationFieldControl::AdaptationFieldOnly,
            _ => AdaptationFieldControl::AdaptationFieldAndPayload,
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            AdaptationFieldControl::Reserved => 0b00,
            AdaptationFieldControl::PayloadOnly => 0b01,
            AdaptationFieldControl::AdaptationFieldOnly => 0b10,
            AdaptationFieldControl::AdaptationFieldAndPayload => 0b11,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn packet_with_af(af: &[u8]) -> [u8; 188] {
        let mut raw = [0xFFu8; 188];
        raw[..4].copy_from_slice(&[0x47, 0x01, 0x00, 0x30]);
        raw[4..4 + af.len()].copy_from_slice(af);
        raw
    }

    #[test]
    fn payload_only_control_has_no_field() {
        let raw = [0x47, 0x01, 0x00, 0x10];
        assert_eq!(
            AdaptationField::parse(&raw, AdaptationFieldControl::PayloadOnly),
            None
        );
    }

    #[test]
    fn zero_length_field_reads_no_flags() {
        // Flag-looking byte right after the length must be ignored.
        let raw = packet_with_af(&[0x00, 0xFF]);
        let field =
            AdaptationField::parse(&raw, AdaptationFieldControl::AdaptationFieldAndPayload)
                .unwrap();
        assert_eq!(field.length, 0);
        assert!(!field.pcr_flag);
        assert!(field.pcr.is_none());
    }

    #[test]
    fn pcr_is_decoded_when_length_covers_it() {
        // length 7: flags + 6 PCR bytes, base = 900, ext = 0.
        let base: u64 = 900;
        let wire = (base << 15).to_be_bytes();
        let mut af = vec![0x07, 0x10];
        af.extend_from_slice(&wire[2..8]);

        let raw = packet_with_af(&af);
        let field =
            AdaptationField::parse(&raw, AdaptationFieldControl::AdaptationFieldAndPayload)
                .unwrap();
        assert!(field.pcr_flag);
        assert_eq!(field.pcr.unwrap().as_u64(), base * 300);
    }

    #[test]
    fn pcr_flag_without_room_yields_no_pcr() {
        // Flag set but length 1 leaves no bytes for the PCR itself.
        let raw = packet_with_af(&[0x01, 0x10]);
        let field =
            AdaptationField::parse(&raw, AdaptationFieldControl::AdaptationFieldAndPayload)
                .unwrap();
        assert!(field.pcr_flag);
        assert!(field.pcr.is_none());
    }
}
