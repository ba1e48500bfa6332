use bytes::Buf;

use crate::mpegts::{ContinuityCounter, Pid};

use super::adaptation_field::{AdaptationField, AdaptationFieldControl};

/// Transport scrambling control.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TransportScramblingControl {
    NotScrambled = 0b00,
    ScrambledWithEvenKey = 0b10,
    ScrambledWithOddKey = 0b11,
    Unknown(u8),
}

impl TransportScramblingControl {
    pub fn from_u8(n: u8) -> Self {
        match n {
            0b00 => TransportScramblingControl::NotScrambled,
            0b10 => TransportScramblingControl::ScrambledWithEvenKey,
            0b11 => TransportScramblingControl::ScrambledWithOddKey,
            v => TransportScramblingControl::Unknown(v),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            TransportScramblingControl::NotScrambled => 0b00,
            TransportScramblingControl::ScrambledWithEvenKey => 0b10,
            TransportScramblingControl::ScrambledWithOddKey => 0b11,
            TransportScramblingControl::Unknown(v) => v & 0b11,
        }
    }

    /// Any non-zero control value counts as scrambled.
    pub fn is_scrambled(&self) -> bool {
        self.as_u8() != 0
    }
}

/// Transport stream packet, decoded in place over the raw 188 bytes.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub struct TsPacket<'a> {
    pub header: TsHeader,
    pub adaptation_field: Option<AdaptationField>,
    pub payload: &'a [u8],
}

impl<'a> TsPacket<'a> {
    /// Size of a packet in bytes.
    pub const SIZE: usize = 188;

    /// Synchronization byte.
    ///
    /// Each packet starts with this byte.
    pub const SYNC_BYTE: u8 = 0x47;

    /// Decodes a full 188-byte packet. The payload slice is empty when the
    /// adaptation field control says there is none, or when the claimed
    /// adaptation field length pushes the payload past the packet end.
    pub fn parse(raw: &'a [u8]) -> TsPacket<'a> {
        debug_assert!(raw.len() == Self::SIZE);
        let header = TsHeader::parse(raw);
        let adaptation_field = AdaptationField::parse(raw, header.adaptation_field_control);

        let offset = payload_offset(raw);
        let payload = if header.adaptation_field_control.has_payload() && offset < raw.len() {
            &raw[offset..]
        } else {
            &[]
        };

        TsPacket {
            header,
            adaptation_field,
            payload,
        }
    }
}

/// TS packet header (the fixed first 4 bytes).
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TsHeader {
    pub sync_byte: u8,
    pub transport_error_indicator: bool,
    pub payload_unit_start_indicator: bool,
    pub transport_priority: bool,
    pub pid: Pid,
    pub transport_scrambling_control: TransportScramblingControl,
    pub adaptation_field_control: AdaptationFieldControl,
    pub continuity_counter: ContinuityCounter,
}

impl TsHeader {
    /// Pure bit-field extraction from the first 4 bytes. A wrong sync byte
    /// is recorded, not rejected; the conformance analyzer counts it.
    pub fn parse(packet: &[u8]) -> TsHeader {
        debug_assert!(packet.len() >= 4);
        let mut reader = packet;

        let sync_byte = reader.get_u8();

        let n = reader.get_u16();
        let transport_error_indicator = (n & 0b1000_0000_0000_0000) != 0;
        let payload_unit_start_indicator = (n & 0b0100_0000_0000_0000) != 0;
        let transport_priority = (n & 0b0010_0000_0000_0000) != 0;
        let pid = Pid::new(n & 0b0001_1111_1111_1111);

        let n = reader.get_u8();
        let transport_scrambling_control = TransportScramblingControl::from_u8(n >> 6);
        let adaptation_field_control = AdaptationFieldControl::from_u8((n >> 4) & 0b11);
        let continuity_counter = ContinuityCounter::from_u8(n & 0b1111);

        TsHeader {
            sync_byte,
            transport_error_indicator,
            payload_unit_start_indicator,
            transport_priority,
            pid,
            transport_scrambling_control,
            adaptation_field_control,
            continuity_counter,
        }
    }

    /// Re-encodes the fixed 4 header bytes.
    pub fn encode(&self) -> [u8; 4] {
        let mut n = self.pid.as_u16();
        if self.transport_error_indicator {
            n |= 0b1000_0000_0000_0000;
        }
        if self.payload_unit_start_indicator {
            n |= 0b0100_0000_0000_0000;
        }
        if self.transport_priority {
            n |= 0b0010_0000_0000_0000;
        }

        let b = (self.transport_scrambling_control.as_u8() << 6)
            | (self.adaptation_field_control.as_u8() << 4)
            | self.continuity_counter.as_u8();

        [self.sync_byte, (n >> 8) as u8, n as u8, b]
    }
}

/// Offset of the first payload byte: 4 for a bare header, `5 + length`
/// past an adaptation field. Values >= 188 mean the packet carries no
/// payload; that is a boundary, not an error.
pub fn payload_offset(packet: &[u8]) -> usize {
    debug_assert!(packet.len() >= 4);
    let control = AdaptationFieldControl::from_u8((packet[3] >> 4) & 0b11);
    if control.has_adaptation_field() {
        5 + packet.get(4).copied().unwrap_or(0) as usize
    } else {
        4
    }
}
