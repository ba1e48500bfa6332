use crate::mpegts::crc32_mpeg2;

/// CRC verdict for a PSI section.
///
/// A section that spans a packet boundary cannot be checked from a single
/// payload; it is `Indeterminate`, never `Invalid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrcStatus {
    Valid,
    Invalid,
    Indeterminate,
}

/// Outcome of checking a section against its CRC32 trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionCrc {
    pub status: CrcStatus,
    /// CRC computed over the section body (trailer excluded).
    pub calculated: Option<u32>,
    /// Trailer value as found in the stream.
    pub expected: Option<u32>,
}

impl SectionCrc {
    pub fn is_invalid(&self) -> bool {
        self.status == CrcStatus::Invalid
    }
}

/// PSI section header slice, shared by the PAT and PMT parsers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PsiSection<'a> {
    pub table_id: u8,
    pub section_length: usize,
    /// Section bytes starting at `table_id`; may be shorter than the
    /// declared section when it continues in the next packet.
    pub data: &'a [u8],
}

impl<'a> PsiSection<'a> {
    /// Skips the pointer field and decodes the 3-byte section header.
    pub fn parse(payload: &'a [u8]) -> Option<PsiSection<'a>> {
        let pointer = *payload.first()? as usize;
        let data = payload.get(1 + pointer..)?;
        if data.len() < 3 {
            return None;
        }

        let section_length = ((data[1] as usize & 0x0F) << 8) | data[2] as usize;
        Some(PsiSection {
            table_id: data[0],
            section_length,
            data,
        })
    }

    /// Total section size: 3 header bytes plus `section_length`, CRC
    /// trailer included.
    pub fn total_len(&self) -> usize {
        3 + self.section_length
    }

    /// Last byte index (exclusive) of the payload loop, i.e. the start of
    /// the CRC trailer, clamped to what is actually buffered.
    pub fn loop_end(&self) -> usize {
        self.total_len().saturating_sub(4).min(self.data.len())
    }

    /// Validates the trailer when the whole section is buffered; a split
    /// section reports `Indeterminate`.
    pub fn check_crc(&self) -> SectionCrc {
        let total = self.total_len();
        if self.section_length < 4 || self.data.len() < total {
            return SectionCrc {
                status: CrcStatus::Indeterminate,
                calculated: None,
                expected: None,
            };
        }

        let section = &self.data[..total];
        let calculated = crc32_mpeg2(&section[..total - 4]);
        let expected = u32::from_be_bytes([
            section[total - 4],
            section[total - 3],
            section[total - 2],
            section[total - 1],
        ]);

        let status = if crc32_mpeg2(section) == 0 {
            CrcStatus::Valid
        } else {
            CrcStatus::Invalid
        };

        SectionCrc {
            status,
            calculated: Some(calculated),
            expected: Some(expected),
        }
    }
}
