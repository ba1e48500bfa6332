use crate::mpegts::Pid;

use super::psi::{PsiSection, SectionCrc};

/// An entry of a program association table.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramAssociation {
    pub program_num: u16,

    /// The packet identifier that contains the associated PMT.
    pub program_map_pid: Pid,
}

/// Decoded PAT section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatResult {
    pub table_id: u8,
    pub valid_table_id: bool,
    pub crc: SectionCrc,
    pub table: Vec<ProgramAssociation>,
}

impl PatResult {
    pub const TABLE_ID: u8 = 0x00;

    /// Decodes a PAT from a packet payload (pointer field included).
    ///
    /// Returns `None` only on structural boundaries (no room for the
    /// section header). A wrong table id or a bad CRC still yields a
    /// result so the conformance analyzer can count it.
    pub fn parse(payload: &[u8]) -> Option<PatResult> {
        let section = PsiSection::parse(payload)?;
        if section.data.len() < 8 {
            return None;
        }

        let valid_table_id = section.table_id == Self::TABLE_ID;
        let crc = section.check_crc();

        let mut table = Vec::new();
        if valid_table_id {
            // 4-byte program entries from the end of the 8-byte section
            // header up to the CRC trailer.
            let end = section.loop_end();
            let mut i = 8;
            while i + 4 <= end {
                let entry = &section.data[i..i + 4];
                let program_num = u16::from_be_bytes([entry[0], entry[1]]);
                let program_map_pid =
                    Pid::new(((entry[2] as u16 & 0x1F) << 8) | entry[3] as u16);

                // Program 0 points at the NIT, not a PMT.
                if program_num != 0 {
                    table.push(ProgramAssociation {
                        program_num,
                        program_map_pid,
                    });
                }
                i += 4;
            }
        }

        Some(PatResult {
            table_id: section.table_id,
            valid_table_id,
            crc,
            table,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mpegts::crc32_mpeg2;
    use crate::mpegts::ts::psi::CrcStatus;

    fn pat_payload(entries: &[(u16, u16)]) -> Vec<u8> {
        let section_length = 5 + entries.len() * 4 + 4;
        let mut body = vec![
            0x00,
            0xB0 | ((section_length >> 8) as u8 & 0x0F),
            section_length as u8,
            0x00,
            0x01,
            0xC1,
            0x00,
            0x00,
        ];
        for (num, pid) in entries {
            body.extend_from_slice(&num.to_be_bytes());
            body.extend_from_slice(&(0xE000 | pid).to_be_bytes());
        }
        let crc = crc32_mpeg2(&body);
        body.extend_from_slice(&crc.to_be_bytes());

        let mut payload = vec![0x00];
        payload.extend_from_slice(&body);
        payload
    }

    #[test]
    fn programs_are_extracted() {
        let payload = pat_payload(&[(1, 0x100), (2, 0x200)]);
        let pat = PatResult::parse(&payload).unwrap();

        assert!(pat.valid_table_id);
        assert_eq!(pat.crc.status, CrcStatus::Valid);
        assert_eq!(pat.table.len(), 2);
        assert_eq!(pat.table[0].program_num, 1);
        assert_eq!(pat.table[0].program_map_pid.as_u16(), 0x100);
        assert_eq!(pat.table[1].program_map_pid.as_u16(), 0x200);
    }

    #[test]
    fn network_entry_is_skipped() {
        let payload = pat_payload(&[(0, 0x10), (7, 0x300)]);
        let pat = PatResult::parse(&payload).unwrap();
        assert_eq!(pat.table.len(), 1);
        assert_eq!(pat.table[0].program_num, 7);
    }

    #[test]
    fn wrong_table_id_is_reported_not_parsed() {
        let mut payload = pat_payload(&[(1, 0x100)]);
        payload[1] = 0x02;
        let pat = PatResult::parse(&payload).unwrap();
        assert!(!pat.valid_table_id);
        assert!(pat.table.is_empty());
    }

    #[test]
    fn corrupted_entry_fails_crc_but_still_parses() {
        let mut payload = pat_payload(&[(1, 0x100)]);
        payload[10] ^= 0x04;
        let pat = PatResult::parse(&payload).unwrap();
        assert_eq!(pat.crc.status, CrcStatus::Invalid);
        assert_eq!(pat.table.len(), 1);
    }
}
