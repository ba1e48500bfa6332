use crate::mpegts::{Pid, StreamType};

use super::psi::{PsiSection, SectionCrc};

/// Elementary stream information from the PMT stream loop.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EsInfo {
    pub stream_type: StreamType,

    /// The packet identifier that carries this elementary stream.
    pub elementary_pid: Pid,
}

/// Decoded PMT section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PmtResult {
    pub table_id: u8,
    pub valid_table_id: bool,
    pub crc: SectionCrc,

    /// Program number from the section syntax (table id extension).
    pub program_num: u16,

    /// The packet identifier that contains the program clock reference,
    /// `None` when the program signals 0x1FFF (no PCR).
    pub pcr_pid: Option<Pid>,

    pub es_info: Vec<EsInfo>,
}

impl PmtResult {
    pub const TABLE_ID: u8 = 0x02;

    /// Decodes a PMT from a packet payload (pointer field included).
    ///
    /// Same contract as [`PatResult::parse`]: `None` only when the fixed
    /// 12-byte header does not fit; protocol violations are reported in
    /// the result instead.
    ///
    /// [`PatResult::parse`]: super::pat::PatResult::parse
    pub fn parse(payload: &[u8]) -> Option<PmtResult> {
        let section = PsiSection::parse(payload)?;
        if section.data.len() < 12 {
            return None;
        }

        let data = section.data;
        let valid_table_id = section.table_id == Self::TABLE_ID;
        let crc = section.check_crc();

        let program_num = u16::from_be_bytes([data[3], data[4]]);
        let pcr_pid = Pid::new(((data[8] as u16 & 0x1F) << 8) | data[9] as u16);
        let pcr_pid = (!pcr_pid.is_null()).then_some(pcr_pid);
        let program_info_len = ((data[10] as usize & 0x0F) << 8) | data[11] as usize;

        let mut es_info = Vec::new();
        if valid_table_id {
            let end = section.loop_end();
            let mut i = 12 + program_info_len;
            // stream_type(1) + elementary_pid(2) + es_info_length(2),
            // then the descriptor bytes we only skip over.
            while i + 5 <= end {
                let entry = &data[i..i + 5];
                let stream_type = StreamType::from_u8(entry[0]);
                let elementary_pid =
                    Pid::new(((entry[1] as u16 & 0x1F) << 8) | entry[2] as u16);
                let es_info_len = ((entry[3] as usize & 0x0F) << 8) | entry[4] as usize;

                es_info.push(EsInfo {
                    stream_type,
                    elementary_pid,
                });
                i += 5 + es_info_len;
            }
        }

        Some(PmtResult {
            table_id: section.table_id,
            valid_table_id,
            crc,
            program_num,
            pcr_pid,
            es_info,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mpegts::crc32_mpeg2;
    use crate::mpegts::ts::psi::CrcStatus;

    fn pmt_payload(program_num: u16, pcr_pid: u16, streams: &[(u8, u16)]) -> Vec<u8> {
        let section_length = 9 + streams.len() * 5 + 4;
        let mut body = vec![
            0x02,
            0xB0 | ((section_length >> 8) as u8 & 0x0F),
            section_length as u8,
        ];
        body.extend_from_slice(&program_num.to_be_bytes());
        body.extend_from_slice(&[0xC1, 0x00, 0x00]);
        body.extend_from_slice(&(0xE000 | pcr_pid).to_be_bytes());
        body.extend_from_slice(&[0xF0, 0x00]);
        for (stype, pid) in streams {
            body.push(*stype);
            body.extend_from_slice(&(0xE000 | pid).to_be_bytes());
            body.extend_from_slice(&[0xF0, 0x00]);
        }
        let crc = crc32_mpeg2(&body);
        body.extend_from_slice(&crc.to_be_bytes());

        let mut payload = vec![0x00];
        payload.extend_from_slice(&body);
        payload
    }

    #[test]
    fn streams_and_pcr_pid_are_extracted() {
        let payload = pmt_payload(1, 0x101, &[(0x1B, 0x101), (0x0F, 0x102)]);
        let pmt = PmtResult::parse(&payload).unwrap();

        assert!(pmt.valid_table_id);
        assert_eq!(pmt.crc.status, CrcStatus::Valid);
        assert_eq!(pmt.program_num, 1);
        assert_eq!(pmt.pcr_pid.unwrap().as_u16(), 0x101);
        assert_eq!(pmt.es_info.len(), 2);
        assert_eq!(pmt.es_info[0].stream_type, StreamType::H264);
        assert_eq!(pmt.es_info[1].elementary_pid.as_u16(), 0x102);
    }

    #[test]
    fn null_pcr_pid_maps_to_none() {
        let payload = pmt_payload(1, 0x1FFF, &[(0x1B, 0x101)]);
        let pmt = PmtResult::parse(&payload).unwrap();
        assert_eq!(pmt.pcr_pid, None);
    }

    #[test]
    fn wrong_table_id_skips_the_stream_loop() {
        let mut payload = pmt_payload(1, 0x101, &[(0x1B, 0x101)]);
        payload[1] = 0x00;
        let pmt = PmtResult::parse(&payload).unwrap();
        assert!(!pmt.valid_table_id);
        assert!(pmt.es_info.is_empty());
    }

    #[test]
    fn short_header_is_none() {
        assert_eq!(PmtResult::parse(&[0x00, 0x02, 0xB0, 0x17, 0x00]), None);
    }
}
