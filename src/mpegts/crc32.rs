//! CRC32 as used by PSI sections (ISO/IEC 13818-1 Annex A).
//!
//! Polynomial 0x04C11DB7, MSB-first, initial register 0xFFFFFFFF, no final
//! XOR and no reflection. A section that includes its own 4-byte CRC
//! trailer checksums to zero.

const POLYNOMIAL: u32 = 0x04C1_1DB7;

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u32) << 24;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000_0000 != 0 {
                (crc << 1) ^ POLYNOMIAL
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

const TABLE: [u32; 256] = build_table();

/// Computes the MPEG-2 CRC32 over `data`.
pub fn crc32_mpeg2(data: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let index = ((crc >> 24) ^ u32::from(byte)) & 0xFF;
        crc = (crc << 8) ^ TABLE[index as usize];
    }
    crc
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_input_keeps_initial_register() {
        assert_eq!(crc32_mpeg2(&[]), 0xFFFF_FFFF);
    }

    #[test]
    fn section_with_own_trailer_checksums_to_zero() {
        let body = [0x00, 0xB0, 0x0D, 0x00, 0x01, 0xC1, 0x00, 0x00, 0x00, 0x01, 0xE1, 0x00];
        let crc = crc32_mpeg2(&body);

        let mut section = body.to_vec();
        section.extend_from_slice(&crc.to_be_bytes());
        assert_eq!(crc32_mpeg2(&section), 0);
    }

    #[test]
    fn single_bit_flip_changes_the_checksum() {
        let body = [0x02, 0xB0, 0x17, 0x00, 0x01, 0xC1, 0x00, 0x00];
        let crc = crc32_mpeg2(&body);

        let mut corrupted = body;
        corrupted[3] ^= 0x40;
        assert_ne!(crc32_mpeg2(&corrupted), crc);
    }
}
