// SPDX-License-Identifier: MIT

//! Table-driven CRC-32 (ISO-HDLC, reflected polynomial 0xEDB88320).
//!
//! This is the variant GPT mandates for its header and entry-array checksums.
//! The lookup table is evaluated at compile time and never mutated.

use crate::errors::*;

pub const CRC32_POLYNOMIAL: u32 = 0xEDB8_8320;
pub const CRC32_SEED: u32 = 0xFFFF_FFFF;

static TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ CRC32_POLYNOMIAL
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

#[inline(always)]
fn fold(mut crc: u32, bytes: &[u8]) -> u32 {
    for &b in bytes {
        crc = TABLE[((crc ^ b as u32) & 0xFF) as usize] ^ (crc >> 8);
    }
    crc
}

/// CRC-32 of a whole slice.
#[inline]
pub fn checksum(bytes: &[u8]) -> u32 {
    !fold(CRC32_SEED, bytes)
}

/// CRC-32 of `len` bytes starting at `offset`.
pub fn calculate(buf: &[u8], offset: usize, len: usize) -> PartResult<u32> {
    let end = offset
        .checked_add(len)
        .ok_or(PartError::IO(rawio::errors::BlockIOError::OutOfBounds))?;
    let bytes = buf
        .get(offset..end)
        .ok_or(PartError::IO(rawio::errors::BlockIOError::OutOfBounds))?;
    Ok(checksum(bytes))
}

/// Incremental hasher, for checksums assembled from several slices.
#[derive(Clone, Copy, Debug)]
pub struct Crc32 {
    state: u32,
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc32 {
    #[inline]
    pub fn new() -> Self {
        Self { state: CRC32_SEED }
    }

    #[inline]
    pub fn update(&mut self, bytes: &[u8]) {
        self.state = fold(self.state, bytes);
    }

    #[inline]
    pub fn finalize(self) -> u32 {
        !self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_value() {
        assert_eq!(checksum(b"123456789"), 0xCBF4_3926);
        assert_eq!(checksum(b""), 0);
    }

    #[test]
    fn range_inside_zeroed_header() {
        let mut buf = [0u8; 92];
        buf[40..49].copy_from_slice(b"123456789");
        assert_eq!(calculate(&buf, 40, 9).unwrap(), 0xCBF4_3926);
    }

    #[test]
    fn matches_crc32fast() {
        let data: Vec<u8> = (0..16_384u32).map(|i| (i * 7 + 3) as u8).collect();
        assert_eq!(checksum(&data), crc32fast::hash(&data));

        let mut h = Crc32::new();
        for part in data.chunks(1000) {
            h.update(part);
        }
        assert_eq!(h.finalize(), crc32fast::hash(&data));
    }

    #[test]
    fn out_of_bounds() {
        let buf = [0u8; 16];
        assert!(calculate(&buf, 8, 9).is_err());
        assert!(calculate(&buf, usize::MAX, 2).is_err());
        assert!(calculate(&buf, 16, 0).is_ok());
    }
}
