// SPDX-License-Identifier: MIT

//! LBA-aware `BlockIO` helpers, so callers never multiply by the sector size by hand.

use rawio::errors::BlockIOError;
use rawio::prelude::*;

/// Offset = LBA * sector_size (with overflow-check)
#[inline]
fn lba_offset(lba: u64, sector_size: u64) -> BlockIOResult<u64> {
    lba.checked_mul(sector_size)
        .ok_or(BlockIOError::Other("lba_offset overflow"))
}

/// LBA-aligned read/write (buffer)
pub trait BlockIOLbaExt: BlockIO {
    /// Reads `buf.len()` bytes starting from an LBA (offset = lba * sector_size).
    #[inline]
    fn read_at_lba(&mut self, lba: u64, sector_size: u64, buf: &mut [u8]) -> BlockIOResult {
        let off = lba_offset(lba, sector_size)?;
        self.read_at(off, buf)
    }

    /// Writes `buf.len()` bytes starting from an LBA (offset = lba * sector_size).
    #[inline]
    fn write_at_lba(&mut self, lba: u64, sector_size: u64, data: &[u8]) -> BlockIOResult {
        let off = lba_offset(lba, sector_size)?;
        self.write_at(off, data)
    }

    /// Reads `count` whole sectors starting at `lba`.
    fn read_sectors(&mut self, lba: u64, sector_size: u64, count: u64) -> BlockIOResult<Vec<u8>> {
        let len = count
            .checked_mul(sector_size)
            .ok_or(BlockIOError::Other("sector count overflow"))?;
        let mut buf = vec![0u8; len as usize];
        self.read_at_lba(lba, sector_size, &mut buf)?;
        Ok(buf)
    }
}

impl<T: BlockIO + ?Sized> BlockIOLbaExt for T {}
