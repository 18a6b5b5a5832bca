// SPDX-License-Identifier: MIT

use std::io::{Read, Seek, SeekFrom, Write};

use crate::{BlockIO, BlockIOError, BlockIOResult, BlockIOSetLen};

/// `BlockIO` over anything that is `Read + Write + Seek`: image files,
/// raw device nodes opened by the caller, `Cursor<Vec<u8>>`...
#[derive(Debug)]
pub struct StdBlockIO<'a, T: Read + Write + Seek> {
    io: &'a mut T,
    partition_offset: u64,
}

impl<'a, T: Read + Write + Seek> StdBlockIO<'a, T> {
    #[inline]
    pub fn new(io: &'a mut T) -> Self {
        Self {
            io,
            partition_offset: 0,
        }
    }

    #[inline]
    pub fn new_with_offset(io: &'a mut T, partition_offset: u64) -> Self {
        Self {
            io,
            partition_offset,
        }
    }

    #[inline]
    fn absolute(&self, offset: u64) -> BlockIOResult<u64> {
        self.partition_offset
            .checked_add(offset)
            .ok_or(BlockIOError::OutOfBounds)
    }
}

impl<'a, T: Read + Write + Seek> BlockIO for StdBlockIO<'a, T> {
    fn write_at(&mut self, offset: u64, data: &[u8]) -> BlockIOResult {
        let abs_offset = self.absolute(offset)?;
        self.io.seek(SeekFrom::Start(abs_offset))?;
        self.io.write_all(data)?;
        Ok(())
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> BlockIOResult {
        let abs_offset = self.absolute(offset)?;
        self.io.seek(SeekFrom::Start(abs_offset))?;
        self.io.read_exact(buf)?;
        Ok(())
    }

    fn flush(&mut self) -> BlockIOResult {
        self.io.flush()?;
        Ok(())
    }

    #[inline]
    fn set_offset(&mut self, partition_offset: u64) -> u64 {
        self.partition_offset = partition_offset;
        partition_offset
    }

    #[inline]
    fn partition_offset(&self) -> u64 {
        self.partition_offset
    }
}

impl<'a> BlockIOSetLen for StdBlockIO<'a, std::fs::File> {
    fn set_len(&mut self, len: u64) -> BlockIOResult {
        let end = self.absolute(len)?;
        self.io.set_len(end)?;
        self.flush()?;
        self.io.seek(SeekFrom::Start(0))?;
        Ok(())
    }
}
