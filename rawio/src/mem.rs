// SPDX-License-Identifier: MIT

use crate::{BlockIO, BlockIOError, BlockIOResult, BlockIOSetLen};

/// In-memory implementation of `BlockIO`.
///
/// Useful for tests, RAM-backed disks and partition-table buffers.
#[derive(Debug)]
pub struct MemBlockIO<'a> {
    buffer: &'a mut [u8],
    partition_offset: u64,
    logical_len: usize,
}

impl<'a> MemBlockIO<'a> {
    #[inline]
    pub fn new(buffer: &'a mut [u8]) -> Self {
        let logical_len = buffer.len();

        Self {
            buffer,
            logical_len,
            partition_offset: 0,
        }
    }

    #[inline]
    pub fn new_with_offset(buffer: &'a mut [u8], partition_offset: u64) -> Self {
        let logical_len = (buffer.len() as u64).saturating_sub(partition_offset) as usize;

        Self {
            buffer,
            logical_len,
            partition_offset,
        }
    }

    /// Logical size in bytes, counted from the partition offset.
    #[inline]
    pub fn len(&self) -> u64 {
        self.logical_len as u64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.logical_len == 0
    }

    #[inline]
    fn check_bounds(&self, abs_off: u64, len: usize) -> BlockIOResult {
        let end = abs_off
            .checked_add(len as u64)
            .ok_or(BlockIOError::OutOfBounds)?;
        let max = self
            .partition_offset
            .checked_add(self.logical_len as u64)
            .ok_or(BlockIOError::OutOfBounds)?
            .min(self.buffer.len() as u64);
        if end > max {
            return Err(BlockIOError::OutOfBounds);
        }
        Ok(())
    }
}

impl<'a> BlockIO for MemBlockIO<'a> {
    #[inline(always)]
    fn write_at(&mut self, offset: u64, data: &[u8]) -> BlockIOResult {
        let abs_offset = self
            .partition_offset
            .checked_add(offset)
            .ok_or(BlockIOError::OutOfBounds)?;
        self.check_bounds(abs_offset, data.len())?;
        let start = abs_offset as usize;
        self.buffer[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    #[inline(always)]
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> BlockIOResult {
        let abs_offset = self
            .partition_offset
            .checked_add(offset)
            .ok_or(BlockIOError::OutOfBounds)?;
        self.check_bounds(abs_offset, buf.len())?;
        let start = abs_offset as usize;
        buf.copy_from_slice(&self.buffer[start..start + buf.len()]);
        Ok(())
    }

    #[inline]
    fn flush(&mut self) -> BlockIOResult {
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

impl<'a> BlockIOSetLen for MemBlockIO<'a> {
    fn set_len(&mut self, new_len: u64) -> BlockIOResult {
        let end = self
            .partition_offset
            .checked_add(new_len)
            .ok_or(BlockIOError::OutOfBounds)?;
        if end > self.buffer.len() as u64 {
            return Err(BlockIOError::OutOfBounds);
        }
        self.logical_len = new_len as usize;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::prelude::*;

    #[test]
    fn test_rw() {
        let mut buf = [0u8; 256];
        let mut io = MemBlockIO::new(&mut buf);
        io.write_at(10, &[1, 2, 3, 4]).unwrap();

        let mut output = [0u8; 4];
        io.read_at(10, &mut output).unwrap();
        assert_eq!(output, [1, 2, 3, 4]);
    }

    #[test]
    fn test_out_of_bounds() {
        let mut buf = [0u8; 16];
        let mut io = MemBlockIO::new(&mut buf);
        assert_eq!(io.write_at(14, &[0; 4]), Err(BlockIOError::OutOfBounds));
        assert_eq!(io.read_at(u64::MAX, &mut [0; 1]), Err(BlockIOError::OutOfBounds));
    }

    #[test]
    fn test_set_len_safe() {
        let mut buf = [0u8; 512];
        let mut io = MemBlockIO::new(&mut buf);
        io.set_len(256).unwrap();
        assert_eq!(io.len(), 256);
        assert!(io.read_at(256, &mut [0u8; 1]).is_err());
        assert!(io.set_len(1024).is_err());
    }

    #[test]
    fn test_set_len_with_offset() {
        let mut buf = [0u8; 512];
        let mut io = MemBlockIO::new_with_offset(&mut buf, 128);
        assert_eq!(io.len(), 384);

        io.set_len(256).unwrap();
        assert_eq!(io.len(), 256);
        io.write_at(255, &[1]).unwrap();
        assert_eq!(io.read_at(256, &mut [0u8; 1]), Err(BlockIOError::OutOfBounds));
        assert_eq!(io.set_len(385), Err(BlockIOError::OutOfBounds));
        assert_eq!(io.len(), 256);
    }

    #[test]
    fn test_offset_window() {
        let mut buf = [0u8; 64];
        {
            let mut io = MemBlockIO::new_with_offset(&mut buf, 32);
            io.write_u32_at(0, 0xCAFEBABE).unwrap();
            assert_eq!(io.read_u32_at(0).unwrap(), 0xCAFEBABE);
        }
        assert_eq!(&buf[32..36], &[0xBE, 0xBA, 0xFE, 0xCA]);
    }

    #[test]
    fn test_zero_fill() {
        let mut buf = [0xFF; 64];
        let mut io = MemBlockIO::new(&mut buf);

        io.zero_fill(10, 8).unwrap();

        let mut output = [0xAA; 8];
        io.read_at(10, &mut output).unwrap();
        assert_eq!(output, [0u8; 8]);
    }
}
