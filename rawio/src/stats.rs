// SPDX-License-Identifier: MIT

use crate::{BlockIO, BlockIOResult};

/// Simple per-device counters.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct IoStats {
    pub reads: u64,
    pub read_bytes: u64,
    pub writes: u64,
    pub write_bytes: u64,
    pub flushes: u64,

    // Sector alignment of each request
    pub aligned_reads: u64,
    pub unaligned_reads: u64,
    pub aligned_writes: u64,
    pub unaligned_writes: u64,

    pub max_read: u64,
    pub max_write: u64,
}

impl IoStats {
    #[inline]
    pub fn reset(&mut self) {
        *self = IoStats::default();
    }
}

/// Transparent instrumentation wrapper.
///
/// Counts requests hitting the inner device, which is how transfer tests
/// check that data really moves chunk by chunk.
pub struct IOCounter<'a, IO: BlockIO + ?Sized> {
    inner: &'a mut IO,
    pub stats: IoStats,
    /// Alignment unit used to classify requests (typically the sector size).
    pub align: u64,
}

impl<'a, IO: BlockIO + ?Sized> IOCounter<'a, IO> {
    #[inline]
    pub fn new(inner: &'a mut IO) -> Self {
        Self {
            inner,
            stats: IoStats::default(),
            align: 1,
        }
    }

    #[inline]
    pub fn with_align(inner: &'a mut IO, align: u64) -> Self {
        let align = if align == 0 { 1 } else { align };
        Self {
            inner,
            stats: IoStats::default(),
            align,
        }
    }

    #[inline]
    pub fn snapshot(&self) -> IoStats {
        self.stats
    }

    #[inline]
    pub fn into_inner(self) -> &'a mut IO {
        self.inner
    }

    #[inline]
    fn is_aligned(&self, offset: u64, len: usize) -> bool {
        offset % self.align == 0 && len as u64 % self.align == 0
    }
}

impl<'a, IO: BlockIO + ?Sized> BlockIO for IOCounter<'a, IO> {
    #[inline]
    fn write_at(&mut self, offset: u64, data: &[u8]) -> BlockIOResult {
        if self.is_aligned(offset, data.len()) {
            self.stats.aligned_writes += 1;
        } else {
            self.stats.unaligned_writes += 1;
        }

        self.stats.writes += 1;
        self.stats.write_bytes += data.len() as u64;
        self.stats.max_write = self.stats.max_write.max(data.len() as u64);

        self.inner.write_at(offset, data)
    }

    #[inline]
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> BlockIOResult {
        if self.is_aligned(offset, buf.len()) {
            self.stats.aligned_reads += 1;
        } else {
            self.stats.unaligned_reads += 1;
        }

        self.stats.reads += 1;
        self.stats.read_bytes += buf.len() as u64;
        self.stats.max_read = self.stats.max_read.max(buf.len() as u64);

        self.inner.read_at(offset, buf)
    }

    #[inline]
    fn flush(&mut self) -> BlockIOResult {
        self.stats.flushes += 1;
        self.inner.flush()
    }

    #[inline]
    fn set_offset(&mut self, p: u64) -> u64 {
        self.inner.set_offset(p)
    }

    #[inline]
    fn partition_offset(&self) -> u64 {
        self.inner.partition_offset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;

    #[test]
    fn counts_and_alignment() {
        let mut buf = [0u8; 2048];
        let mut mem = MemBlockIO::new(&mut buf);
        let mut io = IOCounter::with_align(&mut mem, 512);

        io.write_at(0, &[1u8; 512]).unwrap();
        io.write_at(3, &[2u8; 10]).unwrap();
        io.read_at(512, &mut [0u8; 1024]).unwrap();
        io.flush().unwrap();

        let s = io.snapshot();
        assert_eq!(s.writes, 2);
        assert_eq!(s.write_bytes, 522);
        assert_eq!(s.aligned_writes, 1);
        assert_eq!(s.unaligned_writes, 1);
        assert_eq!(s.reads, 1);
        assert_eq!(s.max_read, 1024);
        assert_eq!(s.flushes, 1);

        io.stats.reset();
        assert_eq!(io.snapshot(), IoStats::default());
    }
}
