// SPDX-License-Identifier: MIT

#[macro_use]
mod macros;

// Core modules
pub mod bytes;
pub mod errors;
pub mod stats;
pub mod stream;
pub mod transfer;
pub mod utils;

// Backend modules
mod mem;
mod std;

// Prelude re-exports (central entrypoint)
pub mod prelude {
    pub use super::BlockIO;
    pub use super::BlockIOExt;
    pub use super::BlockIOSetLen;
    pub use super::errors::*;
    pub use super::stats::*;
    pub use super::stream::BlockIOStream;
    pub use super::transfer::{CancelToken, TransferEngine, TransferProgress, TransferRange};

    pub use super::mem::MemBlockIO;
    pub use super::std::StdBlockIO;
}

// Internal use
use errors::*;

// Constants

/// Size of the internal scratch buffer used by chunked helpers.
/// 4 KiB = typical page size and common disk sector/cluster size.
pub const BLOCK_BUF_SIZE: usize = 4096;

// Traits

/// Block IO abstraction trait.
///
/// Allows read/write/flush at arbitrary offsets.
/// Implementations may target RAM, image files, raw device nodes, etc.
pub trait BlockIO {
    /// Writes `data` at `offset` (absolute).
    fn write_at(&mut self, offset: u64, data: &[u8]) -> BlockIOResult;

    /// Reads `buf.len()` bytes into `buf` from `offset` (absolute).
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> BlockIOResult;
    /// Flushes any buffered data (may be a no-op).
    fn flush(&mut self) -> BlockIOResult;
    fn set_offset(&mut self, partition_offset: u64) -> u64;
    fn partition_offset(&self) -> u64;
}

/// Extension helpers for BlockIO.
///
/// Provides convenient helpers:
/// - chunked reads/writes
/// - zero fill
/// - little-endian primitive reads/writes (read_u16_at, write_u32_at, ...)
pub trait BlockIOExt: BlockIO {
    /// Reads `buf.len()` bytes from `offset` in chunks of `chunk_size` or less.
    #[inline(always)]
    fn read_in_chunks(&mut self, offset: u64, buf: &mut [u8], chunk_size: usize) -> BlockIOResult {
        let mut off = offset;
        for chunk in buf.chunks_mut(chunk_size.max(1)) {
            self.read_at(off, chunk)?;
            off += chunk.len() as u64;
        }
        Ok(())
    }

    /// Writes `buf.len()` bytes at `offset` in chunks of `chunk_size` or less.
    #[inline(always)]
    fn write_in_chunks(&mut self, offset: u64, buf: &[u8], chunk_size: usize) -> BlockIOResult {
        let mut off = offset;
        for chunk in buf.chunks(chunk_size.max(1)) {
            self.write_at(off, chunk)?;
            off += chunk.len() as u64;
        }
        Ok(())
    }

    /// Fills a region with zeroes.
    ///
    /// Used to wipe stale partition-table sectors before a restore.
    #[inline(always)]
    fn zero_fill(&mut self, offset: u64, len: usize) -> BlockIOResult {
        const ZERO_BUF: [u8; BLOCK_BUF_SIZE] = [0u8; BLOCK_BUF_SIZE];
        let mut remaining = len;
        let mut off = offset;
        while remaining > 0 {
            let chunk = remaining.min(ZERO_BUF.len());
            self.write_at(off, &ZERO_BUF[..chunk])?;
            off += chunk as u64;
            remaining -= chunk;
        }
        Ok(())
    }

    // Implements read/write helpers for primitive types (u16, u32, u64)
    blockio_impl_primitive_rw!(u16, u32, u64);
}

impl<T: BlockIO + ?Sized> BlockIOExt for T {}

/// Trait for setting the length of a BlockIO object.
///
/// Allows resizing the underlying storage (if supported by the backend).
pub trait BlockIOSetLen: BlockIO {
    /// Sets the length of the storage.
    fn set_len(&mut self, len: u64) -> BlockIOResult;
}
