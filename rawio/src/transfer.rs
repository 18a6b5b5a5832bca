// SPDX-License-Identifier: MIT

//! Chunked, cancellable byte-range transfer between a reader and a writer.
//!
//! The engine moves `total_size` bytes from a `Read + Seek` source to a
//! `Write + Seek` sink through a single buffer of `chunk_size` bytes owned by
//! the call. Short reads are accumulated until the chunk is full, the source
//! reports end of stream, or cancellation is observed. A progress report is
//! emitted after every chunk and once more when the call ends.

use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::errors::*;

/// Default transfer chunk (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Smallest accepted chunk: one 512-byte sector.
pub const MIN_CHUNK_SIZE: usize = 512;

/// Cooperative cancellation flag shared between a transfer and its controller.
///
/// Polled at every chunk boundary and between partial reads; a chunk write
/// already in flight is never interrupted.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Byte range moved by a single transfer call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransferRange {
    pub total_size: u64,
    pub source_offset: u64,
    pub dest_offset: u64,
}

impl TransferRange {
    pub fn new(total_size: u64) -> Self {
        Self {
            total_size,
            ..Default::default()
        }
    }

    pub fn with_source_offset(mut self, offset: u64) -> Self {
        self.source_offset = offset;
        self
    }

    pub fn with_dest_offset(mut self, offset: u64) -> Self {
        self.dest_offset = offset;
        self
    }
}

/// Snapshot handed to the progress callback.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TransferProgress {
    pub total_bytes: u64,
    pub completed_bytes: u64,
    pub remaining_bytes: u64,
    /// Progress of this call, 0..=100.
    pub percentage: f64,
    /// Progress of the overall job when several calls share one engine.
    pub total_percentage: f64,
    pub cancelled: bool,
    /// Set on the terminal report only.
    pub end: bool,
}

impl TransferProgress {
    fn new(total_bytes: u64) -> Self {
        Self {
            total_bytes,
            remaining_bytes: total_bytes,
            ..Default::default()
        }
    }

    /// True when the call ended because every byte was moved.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.completed_bytes == self.total_bytes
    }
}

#[inline]
fn percent(done: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        done as f64 * 100.0 / total as f64
    }
}

/// Chunked transfer engine.
///
/// One engine can drive several consecutive copies (disk, then partitions...)
/// and report a combined percentage through
/// [`TransferEngine::with_overall_job_size`].
#[derive(Clone, Debug)]
pub struct TransferEngine {
    chunk_size: usize,
    overall_job_size: Option<u64>,
    overall_completed: u64,
}

impl TransferEngine {
    pub fn new(chunk_size: usize) -> TransferResult<Self> {
        if chunk_size < MIN_CHUNK_SIZE {
            return Err(TransferError::InvalidConfig(
                "chunk size must be at least one 512-byte sector",
            ));
        }
        Ok(Self {
            chunk_size,
            overall_job_size: None,
            overall_completed: 0,
        })
    }

    pub fn with_overall_job_size(mut self, job_size: u64) -> Self {
        self.overall_job_size = Some(job_size);
        self
    }

    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Bytes moved by every call made through this engine so far.
    #[inline]
    pub fn overall_completed(&self) -> u64 {
        self.overall_completed
    }

    fn update(&self, progress: &mut TransferProgress) {
        progress.remaining_bytes = progress.total_bytes - progress.completed_bytes;
        progress.percentage = percent(progress.completed_bytes, progress.total_bytes);
        progress.total_percentage = match self.overall_job_size {
            Some(job) => percent(self.overall_completed, job).min(100.0),
            None => progress.percentage,
        };
    }

    /// Copies `range.total_size` bytes from `source` to `sink`.
    ///
    /// Returns the terminal progress report, which is also passed to
    /// `on_progress`. On cancellation the report carries the bytes actually
    /// moved with `cancelled` and `end` set; this is not an error.
    pub fn copy<R, W, F>(
        &mut self,
        source: &mut R,
        sink: &mut W,
        range: TransferRange,
        mut on_progress: F,
        cancel: &CancelToken,
    ) -> TransferResult<TransferProgress>
    where
        R: Read + Seek + ?Sized,
        W: Write + Seek + ?Sized,
        F: FnMut(&TransferProgress),
    {
        if range.total_size == 0 {
            return Err(TransferError::InvalidConfig("transfer size must be non-zero"));
        }

        if range.source_offset != 0 {
            source.seek(SeekFrom::Start(range.source_offset))?;
        }
        if range.dest_offset != 0 {
            sink.seek(SeekFrom::Start(range.dest_offset))?;
        }

        log::debug!(
            "transfer: {} bytes, src@{:#x} -> dst@{:#x}, chunk {}",
            range.total_size,
            range.source_offset,
            range.dest_offset,
            self.chunk_size
        );

        let buf_len = (self.chunk_size as u64).min(range.total_size) as usize;
        let mut buf = vec![0u8; buf_len];
        let mut progress = TransferProgress::new(range.total_size);

        loop {
            let remaining = range.total_size - progress.completed_bytes;
            if remaining == 0 {
                break;
            }
            if cancel.is_cancelled() {
                progress.cancelled = true;
                break;
            }

            let want = (buf_len as u64).min(remaining) as usize;
            let (got, interrupted) = fill_chunk(source, &mut buf[..want], cancel)?;

            write_chunk(sink, &buf[..got])?;
            progress.completed_bytes += got as u64;
            self.overall_completed += got as u64;
            self.update(&mut progress);

            log::trace!(
                "transfer: chunk {got}/{want} bytes, {}/{}",
                progress.completed_bytes,
                progress.total_bytes
            );

            if got > 0 {
                on_progress(&progress);
            }

            if interrupted {
                progress.cancelled = true;
                break;
            }
            if got < want {
                sink.flush()?;
                return Err(TransferError::ShortRead {
                    expected: want as u64,
                    actual: got as u64,
                });
            }
        }

        sink.flush()?;

        progress.end = true;
        self.update(&mut progress);
        on_progress(&progress);

        if progress.cancelled {
            log::debug!(
                "transfer: cancelled after {} of {} bytes",
                progress.completed_bytes,
                progress.total_bytes
            );
        } else {
            log::debug!("transfer: done, {} bytes", progress.completed_bytes);
        }

        Ok(progress)
    }
}

/// Reads until `buf` is full, the source is exhausted or cancellation is seen.
///
/// Returns the byte count and whether cancellation cut the chunk short.
fn fill_chunk<R: Read + ?Sized>(
    source: &mut R,
    buf: &mut [u8],
    cancel: &CancelToken,
) -> TransferResult<(usize, bool)> {
    let mut got = 0;
    while got < buf.len() {
        if got > 0 && cancel.is_cancelled() {
            return Ok((got, true));
        }
        match source.read(&mut buf[got..]) {
            Ok(0) => break,
            Ok(n) => got += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok((got, false))
}

fn write_chunk<W: Write + ?Sized>(sink: &mut W, data: &[u8]) -> TransferResult {
    let mut written = 0;
    while written < data.len() {
        match sink.write(&data[written..]) {
            Ok(0) => {
                return Err(TransferError::ShortWrite {
                    expected: data.len() as u64,
                    actual: written as u64,
                });
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// One-shot copy with a fresh engine.
pub fn copy_range<R, W, F>(
    source: &mut R,
    sink: &mut W,
    range: TransferRange,
    chunk_size: usize,
    on_progress: F,
    cancel: &CancelToken,
) -> TransferResult<TransferProgress>
where
    R: Read + Seek + ?Sized,
    W: Write + Seek + ?Sized,
    F: FnMut(&TransferProgress),
{
    TransferEngine::new(chunk_size)?.copy(source, sink, range, on_progress, cancel)
}
