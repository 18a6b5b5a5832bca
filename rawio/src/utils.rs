// SPDX-License-Identifier: MIT

use crate::prelude::*;

/// Range configuration for streamed comparisons.
#[derive(Clone, Copy, Debug)]
pub struct DiffRange {
    pub offset1: u64,
    pub offset2: u64,
    pub total_bytes: u64,
    pub chunk_size: usize,
}

impl DiffRange {
    /// A zero `chunk_size` is bumped to one byte.
    pub fn new(offset1: u64, offset2: u64, total_bytes: u64, chunk_size: usize) -> Self {
        Self {
            offset1,
            offset2,
            total_bytes,
            chunk_size: chunk_size.max(1),
        }
    }
}

impl Default for DiffRange {
    fn default() -> Self {
        Self {
            offset1: 0,
            offset2: 0,
            total_bytes: 0,
            chunk_size: crate::BLOCK_BUF_SIZE,
        }
    }
}

/// Walks both ranges chunk by chunk and stops at the first mismatching chunk.
pub fn compare_streamed_bytes<IO1, IO2>(
    io1: &mut IO1,
    io2: &mut IO2,
    range: DiffRange,
) -> BlockIOResult<bool>
where
    IO1: BlockIO + ?Sized,
    IO2: BlockIO + ?Sized,
{
    Ok(first_diff_bytes(io1, io2, range)?.is_none())
}

/// Returns `(relative_offset, left, right)` for the first differing byte.
pub fn first_diff_bytes<IO1, IO2>(
    io1: &mut IO1,
    io2: &mut IO2,
    range: DiffRange,
) -> BlockIOResult<Option<(u64, u8, u8)>>
where
    IO1: BlockIO + ?Sized,
    IO2: BlockIO + ?Sized,
{
    let DiffRange {
        offset1,
        offset2,
        total_bytes,
        chunk_size,
    } = range;
    let chunk_size = chunk_size.max(1);

    let mut buf1 = vec![0u8; chunk_size];
    let mut buf2 = vec![0u8; chunk_size];

    let mut done = 0u64;
    while done < total_bytes {
        let to_read = (total_bytes - done).min(chunk_size as u64) as usize;

        io1.read_at(offset1 + done, &mut buf1[..to_read])?;
        io2.read_at(offset2 + done, &mut buf2[..to_read])?;

        if let Some(i) = buf1[..to_read]
            .iter()
            .zip(&buf2[..to_read])
            .position(|(a, b)| a != b)
        {
            return Ok(Some((done + i as u64, buf1[i], buf2[i])));
        }

        done += to_read as u64;
    }

    Ok(None)
}
