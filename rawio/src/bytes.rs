// SPDX-License-Identifier: MIT

//! Little-endian field codec over caller-owned byte buffers.
//!
//! Every accessor is bounds-checked: an `offset + len` past the end of the
//! buffer yields [`BlockIOError::OutOfBounds`] and leaves the buffer untouched.

use core::ops::Range;

use zerocopy::byteorder::{LittleEndian, U16, U32, U64};
use zerocopy::{FromBytes, IntoBytes};

use crate::errors::*;

#[inline]
fn span(buf_len: usize, offset: usize, len: usize) -> BlockIOResult<Range<usize>> {
    let end = offset.checked_add(len).ok_or(BlockIOError::OutOfBounds)?;
    if end > buf_len {
        return Err(BlockIOError::OutOfBounds);
    }
    Ok(offset..end)
}

#[inline]
pub fn read_u8(buf: &[u8], offset: usize) -> BlockIOResult<u8> {
    buf.get(offset).copied().ok_or(BlockIOError::OutOfBounds)
}

#[inline]
pub fn write_u8(buf: &mut [u8], offset: usize, value: u8) -> BlockIOResult {
    let slot = buf.get_mut(offset).ok_or(BlockIOError::OutOfBounds)?;
    *slot = value;
    Ok(())
}

bytes_impl_le!((u16, U16), (u32, U32), (u64, U64));

/// Borrows `len` bytes starting at `offset`.
#[inline]
pub fn read_bytes(buf: &[u8], offset: usize, len: usize) -> BlockIOResult<&[u8]> {
    let range = span(buf.len(), offset, len)?;
    Ok(&buf[range])
}

/// Copies a fixed-size array out of the buffer (GUIDs, signatures, CHS triples...).
#[inline]
pub fn read_array<const N: usize>(buf: &[u8], offset: usize) -> BlockIOResult<[u8; N]> {
    let range = span(buf.len(), offset, N)?;
    let mut out = [0u8; N];
    out.copy_from_slice(&buf[range]);
    Ok(out)
}

#[inline]
pub fn write_bytes(buf: &mut [u8], offset: usize, data: &[u8]) -> BlockIOResult {
    let range = span(buf.len(), offset, data.len())?;
    buf[range].copy_from_slice(data);
    Ok(())
}

/// Decodes a fixed-width UTF-16LE name field of `field_len` bytes.
///
/// Trailing NUL characters are trimmed; unpaired surrogates are replaced
/// with U+FFFD.
pub fn read_utf16_name(buf: &[u8], offset: usize, field_len: usize) -> BlockIOResult<String> {
    let field = read_bytes(buf, offset, field_len)?;
    let units: Vec<u16> = field
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let name = String::from_utf16_lossy(&units);
    Ok(name.trim_end_matches('\0').to_string())
}

/// Encodes `name` into a fixed-width UTF-16LE field of `field_len` bytes.
///
/// The field is NUL-padded. Names longer than `field_len / 2` code units are
/// truncated silently; a surrogate pair is never split. Returns the number of
/// code units stored, so callers can compare it against `name.encode_utf16().count()`.
pub fn write_utf16_name(
    buf: &mut [u8],
    offset: usize,
    field_len: usize,
    name: &str,
) -> BlockIOResult<usize> {
    let range = span(buf.len(), offset, field_len)?;
    let capacity = field_len / 2;

    let mut units: Vec<u16> = Vec::with_capacity(capacity);
    for ch in name.chars() {
        let mut tmp = [0u16; 2];
        let encoded = ch.encode_utf16(&mut tmp);
        if units.len() + encoded.len() > capacity {
            break;
        }
        units.extend_from_slice(encoded);
    }

    let field = &mut buf[range];
    field.fill(0);
    for (i, unit) in units.iter().enumerate() {
        field[i * 2..i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
    }
    Ok(units.len())
}
