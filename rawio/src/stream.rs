// SPDX-License-Identifier: MIT

use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::BlockIO;

/// Cursor-style `Read + Write + Seek` view over a `BlockIO` of known length.
///
/// Lets the transfer engine stream into and out of block devices. Reads stop
/// at `len` (EOF), writes past `len` return `Ok(0)`.
pub struct BlockIOStream<'a, IO: BlockIO + ?Sized> {
    io: &'a mut IO,
    pos: u64,
    len: u64,
}

impl<'a, IO: BlockIO + ?Sized> BlockIOStream<'a, IO> {
    pub fn new(io: &'a mut IO, len: u64) -> Self {
        Self { io, pos: 0, len }
    }

    #[inline]
    pub fn position(&self) -> u64 {
        self.pos
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    fn window(&self, want: usize) -> usize {
        self.len.saturating_sub(self.pos).min(want as u64) as usize
    }
}

impl<'a, IO: BlockIO + ?Sized> Read for BlockIOStream<'a, IO> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.window(buf.len());
        if n == 0 {
            return Ok(0);
        }
        self.io.read_at(self.pos, &mut buf[..n])?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl<'a, IO: BlockIO + ?Sized> Write for BlockIOStream<'a, IO> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.window(buf.len());
        if n == 0 {
            return Ok(0);
        }
        self.io.write_at(self.pos, &buf[..n])?;
        self.pos += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.io.flush()?;
        Ok(())
    }
}

impl<'a, IO: BlockIO + ?Sized> Seek for BlockIOStream<'a, IO> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(p) => Some(p),
            SeekFrom::End(d) => self.len.checked_add_signed(d),
            SeekFrom::Current(d) => self.pos.checked_add_signed(d),
        };
        match target {
            Some(p) => {
                self.pos = p;
                Ok(p)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )),
        }
    }
}
