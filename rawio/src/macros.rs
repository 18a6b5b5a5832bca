// SPDX-License-Identifier: MIT

/// Automatically implements little-endian read/write helpers for primitive types on BlockIO
#[macro_export]
macro_rules! blockio_impl_primitive_rw {
    ($($ty:ty),+ $(,)?) => {
        $(
            paste::paste! {
                #[inline(always)]
                fn [<write_ $ty _at>](&mut self, offset: u64, value: $ty) -> BlockIOResult {
                    let buf = value.to_le_bytes();
                    self.write_at(offset, &buf)
                }

                #[inline(always)]
                fn [<read_ $ty _at>](&mut self, offset: u64) -> BlockIOResult<$ty> {
                    let mut buf = [0u8; core::mem::size_of::<$ty>()];
                    self.read_at(offset, &mut buf)?;
                    Ok(<$ty>::from_le_bytes(buf))
                }
            }
        )+
    };
}

/// Generates bounds-checked little-endian field accessors over byte buffers,
/// backed by zerocopy's unaligned byte-order wrappers.
macro_rules! bytes_impl_le {
    ($(($ty:ty, $wrapper:ident)),+ $(,)?) => {
        $(
            paste::paste! {
                #[doc = concat!("Reads a little-endian `", stringify!($ty), "` at `offset`.")]
                #[inline]
                pub fn [<read_ $ty _le>](buf: &[u8], offset: usize) -> BlockIOResult<$ty> {
                    let range = span(buf.len(), offset, core::mem::size_of::<$ty>())?;
                    let v = $wrapper::<LittleEndian>::read_from_bytes(&buf[range])
                        .map_err(|_| BlockIOError::OutOfBounds)?;
                    Ok(v.get())
                }

                #[doc = concat!("Writes `value` as a little-endian `", stringify!($ty), "` at `offset`.")]
                #[inline]
                pub fn [<write_ $ty _le>](buf: &mut [u8], offset: usize, value: $ty) -> BlockIOResult {
                    let range = span(buf.len(), offset, core::mem::size_of::<$ty>())?;
                    buf[range].copy_from_slice($wrapper::<LittleEndian>::new(value).as_bytes());
                    Ok(())
                }
            }
        )+
    };
}
