use std::io::{self, Cursor};

use binrw::{BinRead, Endian};

use super::string;
use crate::error::{NifError, Result};

macro_rules! impl_read_literal {
    ($($(#[$doc:meta])* $read_fn:ident() -> $ty:ty),* $(,)?) => {
        $(
            $(#[$doc])*
            #[inline]
            pub fn $read_fn(&mut self) -> Result<$ty> {
                self.read_literal::<$ty>(std::mem::size_of::<$ty>() as u64)
            }
        )*
    };
}

/// A fallible reader over an in-memory NIF byte stream.
///
/// Multi-byte quantities are read in the byte order set through
/// [`NifReader::set_endian`], which the header does exactly once.
#[derive(Clone, Debug)]
pub struct NifReader<'a> {
    inner: Cursor<&'a [u8]>,
    endian: Endian,
}

impl<'a> NifReader<'a> {
    /// Creates a new little-endian reader over `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            inner: Cursor::new(data),
            endian: Endian::Little,
        }
    }

    /// Gets the byte order of multi-byte reads.
    #[inline]
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Sets the byte order for all subsequent multi-byte reads.
    #[inline]
    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    /// Gets the current byte offset into the stream.
    #[inline]
    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    /// Gets the number of bytes that have not been consumed yet.
    #[inline]
    pub fn remaining(&self) -> u64 {
        (self.inner.get_ref().len() as u64).saturating_sub(self.position())
    }

    /// Fails with [`NifError::Truncated`] unless `n` more bytes are
    /// available.
    pub fn ensure(&self, n: u64) -> Result<()> {
        let remaining = self.remaining();
        if n <= remaining {
            Ok(())
        } else {
            Err(NifError::Truncated {
                offset: self.position(),
                needed: n,
                remaining,
            })
        }
    }

    /// Checks that `count` elements of `size` bytes each can still be
    /// read, before anything gets allocated for them.
    pub fn ensure_array(&self, count: usize, size: u64) -> Result<()> {
        self.ensure((count as u64).saturating_mul(size))
    }

    fn read_literal<T>(&mut self, size: u64) -> Result<T>
    where
        for<'b> T: BinRead<Args<'b> = ()>,
    {
        self.ensure(size)?;

        let offset = self.position();
        T::read_options(&mut self.inner, self.endian, ()).map_err(|e| match e {
            binrw::Error::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                NifError::Truncated {
                    offset,
                    needed: size,
                    remaining: 0,
                }
            }
            binrw::Error::Io(e) => NifError::Io(e),
            e => NifError::malformed(offset, e.to_string()),
        })
    }

    // fn $read_fn(&mut self) -> Result<$ty>
    impl_read_literal! {
        /// Reads a [`u8`] value.
        u8() -> u8,
        /// Reads an [`i8`] value.
        i8() -> i8,
        /// Reads a [`u16`] value.
        u16() -> u16,
        /// Reads an [`i16`] value.
        i16() -> i16,
        /// Reads a [`u32`] value.
        u32() -> u32,
        /// Reads an [`i32`] value.
        i32() -> i32,
        /// Reads a [`u64`] value.
        u64() -> u64,
        /// Reads an [`i64`] value.
        i64() -> i64,
        /// Reads an [`f32`] value.
        f32() -> f32,
        /// Reads an [`f64`] value.
        f64() -> f64,
    }

    /// Reads a half-precision float.
    pub fn f16(&mut self) -> Result<half::f16> {
        self.u16().map(half::f16::from_bits)
    }

    /// Reads a boolean stored in a single byte.
    pub fn bool8(&mut self) -> Result<bool> {
        self.u8().map(|b| b != 0)
    }

    /// Reads a boolean stored in 32 bits, as done by old file versions.
    pub fn bool32(&mut self) -> Result<bool> {
        self.u32().map(|b| b != 0)
    }

    /// Reads `n` raw bytes.
    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n as u64)?;

        let start = self.position() as usize;
        let data: &'a [u8] = *self.inner.get_ref();
        self.inner.set_position((start + n) as u64);

        Ok(&data[start..start + n])
    }

    /// Reads a string prefixed by its 32-bit length.
    pub fn sized_string(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        self.bytes(len).map(string::decode)
    }

    /// Reads a string prefixed by its 8-bit length, which counts a
    /// trailing NUL byte that is not part of the result.
    pub fn short_string(&mut self) -> Result<String> {
        let offset = self.position();
        let len = self.u8()? as usize;

        match self.bytes(len)? {
            [] => Ok(String::new()),
            [data @ .., 0] => Ok(string::decode(data)),
            _ => Err(NifError::malformed(offset, "short string is not NUL-terminated")),
        }
    }

    /// Reads a string of exactly `n` bytes.
    pub fn fixed_string(&mut self, n: usize) -> Result<String> {
        self.bytes(n).map(string::decode)
    }

    /// Reads raw bytes up to a newline character, which is consumed but
    /// not returned.
    ///
    /// Returns [`None`] when no newline occurs within `limit` bytes or
    /// before the end of the stream; nothing is consumed in that case.
    pub fn line(&mut self, limit: usize) -> Option<&'a [u8]> {
        let start = self.position() as usize;
        let data: &'a [u8] = *self.inner.get_ref();
        let window = &data[start.min(data.len())..];
        let window = &window[..window.len().min(limit)];

        let end = window.iter().position(|&b| b == b'\n')?;
        self.inner.set_position((start + end + 1) as u64);

        Some(&window[..end])
    }

    /// Gets up to `n` upcoming bytes without consuming them.
    pub fn peek(&self, n: usize) -> &'a [u8] {
        let data: &'a [u8] = *self.inner.get_ref();
        let start = (self.position() as usize).min(data.len());
        &data[start..data.len().min(start + n)]
    }
}
