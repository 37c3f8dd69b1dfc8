use std::io::Cursor;

use binrw::{BinWrite, Endian};

use super::string;
use crate::error::{NifError, Result};

macro_rules! impl_write_literal {
    ($($(#[$doc:meta])* $write_fn:ident($ty:ty)),* $(,)?) => {
        $(
            $(#[$doc])*
            #[inline]
            pub fn $write_fn(&mut self, v: $ty) -> Result<()> {
                self.write_literal(&v)
            }
        )*
    };
}

/// A growable buffer that NIF data is serialized into.
///
/// Multi-byte quantities are written in the byte order the writer was
/// configured with.
#[derive(Clone, Debug)]
pub struct NifWriter {
    inner: Cursor<Vec<u8>>,
    endian: Endian,
}

impl Default for NifWriter {
    fn default() -> Self {
        Self::new(Endian::Little)
    }
}

impl NifWriter {
    /// Creates a new, empty writer for the given byte order.
    pub fn new(endian: Endian) -> Self {
        Self {
            inner: Cursor::new(Vec::new()),
            endian,
        }
    }

    /// Gets the byte order of multi-byte writes.
    #[inline]
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Sets the byte order for all subsequent multi-byte writes.
    #[inline]
    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    /// Returns the number of bytes written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.get_ref().len()
    }

    /// Indicates whether nothing was written yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.get_ref().is_empty()
    }

    /// Gets a view of the written bytes.
    #[inline]
    pub fn view(&self) -> &[u8] {
        self.inner.get_ref()
    }

    /// Consumes the writer and returns the written bytes.
    #[inline]
    pub fn into_vec(self) -> Vec<u8> {
        self.inner.into_inner()
    }

    fn write_literal<T>(&mut self, v: &T) -> Result<()>
    where
        for<'b> T: BinWrite<Args<'b> = ()>,
    {
        v.write_options(&mut self.inner, self.endian, ())
            .map_err(|e| match e {
                binrw::Error::Io(e) => NifError::Io(e),
                e => NifError::encoding(e.to_string()),
            })
    }

    // fn $write_fn(&mut self, v: $ty) -> Result<()>
    impl_write_literal! {
        /// Writes a [`u8`] value.
        u8(u8),
        /// Writes an [`i8`] value.
        i8(i8),
        /// Writes a [`u16`] value.
        u16(u16),
        /// Writes an [`i16`] value.
        i16(i16),
        /// Writes a [`u32`] value.
        u32(u32),
        /// Writes an [`i32`] value.
        i32(i32),
        /// Writes a [`u64`] value.
        u64(u64),
        /// Writes an [`i64`] value.
        i64(i64),
        /// Writes an [`f32`] value.
        f32(f32),
        /// Writes an [`f64`] value.
        f64(f64),
    }

    /// Writes a half-precision float.
    pub fn f16(&mut self, v: half::f16) -> Result<()> {
        self.u16(v.to_bits())
    }

    /// Writes a boolean as a single byte.
    pub fn bool8(&mut self, v: bool) -> Result<()> {
        self.u8(v as u8)
    }

    /// Writes a boolean in 32 bits, as done by old file versions.
    pub fn bool32(&mut self, v: bool) -> Result<()> {
        self.u32(v as u32)
    }

    /// Writes raw bytes.
    pub fn bytes(&mut self, buf: &[u8]) -> Result<()> {
        use std::io::Write;

        self.inner.write_all(buf).map_err(NifError::Io)
    }

    /// Writes a string prefixed by its 32-bit length.
    pub fn sized_string(&mut self, s: &str) -> Result<()> {
        let data = string::encode(s)?;
        let len = u32::try_from(data.len()).map_err(|_| {
            NifError::encoding(format!("string of {} bytes is too long", data.len()))
        })?;

        self.u32(len)?;
        self.bytes(&data)
    }

    /// Writes a string prefixed by its 8-bit length, followed by a NUL
    /// byte that is included in the length.
    pub fn short_string(&mut self, s: &str) -> Result<()> {
        let data = string::encode(s)?;
        let len = u8::try_from(data.len() + 1).map_err(|_| {
            NifError::encoding(format!("{s:?} does not fit into a short string"))
        })?;

        self.u8(len)?;
        self.bytes(&data)?;
        self.u8(0)
    }

    /// Writes a string that must encode to exactly `n` bytes.
    pub fn fixed_string(&mut self, s: &str, n: usize) -> Result<()> {
        let data = string::encode(s)?;
        if data.len() != n {
            return Err(NifError::encoding(format!(
                "{s:?} is {} bytes long, but the field holds exactly {n}",
                data.len()
            )));
        }

        self.bytes(&data)
    }

    /// Writes a line of text terminated by a newline character.
    pub fn line(&mut self, s: &str) -> Result<()> {
        if s.contains('\n') {
            return Err(NifError::encoding(format!("line {s:?} contains a newline")));
        }

        self.bytes(&string::encode(s)?)?;
        self.u8(b'\n')
    }
}
