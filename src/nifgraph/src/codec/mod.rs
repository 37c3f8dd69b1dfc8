//! Encoding and decoding of the primitive values NIF data is built
//! from.
//!
//! Text is treated as 8-bit code units rather than UTF-8 because the
//! format predates any encoding conventions. See [`string`].

mod read;
pub use read::NifReader;

pub mod string;

mod write;
pub use write::NifWriter;
