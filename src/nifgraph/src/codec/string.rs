use crate::error::{NifError, Result};

/// Decodes 8-bit code units into a string.
///
/// Every byte maps to the code point of the same value, so no input is
/// rejected and [`encode`] reproduces the original bytes.
pub fn decode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Encodes a string into 8-bit code units.
///
/// Fails for characters above `U+00FF`, which have no single-byte
/// representation.
pub fn encode(s: &str) -> Result<Vec<u8>> {
    s.chars()
        .map(|c| {
            u8::try_from(u32::from(c)).map_err(|_| {
                NifError::encoding(format!("character {c:?} in {s:?} is not representable"))
            })
        })
        .collect()
}

/// Decodes a string of raw bytes, replacing control characters for
/// display in error messages.
pub(crate) fn printable(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if (32..127).contains(&b) { b as char } else { '.' })
        .collect()
}
