//! Endian-aware binary stream shared by every archive codec
//!
//! Fox Engine archives are little-endian on PC and big-endian on the
//! Xbox 360 and PS3. Some headers are read in one byte order, inspected, and
//! the rest of the stream is read in the other, so the byte order is a
//! runtime property of the reader and writer rather than of the types read.
//!
//! Single-byte strings are treated as Latin-1: every byte maps to the char
//! with the same value, so stored names survive a read/write cycle unchanged.

mod reader;
mod writer;

use crate::error::{FormatError, FormatResult};

pub use reader::EndianReader;
pub use writer::EndianWriter;

/// Decode single-byte text, one char per byte
pub fn latin1_decode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Encode text one byte per char
///
/// Fails on chars above U+00FF, which have no single-byte form.
pub fn latin1_encode(text: &str) -> FormatResult<Vec<u8>> {
    text.chars()
        .map(|c| {
            u8::try_from(c).map_err(|_| {
                FormatError::InvalidFormat(format!("{c:?} in {text:?} is not a single-byte char"))
            })
        })
        .collect()
}
