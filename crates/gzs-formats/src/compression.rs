//! zlib compression of QAR payloads

use flate2::Compression;
use flate2::read::{ZlibDecoder, ZlibEncoder};
use std::io::Read;

use crate::error::{FormatError, FormatResult};

/// Compress `data` into a zlib stream
pub fn deflate(data: &[u8]) -> FormatResult<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(data, Compression::default());
    let mut compressed = Vec::new();
    encoder
        .read_to_end(&mut compressed)
        .map_err(|e| FormatError::Compression(format!("zlib compression failed: {e}")))?;
    Ok(compressed)
}

/// Decompress a zlib stream, reserving `size_hint` bytes up front
pub fn inflate(data: &[u8], size_hint: usize) -> FormatResult<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut decompressed = Vec::with_capacity(size_hint);
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| FormatError::Compression(format!("zlib decompression failed: {e}")))?;
    Ok(decompressed)
}
