//! Endian-switchable reader

use binrw::{BinReaderExt, Endian};
use std::io::{Read, Seek, SeekFrom};

use super::latin1_decode;
use crate::error::FormatResult;

/// Reader whose multi-byte values follow a byte order chosen at runtime
///
/// Strings are never byte swapped. There are no bounds checks beyond those of
/// the underlying stream: reading past the end is an I/O error.
#[derive(Debug)]
pub struct EndianReader<R> {
    inner: R,
    endian: Endian,
}

impl<R: Read + Seek> EndianReader<R> {
    /// Create a reader with the given byte order
    pub fn new(inner: R, endian: Endian) -> Self {
        Self { inner, endian }
    }

    /// Current byte order
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Set the byte order of subsequent reads
    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    /// Switch between little- and big-endian
    pub fn flip_endian(&mut self) {
        self.endian = match self.endian {
            Endian::Little => Endian::Big,
            Endian::Big => Endian::Little,
        };
    }

    /// Borrow the underlying stream
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Unwrap the underlying stream
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Read a `u8`
    pub fn read_u8(&mut self) -> FormatResult<u8> {
        Ok(self.inner.read_type(self.endian)?)
    }

    /// Read a `u16`
    pub fn read_u16(&mut self) -> FormatResult<u16> {
        Ok(self.inner.read_type(self.endian)?)
    }

    /// Read an `i16`
    pub fn read_i16(&mut self) -> FormatResult<i16> {
        Ok(self.inner.read_type(self.endian)?)
    }

    /// Read a `u32`
    pub fn read_u32(&mut self) -> FormatResult<u32> {
        Ok(self.inner.read_type(self.endian)?)
    }

    /// Read an `i32`
    pub fn read_i32(&mut self) -> FormatResult<i32> {
        Ok(self.inner.read_type(self.endian)?)
    }

    /// Read a `u64`
    pub fn read_u64(&mut self) -> FormatResult<u64> {
        Ok(self.inner.read_type(self.endian)?)
    }

    /// Read an `i64`
    pub fn read_i64(&mut self) -> FormatResult<i64> {
        Ok(self.inner.read_type(self.endian)?)
    }

    /// Read an `f32`
    pub fn read_f32(&mut self) -> FormatResult<f32> {
        Ok(self.inner.read_type(self.endian)?)
    }

    /// Read an `f64`
    pub fn read_f64(&mut self) -> FormatResult<f64> {
        Ok(self.inner.read_type(self.endian)?)
    }

    /// Read exactly `len` raw bytes
    pub fn read_bytes(&mut self, len: usize) -> FormatResult<Vec<u8>> {
        let mut data = vec![0u8; len];
        self.inner.read_exact(&mut data)?;
        Ok(data)
    }

    /// Read a `len`-byte field, returning the bytes before the first NUL
    ///
    /// The whole field is consumed either way.
    pub fn read_fixed_bytes(&mut self, len: usize) -> FormatResult<Vec<u8>> {
        let mut data = self.read_bytes(len)?;
        if let Some(end) = data.iter().position(|&b| b == 0) {
            data.truncate(end);
        }
        Ok(data)
    }

    /// Read a `len`-byte single-byte string field
    pub fn read_fixed_string(&mut self, len: usize) -> FormatResult<String> {
        Ok(latin1_decode(&self.read_fixed_bytes(len)?))
    }

    /// Read a single-byte string up to and including its NUL terminator
    pub fn read_null_terminated_string(&mut self) -> FormatResult<String> {
        let mut data = Vec::new();
        loop {
            match self.read_u8()? {
                0 => break,
                byte => data.push(byte),
            }
        }
        Ok(latin1_decode(&data))
    }

    /// Read a field of `len` UTF-16 code units, stopping at the first NUL
    pub fn read_utf16_string(&mut self, len: usize) -> FormatResult<String> {
        let mut units = Vec::with_capacity(len);
        let mut consumed = 0;
        while consumed < len {
            let unit = self.read_u16()?;
            consumed += 1;
            if unit == 0 {
                break;
            }
            units.push(unit);
        }
        self.skip(2 * (len - consumed) as u64)?;
        Ok(String::from_utf16_lossy(&units))
    }

    /// Read UTF-16 code units up to and including a NUL unit
    pub fn read_null_terminated_utf16_string(&mut self) -> FormatResult<String> {
        let mut units = Vec::new();
        loop {
            match self.read_u16()? {
                0 => break,
                unit => units.push(unit),
            }
        }
        Ok(String::from_utf16_lossy(&units))
    }

    /// Current absolute position
    pub fn position(&mut self) -> FormatResult<u64> {
        Ok(self.inner.stream_position()?)
    }

    /// Seek to an absolute position
    pub fn seek_to(&mut self, position: u64) -> FormatResult<u64> {
        Ok(self.inner.seek(SeekFrom::Start(position))?)
    }

    /// Seek relative to the current position
    pub fn seek_relative(&mut self, delta: i64) -> FormatResult<u64> {
        Ok(self.inner.seek(SeekFrom::Current(delta))?)
    }

    /// Move forward `len` bytes without reading them
    pub fn skip(&mut self, len: u64) -> FormatResult<u64> {
        self.seek_relative(len as i64)
    }
}
