//! Endian-switchable writer

use binrw::{BinWriterExt, Endian};
use std::io::{Seek, SeekFrom, Write};

use super::latin1_encode;
use crate::error::FormatResult;

/// Writer whose multi-byte values follow a byte order chosen at runtime
#[derive(Debug)]
pub struct EndianWriter<W> {
    inner: W,
    endian: Endian,
}

impl<W: Write + Seek> EndianWriter<W> {
    /// Create a writer with the given byte order
    pub fn new(inner: W, endian: Endian) -> Self {
        Self { inner, endian }
    }

    /// Current byte order
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Set the byte order of subsequent writes
    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    /// Borrow the underlying stream
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Unwrap the underlying stream
    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Write a `u8`
    pub fn write_u8(&mut self, value: u8) -> FormatResult<()> {
        Ok(self.inner.write_type(&value, self.endian)?)
    }

    /// Write a `u16`
    pub fn write_u16(&mut self, value: u16) -> FormatResult<()> {
        Ok(self.inner.write_type(&value, self.endian)?)
    }

    /// Write an `i16`
    pub fn write_i16(&mut self, value: i16) -> FormatResult<()> {
        Ok(self.inner.write_type(&value, self.endian)?)
    }

    /// Write a `u32`
    pub fn write_u32(&mut self, value: u32) -> FormatResult<()> {
        Ok(self.inner.write_type(&value, self.endian)?)
    }

    /// Write an `i32`
    pub fn write_i32(&mut self, value: i32) -> FormatResult<()> {
        Ok(self.inner.write_type(&value, self.endian)?)
    }

    /// Write a `u64`
    pub fn write_u64(&mut self, value: u64) -> FormatResult<()> {
        Ok(self.inner.write_type(&value, self.endian)?)
    }

    /// Write an `i64`
    pub fn write_i64(&mut self, value: i64) -> FormatResult<()> {
        Ok(self.inner.write_type(&value, self.endian)?)
    }

    /// Write an `f32`
    pub fn write_f32(&mut self, value: f32) -> FormatResult<()> {
        Ok(self.inner.write_type(&value, self.endian)?)
    }

    /// Write an `f64`
    pub fn write_f64(&mut self, value: f64) -> FormatResult<()> {
        Ok(self.inner.write_type(&value, self.endian)?)
    }

    /// Write raw bytes
    pub fn write_bytes(&mut self, data: &[u8]) -> FormatResult<()> {
        self.inner.write_all(data)?;
        Ok(())
    }

    /// Write `len` zero bytes
    pub fn write_zeros(&mut self, len: usize) -> FormatResult<()> {
        self.write_bytes(&vec![0u8; len])
    }

    /// Write a single-byte string into a `len`-byte field, zero padded
    pub fn write_fixed_string(&mut self, value: &str, len: usize) -> FormatResult<()> {
        let mut field = latin1_encode(value)?;
        field.resize(len, 0);
        self.write_bytes(&field)
    }

    /// Write a single-byte string followed by a NUL
    pub fn write_null_terminated_string(&mut self, value: &str) -> FormatResult<()> {
        self.write_null_terminated_bytes(&latin1_encode(value)?)
    }

    /// Write raw string bytes followed by a NUL
    pub fn write_null_terminated_bytes(&mut self, value: &[u8]) -> FormatResult<()> {
        self.write_bytes(value)?;
        self.write_u8(0)
    }

    /// Write a string into a field of `len` UTF-16 code units, zero padded
    pub fn write_utf16_string(&mut self, value: &str, len: usize) -> FormatResult<()> {
        let units: Vec<u16> = value.encode_utf16().take(len).collect();
        for &unit in &units {
            self.write_u16(unit)?;
        }
        self.write_zeros(2 * (len - units.len()))
    }

    /// Write UTF-16 code units followed by a NUL unit
    pub fn write_null_terminated_utf16_string(&mut self, value: &str) -> FormatResult<()> {
        for unit in value.encode_utf16() {
            self.write_u16(unit)?;
        }
        self.write_u16(0)
    }

    /// Pad with zeros up to the next multiple of `alignment`
    pub fn align(&mut self, alignment: u64) -> FormatResult<()> {
        let position = self.position()?;
        let padding = position.next_multiple_of(alignment) - position;
        self.write_zeros(padding as usize)
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

    /// Move forward `len` bytes, leaving space to be filled later
    pub fn skip(&mut self, len: u64) -> FormatResult<u64> {
        self.seek_relative(len as i64)
    }
}
