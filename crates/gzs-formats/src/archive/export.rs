//! Deferred per-entry data export

use parking_lot::Mutex;
use std::io::{Read, Seek};

use crate::error::FormatResult;
use crate::fpk::FpkEntry;
use crate::pftxs::PftxsFtexsFileEntry;
use crate::qar::QarEntry;

/// Non-fatal problem found while decoding an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeAnomaly {
    /// FPK content carried a cipher marker but decrypted to a non-zero
    /// terminator; the raw bytes were exported instead
    ContentCipherRejected {
        /// Leading marker byte of the entry
        marker: u8,
    },
}

/// Bytes of one exported entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedData {
    /// Decoded entry data
    pub data: Vec<u8>,
    /// Set when decoding fell back to raw bytes
    pub anomaly: Option<DecodeAnomaly>,
}

impl ExportedData {
    /// Cleanly decoded data
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            anomaly: None,
        }
    }

    /// Raw data kept after a decode anomaly
    pub fn with_anomaly(data: Vec<u8>, anomaly: DecodeAnomaly) -> Self {
        Self {
            data,
            anomaly: Some(anomaly),
        }
    }
}

/// Entry an exported file reads from
#[derive(Debug, Clone, Copy)]
pub enum EntryRef<'a> {
    /// QAR entry, read lazily from the archive stream
    Qar(&'a QarEntry),
    /// FPK entry, read lazily from the archive stream
    Fpk(&'a FpkEntry),
    /// PFTXS entry, already in memory
    Pftxs(&'a PftxsFtexsFileEntry),
}

/// Export name of an entry plus a handle to produce its data on demand
///
/// Many exported files share one archive stream. The stream is passed to
/// [`read_data`](Self::read_data) behind a mutex, which is held for the
/// whole positioned read, so files may be read in any order and from any
/// thread.
#[derive(Debug, Clone)]
pub struct ExportedFile<'a> {
    /// Relative path with `\` separators and no leading separator
    pub file_name: String,
    /// Entry the data comes from
    pub entry: EntryRef<'a>,
}

impl<'a> ExportedFile<'a> {
    /// Pair an export name with its entry
    pub fn new(file_name: String, entry: EntryRef<'a>) -> Self {
        Self { file_name, entry }
    }

    /// Read and decode the entry's data from the shared archive stream
    ///
    /// May be called repeatedly; each call reads the stream again.
    pub fn read_data<R: Read + Seek>(&self, stream: &Mutex<R>) -> FormatResult<ExportedData> {
        match self.entry {
            EntryRef::Qar(entry) => {
                let raw = {
                    let mut guard = stream.lock();
                    entry.read_raw(&mut *guard)?
                };
                entry.decode(raw)
            }
            EntryRef::Fpk(entry) => {
                let raw = {
                    let mut guard = stream.lock();
                    entry.read_raw(&mut *guard)?
                };
                Ok(entry.decode(raw))
            }
            EntryRef::Pftxs(entry) => Ok(ExportedData::new(entry.data.clone())),
        }
    }
}
