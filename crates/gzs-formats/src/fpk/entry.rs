//! FPK entries and references

use gzs_crypto::content_cipher::{CONTENT_MARKERS, decrypt_content, encrypt_content};
use gzs_crypto::{Md5Digest, NameResolver, normalize_file_path};
use serde::{Deserialize, Serialize};
use std::io::{Read, Seek, SeekFrom, Write};
use tracing::{debug, warn};

use super::string::FpkString;
use crate::archive::{DataSource, DecodeAnomaly, ExportedData};
use crate::binary::{EndianReader, EndianWriter};
use crate::error::{FormatError, FormatResult};

/// Encoded entry record length
pub const ENTRY_RECORD_SIZE: u64 = 48;

/// Encoded reference record length
pub const REFERENCE_RECORD_SIZE: u64 = 16;

/// One file stored in an FPK package
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FpkEntry {
    /// Path of the file inside the package
    pub file_path: FpkString,
    /// Stored name digest, kept when the name could not be recovered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5: Option<Md5Digest>,
    /// Content cipher marker to re-apply on write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_marker: Option<u8>,
    /// Absolute offset of the data
    #[serde(skip)]
    pub data_offset: i64,
    /// Length of the stored data
    #[serde(skip)]
    pub data_size: u64,
}

impl FpkEntry {
    /// Entry for a new file
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: FpkString::new(file_path),
            ..Self::default()
        }
    }

    /// Read an entry record at the current position, leaving the reader
    /// after the record
    pub fn read<R: Read + Seek>(
        reader: &mut EndianReader<R>,
        resolver: &NameResolver,
    ) -> FormatResult<Self> {
        let data_offset = reader.read_i64()?;
        let data_size = reader.read_u64()?;
        let mut file_path = FpkString::read(reader)?;
        let digest = Md5Digest::from_slice(&reader.read_bytes(Md5Digest::SIZE)?)?;
        file_path.resolve(&digest, resolver)?;

        let mut entry = Self {
            md5: (!file_path.resolved).then_some(digest),
            file_path,
            content_marker: None,
            data_offset,
            data_size,
        };
        entry.content_marker = entry.peek_content_marker(reader)?;

        debug!(
            "FPK entry {} offset={} size={} marker={:?}",
            entry.file_path.value, data_offset, data_size, entry.content_marker
        );
        Ok(entry)
    }

    fn peek_content_marker<R: Read + Seek>(
        &self,
        reader: &mut EndianReader<R>,
    ) -> FormatResult<Option<u8>> {
        if self.data_size == 0 {
            return Ok(None);
        }

        let record_end = reader.position()?;
        reader.seek_to(self.data_offset_u64()?)?;
        let first = reader.read_u8()?;
        let marker = if CONTENT_MARKERS.contains(&first) {
            reader.seek_relative(-1)?;
            let data = reader.read_bytes(self.data_len()?)?;
            decrypt_content(&data, &self.file_path.value).map(|_| first)
        } else {
            None
        };
        reader.seek_to(record_end)?;
        Ok(marker)
    }

    fn data_offset_u64(&self) -> FormatResult<u64> {
        u64::try_from(self.data_offset).map_err(|_| {
            FormatError::InvalidFormat(format!("negative data offset {}", self.data_offset))
        })
    }

    fn data_len(&self) -> FormatResult<usize> {
        usize::try_from(self.data_size)
            .map_err(|_| FormatError::InvalidFormat(format!("entry of {} bytes", self.data_size)))
    }

    /// Name digest written to the entry record
    pub fn digest(&self) -> Md5Digest {
        self.md5
            .unwrap_or_else(|| Md5Digest::from_text(&self.file_path.value))
    }

    /// Name the entry is exported under
    ///
    /// Separators are normalized and a drive prefix such as `Z:` is removed.
    pub fn export_name(&self) -> String {
        let name = normalize_file_path(&self.file_path.value);
        let name = match name.find(':') {
            Some(index) => &name[index + 1..],
            None => name.as_str(),
        };
        name.trim_start_matches('\\').to_string()
    }

    /// Read the stored data from the package stream
    pub fn read_raw<R: Read + Seek>(&self, reader: &mut R) -> FormatResult<Vec<u8>> {
        reader.seek(SeekFrom::Start(self.data_offset_u64()?))?;
        let mut data = vec![0u8; self.data_len()?];
        reader.read_exact(&mut data)?;
        Ok(data)
    }

    /// Remove the content cipher from stored data
    ///
    /// Data that carries a marker byte but does not decrypt is returned as
    /// stored, flagged with an anomaly.
    pub fn decode(&self, raw: Vec<u8>) -> ExportedData {
        if self.content_marker.is_some()
            && let Some(plain) = decrypt_content(&raw, &self.file_path.value)
        {
            return ExportedData::new(plain);
        }

        match raw.first() {
            Some(&marker) if CONTENT_MARKERS.contains(&marker) => {
                warn!(
                    "Content of {} starts with marker {:#04x} but does not decrypt",
                    self.file_path.value, marker
                );
                ExportedData::with_anomaly(raw, DecodeAnomaly::ContentCipherRejected { marker })
            }
            _ => ExportedData::new(raw),
        }
    }

    /// Write the record's path into the string pool
    pub fn write_file_path<W: Write + Seek>(
        &mut self,
        writer: &mut EndianWriter<W>,
    ) -> FormatResult<()> {
        self.file_path.write_pooled(writer)
    }

    /// Write the entry's file from `source` at the current position
    pub fn write_data<W, S>(&mut self, writer: &mut EndianWriter<W>, source: &S) -> FormatResult<()>
    where
        W: Write + Seek,
        S: DataSource + ?Sized,
    {
        let mut data = source.read_file(&self.export_name())?;
        if let Some(marker) = self.content_marker {
            data = encrypt_content(&data, &self.file_path.value, marker);
        }

        self.data_offset = i64::try_from(writer.position()?)
            .map_err(|_| FormatError::InvalidFormat("data offset overflow".to_string()))?;
        self.data_size = data.len() as u64;
        writer.write_bytes(&data)
    }

    /// Write the entry record
    pub fn write_record<W: Write + Seek>(&self, writer: &mut EndianWriter<W>) -> FormatResult<()> {
        writer.write_i64(self.data_offset)?;
        writer.write_u64(self.data_size)?;
        self.file_path.write_record(writer)?;
        writer.write_bytes(self.digest().as_bytes())
    }
}

/// Path of a package referenced by an FPK
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FpkReference {
    /// Referenced package path
    pub file_path: FpkString,
}

impl FpkReference {
    /// Reference to `file_path`
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: FpkString::new(file_path),
        }
    }

    /// Read a reference record at the current position
    pub fn read<R: Read + Seek>(reader: &mut EndianReader<R>) -> FormatResult<Self> {
        Ok(Self {
            file_path: FpkString::read(reader)?,
        })
    }
}
