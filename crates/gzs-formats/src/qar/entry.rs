//! QAR entries

use gzs_crypto::{Md5Digest, NameResolver, hash_with_extension, normalize_file_path};
use serde::{Deserialize, Serialize};
use std::io::{Read, Seek, SeekFrom, Write};
use tracing::debug;

use super::payload::{self, MAX_PAYLOAD_HEADER_LEN, OuterCipher, PayloadHeader};
use super::{XOR_MASK_1, XOR_MASK_2, XOR_MASK_3, XOR_MASK_4};
use crate::archive::{DataSource, ExportedData};
use crate::binary::{EndianReader, EndianWriter};
use crate::error::FormatResult;

/// Encoded version 3 entry header length
pub const ENTRY_HEADER_SIZE: u64 = 32;

/// Encoded version 1 table record length
pub const LEGACY_RECORD_SIZE: u64 = 16;

const HASH_MASK: u64 = ((XOR_MASK_1 as u64) << 32) | XOR_MASK_1 as u64;
const MD5_MASKS: [u32; 4] = [XOR_MASK_4, XOR_MASK_1, XOR_MASK_1, XOR_MASK_2];

fn current_version() -> u32 {
    3
}

/// One file stored in a QAR archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QarEntry {
    /// Path hash, extension id in the top bits
    pub hash: u64,
    /// Resolved path or hex placeholder, `\` separated
    pub file_path: String,
    /// Whether the payload body is zlib-compressed
    pub compressed: bool,
    /// Payload header to re-apply on write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_header: Option<PayloadHeader>,
    /// Whether `file_path` came from the dictionary
    #[serde(skip)]
    pub file_name_found: bool,
    /// Length of the stored payload
    #[serde(skip)]
    pub stored_size: u32,
    /// Length of the plain data
    #[serde(skip)]
    pub uncompressed_size: u32,
    /// Absolute offset of the stored payload
    #[serde(skip)]
    pub data_offset: u64,
    /// Archive version the entry was read from
    #[serde(skip, default = "current_version")]
    pub version: u32,
    /// Digest of the stored payload before the table cipher
    #[serde(skip)]
    pub md5: Md5Digest,
}

impl QarEntry {
    /// Entry for a new file; the hash is derived from the path on write
    pub fn new(file_path: impl Into<String>, compressed: bool) -> Self {
        Self {
            hash: 0,
            file_path: file_path.into(),
            compressed,
            payload_header: None,
            file_name_found: true,
            stored_size: 0,
            uncompressed_size: 0,
            data_offset: 0,
            version: current_version(),
            md5: Md5Digest::default(),
        }
    }

    /// Read a version 3 entry header at the current position
    pub fn read<R: Read + Seek>(
        reader: &mut EndianReader<R>,
        resolver: &NameResolver,
    ) -> FormatResult<Self> {
        let hash_low = reader.read_u32()? ^ XOR_MASK_1;
        let hash_high = reader.read_u32()? ^ XOR_MASK_1;
        let stored_size = reader.read_u32()? ^ XOR_MASK_2;
        let uncompressed_size = reader.read_u32()? ^ XOR_MASK_3;

        let mut words = [0u32; 4];
        for (word, mask) in words.iter_mut().zip(MD5_MASKS) {
            *word = reader.read_u32()? ^ mask;
        }

        let hash = (u64::from(hash_high) << 32) | u64::from(hash_low);
        let data_offset = reader.position()?;
        let cipher = OuterCipher::Table { hash_low };
        let payload_header = peek_header(reader, data_offset, stored_size, cipher)?;

        let body_len = (stored_size as usize)
            .saturating_sub(payload_header.map_or(0, |h| h.kind.header_len()));
        let compressed =
            payload::is_compressed(payload_header.as_ref(), body_len, Some(uncompressed_size));

        let mut entry = Self {
            hash,
            file_path: String::new(),
            compressed,
            payload_header,
            file_name_found: false,
            stored_size,
            uncompressed_size,
            data_offset,
            version: 3,
            md5: Md5Digest::from_words(words),
        };
        entry.resolve_name(resolver);

        debug!(
            "QAR entry {:016x} {} stored={} size={} compressed={}",
            entry.hash, entry.file_path, stored_size, uncompressed_size, compressed
        );
        Ok(entry)
    }

    /// Read a version 1 table record at the current position
    ///
    /// Leaves the reader at the next record.
    pub fn read_legacy<R: Read + Seek>(
        reader: &mut EndianReader<R>,
        resolver: &NameResolver,
    ) -> FormatResult<Self> {
        let hash = reader.read_u64()?;
        let offset_units = reader.read_u32()?;
        let size = reader.read_u32()?;

        let next_record = reader.position()?;
        let data_offset = u64::from(offset_units) * 16;
        let cipher = OuterCipher::Legacy { seed: offset_units };
        let payload_header = peek_header(reader, data_offset, size, cipher)?;
        reader.seek_to(next_record)?;

        let mut entry = Self {
            hash,
            file_path: String::new(),
            compressed: false,
            payload_header,
            file_name_found: false,
            stored_size: size,
            uncompressed_size: size,
            data_offset,
            version: 1,
            md5: Md5Digest::default(),
        };
        entry.resolve_name(resolver);

        debug!("QAR v1 entry {:016x} {} size={}", hash, entry.file_path, size);
        Ok(entry)
    }

    fn resolve_name(&mut self, resolver: &NameResolver) {
        let resolved = resolver.resolve(self.hash, self.version == 1);
        self.file_path = normalize_file_path(&resolved.name);
        self.file_name_found = resolved.found;
    }

    /// Name the entry is exported under
    pub fn export_name(&self) -> String {
        normalize_file_path(&self.file_path)
    }

    /// Derive the hash from the path when none is set
    pub fn calculate_hash(&mut self) {
        if self.hash == 0 {
            self.hash = hash_with_extension(&self.file_path);
        }
    }

    fn outer_cipher(&self) -> OuterCipher {
        if self.version == 1 {
            OuterCipher::Legacy {
                seed: (self.data_offset / 16) as u32,
            }
        } else {
            OuterCipher::Table {
                hash_low: self.hash as u32,
            }
        }
    }

    /// Read the stored payload from the archive stream
    pub fn read_raw<R: Read + Seek>(&self, reader: &mut R) -> FormatResult<Vec<u8>> {
        reader.seek(SeekFrom::Start(self.data_offset))?;
        let mut data = vec![0u8; self.stored_size as usize];
        reader.read_exact(&mut data)?;
        Ok(data)
    }

    /// Remove every layer from a stored payload
    pub fn decode(&self, raw: Vec<u8>) -> FormatResult<ExportedData> {
        let uncompressed_size = (self.version != 1).then_some(self.uncompressed_size);
        let decoded = payload::decode(raw, self.outer_cipher(), uncompressed_size)?;
        Ok(ExportedData::new(decoded.data))
    }

    /// Encode the entry's file from `source` and write it as a version 3
    /// entry at the current position
    pub fn write<W, S>(&mut self, writer: &mut EndianWriter<W>, source: &S) -> FormatResult<()>
    where
        W: Write + Seek,
        S: DataSource + ?Sized,
    {
        self.calculate_hash();
        let plain = source.read_file(&self.export_name())?;
        let header = self.payload_header.map(|h| (h.kind, h.key));
        let encoded = payload::encode(&plain, self.hash as u32, self.compressed, header)?;

        self.version = 3;
        self.stored_size = encoded.data.len() as u32;
        self.uncompressed_size = encoded.uncompressed_size;
        self.md5 = encoded.md5;

        writer.write_u64(self.hash ^ HASH_MASK)?;
        writer.write_u32(self.stored_size ^ XOR_MASK_2)?;
        writer.write_u32(self.uncompressed_size ^ XOR_MASK_3)?;
        for (word, mask) in self.md5.to_words().into_iter().zip(MD5_MASKS) {
            writer.write_u32(word ^ mask)?;
        }

        self.data_offset = writer.position()?;
        writer.write_bytes(&encoded.data)?;

        debug!(
            "Wrote QAR entry {:016x} {} stored={}",
            self.hash, self.file_path, self.stored_size
        );
        Ok(())
    }
}

fn peek_header<R: Read + Seek>(
    reader: &mut EndianReader<R>,
    data_offset: u64,
    stored_size: u32,
    cipher: OuterCipher,
) -> FormatResult<Option<PayloadHeader>> {
    let len = (stored_size as usize).min(MAX_PAYLOAD_HEADER_LEN);
    reader.seek_to(data_offset)?;
    let prefix = reader.read_bytes(len)?;
    Ok(payload::peek_header(&prefix, cipher))
}
