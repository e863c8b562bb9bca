//! FTEX sub-files of a PFTXS archive

use gzs_crypto::{NameResolver, normalize_file_path};
use serde::{Deserialize, Serialize};
use std::io::{Read, Seek, Write};
use tracing::debug;

use super::FTEX_MAGIC;
use crate::archive::DataSource;
use crate::binary::{EndianReader, EndianWriter};
use crate::error::{FormatError, FormatResult};

/// Encoded sub-file header length
pub const FTEX_HEADER_SIZE: u64 = 32;

/// Encoded entry record length
pub const FTEX_ENTRY_SIZE: u64 = 16;

/// One texture stream inside an FTEX sub-file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PftxsFtexsFileEntry {
    /// Path hash
    pub hash: u64,
    /// Resolved path or hex placeholder, also the export name
    pub file_path: String,
    /// Offset of the data from the sub-file start
    #[serde(skip)]
    pub offset: i32,
    /// Data length
    #[serde(skip)]
    pub size: i32,
    /// Data, loaded when the archive is read
    #[serde(skip)]
    pub data: Vec<u8>,
    /// Whether `file_path` came from the dictionary
    #[serde(skip)]
    pub file_name_found: bool,
}

impl PftxsFtexsFileEntry {
    /// Entry for a new file
    pub fn new(hash: u64, file_path: impl Into<String>) -> Self {
        Self {
            hash,
            file_path: file_path.into(),
            offset: 0,
            size: 0,
            data: Vec::new(),
            file_name_found: true,
        }
    }

    fn read<R: Read + Seek>(
        reader: &mut EndianReader<R>,
        resolver: &NameResolver,
    ) -> FormatResult<Self> {
        let hash = reader.read_u64()?;
        let offset = reader.read_i32()?;
        let size = reader.read_i32()?;
        let resolved = resolver.resolve(hash, false);

        Ok(Self {
            hash,
            file_path: normalize_file_path(&resolved.name),
            offset,
            size,
            data: Vec::new(),
            file_name_found: resolved.found,
        })
    }

    fn write_record<W: Write + Seek>(&self, writer: &mut EndianWriter<W>) -> FormatResult<()> {
        writer.write_u64(self.hash)?;
        writer.write_i32(self.offset)?;
        writer.write_i32(self.size)
    }
}

/// FTEX sub-file: one texture and its streams
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PftxsFtexFile {
    /// Path hash of the texture
    pub hash: u64,
    /// Resolved texture path or hex placeholder
    pub file_path: String,
    /// Texture streams
    pub entries: Vec<PftxsFtexsFileEntry>,
}

impl PftxsFtexFile {
    /// Sub-file for a new texture
    pub fn new(hash: u64, file_path: impl Into<String>) -> Self {
        Self {
            hash,
            file_path: file_path.into(),
            entries: Vec::new(),
        }
    }

    /// Read a sub-file at the current position, loading every entry's data,
    /// and leave the reader at its end
    pub fn read<R: Read + Seek>(
        reader: &mut EndianReader<R>,
        resolver: &NameResolver,
    ) -> FormatResult<Self> {
        let base = reader.position()?;
        let _magic = reader.read_u32()?;
        let size = reader.read_u32()?;
        let hash = reader.read_u64()?;
        let count = reader.read_u32()?;
        reader.skip(12)?;

        let mut entries = Vec::new();
        for _ in 0..count {
            entries.push(PftxsFtexsFileEntry::read(reader, resolver)?);
        }

        for entry in &mut entries {
            let offset = u64::try_from(entry.offset).map_err(|_| {
                FormatError::InvalidFormat(format!("negative FTEX entry offset {}", entry.offset))
            })?;
            let size = usize::try_from(entry.size).map_err(|_| {
                FormatError::InvalidFormat(format!("negative FTEX entry size {}", entry.size))
            })?;
            reader.seek_to(base + offset)?;
            entry.data = reader.read_bytes(size)?;
        }
        reader.seek_to(base + u64::from(size))?;

        let file_path = normalize_file_path(&resolver.resolve(hash, false).name);
        debug!("FTEX {} ({:016x}) with {} entries", file_path, hash, entries.len());

        Ok(Self {
            hash,
            file_path,
            entries,
        })
    }

    /// Write the sub-file at the current position, reading each entry's
    /// data from `source`
    ///
    /// Data is written first and the header backfilled; the magic is always
    /// little-endian.
    pub fn write<W, S>(&mut self, writer: &mut EndianWriter<W>, source: &S) -> FormatResult<()>
    where
        W: Write + Seek,
        S: DataSource + ?Sized,
    {
        let base = writer.position()?;
        let tables_len = FTEX_HEADER_SIZE + FTEX_ENTRY_SIZE * self.entries.len() as u64;
        writer.write_zeros(tables_len as usize)?;

        for entry in &mut self.entries {
            let data = source.read_file(&entry.file_path)?;
            entry.offset = to_i32(writer.position()? - base)?;
            entry.size = to_i32(data.len() as u64)?;
            writer.write_bytes(&data)?;
            entry.data = data;
        }
        let end = writer.position()?;

        writer.seek_to(base)?;
        let endian = writer.endian();
        writer.set_endian(binrw::Endian::Little);
        writer.write_u32(FTEX_MAGIC)?;
        writer.set_endian(endian);

        writer.write_i32(to_i32(end - base)?)?;
        writer.write_u64(self.hash)?;
        writer.write_u32(self.entries.len() as u32)?;
        writer.write_zeros(12)?;
        for entry in &self.entries {
            entry.write_record(writer)?;
        }
        writer.seek_to(end)?;
        Ok(())
    }
}

fn to_i32(value: u64) -> FormatResult<i32> {
    i32::try_from(value).map_err(|_| FormatError::InvalidFormat(format!("FTEX value {value} overflows")))
}
