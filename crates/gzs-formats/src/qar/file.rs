//! QAR archive reader and writer

use binrw::Endian;
use gzs_crypto::NameResolver;
use serde::{Deserialize, Serialize};
use std::io::{Read, Seek, Write};
use tracing::{debug, info, warn};

use super::entry::QarEntry;
use super::header::{HEADER_SIZE, QarHeader, block_shift};
use super::SECTION_MASKS;
use crate::archive::{DataSource, EntryRef, ExportedFile};
use crate::binary::{EndianReader, EndianWriter};
use crate::error::{FormatError, FormatResult};
use crate::hex_serde;

/// Section word bits holding the truncated entry hash
const SECTION_HASH_MASK: u64 = 0xFF_FFFF_FFFF;

/// Bit position of the block index in a section word
const SECTION_BLOCK_SHIFT: u32 = 40;

/// Length of one unknown table record
const UNKNOWN_RECORD_SIZE: usize = 16;

/// QAR archive metadata and entry table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QarFile {
    /// Archive file name
    pub name: String,
    /// Format version
    pub version: u32,
    /// Header flags
    pub flags: u32,
    /// Trailing header word
    #[serde(default)]
    pub reserved: u32,
    /// Opaque 16-byte records following the section table
    #[serde(default, with = "hex_serde::bytes")]
    pub unknown_table: Vec<u8>,
    /// Entries in table order
    pub entries: Vec<QarEntry>,
}

impl Default for QarFile {
    fn default() -> Self {
        Self {
            name: String::new(),
            version: 3,
            flags: 0,
            reserved: 0,
            unknown_table: Vec::new(),
            entries: Vec::new(),
        }
    }
}

impl QarFile {
    /// Peek the format version without moving the stream position
    ///
    /// Returns `None` when the stream is not a QAR archive.
    pub fn detect_version<R: Read + Seek>(reader: &mut R) -> FormatResult<Option<u32>> {
        let start = reader.stream_position()?;
        let mut reader = EndianReader::new(reader, Endian::Little);
        let header = QarHeader::read(&mut reader);
        reader.seek_to(start)?;
        Ok(header?.map(|header| header.version))
    }

    /// Read an archive's metadata and entry table
    ///
    /// Offsets are relative to the stream position on entry. A stream
    /// without a QAR magic, or of an unknown version, reads as an empty
    /// archive.
    pub fn read<R: Read + Seek>(reader: &mut R, resolver: &NameResolver) -> FormatResult<Self> {
        let mut reader = EndianReader::new(reader, Endian::Little);
        let start = reader.position()?;

        let Some(header) = QarHeader::read(&mut reader)? else {
            return Ok(Self::default());
        };

        let mut file = Self {
            version: header.version,
            flags: header.flags,
            reserved: header.reserved,
            ..Self::default()
        };

        match header.version {
            3 => file.read_sections(&mut reader, &header, start, resolver)?,
            1 => {
                for _ in 0..header.file_count {
                    file.entries.push(QarEntry::read_legacy(&mut reader, resolver)?);
                }
            }
            version => {
                warn!("Unsupported QAR version {version}");
                return Ok(Self::default());
            }
        }

        let found = file.entries.iter().filter(|e| e.file_name_found).count();
        info!(
            "Read QAR v{} with {} entries ({} names resolved)",
            file.version,
            file.entries.len(),
            found
        );
        Ok(file)
    }

    fn read_sections<R: Read + Seek>(
        &mut self,
        reader: &mut EndianReader<R>,
        header: &QarHeader,
        start: u64,
        resolver: &NameResolver,
    ) -> FormatResult<()> {
        let mut sections = Vec::new();
        for index in 0..header.file_count as usize {
            let low = reader.read_u32()? ^ SECTION_MASKS[(2 * index) % 4];
            let high = reader.read_u32()? ^ SECTION_MASKS[(2 * index + 1) % 4];
            sections.push((u64::from(high) << 32) | u64::from(low));
        }

        self.unknown_table =
            reader.read_bytes(header.unknown_count as usize * UNKNOWN_RECORD_SIZE)?;

        let shift = header.block_shift();
        for section in sections {
            let block = section >> SECTION_BLOCK_SHIFT;
            reader.seek_to(start + (block << shift))?;
            let entry = QarEntry::read(reader, resolver)?;
            if entry.hash & SECTION_HASH_MASK != section & SECTION_HASH_MASK {
                debug!(
                    "Section {:016x} does not match entry hash {:016x}",
                    section, entry.hash
                );
            }
            self.entries.push(entry);
        }
        Ok(())
    }

    /// Export handles for every entry, in table order
    pub fn export_files(&self) -> impl Iterator<Item = ExportedFile<'_>> {
        self.entries
            .iter()
            .map(|entry| ExportedFile::new(entry.export_name(), EntryRef::Qar(entry)))
    }

    /// Write a version 3 archive, reading each entry's file from `source`
    ///
    /// Entries start on block boundaries. Offsets are relative to the
    /// stream position on entry.
    pub fn write<W, S>(&mut self, writer: &mut W, source: &S) -> FormatResult<()>
    where
        W: Write + Seek,
        S: DataSource + ?Sized,
    {
        if self.version != 3 {
            return Err(FormatError::UnsupportedVersion(self.version));
        }
        if self.unknown_table.len() % UNKNOWN_RECORD_SIZE != 0 {
            return Err(FormatError::InvalidFormat(format!(
                "unknown table length {} is not a multiple of {UNKNOWN_RECORD_SIZE}",
                self.unknown_table.len()
            )));
        }

        let mut writer = EndianWriter::new(writer, Endian::Little);
        let start = writer.position()?;
        let shift = block_shift(self.flags);
        let alignment = 1u64 << shift;

        let table_len =
            HEADER_SIZE + 8 * self.entries.len() as u64 + self.unknown_table.len() as u64;
        let first_entry_offset = table_len.next_multiple_of(alignment);
        writer.write_zeros(first_entry_offset as usize)?;

        let mut sections = Vec::with_capacity(self.entries.len());
        for entry in &mut self.entries {
            let offset = writer.position()? - start;
            entry.write(&mut writer, source)?;
            sections.push(
                ((offset >> shift) << SECTION_BLOCK_SHIFT) | (entry.hash & SECTION_HASH_MASK),
            );
            pad_to_block(&mut writer, start, alignment)?;
        }

        let end = writer.position()?;
        let header = QarHeader {
            flags: self.flags,
            file_count: self.entries.len() as u32,
            unknown_count: (self.unknown_table.len() / UNKNOWN_RECORD_SIZE) as u32,
            end_block: ((end - start) >> shift) as u32,
            first_entry_offset: first_entry_offset as u32,
            version: self.version,
            reserved: self.reserved,
        };

        writer.seek_to(start)?;
        header.write(&mut writer)?;
        for (index, section) in sections.iter().enumerate() {
            writer.write_u32(*section as u32 ^ SECTION_MASKS[(2 * index) % 4])?;
            writer.write_u32((section >> 32) as u32 ^ SECTION_MASKS[(2 * index + 1) % 4])?;
        }
        writer.write_bytes(&self.unknown_table)?;
        writer.seek_to(end)?;

        info!("Wrote QAR with {} entries, {} bytes", self.entries.len(), end - start);
        Ok(())
    }
}

fn pad_to_block<W: Write + Seek>(
    writer: &mut EndianWriter<W>,
    start: u64,
    alignment: u64,
) -> FormatResult<()> {
    let offset = writer.position()? - start;
    let padding = offset.next_multiple_of(alignment) - offset;
    writer.write_zeros(padding as usize)
}
