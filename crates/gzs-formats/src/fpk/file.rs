//! FPK package reader and writer

use binrw::Endian;
use gzs_crypto::NameResolver;
use serde::{Deserialize, Serialize};
use std::io::{Read, Seek, Write};
use tracing::{info, warn};

use super::entry::{ENTRY_RECORD_SIZE, FpkEntry, FpkReference, REFERENCE_RECORD_SIZE};
use super::{FPK_MAGIC, PK_MAGIC};
use crate::archive::{DataSource, EntryRef, ExportedFile};
use crate::binary::{EndianReader, EndianWriter};
use crate::error::{FormatError, FormatResult};

/// Encoded header length
pub const HEADER_SIZE: u64 = 48;

/// Alignment of the string pool end and of every entry's data
const DATA_ALIGNMENT: u64 = 16;

/// Package flavour, stored as the byte after `foxfpk`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FpkType {
    /// `.fpk`, stored as `' '`
    #[default]
    Fpk,
    /// `.fpkd`, stored as `'d'`
    Fpkd,
}

impl FpkType {
    /// Decode the stored type byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b' ' => Some(Self::Fpk),
            b'd' => Some(Self::Fpkd),
            _ => None,
        }
    }

    /// Stored type byte
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Fpk => b' ',
            Self::Fpkd => b'd',
        }
    }
}

/// Whether packages for `platform` store their tables big-endian
pub fn is_big_endian_platform(platform: &str) -> bool {
    matches!(platform, "x36" | "ps3")
}

/// FPK package metadata, entries and references
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FpkFile {
    /// Package file name
    pub name: String,
    /// Package flavour
    pub fpk_type: FpkType,
    /// Three-letter platform code such as `win`, `x36` or `ps3`
    pub platform: String,
    /// Header word of unknown meaning, usually 2
    pub unknown_value: u32,
    /// Files in table order
    pub entries: Vec<FpkEntry>,
    /// Referenced packages
    #[serde(default)]
    pub references: Vec<FpkReference>,
}

impl Default for FpkFile {
    fn default() -> Self {
        Self {
            name: String::new(),
            fpk_type: FpkType::Fpk,
            platform: "win".to_string(),
            unknown_value: 2,
            entries: Vec::new(),
            references: Vec::new(),
        }
    }
}

impl FpkFile {
    /// Table byte order of this package
    pub fn endian(&self) -> Endian {
        if is_big_endian_platform(&self.platform) {
            Endian::Big
        } else {
            Endian::Little
        }
    }

    /// Read a package's metadata, entry table and reference table
    ///
    /// A stream without the `foxf` magic reads as an empty package.
    pub fn read<R: Read + Seek>(reader: &mut R, resolver: &NameResolver) -> FormatResult<Self> {
        let mut reader = EndianReader::new(reader, Endian::Little);

        let magic = reader.read_u32()?;
        if magic != FPK_MAGIC {
            warn!("FPK magic mismatch: {magic:#010x}");
            return Ok(Self::default());
        }

        let pk = reader.read_u16()?;
        if pk != PK_MAGIC {
            warn!("Unexpected FPK sub-magic {pk:#06x}");
        }
        let type_byte = reader.read_u8()?;
        let Some(fpk_type) = FpkType::from_byte(type_byte) else {
            warn!("Unknown FPK type byte {type_byte:#04x}");
            return Ok(Self::default());
        };
        let platform = reader.read_fixed_string(3)?;
        let _file_size = reader.read_u32()?;
        reader.skip(18)?;

        let mut file = Self {
            fpk_type,
            platform,
            ..Self::default()
        };
        reader.set_endian(file.endian());

        file.unknown_value = reader.read_u32()?;
        let entry_count = reader.read_u32()?;
        let reference_count = reader.read_u32()?;
        reader.skip(4)?;

        for _ in 0..entry_count {
            file.entries.push(FpkEntry::read(&mut reader, resolver)?);
        }
        for _ in 0..reference_count {
            file.references.push(FpkReference::read(&mut reader)?);
        }

        let unresolved = file.entries.iter().filter(|e| !e.file_path.resolved).count();
        info!(
            "Read {:?} for {} with {} entries, {} references ({} names unresolved)",
            file.fpk_type,
            file.platform,
            file.entries.len(),
            file.references.len(),
            unresolved
        );
        Ok(file)
    }

    /// Export handles for every entry, in table order
    pub fn export_files(&self) -> impl Iterator<Item = ExportedFile<'_>> {
        self.entries
            .iter()
            .map(|entry| ExportedFile::new(entry.export_name(), EntryRef::Fpk(entry)))
    }

    /// Write the package, reading each entry's file from `source`
    ///
    /// The string pool follows the tables, entries first, then every
    /// entry's data aligned to 16 bytes. Tables and header are written last.
    pub fn write<W, S>(&mut self, writer: &mut W, source: &S) -> FormatResult<()>
    where
        W: Write + Seek,
        S: DataSource + ?Sized,
    {
        if self.platform.len() != 3 {
            return Err(FormatError::InvalidFormat(format!(
                "platform code {:?} is not three characters",
                self.platform
            )));
        }

        let mut writer = EndianWriter::new(writer, Endian::Little);
        let start = writer.position()?;
        let tables_len = HEADER_SIZE
            + ENTRY_RECORD_SIZE * self.entries.len() as u64
            + REFERENCE_RECORD_SIZE * self.references.len() as u64;
        writer.write_zeros(tables_len as usize)?;

        for entry in &mut self.entries {
            entry.write_file_path(&mut writer)?;
        }
        for reference in &mut self.references {
            reference.file_path.write_pooled(&mut writer)?;
        }
        writer.align(DATA_ALIGNMENT)?;

        for entry in &mut self.entries {
            entry.write_data(&mut writer, source)?;
            writer.align(DATA_ALIGNMENT)?;
        }

        let end = writer.position()?;
        let file_size = u32::try_from(end - start)
            .map_err(|_| FormatError::InvalidFormat(format!("package of {} bytes", end - start)))?;

        writer.seek_to(start)?;
        writer.set_endian(Endian::Little);
        writer.write_u32(FPK_MAGIC)?;
        writer.write_u16(PK_MAGIC)?;
        writer.write_u8(self.fpk_type.to_byte())?;
        writer.write_fixed_string(&self.platform, 3)?;
        writer.write_u32(file_size)?;
        writer.write_zeros(18)?;

        writer.set_endian(self.endian());
        writer.write_u32(self.unknown_value)?;
        writer.write_u32(self.entries.len() as u32)?;
        writer.write_u32(self.references.len() as u32)?;
        writer.write_zeros(4)?;

        for entry in &self.entries {
            entry.write_record(&mut writer)?;
        }
        for reference in &self.references {
            reference.file_path.write_record(&mut writer)?;
        }
        writer.seek_to(end)?;

        info!(
            "Wrote {:?} with {} entries, {} bytes",
            self.fpk_type,
            self.entries.len(),
            file_size
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::archive::MemoryDirectory;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn sample(platform: &str) -> (FpkFile, MemoryDirectory) {
        let mut source = MemoryDirectory::new();
        source.insert("Assets\\tpp\\pack\\mission.fox2", b"<fox/>".to_vec());
        source.insert("Assets\\tpp\\pack\\mission.lua", b"return {}".to_vec());

        let file = FpkFile {
            name: "mission.fpkd".to_string(),
            fpk_type: FpkType::Fpkd,
            platform: platform.to_string(),
            entries: vec![
                FpkEntry::new("/Assets/tpp/pack/mission.fox2"),
                FpkEntry::new("/Assets/tpp/pack/mission.lua"),
            ],
            references: vec![FpkReference::new("/Assets/tpp/pack/common.fpk")],
            ..FpkFile::default()
        };
        (file, source)
    }

    fn write(file: &mut FpkFile, source: &MemoryDirectory) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        file.write(&mut cursor, source).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_write_read_export() {
        let (mut file, source) = sample("win");
        let bytes = write(&mut file, &source);
        assert_eq!(&bytes[..7], b"foxfpkd");
        assert_eq!(&bytes[7..10], b"win");
        assert_eq!(u32::from_le_bytes(bytes[10..14].try_into().unwrap()) as usize, bytes.len());
        assert_eq!(bytes.len() % 16, 0);

        let mut cursor = Cursor::new(bytes);
        let read = FpkFile::read(&mut cursor, &NameResolver::empty()).unwrap();
        assert_eq!(read.fpk_type, FpkType::Fpkd);
        assert_eq!(read.entries.len(), 2);
        assert_eq!(read.references[0].file_path.value, "/Assets/tpp/pack/common.fpk");
        assert!(read.entries.iter().all(|e| e.file_path.resolved && e.md5.is_none()));
        assert!(read.entries.iter().all(|e| e.data_offset % 16 == 0));

        let stream = Mutex::new(cursor);
        let exported: Vec<_> = read
            .export_files()
            .map(|file| (file.file_name.clone(), file.read_data(&stream).unwrap().data))
            .collect();
        assert_eq!(
            exported,
            vec![
                ("Assets\\tpp\\pack\\mission.fox2".to_string(), b"<fox/>".to_vec()),
                ("Assets\\tpp\\pack\\mission.lua".to_string(), b"return {}".to_vec()),
            ]
        );
    }

    #[test]
    fn test_console_tables_are_big_endian() {
        let (mut file, source) = sample("x36");
        let bytes = write(&mut file, &source);

        // header prefix stays little-endian
        assert_eq!(u32::from_le_bytes(bytes[10..14].try_into().unwrap()) as usize, bytes.len());
        // entry count follows the platform byte order
        assert_eq!(u32::from_be_bytes(bytes[36..40].try_into().unwrap()), 2);

        let read = FpkFile::read(&mut Cursor::new(bytes), &NameResolver::empty()).unwrap();
        assert_eq!(read.platform, "x36");
        assert_eq!(read.entries, file.entries);
    }

    #[test]
    fn test_rewrite_is_identical() {
        let (mut file, source) = sample("win");
        let first = write(&mut file, &source);
        let mut read = FpkFile::read(&mut Cursor::new(first.clone()), &NameResolver::empty()).unwrap();
        assert_eq!(write(&mut read, &source), first);
    }

    #[test]
    fn test_bad_magic_reads_empty() {
        let read = FpkFile::read(&mut Cursor::new(vec![0u8; 64]), &NameResolver::empty()).unwrap();
        assert!(read.entries.is_empty());
    }
}
