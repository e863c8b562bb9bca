//! PFTXS archive reader and writer

use binrw::Endian;
use gzs_crypto::NameResolver;
use serde::{Deserialize, Serialize};
use std::io::{Read, Seek, Write};
use tracing::{info, warn};

use super::ftex::PftxsFtexFile;
use super::{PFTX_MAGIC, TEXL_MAGIC};
use crate::archive::{DataSource, EntryRef, ExportedFile};
use crate::binary::{EndianReader, EndianWriter};
use crate::error::{FormatError, FormatResult};

/// Header word following the magic, read in the archive's byte order
const PFTX_VERSION: i32 = 0x4000_0000;
/// The same word as it reads in the other byte order
const PFTX_VERSION_SWAPPED: i32 = 0x40;
const PFTX_HEADER_SIZE: i32 = 0x10;
const PFTX_UNKNOWN: i32 = 0x1;

const PFTX_HEADER_LEN: u64 = 16;
const TEXL_HEADER_LEN: u64 = 16;

/// Byte order of an archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PftxsEndianness {
    /// PC archives
    #[default]
    Little,
    /// Console archives
    Big,
}

impl PftxsEndianness {
    fn endian(self) -> Endian {
        match self {
            Self::Little => Endian::Little,
            Self::Big => Endian::Big,
        }
    }
}

/// PFTXS texture archive
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PftxsFile {
    /// Archive file name
    pub name: String,
    /// Byte order of the archive
    pub endianness: PftxsEndianness,
    /// FTEX sub-files in archive order
    pub files: Vec<PftxsFtexFile>,
}

impl PftxsFile {
    /// Read an archive, loading every entry's data
    ///
    /// The byte order is detected from the word after the magic. A stream
    /// with an unexpected magic or header word reads as an empty archive.
    pub fn read<R: Read + Seek>(reader: &mut R, resolver: &NameResolver) -> FormatResult<Self> {
        let mut reader = EndianReader::new(reader, Endian::Little);

        let magic = reader.read_u32()?;
        if magic != PFTX_MAGIC {
            warn!("PFTX magic mismatch: {magic:#010x}");
            return Ok(Self::default());
        }

        let mut endianness = PftxsEndianness::Little;
        match reader.read_i32()? {
            PFTX_VERSION => {}
            PFTX_VERSION_SWAPPED => {
                reader.seek_relative(-4)?;
                reader.flip_endian();
                reader.read_i32()?;
                endianness = PftxsEndianness::Big;
            }
            other => {
                warn!("Unexpected PFTX header word {other:#010x}");
                return Ok(Self::default());
            }
        }

        let header_size = reader.read_i32()?;
        let unknown = reader.read_i32()?;
        if header_size != PFTX_HEADER_SIZE || unknown != PFTX_UNKNOWN {
            warn!("Unexpected PFTX header words {header_size:#x}, {unknown:#x}");
            return Ok(Self::default());
        }

        let _texl_magic = reader.read_u32()?;
        let _texl_size = reader.read_u32()?;
        let file_count = reader.read_u32()?;
        let _reserved = reader.read_u32()?;

        let mut files = Vec::new();
        for _ in 0..file_count {
            files.push(PftxsFtexFile::read(&mut reader, resolver)?);
        }

        let file = Self {
            name: String::new(),
            endianness,
            files,
        };
        info!(
            "Read PFTXS ({:?}) with {} textures, {} entries",
            file.endianness,
            file.files.len(),
            file.files.iter().map(|f| f.entries.len()).sum::<usize>()
        );
        Ok(file)
    }

    /// Export handles for every entry of every sub-file, in archive order
    pub fn export_files(&self) -> impl Iterator<Item = ExportedFile<'_>> {
        self.files.iter().flat_map(|file| {
            file.entries
                .iter()
                .map(|entry| ExportedFile::new(entry.file_path.clone(), EntryRef::Pftxs(entry)))
        })
    }

    /// Write the archive, reading each entry's data from `source`
    pub fn write<W, S>(&mut self, writer: &mut W, source: &S) -> FormatResult<()>
    where
        W: Write + Seek,
        S: DataSource + ?Sized,
    {
        let endian = self.endianness.endian();
        let mut writer = EndianWriter::new(writer, endian);
        let pftx_position = writer.position()?;
        writer.write_zeros(PFTX_HEADER_LEN as usize)?;
        let texl_position = writer.position()?;
        writer.write_zeros(TEXL_HEADER_LEN as usize)?;

        for file in &mut self.files {
            file.write(&mut writer, source)?;
        }
        let end = writer.position()?;

        writer.seek_to(pftx_position)?;
        writer.set_endian(Endian::Little);
        writer.write_u32(PFTX_MAGIC)?;
        writer.set_endian(endian);
        writer.write_i32(PFTX_VERSION)?;
        writer.write_i32(PFTX_HEADER_SIZE)?;
        writer.write_i32(PFTX_UNKNOWN)?;

        writer.seek_to(texl_position)?;
        writer.set_endian(Endian::Little);
        writer.write_u32(TEXL_MAGIC)?;
        writer.set_endian(endian);
        let texl_size = u32::try_from(end - texl_position)
            .map_err(|_| FormatError::InvalidFormat(format!("TEXL of {} bytes", end - texl_position)))?;
        writer.write_u32(texl_size)?;
        writer.write_u32(self.files.len() as u32)?;
        writer.write_u32(0)?;
        writer.seek_to(end)?;

        info!("Wrote PFTXS with {} textures, {} bytes", self.files.len(), end - pftx_position);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::archive::MemoryDirectory;
    use crate::pftxs::PftxsFtexsFileEntry;
    use gzs_crypto::hash_with_extension;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn sample(endianness: PftxsEndianness) -> (PftxsFile, MemoryDirectory) {
        let mut source = MemoryDirectory::new();
        let mut files = Vec::new();
        for (texture, streams) in [("sna_bdy_alp", 2usize), ("sna_hed_nrm", 1)] {
            let path = format!("Assets\\tpp\\chara\\sna\\{texture}.ftex");
            let mut ftex = PftxsFtexFile::new(hash_with_extension(&path), &path);
            for index in 1..=streams {
                let name = format!("Assets\\tpp\\chara\\sna\\{texture}.{index}.ftexs");
                source.insert(name.clone(), vec![index as u8; 100 * index]);
                ftex.entries.push(PftxsFtexsFileEntry::new(hash_with_extension(&name), name));
            }
            files.push(ftex);
        }
        let file = PftxsFile {
            name: "sna.pftxs".to_string(),
            endianness,
            files,
        };
        (file, source)
    }

    fn write(file: &mut PftxsFile, source: &MemoryDirectory) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        file.write(&mut cursor, source).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_write_read_export() {
        let (mut file, source) = sample(PftxsEndianness::Little);
        let bytes = write(&mut file, &source);
        assert_eq!(&bytes[..4], b"PFTX");
        assert_eq!(&bytes[16..20], b"TEXL");
        assert_eq!(&bytes[32..36], b"FTEX");

        let cursor = Cursor::new(bytes);
        let stream = Mutex::new(cursor.clone());
        let read = PftxsFile::read(&mut cursor.clone(), &NameResolver::empty()).unwrap();
        assert_eq!(read.endianness, PftxsEndianness::Little);
        assert_eq!(read.files.len(), 2);
        assert_eq!(read.files[0].entries.len(), 2);

        for (exported, written) in read
            .export_files()
            .zip(file.files.iter().flat_map(|f| &f.entries))
        {
            assert_eq!(exported.read_data(&stream).unwrap().data, written.data);
            let EntryRef::Pftxs(entry) = exported.entry else {
                panic!("not a PFTXS entry");
            };
            assert_eq!(entry.hash, written.hash);
            assert_eq!(exported.file_name, entry.file_path);
        }
    }

    #[test]
    fn test_big_endian_fallback() {
        let (mut file, source) = sample(PftxsEndianness::Big);
        let bytes = write(&mut file, &source);
        assert_eq!(&bytes[..4], b"PFTX");
        assert_eq!(&bytes[4..8], &[0x40, 0, 0, 0]);

        let read = PftxsFile::read(&mut Cursor::new(bytes.clone()), &NameResolver::empty()).unwrap();
        assert_eq!(read.endianness, PftxsEndianness::Big);
        assert_eq!(read.files[1].hash, file.files[1].hash);

        let mut source = MemoryDirectory::new();
        for entry in read.files.iter().flat_map(|f| &f.entries) {
            source.insert(entry.file_path.clone(), entry.data.clone());
        }
        let mut read = read;
        assert_eq!(write(&mut read, &source), bytes);
    }

    #[test]
    fn test_unexpected_header_word_reads_empty() {
        let mut bytes = b"PFTX".to_vec();
        bytes.extend_from_slice(&7i32.to_le_bytes());
        bytes.extend_from_slice(&[0; 24]);
        let read = PftxsFile::read(&mut Cursor::new(bytes), &NameResolver::empty()).unwrap();
        assert!(read.files.is_empty());
    }
}
