//! Common archive interface over the QAR, FPK and PFTXS codecs
//!
//! [`ArchiveFile`] is a closed union of the three formats. Each variant is
//! read from a seekable stream, yields [`ExportedFile`] handles whose data is
//! produced on demand, and is written back from a [`DataSource`] keyed by the
//! same export names.

mod export;
mod source;

pub use export::{DecodeAnomaly, EntryRef, ExportedData, ExportedFile};
pub use source::{DataSource, MemoryDirectory};

use gzs_crypto::NameResolver;
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};

use crate::error::{FormatError, FormatResult};
use crate::fpk::{self, FpkFile};
use crate::pftxs::{self, PftxsFile};
use crate::qar::{self, QarFile};

/// Archive format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArchiveKind {
    /// `SQAR` data archive
    Qar,
    /// `foxf` package (`.fpk` / `.fpkd`)
    Fpk,
    /// `PFTX` texture archive
    Pftxs,
}

impl ArchiveKind {
    /// Identify a stream by its leading magic without moving its position
    pub fn detect<R: Read + Seek>(reader: &mut R) -> FormatResult<Option<Self>> {
        let start = reader.stream_position()?;
        let mut magic = [0u8; 4];
        let read = reader.read_exact(&mut magic);
        reader.seek(SeekFrom::Start(start))?;

        match read {
            Ok(()) => Ok(Self::from_magic(u32::from_le_bytes(magic))),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(FormatError::Io(e)),
        }
    }

    /// Identify a format from its little-endian leading word
    pub fn from_magic(magic: u32) -> Option<Self> {
        if magic == qar::QAR_MAGIC || magic == qar::QAR_MAGIC ^ qar::XOR_MASK_1 {
            Some(Self::Qar)
        } else if magic == fpk::FPK_MAGIC {
            Some(Self::Fpk)
        } else if magic == pftxs::PFTX_MAGIC {
            Some(Self::Pftxs)
        } else {
            None
        }
    }

    /// Identify a format from a file name's extension
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let lower = file_name.to_ascii_lowercase();
        if [".dat", ".qar", ".g0s"].iter().any(|ext| lower.ends_with(ext)) {
            Some(Self::Qar)
        } else if lower.ends_with(".fpk") || lower.ends_with(".fpkd") {
            Some(Self::Fpk)
        } else if lower.ends_with(".pftxs") {
            Some(Self::Pftxs)
        } else {
            None
        }
    }
}

/// Archive of any supported format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ArchiveFile {
    /// QAR archive
    Qar(QarFile),
    /// FPK or FPKD package
    Fpk(FpkFile),
    /// PFTXS texture archive
    Pftxs(PftxsFile),
}

impl ArchiveFile {
    /// Read an archive of a known format
    ///
    /// A stream that does not carry the format's magic yields an archive
    /// with no entries.
    pub fn read<R: Read + Seek>(
        kind: ArchiveKind,
        reader: &mut R,
        resolver: &NameResolver,
    ) -> FormatResult<Self> {
        Ok(match kind {
            ArchiveKind::Qar => Self::Qar(QarFile::read(reader, resolver)?),
            ArchiveKind::Fpk => Self::Fpk(FpkFile::read(reader, resolver)?),
            ArchiveKind::Pftxs => Self::Pftxs(PftxsFile::read(reader, resolver)?),
        })
    }

    /// Detect the format of a stream and read it
    pub fn detect_and_read<R: Read + Seek>(
        reader: &mut R,
        resolver: &NameResolver,
    ) -> FormatResult<Option<Self>> {
        match ArchiveKind::detect(reader)? {
            Some(kind) => Ok(Some(Self::read(kind, reader, resolver)?)),
            None => Ok(None),
        }
    }

    /// Format of this archive
    pub fn kind(&self) -> ArchiveKind {
        match self {
            Self::Qar(_) => ArchiveKind::Qar,
            Self::Fpk(_) => ArchiveKind::Fpk,
            Self::Pftxs(_) => ArchiveKind::Pftxs,
        }
    }

    /// Archive name recorded in the metadata
    pub fn name(&self) -> &str {
        match self {
            Self::Qar(file) => &file.name,
            Self::Fpk(file) => &file.name,
            Self::Pftxs(file) => &file.name,
        }
    }

    /// Set the archive name recorded in the metadata
    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        match self {
            Self::Qar(file) => file.name = name,
            Self::Fpk(file) => file.name = name,
            Self::Pftxs(file) => file.name = name,
        }
    }

    /// Number of exportable files
    pub fn file_count(&self) -> usize {
        match self {
            Self::Qar(file) => file.entries.len(),
            Self::Fpk(file) => file.entries.len(),
            Self::Pftxs(file) => file.files.iter().map(|ftex| ftex.entries.len()).sum(),
        }
    }

    /// Export handles of every file, in entry order
    pub fn export_files(&self) -> Vec<ExportedFile<'_>> {
        match self {
            Self::Qar(file) => file.export_files().collect(),
            Self::Fpk(file) => file.export_files().collect(),
            Self::Pftxs(file) => file.export_files().collect(),
        }
    }

    /// Write the archive, reading entry data from `source`
    pub fn write<W, S>(&mut self, writer: &mut W, source: &S) -> FormatResult<()>
    where
        W: Write + Seek,
        S: DataSource + ?Sized,
    {
        match self {
            Self::Qar(file) => file.write(writer, source),
            Self::Fpk(file) => file.write(writer, source),
            Self::Pftxs(file) => file.write(writer, source),
        }
    }
}
