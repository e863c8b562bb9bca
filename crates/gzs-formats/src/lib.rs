//! Readers and writers for Fox Engine archives
//!
//! Three container formats are supported:
//!
//! - **QAR** (`.dat`, `.qar`, `.g0s`): hash-addressed data archives with
//!   masked headers, per-entry ciphers and optional zlib compression
//! - **FPK / FPKD**: packages with named entries and package references,
//!   stored in the platform's byte order
//! - **PFTXS**: texture archives made of `FTEX` sub-files
//!
//! Every format reads its metadata from a seekable stream, exports entries on
//! demand through [`ExportedFile`] handles, and writes back from a
//! [`DataSource`] keyed by the export names. Metadata types derive `serde`
//! traits so an unpacked archive can be described in JSON and repacked.
//!
//! # Examples
//!
//! ```
//! use gzs_crypto::NameResolver;
//! use gzs_formats::{ArchiveFile, MemoryDirectory};
//! use gzs_formats::fpk::{FpkEntry, FpkFile};
//! use parking_lot::Mutex;
//! use std::io::Cursor;
//!
//! let mut source = MemoryDirectory::new();
//! source.insert("Assets\\tpp\\pack\\mission.lua", b"return {}".to_vec());
//!
//! let mut archive = ArchiveFile::Fpk(FpkFile {
//!     entries: vec![FpkEntry::new("/Assets/tpp/pack/mission.lua")],
//!     ..FpkFile::default()
//! });
//! let mut packed = Cursor::new(Vec::new());
//! archive.write(&mut packed, &source).unwrap();
//!
//! packed.set_position(0);
//! let read = ArchiveFile::detect_and_read(&mut packed, &NameResolver::empty())
//!     .unwrap()
//!     .unwrap();
//! let stream = Mutex::new(packed);
//! for file in read.export_files() {
//!     let data = file.read_data(&stream).unwrap().data;
//!     assert_eq!(source.get(&file.file_name), Some(data.as_slice()));
//! }
//! ```

#![warn(missing_docs)]

pub mod archive;
pub mod binary;
pub mod compression;
pub mod error;
pub mod fpk;
pub mod pftxs;
pub mod qar;

mod hex_serde;

pub use archive::{
    ArchiveFile, ArchiveKind, DataSource, DecodeAnomaly, EntryRef, ExportedData, ExportedFile,
    MemoryDirectory,
};
pub use binary::{EndianReader, EndianWriter};
pub use error::{FormatError, FormatResult};
pub use fpk::FpkFile;
pub use pftxs::PftxsFile;
pub use qar::QarFile;
