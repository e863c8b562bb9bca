//! Input files for archive writers

use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::{Read, Seek};

use super::export::ExportedFile;
use crate::error::{FormatError, FormatResult};

/// Named file contents consumed by archive writers
///
/// Names are the export names produced when reading: `\` separators and no
/// leading separator. A missing file fails the write.
pub trait DataSource {
    /// Read the whole file stored under `file_name`
    fn read_file(&self, file_name: &str) -> FormatResult<Vec<u8>>;
}

impl<T: DataSource + ?Sized> DataSource for &T {
    fn read_file(&self, file_name: &str) -> FormatResult<Vec<u8>> {
        (**self).read_file(file_name)
    }
}

/// In-memory directory of files keyed by export name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryDirectory {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every exported file into a new directory
    pub fn from_exports<'a, R, I>(files: I, stream: &Mutex<R>) -> FormatResult<Self>
    where
        R: Read + Seek,
        I: IntoIterator<Item = ExportedFile<'a>>,
    {
        let mut directory = Self::new();
        for file in files {
            let exported = file.read_data(stream)?;
            directory.insert(file.file_name, exported.data);
        }
        Ok(directory)
    }

    /// Add or replace a file
    pub fn insert(&mut self, file_name: impl Into<String>, data: Vec<u8>) -> Option<Vec<u8>> {
        self.files.insert(file_name.into(), data)
    }

    /// Get a file's contents
    pub fn get(&self, file_name: &str) -> Option<&[u8]> {
        self.files.get(file_name).map(Vec::as_slice)
    }

    /// Number of files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the directory is empty
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate over file names
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }
}

impl DataSource for MemoryDirectory {
    fn read_file(&self, file_name: &str) -> FormatResult<Vec<u8>> {
        self.files
            .get(file_name)
            .cloned()
            .ok_or_else(|| FormatError::MissingSource(file_name.to_string()))
    }
}
