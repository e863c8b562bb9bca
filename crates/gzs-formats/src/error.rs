//! Error types for archive reading and writing

use thiserror::Error;

/// Result type for archive operations
pub type FormatResult<T> = Result<T, FormatError>;

/// Errors that can occur while reading or writing archives
///
/// A wrong magic number is not an error: readers return an empty archive
/// instead. Unresolved names and rejected content decryption are not errors
/// either.
#[derive(Debug, Error)]
pub enum FormatError {
    /// I/O error, including reads past the end of the stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary read/write error
    #[error("Binary format error: {0}")]
    BinRw(#[from] binrw::Error),

    /// zlib compression or decompression failed
    #[error("Compression error: {0}")]
    Compression(String),

    /// The data source has no file with the requested name
    #[error("Source file not found: {0}")]
    MissingSource(String),

    /// The archive version has no write support
    #[error("Unsupported archive version: {0}")]
    UnsupportedVersion(u32),

    /// A structurally impossible value, such as a negative offset
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Hashing or digest error
    #[error("Crypto error: {0}")]
    Crypto(#[from] gzs_crypto::CryptoError),
}

impl FormatError {
    /// Check if this error came from the underlying stream
    pub fn is_io(&self) -> bool {
        match self {
            Self::Io(_) => true,
            Self::BinRw(binrw::Error::Io(_)) => true,
            _ => false,
        }
    }
}
