//! Error types for hashing and dictionary operations

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading dictionaries or handling digests
#[derive(Debug, Error)]
pub enum CryptoError {
    /// A dictionary wordlist could not be read
    #[error("Failed to read dictionary {path}: {source}")]
    DictionaryRead {
        /// Path of the wordlist
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Invalid digest length
    #[error("Invalid digest size: expected {expected}, got {actual}")]
    InvalidDigestSize {
        /// Expected digest size in bytes
        expected: usize,
        /// Actual digest size in bytes
        actual: usize,
    },

    /// Invalid hex text
    #[error("Invalid hex digest: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Result type for crypto operations
pub type CryptoResult<T> = Result<T, CryptoError>;
