//! Hashing, name recovery and payload ciphers for Fox Engine archives
//!
//! QAR and PFTXS archives identify files by a packed path hash rather than a
//! stored name, and FPK archives may store names only as an MD5-verified
//! blob. This crate provides the hash functions, the dictionaries that
//! reverse them, and the XOR ciphers that protect entry payloads.
//!
//! # Components
//!
//! - **Hashing**: CityHash64 path hashes (current and legacy schemes) and
//!   extension ids
//! - **Name recovery**: [`NameResolver`] built from plain-text wordlists
//! - **Ciphers**: the QAR table and keystream ciphers, the FPK content cipher
//!
//! # Examples
//!
//! ```
//! use gzs_crypto::{NameResolver, hash_with_extension};
//!
//! let mut resolver = NameResolver::empty();
//! resolver.load_path_wordlist("/Assets/tpp/pack/player/player2\n");
//!
//! let hash = hash_with_extension("/Assets/tpp/pack/player/player2.fpkd");
//! let resolved = resolver.resolve(hash, false);
//! assert_eq!(resolved.name, "/Assets/tpp/pack/player/player2.fpkd");
//! ```

#![warn(missing_docs)]

pub mod cityhash;
pub mod config;
pub mod content_cipher;
pub mod dictionary;
pub mod error;
pub mod extensions;
pub mod md5;
pub mod path_hash;
pub mod qar_cipher;

pub use error::{CryptoError, CryptoResult};

// Re-export commonly used types
pub use config::DictionaryConfig;
pub use dictionary::{NameResolver, ResolvedName};
pub use extensions::{ExtensionTable, hash_extension};
pub use md5::Md5Digest;
pub use path_hash::{
    denormalize_file_path, hash_path, hash_path_legacy, hash_with_extension, normalize_file_path,
};
