//! MD5 digests of entry payloads and FPK file names

use binrw::{BinRead, BinWrite};
use md5::{Digest, Md5};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::{CryptoError, CryptoResult};

/// 16-byte MD5 digest as stored in QAR entry headers and FPK entry records
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Md5Digest([u8; 16]);

impl Md5Digest {
    /// Digest size in bytes
    pub const SIZE: usize = 16;

    /// Create digest from raw bytes
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Create digest from a slice, checking its length
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let array: [u8; 16] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidDigestSize {
                expected: Self::SIZE,
                actual: bytes.len(),
            })?;
        Ok(Self(array))
    }

    /// Compute the digest of `data`
    pub fn from_data(data: &[u8]) -> Self {
        let mut hasher = Md5::new();
        hasher.update(data);
        let result = hasher.finalize();
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&result);
        Self(bytes)
    }

    /// Compute the digest of a name's single-byte (Latin-1) encoding
    ///
    /// Names are stored one byte per char; chars above U+00FF hash as `?`.
    pub fn from_text(text: &str) -> Self {
        let bytes: Vec<u8> = text
            .chars()
            .map(|c| u8::try_from(c).unwrap_or(b'?'))
            .collect();
        Self::from_data(&bytes)
    }

    /// Parse digest from hex string
    pub fn from_hex(hex: &str) -> CryptoResult<Self> {
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(hex, &mut bytes)?;
        Ok(Self(bytes))
    }

    /// Get raw bytes
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Convert to lowercase hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Convert to uppercase hex string, the form used for unresolved names
    pub fn to_hex_upper(&self) -> String {
        hex::encode_upper(self.0)
    }

    /// Split into four little-endian words, the layout of QAR entry headers
    pub fn to_words(&self) -> [u32; 4] {
        let mut words = [0u32; 4];
        for (word, chunk) in words.iter_mut().zip(self.0.chunks_exact(4)) {
            *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        words
    }

    /// Join four little-endian words
    pub fn from_words(words: [u32; 4]) -> Self {
        let mut bytes = [0u8; 16];
        for (chunk, word) in bytes.chunks_exact_mut(4).zip(words) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        Self(bytes)
    }
}

impl fmt::Display for Md5Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Md5Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Md5Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::from_hex(&text).map_err(serde::de::Error::custom)
    }
}
