//! QAR entry payload layers
//!
//! A stored payload may be wrapped, from the outside in, by:
//!
//! 1. the version 3 table cipher (or the version 1 block cipher),
//! 2. a payload header carrying a keystream key, optionally with explicit
//!    sizes, after which the remainder is keystream-encrypted,
//! 3. zlib compression.

use gzs_crypto::Md5Digest;
use gzs_crypto::qar_cipher::{apply_lcg_keystream, decrypt1, legacy_block_cipher};
use serde::{Deserialize, Serialize};

use crate::compression::{deflate, inflate};
use crate::error::FormatResult;

/// Magic of an 8-byte payload header: magic, key
pub const KEYED_PAYLOAD_MAGIC: u32 = 0xA0F8_EFE6;

/// Magic of a 16-byte payload header: magic, key, uncompressed size,
/// compressed size
pub const SIZED_PAYLOAD_MAGIC: u32 = 0xE3F8_EFE6;

/// Longest payload header
pub const MAX_PAYLOAD_HEADER_LEN: usize = 16;

/// Layout of a payload header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayloadKind {
    /// Magic and key
    Keyed,
    /// Magic, key and both payload sizes
    Sized,
}

impl PayloadKind {
    /// Leading magic of this header layout
    pub const fn magic(self) -> u32 {
        match self {
            Self::Keyed => KEYED_PAYLOAD_MAGIC,
            Self::Sized => SIZED_PAYLOAD_MAGIC,
        }
    }

    /// Header length in bytes
    pub const fn header_len(self) -> usize {
        match self {
            Self::Keyed => 8,
            Self::Sized => 16,
        }
    }
}

/// Payload header found inside a stored payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadHeader {
    /// Header layout
    pub kind: PayloadKind,
    /// Keystream key of the payload body
    pub key: u32,
    /// Embedded uncompressed size (sized headers only)
    #[serde(skip)]
    pub uncompressed_size: u32,
    /// Embedded compressed size (sized headers only)
    #[serde(skip)]
    pub compressed_size: u32,
}

impl PayloadHeader {
    /// Header of the given layout and key, sizes filled in on encode
    pub fn new(kind: PayloadKind, key: u32) -> Self {
        Self {
            kind,
            key,
            uncompressed_size: 0,
            compressed_size: 0,
        }
    }

    /// Parse a header from the start of a decrypted payload
    pub fn parse(data: &[u8]) -> Option<Self> {
        let word = |offset: usize| {
            data.get(offset..offset + 4)
                .map(|bytes| u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        };

        match word(0)? {
            KEYED_PAYLOAD_MAGIC => Some(Self::new(PayloadKind::Keyed, word(4)?)),
            SIZED_PAYLOAD_MAGIC => Some(Self {
                kind: PayloadKind::Sized,
                key: word(4)?,
                uncompressed_size: word(8)?,
                compressed_size: word(12)?,
            }),
            _ => None,
        }
    }

    /// Compression state declared by a sized header
    ///
    /// Sizes that differ mean compressed, unless either is zero.
    pub fn declared_compression(&self) -> Option<bool> {
        match self.kind {
            PayloadKind::Keyed => None,
            PayloadKind::Sized => Some(
                self.uncompressed_size != self.compressed_size
                    && self.uncompressed_size != 0
                    && self.compressed_size != 0,
            ),
        }
    }

    fn to_bytes(self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.kind.header_len());
        bytes.extend_from_slice(&self.kind.magic().to_le_bytes());
        bytes.extend_from_slice(&self.key.to_le_bytes());
        if self.kind == PayloadKind::Sized {
            bytes.extend_from_slice(&self.uncompressed_size.to_le_bytes());
            bytes.extend_from_slice(&self.compressed_size.to_le_bytes());
        }
        bytes
    }
}

/// Outer cipher of a stored payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OuterCipher {
    /// Version 3 table cipher keyed by the low hash word
    Table {
        /// Low 32 bits of the entry hash
        hash_low: u32,
    },
    /// Version 1 block cipher keyed by the data offset in 16-byte units
    Legacy {
        /// Data offset divided by 16
        seed: u32,
    },
    /// No outer cipher (standalone encrypted sections)
    None,
}

impl OuterCipher {
    fn apply(self, data: &mut [u8]) {
        match self {
            Self::Table { hash_low } => decrypt1(data, hash_low),
            Self::Legacy { seed } => legacy_block_cipher(data, seed),
            Self::None => {}
        }
    }

    fn accepts(self, kind: PayloadKind) -> bool {
        !matches!((self, kind), (Self::Legacy { .. }, PayloadKind::Sized))
    }
}

/// Payload with every layer removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPayload {
    /// Plain data
    pub data: Vec<u8>,
    /// Payload header that wrapped the data
    pub header: Option<PayloadHeader>,
    /// Whether the data was inflated
    pub compressed: bool,
}

/// Payload with every layer applied, ready to store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload {
    /// Stored bytes
    pub data: Vec<u8>,
    /// Digest of the stored bytes before the table cipher
    pub md5: Md5Digest,
    /// Length of the plain data
    pub uncompressed_size: u32,
}

/// Find the payload header behind the outer cipher
///
/// Only the first [`MAX_PAYLOAD_HEADER_LEN`] bytes of the stored payload are
/// needed; the outer ciphers are positional, so a prefix decrypts the same as
/// the whole payload does.
pub fn peek_header(prefix: &[u8], cipher: OuterCipher) -> Option<PayloadHeader> {
    let mut prefix = prefix[..prefix.len().min(MAX_PAYLOAD_HEADER_LEN)].to_vec();
    cipher.apply(&mut prefix);
    PayloadHeader::parse(&prefix).filter(|header| cipher.accepts(header.kind))
}

/// Decide whether a payload body is compressed
///
/// With a plain size recorded outside the payload, the body is compressed
/// when its length differs from that size. Only standalone sections fall
/// back to the sizes declared by a sized header.
pub fn is_compressed(
    header: Option<&PayloadHeader>,
    body_len: usize,
    uncompressed_size: Option<u32>,
) -> bool {
    match uncompressed_size {
        Some(size) => body_len != size as usize,
        None => header
            .and_then(PayloadHeader::declared_compression)
            .unwrap_or(false),
    }
}

/// Remove every layer from a stored payload
///
/// `uncompressed_size` is the plain size recorded outside the payload, if
/// any; version 1 payloads pass `None` and are never inflated.
pub fn decode(
    mut data: Vec<u8>,
    cipher: OuterCipher,
    uncompressed_size: Option<u32>,
) -> FormatResult<DecodedPayload> {
    cipher.apply(&mut data);

    let header = PayloadHeader::parse(&data).filter(|header| cipher.accepts(header.kind));
    if let Some(header) = header {
        data.drain(..header.kind.header_len());
        apply_lcg_keystream(&mut data, header.key);
    }

    let compressed = is_compressed(header.as_ref(), data.len(), uncompressed_size);
    if compressed {
        let size_hint = uncompressed_size
            .or_else(|| {
                header
                    .filter(|h| h.kind == PayloadKind::Sized)
                    .map(|h| h.uncompressed_size)
            })
            .unwrap_or(0);
        data = inflate(&data, size_hint as usize)?;
    }

    Ok(DecodedPayload {
        data,
        header,
        compressed,
    })
}

/// Header layout and key to re-apply on encode
pub type PayloadKindKey = (PayloadKind, u32);

/// Apply every layer to plain data for a version 3 entry
pub fn encode(
    plain: &[u8],
    hash_low: u32,
    compressed: bool,
    header: Option<PayloadKindKey>,
) -> FormatResult<EncodedPayload> {
    let mut body = if compressed {
        deflate(plain)?
    } else {
        plain.to_vec()
    };

    let mut stored = match header {
        Some((kind, key)) => {
            apply_lcg_keystream(&mut body, key);
            let header = PayloadHeader {
                kind,
                key,
                uncompressed_size: plain.len() as u32,
                compressed_size: body.len() as u32,
            };
            let mut stored = header.to_bytes();
            stored.append(&mut body);
            stored
        }
        None => body,
    };

    let md5 = Md5Digest::from_data(&stored);
    decrypt1(&mut stored, hash_low);

    Ok(EncodedPayload {
        data: stored,
        md5,
        uncompressed_size: plain.len() as u32,
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const HASH_LOW: u32 = 0x9E37_79B9;

    fn text(len: usize) -> Vec<u8> {
        b"-- TppMission.lua\nlocal this = {}\n"
            .iter()
            .copied()
            .cycle()
            .take(len)
            .collect()
    }

    #[test]
    fn test_parse_headers() {
        let mut keyed = KEYED_PAYLOAD_MAGIC.to_le_bytes().to_vec();
        keyed.extend_from_slice(&7u32.to_le_bytes());
        assert_eq!(
            PayloadHeader::parse(&keyed),
            Some(PayloadHeader::new(PayloadKind::Keyed, 7))
        );

        let mut sized = SIZED_PAYLOAD_MAGIC.to_le_bytes().to_vec();
        sized.extend_from_slice(&[7, 0, 0, 0, 100, 0, 0, 0, 60, 0, 0, 0]);
        let header = PayloadHeader::parse(&sized).unwrap();
        assert_eq!(header.declared_compression(), Some(true));
        assert_eq!(header.uncompressed_size, 100);

        // truncated sized header
        assert_eq!(PayloadHeader::parse(&sized[..12]), None);
        assert_eq!(PayloadHeader::parse(b"\x1bLua"), None);
    }

    #[test]
    fn test_zero_sizes_are_not_compressed() {
        let header = PayloadHeader {
            kind: PayloadKind::Sized,
            key: 1,
            uncompressed_size: 0,
            compressed_size: 12,
        };
        assert_eq!(header.declared_compression(), Some(false));
    }

    #[test]
    fn test_encode_decode_each_layout() {
        for header in [None, Some((PayloadKind::Keyed, 0x1234)), Some((PayloadKind::Sized, 0xFEED))] {
            for compressed in [false, true] {
                for len in [0usize, 1, 15, 16, 17, 63, 64, 65, 1000] {
                    let plain = text(len);
                    let encoded = encode(&plain, HASH_LOW, compressed, header).unwrap();
                    assert_eq!(encoded.uncompressed_size as usize, len);

                    let decoded = decode(
                        encoded.data.clone(),
                        OuterCipher::Table { hash_low: HASH_LOW },
                        Some(encoded.uncompressed_size),
                    )
                    .unwrap();
                    assert_eq!(decoded.data, plain, "{header:?} {compressed} {len}");
                    assert_eq!(decoded.header.map(|h| (h.kind, h.key)), header);
                }
            }
        }
    }

    #[test]
    fn test_peeked_header_matches_decode() {
        let plain = text(300);
        let encoded = encode(&plain, HASH_LOW, true, Some((PayloadKind::Sized, 99))).unwrap();
        let cipher = OuterCipher::Table { hash_low: HASH_LOW };
        let peeked = peek_header(&encoded.data[..16], cipher).unwrap();
        let decoded = decode(encoded.data, cipher, Some(300)).unwrap();
        assert_eq!(Some(peeked), decoded.header);
        assert!(decoded.compressed);
    }

    #[test]
    fn test_md5_covers_stored_bytes_before_table_cipher() {
        let plain = text(40);
        let encoded = encode(&plain, HASH_LOW, false, None).unwrap();
        assert_eq!(encoded.md5, Md5Digest::from_data(&plain));
    }

    #[test]
    fn test_legacy_keyed_payload() {
        let body = text(50);
        let mut stored = PayloadHeader::new(PayloadKind::Keyed, 0x55).to_bytes();
        let mut encrypted = body.clone();
        apply_lcg_keystream(&mut encrypted, 0x55);
        stored.extend_from_slice(&encrypted);
        legacy_block_cipher(&mut stored, 0x40);

        let decoded = decode(stored, OuterCipher::Legacy { seed: 0x40 }, None).unwrap();
        assert_eq!(decoded.data, body);
        assert!(!decoded.compressed);
    }

    #[test]
    fn test_standalone_section() {
        let plain = text(200);
        let mut body = deflate(&plain).unwrap();
        let header = PayloadHeader {
            kind: PayloadKind::Sized,
            key: 3,
            uncompressed_size: 200,
            compressed_size: body.len() as u32,
        };
        apply_lcg_keystream(&mut body, 3);
        let mut stored = header.to_bytes();
        stored.extend_from_slice(&body);

        let decoded = decode(stored, OuterCipher::None, None).unwrap();
        assert!(decoded.compressed);
        assert_eq!(decoded.data, plain);
    }

    proptest! {
        #[test]
        fn prop_stored_payload_decodes(
            plain in prop::collection::vec(any::<u8>(), 0..600),
            hash_low in any::<u32>(),
            key in any::<u32>(),
            kind in prop::option::of(prop_oneof![Just(PayloadKind::Keyed), Just(PayloadKind::Sized)]),
        ) {
            let encoded = encode(&plain, hash_low, false, kind.map(|k| (k, key))).unwrap();
            let decoded = decode(
                encoded.data,
                OuterCipher::Table { hash_low },
                Some(encoded.uncompressed_size),
            )
            .unwrap();
            prop_assert!(!decoded.compressed);
            prop_assert_eq!(decoded.data, plain);
        }
    }
}
