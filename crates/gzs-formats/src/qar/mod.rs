//! QAR (`SQAR`) data archives
//!
//! Version 3 archives mask every header word and every entry header word
//! with one of four constants, and wrap each payload in a table cipher
//! keyed by the entry hash. Version 1 archives are read only.

mod entry;
mod file;
mod header;
pub mod payload;

pub use entry::{ENTRY_HEADER_SIZE, LEGACY_RECORD_SIZE, QarEntry};
pub use file::QarFile;
pub use header::{HEADER_SIZE, LARGE_BLOCKS_FLAG, QarHeader};
pub use payload::{DecodedPayload, PayloadHeader, PayloadKind};

use crate::error::FormatResult;

/// `SQAR` as a little-endian word
pub const QAR_MAGIC: u32 = 0x5241_5153;

/// First XOR mask
pub const XOR_MASK_1: u32 = 0x4144_1043;
/// Second XOR mask
pub const XOR_MASK_2: u32 = 0x11C2_2050;
/// Third XOR mask
pub const XOR_MASK_3: u32 = 0xD056_08C3;
/// Fourth XOR mask
pub const XOR_MASK_4: u32 = 0x532C_7319;

const SECTION_MASKS: [u32; 4] = [XOR_MASK_1, XOR_MASK_2, XOR_MASK_3, XOR_MASK_4];

/// Check whether standalone data starts with a payload header
pub fn is_encrypted_section(data: &[u8]) -> bool {
    data.get(..4).is_some_and(|magic| {
        let magic = u32::from_le_bytes([magic[0], magic[1], magic[2], magic[3]]);
        magic == payload::KEYED_PAYLOAD_MAGIC || magic == payload::SIZED_PAYLOAD_MAGIC
    })
}

/// Decode standalone data wrapped in a payload header
///
/// Used for sections embedded in other files rather than archive entries:
/// there is no table cipher, and data is inflated only when a sized header
/// says so. Data without a payload header is returned unchanged.
pub fn decode_section(data: &[u8]) -> FormatResult<DecodedPayload> {
    payload::decode(data.to_vec(), payload::OuterCipher::None, None)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_is_encrypted_section() {
        assert!(is_encrypted_section(&payload::KEYED_PAYLOAD_MAGIC.to_le_bytes()));
        assert!(is_encrypted_section(&[0xE6, 0xEF, 0xF8, 0xE3, 0, 0]));
        assert!(!is_encrypted_section(b"FOX"));
        assert!(!is_encrypted_section(b"<?xml"));
    }

    #[test]
    fn test_plain_section_is_unchanged() {
        let decoded = decode_section(b"plain text").unwrap();
        assert_eq!(decoded.data, b"plain text");
        assert_eq!(decoded.header, None);
        assert!(!decoded.compressed);
    }
}
