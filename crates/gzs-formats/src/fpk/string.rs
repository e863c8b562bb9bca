//! Pooled FPK strings

use gzs_crypto::{Md5Digest, NameResolver};
use serde::{Deserialize, Serialize};
use std::io::{Read, Seek, Write};

use crate::binary::{EndianReader, EndianWriter, latin1_decode, latin1_encode};
use crate::error::{FormatError, FormatResult};
use crate::hex_serde;

/// Encoded string record length
pub const STRING_RECORD_SIZE: u64 = 16;

/// String stored in an FPK string pool
///
/// Some packages store names in an obfuscated form. The stored bytes are
/// then kept verbatim in `encrypted_value` and written back unchanged, while
/// `value` holds the name recovered from the MD5 dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FpkString {
    /// Plain or recovered value
    pub value: String,
    /// Stored bytes when they differ from `value`
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "hex_serde::option_bytes"
    )]
    pub encrypted_value: Option<Vec<u8>>,
    /// Offset of the pooled bytes
    #[serde(skip)]
    pub offset: i64,
    /// Length of the pooled bytes
    #[serde(skip)]
    pub length: i32,
    /// Whether `value` is a real name rather than a placeholder
    #[serde(skip)]
    pub resolved: bool,
}

impl FpkString {
    /// Plain string
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            resolved: true,
            ..Self::default()
        }
    }

    /// Read a string record at the current position and fetch its bytes
    /// from the pool, leaving the reader after the record
    pub fn read<R: Read + Seek>(reader: &mut EndianReader<R>) -> FormatResult<Self> {
        let offset = reader.read_i64()?;
        let length = reader.read_i32()?;
        reader.skip(4)?;

        let record_end = reader.position()?;
        let pool_offset = u64::try_from(offset)
            .map_err(|_| FormatError::InvalidFormat(format!("negative string offset {offset}")))?;
        let pool_length = usize::try_from(length)
            .map_err(|_| FormatError::InvalidFormat(format!("negative string length {length}")))?;
        reader.seek_to(pool_offset)?;
        let bytes = reader.read_fixed_bytes(pool_length)?;
        reader.seek_to(record_end)?;

        Ok(Self {
            value: latin1_decode(&bytes),
            encrypted_value: None,
            offset,
            length,
            resolved: true,
        })
    }

    /// Check the stored value against `digest`, recovering the real name
    /// from the dictionary when they differ
    pub fn resolve(&mut self, digest: &Md5Digest, resolver: &NameResolver) -> FormatResult<()> {
        if Md5Digest::from_text(&self.value) == *digest {
            self.resolved = true;
            return Ok(());
        }

        let resolved = resolver.resolve_md5(digest, &self.value);
        self.encrypted_value = Some(latin1_encode(&self.value)?);
        self.value = resolved.name;
        self.resolved = resolved.found;
        Ok(())
    }

    /// Bytes written to the pool
    pub fn stored_bytes(&self) -> FormatResult<Vec<u8>> {
        match &self.encrypted_value {
            Some(bytes) => Ok(bytes.clone()),
            None => latin1_encode(&self.value),
        }
    }

    /// Write the pooled bytes at the current position, NUL terminated
    pub fn write_pooled<W: Write + Seek>(&mut self, writer: &mut EndianWriter<W>) -> FormatResult<()> {
        let bytes = self.stored_bytes()?;
        self.offset = i64::try_from(writer.position()?)
            .map_err(|_| FormatError::InvalidFormat("string pool offset overflow".to_string()))?;
        self.length = i32::try_from(bytes.len())
            .map_err(|_| FormatError::InvalidFormat(format!("string of {} bytes", bytes.len())))?;
        writer.write_null_terminated_bytes(&bytes)
    }

    /// Write the string record
    pub fn write_record<W: Write + Seek>(&self, writer: &mut EndianWriter<W>) -> FormatResult<()> {
        writer.write_i64(self.offset)?;
        writer.write_i32(self.length)?;
        writer.write_zeros(4)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use binrw::Endian;
    use std::io::Cursor;

    fn pooled(value: &[u8]) -> FpkString {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&16i64.to_le_bytes());
        bytes.extend_from_slice(&(value.len() as i32).to_le_bytes());
        bytes.extend_from_slice(&[0; 4]);
        bytes.extend_from_slice(value);
        bytes.push(0);

        let mut reader = EndianReader::new(Cursor::new(bytes), Endian::Little);
        let string = FpkString::read(&mut reader).unwrap();
        assert_eq!(reader.position().unwrap(), STRING_RECORD_SIZE);
        string
    }

    #[test]
    fn test_plain_string_resolves_itself() {
        let mut string = pooled(b"/Assets/tpp/pack/player.fpkd");
        string
            .resolve(&Md5Digest::from_text("/Assets/tpp/pack/player.fpkd"), &NameResolver::empty())
            .unwrap();
        assert!(string.resolved);
        assert_eq!(string.encrypted_value, None);
        assert_eq!(string.value, "/Assets/tpp/pack/player.fpkd");
    }

    #[test]
    fn test_obfuscated_string_uses_dictionary() {
        let name = "/Assets/tpp/level_asset/chara/sna/sna0_main0_def.fmdl";
        let mut resolver = NameResolver::empty();
        resolver.add_md5_name(name);

        let stored = b"\x8a\x13\xf0garbled.fmdl";
        let mut string = pooled(stored);
        string.resolve(&Md5Digest::from_text(name), &resolver).unwrap();
        assert!(string.resolved);
        assert_eq!(string.value, name);
        assert_eq!(string.stored_bytes().unwrap(), stored);
    }

    #[test]
    fn test_unknown_obfuscated_string_is_placeholder() {
        let digest = Md5Digest::from_text("missing");
        let mut string = pooled(b"xyz.lua");
        string.resolve(&digest, &NameResolver::empty()).unwrap();
        assert!(!string.resolved);
        assert_eq!(string.value, format!("{}.lua", digest.to_hex_upper()));
        assert_eq!(string.stored_bytes().unwrap(), b"xyz.lua");
    }

    #[test]
    fn test_latin1_name_resolves_itself() {
        let mut string = pooled(b"/Assets/tpp/ui/men\xfc.lua");
        assert_eq!(string.value, "/Assets/tpp/ui/men\u{fc}.lua");
        string
            .resolve(&Md5Digest::from_data(b"/Assets/tpp/ui/men\xfc.lua"), &NameResolver::empty())
            .unwrap();
        assert!(string.resolved);
        assert_eq!(string.encrypted_value, None);
    }

    #[test]
    fn test_wide_name_is_not_written() {
        let mut string = FpkString::new("/Assets/tpp/ui/\u{263A}.lua");
        let mut writer = EndianWriter::new(Cursor::new(Vec::new()), Endian::Little);
        let err = string.write_pooled(&mut writer).unwrap_err();
        assert!(matches!(err, FormatError::InvalidFormat(_)));
    }

    #[test]
    fn test_write_pooled_records_offset() {
        let mut string = FpkString::new("a.lua");
        let mut writer = EndianWriter::new(Cursor::new(Vec::new()), Endian::Little);
        writer.write_zeros(3).unwrap();
        string.write_pooled(&mut writer).unwrap();
        string.write_record(&mut writer).unwrap();
        assert_eq!((string.offset, string.length), (3, 5));

        let bytes = writer.into_inner().into_inner();
        assert_eq!(&bytes[3..9], b"a.lua\0");
        assert_eq!(bytes.len(), 9 + 16);
    }
}
