//! QAR file header

use std::io::{Read, Seek, Write};
use tracing::{debug, warn};

use super::{QAR_MAGIC, XOR_MASK_1, XOR_MASK_2, XOR_MASK_3, XOR_MASK_4};
use crate::binary::{EndianReader, EndianWriter};
use crate::error::FormatResult;

/// Encoded header length in bytes
pub const HEADER_SIZE: u64 = 32;

/// Flag selecting 4096-byte blocks instead of 1024-byte blocks
pub const LARGE_BLOCKS_FLAG: u32 = 0x800;

/// Per-field XOR masks of a version 3 header, magic first
const FIELD_MASKS: [u32; 8] = [
    XOR_MASK_1, XOR_MASK_1, XOR_MASK_2, XOR_MASK_3, XOR_MASK_4, XOR_MASK_1, XOR_MASK_1, XOR_MASK_2,
];

/// Decoded QAR file header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QarHeader {
    /// Format flags
    pub flags: u32,
    /// Number of entries
    pub file_count: u32,
    /// Number of 16-byte records in the unknown table
    pub unknown_count: u32,
    /// Archive length in blocks
    pub end_block: u32,
    /// Offset of the first entry from the archive start
    pub first_entry_offset: u32,
    /// Format version
    pub version: u32,
    /// Trailing header word
    pub reserved: u32,
}

impl QarHeader {
    /// Read a header, returning `None` when the magic matches neither the
    /// masked nor the plain form
    pub fn read<R: Read + Seek>(reader: &mut EndianReader<R>) -> FormatResult<Option<Self>> {
        let magic = reader.read_u32()?;
        let masked = if magic == QAR_MAGIC ^ XOR_MASK_1 {
            true
        } else if magic == QAR_MAGIC {
            false
        } else {
            warn!("QAR magic mismatch: {magic:#010x}");
            return Ok(None);
        };

        let mut words = [magic, 0, 0, 0, 0, 0, 0, 0];
        for word in &mut words[1..] {
            *word = reader.read_u32()?;
        }

        if masked {
            for (word, mask) in words.iter_mut().zip(FIELD_MASKS) {
                *word ^= mask;
            }
        }

        let header = Self {
            flags: words[1],
            file_count: words[2],
            unknown_count: words[3],
            end_block: words[4],
            first_entry_offset: words[5],
            version: words[6],
            reserved: words[7],
        };

        debug!(
            "QAR header: version={}, flags={:#x}, files={}, unknown={}, masked={}",
            header.version, header.flags, header.file_count, header.unknown_count, masked
        );

        Ok(Some(header))
    }

    /// Write a masked version 3 header
    pub fn write<W: Write + Seek>(&self, writer: &mut EndianWriter<W>) -> FormatResult<()> {
        let words = [
            QAR_MAGIC,
            self.flags,
            self.file_count,
            self.unknown_count,
            self.end_block,
            self.first_entry_offset,
            self.version,
            self.reserved,
        ];
        for (word, mask) in words.into_iter().zip(FIELD_MASKS) {
            writer.write_u32(word ^ mask)?;
        }
        Ok(())
    }

    /// Log2 of the block size
    pub fn block_shift(&self) -> u32 {
        block_shift(self.flags)
    }
}

/// Log2 of the block size selected by `flags`
pub fn block_shift(flags: u32) -> u32 {
    if flags & LARGE_BLOCKS_FLAG == 0 { 10 } else { 12 }
}
