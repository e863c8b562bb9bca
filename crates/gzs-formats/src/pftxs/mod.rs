//! PFTXS texture archives
//!
//! A `PFTX` header and a `TEXL` block precede a sequence of `FTEX`
//! sub-files, each holding the streams of one texture. Magics are stored
//! little-endian; every other word follows the archive's byte order, which
//! is detected from the header.

mod file;
mod ftex;

pub use file::{PftxsEndianness, PftxsFile};
pub use ftex::{FTEX_ENTRY_SIZE, FTEX_HEADER_SIZE, PftxsFtexFile, PftxsFtexsFileEntry};

/// `PFTX` as a little-endian word
pub const PFTX_MAGIC: u32 = 0x5854_4650;

/// `TEXL` as a little-endian word
pub const TEXL_MAGIC: u32 = 0x4C58_4554;

/// `FTEX` as a little-endian word
pub const FTEX_MAGIC: u32 = 0x5845_5446;
