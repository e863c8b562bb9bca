//! FPK and FPKD (`foxfpk`) packages
//!
//! The first 32 header bytes are always little-endian. Everything after them
//! follows the platform: big-endian for Xbox 360 (`x36`) and PS3 (`ps3`)
//! packages, little-endian otherwise.

mod entry;
mod file;
mod string;

pub use entry::{ENTRY_RECORD_SIZE, FpkEntry, FpkReference, REFERENCE_RECORD_SIZE};
pub use file::{FpkFile, FpkType, HEADER_SIZE, is_big_endian_platform};
pub use string::{FpkString, STRING_RECORD_SIZE};

/// `foxf` as a little-endian word
pub const FPK_MAGIC: u32 = 0x6678_6F66;

/// `pk` as a little-endian half word
pub const PK_MAGIC: u16 = 0x6B70;
