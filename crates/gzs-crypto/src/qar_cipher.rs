//! Payload ciphers of QAR entries
//!
//! Three XOR ciphers protect QAR payloads:
//!
//! - [`decrypt1`]: a table cipher over every version 3 payload, keyed by the
//!   low 32 bits of the entry hash.
//! - [`apply_lcg_keystream`]: a 32-bit linear congruential keystream applied
//!   after a payload header that carries its key.
//! - [`legacy_block_cipher`]: the whole-block pass of version 1 archives,
//!   keyed by the entry's data offset in 16-byte units.
//!
//! All three are XOR ciphers, so applying one twice with the same key
//! restores the input.

/// XOR table of the version 3 block cipher
pub const DECRYPT1_TABLE: [u32; 8] = [
    0xBB8A_DEDB,
    0x6522_9958,
    0x0845_3206,
    0x8812_1302,
    0x4C34_4955,
    0x2C02_F10C,
    0x4887_F823,
    0xF381_8583,
];

const LCG_MULTIPLIER: u32 = 48_828_125;
const LCG_INCREMENT_FACTOR: u32 = 278;
const LCG_KEY_SALT: u32 = 25_974;

fn table_index(hash_low: u32, block_offset: usize) -> usize {
    #[allow(clippy::cast_possible_truncation)] // only the residue mod 4 matters
    let step = (block_offset / 11) as u32;
    2 * (hash_low.wrapping_add(step) % 4) as usize
}

/// Apply the version 3 table cipher in place
///
/// Each 8-byte block is XORed with a pair of table words chosen by
/// `(hash_low + block_offset / 11) % 4`; trailing bytes use the same pair,
/// byte by byte.
///
/// # Examples
///
/// ```
/// use gzs_crypto::qar_cipher::decrypt1;
///
/// let mut data = b"tpp/pack/common.fpk".to_vec();
/// decrypt1(&mut data, 0x1234_5678);
/// assert_ne!(&data[..], b"tpp/pack/common.fpk");
/// decrypt1(&mut data, 0x1234_5678);
/// assert_eq!(&data[..], b"tpp/pack/common.fpk");
/// ```
pub fn decrypt1(data: &mut [u8], hash_low: u32) {
    let blocks = data.len() / 8;
    for (i, block) in data.chunks_exact_mut(8).enumerate() {
        let index = table_index(hash_low, i * 8);
        let (low, high) = block.split_at_mut(4);
        xor_word(low, DECRYPT1_TABLE[index]);
        xor_word(high, DECRYPT1_TABLE[index + 1]);
    }

    let tail_offset = blocks * 8;
    let index = table_index(hash_low, tail_offset);
    for (position, byte) in data[tail_offset..].iter_mut().enumerate() {
        let mask = if position < 4 {
            DECRYPT1_TABLE[index]
        } else {
            DECRYPT1_TABLE[index + 1]
        };
        *byte ^= mask.to_le_bytes()[position % 4];
    }
}

/// Keystream of the payload header cipher
#[derive(Debug, Clone)]
struct LcgKeystream {
    current: u32,
    increment: u32,
}

impl LcgKeystream {
    fn new(key: u32) -> Self {
        Self {
            current: key | ((key ^ LCG_KEY_SALT) << 16),
            increment: LCG_INCREMENT_FACTOR.wrapping_mul(key),
        }
    }
}

impl Iterator for LcgKeystream {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let word = self.current;
        self.current = self
            .increment
            .wrapping_add(LCG_MULTIPLIER.wrapping_mul(self.current));
        Some(word)
    }
}

/// Apply the LCG keystream to every whole little-endian word of `data`
///
/// The keystream starts at `key | ((key ^ 25974) << 16)` and advances as
/// `278 * key + 48828125 * current`. Up to three trailing bytes are left
/// untouched.
pub fn apply_lcg_keystream(data: &mut [u8], key: u32) {
    for (word, mask) in data.chunks_exact_mut(4).zip(LcgKeystream::new(key)) {
        xor_word(word, mask);
    }
}

/// Apply the version 1 whole-block cipher in place
///
/// Same keystream as [`apply_lcg_keystream`] seeded with the entry's data
/// offset divided by 16, extended over the trailing bytes.
pub fn legacy_block_cipher(data: &mut [u8], seed: u32) {
    let mut keystream = LcgKeystream::new(seed);
    let mut chunks = data.chunks_exact_mut(4);
    for word in chunks.by_ref() {
        if let Some(mask) = keystream.next() {
            xor_word(word, mask);
        }
    }
    if let Some(mask) = keystream.next() {
        for (byte, mask_byte) in chunks.into_remainder().iter_mut().zip(mask.to_le_bytes()) {
            *byte ^= mask_byte;
        }
    }
}

fn xor_word(bytes: &mut [u8], mask: u32) {
    for (byte, mask_byte) in bytes.iter_mut().zip(mask.to_le_bytes()) {
        *byte ^= mask_byte;
    }
}
