//! Content cipher of FPK entries
//!
//! Script entries inside FPK archives may start with a marker byte (`0x1B` or
//! `0x1C`) followed by a ciphertext keyed by the entry's own file path. The
//! plaintext ends with a NUL byte, which doubles as the success check.
//!
//! The key starts as the little-endian bytes of the path key. Each slot of
//! that 8-byte window is replaced by the plaintext byte it just covered, so
//! from byte 8 on every byte is keyed by the plaintext 8 positions earlier.

use crate::path_hash::hash_path_legacy;

/// Leading bytes that mark an encrypted entry
pub const CONTENT_MARKERS: [u8; 2] = [0x1B, 0x1C];

/// Whether `data` starts with an encrypted-content marker
pub fn is_encrypted_content(data: &[u8]) -> bool {
    data.first().is_some_and(|byte| CONTENT_MARKERS.contains(byte))
}

/// Derive the content key of a file path
pub fn content_key(file_path: &str) -> u64 {
    !hash_path_legacy(&file_path.to_lowercase(), false)
}

/// Decrypt an entry that starts with a content marker
///
/// Returns the plaintext without the marker and terminator, or `None` when
/// the data is not marked or the decrypted terminator is not zero.
pub fn decrypt_content(data: &[u8], file_path: &str) -> Option<Vec<u8>> {
    if !is_encrypted_content(data) {
        return None;
    }

    let mut window = content_key(file_path).to_le_bytes();
    let mut plain: Vec<u8> = data[1..]
        .iter()
        .enumerate()
        .map(|(i, &byte)| {
            let slot = &mut window[i % 8];
            let value = byte ^ *slot;
            *slot = value;
            value
        })
        .collect();

    match plain.pop() {
        Some(0) => Some(plain),
        _ => None,
    }
}

/// Encrypt `plain` under `marker`, appending the terminator
pub fn encrypt_content(plain: &[u8], file_path: &str, marker: u8) -> Vec<u8> {
    let mut window = content_key(file_path).to_le_bytes();
    let mut output = Vec::with_capacity(plain.len() + 2);
    output.push(marker);
    output.extend(plain.iter().chain(&[0u8]).enumerate().map(|(i, &value)| {
        let slot = &mut window[i % 8];
        let byte = value ^ *slot;
        *slot = value;
        byte
    }));
    output
}
