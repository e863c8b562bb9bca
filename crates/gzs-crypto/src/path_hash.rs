//! Fox Engine path hashes
//!
//! Archives never store file names for QAR and PFTXS entries; they store a
//! packed 64-bit value with the extension id in the top bits and a 50-bit
//! (current) or 48-bit (legacy) CityHash of the extension-less path below it.

use crate::cityhash::{K2, city_hash64_with_seeds};
use crate::extensions::ExtensionTable;

/// Mask of the path part of a current-scheme hash
pub const PATH_HASH_MASK: u64 = 0x3_FFFF_FFFF_FFFF;

/// Mask of a legacy path hash
pub const LEGACY_PATH_HASH_MASK: u64 = 0xFFFF_FFFF_FFFF;

/// Bit set when the hashed path started with the `Assets/` root
pub const ASSETS_ROOT_FLAG: u64 = 0x4_0000_0000_0000;

/// Shift of the extension id inside a packed hash
pub const EXTENSION_SHIFT: u32 = 51;

const ASSETS_ROOT: &str = "Assets/";

/// Hash a path with the current scheme
///
/// With `strip_extension`, everything from the first `.` on is dropped.
/// Leading `/` are ignored and an `Assets/` root is removed, setting
/// [`ASSETS_ROOT_FLAG`] in the result.
///
/// # Examples
///
/// ```
/// use gzs_crypto::path_hash::{hash_path, ASSETS_ROOT_FLAG};
///
/// let a = hash_path("/Assets/tpp/pack/player/player2.fpk", true);
/// let b = hash_path("Assets/tpp/pack/player/player2", true);
/// assert_eq!(a, b);
/// assert_ne!(a & ASSETS_ROOT_FLAG, 0);
/// ```
pub fn hash_path(text: &str, strip_extension: bool) -> u64 {
    let mut text = text;
    if strip_extension && let Some(index) = text.find('.') {
        text = &text[..index];
    }
    text = text.trim_start_matches('/');

    let (text, has_root) = match text.strip_prefix(ASSETS_ROOT) {
        Some(rest) => (rest, true),
        None => (text, false),
    };

    let bytes = text.as_bytes();
    let mut seed_bytes = [0u8; 8];
    for (slot, &byte) in seed_bytes.iter_mut().zip(bytes.iter().rev()) {
        *slot = byte;
    }
    let seed1 = u64::from_le_bytes(seed_bytes);

    let hash = city_hash64_with_seeds(bytes, K2, seed1) & PATH_HASH_MASK;
    if has_root {
        hash | ASSETS_ROOT_FLAG
    } else {
        hash
    }
}

/// Hash a path with the legacy scheme
///
/// With `strip_extension`, everything from the last `.` on is dropped. The
/// text is hashed with a trailing NUL and the seed is derived from its first
/// byte and length.
pub fn hash_path_legacy(text: &str, strip_extension: bool) -> u64 {
    let mut text = text;
    if strip_extension && let Some(index) = text.rfind('.') {
        text = &text[..index];
    }

    let seed1 = text
        .as_bytes()
        .first()
        .map_or(0, |&first| (u64::from(first) << 16) + text.len() as u64);

    let mut data = Vec::with_capacity(text.len() + 1);
    data.extend_from_slice(text.as_bytes());
    data.push(0);

    city_hash64_with_seeds(&data, K2, seed1) & LEGACY_PATH_HASH_MASK
}

/// Compute the packed hash of a file path including its extension id
///
/// When exactly one known extension matches the end of the path, its id is
/// stored in the top bits and the text before `.ext` is hashed. Otherwise the
/// whole path is hashed with extension id 0.
pub fn hash_with_extension(file_path: &str) -> u64 {
    let file_path = denormalize_file_path(file_path);

    let matched = ExtensionTable::get()
        .match_suffix(&file_path)
        .and_then(|(id, extension)| {
            rfind_ignore_case(&file_path, &format!(".{extension}"))
                .map(|index| (id, &file_path[..index]))
        });

    match matched {
        Some((type_id, hashable)) => (type_id << EXTENSION_SHIFT) | hash_path(hashable, true),
        None => hash_path(&file_path, true),
    }
}

/// Convert a path to archive export form: `\` separators, no leading `\`
pub fn normalize_file_path(file_path: &str) -> String {
    file_path.replace('/', "\\").trim_start_matches('\\').to_string()
}

/// Convert `\` separators back to `/`
pub fn denormalize_file_path(file_path: &str) -> String {
    file_path.replace('\\', "/")
}

fn rfind_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.len() > hay.len() {
        return None;
    }
    (0..=hay.len() - needle.len())
        .rev()
        .find(|&start| hay[start..start + needle.len()].eq_ignore_ascii_case(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extensions::hash_extension;

    const LONG_PATH: &str = "/Assets/tpp/level/location/afgh/block_large/afgh_common/afgh_common_environ_asset_data.fox2";

    #[test]
    fn test_known_path_hashes() {
        assert_eq!(hash_path("/Assets/tpp/pack/player/player2.fpk", true), 0x6_0a5f_9c63_d99f);
        assert_eq!(hash_path("tpp/pack/mission2/free/f30010/f30010", true), 0x2_f337_cf10_ef1d);
        // more than 64 bytes after the root is removed
        assert_eq!(hash_path(LONG_PATH, true), 0x5_da8c_b9eb_2aec);
    }

    #[test]
    fn test_known_legacy_hashes() {
        let path = "/Assets/tpp/script/lib/TppMain.lua";
        assert_eq!(hash_path_legacy(path, true), 0x6f00_6fdc_0474);
        assert_eq!(hash_path_legacy(path, false), 0x1376_4a6c_60af);
        assert_eq!(
            hash_path_legacy("/Assets/tpp/level_asset/chara/enemy/Soviet2/TppEnemyBodyDataSoviet2.lua", true),
            0xf1be_d379_746b
        );
    }

    #[test]
    fn test_known_extension_ids() {
        assert_eq!(hash_extension("lua"), 0x31c);
        assert_eq!(hash_extension("fpk"), 0xa45);
        assert_eq!(hash_extension("fpkd"), 0x1daa);
        assert_eq!(hash_extension("ftex"), 0x2ad);
        assert_eq!(hash_extension("1.ftexs"), 0x1658);
    }

    #[test]
    fn test_known_hashes_with_extension() {
        assert_eq!(
            hash_with_extension("/Assets/tpp/pack/mission2/free/f30010/f30010.fpkd"),
            0xed56_f337_cf10_ef1d
        );
        assert_eq!(
            hash_with_extension(&normalize_file_path(LONG_PATH)),
            0x518d_da8c_b9eb_2aec
        );
    }

    #[test]
    fn test_strip_uses_first_dot() {
        assert_eq!(
            hash_path("tpp/ui/ui.eng.lng", true),
            hash_path("tpp/ui/ui", false)
        );
    }

    #[test]
    fn test_legacy_strip_uses_last_dot() {
        assert_eq!(
            hash_path_legacy("tpp/ui/ui.eng.lng", true),
            hash_path_legacy("tpp/ui/ui.eng", false)
        );
    }

    #[test]
    fn test_leading_slashes_and_root() {
        let plain = hash_path("tpp/pack/common", true);
        let rooted = hash_path("///Assets/tpp/pack/common", true);
        assert_eq!(rooted, plain | ASSETS_ROOT_FLAG);
        assert_eq!(plain & ASSETS_ROOT_FLAG, 0);
    }

    #[test]
    fn test_masks() {
        for text in ["", "a", "/Assets/tpp/level/location/afgh/block_large/afgh_common.fpkd"] {
            assert_eq!(hash_path(text, true) & !(PATH_HASH_MASK | ASSETS_ROOT_FLAG), 0);
            assert!(hash_path_legacy(text, true) <= LEGACY_PATH_HASH_MASK);
        }
    }

    #[test]
    fn test_hash_with_extension_packs_type_id() {
        let hash = hash_with_extension("\\Assets\\tpp\\pack\\common.fpkd");
        assert_eq!(hash >> EXTENSION_SHIFT, hash_extension("fpkd"));
        assert_eq!(
            hash & (PATH_HASH_MASK | ASSETS_ROOT_FLAG),
            hash_path("/Assets/tpp/pack/common", true)
        );
    }

    #[test]
    fn test_hash_with_extension_ambiguous_uses_zero_type() {
        let hash = hash_with_extension("/Assets/tpp/ui/ui.eng.lng");
        assert_eq!(hash >> EXTENSION_SHIFT, 0);
        assert_eq!(hash, hash_path("/Assets/tpp/ui/ui.eng.lng", true));
    }

    #[test]
    fn test_suffix_without_dot_falls_back() {
        // ends with "xml" but has no ".xml"
        let hash = hash_with_extension("/Assets/tpp/data/configxml");
        assert_eq!(hash, hash_path("/Assets/tpp/data/configxml", true));
    }

    #[test]
    fn test_normalize_round_trip() {
        let normalized = normalize_file_path("/Assets/tpp/pack/common.fpk");
        assert_eq!(normalized, "Assets\\tpp\\pack\\common.fpk");
        assert_eq!(denormalize_file_path(&normalized), "Assets/tpp/pack/common.fpk");
    }
}
