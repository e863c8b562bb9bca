//! File extension tables used by packed path hashes
//!
//! A packed QAR/PFTXS hash stores the extension in its top bits. Current
//! archives store a 13-bit id derived from the extension's own path hash;
//! legacy archives store a small sequential type id instead.

use crate::path_hash::hash_path;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Extensions recognised by the current hashing scheme
pub const FILE_EXTENSIONS: &[&str] = &[
    "1.ftexs", "1.nav2", "2.ftexs", "3.ftexs", "4.ftexs", "5.ftexs", "6.ftexs", "ag.evf", "aia",
    "aib", "aibc", "aig", "aigc", "aim", "aip", "ait", "atsh", "bnd", "bnk", "cc.evf", "clo",
    "csnav", "dat", "des", "dnav", "dnav2", "eng.lng", "ese", "evb", "evf", "fag", "fage", "fago",
    "fagp", "fagx", "fclo", "fcnp", "fcnpx", "fdes", "fdmg", "ffnt", "fmdl", "fmdlb", "fmtt",
    "fnt", "fova", "fox", "fox2", "fpk", "fpkd", "fpkl", "frdv", "fre.lng", "frig", "frt", "fsd",
    "fsm", "fsml", "fsop", "fstb", "ftex", "fv2", "fx.evf", "fxp", "gani", "geom", "ger.lng",
    "gpfp", "grxla", "grxoc", "gskl", "htre", "info", "ita.lng", "jpn.lng", "json", "lad", "ladb",
    "lani", "las", "lba", "lng", "lpsh", "lua", "mas", "mbl", "mog", "mtar", "mtl", "nav2", "nta",
    "obr", "obrb", "parts", "path", "pftxs", "ph", "phep", "phsd", "por.lng", "qar", "rbs", "rdb",
    "rdf", "rnav", "rus.lng", "sad", "sand", "sani", "sbp", "sd.evf", "sdf", "sim", "simep",
    "snav", "spa.lng", "spch", "sub", "subp", "tgt", "tre2", "txt", "uia", "uif", "uig", "uigb",
    "uil", "uilb", "utxl", "veh", "vfx", "vfxbin", "vfxdb", "vnav", "vo.evf", "vpc", "wem", "xml",
];

/// Legacy extension type ids; the id of an extension is its index
pub const LEGACY_FILE_EXTENSIONS: &[&str] = &[
    "", "xml", "json", "ese", "fxp", "fpk", "fpkd", "fpkl", "aib", "frig", "mtar", "gani", "evb",
    "evf", "ag.evf", "cc.evf", "fx.evf", "sd.evf", "vo.evf", "fsd", "fage", "fago", "fag", "fagx",
    "fagp", "frdv", "fdmg", "des", "fdes", "aibc", "mtl", "fsml", "fox", "fox2", "las", "fstb",
    "lua", "fcnp", "fcnpx", "sub", "fova", "lad", "lani", "vfx", "vfxbin", "frt", "gpfp", "gskl",
    "geom", "tgt", "path", "fmdl", "ftex", "htre", "tre2", "grxla", "grxoc", "mog", "pftxs",
    "nav2", "bnd", "parts", "phsd", "ph", "veh", "sdf", "sad", "sim", "fclo", "clo", "lng", "uig",
    "uil", "uif", "uia", "fnt", "utxl", "uigb", "vfxdb", "rbs", "aia", "aim", "aip", "aigc", "aig",
    "ait", "fsm", "obr", "obrb", "lpsh", "sani", "rdb", "phep", "simep", "atsh", "txt", "1.ftexs",
    "2.ftexs", "3.ftexs", "4.ftexs", "5.ftexs", "sbp", "mas", "rdf", "wem", "lba", "uilb",
];

/// Mask applied to an extension's path hash to form its id
pub const EXTENSION_ID_MASK: u64 = 0x1FFF;

/// Compute the 13-bit id of an extension (`hash_path(ext, false) & 0x1FFF`)
pub fn hash_extension(extension: &str) -> u64 {
    hash_path(extension, false) & EXTENSION_ID_MASK
}

/// Lookup tables between extension ids and extension text
#[derive(Debug, Clone)]
pub struct ExtensionTable {
    current: HashMap<u64, &'static str>,
    legacy: HashMap<u64, &'static str>,
}

impl ExtensionTable {
    fn build() -> Self {
        let mut current = HashMap::with_capacity(FILE_EXTENSIONS.len());
        for &extension in FILE_EXTENSIONS {
            current.entry(hash_extension(extension)).or_insert(extension);
        }

        let legacy = LEGACY_FILE_EXTENSIONS
            .iter()
            .enumerate()
            .map(|(id, &extension)| (id as u64, extension))
            .collect();

        Self { current, legacy }
    }

    /// Shared table, computed on first use
    pub fn get() -> &'static Self {
        static TABLE: LazyLock<ExtensionTable> = LazyLock::new(ExtensionTable::build);
        &TABLE
    }

    /// Look up an extension by current-scheme id
    pub fn current(&self, id: u64) -> Option<&'static str> {
        self.current.get(&id).copied()
    }

    /// Look up an extension by legacy type id
    pub fn legacy(&self, id: u64) -> Option<&'static str> {
        self.legacy.get(&id).copied()
    }

    /// Iterate over `(id, extension)` pairs of the current scheme
    pub fn iter_current(&self) -> impl Iterator<Item = (u64, &'static str)> + '_ {
        self.current.iter().map(|(&id, &ext)| (id, ext))
    }

    /// Find the single current-scheme extension `path` ends with
    ///
    /// Matching is case-insensitive and does not require a dot, so a path
    /// ending in `eng.lng` matches both `eng.lng` and `lng`; such ambiguous
    /// paths yield `None`.
    pub fn match_suffix(&self, path: &str) -> Option<(u64, &'static str)> {
        let mut matched = None;
        for (id, extension) in self.iter_current() {
            if extension.is_empty() || !ends_with_ignore_case(path, extension) {
                continue;
            }
            if matched.is_some() {
                return None;
            }
            matched = Some((id, extension));
        }
        matched
    }
}

fn ends_with_ignore_case(text: &str, suffix: &str) -> bool {
    text.len() >= suffix.len()
        && text.as_bytes()[text.len() - suffix.len()..].eq_ignore_ascii_case(suffix.as_bytes())
}
