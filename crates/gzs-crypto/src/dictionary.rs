//! Name dictionaries for reversing path hashes and MD5 name digests
//!
//! Hashes are one-way, so names are recovered by hashing every line of a
//! wordlist up front and looking the stored hash up later. A miss is never an
//! error: the resolver synthesizes a stable placeholder name instead and
//! reports `found = false`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::DictionaryConfig;
use crate::error::{CryptoError, CryptoResult};
use crate::extensions::ExtensionTable;
use crate::md5::Md5Digest;
use crate::path_hash::{EXTENSION_SHIFT, PATH_HASH_MASK, hash_path, hash_path_legacy};

const UNKNOWN_EXTENSION: &str = "_unknown";

/// Result of a reverse lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    /// Recovered name, or a placeholder built from the hash
    pub name: String,
    /// Whether every part of the name came from a dictionary
    pub found: bool,
}

impl ResolvedName {
    fn new(name: String, found: bool) -> Self {
        Self { name, found }
    }
}

/// Reverse lookup tables for path hashes and name digests
///
/// Built once, then shared read-only by every reader.
#[derive(Debug, Clone, Default)]
pub struct NameResolver {
    paths: HashMap<u64, String>,
    legacy_paths: HashMap<u64, String>,
    md5_names: HashMap<Md5Digest, String>,
}

impl NameResolver {
    /// Create a resolver with no names; every lookup yields a placeholder
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a resolver from the wordlists named in `config`
    ///
    /// Unreadable wordlists are logged and skipped.
    pub fn from_config(config: &DictionaryConfig) -> Self {
        let mut resolver = Self::empty();

        if let Err(e) = resolver.load_path_dictionary(&config.qar_dictionary) {
            warn!("Path dictionary unavailable: {}", e);
        }
        if let Err(e) = resolver.load_md5_dictionary(&config.fpk_dictionary) {
            warn!("MD5 dictionary unavailable: {}", e);
        }

        resolver
    }

    /// Load a path wordlist file, returning the number of lines read
    pub fn load_path_dictionary(&mut self, path: &Path) -> CryptoResult<usize> {
        let content = read_wordlist(path)?;
        let count = self.load_path_wordlist(&content);
        info!("Loaded {} names from {}", count, path.display());
        Ok(count)
    }

    /// Add every line of `content` to the path dictionaries
    ///
    /// Each name is stored under both hashing schemes, with and without its
    /// extension. The first name stored under a hash wins.
    pub fn load_path_wordlist(&mut self, content: &str) -> usize {
        let mut count = 0;
        for line in content.lines().filter(|line| !line.is_empty()) {
            self.add_path(line);
            count += 1;
        }
        count
    }

    /// Add a single name to the path dictionaries
    pub fn add_path(&mut self, name: &str) {
        insert_first(&mut self.paths, hash_path(name, true), name);
        insert_first(&mut self.legacy_paths, hash_path_legacy(name, true), name);

        if name.contains('.') {
            insert_first(&mut self.paths, hash_path(name, false), name);
            insert_first(&mut self.legacy_paths, hash_path_legacy(name, false), name);
        }
    }

    /// Load an FPK name wordlist file, returning the number of lines read
    pub fn load_md5_dictionary(&mut self, path: &Path) -> CryptoResult<usize> {
        let content = read_wordlist(path)?;
        let count = self.load_md5_wordlist(&content);
        info!("Loaded {} FPK names from {}", count, path.display());
        Ok(count)
    }

    /// Add every line of `content` to the MD5 dictionary
    pub fn load_md5_wordlist(&mut self, content: &str) -> usize {
        let mut count = 0;
        for line in content.lines().filter(|line| !line.is_empty()) {
            self.add_md5_name(line);
            count += 1;
        }
        count
    }

    /// Add a single name to the MD5 dictionary
    pub fn add_md5_name(&mut self, name: &str) {
        self.md5_names
            .entry(Md5Digest::from_text(name))
            .or_insert_with(|| name.to_string());
    }

    /// Number of distinct path hashes known under either scheme
    pub fn path_count(&self) -> usize {
        self.paths.len() + self.legacy_paths.len()
    }

    /// Number of distinct name digests known
    pub fn md5_count(&self) -> usize {
        self.md5_names.len()
    }

    /// Recover the name of a packed path hash
    ///
    /// The extension id is `hash >> 51` (current) or `(hash >> 52) & 0xFFFF`
    /// (legacy); the path hash is the low 50 bits. The path is
    /// looked up in the current dictionary, then the legacy one. The extension
    /// is looked up in the current table, then the legacy one; `legacy` swaps
    /// that order. An unknown path becomes its lowercase hex, an unknown
    /// extension becomes `_unknown` with no dot.
    ///
    /// # Examples
    ///
    /// ```
    /// use gzs_crypto::dictionary::NameResolver;
    /// use gzs_crypto::path_hash::hash_with_extension;
    ///
    /// let mut resolver = NameResolver::empty();
    /// resolver.add_path("/Assets/tpp/pack/common");
    ///
    /// let resolved = resolver.resolve(hash_with_extension("/Assets/tpp/pack/common.fpk"), false);
    /// assert!(resolved.found);
    /// assert_eq!(resolved.name, "/Assets/tpp/pack/common.fpk");
    /// ```
    pub fn resolve(&self, hash: u64, legacy: bool) -> ResolvedName {
        let table = ExtensionTable::get();
        let path_hash = hash & PATH_HASH_MASK;
        let extension = if legacy {
            let id = (hash >> 52) & 0xFFFF;
            table.legacy(id).or_else(|| table.current(id))
        } else {
            let id = hash >> EXTENSION_SHIFT;
            table.current(id).or_else(|| table.legacy(id))
        };

        let mut found = true;
        let mut name = match self
            .paths
            .get(&path_hash)
            .or_else(|| self.legacy_paths.get(&path_hash))
        {
            Some(path) => path.clone(),
            None => {
                found = false;
                format!("{path_hash:x}")
            }
        };

        match extension {
            Some("") => {}
            Some(extension) => {
                name.push('.');
                name.push_str(extension);
            }
            None => {
                found = false;
                name.push_str(UNKNOWN_EXTENSION);
            }
        }

        if !found {
            debug!("Unresolved hash {:016x} -> {}", hash, name);
        }
        ResolvedName::new(name, found)
    }

    /// Recover an FPK name from the MD5 digest of its plain text
    ///
    /// On a miss the placeholder is the uppercase hex digest followed by the
    /// extension (from the last `.`) of `stored_name`.
    pub fn resolve_md5(&self, digest: &Md5Digest, stored_name: &str) -> ResolvedName {
        if let Some(name) = self.md5_names.get(digest) {
            return ResolvedName::new(name.clone(), true);
        }

        let extension = stored_name
            .rfind('.')
            .map_or("", |index| &stored_name[index..]);
        let name = format!("{}{}", digest.to_hex_upper(), extension);
        debug!("Unresolved name digest {} -> {}", digest, name);
        ResolvedName::new(name, false)
    }
}

fn insert_first(map: &mut HashMap<u64, String>, hash: u64, name: &str) {
    map.entry(hash & PATH_HASH_MASK)
        .or_insert_with(|| name.to_string());
}

fn read_wordlist(path: &Path) -> CryptoResult<String> {
    fs::read_to_string(path).map_err(|source| CryptoError::DictionaryRead {
        path: path.to_path_buf(),
        source,
    })
}
