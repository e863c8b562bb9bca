//! Locations of the name wordlists

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default file name of the path wordlist
pub const QAR_DICTIONARY_FILE: &str = "qar_dictionary.txt";

/// Default file name of the FPK name wordlist
pub const FPK_DICTIONARY_FILE: &str = "fpk_dictionary.txt";

/// Configuration for loading a [`NameResolver`](crate::dictionary::NameResolver)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryConfig {
    /// Wordlist of archive paths, hashed with both path schemes
    pub qar_dictionary: PathBuf,

    /// Wordlist of FPK entry names, hashed with MD5
    pub fpk_dictionary: PathBuf,
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self {
            qar_dictionary: PathBuf::from(QAR_DICTIONARY_FILE),
            fpk_dictionary: PathBuf::from(FPK_DICTIONARY_FILE),
        }
    }
}

impl DictionaryConfig {
    /// Place both wordlists under `dir` with their default names
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            qar_dictionary: dir.join(QAR_DICTIONARY_FILE),
            fpk_dictionary: dir.join(FPK_DICTIONARY_FILE),
        }
    }

    /// Set the path wordlist
    #[must_use]
    pub fn with_qar_dictionary<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.qar_dictionary = path.as_ref().to_path_buf();
        self
    }

    /// Set the FPK name wordlist
    #[must_use]
    pub fn with_fpk_dictionary<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.fpk_dictionary = path.as_ref().to_path_buf();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let config = DictionaryConfig::default();
        assert_eq!(config.qar_dictionary, PathBuf::from("qar_dictionary.txt"));
        assert_eq!(config.fpk_dictionary, PathBuf::from("fpk_dictionary.txt"));
    }

    #[test]
    fn test_builder() {
        let config = DictionaryConfig::in_dir("/opt/gzs")
            .with_fpk_dictionary("/tmp/names.txt");
        assert_eq!(
            config.qar_dictionary,
            Path::new("/opt/gzs").join("qar_dictionary.txt")
        );
        assert_eq!(config.fpk_dictionary, PathBuf::from("/tmp/names.txt"));
    }
}
