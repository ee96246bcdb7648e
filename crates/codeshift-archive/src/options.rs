use std::io::Read;
use std::path::{Path, PathBuf};

use sha2::Digest;

use crate::Result;
use crate::error::Error;

const DEFAULT_PREFIX: &str = "codeshift-codebase-";

/// Options controlling where and how an archive is expanded.
#[derive(Clone, Debug)]
pub struct ExpandOptions {
    pub strip_components: usize,
    pub hash_strategy: HashStrategy,
    pub prefix: String,
    pub temp_root: Option<PathBuf>,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            strip_components: 0,
            hash_strategy: HashStrategy::default(),
            prefix: DEFAULT_PREFIX.to_string(),
            temp_root: None,
        }
    }
}

impl ExpandOptions {
    pub fn strip_components(mut self, n: usize) -> Self {
        self.strip_components = n;
        self
    }

    pub fn hash_strategy(mut self, strategy: HashStrategy) -> Self {
        self.hash_strategy = strategy;
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Parent directory for new expansion directories. Defaults to the
    /// system temp dir.
    pub fn temp_root(mut self, root: impl AsRef<Path>) -> Self {
        self.temp_root = Some(root.as_ref().to_path_buf());
        self
    }

    /// Create a fresh, uniquely named directory for one expansion.
    ///
    /// The directory is removed again when the returned guard is dropped.
    pub(crate) fn staging_dir(&self) -> Result<tempfile::TempDir> {
        let root = self.temp_root.clone().unwrap_or_else(std::env::temp_dir);
        tempfile::Builder::new()
            .prefix(&self.prefix)
            .tempdir_in(&root)
            .map_err(|source| Error::DirectoryCreationFailed { path: root, source })
    }
}

/// Hash computation strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum HashStrategy {
    #[default]
    None,
    Sha256,
}

impl HashStrategy {
    /// Compute hash from reader (streaming).
    pub fn compute<R: Read>(&self, mut reader: R) -> Result<Option<String>> {
        match self {
            Self::None => Ok(None),
            Self::Sha256 => {
                let mut hasher = sha2::Sha256::new();
                let mut buffer = [0u8; 8192];

                loop {
                    let n = reader.read(&mut buffer)?;
                    if n == 0 {
                        break;
                    }
                    hasher.update(&buffer[..n]);
                }

                Ok(Some(hex::encode(hasher.finalize())))
            }
        }
    }
}
