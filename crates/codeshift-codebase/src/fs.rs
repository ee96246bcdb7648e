//! Filesystem capability used by codebase creators.

use std::path::Path;

use codeshift_archive::{ExpandOptions, Expansion};

/// The filesystem queries and the one mutating operation a creator needs.
///
/// Passed to creators explicitly so resolution can run against a fake.
pub trait FileSystem {
    /// Whether anything exists at `path`, including a dangling symlink.
    fn exists(&self, path: &Path) -> bool;
    fn is_directory(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    /// Expand an archive file into a new directory owned by the caller.
    fn expand_archive(&self, path: &Path) -> codeshift_archive::Result<Expansion>;
}

/// The real filesystem, expanding archives with `codeshift-archive`.
#[derive(Clone, Debug, Default)]
pub struct HostFileSystem {
    options: ExpandOptions,
}

impl HostFileSystem {
    pub fn new(options: ExpandOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExpandOptions {
        &self.options
    }
}

impl FileSystem for HostFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.symlink_metadata().is_ok()
    }

    fn is_directory(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn expand_archive(&self, path: &Path) -> codeshift_archive::Result<Expansion> {
        codeshift_archive::expand(path, &self.options)
    }
}
