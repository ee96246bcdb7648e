//! Codebase creation from local directories and tar archives.
//!
//! A codebase is a directory of source plus a project-space label and a
//! record of how it was produced. [`FileCodebaseCreator`] resolves the `path`
//! option: directories are used as they are, `.tar`/`.tar.gz` files are
//! expanded into a fresh directory first.
//!
//! # Example
//!
//! ```no_run
//! use codeshift_codebase::{CodebaseCreator, FileCodebaseCreator, Options};
//!
//! let mut options = Options::new();
//! options.insert("path".to_string(), "/srv/snapshots/project.tar.gz".to_string());
//!
//! let codebase = FileCodebaseCreator::new().create(&options)?;
//! assert_eq!(codebase.project_space(), "public");
//! # Ok::<(), codeshift_codebase::CodebaseCreationError>(())
//! ```

pub use self::codebase::Codebase;
pub use self::creator::{CodebaseCreator, FileCodebaseCreator};
pub use self::error::{CodebaseCreationError, ErrorKind, Result};
pub use self::expression::{CodebaseExpression, Term};
pub use self::fs::{FileSystem, HostFileSystem};
pub use self::options::{
    DEFAULT_PROJECT_SPACE, Options, PATH_OPTION, PROJECT_SPACE_OPTION, check_keys,
};

pub use codeshift_archive::{ExpandOptions, Expansion};

mod codebase;
mod creator;
mod error;
mod expression;
mod fs;
mod options;
