//! Archive expansion for file-sourced codebases.
//!
//! # Architecture
//!
//! - `format.rs` - Format sniffing and decompression codecs
//! - `sanitize.rs` - Path sanitization (zip-slip prevention)
//! - `extract.rs` - Entry-by-entry extraction into an existing directory
//! - `expand.rs` - Expansion of an archive file into a fresh directory
//! - `entry.rs` - Extraction report types
//! - `options.rs` - Expansion options and hashing

pub use entry::{ArchiveReport, Entry, EntryKind};
pub use error::{Error, Result};
pub use expand::{ExpandedArchive, Expansion, expand, expand_with_report};
pub use extract::extract_from_reader;
pub use format::{ArchiveFormat, TarCompress, detect_format, detect_from_reader};
pub use options::{ExpandOptions, HashStrategy};
pub use sanitize::{SanitizedPath, sanitize_path_with_options, sanitize_symlink_target};

pub mod entry;
mod error;
mod expand;
mod extract;
mod format;
pub mod options;
mod sanitize;
