//! Tar extraction into an existing directory.
//!
//! # Platform Behavior
//!
//! **Unix**: file mode bits from the archive are applied with owner
//! read/write and group/other read access always added.
//!
//! **Windows (non-Unix)**: mode bits are ignored. Symlinks are created as file
//! or directory links depending on what they point at.

use std::fs;
use std::io::{self, Read, Seek};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::entry::{ArchiveReport, Entry, EntryKind};
use crate::error::{Error, Result};
use crate::format::{self, ArchiveFormat};
use crate::options::{ExpandOptions, HashStrategy};
use crate::sanitize::{
    SanitizedPath, ensure_link_within_root, ensure_within_root, sanitize_path_with_options,
    sanitize_symlink_target,
};

/// Extract archive with automatic format detection.
///
/// Detects the archive format from the reader, rewinds it, and extracts all
/// entries below `destination`, which must already exist.
pub fn extract_from_reader<R: Read + Seek>(
    mut reader: R,
    destination: &Path,
    options: &ExpandOptions,
) -> Result<ArchiveReport> {
    let format = format::detect_from_reader(&mut reader)?.ok_or(Error::UnsupportedFormat)?;
    extract_with_format(reader, format, destination, options)
}

/// Extraction pipeline for an already identified format.
///
/// Sanitizes each entry path, writes it to disk, applies permissions and
/// computes content hashes if requested. Every write is checked against the
/// links already on disk, and symlinks are checked again once all entries are
/// in place.
pub(crate) fn extract_with_format<R: Read>(
    reader: R,
    format: ArchiveFormat,
    destination: &Path,
    options: &ExpandOptions,
) -> Result<ArchiveReport> {
    let ArchiveFormat::Tar(codec) = format;
    let mut archive = tar::Archive::new(codec.decoder(reader)?);
    let root = fs::canonicalize(destination).map_err(|e| Error::ExtractionFailed {
        path: destination.to_path_buf(),
        source: e,
    })?;
    let mut links = Vec::new();

    let mut entries = Vec::new();
    let mut total_bytes = 0u64;

    for raw in archive
        .entries()
        .map_err(|source| Error::Corrupted { source })?
    {
        let mut raw = raw.map_err(|source| Error::Corrupted { source })?;
        if let Some(entry) = write_entry(&mut raw, destination, &root, &mut links, options)? {
            total_bytes += entry.size;
            entries.push(entry);
        }
    }

    for (link, target) in &links {
        if let Err(e) = ensure_link_within_root(&root, link, target) {
            warn!(link = %link.display(), error = %e, "symlink escapes after extraction");
            return Err(e);
        }
    }

    Ok(ArchiveReport {
        format,
        entry_count: entries.len(),
        total_bytes,
        entries,
    })
}

fn write_entry<R: Read>(
    raw: &mut tar::Entry<'_, R>,
    destination: &Path,
    root: &Path,
    links: &mut Vec<(PathBuf, PathBuf)>,
    options: &ExpandOptions,
) -> Result<Option<Entry>> {
    let original_path = raw.path().map_err(|_| Error::InvalidPath)?.into_owned();
    let header = raw.header();
    let size = header.size().unwrap_or(0);
    let mode = header.mode().ok();
    let entry_type = header.entry_type();

    let kind = if entry_type.is_dir() {
        EntryKind::Directory
    } else if entry_type.is_symlink() || entry_type.is_hard_link() {
        let target = raw
            .link_name()
            .ok()
            .flatten()
            .ok_or(Error::InvalidPath)?
            .into_owned();
        if entry_type.is_symlink() {
            EntryKind::Symlink { target }
        } else {
            EntryKind::HardLink { target }
        }
    } else if entry_type.is_file() || entry_type.is_contiguous() {
        EntryKind::File
    } else {
        debug!(path = %original_path.display(), ?entry_type, "skipping unsupported entry type");
        return Ok(None);
    };

    let sanitized = match sanitize_path_with_options(&original_path, destination, options) {
        Ok(sanitized) => sanitized,
        Err(Error::NoComponentsRemaining { .. }) if kind == EntryKind::Directory => {
            debug!(path = %original_path.display(), "directory stripped away entirely");
            return Ok(None);
        }
        Err(e) => {
            warn!(path = %original_path.display(), error = %e, "rejecting archive entry");
            return Err(e);
        }
    };

    if sanitized.relative.as_os_str().is_empty() && kind != EntryKind::Directory {
        return Err(Error::InvalidPath);
    }

    let checked = match (&kind, sanitized.resolved.parent()) {
        (EntryKind::Directory, _) | (_, None) => sanitized.resolved.as_path(),
        (_, Some(parent)) => parent,
    };
    if let Err(e) = ensure_within_root(root, checked, &original_path) {
        warn!(path = %original_path.display(), error = %e, "entry resolves outside destination");
        return Err(e);
    }
    if kind != EntryKind::Directory {
        remove_existing(&sanitized.resolved)?;
    }

    let mut hash = None;
    match &kind {
        EntryKind::Directory => ensure_directory(&sanitized.resolved)?,
        EntryKind::File => {
            write_file(raw, &sanitized.resolved)?;
            apply_mode(&sanitized.resolved, mode)?;
            if options.hash_strategy != HashStrategy::None {
                let file = fs::File::open(&sanitized.resolved)?;
                hash = options.hash_strategy.compute(file)?;
            }
        }
        EntryKind::Symlink { target } => {
            if let Err(e) = sanitize_symlink_target(target, &sanitized, destination) {
                warn!(path = %original_path.display(), error = %e, "rejecting symlink entry");
                return Err(e);
            }
            if let Err(e) = ensure_link_within_root(root, &sanitized.resolved, target) {
                warn!(path = %original_path.display(), error = %e, "rejecting symlink entry");
                return Err(e);
            }
            ensure_parent(&sanitized.resolved)?;
            write_symlink(target, &sanitized.resolved)?;
            links.push((sanitized.resolved.clone(), target.clone()));
        }
        EntryKind::HardLink { target } => {
            let source = sanitize_path_with_options(target, destination, options)?;
            if let Some(parent) = source.resolved.parent() {
                ensure_within_root(root, parent, target)?;
            }
            write_hard_link(&source, &sanitized.resolved)?;
        }
    }

    let mut entry =
        Entry::new(original_path, size, mode, kind).with_target_path(sanitized.resolved);
    if let Some(hash) = hash {
        entry = entry.with_hash(hash);
    }
    Ok(Some(entry))
}

fn write_file<R: Read>(reader: &mut R, target_path: &Path) -> Result<()> {
    ensure_parent(target_path)?;

    let mut file = fs::File::create(target_path).map_err(|e| Error::ExtractionFailed {
        path: target_path.to_path_buf(),
        source: e,
    })?;
    io::copy(reader, &mut file).map_err(|e| Error::ExtractionFailed {
        path: target_path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

/// Replace rather than write through whatever non-directory an earlier entry
/// left at `path`.
fn remove_existing(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(metadata) if !metadata.is_dir() => {
            fs::remove_file(path).map_err(|e| Error::ExtractionFailed {
                path: path.to_path_buf(),
                source: e,
            })
        }
        _ => Ok(()),
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) => ensure_directory(parent),
        None => Ok(()),
    }
}

fn ensure_directory(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| Error::DirectoryCreationFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}

fn write_hard_link(source: &SanitizedPath, link: &Path) -> Result<()> {
    ensure_parent(link)?;
    fs::hard_link(&source.resolved, link).map_err(|e| Error::LinkCreationFailed {
        target: source.resolved.clone(),
        link: link.to_path_buf(),
        source: e,
    })
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: Option<u32>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let Some(mode) = mode else {
        return Ok(());
    };
    let mode = (mode | 0o644) & 0o777;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| {
        Error::ExtractionFailed {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: Option<u32>) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
fn write_symlink(target: &Path, link: &Path) -> Result<()> {
    use std::os::unix::fs::symlink;
    symlink(target, link).map_err(|e| Error::SymlinkCreationFailed {
        target: target.to_path_buf(),
        link: link.to_path_buf(),
        source: e,
    })
}

#[cfg(windows)]
fn write_symlink(target: &Path, link: &Path) -> Result<()> {
    use std::os::windows::fs;
    let resolved = link.parent().map(|p| p.join(target));
    let is_dir_target = resolved.is_some_and(|p| p.is_dir())
        || target.to_string_lossy().ends_with('/');
    let result = if is_dir_target {
        fs::symlink_dir(target, link)
    } else {
        fs::symlink_file(target, link)
    };
    result.map_err(|e| Error::SymlinkCreationFailed {
        target: target.to_path_buf(),
        link: link.to_path_buf(),
        source: e,
    })
}

#[cfg(not(any(unix, windows)))]
fn write_symlink(target: &Path, link: &Path) -> Result<()> {
    Err(Error::SymlinkCreationFailed {
        target: target.to_path_buf(),
        link: link.to_path_buf(),
        source: io::Error::new(io::ErrorKind::Unsupported, "symlinks unsupported on this platform"),
    })
}
