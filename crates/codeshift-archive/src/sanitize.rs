use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};
use crate::options::ExpandOptions;

/// Result of sanitizing an archive entry path.
#[derive(Clone, Debug)]
pub struct SanitizedPath {
    pub original: PathBuf,
    /// Path below the extraction root after normalization and stripping.
    pub relative: PathBuf,
    pub resolved: PathBuf,
}

/// Sanitize an entry path for extraction below `base`.
///
/// Combines path normalization, component stripping, and zip-slip checks.
pub fn sanitize_path_with_options<P: AsRef<Path>, B: AsRef<Path>>(
    entry_path: P,
    base: B,
    options: &ExpandOptions,
) -> Result<SanitizedPath> {
    let entry_path = entry_path.as_ref();
    let base = base.as_ref();

    if entry_path.is_absolute() || entry_path.has_root() {
        return Err(Error::ZipSlip {
            entry: entry_path.to_path_buf(),
            resolved: entry_path.to_path_buf(),
        });
    }

    let normalized = normalize_relative(entry_path).ok_or_else(|| Error::ZipSlip {
        entry: entry_path.to_path_buf(),
        resolved: base.join(entry_path),
    })?;

    let relative = if options.strip_components > 0 {
        strip_components(&normalized, options.strip_components)?
    } else {
        normalized
    };

    Ok(SanitizedPath {
        original: entry_path.to_path_buf(),
        resolved: base.join(&relative),
        relative,
    })
}

/// Check that a symlink target stays inside `base` when followed from `link`.
///
/// Returns the absolute location the link points at.
pub fn sanitize_symlink_target<T: AsRef<Path>>(
    target: T,
    link: &SanitizedPath,
    base: &Path,
) -> Result<PathBuf> {
    let target = target.as_ref();

    if target.is_absolute() || target.has_root() {
        return Err(Error::AbsoluteSymlinkTarget {
            target: target.to_path_buf(),
            symlink: link.resolved.clone(),
        });
    }

    let joined = link
        .relative
        .parent()
        .map(|parent| parent.join(target))
        .unwrap_or_else(|| target.to_path_buf());

    let normalized = normalize_relative(&joined).ok_or_else(|| Error::SymlinkEscape {
        target: target.to_path_buf(),
        resolved: base.join(&joined),
    })?;

    Ok(base.join(normalized))
}

/// Fail unless `path`, resolved through whatever is already on disk, lies
/// inside `root`. `root` must be canonical.
///
/// Catches links written by earlier entries that the lexical checks above
/// cannot see.
pub(crate) fn ensure_within_root(root: &Path, path: &Path, entry: &Path) -> Result<()> {
    let resolved = resolve_on_disk(path)?;
    if resolved.starts_with(root) {
        return Ok(());
    }
    Err(Error::ZipSlip {
        entry: entry.to_path_buf(),
        resolved,
    })
}

/// Like [`ensure_within_root`], for the location a symlink points at.
pub(crate) fn ensure_link_within_root(root: &Path, link: &Path, target: &Path) -> Result<()> {
    let pointee = link
        .parent()
        .map(|parent| parent.join(target))
        .unwrap_or_else(|| target.to_path_buf());
    let resolved = resolve_on_disk(&pointee)?;
    if resolved.starts_with(root) {
        return Ok(());
    }
    Err(Error::SymlinkEscape {
        target: target.to_path_buf(),
        resolved,
    })
}

/// Canonicalize the longest existing prefix of `path` and append the rest
/// lexically.
pub(crate) fn resolve_on_disk(path: &Path) -> Result<PathBuf> {
    let mut existing = path;
    let mut rest = Vec::new();

    loop {
        match fs::canonicalize(existing) {
            Ok(mut resolved) => {
                for component in rest.iter().rev() {
                    match component {
                        Component::ParentDir => {
                            resolved.pop();
                        }
                        Component::CurDir => {}
                        other => resolved.push(other.as_os_str()),
                    }
                }
                return Ok(resolved);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let mut components = existing.components();
                let Some(last) = components.next_back() else {
                    return Err(e.into());
                };
                rest.push(last);
                existing = components.as_path();
                if existing.as_os_str().is_empty() {
                    return Err(e.into());
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Strip leading path components.
fn strip_components(path: &Path, count: usize) -> Result<PathBuf> {
    let components: Vec<_> = path.components().collect();
    if components.len() <= count {
        return Err(Error::NoComponentsRemaining {
            original: path.to_path_buf(),
            count,
        });
    }
    Ok(components[count..].iter().collect())
}

/// Resolve `.` and `..` lexically. `None` if the path climbs above its start
/// or carries a root.
fn normalize_relative(path: &Path) -> Option<PathBuf> {
    let mut result = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Normal(part) => result.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !result.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_base_path() -> &'static Path {
        if cfg!(windows) {
            Path::new("C:/tmp/codebase")
        } else {
            Path::new("/tmp/codebase")
        }
    }

    #[test]
    fn basic_path_sanitization() {
        let options = ExpandOptions::default();
        let result = sanitize_path_with_options("src/lib.rs", test_base_path(), &options).unwrap();
        assert_eq!(result.original, Path::new("src/lib.rs"));
        assert_eq!(result.relative, Path::new("src/lib.rs"));
        assert_eq!(result.resolved, test_base_path().join("src/lib.rs"));
    }

    #[test]
    fn inner_parent_dirs_are_resolved() {
        let options = ExpandOptions::default();
        let result =
            sanitize_path_with_options("./src/../docs/a.md", test_base_path(), &options).unwrap();
        assert_eq!(result.relative, Path::new("docs/a.md"));
    }

    #[test]
    fn path_with_component_stripping() {
        let options = ExpandOptions::default().strip_components(1);
        let result =
            sanitize_path_with_options("project-1.0/src/lib.rs", test_base_path(), &options)
                .unwrap();
        let relative_part = result.resolved.strip_prefix(test_base_path()).unwrap();
        assert_eq!(relative_part, Path::new("src/lib.rs"));
    }

    #[test]
    fn stripping_everything_fails() {
        let options = ExpandOptions::default().strip_components(1);
        let result = sanitize_path_with_options("project-1.0", test_base_path(), &options);
        assert!(matches!(result, Err(Error::NoComponentsRemaining { count: 1, .. })));
    }

    #[test]
    fn absolute_entry_rejected() {
        let options = ExpandOptions::default();
        let malicious_path = if cfg!(windows) { "C:\\etc\\passwd" } else { "/etc/passwd" };
        let result = sanitize_path_with_options(malicious_path, test_base_path(), &options);
        assert!(matches!(result, Err(Error::ZipSlip { .. })));
    }

    #[test]
    fn escaping_entry_rejected() {
        let options = ExpandOptions::default();
        let result = sanitize_path_with_options("src/../../etc/passwd", test_base_path(), &options);
        assert!(matches!(result, Err(Error::ZipSlip { .. })));
    }

    #[test]
    fn symlink_target_inside_base() {
        let options = ExpandOptions::default();
        let link = sanitize_path_with_options("bin/tool", test_base_path(), &options).unwrap();
        let result = sanitize_symlink_target("../lib/tool", &link, test_base_path()).unwrap();
        assert_eq!(result, test_base_path().join("lib/tool"));
    }

    #[test]
    fn symlink_target_escaping_base() {
        let options = ExpandOptions::default();
        let link = sanitize_path_with_options("bin/tool", test_base_path(), &options).unwrap();
        let result = sanitize_symlink_target("../../outside", &link, test_base_path());
        assert!(matches!(result, Err(Error::SymlinkEscape { .. })));
    }

    #[test]
    fn symlink_absolute_path_rejected() {
        let options = ExpandOptions::default();
        let absolute_target = if cfg!(windows) { "C:\\etc\\passwd" } else { "/etc/passwd" };
        let link = sanitize_path_with_options("bin/tool", test_base_path(), &options).unwrap();
        let result = sanitize_symlink_target(absolute_target, &link, test_base_path());
        assert!(matches!(result, Err(Error::AbsoluteSymlinkTarget { .. })));
    }

    #[test]
    fn normalization() {
        assert_eq!(
            normalize_relative(Path::new("foo//bar/./baz/../qux")),
            Some(PathBuf::from("foo/bar/qux"))
        );
        assert_eq!(normalize_relative(Path::new("../x")), None);
    }

    #[test]
    fn component_stripping() {
        let result = strip_components(Path::new("a/b/c/d"), 2).unwrap();
        assert_eq!(result, Path::new("c/d"));
    }

    #[test]
    fn on_disk_resolution_appends_missing_tail() {
        let dir = tempfile::tempdir().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        let resolved = resolve_on_disk(&dir.path().join("new/deeper/../file")).unwrap();
        assert_eq!(resolved, root.join("new/file"));
    }

    #[cfg(unix)]
    #[test]
    fn on_disk_check_follows_existing_links() {
        let dir = tempfile::tempdir().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        let inside = root.join("inside");
        fs::create_dir(&inside).unwrap();
        std::os::unix::fs::symlink("..", inside.join("up")).unwrap();

        assert!(ensure_within_root(&inside, &inside.join("file"), Path::new("file")).is_ok());
        let escaped = ensure_within_root(&inside, &inside.join("up/file"), Path::new("up/file"));
        assert!(matches!(escaped, Err(Error::ZipSlip { .. })));
        assert!(ensure_within_root(&root, &inside.join("up/file"), Path::new("up/file")).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn on_disk_link_check_rejects_chained_escape() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base");
        fs::create_dir_all(base.join("d")).unwrap();
        std::os::unix::fs::symlink("..", base.join("d/x")).unwrap();
        let root = fs::canonicalize(&base).unwrap();

        let result = ensure_link_within_root(&root, &base.join("a"), Path::new("d/x/.."));
        assert!(matches!(result, Err(Error::SymlinkEscape { .. })));
        assert!(ensure_link_within_root(&root, &base.join("a"), Path::new("d/x")).is_ok());
    }
}
