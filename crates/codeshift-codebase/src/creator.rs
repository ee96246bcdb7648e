//! Codebase creators.
//!
//! A creator turns a set of options into a [`Codebase`]. Source kinds differ
//! in what else they can report: `project_space` returns
//! `UnsupportedOperation` for creators that cannot answer it, so callers
//! handle the gap instead of assuming every creator supports it.

use std::path::{Path, PathBuf};

use codeshift_archive::Expansion;
use tracing::debug;

use crate::codebase::Codebase;
use crate::error::{CodebaseCreationError, Result};
use crate::expression::{CodebaseExpression, Term};
use crate::fs::{FileSystem, HostFileSystem};
use crate::options::{DEFAULT_PROJECT_SPACE, Options, PATH_OPTION, PROJECT_SPACE_OPTION, check_keys};

pub trait CodebaseCreator {
    fn create(&self, options: &Options) -> Result<Codebase>;

    /// The project space of codebases this creator produces, if it knows it
    /// without a specific set of options.
    fn project_space(&self) -> Result<String>;
}

/// Creates codebases from a local directory or a `.tar`/`.tar.gz` archive.
#[derive(Clone, Debug, Default)]
pub struct FileCodebaseCreator<F = HostFileSystem> {
    fs: F,
}

impl FileCodebaseCreator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<F: FileSystem> FileCodebaseCreator<F> {
    const NAME: &'static str = "file codebase creator";
    const TERM: &'static str = "file";

    pub fn with_file_system(fs: F) -> Self {
        Self { fs }
    }

    pub fn file_system(&self) -> &F {
        &self.fs
    }

    /// Resolve `source` to a codebase directory.
    ///
    /// Directories are returned as they are (made absolute, never copied).
    /// Regular files are expanded if they are archives.
    pub fn codebase_path(&self, source: &Path) -> Result<PathBuf> {
        if !self.fs.exists(source) {
            return Err(CodebaseCreationError::PathNotFound {
                path: source.to_path_buf(),
            });
        }

        if self.fs.is_directory(source) {
            debug!(source = %source.display(), "using directory as codebase");
            return Ok(std::path::absolute(source).unwrap_or_else(|_| source.to_path_buf()));
        }

        if self.fs.is_file(source) {
            match self.fs.expand_archive(source) {
                Ok(Expansion::Extracted(directory)) => {
                    debug!(
                        source = %source.display(),
                        directory = %directory.display(),
                        "using expanded archive as codebase"
                    );
                    return Ok(directory);
                }
                Ok(Expansion::NotAnArchive) => {
                    debug!(source = %source.display(), "regular file is not an archive");
                }
                Err(e) => {
                    return Err(CodebaseCreationError::ExtractionFailed {
                        path: source.to_path_buf(),
                        source: e,
                    });
                }
            }
        }

        Err(CodebaseCreationError::UnsupportedSource {
            option: PATH_OPTION,
            path: source.to_path_buf(),
        })
    }
}

impl<F: FileSystem> CodebaseCreator for FileCodebaseCreator<F> {
    fn create(&self, options: &Options) -> Result<Codebase> {
        check_keys(options, &[PATH_OPTION, PROJECT_SPACE_OPTION])?;

        let source = options
            .get(PATH_OPTION)
            .filter(|path| !path.trim().is_empty())
            .ok_or(CodebaseCreationError::MissingPath {
                option: PATH_OPTION,
            })?;

        let directory = self.codebase_path(Path::new(source))?;
        let project_space = options
            .get(PROJECT_SPACE_OPTION)
            .map_or(DEFAULT_PROJECT_SPACE, String::as_str);
        let expression = CodebaseExpression::new(Term::new(Self::TERM, options.clone()));

        debug!(%expression, directory = %directory.display(), project_space, "created codebase");
        Ok(Codebase::new(directory, project_space, expression))
    }

    /// Always unsupported: the project space is only known per `create` call
    /// and this creator keeps no per-call state.
    fn project_space(&self) -> Result<String> {
        Err(CodebaseCreationError::UnsupportedOperation {
            operation: "project_space",
            creator: Self::NAME,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;
    use crate::error::ErrorKind;

    #[derive(Clone, Copy)]
    enum Node {
        Directory,
        File,
        Archive,
        BrokenArchive,
        Special,
    }

    #[derive(Default)]
    struct FakeFileSystem {
        nodes: HashMap<PathBuf, Node>,
        expanded: RefCell<Vec<PathBuf>>,
    }

    impl FakeFileSystem {
        fn with(mut self, path: &Path, node: Node) -> Self {
            self.nodes.insert(path.to_path_buf(), node);
            self
        }
    }

    impl FileSystem for FakeFileSystem {
        fn exists(&self, path: &Path) -> bool {
            self.nodes.contains_key(path)
        }

        fn is_directory(&self, path: &Path) -> bool {
            matches!(self.nodes.get(path), Some(Node::Directory))
        }

        fn is_file(&self, path: &Path) -> bool {
            matches!(
                self.nodes.get(path),
                Some(Node::File | Node::Archive | Node::BrokenArchive)
            )
        }

        fn expand_archive(&self, path: &Path) -> codeshift_archive::Result<Expansion> {
            match self.nodes.get(path) {
                Some(Node::Archive) => {
                    let mut expanded = self.expanded.borrow_mut();
                    let dir = root().join(format!("expanded-{}", expanded.len()));
                    expanded.push(dir.clone());
                    Ok(Expansion::Extracted(dir))
                }
                Some(Node::BrokenArchive) => Err(codeshift_archive::Error::Corrupted {
                    source: std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated"),
                }),
                _ => Ok(Expansion::NotAnArchive),
            }
        }
    }

    fn root() -> PathBuf {
        std::env::temp_dir().join("codeshift-fake")
    }

    fn options(pairs: &[(&str, &str)]) -> Options {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn path_options(path: &Path) -> Options {
        options(&[("path", path.to_str().unwrap())])
    }

    fn kind_of(result: Result<Codebase>) -> ErrorKind {
        result.expect_err("creation should fail").kind()
    }

    #[test]
    fn directory_is_used_as_is() {
        let dir = root().join("project");
        let creator = FileCodebaseCreator::with_file_system(
            FakeFileSystem::default().with(&dir, Node::Directory),
        );

        let codebase = creator.create(&path_options(&dir)).unwrap();
        assert_eq!(codebase.directory(), dir);
        assert_eq!(codebase.project_space(), "public");
        assert!(creator.file_system().expanded.borrow().is_empty());
    }

    #[test]
    fn archive_is_expanded() {
        let archive = root().join("project.tar.gz");
        let creator = FileCodebaseCreator::with_file_system(
            FakeFileSystem::default().with(&archive, Node::Archive),
        );

        let codebase = creator.create(&path_options(&archive)).unwrap();
        assert_eq!(codebase.directory(), root().join("expanded-0"));
        assert_ne!(codebase.directory(), archive);
    }

    #[test]
    fn projectspace_is_passed_through() {
        let dir = root().join("project");
        let creator = FileCodebaseCreator::with_file_system(
            FakeFileSystem::default().with(&dir, Node::Directory),
        );
        let opts = options(&[("path", dir.to_str().unwrap()), ("projectspace", "internal")]);

        let codebase = creator.create(&opts).unwrap();
        assert_eq!(codebase.project_space(), "internal");
        assert_eq!(codebase.expression().creation(), &Term::new("file", opts));
    }

    #[test]
    fn unknown_option_is_rejected_before_touching_fs() {
        let creator = FileCodebaseCreator::with_file_system(FakeFileSystem::default());
        let opts = options(&[("path", "/anything"), ("revision", "7")]);
        assert_eq!(kind_of(creator.create(&opts)), ErrorKind::InvalidOption);
    }

    #[test]
    fn missing_or_blank_path() {
        let creator = FileCodebaseCreator::with_file_system(FakeFileSystem::default());
        for opts in [
            Options::new(),
            options(&[("projectspace", "internal")]),
            options(&[("path", "")]),
            options(&[("path", "  \t")]),
        ] {
            assert_eq!(kind_of(creator.create(&opts)), ErrorKind::MissingPath);
        }
    }

    #[test]
    fn nonexistent_path() {
        let creator = FileCodebaseCreator::with_file_system(FakeFileSystem::default());
        let opts = path_options(&root().join("missing"));
        assert_eq!(kind_of(creator.create(&opts)), ErrorKind::PathNotFound);
    }

    #[test]
    fn plain_file_is_unsupported() {
        let file = root().join("notes.txt");
        let creator = FileCodebaseCreator::with_file_system(
            FakeFileSystem::default().with(&file, Node::File),
        );
        assert_eq!(
            kind_of(creator.create(&path_options(&file))),
            ErrorKind::UnsupportedSource
        );
    }

    #[test]
    fn special_file_is_unsupported() {
        let fifo = root().join("pipe");
        let creator = FileCodebaseCreator::with_file_system(
            FakeFileSystem::default().with(&fifo, Node::Special),
        );
        assert_eq!(
            kind_of(creator.create(&path_options(&fifo))),
            ErrorKind::UnsupportedSource
        );
        assert!(creator.file_system().expanded.borrow().is_empty());
    }

    #[test]
    fn extraction_errors_keep_path_and_cause() {
        let archive = root().join("broken.tar");
        let creator = FileCodebaseCreator::with_file_system(
            FakeFileSystem::default().with(&archive, Node::BrokenArchive),
        );

        let err = creator.create(&path_options(&archive)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExtractionFailed);
        let message = err.to_string();
        assert!(message.contains(archive.to_str().unwrap()));
        assert!(message.contains("truncated"));
    }

    #[test]
    fn project_space_is_unsupported() {
        let dir = root().join("project");
        let creator = FileCodebaseCreator::with_file_system(
            FakeFileSystem::default().with(&dir, Node::Directory),
        );
        assert_eq!(
            creator.project_space().unwrap_err().kind(),
            ErrorKind::UnsupportedOperation
        );

        creator.create(&path_options(&dir)).unwrap();
        assert_eq!(
            creator.project_space().unwrap_err().kind(),
            ErrorKind::UnsupportedOperation
        );
    }

    #[test]
    fn repeated_creation_from_directory_is_deterministic() {
        let dir = root().join("project");
        let creator = FileCodebaseCreator::with_file_system(
            FakeFileSystem::default().with(&dir, Node::Directory),
        );
        let opts = path_options(&dir);
        assert_eq!(creator.create(&opts).unwrap(), creator.create(&opts).unwrap());
    }

    #[test]
    fn relative_directory_is_made_absolute_against_cwd() {
        let relative = Path::new("relative/project");
        let creator = FileCodebaseCreator::with_file_system(
            FakeFileSystem::default().with(relative, Node::Directory),
        );

        let codebase = creator.create(&path_options(relative)).unwrap();
        assert!(codebase.directory().is_absolute());
        assert_eq!(
            codebase.directory(),
            std::env::current_dir().unwrap().join("relative/project")
        );
        assert_eq!(
            codebase.expression().creation().options["path"],
            "relative/project"
        );
    }

    #[cfg(unix)]
    #[test]
    fn relative_directory_is_not_normalized() {
        let relative = Path::new("relative/../project");
        let creator = FileCodebaseCreator::with_file_system(
            FakeFileSystem::default().with(relative, Node::Directory),
        );

        let codebase = creator.create(&path_options(relative)).unwrap();
        assert_eq!(
            codebase.directory(),
            std::env::current_dir().unwrap().join("relative/../project")
        );
    }
}
