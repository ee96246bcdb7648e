//! Error types for codebase creation.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum CodebaseCreationError {
    #[error("options contain invalid keys {invalid:?}, allowed keys are {allowed:?}")]
    InvalidOption {
        invalid: Vec<String>,
        allowed: Vec<String>,
    },

    #[error("please specify the mandatory '{option}' option for the file codebase creator")]
    MissingPath { option: &'static str },

    #[error("the specified codebase path \"{}\" does not exist", .path.display())]
    PathNotFound { path: PathBuf },

    #[error(
        "the '{option}' option of a file codebase creator must specify either a directory \
         or a .tar/.tar.gz archive, got \"{}\"",
        .path.display()
    )]
    UnsupportedSource { option: &'static str, path: PathBuf },

    #[error("could not extract archive \"{}\": {source}", .path.display())]
    ExtractionFailed {
        path: PathBuf,
        source: codeshift_archive::Error,
    },

    #[error("the {operation} operation is not available for a {creator}")]
    UnsupportedOperation {
        operation: &'static str,
        creator: &'static str,
    },
}

/// Which step of codebase creation failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidOption,
    MissingPath,
    PathNotFound,
    UnsupportedSource,
    ExtractionFailed,
    UnsupportedOperation,
}

impl CodebaseCreationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidOption { .. } => ErrorKind::InvalidOption,
            Self::MissingPath { .. } => ErrorKind::MissingPath,
            Self::PathNotFound { .. } => ErrorKind::PathNotFound,
            Self::UnsupportedSource { .. } => ErrorKind::UnsupportedSource,
            Self::ExtractionFailed { .. } => ErrorKind::ExtractionFailed,
            Self::UnsupportedOperation { .. } => ErrorKind::UnsupportedOperation,
        }
    }
}

pub type Result<T> = std::result::Result<T, CodebaseCreationError>;
