use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::expression::CodebaseExpression;

/// A resolved codebase directory.
///
/// The directory belongs to whoever receives the value. Creators never clean
/// it up, including directories they expanded from an archive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Codebase {
    directory: PathBuf,
    project_space: String,
    expression: CodebaseExpression,
}

impl Codebase {
    pub fn new(
        directory: impl Into<PathBuf>,
        project_space: impl Into<String>,
        expression: CodebaseExpression,
    ) -> Self {
        Self {
            directory: directory.into(),
            project_space: project_space.into(),
            expression,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn project_space(&self) -> &str {
        &self.project_space
    }

    pub fn expression(&self) -> &CodebaseExpression {
        &self.expression
    }
}

impl fmt::Display for Codebase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.expression.fmt(f)
    }
}
