use std::fmt;

use serde::{Deserialize, Serialize};

use crate::options::Options;

/// A creator invocation: an identifier and the options it was called with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub identifier: String,
    pub options: Options,
}

impl Term {
    pub fn new(identifier: impl Into<String>, options: Options) -> Self {
        Self {
            identifier: identifier.into(),
            options,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier)?;
        if self.options.is_empty() {
            return Ok(());
        }

        f.write_str("(")?;
        for (i, (key, value)) in self.options.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{key}=\"")?;
            for c in value.chars() {
                if c == '"' || c == '\\' {
                    write!(f, "\\")?;
                }
                write!(f, "{c}")?;
            }
            f.write_str("\"")?;
        }
        f.write_str(")")
    }
}

/// Provenance of a codebase. Opaque to this crate; rendered for logs and
/// reproduction by callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodebaseExpression {
    creation: Term,
}

impl CodebaseExpression {
    pub fn new(creation: Term) -> Self {
        Self { creation }
    }

    pub fn creation(&self) -> &Term {
        &self.creation
    }
}

impl fmt::Display for CodebaseExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.creation.fmt(f)
    }
}
