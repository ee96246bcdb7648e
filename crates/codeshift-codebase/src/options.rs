use std::collections::BTreeMap;

use crate::error::{CodebaseCreationError, Result};

/// Creation options, keyed by option name.
pub type Options = BTreeMap<String, String>;

pub const PATH_OPTION: &str = "path";
pub const PROJECT_SPACE_OPTION: &str = "projectspace";
pub const DEFAULT_PROJECT_SPACE: &str = "public";

/// Fail with `InvalidOption` if `options` holds any key outside `allowed`.
pub fn check_keys(options: &Options, allowed: &[&str]) -> Result<()> {
    let invalid: Vec<String> = options
        .keys()
        .filter(|key| !allowed.contains(&key.as_str()))
        .cloned()
        .collect();

    if invalid.is_empty() {
        return Ok(());
    }

    Err(CodebaseCreationError::InvalidOption {
        invalid,
        allowed: allowed.iter().map(|key| key.to_string()).collect(),
    })
}
