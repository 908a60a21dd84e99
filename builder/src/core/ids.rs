//! Identifier rules shared by run ids and skill ids.

use anyhow::{Result, bail};

/// Validate that an id is safe to use as a single path component.
pub fn validate_id(kind: &str, id: &str) -> Result<()> {
    if id.is_empty() {
        bail!("{kind} must not be empty");
    }
    if id == "." || id == ".." {
        bail!("{kind} must not be '.' or '..'");
    }
    if id
        .chars()
        .any(|c| !(c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-'))
    {
        bail!("{kind} must be [A-Za-z0-9._-] only (got '{id}')");
    }
    Ok(())
}

/// Validate a run id. Besides [`validate_id`], it must not start with `.`:
/// dot-names under the workspace are reserved for run artifacts.
pub fn validate_run_id(id: &str) -> Result<()> {
    validate_id("run id", id)?;
    if id.starts_with('.') {
        bail!("run id must not start with '.' (got '{id}')");
    }
    Ok(())
}
