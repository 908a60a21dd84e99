//! Per-run identifiers and working directories.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::debug;

use crate::core::ids::validate_run_id;

/// Length of generated run ids, in hex characters.
pub const RUN_ID_LEN: usize = 8;

/// Random run id of [`RUN_ID_LEN`] lowercase hex characters.
pub fn generate_run_id() -> String {
    format!("{:0width$x}", rand::random::<u32>(), width = RUN_ID_LEN)
}

/// Use `requested` if given (after validation), otherwise generate a new id.
pub fn choose_run_id(requested: Option<&str>) -> Result<String> {
    match requested {
        Some(id) => {
            validate_run_id(id)?;
            Ok(id.to_string())
        }
        None => Ok(generate_run_id()),
    }
}

/// Create `<workspace_dir>/<run_id>`.
///
/// The run directory must not exist yet; an existing one is never reused.
pub fn allocate_workdir(workspace_dir: &Path, run_id: &str) -> Result<PathBuf> {
    validate_run_id(run_id)?;
    fs::create_dir_all(workspace_dir)
        .with_context(|| format!("create workspace {}", workspace_dir.display()))?;
    let workdir = workspace_dir.join(run_id);
    match fs::create_dir(&workdir) {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::AlreadyExists => {
            bail!("workdir {} already exists", workdir.display());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("create workdir {}", workdir.display()));
        }
    }
    debug!(workdir = %workdir.display(), "workdir allocated");
    Ok(workdir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_eight_hex_chars() {
        for _ in 0..32 {
            let id = generate_run_id();
            assert_eq!(id.len(), RUN_ID_LEN);
            assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn requested_id_is_validated() {
        assert_eq!(choose_run_id(Some("demo-1")).expect("id"), "demo-1");
        assert!(choose_run_id(Some("../escape")).is_err());
        assert_eq!(choose_run_id(None).expect("id").len(), RUN_ID_LEN);
    }

    #[test]
    fn allocates_fresh_directory_once() {
        let temp = tempfile::tempdir().expect("tempdir");
        let workspace = temp.path().join("workspace");
        let workdir = allocate_workdir(&workspace, "abcd1234").expect("allocate");
        assert_eq!(workdir, workspace.join("abcd1234"));
        assert!(workdir.is_dir());

        let err = allocate_workdir(&workspace, "abcd1234").unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }
}
