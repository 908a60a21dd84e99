//! Run artifacts under `<workspace_dir>/.runs/<run_id>/`.
//!
//! Artifacts are for humans inspecting a run after the fact. They never
//! influence the delivery outcome: write failures are logged and swallowed.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::warn;

pub const GENERATE_PROMPT: &str = "generate.prompt.md";
pub const DEVELOPER_LOG: &str = "developer.log";
pub const REVIEW_REPORT: &str = "review.json";
pub const FIX_PROMPT: &str = "fix.prompt.md";
pub const DELIVERY: &str = "delivery.json";

/// Artifact sink for one run.
#[derive(Debug, Clone)]
pub struct RunLog {
    dir: PathBuf,
}

impl RunLog {
    pub fn new(runs_dir: &Path, run_id: &str) -> Self {
        Self {
            dir: runs_dir.join(run_id),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn record_text(&self, name: &str, contents: &str) {
        if let Err(err) = self.write_text(name, contents) {
            warn!(artifact = name, err = %format!("{err:#}"), "failed to write run artifact");
        }
    }

    pub fn record_json<T: Serialize>(&self, name: &str, value: &T) {
        let result = serde_json::to_string_pretty(value)
            .context("serialize artifact")
            .and_then(|mut buf| {
                buf.push('\n');
                self.write_text(name, &buf)
            });
        if let Err(err) = result {
            warn!(artifact = name, err = %format!("{err:#}"), "failed to write run artifact");
        }
    }

    fn write_text(&self, name: &str, contents: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create run log dir {}", self.dir.display()))?;
        let path = self.path(name);
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))
    }
}
