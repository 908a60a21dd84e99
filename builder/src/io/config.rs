//! Builder configuration stored in `builder.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Stack used when a skill does not name one.
pub const DEFAULT_STACK: &str = "Vite + React + Tailwind CSS";

/// Builder configuration (TOML).
///
/// Intended to be edited by humans. Missing fields default to the values the
/// bundled skills were written against. Relative paths are resolved against
/// the directory holding the config file (see [`BuilderConfig::resolve_paths`]).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BuilderConfig {
    /// Parent directory for per-run working directories.
    pub workspace_dir: PathBuf,
    /// Directory of `<skill-id>.toml` templates.
    pub skills_dir: PathBuf,
    /// Directory holding `system_prompt.txt` and `qa_prompt.txt`.
    pub prompts_dir: PathBuf,
    /// Directory of `*/SKILL.md` review rule documents.
    pub knowledge_dir: PathBuf,

    pub default_stack: String,
    pub package_manager: String,
    pub build_command: String,
    pub dev_command: String,

    pub agent: AgentConfig,
}

/// Settings for the bundled command-line agent backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Agent CLI and leading arguments (e.g. `["codex","exec"]`).
    pub command: Vec<String>,
    /// Model identifier passed with `-m`. Empty leaves the CLI default.
    pub model: String,
    /// Exported to the agent as `OPENAI_BASE_URL` when non-empty.
    pub base_url: String,
    /// Name of the environment variable holding the API key. `builder run`
    /// refuses to start when it is unset; empty disables the check.
    pub api_key_env: String,
    /// Wall-clock limit for a single agent call.
    pub timeout_secs: u64,
    /// Truncate captured agent stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "codex".to_string(),
                "exec".to_string(),
                "--skip-git-repo-check".to_string(),
            ],
            model: String::new(),
            base_url: String::new(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 30 * 60,
            output_limit_bytes: 200_000,
        }
    }
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            workspace_dir: PathBuf::from("workspace"),
            skills_dir: PathBuf::from("skills"),
            prompts_dir: PathBuf::from("prompts"),
            knowledge_dir: PathBuf::from("agent-skills"),
            default_stack: DEFAULT_STACK.to_string(),
            package_manager: "npm".to_string(),
            build_command: "npm run build".to_string(),
            dev_command: "npm run dev".to_string(),
            agent: AgentConfig::default(),
        }
    }
}

impl BuilderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.default_stack.trim().is_empty() {
            return Err(anyhow!("default_stack must be non-empty"));
        }
        if self.build_command.trim().is_empty() {
            return Err(anyhow!("build_command must be non-empty"));
        }
        if self.agent.command.is_empty() || self.agent.command[0].trim().is_empty() {
            return Err(anyhow!("agent.command must be a non-empty array"));
        }
        if self.agent.timeout_secs == 0 {
            return Err(anyhow!("agent.timeout_secs must be > 0"));
        }
        if self.agent.output_limit_bytes == 0 {
            return Err(anyhow!("agent.output_limit_bytes must be > 0"));
        }
        Ok(())
    }

    /// Make every relative directory absolute with respect to `base`.
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        for dir in [
            &mut self.workspace_dir,
            &mut self.skills_dir,
            &mut self.prompts_dir,
            &mut self.knowledge_dir,
        ] {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }
        self
    }

    /// Where per-run artifacts are written (outside any agent's workdir).
    pub fn runs_log_dir(&self) -> PathBuf {
        self.workspace_dir.join(".runs")
    }
}

/// Load config from a TOML file and resolve its relative paths.
///
/// If the file is missing, returns `BuilderConfig::default()` resolved
/// against the file's parent directory.
pub fn load_config(path: &Path) -> Result<BuilderConfig> {
    let base = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    if !path.exists() {
        let cfg = BuilderConfig::default();
        cfg.validate()?;
        return Ok(cfg.resolve_paths(base));
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: BuilderConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg.resolve_paths(base))
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &BuilderConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
