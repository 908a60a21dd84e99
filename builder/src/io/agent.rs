//! Agent capability used by both adapters.
//!
//! The [`Agent`] trait is the only seam between the workflow and the language
//! model runtime: given a system instruction, a tool scope confined to one
//! directory, a message and an optional output schema, it returns a response.
//! [`CommandAgent`] drives an agent CLI (`codex exec` by default). Tests use
//! scripted agents that return queued responses without spawning processes.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::io::config::AgentConfig;
use crate::io::process::run_with_deadline;

/// A tool the agent runtime may expose to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCapability {
    Shell,
    FileRead,
    FileWrite,
}

/// Tools granted to one call, all confined to `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolScope {
    pub root: PathBuf,
    pub capabilities: Vec<ToolCapability>,
}

impl ToolScope {
    /// Confine `capabilities` to `root`.
    ///
    /// The root must be an existing directory; it is canonicalized so the
    /// backend sees one unambiguous path.
    pub fn confined(root: &Path, capabilities: &[ToolCapability]) -> Result<Self> {
        if !root.is_dir() {
            bail!("tool root {} is not a directory", root.display());
        }
        let root = root
            .canonicalize()
            .with_context(|| format!("canonicalize tool root {}", root.display()))?;
        Ok(Self {
            root,
            capabilities: capabilities.to_vec(),
        })
    }

    pub fn allows(&self, capability: ToolCapability) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// One call to the agent capability.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    pub system_instruction: String,
    pub scope: ToolScope,
    pub message: String,
    /// JSON Schema the final answer must follow, if any.
    pub output_schema: Option<String>,
}

/// Payload of an agent response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseContent {
    Text(String),
    /// The backend already decoded the answer as JSON.
    Structured(Value),
}

impl ResponseContent {
    /// True when the payload carries nothing usable.
    pub fn is_blank(&self) -> bool {
        match self {
            ResponseContent::Text(text) => text.trim().is_empty(),
            ResponseContent::Structured(value) => value.is_null(),
        }
    }

    /// Text form for logs and for adapters that treat the answer as opaque.
    pub fn to_text(&self) -> String {
        match self {
            ResponseContent::Text(text) => text.clone(),
            ResponseContent::Structured(value) => value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentResponse {
    pub content: Option<ResponseContent>,
}

impl AgentResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: Some(ResponseContent::Text(text.into())),
        }
    }

    pub fn structured(value: Value) -> Self {
        Self {
            content: Some(ResponseContent::Structured(value)),
        }
    }

    pub fn empty() -> Self {
        Self { content: None }
    }
}

/// Abstraction over agent runtimes.
pub trait Agent {
    /// Perform one blocking round-trip. Errors mean the call itself failed.
    fn invoke(&self, request: &AgentRequest) -> Result<AgentResponse>;
}

/// Agent backed by a command-line agent runtime.
///
/// The child runs with its working directory set to the scope root and a
/// sandbox mode derived from the granted capabilities. Credentials are passed
/// only through the child's environment.
#[derive(Debug, Clone)]
pub struct CommandAgent {
    config: AgentConfig,
    api_key: Option<String>,
}

impl CommandAgent {
    pub fn new(config: AgentConfig, api_key: Option<String>) -> Self {
        Self { config, api_key }
    }

    fn build_command(
        &self,
        request: &AgentRequest,
        schema_path: Option<&Path>,
        answer_path: &Path,
    ) -> Result<Command> {
        let (program, args) = self
            .config
            .command
            .split_first()
            .ok_or_else(|| anyhow!("agent.command must be a non-empty array"))?;
        let mut cmd = Command::new(program);
        cmd.args(args)
            .arg("--sandbox")
            .arg(sandbox_mode(&request.scope))
            .arg("--cd")
            .arg(&request.scope.root)
            .current_dir(&request.scope.root);
        if !self.config.model.is_empty() {
            cmd.arg("--model").arg(&self.config.model);
        }
        if let Some(schema_path) = schema_path {
            cmd.arg("--output-schema").arg(schema_path);
        }
        cmd.arg("--output-last-message").arg(answer_path).arg("-");

        if !self.config.base_url.is_empty() {
            cmd.env("OPENAI_BASE_URL", &self.config.base_url);
        }
        if let Some(key) = &self.api_key {
            cmd.env(&self.config.api_key_env, key);
        }
        Ok(cmd)
    }
}

impl Agent for CommandAgent {
    #[instrument(skip_all, fields(root = %request.scope.root.display(), structured = request.output_schema.is_some()))]
    fn invoke(&self, request: &AgentRequest) -> Result<AgentResponse> {
        info!("starting agent call");
        // Scratch files live outside the scope root so the agent never sees them.
        let scratch = tempfile::Builder::new()
            .prefix("builder-agent-")
            .tempdir()
            .context("create agent scratch dir")?;
        let schema_path = match &request.output_schema {
            Some(schema) => {
                let path = scratch.path().join("output.schema.json");
                fs::write(&path, schema)
                    .with_context(|| format!("write output schema {}", path.display()))?;
                Some(path)
            }
            None => None,
        };
        let answer_path = scratch.path().join("answer.txt");

        let cmd = self.build_command(request, schema_path.as_deref(), &answer_path)?;
        let output = run_with_deadline(
            cmd,
            Some(render_stdin(request).into_bytes()),
            Duration::from_secs(self.config.timeout_secs),
            self.config.output_limit_bytes,
        )
        .context("run agent command")?;
        let answer = fs::read_to_string(&answer_path).ok();

        if output.timed_out {
            warn!(timeout_secs = self.config.timeout_secs, "agent call timed out");
            bail!("agent call timed out after {}s", self.config.timeout_secs);
        }
        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "agent call failed");
            bail!(
                "agent command failed with status {:?}: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        // Prefer the runtime's final answer file; fall back to raw stdout.
        let text = answer.unwrap_or_else(|| output.stdout_lossy());
        debug!(bytes = text.len(), "agent call completed");
        if text.trim().is_empty() {
            return Ok(AgentResponse::empty());
        }
        if request.output_schema.is_some()
            && let Ok(value) = serde_json::from_str::<Value>(text.trim())
        {
            return Ok(AgentResponse::structured(value));
        }
        Ok(AgentResponse::text(text))
    }
}

fn sandbox_mode(scope: &ToolScope) -> &'static str {
    if scope.allows(ToolCapability::FileWrite) {
        "workspace-write"
    } else {
        "read-only"
    }
}

/// Stdin payload: the system instruction and the message in tagged blocks.
fn render_stdin(request: &AgentRequest) -> String {
    format!(
        "<SYSTEM_INSTRUCTION>\n{}\n</SYSTEM_INSTRUCTION>\n\n{}\n",
        request.system_instruction.trim_end(),
        request.message.trim_end()
    )
}
