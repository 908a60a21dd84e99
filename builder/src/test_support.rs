//! Test-only helpers: scripted agents, temporary workspaces and fixtures.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;

use crate::core::types::{Category, QaIssue, QaReport, Severity, SkillSpec};
use crate::io::agent::{Agent, AgentRequest, AgentResponse};
use crate::io::config::BuilderConfig;

pub const SYSTEM_PROMPT: &str = "You are the developer agent.";
pub const QA_PROMPT: &str = "You are the review agent.";

/// One queued reply of a [`ScriptedAgent`].
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Respond(AgentResponse),
    /// The call itself fails with this message.
    Error(String),
}

/// Agent returning queued replies in order and recording every request.
///
/// Running out of replies is an error, so an unexpected extra call shows up
/// as a failed call rather than a hang.
#[derive(Debug, Default)]
pub struct ScriptedAgent {
    replies: RefCell<VecDeque<ScriptedReply>>,
    requests: RefCell<Vec<AgentRequest>>,
}

impl ScriptedAgent {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Every request received so far, in call order.
    pub fn requests(&self) -> Vec<AgentRequest> {
        self.requests.borrow().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.borrow().len()
    }
}

impl Agent for ScriptedAgent {
    fn invoke(&self, request: &AgentRequest) -> Result<AgentResponse> {
        self.requests.borrow_mut().push(request.clone());
        match self.replies.borrow_mut().pop_front() {
            Some(ScriptedReply::Respond(response)) => Ok(response),
            Some(ScriptedReply::Error(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("scripted agent has no reply left")),
        }
    }
}

/// Temporary builder layout: skills, prompts, knowledge base and workspace.
pub struct TestWorkspace {
    temp: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("create tempdir")?;
        let root = temp.path();
        fs::create_dir_all(root.join("skills")).context("create skills dir")?;
        fs::create_dir_all(root.join("prompts")).context("create prompts dir")?;
        fs::create_dir_all(root.join("agent-skills")).context("create knowledge dir")?;
        fs::write(root.join("prompts/system_prompt.txt"), SYSTEM_PROMPT)
            .context("write system prompt")?;
        fs::write(root.join("prompts/qa_prompt.txt"), QA_PROMPT).context("write qa prompt")?;
        Ok(Self { temp })
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Default config with every directory inside this workspace.
    pub fn config(&self) -> BuilderConfig {
        BuilderConfig::default().resolve_paths(self.path())
    }

    pub fn write_skill(&self, skill: &SkillSpec) -> Result<()> {
        let body = toml::to_string(skill).context("serialize skill")?;
        let path = self.path().join("skills").join(format!("{}.toml", skill.id));
        fs::write(&path, body).with_context(|| format!("write {}", path.display()))
    }

    /// Add a knowledge document at `agent-skills/<name>/SKILL.md`.
    pub fn write_knowledge(&self, name: &str, body: &str) -> Result<()> {
        let dir = self.path().join("agent-skills").join(name);
        fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
        fs::write(dir.join("SKILL.md"), body).context("write knowledge document")
    }
}

/// Deterministic skill with empty stack and lists.
pub fn skill(id: &str) -> SkillSpec {
    SkillSpec {
        id: id.to_string(),
        name: format!("{id} skill"),
        description: format!("{id} description"),
        version: "1.0".to_string(),
        stack: String::new(),
        prompt_template: format!("Build the {id} project."),
        constraints: Vec::new(),
        acceptance: Vec::new(),
    }
}

/// Issue in the react-practices category with derived text fields.
pub fn issue(severity: Severity, file_path: &str) -> QaIssue {
    QaIssue {
        severity,
        category: Category::ReactPractices,
        file_path: file_path.to_string(),
        description: format!("problem in {file_path}"),
        suggestion: format!("rewrite {file_path}"),
    }
}

pub fn report(passed: bool, score: u8, issues: Vec<QaIssue>) -> QaReport {
    QaReport {
        passed,
        score,
        summary: format!("score {score}"),
        issues,
        fixed_files: Vec::new(),
    }
}
