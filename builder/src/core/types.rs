//! Shared deterministic types for the builder pipeline.
//!
//! These types define the stable contracts between the skill registry, the
//! two agent adapters and the workflow. They carry no I/O and serialize to the
//! wire shapes callers depend on.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Version recorded for skills that do not declare one.
pub const DEFAULT_SKILL_VERSION: &str = "1.0";

fn default_skill_version() -> String {
    DEFAULT_SKILL_VERSION.to_string()
}

/// Immutable task template resolved by id from the skill registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillSpec {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_skill_version")]
    pub version: String,
    /// Free-text technology identifier. Empty means "use the default stack".
    #[serde(default)]
    pub stack: String,
    #[serde(default)]
    pub prompt_template: String,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub acceptance: Vec<String>,
}

impl SkillSpec {
    /// Stack declared by the skill, or `fallback` when the skill leaves it blank.
    pub fn stack_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        let stack = self.stack.trim();
        if stack.is_empty() { fallback } else { stack }
    }

    pub fn summary(&self) -> SkillSummary {
        SkillSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }
}

/// Listing entry for a registered skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillSummary {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// Per-invocation state owned by a single workflow run.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub workdir: PathBuf,
    pub skill: SkillSpec,
    pub user_input: String,
}

/// Severity reported by the review agent for a single issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

/// Review category. Unknown categories are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Category {
    ReactPractices,
    UiUx,
    Performance,
    Accessibility,
    Other(String),
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Category::ReactPractices => "react-practices",
            Category::UiUx => "ui-ux",
            Category::Performance => "performance",
            Category::Accessibility => "accessibility",
            Category::Other(name) => name,
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw {
            "react-practices" => Category::ReactPractices,
            "ui-ux" => Category::UiUx,
            "performance" => Category::Performance,
            "accessibility" => Category::Accessibility,
            other => Category::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Category::parse(&raw))
    }
}

/// One finding from the review agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaIssue {
    pub severity: Severity,
    pub category: Category,
    /// Path relative to the run's workdir.
    pub file_path: String,
    pub description: String,
    pub suggestion: String,
}

impl QaIssue {
    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

/// Structured review report.
///
/// `passed` is the review agent's own verdict and is never recomputed.
/// `score` must lie in `0..=100`; see [`crate::core::report::parse_report`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaReport {
    pub passed: bool,
    pub score: u8,
    pub summary: String,
    /// Discovery order, not severity order.
    #[serde(default)]
    pub issues: Vec<QaIssue>,
    #[serde(default)]
    pub fixed_files: Vec<String>,
}

impl QaReport {
    pub fn critical_issues(&self) -> Vec<&QaIssue> {
        self.issues.iter().filter(|issue| issue.is_critical()).collect()
    }

    pub fn summarize(&self) -> QaSummary {
        QaSummary {
            passed: self.passed,
            score: self.score,
            summary: self.summary.clone(),
            issues_count: self.issues.len(),
            critical_count: self.critical_issues().len(),
            fixed_files: self.fixed_files.clone(),
        }
    }
}

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Success,
    Fail,
}

/// QA section embedded in a successful delivery record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaSummary {
    pub passed: bool,
    pub score: u8,
    pub summary: String,
    pub issues_count: usize,
    pub critical_count: usize,
    pub fixed_files: Vec<String>,
}

/// Status-specific payload of a delivery record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeliveryOutcome {
    Delivered {
        workdir: String,
        skill: String,
        stack: String,
        qa: Option<QaSummary>,
    },
    Failed {
        error: String,
    },
}

/// The single structured result produced at the end of every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub run_id: String,
    pub status: DeliveryStatus,
    #[serde(flatten)]
    pub outcome: DeliveryOutcome,
}

impl DeliveryRecord {
    pub fn qa(&self) -> Option<&QaSummary> {
        match &self.outcome {
            DeliveryOutcome::Delivered { qa, .. } => qa.as_ref(),
            DeliveryOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            DeliveryOutcome::Failed { error } => Some(error),
            DeliveryOutcome::Delivered { .. } => None,
        }
    }
}
