//! System instructions for the two agents.
//!
//! The generation agent gets `prompts/system_prompt.txt` verbatim. The review
//! agent gets `prompts/qa_prompt.txt` followed by a knowledge-base appendix
//! built from every `<knowledge_dir>/*/SKILL.md` rule document.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing::debug;

const FRONTMATTER_MARKER: &str = "---";
const DOCUMENT_SEPARATOR: &str = "\n\n---\n\n";
const KNOWLEDGE_HEADER: &str = "\n\n====================\nAppendix: review knowledge base\n====================\nApply the following rule sets while reviewing:\n\n";

/// System instructions loaded once per workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instructions {
    pub developer: String,
    pub reviewer: String,
}

impl Instructions {
    /// Load both instructions from `prompts_dir` and `knowledge_dir`.
    pub fn load(prompts_dir: &Path, knowledge_dir: &Path) -> Result<Self> {
        let developer = read_required(&prompts_dir.join("system_prompt.txt"))?;
        let review_base = read_required(&prompts_dir.join("qa_prompt.txt"))?;
        let knowledge = load_knowledge_base(knowledge_dir)?;
        Ok(Self {
            developer,
            reviewer: compose_review_instruction(&review_base, &knowledge),
        })
    }
}

/// Append the knowledge base to the review instruction (no-op when empty).
pub fn compose_review_instruction(base: &str, knowledge: &str) -> String {
    if knowledge.is_empty() {
        return base.to_string();
    }
    format!("{base}{KNOWLEDGE_HEADER}{knowledge}")
}

/// Concatenate every `*/SKILL.md` under `dir`, ordered by directory name.
///
/// Missing directories yield an empty knowledge base.
pub fn load_knowledge_base(dir: &Path) -> Result<String> {
    if !dir.exists() {
        return Ok(String::new());
    }
    let mut entries: Vec<_> = fs::read_dir(dir)
        .with_context(|| format!("read knowledge dir {}", dir.display()))?
        .collect::<std::io::Result<_>>()
        .with_context(|| format!("read knowledge entries {}", dir.display()))?;
    entries.sort_by_key(|entry| entry.file_name());

    let mut parts = Vec::new();
    for entry in entries {
        let doc = entry.path().join("SKILL.md");
        if !doc.is_file() {
            continue;
        }
        let contents =
            fs::read_to_string(&doc).with_context(|| format!("read {}", doc.display()))?;
        debug!(path = %doc.display(), "loaded knowledge document");
        parts.push(strip_frontmatter(&contents).to_string());
    }
    Ok(parts.join(DOCUMENT_SEPARATOR))
}

/// Drop a leading `---` … `---` metadata block.
///
/// Only text after the second marker is kept (trimmed). Documents that do not
/// start with the marker, or never close it, are returned unchanged.
pub fn strip_frontmatter(contents: &str) -> &str {
    let Some(rest) = contents.strip_prefix(FRONTMATTER_MARKER) else {
        return contents;
    };
    match rest.find(FRONTMATTER_MARKER) {
        Some(end) => rest[end + FRONTMATTER_MARKER.len()..].trim(),
        None => contents,
    }
}

fn read_required(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(anyhow!("missing instruction file {}", path.display()));
    }
    fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}
