//! Skill registry backed by a directory of TOML templates.
//!
//! Each skill lives in `<skills_dir>/<id>.toml`. The file's `id` must match
//! its stem so lookups by id and listings agree.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use tracing::debug;

use crate::core::ids::validate_id;
use crate::core::types::{SkillSpec, SkillSummary};

/// Returned (inside `anyhow::Error`) when a skill id does not resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillNotFound {
    pub id: String,
}

impl fmt::Display for SkillNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "skill '{}' not found", self.id)
    }
}

impl std::error::Error for SkillNotFound {}

/// Lookup interface consumed by the workflow.
pub trait SkillRegistry {
    /// Resolve a skill by id. Unknown ids yield a [`SkillNotFound`] error.
    fn resolve(&self, id: &str) -> Result<SkillSpec>;
    /// List every registered skill, sorted by id.
    fn list(&self) -> Result<Vec<SkillSummary>>;
}

/// Registry reading `<id>.toml` files from one directory.
#[derive(Debug, Clone)]
pub struct DirSkillRegistry {
    dir: PathBuf,
}

impl DirSkillRegistry {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn load(path: &Path) -> Result<SkillSpec> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("read skill {}", path.display()))?;
        let skill: SkillSpec =
            toml::from_str(&contents).with_context(|| format!("parse skill {}", path.display()))?;
        validate_skill(&skill).with_context(|| format!("validate skill {}", path.display()))?;
        Ok(skill)
    }
}

impl SkillRegistry for DirSkillRegistry {
    fn resolve(&self, id: &str) -> Result<SkillSpec> {
        // Ids that could escape the directory can never name a skill.
        if validate_id("skill id", id).is_err() {
            return Err(SkillNotFound { id: id.to_string() }.into());
        }
        let path = self.dir.join(format!("{id}.toml"));
        if !path.is_file() {
            return Err(SkillNotFound { id: id.to_string() }.into());
        }
        let skill = Self::load(&path)?;
        if skill.id != id {
            bail!(
                "skill {} declares id '{}' (expected '{id}')",
                path.display(),
                skill.id
            );
        }
        debug!(skill = %skill.id, version = %skill.version, "skill resolved");
        Ok(skill)
    }

    fn list(&self) -> Result<Vec<SkillSummary>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut skills = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("read skills dir {}", self.dir.display()))?
        {
            let entry = entry.context("read skill entry")?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
                continue;
            }
            skills.push(Self::load(&path)?.summary());
        }
        skills.sort_by(|left, right| left.id.cmp(&right.id));
        for pair in skills.windows(2) {
            if pair[0].id == pair[1].id {
                return Err(anyhow!("duplicate skill id {}", pair[0].id));
            }
        }
        Ok(skills)
    }
}

fn validate_skill(skill: &SkillSpec) -> Result<()> {
    validate_id("skill id", &skill.id)?;
    if skill.name.trim().is_empty() {
        bail!("skill name must be non-empty");
    }
    Ok(())
}
