//! Scaffolding for `builder init`.
//!
//! Writes `builder.toml` plus the directories it points at, seeded with the
//! bundled prompts, a sample skill and the review knowledge base.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::debug;

use crate::io::config::{BuilderConfig, load_config, write_config};

const SYSTEM_PROMPT: &str = include_str!("../../assets/prompts/system_prompt.txt");
const QA_PROMPT: &str = include_str!("../../assets/prompts/qa_prompt.txt");
const SAMPLE_SKILL: &str = include_str!("../../assets/skills/restaurant-menu.toml");

const KNOWLEDGE: &[(&str, &str)] = &[
    (
        "accessibility",
        include_str!("../../assets/agent-skills/accessibility/SKILL.md"),
    ),
    (
        "performance",
        include_str!("../../assets/agent-skills/performance/SKILL.md"),
    ),
    (
        "react-practices",
        include_str!("../../assets/agent-skills/react-practices/SKILL.md"),
    ),
    (
        "ui-ux",
        include_str!("../../assets/agent-skills/ui-ux/SKILL.md"),
    ),
];

/// Options for [`init_builder`].
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Overwrite the config and seeded files if they already exist.
    pub force: bool,
}

/// Files written by [`init_builder`], resolved against the config directory.
#[derive(Debug, Clone)]
pub struct InitReport {
    pub config_path: PathBuf,
    pub config: BuilderConfig,
    pub written: Vec<PathBuf>,
}

/// Create `config_path` with defaults and seed the directories it names.
///
/// Fails if the config already exists unless `options.force` is set. Seed
/// files that already exist are left alone unless forced.
pub fn init_builder(config_path: &Path, options: &InitOptions) -> Result<InitReport> {
    if config_path.exists() && !options.force {
        return Err(anyhow!(
            "builder init: {} already exists (use --force to overwrite)",
            config_path.display()
        ));
    }
    write_config(config_path, &BuilderConfig::default())?;
    let config = load_config(config_path)?;

    let mut written = vec![config_path.to_path_buf()];
    create_dir(&config.workspace_dir)?;
    create_dir(&config.knowledge_dir)?;

    let mut seeds = vec![
        (config.prompts_dir.join("system_prompt.txt"), SYSTEM_PROMPT),
        (config.prompts_dir.join("qa_prompt.txt"), QA_PROMPT),
        (config.skills_dir.join("restaurant-menu.toml"), SAMPLE_SKILL),
    ];
    for &(name, body) in KNOWLEDGE {
        seeds.push((config.knowledge_dir.join(name).join("SKILL.md"), body));
    }
    for (path, body) in seeds {
        if write_seed(&path, body, options.force)? {
            written.push(path);
        }
    }

    Ok(InitReport {
        config_path: config_path.to_path_buf(),
        config,
        written,
    })
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).with_context(|| format!("create directory {}", path.display()))
}

fn write_seed(path: &Path, contents: &str, force: bool) -> Result<bool> {
    if path.exists() && !force {
        debug!(path = %path.display(), "keeping existing file");
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        create_dir(parent)?;
    }
    fs::write(path, contents).with_context(|| format!("write file {}", path.display()))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::instructions::Instructions;
    use crate::io::skills::{DirSkillRegistry, SkillRegistry};

    #[test]
    fn init_creates_usable_layout() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config_path = temp.path().join("builder.toml");
        let report = init_builder(&config_path, &InitOptions { force: false }).expect("init");

        assert!(config_path.is_file());
        assert!(report.config.workspace_dir.is_dir());
        let registry = DirSkillRegistry::new(&report.config.skills_dir);
        let skill = registry.resolve("restaurant-menu").expect("sample skill");
        assert!(!skill.constraints.is_empty());

        let instructions =
            Instructions::load(&report.config.prompts_dir, &report.config.knowledge_dir)
                .expect("instructions");
        assert!(instructions.reviewer.contains("knowledge base"));
        assert!(!instructions.reviewer.contains("\nname: "));
    }

    #[test]
    fn init_refuses_existing_config_without_force() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config_path = temp.path().join("builder.toml");
        init_builder(&config_path, &InitOptions { force: false }).expect("init");
        let err = init_builder(&config_path, &InitOptions { force: false }).unwrap_err();
        assert!(err.to_string().contains("--force"));
    }

    #[test]
    fn plain_init_keeps_seeds_and_force_rewrites_them() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config_path = temp.path().join("builder.toml");
        let prompt = temp.path().join("prompts/system_prompt.txt");
        fs::create_dir_all(prompt.parent().expect("parent")).expect("mkdir");
        fs::write(&prompt, "custom").expect("write");

        init_builder(&config_path, &InitOptions { force: false }).expect("init");
        assert_eq!(fs::read_to_string(&prompt).expect("read"), "custom");

        let report = init_builder(&config_path, &InitOptions { force: true }).expect("force");
        assert_eq!(fs::read_to_string(&prompt).expect("read"), SYSTEM_PROMPT);
        assert!(report.written.contains(&prompt));
    }
}
