//! Prompt assembly for the generation, review and fix agent calls.
//!
//! Rendering is a pure function of its inputs: the same run context and
//! runtime defaults always produce byte-identical prompts.

use anyhow::Result;
use minijinja::{Environment, context};
use serde::Serialize;
use tracing::debug;

use crate::core::types::{QaIssue, RunContext, SkillSpec};
use crate::io::config::BuilderConfig;

const GENERATE_TEMPLATE: &str = include_str!("prompts/generate.md");
const REVIEW_TEMPLATE: &str = include_str!("prompts/review.md");
const FIX_TEMPLATE: &str = include_str!("prompts/fix.md");

/// Runtime defaults injected into every prompt.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RuntimeDefaults {
    pub default_stack: String,
    pub package_manager: String,
    pub build_command: String,
    pub dev_command: String,
}

impl RuntimeDefaults {
    pub fn from_config(cfg: &BuilderConfig) -> Self {
        Self {
            default_stack: cfg.default_stack.clone(),
            package_manager: cfg.package_manager.clone(),
            build_command: cfg.build_command.clone(),
            dev_command: cfg.dev_command.clone(),
        }
    }
}

/// Skill fields as shown inside `<SKILL_SPEC>`.
#[derive(Debug, Serialize)]
struct SkillContext<'a> {
    name: &'a str,
    description: &'a str,
    version: &'a str,
    stack: &'a str,
    prompt_template: &'a str,
    constraints: &'a [String],
    acceptance: &'a [String],
}

impl<'a> SkillContext<'a> {
    fn new(skill: &'a SkillSpec, default_stack: &'a str) -> Self {
        Self {
            name: &skill.name,
            description: &skill.description,
            version: &skill.version,
            stack: skill.stack_or(default_stack),
            prompt_template: skill.prompt_template.trim(),
            constraints: &skill.constraints,
            acceptance: &skill.acceptance,
        }
    }
}

/// Renders agent messages from the bundled templates.
pub struct PromptBuilder {
    env: Environment<'static>,
    runtime: RuntimeDefaults,
}

impl PromptBuilder {
    pub fn new(runtime: RuntimeDefaults) -> Self {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.add_template("generate", GENERATE_TEMPLATE)
            .expect("generate template should be valid");
        env.add_template("review", REVIEW_TEMPLATE)
            .expect("review template should be valid");
        env.add_template("fix", FIX_TEMPLATE)
            .expect("fix template should be valid");
        Self { env, runtime }
    }

    pub fn runtime(&self) -> &RuntimeDefaults {
        &self.runtime
    }

    /// Message for the generation agent: runtime context, skill, user input.
    pub fn build_generation(&self, ctx: &RunContext) -> Result<String> {
        let stack = ctx.skill.stack_or(&self.runtime.default_stack);
        let template = self.env.get_template("generate")?;
        let rendered = template.render(context! {
            run_id => &ctx.run_id,
            workdir => ctx.workdir.display().to_string(),
            stack => stack,
            runtime => &self.runtime,
            skill => SkillContext::new(&ctx.skill, &self.runtime.default_stack),
            user_input => &ctx.user_input,
            has_user_input => !ctx.user_input.trim().is_empty(),
        })?;
        debug!(run_id = %ctx.run_id, bytes = rendered.len(), "generation prompt rendered");
        Ok(rendered)
    }

    /// Message asking the review agent to inspect the project in `ctx.workdir`.
    pub fn build_review(&self, ctx: &RunContext) -> Result<String> {
        let template = self.env.get_template("review")?;
        let rendered = template.render(context! {
            workdir => ctx.workdir.display().to_string(),
            stack => ctx.skill.stack_or(&self.runtime.default_stack),
            skill_name => &ctx.skill.name,
            runtime => &self.runtime,
        })?;
        Ok(rendered)
    }

    /// Follow-up message listing the issues the generation agent must fix.
    pub fn build_fix(&self, issues: &[&QaIssue]) -> Result<String> {
        let template = self.env.get_template("fix")?;
        let rendered = template.render(context! {
            issues => issues,
            runtime => &self.runtime,
        })?;
        Ok(rendered)
    }
}
