//! Run orchestration: Prepare → Generate → Review → (Fix) → Deliver.
//!
//! A run always ends in exactly one [`DeliveryRecord`] once Prepare has
//! succeeded. Only Prepare failures (unknown skill, invalid run id, workdir
//! creation) surface as errors; everything after it is folded into the record.

use std::fmt;
use std::path::PathBuf;

use anyhow::Result;
use tracing::{info, info_span, instrument, warn};

use crate::agents::developer::{DeveloperAgent, GenerationOutcome};
use crate::agents::reviewer::ReviewerAgent;
use crate::core::delivery;
use crate::core::fix_policy::{FixDecision, decide_fix};
use crate::core::types::{DeliveryRecord, QaIssue, QaReport, RunContext};
use crate::io::agent::Agent;
use crate::io::config::BuilderConfig;
use crate::io::instructions::Instructions;
use crate::io::prompt::{PromptBuilder, RuntimeDefaults};
use crate::io::run_log::{
    DELIVERY, DEVELOPER_LOG, FIX_PROMPT, GENERATE_PROMPT, REVIEW_REPORT, RunLog,
};
use crate::io::skills::SkillRegistry;
use crate::io::workspace::{allocate_workdir, choose_run_id};

/// Pipeline stage of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Prepare,
    Generate,
    Review,
    Fix,
    Deliver,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Prepare => "prepare",
            Phase::Generate => "generate",
            Phase::Review => "review",
            Phase::Fix => "fix",
            Phase::Deliver => "deliver",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why no fix was requested after a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixSkipReason {
    /// The report passed or scored at or above the fix threshold.
    NotNeeded,
    /// The report failed but listed no critical issue.
    NoCriticalIssues,
}

/// Progress notifications delivered to the caller's callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    PhaseEntered(Phase),
    Started {
        run_id: String,
        workdir: PathBuf,
        skill: String,
    },
    GenerationFinished {
        produced: bool,
    },
    ReviewFinished {
        passed: bool,
        score: u8,
        issues: usize,
        critical: usize,
    },
    ReviewMissing,
    FixRequested {
        critical: usize,
    },
    FixSkipped(FixSkipReason),
    Delivered(DeliveryRecord),
}

/// Input of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunRequest {
    pub skill_id: String,
    pub user_input: String,
    /// Caller-chosen run id; a random one is generated when absent.
    pub run_id: Option<String>,
}

impl RunRequest {
    pub fn new(skill_id: impl Into<String>, user_input: impl Into<String>) -> Self {
        Self {
            skill_id: skill_id.into(),
            user_input: user_input.into(),
            run_id: None,
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }
}

/// The two-agent pipeline bound to a registry and an agent backend.
///
/// Both roles share one [`Agent`]; they differ in system instruction, tool
/// scope and output schema.
pub struct Workflow<'a, R: SkillRegistry + ?Sized, A: Agent + ?Sized> {
    registry: &'a R,
    agent: &'a A,
    prompts: PromptBuilder,
    developer: DeveloperAgent,
    reviewer: ReviewerAgent,
    workspace_dir: PathBuf,
    runs_dir: PathBuf,
}

impl<'a, R: SkillRegistry + ?Sized, A: Agent + ?Sized> Workflow<'a, R, A> {
    pub fn new(
        config: &BuilderConfig,
        instructions: Instructions,
        registry: &'a R,
        agent: &'a A,
    ) -> Self {
        Self {
            registry,
            agent,
            prompts: PromptBuilder::new(RuntimeDefaults::from_config(config)),
            developer: DeveloperAgent::new(instructions.developer),
            reviewer: ReviewerAgent::new(instructions.reviewer),
            workspace_dir: config.workspace_dir.clone(),
            runs_dir: config.runs_log_dir(),
        }
    }

    /// Execute one run and return its delivery record.
    ///
    /// `on_event` sees every phase transition; once Prepare succeeds its
    /// last event is always [`RunEvent::Delivered`].
    #[instrument(skip_all, fields(skill = %request.skill_id))]
    pub fn run<F: FnMut(&RunEvent)>(
        &self,
        request: &RunRequest,
        mut on_event: F,
    ) -> Result<DeliveryRecord> {
        on_event(&RunEvent::PhaseEntered(Phase::Prepare));
        let ctx = self.prepare(request)?;
        let span = info_span!("run", run_id = %ctx.run_id);
        let _guard = span.enter();
        info!(workdir = %ctx.workdir.display(), "run prepared");
        on_event(&RunEvent::Started {
            run_id: ctx.run_id.clone(),
            workdir: ctx.workdir.clone(),
            skill: ctx.skill.name.clone(),
        });

        let log = RunLog::new(&self.runs_dir, &ctx.run_id);
        let record = self.execute(&ctx, &log, &mut on_event);

        on_event(&RunEvent::PhaseEntered(Phase::Deliver));
        log.record_json(DELIVERY, &record);
        info!(status = ?record.status, "run delivered");
        on_event(&RunEvent::Delivered(record.clone()));
        Ok(record)
    }

    fn prepare(&self, request: &RunRequest) -> Result<RunContext> {
        let run_id = choose_run_id(request.run_id.as_deref())?;
        // Resolve before touching the filesystem so unknown skills leave no trace.
        let skill = self.registry.resolve(&request.skill_id)?;
        let workdir = allocate_workdir(&self.workspace_dir, &run_id)?;
        Ok(RunContext {
            run_id,
            workdir,
            skill,
            user_input: request.user_input.clone(),
        })
    }

    fn execute<F: FnMut(&RunEvent)>(
        &self,
        ctx: &RunContext,
        log: &RunLog,
        on_event: &mut F,
    ) -> DeliveryRecord {
        on_event(&RunEvent::PhaseEntered(Phase::Generate));
        let message = match self.prompts.build_generation(ctx) {
            Ok(message) => message,
            Err(err) => {
                warn!(err = %format!("{err:#}"), "failed to render generation prompt");
                on_event(&RunEvent::GenerationFinished { produced: false });
                return delivery::failed(
                    &ctx.run_id,
                    format!("render generation prompt: {err:#}"),
                );
            }
        };
        log.record_text(GENERATE_PROMPT, &message);

        let outcome = self.developer.generate(self.agent, &ctx.workdir, &message);
        on_event(&RunEvent::GenerationFinished {
            produced: outcome.is_produced(),
        });
        match outcome {
            GenerationOutcome::Produced(text) => log.record_text(DEVELOPER_LOG, &text),
            GenerationOutcome::Failed(error) => {
                log.record_text(DEVELOPER_LOG, &error);
                return delivery::failed(&ctx.run_id, error);
            }
        }

        on_event(&RunEvent::PhaseEntered(Phase::Review));
        let Some(report) = self.review(ctx) else {
            warn!("no review report, delivering without qa");
            on_event(&RunEvent::ReviewMissing);
            return delivery::delivered(ctx, &self.prompts.runtime().default_stack, None);
        };
        log.record_json(REVIEW_REPORT, &report);
        let critical = report.critical_issues().len();
        info!(
            passed = report.passed,
            score = report.score,
            critical,
            "review finished"
        );
        on_event(&RunEvent::ReviewFinished {
            passed: report.passed,
            score: report.score,
            issues: report.issues.len(),
            critical,
        });

        match decide_fix(&report) {
            FixDecision::NotNeeded => on_event(&RunEvent::FixSkipped(FixSkipReason::NotNeeded)),
            FixDecision::NoCriticalIssues => {
                info!("review failed without critical issues, skipping fix");
                on_event(&RunEvent::FixSkipped(FixSkipReason::NoCriticalIssues));
            }
            FixDecision::Fix(issues) => self.fix(ctx, log, &issues, on_event),
        }

        // The QA section reports the review as it was, before any fix.
        delivery::delivered(ctx, &self.prompts.runtime().default_stack, Some(&report))
    }

    fn review(&self, ctx: &RunContext) -> Option<QaReport> {
        match self.prompts.build_review(ctx) {
            Ok(message) => self.reviewer.review(self.agent, &ctx.workdir, &message),
            Err(err) => {
                warn!(err = %format!("{err:#}"), "failed to render review prompt");
                None
            }
        }
    }

    fn fix<F: FnMut(&RunEvent)>(
        &self,
        ctx: &RunContext,
        log: &RunLog,
        issues: &[&QaIssue],
        on_event: &mut F,
    ) {
        on_event(&RunEvent::PhaseEntered(Phase::Fix));
        on_event(&RunEvent::FixRequested {
            critical: issues.len(),
        });
        let message = match self.prompts.build_fix(issues) {
            Ok(message) => message,
            Err(err) => {
                warn!(err = %format!("{err:#}"), "failed to render fix prompt");
                return;
            }
        };
        log.record_text(FIX_PROMPT, &message);
        match self.developer.generate(self.agent, &ctx.workdir, &message) {
            GenerationOutcome::Produced(_) => info!(critical = issues.len(), "fix applied"),
            GenerationOutcome::Failed(error) => {
                warn!(error = %error, "fix call failed, delivering the reviewed project");
            }
        }
    }
}
