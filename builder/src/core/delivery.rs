//! Construction of the terminal delivery record.

use crate::core::types::{DeliveryOutcome, DeliveryRecord, DeliveryStatus, QaReport, RunContext};

/// Record for a run whose project was produced.
///
/// `default_stack` fills in for skills that leave `stack` blank. The QA
/// section reflects `report` exactly as reviewed, even if a fix ran afterwards.
pub fn delivered(
    ctx: &RunContext,
    default_stack: &str,
    report: Option<&QaReport>,
) -> DeliveryRecord {
    DeliveryRecord {
        run_id: ctx.run_id.clone(),
        status: DeliveryStatus::Success,
        outcome: DeliveryOutcome::Delivered {
            workdir: ctx.workdir.display().to_string(),
            skill: ctx.skill.name.clone(),
            stack: ctx.skill.stack_or(default_stack).to_string(),
            qa: report.map(QaReport::summarize),
        },
    }
}

/// Record for a run that ended before a project was produced.
pub fn failed(run_id: &str, error: impl Into<String>) -> DeliveryRecord {
    DeliveryRecord {
        run_id: run_id.to_string(),
        status: DeliveryStatus::Fail,
        outcome: DeliveryOutcome::Failed {
            error: error.into(),
        },
    }
}
