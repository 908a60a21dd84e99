//! Decision rule for the single repair cycle.

use crate::core::types::{QaIssue, QaReport};

/// Reports scoring at or above this value never trigger a fix, whatever the
/// reviewer's verdict.
pub const FIX_SCORE_THRESHOLD: u8 = 80;

/// What the workflow should do after a review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixDecision<'a> {
    /// The report passed or scored high enough.
    NotNeeded,
    /// The report failed, but nothing in it is critical.
    NoCriticalIssues,
    /// Send exactly these issues back to the generation agent.
    Fix(Vec<&'a QaIssue>),
}

/// Decide whether to request a fix.
///
/// Both `!report.passed` and `report.score < FIX_SCORE_THRESHOLD` must hold,
/// and only critical issues are forwarded.
pub fn decide_fix(report: &QaReport) -> FixDecision<'_> {
    if report.passed || report.score >= FIX_SCORE_THRESHOLD {
        return FixDecision::NotNeeded;
    }
    let critical = report.critical_issues();
    if critical.is_empty() {
        return FixDecision::NoCriticalIssues;
    }
    FixDecision::Fix(critical)
}
