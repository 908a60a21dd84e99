//! Review agent: inspects the workdir and reports a [`QaReport`].
//!
//! The agent may repair critical issues in place; it lists those files in
//! `fixed_files`.

use std::path::Path;

use tracing::{info, instrument, warn};

use crate::core::report::{QA_REPORT_SCHEMA, ReportPayload, parse_report};
use crate::core::types::QaReport;
use crate::io::agent::{Agent, AgentRequest, ResponseContent, ToolCapability, ToolScope};

const REVIEWER_TOOLS: &[ToolCapability] = &[
    ToolCapability::FileRead,
    ToolCapability::FileWrite,
    ToolCapability::Shell,
];

/// Review adapter holding the review instruction (knowledge base included).
#[derive(Debug, Clone)]
pub struct ReviewerAgent {
    instruction: String,
}

impl ReviewerAgent {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
        }
    }

    /// Ask the agent to review `workdir` and parse its answer.
    ///
    /// Returns `None` when the call fails, the answer is empty, or no report
    /// can be parsed from it. Review problems never abort a run.
    #[instrument(skip_all, fields(workdir = %workdir.display()))]
    pub fn review<A: Agent + ?Sized>(
        &self,
        agent: &A,
        workdir: &Path,
        message: &str,
    ) -> Option<QaReport> {
        let scope = match ToolScope::confined(workdir, REVIEWER_TOOLS) {
            Ok(scope) => scope,
            Err(err) => {
                warn!(err = %format!("{err:#}"), "workdir unavailable for review");
                return None;
            }
        };
        let request = AgentRequest {
            system_instruction: self.instruction.clone(),
            scope,
            message: message.to_string(),
            output_schema: Some(QA_REPORT_SCHEMA.to_string()),
        };

        let response = match agent.invoke(&request) {
            Ok(response) => response,
            Err(err) => {
                warn!(err = %format!("{err:#}"), "review call failed");
                return None;
            }
        };
        let Some(content) = response.content.filter(|content| !content.is_blank()) else {
            warn!("review returned no content");
            return None;
        };
        let payload = match &content {
            ResponseContent::Structured(value) => ReportPayload::Structured(value),
            ResponseContent::Text(text) => ReportPayload::Text(text),
        };
        match parse_report(payload) {
            Ok(report) => {
                info!(
                    passed = report.passed,
                    score = report.score,
                    issues = report.issues.len(),
                    "review parsed"
                );
                Some(report)
            }
            Err(err) => {
                warn!(err = %format!("{err:#}"), "review response could not be parsed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Severity;
    use crate::io::agent::AgentResponse;
    use crate::test_support::{ScriptedAgent, ScriptedReply};
    use serde_json::json;

    fn report_json(score: i64) -> serde_json::Value {
        json!({
            "passed": false,
            "score": score,
            "summary": "needs work",
            "issues": [{
                "severity": "critical",
                "category": "accessibility",
                "file_path": "src/App.tsx",
                "description": "image without alt text",
                "suggestion": "add alt"
            }],
            "fixed_files": []
        })
    }

    fn review_with(reply: ScriptedReply) -> (ScriptedAgent, Option<QaReport>) {
        let temp = tempfile::tempdir().expect("tempdir");
        let agent = ScriptedAgent::new(vec![reply]);
        let report = ReviewerAgent::new("review").review(&agent, temp.path(), "review it");
        (agent, report)
    }

    #[test]
    fn structured_response_is_parsed_with_workdir_scope() {
        let (agent, report) =
            review_with(ScriptedReply::Respond(AgentResponse::structured(report_json(55))));
        let report = report.expect("report");
        assert_eq!(report.score, 55);
        assert_eq!(report.issues[0].severity, Severity::Critical);

        let requests = agent.requests();
        let request = &requests[0];
        assert!(request.scope.allows(ToolCapability::FileRead));
        assert!(request.scope.allows(ToolCapability::FileWrite));
        assert_eq!(request.output_schema.as_deref(), Some(QA_REPORT_SCHEMA));
        assert_eq!(request.system_instruction, "review");
    }

    #[test]
    fn fenced_text_response_is_parsed() {
        let text = format!("Here you go:\n```json\n{}\n```\n", report_json(70));
        let (_, report) = review_with(ScriptedReply::Respond(AgentResponse::text(text)));
        assert_eq!(report.expect("report").score, 70);
    }

    #[test]
    fn failures_yield_none() {
        for reply in [
            ScriptedReply::Error("timeout".to_string()),
            ScriptedReply::Respond(AgentResponse::empty()),
            ScriptedReply::Respond(AgentResponse::text("I could not finish the review.")),
            ScriptedReply::Respond(AgentResponse::structured(report_json(101))),
        ] {
            let (_, report) = review_with(reply);
            assert!(report.is_none());
        }
    }
}
