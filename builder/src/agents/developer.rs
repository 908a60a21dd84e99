//! Generation agent: writes the project into the run's workdir.

use std::path::Path;

use tracing::{info, instrument, warn};

use crate::io::agent::{Agent, AgentRequest, ToolCapability, ToolScope};

const DEVELOPER_TOOLS: &[ToolCapability] = &[
    ToolCapability::Shell,
    ToolCapability::FileRead,
    ToolCapability::FileWrite,
];

/// Result of one generation (or fix) call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// The agent finished and returned this final text.
    Produced(String),
    /// The call failed or came back empty.
    Failed(String),
}

impl GenerationOutcome {
    pub fn is_produced(&self) -> bool {
        matches!(self, GenerationOutcome::Produced(_))
    }
}

/// Generation adapter holding the constitutional system instruction.
#[derive(Debug, Clone)]
pub struct DeveloperAgent {
    instruction: String,
}

impl DeveloperAgent {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
        }
    }

    /// Send `message` to the agent with shell and file tools confined to `workdir`.
    ///
    /// Never returns an error: every failure is folded into
    /// [`GenerationOutcome::Failed`] with a readable message.
    #[instrument(skip_all, fields(workdir = %workdir.display()))]
    pub fn generate<A: Agent + ?Sized>(
        &self,
        agent: &A,
        workdir: &Path,
        message: &str,
    ) -> GenerationOutcome {
        let scope = match ToolScope::confined(workdir, DEVELOPER_TOOLS) {
            Ok(scope) => scope,
            Err(err) => {
                warn!(err = %format!("{err:#}"), "workdir unavailable");
                return GenerationOutcome::Failed(format!("{err:#}"));
            }
        };
        let request = AgentRequest {
            system_instruction: self.instruction.clone(),
            scope,
            message: message.to_string(),
            output_schema: None,
        };

        let response = match agent.invoke(&request) {
            Ok(response) => response,
            Err(err) => {
                warn!(err = %format!("{err:#}"), "generation call failed");
                return GenerationOutcome::Failed(format!("generation agent failed: {err:#}"));
            }
        };
        match response.content {
            Some(content) if !content.is_blank() => {
                let text = content.to_text();
                info!(bytes = text.len(), "generation finished");
                GenerationOutcome::Produced(text)
            }
            _ => {
                warn!("generation returned no content");
                GenerationOutcome::Failed("generation agent returned no content".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::agent::AgentResponse;
    use crate::test_support::{ScriptedAgent, ScriptedReply};

    #[test]
    fn produced_text_and_scope_are_passed_through() {
        let temp = tempfile::tempdir().expect("tempdir");
        let agent = ScriptedAgent::new(vec![ScriptedReply::Respond(AgentResponse::text(
            "built it",
        ))]);
        let developer = DeveloperAgent::new("You are a developer.");

        let outcome = developer.generate(&agent, temp.path(), "build a menu");
        assert_eq!(outcome, GenerationOutcome::Produced("built it".to_string()));

        let requests = agent.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.system_instruction, "You are a developer.");
        assert_eq!(request.message, "build a menu");
        assert!(request.output_schema.is_none());
        assert!(request.scope.allows(ToolCapability::FileWrite));
        assert!(request.scope.allows(ToolCapability::Shell));
        assert_eq!(
            request.scope.root,
            temp.path().canonicalize().expect("canonical")
        );
    }

    #[test]
    fn blank_or_missing_content_fails() {
        let temp = tempfile::tempdir().expect("tempdir");
        let agent = ScriptedAgent::new(vec![
            ScriptedReply::Respond(AgentResponse::text("  \n")),
            ScriptedReply::Respond(AgentResponse::empty()),
        ]);
        let developer = DeveloperAgent::new("dev");
        for _ in 0..2 {
            let outcome = developer.generate(&agent, temp.path(), "go");
            assert!(matches!(outcome, GenerationOutcome::Failed(msg) if msg.contains("no content")));
        }
    }

    #[test]
    fn call_error_fails_with_message() {
        let temp = tempfile::tempdir().expect("tempdir");
        let agent = ScriptedAgent::new(vec![ScriptedReply::Error("rate limited".to_string())]);
        let outcome = DeveloperAgent::new("dev").generate(&agent, temp.path(), "go");
        let GenerationOutcome::Failed(msg) = outcome else {
            panic!("expected failure");
        };
        assert!(msg.contains("rate limited"));
    }

    #[test]
    fn missing_workdir_fails_without_calling_agent() {
        let temp = tempfile::tempdir().expect("tempdir");
        let agent = ScriptedAgent::new(Vec::new());
        let outcome = DeveloperAgent::new("dev").generate(&agent, &temp.path().join("gone"), "go");
        assert!(!outcome.is_produced());
        assert!(agent.requests().is_empty());
    }
}
