//! Parse chain turning a review agent response into a [`QaReport`].
//!
//! Attempts run in a fixed order and the first success wins:
//! 1. a structured payload the backend already decoded,
//! 2. the text payload as a JSON document,
//! 3. the first JSON object embedded in the text (fenced block or brace span).
//!
//! Every candidate is checked against the report schema and the report
//! invariants before it is accepted, so an out-of-range score never leaves
//! this module.

use std::sync::LazyLock;

use anyhow::{Context, Result, anyhow, bail};
use jsonschema::{Draft, Validator};
use regex::Regex;
use serde_json::Value;

use crate::core::types::QaReport;

/// JSON Schema for the review agent's structured output.
pub const QA_REPORT_SCHEMA: &str = include_str!("../../schemas/qa_report.schema.json");

/// Upper bound (inclusive) for `QaReport::score`.
pub const MAX_SCORE: u8 = 100;

/// Raw response payload handed to the parse chain.
#[derive(Debug, Clone, Copy)]
pub enum ReportPayload<'a> {
    Structured(&'a Value),
    Text(&'a str),
}

/// Run the parse chain. Returns the first candidate that decodes and validates.
pub fn parse_report(payload: ReportPayload<'_>) -> Result<QaReport> {
    match payload {
        // Some backends wrap the JSON document in a JSON string.
        ReportPayload::Structured(Value::String(text)) => parse_report(ReportPayload::Text(text)),
        ReportPayload::Structured(value) => {
            decode_candidate(value).context("decode structured review payload")
        }
        ReportPayload::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                bail!("review response is empty");
            }
            from_json_text(text).or_else(|direct_err| {
                from_embedded_json(text)
                    .map_err(|embedded_err| anyhow!("{direct_err:#}; {embedded_err:#}"))
            })
        }
    }
}

/// Reject reports that violate the documented invariants.
pub fn validate_report(report: &QaReport) -> Result<()> {
    if report.score > MAX_SCORE {
        bail!("score must be within 0..={MAX_SCORE} (got {})", report.score);
    }
    Ok(())
}

fn report_validator() -> Result<&'static Validator> {
    static VALIDATOR: LazyLock<Result<Validator, String>> = LazyLock::new(|| {
        let schema: Value = serde_json::from_str(QA_REPORT_SCHEMA).map_err(|e| e.to_string())?;
        jsonschema::options()
            .with_draft(Draft::Draft202012)
            .build(&schema)
            .map_err(|e| e.to_string())
    });
    VALIDATOR
        .as_ref()
        .map_err(|err| anyhow!("compile qa report schema: {err}"))
}

/// Fill optional lists and drop keys the schema does not know about.
///
/// The schema is strict so it can double as the agent's output contract;
/// free-text replies are held to the same shape after this lenient pass.
fn normalize_candidate(value: &Value) -> Value {
    const REPORT_KEYS: [&str; 5] = ["passed", "score", "summary", "issues", "fixed_files"];
    const ISSUE_KEYS: [&str; 5] = [
        "severity",
        "category",
        "file_path",
        "description",
        "suggestion",
    ];

    let Value::Object(map) = value else {
        return value.clone();
    };
    let mut map = map.clone();
    map.retain(|key, _| REPORT_KEYS.contains(&key.as_str()));
    map.entry("issues").or_insert_with(|| Value::Array(Vec::new()));
    map.entry("fixed_files")
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Some(Value::Array(issues)) = map.get_mut("issues") {
        for issue in issues {
            if let Value::Object(fields) = issue {
                fields.retain(|key, _| ISSUE_KEYS.contains(&key.as_str()));
            }
        }
    }
    Value::Object(map)
}

fn decode_candidate(value: &Value) -> Result<QaReport> {
    let value = &normalize_candidate(value);
    let messages: Vec<String> = report_validator()?
        .iter_errors(value)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        bail!("report schema violations:\n- {}", messages.join("\n- "));
    }
    let report: QaReport = serde_json::from_value(value.clone()).context("decode report")?;
    validate_report(&report)?;
    Ok(report)
}

fn from_json_text(text: &str) -> Result<QaReport> {
    let value: Value = serde_json::from_str(text).context("parse review text as json")?;
    decode_candidate(&value)
}

fn from_embedded_json(text: &str) -> Result<QaReport> {
    static FENCED_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)```(?:json)?[ \t]*\n(\{.*?\})\s*```").unwrap()
    });

    if let Some(body) = FENCED_RE.captures(text).and_then(|caps| caps.get(1)) {
        return from_json_text(body.as_str()).context("parse fenced json block");
    }

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => {
            from_json_text(&text[start..=end]).context("parse embedded json object")
        }
        _ => Err(anyhow!("no json object found in review text")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Severity;
    use serde_json::json;

    fn report_json(score: i64) -> Value {
        json!({
            "passed": false,
            "score": score,
            "summary": "needs work",
            "issues": [{
                "severity": "critical",
                "category": "accessibility",
                "file_path": "src/App.tsx",
                "description": "missing alt",
                "suggestion": "add alt text"
            }]
        })
    }

    #[test]
    fn schema_compiles() {
        report_validator().expect("schema");
    }

    #[test]
    fn structured_payload_is_accepted_directly() {
        let value = report_json(61);
        let report = parse_report(ReportPayload::Structured(&value)).expect("parse");
        assert_eq!(report.score, 61);
        assert_eq!(report.issues[0].severity, Severity::Critical);
        assert!(report.fixed_files.is_empty());
    }

    #[test]
    fn text_payload_is_parsed_as_json() {
        let text = report_json(45).to_string();
        let report = parse_report(ReportPayload::Text(&text)).expect("parse");
        assert_eq!(report.score, 45);
    }

    #[test]
    fn fenced_block_inside_prose_is_found() {
        let text = format!(
            "Review complete.\n\n```json\n{}\n```\nThanks.",
            serde_json::to_string_pretty(&report_json(70)).expect("json")
        );
        let report = parse_report(ReportPayload::Text(&text)).expect("parse");
        assert_eq!(report.score, 70);
    }

    #[test]
    fn bare_object_inside_prose_is_found() {
        let text = format!("Here you go: {} -- end", report_json(88));
        let report = parse_report(ReportPayload::Text(&text)).expect("parse");
        assert_eq!(report.score, 88);
    }

    #[test]
    fn out_of_range_score_is_rejected() {
        let value = report_json(101);
        assert!(parse_report(ReportPayload::Structured(&value)).is_err());

        let text = report_json(-1).to_string();
        assert!(parse_report(ReportPayload::Text(&text)).is_err());

        let report = QaReport {
            passed: true,
            score: 180,
            summary: String::new(),
            issues: Vec::new(),
            fixed_files: Vec::new(),
        };
        let err = validate_report(&report).unwrap_err();
        assert!(err.to_string().contains("score"));
    }

    #[test]
    fn boundary_scores_are_accepted() {
        for score in [0, 100] {
            let value = report_json(score);
            let report = parse_report(ReportPayload::Structured(&value)).expect("parse");
            assert_eq!(i64::from(report.score), score);
        }
    }

    #[test]
    fn missing_lists_and_extra_keys_are_tolerated() {
        let value = json!({
            "passed": true,
            "score": 92,
            "summary": "clean",
            "reviewer": "qa"
        });
        let report = parse_report(ReportPayload::Structured(&value)).expect("parse");
        assert!(report.issues.is_empty());
        assert!(report.fixed_files.is_empty());
    }

    #[test]
    fn unknown_severity_is_rejected() {
        let mut value = report_json(50);
        value["issues"][0]["severity"] = json!("blocker");
        assert!(parse_report(ReportPayload::Structured(&value)).is_err());
    }

    #[test]
    fn empty_and_garbage_text_fail() {
        assert!(parse_report(ReportPayload::Text("   ")).is_err());
        assert!(parse_report(ReportPayload::Text("looks good to me")).is_err());
    }

    #[test]
    fn string_wrapped_json_is_unwrapped() {
        let value = Value::String(report_json(33).to_string());
        let report = parse_report(ReportPayload::Structured(&value)).expect("parse");
        assert_eq!(report.score, 33);
    }
}
