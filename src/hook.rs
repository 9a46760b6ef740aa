//! Hook mode: verdict → approve/block decision for an orchestrator.
//!
//! # Channels
//!
//! | Channel | Content |
//! |---------|---------|
//! | decisions (stdout) | exactly one JSON line, or nothing for an empty payload |
//! | report (stderr) | the Aegis TOON report |
//!
//! # Exit Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Decision written, or nothing to verify |
//! | 1 | I/O failure |
//! | 4 | Malformed payload |

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{Read, Write};
use thiserror::Error;

use crate::aegis::{AegisVerifier, CheckRunner, Status, VerificationResult};
use crate::config::ExecErrorPolicy;
use crate::report::{self, RunHeader};
use crate::session::SessionStore;

/// Gate name carried in block context.
pub const GATE: &str = "AEGIS_FAIL";
pub const VERIFIED_REASON: &str = "aegis:verified";
pub const INCONCLUSIVE_REASON: &str = "aegis:inconclusive";

#[derive(Debug, Error)]
pub enum HookError {
    #[error("invalid hook input: {0}")]
    InvalidInput(String),

    #[error("hook payload is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("hook I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HookError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidInput(_) | Self::Serialization(_) => 4,
            Self::Io(_) => 1,
        }
    }
}

/// Payload an orchestrator sends after a tool call.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct HookInput {
    #[serde(default, alias = "sessionId")]
    pub session_id: Option<String>,
    #[serde(default, alias = "toolName")]
    pub tool_name: Option<String>,
    #[serde(default, alias = "toolInput")]
    pub tool_input: Option<Value>,
    #[serde(default, alias = "toolResponse")]
    pub tool_response: Option<Value>,
}

impl HookInput {
    /// Parse a payload. It must be a JSON object.
    pub fn parse(text: &str) -> Result<Self, HookError> {
        if text.trim().is_empty() {
            return Err(HookError::InvalidInput("empty payload".to_string()));
        }
        let value: Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Err(HookError::InvalidInput(
                "payload must be a JSON object".to_string(),
            ));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Whether the tool response carries anything to verify.
    pub fn has_tool_response(&self) -> bool {
        match &self.tool_response {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Object(map)) => !map.is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Bool(_)) | Some(Value::Number(_)) => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Block,
}

/// The single line written to the decision channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookResponse {
    pub decision: Decision,
    pub reason: String,
    #[serde(rename = "additionalContext", skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
}

impl HookResponse {
    pub fn approve() -> Self {
        Self {
            decision: Decision::Approve,
            reason: VERIFIED_REASON.to_string(),
            additional_context: None,
        }
    }

    pub fn block(reason: String, date: &str) -> Self {
        let context = report::block_context(GATE, &reason, date);
        Self {
            decision: Decision::Block,
            reason,
            additional_context: Some(context),
        }
    }

    /// Map a verdict to a decision.
    pub fn from_result(result: &VerificationResult, date: &str) -> Self {
        match result.status() {
            Status::Passed => Self::approve(),
            Status::Failed => Self::block(result.fail_reasons().join(","), date),
            Status::Inconclusive => Self::block(INCONCLUSIVE_REASON.to_string(), date),
        }
    }
}

/// What a hook invocation ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    /// Nothing to verify; no decision was written.
    Skipped,
    Decided(HookResponse),
}

/// Wraps the verifier for automated invocation.
pub struct HookAdapter<'a> {
    runner: &'a dyn CheckRunner,
    session: &'a dyn SessionStore,
    policy: ExecErrorPolicy,
    header: RunHeader<'a>,
}

impl<'a> HookAdapter<'a> {
    pub fn new(
        runner: &'a dyn CheckRunner,
        session: &'a dyn SessionStore,
        policy: ExecErrorPolicy,
        header: RunHeader<'a>,
    ) -> Self {
        Self {
            runner,
            session,
            policy,
            header,
        }
    }

    /// Read a payload from `input`, verify, and write the decision and the
    /// report to their separate channels.
    pub fn run(
        &self,
        mut input: impl Read,
        decisions: &mut impl Write,
        diagnostics: &mut impl Write,
    ) -> Result<HookOutcome, HookError> {
        let mut text = String::new();
        input.read_to_string(&mut text)?;
        let payload = HookInput::parse(&text)?;

        if !payload.has_tool_response() {
            tracing::debug!(tool = ?payload.tool_name, "hook payload has no tool response, skipping");
            return Ok(HookOutcome::Skipped);
        }

        let result = AegisVerifier::new(self.runner, self.policy).verify();
        report::write_aegis_toon(diagnostics, self.header, &result)?;

        if result.passed() {
            // The decision stands even if the session cannot be updated.
            if let Err(e) = self.session.mark_aegis_verified() {
                tracing::warn!(error = %e, "could not record verification in session");
                writeln!(diagnostics, "warning: {}", e)?;
            }
        }

        let response = HookResponse::from_result(&result, self.header.date);
        serde_json::to_writer(&mut *decisions, &response)?;
        writeln!(decisions)?;
        decisions.flush()?;

        tracing::info!(decision = ?response.decision, reason = %response.reason, "hook decision");
        Ok(HookOutcome::Decided(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aegis::testing::FakeRunner;
    use crate::session::{MemorySessionStore, SessionError};
    use std::path::PathBuf;

    const HEADER: RunHeader<'static> = RunHeader {
        project: "demo",
        date: "2026-10-19",
        task: None,
    };

    struct Outputs {
        outcome: Result<HookOutcome, HookError>,
        decisions: String,
        report: String,
    }

    fn run_hook(payload: &str, runner: &FakeRunner, session: &dyn SessionStore) -> Outputs {
        let adapter = HookAdapter::new(runner, session, ExecErrorPolicy::Lenient, HEADER);
        let mut decisions = Vec::new();
        let mut report = Vec::new();
        let outcome = adapter.run(payload.as_bytes(), &mut decisions, &mut report);
        Outputs {
            outcome,
            decisions: String::from_utf8(decisions).unwrap(),
            report: String::from_utf8(report).unwrap(),
        }
    }

    #[test]
    fn test_empty_tool_response_variants() {
        for payload in [
            r#"{"tool_name":"Edit"}"#,
            r#"{"tool_response":null}"#,
            r#"{"tool_response":""}"#,
            r#"{"tool_response":{}}"#,
            r#"{"toolResponse":[]}"#,
        ] {
            let input = HookInput::parse(payload).unwrap();
            assert!(!input.has_tool_response(), "{}", payload);
        }
        let input = HookInput::parse(r#"{"toolResponse":{"ok":true}}"#).unwrap();
        assert!(input.has_tool_response());
    }

    #[test]
    fn test_skip_writes_nothing() {
        let runner = FakeRunner::default();
        let session = MemorySessionStore::new();
        let out = run_hook(r#"{"session_id":"s1","tool_response":{}}"#, &runner, &session);
        assert_eq!(out.outcome.unwrap(), HookOutcome::Skipped);
        assert!(out.decisions.is_empty());
        assert!(out.report.is_empty());
        assert_eq!(runner.stage2_calls.get(), 0);
        assert!(!session.is_verified());
    }

    #[test]
    fn test_pass_approves_and_marks_session() {
        let runner = FakeRunner::default();
        let session = MemorySessionStore::new();
        let out = run_hook(r#"{"tool_response":"done"}"#, &runner, &session);

        assert_eq!(
            out.decisions,
            "{\"decision\":\"approve\",\"reason\":\"aegis:verified\"}\n"
        );
        assert!(out.report.starts_with("[AEGIS:VERIFICATION]\n"));
        assert!(!out.report.contains("decision"));
        assert!(session.is_verified());
    }

    #[test]
    fn test_fail_blocks_with_joined_reasons() {
        let runner = FakeRunner {
            lint_issues: 2,
            core_bugs: 1,
            ..FakeRunner::default()
        };
        let session = MemorySessionStore::new();
        let out = run_hook(r#"{"tool_response":{"stdout":"ok"}}"#, &runner, &session);

        let json: Value = serde_json::from_str(out.decisions.trim()).unwrap();
        assert_eq!(json["decision"], "block");
        assert_eq!(json["reason"], "lint_issues:2,core_bugs:1");
        assert_eq!(
            json["additionalContext"],
            "[BLOCK]\ngate: AEGIS_FAIL\nreason: lint_issues:2,core_bugs:1\ndate: 2026-10-19\n"
        );
        assert_eq!(out.decisions.lines().count(), 1);
        assert!(out.report.contains("[AEGIS_FAILURES]"));
        assert!(!session.is_verified());
    }

    #[test]
    fn test_strict_inconclusive_blocks() {
        let runner = FakeRunner {
            broken_warnings: true,
            ..FakeRunner::default()
        };
        let session = MemorySessionStore::new();
        let adapter = HookAdapter::new(&runner, &session, ExecErrorPolicy::Strict, HEADER);
        let mut decisions = Vec::new();
        let mut report = Vec::new();
        let outcome = adapter
            .run(&br#"{"tool_response":"x"}"#[..], &mut decisions, &mut report)
            .unwrap();

        match outcome {
            HookOutcome::Decided(response) => {
                assert_eq!(response.decision, Decision::Block);
                assert_eq!(response.reason, INCONCLUSIVE_REASON);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(!session.is_verified());
    }

    #[test]
    fn test_malformed_payload_exit_code() {
        let runner = FakeRunner::default();
        let session = MemorySessionStore::new();
        for payload in ["", "not json", "[1,2]"] {
            let out = run_hook(payload, &runner, &session);
            let err = out.outcome.unwrap_err();
            assert_eq!(err.exit_code(), 4, "{}", payload);
            assert!(out.decisions.is_empty());
        }
    }

    struct BrokenStore;

    impl SessionStore for BrokenStore {
        fn mark_aegis_verified(&self) -> Result<(), SessionError> {
            Err(SessionError::Locked {
                path: PathBuf::from("/tmp/session-state.toon"),
            })
        }
    }

    #[test]
    fn test_session_failure_still_approves() {
        let runner = FakeRunner::default();
        let out = run_hook(r#"{"tool_response":"done"}"#, &runner, &BrokenStore);
        assert!(matches!(
            out.outcome.unwrap(),
            HookOutcome::Decided(HookResponse {
                decision: Decision::Approve,
                ..
            })
        ));
        assert!(out.report.contains("warning: session file"));
    }

    #[test]
    fn test_io_error_exit_code() {
        let err = HookError::from(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"));
        assert_eq!(err.exit_code(), 1);
    }
}
