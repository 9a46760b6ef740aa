//! Hook adapter driven end to end with scripted checks and a real session file.

use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::time::Duration;

use kavach::aegis::{AegisVerifier, CheckRunner, ExecError, Stage, Status};
use kavach::config::ExecErrorPolicy;
use kavach::hook::{HookAdapter, HookOutcome};
use kavach::report::RunHeader;
use kavach::session::{FileSessionStore, SessionStore};
use tempfile::TempDir;

/// Check results keyed by name; records the order checks were asked for.
#[derive(Default)]
struct ScriptedRunner {
    lint_issues: u32,
    core_bugs: u32,
    suppressed: bool,
    missing_tools: bool,
    calls: RefCell<Vec<&'static str>>,
}

impl ScriptedRunner {
    fn call<T>(&self, name: &'static str, value: T) -> Result<T, ExecError> {
        self.calls.borrow_mut().push(name);
        if self.missing_tools && name == "dead_code" {
            return Err(ExecError::TimedOut {
                tool: "cargo check".to_string(),
                limit: Duration::from_secs(300),
            });
        }
        Ok(value)
    }
}

impl CheckRunner for ScriptedRunner {
    fn lint_issues(&self) -> Result<u32, ExecError> {
        self.call("lint_issues", self.lint_issues)
    }

    fn warnings(&self) -> Result<u32, ExecError> {
        self.call("warnings", 0)
    }

    fn core_bugs(&self) -> Result<u32, ExecError> {
        self.call("core_bugs", self.core_bugs)
    }

    fn dead_code(&self) -> Result<bool, ExecError> {
        self.call("dead_code", false)
    }

    fn suppressed_elements(&self) -> Result<bool, ExecError> {
        self.call("suppressed", self.suppressed)
    }
}

const HEADER: RunHeader<'static> = RunHeader {
    project: "shop-api",
    date: "2026-10-19",
    task: Some("T-12"),
};

fn session_store(dir: &Path) -> FileSessionStore {
    FileSessionStore::new(
        dir.join("kavach").join("session-state.toon"),
        HEADER.project,
        Path::new("/work/shop-api"),
        HEADER.date,
    )
}

fn run(
    runner: &ScriptedRunner,
    session: &dyn SessionStore,
    policy: ExecErrorPolicy,
    payload: &str,
) -> (HookOutcome, String, String) {
    let adapter = HookAdapter::new(runner, session, policy, HEADER);
    let mut decisions = Vec::new();
    let mut diagnostics = Vec::new();
    let outcome = adapter
        .run(payload.as_bytes(), &mut decisions, &mut diagnostics)
        .expect("hook should run");
    (
        outcome,
        String::from_utf8(decisions).unwrap(),
        String::from_utf8(diagnostics).unwrap(),
    )
}

#[test]
fn test_stage_order_and_short_circuit() {
    let runner = ScriptedRunner {
        core_bugs: 1,
        ..ScriptedRunner::default()
    };
    let result = AegisVerifier::new(&runner, ExecErrorPolicy::Lenient).verify();

    assert_eq!(*runner.calls.borrow(), ["lint_issues", "warnings", "core_bugs"]);
    assert_eq!(result.stage(), Stage::Testing);
    assert_eq!(result.status(), Status::Failed);
    assert!(!result.dead_code());
    assert!(!result.suppressed());
}

#[test]
fn test_passing_hook_marks_session_file() {
    let temp = TempDir::new().unwrap();
    let store = session_store(temp.path());
    let runner = ScriptedRunner::default();

    let (outcome, decisions, diagnostics) = run(
        &runner,
        &store,
        ExecErrorPolicy::Lenient,
        r#"{"sessionId":"abc","toolName":"Bash","toolResponse":{"exit_code":0}}"#,
    );

    assert!(matches!(outcome, HookOutcome::Decided(_)));
    assert_eq!(
        decisions,
        "{\"decision\":\"approve\",\"reason\":\"aegis:verified\"}\n"
    );
    assert!(diagnostics.contains("task: T-12\n"));
    assert!(diagnostics.contains("[PROMISE]"));

    let saved = fs::read_to_string(store.path()).unwrap();
    assert!(saved.contains("project: shop-api\n"));
    assert!(saved.contains("aegis: true\n"));
}

#[test]
fn test_failing_hook_leaves_session_untouched() {
    let temp = TempDir::new().unwrap();
    let store = session_store(temp.path());
    let runner = ScriptedRunner {
        suppressed: true,
        ..ScriptedRunner::default()
    };

    let (_, decisions, diagnostics) = run(
        &runner,
        &store,
        ExecErrorPolicy::Lenient,
        r#"{"tool_response":"edited"}"#,
    );

    let decision: serde_json::Value = serde_json::from_str(decisions.trim()).unwrap();
    assert_eq!(decision["decision"], "block");
    assert_eq!(decision["reason"], "suppressed_elements:found");
    assert!(diagnostics.contains("stage: VERIFIED\nstatus: failed\n"));
    assert!(!store.path().exists());
}

#[test]
fn test_timed_out_tool_is_reported_not_failed() {
    let temp = TempDir::new().unwrap();
    let store = session_store(temp.path());
    let runner = ScriptedRunner {
        missing_tools: true,
        ..ScriptedRunner::default()
    };

    let (_, decisions, diagnostics) = run(
        &runner,
        &store,
        ExecErrorPolicy::Lenient,
        r#"{"tool_response":"ok"}"#,
    );
    assert!(decisions.contains("\"approve\""));
    assert!(diagnostics.contains("  - cargo check timed out after 300s\n"));

    let strict_store = session_store(&temp.path().join("strict"));
    let (_, decisions, _) = run(
        &runner,
        &strict_store,
        ExecErrorPolicy::Strict,
        r#"{"tool_response":"ok"}"#,
    );
    assert!(decisions.contains("\"reason\":\"aegis:inconclusive\""));
    assert!(!strict_store.path().exists());
}

#[test]
fn test_no_content_is_silent() {
    let temp = TempDir::new().unwrap();
    let store = session_store(temp.path());
    let runner = ScriptedRunner {
        lint_issues: 9,
        ..ScriptedRunner::default()
    };

    let (outcome, decisions, diagnostics) = run(
        &runner,
        &store,
        ExecErrorPolicy::Lenient,
        r#"{"tool_name":"Read","tool_response":[]}"#,
    );
    assert_eq!(outcome, HookOutcome::Skipped);
    assert!(decisions.is_empty());
    assert!(diagnostics.is_empty());
    assert!(runner.calls.borrow().is_empty());
}
