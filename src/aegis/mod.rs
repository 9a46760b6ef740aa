//! Aegis: the two-stage verification gate.
//!
//! Stage 1 (TESTING) counts lint issues, build warnings and bug markers.
//! Only when none of those fail does Stage 2 (VERIFIED) look for dead code
//! and suppressed diagnostics. Tool failures are collected separately and
//! never become fail reasons themselves.

pub mod checks;
pub mod exec;

pub use checks::{CheckRunner, Toolchain, ToolchainRunner};
pub use exec::ExecError;

use serde::Serialize;

use crate::config::ExecErrorPolicy;

/// Stage a verification run reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Stage {
    Testing,
    Verified,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Testing => "TESTING",
            Stage::Verified => "VERIFIED",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Verdict of a verification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Passed,
    Failed,
    /// No fail reasons, but some checks could not run (strict policy only).
    Inconclusive,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Passed => "passed",
            Status::Failed => "failed",
            Status::Inconclusive => "inconclusive",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one verification run.
///
/// Only [`AegisVerifier`] builds these. `status` is `failed` exactly when
/// `fail_reasons` is non-empty, at every point during the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    stage: Stage,
    status: Status,
    lint_issues: u32,
    warnings: u32,
    core_bugs: u32,
    dead_code: bool,
    suppressed: bool,
    algorithm_ok: bool,
    fail_reasons: Vec<String>,
    exec_errors: Vec<String>,
}

impl VerificationResult {
    fn new() -> Self {
        Self {
            stage: Stage::Testing,
            status: Status::Passed,
            lint_issues: 0,
            warnings: 0,
            core_bugs: 0,
            dead_code: false,
            suppressed: false,
            algorithm_ok: false,
            fail_reasons: Vec::new(),
            exec_errors: Vec::new(),
        }
    }

    fn fail(&mut self, reason: String) {
        self.fail_reasons.push(reason);
        self.status = Status::Failed;
    }

    /// Unwrap a check result, recording an exec error and falling back to
    /// the zero finding.
    fn capture<T: Default>(&mut self, outcome: Result<T, ExecError>) -> T {
        match outcome {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "check could not run");
                self.exec_errors.push(e.to_string());
                T::default()
            }
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn passed(&self) -> bool {
        self.status == Status::Passed
    }

    pub fn lint_issues(&self) -> u32 {
        self.lint_issues
    }

    pub fn warnings(&self) -> u32 {
        self.warnings
    }

    pub fn core_bugs(&self) -> u32 {
        self.core_bugs
    }

    pub fn dead_code(&self) -> bool {
        self.dead_code
    }

    pub fn suppressed(&self) -> bool {
        self.suppressed
    }

    pub fn algorithm_ok(&self) -> bool {
        self.algorithm_ok
    }

    pub fn fail_reasons(&self) -> &[String] {
        &self.fail_reasons
    }

    pub fn exec_errors(&self) -> &[String] {
        &self.exec_errors
    }
}

/// Sequences the checks of a [`CheckRunner`] into a verdict.
pub struct AegisVerifier<'a> {
    runner: &'a dyn CheckRunner,
    policy: ExecErrorPolicy,
}

impl<'a> AegisVerifier<'a> {
    pub fn new(runner: &'a dyn CheckRunner, policy: ExecErrorPolicy) -> Self {
        Self { runner, policy }
    }

    pub fn verify(&self) -> VerificationResult {
        let mut result = VerificationResult::new();

        tracing::info!(stage = %Stage::Testing, "aegis stage 1");
        let lint_issues = self.runner.lint_issues();
        result.lint_issues = result.capture(lint_issues);
        let warnings = self.runner.warnings();
        result.warnings = result.capture(warnings);
        let core_bugs = self.runner.core_bugs();
        result.core_bugs = result.capture(core_bugs);

        if result.lint_issues > 0 {
            result.fail(format!("lint_issues:{}", result.lint_issues));
        }
        if result.warnings > 0 {
            result.fail(format!("warnings:{}", result.warnings));
        }
        if result.core_bugs > 0 {
            result.fail(format!("core_bugs:{}", result.core_bugs));
        }

        if !result.fail_reasons.is_empty() {
            tracing::info!(reasons = ?result.fail_reasons, "aegis stopped at stage 1");
            return result;
        }

        result.stage = Stage::Verified;
        tracing::info!(stage = %Stage::Verified, "aegis stage 2");
        let dead_code = self.runner.dead_code();
        result.dead_code = result.capture(dead_code);
        let suppressed = self.runner.suppressed_elements();
        result.suppressed = result.capture(suppressed);
        // No automated algorithm check exists yet.
        result.algorithm_ok = true;

        if result.dead_code {
            result.fail("dead_code:found".to_string());
        }
        if result.suppressed {
            result.fail("suppressed_elements:found".to_string());
        }

        if result.status == Status::Passed
            && self.policy == ExecErrorPolicy::Strict
            && !result.exec_errors.is_empty()
        {
            result.status = Status::Inconclusive;
        }

        tracing::info!(status = %result.status, "aegis finished");
        result
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::Cell;

    /// Canned check results, counting Stage 2 calls.
    #[derive(Default)]
    pub struct FakeRunner {
        pub lint_issues: u32,
        pub warnings: u32,
        pub core_bugs: u32,
        pub dead_code: bool,
        pub suppressed: bool,
        pub broken_warnings: bool,
        pub broken_dead_code: bool,
        pub stage2_calls: Cell<u32>,
    }

    fn broken(tool: &str) -> ExecError {
        ExecError::NotFound {
            tool: tool.to_string(),
        }
    }

    impl CheckRunner for FakeRunner {
        fn lint_issues(&self) -> Result<u32, ExecError> {
            Ok(self.lint_issues)
        }

        fn warnings(&self) -> Result<u32, ExecError> {
            if self.broken_warnings {
                return Err(broken("cargo check"));
            }
            Ok(self.warnings)
        }

        fn core_bugs(&self) -> Result<u32, ExecError> {
            Ok(self.core_bugs)
        }

        fn dead_code(&self) -> Result<bool, ExecError> {
            self.stage2_calls.set(self.stage2_calls.get() + 1);
            if self.broken_dead_code {
                return Err(broken("go vet"));
            }
            Ok(self.dead_code)
        }

        fn suppressed_elements(&self) -> Result<bool, ExecError> {
            self.stage2_calls.set(self.stage2_calls.get() + 1);
            Ok(self.suppressed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeRunner;
    use super::*;

    fn verify(runner: &FakeRunner) -> VerificationResult {
        AegisVerifier::new(runner, ExecErrorPolicy::Lenient).verify()
    }

    fn assert_status_invariant(result: &VerificationResult) {
        assert_eq!(
            result.status() == Status::Failed,
            !result.fail_reasons().is_empty()
        );
    }

    #[test]
    fn test_clean_project_passes() {
        let runner = FakeRunner::default();
        let result = verify(&runner);
        assert_eq!(result.stage(), Stage::Verified);
        assert_eq!(result.status(), Status::Passed);
        assert!(result.algorithm_ok());
        assert!(result.fail_reasons().is_empty());
        assert_eq!(runner.stage2_calls.get(), 2);
        assert_status_invariant(&result);
    }

    #[test]
    fn test_core_bug_stops_at_stage_one() {
        let runner = FakeRunner {
            core_bugs: 1,
            dead_code: true,
            suppressed: true,
            ..FakeRunner::default()
        };
        let result = verify(&runner);
        assert_eq!(result.stage(), Stage::Testing);
        assert_eq!(result.status(), Status::Failed);
        assert_eq!(result.fail_reasons(), ["core_bugs:1"]);
        assert!(!result.dead_code());
        assert!(!result.suppressed());
        assert!(!result.algorithm_ok());
        assert_eq!(runner.stage2_calls.get(), 0);
        assert_status_invariant(&result);
    }

    #[test]
    fn test_all_stage_one_reasons_collected() {
        let runner = FakeRunner {
            lint_issues: 3,
            warnings: 2,
            core_bugs: 5,
            ..FakeRunner::default()
        };
        let result = verify(&runner);
        assert_eq!(
            result.fail_reasons(),
            ["lint_issues:3", "warnings:2", "core_bugs:5"]
        );
        assert_eq!(result.lint_issues(), 3);
        assert_eq!(result.warnings(), 2);
        assert_eq!(result.core_bugs(), 5);
    }

    #[test]
    fn test_stage_two_failures() {
        let runner = FakeRunner {
            dead_code: true,
            suppressed: true,
            ..FakeRunner::default()
        };
        let result = verify(&runner);
        assert_eq!(result.stage(), Stage::Verified);
        assert_eq!(result.status(), Status::Failed);
        assert_eq!(
            result.fail_reasons(),
            ["dead_code:found", "suppressed_elements:found"]
        );
        assert!(result.algorithm_ok());
        assert_status_invariant(&result);
    }

    #[test]
    fn test_exec_errors_do_not_fail_lenient_run() {
        let runner = FakeRunner {
            broken_warnings: true,
            broken_dead_code: true,
            ..FakeRunner::default()
        };
        let result = verify(&runner);
        assert_eq!(result.status(), Status::Passed);
        assert_eq!(result.warnings(), 0);
        assert!(!result.dead_code());
        assert_eq!(
            result.exec_errors(),
            ["cargo check not found in PATH", "go vet not found in PATH"]
        );
        assert_status_invariant(&result);
    }

    #[test]
    fn test_strict_policy_is_inconclusive() {
        let runner = FakeRunner {
            broken_warnings: true,
            ..FakeRunner::default()
        };
        let result = AegisVerifier::new(&runner, ExecErrorPolicy::Strict).verify();
        assert_eq!(result.status(), Status::Inconclusive);
        assert!(result.fail_reasons().is_empty());
        assert!(!result.passed());
        assert_status_invariant(&result);
    }

    #[test]
    fn test_strict_policy_keeps_real_failures() {
        let runner = FakeRunner {
            broken_warnings: true,
            lint_issues: 1,
            ..FakeRunner::default()
        };
        let result = AegisVerifier::new(&runner, ExecErrorPolicy::Strict).verify();
        assert_eq!(result.status(), Status::Failed);
        assert_eq!(result.exec_errors().len(), 1);
    }

    #[test]
    fn test_serialized_shape() {
        let result = verify(&FakeRunner::default());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["stage"], "VERIFIED");
        assert_eq!(json["status"], "passed");
        assert_eq!(json["algorithm_ok"], true);
    }
}
