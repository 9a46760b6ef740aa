//! Kavach - a policy gate for in-progress engineering tasks.
//!
//! Kavach decides whether a task may be marked complete. It combines cheap
//! per-file analysis with a two-stage verification of the whole project.
//!
//! # Architecture
//!
//! - `syntax`: delimiter balance scanner (string and comment aware)
//! - `lint`: per-file rule set with trailing-whitespace auto-fix
//! - `quality`: size, declaration and import metrics with the DACE score
//! - `aegis`: external tool checks and the TESTING → VERIFIED state machine
//! - `hook`: approve/block decisions for an orchestrator
//! - `session`: the persisted "verified" flag
//! - `config`, `context`: YAML configuration and the per-run context
//! - `report`: TOON and JSON output
//!
//! # Adding a New Language
//!
//! Add a variant to [`Language`] and fill in each exhaustive match in
//! `language.rs`; the compiler points at every mapping that needs a decision.

pub mod aegis;
pub mod cli;
pub mod config;
pub mod context;
pub mod hook;
pub mod language;
pub mod lint;
pub mod quality;
pub mod report;
pub mod session;
pub mod syntax;

pub use aegis::{AegisVerifier, CheckRunner, ExecError, Stage, Status, VerificationResult};
pub use config::{Config, ExecErrorPolicy};
pub use context::Context;
pub use hook::{HookAdapter, HookError, HookInput, HookOutcome, HookResponse};
pub use language::Language;
pub use lint::{FileAnalyzer, IssueCode, LintIssue, LintResult};
pub use quality::{Complexity, QualityMetrics, QualityScorer};
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionError, SessionStore};
pub use syntax::{SyntaxDefect, SyntaxVariant};
