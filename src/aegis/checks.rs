//! External checks backing the Aegis stages.
//!
//! Each check shells out to the project's native toolchain (or ripgrep) and
//! reduces the output to a count or a flag. Parsing lives in small pure
//! functions so it can be exercised without the tools installed.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::AegisConfig;

use super::exec::{
    count_nonempty_lines, count_occurrences, run_tool, sum_match_counts, ExecError, ToolOutput,
};

/// The checks the verifier sequences.
///
/// Implementations report findings, or an [`ExecError`] when the backing
/// tool could not produce a usable answer.
pub trait CheckRunner {
    fn lint_issues(&self) -> Result<u32, ExecError>;
    fn warnings(&self) -> Result<u32, ExecError>;
    fn core_bugs(&self) -> Result<u32, ExecError>;
    fn dead_code(&self) -> Result<bool, ExecError>;
    fn suppressed_elements(&self) -> Result<bool, ExecError>;
}

/// Native toolchain recognised from a manifest in the project root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toolchain {
    Go,
    Cargo,
}

impl Toolchain {
    /// `go.mod` wins over `Cargo.toml` when both are present.
    pub fn detect(dir: &Path) -> Option<Self> {
        if dir.join("go.mod").is_file() {
            Some(Toolchain::Go)
        } else if dir.join("Cargo.toml").is_file() {
            Some(Toolchain::Cargo)
        } else {
            None
        }
    }
}

/// ripgrep exits 1 when nothing matched.
const RG_NO_MATCH: i32 = 1;

/// Interpret a finished ripgrep run, mapping "no match" to `None`.
///
/// Any other exit that printed something (e.g. exit 2 with unreadable
/// files reported on stderr) is still parsed.
fn search_result(out: ToolOutput) -> Result<Option<ToolOutput>, ExecError> {
    if out.code == Some(RG_NO_MATCH) && out.stdout.trim().is_empty() {
        return Ok(None);
    }
    out.require_output("rg").map(Some)
}

/// Total of a `rg -c` run.
fn match_total(out: ToolOutput) -> Result<u32, ExecError> {
    Ok(search_result(out)?
        .map(|out| sum_match_counts(&out.stdout))
        .unwrap_or(0))
}

/// Whether a `rg -l` run listed any file.
fn any_match(out: ToolOutput) -> Result<bool, ExecError> {
    Ok(search_result(out)?
        .map(|out| !out.stdout.trim().is_empty())
        .unwrap_or(false))
}

/// Runs the checks against a project directory with real tools.
#[derive(Debug, Clone)]
pub struct ToolchainRunner {
    work_dir: PathBuf,
    toolchain: Option<Toolchain>,
    timeout: Option<Duration>,
    bug_marker_pattern: String,
    suppression_pattern: String,
}

impl ToolchainRunner {
    pub fn new(work_dir: &Path, config: &AegisConfig) -> Self {
        let toolchain = Toolchain::detect(work_dir);
        tracing::debug!(?toolchain, dir = %work_dir.display(), "detected toolchain");
        Self {
            work_dir: work_dir.to_path_buf(),
            toolchain,
            timeout: match config.command_timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            bug_marker_pattern: config.bug_marker_pattern.clone(),
            suppression_pattern: config.suppression_pattern.clone(),
        }
    }

    pub fn toolchain(&self) -> Option<Toolchain> {
        self.toolchain
    }

    fn run(&self, tool: &str, program: &str, args: &[&str]) -> Result<ToolOutput, ExecError> {
        run_tool(tool, program, args, &self.work_dir, self.timeout)?.require_output(tool)
    }

    fn search(&self, args: &[&str]) -> Result<ToolOutput, ExecError> {
        run_tool("rg", "rg", args, &self.work_dir, self.timeout)
    }

    fn dir_arg(&self) -> String {
        self.work_dir.to_string_lossy().into_owned()
    }
}

impl CheckRunner for ToolchainRunner {
    fn lint_issues(&self) -> Result<u32, ExecError> {
        match self.toolchain {
            Some(Toolchain::Go) => {
                let out = self.run("go vet", "go", &["vet", "./..."])?;
                Ok(count_nonempty_lines(&out.combined()))
            }
            Some(Toolchain::Cargo) => {
                let out = self.run("cargo clippy", "cargo", &["clippy", "--message-format=short"])?;
                Ok(count_occurrences(&out.combined(), "warning:"))
            }
            None => Ok(0),
        }
    }

    fn warnings(&self) -> Result<u32, ExecError> {
        match self.toolchain {
            Some(Toolchain::Go) => {
                let out = self.run("go build", "go", &["build", "-v", "./..."])?;
                Ok(count_occurrences(&out.combined(), "warning"))
            }
            Some(Toolchain::Cargo) => {
                let out = self.run("cargo check", "cargo", &["check", "--message-format=short"])?;
                Ok(count_occurrences(&out.combined(), "warning:"))
            }
            None => Ok(0),
        }
    }

    fn core_bugs(&self) -> Result<u32, ExecError> {
        let dir = self.dir_arg();
        let args = [
            "-c",
            self.bug_marker_pattern.as_str(),
            dir.as_str(),
            "--type",
            "go",
            "--type",
            "rust",
            "--type",
            "ts",
        ];
        match_total(self.search(&args)?)
    }

    fn dead_code(&self) -> Result<bool, ExecError> {
        match self.toolchain {
            Some(Toolchain::Go) => {
                let out = self.run("go vet", "go", &["vet", "-unusedresult", "./..."])?;
                Ok(out.combined().contains("unused"))
            }
            Some(Toolchain::Cargo) => {
                let out = self.run("cargo check", "cargo", &["check"])?;
                Ok(out.combined().contains("dead_code"))
            }
            None => Ok(false),
        }
    }

    fn suppressed_elements(&self) -> Result<bool, ExecError> {
        let dir = self.dir_arg();
        let args = ["-l", self.suppression_pattern.as_str(), dir.as_str()];
        any_match(self.search(&args)?)
    }
}
