//! Bounded execution of external tools.

use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

/// How often a running tool is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

lazy_static! {
    /// Trailing count of a ripgrep `path:count` line.
    static ref MATCH_COUNT: Regex = Regex::new(r":(\d+)\s*$").unwrap();
}

/// An external tool could not produce a usable result.
///
/// The `Display` form is what ends up in a verification's exec error list.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("{tool} not found in PATH")]
    NotFound { tool: String },
    #[error("{tool} failed: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },
    #[error("{tool} failed: {status}")]
    Failed { tool: String, status: String },
    #[error("{tool} timed out after {limit:?}")]
    TimedOut { tool: String, limit: Duration },
}

/// Captured result of a finished tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub status: String,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    fn from_parts(status: ExitStatus, stdout: String, stderr: String) -> Self {
        Self {
            success: status.success(),
            code: status.code(),
            status: status.to_string(),
            stdout,
            stderr,
        }
    }

    /// stdout followed by stderr.
    pub fn combined(&self) -> String {
        let mut text = self.stdout.clone();
        text.push_str(&self.stderr);
        text
    }

    /// The tool reported failure without printing anything to go on.
    pub fn is_silent_failure(&self) -> bool {
        !self.success && self.stdout.trim().is_empty() && self.stderr.trim().is_empty()
    }

    /// Treat a silent failure as an exec error; anything else is parseable.
    pub fn require_output(self, tool: &str) -> Result<Self, ExecError> {
        if self.is_silent_failure() {
            return Err(ExecError::Failed {
                tool: tool.to_string(),
                status: self.status,
            });
        }
        Ok(self)
    }
}

/// Run `program` with `args` in `dir`, waiting at most `timeout`.
///
/// `tool` is the human-readable label used in errors and logs. A timed-out
/// process is killed.
pub fn run_tool(
    tool: &str,
    program: &str,
    args: &[&str],
    dir: &Path,
    timeout: Option<Duration>,
) -> Result<ToolOutput, ExecError> {
    let started = Instant::now();
    tracing::debug!(tool, program, ?args, dir = %dir.display(), "running external tool");

    let mut child = Command::new(program)
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| spawn_error(tool, e))?;

    // Drain both pipes concurrently so a chatty tool cannot block on a full pipe.
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let stdout_reader = thread::spawn(move || drain(stdout));
    let stderr_reader = thread::spawn(move || drain(stderr));

    let status = match timeout {
        Some(limit) => match wait_with_deadline(&mut child, limit).map_err(|e| spawn_error(tool, e))? {
            Some(status) => status,
            None => {
                // Readers are left detached: grandchildren may still hold the pipes.
                tracing::warn!(tool, ?limit, "external tool timed out");
                return Err(ExecError::TimedOut {
                    tool: tool.to_string(),
                    limit,
                });
            }
        },
        None => child.wait().map_err(|e| spawn_error(tool, e))?,
    };

    let stdout = stdout_reader.join().unwrap_or_default();
    let stderr = stderr_reader.join().unwrap_or_default();

    tracing::debug!(
        tool,
        %status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "external tool finished"
    );

    Ok(ToolOutput::from_parts(status, stdout, stderr))
}

fn spawn_error(tool: &str, e: io::Error) -> ExecError {
    if e.kind() == io::ErrorKind::NotFound {
        ExecError::NotFound {
            tool: tool.to_string(),
        }
    } else {
        ExecError::Spawn {
            tool: tool.to_string(),
            source: e,
        }
    }
}

fn drain<R: Read>(pipe: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Poll until the child exits or `limit` elapses. `None` means it was killed.
fn wait_with_deadline(child: &mut Child, limit: Duration) -> io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Count lines with any non-whitespace content.
pub fn count_nonempty_lines(text: &str) -> u32 {
    text.lines().filter(|l| !l.trim().is_empty()).count() as u32
}

/// Count non-overlapping occurrences of `needle`.
pub fn count_occurrences(text: &str, needle: &str) -> u32 {
    text.matches(needle).count() as u32
}

/// Sum the trailing `:<count>` of each `path:count` line (ripgrep `-c`).
pub fn sum_match_counts(text: &str) -> u32 {
    text.lines()
        .filter_map(|l| MATCH_COUNT.captures(l))
        .filter_map(|c| c[1].parse::<u32>().ok())
        .sum()
}
