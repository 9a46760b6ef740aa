//! Output formatting for kavach results.
//!
//! Two formats:
//! - TOON: `[SECTION]` headers followed by `key: value` lines and a blank
//!   line. Meant to be read line by line, by people and by agents.
//! - JSON: a flat array of per-file summaries for programmatic consumers.

use serde::Serialize;
use std::io::{self, Write};
use std::str::FromStr;

use crate::aegis::{Status, VerificationResult};
use crate::lint::LintResult;
use crate::quality::QualityMetrics;

/// Selectable output format for `lint` and `quality`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Toon,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "toon" => Ok(OutputFormat::Toon),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown format {:?} (expected toon or json)", other)),
        }
    }
}

// =============================================================================
// Lint
// =============================================================================

#[derive(Serialize)]
struct JsonLintEntry<'a> {
    file: &'a str,
    issues: usize,
    fixed: usize,
}

/// Write lint results. Files without issues are counted but not listed.
pub fn write_lint(w: &mut impl Write, format: OutputFormat, results: &[LintResult]) -> io::Result<()> {
    match format {
        OutputFormat::Toon => write_lint_toon(w, results),
        OutputFormat::Json => write_lint_json(w, results),
    }
}

pub fn write_lint_toon(w: &mut impl Write, results: &[LintResult]) -> io::Result<()> {
    let total_issues: usize = results.iter().map(|r| r.issues.len()).sum();

    writeln!(w, "[LINT_RESULTS]")?;
    writeln!(w, "files: {}", results.len())?;
    writeln!(w, "issues: {}", total_issues)?;
    writeln!(w)?;

    for result in results.iter().filter(|r| r.has_issues()) {
        writeln!(w, "[FILE:{}]", result.file)?;
        for issue in &result.issues {
            writeln!(w, "  {}: [{}] {}", issue.line, issue.code, issue.message)?;
        }
        if result.fixed > 0 {
            writeln!(w, "  fixed: {}", result.fixed)?;
        }
        writeln!(w)?;
    }

    Ok(())
}

pub fn write_lint_json(w: &mut impl Write, results: &[LintResult]) -> io::Result<()> {
    let entries: Vec<JsonLintEntry> = results
        .iter()
        .map(|r| JsonLintEntry {
            file: &r.file,
            issues: r.issues.len(),
            fixed: r.fixed,
        })
        .collect();
    serde_json::to_writer_pretty(&mut *w, &entries)?;
    writeln!(w)
}

// =============================================================================
// Quality
// =============================================================================

#[derive(Serialize)]
struct JsonQualityEntry<'a> {
    file: &'a str,
    lines: usize,
    dace_score: u32,
    ast_valid: bool,
}

pub fn write_quality(
    w: &mut impl Write,
    format: OutputFormat,
    metrics: &[QualityMetrics],
    verbose: bool,
) -> io::Result<()> {
    match format {
        OutputFormat::Toon => write_quality_toon(w, metrics, verbose),
        OutputFormat::Json => write_quality_json(w, metrics),
    }
}

/// Integer mean of the DACE scores, 0 for no files.
pub fn average_dace(metrics: &[QualityMetrics]) -> u32 {
    if metrics.is_empty() {
        return 0;
    }
    let total: u64 = metrics.iter().map(|m| u64::from(m.dace_score())).sum();
    (total / metrics.len() as u64) as u32
}

pub fn write_quality_toon(w: &mut impl Write, metrics: &[QualityMetrics], verbose: bool) -> io::Result<()> {
    let total_lines: usize = metrics.iter().map(|m| m.lines()).sum();
    let total_functions: usize = metrics.iter().map(|m| m.functions()).sum();

    writeln!(w, "[QUALITY_SUMMARY]")?;
    writeln!(w, "files: {}", metrics.len())?;
    writeln!(w, "total_lines: {}", total_lines)?;
    writeln!(w, "total_functions: {}", total_functions)?;
    writeln!(w, "avg_dace_score: {}", average_dace(metrics))?;
    writeln!(w)?;

    if verbose {
        for m in metrics {
            writeln!(w, "[FILE:{}]", m.file())?;
            writeln!(w, "  lines: {}", m.lines())?;
            writeln!(w, "  functions: {}", m.functions())?;
            writeln!(w, "  imports: {}", m.imports())?;
            writeln!(w, "  dace_score: {}", m.dace_score())?;
            writeln!(w, "  complexity: {}", m.complexity())?;
            if !m.ast_valid() {
                writeln!(w, "  ast_error: {}", m.ast_error())?;
            }
            writeln!(w)?;
        }
    }

    Ok(())
}

pub fn write_quality_json(w: &mut impl Write, metrics: &[QualityMetrics]) -> io::Result<()> {
    let entries: Vec<JsonQualityEntry> = metrics
        .iter()
        .map(|m| JsonQualityEntry {
            file: m.file(),
            lines: m.lines(),
            dace_score: m.dace_score(),
            ast_valid: m.ast_valid(),
        })
        .collect();
    serde_json::to_writer_pretty(&mut *w, &entries)?;
    writeln!(w)
}

// =============================================================================
// Aegis
// =============================================================================

/// Identifies the run in the report header.
#[derive(Debug, Clone, Copy)]
pub struct RunHeader<'a> {
    pub project: &'a str,
    pub date: &'a str,
    pub task: Option<&'a str>,
}

fn found(flag: bool) -> &'static str {
    if flag {
        "FOUND"
    } else {
        "CLEAN"
    }
}

pub fn write_aegis_toon(
    w: &mut impl Write,
    header: RunHeader<'_>,
    result: &VerificationResult,
) -> io::Result<()> {
    writeln!(w, "[AEGIS:VERIFICATION]")?;
    writeln!(w, "project: {}", header.project)?;
    writeln!(w, "date: {}", header.date)?;
    if let Some(task) = header.task {
        writeln!(w, "task: {}", task)?;
    }
    writeln!(w, "stage: {}", result.stage())?;
    writeln!(w, "status: {}", result.status())?;
    writeln!(w)?;

    writeln!(w, "[TESTING_STAGE]")?;
    writeln!(w, "lint_issues: {}", result.lint_issues())?;
    writeln!(w, "warnings: {}", result.warnings())?;
    writeln!(w, "core_bugs: {}", result.core_bugs())?;
    writeln!(w)?;

    writeln!(w, "[VERIFIED_STAGE]")?;
    writeln!(w, "dead_code: {}", found(result.dead_code()))?;
    writeln!(w, "suppressed: {}", found(result.suppressed()))?;
    writeln!(
        w,
        "algorithm: {}",
        if result.algorithm_ok() { "VERIFIED" } else { "UNVERIFIED" }
    )?;
    writeln!(w)?;

    if !result.exec_errors().is_empty() {
        writeln!(w, "[EXEC_ERRORS]")?;
        writeln!(w, "note: Some verification commands failed")?;
        for err in result.exec_errors() {
            writeln!(w, "  - {}", err)?;
        }
        writeln!(w)?;
    }

    match result.status() {
        Status::Passed => {
            writeln!(w, "[PROMISE]")?;
            writeln!(w, "status: PRODUCTION_READY")?;
            writeln!(w, "signal: <promise>PRODUCTION_READY</promise>")?;
        }
        Status::Failed => {
            writeln!(w, "[AEGIS_FAILURES]")?;
            writeln!(w, "action: REPORT_TO_CEO")?;
            writeln!(w, "result: LOOP_CONTINUES")?;
            for reason in result.fail_reasons() {
                writeln!(w, "  - {}", reason)?;
            }
        }
        Status::Inconclusive => {
            writeln!(w, "[AEGIS_INCONCLUSIVE]")?;
            writeln!(w, "action: FIX_TOOLCHAIN")?;
            writeln!(w, "result: LOOP_CONTINUES")?;
        }
    }
    writeln!(w)
}

/// The `[BLOCK]` context attached to a hook block decision.
pub fn block_context(gate: &str, reason: &str, date: &str) -> String {
    format!("[BLOCK]\ngate: {}\nreason: {}\ndate: {}\n", gate, reason, date)
}
