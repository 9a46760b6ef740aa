//! Command-line interface for kavach.

use clap::{ArgAction, Parser, Subcommand};
use colored::*;
use rayon::prelude::*;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::aegis::{AegisVerifier, ToolchainRunner, VerificationResult};
use crate::context::Context;
use crate::hook::HookAdapter;
use crate::language::Language;
use crate::lint::FileAnalyzer;
use crate::quality::QualityScorer;
use crate::report::{self, OutputFormat, RunHeader};
use crate::session::SessionStore;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ERROR: i32 = 2;

/// Directories never descended into, besides hidden ones.
const SKIPPED_DIRS: &[&str] = &["target", "vendor", "node_modules"];

/// Policy gate for in-progress engineering tasks.
///
/// Kavach lints files, scores their size and complexity, and runs the
/// two-stage Aegis verification that decides whether a task may be marked
/// complete.
#[derive(Parser)]
#[command(name = "kavach")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log verbosity (-v info, -vv debug, -vvv trace); logs go to stderr
    #[arg(short = 'v', action = ArgAction::Count, global = true)]
    pub verbosity: u8,

    /// Path to config YAML (default: kavach.yaml or .kavach.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Lint files for whitespace, length, indentation and syntax issues
    Lint(LintArgs),
    /// Report size, function count and DACE score
    Quality(QualityArgs),
    /// Run the Aegis verification and print the report
    Verify(VerifyArgs),
    /// Run the Aegis verification, optionally as an orchestrator hook
    Aegis(AegisArgs),
}

#[derive(Parser)]
pub struct LintArgs {
    /// Files or directories to lint
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Strip trailing whitespace in files with issues
    #[arg(long)]
    pub fix: bool,

    /// Output format: toon or json
    #[arg(short, long, default_value = "toon")]
    pub format: String,
}

#[derive(Parser)]
pub struct QualityArgs {
    /// Files or directories to analyse
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Output format: toon or json
    #[arg(short, long, default_value = "toon")]
    pub format: String,

    /// Include per-file detail
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Parser)]
pub struct VerifyArgs {
    /// Task identifier echoed in the report
    #[arg(long)]
    pub task: Option<String>,
}

#[derive(Parser)]
pub struct AegisArgs {
    /// Read a hook payload from stdin and write a decision to stdout
    #[arg(long)]
    pub hook: bool,

    /// Task identifier echoed in the report
    #[arg(long)]
    pub task: Option<String>,
}

/// A file to analyse and how it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub path: PathBuf,
    /// Named on the command line rather than found by walking.
    pub explicit: bool,
}

/// Expand command-line paths into files.
///
/// Directories are walked recursively; `accept` decides which walked files
/// are kept. Paths that cannot be accessed are reported on stderr and skipped.
pub fn collect_targets(
    paths: &[PathBuf],
    ctx: &Context,
    accept: impl Fn(&Path) -> bool,
) -> Vec<Target> {
    let mut targets = Vec::new();

    for path in paths {
        let metadata = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(e) => {
                eprintln!("{} {}: {}", "error:".red(), path.display(), e);
                continue;
            }
        };

        if !metadata.is_dir() {
            targets.push(Target {
                path: path.clone(),
                explicit: true,
            });
            continue;
        }

        for file in walk_dir(path, ctx) {
            if accept(&file) {
                targets.push(Target {
                    path: file,
                    explicit: false,
                });
            }
        }
    }

    targets
}

fn walk_dir(root: &Path, ctx: &Context) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 {
                return true;
            }
            if e.file_type().is_dir() {
                let name = e.file_name().to_string_lossy();
                if name.starts_with('.') || SKIPPED_DIRS.contains(&&*name) {
                    return false;
                }
            }
            !ctx.config.is_path_excluded(e.path())
        });

    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "skipping unreadable entry"),
        }
    }

    files
}

fn parse_format(format: &str) -> Option<OutputFormat> {
    match format.parse() {
        Ok(f) => Some(f),
        Err(e) => {
            eprintln!("{} {}", "error:".red(), e);
            None
        }
    }
}

/// Run the lint command.
pub fn run_lint(args: &LintArgs, ctx: &Context) -> anyhow::Result<i32> {
    let Some(format) = parse_format(&args.format) else {
        return Ok(EXIT_ERROR);
    };

    let targets = collect_targets(&args.paths, ctx, |p| Language::from_path(p).is_some());
    tracing::info!(files = targets.len(), fix = args.fix, "linting");

    let analyzer = FileAnalyzer::new(&ctx.config.lint);
    let results: Vec<_> = targets
        .par_iter()
        .map(|t| {
            let result = if args.fix {
                analyzer.analyze_and_fix(&t.path)
            } else {
                analyzer.analyze(&t.path)
            };
            (t.explicit, result)
        })
        .collect();

    let results: Vec<_> = results
        .into_iter()
        .filter(|(explicit, r)| *explicit || r.has_issues())
        .map(|(_, r)| r)
        .collect();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    report::write_lint(&mut out, format, &results)?;
    out.flush()?;

    Ok(EXIT_SUCCESS)
}

/// Run the quality command.
pub fn run_quality(args: &QualityArgs, ctx: &Context) -> anyhow::Result<i32> {
    let Some(format) = parse_format(&args.format) else {
        return Ok(EXIT_ERROR);
    };

    let targets = collect_targets(&args.paths, ctx, |p| {
        Language::from_path(p).is_some_and(Language::is_source_code)
    });
    tracing::info!(files = targets.len(), "scoring");

    let scorer = QualityScorer::new();
    let metrics: Vec<_> = targets.par_iter().map(|t| scorer.analyze(&t.path)).collect();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    report::write_quality(&mut out, format, &metrics, args.verbose)?;
    out.flush()?;

    Ok(EXIT_SUCCESS)
}

fn header(ctx: &Context) -> RunHeader<'_> {
    RunHeader {
        project: &ctx.project,
        date: &ctx.today,
        task: ctx.task.as_deref(),
    }
}

/// Verify the working directory and print the report. The verdict is part
/// of the report, not the exit code.
pub fn run_verify(ctx: &Context) -> anyhow::Result<i32> {
    let runner = ToolchainRunner::new(&ctx.work_dir, &ctx.config.aegis);
    let result = AegisVerifier::new(&runner, ctx.config.aegis.exec_error_policy).verify();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    report::write_aegis_toon(&mut out, header(ctx), &result)?;
    out.flush()?;

    record_success(ctx, &result);
    Ok(EXIT_SUCCESS)
}

fn record_success(ctx: &Context, result: &VerificationResult) {
    if !result.passed() {
        return;
    }
    let marked = ctx
        .session_store()
        .and_then(|store| store.mark_aegis_verified().map_err(Into::into));
    if let Err(e) = marked {
        tracing::warn!(error = %e, "could not record verification in session");
        eprintln!("{} {:#}", "warning:".yellow(), e);
    }
}

/// Run the aegis command.
pub fn run_aegis(args: &AegisArgs, ctx: &Context) -> anyhow::Result<i32> {
    if !args.hook {
        return run_verify(ctx);
    }

    let runner = ToolchainRunner::new(&ctx.work_dir, &ctx.config.aegis);
    let session = ctx.session_store()?;
    let adapter = HookAdapter::new(
        &runner,
        &session,
        ctx.config.aegis.exec_error_policy,
        header(ctx),
    );

    let stdin = io::stdin();
    let stdout = io::stdout();
    let stderr = io::stderr();
    match adapter.run(stdin.lock(), &mut stdout.lock(), &mut stderr.lock()) {
        Ok(_) => Ok(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("{} {}", "error:".red(), e);
            Ok(e.exit_code())
        }
    }
}

/// Build the context and dispatch to the command.
pub fn run(cli: Cli) -> anyhow::Result<i32> {
    let ctx = Context::init(cli.config.as_deref())?;

    match cli.command {
        Commands::Lint(args) => run_lint(&args, &ctx),
        Commands::Quality(args) => run_quality(&args, &ctx),
        Commands::Verify(args) => run_verify(&ctx.with_task(args.task)),
        Commands::Aegis(args) => {
            let ctx = ctx.with_task(args.task.clone());
            run_aegis(&args, &ctx)
        }
    }
}
