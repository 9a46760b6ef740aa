//! Per-file size and complexity metrics.
//!
//! Calculates a DACE compliance score (0-100, higher is better) and a
//! complexity tier from line, declaration and import counts plus the
//! delimiter balance check.

pub mod heuristics;

pub use heuristics::SourceHeuristic;

use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::language::Language;

/// Score deductions.
pub mod penalties {
    /// Files up to this many lines are not penalised for size.
    pub const LINE_ALLOWANCE: usize = 100;
    /// One point per this many lines over the allowance.
    pub const LINES_PER_POINT: usize = 10;
    pub const MAX_SIZE_PENALTY: u32 = 50;

    pub const FUNCTION_ALLOWANCE: usize = 10;
    pub const POINTS_PER_FUNCTION: usize = 2;
    pub const MAX_FUNCTION_PENALTY: u32 = 20;

    pub const SYNTAX_PENALTY: u32 = 30;
}

/// Complexity tier of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl Complexity {
    /// Tiers are checked in order: low first, then medium.
    pub fn classify(lines: usize, functions: usize) -> Self {
        if lines <= 50 && functions <= 5 {
            Complexity::Low
        } else if lines <= 100 && functions <= 10 {
            Complexity::Medium
        } else {
            Complexity::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Low => "low",
            Complexity::Medium => "medium",
            Complexity::High => "high",
        }
    }
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Calculate the DACE score. Always within 0..=100.
pub fn dace_score(lines: usize, functions: usize, ast_valid: bool) -> u32 {
    use penalties::*;

    let mut deduction: u32 = 0;

    if lines > LINE_ALLOWANCE {
        let over = (lines - LINE_ALLOWANCE) / LINES_PER_POINT;
        deduction += (over.min(MAX_SIZE_PENALTY as usize)) as u32;
    }

    if functions > FUNCTION_ALLOWANCE {
        let over = (functions - FUNCTION_ALLOWANCE).saturating_mul(POINTS_PER_FUNCTION);
        deduction += (over.min(MAX_FUNCTION_PENALTY as usize)) as u32;
    }

    if !ast_valid {
        deduction += SYNTAX_PENALTY;
    }

    100u32.saturating_sub(deduction)
}

/// Quality metrics for one file.
///
/// The score and complexity are derived from the counts at construction
/// and cannot be set on their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualityMetrics {
    file: String,
    lines: usize,
    functions: usize,
    imports: usize,
    dace_score: u32,
    ast_valid: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    ast_error: String,
    complexity: Complexity,
}

impl QualityMetrics {
    /// Build metrics from raw counts. `syntax` carries the balance-check
    /// defect, if any.
    pub fn new(
        file: impl Into<String>,
        lines: usize,
        functions: usize,
        imports: usize,
        syntax: Result<(), String>,
    ) -> Self {
        let (ast_valid, ast_error) = match syntax {
            Ok(()) => (true, String::new()),
            Err(e) => (false, e),
        };
        Self {
            file: file.into(),
            lines,
            functions,
            imports,
            dace_score: dace_score(lines, functions, ast_valid),
            ast_valid,
            ast_error,
            complexity: Complexity::classify(lines, functions),
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn functions(&self) -> usize {
        self.functions
    }

    pub fn imports(&self) -> usize {
        self.imports
    }

    pub fn dace_score(&self) -> u32 {
        self.dace_score
    }

    pub fn ast_valid(&self) -> bool {
        self.ast_valid
    }

    pub fn ast_error(&self) -> &str {
        &self.ast_error
    }

    pub fn complexity(&self) -> Complexity {
        self.complexity
    }
}

type HeuristicResolver = fn(Language) -> &'static dyn SourceHeuristic;

/// Computes [`QualityMetrics`] for files.
#[derive(Clone)]
pub struct QualityScorer {
    resolve: HeuristicResolver,
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self {
            resolve: Language::heuristic,
        }
    }
}

impl QualityScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different declaration/import counter per language.
    pub fn with_resolver(resolve: HeuristicResolver) -> Self {
        Self { resolve }
    }

    /// Analyze a file on disk. An unreadable file yields zero counts and
    /// `ast_valid = false` carrying the I/O error.
    pub fn analyze(&self, path: &Path) -> QualityMetrics {
        let file = path.to_string_lossy().to_string();
        match fs::read(path) {
            Ok(bytes) => {
                let content = String::from_utf8_lossy(&bytes);
                self.analyze_text(&file, &content, Language::from_path(path))
            }
            Err(e) => {
                tracing::debug!(file = %file, error = %e, "unreadable file");
                QualityMetrics::new(file, 0, 0, 0, Err(e.to_string()))
            }
        }
    }

    /// Analyze in-memory content.
    pub fn analyze_text(
        &self,
        file: &str,
        content: &str,
        language: Option<Language>,
    ) -> QualityMetrics {
        // An empty file is still one segment.
        let lines = content.split('\n').count();

        let (functions, imports) = match language {
            Some(lang) => {
                let heuristic = (self.resolve)(lang);
                (
                    heuristic.count_declarations(content),
                    heuristic.count_imports(content),
                )
            }
            None => (0, 0),
        };

        let syntax = match language.and_then(Language::syntax_variant) {
            Some(variant) => variant.check(content).map_err(|e| e.to_string()),
            None => Ok(()),
        };

        QualityMetrics::new(file, lines, functions, imports, syntax)
    }
}
