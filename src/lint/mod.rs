//! Per-file lint analysis.
//!
//! Rules, in application order:
//!
//! | Code | Rule |
//! |------|------|
//! | W001 | trailing whitespace |
//! | W002 | line longer than the configured maximum |
//! | W003 | indentation with the language's non-preferred unit |
//! | E001/E002 | unbalanced delimiters (code / bracketed data) |
//! | D001 | file longer than the configured maximum |
//!
//! An unreadable file produces a single E000 issue and nothing else.

mod fix;
pub mod rules;
mod types;

pub use fix::autofix;
pub use types::{IssueCode, LintIssue, LintResult};

use std::fs;
use std::path::Path;

use crate::config::LintConfig;
use crate::language::Language;

/// Applies the lint rule set to individual files.
#[derive(Debug, Clone)]
pub struct FileAnalyzer {
    max_line_length: usize,
    max_file_lines: usize,
}

impl Default for FileAnalyzer {
    fn default() -> Self {
        Self::new(&LintConfig::default())
    }
}

impl FileAnalyzer {
    pub fn new(config: &LintConfig) -> Self {
        Self {
            max_line_length: config.max_line_length,
            max_file_lines: config.max_file_lines,
        }
    }

    /// Lint a file on disk.
    pub fn analyze(&self, path: &Path) -> LintResult {
        let file = path.to_string_lossy().to_string();
        match fs::read(path) {
            Ok(bytes) => {
                let content = String::from_utf8_lossy(&bytes);
                self.analyze_text(&file, &content, Language::from_path(path))
            }
            Err(e) => {
                tracing::debug!(file = %file, error = %e, "unreadable file");
                let mut result = LintResult::new(file);
                result.issues.push(LintIssue::new(
                    0,
                    IssueCode::Unreadable,
                    format!("cannot read file: {}", e),
                ));
                result
            }
        }
    }

    /// Lint a file and strip trailing whitespace when it has any issues.
    ///
    /// The reported issues are the ones found before the fix.
    pub fn analyze_and_fix(&self, path: &Path) -> LintResult {
        let mut result = self.analyze(path);
        if !result.has_issues() || result.count(IssueCode::Unreadable) > 0 {
            return result;
        }

        // Re-read the raw bytes so lines the fix leaves alone keep their
        // exact encoding.
        let content = match fs::read(path) {
            Ok(c) => c,
            Err(e) => {
                result.issues.push(LintIssue::new(
                    0,
                    IssueCode::Unreadable,
                    format!("cannot read file: {}", e),
                ));
                return result;
            }
        };

        match autofix(path, &content) {
            Ok(fixed) => result.fixed = fixed,
            Err(e) => result.issues.push(LintIssue::new(
                0,
                IssueCode::Unreadable,
                format!("cannot write file: {}", e),
            )),
        }
        result
    }

    /// Lint in-memory content. `language` selects the language-specific rules.
    pub fn analyze_text(&self, file: &str, content: &str, language: Option<Language>) -> LintResult {
        let mut result = LintResult::new(file);
        let lines: Vec<&str> = content.split('\n').collect();

        result.issues.extend(rules::trailing_whitespace(&lines));
        result
            .issues
            .extend(rules::line_length(&lines, self.max_line_length));

        if let Some(language) = language {
            result.issues.extend(rules::indent_style(&lines, language));
            result.issues.extend(rules::syntax(content, language));
        }

        result
            .issues
            .extend(rules::file_size(lines.len(), self.max_file_lines));

        result
    }
}
