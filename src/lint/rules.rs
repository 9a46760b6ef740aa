//! The fixed lint rule set.
//!
//! Each rule emits at most one issue per line. Rules run in a fixed order,
//! and the order of issues in a result is the order the rules ran.

use crate::language::{IndentStyle, Language};
use crate::syntax::SyntaxVariant;

use super::{IssueCode, LintIssue};

/// W001: lines ending in a space or tab.
pub fn trailing_whitespace(lines: &[&str]) -> Vec<LintIssue> {
    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.ends_with(' ') || line.ends_with('\t'))
        .map(|(i, _)| LintIssue::new(i + 1, IssueCode::TrailingWhitespace, "trailing whitespace"))
        .collect()
}

/// W002: lines longer than `max` characters.
pub fn line_length(lines: &[&str], max: usize) -> Vec<LintIssue> {
    lines
        .iter()
        .enumerate()
        .filter_map(|(i, line)| {
            let len = line.chars().count();
            (len > max).then(|| {
                LintIssue::new(
                    i + 1,
                    IssueCode::LineTooLong,
                    format!("line too long ({} > {})", len, max),
                )
                .at_column(max + 1)
            })
        })
        .collect()
}

/// W003: lines indented with the unit the language does not use.
pub fn indent_style(lines: &[&str], language: Language) -> Vec<LintIssue> {
    let Some(style) = language.indent_style() else {
        return Vec::new();
    };

    let (offending, message) = match style {
        IndentStyle::Tabs => (
            "    ",
            format!("use tabs instead of spaces for {} indentation", language),
        ),
        IndentStyle::Spaces => (
            "\t",
            format!("use spaces instead of tabs for {} indentation", language),
        ),
    };

    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.starts_with(offending))
        .map(|(i, _)| LintIssue::new(i + 1, IssueCode::IndentStyle, message.clone()))
        .collect()
}

/// E001/E002: delimiter balance over the whole file.
pub fn syntax(content: &str, language: Language) -> Option<LintIssue> {
    let variant = language.syntax_variant()?;
    let defect = variant.check(content).err()?;
    let code = match variant {
        SyntaxVariant::Code => IssueCode::CodeSyntax,
        SyntaxVariant::Data => IssueCode::DataSyntax,
    };
    Some(LintIssue::new(
        1,
        code,
        format!("{} syntax error: {}", language, defect),
    ))
}

/// D001: files longer than `max` lines.
pub fn file_size(line_count: usize, max: usize) -> Option<LintIssue> {
    (line_count > max).then(|| {
        LintIssue::new(
            1,
            IssueCode::FileTooLong,
            format!("DACE: file exceeds {} lines ({} lines)", max, line_count),
        )
    })
}
