//! Core types for lint results.

use serde::{Deserialize, Serialize};

/// Issue codes produced by the lint rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueCode {
    #[serde(rename = "E000")]
    Unreadable,
    #[serde(rename = "E001")]
    CodeSyntax,
    #[serde(rename = "E002")]
    DataSyntax,
    #[serde(rename = "W001")]
    TrailingWhitespace,
    #[serde(rename = "W002")]
    LineTooLong,
    #[serde(rename = "W003")]
    IndentStyle,
    #[serde(rename = "D001")]
    FileTooLong,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::Unreadable => "E000",
            IssueCode::CodeSyntax => "E001",
            IssueCode::DataSyntax => "E002",
            IssueCode::TrailingWhitespace => "W001",
            IssueCode::LineTooLong => "W002",
            IssueCode::IndentStyle => "W003",
            IssueCode::FileTooLong => "D001",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "E000" => Some(IssueCode::Unreadable),
            "E001" => Some(IssueCode::CodeSyntax),
            "E002" => Some(IssueCode::DataSyntax),
            "W001" => Some(IssueCode::TrailingWhitespace),
            "W002" => Some(IssueCode::LineTooLong),
            "W003" => Some(IssueCode::IndentStyle),
            "D001" => Some(IssueCode::FileTooLong),
            _ => None,
        }
    }
}

impl std::fmt::Display for IssueCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single lint finding. Lines are 1-based; 0 means "whole file".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintIssue {
    pub line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    pub code: IssueCode,
    pub message: String,
}

impl LintIssue {
    pub fn new(line: usize, code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            line,
            column: None,
            code,
            message: message.into(),
        }
    }

    pub fn at_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }
}

/// Lint results for one file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LintResult {
    pub file: String,
    pub issues: Vec<LintIssue>,
    /// Number of lines rewritten by auto-fix.
    #[serde(default)]
    pub fixed: usize,
}

impl LintResult {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            ..Default::default()
        }
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    /// Issue codes in encounter order.
    pub fn codes(&self) -> Vec<IssueCode> {
        self.issues.iter().map(|i| i.code).collect()
    }

    pub fn count(&self, code: IssueCode) -> usize {
        self.issues.iter().filter(|i| i.code == code).count()
    }
}
