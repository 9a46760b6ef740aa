//! Supported languages and their per-language rules.
//!
//! The set of languages is closed: adding one means adding a variant here,
//! and every `match` below must then handle it.

use std::path::Path;

use serde::Serialize;

use crate::quality::{heuristics, SourceHeuristic};
use crate::syntax::SyntaxVariant;

/// A language recognised by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Go,
    Rust,
    TypeScript,
    JavaScript,
    Python,
    Json,
    Yaml,
    Toon,
    Markdown,
}

/// Indentation unit a language conventionally uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndentStyle {
    Tabs,
    Spaces,
}

impl Language {
    /// Resolve a language from a file extension (without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "go" => Some(Language::Go),
            "rs" => Some(Language::Rust),
            "ts" | "tsx" => Some(Language::TypeScript),
            "js" | "jsx" => Some(Language::JavaScript),
            "py" => Some(Language::Python),
            "json" => Some(Language::Json),
            "yaml" | "yml" => Some(Language::Yaml),
            "toon" => Some(Language::Toon),
            "md" => Some(Language::Markdown),
            _ => None,
        }
    }

    /// Resolve a language from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::Go => "Go",
            Language::Rust => "Rust",
            Language::TypeScript => "TypeScript",
            Language::JavaScript => "JavaScript",
            Language::Python => "Python",
            Language::Json => "JSON",
            Language::Yaml => "YAML",
            Language::Toon => "TOON",
            Language::Markdown => "Markdown",
        }
    }

    /// Whether the quality scorer picks this language up during directory walks.
    pub fn is_source_code(self) -> bool {
        matches!(
            self,
            Language::Go
                | Language::Rust
                | Language::TypeScript
                | Language::JavaScript
                | Language::Python
        )
    }

    /// Balance checker for this language, if it has one.
    pub fn syntax_variant(self) -> Option<SyntaxVariant> {
        match self {
            Language::Go => Some(SyntaxVariant::Code),
            Language::Json => Some(SyntaxVariant::Data),
            Language::Rust
            | Language::TypeScript
            | Language::JavaScript
            | Language::Python
            | Language::Yaml
            | Language::Toon
            | Language::Markdown => None,
        }
    }

    /// Conventional indentation, for languages that insist on one.
    pub fn indent_style(self) -> Option<IndentStyle> {
        match self {
            Language::Go => Some(IndentStyle::Tabs),
            Language::Python | Language::Yaml => Some(IndentStyle::Spaces),
            Language::Rust
            | Language::TypeScript
            | Language::JavaScript
            | Language::Json
            | Language::Toon
            | Language::Markdown => None,
        }
    }

    /// Declaration and import counting heuristic.
    pub fn heuristic(self) -> &'static dyn SourceHeuristic {
        match self {
            Language::Go => &heuristics::GO,
            Language::Rust => &heuristics::RUST,
            Language::TypeScript | Language::JavaScript => &heuristics::SCRIPT,
            Language::Python => &heuristics::PYTHON,
            Language::Json | Language::Yaml | Language::Toon | Language::Markdown => {
                &heuristics::NONE
            }
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
