//! Line-based declaration and import counting.
//!
//! These are heuristics, not parsers: each trimmed line is matched against a
//! small per-language keyword table. Callers only see [`SourceHeuristic`],
//! so an AST-backed implementation can replace any of these tables.

/// Counts declarations and imports in source text.
pub trait SourceHeuristic: Send + Sync {
    /// Number of function-like declarations.
    fn count_declarations(&self, text: &str) -> usize;

    /// Number of import statements.
    fn count_imports(&self, text: &str) -> usize;
}

/// Keyword-table heuristic shared by all built-in languages.
#[derive(Debug)]
pub struct LineHeuristic {
    /// A trimmed line starting with one of these is a declaration.
    declaration_prefixes: &'static [&'static str],
    /// A trimmed line containing one of these is a declaration.
    declaration_markers: &'static [&'static str],
    /// A trimmed line starting with one of these is an import.
    import_prefixes: &'static [&'static str],
    /// A trimmed line containing one of these is an import.
    import_markers: &'static [&'static str],
    /// Count bare quoted paths inside `import ( ... )` blocks.
    import_blocks: bool,
}

pub static GO: LineHeuristic = LineHeuristic {
    declaration_prefixes: &["func "],
    declaration_markers: &[],
    import_prefixes: &["import "],
    import_markers: &[],
    import_blocks: true,
};

pub static RUST: LineHeuristic = LineHeuristic {
    declaration_prefixes: &["fn ", "pub fn ", "pub(crate) fn ", "async fn ", "pub async fn "],
    declaration_markers: &[],
    import_prefixes: &["use ", "pub use "],
    import_markers: &[],
    import_blocks: false,
};

/// TypeScript and JavaScript.
pub static SCRIPT: LineHeuristic = LineHeuristic {
    declaration_prefixes: &[],
    declaration_markers: &["function ", "=> {", "async "],
    import_prefixes: &["import ", "require("],
    import_markers: &["= require("],
    import_blocks: false,
};

pub static PYTHON: LineHeuristic = LineHeuristic {
    declaration_prefixes: &["def ", "async def "],
    declaration_markers: &[],
    import_prefixes: &["import ", "from "],
    import_markers: &[],
    import_blocks: false,
};

/// Languages without declarations or imports.
pub static NONE: LineHeuristic = LineHeuristic {
    declaration_prefixes: &[],
    declaration_markers: &[],
    import_prefixes: &[],
    import_markers: &[],
    import_blocks: false,
};

fn matches_any(line: &str, prefixes: &[&str], markers: &[&str]) -> bool {
    prefixes.iter().any(|p| line.starts_with(p)) || markers.iter().any(|m| line.contains(m))
}

fn is_quoted_path(line: &str) -> bool {
    line.len() >= 2 && line.starts_with('"') && line.ends_with('"')
}

impl SourceHeuristic for LineHeuristic {
    fn count_declarations(&self, text: &str) -> usize {
        text.split('\n')
            .map(str::trim)
            .filter(|l| matches_any(l, self.declaration_prefixes, self.declaration_markers))
            .count()
    }

    fn count_imports(&self, text: &str) -> usize {
        let mut count = 0;
        let mut in_block = false;

        for line in text.split('\n').map(str::trim) {
            if in_block {
                if line.starts_with(')') {
                    in_block = false;
                } else if is_quoted_path(line) {
                    count += 1;
                }
                continue;
            }

            if matches_any(line, self.import_prefixes, self.import_markers) {
                count += 1;
                if self.import_blocks && line.ends_with('(') {
                    in_block = true;
                }
            }
        }

        count
    }
}
