//! Auto-fix for lint issues.
//!
//! Only trailing whitespace is ever rewritten. Every other rule's violations
//! are left exactly as they were.

use std::fs;
use std::io;
use std::path::Path;

/// Strip trailing spaces and tabs from each line of `content` and rewrite
/// `path` if any line changed. Returns the number of changed lines.
///
/// Works on raw bytes: every other byte is written back untouched, whatever
/// the file's encoding.
pub fn autofix(path: &Path, content: &[u8]) -> io::Result<usize> {
    let mut fixed = 0;
    let new_lines: Vec<&[u8]> = content
        .split(|&b| b == b'\n')
        .map(|line| {
            let trimmed = trim_trailing_blanks(line);
            if trimmed.len() != line.len() {
                fixed += 1;
            }
            trimmed
        })
        .collect();

    if fixed > 0 {
        fs::write(path, new_lines.join(&b'\n'))?;
        tracing::info!(file = %path.display(), fixed, "removed trailing whitespace");
    }

    Ok(fixed)
}

fn trim_trailing_blanks(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|&b| b != b' ' && b != b'\t')
        .map_or(0, |i| i + 1);
    &line[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_autofix_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.go");
        let original = "a \nb\t\t\nc\n    d\n";
        fs::write(&path, original).unwrap();

        assert_eq!(autofix(&path, original.as_bytes()).unwrap(), 2);
        let first = fs::read_to_string(&path).unwrap();
        assert_eq!(first, "a\nb\nc\n    d\n");

        assert_eq!(autofix(&path, first.as_bytes()).unwrap(), 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), first);
    }

    #[test]
    fn test_autofix_leaves_other_violations() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.go");
        let long = "y".repeat(200);
        let original = format!("func f() {{ \n    {}\n", long);
        fs::write(&path, &original).unwrap();

        assert_eq!(autofix(&path, original.as_bytes()).unwrap(), 1);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            format!("func f() {{\n    {}\n", long)
        );
    }

    #[test]
    fn test_no_write_when_clean() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing.go");
        // Nothing to fix, so the missing file is never touched.
        assert_eq!(autofix(&path, b"ok\n").unwrap(), 0);
        assert!(!path.exists());
    }
}
