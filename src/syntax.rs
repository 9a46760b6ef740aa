//! Delimiter balance checking.
//!
//! This is not a parser. A single left-to-right scan tracks whether the
//! cursor sits inside a comment or a string literal and counts delimiters
//! only outside of them. Two variants exist:
//!
//! - [`SyntaxVariant::Code`]: C-like `//` and `/* */` comments, double-quoted
//!   strings with backslash escapes, and backtick raw strings. Counts braces
//!   and parentheses.
//! - [`SyntaxVariant::Data`]: bracketed data documents (JSON-like). Only
//!   double-quoted strings are recognised. Counts braces and brackets, and the
//!   document must open with `{` or `[`.

use thiserror::Error;

/// A structural defect found by a balance check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SyntaxDefect {
    #[error("unbalanced braces")]
    UnbalancedBraces,
    #[error("unbalanced parentheses")]
    UnbalancedParens,
    #[error("unbalanced brackets")]
    UnbalancedBrackets,
    #[error("empty JSON")]
    EmptyDocument,
    #[error("must start with {{ or [")]
    BadDocumentStart,
}

/// Which balance checker applies to a language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxVariant {
    Code,
    Data,
}

impl SyntaxVariant {
    /// Run the checker for this variant.
    pub fn check(self, text: &str) -> Result<(), SyntaxDefect> {
        match self {
            SyntaxVariant::Code => check_code_balance(text),
            SyntaxVariant::Data => check_data_balance(text),
        }
    }
}

/// Lexical context of the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    LineComment,
    BlockComment,
    String,
    RawString,
}

/// Check that braces and parentheses outside comments and strings balance.
///
/// Braces are reported before parentheses when both are off.
pub fn check_code_balance(text: &str) -> Result<(), SyntaxDefect> {
    let mut state = ScanState::Normal;
    let mut braces: i64 = 0;
    let mut parens: i64 = 0;
    let mut prev = '\0';
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match state {
            ScanState::Normal => match ch {
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    state = ScanState::LineComment;
                    prev = '\0';
                    continue;
                }
                '/' if chars.peek() == Some(&'*') => {
                    // Both characters are consumed so `/*/` does not close itself.
                    chars.next();
                    state = ScanState::BlockComment;
                    prev = '\0';
                    continue;
                }
                '"' if prev != '\\' => state = ScanState::String,
                '`' => state = ScanState::RawString,
                '{' => braces += 1,
                '}' => braces -= 1,
                '(' => parens += 1,
                ')' => parens -= 1,
                _ => {}
            },
            ScanState::LineComment => {
                if ch == '\n' {
                    state = ScanState::Normal;
                }
            }
            ScanState::BlockComment => {
                if prev == '*' && ch == '/' {
                    state = ScanState::Normal;
                    prev = '\0';
                    continue;
                }
            }
            ScanState::String => match ch {
                '\\' => {
                    // Escaped character, including `\"` and `\\`.
                    chars.next();
                    prev = '\0';
                    continue;
                }
                '"' => state = ScanState::Normal,
                _ => {}
            },
            ScanState::RawString => {
                if ch == '`' {
                    state = ScanState::Normal;
                }
            }
        }
        prev = ch;
    }

    if braces != 0 {
        return Err(SyntaxDefect::UnbalancedBraces);
    }
    if parens != 0 {
        return Err(SyntaxDefect::UnbalancedParens);
    }
    Ok(())
}

/// Check a bracketed data document.
///
/// Rejects empty input and documents whose first non-whitespace character
/// is neither `{` nor `[`, then checks brace and bracket balance outside
/// string literals.
pub fn check_data_balance(text: &str) -> Result<(), SyntaxDefect> {
    let trimmed = text.trim();
    let first = trimmed.chars().next().ok_or(SyntaxDefect::EmptyDocument)?;
    if first != '{' && first != '[' {
        return Err(SyntaxDefect::BadDocumentStart);
    }

    let mut state = ScanState::Normal;
    let mut braces: i64 = 0;
    let mut brackets: i64 = 0;
    let mut escaped = false;

    for ch in trimmed.chars() {
        if state == ScanState::String {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                state = ScanState::Normal;
            }
            continue;
        }

        match ch {
            '"' => state = ScanState::String,
            '{' => braces += 1,
            '}' => braces -= 1,
            '[' => brackets += 1,
            ']' => brackets -= 1,
            _ => {}
        }
    }

    if braces != 0 {
        return Err(SyntaxDefect::UnbalancedBraces);
    }
    if brackets != 0 {
        return Err(SyntaxDefect::UnbalancedBrackets);
    }
    Ok(())
}
