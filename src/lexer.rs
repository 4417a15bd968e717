// SPDX-License-Identifier: MIT

//! Types and functions related to lexing a plot-definitions document into line tokens.
use fancy_regex::Regex;
use miette::SourceSpan;
use once_cell::sync::Lazy;

use crate::error::{Error, Result};

/// Width, in columns, of the indent that marks a line as part of an SQL block.
pub const INDENT_WIDTH: usize = 4;

/// Enumeration of the kinds of lines recognized by the lexer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub enum LineKind {
    /// A line containing only whitespace.
    Empty,
    /// A directive line: optional leading whitespace, a `.`, then a name and arguments.
    Command,
    /// A line indented by exactly `INDENT_WIDTH` spaces; part of an SQL block.
    Indented,
}

impl std::fmt::Display for LineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// One classified line of the input document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub struct LineToken<'d> {
    /// The region of the document that the line covers (excluding the line terminator).
    pub span: SourceSpan,
    /// The kind of line.
    pub kind: LineKind,
    /// The line's text. For an `Indented` line the fixed indent is stripped.
    pub text: &'d str,
}

/// Compile the regex for a line classification rule.
///
/// # Panics
/// - If the regex can't be compiled.
fn line_regex_or_panic(regex_str: &str) -> Regex {
    match Regex::new(regex_str) {
        Ok(r) => r,
        Err(e) => panic!("failed to compile line classification regex: {}", e),
    }
}

/// Run a line classification regex.
///
/// # Panics
/// - If executing the regex fails.
fn is_match_or_panic(regex: &Regex, line: &str) -> bool {
    match regex.is_match(line) {
        Ok(matched) => matched,
        Err(e) => panic!("failed to run line classification regex: {}", e),
    }
}

/// Classify a single line (without its terminator).
fn classify(line: &str) -> Option<LineKind> {
    static EMPTY: Lazy<Regex> = Lazy::new(|| line_regex_or_panic(r"^\s*$"));
    static INDENTED: Lazy<Regex> = Lazy::new(|| line_regex_or_panic(r"^[ ]{4}\s*\S"));
    static COMMAND: Lazy<Regex> = Lazy::new(|| line_regex_or_panic(r"^\s*\.\s*\S"));

    // Order matters here:
    // * A whitespace-only line must not be taken for anything else.
    // * An indented line starting with `.` is SQL, not a directive.
    if is_match_or_panic(&EMPTY, line) {
        Some(LineKind::Empty)
    } else if is_match_or_panic(&INDENTED, line) {
        Some(LineKind::Indented)
    } else if is_match_or_panic(&COMMAND, line) {
        Some(LineKind::Command)
    } else {
        None
    }
}

/// A lazy, non-restartable stream of `LineToken`s over a definitions document.
///
/// Each input line yields exactly one token; an unclassifiable line yields `Error::Lex` and
/// classification carries on from the next line (the parser treats any error as fatal anyway).
#[must_use]
pub struct Lexer<'d> {
    document: &'d str,
    offset: usize,
}

impl<'d> Iterator for Lexer<'d> {
    type Item = Result<LineToken<'d>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.document.len() {
            return None;
        }

        let rest = &self.document[self.offset..];
        let (raw, advance) = match rest.find('\n') {
            Some(pos) => (&rest[..pos], pos + 1),
            None => (rest, rest.len()),
        };
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        let span: SourceSpan = (self.offset, line.len()).into();
        self.offset += advance;

        match classify(line) {
            Some(kind) => {
                let text = match kind {
                    LineKind::Indented => &line[INDENT_WIDTH..],
                    _ => line,
                };
                Some(Ok(LineToken { span, kind, text }))
            }
            None => Some(Err(Box::new(Error::Lex { span }))),
        }
    }
}

/// Lex a definitions document into a stream of line tokens.
///
/// # Parameters
/// - `document`: the full text of the plot-definitions file.
pub fn lex(document: &str) -> Lexer<'_> {
    Lexer {
        document,
        offset: 0,
    }
}
