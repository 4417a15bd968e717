// SPDX-License-Identifier: MIT

//! Types and methods for parsing a stream of line tokens into definitions.
//!
//! The parser has four states (excluding the implicit end-of-input handling), transitions among
//! which are described below. The following abbreviations are used for the line kinds:
//!
//! ```plaintext
//!     E = LineKind::Empty
//!     C = LineKind::Command
//!     I = LineKind::Indented
//!     $ = end of input
//!
//! State Name                Line  Next State  Note / Action
//! ------------------------  ----  ----------  -----------------------------------
//! (1) ExpectDefinition      E     (1)         Useless whitespace outside any def
//!                           C     (2)         Open definition with first trait
//!                           I     Error       SQL needs a definition and a blank line
//!                           $     Success     All whitespace, or empty input
//!
//! (2) ExpectTrait           E     (3)         Done with def, or is SQL next?
//!                           C     (2)         Append trait to current def
//!                           I     Error       SQL must be preceded by a blank line
//!                           $     Success     Flush the open definition
//!
//! (3) ExpectDefinitionOrSql E     (1)         Current definition is done: emit
//!                           C     (2)         Emit current, open a new definition
//!                           I     (4)         Start the current def's SQL block
//!                           $     Success     Flush the open definition
//!
//! (4) ExpectSqlOrEnd        E     (1)         SQL block just ended: emit
//!                           C     Error       Blank line required between SQL and def
//!                           I     (4)         Append line to the SQL block
//!                           $     Success     Flush; the SQL block just ended
//! ```
//!
//! This automaton is the single source of truth for legal document structure; no other stage
//! validates line ordering.
use miette::SourceSpan;

use crate::error::{Error, Result};
use crate::lexer::{LineKind, LineToken};

/// One name/argument-list pair parsed from a directive line.
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub struct Trait {
    pub name: String,
    pub args: Vec<String>,
    /// The directive line the trait was parsed from.
    pub span: SourceSpan,
}

/// A group of directive lines plus an optional attached SQL body; the parser's unit of output.
///
/// The SQL block borrows its lines from the input document, indent already stripped.
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub struct Definition<'d> {
    /// Non-empty; the first trait determines the definition's kind.
    pub traits: Vec<Trait>,
    pub sql_block: Option<Vec<&'d str>>,
    /// The opening directive line.
    pub span: SourceSpan,
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Split a directive line into shell-style words.
///
/// Single quotes protect their content verbatim; double quotes allow backslash escapes of `"` and
/// `\`. Hyphens are word characters; any other punctuation outside quotes is a single-character
/// word of its own (so unquoted `x.png` is three words, which is why the file format quotes
/// arguments).
fn split_words(text: &str, span: SourceSpan) -> Result<Vec<String>> {
    let mut words = Vec::<String>::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c.is_whitespace() {
            if in_word {
                words.push(std::mem::take(&mut current));
                in_word = false;
            }
        } else if c == '\'' {
            in_word = true;
            loop {
                match chars.next() {
                    Some('\'') => break,
                    Some(inner) => current.push(inner),
                    None => return Err(Box::new(Error::UnterminatedQuote { span, quote: c })),
                }
            }
        } else if c == '"' {
            in_word = true;
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some(escaped @ ('"' | '\\')) => current.push(escaped),
                        Some(other) => {
                            current.push('\\');
                            current.push(other);
                        }
                        None => {
                            return Err(Box::new(Error::UnterminatedQuote { span, quote: c }))
                        }
                    },
                    Some(inner) => current.push(inner),
                    None => return Err(Box::new(Error::UnterminatedQuote { span, quote: c })),
                }
            }
        } else if is_word_char(c) {
            in_word = true;
            current.push(c);
        } else {
            if in_word {
                words.push(std::mem::take(&mut current));
                in_word = false;
            }
            words.push(c.to_string());
        }
    }
    if in_word {
        words.push(current);
    }

    Ok(words)
}

/// Parse a `Command` line into a `Trait`.
///
/// The words are `[".", name, arg1, arg2, ...]`; fewer than three is an error.
fn parse_trait(token: &LineToken) -> Result<Trait> {
    let mut words = split_words(token.text, token.span)?;
    if words.len() < 3 {
        return Err(Box::new(Error::TraitTooShort { span: token.span }));
    }
    let args = words.split_off(2);
    let name = words.pop().unwrap_or_default();
    Ok(Trait {
        name,
        args,
        span: token.span,
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    ExpectDefinition,
    ExpectTrait,
    ExpectDefinitionOrSql,
    ExpectSqlOrEnd,
}

/// A lazy stream of `Definition`s driven by the state machine tabulated in the module docs.
///
/// Yields each definition as soon as its last line has been consumed, and flushes any in-progress
/// definition when input ends. After the first error the stream fuses.
#[must_use]
pub struct Parser<'d, I>
where
    I: Iterator<Item = Result<LineToken<'d>>>,
{
    tokens: I,
    state: State,
    current: Option<Definition<'d>>,
    done: bool,
}

impl<'d, I> Parser<'d, I>
where
    I: Iterator<Item = Result<LineToken<'d>>>,
{
    /// Open a new definition, returning the previous one (if any) for emission.
    fn open_definition(&mut self, token: &LineToken<'d>) -> Result<Option<Definition<'d>>> {
        let first = parse_trait(token)?;
        let new = Definition {
            traits: vec![first],
            sql_block: None,
            span: token.span,
        };
        Ok(self.current.replace(new))
    }

    /// The single transition function: `(state, token) -> (state, emitted definition)`.
    fn step(&mut self, token: &LineToken<'d>) -> Result<Option<Definition<'d>>> {
        match (self.state, token.kind) {
            (State::ExpectDefinition, LineKind::Empty) => Ok(None),
            (State::ExpectDefinition, LineKind::Command) => {
                self.state = State::ExpectTrait;
                self.open_definition(token)
            }
            (State::ExpectDefinition, LineKind::Indented)
            | (State::ExpectTrait, LineKind::Indented) => {
                Err(Box::new(Error::UnexpectedIndent { span: token.span }))
            }

            (State::ExpectTrait, LineKind::Empty) => {
                self.state = State::ExpectDefinitionOrSql;
                Ok(None)
            }
            (State::ExpectTrait, LineKind::Command) => {
                let appended = parse_trait(token)?;
                // The current definition always exists in this state.
                if let Some(def) = self.current.as_mut() {
                    def.traits.push(appended);
                }
                Ok(None)
            }

            (State::ExpectDefinitionOrSql, LineKind::Empty) => {
                self.state = State::ExpectDefinition;
                Ok(self.current.take())
            }
            (State::ExpectDefinitionOrSql, LineKind::Command) => {
                self.state = State::ExpectTrait;
                self.open_definition(token)
            }
            (State::ExpectDefinitionOrSql, LineKind::Indented) => {
                self.state = State::ExpectSqlOrEnd;
                if let Some(def) = self.current.as_mut() {
                    def.sql_block = Some(vec![token.text]);
                }
                Ok(None)
            }

            (State::ExpectSqlOrEnd, LineKind::Empty) => {
                self.state = State::ExpectDefinition;
                Ok(self.current.take())
            }
            (State::ExpectSqlOrEnd, LineKind::Command) => {
                Err(Box::new(Error::MissingBlankLine { span: token.span }))
            }
            (State::ExpectSqlOrEnd, LineKind::Indented) => {
                if let Some(sql) = self.current.as_mut().and_then(|d| d.sql_block.as_mut()) {
                    sql.push(token.text);
                }
                Ok(None)
            }
        }
    }
}

impl<'d, I> Iterator for Parser<'d, I>
where
    I: Iterator<Item = Result<LineToken<'d>>>,
{
    type Item = Result<Definition<'d>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.tokens.next() {
                Some(Ok(token)) => match self.step(&token) {
                    Ok(Some(definition)) => return Some(Ok(definition)),
                    Ok(None) => continue,
                    Err(e) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                },
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    // End of input: flush the in-progress definition, if any.
                    self.done = true;
                    return self.current.take().map(Ok);
                }
            }
        }
    }
}

/// Parse a stream of line tokens into a stream of definitions.
pub fn parse<'d, I>(tokens: I) -> Parser<'d, I>
where
    I: Iterator<Item = Result<LineToken<'d>>>,
{
    Parser {
        tokens,
        state: State::ExpectDefinition,
        current: None,
        done: false,
    }
}
