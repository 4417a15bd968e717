// SPDX-License-Identifier: MIT

//! Error types.
use miette::{Diagnostic, SourceSpan};
use thiserror::Error as ThisError;

/// Discriminant-only mirror of `Error`, used to assert on error categories in tests.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Lex,
    UnexpectedIndent,
    MissingBlankLine,
    UnterminatedQuote,
    TraitTooShort,
    UnknownDefinition,
    UnknownTrait,
    TraitArity,
    ParseValue,
    UnknownStyle,
    DuplicateQuery,
    UndefinedQuery,
    QueryConflict,
    MissingQuery,
    EmptyPeriod,
    Config,
    Io,
    Database,
}

/// Type of error used throughout the cmplot pipeline.
///
/// Errors carry `span: SourceSpan` members where possible to point at the line or trait of the
/// definitions document that is invalid or led to the error.
#[derive(Debug, Diagnostic, ThisError)]
#[must_use]
pub enum Error {
    /// A line that is neither blank, a directive, nor indented SQL.
    #[error("invalid line: not blank, not a directive, not indented SQL")]
    Lex {
        #[label("unrecognized line")]
        span: SourceSpan,
    },

    /// An indented SQL line where no SQL block may start.
    #[error("indented SQL must follow a definition and a blank line")]
    #[diagnostic()]
    UnexpectedIndent {
        #[label("unexpected indent")]
        span: SourceSpan,
    },

    /// A directive line directly after an SQL block, with no blank line between.
    #[error("a blank line is required between an SQL block and the next directive")]
    #[diagnostic()]
    MissingBlankLine {
        #[label("directive follows SQL directly")]
        span: SourceSpan,
    },

    /// A quoted argument with no closing quote.
    #[error("unterminated quote ({quote}) in directive")]
    #[diagnostic()]
    UnterminatedQuote {
        #[label("quote opened on this line is never closed")]
        span: SourceSpan,

        quote: char,
    },

    /// A directive line with fewer than a dot, a name, and one argument.
    #[error("directive needs at least a dot, a name, and one argument")]
    #[diagnostic()]
    TraitTooShort {
        #[label("incomplete directive")]
        span: SourceSpan,
    },

    /// A definition whose first trait is neither `define-query` nor `define-plot`.
    #[error("unknown definition {name:?}: expecting define-query or define-plot")]
    #[diagnostic()]
    UnknownDefinition {
        #[label("unknown definition")]
        span: SourceSpan,

        name: String,
    },

    /// A plot trait whose name is not in the dispatch table.
    #[error("unknown trait {name:?}")]
    #[diagnostic()]
    UnknownTrait {
        #[label("unknown trait")]
        span: SourceSpan,

        name: String,
    },

    /// A known trait with the wrong number of arguments.
    #[error("trait {name:?} takes {expected} argument(s) but got {got}")]
    #[diagnostic()]
    TraitArity {
        #[label("wrong number of arguments")]
        span: SourceSpan,

        name: String,
        expected: usize,
        got: usize,
    },

    /// A trait argument that is grammatically a word but doesn't fit its destination type.
    #[error("{desc}")]
    #[diagnostic()]
    ParseValue {
        #[label("failed to parse this")]
        span: SourceSpan,

        desc: String,
    },

    /// A style value outside the whitelist.
    #[error(
        "unknown style {style:?}: expecting one of {}",
        itertools::join(crate::analyzer::PlotStyle::NAMES, ", ")
    )]
    #[diagnostic()]
    UnknownStyle {
        #[label("unknown style")]
        span: SourceSpan,

        style: String,
    },

    /// A `define-query` reusing an already registered name.
    #[error("duplicate query name {name:?}")]
    #[diagnostic()]
    DuplicateQuery {
        #[label("name already defined")]
        span: SourceSpan,

        name: String,
    },

    /// A `query` trait referencing a name that has not been defined (yet).
    #[error("no query defined with name {name:?}")]
    #[diagnostic(help("queries must be defined with define-query before they are referenced"))]
    UndefinedQuery {
        #[label("undefined query")]
        span: SourceSpan,

        name: String,
    },

    /// A plot with both an inline SQL block and a `query` trait (or two `query` traits).
    #[error("plot query specified more than once")]
    #[diagnostic()]
    QueryConflict {
        #[label("conflicting query source")]
        span: SourceSpan,
    },

    /// A definition with no SQL: a `define-query` without a block, or a plot with neither an
    /// inline SQL block nor a `query` trait.
    #[error("definition has no SQL: attach an SQL block or reference one with the query trait")]
    #[diagnostic()]
    MissingQuery {
        #[label("needs a query")]
        span: SourceSpan,
    },

    /// A period whose bounds are equal or reversed.
    #[error("period must be a positive, nonempty datetime range")]
    #[diagnostic()]
    EmptyPeriod {
        #[label("begin is not before end")]
        span: SourceSpan,
    },

    /// A configuration error detected before the pipeline runs.
    #[error("{msg}")]
    #[diagnostic()]
    Config { msg: String },

    /// An I/O error reading the definitions document.
    #[error("failed to read {path}")]
    #[diagnostic()]
    Io {
        path: String,

        #[source]
        source: std::io::Error,
    },

    /// An error from the underlying SQLite engine.
    #[error("database error")]
    #[diagnostic()]
    Database {
        #[source]
        source: rusqlite::Error,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Lex { .. } => ErrorKind::Lex,
            Error::UnexpectedIndent { .. } => ErrorKind::UnexpectedIndent,
            Error::MissingBlankLine { .. } => ErrorKind::MissingBlankLine,
            Error::UnterminatedQuote { .. } => ErrorKind::UnterminatedQuote,
            Error::TraitTooShort { .. } => ErrorKind::TraitTooShort,
            Error::UnknownDefinition { .. } => ErrorKind::UnknownDefinition,
            Error::UnknownTrait { .. } => ErrorKind::UnknownTrait,
            Error::TraitArity { .. } => ErrorKind::TraitArity,
            Error::ParseValue { .. } => ErrorKind::ParseValue,
            Error::UnknownStyle { .. } => ErrorKind::UnknownStyle,
            Error::DuplicateQuery { .. } => ErrorKind::DuplicateQuery,
            Error::UndefinedQuery { .. } => ErrorKind::UndefinedQuery,
            Error::QueryConflict { .. } => ErrorKind::QueryConflict,
            Error::MissingQuery { .. } => ErrorKind::MissingQuery,
            Error::EmptyPeriod { .. } => ErrorKind::EmptyPeriod,
            Error::Config { .. } => ErrorKind::Config,
            Error::Io { .. } => ErrorKind::Io,
            Error::Database { .. } => ErrorKind::Database,
        }
    }
}

impl From<rusqlite::Error> for Box<Error> {
    fn from(source: rusqlite::Error) -> Self {
        Box::new(Error::Database { source })
    }
}

/// A value or an `Error`
pub type Result<T> = std::result::Result<T, Box<Error>>;
