// SPDX-License-Identifier: MIT

use cmplot::analyzer::{self, Plot};
use cmplot::error::{ErrorKind, Result};
use cmplot::{lexer, parser};

/// Run the whole definition pipeline (lex, parse, analyze) over a document.
pub fn run_pipeline(document: &str) -> Result<Vec<Plot>> {
    analyzer::analyze(parser::parse(lexer::lex(document))).collect()
}

// Rust doesn't seem to see that this function is actually used.
#[allow(dead_code)]
pub fn pipeline_err_kind(document: &str) -> ErrorKind {
    run_pipeline(document).unwrap_err().kind()
}
