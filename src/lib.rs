// SPDX-License-Identifier: MIT

pub mod analyzer;
pub mod cli;
pub mod db;
pub mod error;
pub mod iso8601;
pub mod lexer;
pub mod parser;
