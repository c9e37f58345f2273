//! Core data model for peglet.
//!
//! This crate is the leaf of the workspace: source positions and spans,
//! trivia, the lossless concrete syntax tree and its abstract projection,
//! the grammar intermediate representation, and the semantic value type
//! used by actions. Everything here is plain data; evaluation lives in
//! `peglet-lib`.

mod ast;
mod cst;
mod expr;
mod grammar;
mod location;
mod trivia;
mod value;

#[cfg(test)]
mod expr_tests;
#[cfg(test)]
mod grammar_tests;
#[cfg(test)]
mod location_tests;

pub use ast::{AstKind, AstNode};
pub use cst::{CstKind, CstNode};
pub use expr::{CharClass, Expression};
pub use grammar::{Grammar, Rule, ValidationError};
pub use location::{SourceLocation, SourceSpan};
pub use trivia::Trivia;
pub use value::Value;
