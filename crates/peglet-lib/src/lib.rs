//! Peglet: a PEG parser library with cpp-peglib-compatible grammar syntax.
//!
//! # Example
//!
//! ```
//! use peglet_lib::Peg;
//!
//! let peg = Peg::new(r#"
//!     Greeting <- 'hello' ',' Name
//!     Name     <- <[a-z]+>
//!     %whitespace <- [ \t]*
//! "#).expect("valid grammar");
//!
//! let cst = peg.parse_cst("hello, world").expect("input matches");
//! assert_eq!(cst.source_text(), "hello, world");
//! ```

pub mod codegen;
pub mod diagnostics;
pub mod engine;
pub mod syntax;

mod peg;


pub use engine::{ParseError, ParseReport, ParserConfig, Recovery, SemanticValues};
pub use peg::{ActionError, Peg};

pub use peglet_core::{
    AstKind, AstNode, CharClass, CstKind, CstNode, Expression, Grammar, Rule, SourceLocation,
    SourceSpan, Trivia, ValidationError, Value,
};

/// Errors surfaced by the public API.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The grammar text did not parse; the payload carries located
    /// diagnostics renderable against the grammar source.
    #[error("invalid grammar: {message}")]
    GrammarSyntax {
        message: String,
        diagnostics: diagnostics::Diagnostics,
    },

    /// The grammar parsed but failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The input did not match the grammar.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Result type for peglet operations.
pub type Result<T> = std::result::Result<T, Error>;
