//! The compiled-parser facade.

use std::sync::Arc;

use peglet_core::{AstNode, CstNode, Grammar, Value};

use crate::engine::{
    Actions, CstPass, ParseReport, ParserConfig, Recovery, SemanticValues, ValuePass,
};
use crate::syntax;
use crate::{Error, Result};

pub use crate::engine::ActionError;

/// A compiled grammar plus runtime configuration and registered actions.
///
/// Immutable once built; safe to share across threads and run concurrent
/// parses against (each parse owns its context).
///
/// ```
/// use peglet_lib::{Peg, Value};
///
/// let peg = Peg::new(r"
///     Sum    <- Number '+' Number
///     Number <- <[0-9]+>
///     %whitespace <- [ ]*
/// ")
/// .expect("valid grammar")
/// .action("Sum", |sv| {
///     let a = sv.get(0).and_then(Value::as_i64).unwrap_or(0);
///     let b = sv.get(1).and_then(Value::as_i64).unwrap_or(0);
///     Ok(Value::Int(a + b))
/// })
/// .action("Number", |sv| {
///     sv.token_to_int()
///         .map(Value::Int)
///         .ok_or_else(|| "not a number".into())
/// });
///
/// assert_eq!(peg.parse("3 + 5").unwrap(), Value::Int(8));
/// ```
#[derive(Debug)]
pub struct Peg {
    grammar: Grammar,
    actions: Actions,
    config: ParserConfig,
}

impl Peg {
    /// Compiles grammar text. Syntax errors and validation errors (an
    /// undefined reference, an empty grammar) are reported here, not at
    /// parse time.
    pub fn new(grammar_text: &str) -> Result<Self> {
        let parse = syntax::parse_grammar(grammar_text);
        if parse.diagnostics.has_errors() {
            let message = parse
                .diagnostics
                .iter()
                .find(|d| d.is_error())
                .map(|d| d.message.clone())
                .unwrap_or_else(|| "grammar did not parse".to_string());
            return Err(Error::GrammarSyntax {
                message,
                diagnostics: parse.diagnostics,
            });
        }
        Self::from_grammar(parse.grammar)
    }

    /// Builds from an already-constructed IR.
    pub fn from_grammar(grammar: Grammar) -> Result<Self> {
        grammar.validate()?;
        Ok(Self {
            grammar,
            actions: Actions::default(),
            config: ParserConfig::default(),
        })
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    // --- configuration -----------------------------------------------------

    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_packrat(mut self, enabled: bool) -> Self {
        self.config.packrat = enabled;
        self
    }

    pub fn with_capture_trivia(mut self, enabled: bool) -> Self {
        self.config.capture_trivia = enabled;
        self
    }

    pub fn with_recovery(mut self, recovery: Recovery) -> Self {
        self.config.recovery = recovery;
        self
    }

    /// Registers the action for a rule. The grammar's inline action code
    /// is opaque to the engine; this is where a host supplies the
    /// equivalent callable.
    pub fn action<F>(mut self, rule: &str, action: F) -> Self
    where
        F: Fn(&SemanticValues<'_>) -> std::result::Result<Value, ActionError>
            + Send
            + Sync
            + 'static,
    {
        self.actions.set(rule, Arc::new(action));
        self
    }

    /// In-place variant of [`Peg::action`].
    pub fn set_action<F>(&mut self, rule: &str, action: F)
    where
        F: Fn(&SemanticValues<'_>) -> std::result::Result<Value, ActionError>
            + Send
            + Sync
            + 'static,
    {
        self.actions.set(rule, Arc::new(action));
    }

    // --- parse entries -----------------------------------------------------

    /// Parses to a trivia-preserving concrete syntax tree.
    pub fn parse_cst(&self, input: &str) -> Result<CstNode> {
        self.parse_cst_from(input, None)
    }

    pub fn parse_cst_from(&self, input: &str, start_rule: Option<&str>) -> Result<CstNode> {
        let start = self.resolve_start(start_rule)?;
        let pass = CstPass::new(&self.grammar, input, self.config.clone());
        Ok(pass.run(start)?)
    }

    /// Parses to an abstract syntax tree (the CST minus trivia, tokens
    /// merged into terminals).
    pub fn parse_ast(&self, input: &str) -> Result<AstNode> {
        self.parse_ast_from(input, None)
    }

    pub fn parse_ast_from(&self, input: &str, start_rule: Option<&str>) -> Result<AstNode> {
        let cst = self.parse_cst_from(input, start_rule)?;
        Ok(AstNode::project(&cst))
    }

    /// Parses to the start rule's semantic value, invoking registered
    /// actions.
    pub fn parse(&self, input: &str) -> Result<Value> {
        self.parse_from(input, None)
    }

    pub fn parse_from(&self, input: &str, start_rule: Option<&str>) -> Result<Value> {
        let start = self.resolve_start(start_rule)?;
        let pass = ValuePass::new(&self.grammar, &self.actions, input, self.config.clone());
        Ok(pass.run(start)?)
    }

    /// Parses with advanced error recovery: always returns diagnostics and,
    /// when at least one fragment parsed, a tree with `Error` nodes over
    /// the unparseable regions.
    pub fn parse_cst_with_diagnostics(&self, input: &str) -> Result<ParseReport> {
        self.parse_cst_with_diagnostics_from(input, None)
    }

    pub fn parse_cst_with_diagnostics_from(
        &self,
        input: &str,
        start_rule: Option<&str>,
    ) -> Result<ParseReport> {
        let start = self.resolve_start(start_rule)?;
        let config = ParserConfig {
            recovery: Recovery::Advanced,
            ..self.config.clone()
        };
        let pass = CstPass::new(&self.grammar, input, config);
        Ok(pass.run_with_diagnostics(start))
    }

    fn resolve_start<'a>(&'a self, explicit: Option<&'a str>) -> Result<&'a str> {
        let Some(name) = explicit.or_else(|| self.grammar.effective_start_rule()) else {
            return Err(Error::Validation(
                peglet_core::ValidationError::EmptyGrammar,
            ));
        };
        if self.grammar.rule(name).is_none() {
            return Err(Error::Validation(
                peglet_core::ValidationError::UnknownStartRule {
                    name: name.to_string(),
                },
            ));
        }
        Ok(name)
    }
}

impl TryFrom<&str> for Peg {
    type Error = Error;

    fn try_from(grammar_text: &str) -> Result<Self> {
        Peg::new(grammar_text)
    }
}
