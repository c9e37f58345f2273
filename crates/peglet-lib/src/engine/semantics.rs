//! Semantic values and the action hook.
//!
//! Inline action code in grammar text is opaque to the engine. A host
//! registers a callable per rule name; after a successful rule evaluation
//! in value-returning mode the engine invokes it with the rule's
//! [`SemanticValues`]. The callable's return value becomes the rule's
//! semantic value; an error fails the rule at the rule's start location.

use std::collections::HashMap;
use std::sync::Arc;

use peglet_core::{SourceSpan, Value};

/// An action raised an error; the parse fails at the rule start.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ActionError {
    pub message: String,
}

impl ActionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<&str> for ActionError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for ActionError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

/// A rule action.
pub type Action = dyn Fn(&SemanticValues<'_>) -> Result<Value, ActionError> + Send + Sync;

/// Action registry keyed by rule name.
#[derive(Default, Clone)]
pub(crate) struct Actions {
    by_rule: HashMap<String, Arc<Action>>,
}

impl Actions {
    pub fn set(&mut self, rule: &str, action: Arc<Action>) {
        self.by_rule.insert(rule.to_string(), action);
    }

    pub fn get(&self, rule: &str) -> Option<&Arc<Action>> {
        self.by_rule.get(rule)
    }
}

impl std::fmt::Debug for Actions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actions")
            .field("rules", &self.by_rule.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// What a rule action sees: the matched text and the child rule values in
/// left-to-right order.
#[derive(Debug)]
pub struct SemanticValues<'a> {
    token: &'a str,
    values: &'a [Value],
    span: SourceSpan,
}

impl<'a> SemanticValues<'a> {
    pub(crate) fn new(token: &'a str, values: &'a [Value], span: SourceSpan) -> Self {
        Self {
            token,
            values,
            span,
        }
    }

    /// `$0`: the text captured by a token boundary inside the rule, or the
    /// full matched span if no boundary fired.
    pub fn token(&self) -> &str {
        self.token
    }

    /// `$1..$N` as 0-based access.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn values(&self) -> &[Value] {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn span(&self) -> SourceSpan {
        self.span
    }

    pub fn token_to_int(&self) -> Option<i64> {
        self.token.trim().parse().ok()
    }

    pub fn token_to_float(&self) -> Option<f64> {
        self.token.trim().parse().ok()
    }
}
