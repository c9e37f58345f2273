//! Grammar records: rules, directives, and validation.

use indexmap::IndexMap;
use serde::Serialize;

use crate::expr::Expression;

/// One grammar rule.
#[derive(Debug, Clone, Serialize)]
pub struct Rule {
    pub name: String,
    pub expression: Expression,
    /// Inline action code from the grammar text. Opaque to the engine; a
    /// host compiles it into a callable registered on the parser.
    pub action_source: Option<String>,
    /// Custom message substituted for failures of this rule.
    pub error_message: Option<String>,
}

impl Rule {
    pub fn new(name: impl Into<String>, expression: Expression) -> Self {
        Self {
            name: name.into(),
            expression,
            action_source: None,
            error_message: None,
        }
    }
}

/// A validated set of rules plus directives.
///
/// Rule order is significant: the first rule is the default start rule, and
/// dense rule ids (used as packrat cache keys) are assigned by position.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Grammar {
    rules: IndexMap<String, Rule>,
    /// Explicit start rule override.
    pub start_rule: Option<String>,
    /// `%whitespace` directive expression.
    pub whitespace: Option<Expression>,
    /// `%word` directive expression. Accepted but has no runtime effect.
    pub word: Option<Expression>,
}

impl Grammar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule, replacing any earlier rule of the same name.
    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.insert(rule.name.clone(), rule);
    }

    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    /// Dense id for packrat cache keys; position in declaration order.
    pub fn rule_id(&self, name: &str) -> Option<u32> {
        self.rules.get_index_of(name).map(|i| i as u32)
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The explicit start rule if set, else the first rule.
    pub fn effective_start_rule(&self) -> Option<&str> {
        self.start_rule
            .as_deref()
            .or_else(|| self.rules.keys().next().map(String::as_str))
    }

    /// Inner expression of the whitespace directive.
    ///
    /// `%whitespace <- e*` and `%whitespace <- e+` unwrap to `e`, so the
    /// engine consumes one trivia item per iteration.
    pub fn whitespace_inner(&self) -> Option<&Expression> {
        match &self.whitespace {
            Some(Expression::ZeroOrMore { expr }) | Some(Expression::OneOrMore { expr }) => {
                Some(expr)
            }
            other => other.as_ref(),
        }
    }

    /// Checks every reference and back-reference, the start rule, and
    /// non-emptiness. Reports the first offending location in declaration
    /// order.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.rules.is_empty() {
            return Err(ValidationError::EmptyGrammar);
        }

        if let Some(start) = &self.start_rule {
            if !self.rules.contains_key(start) {
                return Err(ValidationError::UnknownStartRule {
                    name: start.clone(),
                });
            }
        }

        let capture_names: std::collections::HashSet<&str> = {
            let mut names = std::collections::HashSet::new();
            for rule in self.rules.values() {
                rule.expression.walk(&mut |expr| {
                    if let Expression::Capture { name, .. } = expr {
                        names.insert(name.as_str());
                    }
                });
            }
            names
        };

        let mut first_error: Option<ValidationError> = None;
        let mut check = |expr: &Expression| {
            if first_error.is_some() {
                return;
            }
            match expr {
                Expression::Reference { rule, offset } if !self.rules.contains_key(rule) => {
                    first_error = Some(ValidationError::UndefinedRule {
                        name: rule.clone(),
                        offset: *offset,
                    });
                }
                Expression::BackReference { name, offset }
                    if !capture_names.contains(name.as_str()) =>
                {
                    first_error = Some(ValidationError::UndefinedCapture {
                        name: name.clone(),
                        offset: *offset,
                    });
                }
                _ => {}
            }
        };

        for rule in self.rules.values() {
            rule.expression.walk(&mut check);
        }
        if let Some(ws) = &self.whitespace {
            ws.walk(&mut check);
        }
        if let Some(word) = &self.word {
            word.walk(&mut check);
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Grammar-build-time errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("reference to undefined rule `{name}`")]
    UndefinedRule { name: String, offset: usize },

    #[error("back-reference to undefined capture `{name}`")]
    UndefinedCapture { name: String, offset: usize },

    #[error("start rule `{name}` is not defined")]
    UnknownStartRule { name: String },

    #[error("grammar has no rules")]
    EmptyGrammar,
}

impl ValidationError {
    /// Offset into the grammar text, when known.
    pub fn offset(&self) -> Option<usize> {
        match self {
            ValidationError::UndefinedRule { offset, .. }
            | ValidationError::UndefinedCapture { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}
