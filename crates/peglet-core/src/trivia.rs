//! Trivia: whitespace and comments surrounding significant tokens.

use serde::{Deserialize, Serialize};

use crate::location::SourceSpan;

/// A single run of insignificant text consumed by the whitespace rule.
///
/// Classification is fixed: text starting with `//` is a line comment,
/// text starting with `/*` is a block comment, anything else is whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Trivia {
    Whitespace { span: SourceSpan, text: String },
    LineComment { span: SourceSpan, text: String },
    BlockComment { span: SourceSpan, text: String },
}

impl Trivia {
    /// Classifies a consumed slice by its leading characters.
    pub fn classify(span: SourceSpan, text: String) -> Trivia {
        if text.starts_with("//") {
            Trivia::LineComment { span, text }
        } else if text.starts_with("/*") {
            Trivia::BlockComment { span, text }
        } else {
            Trivia::Whitespace { span, text }
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Trivia::Whitespace { text, .. }
            | Trivia::LineComment { text, .. }
            | Trivia::BlockComment { text, .. } => text,
        }
    }

    pub fn span(&self) -> SourceSpan {
        match self {
            Trivia::Whitespace { span, .. }
            | Trivia::LineComment { span, .. }
            | Trivia::BlockComment { span, .. } => *span,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Trivia::Whitespace { .. } => "Whitespace",
            Trivia::LineComment { .. } => "LineComment",
            Trivia::BlockComment { .. } => "BlockComment",
        }
    }
}
