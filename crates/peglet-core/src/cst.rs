//! Concrete syntax tree: lossless, trivia-preserving parse trees.
//!
//! Every node carries a common header (span, owning rule, leading/trailing
//! trivia) plus a kind-specific payload. Trivia are siblings held by the
//! node's trivia lists, not part of the span's text. Across one tree, every
//! input character appears exactly once: in a terminal or token text, in an
//! error node's skipped text, or in a trivia item.

use serde::{Deserialize, Serialize};

use crate::location::SourceSpan;
use crate::trivia::Trivia;

/// A node of the concrete syntax tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CstNode {
    pub span: SourceSpan,
    /// Name of the rule this node belongs to.
    pub rule: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub leading_trivia: Vec<Trivia>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trailing_trivia: Vec<Trivia>,
    #[serde(flatten)]
    pub kind: CstKind,
}

/// Kind-specific payload of a [`CstNode`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CstKind {
    /// A literal or character match.
    Terminal { text: String },
    /// A composite node; the span covers all children.
    NonTerminal { children: Vec<CstNode> },
    /// Raw text captured by a token boundary `< … >`.
    Token { text: String },
    /// Input skipped during advanced recovery.
    Error {
        skipped_text: String,
        expected: String,
    },
}

impl CstNode {
    pub fn terminal(rule: impl Into<String>, span: SourceSpan, text: impl Into<String>) -> Self {
        Self {
            span,
            rule: rule.into(),
            leading_trivia: Vec::new(),
            trailing_trivia: Vec::new(),
            kind: CstKind::Terminal { text: text.into() },
        }
    }

    pub fn nonterminal(rule: impl Into<String>, span: SourceSpan, children: Vec<CstNode>) -> Self {
        Self {
            span,
            rule: rule.into(),
            leading_trivia: Vec::new(),
            trailing_trivia: Vec::new(),
            kind: CstKind::NonTerminal { children },
        }
    }

    pub fn token(rule: impl Into<String>, span: SourceSpan, text: impl Into<String>) -> Self {
        Self {
            span,
            rule: rule.into(),
            leading_trivia: Vec::new(),
            trailing_trivia: Vec::new(),
            kind: CstKind::Token { text: text.into() },
        }
    }

    pub fn error(
        rule: impl Into<String>,
        span: SourceSpan,
        skipped_text: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self {
            span,
            rule: rule.into(),
            leading_trivia: Vec::new(),
            trailing_trivia: Vec::new(),
            kind: CstKind::Error {
                skipped_text: skipped_text.into(),
                expected: expected.into(),
            },
        }
    }

    /// Leaf text, if this is a terminal, token, or error node.
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            CstKind::Terminal { text } | CstKind::Token { text } => Some(text),
            CstKind::Error { skipped_text, .. } => Some(skipped_text),
            CstKind::NonTerminal { .. } => None,
        }
    }

    pub fn children(&self) -> &[CstNode] {
        match &self.kind {
            CstKind::NonTerminal { children } => children,
            _ => &[],
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, CstKind::Error { .. })
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            CstKind::Terminal { .. } => "Terminal",
            CstKind::NonTerminal { .. } => "NonTerminal",
            CstKind::Token { .. } => "Token",
            CstKind::Error { .. } => "Error",
        }
    }

    /// Reassembles the input covered by this node in document order,
    /// including trivia. For a successful parse of a whole input this
    /// reproduces the input exactly.
    pub fn source_text(&self) -> String {
        let mut out = String::new();
        self.write_source(&mut out);
        out
    }

    fn write_source(&self, out: &mut String) {
        for trivia in &self.leading_trivia {
            out.push_str(trivia.text());
        }
        match &self.kind {
            CstKind::Terminal { text } | CstKind::Token { text } => out.push_str(text),
            CstKind::Error { skipped_text, .. } => out.push_str(skipped_text),
            CstKind::NonTerminal { children } => {
                for child in children {
                    child.write_source(out);
                }
            }
        }
        for trivia in &self.trailing_trivia {
            out.push_str(trivia.text());
        }
    }

    /// Plain-text dump of the tree, trivia included. Stable; used by tests
    /// and the CLI.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_into(0, &mut out);
        out
    }

    fn dump_into(&self, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        for trivia in &self.leading_trivia {
            out.push_str(&format!(
                "{indent}{} {:?}\n",
                trivia.kind_name(),
                trivia.text()
            ));
        }
        match &self.kind {
            CstKind::Terminal { text } => {
                out.push_str(&format!("{indent}{} {} {:?}\n", self.rule, self.span, text));
            }
            CstKind::Token { text } => {
                out.push_str(&format!(
                    "{indent}{} {} token {:?}\n",
                    self.rule, self.span, text
                ));
            }
            CstKind::Error {
                skipped_text,
                expected,
            } => {
                out.push_str(&format!(
                    "{indent}{} {} error {:?} expected {}\n",
                    self.rule, self.span, skipped_text, expected
                ));
            }
            CstKind::NonTerminal { children } => {
                out.push_str(&format!("{indent}{} {}\n", self.rule, self.span));
                for child in children {
                    child.dump_into(depth + 1, out);
                }
            }
        }
        for trivia in &self.trailing_trivia {
            out.push_str(&format!(
                "{indent}{} {:?}\n",
                trivia.kind_name(),
                trivia.text()
            ));
        }
    }
}
