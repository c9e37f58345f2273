//! Abstract syntax tree: the CST projection without trivia.
//!
//! Token nodes merge into terminals; trivia lists are dropped. Structure is
//! otherwise preserved, including `Error` nodes from recovered parses, so
//! a recovered region never masquerades as real input.

use serde::{Deserialize, Serialize};

use crate::cst::{CstKind, CstNode};
use crate::location::SourceSpan;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AstNode {
    pub span: SourceSpan,
    pub rule: String,
    #[serde(flatten)]
    pub kind: AstKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AstKind {
    Terminal { text: String },
    NonTerminal { children: Vec<AstNode> },
    /// Input skipped during advanced recovery.
    Error {
        skipped_text: String,
        expected: String,
    },
}

impl AstNode {
    /// Projects a CST into its abstract form.
    pub fn project(cst: &CstNode) -> AstNode {
        let kind = match &cst.kind {
            CstKind::Terminal { text } | CstKind::Token { text } => AstKind::Terminal {
                text: text.clone(),
            },
            CstKind::Error {
                skipped_text,
                expected,
            } => AstKind::Error {
                skipped_text: skipped_text.clone(),
                expected: expected.clone(),
            },
            CstKind::NonTerminal { children } => AstKind::NonTerminal {
                children: children.iter().map(AstNode::project).collect(),
            },
        };
        AstNode {
            span: cst.span,
            rule: cst.rule.clone(),
            kind,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            AstKind::Terminal { text } => Some(text),
            AstKind::Error { skipped_text, .. } => Some(skipped_text),
            AstKind::NonTerminal { .. } => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, AstKind::Error { .. })
    }

    pub fn children(&self) -> &[AstNode] {
        match &self.kind {
            AstKind::NonTerminal { children } => children,
            _ => &[],
        }
    }

    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_into(0, &mut out);
        out
    }

    fn dump_into(&self, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        match &self.kind {
            AstKind::Terminal { text } => {
                out.push_str(&format!("{indent}{} {} {:?}\n", self.rule, self.span, text));
            }
            AstKind::Error {
                skipped_text,
                expected,
            } => {
                out.push_str(&format!(
                    "{indent}{} {} error {:?} expected {}\n",
                    self.rule, self.span, skipped_text, expected
                ));
            }
            AstKind::NonTerminal { children } => {
                out.push_str(&format!("{indent}{} {}\n", self.rule, self.span));
                for child in children {
                    child.dump_into(depth + 1, out);
                }
            }
        }
    }
}

impl From<&CstNode> for AstNode {
    fn from(cst: &CstNode) -> Self {
        AstNode::project(cst)
    }
}
