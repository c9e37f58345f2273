//! Diagnostic message types.

use serde::Serialize;
use std::ops::Range;

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Related location information, rendered as a secondary annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelatedInfo {
    pub range: Range<usize>,
    pub message: String,
}

impl RelatedInfo {
    pub fn new(range: Range<usize>, message: impl Into<String>) -> Self {
        Self {
            range,
            message: message.into(),
        }
    }
}

/// Diagnostic code rendered as `error[E0001]`.
pub const CODE_SYNTAX: &str = "E0001";

/// A diagnostic message: severity, code, primary byte range, message,
/// optional help note, and secondary annotations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Rendered in brackets after the severity; errors carry one, warnings
    /// do not.
    pub code: Option<&'static str>,
    pub range: Range<usize>,
    pub message: String,
    pub help: Option<String>,
    pub related: Vec<RelatedInfo>,
}

impl Diagnostic {
    pub fn error(range: Range<usize>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code: Some(CODE_SYNTAX),
            range,
            message: message.into(),
            help: None,
            related: Vec::new(),
        }
    }

    pub fn warning(range: Range<usize>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code: None,
            range,
            message: message.into(),
            help: None,
            related: Vec::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.severity)?;
        if let Some(code) = self.code {
            write!(f, "[{code}]")?;
        }
        write!(
            f,
            " at {}..{}: {}",
            self.range.start, self.range.end, self.message
        )?;
        if let Some(help) = &self.help {
            write!(f, " (help: {help})")?;
        }
        for related in &self.related {
            write!(
                f,
                " (related: {} at {}..{})",
                related.message, related.range.start, related.range.end
            )?;
        }
        Ok(())
    }
}
