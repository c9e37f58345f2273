//! Diagnostics infrastructure.
//!
//! Collects located messages from grammar parsing, validation, and
//! (in advanced recovery mode) input parsing, and renders them in the
//! compiler style via annotate-snippets.

mod message;
mod printer;

#[cfg(test)]
mod tests;

pub use message::{CODE_SYNTAX, Diagnostic, RelatedInfo, Severity};
pub use printer::DiagnosticsPrinter;

/// Collection of diagnostic messages.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct Diagnostics {
    messages: Vec<Diagnostic>,
}

/// Builder for constructing a diagnostic message.
#[must_use = "diagnostic not emitted, call .emit()"]
pub struct DiagnosticBuilder<'a> {
    diagnostics: &'a mut Diagnostics,
    message: Diagnostic,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    pub fn error(
        &mut self,
        msg: impl Into<String>,
        range: std::ops::Range<usize>,
    ) -> DiagnosticBuilder<'_> {
        DiagnosticBuilder {
            diagnostics: self,
            message: Diagnostic::error(range, msg),
        }
    }

    pub fn warning(
        &mut self,
        msg: impl Into<String>,
        range: std::ops::Range<usize>,
    ) -> DiagnosticBuilder<'_> {
        DiagnosticBuilder {
            diagnostics: self,
            message: Diagnostic::warning(range, msg),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.messages.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|d| d.is_error())
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.messages.extend(other.messages);
    }

    pub fn printer(&self) -> DiagnosticsPrinter<'_, '_> {
        DiagnosticsPrinter::new(self)
    }
}

impl<'a> DiagnosticBuilder<'a> {
    pub fn help(mut self, text: impl Into<String>) -> Self {
        self.message.help = Some(text.into());
        self
    }

    pub fn related_to(mut self, msg: impl Into<String>, range: std::ops::Range<usize>) -> Self {
        self.message.related.push(RelatedInfo::new(range, msg));
        self
    }

    pub fn emit(self) {
        self.diagnostics.messages.push(self.message);
    }
}
