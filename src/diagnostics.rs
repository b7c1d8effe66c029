//! Diagnostics reported to the host build tool.

use serde::{Deserialize, Serialize};

use crate::validate::CompilerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub message: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub source_excerpt: Option<String>,
}

impl Diagnostic {
    /// Builds a diagnostic from an error raised while compiling `source`.
    /// `base_line` is the line of the host file on which the template starts.
    pub fn from_error(
        severity: Severity,
        err: &CompilerError,
        source: &str,
        base_line: u32,
    ) -> Self {
        let source_excerpt = err.context.clone().or_else(|| {
            source
                .lines()
                .nth(err.line.saturating_sub(1) as usize)
                .map(|l| l.to_string())
        });
        Diagnostic {
            severity,
            code: err.code.clone(),
            message: err.message.clone(),
            file: err.file.clone(),
            line: err.line + base_line.saturating_sub(1),
            column: err.column,
            source_excerpt,
        }
    }

    /// Human readable form:
    ///
    /// ```text
    /// message
    ///   > file, Ln 3, Col 5
    ///   > <div class="${a(}">
    ///     ^^^
    /// ```
    pub fn render(&self) -> String {
        let mut out = format!(
            "{}\n  > {}, Ln {}, Col {}",
            self.message, self.file, self.line, self.column
        );
        if let Some(excerpt) = &self.source_excerpt {
            let trimmed = excerpt.trim_start();
            let removed = excerpt.chars().count() - trimmed.chars().count();
            let caret_at = (self.column as usize).saturating_sub(1).saturating_sub(removed);
            out.push_str(&format!(
                "\n  > {}\n    {}^^^",
                trimmed.trim_end(),
                " ".repeat(caret_at)
            ));
        }
        out
    }
}

pub trait DiagnosticSink {
    fn emit_error(&mut self, diagnostic: &Diagnostic);
    fn emit_warning(&mut self, diagnostic: &Diagnostic);
}

/// Keeps every diagnostic in emission order.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    pub diagnostics: Vec<Diagnostic>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }
}

impl DiagnosticSink for CollectingSink {
    fn emit_error(&mut self, diagnostic: &Diagnostic) {
        self.diagnostics.push(diagnostic.clone());
    }

    fn emit_warning(&mut self, diagnostic: &Diagnostic) {
        self.diagnostics.push(diagnostic.clone());
    }
}

/// Forwards diagnostics to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit_error(&mut self, diagnostic: &Diagnostic) {
        tracing::error!(file = %diagnostic.file, code = %diagnostic.code, "{}", diagnostic.render());
    }

    fn emit_warning(&mut self, diagnostic: &Diagnostic) {
        tracing::warn!(file = %diagnostic.file, code = %diagnostic.code, "{}", diagnostic.render());
    }
}

pub(crate) fn emit(sink: &mut dyn DiagnosticSink, diagnostic: &Diagnostic) {
    match diagnostic.severity {
        Severity::Error => sink.emit_error(diagnostic),
        Severity::Warning => sink.emit_warning(diagnostic),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::ERR_UNKNOWN_TAG;

    #[test]
    fn test_render_points_at_column() {
        let err = CompilerError::new(ERR_UNKNOWN_TAG, "'foo' is not known html tag", "a.html", 2, 7);
        let d = Diagnostic::from_error(Severity::Error, &err, "<div>\n    <foo></foo>\n</div>", 1);
        assert_eq!(
            d.render(),
            "'foo' is not known html tag\n  > a.html, Ln 2, Col 7\n  > <foo></foo>\n      ^^^"
        );
    }

    #[test]
    fn test_base_line_shifts_reported_line() {
        let err = CompilerError::new(ERR_UNKNOWN_TAG, "x", "a.html", 2, 1);
        let d = Diagnostic::from_error(Severity::Warning, &err, "a\nb", 10);
        assert_eq!(d.line, 11);
        assert_eq!(d.source_excerpt.as_deref(), Some("b"));
    }
}
