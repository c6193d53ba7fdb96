//! The diagnostics channel
//!
//! An append-only sink of semantic errors, threaded `&mut` through the
//! analysis passes. Reporting never aborts analysis; the driver decides
//! what an error count means (code generation is only meaningful when the
//! channel is empty).
//!
//! Rendering is split from collection: pretty terminal output goes through
//! `codespan-reporting`, and a JSON export serves IDE integration.

use codespan_reporting::diagnostic::{Diagnostic as CsDiagnostic, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use juno_ast::Span;
use serde::{Deserialize, Serialize};

use crate::error::SemanticError;

/// One reported semantic error with its source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Where the error was detected.
    pub span: Span,
    /// What went wrong.
    pub error: SemanticError,
}

/// The append-only error sink of one compilation.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Fresh, empty sink.
    pub fn new() -> Self {
        Diagnostics::default()
    }

    /// Append one error. Never fails, never aborts.
    pub fn report(&mut self, span: Span, error: SemanticError) {
        self.entries.push(Diagnostic { span, error });
    }

    /// True when nothing has been reported.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of reported errors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The reported errors, in report order.
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Iterate the reported errors.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Render every diagnostic to stderr with source snippets.
    pub fn emit(
        &self,
        file_name: &str,
        source: &str,
    ) -> Result<(), codespan_reporting::files::Error> {
        let mut files = SimpleFiles::new();
        let file_id = files.add(file_name.to_string(), source.to_string());
        let writer = StandardStream::stderr(ColorChoice::Auto);
        let config = term::Config::default();
        for diag in &self.entries {
            let cs = CsDiagnostic::error()
                .with_code(diag.error.code())
                .with_message(diag.error.to_string())
                .with_labels(vec![Label::primary(
                    file_id,
                    diag.span.start..diag.span.end,
                )]);
            term::emit(&mut writer.lock(), &config, &files, &cs)?;
        }
        Ok(())
    }

    /// Serialize every diagnostic for IDE consumption.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let entries: Vec<JsonDiagnostic> = self
            .entries
            .iter()
            .map(|d| JsonDiagnostic {
                code: d.error.code().to_string(),
                severity: "error".to_string(),
                message: d.error.to_string(),
                line: d.span.line,
                start: d.span.start,
                end: d.span.end,
            })
            .collect();
        serde_json::to_string_pretty(&entries)
    }
}

/// JSON shape of one diagnostic.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonDiagnostic {
    /// Stable error code (e.g. "J1003").
    pub code: String,
    /// Severity level; always "error" today.
    pub severity: String,
    /// Rendered message.
    pub message: String,
    /// 1-based source line.
    pub line: u32,
    /// Start byte offset.
    pub start: usize,
    /// End byte offset.
    pub end: usize,
}
