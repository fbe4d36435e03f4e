//! Diagnostics reported by the pipeline.
//!
//! Every check appends a [`Diagnostic`] to a [`Diagnostics`] collector and keeps going:
//! errors never short-circuit a pass.
//! The collector deduplicates by `(message, line, column)` when finished,
//! keeping the first occurrence and the emission order.

use crate::element::Position;
use hashbrown::HashSet;
use serde::Serialize;
use std::fmt;

/// How bad a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The document is not valid.
    Error,
    /// The document is valid but likely not what was intended.
    Warning,
}

impl Severity {
    /// Whether this is [`Severity::Error`].
    pub fn is_error(self) -> bool {
        matches!(self, Severity::Error)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// The category of problem a diagnostic reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// Missing id or attribute, malformed compound state, unreachable or duplicate state.
    Structural,
    /// A reference to a state that does not exist.
    Referential,
    /// A transition that violates the cross-hierarchy policy or its legality rules.
    HierarchyPolicy,
    /// Circular parallel dependencies and circular history defaults.
    Topological,
    /// Unknown attributes and elements.
    Schema,
}

/// A single problem found in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    message: String,
    severity: Severity,
    kind: DiagnosticKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    column: Option<u32>,
}

impl Diagnostic {
    /// Creates an error diagnostic.
    pub fn error(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, kind, message)
    }

    /// Creates a warning diagnostic.
    pub fn warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, kind, message)
    }

    fn new(severity: Severity, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity,
            kind,
            line: None,
            column: None,
        }
    }

    /// Attaches the source position, if known.
    pub fn at(mut self, position: Option<Position>) -> Self {
        if let Some(position) = position {
            self.line = Some(position.line);
            self.column = position.column;
        }
        self
    }

    /// The message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The severity.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// The category.
    pub fn kind(&self) -> DiagnosticKind {
        self.kind
    }

    /// The line, if known.
    pub fn line(&self) -> Option<u32> {
        self.line
    }

    /// The column, if known.
    pub fn column(&self) -> Option<u32> {
        self.column
    }

    /// Whether this is an error.
    pub fn is_error(&self) -> bool {
        self.severity.is_error()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => {
                write!(f, "{}[{line}:{column}]: {}", self.severity, self.message)
            }
            (Some(line), None) => write!(f, "{}[{line}]: {}", self.severity, self.message),
            _ => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

/// Accumulates diagnostics during a pass.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    diagnostics: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a diagnostic.
    pub fn emit(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => log::debug!(target: "diagnostics", "{diagnostic}"),
            Severity::Warning => log::trace!(target: "diagnostics", "{diagnostic}"),
        }
        self.diagnostics.push(diagnostic);
    }

    /// Whether at least one error has been emitted.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// The errors emitted so far.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    /// Every diagnostic emitted so far, duplicates included.
    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.diagnostics.iter()
    }

    /// Number of diagnostics emitted so far, duplicates included.
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Whether nothing has been emitted.
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Deduplicates by `(message, line, column)`, keeping the first occurrence.
    pub fn finish(self) -> Vec<Diagnostic> {
        let mut seen = HashSet::new();
        self.diagnostics
            .into_iter()
            .filter(|d| seen.insert((d.message.clone(), d.line, d.column)))
            .collect()
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<T: IntoIterator<Item = Diagnostic>>(&mut self, iter: T) {
        for diagnostic in iter {
            self.emit(diagnostic);
        }
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.into_iter()
    }
}
