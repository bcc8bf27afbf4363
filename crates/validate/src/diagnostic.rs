//! Diagnostics and the sinks that receive them.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use wiring_model::Severity;

/// One reported problem with every way it was reached
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Entity labels from a root component down to the problem
    pub encounter_paths: Vec<Vec<String>>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            encounter_paths: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)?;
        for path in &self.encounter_paths {
            write!(f, "\n  encountered in: {}", path.join(" -> "))?;
        }
        for note in &self.notes {
            write!(f, "\n  note: {note}")?;
        }
        Ok(())
    }
}

/// Receiver of validation diagnostics
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Groups diagnostics by `(severity, message)` and merges their paths and
/// notes, keeping first-report order.
#[derive(Debug, Default)]
pub struct Collector {
    diagnostics: Vec<Diagnostic>,
    index: HashMap<(Severity, String), usize>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn into_report(self) -> ValidationReport {
        ValidationReport {
            diagnostics: self.diagnostics,
        }
    }
}

impl DiagnosticSink for Collector {
    fn report(&mut self, diagnostic: Diagnostic) {
        let key = (diagnostic.severity, diagnostic.message.clone());
        let Some(&slot) = self.index.get(&key) else {
            self.index.insert(key, self.diagnostics.len());
            self.diagnostics.push(diagnostic);
            return;
        };

        let existing = &mut self.diagnostics[slot];
        for path in diagnostic.encounter_paths {
            if !existing.encounter_paths.contains(&path) {
                existing.encounter_paths.push(path);
            }
        }
        for note in diagnostic.notes {
            if !existing.notes.contains(&note) {
                existing.notes.push(note);
            }
        }
    }
}

/// Outcome of a validation pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationReport {
    pub fn errors(&self) -> Vec<&Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error()).collect()
    }

    /// Warnings of both kinds
    pub fn warnings(&self) -> Vec<&Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error()).collect()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for diagnostic in &self.diagnostics {
            writeln!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}
