//! Warnings and errors as reported to the caller of a generation run.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

use crate::error::Error;
use crate::location::Location;

/// How serious a diagnostic is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    /// Generation continues; the affected item is omitted or adjusted.
    Warning,
    /// Generation fails.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One reported problem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Warning or error.
    pub severity: Severity,
    /// Stable machine-checkable category.
    pub category: String,
    /// Human-readable message.
    pub message: String,
    /// Qualified name of the declaration concerned.
    pub qualified_name: Option<String>,
    /// Location of the declaration concerned.
    pub location: Option<Location>,
    /// Secondary messages.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl Diagnostic {
    /// Creates a warning.
    #[must_use]
    pub fn warning(category: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            category: category.to_string(),
            message: message.into(),
            qualified_name: None,
            location: None,
            notes: Vec::new(),
        }
    }

    /// Attaches the declaration the diagnostic refers to.
    #[must_use]
    pub fn at(mut self, qualified_name: impl Into<String>, location: Location) -> Self {
        self.qualified_name = Some(qualified_name.into());
        self.location = Some(location);
        self
    }

    /// Converts a fatal error into its reported form.
    #[must_use]
    pub fn from_error(error: &Error) -> Self {
        let (qualified_name, location, notes) = match &error.context {
            Some(ctx) => (
                ctx.qualified_name.clone(),
                ctx.location.clone(),
                ctx.notes
                    .iter()
                    .map(|n| match &n.location {
                        Some(loc) => format!("{} at {loc}", n.message),
                        None => n.message.clone(),
                    })
                    .collect(),
            ),
            None => (None, None, Vec::new()),
        };
        Self {
            severity: Severity::Error,
            category: error.category().to_string(),
            message: error.kind.to_string(),
            qualified_name,
            location,
            notes,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.category, self.message)?;
        if let Some(name) = &self.qualified_name {
            write!(f, " (in '{name}')")?;
        }
        if let Some(loc) = &self.location {
            write!(f, " at {loc}")?;
        }
        for note in &self.notes {
            write!(f, "\n  note: {note}")?;
        }
        Ok(())
    }
}

/// Collects warnings in the order they are raised.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a warning.
    pub fn warn(&mut self, diagnostic: Diagnostic) {
        self.warnings.push(diagnostic);
    }

    /// Appends every warning of another sink.
    pub fn extend(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
    }

    /// Returns the collected warnings.
    #[must_use]
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    /// Returns true if no warning was raised.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Consumes the sink.
    #[must_use]
    pub fn into_warnings(self) -> Vec<Diagnostic> {
        self.warnings
    }
}

/// A failed generation run: at least one fatal error, plus any warnings
/// raised before the run stopped.
#[derive(Debug, Clone, ThisError)]
#[error("{}", summary(.errors))]
pub struct Failure {
    /// Fatal errors, in the order they were detected.
    pub errors: Vec<Error>,
    /// Warnings raised before the run stopped.
    pub warnings: Vec<Diagnostic>,
}

impl Failure {
    /// Creates a failure from errors and the warnings collected so far.
    #[must_use]
    pub fn new(errors: Vec<Error>, warnings: Diagnostics) -> Self {
        Self {
            errors,
            warnings: warnings.into_warnings(),
        }
    }

    /// Returns every error and warning in reported form, errors first.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.errors
            .iter()
            .map(Diagnostic::from_error)
            .chain(self.warnings.iter().cloned())
            .collect()
    }

    /// Returns true if any error has the given category.
    #[must_use]
    pub fn has_category(&self, category: &str) -> bool {
        self.errors.iter().any(|e| e.category() == category)
    }
}

fn summary(errors: &[Error]) -> String {
    match errors {
        [] => "generation failed".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more errors)", rest.len()),
    }
}
