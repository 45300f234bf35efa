//! Non-fatal warnings returned next to a successful read or write.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A column kept its inferred dtype because its declared type did not fit.
    CoercionFailed {
        column: String,
        declared: String,
        reason: String,
    },
    /// Columns left out of the written file.
    UnsupportedColumns { columns: Vec<String> },
}

impl Diagnostic {
    /// Whether this diagnostic is about `name`.
    pub fn mentions(&self, name: &str) -> bool {
        match self {
            Diagnostic::CoercionFailed { column, .. } => column == name,
            Diagnostic::UnsupportedColumns { columns } => columns.iter().any(|c| c == name),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::CoercionFailed {
                column,
                declared,
                reason,
            } => write!(
                f,
                "failed to convert column '{}' to '{}': {}",
                column, declared, reason
            ),
            Diagnostic::UnsupportedColumns { columns } => write!(
                f,
                "column(s) with unsupported data type(s) will not be written: {}",
                columns.join(", ")
            ),
        }
    }
}
