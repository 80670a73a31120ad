//! Error types for test selection and reporting
//!
//! Every failure aborts the current run unless failure isolation is enabled
//! in [`crate::config::AnalysisConfig`], in which case numerical failures for
//! a single parameter are downgraded to a skipped row.

use thiserror::Error;

/// Errors that can occur while loading, testing or writing results
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Insufficient data for {test}: {reason}")]
    InsufficientData { test: String, reason: String },

    #[error("Schema mismatch: group '{group}' has no {what}")]
    SchemaMismatch { group: String, what: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Numerical failure in {test}: {reason}")]
    Numerical { test: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Workbook error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),
}

impl AnalysisError {
    pub(crate) fn insufficient(test: &str, reason: impl Into<String>) -> Self {
        Self::InsufficientData {
            test: test.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn numerical(test: &str, reason: impl Into<String>) -> Self {
        Self::Numerical {
            test: test.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this failure may be isolated to a single parameter
    ///
    /// Schema mismatches and I/O failures are caller or environment errors
    /// and always abort the run.
    pub fn is_isolatable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientData { .. } | Self::Numerical { .. } | Self::InvalidInput(_)
        )
    }
}

/// Result type for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;
