//! Diagnosis-specific error types

use thiserror::Error;

/// Errors raised while reading lab values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LabParseError {
    /// The analyte was mentioned but its value is not a number (e.g. `1.2.3`)
    #[error("could not parse {analyte} value '{raw}' as a number")]
    MalformedValue {
        /// Analyte name from the rule table
        analyte: &'static str,
        /// Captured text that failed to parse
        raw: String,
    },
}
