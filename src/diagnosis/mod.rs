//! Diagnosis rules and response composition
//!
//! Turns the three optional inputs of a diagnosis request into an ordered
//! list of findings: image status, clinical findings, lab findings.

pub mod clinical;
pub mod error;
pub mod lab;

use axum::body::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use clinical::classify_clinical_text;
pub use error::LabParseError;
pub use lab::{parse_lab_results, LabLevel, LabRule};

/// Finding reported when the request carries no image
pub const NO_IMAGE_FINDING: &str = "No medical image provided.";

/// One classified textual observation produced by a rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Finding(String);

impl Finding {
    /// Create a finding from any sentence
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Status finding for the image slot
    ///
    /// `stored_name` is the name the image was saved under, if any.
    pub fn image_status(stored_name: Option<&str>) -> Self {
        match stored_name {
            Some(name) => Self(format!("Medical image '{}' received and saved.", name)),
            None => Self::new(NO_IMAGE_FINDING),
        }
    }

    /// The sentence
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Finding {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// An image file received with a diagnosis request
#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// Filename as supplied by the client (untrusted)
    pub file_name: String,
    /// Raw file contents
    pub data: Bytes,
}

/// Inputs of a single diagnosis request
///
/// Every field is optional and all of them may be absent at once.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticRequest {
    /// Uploaded medical image
    pub medical_image: Option<UploadedImage>,
    /// Free-text clinical notes
    pub clinical_text: Option<String>,
    /// Free-text lab results
    pub lab_results: Option<String>,
}

/// Findings derived from the text fields of a request
#[derive(Debug, Clone, PartialEq)]
pub struct TextFindings {
    /// Output of the clinical classifier
    pub clinical: Vec<Finding>,
    /// Output of the lab rules
    pub lab: Vec<Finding>,
}

impl DiagnosticRequest {
    /// Run the clinical and lab rules over the text fields
    pub fn text_findings(&self) -> Result<TextFindings, LabParseError> {
        let clinical = vec![classify_clinical_text(self.clinical_text.as_deref())];
        let lab = parse_lab_results(self.lab_results.as_deref())?;
        Ok(TextFindings { clinical, lab })
    }
}

/// Body returned by `POST /diagnose/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticResponse {
    /// Newline-joined findings
    pub diagnosis: String,
}

/// Join findings into the diagnostic summary, in the fixed order
/// image status, clinical findings, lab findings
pub fn compose(image_status: Finding, text: TextFindings) -> DiagnosticResponse {
    let diagnosis = std::iter::once(image_status)
        .chain(text.clinical)
        .chain(text.lab)
        .map(|finding| finding.0)
        .collect::<Vec<_>>()
        .join("\n");

    DiagnosticResponse { diagnosis }
}

/// Treat empty form values as absent
pub(crate) fn non_empty(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.is_empty())
}
