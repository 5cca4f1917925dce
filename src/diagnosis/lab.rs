//! Lab-results parser
//!
//! Each [`LabRule`] extracts one numeric analyte from free text and
//! classifies it against an upper limit. Rules are evaluated in table
//! order and each contributes exactly one finding.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{non_empty, Finding, LabParseError};

/// Glucose values above this are reported as elevated (mg/dL)
pub const GLUCOSE_UPPER_LIMIT: f64 = 110.0;

/// Classification of a reading against its rule's upper limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabLevel {
    /// At or below the upper limit
    Normal,
    /// Strictly above the upper limit
    Elevated,
}

/// A numeric lab value extractor plus threshold classifier
pub struct LabRule {
    /// Analyte name as it appears in lab text (matched case-insensitively)
    pub analyte: &'static str,
    /// Values strictly above this are elevated
    pub upper_limit: f64,
    pattern: Regex,
    elevated: fn(&str) -> String,
    normal: fn(&str) -> String,
    missing: &'static str,
}

impl LabRule {
    /// Build a rule matching `<analyte>`, then any run of `:` or whitespace,
    /// then a run of digits and dots.
    fn new(
        analyte: &'static str,
        upper_limit: f64,
        elevated: fn(&str) -> String,
        normal: fn(&str) -> String,
        missing: &'static str,
    ) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(
            r"(?i){}[:\s]*([0-9.]+)",
            regex::escape(analyte)
        ))?;
        Ok(Self {
            analyte,
            upper_limit,
            pattern,
            elevated,
            normal,
            missing,
        })
    }

    /// Find the first reading of this analyte in `text`
    ///
    /// Returns `Ok(None)` when the analyte is not mentioned with a value.
    pub fn extract(&self, text: &str) -> Result<Option<f64>, LabParseError> {
        let Some(raw) = self
            .pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
        else {
            return Ok(None);
        };

        raw.parse::<f64>()
            .map(Some)
            .map_err(|_| LabParseError::MalformedValue {
                analyte: self.analyte,
                raw: raw.to_string(),
            })
    }

    /// Compare a reading with the upper limit
    pub fn classify(&self, value: f64) -> LabLevel {
        if value > self.upper_limit {
            LabLevel::Elevated
        } else {
            LabLevel::Normal
        }
    }

    /// Produce this rule's finding for `text`
    pub fn evaluate(&self, text: Option<&str>) -> Result<Finding, LabParseError> {
        let value = match text {
            Some(text) => self.extract(text)?,
            None => None,
        };

        let Some(value) = value else {
            return Ok(Finding::new(self.missing));
        };

        let shown = format_value(value);
        let sentence = match self.classify(value) {
            LabLevel::Elevated => (self.elevated)(&shown),
            LabLevel::Normal => (self.normal)(&shown),
        };
        Ok(Finding::new(sentence))
    }
}

impl std::fmt::Debug for LabRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabRule")
            .field("analyte", &self.analyte)
            .field("upper_limit", &self.upper_limit)
            .field("pattern", &self.pattern.as_str())
            .finish()
    }
}

static LAB_RULES: Lazy<Vec<LabRule>> = Lazy::new(|| {
    vec![LabRule::new(
        "glucose",
        GLUCOSE_UPPER_LIMIT,
        |v| format!("Elevated glucose level detected: {} mg/dL.", v),
        |v| format!("Glucose level normal: {} mg/dL.", v),
        "Glucose level data not found in lab results.",
    )
    .expect("valid regex")]
});

/// The lab rule table, in evaluation order
pub fn lab_rules() -> &'static [LabRule] {
    &LAB_RULES
}

/// Run every lab rule over the lab text
///
/// Absent or empty text yields each rule's "not found" finding.
pub fn parse_lab_results(text: Option<&str>) -> Result<Vec<Finding>, LabParseError> {
    let text = non_empty(text);
    lab_rules().iter().map(|rule| rule.evaluate(text)).collect()
}

/// Shortest round-trip form, always with a fractional part (`150` -> `150.0`)
///
/// Very large or small values use a signed, two-digit exponent
/// (`1e+16`, `1e-05`).
fn format_value(value: f64) -> String {
    let shown = format!("{:?}", value);
    match shown.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => shown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOT_FOUND: &str = "Glucose level data not found in lab results.";

    fn findings(text: &str) -> Vec<String> {
        parse_lab_results(Some(text))
            .unwrap()
            .into_iter()
            .map(|f| f.to_string())
            .collect()
    }

    #[test]
    fn test_absent_lab_results() {
        let result = parse_lab_results(None).unwrap();
        assert_eq!(result, vec![Finding::new(NOT_FOUND)]);
        assert_eq!(parse_lab_results(Some("")).unwrap(), result);
    }

    #[test]
    fn test_elevated_glucose() {
        assert_eq!(
            findings("Glucose: 150"),
            vec!["Elevated glucose level detected: 150.0 mg/dL."]
        );
    }

    #[test]
    fn test_normal_glucose() {
        assert_eq!(
            findings("glucose 95"),
            vec!["Glucose level normal: 95.0 mg/dL."]
        );
        assert_eq!(
            findings("HbA1c 5.4, GLUCOSE:\t98.6, LDL 120"),
            vec!["Glucose level normal: 98.6 mg/dL."]
        );
    }

    #[test]
    fn test_threshold_is_exclusive() {
        assert_eq!(
            findings("glucose: 110"),
            vec!["Glucose level normal: 110.0 mg/dL."]
        );
        assert_eq!(
            findings("glucose: 110.1"),
            vec!["Elevated glucose level detected: 110.1 mg/dL."]
        );
    }

    #[test]
    fn test_glucose_not_found() {
        assert_eq!(findings("Cholesterol 180, HDL 50"), vec![NOT_FOUND]);
        // Mentioned without a value right after the separators.
        assert_eq!(findings("glucose: pending"), vec![NOT_FOUND]);
    }

    #[test]
    fn test_first_mention_wins() {
        assert_eq!(
            findings("glucose 90 (fasting), glucose 200 (post-meal)"),
            vec!["Glucose level normal: 90.0 mg/dL."]
        );
    }

    #[test]
    fn test_trailing_and_leading_dot_values() {
        assert_eq!(
            findings("glucose: 120."),
            vec!["Elevated glucose level detected: 120.0 mg/dL."]
        );
        assert_eq!(
            findings("glucose .5"),
            vec!["Glucose level normal: 0.5 mg/dL."]
        );
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(150.0), "150.0");
        assert_eq!(format_value(98.6), "98.6");
        assert_eq!(format_value(0.0001), "0.0001");
        assert_eq!(format_value(1e16), "1e+16");
        assert_eq!(format_value(1.5e16), "1.5e+16");
        assert_eq!(format_value(0.00001), "1e-05");
        assert_eq!(format_value(1.25e-100), "1.25e-100");
    }

    #[test]
    fn test_large_value_uses_signed_exponent() {
        assert_eq!(
            findings("glucose 10000000000000000"),
            vec!["Elevated glucose level detected: 1e+16 mg/dL."]
        );
    }

    #[test]
    fn test_only_ascii_digits_are_read() {
        // Arabic-Indic digits are not treated as a value.
        assert_eq!(findings("glucose \u{661}\u{665}\u{660}"), vec![NOT_FOUND]);
    }

    #[test]
    fn test_malformed_value() {
        let err = parse_lab_results(Some("Glucose: 1.2.3")).unwrap_err();
        assert_eq!(
            err,
            LabParseError::MalformedValue {
                analyte: "glucose",
                raw: "1.2.3".to_string(),
            }
        );

        assert!(parse_lab_results(Some("glucose: .")).is_err());
    }

    #[test]
    fn test_classify() {
        let rule = &lab_rules()[0];
        assert_eq!(rule.analyte, "glucose");
        assert_eq!(rule.classify(110.0), LabLevel::Normal);
        assert_eq!(rule.classify(110.5), LabLevel::Elevated);
        assert_eq!(rule.extract("no data").unwrap(), None);
        assert_eq!(rule.extract("GLUCOSE   42").unwrap(), Some(42.0));
    }
}
