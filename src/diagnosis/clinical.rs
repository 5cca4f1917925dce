//! Clinical-text classifier
//!
//! Keyword table over lower-cased clinical notes. The first rule with a
//! matching keyword decides the finding.

use super::{non_empty, Finding};

/// Finding when no clinical text was sent
pub const NO_CLINICAL_TEXT: &str = "No clinical text provided.";

/// Finding when no keyword rule matched
pub const NO_SIGNIFICANT_SYMPTOMS: &str = "No significant clinical symptoms detected.";

/// Maps a set of keywords to the finding reported when any of them occurs
#[derive(Debug, Clone, Copy)]
pub struct KeywordRule {
    /// Lower-case keywords, matched as substrings
    pub keywords: &'static [&'static str],
    /// Sentence reported on a match
    pub finding: &'static str,
}

impl KeywordRule {
    /// Whether any keyword occurs in already lower-cased text
    pub fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|keyword| lowered.contains(keyword))
    }
}

/// Rules in priority order
pub const CLINICAL_RULES: &[KeywordRule] = &[KeywordRule {
    keywords: &["fever", "cough", "infection"],
    finding: "Clinical symptoms suggest possible infection.",
}];

/// Classify clinical notes into a single finding
pub fn classify_clinical_text(text: Option<&str>) -> Finding {
    let Some(text) = non_empty(text) else {
        return Finding::new(NO_CLINICAL_TEXT);
    };

    let lowered = text.to_lowercase();
    CLINICAL_RULES
        .iter()
        .find(|rule| rule.matches(&lowered))
        .map(|rule| Finding::new(rule.finding))
        .unwrap_or_else(|| Finding::new(NO_SIGNIFICANT_SYMPTOMS))
}

#[cfg(test)]
mod tests {
    use super::*;

    const INFECTION: &str = "Clinical symptoms suggest possible infection.";

    #[test]
    fn test_absent_text() {
        assert_eq!(classify_clinical_text(None).as_str(), NO_CLINICAL_TEXT);
        assert_eq!(classify_clinical_text(Some("")).as_str(), NO_CLINICAL_TEXT);
    }

    #[test]
    fn test_keywords_any_case() {
        for text in [
            "Patient reports FEVER since Monday",
            "dry cough",
            "Suspected Infection of the left lung",
            "feverish and tired",
        ] {
            assert_eq!(classify_clinical_text(Some(text)).as_str(), INFECTION, "{text}");
        }
    }

    #[test]
    fn test_no_keywords() {
        let finding = classify_clinical_text(Some("Mild headache, otherwise well."));
        assert_eq!(finding.as_str(), NO_SIGNIFICANT_SYMPTOMS);
    }

    #[test]
    fn test_whitespace_only_is_classified() {
        // Only the empty string counts as absent.
        let finding = classify_clinical_text(Some("   "));
        assert_eq!(finding.as_str(), NO_SIGNIFICANT_SYMPTOMS);
    }
}
