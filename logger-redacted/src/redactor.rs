use base64::{engine::general_purpose, Engine as _};
use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};

lazy_static! {
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap();
    // Bare digit runs of medical-assistance identifier length
    static ref MA_NUMBER_REGEX: Regex = Regex::new(r"\b\d{8,12}\b").unwrap();
    static ref PHONE_REGEX: Regex =
        Regex::new(r"(?:\+1[-.\s]?)?\(?\b[0-9]{3}\)?[-.\s]?[0-9]{3}[-.\s][0-9]{4}\b").unwrap();
}

/// PII redaction configuration
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub redact_emails: bool,
    pub redact_phones: bool,
    pub redact_ma_numbers: bool,
    pub hash_for_correlation: bool,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            redact_emails: true,
            redact_phones: true,
            redact_ma_numbers: true,
            hash_for_correlation: true,
        }
    }
}

/// PII redactor for log messages
#[derive(Debug, Clone, Default)]
pub struct PiiRedactor {
    config: RedactionConfig,
}

impl PiiRedactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();

        if self.config.redact_emails {
            result = self.replace(&EMAIL_REGEX, &result, "EMAIL", "***@***");
        }

        // MA numbers first: an unformatted ten digit run is treated as an identifier
        if self.config.redact_ma_numbers {
            result = self.replace(&MA_NUMBER_REGEX, &result, "MA", "MA[REDACTED]");
        }

        if self.config.redact_phones {
            result = self.replace(&PHONE_REGEX, &result, "PHONE", "(***) ***-****");
        }

        result
    }

    fn replace(&self, pattern: &Regex, text: &str, tag: &str, mask: &str) -> String {
        pattern
            .replace_all(text, |caps: &regex::Captures| {
                if self.config.hash_for_correlation {
                    format!("{}[{}]", tag, Self::hash_value(&caps[0]))
                } else {
                    mask.to_string()
                }
            })
            .to_string()
    }

    fn hash_value(value: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(value.as_bytes());
        let result = hasher.finalize();
        general_purpose::STANDARD_NO_PAD.encode(&result[..6])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn masking_redactor() -> PiiRedactor {
        PiiRedactor::new(RedactionConfig {
            hash_for_correlation: false,
            ..Default::default()
        })
    }

    #[test]
    fn test_email_redaction() {
        let redacted = masking_redactor().redact("Contact billing@clinic.example.org today");
        assert_eq!(redacted, "Contact ***@*** today");
    }

    #[test]
    fn test_phone_redaction() {
        let redacted = masking_redactor().redact("Provider line (555) 123-4567");
        assert!(redacted.contains("(***) ***-****"));
        assert!(!redacted.contains("123-4567"));
    }

    #[test]
    fn test_ma_number_redaction() {
        let redacted = masking_redactor().redact("searchTerm=100234567890");
        assert_eq!(redacted, "searchTerm=MA[REDACTED]");
    }

    #[test]
    fn test_short_numbers_are_kept() {
        let redacted = masking_redactor().redact("page 2 of 15, 10 per page");
        assert_eq!(redacted, "page 2 of 15, 10 per page");
    }

    #[test]
    fn test_hash_is_stable_for_correlation() {
        let redactor = PiiRedactor::default();
        let first = redactor.redact("recipient 123456789");
        let second = redactor.redact("recipient 123456789");
        assert_eq!(first, second);
        assert!(first.starts_with("recipient MA["));
        assert!(!first.contains("123456789"));
    }
}
