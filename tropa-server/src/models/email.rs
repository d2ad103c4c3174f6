//! Email address validation
//!
//! Deliberately loose: one `@`, non-empty local part, a dot in the
//! domain. The database UNIQUE constraint is the real gatekeeper;
//! this just rejects obvious typos before they reach SQL.

use once_cell::sync::Lazy;
use regex::Regex;

use super::ValidationError;

/// Maximum length for email addresses
const MAX_EMAIL_LEN: usize = 254;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("invalid email regex")
});

/// Validated, lowercased email address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Email(String);

impl Email {
    /// Create a new email, validating format and normalizing to lowercase.
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ValidationError::Empty { field: "email" });
        }

        if s.len() > MAX_EMAIL_LEN {
            return Err(ValidationError::TooLong {
                field: "email",
                max: MAX_EMAIL_LEN,
            });
        }

        if !EMAIL_RE.is_match(s) {
            return Err(ValidationError::InvalidFormat {
                field: "email",
                reason: "must look like usuario@dominio.tld",
            });
        }

        Ok(Self(s.to_ascii_lowercase()))
    }

    /// Get the email as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_emails() {
        assert!(Email::new("familia@example.org").is_ok());
        assert!(Email::new("jefe.tropa+scouts@gmail.com").is_ok());
    }

    #[test]
    fn normalizes_case_and_whitespace() {
        let email = Email::new("  Jefa@Example.ORG ").unwrap();
        assert_eq!(email.as_str(), "jefa@example.org");
    }

    #[test]
    fn rejects_missing_at() {
        let err = Email::new("no-arroba.example.org").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidFormat { .. }));
    }

    #[test]
    fn rejects_missing_tld() {
        let err = Email::new("alguien@localhost").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidFormat { .. }));
    }

    #[test]
    fn rejects_empty() {
        let err = Email::new("   ").unwrap_err();
        assert!(matches!(err, ValidationError::Empty { .. }));
    }

    #[test]
    fn rejects_overlong() {
        let long = format!("{}@example.org", "a".repeat(250));
        let err = Email::new(&long).unwrap_err();
        assert!(matches!(err, ValidationError::TooLong { .. }));
    }
}
