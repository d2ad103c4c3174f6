//! Page slug validation
//!
//! Slug format: lowercase alphanumeric with hyphens/underscores.
//! Matches the UNIQUE `paginas.slug` column.

use once_cell::sync::Lazy;
use regex::Regex;

use super::ValidationError;

/// Maximum length for page slugs
const MAX_SLUG_LEN: usize = 80;

/// Starts with alphanumeric, allows hyphens/underscores after.
static SLUG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9_-]{0,79}$").expect("invalid slug regex")
});

/// Validated page slug
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageSlug(String);

impl PageSlug {
    /// Create a new slug, validating format.
    ///
    /// # Rules
    /// - Max 80 characters
    /// - Lowercase alphanumeric, hyphens, underscores
    /// - Must start with alphanumeric
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        if s.is_empty() {
            return Err(ValidationError::Empty { field: "slug" });
        }

        if s.len() > MAX_SLUG_LEN {
            return Err(ValidationError::TooLong {
                field: "slug",
                max: MAX_SLUG_LEN,
            });
        }

        if !SLUG_RE.is_match(s) {
            return Err(ValidationError::InvalidFormat {
                field: "slug",
                reason: "must be lowercase alphanumeric with hyphens/underscores, starting with alphanumeric",
            });
        }

        Ok(Self(s.to_owned()))
    }

    /// Derive a slug from a free-form title.
    pub fn from_title(title: &str) -> Result<Self, ValidationError> {
        Self::new(&tropa_core::slugify(title))
    }

    /// Get the slug as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for PageSlug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_slugs() {
        assert!(PageSlug::new("quienes-somos").is_ok());
        assert!(PageSlug::new("campamento_2026").is_ok());
        assert!(PageSlug::new("a").is_ok());
    }

    #[test]
    fn rejects_uppercase() {
        let err = PageSlug::new("QuienesSomos").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidFormat { .. }));
    }

    #[test]
    fn rejects_spaces_and_accents() {
        assert!(PageSlug::new("quienes somos").is_err());
        assert!(PageSlug::new("sección").is_err());
    }

    #[test]
    fn rejects_dash_start() {
        let err = PageSlug::new("-inicio").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidFormat { .. }));
    }

    #[test]
    fn rejects_empty() {
        let err = PageSlug::new("").unwrap_err();
        assert!(matches!(err, ValidationError::Empty { .. }));
    }

    #[test]
    fn from_title_slugifies() {
        let slug = PageSlug::from_title("Campamento de Montaña 2026").unwrap();
        assert_eq!(slug.as_str(), "campamento-de-montana-2026");
    }

    #[test]
    fn max_length() {
        let slug_80 = "a".repeat(80);
        assert!(PageSlug::new(&slug_80).is_ok());

        let slug_81 = "a".repeat(81);
        let err = PageSlug::new(&slug_81).unwrap_err();
        assert!(matches!(err, ValidationError::TooLong { max: 80, .. }));
    }
}
