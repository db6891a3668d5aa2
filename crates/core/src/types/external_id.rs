//! Opaque identifiers of entities owned by other subsystems.
//!
//! Categories, suppliers, pets, product variants and customers live outside
//! the rule engine. Rules only hold their identifiers, which arrive as strings
//! from the admin UI.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`ExternalId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ExternalIdError {
    /// The input is empty or only whitespace.
    #[error("identifier cannot be empty")]
    Empty,
    /// The input is too long.
    #[error("identifier must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains control characters.
    #[error("identifier cannot contain control characters")]
    ControlCharacter,
}

/// Identifier of a target (category, supplier, pet, variant) or a customer.
///
/// Surrounding whitespace is trimmed on parse, so `" cat-1 "` and `"cat-1"`
/// are the same identifier.
///
/// ```
/// use petshop_core::ExternalId;
///
/// assert_eq!(ExternalId::parse(" cat-1 ").unwrap().as_str(), "cat-1");
/// assert!(ExternalId::parse("   ").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct ExternalId(String);

impl ExternalId {
    /// Maximum length of an identifier.
    pub const MAX_LENGTH: usize = 128;

    /// Parse an `ExternalId` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, longer than
    /// [`Self::MAX_LENGTH`], or contains control characters.
    pub fn parse(s: &str) -> Result<Self, ExternalIdError> {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(ExternalIdError::Empty);
        }

        if trimmed.chars().count() > Self::MAX_LENGTH {
            return Err(ExternalIdError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if trimmed.chars().any(char::is_control) {
            return Err(ExternalIdError::ControlCharacter);
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `ExternalId` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ExternalId {
    type Err = ExternalIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for ExternalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_whitespace() {
        let id = ExternalId::parse("  variant-42\t").unwrap();
        assert_eq!(id.as_str(), "variant-42");
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(ExternalId::parse(""), Err(ExternalIdError::Empty));
        assert_eq!(ExternalId::parse(" \n "), Err(ExternalIdError::Empty));
    }

    #[test]
    fn test_parse_too_long() {
        let long = "x".repeat(ExternalId::MAX_LENGTH + 1);
        assert_eq!(
            ExternalId::parse(&long),
            Err(ExternalIdError::TooLong {
                max: ExternalId::MAX_LENGTH
            })
        );
        assert!(ExternalId::parse(&"x".repeat(ExternalId::MAX_LENGTH)).is_ok());
    }

    #[test]
    fn test_parse_control_character() {
        assert_eq!(
            ExternalId::parse("cat\u{0}1"),
            Err(ExternalIdError::ControlCharacter)
        );
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        let a = ExternalId::parse("a").unwrap();
        let b = ExternalId::parse("b").unwrap();
        assert!(a < b);
    }
}
