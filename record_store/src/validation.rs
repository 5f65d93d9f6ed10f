//! Identifier validation
//!
//! Table names, aliases and column names are interpolated into SQL, quoted.
//! They are checked here before any statement is built.

use std::fmt;

/// PostgreSQL identifier length limit
pub const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Validation errors for database identifiers
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Name contains invalid characters (only alphanumeric and underscore allowed)
    InvalidCharacters(String),
    /// Name is too long
    TooLong { name: String, length: usize },
    /// Name is empty
    Empty,
    /// Name starts with invalid character (must start with letter or underscore)
    InvalidStartCharacter(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidCharacters(name) => {
                write!(f, "invalid characters in name '{}': only alphanumeric characters and underscores are allowed", name)
            }
            ValidationError::TooLong { name, length } => {
                write!(
                    f,
                    "name '{}' is too long: {} characters (max {})",
                    name, length, MAX_IDENTIFIER_LENGTH
                )
            }
            ValidationError::Empty => write!(f, "name cannot be empty"),
            ValidationError::InvalidStartCharacter(name) => {
                write!(f, "name '{}' must start with a letter or underscore", name)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Check that `name` is usable as a quoted SQL identifier.
pub fn validate_identifier(name: &str) -> Result<(), ValidationError> {
    let first_char = name.chars().next().ok_or(ValidationError::Empty)?;

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ValidationError::TooLong {
            name: name.to_string(),
            length: name.len(),
        });
    }

    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        return Err(ValidationError::InvalidStartCharacter(name.to_string()));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ValidationError::InvalidCharacters(name.to_string()));
    }

    Ok(())
}

pub fn is_identifier(name: &str) -> bool {
    validate_identifier(name).is_ok()
}

/// Double-quote a validated identifier.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name)
}

/// `"alias"."column"` for plain column names; anything else (expressions,
/// already qualified names) is passed through untouched.
pub fn qualify_column(alias: &str, column: &str) -> String {
    if is_identifier(column) {
        format!("{}.{}", quote_identifier(alias), quote_identifier(column))
    } else {
        column.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_identifiers() {
        assert!(validate_identifier("users").is_ok());
        assert!(validate_identifier("user_profiles").is_ok());
        assert!(validate_identifier("_private").is_ok());
        assert!(validate_identifier("key").is_ok());
    }

    #[test]
    fn rejects_malformed_identifiers() {
        assert_eq!(validate_identifier(""), Err(ValidationError::Empty));
        assert!(matches!(
            validate_identifier("123table"),
            Err(ValidationError::InvalidStartCharacter(_))
        ));
        assert!(matches!(
            validate_identifier("user-name"),
            Err(ValidationError::InvalidCharacters(_))
        ));
        assert!(matches!(
            validate_identifier("users; DROP TABLE users"),
            Err(ValidationError::InvalidCharacters(_))
        ));

        let long = "a".repeat(64);
        assert!(matches!(
            validate_identifier(&long),
            Err(ValidationError::TooLong { length: 64, .. })
        ));
        assert!(validate_identifier(&"a".repeat(63)).is_ok());
    }

    #[test]
    fn qualifies_only_plain_columns() {
        assert_eq!(qualify_column("tm", "name"), "\"tm\".\"name\"");
        assert_eq!(qualify_column("tm", "tm.name"), "tm.name");
        assert_eq!(qualify_column("tm", "lower(name)"), "lower(name)");
    }
}
