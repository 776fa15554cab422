//! Join codes: 6 uppercase alphanumeric characters shared out-of-band (QR, text, verbally).

use crate::domain::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of characters in a join code.
pub const CODE_LENGTH: usize = 6;

/// Symbols a join code is drawn from (36 total).
pub const CODE_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// A validated join code. Construct with [`JoinCode::parse`] or [`JoinCode::from_user_input`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JoinCode(String);

impl JoinCode {
    /// Strict parse: exactly 6 characters, each in `A-Z0-9`.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let len = raw.chars().count();
        if len != CODE_LENGTH {
            return Err(DomainError::Validation(format!(
                "join code must be {} characters, got {}",
                CODE_LENGTH, len
            )));
        }
        if let Some(bad) = raw
            .chars()
            .find(|c| !c.is_ascii() || !CODE_ALPHABET.contains(&(*c as u8)))
        {
            return Err(DomainError::Validation(format!(
                "join code contains invalid character {:?}",
                bad
            )));
        }
        Ok(Self(raw.to_string()))
    }

    /// Lenient parse for typed input: trims whitespace and uppercases first.
    pub fn from_user_input(raw: &str) -> Result<Self, DomainError> {
        Self::parse(&raw.trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JoinCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for JoinCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<JoinCode> for String {
    fn from(code: JoinCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_uppercase_alphanumeric() {
        let code = JoinCode::parse("AB12CD").unwrap();
        assert_eq!(code.as_str(), "AB12CD");
        assert_eq!(code.to_string(), "AB12CD");
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert!(matches!(
            JoinCode::parse("ABC"),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            JoinCode::parse("ABCDEFG"),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(JoinCode::parse(""), Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_parse_rejects_lowercase_and_symbols() {
        assert!(JoinCode::parse("ab12cd").is_err());
        assert!(JoinCode::parse("AB-2CD").is_err());
        // Multi-byte characters never match the alphabet.
        assert!(JoinCode::parse("ÄB12C").is_err());
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let err = JoinCode::parse("ÄB12").unwrap_err().to_string();
        assert!(err.contains("got 4"), "{err}");

        // Six characters, seven bytes: reaches the alphabet check.
        let err = JoinCode::parse("ÄB12CD").unwrap_err().to_string();
        assert!(err.contains("invalid character 'Ä'"), "{err}");
    }

    #[test]
    fn test_from_user_input_normalizes() {
        let code = JoinCode::from_user_input("  ab12cd\n").unwrap();
        assert_eq!(code.as_str(), "AB12CD");
    }

    #[test]
    fn test_serde_rejects_invalid_code() {
        let ok: JoinCode = serde_json::from_str("\"ZZZZZZ\"").unwrap();
        assert_eq!(ok.as_str(), "ZZZZZZ");
        assert!(serde_json::from_str::<JoinCode>("\"zz\"").is_err());
    }
}
