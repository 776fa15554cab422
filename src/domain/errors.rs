//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    /// Malformed input: blank name, malformed join code.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// No record for the given code or id.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Join code already taken by another group.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Code generator could not find a free code within the retry budget.
    #[error("No free join code after {attempts} attempts")]
    CodeExhaustion { attempts: u32 },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Subscription error: {0}")]
    Subscription(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("UI error: {0}")]
    Ui(String),
}

impl DomainError {
    /// True for errors caused by the caller's input or by missing records,
    /// as opposed to infrastructure failures.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            DomainError::Validation(_)
                | DomainError::NotFound(_)
                | DomainError::Conflict(_)
                | DomainError::CodeExhaustion { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_classification() {
        assert!(DomainError::Validation("blank".into()).is_user_facing());
        assert!(DomainError::CodeExhaustion { attempts: 3 }.is_user_facing());
        assert!(!DomainError::Store("disk full".into()).is_user_facing());
    }

    #[test]
    fn test_exhaustion_message() {
        let e = DomainError::CodeExhaustion { attempts: 10 };
        assert_eq!(e.to_string(), "No free join code after 10 attempts");
    }
}
