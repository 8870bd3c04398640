//! Error definitions
//!
//! This module provides error types for testkit-compliance.
//!
//! Observation never surfaces these to the caller: a thenable whose `then`
//! fails is classified as non-compliant instead.

use thiserror::Error;

/// Main error type for testkit-compliance
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A thenable refused to register settlement handlers
    #[error("then() failed: {0}")]
    ThenFailed(String),

    /// A promise was rejected
    #[error("Promise rejected: {0}")]
    Rejected(String),
}

impl Error {
    /// Create a `then` failure error.
    #[must_use]
    pub fn then_failed(message: impl Into<String>) -> Self {
        Self::ThenFailed(message.into())
    }

    /// Create a rejection error.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::then_failed("boom").to_string(),
            "then() failed: boom"
        );
        assert_eq!(Error::rejected("nope").to_string(), "Promise rejected: nope");
    }

    #[test]
    fn test_every_variant_has_a_constructor() {
        let errors = [Error::then_failed("a"), Error::rejected("b")];
        for error in errors {
            match error {
                Error::ThenFailed(message) => assert_eq!(message, "a"),
                Error::Rejected(reason) => assert_eq!(reason, "b"),
            }
        }
    }
}
