//! Error types for the flow crate.
//!
//! Errors are designed for layered context using rootcause. Callers that
//! resolve inputs on behalf of a trigger add the trigger context themselves.

use crate::flow::InputType;
use std::fmt;

/// Errors from execution input resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// A required input has neither a value nor a default.
    MissingRequired { input: String },
    /// A value could not be coerced to the declared type.
    InvalidType {
        input: String,
        expected: InputType,
        reason: String,
    },
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRequired { input } => {
                write!(f, "missing required input '{input}'")
            }
            Self::InvalidType {
                input,
                expected,
                reason,
            } => {
                write!(f, "input '{input}' is not a valid {expected}: {reason}")
            }
        }
    }
}

impl std::error::Error for InputError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_required_display() {
        let err = InputError::MissingRequired {
            input: "region".to_string(),
        };
        assert_eq!(err.to_string(), "missing required input 'region'");
    }

    #[test]
    fn invalid_type_display() {
        let err = InputError::InvalidType {
            input: "count".to_string(),
            expected: InputType::Int,
            reason: "expected a number".to_string(),
        };
        assert!(err.to_string().contains("not a valid int"));
        assert!(err.to_string().contains("expected a number"));
    }
}
