// ============================================
// File: crates/hashline-common/src/error.rs
// ============================================
//! # Common Error Types
//!
//! ## Creation Reason
//! Errors raised while decoding the identifiers shared by every hashline
//! crate. Higher crates wrap `CommonError` transparently.
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

/// Common result type for operations that may fail.
pub type Result<T> = std::result::Result<T, CommonError>;

/// Identifier decoding errors.
///
/// # Example
/// ```
/// use hashline_common::error::{CommonError, Result};
///
/// fn check_iv(data: &[u8]) -> Result<()> {
///     if data.len() != 16 {
///         return Err(CommonError::invalid_length("iv", 16, data.len()));
///     }
///     Ok(())
/// }
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    /// Invalid input data provided.
    #[error("Invalid input for '{field}': {reason}")]
    InvalidInput {
        /// Name of the field or parameter
        field: String,
        /// Description of what's wrong
        reason: String,
    },

    /// Data length doesn't match expected size.
    #[error("Invalid length for '{field}': expected {expected}, got {actual}")]
    InvalidLength {
        /// Name of the field being decoded
        field: &'static str,
        /// Expected length in bytes
        expected: usize,
        /// Actual length received
        actual: usize,
    },

    /// Text could not be decoded.
    #[error("Decoding error: {context}: {details}")]
    Decoding {
        /// What was being decoded
        context: String,
        /// Error details
        details: String,
    },
}

impl CommonError {
    /// Creates an `InvalidInput` error.
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `InvalidLength` error.
    #[must_use]
    pub const fn invalid_length(field: &'static str, expected: usize, actual: usize) -> Self {
        Self::InvalidLength {
            field,
            expected,
            actual,
        }
    }

    /// Creates a `Decoding` error.
    pub fn decoding(context: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Decoding {
            context: context.into(),
            details: details.into(),
        }
    }
}

impl From<hex::FromHexError> for CommonError {
    fn from(err: hex::FromHexError) -> Self {
        Self::decoding("hex", err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let msg = CommonError::invalid_length("line", 16, 8).to_string();
        assert!(msg.contains("line"));
        assert!(msg.contains("16"));
        assert!(msg.contains('8'));
    }

    #[test]
    fn test_hex_error_conversion() {
        let err: CommonError = hex::decode("zz").unwrap_err().into();
        assert_eq!(err, CommonError::decoding("hex", "Invalid character 'z' at position 0"));
    }
}
