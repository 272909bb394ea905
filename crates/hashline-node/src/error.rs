// ============================================
// File: crates/hashline-node/src/error.rs
// ============================================
//! # Node Error Types
//!
//! ## Last Modified
//! v0.1.0 - Initial node errors

use thiserror::Error;

use hashline_common::error::CommonError;
use hashline_common::types::{Hashname, LineIdentifier};
use hashline_core::error::CoreError;

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, NodeError>;

/// Node error types.
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Failed to load configuration from '{path}': {reason}")]
    ConfigLoad {
        path: String,
        reason: String,
    },

    #[error("Invalid configuration: {field} - {reason}")]
    ConfigInvalid {
        field: String,
        reason: String,
    },

    #[error("Line limit reached: max {limit} lines")]
    LineLimitReached {
        limit: usize,
    },

    #[error("Line already registered: {0}")]
    LineExists(LineIdentifier),

    #[error("No line to peer {0}")]
    NoLineToPeer(Hashname),

    #[error(transparent)]
    Common(#[from] CommonError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl NodeError {
    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn config_invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigLoad { .. } | Self::ConfigInvalid { .. })
    }

    #[must_use]
    pub const fn is_line_error(&self) -> bool {
        matches!(
            self,
            Self::LineLimitReached { .. }
                | Self::LineExists(_)
                | Self::NoLineToPeer(_)
                | Self::Core(CoreError::UnknownLine { .. })
        )
    }

    /// Returns `true` if the error only concerns one inbound datagram,
    /// which is dropped while every line stays up.
    #[must_use]
    pub const fn is_packet_local(&self) -> bool {
        matches!(self, Self::Core(_))
    }

    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::ConfigLoad { .. } | Self::ConfigInvalid { .. })
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::LineLimitReached { .. } | Self::NoLineToPeer(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NodeError::config_load("/etc/hashline.toml", "file not found");
        assert!(err.to_string().contains("/etc/hashline.toml"));
    }

    #[test]
    fn test_error_classification() {
        let config_err = NodeError::config_invalid("lines.max_lines", "must be > 0");
        assert!(config_err.is_config_error());
        assert!(config_err.is_fatal());

        let unknown = NodeError::from(CoreError::unknown_line(LineIdentifier::from_array([1; 16])));
        assert!(unknown.is_line_error());
        assert!(unknown.is_packet_local());
        assert!(!unknown.is_fatal());

        assert!(NodeError::LineLimitReached { limit: 1 }.is_retryable());
    }
}
