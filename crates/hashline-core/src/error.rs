// ============================================
// File: crates/hashline-core/src/error.rs
// ============================================
//! # Core Error Types
//!
//! ## Creation Reason
//! Defines the error taxonomy for cipher suites, the open-packet
//! handshake and the line-packet codec.
//!
//! ## Main Functionality
//! - `CoreError`: Primary error enum for core operations
//! - Convenience constructors and classification helpers
//!
//! ## Error Categories
//! 1. **Packet Errors**: malformed framing or headers, unknown line,
//!    unknown packet type
//! 2. **Crypto Errors**: structural asymmetric/symmetric failures, key
//!    decoding, entropy failures
//! 3. **Trust Errors**: signature, destination, line-id or freshness
//!    checks rejected an open packet
//!
//! ## Propagation
//! Errors raised while parsing one inbound packet only drop that packet.
//! They never invalidate an existing line.
//!
//! ## ⚠️ Important Note for Next Developer
//! - NEVER include key material in error messages
//! - A failure after unwrap but before verify MUST surface as
//!   `Verification`, never as a partially trusted result
//! - All errors should be loggable without leaking secrets
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use hashline_common::error::CommonError;
use hashline_common::types::LineIdentifier;

// ============================================
// Result Type Alias
// ============================================

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

// ============================================
// CoreError
// ============================================

/// Core error types for handshake and transport operations.
///
/// # Security Note
/// Error messages are designed to be informative for debugging
/// without revealing sensitive information like key material.
#[derive(Error, Debug)]
pub enum CoreError {
    // ========================================
    // Packet Errors
    // ========================================

    /// A header field is missing or invalid, or a buffer has the wrong length.
    #[error("Malformed packet: {reason}")]
    MalformedPacket {
        /// What's wrong with the packet
        reason: String,
    },

    /// No line is registered for the declared incoming identifier.
    #[error("Unknown line: {line}")]
    UnknownLine {
        /// The identifier the packet declared
        line: LineIdentifier,
    },

    /// No parser is registered for the packet's `type` tag.
    #[error("Unknown packet type: {0:?}")]
    UnknownPacketType(String),

    /// The cipher suite tag is not one this node supports.
    #[error("Unsupported cipher suite: {0:?}")]
    UnsupportedSuite(String),

    // ========================================
    // Cryptographic Errors
    // ========================================

    /// An asymmetric or symmetric operation failed structurally.
    #[error("Cryptographic operation failed: {context}")]
    Crypto {
        /// Which operation failed
        context: String,
    },

    /// Key bytes could not be decoded.
    #[error("Key decoding failed: {what}")]
    Decode {
        /// Which key and why
        what: String,
    },

    /// The random source could not produce bytes.
    #[error("Entropy source failure: {reason}")]
    Entropy {
        /// Why the source failed
        reason: String,
    },

    // ========================================
    // Trust Errors
    // ========================================

    /// An open packet failed authentication or freshness checks.
    #[error("Open packet verification failed: {reason}")]
    Verification {
        /// Which check rejected the packet
        reason: String,
    },

    // ========================================
    // Wrapped Errors
    // ========================================

    /// Error from common crate.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl CoreError {
    // ========================================
    // Convenience Constructors
    // ========================================

    /// Creates a `MalformedPacket` error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPacket {
            reason: reason.into(),
        }
    }

    /// Creates an `UnknownLine` error.
    #[must_use]
    pub const fn unknown_line(line: LineIdentifier) -> Self {
        Self::UnknownLine { line }
    }

    /// Creates a `Crypto` error.
    pub fn crypto(context: impl Into<String>) -> Self {
        Self::Crypto {
            context: context.into(),
        }
    }

    /// Creates a `Decode` error.
    pub fn decode(what: impl Into<String>) -> Self {
        Self::Decode { what: what.into() }
    }

    /// Creates an `Entropy` error.
    pub fn entropy(reason: impl Into<String>) -> Self {
        Self::Entropy {
            reason: reason.into(),
        }
    }

    /// Creates a `Verification` error.
    pub fn verification(reason: impl Into<String>) -> Self {
        Self::Verification {
            reason: reason.into(),
        }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns `true` if this is a cryptographic error.
    #[must_use]
    pub const fn is_crypto_error(&self) -> bool {
        matches!(
            self,
            Self::Crypto { .. } | Self::Decode { .. } | Self::Entropy { .. } | Self::Verification { .. }
        )
    }

    /// Returns `true` if this is a packet-level protocol error.
    ///
    /// Protocol errors indicate malformed, stale-line or unroutable packets.
    #[must_use]
    pub const fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedPacket { .. }
                | Self::UnknownLine { .. }
                | Self::UnknownPacketType(_)
                | Self::UnsupportedSuite(_)
        )
    }

    /// Returns `true` if this error might indicate an attack.
    ///
    /// These errors warrant logging at `warn`.
    #[must_use]
    pub const fn is_suspicious(&self) -> bool {
        matches!(self, Self::Verification { .. })
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::malformed("iv must be 16 bytes");
        assert!(err.to_string().contains("iv must be 16 bytes"));

        let line = LineIdentifier::from_array([0x11; 16]);
        let err = CoreError::unknown_line(line);
        assert!(err.to_string().contains(&"11".repeat(16)));
    }

    #[test]
    fn test_error_classification() {
        let verification = CoreError::verification("signature mismatch");
        assert!(verification.is_crypto_error());
        assert!(verification.is_suspicious());
        assert!(!verification.is_protocol_error());

        let unknown = CoreError::unknown_line(LineIdentifier::generate());
        assert!(unknown.is_protocol_error());
        assert!(!unknown.is_suspicious());

        assert!(CoreError::UnknownPacketType("ping".into()).is_protocol_error());
        assert!(CoreError::entropy("os rng unavailable").is_crypto_error());
    }

    #[test]
    fn test_common_error_conversion() {
        let common = CommonError::invalid_input("field", "bad value");
        let core: CoreError = common.into();
        assert!(matches!(core, CoreError::Common(_)));
    }
}
