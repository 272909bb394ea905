// ============================================
// File: crates/hashline-common/src/types.rs
// ============================================
//! # Core Type Definitions
//!
//! ## Creation Reason
//! Centralizes the identifiers that appear on the wire or key the line
//! registry, so every crate agrees on their size and text encoding.
//!
//! ## Main Functionality
//! - `LineIdentifier`: 16-byte random token naming one direction of a line
//! - `Hashname`: SHA-256 of a node's encoded identity public key
//! - `Path`: where an inbound packet arrived from
//!
//! ## Wire Encodings
//! Both identifiers travel as lowercase hex inside JSON packet headers:
//! a line identifier is always 32 hex characters, a hashname 64.
//!
//! ## ⚠️ Important Note for Next Developer
//! - LineIdentifier must come from a cryptographically secure source
//! - Any decoded length other than 16 bytes is a malformed packet
//! - Maintain backward-compatible serialization formats
//!
//! ## Last Modified
//! v0.1.0 - Initial type definitions

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CommonError;

// ============================================
// Constants
// ============================================

/// Size of a LineIdentifier in bytes.
pub const LINE_IDENTIFIER_SIZE: usize = 16;

/// Size of a Hashname in bytes.
pub const HASHNAME_SIZE: usize = 32;

// ============================================
// LineIdentifier
// ============================================

/// Opaque identifier for one direction of a line.
///
/// Each side of a line picks its own identifier and announces it in its
/// open packet. Packets are sent with the peer's identifier (outgoing) and
/// looked up by our own (incoming).
///
/// # Example
/// ```
/// use hashline_common::types::LineIdentifier;
///
/// let id = LineIdentifier::generate();
/// let hex = id.to_string();
/// assert_eq!(hex.len(), 32);
///
/// let parsed: LineIdentifier = hex.parse().unwrap();
/// assert_eq!(id, parsed);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineIdentifier([u8; LINE_IDENTIFIER_SIZE]);

impl LineIdentifier {
    /// Creates a `LineIdentifier` from raw bytes.
    ///
    /// # Errors
    /// Returns `InvalidLength` unless `bytes` is exactly 16 bytes long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CommonError> {
        let id: [u8; LINE_IDENTIFIER_SIZE] = bytes.try_into().map_err(|_| {
            CommonError::invalid_length("line", LINE_IDENTIFIER_SIZE, bytes.len())
        })?;
        Ok(Self(id))
    }

    /// Generates a new cryptographically random `LineIdentifier`.
    #[must_use]
    pub fn generate() -> Self {
        let mut id = [0u8; LINE_IDENTIFIER_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut id);
        Self(id)
    }

    /// Wraps an already-sized array.
    #[must_use]
    pub const fn from_array(bytes: [u8; LINE_IDENTIFIER_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; LINE_IDENTIFIER_SIZE] {
        &self.0
    }

    /// Returns the 32-character lowercase hex form used on the wire.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for LineIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LineIdentifier({:02x}{:02x}{:02x}{:02x}...)",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

impl fmt::Display for LineIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for LineIdentifier {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        Self::from_bytes(&bytes)
    }
}

impl AsRef<[u8]> for LineIdentifier {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for LineIdentifier {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for LineIdentifier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(serde::de::Error::custom)
        } else {
            let bytes = <Vec<u8>>::deserialize(deserializer)?;
            Self::from_bytes(&bytes)
                .map_err(|_| serde::de::Error::invalid_length(bytes.len(), &"16 bytes"))
        }
    }
}

// ============================================
// Hashname
// ============================================

/// A node's protocol identity: SHA-256 over its encoded identity public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hashname([u8; HASHNAME_SIZE]);

impl Hashname {
    /// Derives the hashname of an encoded identity public key.
    #[must_use]
    pub fn from_public_key(encoded: &[u8]) -> Self {
        Self(Sha256::digest(encoded).into())
    }

    /// Creates a `Hashname` from raw digest bytes.
    ///
    /// # Errors
    /// Returns `InvalidLength` unless `bytes` is exactly 32 bytes long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CommonError> {
        let digest: [u8; HASHNAME_SIZE] = bytes
            .try_into()
            .map_err(|_| CommonError::invalid_length("hashname", HASHNAME_SIZE, bytes.len()))?;
        Ok(Self(digest))
    }

    /// Returns the raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; HASHNAME_SIZE] {
        &self.0
    }

    /// Returns the 64-character lowercase hex form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Hashname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Hashname({:02x}{:02x}{:02x}{:02x}...)",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

impl fmt::Display for Hashname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Hashname {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        Self::from_bytes(&bytes)
    }
}

impl Serialize for Hashname {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hashname {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================
// Path
// ============================================

/// The network path an inbound packet arrived on.
///
/// Path management lives above this crate; the value is only carried
/// through so that replies can be addressed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Path {
    /// A UDP endpoint.
    Udp(SocketAddr),
    /// An in-process hop (tests and loopback demos).
    Local(String),
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Udp(addr) => write!(f, "udp:{addr}"),
            Self::Local(name) => write!(f, "local:{name}"),
        }
    }
}

impl From<SocketAddr> for Path {
    fn from(addr: SocketAddr) -> Self {
        Self::Udp(addr)
    }
}

// ============================================
// Tests
// ============================================
