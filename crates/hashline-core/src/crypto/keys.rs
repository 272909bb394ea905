// ============================================
// File: crates/hashline-core/src/crypto/keys.rs
// ============================================
//! # Cryptographic Key Types
//!
//! ## Creation Reason
//! Defines the key types exchanged between cipher suites, the handshake and
//! the line codec, with proper security properties (Zeroize on drop,
//! constant-time comparison, redacted Debug).
//!
//! ## Main Functionality
//! - `SuiteId`: Which algorithm family a key belongs to
//! - `HashnamePublicKey` / `HashnamePrivateKey` / `IdentityKeyPair`:
//!   long-term identity keys
//! - `LinePublicKey` / `LinePrivateKey` / `LineKeyPair`: per-handshake keys
//! - `SymmetricKey`: Derived AES-256 key
//! - `Iv`: 16-byte stream cipher IV
//!
//! ## Key Lifecycle
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  IdentityKeyPair (Long-term)                               │
//! │  ├─ Generated once, persisted outside this crate           │
//! │  ├─ Signs inner open packets, unwraps open parameters      │
//! │  └─ Hashname = SHA-256(public key encoding)                │
//! │                                                            │
//! │  LineKeyPair (Per-handshake)                               │
//! │  ├─ Generated fresh during pre-render                      │
//! │  ├─ Private half consumed by line promotion                │
//! │  └─ Never reused across handshakes                         │
//! │                                                            │
//! │  SymmetricKey (Per-line, per-direction)                    │
//! │  ├─ Derived from DH(line keys) + both line identifiers     │
//! │  └─ Discarded with the line                                │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Encoding
//! Key types hold their suite's canonical byte encoding; the suite that
//! produced them is the only one that interprets the bytes. Decoding
//! through a suite validates length and curve membership.
//!
//! ## ⚠️ Important Note for Next Developer
//! - ALL private key types MUST zeroize on drop
//! - Private keys should NEVER be logged or serialized carelessly
//! - Use constant-time comparison for symmetric key equality
//!
//! ## Last Modified
//! v0.1.0 - Initial key type definitions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use hashline_common::types::Hashname;

use super::{IV_SIZE, SYMMETRIC_KEY_SIZE};
use crate::error::{CoreError, Result};

// ============================================
// SuiteId
// ============================================

/// Identifier of a cipher suite, carried as `cs` in open packet headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SuiteId {
    /// Ed25519 signatures, X25519 agreement.
    #[serde(rename = "c25519")]
    C25519,
    /// NIST P-256 ECDSA signatures and ECDH agreement.
    #[serde(rename = "p256")]
    P256,
}

impl SuiteId {
    /// Every suite this build supports.
    pub const ALL: [Self; 2] = [Self::C25519, Self::P256];

    /// Returns the wire tag.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::C25519 => "c25519",
            Self::P256 => "p256",
        }
    }
}

impl fmt::Display for SuiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for SuiteId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|id| id.tag() == s)
            .ok_or_else(|| CoreError::UnsupportedSuite(s.to_string()))
    }
}

// ============================================
// Hashname Keys (Long-term)
// ============================================

/// Public half of a node's long-term identity.
///
/// Safe to share publicly. Obtain one through
/// [`CipherSuite::decode_public_key`](super::CipherSuite::decode_public_key)
/// so the encoding is validated.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct HashnamePublicKey {
    suite: SuiteId,
    bytes: Vec<u8>,
}

impl HashnamePublicKey {
    pub(crate) fn new(suite: SuiteId, bytes: Vec<u8>) -> Self {
        Self { suite, bytes }
    }

    /// Returns the suite this key belongs to.
    #[must_use]
    pub const fn suite(&self) -> SuiteId {
        self.suite
    }

    /// Returns the canonical encoding.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the hex form of the canonical encoding.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Derives the hashname identifying this key's owner.
    #[must_use]
    pub fn hashname(&self) -> Hashname {
        Hashname::from_public_key(&self.bytes)
    }
}

impl fmt::Debug for HashnamePublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashnamePublicKey")
            .field("suite", &self.suite)
            .field("hashname", &self.hashname())
            .finish()
    }
}

/// Private half of a node's long-term identity.
pub struct HashnamePrivateKey {
    suite: SuiteId,
    bytes: Zeroizing<Vec<u8>>,
}

impl HashnamePrivateKey {
    pub(crate) fn new(suite: SuiteId, bytes: Zeroizing<Vec<u8>>) -> Self {
        Self { suite, bytes }
    }

    /// Returns the suite this key belongs to.
    #[must_use]
    pub const fn suite(&self) -> SuiteId {
        self.suite
    }

    /// Returns the canonical encoding.
    ///
    /// # Security Warning
    /// Handle the returned bytes with extreme care. They should be
    /// encrypted before storage and never logged.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for HashnamePrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print private key material
        write!(f, "HashnamePrivateKey({}, [REDACTED])", self.suite)
    }
}

/// Long-term identity key pair.
///
/// # Example
/// ```
/// use hashline_core::crypto::{suite, OsRandom, SuiteId};
///
/// let suite = suite::for_id(SuiteId::C25519);
/// let identity = suite.generate_identity(&OsRandom).unwrap();
/// assert_eq!(identity.hashname().to_hex().len(), 64);
/// ```
#[derive(Debug)]
pub struct IdentityKeyPair {
    public: HashnamePublicKey,
    private: HashnamePrivateKey,
}

impl IdentityKeyPair {
    /// Assembles a key pair from previously decoded halves.
    ///
    /// # Errors
    /// Returns `Decode` if the halves belong to different suites or the
    /// public key is not the one derived from the private key.
    pub fn new(public: HashnamePublicKey, private: HashnamePrivateKey) -> Result<Self> {
        if public.suite != private.suite {
            return Err(CoreError::decode(format!(
                "identity key suite mismatch: public {}, private {}",
                public.suite, private.suite
            )));
        }
        let derived = super::suite::for_id(private.suite).derive_public_key(&private)?;
        if derived != public {
            return Err(CoreError::decode(format!(
                "{} identity public key does not belong to the private key",
                public.suite
            )));
        }
        Ok(Self { public, private })
    }

    /// Returns the public half.
    #[must_use]
    pub const fn public(&self) -> &HashnamePublicKey {
        &self.public
    }

    /// Returns the private half.
    #[must_use]
    pub const fn private(&self) -> &HashnamePrivateKey {
        &self.private
    }

    /// Returns the suite of both halves.
    #[must_use]
    pub const fn suite(&self) -> SuiteId {
        self.public.suite
    }

    /// Returns this identity's hashname.
    #[must_use]
    pub fn hashname(&self) -> Hashname {
        self.public.hashname()
    }
}

// ============================================
// Line Keys (Per-handshake)
// ============================================

/// Public half of an ephemeral line key pair.
#[derive(Clone, PartialEq, Eq)]
pub struct LinePublicKey {
    suite: SuiteId,
    bytes: Vec<u8>,
}

impl LinePublicKey {
    pub(crate) fn new(suite: SuiteId, bytes: Vec<u8>) -> Self {
        Self { suite, bytes }
    }

    /// Returns the suite this key belongs to.
    #[must_use]
    pub const fn suite(&self) -> SuiteId {
        self.suite
    }

    /// Returns the canonical encoding.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for LinePublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = hex::encode(&self.bytes).chars().take(8).collect();
        write!(f, "LinePublicKey({}, {prefix}...)", self.suite)
    }
}

/// Private half of an ephemeral line key pair.
pub struct LinePrivateKey {
    suite: SuiteId,
    bytes: Zeroizing<Vec<u8>>,
}

impl LinePrivateKey {
    pub(crate) fn new(suite: SuiteId, bytes: Zeroizing<Vec<u8>>) -> Self {
        Self { suite, bytes }
    }

    /// Returns the suite this key belongs to.
    #[must_use]
    pub const fn suite(&self) -> SuiteId {
        self.suite
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for LinePrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LinePrivateKey({}, [REDACTED])", self.suite)
    }
}

/// Ephemeral key pair generated for exactly one handshake.
///
/// # Single Use
/// The private half can only be taken out by value
/// ([`into_private`](Self::into_private)), so the key agreement that
/// promotes a line consumes it.
#[derive(Debug)]
pub struct LineKeyPair {
    public: LinePublicKey,
    private: LinePrivateKey,
}

impl LineKeyPair {
    /// Assembles a key pair from previously decoded halves.
    ///
    /// # Errors
    /// Returns `Decode` if the halves belong to different suites.
    pub fn new(public: LinePublicKey, private: LinePrivateKey) -> Result<Self> {
        if public.suite != private.suite {
            return Err(CoreError::decode(format!(
                "line key suite mismatch: public {}, private {}",
                public.suite, private.suite
            )));
        }
        Ok(Self { public, private })
    }

    /// Returns the public half.
    #[must_use]
    pub const fn public(&self) -> &LinePublicKey {
        &self.public
    }

    /// Consumes the pair, returning the private half.
    #[must_use]
    pub fn into_private(self) -> LinePrivateKey {
        self.private
    }

    pub(crate) const fn private(&self) -> &LinePrivateKey {
        &self.private
    }
}

// ============================================
// SymmetricKey
// ============================================

/// Symmetric key for AES-256-CTR.
///
/// # Security
/// - Zeroed on drop
/// - Never logged or serialized
/// - Constant-time comparison
///
/// # Derivation
/// ```text
/// key = HKDF-SHA256(
///     ikm:  shared_secret,
///     salt: "hashline-v1",
///     info: label [|| line identifiers]
/// )
/// ```
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; SYMMETRIC_KEY_SIZE]);

impl SymmetricKey {
    /// Creates a key from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; SYMMETRIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns the raw key bytes.
    ///
    /// # Security Warning
    /// Do not log or store the key material in unprotected storage.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material
        write!(f, "SymmetricKey([REDACTED])")
    }
}

impl PartialEq for SymmetricKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for SymmetricKey {}

// ============================================
// Iv
// ============================================

/// Initialization vector for the stream cipher; always 16 bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Iv([u8; IV_SIZE]);

impl Iv {
    /// Wraps an already-sized array.
    #[must_use]
    pub const fn from_array(bytes: [u8; IV_SIZE]) -> Self {
        Self(bytes)
    }

    /// Creates an IV from a decoded header field.
    ///
    /// # Errors
    /// Returns `MalformedPacket` unless `bytes` is exactly 16 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let iv: [u8; IV_SIZE] = bytes.try_into().map_err(|_| {
            CoreError::malformed(format!("iv must be {IV_SIZE} bytes, got {}", bytes.len()))
        })?;
        Ok(Self(iv))
    }

    /// Parses the 32-character hex form used in packet headers.
    ///
    /// # Errors
    /// Returns `MalformedPacket` on bad hex or wrong length.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| CoreError::malformed(format!("iv: {e}")))?;
        Self::from_bytes(&bytes)
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; IV_SIZE] {
        &self.0
    }

    /// Returns the 32-character lowercase hex form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Iv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Iv({})", self.to_hex())
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::random::OsRandom;

    #[test]
    fn test_suite_id_tags() {
        assert_eq!("c25519".parse::<SuiteId>().unwrap(), SuiteId::C25519);
        assert_eq!("p256".parse::<SuiteId>().unwrap(), SuiteId::P256);
        assert!(matches!(
            "rsa2048".parse::<SuiteId>(),
            Err(CoreError::UnsupportedSuite(tag)) if tag == "rsa2048"
        ));
        assert_eq!(serde_json::to_string(&SuiteId::P256).unwrap(), "\"p256\"");
    }

    #[test]
    fn test_identity_pair_rejects_mixed_suites() {
        let public = HashnamePublicKey::new(SuiteId::C25519, vec![0u8; 64]);
        let private = HashnamePrivateKey::new(SuiteId::P256, Zeroizing::new(vec![1u8; 32]));
        assert!(matches!(
            IdentityKeyPair::new(public, private),
            Err(CoreError::Decode { .. })
        ));
    }

    #[test]
    fn test_identity_pair_rejects_foreign_public_key() {
        for suite_id in SuiteId::ALL {
            let suite = crate::crypto::suite::for_id(suite_id);
            let ours = suite.generate_identity(&OsRandom).unwrap();
            let theirs = suite.generate_identity(&OsRandom).unwrap();
            let private = || suite.decode_private_key(ours.private().as_bytes()).unwrap();

            let restored = IdentityKeyPair::new(ours.public().clone(), private()).unwrap();
            assert_eq!(restored.hashname(), ours.hashname());

            assert!(matches!(
                IdentityKeyPair::new(theirs.public().clone(), private()),
                Err(CoreError::Decode { .. })
            ));
        }
    }

    #[test]
    fn test_private_keys_are_redacted() {
        let private = HashnamePrivateKey::new(SuiteId::C25519, Zeroizing::new(vec![0xAB; 64]));
        let debug = format!("{private:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("abab"));

        let key = SymmetricKey::from_bytes([0x42; 32]);
        assert_eq!(format!("{key:?}"), "SymmetricKey([REDACTED])");
    }

    #[test]
    fn test_symmetric_key_equality() {
        let a = SymmetricKey::from_bytes([7; 32]);
        let b = SymmetricKey::from_bytes([7; 32]);
        let c = SymmetricKey::from_bytes([8; 32]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_iv_length_is_enforced() {
        assert!(Iv::from_bytes(&[0u8; 16]).is_ok());
        assert!(matches!(
            Iv::from_bytes(&[0u8; 12]),
            Err(CoreError::MalformedPacket { .. })
        ));
        assert!(matches!(
            Iv::from_hex(&"00".repeat(17)),
            Err(CoreError::MalformedPacket { .. })
        ));
        assert!(Iv::from_hex("zz").is_err());

        let iv = Iv::from_array([0x5a; 16]);
        assert_eq!(Iv::from_hex(&iv.to_hex()).unwrap(), iv);
    }
}
