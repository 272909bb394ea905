// ============================================
// File: crates/hashline-core/src/crypto/suite/mod.rs
// ============================================
//! # Cipher Suites
//!
//! ## Creation Reason
//! A cipher suite bundles one algorithm family (identity keys, line keys,
//! symmetric cipher) behind a single contract, so the handshake and line
//! codec can be selected per peer at run time by the `cs` tag.
//!
//! ## Main Functionality
//! - `CipherSuite`: The contract (key generation, decoding, the four
//!   handshake operations, line key derivation)
//! - [`for_id`] / [`for_id_with_window`]: Suite construction by identifier
//! - `C25519Suite` (`c25519`): Ed25519 + X25519
//! - `P256Suite` (`p256`): NIST P-256 ECDSA + ECDH
//!
//! ## Handshake Operations
//! ```text
//! sender:   OutgoingOpen ─pre_render─► PreRenderedOpen ─render─► bytes
//! receiver: bytes ─unwrap─► UnwrappedOpenPacket ─verify─► OpenPacket
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Suites are stateless apart from configuration; share them via `Arc`
//! - All randomness enters through the `RandomSource` argument
//! - Adding a suite means adding a `SuiteId` variant and a primitives
//!   type; the handshake construction in `standard` is shared
//!
//! ## Last Modified
//! v0.1.0 - Initial cipher suite contract

mod curve25519;
mod nistp256;
mod standard;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use hashline_common::time::{Timestamp, DEFAULT_OPEN_WINDOW};
use hashline_common::types::{Hashname, LineIdentifier, Path};

use crate::crypto::cipher::SymmetricCipher;
use crate::crypto::keys::{
    HashnamePrivateKey, HashnamePublicKey, IdentityKeyPair, Iv, LineKeyPair, LinePrivateKey,
    LinePublicKey, SuiteId, SymmetricKey,
};
use crate::crypto::random::RandomSource;
use crate::error::Result;
use crate::protocol::open::{OpenPacket, OutgoingOpen, PreRenderedOpen, UnwrappedOpenPacket};

pub use standard::StandardSuite;

/// Cipher suite using Ed25519 and X25519.
pub type C25519Suite = StandardSuite<curve25519::Curve25519>;

/// Cipher suite using NIST P-256.
pub type P256Suite = StandardSuite<nistp256::NistP256>;

// ============================================
// CipherSuite Trait
// ============================================

/// The capability bundle of one algorithm family.
///
/// # Purpose
/// Abstracts key handling and the open-packet handshake so that:
/// - Peers can negotiate suites by tag
/// - Tests can drive every suite through the same assertions
pub trait CipherSuite: Send + Sync + fmt::Debug {
    /// Returns the suite identifier.
    fn id(&self) -> SuiteId;

    /// Returns the symmetric cipher lines of this suite use.
    fn symmetric_cipher(&self) -> &dyn SymmetricCipher;

    /// Generates a long-term identity.
    ///
    /// # Errors
    /// Returns `Entropy` if `rng` fails.
    fn generate_identity(&self, rng: &dyn RandomSource) -> Result<IdentityKeyPair>;

    /// Decodes an identity public key.
    ///
    /// # Errors
    /// Returns `Decode` on malformed or wrong-length input.
    fn decode_public_key(&self, bytes: &[u8]) -> Result<HashnamePublicKey>;

    /// Decodes an identity private key.
    ///
    /// # Errors
    /// Returns `Decode` on malformed or wrong-length input.
    fn decode_private_key(&self, bytes: &[u8]) -> Result<HashnamePrivateKey>;

    /// Computes the public half belonging to an identity private key.
    ///
    /// # Errors
    /// Returns `UnsupportedSuite` for another suite's key, or `Decode` if
    /// the key bytes are invalid.
    fn derive_public_key(&self, private: &HashnamePrivateKey) -> Result<HashnamePublicKey>;

    /// Decodes a line public key.
    ///
    /// # Errors
    /// Returns `Decode` on malformed or wrong-length input.
    fn decode_line_public_key(&self, bytes: &[u8]) -> Result<LinePublicKey>;

    /// Decodes a line private key.
    ///
    /// # Errors
    /// Returns `Decode` on malformed or wrong-length input.
    fn decode_line_private_key(&self, bytes: &[u8]) -> Result<LinePrivateKey>;

    /// Generates a fresh ephemeral key pair for one handshake.
    ///
    /// # Errors
    /// Returns `Entropy` if `rng` fails.
    fn generate_line_key_pair(&self, rng: &dyn RandomSource) -> Result<LineKeyPair>;

    /// Recovers the sender's line key and decrypts the inner packet and
    /// signature. The result is NOT authenticated.
    ///
    /// # Errors
    /// Returns `Crypto` if the open parameter or the key agreement is
    /// structurally invalid.
    fn unwrap_open_packet(
        &self,
        identity: &IdentityKeyPair,
        iv: &Iv,
        encrypted_signature: &[u8],
        open_parameter: &[u8],
        encrypted_inner_packet: &[u8],
        origin: &Path,
    ) -> Result<UnwrappedOpenPacket>;

    /// Authenticates an unwrapped packet.
    ///
    /// Extracts the sender key from `inner_packet_body`, checks the
    /// signature, that `destination` is the unwrapping identity, that
    /// `line_id_bytes` is `line_identifier`, and that `open_time` is
    /// inside the freshness window.
    ///
    /// # Errors
    /// Returns `Verification` if any check fails.
    fn verify_open_packet(
        &self,
        unwrapped: UnwrappedOpenPacket,
        destination: &Hashname,
        line_id_bytes: &[u8],
        line_identifier: LineIdentifier,
        open_time: Timestamp,
        inner_packet_body: &[u8],
    ) -> Result<OpenPacket>;

    /// Generates the line key pair, IV and open parameter, and performs
    /// the key agreement, so rendering is cheap and repeatable.
    ///
    /// # Errors
    /// Returns `Entropy` if `rng` fails, `UnsupportedSuite` if the
    /// recipient key belongs to another suite.
    fn pre_render_open_packet(
        &self,
        open: OutgoingOpen,
        rng: &dyn RandomSource,
    ) -> Result<PreRenderedOpen>;

    /// Signs, encrypts and frames a pre-rendered open packet using the
    /// IV and open parameter it carries.
    ///
    /// # Errors
    /// Returns `UnsupportedSuite` if `identity` belongs to another suite.
    fn render_open_packet(
        &self,
        packet: &PreRenderedOpen,
        identity: &IdentityKeyPair,
    ) -> Result<Vec<u8>>;

    /// Derives `(encryption, decryption)` keys for a line from the local
    /// line private key (consumed) and the peer's line public key.
    ///
    /// # Errors
    /// Returns `Crypto` if the key agreement fails.
    fn derive_line_keys(
        &self,
        local: LinePrivateKey,
        remote: &LinePublicKey,
        outgoing: &LineIdentifier,
        incoming: &LineIdentifier,
    ) -> Result<(SymmetricKey, SymmetricKey)>;
}

// ============================================
// Suite Construction
// ============================================

/// Returns the suite for `id` with the default freshness window.
#[must_use]
pub fn for_id(id: SuiteId) -> Arc<dyn CipherSuite> {
    for_id_with_window(id, DEFAULT_OPEN_WINDOW)
}

/// Returns the suite for `id`, accepting open times within `window`.
#[must_use]
pub fn for_id_with_window(id: SuiteId, window: Duration) -> Arc<dyn CipherSuite> {
    match id {
        SuiteId::C25519 => Arc::new(C25519Suite::with_open_time_window(window)),
        SuiteId::P256 => Arc::new(P256Suite::with_open_time_window(window)),
    }
}
