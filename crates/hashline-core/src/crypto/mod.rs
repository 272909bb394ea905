// ============================================
// File: crates/hashline-core/src/crypto/mod.rs
// ============================================
//! # Cryptography Module
//!
//! ## Creation Reason
//! Centralizes all cryptographic operations for hashline, using audited
//! RustCrypto and dalek implementations.
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`keys`]: Suite-tagged key types, `SymmetricKey`, `Iv`
//! - [`suite`]: The `CipherSuite` contract and the `c25519`/`p256` suites
//! - [`cipher`]: Symmetric stream cipher (AES-256-CTR)
//! - [`kdf`]: Key derivation functions (HKDF-SHA256)
//! - [`random`]: Pluggable cryptographically secure random source
//!
//! ## Cryptographic Design
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Open Phase                               │
//! │  Sender                                        Recipient    │
//! │    │  W.pub || CTR(DH(W, R), L.pub) ─────────────► │        │
//! │    │  CTR(DH(L, R), inner{to, at, line, key}) ───► │        │
//! │    │  CTR(DH(L, R), Sign(identity, inner||L.pub)) ►│        │
//! │    │                                               │        │
//! │    │ ◄───────────────── the same, in reverse       │        │
//! └─────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Line Phase                               │
//! │                                                             │
//! │   DH(L_local, L_remote) ──► HKDF ──► enc / dec keys         │
//! │   key + fresh 16-byte IV ──► AES-256-CTR ──► line packet    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - NEVER roll your own crypto
//! - ALL private and symmetric keys are zeroized on drop
//! - Every IV and line key pair must be fresh; both come from
//!   the `RandomSource` during pre-render only
//!
//! ## Last Modified
//! v0.1.0 - Initial crypto implementation

pub mod cipher;
pub mod kdf;
pub mod keys;
pub mod random;
pub mod suite;

// Re-export primary types at module level
pub use cipher::{Aes256Ctr, SymmetricCipher};
pub use keys::{
    HashnamePrivateKey, HashnamePublicKey, IdentityKeyPair, Iv, LineKeyPair, LinePrivateKey,
    LinePublicKey, SuiteId, SymmetricKey,
};
pub use random::{OsRandom, RandomSource};
pub use suite::CipherSuite;

#[cfg(any(test, feature = "test-vectors"))]
pub use random::SeededRandom;

// ============================================
// Constants
// ============================================

/// Size of an IV in bytes.
pub const IV_SIZE: usize = 16;

/// Size of a symmetric key in bytes (AES-256).
pub const SYMMETRIC_KEY_SIZE: usize = 32;

/// Size of a Diffie-Hellman shared secret in bytes (both suites).
pub const SHARED_SECRET_SIZE: usize = 32;

/// HKDF salt for every hashline derivation.
pub const HKDF_SALT: &[u8] = b"hashline-v1";

/// HKDF label wrapping the sender's line public key.
pub const LABEL_OPEN_PARAMETER: &[u8] = b"open-parameter";

/// HKDF label protecting the inner open packet.
pub const LABEL_OPEN_INNER: &[u8] = b"open-inner";

/// HKDF label protecting the open packet signature.
pub const LABEL_OPEN_SIGNATURE: &[u8] = b"open-signature";

/// HKDF label prefix for line keys.
pub const LABEL_LINE: &[u8] = b"line";
