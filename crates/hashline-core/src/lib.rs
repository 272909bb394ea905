// ============================================
// File: crates/hashline-core/src/lib.rs
// ============================================
//! # Hashline Core - Handshake & Line Transport Library
//!
//! ## Creation Reason
//! Provides the cipher suites, the open-packet handshake and the
//! line-packet codec that hashline nodes use to reach each other securely.
//!
//! ## Main Functionality
//!
//! ### Crypto Module ([`crypto`])
//! - `CipherSuite` contract with the `c25519` and `p256` suites
//! - Key types (`IdentityKeyPair`, `LineKeyPair`, `SymmetricKey`, `Iv`)
//! - AES-256-CTR, HKDF-SHA256, pluggable `RandomSource`
//!
//! ### Protocol Module ([`protocol`])
//! - Shared framing and the packet-type registry
//! - Open packets (`OutgoingOpen` → `PreRenderedOpen`, and
//!   `UnwrappedOpenPacket` → `OpenPacket`)
//! - Line packets and channel packets
//!
//! ### Lines ([`line`]) and Context ([`context`])
//! - `Line` promotion from a completed handshake
//! - `LineRegistry` lookup contract
//! - `ProtocolContext` shared per node
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                hashline-node                        │
//! │                      │                              │
//! │                      ▼                              │
//! │                hashline-core  ◄── You are here      │
//! │                      │                              │
//! │                      ▼                              │
//! │               hashline-common                       │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Guarantees
//! - **Confidentiality**: AES-256-CTR under keys derived per line
//! - **Authenticity**: Open packets are signed by the sender identity and
//!   bound to the recipient, line id and open time
//! - **Forward Secrecy**: Ephemeral line key pairs per handshake
//! - **Replay Resistance**: Open times outside the window are rejected
//!
//! ## ⚠️ Important Note for Next Developer
//! - ALL cryptographic code uses audited RustCrypto / dalek implementations
//! - ALL private and symmetric keys MUST implement Zeroize
//! - The `test-vectors` feature must never reach production builds
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod context;
pub mod crypto;
pub mod error;
pub mod line;
pub mod protocol;

// Re-export commonly used items
pub use context::{PacketContext, ProtocolConfig, ProtocolContext};
pub use crypto::{
    CipherSuite, HashnamePublicKey, IdentityKeyPair, LineKeyPair, OsRandom, RandomSource, SuiteId,
};
pub use error::{CoreError, Result};
pub use line::{Line, LineRegistry};
pub use protocol::{ChannelPacket, LinePacket, OpenPacket, Packet, PreRenderedOpen};
