// ============================================
// File: crates/hashline-node/src/services/mod.rs
// ============================================
//! # Node Services
//!
//! ## Creation Reason
//! Holds the stateful parts of a hashline node, kept apart from datagram
//! dispatch in [`crate::switch`].
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`lines`]: Established line table with idle expiry
//! - [`handshake`]: Pending opens and line promotion
//!
//! ## Service Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Service Layer                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌──────────────────┐   ┌─────────────────────────────────┐ │
//! │  │ HandshakeService │   │      LineManager                │ │
//! │  │                  │──►│  - Register/remove lines        │ │
//! │  │  - Pending opens │   │  - Lookup by incoming id / peer │ │
//! │  │  - Promotion     │   │  - Idle expiry                  │ │
//! │  └──────────────────┘   └─────────────────────────────────┘ │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Both services are Send + Sync and shared through `Arc`
//! - `LineManager` is also the `LineRegistry` handed to packet parsing
//!
//! ## Last Modified
//! v0.1.0 - Initial services structure

pub mod handshake;
pub mod lines;

// Re-export primary types
pub use handshake::{HandshakeOutcome, HandshakeService};
pub use lines::{LineEntry, LineManager, LineStats, StatsSnapshot};
