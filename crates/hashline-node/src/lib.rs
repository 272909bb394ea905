// ============================================
// File: crates/hashline-node/src/lib.rs
// ============================================
//! # Hashline Node Library
//!
//! ## Creation Reason
//! Turns the hashline core protocol into a running node: configuration,
//! the table of established lines, handshake orchestration and datagram
//! dispatch.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`config`]: Node configuration management
//! - [`switch`]: Datagram dispatch and background cleanup
//! - [`services`]: Stateful node services
//!   - [`services::lines`]: Line table
//!   - [`services::handshake`]: Handshake processing
//! - [`error`]: Node-specific error types
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Hashline Node                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌─────────────┐     ┌─────────────┐     ┌─────────────────┐    │
//! │  │   Config    │────►│   Switch    │────►│ HandshakeService│    │
//! │  └─────────────┘     └──────┬──────┘     └────────┬────────┘    │
//! │                             │                     │             │
//! │                             ▼                     ▼             │
//! │                      ┌─────────────────────────────────┐        │
//! │                      │          LineManager            │        │
//! │                      └─────────────────────────────────┘        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                     hashline-core                               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Data Flow
//! ```text
//! datagram → Switch::receive → open: handshake / line: decrypt → ChannelPacket
//! ChannelPacket → Switch::send → line packet bytes → transport
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - No transport lives here; sockets belong to the embedding program
//! - Configuration changes require a new `Switch`
//!
//! ## Last Modified
//! v0.1.0 - Initial node library

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod services;
pub mod switch;

// Re-export primary types
pub use config::NodeConfig;
pub use error::{NodeError, Result};
pub use switch::{Received, Switch};
