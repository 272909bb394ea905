// ============================================
// File: crates/hashline-core/src/context.rs
// ============================================
//! # Protocol Context
//!
//! ## Creation Reason
//! Every packet operation needs the same surroundings: the local identity,
//! the suites this node speaks, a random source and the packet-type table.
//! `ProtocolContext` bundles them once per node and is shared by `Arc`.
//!
//! ## Main Functionality
//! - `ProtocolConfig`: Freshness window and preferred suite
//! - `ProtocolContext`: Identity, suites, random source, packet types
//! - `PacketContext`: What inbound parsing borrows for one datagram
//!
//! ## ⚠️ Important Note for Next Developer
//! - The context holds the identity private key; never log it as a whole
//! - `PacketContext` is cheap and borrowed; build one per receive call
//!
//! ## Last Modified
//! v0.1.0 - Initial protocol context

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use hashline_common::time::DEFAULT_OPEN_WINDOW;
use hashline_common::types::{Hashname, LineIdentifier, LINE_IDENTIFIER_SIZE};

use crate::crypto::keys::{HashnamePublicKey, IdentityKeyPair, SuiteId};
use crate::crypto::random::{OsRandom, RandomSource};
use crate::crypto::suite::{self, CipherSuite};
use crate::error::{CoreError, Result};
use crate::line::LineRegistry;
use crate::protocol::open::{OutgoingOpen, PreRenderedOpen};
use crate::protocol::registry::PacketTypeRegistry;

// ============================================
// ProtocolConfig
// ============================================

/// Protocol-level settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolConfig {
    /// Maximum clock skew accepted on open packets, in either direction.
    pub open_time_window: Duration,
    /// Suite used when generating a new identity.
    pub default_suite: SuiteId,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            open_time_window: DEFAULT_OPEN_WINDOW,
            default_suite: SuiteId::C25519,
        }
    }
}

// ============================================
// ProtocolContext
// ============================================

/// Per-node protocol state shared by all lines.
pub struct ProtocolContext {
    identity: IdentityKeyPair,
    hashname: Hashname,
    config: ProtocolConfig,
    suites: HashMap<SuiteId, Arc<dyn CipherSuite>>,
    random: Arc<dyn RandomSource>,
    packet_types: Arc<PacketTypeRegistry>,
}

impl ProtocolContext {
    /// Creates a context for `identity` using the OS random source and
    /// the built-in packet types.
    #[must_use]
    pub fn new(identity: IdentityKeyPair, config: ProtocolConfig) -> Self {
        let suites = SuiteId::ALL
            .into_iter()
            .map(|id| (id, suite::for_id_with_window(id, config.open_time_window)))
            .collect();

        Self {
            hashname: identity.hashname(),
            identity,
            config,
            suites,
            random: Arc::new(OsRandom),
            packet_types: PacketTypeRegistry::shared_default(),
        }
    }

    /// Replaces the random source.
    #[must_use]
    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    /// Replaces the packet-type registry.
    #[must_use]
    pub fn with_packet_types(mut self, packet_types: Arc<PacketTypeRegistry>) -> Self {
        self.packet_types = packet_types;
        self
    }

    /// Returns the local identity.
    #[must_use]
    pub const fn identity(&self) -> &IdentityKeyPair {
        &self.identity
    }

    /// Returns the local hashname.
    #[must_use]
    pub const fn hashname(&self) -> &Hashname {
        &self.hashname
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Returns the random source.
    #[must_use]
    pub fn random(&self) -> &dyn RandomSource {
        self.random.as_ref()
    }

    /// Returns the packet-type registry.
    #[must_use]
    pub fn packet_types(&self) -> &PacketTypeRegistry {
        &self.packet_types
    }

    /// Returns the suite for `id`.
    ///
    /// # Errors
    /// Returns `UnsupportedSuite` if this node does not speak `id`.
    pub fn suite(&self, id: SuiteId) -> Result<&Arc<dyn CipherSuite>> {
        self.suites
            .get(&id)
            .ok_or_else(|| CoreError::UnsupportedSuite(id.tag().to_string()))
    }

    /// Returns the suite for a wire tag.
    ///
    /// # Errors
    /// Returns `UnsupportedSuite` for unknown tags.
    pub fn suite_by_tag(&self, tag: &str) -> Result<&Arc<dyn CipherSuite>> {
        self.suite(tag.parse()?)
    }

    /// Draws a fresh line identifier from the context's random source.
    ///
    /// # Errors
    /// Returns `Entropy` if the random source fails.
    pub fn generate_line_identifier(&self) -> Result<LineIdentifier> {
        let mut bytes = [0u8; LINE_IDENTIFIER_SIZE];
        self.random.fill_bytes(&mut bytes)?;
        Ok(LineIdentifier::from_array(bytes))
    }

    /// Starts a handshake with `recipient`: picks a line identifier and
    /// pre-renders the open packet with the recipient's suite.
    ///
    /// # Errors
    /// Returns `UnsupportedSuite` if the recipient's suite differs from the
    /// local identity's, or `Entropy` if the random source fails.
    pub fn pre_render_open(&self, recipient: &HashnamePublicKey) -> Result<PreRenderedOpen> {
        if recipient.suite() != self.identity.suite() {
            return Err(CoreError::UnsupportedSuite(recipient.suite().tag().to_string()));
        }
        let open = OutgoingOpen::new(recipient.clone(), self.generate_line_identifier()?);
        self.suite(recipient.suite())?
            .pre_render_open_packet(open, self.random())
    }

    /// Renders a pre-rendered open packet signed by the local identity.
    ///
    /// # Errors
    /// Propagates suite rendering failures.
    pub fn render_open(&self, packet: &PreRenderedOpen) -> Result<Vec<u8>> {
        self.suite(packet.suite())?
            .render_open_packet(packet, &self.identity)
    }
}

impl fmt::Debug for ProtocolContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolContext")
            .field("hashname", &self.hashname)
            .field("suite", &self.identity.suite())
            .field("config", &self.config)
            .field("packet_types", &self.packet_types)
            .finish_non_exhaustive()
    }
}

// ============================================
// PacketContext
// ============================================

/// Borrowed surroundings for parsing one inbound datagram.
#[derive(Clone, Copy)]
pub struct PacketContext<'a> {
    /// The local node's protocol context.
    pub protocol: &'a ProtocolContext,
    /// Where line packets find their line.
    pub lines: &'a dyn LineRegistry,
}

impl<'a> PacketContext<'a> {
    /// Bundles a protocol context with a line registry.
    #[must_use]
    pub const fn new(protocol: &'a ProtocolContext, lines: &'a dyn LineRegistry) -> Self {
        Self { protocol, lines }
    }
}

// ============================================
// Tests
// ============================================
