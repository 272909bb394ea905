// ============================================
// File: crates/hashline-core/src/protocol/registry.rs
// ============================================
//! # Packet-Type Registry
//!
//! ## Creation Reason
//! Inbound datagrams are dispatched on their header `type` tag. A table of
//! parse functions keeps the dispatcher free of per-type branching, so new
//! packet types plug in without touching the framing code.
//!
//! ## Main Functionality
//! - `ParseFn`: Signature every packet parser shares
//! - `PacketTypeRegistry`: `type` tag → `ParseFn`
//! - [`PacketTypeRegistry::shared_default`]: Built-in table, built once
//!
//! ## ⚠️ Important Note for Next Developer
//! - Register custom types at start-up, before the registry is shared
//! - Re-registering a tag replaces the previous parser and returns it
//!
//! ## Last Modified
//! v0.1.0 - Initial registry

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use serde_json::{Map, Value};

use hashline_common::types::Path;

use crate::context::PacketContext;
use crate::error::Result;
use crate::protocol::line::{LinePacket, LINE_PACKET_TYPE};
use crate::protocol::open::{parse_open_packet, OPEN_PACKET_TYPE};
use crate::protocol::Packet;

/// Parses one packet type from its decoded header and raw body.
pub type ParseFn = fn(&PacketContext<'_>, &Map<String, Value>, &[u8], &Path) -> Result<Packet>;

static DEFAULT_REGISTRY: OnceLock<Arc<PacketTypeRegistry>> = OnceLock::new();

fn parse_open(
    ctx: &PacketContext<'_>,
    header: &Map<String, Value>,
    body: &[u8],
    origin: &Path,
) -> Result<Packet> {
    parse_open_packet(ctx, header, body, origin).map(Packet::Open)
}

fn parse_line(
    ctx: &PacketContext<'_>,
    header: &Map<String, Value>,
    body: &[u8],
    origin: &Path,
) -> Result<Packet> {
    LinePacket::parse(ctx, header, body, origin).map(Packet::Line)
}

/// Mapping from packet `type` tag to parser.
#[derive(Clone, Default)]
pub struct PacketTypeRegistry {
    parsers: HashMap<String, ParseFn>,
}

impl PacketTypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the `open` and `line` parsers.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(OPEN_PACKET_TYPE, parse_open);
        registry.register(LINE_PACKET_TYPE, parse_line);
        registry
    }

    /// Returns the process-wide built-in registry.
    #[must_use]
    pub fn shared_default() -> Arc<Self> {
        Arc::clone(DEFAULT_REGISTRY.get_or_init(|| Arc::new(Self::with_builtin())))
    }

    /// Registers `parser` for `tag`, returning any parser it replaces.
    pub fn register(&mut self, tag: impl Into<String>, parser: ParseFn) -> Option<ParseFn> {
        self.parsers.insert(tag.into(), parser)
    }

    /// Returns the parser for `tag`.
    #[must_use]
    pub fn get(&self, tag: &str) -> Option<ParseFn> {
        self.parsers.get(tag).copied()
    }

    /// Returns `true` if `tag` has a parser.
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.parsers.contains_key(tag)
    }

    /// Returns the registered tags.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.parsers.keys().map(String::as_str)
    }
}

impl fmt::Debug for PacketTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<_> = self.tags().collect();
        tags.sort_unstable();
        f.debug_struct("PacketTypeRegistry")
            .field("tags", &tags)
            .finish()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::CustomPacket;

    fn parse_ping(
        _ctx: &PacketContext<'_>,
        header: &Map<String, Value>,
        body: &[u8],
        origin: &Path,
    ) -> Result<Packet> {
        Ok(Packet::Custom(CustomPacket::new(
            "ping",
            header.clone(),
            body.to_vec(),
            origin.clone(),
        )))
    }

    #[test]
    fn test_builtin_types() {
        let registry = PacketTypeRegistry::with_builtin();
        assert!(registry.contains("open"));
        assert!(registry.contains("line"));
        assert!(!registry.contains("ping"));
        assert!(PacketTypeRegistry::new().get("open").is_none());
    }

    #[test]
    fn test_register_returns_replaced_parser() {
        let mut registry = PacketTypeRegistry::new();
        assert!(registry.register("ping", parse_ping).is_none());
        assert!(registry.register("ping", parse_ping).is_some());
        assert!(registry.get("ping").is_some());
    }

    #[test]
    fn test_shared_default_is_shared() {
        let a = PacketTypeRegistry::shared_default();
        let b = PacketTypeRegistry::shared_default();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.contains("line"));
    }
}
