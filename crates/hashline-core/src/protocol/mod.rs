// ============================================
// File: crates/hashline-core/src/protocol/mod.rs
// ============================================
//! # Protocol Module
//!
//! ## Creation Reason
//! Defines the hashline wire protocol: the shared framing, the open-packet
//! handshake messages, line packets and the channel payloads they carry.
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`framing`]: `[u16 BE length][JSON header][body]`
//! - [`open`]: Open packet lifecycle types and parsing
//! - [`line`]: Line packet codec
//! - [`channel`]: Application payloads
//! - [`registry`]: `type` tag → parser table
//!
//! ## Protocol Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Open Phase                               │
//! │                                                             │
//! │  A ──────────── open {cs, iv, open, sig} ──────────────► B  │
//! │  A ◄─────────── open {cs, iv, open, sig} ─────────────── B  │
//! │                                                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    Line Phase                               │
//! │                                                             │
//! │  A ═════════════ line {line, iv} + CTR(channel) ════════ B  │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Dispatch goes through the registry; do not add `match` arms on the
//!   `type` tag here
//! - A parse failure drops one datagram and nothing else
//!
//! ## Last Modified
//! v0.1.0 - Initial protocol definitions

pub mod channel;
pub mod framing;
pub mod line;
pub mod open;
pub mod registry;

use std::fmt;

use serde_json::{Map, Value};

use hashline_common::types::Path;

use crate::context::PacketContext;
use crate::error::{CoreError, Result};
use framing::{decode_frame, decode_json_header};

// Re-export primary types
pub use channel::ChannelPacket;
pub use line::{LinePacket, LINE_PACKET_TYPE};
pub use open::{
    parse_open_packet, OpenPacket, OutgoingOpen, PreRenderedOpen, RenderMaterial,
    UnwrappedOpenPacket, OPEN_PACKET_TYPE,
};
pub use registry::{PacketTypeRegistry, ParseFn};

// ============================================
// Packet
// ============================================

/// Any inbound packet, after dispatch on its `type` tag.
#[derive(Debug, Clone)]
pub enum Packet {
    /// A verified open packet.
    Open(OpenPacket),
    /// A decrypted line packet.
    Line(LinePacket),
    /// A packet of a type registered outside this crate.
    Custom(CustomPacket),
}

impl Packet {
    /// Decodes the framing of `datagram` and hands it to the parser
    /// registered for its `type` tag.
    ///
    /// # Errors
    /// - `MalformedPacket`: bad framing, or no string `type` field
    /// - `UnknownPacketType`: no parser for the tag
    /// - whatever the selected parser returns
    pub fn parse(ctx: &PacketContext<'_>, datagram: &[u8], origin: &Path) -> Result<Self> {
        let (header, body) = decode_frame(datagram)?;
        let header: Map<String, Value> = decode_json_header(header)?;

        let kind = header
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::malformed("missing packet type"))?;
        let parser = ctx
            .protocol
            .packet_types()
            .get(kind)
            .ok_or_else(|| CoreError::UnknownPacketType(kind.to_string()))?;

        parser(ctx, &header, body, origin)
    }

    /// Returns the `type` tag.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Open(_) => OPEN_PACKET_TYPE,
            Self::Line(_) => LINE_PACKET_TYPE,
            Self::Custom(packet) => packet.kind(),
        }
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(packet) => fmt::Display::fmt(packet, f),
            Self::Line(packet) => fmt::Display::fmt(packet, f),
            Self::Custom(packet) => {
                write!(f, "{}[{}]", packet.kind().to_uppercase(), packet.origin())
            }
        }
    }
}

// ============================================
// CustomPacket
// ============================================

/// The decoded frame of a packet type registered at run time.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomPacket {
    kind: String,
    header: Map<String, Value>,
    body: Vec<u8>,
    origin: Path,
}

impl CustomPacket {
    /// Creates a custom packet.
    #[must_use]
    pub fn new(
        kind: impl Into<String>,
        header: Map<String, Value>,
        body: Vec<u8>,
        origin: Path,
    ) -> Self {
        Self {
            kind: kind.into(),
            header,
            body,
            origin,
        }
    }

    /// Returns the `type` tag.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the header.
    #[must_use]
    pub const fn header(&self) -> &Map<String, Value> {
        &self.header
    }

    /// Returns the body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns the path the packet arrived on.
    #[must_use]
    pub const fn origin(&self) -> &Path {
        &self.origin
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use hashline_common::types::LineIdentifier;

    use super::*;
    use crate::context::ProtocolContext;
    use crate::crypto::keys::SuiteId;
    use crate::line::test_support::context;
    use crate::line::Line;

    fn origin() -> Path {
        Path::Local("dispatch".into())
    }

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

    fn parse_with(protocol: &ProtocolContext, datagram: &[u8]) -> Result<Packet> {
        let lines: HashMap<LineIdentifier, Arc<Line>> = HashMap::new();
        Packet::parse(&PacketContext::new(protocol, &lines), datagram, &origin())
    }

    #[test]
    fn test_unknown_type() {
        let ctx = context(SuiteId::C25519);
        let datagram = framing::encode_frame(br#"{"type":"ping"}"#, b"").unwrap();
        assert!(matches!(
            parse_with(&ctx, &datagram),
            Err(CoreError::UnknownPacketType(kind)) if kind == "ping"
        ));
    }

    #[test]
    fn test_missing_type() {
        let ctx = context(SuiteId::C25519);
        for header in [&b"{}"[..], &br#"{"type":7}"#[..]] {
            let datagram = framing::encode_frame(header, b"").unwrap();
            assert!(matches!(
                parse_with(&ctx, &datagram),
                Err(CoreError::MalformedPacket { .. })
            ));
        }
        assert!(matches!(
            parse_with(&ctx, &[0x00]),
            Err(CoreError::MalformedPacket { .. })
        ));
    }

    #[test]
    fn test_custom_type_dispatch() {
        let mut registry = PacketTypeRegistry::with_builtin();
        registry.register("ping", parse_ping);

        let identity = crate::crypto::suite::for_id(SuiteId::C25519)
            .generate_identity(&crate::crypto::random::OsRandom)
            .unwrap();
        let ctx = ProtocolContext::new(identity, crate::context::ProtocolConfig::default())
            .with_packet_types(Arc::new(registry));

        let datagram = framing::encode_frame(br#"{"type":"ping","n":1}"#, b"pong").unwrap();
        let packet = parse_with(&ctx, &datagram).unwrap();
        assert_eq!(packet.kind(), "ping");
        let Packet::Custom(ping) = packet else {
            panic!("expected custom packet");
        };
        assert_eq!(ping.header()["n"], 1);
        assert_eq!(ping.body(), b"pong");
    }

    #[test]
    fn test_open_dispatch() {
        let a = context(SuiteId::P256);
        let b = context(SuiteId::P256);
        let pre = a.pre_render_open(b.identity().public()).unwrap();
        let packet = parse_with(&b, &a.render_open(&pre).unwrap()).unwrap();

        assert_eq!(packet.kind(), "open");
        let Packet::Open(open) = packet else {
            panic!("expected open packet");
        };
        assert_eq!(open.sender_hashname(), *a.hashname());
        assert_eq!(open.line_identifier(), pre.open().line_identifier());
    }
}
