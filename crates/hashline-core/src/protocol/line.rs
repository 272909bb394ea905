// ============================================
// File: crates/hashline-core/src/protocol/line.rs
// ============================================
//! # Line Packets
//!
//! ## Creation Reason
//! Once a line exists, every application payload travels as a line packet:
//! a channel packet encrypted under the line's key with a fresh IV.
//!
//! ## Wire Format
//! ```text
//! frame({"type":"line","line":<outgoing id, 32 hex>,"iv":<32 hex>},
//!       CTR(encryption_key, iv, channel_packet.serialize()))
//! ```
//!
//! ## Parsing Strategy
//! 1. Decode `line` and `iv`; both must be exactly 16 bytes
//! 2. Look the line up by identifier (our incoming id)
//! 3. Decrypt with the line's decryption key
//! 4. Rebuild the channel packet
//!
//! ## ⚠️ Important Note for Next Developer
//! - Length checks happen before lookup and before any decryption
//! - An unknown line is routine (expiry, rekey): callers drop the packet
//! - Never reuse an IV; each render draws a new one
//!
//! ## Last Modified
//! v0.1.0 - Initial line packet codec

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, trace};

use hashline_common::types::{LineIdentifier, Path};

use crate::context::PacketContext;
use crate::crypto::keys::Iv;
use crate::crypto::IV_SIZE;
use crate::error::{CoreError, Result};
use crate::line::Line;
use crate::protocol::channel::ChannelPacket;
use crate::protocol::framing::encode_json_frame;

/// `type` tag of line packets.
pub const LINE_PACKET_TYPE: &str = "line";

/// Header of a line packet.
#[derive(Debug, Serialize, Deserialize)]
struct LineHeader {
    #[serde(rename = "type")]
    kind: String,
    line: String,
    iv: String,
}

/// A channel packet bound to the line it travels on.
#[derive(Debug, Clone)]
pub struct LinePacket {
    line: Arc<Line>,
    channel_packet: ChannelPacket,
    origin: Option<Path>,
}

impl LinePacket {
    /// Creates an outbound packet; an absent channel packet becomes the
    /// empty one.
    #[must_use]
    pub fn new(line: Arc<Line>, channel_packet: Option<ChannelPacket>) -> Self {
        Self {
            line,
            channel_packet: channel_packet.unwrap_or_default(),
            origin: None,
        }
    }

    /// Returns the line.
    #[must_use]
    pub const fn line(&self) -> &Arc<Line> {
        &self.line
    }

    /// Returns the carried channel packet.
    #[must_use]
    pub const fn channel_packet(&self) -> &ChannelPacket {
        &self.channel_packet
    }

    /// Consumes the packet, returning the channel packet.
    #[must_use]
    pub fn into_channel_packet(self) -> ChannelPacket {
        self.channel_packet
    }

    /// Returns the path an inbound packet arrived on.
    #[must_use]
    pub const fn origin(&self) -> Option<&Path> {
        self.origin.as_ref()
    }

    /// Encrypts and frames the packet.
    ///
    /// # Errors
    /// - `Entropy`: the IV could not be drawn
    /// - `MalformedPacket`: the channel packet does not frame
    pub fn render(&self) -> Result<Vec<u8>> {
        let body = self.channel_packet.serialize()?;

        let mut iv = [0u8; IV_SIZE];
        self.line.protocol_context().random().fill_bytes(&mut iv)?;
        let iv = Iv::from_array(iv);

        let encrypted = self
            .line
            .suite()
            .symmetric_cipher()
            .encrypt(&body, &iv, self.line.encryption_key())?;

        let header = LineHeader {
            kind: LINE_PACKET_TYPE.to_string(),
            line: self.line.outgoing_line_identifier().to_hex(),
            iv: iv.to_hex(),
        };

        trace!(line = %self.line, len = encrypted.len(), "Rendering line packet");
        encode_json_frame(&header, &encrypted)
    }

    /// Parses an inbound line packet.
    ///
    /// # Errors
    /// - `MalformedPacket`: missing fields, or `line`/`iv` not 16 bytes
    /// - `UnknownLine`: no line is registered for the identifier
    /// - `MalformedPacket`: the decrypted channel packet does not decode
    pub fn parse(
        ctx: &PacketContext<'_>,
        header: &Map<String, Value>,
        body: &[u8],
        origin: &Path,
    ) -> Result<Self> {
        let header: LineHeader = serde_json::from_value(Value::Object(header.clone()))
            .map_err(|e| CoreError::malformed(format!("line header: {e}")))?;

        let line_id = hex::decode(&header.line)
            .map_err(|e| CoreError::malformed(format!("line id: {e}")))?;
        let line_id = LineIdentifier::from_bytes(&line_id)
            .map_err(|e| CoreError::malformed(format!("line id: {e}")))?;
        let iv = hex::decode(&header.iv).map_err(|e| CoreError::malformed(format!("iv: {e}")))?;
        let iv = Iv::from_bytes(&iv)?;

        let Some(line) = ctx.lines.lookup(&line_id) else {
            debug!(line = %line_id, path = %origin, "Line packet for unknown line");
            return Err(CoreError::unknown_line(line_id));
        };

        let decrypted = line
            .suite()
            .symmetric_cipher()
            .decrypt(body, &iv, line.decryption_key())?;
        let channel_packet = ChannelPacket::deserialize(&decrypted, origin)?;

        Ok(Self {
            line,
            channel_packet,
            origin: Some(origin.clone()),
        })
    }
}

impl fmt::Display for LinePacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LINE[{}]", self.line)
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::crypto::keys::SuiteId;
    use crate::line::test_support::line_pair;
    use crate::protocol::framing::decode_frame;
    use crate::protocol::Packet;

    fn origin() -> Path {
        Path::Local("peer".into())
    }

    fn registry(line: &Arc<Line>) -> HashMap<LineIdentifier, Arc<Line>> {
        let mut lines = HashMap::new();
        lines.insert(line.incoming_line_identifier(), Arc::clone(line));
        lines
    }

    fn deliver(receiver: &Arc<Line>, bytes: &[u8]) -> Result<Packet> {
        let lines = registry(receiver);
        let ctx = PacketContext::new(receiver.protocol_context(), &lines);
        Packet::parse(&ctx, bytes, &origin())
    }

    fn header_of(bytes: &[u8]) -> Map<String, Value> {
        let (header, _) = decode_frame(bytes).unwrap();
        serde_json::from_slice(header).unwrap()
    }

    #[test]
    fn test_render_parse_roundtrip() {
        for suite_id in SuiteId::ALL {
            let (a, b) = line_pair(suite_id);
            let payload = ChannelPacket::new(Map::new(), b"hello line".to_vec())
                .with_field("c", "chan")
                .with_field("seq", 1);

            let bytes = LinePacket::new(Arc::clone(&a), Some(payload.clone()))
                .render()
                .unwrap();
            let Packet::Line(received) = deliver(&b, &bytes).unwrap() else {
                panic!("expected line packet");
            };

            assert_eq!(received.channel_packet(), &payload);
            assert_eq!(received.origin(), Some(&origin()));
            assert!(Arc::ptr_eq(received.line(), &b));
        }
    }

    #[test]
    fn test_absent_channel_packet_is_empty() {
        let (a, b) = line_pair(SuiteId::C25519);
        let bytes = LinePacket::new(a, None).render().unwrap();
        let Packet::Line(received) = deliver(&b, &bytes).unwrap() else {
            panic!("expected line packet");
        };
        assert_eq!(received.channel_packet(), &ChannelPacket::empty());
    }

    #[test]
    fn test_header_fields() {
        let (a, _) = line_pair(SuiteId::C25519);
        let bytes = LinePacket::new(Arc::clone(&a), None).render().unwrap();
        let header = header_of(&bytes);

        assert_eq!(header["type"], "line");
        assert_eq!(header["line"], a.outgoing_line_identifier().to_hex());
        assert_eq!(header["iv"].as_str().unwrap().len(), 32);
    }

    #[test]
    fn test_fresh_iv_per_render() {
        let (a, _) = line_pair(SuiteId::C25519);
        let packet = LinePacket::new(a, None);
        let first = header_of(&packet.render().unwrap());
        let second = header_of(&packet.render().unwrap());
        assert_ne!(first["iv"], second["iv"]);
    }

    #[test]
    fn test_wrong_length_fields_rejected() {
        let (a, b) = line_pair(SuiteId::C25519);
        let lines = registry(&b);
        let ctx = PacketContext::new(b.protocol_context(), &lines);
        let good_line = a.outgoing_line_identifier().to_hex();

        let cases = [
            (good_line.as_str(), "00"),
            (good_line.as_str(), "zz"),
            ("0011", "00112233445566778899aabbccddeeff"),
            (
                "00112233445566778899aabbccddeeff00",
                "00112233445566778899aabbccddeeff",
            ),
        ];
        for (line, iv) in cases {
            let header = serde_json::json!({"type": "line", "line": line, "iv": iv});
            let header = header.as_object().unwrap();
            assert!(matches!(
                LinePacket::parse(&ctx, header, b"ciphertext", &origin()),
                Err(CoreError::MalformedPacket { .. })
            ));
        }

        let missing = serde_json::json!({"type": "line", "line": good_line});
        assert!(matches!(
            LinePacket::parse(&ctx, missing.as_object().unwrap(), b"", &origin()),
            Err(CoreError::MalformedPacket { .. })
        ));
    }

    #[test]
    fn test_unknown_line() {
        let (a, b) = line_pair(SuiteId::C25519);
        let bytes = LinePacket::new(Arc::clone(&a), None).render().unwrap();

        let no_lines: HashMap<LineIdentifier, Arc<Line>> = HashMap::new();
        let ctx = PacketContext::new(b.protocol_context(), &no_lines);
        let result = Packet::parse(&ctx, &bytes, &origin());
        assert!(matches!(
            result,
            Err(CoreError::UnknownLine { line }) if line == a.outgoing_line_identifier()
        ));
    }

    #[test]
    fn test_display() {
        let (a, _) = line_pair(SuiteId::C25519);
        let packet = LinePacket::new(Arc::clone(&a), None);
        assert_eq!(
            packet.to_string(),
            format!("LINE[{}]", a.outgoing_line_identifier())
        );
    }
}
