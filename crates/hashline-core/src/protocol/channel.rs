// ============================================
// File: crates/hashline-core/src/protocol/channel.rs
// ============================================
//! # Channel Packets
//!
//! The application payload carried inside a line packet. The core does not
//! interpret it: a JSON header map and an opaque body, framed with the
//! shared packet framing.

use std::fmt;

use serde_json::{Map, Value};

use hashline_common::types::Path;

use crate::error::{CoreError, Result};
use crate::protocol::framing::{decode_frame, encode_frame};

/// An application payload.
#[derive(Clone, Default)]
pub struct ChannelPacket {
    header: Map<String, Value>,
    body: Vec<u8>,
    origin: Option<Path>,
}

impl ChannelPacket {
    /// Creates a channel packet from a header map and body.
    #[must_use]
    pub fn new(header: Map<String, Value>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            header,
            body: body.into(),
            origin: None,
        }
    }

    /// Creates the empty channel packet a line packet carries by default.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Adds a header field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.header.insert(key.into(), value.into());
        self
    }

    /// Returns the header map.
    #[must_use]
    pub const fn header(&self) -> &Map<String, Value> {
        &self.header
    }

    /// Returns the body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns the path this packet arrived on, if it was received.
    #[must_use]
    pub const fn origin(&self) -> Option<&Path> {
        self.origin.as_ref()
    }

    /// Serializes into framed bytes.
    ///
    /// # Errors
    /// Returns `MalformedPacket` if the header does not fit a frame.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let header = serde_json::to_vec(&self.header)
            .map_err(|e| CoreError::malformed(format!("channel header: {e}")))?;
        encode_frame(&header, &self.body)
    }

    /// Reconstructs a channel packet received on `origin`.
    ///
    /// # Errors
    /// Returns `MalformedPacket` if the framing or the header is invalid.
    pub fn deserialize(bytes: &[u8], origin: &Path) -> Result<Self> {
        let (header, body) = decode_frame(bytes)?;
        let header: Map<String, Value> = if header.is_empty() {
            Map::new()
        } else {
            serde_json::from_slice(header)
                .map_err(|e| CoreError::malformed(format!("channel header: {e}")))?
        };
        Ok(Self {
            header,
            body: body.to_vec(),
            origin: Some(origin.clone()),
        })
    }
}

/// Equality ignores the origin path.
impl PartialEq for ChannelPacket {
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header && self.body == other.body
    }
}

impl Eq for ChannelPacket {}

impl fmt::Debug for ChannelPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelPacket")
            .field("header", &self.header)
            .field("body_len", &self.body.len())
            .field("origin", &self.origin)
            .finish()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Path {
        Path::Local("test".into())
    }

    #[test]
    fn test_serialize_roundtrip() {
        let packet = ChannelPacket::empty()
            .with_field("c", "chan-1")
            .with_field("seq", 3)
            .with_field("end", true);
        let packet = ChannelPacket::new(packet.header().clone(), b"payload".to_vec());

        let bytes = packet.serialize().unwrap();
        let parsed = ChannelPacket::deserialize(&bytes, &origin()).unwrap();
        assert_eq!(parsed, packet);
        assert_eq!(parsed.origin(), Some(&origin()));
        assert_eq!(parsed.header()["seq"], 3);
    }

    #[test]
    fn test_empty_packet() {
        let bytes = ChannelPacket::empty().serialize().unwrap();
        // `{}` with a 2-byte prefix
        assert_eq!(bytes, vec![0, 2, b'{', b'}']);
        let parsed = ChannelPacket::deserialize(&bytes, &origin()).unwrap();
        assert!(parsed.header().is_empty());
        assert!(parsed.body().is_empty());
    }

    #[test]
    fn test_non_object_header_rejected() {
        let bytes = encode_frame(b"[1,2]", b"").unwrap();
        assert!(matches!(
            ChannelPacket::deserialize(&bytes, &origin()),
            Err(CoreError::MalformedPacket { .. })
        ));
    }
}
