// ============================================
// File: crates/hashline-core/src/protocol/framing.rs
// ============================================
//! # Packet Framing
//!
//! ## Creation Reason
//! Every hashline packet (open, line, the inner open packet and channel
//! packets) shares one binary/text hybrid layout. This module owns it.
//!
//! ## Wire Format
//! ```text
//! ┌──────────────────┬──────────────────────┬──────────────────┐
//! │ N (u16, BE)      │ header (N bytes)     │ body (rest)      │
//! │ 2 bytes          │ JSON object          │ opaque bytes     │
//! └──────────────────┴──────────────────────┴──────────────────┘
//! ```
//!
//! ## Parsing Strategy
//! 1. Check the 2-byte length prefix is present
//! 2. Check the declared header fits in the buffer
//! 3. Split header and body without copying
//!
//! ## ⚠️ Important Note for Next Developer
//! - Always validate buffer lengths before reading
//! - Header length is big-endian, unlike most x86-native formats
//!
//! ## Last Modified
//! v0.1.0 - Initial framing implementation

use bytes::{Buf, BufMut, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CoreError, Result};

// ============================================
// Constants
// ============================================

/// Size of the header length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 2;

/// Largest header the prefix can describe.
pub const MAX_HEADER_SIZE: usize = u16::MAX as usize;

// ============================================
// Encoding
// ============================================

/// Frames raw header bytes and a body.
///
/// # Errors
/// Returns `MalformedPacket` if the header exceeds [`MAX_HEADER_SIZE`].
pub fn encode_frame(header: &[u8], body: &[u8]) -> Result<Vec<u8>> {
    let header_len = u16::try_from(header.len()).map_err(|_| {
        CoreError::malformed(format!(
            "header too large: max {MAX_HEADER_SIZE} bytes, got {}",
            header.len()
        ))
    })?;

    let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + header.len() + body.len());
    buf.put_u16(header_len);
    buf.put_slice(header);
    buf.put_slice(body);
    Ok(buf.to_vec())
}

/// Serializes `header` as JSON and frames it with `body`.
///
/// # Errors
/// Returns `MalformedPacket` if serialization fails or the header is too large.
pub fn encode_json_frame<H: Serialize>(header: &H, body: &[u8]) -> Result<Vec<u8>> {
    let header = serde_json::to_vec(header)
        .map_err(|e| CoreError::malformed(format!("header serialization failed: {e}")))?;
    encode_frame(&header, body)
}

// ============================================
// Decoding
// ============================================

/// Splits a framed buffer into `(header, body)`.
///
/// # Errors
/// Returns `MalformedPacket` if the prefix is missing or the declared
/// header runs past the end of the buffer.
pub fn decode_frame(data: &[u8]) -> Result<(&[u8], &[u8])> {
    if data.len() < LENGTH_PREFIX_SIZE {
        return Err(CoreError::malformed(format!(
            "packet too short: expected at least {LENGTH_PREFIX_SIZE} bytes, got {}",
            data.len()
        )));
    }

    let mut prefix = &data[..LENGTH_PREFIX_SIZE];
    let header_len = usize::from(prefix.get_u16());
    let rest = &data[LENGTH_PREFIX_SIZE..];

    if rest.len() < header_len {
        return Err(CoreError::malformed(format!(
            "header length {header_len} exceeds remaining {} bytes",
            rest.len()
        )));
    }

    Ok(rest.split_at(header_len))
}

/// Parses a JSON header out of raw header bytes.
///
/// # Errors
/// Returns `MalformedPacket` if the bytes are not the expected JSON shape.
pub fn decode_json_header<H: DeserializeOwned>(header: &[u8]) -> Result<H> {
    serde_json::from_slice(header).map_err(|e| CoreError::malformed(format!("invalid header: {e}")))
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_layout() {
        let framed = encode_frame(b"{}", b"body").unwrap();
        assert_eq!(&framed[..2], &[0x00, 0x02]);
        assert_eq!(&framed[2..4], b"{}");
        assert_eq!(&framed[4..], b"body");

        let (header, body) = decode_frame(&framed).unwrap();
        assert_eq!(header, b"{}");
        assert_eq!(body, b"body");
    }

    #[test]
    fn test_length_is_big_endian() {
        let header = vec![b' '; 0x0102];
        let framed = encode_frame(&header, &[]).unwrap();
        assert_eq!(&framed[..2], &[0x01, 0x02]);
    }

    #[test]
    fn test_empty_header_and_body() {
        let (header, body) = decode_frame(&[0, 0]).unwrap();
        assert!(header.is_empty());
        assert!(body.is_empty());
    }

    #[test]
    fn test_decode_rejects_truncation() {
        assert!(matches!(decode_frame(&[]), Err(CoreError::MalformedPacket { .. })));
        assert!(matches!(decode_frame(&[0x00]), Err(CoreError::MalformedPacket { .. })));
        assert!(matches!(
            decode_frame(&[0x00, 0x05, b'{', b'}']),
            Err(CoreError::MalformedPacket { .. })
        ));
    }

    #[test]
    fn test_encode_rejects_oversized_header() {
        let header = vec![0u8; MAX_HEADER_SIZE + 1];
        assert!(encode_frame(&header, &[]).is_err());
    }

    #[test]
    fn test_json_header_roundtrip() {
        let framed = encode_json_frame(&serde_json::json!({"type": "line"}), b"x").unwrap();
        let (header, _) = decode_frame(&framed).unwrap();
        let value: serde_json::Value = decode_json_header(header).unwrap();
        assert_eq!(value["type"], "line");
        assert!(decode_json_header::<serde_json::Value>(b"not json").is_err());
    }
}
