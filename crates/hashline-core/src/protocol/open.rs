// ============================================
// File: crates/hashline-core/src/protocol/open.rs
// ============================================
//! # Open Packets
//!
//! ## Creation Reason
//! Models each lifecycle state of the handshake message as its own type,
//! so unauthenticated data cannot be mistaken for a verified peer.
//!
//! ## Main Functionality
//! - `OutgoingOpen`: What the sender wants to announce (CREATED)
//! - `PreRenderedOpen`: Cached key material, ready to render (PRE_RENDERED)
//! - `UnwrappedOpenPacket`: Decrypted but untrusted (UNWRAPPED)
//! - `OpenPacket`: Signature, destination, line id and time accepted (VERIFIED)
//! - `parse_open_packet`: RECEIVED → UNWRAPPED → VERIFIED
//!
//! ## Wire Format
//! ```text
//! outer  = frame({"type":"open","cs":<suite>,"iv":<hex16>,
//!                 "open":<b64 open parameter>,"sig":<b64 encrypted sig>},
//!                CTR(open_key, iv, inner))
//! inner  = frame({"to":<hashname hex>,"at":<ms>,"line":<hex16>},
//!                sender identity public key)
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - `OpenPacket` has no public constructor; only a suite's
//!   `verify_open_packet` creates one
//! - `RenderMaterial` can only be overridden in test builds
//!
//! ## Last Modified
//! v0.1.0 - Initial open packet types

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use hashline_common::time::Timestamp;
use hashline_common::types::{Hashname, LineIdentifier, Path};

use crate::context::PacketContext;
use crate::crypto::keys::{
    HashnamePublicKey, Iv, LineKeyPair, LinePrivateKey, LinePublicKey, SuiteId, SymmetricKey,
};
use crate::error::{CoreError, Result};
use crate::protocol::framing::{decode_frame, decode_json_header};

/// `type` tag of open packets.
pub const OPEN_PACKET_TYPE: &str = "open";

// ============================================
// Wire Headers
// ============================================

/// Outer header of an open packet.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct OpenHeader {
    #[serde(rename = "type")]
    pub kind: String,
    pub cs: String,
    pub iv: String,
    pub open: String,
    pub sig: String,
}

/// Header of the inner (signed) open packet.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct InnerOpenHeader {
    pub to: String,
    pub at: i64,
    pub line: String,
}

// ============================================
// OutgoingOpen (CREATED)
// ============================================

/// An open packet the local node intends to send.
#[derive(Debug, Clone)]
pub struct OutgoingOpen {
    recipient: HashnamePublicKey,
    line_identifier: LineIdentifier,
    open_time: Timestamp,
}

impl OutgoingOpen {
    /// Creates an open to `recipient` announcing `line_identifier`,
    /// stamped with the current time.
    #[must_use]
    pub fn new(recipient: HashnamePublicKey, line_identifier: LineIdentifier) -> Self {
        Self {
            recipient,
            line_identifier,
            open_time: Timestamp::now(),
        }
    }

    /// Overrides the open time.
    #[must_use]
    pub const fn with_open_time(mut self, open_time: Timestamp) -> Self {
        self.open_time = open_time;
        self
    }

    /// Returns the recipient's identity key.
    #[must_use]
    pub const fn recipient(&self) -> &HashnamePublicKey {
        &self.recipient
    }

    /// Returns the line identifier the sender will receive on.
    #[must_use]
    pub const fn line_identifier(&self) -> LineIdentifier {
        self.line_identifier
    }

    /// Returns the announced open time.
    #[must_use]
    pub const fn open_time(&self) -> Timestamp {
        self.open_time
    }
}

// ============================================
// RenderMaterial
// ============================================

/// The `iv` and `open` parameter placed on the wire by rendering.
///
/// Produced fresh by pre-render. Substituting caller-chosen material is
/// only possible in test builds.
#[derive(Clone, PartialEq, Eq)]
pub struct RenderMaterial {
    iv: Iv,
    open_parameter: Vec<u8>,
}

impl RenderMaterial {
    pub(crate) fn generated(iv: Iv, open_parameter: Vec<u8>) -> Self {
        Self { iv, open_parameter }
    }

    /// Builds material from fixed test-vector values.
    #[cfg(any(test, feature = "test-vectors"))]
    #[must_use]
    pub fn new(iv: Iv, open_parameter: Vec<u8>) -> Self {
        Self { iv, open_parameter }
    }

    /// Returns the IV.
    #[must_use]
    pub const fn iv(&self) -> &Iv {
        &self.iv
    }

    /// Returns the wrapped line public key.
    #[must_use]
    pub fn open_parameter(&self) -> &[u8] {
        &self.open_parameter
    }
}

impl fmt::Debug for RenderMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderMaterial")
            .field("iv", &self.iv)
            .field("open_parameter_len", &self.open_parameter.len())
            .finish()
    }
}

// ============================================
// PreRenderedOpen (PRE_RENDERED)
// ============================================

/// An outgoing open with all randomness and key agreement already done.
///
/// Rendering it repeatedly yields identical bytes, which makes
/// retransmission cheap. Promoting it to a line consumes it.
#[derive(Debug)]
pub struct PreRenderedOpen {
    suite: SuiteId,
    open: OutgoingOpen,
    line_key_pair: LineKeyPair,
    material: RenderMaterial,
    inner_key: SymmetricKey,
    signature_key: SymmetricKey,
}

impl PreRenderedOpen {
    pub(crate) fn new(
        suite: SuiteId,
        open: OutgoingOpen,
        line_key_pair: LineKeyPair,
        material: RenderMaterial,
        inner_key: SymmetricKey,
        signature_key: SymmetricKey,
    ) -> Self {
        Self {
            suite,
            open,
            line_key_pair,
            material,
            inner_key,
            signature_key,
        }
    }

    /// Replaces the render material with fixed test-vector values.
    #[cfg(any(test, feature = "test-vectors"))]
    #[must_use]
    pub fn with_material(mut self, material: RenderMaterial) -> Self {
        self.material = material;
        self
    }

    /// Returns the suite that pre-rendered this open.
    #[must_use]
    pub const fn suite(&self) -> SuiteId {
        self.suite
    }

    /// Returns the open being sent.
    #[must_use]
    pub const fn open(&self) -> &OutgoingOpen {
        &self.open
    }

    /// Returns the line public key this open announces.
    #[must_use]
    pub const fn line_public_key(&self) -> &LinePublicKey {
        self.line_key_pair.public()
    }

    /// Returns the material rendering will place on the wire.
    #[must_use]
    pub const fn material(&self) -> &RenderMaterial {
        &self.material
    }

    pub(crate) const fn inner_key(&self) -> &SymmetricKey {
        &self.inner_key
    }

    pub(crate) const fn signature_key(&self) -> &SymmetricKey {
        &self.signature_key
    }

    /// Consumes the pre-rendered open for line promotion.
    pub(crate) fn into_line_parts(self) -> (OutgoingOpen, LinePrivateKey) {
        (self.open, self.line_key_pair.into_private())
    }
}

// ============================================
// UnwrappedOpenPacket (UNWRAPPED)
// ============================================

/// A decrypted open packet whose sender has NOT been authenticated.
///
/// The only way forward is
/// [`CipherSuite::verify_open_packet`](crate::crypto::CipherSuite::verify_open_packet).
pub struct UnwrappedOpenPacket {
    suite: SuiteId,
    local_hashname: Hashname,
    line_public_key: LinePublicKey,
    inner_packet: Vec<u8>,
    signature: Vec<u8>,
    origin: Path,
}

impl UnwrappedOpenPacket {
    pub(crate) fn new(
        suite: SuiteId,
        local_hashname: Hashname,
        line_public_key: LinePublicKey,
        inner_packet: Vec<u8>,
        signature: Vec<u8>,
        origin: Path,
    ) -> Self {
        Self {
            suite,
            local_hashname,
            line_public_key,
            inner_packet,
            signature,
            origin,
        }
    }

    /// Returns the suite that unwrapped the packet.
    #[must_use]
    pub const fn suite(&self) -> SuiteId {
        self.suite
    }

    /// Returns the hashname of the identity that unwrapped the packet.
    #[must_use]
    pub const fn local_hashname(&self) -> &Hashname {
        &self.local_hashname
    }

    /// Returns the decrypted, still unauthenticated, inner packet.
    #[must_use]
    pub fn inner_packet(&self) -> &[u8] {
        &self.inner_packet
    }

    pub(crate) fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub(crate) const fn line_public_key(&self) -> &LinePublicKey {
        &self.line_public_key
    }

    pub(crate) fn into_verified(
        self,
        sender: HashnamePublicKey,
        line_identifier: LineIdentifier,
        open_time: Timestamp,
    ) -> OpenPacket {
        OpenPacket {
            suite: self.suite,
            sender,
            line_identifier,
            open_time,
            line_public_key: self.line_public_key,
            origin: self.origin,
        }
    }
}

impl fmt::Debug for UnwrappedOpenPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnwrappedOpenPacket")
            .field("suite", &self.suite)
            .field("inner_len", &self.inner_packet.len())
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

// ============================================
// OpenPacket (VERIFIED)
// ============================================

/// A verified open packet: the sender's identity is bound, and the line
/// identifier and open time were accepted.
#[derive(Debug, Clone)]
pub struct OpenPacket {
    suite: SuiteId,
    sender: HashnamePublicKey,
    line_identifier: LineIdentifier,
    open_time: Timestamp,
    line_public_key: LinePublicKey,
    origin: Path,
}

impl OpenPacket {
    /// Returns the suite the sender used.
    #[must_use]
    pub const fn suite(&self) -> SuiteId {
        self.suite
    }

    /// Returns the sender's authenticated identity key.
    #[must_use]
    pub const fn sender(&self) -> &HashnamePublicKey {
        &self.sender
    }

    /// Returns the sender's hashname.
    #[must_use]
    pub fn sender_hashname(&self) -> Hashname {
        self.sender.hashname()
    }

    /// Returns the identifier the sender receives on (our outgoing id).
    #[must_use]
    pub const fn line_identifier(&self) -> LineIdentifier {
        self.line_identifier
    }

    /// Returns the sender's declared open time.
    #[must_use]
    pub const fn open_time(&self) -> Timestamp {
        self.open_time
    }

    /// Returns the sender's line public key.
    #[must_use]
    pub const fn line_public_key(&self) -> &LinePublicKey {
        &self.line_public_key
    }

    /// Returns the path the packet arrived on.
    #[must_use]
    pub const fn origin(&self) -> &Path {
        &self.origin
    }
}

impl fmt::Display for OpenPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OPEN[{} line={}]", self.sender_hashname(), self.line_identifier)
    }
}

// ============================================
// Parsing
// ============================================

/// Parses, unwraps and verifies an inbound open packet.
///
/// # Errors
/// - `MalformedPacket`: missing or invalid header fields, or an inner
///   packet that does not decode
/// - `UnsupportedSuite`: unknown `cs` tag
/// - `Crypto`: the open parameter or ciphertext is structurally invalid
/// - `Verification`: signature, destination, line id or time rejected
pub fn parse_open_packet(
    ctx: &PacketContext<'_>,
    header: &Map<String, Value>,
    body: &[u8],
    origin: &Path,
) -> Result<OpenPacket> {
    let header: OpenHeader = serde_json::from_value(Value::Object(header.clone()))
        .map_err(|e| CoreError::malformed(format!("open header: {e}")))?;

    let suite = ctx.protocol.suite_by_tag(&header.cs)?;
    let iv = Iv::from_hex(&header.iv)?;
    let open_parameter = BASE64
        .decode(&header.open)
        .map_err(|e| CoreError::malformed(format!("open parameter: {e}")))?;
    let encrypted_signature = BASE64
        .decode(&header.sig)
        .map_err(|e| CoreError::malformed(format!("signature: {e}")))?;

    let unwrapped = suite.unwrap_open_packet(
        ctx.protocol.identity(),
        &iv,
        &encrypted_signature,
        &open_parameter,
        body,
        origin,
    )?;

    let (inner_header, inner_body) = decode_frame(unwrapped.inner_packet())?;
    let inner: InnerOpenHeader = decode_json_header(inner_header)?;
    let inner_body = inner_body.to_vec();

    let destination: Hashname = inner
        .to
        .parse()
        .map_err(|e| CoreError::malformed(format!("open destination: {e}")))?;
    let line_id_bytes =
        hex::decode(&inner.line).map_err(|e| CoreError::malformed(format!("open line: {e}")))?;
    let line_identifier = LineIdentifier::from_bytes(&line_id_bytes)
        .map_err(|e| CoreError::malformed(format!("open line: {e}")))?;

    let result = suite.verify_open_packet(
        unwrapped,
        &destination,
        &line_id_bytes,
        line_identifier,
        Timestamp::from_millis(inner.at),
        &inner_body,
    );

    match &result {
        Ok(open) => debug!(peer = %open.sender_hashname(), line = %line_identifier, path = %origin, "Open packet verified"),
        Err(e) => warn!(path = %origin, error = %e, "Open packet rejected"),
    }
    result
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use super::*;
    use crate::context::ProtocolContext;
    use crate::line::test_support::context;
    use crate::line::Line;
    use crate::protocol::framing::encode_json_frame;

    /// Renders an open from `from` to `to` and splits it into header and body.
    fn rendered(from: &ProtocolContext, to: &ProtocolContext) -> (Map<String, Value>, Vec<u8>) {
        let pre = from.pre_render_open(to.identity().public()).unwrap();
        split(&from.render_open(&pre).unwrap())
    }

    fn split(bytes: &[u8]) -> (Map<String, Value>, Vec<u8>) {
        let (header, body) = decode_frame(bytes).unwrap();
        (serde_json::from_slice(header).unwrap(), body.to_vec())
    }

    fn parse(ctx: &ProtocolContext, header: &Map<String, Value>, body: &[u8]) -> Result<OpenPacket> {
        let no_lines: HashMap<LineIdentifier, Arc<Line>> = HashMap::new();
        parse_open_packet(
            &PacketContext::new(ctx, &no_lines),
            header,
            body,
            &Path::Local("open".into()),
        )
    }

    fn with_field(header: &Map<String, Value>, field: &str, value: &str) -> Map<String, Value> {
        let mut header = header.clone();
        header.insert(field.to_string(), Value::from(value));
        header
    }

    #[test]
    fn test_parse_verified_open() {
        let a = context(SuiteId::C25519);
        let b = context(SuiteId::C25519);
        let pre = a.pre_render_open(b.identity().public()).unwrap();
        let (header, body) = split(&a.render_open(&pre).unwrap());

        let open = parse(&b, &header, &body).unwrap();
        assert_eq!(open.sender_hashname(), *a.hashname());
        assert_eq!(open.line_identifier(), pre.open().line_identifier());
        assert_eq!(open.open_time(), pre.open().open_time());
        assert_eq!(open.suite(), SuiteId::C25519);
    }

    #[test]
    fn test_iv_must_be_16_bytes() {
        let a = context(SuiteId::C25519);
        let b = context(SuiteId::C25519);
        let (header, body) = rendered(&a, &b);

        for iv in ["00".repeat(8), "00".repeat(17), "zz".repeat(16)] {
            let err = parse(&b, &with_field(&header, "iv", &iv), &body).unwrap_err();
            assert!(matches!(err, CoreError::MalformedPacket { .. }), "{iv}: {err}");
        }
    }

    #[test]
    fn test_non_base64_fields_rejected() {
        let a = context(SuiteId::P256);
        let b = context(SuiteId::P256);
        let (header, body) = rendered(&a, &b);

        for field in ["open", "sig"] {
            let err = parse(&b, &with_field(&header, field, "not*base64!"), &body).unwrap_err();
            assert!(matches!(err, CoreError::MalformedPacket { .. }), "{field}: {err}");
        }
    }

    #[test]
    fn test_unknown_suite_rejected() {
        let a = context(SuiteId::C25519);
        let b = context(SuiteId::C25519);
        let (header, body) = rendered(&a, &b);

        let err = parse(&b, &with_field(&header, "cs", "rsa2048"), &body).unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedSuite(tag) if tag == "rsa2048"));
    }

    #[test]
    fn test_missing_header_field_rejected() {
        let a = context(SuiteId::C25519);
        let b = context(SuiteId::C25519);
        let (mut header, body) = rendered(&a, &b);
        header.remove("sig");

        assert!(matches!(
            parse(&b, &header, &body),
            Err(CoreError::MalformedPacket { .. })
        ));
    }

    #[test]
    fn test_inner_line_must_be_16_bytes() {
        let a = context(SuiteId::C25519);
        let b = context(SuiteId::C25519);
        let pre = a.pre_render_open(b.identity().public()).unwrap();
        let (header, _) = split(&a.render_open(&pre).unwrap());
        let cipher = a.suite(SuiteId::C25519).unwrap().symmetric_cipher();

        for line in ["abcd", "not hex"] {
            let inner_header = InnerOpenHeader {
                to: b.hashname().to_hex(),
                at: Timestamp::now().as_millis(),
                line: line.to_string(),
            };
            let inner = encode_json_frame(&inner_header, a.identity().public().as_bytes()).unwrap();
            let body = cipher
                .encrypt(&inner, pre.material().iv(), pre.inner_key())
                .unwrap();

            let err = parse(&b, &header, &body).unwrap_err();
            assert!(matches!(err, CoreError::MalformedPacket { .. }), "{line}: {err}");
        }
    }
}
