// ============================================
// File: crates/hashline-core/src/line.rs
// ============================================
//! # Lines
//!
//! ## Creation Reason
//! A line is what a completed handshake leaves behind: two 16-byte
//! identifiers and the symmetric keys bound to them. Line packets borrow a
//! line for one render or parse call.
//!
//! ## Main Functionality
//! - `Line`: Identifier pair, derived keys, remote peer, shared context
//! - [`Line::establish`]: Promotion from our pre-rendered open and the
//!   peer's verified open
//! - `LineRegistry`: The lookup line packets are parsed against
//!
//! ## Key Schedule
//! ```text
//! secret = DH(L_local, L_remote)
//! enc    = kdf(secret, "line" || outgoing || incoming)
//! dec    = kdf(secret, "line" || incoming || outgoing)
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Promotion consumes the `PreRenderedOpen`; the line private key is
//!   dropped (and zeroized) right after derivation
//! - Lines are immutable; rekeying means a new handshake and a new `Line`
//!
//! ## Last Modified
//! v0.1.0 - Initial line type

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use hashline_common::time::Timestamp;
use hashline_common::types::{Hashname, LineIdentifier};

use crate::context::ProtocolContext;
use crate::crypto::keys::{HashnamePublicKey, SuiteId, SymmetricKey};
use crate::crypto::suite::CipherSuite;
use crate::error::{CoreError, Result};
use crate::protocol::open::{OpenPacket, PreRenderedOpen};

// ============================================
// Line
// ============================================

/// An established secure session with one remote peer.
pub struct Line {
    suite: Arc<dyn CipherSuite>,
    outgoing: LineIdentifier,
    incoming: LineIdentifier,
    encryption_key: SymmetricKey,
    decryption_key: SymmetricKey,
    remote: HashnamePublicKey,
    context: Arc<ProtocolContext>,
    opened_at: Timestamp,
}

impl Line {
    /// Promotes a completed handshake to a line.
    ///
    /// `local` is the open we sent (it carries our incoming identifier and
    /// line private key); `remote` is the peer's verified open (it carries
    /// our outgoing identifier and the peer's line public key).
    ///
    /// # Errors
    /// - `UnsupportedSuite`: the two opens use different suites
    /// - `Verification`: `remote` was not sent by the peer `local` addressed
    /// - `Crypto`: the line key agreement failed
    pub fn establish(
        local: PreRenderedOpen,
        remote: &OpenPacket,
        context: Arc<ProtocolContext>,
    ) -> Result<Self> {
        if local.suite() != remote.suite() {
            return Err(CoreError::UnsupportedSuite(remote.suite().tag().to_string()));
        }
        if local.open().recipient() != remote.sender() {
            return Err(CoreError::verification("open packet is from another peer"));
        }

        let suite = Arc::clone(context.suite(remote.suite())?);
        let (open, line_private_key) = local.into_line_parts();
        let incoming = open.line_identifier();
        let outgoing = remote.line_identifier();

        let (encryption_key, decryption_key) = suite.derive_line_keys(
            line_private_key,
            remote.line_public_key(),
            &outgoing,
            &incoming,
        )?;

        debug!(
            peer = %remote.sender_hashname(),
            outgoing = %outgoing,
            incoming = %incoming,
            suite = %suite.id(),
            "Line established"
        );

        Ok(Self {
            suite,
            outgoing,
            incoming,
            encryption_key,
            decryption_key,
            remote: remote.sender().clone(),
            context,
            opened_at: Timestamp::now(),
        })
    }

    /// Returns the key outbound line packets are encrypted with.
    #[must_use]
    pub const fn encryption_key(&self) -> &SymmetricKey {
        &self.encryption_key
    }

    /// Returns the key inbound line packets are decrypted with.
    #[must_use]
    pub const fn decryption_key(&self) -> &SymmetricKey {
        &self.decryption_key
    }

    /// Returns the identifier the peer receives on.
    #[must_use]
    pub const fn outgoing_line_identifier(&self) -> LineIdentifier {
        self.outgoing
    }

    /// Returns the identifier we receive on.
    #[must_use]
    pub const fn incoming_line_identifier(&self) -> LineIdentifier {
        self.incoming
    }

    /// Returns the peer's identity key.
    #[must_use]
    pub const fn remote_peer(&self) -> &HashnamePublicKey {
        &self.remote
    }

    /// Returns the peer's hashname.
    #[must_use]
    pub fn remote_hashname(&self) -> Hashname {
        self.remote.hashname()
    }

    /// Returns the shared protocol context.
    #[must_use]
    pub const fn protocol_context(&self) -> &Arc<ProtocolContext> {
        &self.context
    }

    /// Returns the suite the line was negotiated with.
    #[must_use]
    pub fn suite(&self) -> &dyn CipherSuite {
        self.suite.as_ref()
    }

    /// Returns the suite identifier.
    #[must_use]
    pub fn suite_id(&self) -> SuiteId {
        self.suite.id()
    }

    /// Returns when the line was established.
    #[must_use]
    pub const fn opened_at(&self) -> Timestamp {
        self.opened_at
    }
}

impl fmt::Debug for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Line")
            .field("suite", &self.suite.id())
            .field("outgoing", &self.outgoing)
            .field("incoming", &self.incoming)
            .field("remote", &self.remote.hashname())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.outgoing)
    }
}

// ============================================
// LineRegistry
// ============================================

/// Resolves an incoming line identifier to its line.
///
/// Implementations must be safe to call from many threads at once.
pub trait LineRegistry: Send + Sync {
    /// Returns the line whose incoming identifier is `id`.
    fn lookup(&self, id: &LineIdentifier) -> Option<Arc<Line>>;
}

impl LineRegistry for HashMap<LineIdentifier, Arc<Line>> {
    fn lookup(&self, id: &LineIdentifier) -> Option<Arc<Line>> {
        self.get(id).cloned()
    }
}

// ============================================
// Test Support
// ============================================

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::context::{PacketContext, ProtocolConfig};
    use crate::crypto::random::OsRandom;
    use crate::crypto::suite;
    use crate::protocol::Packet;
    use hashline_common::types::Path;

    pub fn context(suite_id: SuiteId) -> Arc<ProtocolContext> {
        let identity = suite::for_id(suite_id).generate_identity(&OsRandom).unwrap();
        Arc::new(ProtocolContext::new(identity, ProtocolConfig::default()))
    }

    pub fn receive_open(ctx: &ProtocolContext, bytes: &[u8]) -> OpenPacket {
        let no_lines: HashMap<LineIdentifier, Arc<Line>> = HashMap::new();
        let packet_ctx = PacketContext::new(ctx, &no_lines);
        match Packet::parse(&packet_ctx, bytes, &Path::Local("test".into())).unwrap() {
            Packet::Open(open) => open,
            other => panic!("expected open, got {other}"),
        }
    }

    /// Runs a full handshake between two fresh nodes and returns both ends.
    pub fn line_pair(suite_id: SuiteId) -> (Arc<Line>, Arc<Line>) {
        let a = context(suite_id);
        let b = context(suite_id);

        let a_open = a.pre_render_open(b.identity().public()).unwrap();
        let b_open = b.pre_render_open(a.identity().public()).unwrap();
        let a_bytes = a.render_open(&a_open).unwrap();
        let b_bytes = b.render_open(&b_open).unwrap();

        let at_b = receive_open(&b, &a_bytes);
        let at_a = receive_open(&a, &b_bytes);

        let a_line = Line::establish(a_open, &at_a, Arc::clone(&a)).unwrap();
        let b_line = Line::establish(b_open, &at_b, Arc::clone(&b)).unwrap();
        (Arc::new(a_line), Arc::new(b_line))
    }
}

// ============================================
// Tests
// ============================================
