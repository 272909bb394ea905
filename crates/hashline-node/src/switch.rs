// ============================================
// File: crates/hashline-node/src/switch.rs
// ============================================
//! # Switch
//!
//! ## Creation Reason
//! Ties the protocol context, the handshake service and the line table
//! together into the object a transport feeds datagrams into.
//!
//! ## Main Functionality
//! - `Switch::open`: Start (or resend) a handshake with a peer
//! - `Switch::receive`: Parse one inbound datagram and act on it
//! - `Switch::send`: Wrap a channel packet in a line packet to a peer
//! - Background cleanup of idle lines and stale pending opens
//!
//! ## Datagram Flow
//! ```text
//! datagram ──► Packet::parse ──┬── open ──► HandshakeService ──► Established / Duplicate
//!                              ├── line ──► LineStats ─────────► Channel
//!                              └── other ─────────────────────► Custom
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The switch never touches sockets; callers write the returned bytes
//! - A bad datagram is an `Err` from `receive`, never a panic, and leaves
//!   every line untouched
//! - Use `receive_or_drop` from transport loops so failures are logged
//!   at the right level
//!
//! ## Last Modified
//! v0.1.0 - Initial switch implementation

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use hashline_common::types::{Hashname, Path};
use hashline_core::protocol::CustomPacket;
use hashline_core::{
    ChannelPacket, HashnamePublicKey, IdentityKeyPair, Line, LinePacket, Packet, PacketContext,
    ProtocolContext,
};

use crate::config::NodeConfig;
use crate::error::{NodeError, Result};
use crate::services::{HandshakeOutcome, HandshakeService, LineManager};

// ============================================
// Received
// ============================================

/// What an inbound datagram turned into.
#[derive(Debug)]
pub enum Received {
    /// A handshake completed. `reply` must be sent back when present.
    Established {
        peer: Hashname,
        line: Arc<Line>,
        reply: Option<Vec<u8>>,
    },
    /// A retransmitted open for an existing line; `reply` resends ours.
    Duplicate { peer: Hashname, reply: Vec<u8> },
    /// A channel packet arrived on an established line.
    Channel {
        peer: Hashname,
        packet: ChannelPacket,
    },
    /// A packet of a type registered by the application.
    Custom(CustomPacket),
}

// ============================================
// Switch
// ============================================

/// A hashline node without its transport.
///
/// # Lifecycle
/// 1. Create with `Switch::new(identity, &config)`
/// 2. Optionally start `spawn_cleanup_task`
/// 3. Feed datagrams to `receive`, send what `open`/`send` return
/// 4. Call `shutdown` to stop background tasks
pub struct Switch {
    context: Arc<ProtocolContext>,
    lines: Arc<LineManager>,
    handshake: HandshakeService,
    shutdown_tx: broadcast::Sender<()>,
}

impl Switch {
    /// Creates a switch for `identity`.
    ///
    /// # Errors
    /// Returns `ConfigInvalid` if the configuration is invalid or names a
    /// different suite than the identity uses.
    pub fn new(identity: IdentityKeyPair, config: &NodeConfig) -> Result<Self> {
        config.validate()?;
        let protocol_config = config.to_protocol_config()?;
        if protocol_config.default_suite != identity.suite() {
            return Err(NodeError::config_invalid(
                "handshake.cipher_suite",
                format!(
                    "configured {} but identity uses {}",
                    protocol_config.default_suite,
                    identity.suite()
                ),
            ));
        }

        let context = Arc::new(ProtocolContext::new(identity, protocol_config));
        let lines = Arc::new(LineManager::new(
            config.lines.max_lines,
            config.line_timeout(),
        ));
        let handshake = HandshakeService::new(Arc::clone(&context), Arc::clone(&lines));
        let (shutdown_tx, _) = broadcast::channel(1);

        info!(hashname = %context.hashname(), suite = %context.identity().suite(), "Switch created");

        Ok(Self {
            context,
            lines,
            handshake,
            shutdown_tx,
        })
    }

    #[must_use]
    pub fn hashname(&self) -> &Hashname {
        self.context.hashname()
    }

    #[must_use]
    pub fn public_key(&self) -> &HashnamePublicKey {
        self.context.identity().public()
    }

    #[must_use]
    pub const fn context(&self) -> &Arc<ProtocolContext> {
        &self.context
    }

    #[must_use]
    pub const fn lines(&self) -> &Arc<LineManager> {
        &self.lines
    }

    #[must_use]
    pub const fn handshake(&self) -> &HandshakeService {
        &self.handshake
    }

    /// Returns the open packet to send to `peer`.
    ///
    /// Opening a peer that already has a line rekeys it once the peer
    /// answers.
    ///
    /// # Errors
    /// Returns core errors from pre-rendering or rendering.
    pub fn open(&self, peer: &HashnamePublicKey) -> Result<Vec<u8>> {
        self.handshake.initiate(peer)
    }

    /// Handles one inbound datagram.
    ///
    /// # Errors
    /// - Core parse errors (malformed, unknown line, verification)
    /// - Line table errors while registering a new line
    pub fn receive(&self, datagram: &[u8], origin: &Path) -> Result<Received> {
        let ctx = PacketContext::new(&self.context, self.lines.as_ref());

        match Packet::parse(&ctx, datagram, origin)? {
            Packet::Open(open) => {
                let peer = open.sender_hashname();
                match self.handshake.complete(&open)? {
                    HandshakeOutcome::Established { line, reply } => {
                        Ok(Received::Established { peer, line, reply })
                    }
                    HandshakeOutcome::Duplicate { reply, .. } => {
                        Ok(Received::Duplicate { peer, reply })
                    }
                }
            }
            Packet::Line(packet) => {
                let line = packet.line();
                if let Some(entry) = self.lines.get(&line.incoming_line_identifier()) {
                    entry.stats.record_rx(datagram.len() as u64);
                }
                let peer = line.remote_hashname();
                Ok(Received::Channel {
                    peer,
                    packet: packet.into_channel_packet(),
                })
            }
            Packet::Custom(packet) => Ok(Received::Custom(packet)),
        }
    }

    /// Like `receive`, but logs and drops failures.
    ///
    /// Verification failures log at `warn`, malformed or unroutable
    /// datagrams at `debug`, and anything else at `info`.
    pub fn receive_or_drop(&self, datagram: &[u8], origin: &Path) -> Option<Received> {
        match self.receive(datagram, origin) {
            Ok(received) => Some(received),
            Err(NodeError::Core(e)) if e.is_suspicious() => {
                warn!(origin = %origin, error = %e, "Dropped suspicious packet");
                None
            }
            Err(NodeError::Core(e)) if e.is_protocol_error() => {
                debug!(origin = %origin, error = %e, "Dropped malformed packet");
                None
            }
            Err(e) => {
                info!(origin = %origin, error = %e, "Dropped packet");
                None
            }
        }
    }

    /// Encrypts `packet` onto the line to `peer`.
    ///
    /// # Errors
    /// Returns `NoLineToPeer` if no line is established.
    pub fn send(&self, peer: &Hashname, packet: ChannelPacket) -> Result<Vec<u8>> {
        let entry = self
            .lines
            .get_by_peer(peer)
            .ok_or(NodeError::NoLineToPeer(*peer))?;

        let bytes = LinePacket::new(Arc::clone(entry.line()), Some(packet)).render()?;
        entry.stats.record_tx(bytes.len() as u64);
        entry.touch();
        Ok(bytes)
    }

    /// Tears down the line to `peer`. Returns `false` if there was none.
    pub fn close(&self, peer: &Hashname) -> bool {
        self.lines
            .get_by_peer(peer)
            .and_then(|entry| self.lines.remove(&entry.incoming()))
            .is_some()
    }

    // ========================================
    // Background Tasks
    // ========================================

    /// Spawns the periodic cleanup of idle lines and stale pending opens.
    pub fn spawn_cleanup_task(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let switch = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(period);

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        debug!("Cleanup task received shutdown signal");
                        break;
                    }
                    _ = interval_timer.tick() => {
                        let expired = switch.lines.cleanup_expired();
                        let stale = switch.handshake.cleanup_stale();

                        debug!(
                            lines = switch.lines.count(),
                            expired = expired.len(),
                            pending = switch.handshake.pending_count(),
                            stale,
                            "Cleanup cycle complete"
                        );
                    }
                }
            }

            debug!("Cleanup task exiting");
        })
    }

    /// Signals background tasks to stop.
    pub fn shutdown(&self) {
        info!("Switch shutting down");
        // No receivers just means no task was spawned.
        let _ = self.shutdown_tx.send(());
    }
}

impl std::fmt::Debug for Switch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Switch")
            .field("hashname", self.hashname())
            .field("lines", &self.lines)
            .field("handshake", &self.handshake)
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use hashline_core::crypto::suite;
    use hashline_core::{CoreError, OsRandom, SuiteId};

    fn switch_with(config: &NodeConfig) -> Arc<Switch> {
        let suite_id = config.handshake.suite().unwrap();
        let identity = suite::for_id(suite_id).generate_identity(&OsRandom).unwrap();
        Arc::new(Switch::new(identity, config).unwrap())
    }

    fn switch() -> Arc<Switch> {
        switch_with(&NodeConfig::default())
    }

    fn path(name: &str) -> Path {
        Path::Local(name.into())
    }

    /// Runs a full handshake from `a` to `b`.
    fn connect(a: &Switch, b: &Switch) {
        let open_a = a.open(b.public_key()).unwrap();
        let Received::Established {
            reply: Some(open_b),
            ..
        } = b.receive(&open_a, &path("a")).unwrap()
        else {
            panic!("responder must reply");
        };
        let Received::Established { reply: None, .. } = a.receive(&open_b, &path("b")).unwrap()
        else {
            panic!("initiator must not reply");
        };
    }

    #[test]
    fn test_loopback_channel_both_ways() {
        let a = switch();
        let b = switch();
        connect(&a, &b);

        let ping = ChannelPacket::empty()
            .with_field("type", "ping")
            .with_field("seq", 1);
        let wire = a.send(b.hashname(), ping.clone()).unwrap();
        match b.receive(&wire, &path("a")).unwrap() {
            Received::Channel { peer, packet } => {
                assert_eq!(peer, *a.hashname());
                assert_eq!(packet, ping);
            }
            other => panic!("expected channel packet, got {other:?}"),
        }

        let pong = ChannelPacket::new(serde_json::Map::new(), b"pong".to_vec());
        let wire = b.send(a.hashname(), pong.clone()).unwrap();
        match a.receive(&wire, &path("b")).unwrap() {
            Received::Channel { packet, .. } => assert_eq!(packet, pong),
            other => panic!("expected channel packet, got {other:?}"),
        }

        let stats = a.lines().get_by_peer(b.hashname()).unwrap().stats.snapshot();
        assert_eq!(stats.packets_tx, 1);
        assert_eq!(stats.packets_rx, 1);
    }

    #[test]
    fn test_loopback_p256() {
        let mut config = NodeConfig::default();
        config.handshake.cipher_suite = "p256".to_string();
        let a = switch_with(&config);
        let b = switch_with(&config);
        connect(&a, &b);

        let wire = a.send(b.hashname(), ChannelPacket::empty()).unwrap();
        assert!(matches!(
            b.receive(&wire, &path("a")).unwrap(),
            Received::Channel { .. }
        ));
    }

    #[test]
    fn test_send_without_line() {
        let a = switch();
        let b = switch();
        let err = a.send(b.hashname(), ChannelPacket::empty()).unwrap_err();
        assert!(matches!(err, NodeError::NoLineToPeer(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_bad_datagrams_dropped() {
        let a = switch();
        let b = switch();
        connect(&a, &b);

        assert!(a.receive_or_drop(b"garbage", &path("x")).is_none());
        assert!(a.receive_or_drop(&[], &path("x")).is_none());

        let mut wire = b.send(a.hashname(), ChannelPacket::empty()).unwrap();
        let last = wire.len() - 1;
        wire[last] ^= 0xff;
        // Flipping ciphertext either garbles the channel frame or survives
        // as a different body; the line must stay up either way.
        let _ = a.receive_or_drop(&wire, &path("b"));
        assert_eq!(a.lines().count(), 1);
    }

    #[test]
    fn test_open_for_wrong_recipient() {
        let a = switch();
        let b = switch();
        let c = switch();

        let open_for_b = a.open(b.public_key()).unwrap();
        let err = c.receive(&open_for_b, &path("a")).unwrap_err();
        assert!(matches!(err, NodeError::Core(_)));
        assert!(err.is_packet_local());
        assert!(c.lines().is_empty());
    }

    #[test]
    fn test_unknown_line() {
        let a = switch();
        let b = switch();
        let c = switch();
        connect(&a, &b);

        let wire = a.send(b.hashname(), ChannelPacket::empty()).unwrap();
        let err = c.receive(&wire, &path("a")).unwrap_err();
        assert!(matches!(err, NodeError::Core(CoreError::UnknownLine { .. })));
    }

    #[test]
    fn test_duplicate_open_resends_reply() {
        let a = switch();
        let b = switch();

        let open_a = a.open(b.public_key()).unwrap();
        let Received::Established {
            reply: Some(open_b),
            ..
        } = b.receive(&open_a, &path("a")).unwrap()
        else {
            panic!("responder must reply");
        };

        match b.receive(&open_a, &path("a")).unwrap() {
            Received::Duplicate { peer, reply } => {
                assert_eq!(peer, *a.hashname());
                assert_eq!(reply, open_b);
            }
            other => panic!("expected duplicate, got {other:?}"),
        }
    }

    #[test]
    fn test_rekey_replaces_line() {
        let a = switch();
        let b = switch();
        connect(&a, &b);
        let first = a.lines().get_by_peer(b.hashname()).unwrap();

        std::thread::sleep(Duration::from_millis(5));
        connect(&a, &b);
        let second = a.lines().get_by_peer(b.hashname()).unwrap();
        assert_ne!(first.incoming(), second.incoming());
        assert_eq!(a.lines().count(), 1);
        assert_eq!(b.lines().count(), 1);

        let wire = a.send(b.hashname(), ChannelPacket::empty()).unwrap();
        assert!(matches!(
            b.receive(&wire, &path("a")).unwrap(),
            Received::Channel { .. }
        ));
    }

    #[test]
    fn test_replayed_open_dropped_after_rekey() {
        let a = switch();
        let b = switch();

        let first_open = a.open(b.public_key()).unwrap();
        let Received::Established {
            reply: Some(reply), ..
        } = b.receive(&first_open, &path("a")).unwrap()
        else {
            panic!("responder must reply");
        };
        a.receive(&reply, &path("b")).unwrap();

        std::thread::sleep(Duration::from_millis(5));
        connect(&a, &b);

        assert!(b.receive_or_drop(&first_open, &path("replay")).is_none());
        assert_eq!(b.lines().count(), 1);

        let wire = a.send(b.hashname(), ChannelPacket::empty()).unwrap();
        assert!(matches!(
            b.receive(&wire, &path("a")).unwrap(),
            Received::Channel { .. }
        ));
    }

    #[test]
    fn test_close() {
        let a = switch();
        let b = switch();
        connect(&a, &b);
        assert!(a.close(b.hashname()));
        assert!(!a.close(b.hashname()));
        assert!(a.lines().is_empty());
    }

    #[test]
    fn test_suite_mismatch_rejected() {
        let identity = suite::for_id(SuiteId::P256)
            .generate_identity(&OsRandom)
            .unwrap();
        let err = Switch::new(identity, &NodeConfig::default()).unwrap_err();
        assert!(err.is_config_error());
    }

    #[tokio::test]
    async fn test_cleanup_task_stops_on_shutdown() {
        let a = switch();
        let task = a.spawn_cleanup_task(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(30)).await;
        a.shutdown();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
