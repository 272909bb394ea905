// ============================================
// File: crates/hashline-node/src/services/handshake.rs
// ============================================
//! # Handshake Service
//!
//! ## Creation Reason
//! Orchestrates the open-packet exchange between two nodes: it keeps the
//! opens this node has sent, answers opens it receives, and promotes a
//! completed exchange to a line registered with the `LineManager`.
//!
//! ## Main Functionality
//! - `HandshakeService::initiate`: Send (or resend) an open to a peer
//! - `HandshakeService::complete`: Accept a verified open from a peer
//! - Stale pending opens are dropped after the freshness window
//!
//! ## Handshake Flow
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    HandshakeService                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  1. Receive verified OpenPacket                              │
//! │     │                                                        │
//! │     ▼                                                        │
//! │  2. Retransmission of a known line? ── yes ──► resend ours   │
//! │     │ no                                                     │
//! │     ▼                                                        │
//! │  3. Take our pending open, or pre-render a reply             │
//! │     │                                                        │
//! │     ▼                                                        │
//! │  4. Line::establish (derive line keys)                       │
//! │     │                                                        │
//! │     ▼                                                        │
//! │  5. Register line (LineManager)                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Opens reaching this service are already verified by the core parser
//! - A pending open is consumed by exactly one line
//! - Simultaneous opens from both sides settle on one line each way
//!   without a reply
//! - An open older than the live line's (a replay) is rejected and never
//!   replaces that line
//!
//! ## Last Modified
//! v0.1.0 - Initial handshake service

use std::sync::Arc;
use std::time::Instant;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info};

use hashline_common::types::Hashname;
use hashline_core::{
    CoreError, HashnamePublicKey, Line, OpenPacket, PreRenderedOpen, ProtocolContext,
};

use crate::error::Result;
use crate::services::LineManager;

// ============================================
// Types
// ============================================

/// An open this node sent and has not yet seen answered.
struct PendingOpen {
    open: PreRenderedOpen,
    rendered: Vec<u8>,
    started: Instant,
}

/// What `complete` did with an inbound open.
#[derive(Debug)]
pub enum HandshakeOutcome {
    /// A new line is up. `reply` holds our open when the peer initiated.
    Established {
        line: Arc<Line>,
        reply: Option<Vec<u8>>,
    },
    /// The open belongs to a line that already exists; the peer probably
    /// missed our open, which is returned for resending.
    Duplicate { line: Arc<Line>, reply: Vec<u8> },
}

// ============================================
// HandshakeService
// ============================================

/// High-level handshake orchestration service.
pub struct HandshakeService {
    context: Arc<ProtocolContext>,
    lines: Arc<LineManager>,
    pending: DashMap<Hashname, PendingOpen>,
}

impl HandshakeService {
    #[must_use]
    pub fn new(context: Arc<ProtocolContext>, lines: Arc<LineManager>) -> Self {
        Self {
            context,
            lines,
            pending: DashMap::new(),
        }
    }

    /// Returns the open packet to send to `peer`.
    ///
    /// A fresh pending open is reused so retransmissions are identical;
    /// a stale one is replaced.
    ///
    /// # Errors
    /// Returns core errors from pre-rendering or rendering.
    pub fn initiate(&self, peer: &HashnamePublicKey) -> Result<Vec<u8>> {
        let hashname = peer.hashname();

        match self.pending.entry(hashname) {
            Entry::Occupied(mut occupied) => {
                if !self.is_stale(occupied.get()) {
                    debug!(peer = %hashname, "Resending pending open");
                    return Ok(occupied.get().rendered.clone());
                }
                debug!(peer = %hashname, "Pending open went stale, rendering a new one");
                let pending = self.render_pending(peer)?;
                let rendered = pending.rendered.clone();
                occupied.insert(pending);
                Ok(rendered)
            }
            Entry::Vacant(vacant) => {
                let pending = self.render_pending(peer)?;
                let rendered = pending.rendered.clone();
                info!(
                    peer = %hashname,
                    line = %pending.open.open().line_identifier(),
                    "Open initiated"
                );
                vacant.insert(pending);
                Ok(rendered)
            }
        }
    }

    /// Completes a handshake with a verified inbound open.
    ///
    /// # Errors
    /// - Core errors if the line cannot be established
    /// - `Verification` if the open is not newer than the peer's live line
    /// - `LineLimitReached` / `LineExists` from the line table
    pub fn complete(&self, remote: &OpenPacket) -> Result<HandshakeOutcome> {
        let peer = remote.sender_hashname();

        if let Some(entry) = self.lines.get_by_peer(&peer) {
            if entry.line().outgoing_line_identifier() == remote.line_identifier() {
                debug!(peer = %peer, line = %remote.line_identifier(), "Duplicate open");
                return Ok(HandshakeOutcome::Duplicate {
                    line: Arc::clone(entry.line()),
                    reply: entry.local_open().to_vec(),
                });
            }
            // Only a strictly newer open may replace a live line.
            if remote.open_time() <= entry.remote_open_time() {
                return Err(CoreError::verification(format!(
                    "open at {} ms is not newer than the current line's {} ms",
                    remote.open_time().as_millis(),
                    entry.remote_open_time().as_millis()
                ))
                .into());
            }
        }

        let (local, rendered, reply) = match self.take_fresh_pending(&peer) {
            Some(pending) => (pending.open, pending.rendered, None),
            None => {
                let pending = self.render_pending(remote.sender())?;
                let reply = pending.rendered.clone();
                (pending.open, pending.rendered, Some(reply))
            }
        };

        let line = Arc::new(Line::establish(local, remote, Arc::clone(&self.context))?);
        self.lines
            .insert(Arc::clone(&line), rendered, remote.open_time())?;

        info!(
            peer = %peer,
            outgoing = %line.outgoing_line_identifier(),
            incoming = %line.incoming_line_identifier(),
            initiated_locally = reply.is_none(),
            "Handshake completed"
        );

        Ok(HandshakeOutcome::Established { line, reply })
    }

    /// Drops pending opens older than the freshness window.
    pub fn cleanup_stale(&self) -> usize {
        let before = self.pending.len();
        self.pending.retain(|_, pending| !self.is_stale(pending));
        let removed = before.saturating_sub(self.pending.len());
        if removed > 0 {
            debug!("Dropped {} stale pending opens", removed);
        }
        removed
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    // ========================================
    // Internal
    // ========================================

    fn render_pending(&self, peer: &HashnamePublicKey) -> Result<PendingOpen> {
        let open = self.context.pre_render_open(peer)?;
        let rendered = self.context.render_open(&open)?;
        Ok(PendingOpen {
            open,
            rendered,
            started: Instant::now(),
        })
    }

    fn take_fresh_pending(&self, peer: &Hashname) -> Option<PendingOpen> {
        let (_, pending) = self.pending.remove(peer)?;
        if self.is_stale(&pending) {
            debug!(peer = %peer, "Ignoring stale pending open");
            return None;
        }
        Some(pending)
    }

    fn is_stale(&self, pending: &PendingOpen) -> bool {
        pending.started.elapsed() > self.context.config().open_time_window
    }
}

impl std::fmt::Debug for HandshakeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandshakeService")
            .field("hashname", self.context.hashname())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================
