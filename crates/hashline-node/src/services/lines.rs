// ============================================
// File: crates/hashline-node/src/services/lines.rs
// ============================================
//! # Line Management Service
//!
//! ## Creation Reason
//! Holds every established line of the node, answers the line lookups
//! that line-packet parsing needs, and expires lines that went idle.
//!
//! ## Main Functionality
//! - `LineEntry`: A line plus activity and traffic counters
//! - `LineManager`: Thread-safe table keyed by incoming line identifier,
//!   with a per-peer index
//! - `LineRegistry` implementation for `PacketContext`
//!
//! ## Line Lifecycle
//! ```text
//! ┌──────────┐   handshake    ┌─────────────┐   idle > timeout   ┌─────────┐
//! │  (none)  │ ─────────────► │ Established │ ─────────────────► │ Expired │
//! └──────────┘                └──────┬──────┘                    └─────────┘
//!                                    │ new handshake with the same peer
//!                                    ▼
//!                              replaced (rekey)
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Lines are stored in a DashMap for concurrent access
//! - Counters are atomic for lock-free packet handling
//! - No map guard is held while a caller encrypts or decrypts
//! - A peer has at most one line; inserting a new one replaces the old
//! - Inserts are serialized so `max_lines` is a hard cap; lookups and
//!   removals never take that lock
//!
//! ## Last Modified
//! v0.1.0 - Initial line management

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info};

use hashline_common::time::{AtomicInstant, Timestamp};
use hashline_common::types::{Hashname, LineIdentifier};
use hashline_core::line::{Line, LineRegistry};

use crate::error::{NodeError, Result};

// ============================================
// Line Statistics
// ============================================

/// Per-line traffic counters.
#[derive(Debug, Default)]
pub struct LineStats {
    pub bytes_rx: AtomicU64,
    pub bytes_tx: AtomicU64,
    pub packets_rx: AtomicU64,
    pub packets_tx: AtomicU64,
}

impl LineStats {
    pub fn record_rx(&self, bytes: u64) {
        self.bytes_rx.fetch_add(bytes, Ordering::Relaxed);
        self.packets_rx.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tx(&self, bytes: u64) {
        self.bytes_tx.fetch_add(bytes, Ordering::Relaxed);
        self.packets_tx.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            bytes_rx: self.bytes_rx.load(Ordering::Relaxed),
            bytes_tx: self.bytes_tx.load(Ordering::Relaxed),
            packets_rx: self.packets_rx.load(Ordering::Relaxed),
            packets_tx: self.packets_tx.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub bytes_rx: u64,
    pub bytes_tx: u64,
    pub packets_rx: u64,
    pub packets_tx: u64,
}

// ============================================
// LineEntry
// ============================================

/// An established line as tracked by the node.
pub struct LineEntry {
    line: Arc<Line>,
    /// The open packet this node sent for the line, kept so a peer that
    /// missed it can be answered again.
    local_open: Vec<u8>,
    /// Open time of the peer's open that established the line.
    remote_open_time: Timestamp,
    pub last_activity: AtomicInstant,
    pub stats: LineStats,
}

impl LineEntry {
    #[must_use]
    pub fn new(line: Arc<Line>, local_open: Vec<u8>, remote_open_time: Timestamp) -> Self {
        Self {
            line,
            local_open,
            remote_open_time,
            last_activity: AtomicInstant::now(),
            stats: LineStats::default(),
        }
    }

    #[must_use]
    pub const fn line(&self) -> &Arc<Line> {
        &self.line
    }

    #[must_use]
    pub fn local_open(&self) -> &[u8] {
        &self.local_open
    }

    #[must_use]
    pub const fn remote_open_time(&self) -> Timestamp {
        self.remote_open_time
    }

    #[must_use]
    pub fn incoming(&self) -> LineIdentifier {
        self.line.incoming_line_identifier()
    }

    #[must_use]
    pub fn peer(&self) -> Hashname {
        self.line.remote_hashname()
    }

    pub fn touch(&self) {
        self.last_activity.touch();
    }

    #[must_use]
    pub fn idle_time(&self) -> Duration {
        self.last_activity.elapsed()
    }

    #[must_use]
    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.last_activity.has_elapsed(timeout)
    }
}

impl std::fmt::Debug for LineEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineEntry")
            .field("line", &self.line)
            .field("idle_time", &self.idle_time())
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}

// ============================================
// LineManager
// ============================================

/// Manages all established lines.
pub struct LineManager {
    lines: DashMap<LineIdentifier, Arc<LineEntry>>,
    by_peer: DashMap<Hashname, LineIdentifier>,
    insert_lock: Mutex<()>,
    max_lines: usize,
    line_timeout: Duration,
}

impl LineManager {
    #[must_use]
    pub fn new(max_lines: usize, line_timeout: Duration) -> Self {
        Self {
            lines: DashMap::new(),
            by_peer: DashMap::new(),
            insert_lock: Mutex::new(()),
            max_lines,
            line_timeout,
        }
    }

    /// Registers a newly established line, replacing any older line to
    /// the same peer.
    ///
    /// # Errors
    /// - `LineExists` if the incoming identifier is already registered
    /// - `LineLimitReached` if the table is full
    pub fn insert(
        &self,
        line: Arc<Line>,
        local_open: Vec<u8>,
        remote_open_time: Timestamp,
    ) -> Result<Arc<LineEntry>> {
        let incoming = line.incoming_line_identifier();
        let peer = line.remote_hashname();

        let _guard = self.insert_lock.lock();
        let replaced = self.by_peer.get(&peer).map(|r| *r.value());

        if replaced.is_none() && self.lines.len() >= self.max_lines {
            return Err(NodeError::LineLimitReached {
                limit: self.max_lines,
            });
        }

        let entry = Arc::new(LineEntry::new(line, local_open, remote_open_time));
        match self.lines.entry(incoming) {
            Entry::Occupied(_) => return Err(NodeError::LineExists(incoming)),
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::clone(&entry));
            }
        }
        self.by_peer.insert(peer, incoming);

        if let Some(old) = replaced {
            self.lines.remove(&old);
            debug!(peer = %peer, old = %old, new = %incoming, "Line replaced");
        }

        info!(
            peer = %peer,
            incoming = %incoming,
            outgoing = %entry.line().outgoing_line_identifier(),
            "Line registered"
        );

        Ok(entry)
    }

    #[must_use]
    pub fn get(&self, id: &LineIdentifier) -> Option<Arc<LineEntry>> {
        self.lines.get(id).map(|r| Arc::clone(r.value()))
    }

    /// Returns the line to `peer`, if one is established.
    #[must_use]
    pub fn get_by_peer(&self, peer: &Hashname) -> Option<Arc<LineEntry>> {
        let id = *self.by_peer.get(peer)?.value();
        self.get(&id)
    }

    pub fn remove(&self, id: &LineIdentifier) -> Option<Arc<LineEntry>> {
        let removed = self.lines.remove(id).map(|(_, entry)| entry);

        if let Some(ref entry) = removed {
            self.by_peer
                .remove_if(&entry.peer(), |_, current| current == id);
            let stats = entry.stats.snapshot();
            info!(
                line = %id,
                peer = %entry.peer(),
                packets_rx = stats.packets_rx,
                packets_tx = stats.packets_tx,
                "Line removed"
            );
        }

        removed
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Removes lines idle for longer than the configured timeout.
    pub fn cleanup_expired(&self) -> Vec<LineIdentifier> {
        let expired: Vec<_> = self
            .lines
            .iter()
            .filter(|entry| entry.value().is_expired(self.line_timeout))
            .map(|entry| *entry.key())
            .collect();

        for id in &expired {
            debug!(line = %id, "Line expired");
            self.remove(id);
        }

        if !expired.is_empty() {
            info!("Cleaned up {} expired lines", expired.len());
        }

        expired
    }
}

impl LineRegistry for LineManager {
    fn lookup(&self, id: &LineIdentifier) -> Option<Arc<Line>> {
        let entry = self.get(id)?;
        entry.touch();
        Some(Arc::clone(entry.line()))
    }
}

impl std::fmt::Debug for LineManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineManager")
            .field("lines", &self.count())
            .field("max_lines", &self.max_lines)
            .field("line_timeout", &self.line_timeout)
            .finish()
    }
}

// ============================================
// Tests
// ============================================
