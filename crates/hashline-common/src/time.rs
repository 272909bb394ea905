// ============================================
// File: crates/hashline-common/src/time.rs
// ============================================
//! # Time Utilities
//!
//! ## Creation Reason
//! Provides time-related utilities: lock-free activity instants for the
//! line registry and the millisecond timestamps carried in open packets.
//!
//! ## Main Functionality
//! - `AtomicInstant`: Thread-safe wrapper around `Instant`
//! - `Timestamp`: Unix timestamp in milliseconds with freshness checks
//!
//! ## Main Logical Flow
//! 1. Lines store `AtomicInstant` for last activity tracking
//! 2. Expiry sweeps read these atomically for cleanup decisions
//! 3. Packet handlers update atomically without locks
//! 4. Open packets carry `Timestamp` millis, checked against a window
//!
//! ## ⚠️ Important Note for Next Developer
//! - `AtomicInstant` uses `AtomicU64` internally (nanoseconds since start)
//! - Be aware of potential overflow after ~584 years of uptime
//! - `Timestamp` is milliseconds, not seconds; the wire field `at` uses it
//!
//! ## Last Modified
//! v0.1.0 - Initial time utilities

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

// ============================================
// Constants
// ============================================

/// Default freshness window for open packet timestamps (30 seconds).
pub const DEFAULT_OPEN_WINDOW: Duration = Duration::from_secs(30);

// ============================================
// AtomicInstant
// ============================================

/// Last-activity instant that can be updated through `&self`.
///
/// Stored as nanoseconds past a process-wide base instant, so packet
/// handlers can touch it while expiry sweeps read it, without a lock.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use hashline_common::time::AtomicInstant;
///
/// let activity = AtomicInstant::now();
/// activity.touch();
/// assert!(!activity.has_elapsed(Duration::from_secs(60)));
/// ```
#[derive(Debug)]
pub struct AtomicInstant {
    nanos: AtomicU64,
}

impl AtomicInstant {
    fn base() -> Instant {
        use std::sync::OnceLock;
        static BASE: OnceLock<Instant> = OnceLock::new();
        *BASE.get_or_init(Instant::now)
    }

    fn to_nanos(instant: Instant) -> u64 {
        instant
            .checked_duration_since(Self::base())
            .map_or(0, |d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
    }

    /// Creates an `AtomicInstant` set to the current time.
    #[must_use]
    pub fn now() -> Self {
        Self {
            nanos: AtomicU64::new(Self::to_nanos(Instant::now())),
        }
    }

    /// Loads the stored instant.
    #[must_use]
    pub fn load(&self) -> Instant {
        Self::base() + Duration::from_nanos(self.nanos.load(Ordering::Relaxed))
    }

    /// Sets the stored instant to now and returns the previous value.
    pub fn touch(&self) -> Instant {
        let previous = self
            .nanos
            .swap(Self::to_nanos(Instant::now()), Ordering::Relaxed);
        Self::base() + Duration::from_nanos(previous)
    }

    /// Returns the time elapsed since the stored instant.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.load().elapsed()
    }

    /// Checks if more than `duration` has elapsed since the stored instant.
    #[must_use]
    pub fn has_elapsed(&self, duration: Duration) -> bool {
        self.elapsed() > duration
    }
}

// ============================================
// Timestamp
// ============================================

/// Unix timestamp in milliseconds.
///
/// # Purpose
/// Carried as `at` in the inner open packet and compared against the
/// receiver's clock to reject stale or far-future handshakes.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use hashline_common::time::Timestamp;
///
/// let now = Timestamp::now();
/// assert!(now.is_within(Duration::from_secs(1)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from Unix milliseconds.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Creates a timestamp for the current time.
    ///
    /// A clock set before the epoch yields zero, which then fails any
    /// freshness check rather than panicking.
    #[must_use]
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX));
        Self(millis)
    }

    /// Returns the Unix timestamp in milliseconds.
    #[must_use]
    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    /// Returns the signed difference from the current time in milliseconds.
    ///
    /// Positive values mean the timestamp is in the future.
    #[must_use]
    pub fn offset_from_now(&self) -> i64 {
        self.0.saturating_sub(Self::now().0)
    }

    /// Checks that `|timestamp - now| <= window`.
    #[must_use]
    pub fn is_within(&self, window: Duration) -> bool {
        let window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        self.offset_from_now().unsigned_abs() <= window_ms
    }

    /// Returns a timestamp shifted by `delta` milliseconds.
    #[must_use]
    pub const fn offset_by(&self, delta: i64) -> Self {
        Self(self.0.saturating_add(delta))
    }
}

impl From<i64> for Timestamp {
    fn from(millis: i64) -> Self {
        Self(millis)
    }
}

impl From<Timestamp> for i64 {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

// ============================================
// Tests
// ============================================
