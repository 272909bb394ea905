// ============================================
// File: crates/hashline-core/src/crypto/random.rs
// ============================================
//! # Random Source
//!
//! ## Creation Reason
//! Every piece of randomness in the protocol (identity keys, line keys,
//! wrap keys, IVs, line identifiers) flows through one trait so that
//! production always draws from the OS and tests can replay a seed.
//!
//! ## Main Functionality
//! - `RandomSource`: Trait for cryptographically secure bytes
//! - `OsRandom`: Operating system RNG
//! - `SeededRandom`: Deterministic RNG (tests and `test-vectors` only)
//!
//! ## ⚠️ Important Note for Next Developer
//! - `SeededRandom` must never be reachable from a production build
//! - Entropy failures propagate; never substitute zeros
//!
//! ## Last Modified
//! v0.1.0 - Initial random source

use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{CoreError, Result};

/// Source of cryptographically secure random bytes.
pub trait RandomSource: Send + Sync + fmt::Debug {
    /// Fills `dest` with random bytes.
    ///
    /// # Errors
    /// Returns `Entropy` if the source cannot produce bytes.
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<()>;

    /// Returns `n` random bytes.
    ///
    /// # Errors
    /// Returns `Entropy` if the source cannot produce bytes.
    fn random_bytes(&self, n: usize) -> Result<Vec<u8>> {
        let mut bytes = vec![0u8; n];
        self.fill_bytes(&mut bytes)?;
        Ok(bytes)
    }
}

/// The operating system's secure random number generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<()> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| CoreError::entropy(e.to_string()))
    }
}

/// Deterministic random source for reproducible test vectors.
#[cfg(any(test, feature = "test-vectors"))]
pub struct SeededRandom(parking_lot::Mutex<rand::rngs::StdRng>);

#[cfg(any(test, feature = "test-vectors"))]
impl SeededRandom {
    /// Creates a source that replays the stream for `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        use rand::SeedableRng;
        Self(parking_lot::Mutex::new(rand::rngs::StdRng::seed_from_u64(seed)))
    }
}

#[cfg(any(test, feature = "test-vectors"))]
impl fmt::Debug for SeededRandom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SeededRandom")
    }
}

#[cfg(any(test, feature = "test-vectors"))]
impl RandomSource for SeededRandom {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<()> {
        self.0.lock().fill_bytes(dest);
        Ok(())
    }
}

// ============================================
// Tests
// ============================================
