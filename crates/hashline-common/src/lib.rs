// ============================================
// File: crates/hashline-common/src/lib.rs
// ============================================
//! # Hashline Common - Shared Types Library
//!
//! ## Creation Reason
//! Provides the identifiers, time helpers and base error type shared by
//! every hashline crate so that wire-level representations stay consistent.
//!
//! ## Main Functionality
//! - [`types`]: `LineIdentifier`, `Hashname`, `Path`
//! - [`time`]: Millisecond timestamps and lock-free instants
//! - [`error`]: `CommonError` and the crate `Result` alias
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                hashline-node                        │
//! │                      │                              │
//! │                      ▼                              │
//! │                hashline-core                        │
//! │                      │                              │
//! │                      ▼                              │
//! │               hashline-common  ◄── You are here     │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - This crate is the foundation - changes affect everything
//! - Keep dependencies minimal
//! - Wire formats (hex encodings, ms timestamps) must not change silently
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod time;
pub mod types;

// Re-export commonly used items at crate root
pub use error::{CommonError, Result};
pub use time::Timestamp;
pub use types::{Hashname, LineIdentifier, Path};
