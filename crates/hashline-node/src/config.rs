// ============================================
// File: crates/hashline-node/src/config.rs
// ============================================
//! # Node Configuration
//!
//! ## Creation Reason
//! Provides configuration management for a hashline node, loaded from a
//! TOML file and validated before anything starts.
//!
//! ## Main Functionality
//! - `NodeConfig`: Main configuration structure
//! - TOML file loading and parsing
//! - Configuration validation
//! - Mapping onto the core `ProtocolConfig`
//!
//! ## Configuration Sections
//! - `handshake`: Open packet freshness window, identity cipher suite
//! - `lines`: Line table capacity and idle timeout
//! - `logging`: Log level
//!
//! ## Example Configuration
//! ```toml
//! [handshake]
//! open_time_window_secs = 30
//! cipher_suite = "c25519"
//!
//! [lines]
//! max_lines = 1024
//! line_timeout_secs = 300
//!
//! [logging]
//! level = "info"
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Every section is optional; missing values take their defaults
//! - Widening the freshness window weakens replay protection
//!
//! ## Last Modified
//! v0.1.0 - Initial configuration implementation

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use hashline_core::{ProtocolConfig, SuiteId};

use crate::error::{NodeError, Result};

/// Largest accepted freshness window, in seconds.
pub const MAX_OPEN_TIME_WINDOW_SECS: u64 = 3600;

// ============================================
// NodeConfig
// ============================================

/// Main node configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Handshake configuration.
    #[serde(default)]
    pub handshake: HandshakeConfig,

    /// Line table configuration.
    #[serde(default)]
    pub lines: LinesConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl NodeConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed or validated.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        info!("Loading configuration from: {}", path_str);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| NodeError::config_load(&path_str, e.to_string()))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| NodeError::config_load(&path_str, e.to_string()))?;

        config.validate()?;

        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Loads configuration from a string (useful for testing).
    ///
    /// # Errors
    /// Returns error if the content cannot be parsed or validated.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| NodeError::config_load("<string>", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns `ConfigInvalid` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        self.handshake.validate()?;
        self.lines.validate()?;
        Ok(())
    }

    /// Serializes configuration to TOML string.
    #[must_use]
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Builds the core protocol configuration.
    ///
    /// # Errors
    /// Returns `ConfigInvalid` if the cipher suite is unknown.
    pub fn to_protocol_config(&self) -> Result<ProtocolConfig> {
        Ok(ProtocolConfig {
            open_time_window: self.handshake.open_time_window(),
            default_suite: self.handshake.suite()?,
        })
    }

    /// Returns the idle timeout after which lines expire.
    #[must_use]
    pub const fn line_timeout(&self) -> Duration {
        Duration::from_secs(self.lines.line_timeout_secs)
    }
}

// ============================================
// HandshakeConfig
// ============================================

/// Handshake configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeConfig {
    /// Accepted clock skew on open packets, in seconds.
    #[serde(default = "default_open_time_window_secs")]
    pub open_time_window_secs: u64,

    /// Cipher suite tag of the node identity.
    #[serde(default = "default_cipher_suite")]
    pub cipher_suite: String,
}

fn default_open_time_window_secs() -> u64 {
    30
}

fn default_cipher_suite() -> String {
    SuiteId::C25519.tag().to_string()
}

impl HandshakeConfig {
    fn validate(&self) -> Result<()> {
        if !(1..=MAX_OPEN_TIME_WINDOW_SECS).contains(&self.open_time_window_secs) {
            return Err(NodeError::config_invalid(
                "handshake.open_time_window_secs",
                format!("must be between 1 and {MAX_OPEN_TIME_WINDOW_SECS}"),
            ));
        }
        self.suite()?;
        Ok(())
    }

    /// Returns the freshness window.
    #[must_use]
    pub const fn open_time_window(&self) -> Duration {
        Duration::from_secs(self.open_time_window_secs)
    }

    /// Parses the cipher suite tag.
    ///
    /// # Errors
    /// Returns `ConfigInvalid` for unknown tags.
    pub fn suite(&self) -> Result<SuiteId> {
        self.cipher_suite.parse().map_err(|_| {
            NodeError::config_invalid(
                "handshake.cipher_suite",
                format!("unknown suite {:?}", self.cipher_suite),
            )
        })
    }
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            open_time_window_secs: default_open_time_window_secs(),
            cipher_suite: default_cipher_suite(),
        }
    }
}

// ============================================
// LinesConfig
// ============================================

/// Line table configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinesConfig {
    /// Maximum concurrent lines.
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,

    /// Idle time after which a line expires, in seconds.
    #[serde(default = "default_line_timeout_secs")]
    pub line_timeout_secs: u64,
}

fn default_max_lines() -> usize {
    1024
}

fn default_line_timeout_secs() -> u64 {
    300
}

impl LinesConfig {
    fn validate(&self) -> Result<()> {
        if self.max_lines == 0 {
            return Err(NodeError::config_invalid(
                "lines.max_lines",
                "must be greater than 0",
            ));
        }

        if self.line_timeout_secs == 0 {
            return Err(NodeError::config_invalid(
                "lines.line_timeout_secs",
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl Default for LinesConfig {
    fn default() -> Self {
        Self {
            max_lines: default_max_lines(),
            line_timeout_secs: default_line_timeout_secs(),
        }
    }
}

// ============================================
// LoggingConfig
// ============================================

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ============================================
// Tests
// ============================================
