// ============================================
// File: crates/hashline-node/src/main.rs
// ============================================
//! # Hashline Node Entry Point
//!
//! ## Creation Reason
//! Command line front end for hashline identities and a loopback demo of
//! the handshake and line transport.
//!
//! ## Main Functionality
//! - CLI argument parsing with clap
//! - Logging initialization with tracing
//! - Identity generation and hashname calculation
//! - Configuration validation
//! - In-process two-node demo
//!
//! ## Usage
//! ```bash
//! hashline-node keygen --suite p256
//! hashline-node hashname --public-key <hex> --suite c25519
//! hashline-node validate --config /etc/hashline/node.toml
//! hashline-node demo --message "hello"
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - `keygen` prints the private key; it never writes it to disk
//! - `RUST_LOG` overrides the configured log level
//!
//! ## Last Modified
//! v0.1.0 - Initial CLI implementation

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hashline_common::types::Path;
use hashline_core::crypto::suite;
use hashline_core::{ChannelPacket, OsRandom, SuiteId};
use hashline_node::{NodeConfig, Received, Switch};

// ============================================
// CLI Definition
// ============================================

/// Hashline node tools
#[derive(Parser, Debug)]
#[command(name = "hashline-node")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level when RUST_LOG is unset (demo falls back to its config)
    #[arg(long, global = true, env = "HASHLINE_LOG")]
    log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a new identity and print it as JSON
    Keygen {
        /// Cipher suite: c25519 or p256
        #[arg(short, long, default_value = "c25519")]
        suite: SuiteId,
    },

    /// Print the hashname of a public key
    Hashname {
        /// Hex-encoded hashname public key
        #[arg(short, long)]
        public_key: String,

        /// Cipher suite the key belongs to
        #[arg(short, long, default_value = "c25519")]
        suite: SuiteId,
    },

    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = "/etc/hashline/node.toml")]
        config: PathBuf,
    },

    /// Run a handshake and exchange one packet each way between two
    /// in-process nodes
    Demo {
        /// Path to configuration file (defaults when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Message carried in the channel packet body
        #[arg(short, long, default_value = "hello over a line")]
        message: String,
    },
}

// ============================================
// Main
// ============================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = cli.log_level;
    if !matches!(cli.command, Commands::Demo { .. }) {
        init_logging(log_level.as_deref().unwrap_or("info"));
    }

    let result = match cli.command {
        Commands::Keygen { suite } => cmd_keygen(suite),
        Commands::Hashname { public_key, suite } => cmd_hashname(&public_key, suite),
        Commands::Validate { config } => cmd_validate(config).await,
        Commands::Demo { config, message } => cmd_demo(config, message, log_level).await,
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

// ============================================
// Commands
// ============================================

#[derive(Serialize)]
struct KeygenOutput {
    suite: String,
    public_key: String,
    private_key: String,
    hashname: String,
}

/// Generates an identity and prints it.
fn cmd_keygen(suite_id: SuiteId) -> anyhow::Result<()> {
    let identity = suite::for_id(suite_id).generate_identity(&OsRandom)?;

    let output = KeygenOutput {
        suite: suite_id.tag().to_string(),
        public_key: identity.public().to_hex(),
        private_key: hex::encode(identity.private().as_bytes()),
        hashname: identity.hashname().to_hex(),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Decodes a public key and prints its hashname.
fn cmd_hashname(public_key: &str, suite_id: SuiteId) -> anyhow::Result<()> {
    let bytes = hex::decode(public_key.trim()).context("public key is not valid hex")?;
    let key = suite::for_id(suite_id).decode_public_key(&bytes)?;
    println!("{}", key.hashname());
    Ok(())
}

/// Validates configuration file.
async fn cmd_validate(config_path: PathBuf) -> anyhow::Result<()> {
    if !config_path.exists() {
        bail!("config file not found: {}", config_path.display());
    }

    let config = NodeConfig::load(&config_path).await?;

    println!("✅ Configuration is valid");
    println!();
    println!("Handshake:");
    println!("   Suite:        {}", config.handshake.cipher_suite);
    println!("   Open Window:  {}s", config.handshake.open_time_window_secs);
    println!();
    println!("Lines:");
    println!("   Max Lines:    {}", config.lines.max_lines);
    println!("   Line Timeout: {}s", config.lines.line_timeout_secs);
    println!();
    println!("Logging:");
    println!("   Level:        {}", config.logging.level);
    println!();

    Ok(())
}

/// Runs two switches against each other in memory.
async fn cmd_demo(
    config_path: Option<PathBuf>,
    message: String,
    log_level: Option<String>,
) -> anyhow::Result<()> {
    let config = match config_path {
        Some(path) => NodeConfig::load(&path).await.inspect_err(|_| {
            init_logging(log_level.as_deref().unwrap_or("info"));
        })?,
        None => NodeConfig::default(),
    };
    init_logging(log_level.as_deref().unwrap_or(&config.logging.level));

    let suite_id = config.handshake.suite()?;
    let alice = Arc::new(Switch::new(
        suite::for_id(suite_id).generate_identity(&OsRandom)?,
        &config,
    )?);
    let bob = Arc::new(Switch::new(
        suite::for_id(suite_id).generate_identity(&OsRandom)?,
        &config,
    )?);
    let cleanup = alice.spawn_cleanup_task(Duration::from_secs(1));

    let from_alice = Path::Local("alice".into());
    let from_bob = Path::Local("bob".into());

    info!(alice = %alice.hashname(), bob = %bob.hashname(), "Starting demo");

    let open = alice.open(bob.public_key())?;
    println!("alice → bob   open ({} bytes)", open.len());

    let reply = match bob.receive(&open, &from_alice)? {
        Received::Established {
            reply: Some(reply), ..
        } => reply,
        other => bail!("bob did not answer the open: {other:?}"),
    };
    println!("bob   → alice open ({} bytes)", reply.len());

    if !matches!(
        alice.receive(&reply, &from_bob)?,
        Received::Established { reply: None, .. }
    ) {
        bail!("alice did not establish the line");
    }
    println!("line up: {} ⇄ {}", alice.hashname(), bob.hashname());

    let request = ChannelPacket::new(serde_json::Map::new(), message.into_bytes())
        .with_field("type", "demo");
    let wire = alice.send(bob.hashname(), request)?;
    let Received::Channel { packet, .. } = bob.receive(&wire, &from_alice)? else {
        bail!("bob did not receive a channel packet");
    };
    println!(
        "alice → bob   line ({} bytes): {}",
        wire.len(),
        String::from_utf8_lossy(packet.body())
    );

    let echo = ChannelPacket::new(packet.header().clone(), packet.body().to_vec())
        .with_field("echo", true);
    let wire = bob.send(alice.hashname(), echo)?;
    let Received::Channel { packet, .. } = alice.receive(&wire, &from_bob)? else {
        bail!("alice did not receive the echo");
    };
    println!(
        "bob   → alice line ({} bytes): {} {}",
        wire.len(),
        serde_json::Value::Object(packet.header().clone()),
        String::from_utf8_lossy(packet.body())
    );

    alice.shutdown();
    cleanup.await?;

    Ok(())
}

// ============================================
// Helper Functions
// ============================================

/// Initializes the tracing subscriber.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init()
        .ok();
}
