//! Configuration management.
//!
//! Supports configuration from:
//! - TOML config files
//! - Environment variables
//!
//! Partnerships and certificates are not configured here; they come from
//! the resolvers handed to the engine.

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{As2Error, Result};

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Transmission settings
    #[serde(default)]
    pub sender: SenderConfig,

    /// Pending-receipt store locations
    #[serde(default)]
    pub pending: PendingConfig,

    /// Async MDN receiver settings
    #[serde(default)]
    pub receiver: ReceiverConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| As2Error::Config(format!("Failed to read config file: {e}")))?;

        Ok(toml::from_str(&content)?)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // Pending store
        if let Ok(dir) = std::env::var("AS2_PENDING_INFO_DIR") {
            config.pending.info_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("AS2_PENDING_PAYLOAD_DIR") {
            config.pending.payload_dir = PathBuf::from(dir);
        }

        // Receiver
        if let Ok(host) = std::env::var("AS2_RECEIVER_HOST") {
            config.receiver.host = host;
        }
        if let Ok(port) = std::env::var("AS2_RECEIVER_PORT") {
            if let Ok(port) = port.parse() {
                config.receiver.port = port;
            }
        }

        // Sender
        if let Ok(val) = std::env::var("AS2_SENDER_RETRIES") {
            if let Ok(val) = val.parse() {
                config.sender.max_retries = val;
            }
        }
        if let Ok(val) = std::env::var("AS2_SENDER_TIMEOUT_SECS") {
            if let Ok(val) = val.parse() {
                config.sender.timeout_secs = val;
            }
        }

        config
    }

    /// Merge with another config (other takes precedence)
    pub fn merge(self, other: Self) -> Self {
        let default_pending = PendingConfig::default();
        let default_receiver = ReceiverConfig::default();
        Self {
            sender: other.sender,
            pending: PendingConfig {
                info_dir: if other.pending.info_dir != default_pending.info_dir {
                    other.pending.info_dir
                } else {
                    self.pending.info_dir
                },
                payload_dir: if other.pending.payload_dir != default_pending.payload_dir {
                    other.pending.payload_dir
                } else {
                    self.pending.payload_dir
                },
            },
            receiver: ReceiverConfig {
                host: if other.receiver.host != default_receiver.host {
                    other.receiver.host
                } else {
                    self.receiver.host
                },
                port: if other.receiver.port != default_receiver.port {
                    other.receiver.port
                } else {
                    self.receiver.port
                },
                ..other.receiver
            },
        }
    }
}

/// Transmission configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,

    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,

    /// Resends after the first attempt before a message is abandoned
    pub max_retries: u32,

    /// User-Agent header
    pub user_agent: String,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            connect_timeout_secs: 10,
            max_retries: 3,
            user_agent: format!("as2-engine/{} sender", crate::VERSION),
        }
    }
}

/// Pending-receipt store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PendingConfig {
    /// Directory of pending records (MIC + payload reference)
    pub info_dir: PathBuf,

    /// Directory of payloads kept while a receipt is pending
    pub payload_dir: PathBuf,
}

impl Default for PendingConfig {
    fn default() -> Self {
        let base = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("as2");
        Self {
            info_dir: base.join("pendinginfo"),
            payload_dir: base.join("pending"),
        }
    }
}

/// Route of the receiver's status endpoint
pub const HEALTH_PATH: &str = "/health";

/// Async MDN receiver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Route receiving MDN posts
    pub path: String,

    /// Maximum MDN body size in bytes
    pub max_body_size: usize,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 10081,
            path: "/mdn".to_string(),
            max_body_size: 10 * 1024 * 1024, // 10 MB
        }
    }
}

impl ReceiverConfig {
    /// Get the full listen address
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| As2Error::Config(format!("Invalid listen address: {e}")))
    }

    /// Check that `path` can be routed next to `/health`.
    pub fn validate_path(&self) -> Result<()> {
        if !self.path.starts_with('/') {
            return Err(As2Error::Config(format!(
                "Receiver path must start with '/': {:?}",
                self.path
            )));
        }
        if self.path == HEALTH_PATH {
            return Err(As2Error::Config(format!(
                "Receiver path collides with {HEALTH_PATH}"
            )));
        }
        if self.path.contains(['{', '}', ':', '*']) {
            return Err(As2Error::Config(format!(
                "Receiver path must be a literal route: {:?}",
                self.path
            )));
        }
        Ok(())
    }
}
