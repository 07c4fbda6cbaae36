//! Per-transport configuration.
//!
//! Fixed at construction; there is no runtime renegotiation with the peer.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::protocol::DEFAULT_MAX_PAYLOAD;

/// Default number of frames the send queue holds before `send` reports
/// `QueueFull`.
pub const DEFAULT_SEND_QUEUE_CAPACITY: usize = 64;

/// Settings for one [`Transport`](crate::Transport).
///
/// Loads from a TOML table:
///
/// ```toml
/// max_payload_capacity = 262144
/// send_queue_capacity = 64
/// ```
///
/// Omitted keys take their defaults. An unbounded queue can only be chosen
/// in code, with `with_send_queue(None)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Largest payload accepted in either direction, in bytes.
    pub max_payload_capacity: usize,
    /// Frames buffered for the writer. `None` means unbounded.
    pub send_queue_capacity: Option<usize>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_payload_capacity: DEFAULT_MAX_PAYLOAD,
            send_queue_capacity: Some(DEFAULT_SEND_QUEUE_CAPACITY),
        }
    }
}

impl TransportConfig {
    pub fn with_max_payload(mut self, max_payload_capacity: usize) -> Self {
        self.max_payload_capacity = max_payload_capacity;
        self
    }

    pub fn with_send_queue(mut self, capacity: Option<usize>) -> Self {
        self.send_queue_capacity = capacity;
        self
    }

    /// Reject values the transport cannot run with.
    pub fn validate(&self) -> Result<(), TransportError> {
        if u32::try_from(self.max_payload_capacity).is_err() {
            return Err(TransportError::Config(format!(
                "max_payload_capacity {} does not fit the 32-bit length field",
                self.max_payload_capacity
            )));
        }
        if self.send_queue_capacity == Some(0) {
            return Err(TransportError::Config(
                "send_queue_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, TransportError> {
        let cfg: Self = toml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
