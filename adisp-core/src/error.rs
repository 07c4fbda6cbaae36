//! Domain-specific error types for the accessory display transport.
//!
//! All fallible operations return `Result<T, TransportError>`.
//! No panics on invalid input: every error is typed and recoverable
//! by the caller, or reported through the transport's close reason.

use thiserror::Error;

/// The canonical error type for the transport layer.
#[derive(Debug, Error)]
pub enum TransportError {
    // ── Caller Errors ────────────────────────────────────────────
    /// The payload exceeds the transport's configured capacity.
    #[error("oversized message: {size} bytes (max {max})")]
    OversizedMessage { size: usize, max: usize },

    /// The transport is shutting down or already closed.
    #[error("channel closed")]
    ChannelClosed,

    /// The bounded send queue has no room for another frame.
    #[error("send queue full")]
    QueueFull,

    /// `start_reading` was called on a transport that is already open.
    #[error("transport already started")]
    AlreadyStarted,

    /// `start_reading` was called outside a Tokio runtime.
    #[error("no Tokio runtime available")]
    NoRuntime,

    /// Another service already owns this id on the transport.
    #[error("service {0:#x} already registered")]
    ServiceAlreadyRegistered(u32),

    // ── Protocol Errors ──────────────────────────────────────────
    /// A frame header declared a payload larger than the receive buffer.
    #[error("invalid payload length: {declared} bytes (max {max})")]
    InvalidLength { declared: u64, max: usize },

    /// A numeric value did not map to any known catalogue entry.
    #[error("unknown {type_name} discriminant: {value:#x}")]
    UnknownVariant { type_name: &'static str, value: u32 },

    /// A message body did not match the layout its type requires.
    #[error("invalid payload: {0}")]
    InvalidPayload(&'static str),

    // ── Channel Errors ───────────────────────────────────────────
    /// The underlying byte channel reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    // ── Configuration Errors ─────────────────────────────────────
    /// A configuration value was rejected.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl TransportError {
    /// Returns `true` for errors caused by the caller's own request.
    ///
    /// These never change the transport's state.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::OversizedMessage { .. }
                | Self::ChannelClosed
                | Self::QueueFull
                | Self::AlreadyStarted
                | Self::ServiceAlreadyRegistered(_)
        )
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for TransportError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        TransportError::ChannelClosed
    }
}

impl<T> From<tokio::sync::mpsc::error::TrySendError<T>> for TransportError {
    fn from(e: tokio::sync::mpsc::error::TrySendError<T>) -> Self {
        match e {
            tokio::sync::mpsc::error::TrySendError::Full(_) => TransportError::QueueFull,
            tokio::sync::mpsc::error::TrySendError::Closed(_) => TransportError::ChannelClosed,
        }
    }
}

impl From<toml::de::Error> for TransportError {
    fn from(e: toml::de::Error) -> Self {
        TransportError::Config(e.to_string())
    }
}
