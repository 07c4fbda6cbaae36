//! Transport lifecycle state machine.
//!
//! Provides a `TransportState` enum that models the lifecycle of one
//! transport session, with validated transitions that return `Result`
//! (or a `bool` for the idempotent shutdown edges) instead of panicking.

use std::fmt;

use crate::error::TransportError;

// ── TransportState ───────────────────────────────────────────────

/// The current phase of a transport session.
///
/// ```text
///  Created ──► Open ──► Closing ──► Closed
///     │                    ▲
///     └────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    /// Constructed; the reader has not been started.
    #[default]
    Created,

    /// Reader and writer are running.
    Open,

    /// Shutdown requested or forced; waiting for the reader and writer
    /// to observe it.
    Closing,

    /// Terminal. Every operation fails with `ChannelClosed`.
    Closed,
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "Created"),
            Self::Open => write!(f, "Open"),
            Self::Closing => write!(f, "Closing"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

impl TransportState {
    /// Returns `true` while new frames may still be queued.
    pub fn accepts_sends(&self) -> bool {
        matches!(self, Self::Created | Self::Open)
    }

    /// Returns `true` once shutdown has begun or finished.
    pub fn is_shutting_down(&self) -> bool {
        matches!(self, Self::Closing | Self::Closed)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `Open`.
    ///
    /// Valid from: `Created`.
    pub fn open(&mut self) -> Result<(), TransportError> {
        match self {
            Self::Created => {
                *self = Self::Open;
                Ok(())
            }
            Self::Open => Err(TransportError::AlreadyStarted),
            Self::Closing | Self::Closed => Err(TransportError::ChannelClosed),
        }
    }

    /// Transition to `Closing`.
    ///
    /// Valid from: `Created`, `Open`. Returns `false` (and changes
    /// nothing) if shutdown already began.
    pub fn begin_close(&mut self) -> bool {
        match self {
            Self::Created | Self::Open => {
                *self = Self::Closing;
                true
            }
            Self::Closing | Self::Closed => false,
        }
    }

    /// Transition to `Closed`.
    ///
    /// Valid from: `Closing`. Returns `false` from any other state.
    pub fn finish_close(&mut self) -> bool {
        match self {
            Self::Closing => {
                *self = Self::Closed;
                true
            }
            _ => false,
        }
    }
}

// ── CloseReason ──────────────────────────────────────────────────

/// The first cause that moved a transport out of `Created`/`Open`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// `close()` was called.
    Requested,

    /// The peer ended the stream on a frame boundary.
    PeerClosed,

    /// The peer sent a frame that cannot be framed safely.
    ProtocolViolation(String),

    /// Reading from or writing to the channel failed.
    ChannelFailure(String),

    /// A transport task ended without reporting a cause.
    Aborted,
}

impl CloseReason {
    /// Returns `true` for the causes that count as an orderly shutdown.
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Requested | Self::PeerClosed)
    }

    /// Classify an error surfaced by the reader or writer.
    pub fn from_error(err: &TransportError) -> Self {
        match err {
            TransportError::InvalidLength { .. } | TransportError::OversizedMessage { .. } => {
                Self::ProtocolViolation(err.to_string())
            }
            _ => Self::ChannelFailure(err.to_string()),
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requested => write!(f, "close requested"),
            Self::PeerClosed => write!(f, "peer closed the channel"),
            Self::ProtocolViolation(detail) => write!(f, "protocol violation: {detail}"),
            Self::ChannelFailure(detail) => write!(f, "channel failure: {detail}"),
            Self::Aborted => write!(f, "transport task aborted"),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
