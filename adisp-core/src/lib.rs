//! # adisp-core
//!
//! Message transport for the accessory display link: independent services
//! (display source, display sink) exchanging typed, length-delimited frames
//! over one shared duplex byte stream.
//!
//! This crate contains:
//! - **Wire types**: `FrameHeader`, `Message`
//! - **Codec**: `FrameCodec` for framed I/O via `tokio_util`
//! - **Transport**: `Transport` with one reader task, one writer task and an
//!   ordered send queue
//! - **Service**: `Service` handles and the `MessageHandler` capability
//! - **Protocol**: service ids, message types and display payloads
//! - **State**: `TransportState` lifecycle and `CloseReason`
//! - **Config**: `TransportConfig`, loadable from TOML
//! - **Error**: `TransportError`, a typed `thiserror` error hierarchy

pub mod codec;
pub mod config;
pub mod error;
pub mod header;
pub mod message;
pub mod protocol;
pub mod service;
pub mod state;
pub mod transport;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::FrameCodec;
pub use config::TransportConfig;
pub use error::TransportError;
pub use header::{FrameHeader, HEADER_SIZE};
pub use message::Message;
pub use protocol::{ServiceId, SinkAvailable, SinkMessage, SourceMessage};
pub use service::{MessageHandler, Service, ServiceHooks};
pub use state::{CloseReason, TransportState};
pub use transport::{ByteChannel, Transport, WeakTransport};
