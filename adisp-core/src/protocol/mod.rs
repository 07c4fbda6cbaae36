//! Service identifiers and per-service message types.
//!
//! Uses proper enums with `TryFrom`, so unknown values never panic. The
//! transport never interprets these; they exist so both ends of the
//! display link agree on the numbers.

pub mod display;

use std::fmt;

use crate::error::TransportError;

pub use display::SinkAvailable;

/// Receive buffer size used by the display link: one encoded access unit.
pub const DEFAULT_MAX_PAYLOAD: usize = 256 * 1024;

// ── ServiceId ────────────────────────────────────────────────────

/// Logical endpoints sharing one display link.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceId {
    /// Renders the stream; lives on the sink device.
    DisplaySink = 0x1,
    /// Captures and encodes the screen; lives on the source device.
    DisplaySource = 0x2,
}

impl TryFrom<u32> for ServiceId {
    type Error = TransportError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0x1 => Ok(ServiceId::DisplaySink),
            0x2 => Ok(ServiceId::DisplaySource),
            _ => Err(TransportError::UnknownVariant {
                type_name: "ServiceId",
                value,
            }),
        }
    }
}

impl From<ServiceId> for u32 {
    fn from(id: ServiceId) -> Self {
        id as u32
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceId::DisplaySink => write!(f, "DisplaySink"),
            ServiceId::DisplaySource => write!(f, "DisplaySource"),
        }
    }
}

// ── SinkMessage ──────────────────────────────────────────────────

/// Messages addressed to [`ServiceId::DisplaySink`].
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkMessage {
    /// Source asks the sink to describe its display. Empty payload.
    Query = 0x1,
    /// One encoded video access unit.
    Content = 0x2,
}

impl TryFrom<u32> for SinkMessage {
    type Error = TransportError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0x1 => Ok(SinkMessage::Query),
            0x2 => Ok(SinkMessage::Content),
            _ => Err(TransportError::UnknownVariant {
                type_name: "SinkMessage",
                value,
            }),
        }
    }
}

impl From<SinkMessage> for u32 {
    fn from(msg: SinkMessage) -> Self {
        msg as u32
    }
}

impl fmt::Display for SinkMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ── SourceMessage ────────────────────────────────────────────────

/// Messages addressed to [`ServiceId::DisplaySource`].
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceMessage {
    /// Sink display is ready. Payload is a [`SinkAvailable`].
    SinkAvailable = 0x1,
    /// Sink display went away. Empty payload.
    SinkNotAvailable = 0x2,
}

impl TryFrom<u32> for SourceMessage {
    type Error = TransportError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0x1 => Ok(SourceMessage::SinkAvailable),
            0x2 => Ok(SourceMessage::SinkNotAvailable),
            _ => Err(TransportError::UnknownVariant {
                type_name: "SourceMessage",
                value,
            }),
        }
    }
}

impl From<SourceMessage> for u32 {
    fn from(msg: SourceMessage) -> Self {
        msg as u32
    }
}

impl fmt::Display for SourceMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_id_roundtrip() {
        for id in [ServiceId::DisplaySink, ServiceId::DisplaySource] {
            assert_eq!(ServiceId::try_from(u32::from(id)).unwrap(), id);
        }
    }

    #[test]
    fn service_id_invalid() {
        let err = ServiceId::try_from(0x7).unwrap_err();
        assert!(err.to_string().contains("ServiceId"));
    }

    #[test]
    fn message_types_roundtrip() {
        for msg in [SinkMessage::Query, SinkMessage::Content] {
            assert_eq!(SinkMessage::try_from(msg as u32).unwrap(), msg);
        }
        for msg in [SourceMessage::SinkAvailable, SourceMessage::SinkNotAvailable] {
            assert_eq!(SourceMessage::try_from(msg as u32).unwrap(), msg);
        }
    }

    #[test]
    fn message_type_zero_is_unknown() {
        assert!(SinkMessage::try_from(0).is_err());
        assert!(SourceMessage::try_from(0).is_err());
    }

    #[test]
    fn display_format() {
        assert_eq!(ServiceId::DisplaySink.to_string(), "DisplaySink");
        assert_eq!(SinkMessage::Content.to_string(), "Content");
        assert_eq!(SourceMessage::SinkNotAvailable.to_string(), "SinkNotAvailable");
    }
}
