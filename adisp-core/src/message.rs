//! The unit of exchange between services.

use bytes::Bytes;

use crate::header::FrameHeader;

/// A decoded message: recipient service, opcode, and raw body.
///
/// The payload length is carried explicitly on the wire; an empty payload
/// is a valid message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    service_id: u32,
    message_type: u32,
    payload: Bytes,
}

impl Message {
    pub fn new(service_id: u32, message_type: u32, payload: impl Into<Bytes>) -> Self {
        Self {
            service_id,
            message_type,
            payload: payload.into(),
        }
    }

    /// A message with no body.
    pub fn empty(service_id: u32, message_type: u32) -> Self {
        Self::new(service_id, message_type, Bytes::new())
    }

    pub fn service_id(&self) -> u32 {
        self.service_id
    }

    pub fn message_type(&self) -> u32 {
        self.message_type
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Header describing this message on the wire.
    ///
    /// Returns `None` if the payload length does not fit the 32-bit field.
    pub fn header(&self) -> Option<FrameHeader> {
        let len = u32::try_from(self.payload.len()).ok()?;
        Some(FrameHeader::new(self.service_id, self.message_type, len))
    }

    pub fn into_parts(self) -> (u32, u32, Bytes) {
        (self.service_id, self.message_type, self.payload)
    }
}
