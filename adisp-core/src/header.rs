//! Fixed-size frame header.
//!
//! ```text
//! service_id:      u32 BE  (4)
//! message_type:    u32 BE  (4)
//! payload_length:  u32 BE  (4)
//! payload:         [u8]    (payload_length)
//! ```
//!
//! No magic, no version, no checksum. Both peers must be built against
//! the same layout.

use crate::error::TransportError;

/// Encoded size of a [`FrameHeader`] on the wire.
pub const HEADER_SIZE: usize = 12;

pub type FrameHeaderBytes = [u8; HEADER_SIZE];

/// The header preceding every payload on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub service_id: u32,
    pub message_type: u32,
    pub payload_length: u32,
}

impl FrameHeader {
    pub fn new(service_id: u32, message_type: u32, payload_length: u32) -> Self {
        Self {
            service_id,
            message_type,
            payload_length,
        }
    }

    /// Serialize to bytes (big-endian).
    pub fn to_bytes(&self) -> FrameHeaderBytes {
        let mut header: FrameHeaderBytes = [0; HEADER_SIZE];
        header[0..4].copy_from_slice(&self.service_id.to_be_bytes());
        header[4..8].copy_from_slice(&self.message_type.to_be_bytes());
        header[8..12].copy_from_slice(&self.payload_length.to_be_bytes());
        header
    }

    /// Deserialize from exactly [`HEADER_SIZE`] bytes.
    pub fn from_bytes(bytes: &FrameHeaderBytes) -> Self {
        let [s0, s1, s2, s3, m0, m1, m2, m3, l0, l1, l2, l3] = *bytes;
        Self {
            service_id: u32::from_be_bytes([s0, s1, s2, s3]),
            message_type: u32::from_be_bytes([m0, m1, m2, m3]),
            payload_length: u32::from_be_bytes([l0, l1, l2, l3]),
        }
    }

    /// Deserialize from the front of `data`, which may hold more than a header.
    pub fn decode(data: &[u8]) -> Result<Self, TransportError> {
        let bytes: &FrameHeaderBytes = data
            .get(..HEADER_SIZE)
            .and_then(|head| head.try_into().ok())
            .ok_or(TransportError::InvalidPayload("frame header too short"))?;
        Ok(Self::from_bytes(bytes))
    }

    /// Total frame size (header + payload) this header describes.
    pub fn frame_len(&self) -> usize {
        HEADER_SIZE + self.payload_length as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip() {
        let hdr = FrameHeader::new(2, 1, 12);
        let decoded = FrameHeader::from_bytes(&hdr.to_bytes());
        assert_eq!(decoded, hdr);
        assert_eq!(decoded.frame_len(), HEADER_SIZE + 12);
    }

    #[test]
    fn header_is_big_endian() {
        let hdr = FrameHeader::new(0x0102_0304, 0x0A0B_0C0D, 5);
        assert_eq!(
            hdr.to_bytes(),
            [1, 2, 3, 4, 0x0A, 0x0B, 0x0C, 0x0D, 0, 0, 0, 5]
        );
    }

    #[test]
    fn decode_ignores_trailing_bytes() {
        let mut data = FrameHeader::new(7, 2, 5).to_bytes().to_vec();
        data.extend_from_slice(b"hello");
        let hdr = FrameHeader::decode(&data).unwrap();
        assert_eq!(hdr.service_id, 7);
        assert_eq!(hdr.payload_length, 5);
    }

    #[test]
    fn decode_too_short() {
        assert!(FrameHeader::decode(&[0u8; HEADER_SIZE - 1]).is_err());
    }
}
