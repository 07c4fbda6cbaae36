//! Payload layouts for the display services.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::TransportError;

/// Largest width or height a sink may advertise.
pub const MAX_DIMENSION: i32 = 4096;

/// Accepted range of advertised display densities.
pub const DENSITY_DPI_RANGE: std::ops::RangeInclusive<i32> = 60..=640;

/// Body of [`SourceMessage::SinkAvailable`](super::SourceMessage::SinkAvailable).
///
/// Three big-endian `i32` values: width, height, density.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkAvailable {
    pub width: i32,
    pub height: i32,
    pub density_dpi: i32,
}

impl SinkAvailable {
    /// Encoded size on the wire.
    pub const SIZE: usize = 12;

    pub fn new(width: i32, height: i32, density_dpi: i32) -> Self {
        Self {
            width,
            height,
            density_dpi,
        }
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        buf.put_i32(self.width);
        buf.put_i32(self.height);
        buf.put_i32(self.density_dpi);
        buf.freeze()
    }

    /// Parse and range-check a sink description.
    ///
    /// Trailing bytes after the three fields are ignored.
    pub fn decode(mut payload: &[u8]) -> Result<Self, TransportError> {
        if payload.remaining() < Self::SIZE {
            return Err(TransportError::InvalidPayload("SinkAvailable too short"));
        }
        let msg = Self {
            width: payload.get_i32(),
            height: payload.get_i32(),
            density_dpi: payload.get_i32(),
        };
        msg.validate()?;
        Ok(msg)
    }

    pub fn validate(&self) -> Result<(), TransportError> {
        let dimension_ok = |v: i32| (0..=MAX_DIMENSION).contains(&v);
        if !dimension_ok(self.width) || !dimension_ok(self.height) {
            return Err(TransportError::InvalidPayload(
                "SinkAvailable dimensions out of range",
            ));
        }
        if !DENSITY_DPI_RANGE.contains(&self.density_dpi) {
            return Err(TransportError::InvalidPayload(
                "SinkAvailable density out of range",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_available_layout() {
        let encoded = SinkAvailable::new(1920, 1080, 320).encode();
        assert_eq!(encoded.len(), SinkAvailable::SIZE);
        assert_eq!(&encoded[..4], &1920i32.to_be_bytes());

        let decoded = SinkAvailable::decode(&encoded).unwrap();
        assert_eq!(decoded, SinkAvailable::new(1920, 1080, 320));
    }

    #[test]
    fn sink_available_too_short() {
        assert!(SinkAvailable::decode(&[0u8; 11]).is_err());
    }

    #[test]
    fn sink_available_rejects_out_of_range() {
        let too_wide = SinkAvailable::new(4097, 1080, 320).encode();
        assert!(SinkAvailable::decode(&too_wide).is_err());

        let negative = SinkAvailable::new(1920, -1, 320).encode();
        assert!(SinkAvailable::decode(&negative).is_err());

        let low_density = SinkAvailable::new(1920, 1080, 59).encode();
        assert!(SinkAvailable::decode(&low_density).is_err());
    }

    #[test]
    fn sink_available_boundaries_accepted() {
        assert!(SinkAvailable::new(0, 4096, 60).validate().is_ok());
        assert!(SinkAvailable::new(4096, 0, 640).validate().is_ok());
    }
}
