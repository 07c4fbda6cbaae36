//! `tokio_util` codec turning a byte stream into [`Message`]s and back.
//!
//! The decoder checks the declared payload length as soon as a header is
//! buffered, before waiting for any payload bytes, so an oversized
//! declaration never grows the receive buffer past one maximal frame.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::TransportError;
use crate::header::{FrameHeader, HEADER_SIZE};
use crate::message::Message;

#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_payload: usize,
}

impl FrameCodec {
    /// A codec accepting payloads up to `max_payload` bytes in both directions.
    pub fn new(max_payload: usize) -> Self {
        Self { max_payload }
    }

    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    /// Largest frame (header + payload) this codec will ever buffer.
    pub fn max_frame_len(&self) -> usize {
        HEADER_SIZE.saturating_add(self.max_payload)
    }
}

impl Decoder for FrameCodec {
    type Item = Message;
    type Error = TransportError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_SIZE {
            return Ok(None);
        }

        let header = FrameHeader::decode(&src[..])?;
        let declared = header.payload_length as usize;
        if declared > self.max_payload {
            return Err(TransportError::InvalidLength {
                declared: u64::from(header.payload_length),
                max: self.max_payload,
            });
        }

        let frame_len = header.frame_len();
        if src.len() < frame_len {
            // Reserve the rest of this frame once instead of growing per read.
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        src.advance(HEADER_SIZE);
        let payload = src.split_to(declared).freeze();
        Ok(Some(Message::new(
            header.service_id,
            header.message_type,
            payload,
        )))
    }
}

impl Encoder<Message> for FrameCodec {
    type Error = TransportError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let oversized = TransportError::OversizedMessage {
            size: item.payload_len(),
            max: self.max_payload,
        };
        if item.payload_len() > self.max_payload {
            return Err(oversized);
        }
        let header = item.header().ok_or(oversized)?;

        dst.reserve(header.frame_len());
        dst.extend_from_slice(&header.to_bytes());
        dst.extend_from_slice(item.payload());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(codec: &mut FrameCodec, msg: Message) -> BytesMut {
        let mut buf = BytesMut::new();
        codec.encode(msg, &mut buf).unwrap();
        buf
    }

    #[test]
    fn roundtrip_empty_and_full_payloads() {
        let mut codec = FrameCodec::new(1024);
        for len in [0usize, 1, 1023, 1024] {
            let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let msg = Message::new(3, 9, payload);
            let mut buf = encode(&mut codec, msg.clone());
            assert_eq!(buf.len(), HEADER_SIZE + len);

            let decoded = codec.decode(&mut buf).unwrap().unwrap();
            assert_eq!(decoded, msg);
            assert!(buf.is_empty());
        }
    }

    #[test]
    fn partial_header_needs_more() {
        let mut codec = FrameCodec::new(64);
        let mut buf = BytesMut::from(&[0u8, 0, 0][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn partial_payload_needs_more_and_reserves() {
        let mut codec = FrameCodec::new(4096);
        let full = encode(&mut codec, Message::new(1, 2, vec![7u8; 4000]));

        let mut buf = BytesMut::from(&full[..100]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert!(buf.capacity() >= full.len());

        buf.extend_from_slice(&full[100..]);
        let msg = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(msg.payload_len(), 4000);
    }

    #[test]
    fn two_frames_in_one_buffer() {
        let mut codec = FrameCodec::new(64);
        let mut buf = encode(&mut codec, Message::new(1, 1, &b"a"[..]));
        buf.extend_from_slice(&encode(&mut codec, Message::empty(2, 2)));

        let first = codec.decode(&mut buf).unwrap().unwrap();
        let second = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first.payload(), &b"a"[..]);
        assert_eq!(second.service_id(), 2);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn oversized_declaration_fails_on_header_alone() {
        let mut codec = FrameCodec::new(1024);
        let mut buf = BytesMut::from(&FrameHeader::new(7, 2, 1025).to_bytes()[..]);
        let err = codec.decode(&mut buf).unwrap_err();
        assert!(matches!(
            err,
            TransportError::InvalidLength {
                declared: 1025,
                max: 1024
            }
        ));
    }

    #[test]
    fn encoder_rejects_oversized_payload() {
        let mut codec = FrameCodec::new(4);
        let mut buf = BytesMut::new();
        let err = codec
            .encode(Message::new(1, 1, vec![0u8; 5]), &mut buf)
            .unwrap_err();
        assert!(matches!(err, TransportError::OversizedMessage { size: 5, max: 4 }));
        assert!(buf.is_empty());
    }
}
