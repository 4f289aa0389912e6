//! Frame struct with typed accessors.
//!
//! A frame is a header plus its payload. Payloads are shared through
//! `bytes::Bytes`, so handing a frame to another task never copies it.
//!
//! # Example
//!
//! ```
//! use shellwire::protocol::{Frame, FrameKind};
//! use bytes::Bytes;
//!
//! let frame = Frame::new(FrameKind::Response, 42, Bytes::from_static(b"\xc0"));
//! assert_eq!(frame.request_id(), 42);
//! assert_eq!(frame.header.payload_length, 1);
//! ```

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::wire_format::{FrameKind, Header, HEADER_SIZE};
use crate::codec::MsgPackCodec;
use crate::error::Result;

/// A complete protocol frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Decoded header.
    pub header: Header,
    /// Payload bytes.
    pub payload: Bytes,
}

impl Frame {
    /// Create a frame; the header's length is taken from `payload`.
    pub fn new(kind: FrameKind, request_id: u32, payload: Bytes) -> Self {
        Self {
            header: Header::new(kind, request_id, payload.len() as u32),
            payload,
        }
    }

    /// Create a frame whose payload is `value` encoded as MsgPack.
    pub fn encode<T: Serialize>(kind: FrameKind, request_id: u32, value: &T) -> Result<Self> {
        let payload = MsgPackCodec::encode(value)?;
        Ok(Self::new(kind, request_id, Bytes::from(payload)))
    }

    /// Decode the MsgPack payload.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        MsgPackCodec::decode(&self.payload)
    }

    /// Get the frame kind.
    #[inline]
    pub fn kind(&self) -> FrameKind {
        self.header.kind
    }

    /// Get the request ID.
    #[inline]
    pub fn request_id(&self) -> u32 {
        self.header.request_id
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Encoded size on the wire.
    #[inline]
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Encode header and payload into one contiguous buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.wire_size());
        buf.extend_from_slice(&self.header.encode());
        buf.extend_from_slice(&self.payload);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_length_follows_payload() {
        let frame = Frame::new(FrameKind::Request, 9, Bytes::from_static(b"abc"));
        assert_eq!(frame.header.payload_length, 3);
        assert_eq!(frame.kind(), FrameKind::Request);
        assert_eq!(frame.wire_size(), HEADER_SIZE + 3);
    }

    #[test]
    fn test_to_bytes_layout() {
        let frame = Frame::new(FrameKind::Event, 0, Bytes::from_static(b"hi"));
        let bytes = frame.to_bytes();
        assert_eq!(&bytes[..HEADER_SIZE], &frame.header.encode());
        assert_eq!(&bytes[HEADER_SIZE..], b"hi");
    }

    #[test]
    fn test_encoded_payload() {
        let frame = Frame::encode(FrameKind::Response, 3, &vec!["a", "b"]).unwrap();
        let back: Vec<String> = frame.decode().unwrap();
        assert_eq!(back, vec!["a", "b"]);
    }

    #[test]
    fn test_empty_payload() {
        let frame = Frame::new(FrameKind::Hello, 0, Bytes::new());
        assert!(frame.payload().is_empty());
        assert_eq!(frame.to_bytes().len(), HEADER_SIZE);
    }
}
