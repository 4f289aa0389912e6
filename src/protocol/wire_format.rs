//! Wire format encoding and decoding.
//!
//! Implements the 9-byte header format:
//! ```text
//! ┌───────┬──────────┬──────────┐
//! │ Kind  │ Req ID   │ Length   │
//! │ 1 byte│ 4 bytes  │ 4 bytes  │
//! │       │ uint32 BE│ uint32 BE│
//! └───────┴──────────┴──────────┘
//! ```
//!
//! All multi-byte integers are Big Endian.

use crate::error::{Result, ShellwireError};

/// Header size in bytes (fixed, exactly 9).
pub const HEADER_SIZE: usize = 9;

/// Default maximum payload size (16 MiB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

/// Request ID carried by frames that answer no request (HELLO, EVENT).
pub const NO_REQUEST_ID: u32 = 0;

/// Kind of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameKind {
    /// Host → renderer, once per connection: registry schema.
    Hello = 0x01,
    /// Renderer → host: invoke an operation.
    Request = 0x02,
    /// Host → renderer: successful result.
    Response = 0x03,
    /// Host → renderer: failed invocation.
    Error = 0x04,
    /// Host → renderer: pushed event.
    Event = 0x05,
}

impl FrameKind {
    /// Parse the kind byte.
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0x01 => Ok(Self::Hello),
            0x02 => Ok(Self::Request),
            0x03 => Ok(Self::Response),
            0x04 => Ok(Self::Error),
            0x05 => Ok(Self::Event),
            other => Err(ShellwireError::Protocol(format!(
                "unknown frame kind 0x{other:02X}"
            ))),
        }
    }

    /// Whether this frame answers a request.
    #[inline]
    pub fn is_reply(self) -> bool {
        matches!(self, Self::Response | Self::Error)
    }
}

/// Decoded header from wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Frame kind.
    pub kind: FrameKind,
    /// Request identifier (0 = not tied to a request).
    pub request_id: u32,
    /// Payload length in bytes.
    pub payload_length: u32,
}

impl Header {
    /// Create a new header.
    pub fn new(kind: FrameKind, request_id: u32, payload_length: u32) -> Self {
        Self {
            kind,
            request_id,
            payload_length,
        }
    }

    /// Encode header to bytes (Big Endian).
    ///
    /// # Example
    ///
    /// ```
    /// use shellwire::protocol::{FrameKind, Header};
    ///
    /// let bytes = Header::new(FrameKind::Request, 42, 100).encode();
    /// assert_eq!(bytes, [0x02, 0, 0, 0, 42, 0, 0, 0, 100]);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0] = self.kind as u8;
        buf[1..5].copy_from_slice(&self.request_id.to_be_bytes());
        buf[5..9].copy_from_slice(&self.payload_length.to_be_bytes());
        buf
    }

    /// Decode header from bytes (Big Endian).
    ///
    /// Returns `Ok(None)` if the buffer is too short, and an error if the kind
    /// byte is unknown.
    pub fn decode(buf: &[u8]) -> Result<Option<Self>> {
        if buf.len() < HEADER_SIZE {
            return Ok(None);
        }
        let kind = FrameKind::from_byte(buf[0])?;
        let request_id = u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]);
        let payload_length = u32::from_be_bytes([buf[5], buf[6], buf[7], buf[8]]);
        Ok(Some(Self::new(kind, request_id, payload_length)))
    }

    /// Reject payloads above `max_payload_size`.
    pub fn validate(&self, max_payload_size: u32) -> Result<()> {
        if self.payload_length > max_payload_size {
            return Err(ShellwireError::Protocol(format!(
                "payload of {} bytes exceeds limit of {} bytes",
                self.payload_length, max_payload_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let header = Header::new(FrameKind::Event, 0x0102_0304, 0x0A0B_0C0D);
        assert_eq!(
            header.encode(),
            [0x05, 0x01, 0x02, 0x03, 0x04, 0x0A, 0x0B, 0x0C, 0x0D]
        );
    }

    #[test]
    fn test_decode_short_buffer() {
        assert_eq!(Header::decode(&[0x02, 0, 0]).unwrap(), None);
    }

    #[test]
    fn test_decode_unknown_kind() {
        let bytes = [0x7F, 0, 0, 0, 1, 0, 0, 0, 0];
        assert!(matches!(
            Header::decode(&bytes),
            Err(ShellwireError::Protocol(_))
        ));
    }

    #[test]
    fn test_decode_matches_encode() {
        let header = Header::new(FrameKind::Request, 7, 12);
        assert_eq!(Header::decode(&header.encode()).unwrap(), Some(header));
    }

    #[test]
    fn test_validate_limit() {
        let header = Header::new(FrameKind::Request, 1, 1025);
        assert!(header.validate(1024).is_err());
        assert!(header.validate(1025).is_ok());
    }

    #[test]
    fn test_reply_kinds() {
        assert!(FrameKind::Response.is_reply());
        assert!(FrameKind::Error.is_reply());
        assert!(!FrameKind::Event.is_reply());
        assert!(!FrameKind::Hello.is_reply());
    }
}
