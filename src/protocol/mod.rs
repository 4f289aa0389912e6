//! Protocol module - wire format, framing, and payload envelopes.
//!
//! This module implements the binary protocol between renderer and host:
//! - 9-byte header encoding/decoding
//! - Frame buffer for accumulating partial reads
//! - MsgPack payload envelopes

mod envelope;
mod frame;
mod frame_buffer;
mod wire_format;

pub use envelope::{ErrorKind, ErrorPayload, InvokeRequest, RegistrySchema, PROTOCOL_VERSION};
pub use frame::Frame;
pub use frame_buffer::FrameBuffer;
pub use wire_format::{FrameKind, Header, DEFAULT_MAX_PAYLOAD_SIZE, HEADER_SIZE, NO_REQUEST_ID};
