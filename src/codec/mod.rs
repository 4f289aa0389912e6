//! Codec module - serialization of frame payloads.
//!
//! - [`MsgPackCodec`] - MessagePack using `rmp-serde` (`to_vec_named` for
//!   JavaScript renderers)
//!
//! Codecs are marker structs with static methods rather than trait objects.
//!
//! # Example
//!
//! ```
//! use shellwire::codec::MsgPackCodec;
//! use serde_json::{json, Value};
//!
//! let encoded = MsgPackCodec::encode(&json!({ "theme": "dark" })).unwrap();
//! let decoded: Value = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded["theme"], "dark");
//! ```

mod msgpack;

pub use msgpack::MsgPackCodec;
