//! Transport module - local sockets between host and renderers.
//!
//! The host and client work over any `AsyncRead + AsyncWrite` stream; this
//! module provides the Unix domain socket plumbing used outside tests.

#[cfg(unix)]
mod socket;

#[cfg(unix)]
pub use socket::{connect, socket_path, SocketListener};
