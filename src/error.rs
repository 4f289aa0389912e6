//! Error types for shellwire.

use thiserror::Error;

use crate::protocol::ErrorKind;

/// Main error type for all shellwire operations.
#[derive(Debug, Error)]
pub enum ShellwireError {
    /// An operation name was registered twice while building the registry.
    #[error("Operation already registered: {0}")]
    DuplicateRegistration(String),

    /// No handler is registered under the requested name.
    #[error("Operation not found: {0}")]
    OperationNotFound(String),

    /// The handler ran and failed. The handler's own error is kept as the source.
    #[error("Handler for {operation} failed: {source}")]
    HandlerFailure {
        /// Operation whose handler failed.
        operation: String,
        /// The handler's error, unchanged.
        #[source]
        source: Box<ShellwireError>,
    },

    /// Positional arguments did not match the handler's signature.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Operation name is not of the form `namespace:verb`.
    #[error("Invalid operation name: {0:?}")]
    InvalidOperationName(String),

    /// The host has quit; no further invocations are served.
    #[error("Host terminated")]
    HostTerminated,

    /// A host collaborator (window system, theme, OAuth, ...) reported a failure.
    #[error("{capability} failed: {message}")]
    Capability {
        /// Collaborator name.
        capability: &'static str,
        /// Failure description.
        message: String,
    },

    /// The plugin bridge has nothing registered under the capability string.
    #[error("Bridge capability not found: {0}")]
    BridgeCapabilityNotFound(String),

    /// Failure reported by the host to a remote caller.
    #[error("Remote error ({kind:?}): {message}")]
    Remote {
        /// Classification sent by the host.
        kind: ErrorKind,
        /// Host-side error message.
        message: String,
    },

    /// Protocol error (oversized frame, unknown frame kind, unexpected frame).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid configuration value.
    #[error("Invalid configuration for {key}: {reason}")]
    Config {
        /// Configuration key.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// I/O error during socket/stream operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON value conversion error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// Connection closed unexpectedly.
    #[error("Connection closed")]
    ConnectionClosed,
}

impl ShellwireError {
    /// Shorthand for a collaborator failure.
    pub fn capability(capability: &'static str, message: impl Into<String>) -> Self {
        Self::Capability {
            capability,
            message: message.into(),
        }
    }

    /// Classification used when the error crosses the wire.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OperationNotFound(_) => ErrorKind::OperationNotFound,
            Self::HandlerFailure { .. } => ErrorKind::HandlerFailure,
            Self::InvalidArguments(_) => ErrorKind::InvalidArguments,
            Self::HostTerminated => ErrorKind::HostTerminated,
            Self::Remote { kind, .. } => *kind,
            _ => ErrorKind::Protocol,
        }
    }
}

/// Result type alias using ShellwireError.
pub type Result<T> = std::result::Result<T, ShellwireError>;
