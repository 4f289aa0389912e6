//! Payload types carried inside frames.
//!
//! | Frame      | Payload                |
//! |------------|------------------------|
//! | `HELLO`    | [`RegistrySchema`]     |
//! | `REQUEST`  | [`InvokeRequest`]      |
//! | `RESPONSE` | result value           |
//! | `ERROR`    | [`ErrorPayload`]       |
//! | `EVENT`    | [`HostEvent`](crate::host::HostEvent) |

use serde::{Deserialize, Serialize};

use crate::error::ShellwireError;
use crate::host::WindowId;
use crate::operation::{Args, OperationName};

/// Protocol version string.
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// Operations and events a host serves, sent once on connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySchema {
    /// Protocol version of the host.
    pub version: String,
    /// Invocable operations, sorted.
    pub operations: Vec<OperationName>,
    /// Events the host may push, sorted.
    pub events: Vec<OperationName>,
}

impl RegistrySchema {
    /// Whether the host serves `name`.
    pub fn has_operation(&self, name: &str) -> bool {
        self.operations.iter().any(|op| op.as_str() == name)
    }
}

/// Body of a `REQUEST` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvokeRequest {
    /// Operation name; kept as a plain string so unknown or malformed names
    /// reach the registry and come back as `OperationNotFound`.
    pub operation: String,
    /// Positional arguments.
    #[serde(default)]
    pub args: Args,
    /// Window the call originates from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<WindowId>,
}

/// Classification of a failed invocation, as seen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// No handler under that name.
    OperationNotFound,
    /// The handler ran and failed.
    HandlerFailure,
    /// Arguments did not match the handler.
    InvalidArguments,
    /// The host has quit.
    HostTerminated,
    /// Malformed request, capacity exhausted or another transport-level problem.
    Protocol,
}

/// Body of an `ERROR` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Classification.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
}

impl From<&ShellwireError> for ErrorPayload {
    fn from(err: &ShellwireError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<ErrorPayload> for ShellwireError {
    fn from(payload: ErrorPayload) -> Self {
        ShellwireError::Remote {
            kind: payload.kind,
            message: payload.message,
        }
    }
}
