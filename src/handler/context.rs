//! Invocation context for handlers.
//!
//! A fresh context is built by the host for every call. It carries:
//! - the request id and the calling window (if the transport knows it)
//! - the [`HostCapabilities`] the handler may touch
//! - the host [`Lifecycle`], so the quit handler can terminate the host
//! - the [`EventSink`], so handlers can notify renderers
//!
//! # Example
//!
//! ```
//! use shellwire::handler::InvocationContext;
//! use shellwire::host::{HostCapabilities, WindowId};
//!
//! let ctx = InvocationContext::new(HostCapabilities::headless())
//!     .with_request(7, Some(WindowId(1)));
//! assert_eq!(ctx.request_id(), 7);
//! assert_eq!(ctx.window(), Some(WindowId(1)));
//! ```

use crate::host::{EventSink, HostCapabilities, Lifecycle, Platform, WindowId};

/// Context passed to every handler.
///
/// `Clone` is cheap: capabilities are shared behind `Arc`s, the lifecycle and
/// event sink are channel handles.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    /// Request ID of this call (0 when invoked in-process).
    request_id: u32,
    /// Window the request came from.
    window: Option<WindowId>,
    capabilities: HostCapabilities,
    lifecycle: Lifecycle,
    events: EventSink,
}

impl InvocationContext {
    /// Context with its own lifecycle and event sink (in-process use and tests).
    pub fn new(capabilities: HostCapabilities) -> Self {
        Self::with_host(capabilities, Lifecycle::new(), EventSink::default())
    }

    /// Context sharing the host's lifecycle and event sink.
    pub fn with_host(capabilities: HostCapabilities, lifecycle: Lifecycle, events: EventSink) -> Self {
        Self {
            request_id: 0,
            window: None,
            capabilities,
            lifecycle,
            events,
        }
    }

    /// Copy of this context bound to one request.
    pub fn with_request(&self, request_id: u32, window: Option<WindowId>) -> Self {
        Self {
            request_id,
            window,
            ..self.clone()
        }
    }

    /// Get the request ID.
    #[inline]
    pub fn request_id(&self) -> u32 {
        self.request_id
    }

    /// Window that issued the request, if known.
    #[inline]
    pub fn window(&self) -> Option<WindowId> {
        self.window
    }

    /// Privileged collaborators.
    #[inline]
    pub fn capabilities(&self) -> &HostCapabilities {
        &self.capabilities
    }

    /// Shortcut for `capabilities().platform()`.
    #[inline]
    pub fn platform(&self) -> Platform {
        self.capabilities.platform()
    }

    /// Host lifecycle.
    #[inline]
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Event sink shared with connected renderers.
    #[inline]
    pub fn events(&self) -> &EventSink {
        &self.events
    }
}
