//! Host module - privileged collaborators and process-wide host state.
//!
//! Provides:
//! - [`HostCapabilities`] - window manager, app, theme, popup, OAuth, bridge
//! - [`Platform`] - operating system the host runs on
//! - [`Lifecycle`] - one-way termination flag shared by host and handlers
//! - [`EventSink`] - events pushed to renderers
//! - [`headless`] - in-memory implementations for tests and demos

mod capabilities;
pub mod headless;
mod lifecycle;
mod platform;

pub use capabilities::{
    AppControl, BridgeCapability, HostCapabilities, OauthFlow, PluginBridge, PopupManager,
    ThemeController, ThemeSource, WindowId, WindowManager,
};
pub use lifecycle::{EventSink, HostEvent, Lifecycle, DEFAULT_EVENT_CAPACITY};
pub use platform::Platform;
