//! Privileged collaborators that handlers act on.
//!
//! The host owns the window system, the application instance, the theme
//! source, the auth popup, the OAuth flow and the plugin bridge. Handlers never
//! reach them as globals; they are bundled in [`HostCapabilities`] and handed
//! to every invocation through its context, so tests can swap in the
//! [`headless`](super::headless) implementations.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::headless::{
    HeadlessApp, HeadlessPopup, HeadlessTheme, HeadlessWindows, StaticBridge, StaticOauth,
};
use super::Platform;
use crate::error::{Result, ShellwireError};
use crate::handler::BoxFuture;
use crate::operation::Args;

/// Identifier of a native window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub u32);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

/// Source of the application colour scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeSource {
    /// Follow the operating system.
    #[default]
    System,
    /// Force light.
    Light,
    /// Force dark.
    Dark,
}

impl ThemeSource {
    /// Lowercase name as used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

/// Windowing subsystem.
pub trait WindowManager: Send + Sync {
    /// All currently open windows.
    fn windows(&self) -> Vec<WindowId>;
    /// Minimize one window.
    fn minimize(&self, window: WindowId) -> Result<()>;
    /// Maximize one window.
    fn maximize(&self, window: WindowId) -> Result<()>;
    /// Restore one window from the maximized state.
    fn unmaximize(&self, window: WindowId) -> Result<()>;
    /// Whether the window is currently maximized.
    fn is_maximized(&self, window: WindowId) -> Result<bool>;
    /// Show or hide the native traffic-light buttons.
    fn set_window_button_visibility(&self, window: WindowId, visible: bool) -> Result<()>;
}

/// Application instance.
pub trait AppControl: Send + Sync {
    /// Quit the application. Irreversible.
    fn quit(&self) -> Result<()>;
}

/// Global theme state.
pub trait ThemeController: Send + Sync {
    /// Current theme source.
    fn theme_source(&self) -> ThemeSource;
    /// Replace the theme source.
    fn set_theme_source(&self, source: ThemeSource) -> Result<()>;
}

/// Lifecycle of the authentication popup window.
pub trait PopupManager: Send + Sync {
    /// Close the popup if one is open.
    fn close_popup(&self) -> Result<()>;
}

/// Google OAuth code retrieval.
pub trait OauthFlow: Send + Sync {
    /// Run the flow and resolve with the authorization code.
    fn google_oauth_code(&self) -> BoxFuture<'static, Result<String>>;
}

/// Bridge to capabilities provided outside the registry, addressed by
/// dotted strings.
pub trait PluginBridge: Send + Sync {
    /// Forward a call to `capability`.
    fn call(&self, capability: &BridgeCapability, args: Args) -> BoxFuture<'static, Result<Value>>;
}

/// Dotted capability address, e.g. `com.blocksuite.bookmark-block.get-bookmark-data-by-link`.
///
/// At least two segments; each segment is non-empty ASCII alphanumerics,
/// `-` or `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BridgeCapability(String);

impl BridgeCapability {
    /// Validate and wrap a capability string.
    pub fn new(capability: impl Into<String>) -> Result<Self> {
        let capability = capability.into();
        let mut segments = 0;
        for segment in capability.split('.') {
            let valid = !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
            if !valid {
                return Err(ShellwireError::InvalidArguments(format!(
                    "invalid bridge capability {capability:?}"
                )));
            }
            segments += 1;
        }
        if segments < 2 {
            return Err(ShellwireError::InvalidArguments(format!(
                "invalid bridge capability {capability:?}"
            )));
        }
        Ok(Self(capability))
    }

    /// The dotted string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for BridgeCapability {
    type Err = ShellwireError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for BridgeCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The privileged resources a handler may touch.
///
/// Cheap to clone; every collaborator is behind an `Arc`.
#[derive(Clone)]
pub struct HostCapabilities {
    windows: Arc<dyn WindowManager>,
    app: Arc<dyn AppControl>,
    theme: Arc<dyn ThemeController>,
    popup: Arc<dyn PopupManager>,
    oauth: Arc<dyn OauthFlow>,
    bridge: Arc<dyn PluginBridge>,
    platform: Platform,
}

impl HostCapabilities {
    /// Capabilities backed entirely by in-memory implementations, running on
    /// the current platform. Replace individual collaborators with the
    /// `with_*` methods.
    pub fn headless() -> Self {
        Self {
            windows: Arc::new(HeadlessWindows::new()),
            app: Arc::new(HeadlessApp::new()),
            theme: Arc::new(HeadlessTheme::new()),
            popup: Arc::new(HeadlessPopup::new()),
            oauth: Arc::new(StaticOauth::unavailable()),
            bridge: Arc::new(StaticBridge::new()),
            platform: Platform::current(),
        }
    }

    /// Replace the window manager.
    pub fn with_windows(mut self, windows: Arc<dyn WindowManager>) -> Self {
        self.windows = windows;
        self
    }

    /// Replace the application control.
    pub fn with_app(mut self, app: Arc<dyn AppControl>) -> Self {
        self.app = app;
        self
    }

    /// Replace the theme controller.
    pub fn with_theme(mut self, theme: Arc<dyn ThemeController>) -> Self {
        self.theme = theme;
        self
    }

    /// Replace the popup manager.
    pub fn with_popup(mut self, popup: Arc<dyn PopupManager>) -> Self {
        self.popup = popup;
        self
    }

    /// Replace the OAuth flow.
    pub fn with_oauth(mut self, oauth: Arc<dyn OauthFlow>) -> Self {
        self.oauth = oauth;
        self
    }

    /// Replace the plugin bridge.
    pub fn with_bridge(mut self, bridge: Arc<dyn PluginBridge>) -> Self {
        self.bridge = bridge;
        self
    }

    /// Override the platform the host reports.
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Window manager.
    pub fn windows(&self) -> &dyn WindowManager {
        self.windows.as_ref()
    }

    /// Application control.
    pub fn app(&self) -> &dyn AppControl {
        self.app.as_ref()
    }

    /// Theme controller.
    pub fn theme(&self) -> &dyn ThemeController {
        self.theme.as_ref()
    }

    /// Popup manager.
    pub fn popup(&self) -> &dyn PopupManager {
        self.popup.as_ref()
    }

    /// OAuth flow.
    pub fn oauth(&self) -> &dyn OauthFlow {
        self.oauth.as_ref()
    }

    /// Plugin bridge.
    pub fn bridge(&self) -> &dyn PluginBridge {
        self.bridge.as_ref()
    }

    /// Platform the host runs on.
    #[inline]
    pub fn platform(&self) -> Platform {
        self.platform
    }
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self::headless()
    }
}

impl fmt::Debug for HostCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostCapabilities")
            .field("platform", &self.platform)
            .finish_non_exhaustive()
    }
}
