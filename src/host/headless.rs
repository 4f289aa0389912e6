//! In-memory implementations of every host capability.
//!
//! Used by tests and by hosts running without a real window system. State is
//! kept behind `std::sync::Mutex`/atomics; no lock is held across an await.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use super::capabilities::{
    AppControl, BridgeCapability, OauthFlow, PluginBridge, PopupManager, ThemeController,
    ThemeSource, WindowId, WindowManager,
};
use crate::error::{Result, ShellwireError};
use crate::handler::BoxFuture;
use crate::operation::Args;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Observable state of one headless window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    /// Minimized.
    pub minimized: bool,
    /// Maximized.
    pub maximized: bool,
    /// Native window buttons visible.
    pub buttons_visible: bool,
    /// Every operation on this window fails.
    pub broken: bool,
}

impl Default for WindowState {
    fn default() -> Self {
        Self {
            minimized: false,
            maximized: false,
            buttons_visible: true,
            broken: false,
        }
    }
}

/// Window manager over an in-memory window set.
#[derive(Debug, Default)]
pub struct HeadlessWindows {
    windows: Mutex<BTreeMap<WindowId, WindowState>>,
    next_id: AtomicU32,
}

impl HeadlessWindows {
    /// No windows open.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `count` fresh windows.
    pub fn with_windows(count: usize) -> Self {
        let this = Self::new();
        for _ in 0..count {
            this.open();
        }
        this
    }

    /// Open a new window and return its id.
    pub fn open(&self) -> WindowId {
        let id = WindowId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        lock(&self.windows).insert(id, WindowState::default());
        id
    }

    /// Close a window. Returns whether it was open.
    pub fn close(&self, window: WindowId) -> bool {
        lock(&self.windows).remove(&window).is_some()
    }

    /// Snapshot of a window's state.
    pub fn state(&self, window: WindowId) -> Option<WindowState> {
        lock(&self.windows).get(&window).copied()
    }

    /// Make every operation on `window` fail, simulating a destroyed native handle.
    pub fn set_broken(&self, window: WindowId, broken: bool) {
        if let Some(state) = lock(&self.windows).get_mut(&window) {
            state.broken = broken;
        }
    }

    fn update<R>(&self, window: WindowId, f: impl FnOnce(&mut WindowState) -> R) -> Result<R> {
        let mut windows = lock(&self.windows);
        match windows.get_mut(&window) {
            Some(state) if state.broken => Err(ShellwireError::capability(
                "window",
                format!("{window} is destroyed"),
            )),
            Some(state) => Ok(f(state)),
            None => Err(ShellwireError::capability(
                "window",
                format!("{window} does not exist"),
            )),
        }
    }
}

impl WindowManager for HeadlessWindows {
    fn windows(&self) -> Vec<WindowId> {
        lock(&self.windows).keys().copied().collect()
    }

    fn minimize(&self, window: WindowId) -> Result<()> {
        self.update(window, |w| {
            w.minimized = true;
        })
    }

    fn maximize(&self, window: WindowId) -> Result<()> {
        self.update(window, |w| {
            w.maximized = true;
            w.minimized = false;
        })
    }

    fn unmaximize(&self, window: WindowId) -> Result<()> {
        self.update(window, |w| {
            w.maximized = false;
        })
    }

    fn is_maximized(&self, window: WindowId) -> Result<bool> {
        self.update(window, |w| w.maximized)
    }

    fn set_window_button_visibility(&self, window: WindowId, visible: bool) -> Result<()> {
        self.update(window, |w| {
            w.buttons_visible = visible;
        })
    }
}

/// Application instance that records quit requests.
#[derive(Debug, Default)]
pub struct HeadlessApp {
    quit_calls: AtomicUsize,
}

impl HeadlessApp {
    /// A running app.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether quit has been requested.
    pub fn has_quit(&self) -> bool {
        self.quit_calls() > 0
    }

    /// Number of quit requests.
    pub fn quit_calls(&self) -> usize {
        self.quit_calls.load(Ordering::Acquire)
    }
}

impl AppControl for HeadlessApp {
    fn quit(&self) -> Result<()> {
        self.quit_calls.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

/// Theme state held in memory.
#[derive(Debug, Default)]
pub struct HeadlessTheme {
    source: Mutex<ThemeSource>,
}

impl HeadlessTheme {
    /// Starts at [`ThemeSource::System`].
    pub fn new() -> Self {
        Self::default()
    }
}

impl ThemeController for HeadlessTheme {
    fn theme_source(&self) -> ThemeSource {
        *lock(&self.source)
    }

    fn set_theme_source(&self, source: ThemeSource) -> Result<()> {
        *lock(&self.source) = source;
        Ok(())
    }
}

/// Auth popup that is either open or closed.
#[derive(Debug, Default)]
pub struct HeadlessPopup {
    open: AtomicBool,
    close_calls: AtomicUsize,
}

impl HeadlessPopup {
    /// No popup open.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the popup.
    pub fn open(&self) {
        self.open.store(true, Ordering::Release);
    }

    /// Whether the popup is open.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Number of close requests, including those with no popup open.
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::Acquire)
    }
}

impl PopupManager for HeadlessPopup {
    fn close_popup(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::AcqRel);
        self.open.store(false, Ordering::Release);
        Ok(())
    }
}

/// OAuth flow with a fixed outcome.
#[derive(Debug, Clone)]
pub struct StaticOauth {
    outcome: std::result::Result<String, String>,
}

impl StaticOauth {
    /// Always resolve with `code`.
    pub fn code(code: impl Into<String>) -> Self {
        Self {
            outcome: Ok(code.into()),
        }
    }

    /// Always fail with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
        }
    }

    /// Fail because no OAuth flow is configured.
    pub fn unavailable() -> Self {
        Self::failing("no OAuth flow configured")
    }
}

impl OauthFlow for StaticOauth {
    fn google_oauth_code(&self) -> BoxFuture<'static, Result<String>> {
        let outcome = self.outcome.clone();
        Box::pin(async move { outcome.map_err(|message| ShellwireError::capability("oauth", message)) })
    }
}

type BridgeFn = Arc<dyn Fn(Args) -> Result<Value> + Send + Sync>;

/// Plugin bridge backed by a fixed table of closures.
#[derive(Default, Clone)]
pub struct StaticBridge {
    routes: HashMap<String, BridgeFn>,
}

impl StaticBridge {
    /// Empty bridge; every call fails with `BridgeCapabilityNotFound`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `capability` with `f`.
    pub fn with<F>(mut self, capability: &str, f: F) -> Self
    where
        F: Fn(Args) -> Result<Value> + Send + Sync + 'static,
    {
        self.routes.insert(capability.to_string(), Arc::new(f));
        self
    }
}

impl PluginBridge for StaticBridge {
    fn call(&self, capability: &BridgeCapability, args: Args) -> BoxFuture<'static, Result<Value>> {
        let route = self.routes.get(capability.as_str()).cloned();
        let capability = capability.to_string();
        Box::pin(async move {
            match route {
                Some(f) => f(args),
                None => Err(ShellwireError::BridgeCapabilityNotFound(capability)),
            }
        })
    }
}

impl std::fmt::Debug for StaticBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticBridge")
            .field("routes", &self.routes.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_window_ids_are_sequential() {
        let windows = HeadlessWindows::with_windows(3);
        assert_eq!(windows.windows(), vec![WindowId(1), WindowId(2), WindowId(3)]);
        assert!(windows.close(WindowId(2)));
        assert!(!windows.close(WindowId(2)));
        assert_eq!(windows.windows(), vec![WindowId(1), WindowId(3)]);
    }

    #[test]
    fn test_window_state_transitions() {
        let windows = HeadlessWindows::new();
        let id = windows.open();

        windows.minimize(id).unwrap();
        assert!(windows.state(id).unwrap().minimized);

        windows.maximize(id).unwrap();
        let state = windows.state(id).unwrap();
        assert!(state.maximized);
        assert!(!state.minimized);

        windows.unmaximize(id).unwrap();
        assert!(!windows.is_maximized(id).unwrap());

        windows.set_window_button_visibility(id, false).unwrap();
        assert!(!windows.state(id).unwrap().buttons_visible);
    }

    #[test]
    fn test_missing_and_broken_windows_fail() {
        let windows = HeadlessWindows::with_windows(1);
        assert!(windows.minimize(WindowId(9)).is_err());

        windows.set_broken(WindowId(1), true);
        let err = windows.maximize(WindowId(1)).unwrap_err();
        assert!(matches!(err, ShellwireError::Capability { capability: "window", .. }));
    }

    #[test]
    fn test_popup_close() {
        let popup = HeadlessPopup::new();
        popup.open();
        assert!(popup.is_open());
        popup.close_popup().unwrap();
        assert!(!popup.is_open());
        assert_eq!(popup.close_calls(), 1);
    }

    #[tokio::test]
    async fn test_static_oauth() {
        assert_eq!(StaticOauth::code("4/abc").google_oauth_code().await.unwrap(), "4/abc");
        let err = StaticOauth::failing("denied").google_oauth_code().await.unwrap_err();
        assert_eq!(err.to_string(), "oauth failed: denied");
    }

    #[tokio::test]
    async fn test_static_bridge_routes() {
        let bridge = StaticBridge::new().with("com.example.echo", |args| Ok(json!(args)));
        let echo = BridgeCapability::new("com.example.echo").unwrap();
        let missing = BridgeCapability::new("com.example.missing").unwrap();

        assert_eq!(bridge.call(&echo, vec![json!(1)]).await.unwrap(), json!([1]));
        assert!(matches!(
            bridge.call(&missing, vec![]).await,
            Err(ShellwireError::BridgeCapabilityNotFound(ref c)) if c == "com.example.missing"
        ));
    }
}
