//! Handlers of the `ui` namespace.
//!
//! Window actions are best-effort over the live window set: a window that
//! fails is logged and skipped, the rest are still processed, and the first
//! failure is reported to the caller afterwards.

use serde_json::Value;

use super::{BOOKMARK_DATA_CAPABILITY, FINISH_LOGIN_EVENT};
use crate::error::Result;
use crate::handler::InvocationContext;
use crate::host::{BridgeCapability, ThemeSource, WindowId, WindowManager};

fn for_each_window<F>(ctx: &InvocationContext, action: &str, mut f: F) -> Result<()>
where
    F: FnMut(&dyn WindowManager, WindowId) -> Result<()>,
{
    let windows = ctx.capabilities().windows();
    let mut first_error = None;

    for window in windows.windows() {
        if let Err(e) = f(windows, window) {
            tracing::warn!("Failed to {} {}: {}", action, window, e);
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// `ui:handleThemeChange`
pub async fn theme_change(ctx: InvocationContext, (theme,): (ThemeSource,)) -> Result<()> {
    ctx.capabilities().theme().set_theme_source(theme)
}

/// `ui:handleSidebarVisibilityChange`
///
/// Only macOS draws the traffic-light buttons over the sidebar, so they are
/// hidden together with it. Other platforms ignore the call.
pub async fn sidebar_visibility_change(
    ctx: InvocationContext,
    (visible,): (bool,),
) -> Result<()> {
    if !ctx.platform().is_macos() {
        return Ok(());
    }
    for_each_window(&ctx, "set button visibility of", |windows, window| {
        windows.set_window_button_visibility(window, visible)
    })
}

/// `ui:handleMinimizeApp`
pub async fn minimize_app(ctx: InvocationContext, _: ()) -> Result<()> {
    for_each_window(&ctx, "minimize", |windows, window| windows.minimize(window))
}

/// `ui:handleMaximizeApp` - toggles every window between maximized and restored.
pub async fn maximize_app(ctx: InvocationContext, _: ()) -> Result<()> {
    for_each_window(&ctx, "toggle maximize of", |windows, window| {
        if windows.is_maximized(window)? {
            windows.unmaximize(window)
        } else {
            windows.maximize(window)
        }
    })
}

/// `ui:handleCloseApp` - quits the application and terminates the host.
///
/// If quitting fails the host stays alive and the failure is reported.
pub async fn close_app(ctx: InvocationContext, _: ()) -> Result<()> {
    ctx.capabilities().app().quit()?;
    if ctx.lifecycle().terminate() {
        tracing::info!("Quit requested by request {}, host terminating", ctx.request_id());
    }
    Ok(())
}

/// `ui:handleFinishLogin` - closes the auth popup and emits `ui:onFinishLogin`.
pub async fn finish_login(ctx: InvocationContext, _: ()) -> Result<()> {
    ctx.capabilities().popup().close_popup()?;
    ctx.events().emit(FINISH_LOGIN_EVENT.parse()?, Value::Null);
    Ok(())
}

/// `ui:getGoogleOauthCode`
pub async fn get_google_oauth_code(ctx: InvocationContext, _: ()) -> Result<String> {
    let flow = ctx.capabilities().oauth().google_oauth_code();
    flow.await
}

/// `ui:getBookmarkDataByLink` - forwarded to the bookmark block over the
/// plugin bridge. Kept for renderers that predate bridge calls of their own.
pub async fn get_bookmark_data_by_link(
    ctx: InvocationContext,
    (link,): (String,),
) -> Result<Value> {
    let capability = BridgeCapability::new(BOOKMARK_DATA_CAPABILITY)?;
    let call = ctx
        .capabilities()
        .bridge()
        .call(&capability, vec![Value::String(link)]);
    call.await
}
