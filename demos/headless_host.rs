//! Headless Host - a host and a renderer talking over an in-memory stream.
//!
//! This demo shows:
//! - Building a host with headless capabilities
//! - Invoking `ui` operations from the renderer side
//! - Receiving `ui:onFinishLogin` pushed by the host
//! - Quitting, which stops the host
//!
//! ```sh
//! RUST_LOG=shellwire=debug cargo run --example headless_host
//! ```

use std::sync::Arc;

use shellwire::client::IpcClient;
use shellwire::host::headless::{HeadlessPopup, HeadlessWindows, StaticBridge, StaticOauth};
use shellwire::host::{HostCapabilities, ThemeSource};
use shellwire::ui::{UiRequest, BOOKMARK_DATA_CAPABILITY};
use shellwire::{HostBuilder, HostConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("shellwire=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let windows = Arc::new(HeadlessWindows::with_windows(2));
    let popup = Arc::new(HeadlessPopup::new());
    let bridge = StaticBridge::new().with(BOOKMARK_DATA_CAPABILITY, |args| {
        Ok(serde_json::json!({ "url": args.first(), "title": "Bookmark preview" }))
    });

    let capabilities = HostCapabilities::headless()
        .with_windows(windows.clone())
        .with_popup(popup.clone())
        .with_oauth(Arc::new(StaticOauth::code("demo-oauth-code")))
        .with_bridge(Arc::new(bridge));

    let host = HostBuilder::new()
        .config(HostConfig::from_env()?)
        .capabilities(capabilities)
        .build()?;

    let (renderer, host_side) = tokio::io::duplex(64 * 1024);
    let serving = {
        let host = host.clone();
        tokio::spawn(async move { host.serve(host_side).await })
    };

    let client = IpcClient::connect(renderer).await?;
    let mut events = client.subscribe();
    println!("Host serves {} operations", client.schema().operations.len());

    client
        .invoke_ui(UiRequest::ThemeChange {
            theme: ThemeSource::Dark,
        })
        .await?;
    client.invoke_ui(UiRequest::MaximizeApp).await?;
    for id in [1, 2] {
        let state = windows.state(shellwire::host::WindowId(id));
        println!("window#{id}: {state:?}");
    }

    let code = client.invoke_ui(UiRequest::GetGoogleOauthCode).await?;
    println!("OAuth code: {code}");

    let bookmark = client
        .invoke_ui(UiRequest::GetBookmarkDataByLink {
            link: "https://example.com".to_string(),
        })
        .await?;
    println!("Bookmark: {bookmark}");

    popup.open();
    client.invoke_ui(UiRequest::FinishLogin).await?;
    let event = events.recv().await?;
    println!("Event: {} (popup open: {})", event.name, popup.is_open());

    client.invoke_ui(UiRequest::CloseApp).await?;
    serving.await??;
    println!("Host terminated: {}", host.lifecycle().is_terminated());

    Ok(())
}
