//! Integration tests for shellwire.
//!
//! A host and a client talk over `tokio::io::duplex` or a Unix socket, with
//! headless capabilities standing in for the window system.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use shellwire::client::IpcClient;
use shellwire::host::headless::{
    HeadlessApp, HeadlessPopup, HeadlessTheme, HeadlessWindows, StaticBridge, StaticOauth,
};
use shellwire::host::{HostCapabilities, Platform, ThemeController, ThemeSource, WindowId};
use shellwire::protocol::ErrorKind;
use shellwire::server::{Host, HostBuilder};
use shellwire::ui::{UiOperation, UiRequest, BOOKMARK_DATA_CAPABILITY, FINISH_LOGIN_EVENT};
use shellwire::{HandlerRegistry, ShellwireError};

struct Shell {
    windows: Arc<HeadlessWindows>,
    app: Arc<HeadlessApp>,
    theme: Arc<HeadlessTheme>,
    popup: Arc<HeadlessPopup>,
    host: Host,
}

fn shell(platform: Platform) -> Shell {
    let windows = Arc::new(HeadlessWindows::with_windows(2));
    let app = Arc::new(HeadlessApp::new());
    let theme = Arc::new(HeadlessTheme::new());
    let popup = Arc::new(HeadlessPopup::new());
    let bridge = StaticBridge::new().with(BOOKMARK_DATA_CAPABILITY, |args| match args.first() {
        Some(Value::String(link)) => Ok(json!({ "url": link, "title": "Example" })),
        _ => Err(ShellwireError::InvalidArguments("link required".to_string())),
    });

    let capabilities = HostCapabilities::headless()
        .with_windows(windows.clone())
        .with_app(app.clone())
        .with_theme(theme.clone())
        .with_popup(popup.clone())
        .with_oauth(Arc::new(StaticOauth::code("oauth-code")))
        .with_bridge(Arc::new(bridge));

    let host = HostBuilder::new()
        .capabilities(capabilities)
        .platform(platform)
        .build()
        .unwrap();

    Shell {
        windows,
        app,
        theme,
        popup,
        host,
    }
}

async fn connect(host: &Host) -> (IpcClient, tokio::task::JoinHandle<shellwire::Result<()>>) {
    let (renderer, host_side) = tokio::io::duplex(64 * 1024);
    let host = host.clone();
    let serve = tokio::spawn(async move { host.serve(host_side).await });
    let client = IpcClient::connect(renderer).await.unwrap();
    (client, serve)
}

#[tokio::test]
async fn test_hello_announces_ui_namespace() {
    let shell = shell(Platform::Linux);
    let (client, _serve) = connect(&shell.host).await;

    let schema = client.schema();
    assert_eq!(schema.version, shellwire::protocol::PROTOCOL_VERSION);
    assert_eq!(schema.operations.len(), UiOperation::ALL.len());
    for op in UiOperation::ALL {
        assert!(schema.has_operation(op.name()), "{op} not announced");
    }
    assert_eq!(schema.events[0].as_str(), FINISH_LOGIN_EVENT);
}

#[tokio::test]
async fn test_window_operations_over_duplex() {
    let shell = shell(Platform::Linux);
    let (client, _serve) = connect(&shell.host).await;

    client.invoke_ui(UiRequest::MinimizeApp).await.unwrap();
    assert!(shell.windows.state(WindowId(1)).unwrap().minimized);
    assert!(shell.windows.state(WindowId(2)).unwrap().minimized);

    client.invoke_ui(UiRequest::MaximizeApp).await.unwrap();
    assert!(shell.windows.state(WindowId(1)).unwrap().maximized);
    client.invoke_ui(UiRequest::MaximizeApp).await.unwrap();
    assert!(!shell.windows.state(WindowId(1)).unwrap().maximized);
}

#[tokio::test]
async fn test_theme_change_over_duplex() {
    let shell = shell(Platform::Linux);
    let (client, _serve) = connect(&shell.host).await;

    let result = client
        .invoke_ui(UiRequest::ThemeChange {
            theme: ThemeSource::Light,
        })
        .await
        .unwrap();
    assert_eq!(result, Value::Null);
    assert_eq!(shell.theme.theme_source(), ThemeSource::Light);
}

#[tokio::test]
async fn test_sidebar_follows_platform() {
    let mac = shell(Platform::MacOs);
    let (client, _serve) = connect(&mac.host).await;
    client
        .invoke_ui(UiRequest::SidebarVisibilityChange { visible: false })
        .await
        .unwrap();
    assert!(!mac.windows.state(WindowId(1)).unwrap().buttons_visible);

    let linux = shell(Platform::Linux);
    let (client, _serve) = connect(&linux.host).await;
    client
        .invoke_ui(UiRequest::SidebarVisibilityChange { visible: false })
        .await
        .unwrap();
    assert!(linux.windows.state(WindowId(1)).unwrap().buttons_visible);
}

#[tokio::test]
async fn test_values_returned_to_renderer() {
    let shell = shell(Platform::Linux);
    let (client, _serve) = connect(&shell.host).await;

    let code: String = client
        .invoke_as(UiOperation::GetGoogleOauthCode.name(), vec![])
        .await
        .unwrap();
    assert_eq!(code, "oauth-code");

    let bookmark = client
        .invoke_ui(UiRequest::GetBookmarkDataByLink {
            link: "https://example.com".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(bookmark["url"], "https://example.com");
}

#[tokio::test]
async fn test_failures_reach_renderer() {
    let shell = shell(Platform::Linux);
    let (client, _serve) = connect(&shell.host).await;

    let err = client.invoke("ui:handleTeleport", vec![]).await.unwrap_err();
    assert!(matches!(
        err,
        ShellwireError::Remote { kind: ErrorKind::OperationNotFound, .. }
    ));

    let err = client
        .invoke("ui:handleThemeChange", vec![json!("sepia")])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ShellwireError::Remote { kind: ErrorKind::InvalidArguments, .. }
    ));

    shell.windows.set_broken(WindowId(1), true);
    let err = client.invoke_ui(UiRequest::MinimizeApp).await.unwrap_err();
    match err {
        ShellwireError::Remote { kind, message } => {
            assert_eq!(kind, ErrorKind::HandlerFailure);
            assert!(message.contains("ui:handleMinimizeApp"), "{message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(shell.windows.state(WindowId(2)).unwrap().minimized);

    // The connection survives every failure.
    client.invoke_ui(UiRequest::MaximizeApp).await.unwrap_err();
    assert!(shell.windows.state(WindowId(2)).unwrap().maximized);
}

#[tokio::test]
async fn test_finish_login_event_reaches_every_renderer() {
    let shell = shell(Platform::Linux);
    let (first, _serve1) = connect(&shell.host).await;
    let (second, _serve2) = connect(&shell.host).await;
    let mut first_events = first.subscribe();
    let mut second_events = second.subscribe();
    shell.popup.open();

    first.invoke_ui(UiRequest::FinishLogin).await.unwrap();
    assert!(!shell.popup.is_open());

    for events in [&mut first_events, &mut second_events] {
        let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.name.as_str(), FINISH_LOGIN_EVENT);
        assert_eq!(event.payload, Value::Null);
    }
}

#[tokio::test]
async fn test_close_app_terminates_host() {
    let shell = shell(Platform::Linux);
    let (client, serve) = connect(&shell.host).await;

    client.invoke_ui(UiRequest::CloseApp).await.unwrap();
    assert_eq!(shell.app.quit_calls(), 1);

    serve.await.unwrap().unwrap();
    assert!(shell.host.lifecycle().is_terminated());

    let err = client.invoke_ui(UiRequest::MinimizeApp).await.unwrap_err();
    assert!(matches!(err, ShellwireError::ConnectionClosed));
    assert!(!shell.windows.state(WindowId(1)).unwrap().minimized);

    let err = shell.host.invoke("ui:handleMinimizeApp", vec![]).await.unwrap_err();
    assert!(matches!(err, ShellwireError::HostTerminated));
    assert_eq!(shell.app.quit_calls(), 1);
}

#[tokio::test]
async fn test_concurrent_calls_resolve_by_request_id() {
    let mut builder = HandlerRegistry::builder();
    builder
        .register("test:delay", |_ctx, (millis, tag): (u64, String)| async move {
            tokio::time::sleep(Duration::from_millis(millis)).await;
            Ok(tag)
        })
        .unwrap();
    let host = HostBuilder::new().registry(builder.build()).build().unwrap();
    let (client, _serve) = connect(&host).await;

    let (slow, fast) = tokio::join!(
        client.invoke("test:delay", vec![json!(80), json!("slow")]),
        client.invoke("test:delay", vec![json!(5), json!("fast")]),
    );
    assert_eq!(slow.unwrap(), json!("slow"));
    assert_eq!(fast.unwrap(), json!("fast"));
}

#[tokio::test]
async fn test_oversized_result_fails_only_its_own_call() {
    const LIMIT: u32 = 1024;

    let mut builder = HandlerRegistry::builder();
    builder
        .register("test:big", |_ctx, ()| async { Ok("x".repeat(4 * LIMIT as usize)) })
        .unwrap();
    builder
        .register("test:slow", |_ctx, ()| async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok("done")
        })
        .unwrap();
    let host = HostBuilder::new()
        .registry(builder.build())
        .max_frame_size(LIMIT)
        .build()
        .unwrap();

    let (renderer, host_side) = tokio::io::duplex(64 * 1024);
    let serving = host.clone();
    tokio::spawn(async move { serving.serve(host_side).await });
    let client = IpcClient::connect_with(renderer, LIMIT).await.unwrap();

    let (big, slow) = tokio::join!(
        client.invoke("test:big", vec![]),
        client.invoke("test:slow", vec![]),
    );
    match big.unwrap_err() {
        ShellwireError::Remote { kind, message } => {
            assert_eq!(kind, ErrorKind::Protocol);
            assert!(message.contains("frame limit"), "{message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(slow.unwrap(), json!("done"));

    let after = client.invoke("test:slow", vec![]).await.unwrap();
    assert_eq!(after, json!("done"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_end_to_end_over_unix_socket() {
    use shellwire::transport::{connect as connect_socket, socket_path, SocketListener};

    let shell = shell(Platform::Linux);
    let listener = SocketListener::bind(socket_path()).await.unwrap();
    let path = listener.path().to_path_buf();

    let host = shell.host.clone();
    let serving = tokio::spawn(async move { host.serve_listener(&listener).await });

    let client = IpcClient::connect(connect_socket(&path).await.unwrap())
        .await
        .unwrap();
    client.invoke_ui(UiRequest::MinimizeApp).await.unwrap();
    assert!(shell.windows.state(WindowId(1)).unwrap().minimized);

    client.invoke_ui(UiRequest::CloseApp).await.unwrap();
    tokio::time::timeout(Duration::from_secs(1), serving)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(!path.exists());
}
