//! # shellwire
//!
//! Namespaced IPC handler registry for a desktop shell's privileged host
//! process.
//!
//! Renderers invoke operations such as `ui:handleMinimizeApp` by name; the
//! host looks the name up in an immutable [`HandlerRegistry`] and runs the
//! handler with an [`InvocationContext`] carrying the privileged host
//! capabilities (windows, theme, popup, OAuth, plugin bridge).
//!
//! ## Architecture
//!
//! - **Registry**: built once at startup, frozen, shared as `Arc`
//! - **Host**: serves the registry over any byte stream (Unix socket, duplex)
//! - **Client**: renderer side; request/response by id plus pushed events
//!
//! ## Example
//!
//! ```
//! use shellwire::client::IpcClient;
//! use shellwire::server::HostBuilder;
//! use shellwire::ui::UiRequest;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> shellwire::Result<()> {
//!     let host = HostBuilder::new().build()?;
//!     let (renderer, host_side) = tokio::io::duplex(64 * 1024);
//!     tokio::spawn(async move { host.serve(host_side).await });
//!
//!     let client = IpcClient::connect(renderer).await?;
//!     client.invoke_ui(UiRequest::MaximizeApp).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod handler;
pub mod host;
pub mod operation;
pub mod protocol;
pub mod server;
pub mod transport;
pub mod ui;

mod writer;

pub use client::IpcClient;
pub use config::HostConfig;
pub use error::{Result, ShellwireError};
pub use handler::{HandlerRegistry, InvocationContext, RegistryBuilder};
pub use operation::OperationName;
pub use server::{Host, HostBuilder};
pub use ui::{UiOperation, UiRequest};
