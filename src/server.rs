//! Host builder and per-connection serve loop.
//!
//! The [`HostBuilder`] collects the registry, the capabilities and the
//! configuration. A [`Host`] serves renderer connections:
//! 1. Send HELLO with the registry schema
//! 2. Spawn the writer task and the event forwarder
//! 3. Read frames and dispatch each REQUEST on its own task
//! 4. Stop when the peer closes or the host terminates
//!
//! # Example
//!
//! ```no_run
//! use shellwire::host::HostCapabilities;
//! use shellwire::server::HostBuilder;
//! use shellwire::transport::{socket_path, SocketListener};
//!
//! #[tokio::main]
//! async fn main() -> shellwire::Result<()> {
//!     let host = HostBuilder::new()
//!         .capabilities(HostCapabilities::headless())
//!         .max_concurrent_invocations(32)
//!         .build()?;
//!
//!     let listener = SocketListener::bind(socket_path()).await?;
//!     host.serve_listener(&listener).await
//! }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinSet;

use crate::config::HostConfig;
use crate::error::{Result, ShellwireError};
use crate::handler::{HandlerRegistry, InvocationContext};
use crate::host::{EventSink, HostCapabilities, Lifecycle, Platform};
use crate::operation::Args;
use crate::protocol::{
    ErrorPayload, Frame, FrameBuffer, FrameKind, InvokeRequest, RegistrySchema, NO_REQUEST_ID,
};
use crate::ui::ui_registry;
use crate::writer::{spawn_writer_task, WriterHandle};

/// Bytes requested from the stream per read.
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Pause after a failed `accept` before trying again.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Builder for a [`Host`].
///
/// Without an explicit registry the host serves the `ui` namespace.
#[derive(Default)]
pub struct HostBuilder {
    registry: Option<Arc<HandlerRegistry>>,
    capabilities: HostCapabilities,
    config: HostConfig,
    events: Option<EventSink>,
}

impl HostBuilder {
    /// Builder with headless capabilities and default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `registry` instead of the `ui` namespace.
    pub fn registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = Some(Arc::new(registry));
        self
    }

    /// Serve an already shared registry.
    pub fn shared_registry(mut self, registry: Arc<HandlerRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Capabilities handed to every invocation.
    pub fn capabilities(mut self, capabilities: HostCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: HostConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the maximum number of invocations running at once per connection.
    ///
    /// Requests over the limit are answered with a protocol error.
    /// Default: 256
    pub fn max_concurrent_invocations(mut self, limit: usize) -> Self {
        self.config.max_concurrent_invocations = limit;
        self
    }

    /// Set the outbound frame channel capacity.
    ///
    /// Default: 1024
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    /// Set the largest frame payload accepted from renderers and sent to them.
    ///
    /// Default: 16 MiB
    pub fn max_frame_size(mut self, size: u32) -> Self {
        self.config.max_frame_size = size;
        self
    }

    /// Report `platform` to handlers regardless of the build target.
    pub fn platform(mut self, platform: Platform) -> Self {
        self.config.platform = Some(platform);
        self
    }

    /// Publish events through an existing sink.
    pub fn events(mut self, events: EventSink) -> Self {
        self.events = Some(events);
        self
    }

    /// Validate the configuration and build the host.
    ///
    /// # Errors
    ///
    /// `Config` for invalid settings; `DuplicateRegistration` can only come
    /// from building the default `ui` registry.
    pub fn build(self) -> Result<Host> {
        self.config.validate()?;

        let registry = match self.registry {
            Some(registry) => registry,
            None => Arc::new(ui_registry()?),
        };
        let capabilities = match self.config.platform {
            Some(platform) => self.capabilities.with_platform(platform),
            None => self.capabilities,
        };

        Ok(Host {
            registry,
            capabilities,
            config: self.config,
            lifecycle: Lifecycle::new(),
            events: self.events.unwrap_or_default(),
        })
    }
}

/// A host serving a registry to renderer connections.
///
/// Clones share the registry, the lifecycle and the event sink, so a quit
/// served on one connection stops every connection.
#[derive(Debug, Clone)]
pub struct Host {
    registry: Arc<HandlerRegistry>,
    capabilities: HostCapabilities,
    config: HostConfig,
    lifecycle: Lifecycle,
    events: EventSink,
}

impl Host {
    /// Create a new host builder.
    pub fn builder() -> HostBuilder {
        HostBuilder::new()
    }

    /// The served registry.
    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Schema sent in HELLO.
    pub fn schema(&self) -> RegistrySchema {
        self.registry.schema()
    }

    /// Host lifecycle; terminated by the quit operation.
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Sink whose events are forwarded to every connection.
    pub fn events(&self) -> &EventSink {
        &self.events
    }

    /// Effective configuration.
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    fn context(&self) -> InvocationContext {
        InvocationContext::with_host(
            self.capabilities.clone(),
            self.lifecycle.clone(),
            self.events.clone(),
        )
    }

    /// Invoke an operation in-process, without a connection.
    pub async fn invoke(&self, name: &str, args: Args) -> Result<Value> {
        self.registry.invoke(name, self.context(), args).await
    }

    /// Serve one renderer connection until it closes or the host terminates.
    ///
    /// Invocations still running when the loop stops are awaited, so their
    /// replies (including the quit response) are written before returning.
    pub async fn serve<S>(&self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, write_half) = tokio::io::split(stream);
        let (writer, writer_task) = spawn_writer_task(write_half, self.config.channel_capacity);

        // Subscribed before HELLO: anything emitted once the renderer sees it is forwarded.
        let events = self.events.subscribe();
        writer
            .send(Frame::encode(FrameKind::Hello, NO_REQUEST_ID, &self.schema())?)
            .await?;

        let forwarder = tokio::spawn(forward_events(
            events,
            writer.clone(),
            self.config.max_frame_size,
        ));
        let mut in_flight = JoinSet::new();

        let outcome = self.read_loop(reader, &writer, &mut in_flight).await;
        if let Err(e) = &outcome {
            tracing::error!("Read loop error: {}", e);
        }

        while in_flight.join_next().await.is_some() {}
        forwarder.abort();
        let _ = forwarder.await;
        drop(writer);

        match writer_task.await {
            Ok(Err(e)) => tracing::debug!("Writer stopped: {}", e),
            Err(e) => tracing::error!("Writer task panicked: {}", e),
            Ok(Ok(())) => {}
        }

        outcome
    }

    /// Accept connections on `listener` and serve each on its own task until
    /// the host terminates.
    ///
    /// A failed `accept` is logged and retried; live connections keep running.
    #[cfg(unix)]
    pub async fn serve_listener(&self, listener: &crate::transport::SocketListener) -> Result<()> {
        self.accept_loop(move || listener.accept()).await;
        tracing::info!("Host stopped serving {}", listener.path().display());
        Ok(())
    }

    /// Serve every stream `accept` yields until the host terminates, then wait
    /// for the open connections to finish.
    #[cfg_attr(not(unix), allow(dead_code))]
    async fn accept_loop<F, Fut, S>(&self, mut accept: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<S>>,
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                _ = self.lifecycle.terminated() => break,
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                accepted = accept() => {
                    let stream = match accepted {
                        Ok(stream) => stream,
                        Err(e) => {
                            tracing::warn!("Accept failed: {}", e);
                            tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                            continue;
                        }
                    };
                    tracing::debug!("Renderer connected");
                    let host = self.clone();
                    connections.spawn(async move {
                        if let Err(e) = host.serve(stream).await {
                            tracing::warn!("Connection closed with error: {}", e);
                        }
                    });
                }
            }
        }

        while connections.join_next().await.is_some() {}
    }

    async fn read_loop<R>(
        &self,
        mut reader: R,
        writer: &WriterHandle,
        in_flight: &mut JoinSet<()>,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_invocations));
        let mut buffer = FrameBuffer::with_max_payload(self.config.max_frame_size);
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];

        loop {
            tokio::select! {
                biased;
                _ = self.lifecycle.terminated() => {
                    tracing::debug!("Host terminated, closing connection");
                    return Ok(());
                }
                Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
                read = reader.read(&mut chunk) => {
                    let n = read?;
                    if n == 0 {
                        tracing::debug!("Renderer closed the connection");
                        return Ok(());
                    }

                    let frames = match buffer.push(&chunk[..n]) {
                        Ok(frames) => frames,
                        Err(e) => {
                            let _ = writer.send(error_frame(NO_REQUEST_ID, &e)?).await;
                            return Err(e);
                        }
                    };

                    for frame in frames {
                        self.dispatch(frame, writer, &semaphore, in_flight).await?;
                    }
                }
            }
        }
    }

    async fn dispatch(
        &self,
        frame: Frame,
        writer: &WriterHandle,
        semaphore: &Arc<Semaphore>,
        in_flight: &mut JoinSet<()>,
    ) -> Result<()> {
        let request_id = frame.request_id();

        if frame.kind() != FrameKind::Request {
            tracing::warn!(
                "Ignoring unexpected {:?} frame from renderer (request {})",
                frame.kind(),
                request_id
            );
            return Ok(());
        }

        if request_id == NO_REQUEST_ID {
            let err = ShellwireError::Protocol("request id 0 is reserved".to_string());
            return writer.send(error_frame(NO_REQUEST_ID, &err)?).await;
        }

        let request: InvokeRequest = match frame.decode() {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("Malformed request {}: {}", request_id, e);
                let err = ShellwireError::Protocol(format!("malformed request: {e}"));
                return writer.send(error_frame(request_id, &err)?).await;
            }
        };

        let permit = match semaphore.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::warn!(
                    "Rejecting {} (request {}): {} invocations in flight",
                    request.operation,
                    request_id,
                    self.config.max_concurrent_invocations
                );
                let err = ShellwireError::Protocol(format!(
                    "host busy: {} invocations in flight",
                    self.config.max_concurrent_invocations
                ));
                return writer.send(error_frame(request_id, &err)?).await;
            }
        };

        let registry = self.registry.clone();
        let ctx = self.context().with_request(request_id, request.window);
        let writer = writer.clone();
        let max_frame_size = self.config.max_frame_size;

        in_flight.spawn(async move {
            let _permit = permit;
            let result = registry.invoke(&request.operation, ctx, request.args).await;

            match reply_frame(request_id, result, max_frame_size) {
                Ok(frame) => {
                    if let Err(e) = writer.send(frame).await {
                        tracing::debug!("Dropping reply to request {}: {}", request_id, e);
                    }
                }
                Err(e) => tracing::error!("Failed to encode reply to request {}: {}", request_id, e),
            }
        });

        Ok(())
    }
}

fn error_frame(request_id: u32, err: &ShellwireError) -> Result<Frame> {
    Frame::encode(FrameKind::Error, request_id, &ErrorPayload::from(err))
}

/// RESPONSE or ERROR frame for `request_id`.
///
/// A reply that cannot be encoded, or whose payload exceeds `max_frame_size`,
/// is replaced by an ERROR frame for the same request.
fn reply_frame<T: Serialize>(
    request_id: u32,
    result: Result<T>,
    max_frame_size: u32,
) -> Result<Frame> {
    let encoded = match result {
        Ok(value) => Frame::encode(FrameKind::Response, request_id, &value),
        Err(e) => error_frame(request_id, &e),
    };

    let err = match encoded {
        Ok(frame) if frame.payload().len() <= max_frame_size as usize => return Ok(frame),
        Ok(frame) => ShellwireError::Protocol(format!(
            "reply of {} bytes exceeds the {} byte frame limit",
            frame.payload().len(),
            max_frame_size
        )),
        Err(e) => e,
    };

    tracing::warn!("Replacing reply to request {}: {}", request_id, err);
    error_frame(request_id, &err)
}

async fn forward_events(
    mut events: broadcast::Receiver<crate::host::HostEvent>,
    writer: WriterHandle,
    max_frame_size: u32,
) {
    loop {
        match events.recv().await {
            Ok(event) => {
                let frame = match Frame::encode(FrameKind::Event, NO_REQUEST_ID, &event) {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::error!("Failed to encode event {}: {}", event.name, e);
                        continue;
                    }
                };
                if frame.payload().len() > max_frame_size as usize {
                    tracing::warn!(
                        "Dropping event {}: {} bytes exceeds the {} byte frame limit",
                        event.name,
                        frame.payload().len(),
                        max_frame_size
                    );
                    continue;
                }
                if writer.send(frame).await.is_err() {
                    return;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!("Renderer lagging, {} events dropped", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}
