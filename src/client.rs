//! Renderer-side client.
//!
//! The [`IpcClient`] manages one connection to a host:
//! 1. Wait for HELLO and keep the announced schema
//! 2. Spawn the writer task for outgoing REQUEST frames
//! 3. Spawn a reader task that routes RESPONSE/ERROR frames to the pending
//!    call with the same request id and EVENT frames to subscribers
//!
//! # Example
//!
//! ```no_run
//! use shellwire::client::IpcClient;
//! use shellwire::host::ThemeSource;
//! use shellwire::transport::connect;
//! use shellwire::ui::UiRequest;
//!
//! # async fn run(path: &std::path::Path) -> shellwire::Result<()> {
//! let client = IpcClient::connect(connect(path).await?).await?;
//! let mut events = client.subscribe();
//!
//! client.invoke_ui(UiRequest::ThemeChange { theme: ThemeSource::Dark }).await?;
//! client.invoke_ui(UiRequest::FinishLogin).await?;
//! let event = events.recv().await.expect("event");
//! assert_eq!(event.name.as_str(), "ui:onFinishLogin");
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;

use crate::config::DEFAULT_CHANNEL_CAPACITY;
use crate::error::{Result, ShellwireError};
use crate::host::{HostEvent, WindowId, DEFAULT_EVENT_CAPACITY};
use crate::operation::Args;
use crate::protocol::{
    ErrorPayload, Frame, FrameBuffer, FrameKind, InvokeRequest, RegistrySchema,
    DEFAULT_MAX_PAYLOAD_SIZE, NO_REQUEST_ID,
};
use crate::ui::UiRequest;
use crate::writer::{spawn_writer_task, WriterHandle};

const READ_CHUNK_SIZE: usize = 64 * 1024;

type Reply = oneshot::Sender<Result<Value>>;

/// Calls awaiting a reply. `None` once the connection is closed.
#[derive(Debug)]
struct Pending {
    calls: Mutex<Option<HashMap<u32, Reply>>>,
}

impl Pending {
    fn open() -> Self {
        Self {
            calls: Mutex::new(Some(HashMap::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<HashMap<u32, Reply>>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, request_id: u32, reply: Reply) -> Result<()> {
        match self.lock().as_mut() {
            Some(calls) => {
                calls.insert(request_id, reply);
                Ok(())
            }
            None => Err(ShellwireError::ConnectionClosed),
        }
    }

    fn take(&self, request_id: u32) -> Option<Reply> {
        self.lock().as_mut().and_then(|calls| calls.remove(&request_id))
    }

    /// Fail every outstanding call and refuse new ones.
    fn close(&self) {
        if let Some(calls) = self.lock().take() {
            for (_, reply) in calls {
                let _ = reply.send(Err(ShellwireError::ConnectionClosed));
            }
        }
    }
}

/// A renderer's connection to a host.
#[derive(Debug)]
pub struct IpcClient {
    schema: RegistrySchema,
    writer: WriterHandle,
    pending: Arc<Pending>,
    events: broadcast::Sender<HostEvent>,
    next_request_id: AtomicU32,
    max_frame_size: u32,
    reader_task: JoinHandle<()>,
    _writer_task: JoinHandle<Result<()>>,
}

impl IpcClient {
    /// Perform the HELLO handshake on `stream` and start the connection tasks.
    ///
    /// Frames are limited to 16 MiB; see [`IpcClient::connect_with`].
    ///
    /// # Errors
    ///
    /// `ConnectionClosed` if the stream ends before HELLO, `Protocol` if the
    /// first frame is anything else.
    pub async fn connect<S>(stream: S) -> Result<Self>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        Self::connect_with(stream, DEFAULT_MAX_PAYLOAD_SIZE).await
    }

    /// Like [`IpcClient::connect`], with `max_frame_size` bounding frame
    /// payloads in both directions. Match the host's `max_frame_size`.
    pub async fn connect_with<S>(stream: S, max_frame_size: u32) -> Result<Self>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (mut reader, write_half) = tokio::io::split(stream);
        let mut buffer = FrameBuffer::with_max_payload(max_frame_size);
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];

        let mut frames = loop {
            let n = reader.read(&mut chunk).await?;
            if n == 0 {
                return Err(ShellwireError::ConnectionClosed);
            }
            let frames = buffer.push(&chunk[..n])?;
            if !frames.is_empty() {
                break frames;
            }
        };

        let hello = frames.remove(0);
        if hello.kind() != FrameKind::Hello {
            return Err(ShellwireError::Protocol(format!(
                "expected HELLO, got {:?}",
                hello.kind()
            )));
        }
        let schema: RegistrySchema = hello.decode()?;
        tracing::debug!(
            "Connected to host v{} serving {} operations",
            schema.version,
            schema.operations.len()
        );

        let (writer, writer_task) = spawn_writer_task(write_half, DEFAULT_CHANNEL_CAPACITY);
        let pending = Arc::new(Pending::open());
        let (events, _) = broadcast::channel(DEFAULT_EVENT_CAPACITY);

        let router = Router {
            pending: pending.clone(),
            events: events.clone(),
        };
        for frame in frames {
            router.route(frame);
        }
        let reader_task = tokio::spawn(router.run(reader, buffer, chunk));

        Ok(Self {
            schema,
            writer,
            pending,
            events,
            next_request_id: AtomicU32::new(1),
            max_frame_size,
            reader_task,
            _writer_task: writer_task,
        })
    }

    /// Schema the host announced on connect.
    pub fn schema(&self) -> &RegistrySchema {
        &self.schema
    }

    /// Receive events pushed by the host from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.events.subscribe()
    }

    /// Invoke `operation` with positional `args`.
    ///
    /// Host-side failures come back as [`ShellwireError::Remote`].
    pub async fn invoke(&self, operation: &str, args: Args) -> Result<Value> {
        self.call(operation, args, None).await
    }

    /// Invoke `operation` on behalf of `window`.
    pub async fn invoke_from(&self, window: WindowId, operation: &str, args: Args) -> Result<Value> {
        self.call(operation, args, Some(window)).await
    }

    /// Invoke and deserialize the result.
    pub async fn invoke_as<T: DeserializeOwned>(&self, operation: &str, args: Args) -> Result<T> {
        let value = self.invoke(operation, args).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Invoke a `ui` operation.
    pub async fn invoke_ui(&self, request: UiRequest) -> Result<Value> {
        let operation = request.operation();
        self.invoke(operation.name(), request.into_args()).await
    }

    async fn call(&self, operation: &str, args: Args, window: Option<WindowId>) -> Result<Value> {
        let request_id = self.next_request_id();
        let frame = Frame::encode(
            FrameKind::Request,
            request_id,
            &InvokeRequest {
                operation: operation.to_string(),
                args,
                window,
            },
        )?;
        if frame.payload().len() > self.max_frame_size as usize {
            return Err(ShellwireError::Protocol(format!(
                "request of {} bytes exceeds the {} byte frame limit",
                frame.payload().len(),
                self.max_frame_size
            )));
        }

        let (tx, rx) = oneshot::channel();
        self.pending.insert(request_id, tx)?;

        if let Err(e) = self.writer.send(frame).await {
            self.pending.take(request_id);
            return Err(e);
        }

        rx.await.unwrap_or(Err(ShellwireError::ConnectionClosed))
    }

    fn next_request_id(&self) -> u32 {
        loop {
            let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
            if id != NO_REQUEST_ID {
                return id;
            }
        }
    }
}

impl Drop for IpcClient {
    fn drop(&mut self) {
        self.reader_task.abort();
        self.pending.close();
    }
}

/// Reader side of a connection.
struct Router {
    pending: Arc<Pending>,
    events: broadcast::Sender<HostEvent>,
}

impl Router {
    async fn run<R>(self, mut reader: R, mut buffer: FrameBuffer, mut chunk: Vec<u8>)
    where
        R: AsyncRead + Unpin,
    {
        loop {
            let n = match reader.read(&mut chunk).await {
                Ok(0) => {
                    tracing::debug!("Host closed the connection");
                    break;
                }
                Ok(n) => n,
                Err(e) => {
                    tracing::error!("Read loop error: {}", e);
                    break;
                }
            };

            match buffer.push(&chunk[..n]) {
                Ok(frames) => frames.into_iter().for_each(|frame| self.route(frame)),
                Err(e) => {
                    tracing::error!("Read loop error: {}", e);
                    break;
                }
            }
        }

        self.pending.close();
    }

    fn route(&self, frame: Frame) {
        let request_id = frame.request_id();

        match frame.kind() {
            FrameKind::Event => match frame.decode::<HostEvent>() {
                Ok(event) => {
                    let _ = self.events.send(event);
                }
                Err(e) => tracing::warn!("Malformed event: {}", e),
            },
            FrameKind::Response => {
                let result = frame.decode::<Value>();
                self.reply(request_id, result);
            }
            FrameKind::Error => {
                let result = frame
                    .decode::<ErrorPayload>()
                    .and_then(|payload| Err(ShellwireError::from(payload)));
                if request_id == NO_REQUEST_ID {
                    if let Err(e) = result {
                        tracing::warn!("Host reported: {}", e);
                    }
                    return;
                }
                self.reply(request_id, result);
            }
            FrameKind::Hello | FrameKind::Request => {
                tracing::warn!("Ignoring unexpected {:?} frame from host", frame.kind());
            }
        }
    }

    fn reply(&self, request_id: u32, result: Result<Value>) {
        match self.pending.take(request_id) {
            Some(reply) => {
                let _ = reply.send(result);
            }
            None => tracing::debug!("Reply to unknown request {}", request_id),
        }
    }
}
