//! Unix domain socket listener and connector.
//!
//! # Example
//!
//! ```no_run
//! # async fn run() -> shellwire::Result<()> {
//! use shellwire::transport::{connect, socket_path, SocketListener};
//!
//! let listener = SocketListener::bind(socket_path()).await?;
//! let renderer = connect(listener.path()).await?;
//! let host_side = listener.accept().await?;
//! # drop((renderer, host_side));
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::net::{UnixListener, UnixStream};

use crate::error::Result;

static NEXT_SOCKET: AtomicU32 = AtomicU32::new(0);

/// Fresh socket path for this process: `/tmp/shellwire-{pid}-{n}.sock`.
///
/// `n` counts up per call, so paths never repeat within one process.
pub fn socket_path() -> PathBuf {
    let n = NEXT_SOCKET.fetch_add(1, Ordering::Relaxed);
    PathBuf::from(format!("/tmp/shellwire-{}-{}.sock", std::process::id(), n))
}

/// Listening socket owned by the host. The socket file is removed on drop.
#[derive(Debug)]
pub struct SocketListener {
    listener: UnixListener,
    path: PathBuf,
}

impl SocketListener {
    /// Bind to `path`, replacing a stale socket file left behind by an
    /// earlier run.
    pub async fn bind(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.exists() {
            tracing::debug!("Removing stale socket {}", path.display());
            std::fs::remove_file(&path)?;
        }

        let listener = UnixListener::bind(&path)?;
        tracing::info!("Listening on {}", path.display());

        Ok(Self { listener, path })
    }

    /// Accept one renderer connection.
    pub async fn accept(&self) -> Result<UnixStream> {
        let (stream, _addr) = self.listener.accept().await?;
        Ok(stream)
    }

    /// Socket file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SocketListener {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Connect to a host listening on `path`.
pub async fn connect(path: impl AsRef<Path>) -> Result<UnixStream> {
    Ok(UnixStream::connect(path.as_ref()).await?)
}
