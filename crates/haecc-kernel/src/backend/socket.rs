//! Unix socket backend speaking newline-delimited JSON.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
use tokio::net::UnixStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::{check_response, Backend, BackendError, BackendResult};
use haecc_types::{BackendMessage, BackendResponse};

/// Connects lazily on first send and reconnects after any failure.
///
/// Each exchange (connect, write, read one line) is bounded by `timeout`.
/// There is no retry: a failed exchange is reported to the caller.
pub struct SocketBackend {
    path: PathBuf,
    timeout: Duration,
    stream: Mutex<Option<BufStream<UnixStream>>>,
    connected: AtomicBool,
}

impl SocketBackend {
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
            stream: Mutex::new(None),
            connected: AtomicBool::new(false),
        }
    }

    /// Connect eagerly, failing if nothing is listening.
    pub async fn connect(path: impl Into<PathBuf>, timeout: Duration) -> BackendResult<Self> {
        let backend = Self::new(path, timeout);
        let stream = backend.open().await?;
        *backend.stream.lock().await = Some(stream);
        Ok(backend)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn open(&self) -> BackendResult<BufStream<UnixStream>> {
        let stream = timeout(self.timeout, UnixStream::connect(&self.path))
            .await
            .map_err(|_| BackendError::Timeout(self.timeout))?
            .map_err(|e| {
                BackendError::NotConnected(format!("{} ({e})", self.path.display()))
            })?;
        self.connected.store(true, Ordering::SeqCst);
        debug!(path = %self.path.display(), "connected to backend");
        Ok(BufStream::new(stream))
    }
}

/// Write one request line and read one response line.
async fn exchange(stream: &mut BufStream<UnixStream>, request: &str) -> io::Result<String> {
    stream.write_all(request.as_bytes()).await?;
    stream.flush().await?;

    let mut reply = String::new();
    if stream.read_line(&mut reply).await? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "backend closed the connection",
        ));
    }
    Ok(reply)
}

#[async_trait]
impl Backend for SocketBackend {
    async fn send(&self, message: &BackendMessage) -> BackendResult<BackendResponse> {
        let mut request =
            serde_json::to_string(message).map_err(|e| BackendError::Malformed(e.to_string()))?;
        request.push('\n');

        let mut guard = self.stream.lock().await;
        if guard.is_none() {
            *guard = Some(self.open().await?);
        }
        let Some(stream) = guard.as_mut() else {
            return Err(BackendError::NotConnected(self.path.display().to_string()));
        };

        let reply = match timeout(self.timeout, exchange(stream, &request)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!(kind = message.kind(), "backend exchange failed: {e}");
                *guard = None;
                self.connected.store(false, Ordering::SeqCst);
                return Err(e.into());
            }
            Err(_) => {
                warn!(kind = message.kind(), "backend timed out after {:?}", self.timeout);
                *guard = None;
                self.connected.store(false, Ordering::SeqCst);
                return Err(BackendError::Timeout(self.timeout));
            }
        };

        let response: BackendResponse = serde_json::from_str(reply.trim())
            .map_err(|e| BackendError::Malformed(format!("{e}: {}", reply.trim())))?;
        check_response(message, response)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn describe(&self) -> String {
        format!("socket {}", self.path.display())
    }
}
