//! Backend trait for reaching the rendering process.
//!
//! The engine never renders anything itself. Every statement that changes the
//! scene produces [`BackendMessage`]s, and a `Backend` carries them across.
//! Exactly one request is in flight at a time; callers await each response
//! before sending the next message.
//!
//! ```text
//! Session ──send(msg)──▶ ┌──────────────────────────────────────────┐
//!                        │ SocketBackend   │ NDJSON over Unix socket │
//!                        │ DetachedBackend │ accepts, does nothing   │
//!                        │ RecordingBackend│ records, for tests      │
//!                        └──────────────────────────────────────────┘
//! ```

mod memory;
mod socket;

pub use memory::{DetachedBackend, RecordingBackend};
pub use socket::SocketBackend;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use haecc_types::{BackendMessage, BackendResponse};

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Backend operation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    #[error("not connected to backend at {0}")]
    NotConnected(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("backend did not answer within {0:?}")]
    Timeout(Duration),
    #[error("malformed backend response: {0}")]
    Malformed(String),
    #[error("backend rejected {kind}: {reason}")]
    Rejected { kind: &'static str, reason: String },
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::Io(err.to_string())
    }
}

/// A request/response channel to the rendering backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Send one message and wait for its response.
    ///
    /// A response with `status: error` comes back as [`BackendError::Rejected`].
    async fn send(&self, message: &BackendMessage) -> BackendResult<BackendResponse>;

    /// Whether the last exchange reached a live backend.
    fn is_connected(&self) -> bool;

    /// Short human-readable description, e.g. `socket /run/user/1000/haeccstable/backend.sock`.
    fn describe(&self) -> String;
}

/// Turn an error response into [`BackendError::Rejected`].
pub(crate) fn check_response(
    message: &BackendMessage,
    response: BackendResponse,
) -> BackendResult<BackendResponse> {
    if response.is_success() {
        return Ok(response);
    }
    let reason = response
        .error
        .or(response.message)
        .unwrap_or_else(|| "no reason given".to_string());
    Err(BackendError::Rejected {
        kind: message.kind(),
        reason,
    })
}
