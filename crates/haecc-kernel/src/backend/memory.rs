//! In-process backends: one that accepts everything, one that records.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::{check_response, Backend, BackendResult};
use haecc_types::{BackendMessage, BackendResponse};

/// Accepts every message and does nothing. Used when no renderer is running.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedBackend;

#[async_trait]
impl Backend for DetachedBackend {
    async fn send(&self, _message: &BackendMessage) -> BackendResult<BackendResponse> {
        Ok(BackendResponse::success("detached"))
    }

    fn is_connected(&self) -> bool {
        false
    }

    fn describe(&self) -> String {
        "detached".to_string()
    }
}

/// Records every message it is sent. Can be told to reject one message kind.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    sent: Mutex<Vec<BackendMessage>>,
    reject: Option<&'static str>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every message whose wire type is `kind` (after recording it).
    pub fn rejecting(kind: &'static str) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            reject: Some(kind),
        }
    }

    /// Messages received so far, in order.
    pub fn messages(&self) -> Vec<BackendMessage> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[async_trait]
impl Backend for RecordingBackend {
    async fn send(&self, message: &BackendMessage) -> BackendResult<BackendResponse> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.clone());

        let response = if self.reject == Some(message.kind()) {
            BackendResponse::error("rejected by recording backend")
        } else {
            BackendResponse::success("recorded")
        };
        check_response(message, response)
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn describe(&self) -> String {
        "recording".to_string()
    }
}
