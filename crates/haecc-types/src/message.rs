//! Messages exchanged with the rendering backend.
//!
//! On the wire every request is one JSON object per line:
//!
//! ```text
//! {"type": "start_capture", "data": {"device": {...}, "layer": "main"}}
//! ```
//!
//! and every request gets exactly one response line:
//!
//! ```text
//! {"status": "success", "message": "capture started"}
//! {"status": "error", "error": "no such device"}
//! ```

use serde::{Deserialize, Serialize};

use crate::entity::{Layer, VarKind};
use crate::value::{Args, Expr};

/// A request sent to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum BackendMessage {
    /// Begin feeding an input device into a layer.
    StartCapture { device: Expr, layer: String },
    /// Show a layer on an output surface.
    ProjectLayer {
        monitor: Expr,
        /// Snapshot of the layer at projection time.
        layer: Layer,
        z_index: i64,
    },
    /// A declaration was retracted.
    CleanupVariable { name: String, kind: String },
    /// A method call was retracted.
    UndoMethod {
        object: String,
        method: String,
        original_text: String,
    },
    /// A property assignment was retracted.
    UndoProperty { object: String, property: String },
    /// A process call was retracted.
    StopProcess {
        process: String,
        original_text: String,
    },
    DeclareVariable {
        var_type: String,
        name: String,
        expression: Expr,
    },
    DefineFunction {
        name: String,
        params: Vec<String>,
        body: Expr,
    },
    DefineProcess {
        name: String,
        params: Vec<String>,
        body: Option<Expr>,
    },
    CallProcess { process: String, args: Args },
    CallFunction { name: String, args: Args },
    MethodCall {
        object: String,
        method: String,
        args: Args,
    },
    PropertyAssignment {
        object: String,
        property: String,
        value: Expr,
    },
    /// Liveness probe.
    Ping,
    /// Ask the backend for its own view of the scene.
    GetState,
}

impl BackendMessage {
    pub fn declare(kind: VarKind, name: impl Into<String>, expression: Expr) -> Self {
        BackendMessage::DeclareVariable {
            var_type: kind.keyword().to_string(),
            name: name.into(),
            expression,
        }
    }

    /// The wire `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            BackendMessage::StartCapture { .. } => "start_capture",
            BackendMessage::ProjectLayer { .. } => "project_layer",
            BackendMessage::CleanupVariable { .. } => "cleanup_variable",
            BackendMessage::UndoMethod { .. } => "undo_method",
            BackendMessage::UndoProperty { .. } => "undo_property",
            BackendMessage::StopProcess { .. } => "stop_process",
            BackendMessage::DeclareVariable { .. } => "declare_variable",
            BackendMessage::DefineFunction { .. } => "define_function",
            BackendMessage::DefineProcess { .. } => "define_process",
            BackendMessage::CallProcess { .. } => "call_process",
            BackendMessage::CallFunction { .. } => "call_function",
            BackendMessage::MethodCall { .. } => "method_call",
            BackendMessage::PropertyAssignment { .. } => "property_assignment",
            BackendMessage::Ping => "ping",
            BackendMessage::GetState => "get_state",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// The backend's reply to a single request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendResponse {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<serde_json::Value>,
}

impl BackendResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: Some(message.into()),
            error: None,
            state: None,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: None,
            error: Some(error.into()),
            state: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}
