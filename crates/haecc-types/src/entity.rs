//! Live entity records held by a session.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Expr;

/// The declared kind of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarKind {
    VideoIn,
    VideoOut,
    AudioIn,
    AudioOut,
    Number,
    Window,
    Generic,
}

impl VarKind {
    /// The declaration keyword for this kind.
    pub fn keyword(self) -> &'static str {
        match self {
            VarKind::VideoIn => "video_invar",
            VarKind::VideoOut => "video_outvar",
            VarKind::AudioIn => "audio_invar",
            VarKind::AudioOut => "audio_outvar",
            VarKind::Number => "number_var",
            VarKind::Window => "window_var",
            VarKind::Generic => "var",
        }
    }

    /// Kinds a layer may capture from.
    pub fn is_input(self) -> bool {
        matches!(self, VarKind::VideoIn | VarKind::AudioIn)
    }

    /// Kinds a layer may be projected onto.
    pub fn is_output(self) -> bool {
        matches!(self, VarKind::VideoOut | VarKind::AudioOut | VarKind::Window)
    }
}

impl fmt::Display for VarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A declared variable and the expression it was bound to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub kind: VarKind,
    pub source: Expr,
}

/// A compositing layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    /// Canvas size in pixels, when declared with one.
    pub canvas: Option<(i64, i64)>,
    /// Name of the input variable currently cast into this layer.
    pub source: Option<String>,
    pub transform: (f64, f64),
    pub scale: (f64, f64),
    /// Percent, 0 through 100.
    pub opacity: u8,
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            canvas: None,
            source: None,
            transform: (0.0, 0.0),
            scale: (1.0, 1.0),
            opacity: 100,
        }
    }

    pub fn with_canvas(mut self, canvas: Option<(i64, i64)>) -> Self {
        self.canvas = canvas;
        self
    }
}

/// Default pixel format for buffers.
pub const DEFAULT_BUFFER_FORMAT: &str = "rgba8";

/// An offscreen pixel buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Buffer {
    pub name: String,
    pub canvas: Option<(i64, i64)>,
    pub format: String,
}

impl Buffer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            canvas: None,
            format: DEFAULT_BUFFER_FORMAT.to_string(),
        }
    }

    pub fn with_canvas(mut self, canvas: Option<(i64, i64)>) -> Self {
        self.canvas = canvas;
        self
    }
}

/// A user function: `func name(params) = body`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Expr,
}

/// A background process: `process $name(params) { ... return expr }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessDef {
    /// Always starts with `$`.
    pub name: String,
    pub params: Vec<String>,
    /// The trailing `return` expression, if the body had one.
    pub body: Option<Expr>,
}
