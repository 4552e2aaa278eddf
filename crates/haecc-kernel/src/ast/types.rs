//! AST type definitions.

use std::fmt;
use std::path::PathBuf;

use haecc_types::{Args, Expr, VarKind};

/// What a declaration keyword introduces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    /// A variable of the given kind.
    Variable(VarKind),
    /// `layer_obj`
    Layer,
    /// `buffer_obj`
    Buffer,
}

impl DeclKind {
    pub fn keyword(self) -> &'static str {
        match self {
            DeclKind::Variable(kind) => kind.keyword(),
            DeclKind::Layer => "layer_obj",
            DeclKind::Buffer => "buffer_obj",
        }
    }

    /// Layers and buffers may be declared without an initializer.
    pub fn allows_bare(self) -> bool {
        matches!(self, DeclKind::Layer | DeclKind::Buffer)
    }
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// `print` or `println`. Both produce one output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintVariant {
    Print,
    Println,
}

/// The parsed form of one source line.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseResult {
    /// `video_invar webcam = capture(0)`
    VariableDeclaration {
        var_kind: DeclKind,
        name: String,
        expr: Expr,
    },
    /// `func double(x) = mul(x, 2)`
    FunctionDefinition {
        name: String,
        params: Vec<String>,
        expr: Expr,
    },
    /// `process $spin(speed) { ... return rotate(speed) }`
    ProcessDefinition {
        name: String,
        params: Vec<String>,
        body: Option<Expr>,
    },
    /// `main.cast(webcam)`
    MethodCall {
        object: String,
        method: String,
        args: Args,
    },
    /// `main.opacity = 50`
    PropertyAssignment {
        object: String,
        property: String,
        value: Expr,
    },
    /// `main.opacity`
    PropertyAccess { object: String, property: String },
    /// `$spin(2)`
    ProcessCall { process: String, args: Args },
    /// `double(4)`
    FunctionCall { name: String, args: Args },
    /// `print("x = %d", 42)`
    PrintStatement {
        variant: PrintVariant,
        args: Vec<Expr>,
    },
    /// `import scenes/intro.txt`
    Import { path: PathBuf },
    Empty,
    ParseError { message: String },
}

impl ParseResult {
    pub fn error(message: impl Into<String>) -> Self {
        ParseResult::ParseError {
            message: message.into(),
        }
    }
}
