//! Interpreter module for haeccstable.
//!
//! Turns a [`ParseResult`] into store mutations and the backend messages that
//! mirror them. Nothing here talks to the backend; the caller dispatches
//! [`Evaluation::emitted`] in order.
//!
//! # Architecture
//!
//! - **evaluate**: routes each statement shape
//! - **methods**: the layer methods with local semantics (`cast`, `project`,
//!   `transform`, `scale`, `opacity`) and property bookkeeping
//! - **print**: `print`/`println` formatting

mod methods;
mod print;

pub use print::format_print;

use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

use crate::ast::{DeclKind, ParseResult};
use crate::store::EntityStore;
use haecc_types::{
    BackendMessage, Buffer, Expr, FunctionDef, Layer, ProcessDef, Value, VarKind, Variable,
};

/// Validation failures raised while evaluating a statement.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    #[error("Unknown layer: {0}")]
    UnknownLayer(String),

    #[error("'{name}' is {found}, expected {expected}")]
    WrongKind {
        name: String,
        expected: &'static str,
        found: VarKind,
    },

    #[error("{method}() expects {expected}")]
    MissingArgument {
        method: &'static str,
        expected: &'static str,
    },

    #[error("{what} must be a number, got {found}")]
    NotANumber { what: String, found: String },

    #[error("{0}")]
    Parse(String),

    #[error("import nesting deeper than {0} levels")]
    ImportDepth(usize),

    #[error("import failed: {0}")]
    Io(String),
}

/// How a statement ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Success with a status message. Empty for blank input.
    Success(String),
    Failure(EvalError),
    /// `import path`: the caller reads and runs the file.
    Import(PathBuf),
}

/// Result of evaluating one statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub outcome: Outcome,
    /// Backend messages, in the order they must be sent.
    pub emitted: Vec<BackendMessage>,
}

impl Evaluation {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Success(message.into()),
            emitted: Vec::new(),
        }
    }

    pub fn failure(error: EvalError) -> Self {
        Self {
            outcome: Outcome::Failure(error),
            emitted: Vec::new(),
        }
    }

    pub fn emit(mut self, message: BackendMessage) -> Self {
        self.emitted.push(message);
        self
    }

    pub fn is_success(&self) -> bool {
        !matches!(self.outcome, Outcome::Failure(_))
    }
}

impl From<Result<Evaluation, EvalError>> for Evaluation {
    fn from(result: Result<Evaluation, EvalError>) -> Self {
        result.unwrap_or_else(Evaluation::failure)
    }
}

/// Evaluate one parsed statement against the store.
pub fn evaluate(result: &ParseResult, store: &mut EntityStore) -> Evaluation {
    debug!(?result, "evaluating");

    match result {
        ParseResult::VariableDeclaration {
            var_kind,
            name,
            expr,
        } => declare(*var_kind, name, expr, store),

        ParseResult::FunctionDefinition { name, params, expr } => {
            store.define_function(FunctionDef {
                name: name.clone(),
                params: params.clone(),
                body: expr.clone(),
            });
            Evaluation::success(format!("Function '{name}' defined")).emit(
                BackendMessage::DefineFunction {
                    name: name.clone(),
                    params: params.clone(),
                    body: expr.clone(),
                },
            )
        }

        ParseResult::ProcessDefinition { name, params, body } => {
            store.define_process(ProcessDef {
                name: name.clone(),
                params: params.clone(),
                body: body.clone(),
            });
            Evaluation::success(format!("Process '{name}' defined")).emit(
                BackendMessage::DefineProcess {
                    name: name.clone(),
                    params: params.clone(),
                    body: body.clone(),
                },
            )
        }

        ParseResult::MethodCall {
            object,
            method,
            args,
        } => methods::call(object, method, args, store).into(),

        ParseResult::PropertyAssignment {
            object,
            property,
            value,
        } => methods::assign(object, property, value, store).into(),

        ParseResult::PropertyAccess { object, property } => {
            Evaluation::success(methods::access(object, property, store))
        }

        ParseResult::ProcessCall { process, args } => {
            Evaluation::success(format!("Process '{process}' called")).emit(
                BackendMessage::CallProcess {
                    process: process.clone(),
                    args: args.clone(),
                },
            )
        }

        ParseResult::FunctionCall { name, args } => {
            Evaluation::success(format!("Function '{name}' called")).emit(
                BackendMessage::CallFunction {
                    name: name.clone(),
                    args: args.clone(),
                },
            )
        }

        ParseResult::PrintStatement { args, .. } => Evaluation::success(format_print(args, store)),

        ParseResult::Import { path } => Evaluation {
            outcome: Outcome::Import(path.clone()),
            emitted: Vec::new(),
        },

        ParseResult::Empty => Evaluation::success(""),

        ParseResult::ParseError { message } => {
            Evaluation::failure(EvalError::Parse(message.clone()))
        }
    }
}

/// Declarations always succeed and always overwrite.
fn declare(kind: DeclKind, name: &str, expr: &Expr, store: &mut EntityStore) -> Evaluation {
    let message = match kind {
        DeclKind::Variable(var_kind) => {
            store.declare_variable(
                name,
                Variable {
                    kind: var_kind,
                    source: expr.clone(),
                },
            );
            format!("Variable '{name}' declared")
        }
        DeclKind::Layer => {
            store.declare_layer(Layer::new(name).with_canvas(expr.as_int_pair()));
            format!("Layer '{name}' declared")
        }
        DeclKind::Buffer => {
            store.declare_buffer(Buffer::new(name).with_canvas(expr.as_int_pair()));
            format!("Buffer '{name}' declared")
        }
    };

    Evaluation::success(message).emit(BackendMessage::DeclareVariable {
        var_type: kind.keyword().to_string(),
        name: name.to_string(),
        expression: expr.clone(),
    })
}

/// Numeric value of `expr`: a number literal, a numeric string, or an
/// identifier bound to a `number_var` with a literal source.
pub(crate) fn number_of(expr: &Expr, store: &EntityStore) -> Option<f64> {
    match expr {
        Expr::Literal(value) => value.as_f64(),
        Expr::Identifier(name) => match store.variable(name) {
            Some(Variable {
                kind: VarKind::Number,
                source: Expr::Literal(value),
            }) => value.as_f64(),
            _ => None,
        },
        _ => None,
    }
}

/// The literal an identifier stands for, when it names a `number_var`.
pub(crate) fn resolve_literal<'a>(expr: &'a Expr, store: &'a EntityStore) -> Option<&'a Value> {
    match expr {
        Expr::Literal(value) => Some(value),
        Expr::Identifier(name) => match store.variable(name) {
            Some(Variable {
                kind: VarKind::Number,
                source: Expr::Literal(value),
            }) => Some(value),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_line;

    fn run(store: &mut EntityStore, line: &str) -> Evaluation {
        evaluate(&parse_line(line), store)
    }

    #[test]
    fn declaration_forwards_to_backend() {
        let mut store = EntityStore::new();
        let eval = run(&mut store, "number_var speed = 3");
        assert_eq!(eval.outcome, Outcome::Success("Variable 'speed' declared".into()));
        assert_eq!(
            eval.emitted,
            vec![BackendMessage::declare(VarKind::Number, "speed", Expr::int(3))]
        );
    }

    #[test]
    fn layer_declaration_takes_canvas() {
        let mut store = EntityStore::new();
        run(&mut store, "layer_obj main = layer(1920, 1080)");
        assert_eq!(store.layer("main").and_then(|l| l.canvas), Some((1920, 1080)));

        run(&mut store, "layer_obj overlay");
        let overlay = store.layer("overlay").expect("bare layer declared");
        assert_eq!(overlay.canvas, None);
        assert_eq!(overlay.opacity, 100);
    }

    #[test]
    fn parse_errors_become_failures() {
        let mut store = EntityStore::new();
        let eval = run(&mut store, "var = 3");
        assert!(matches!(eval.outcome, Outcome::Failure(EvalError::Parse(_))));
        assert!(eval.emitted.is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn empty_is_silent() {
        let mut store = EntityStore::new();
        let eval = run(&mut store, "");
        assert_eq!(eval.outcome, Outcome::Success(String::new()));
        assert!(eval.emitted.is_empty());
    }

    #[test]
    fn import_is_handed_back() {
        let mut store = EntityStore::new();
        let eval = run(&mut store, "import scenes/intro.txt");
        assert_eq!(eval.outcome, Outcome::Import(PathBuf::from("scenes/intro.txt")));
    }

    #[test]
    fn number_identifiers_resolve() {
        let mut store = EntityStore::new();
        run(&mut store, "number_var half = 0.5");
        assert_eq!(number_of(&Expr::ident("half"), &store), Some(0.5));
        assert_eq!(number_of(&Expr::ident("missing"), &store), None);
        assert_eq!(number_of(&Expr::string("7"), &store), Some(7.0));
    }
}
