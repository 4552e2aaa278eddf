//! Abstract syntax for haeccstable statements.
//!
//! Expression and entity types live in haecc-types so that backends can use
//! them without the parser; they are re-exported here for convenience.

mod types;

pub use haecc_types::{Args, Expr, NamedArg, Value, VarKind};
pub use types::*;
