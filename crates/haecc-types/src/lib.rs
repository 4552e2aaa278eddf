//! Pure data types for haeccstable: expressions, entities, backend messages.
//!
//! This crate is a leaf dependency with no async runtime, no parser, no I/O.
//! It exists so that backends and tooling can speak the wire protocol without
//! pulling in haecc-kernel.

pub mod entity;
pub mod message;
pub mod value;

// Flat re-exports for convenience
pub use entity::*;
pub use message::*;
pub use value::*;
