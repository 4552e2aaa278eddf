//! haecc-kernel: the haeccstable live-coding engine.
//!
//! This crate provides:
//!
//! - **Lexer**: Tokenizes composition source using logos
//! - **Parser**: Builds one statement per line using chumsky
//! - **Store**: Named variables, layers, buffers, functions and processes
//! - **Interpreter**: Validates statements and routes them to backend messages
//! - **Journal**: The command log, with inverse effects for deleted lines
//! - **Dossier**: JSON snapshot of the store
//! - **Backend**: Channel to the rendering process
//! - **Session**: Ties it all together, with persistence
//! - **Paths**: XDG-compliant path helpers

pub mod ast;
pub mod backend;
pub mod dossier;
pub mod interpreter;
pub mod journal;
pub mod lexer;
pub mod parser;
pub mod paths;
pub mod session;
pub mod store;

pub use backend::{
    Backend, BackendError, BackendResult, DetachedBackend, RecordingBackend, SocketBackend,
};
pub use dossier::Dossier;
pub use journal::{InverseEffect, Journal, JournalEntry, JournalError};
pub use session::{
    BackendMode, CommandReport, DeleteReport, Session, SessionConfig, SessionError,
    MAX_IMPORT_DEPTH,
};
pub use store::EntityStore;

// Wire types, for embedders speaking to a backend directly
pub use haecc_types::{BackendMessage, BackendResponse, ResponseStatus};

// XDG path primitives
pub use paths::{default_socket_path, xdg_data_home, xdg_runtime_dir};
