//! XDG Base Directory paths for haeccstable.
//!
//! | Purpose | Location |
//! |---------|----------|
//! | Backend socket | `$XDG_RUNTIME_DIR/haeccstable/backend.sock` (temp dir fallback) |
//! | Compositions | `$XDG_DATA_HOME/haeccstable/compositions/<name>` |
//! | REPL history | `$XDG_DATA_HOME/haeccstable/history.txt` |

use std::path::PathBuf;

use directories::BaseDirs;

/// Directory under each XDG base.
const APP_DIR: &str = "haeccstable";

/// Get the user's home directory.
///
/// Returns `$HOME` or falls back to `/tmp` if not set.
pub fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

/// Get XDG data home directory.
///
/// Returns `$XDG_DATA_HOME` or falls back to `~/.local/share`.
pub fn xdg_data_home() -> PathBuf {
    BaseDirs::new()
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| home_dir().join(".local").join("share"))
}

/// Get XDG runtime directory.
///
/// Returns `$XDG_RUNTIME_DIR` or falls back to the system temp directory.
pub fn xdg_runtime_dir() -> PathBuf {
    std::env::var("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir())
}

// ═══════════════════════════════════════════════════════════════════════════
// haeccstable paths
// ═══════════════════════════════════════════════════════════════════════════

pub fn runtime_dir() -> PathBuf {
    xdg_runtime_dir().join(APP_DIR)
}

pub fn data_dir() -> PathBuf {
    xdg_data_home().join(APP_DIR)
}

/// Where a backend listens unless told otherwise.
pub fn default_socket_path() -> PathBuf {
    runtime_dir().join("backend.sock")
}

/// Journal and dossier directory for a named composition.
pub fn composition_dir(name: &str) -> PathBuf {
    data_dir().join("compositions").join(name)
}

pub fn history_path() -> PathBuf {
    data_dir().join("history.txt")
}
