//! haecc REPL: interactive live-coding for haeccstable.
//!
//! This REPL provides an interactive interface to a haeccstable session.
//! It handles:
//! - Meta-commands: `/help`, `/quit`, `/journal`, `/delete`, `/dossier`, ...
//! - Statement execution via the Session
//! - Command history via rustyline

pub mod format;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use tokio::runtime::Runtime;

use haecc_kernel::{
    paths, Backend, BackendMode, DetachedBackend, Session, SessionConfig, SocketBackend,
};

/// Result from meta-command handling.
#[derive(Debug)]
enum MetaResult {
    /// Continue with optional output
    Continue(Option<String>),
    /// Exit the REPL (caller should save history and exit)
    Exit,
}

/// Open the backend named in `config`.
///
/// An unreachable socket is not fatal: the session runs detached and the
/// returned notice says why.
pub async fn open_backend(config: &SessionConfig) -> (Arc<dyn Backend>, Option<String>) {
    match &config.backend {
        BackendMode::Socket(path) => {
            match SocketBackend::connect(path.clone(), config.backend_timeout).await {
                Ok(backend) => (Arc::new(backend), None),
                Err(e) => {
                    tracing::warn!("backend unavailable, running detached: {}", e);
                    (
                        Arc::new(DetachedBackend),
                        Some(format!("Backend unavailable ({e}); running detached.")),
                    )
                }
            }
        }
        BackendMode::Detached => (Arc::new(DetachedBackend), None),
    }
}

/// REPL configuration and state.
pub struct Repl {
    session: Session,
    runtime: Runtime,
    show_ast: bool,
    notice: Option<String>,
}

impl Repl {
    /// Create a REPL persisting into `./composition_files`, talking to the
    /// default backend socket.
    pub fn new() -> Result<Self> {
        Self::with_config(SessionConfig::repl())
    }

    /// Create a REPL with a custom session configuration.
    pub fn with_config(config: SessionConfig) -> Result<Self> {
        let runtime = Runtime::new().context("Failed to create tokio runtime")?;
        let (backend, notice) = runtime.block_on(open_backend(&config));
        let session = Session::with_backend(config, backend).context("Failed to create session")?;

        Ok(Self {
            session,
            runtime,
            show_ast: false,
            notice,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Why the REPL started detached, if it did.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Process a single line of input.
    /// Returns Ok(None) for empty input, Ok(Some(output)) for output to display,
    /// or Err("__REPL_EXIT__") to signal the REPL should exit.
    pub fn process_line(&mut self, line: &str) -> Result<Option<String>> {
        let trimmed = line.trim();

        // Handle meta-commands (both /cmd and cmd forms for common ones)
        if trimmed.starts_with('/') {
            return match self.handle_meta_command(trimmed) {
                MetaResult::Continue(output) => Ok(output),
                MetaResult::Exit => Err(anyhow::anyhow!("__REPL_EXIT__")),
            };
        }

        if let Some(meta_result) = self.try_shell_style_command(trimmed) {
            return match meta_result {
                MetaResult::Continue(output) => Ok(output),
                MetaResult::Exit => Err(anyhow::anyhow!("__REPL_EXIT__")),
            };
        }

        if trimmed.is_empty() {
            return Ok(None);
        }

        if self.show_ast {
            let parsed = haecc_kernel::parser::parse_line(trimmed);
            return Ok(Some(format!("{:#?}", parsed)));
        }

        let report = self.runtime.block_on(self.session.execute(trimmed));
        Ok(format::format_report(&report))
    }

    /// Handle a meta-command (starts with /).
    fn handle_meta_command(&mut self, cmd: &str) -> MetaResult {
        let parts: Vec<&str> = cmd.split_whitespace().collect();
        let command = parts.first().copied().unwrap_or("");
        let arg = parts.get(1).copied();

        match command {
            "/quit" | "/q" | "/exit" => MetaResult::Exit,
            "/help" | "/h" | "/?" => MetaResult::Continue(Some(HELP_TEXT.to_string())),
            "/ast" => {
                self.show_ast = !self.show_ast;
                MetaResult::Continue(Some(format!(
                    "AST mode: {}",
                    if self.show_ast { "ON" } else { "OFF" }
                )))
            }
            "/journal" | "/log" => {
                MetaResult::Continue(Some(format::format_journal(self.session.journal())))
            }
            "/vars" | "/store" => {
                MetaResult::Continue(Some(format::format_store(self.session.store())))
            }
            "/state" | "/session" => {
                MetaResult::Continue(Some(format::format_session(&self.session)))
            }
            "/delete" | "/del" => {
                let Some(index) = arg.and_then(|a| a.parse::<usize>().ok()) else {
                    return MetaResult::Continue(Some(
                        "Usage: /delete <line> (see /journal for line numbers)".to_string(),
                    ));
                };
                match self.runtime.block_on(self.session.delete_line(index)) {
                    Ok(report) => MetaResult::Continue(Some(format::format_delete(&report))),
                    Err(e) => MetaResult::Continue(Some(format!("✗ Delete failed: {}", e))),
                }
            }
            "/dossier" => match self.session.dossier().to_json_pretty() {
                Ok(json) => MetaResult::Continue(Some(json)),
                Err(e) => MetaResult::Continue(Some(format!("✗ Dossier failed: {}", e))),
            },
            "/save-dossier" | "/save-journal" => {
                let Some(name) = arg else {
                    return MetaResult::Continue(Some(format!("Usage: {command} <name>")));
                };
                let saved = if command == "/save-dossier" {
                    self.runtime.block_on(self.session.save_dossier_as(name))
                } else {
                    self.runtime.block_on(self.session.save_journal_as(name))
                };
                match saved {
                    Ok(path) => MetaResult::Continue(Some(format!("✓ Saved {}", path.display()))),
                    Err(e) => MetaResult::Continue(Some(format!("✗ Save failed: {}", e))),
                }
            }
            "/resume" => match self.runtime.block_on(self.session.resume()) {
                Ok(reports) => {
                    let failed = reports.iter().filter(|r| !r.ok).count();
                    MetaResult::Continue(Some(format!(
                        "✓ Replayed {} commands ({} failed)",
                        reports.len(),
                        failed
                    )))
                }
                Err(e) => MetaResult::Continue(Some(format!("✗ Resume failed: {}", e))),
            },
            "/clear" | "/reset" => match self.runtime.block_on(self.session.reset()) {
                Ok(()) => MetaResult::Continue(Some(
                    "Session reset (entities and journal cleared)".to_string(),
                )),
                Err(e) => MetaResult::Continue(Some(format!("Reset failed: {}", e))),
            },
            "/ping" => match self.runtime.block_on(self.session.ping()) {
                Ok(response) => MetaResult::Continue(Some(format!(
                    "✓ {}: {}",
                    self.session.backend().describe(),
                    response.message.unwrap_or_else(|| "ok".to_string())
                ))),
                Err(e) => MetaResult::Continue(Some(format!("✗ {}", e))),
            },
            "/backend" => match self.runtime.block_on(self.session.backend_state()) {
                Ok(Some(state)) => MetaResult::Continue(Some(
                    serde_json::to_string_pretty(&state).unwrap_or_else(|_| state.to_string()),
                )),
                Ok(None) => MetaResult::Continue(Some("(backend reported no state)".to_string())),
                Err(e) => MetaResult::Continue(Some(format!("✗ {}", e))),
            },
            "/connect" => {
                let path = arg
                    .map(PathBuf::from)
                    .unwrap_or_else(paths::default_socket_path);
                let timeout = self.session.config().backend_timeout;
                match self.runtime.block_on(SocketBackend::connect(path, timeout)) {
                    Ok(backend) => {
                        let described = backend.describe();
                        self.session.set_backend(Arc::new(backend));
                        self.notice = None;
                        MetaResult::Continue(Some(format!("✓ Connected to {described}")))
                    }
                    Err(e) => MetaResult::Continue(Some(format!("✗ {}", e))),
                }
            }
            "/detach" => {
                self.session.set_backend(Arc::new(DetachedBackend));
                MetaResult::Continue(Some("Backend detached".to_string()))
            }
            _ => MetaResult::Continue(Some(format!(
                "Unknown command: {}\nType /help or help for available commands.",
                command
            ))),
        }
    }

    /// Try to handle a shell-style command (without leading /).
    /// Returns Some(result) if it was a recognized command, None otherwise.
    fn try_shell_style_command(&mut self, cmd: &str) -> Option<MetaResult> {
        match cmd {
            "quit" | "exit" => Some(self.handle_meta_command("/quit")),
            "help" => Some(self.handle_meta_command("/help")),
            _ => None,
        }
    }
}

const HELP_TEXT: &str = r#"haeccstable — haecc REPL

Meta Commands (use with or without /):
  help, /help, /?       Show this help
  quit, /quit, /q       Exit the REPL

Slash-only commands:
  /journal, /log        Show the journal with line numbers
  /delete <line>        Delete a journal command and undo its effect
  /vars, /store         Show declared entities
  /dossier              Show the dossier as JSON
  /save-dossier <name>  Save the dossier as <name>.json
  /save-journal <name>  Save the journal as <name>.txt
  /resume               Replay the journal left by a previous run
  /reset, /clear        Forget all entities and clear the journal
  /session              Show session info
  /ping                 Check the backend
  /backend              Show the backend's reported state
  /connect [socket]     Connect to a backend socket
  /detach               Stop sending to the backend
  /ast                  Toggle AST display mode

Declarations:
  video_invar cam = capture(0)       Video input
  video_outvar out = display(1)      Video output
  audio_invar mic = microphone(0)    Audio input
  audio_outvar spk = speakers(0)     Audio output
  window_var win = window(800, 600)  Window
  number_var speed = 2.5             Number
  var anything = expr(...)           Generic
  layer_obj main = (1920, 1080)      Layer (canvas optional)
  buffer_obj scratch = (640, 480)    Buffer (canvas optional)

Definitions and calls:
  func double(x) = mul(x, 2)
  process $spin(speed) { return rotate(speed) }
  $spin(2)
  double(4)

Layers:
  main.cast(cam)                     Capture an input into a layer
  out.project(main, 1)               Show a layer on an output at a z-index
  main.transform(10, 20)             Move
  main.scale(0.5, 0.5)               Scale
  main.opacity(50)                   Opacity, 0 to 100
  main.opacity = 75                  Property assignment
  main.opacity                       Property access

Other:
  print("x = %d", 42)                printf, {} or space-joined output
  import scenes/intro.txt            Run a script or journal file
"#;

/// Save REPL history to disk.
fn save_history(rl: &mut Editor<(), DefaultHistory>, history_path: &Path) {
    if let Some(parent) = history_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("Failed to create history directory: {}", e);
        }
    }
    if let Err(e) = rl.save_history(history_path) {
        tracing::warn!("Failed to save history: {}", e);
    }
}

/// Run the REPL.
pub fn run(config: SessionConfig) -> Result<()> {
    println!("haeccstable — haecc v{}", env!("CARGO_PKG_VERSION"));
    println!("Type /help for commands, /quit to exit.");

    let mut rl: Editor<(), DefaultHistory> = Editor::new().context("Failed to create editor")?;

    // Load history if it exists
    let history_path = paths::history_path();
    if let Err(e) = rl.load_history(&history_path) {
        // Only log if it's not a "file not found" error (expected on first run)
        let is_not_found = matches!(&e, ReadlineError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound);
        if !is_not_found {
            tracing::warn!("Failed to load history: {}", e);
        }
    }

    let mut repl = Repl::with_config(config)?;
    println!("Backend: {}", repl.session().backend().describe());
    if let Some(notice) = repl.notice() {
        println!("{notice}");
    }
    println!();

    loop {
        let prompt = "haecc> ";

        match rl.readline(prompt) {
            Ok(line) => {
                if let Err(e) = rl.add_history_entry(line.as_str()) {
                    tracing::warn!("Failed to add history entry: {}", e);
                }

                match repl.process_line(&line) {
                    Ok(Some(output)) => println!("{}", output),
                    Ok(None) => {}
                    Err(e) if e.to_string() == "__REPL_EXIT__" => {
                        // User requested exit - save history and break
                        save_history(&mut rl, &history_path);
                        return Ok(());
                    }
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                eprintln!("Error: {}", err);
                break;
            }
        }
    }

    save_history(&mut rl, &history_path);

    Ok(())
}
