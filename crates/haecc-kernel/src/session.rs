//! Session: the core execution engine.
//!
//! A session owns the entity store, the journal and the backend channel, and
//! runs each line through lex → parse → evaluate → dispatch → journal. When a
//! composition directory is configured, the journal (`log.txt`) and the
//! dossier (`dossier.json`) are written there after every command.
//!
//! # Example
//!
//! ```ignore
//! let mut session = Session::new(SessionConfig::isolated())?;
//! let report = session.execute("video_invar webcam = capture(0)").await;
//! assert!(report.ok);
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::ast::ParseResult;
use crate::backend::{
    Backend, BackendError, BackendResult, DetachedBackend, SocketBackend,
};
use crate::dossier::{BackendStatus, Dossier, SessionInfo};
use crate::interpreter::{evaluate, EvalError, Outcome};
use crate::journal::{
    InverseEffect, Journal, JournalEntry, JournalError, COMMAND_MARKER,
};
use crate::parser;
use crate::paths;
use crate::store::EntityStore;
use haecc_types::{BackendMessage, BackendResponse};

/// Imports nested deeper than this fail.
pub const MAX_IMPORT_DEPTH: usize = 16;

/// Default bound on one backend request/response exchange.
pub const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(5);

const JOURNAL_FILE: &str = "log.txt";
const DOSSIER_FILE: &str = "dossier.json";

/// Session operation errors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Journal(#[from] JournalError),
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("session has no composition directory")]
    NoCompositionDir,
}

/// Where backend messages go.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendMode {
    /// Newline-delimited JSON over a Unix socket.
    Socket(PathBuf),
    /// No renderer; every message is accepted and dropped.
    Detached,
}

/// Configuration for session initialization.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Name of this session (shown in the dossier).
    pub name: String,

    /// Free-form description stored in the dossier.
    pub description: Option<String>,

    /// Directory holding `log.txt` and `dossier.json`.
    ///
    /// `None` keeps everything in memory.
    pub composition_dir: Option<PathBuf>,

    pub backend: BackendMode,

    /// Bound on each backend exchange.
    pub backend_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            description: None,
            composition_dir: Some(paths::composition_dir("default")),
            backend: BackendMode::Socket(paths::default_socket_path()),
            backend_timeout: DEFAULT_BACKEND_TIMEOUT,
        }
    }
}

impl SessionConfig {
    /// Create a REPL config: compositions live in `./composition_files`.
    pub fn repl() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            name: "repl".to_string(),
            composition_dir: Some(cwd.join("composition_files")),
            ..Self::default()
        }
    }

    /// Create a config with no files and no backend.
    ///
    /// Useful for tests and dry runs.
    pub fn isolated() -> Self {
        Self {
            name: "isolated".to_string(),
            description: None,
            composition_dir: None,
            backend: BackendMode::Detached,
            backend_timeout: DEFAULT_BACKEND_TIMEOUT,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Persist the journal and dossier in `dir`.
    pub fn with_composition_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.composition_dir = Some(dir.into());
        self
    }

    pub fn with_socket(mut self, path: impl Into<PathBuf>) -> Self {
        self.backend = BackendMode::Socket(path.into());
        self
    }

    pub fn detached(mut self) -> Self {
        self.backend = BackendMode::Detached;
        self
    }

    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = timeout;
        self
    }

    pub fn journal_path(&self) -> Option<PathBuf> {
        self.composition_dir.as_ref().map(|d| d.join(JOURNAL_FILE))
    }

    pub fn dossier_path(&self) -> Option<PathBuf> {
        self.composition_dir.as_ref().map(|d| d.join(DOSSIER_FILE))
    }
}

/// The result of one executed line.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    /// Output lines, as journaled: `✓ ...`, `✗ ...`, or printed text.
    pub lines: Vec<String>,
}

impl CommandReport {
    fn ok(command: &str, lines: Vec<String>) -> Self {
        Self {
            command: command.to_string(),
            ok: true,
            lines,
        }
    }

    fn failed(command: &str, error: impl std::fmt::Display) -> Self {
        Self {
            command: command.to_string(),
            ok: false,
            lines: vec![format!("✗ {error}")],
        }
    }

    /// All output as one string.
    pub fn output(&self) -> String {
        self.lines.join("\n")
    }
}

/// The result of retracting a journal line.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteReport {
    pub removed: JournalEntry,
    pub effect: InverseEffect,
    /// Inverse messages, all delivered to the backend.
    pub sent: Vec<BackendMessage>,
}

/// A live-coding session.
pub struct Session {
    config: SessionConfig,
    store: EntityStore,
    journal: Journal,
    backend: Arc<dyn Backend>,
    started: DateTime<Utc>,
}

impl Session {
    /// Create a session with the backend named in `config`.
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        let backend: Arc<dyn Backend> = match &config.backend {
            BackendMode::Socket(path) => {
                Arc::new(SocketBackend::new(path.clone(), config.backend_timeout))
            }
            BackendMode::Detached => Arc::new(DetachedBackend),
        };
        Self::with_backend(config, backend)
    }

    /// Create a session with an explicit backend.
    pub fn with_backend(
        config: SessionConfig,
        backend: Arc<dyn Backend>,
    ) -> Result<Self, SessionError> {
        if let Some(dir) = &config.composition_dir {
            std::fs::create_dir_all(dir)?;
        }
        info!(name = %config.name, backend = %backend.describe(), "session started");
        Ok(Self {
            config,
            store: EntityStore::new(),
            journal: Journal::new(),
            backend,
            started: Utc::now(),
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Swap the backend channel. Entities already sent are not re-sent.
    pub fn set_backend(&mut self, backend: Arc<dyn Backend>) {
        info!(backend = %backend.describe(), "backend replaced");
        self.backend = backend;
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Execution
    // ═══════════════════════════════════════════════════════════════════════

    /// Execute one line and journal it with its output.
    ///
    /// Blank lines and comment lines are ignored and not journaled.
    pub async fn execute(&mut self, line: &str) -> CommandReport {
        let command = normalize(line);
        if command.is_empty() || is_comment(command) {
            return CommandReport::ok(command, Vec::new());
        }

        let first_new = self.journal.len();
        self.journal.append(JournalEntry::command(command));
        let report = self.run(command, None, 0).await;
        for output in &report.lines {
            self.journal.append(JournalEntry::output(output.clone()));
        }

        self.append_journal_file(first_new).await;
        self.write_dossier_file().await;
        report
    }

    async fn run(&mut self, command: &str, base: Option<&Path>, depth: usize) -> CommandReport {
        let parsed = parser::parse_line(command);
        let evaluation = evaluate(&parsed, &mut self.store);

        match evaluation.outcome {
            Outcome::Failure(error) => {
                debug!(command, %error, "command failed");
                CommandReport::failed(command, error)
            }
            Outcome::Import(path) => Box::pin(self.import(command, &path, base, depth + 1)).await,
            Outcome::Success(message) => {
                // Local state stays as mutated even if the backend refuses
                if let Err(error) = self.dispatch(&evaluation.emitted).await {
                    return CommandReport::failed(command, format!("Backend error: {error}"));
                }
                let lines = match parsed {
                    ParseResult::PrintStatement { .. } => vec![message],
                    _ if message.is_empty() => Vec::new(),
                    _ => vec![format!("✓ {message}")],
                };
                CommandReport::ok(command, lines)
            }
        }
    }

    /// Send messages in order, stopping at the first failure.
    async fn dispatch(&self, messages: &[BackendMessage]) -> BackendResult<()> {
        for message in messages {
            debug!(kind = message.kind(), "sending to backend");
            if let Err(error) = self.backend.send(message).await {
                warn!(kind = message.kind(), %error, "backend failed");
                return Err(error);
            }
        }
        Ok(())
    }

    /// Run every command in a file. Only the `import` line itself is journaled
    /// as a command; the imported commands contribute output lines.
    async fn import(
        &mut self,
        command: &str,
        path: &Path,
        base: Option<&Path>,
        depth: usize,
    ) -> CommandReport {
        if depth > MAX_IMPORT_DEPTH {
            return CommandReport::failed(command, EvalError::ImportDepth(MAX_IMPORT_DEPTH));
        }

        let resolved = self.resolve_import(path, base).await;
        let text = match tokio::fs::read_to_string(&resolved).await {
            Ok(text) => text,
            Err(e) => {
                let error = EvalError::Io(format!("{}: {e}", resolved.display()));
                return CommandReport::failed(command, error);
            }
        };
        info!(path = %resolved.display(), depth, "importing");

        let dir = resolved.parent().map(Path::to_path_buf);
        let mut lines = Vec::new();
        let mut ok = true;
        let mut count = 0;
        for imported in import_commands(&text) {
            let report = self.run(&imported, dir.as_deref(), depth).await;
            ok &= report.ok;
            lines.extend(report.lines);
            count += 1;
        }

        let mark = if ok { "✓" } else { "✗" };
        lines.push(format!(
            "{mark} Imported {count} commands from {}",
            resolved.display()
        ));
        CommandReport {
            command: command.to_string(),
            ok,
            lines,
        }
    }

    /// Relative imports resolve against the importing file, then the
    /// composition directory, then the working directory. The first candidate
    /// that exists wins; when none does, the first is reported.
    async fn resolve_import(&self, path: &Path, base: Option<&Path>) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        let candidates: Vec<PathBuf> = base
            .into_iter()
            .chain(self.config.composition_dir.as_deref())
            .map(|dir| dir.join(path))
            .chain(std::iter::once(path.to_path_buf()))
            .collect();
        for candidate in &candidates {
            if tokio::fs::try_exists(candidate).await.unwrap_or(false) {
                return candidate.clone();
            }
        }
        debug!(path = %path.display(), "import not found in any search directory");
        candidates[0].clone()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Journal editing
    // ═══════════════════════════════════════════════════════════════════════

    /// Retract the command at journal position `index`.
    ///
    /// The local half of the inverse is applied before the backend is told;
    /// if the backend then fails, the retraction stands and the error is returned.
    pub async fn delete_line(&mut self, index: usize) -> Result<DeleteReport, SessionError> {
        let deletion = self.journal.delete_at(index, &mut self.store)?;
        self.rewrite_journal_file().await;
        self.write_dossier_file().await;

        self.dispatch(&deletion.emitted).await?;
        Ok(DeleteReport {
            removed: deletion.entry,
            effect: deletion.effect,
            sent: deletion.emitted,
        })
    }

    /// Execute the command lines of a serialized journal.
    pub async fn replay(&mut self, journal_text: &str) -> Vec<CommandReport> {
        let commands: Vec<String> = Journal::parse(journal_text)
            .commands()
            .map(|(_, text)| text.to_string())
            .collect();

        let mut reports = Vec::with_capacity(commands.len());
        for command in commands {
            reports.push(self.execute(&command).await);
        }
        reports
    }

    /// Rebuild state from the journal file left by a previous run.
    pub async fn resume(&mut self) -> Result<Vec<CommandReport>, SessionError> {
        let path = self
            .config
            .journal_path()
            .ok_or(SessionError::NoCompositionDir)?;
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        self.store.clear();
        self.journal.clear();
        tokio::fs::write(&path, "").await?;
        info!(path = %path.display(), "resuming from journal");
        Ok(self.replay(&text).await)
    }

    /// Forget every entity and clear the journal.
    ///
    /// The backend is told to clean up each entity; its failures are logged,
    /// not returned.
    pub async fn reset(&mut self) -> Result<(), SessionError> {
        let mut cleanups = Vec::new();
        for (name, variable) in self.store.variables() {
            cleanups.push((name.clone(), variable.kind.keyword()));
        }
        cleanups.extend(self.store.layers().map(|(n, _)| (n.clone(), "layer_obj")));
        cleanups.extend(self.store.buffers().map(|(n, _)| (n.clone(), "buffer_obj")));
        cleanups.extend(self.store.functions().map(|(n, _)| (n.clone(), "func")));
        cleanups.extend(self.store.processes().map(|(n, _)| (n.clone(), "process")));

        for (name, kind) in cleanups {
            let message = BackendMessage::CleanupVariable {
                name,
                kind: kind.to_string(),
            };
            if let Err(error) = self.backend.send(&message).await {
                warn!(%error, "cleanup during reset failed");
            }
        }

        self.store.clear();
        self.journal.clear();
        if let Some(path) = self.config.journal_path() {
            tokio::fs::write(&path, "").await?;
        }
        if let Some(path) = self.config.dossier_path() {
            tokio::fs::write(&path, self.dossier().to_json_pretty()?).await?;
        }
        info!(name = %self.config.name, "session reset");
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Projections
    // ═══════════════════════════════════════════════════════════════════════

    pub fn dossier(&self) -> Dossier {
        Dossier::project(
            &self.store,
            SessionInfo {
                name: self.config.name.clone(),
                start_time: self.started,
                description: self.config.description.clone(),
            },
            BackendStatus {
                kind: self.backend.describe(),
                connected: self.backend.is_connected(),
            },
        )
    }

    /// Copy the dossier to `<composition dir>/<name>.json`.
    pub async fn save_dossier_as(&self, name: &str) -> Result<PathBuf, SessionError> {
        let path = self.save_path(name, "json")?;
        tokio::fs::write(&path, self.dossier().to_json_pretty()?).await?;
        info!(path = %path.display(), "saved dossier");
        Ok(path)
    }

    /// Copy the journal to `<composition dir>/<name>.txt`.
    pub async fn save_journal_as(&self, name: &str) -> Result<PathBuf, SessionError> {
        let path = self.save_path(name, "txt")?;
        tokio::fs::write(&path, self.journal.to_text()).await?;
        info!(path = %path.display(), "saved journal");
        Ok(path)
    }

    fn save_path(&self, name: &str, extension: &str) -> Result<PathBuf, SessionError> {
        let dir = self
            .config
            .composition_dir
            .as_ref()
            .ok_or(SessionError::NoCompositionDir)?;
        let mut path = dir.join(name);
        if path.extension().and_then(|e| e.to_str()) != Some(extension) {
            path.set_extension(extension);
        }
        Ok(path)
    }

    /// Ask the backend whether it is alive.
    pub async fn ping(&self) -> BackendResult<BackendResponse> {
        self.backend.send(&BackendMessage::Ping).await
    }

    /// The backend's own view of the scene, if it reports one.
    pub async fn backend_state(&self) -> BackendResult<Option<serde_json::Value>> {
        let response = self.backend.send(&BackendMessage::GetState).await?;
        Ok(response.state)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Persistence
    // ═══════════════════════════════════════════════════════════════════════

    /// Append journal entries from `from` onward to the journal file.
    async fn append_journal_file(&self, from: usize) {
        let Some(path) = self.config.journal_path() else {
            return;
        };
        let mut chunk = String::new();
        for entry in &self.journal.entries()[from..] {
            chunk.push_str(&entry.to_line());
            chunk.push('\n');
        }

        let result = async {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await?;
            file.write_all(chunk.as_bytes()).await?;
            file.flush().await
        }
        .await;
        if let Err(e) = result {
            warn!(path = %path.display(), "failed to append journal: {e}");
        }
    }

    async fn rewrite_journal_file(&self) {
        let Some(path) = self.config.journal_path() else {
            return;
        };
        if let Err(e) = tokio::fs::write(&path, self.journal.to_text()).await {
            warn!(path = %path.display(), "failed to rewrite journal: {e}");
        }
    }

    async fn write_dossier_file(&self) {
        let Some(path) = self.config.dossier_path() else {
            return;
        };
        let json = match self.dossier().to_json_pretty() {
            Ok(json) => json,
            Err(e) => {
                warn!("failed to serialize dossier: {e}");
                return;
            }
        };
        if let Err(e) = tokio::fs::write(&path, json).await {
            warn!(path = %path.display(), "failed to write dossier: {e}");
        }
    }
}

/// Trim and drop one trailing `;`.
fn normalize(line: &str) -> &str {
    let trimmed = line.trim();
    trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end()
}

fn is_comment(line: &str) -> bool {
    line.starts_with('#') || line.starts_with("//")
}

/// Commands in an imported file. A file containing journal command lines is
/// read as a journal; anything else is read as a plain script.
fn import_commands(text: &str) -> Vec<String> {
    let is_journal = text.lines().any(|l| l.starts_with(COMMAND_MARKER));
    if is_journal {
        return Journal::parse(text)
            .commands()
            .map(|(_, c)| c.to_string())
            .collect();
    }
    text.lines()
        .map(normalize)
        .filter(|l| !l.is_empty() && !is_comment(l))
        .map(str::to_string)
        .collect()
}
