//! haecc CLI entry point.
//!
//! Usage:
//!   haecc                        # Interactive REPL
//!   haecc -c <line>              # Execute one line and exit
//!   haecc scene.txt              # Run a script or journal file
//!   haecc --socket <path> ...    # Use a specific backend socket
//!   haecc --dir <path> ...       # Persist the journal and dossier in <path>
//!   haecc --describe <text> ...  # Description recorded in the dossier
//!   haecc --offline ...          # No backend

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use tokio::runtime::Runtime;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use haecc_kernel::{Session, SessionConfig};

fn main() -> ExitCode {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

/// What to do once options are read.
enum Mode {
    Repl,
    Command(String),
    Script(PathBuf),
}

fn run() -> Result<ExitCode> {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut config = SessionConfig::repl();
    let mut mode = Mode::Repl;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(ExitCode::SUCCESS);
            }
            "--version" | "-V" => {
                println!(
                    "haecc {} ({} {})",
                    env!("CARGO_PKG_VERSION"),
                    env!("HAECC_GIT_HASH"),
                    env!("HAECC_BUILD_DATE")
                );
                return Ok(ExitCode::SUCCESS);
            }
            "-c" => {
                let line = iter.next().context("-c requires a command argument")?;
                mode = Mode::Command(line.clone());
            }
            "--offline" => config = config.detached(),
            "--socket" => {
                let path = iter.next().context("--socket requires a socket path")?;
                config = config.with_socket(path);
            }
            "--dir" => {
                let path = iter.next().context("--dir requires a directory")?;
                config = config.with_composition_dir(path);
            }
            "--describe" => {
                let text = iter.next().context("--describe requires a description")?;
                config = config.with_description(text);
            }
            other => {
                if let Some(path) = other.strip_prefix("--socket=") {
                    config = config.with_socket(path);
                } else if let Some(path) = other.strip_prefix("--dir=") {
                    config = config.with_composition_dir(path);
                } else if !other.starts_with('-') {
                    mode = Mode::Script(PathBuf::from(other));
                } else {
                    eprintln!("Unknown option: {other}");
                    eprintln!("Run 'haecc --help' for usage.");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    }

    match mode {
        Mode::Repl => {
            haecc_repl::run(config)?;
            Ok(ExitCode::SUCCESS)
        }
        Mode::Command(line) => run_lines(config, std::iter::once(line.as_str())),
        Mode::Script(path) => {
            let source = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read script: {}", path.display()))?;
            run_lines(config, script_lines(&source))
        }
    }
}

fn print_help() {
    println!(
        r#"haeccstable — haecc v{}

Usage:
  haecc [OPTIONS]              Interactive REPL
  haecc [OPTIONS] -c <line>    Execute one line and exit
  haecc [OPTIONS] <file>       Run a script or journal file

Options:
  -c <line>                    Execute one line and exit
  --socket <path>              Backend socket (default: $XDG_RUNTIME_DIR/haeccstable/backend.sock)
  --dir <path>                 Composition directory (default: ./composition_files)
  --describe <text>            Description recorded in the dossier
  --offline                    Run without a backend
  -h, --help                   Show this help
  -V, --version                Show version

Examples:
  haecc                                    # Start live coding
  haecc -c 'video_invar cam = capture(0)'  # One statement
  haecc --offline scenes/intro.txt         # Dry-run a scene
"#,
        env!("CARGO_PKG_VERSION")
    );
}

/// Lines of a script file. A journal file contributes only its commands.
fn script_lines(source: &str) -> Vec<&str> {
    let is_journal = source
        .lines()
        .any(|l| l.starts_with(haecc_kernel::journal::COMMAND_MARKER));
    source
        .lines()
        .filter_map(|l| {
            if is_journal {
                l.strip_prefix(haecc_kernel::journal::COMMAND_MARKER)
            } else {
                Some(l)
            }
        })
        .collect()
}

/// Execute lines non-interactively, printing each report.
///
/// Exits with failure if any line failed.
fn run_lines<'a>(config: SessionConfig, lines: impl IntoIterator<Item = &'a str>) -> Result<ExitCode> {
    let runtime = Runtime::new().context("Failed to create tokio runtime")?;
    let (backend, notice) = runtime.block_on(haecc_repl::open_backend(&config));
    if let Some(notice) = notice {
        eprintln!("{notice}");
    }
    let mut session = Session::with_backend(config, backend).context("Failed to create session")?;

    let mut failures = 0usize;
    for line in lines {
        let report = runtime.block_on(session.execute(line));
        for output in &report.lines {
            println!("{output}");
        }
        if !report.ok {
            failures += 1;
        }
    }

    if failures > 0 {
        bail!("{failures} line(s) failed");
    }
    Ok(ExitCode::SUCCESS)
}
