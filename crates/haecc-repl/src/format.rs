//! Output formatting for the REPL.
//!
//! Command reports are printed as journaled. Listings (journal, store,
//! session) get a compact, numbered layout for the terminal.

use std::fmt::Write;

use haecc_kernel::{CommandReport, DeleteReport, EntityStore, InverseEffect, Journal, Session};

/// Output for one executed line, or `None` when it produced nothing.
pub fn format_report(report: &CommandReport) -> Option<String> {
    if report.lines.is_empty() {
        None
    } else {
        Some(report.output())
    }
}

/// The journal with line numbers, the numbers `/delete` takes.
pub fn format_journal(journal: &Journal) -> String {
    if journal.is_empty() {
        return "(journal is empty)".to_string();
    }
    let width = journal.len().saturating_sub(1).to_string().len();
    let mut out = String::new();
    for (index, entry) in journal.entries().iter().enumerate() {
        let _ = writeln!(out, "{index:>width$}  {}", entry.to_line());
    }
    out.trim_end().to_string()
}

/// Every entity in the store, grouped by kind.
pub fn format_store(store: &EntityStore) -> String {
    if store.is_empty() {
        return "(nothing declared)".to_string();
    }

    let mut out = String::new();
    section(&mut out, "Variables", store.variables(), |name, v| {
        format!("{name}: {} = {}", v.kind, v.source)
    });
    section(&mut out, "Layers", store.layers(), |name, layer| {
        let canvas = layer
            .canvas
            .map(|(w, h)| format!("{w}x{h}"))
            .unwrap_or_else(|| "-".to_string());
        let source = layer.source.as_deref().unwrap_or("-");
        format!(
            "{name}: canvas {canvas}, source {source}, opacity {}, transform ({}, {}), scale ({}, {})",
            layer.opacity, layer.transform.0, layer.transform.1, layer.scale.0, layer.scale.1
        )
    });
    section(&mut out, "Buffers", store.buffers(), |name, buffer| {
        let canvas = buffer
            .canvas
            .map(|(w, h)| format!("{w}x{h}"))
            .unwrap_or_else(|| "-".to_string());
        format!("{name}: canvas {canvas}, format {}", buffer.format)
    });
    section(&mut out, "Functions", store.functions(), |name, f| {
        format!("{name}({}) = {}", f.params.join(", "), f.body)
    });
    section(&mut out, "Processes", store.processes(), |name, p| {
        let body = p
            .body
            .as_ref()
            .map(|b| format!(" returns {b}"))
            .unwrap_or_default();
        format!("{name}({}){body}", p.params.join(", "))
    });
    out.trim_end().to_string()
}

fn section<'a, T: 'a>(
    out: &mut String,
    title: &str,
    items: impl Iterator<Item = (&'a String, &'a T)>,
    line: impl Fn(&str, &T) -> String,
) {
    let mut items = items.peekable();
    if items.peek().is_none() {
        return;
    }
    let _ = writeln!(out, "{title}:");
    for (name, item) in items {
        let _ = writeln!(out, "  {}", line(name, item));
    }
}

/// Result of `/delete`.
pub fn format_delete(report: &DeleteReport) -> String {
    let undone = match &report.effect {
        InverseEffect::Retract { name, keyword } => format!("removed {keyword} '{name}'"),
        InverseEffect::UndoMethod { object, method } => format!("undo {object}.{method}()"),
        InverseEffect::UndoProperty { object, property } => format!("undo {object}.{property}"),
        InverseEffect::StopProcess { process } => format!("stopped {process}"),
        InverseEffect::None => "nothing to undo".to_string(),
    };
    format!("✓ Deleted '{}' ({undone})", report.removed.text)
}

/// Summary for `/session`.
pub fn format_session(session: &Session) -> String {
    let backend = session.backend();
    let dir = session
        .config()
        .composition_dir
        .as_ref()
        .map(|d| d.display().to_string())
        .unwrap_or_else(|| "(in memory)".to_string());
    format!(
        "Session: {}\nBackend: {} ({})\nCompositions: {dir}\nEntities: {}\nJournal lines: {}",
        session.name(),
        backend.describe(),
        if backend.is_connected() { "connected" } else { "not connected" },
        session.store().len(),
        session.journal().len(),
    )
}
