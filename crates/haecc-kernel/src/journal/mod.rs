//! The journal: an ordered, user-editable history of commands and their output.
//!
//! Entries are appended as commands run and removed one at a time by position.
//! Removing a command re-derives its intent from the stored text (see
//! [`InverseEffect`]) and applies the inverse to the entity store.
//!
//! On disk, one entry per line. Commands carry the `> ` marker:
//!
//! ```text
//! > video_invar webcam = capture(0)
//! ✓ Variable 'webcam' declared
//! ```
//!
//! Output lines are escaped so they never read back as commands: a backslash
//! becomes `\\`, line breaks become `\n` and `\r`, and a leading `>` becomes
//! `\>`. An empty line is an empty output entry.

mod inverse;

pub use inverse::InverseEffect;

use thiserror::Error;
use tracing::info;

use crate::store::EntityStore;
use haecc_types::BackendMessage;

/// Marks a command line in the serialized journal.
pub const COMMAND_MARKER: &str = "> ";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JournalError {
    #[error("no command at journal line {index} ({len} entries)")]
    OutOfRange { index: usize, len: usize },
}

/// One journal line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub text: String,
    pub is_command: bool,
}

impl JournalEntry {
    pub fn command(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_command: true,
        }
    }

    pub fn output(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_command: false,
        }
    }

    /// Serialized form, without the trailing newline.
    pub fn to_line(&self) -> String {
        if self.is_command {
            format!("{COMMAND_MARKER}{}", self.text)
        } else {
            escape_output(&self.text)
        }
    }

    pub fn from_line(line: &str) -> Self {
        match line.strip_prefix(COMMAND_MARKER) {
            Some(command) => Self::command(command),
            None => Self::output(unescape_output(line)),
        }
    }
}

fn escape_output(text: &str) -> String {
    let mut line = String::with_capacity(text.len());
    if text.starts_with('>') {
        line.push('\\');
    }
    for c in text.chars() {
        match c {
            '\\' => line.push_str("\\\\"),
            '\n' => line.push_str("\\n"),
            '\r' => line.push_str("\\r"),
            c => line.push(c),
        }
    }
    line
}

/// Unknown escapes are kept as written, so hand-edited files read back as typed.
fn unescape_output(line: &str) -> String {
    let mut text = String::with_capacity(line.len());
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            text.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => text.push('\\'),
            Some('n') => text.push('\n'),
            Some('r') => text.push('\r'),
            Some('>') => text.push('>'),
            Some(other) => {
                text.push('\\');
                text.push(other);
            }
            None => text.push('\\'),
        }
    }
    text
}

/// A removed command and the inverse effect applied for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Deletion {
    pub entry: JournalEntry,
    pub effect: InverseEffect,
    /// Backend messages for the inverse, in send order.
    pub emitted: Vec<BackendMessage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Journal {
    entries: Vec<JournalEntry>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a journal from its serialized text.
    pub fn parse(text: &str) -> Self {
        let entries = text.lines().map(JournalEntry::from_line).collect();
        Self { entries }
    }

    pub fn to_text(&self) -> String {
        let mut text = String::new();
        for entry in &self.entries {
            text.push_str(&entry.to_line());
            text.push('\n');
        }
        text
    }

    pub fn append(&mut self, entry: JournalEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&JournalEntry> {
        self.entries.get(index)
    }

    /// Command entries with their positions.
    pub fn commands(&self) -> impl Iterator<Item = (usize, &str)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_command)
            .map(|(i, e)| (i, e.text.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Remove the command at `index` and apply its inverse to `store`.
    ///
    /// Later entries shift down by one. Output lines that followed the
    /// command stay where they are.
    pub fn delete_at(
        &mut self,
        index: usize,
        store: &mut EntityStore,
    ) -> Result<Deletion, JournalError> {
        let is_command = self.entries.get(index).map(|e| e.is_command);
        if is_command != Some(true) {
            return Err(JournalError::OutOfRange {
                index,
                len: self.entries.len(),
            });
        }

        let effect = InverseEffect::derive(&self.entries[index].text);
        let emitted = effect.apply(&self.entries[index].text, store);
        let entry = self.entries.remove(index);
        info!(index, command = %entry.text, ?effect, "deleted journal entry");

        Ok(Deletion {
            entry,
            effect,
            emitted,
        })
    }
}
