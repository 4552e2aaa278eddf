//! The dossier: a read-only snapshot of a session's entities.
//!
//! Recomputed from the store on demand and written as pretty JSON after
//! every command, fully replacing the previous file.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::EntityStore;
use haecc_types::{Buffer, FunctionDef, Layer, ProcessDef, Variable};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub name: String,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendStatus {
    /// `socket /path`, `detached`, ...
    pub kind: String,
    pub connected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dossier {
    pub session: SessionInfo,
    pub backend: BackendStatus,
    pub variables: BTreeMap<String, Variable>,
    pub layers: BTreeMap<String, Layer>,
    pub buffers: BTreeMap<String, Buffer>,
    pub functions: BTreeMap<String, FunctionDef>,
    pub processes: BTreeMap<String, ProcessDef>,
}

impl Dossier {
    pub fn project(store: &EntityStore, session: SessionInfo, backend: BackendStatus) -> Self {
        fn collect<'a, T: Clone + 'a>(
            items: impl Iterator<Item = (&'a String, &'a T)>,
        ) -> BTreeMap<String, T> {
            items.map(|(k, v)| (k.clone(), v.clone())).collect()
        }

        Self {
            session,
            backend,
            variables: collect(store.variables()),
            layers: collect(store.layers()),
            buffers: collect(store.buffers()),
            functions: collect(store.functions()),
            processes: collect(store.processes()),
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Number of entities across all sections.
    pub fn entity_count(&self) -> usize {
        self.variables.len()
            + self.layers.len()
            + self.buffers.len()
            + self.functions.len()
            + self.processes.len()
    }
}
