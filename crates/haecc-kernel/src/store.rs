//! The entity store: every live entity a session knows about, keyed by name.
//!
//! Names are unique across all mappings. Declaring a name that already exists
//! anywhere replaces the old binding, whatever kind it was.

use std::collections::BTreeMap;

use haecc_types::{Buffer, FunctionDef, Layer, ProcessDef, Variable};

/// An entity removed from the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Removed {
    Variable(Variable),
    Layer(Layer),
    Buffer(Buffer),
    Function(FunctionDef),
    Process(ProcessDef),
}

impl Removed {
    /// The declaration keyword that would recreate this entity.
    pub fn keyword(&self) -> &'static str {
        match self {
            Removed::Variable(v) => v.kind.keyword(),
            Removed::Layer(_) => "layer_obj",
            Removed::Buffer(_) => "buffer_obj",
            Removed::Function(_) => "func",
            Removed::Process(_) => "process",
        }
    }
}

/// Name-keyed mappings of live entities.
///
/// `BTreeMap` keeps iteration sorted, which the dossier relies on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityStore {
    variables: BTreeMap<String, Variable>,
    layers: BTreeMap<String, Layer>,
    buffers: BTreeMap<String, Buffer>,
    functions: BTreeMap<String, FunctionDef>,
    processes: BTreeMap<String, ProcessDef>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── mutation ──

    pub fn declare_variable(&mut self, name: &str, variable: Variable) {
        self.remove(name);
        self.variables.insert(name.to_string(), variable);
    }

    pub fn declare_layer(&mut self, layer: Layer) {
        self.remove(&layer.name);
        self.layers.insert(layer.name.clone(), layer);
    }

    pub fn declare_buffer(&mut self, buffer: Buffer) {
        self.remove(&buffer.name);
        self.buffers.insert(buffer.name.clone(), buffer);
    }

    pub fn define_function(&mut self, function: FunctionDef) {
        self.remove(&function.name);
        self.functions.insert(function.name.clone(), function);
    }

    pub fn define_process(&mut self, process: ProcessDef) {
        self.remove(&process.name);
        self.processes.insert(process.name.clone(), process);
    }

    /// Remove `name` from whichever mapping holds it.
    pub fn remove(&mut self, name: &str) -> Option<Removed> {
        if let Some(v) = self.variables.remove(name) {
            return Some(Removed::Variable(v));
        }
        if let Some(l) = self.layers.remove(name) {
            return Some(Removed::Layer(l));
        }
        if let Some(b) = self.buffers.remove(name) {
            return Some(Removed::Buffer(b));
        }
        if let Some(f) = self.functions.remove(name) {
            return Some(Removed::Function(f));
        }
        self.processes.remove(name).map(Removed::Process)
    }

    pub fn clear(&mut self) {
        self.variables.clear();
        self.layers.clear();
        self.buffers.clear();
        self.functions.clear();
        self.processes.clear();
    }

    pub fn layer_mut(&mut self, name: &str) -> Option<&mut Layer> {
        self.layers.get_mut(name)
    }

    pub fn buffer_mut(&mut self, name: &str) -> Option<&mut Buffer> {
        self.buffers.get_mut(name)
    }

    // ── queries ──

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.get(name)
    }

    pub fn buffer(&self, name: &str) -> Option<&Buffer> {
        self.buffers.get(name)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(name)
    }

    pub fn process(&self, name: &str) -> Option<&ProcessDef> {
        self.processes.get(name)
    }

    pub fn variables(&self) -> impl Iterator<Item = (&String, &Variable)> {
        self.variables.iter()
    }

    pub fn layers(&self) -> impl Iterator<Item = (&String, &Layer)> {
        self.layers.iter()
    }

    pub fn buffers(&self) -> impl Iterator<Item = (&String, &Buffer)> {
        self.buffers.iter()
    }

    pub fn functions(&self) -> impl Iterator<Item = (&String, &FunctionDef)> {
        self.functions.iter()
    }

    pub fn processes(&self) -> impl Iterator<Item = (&String, &ProcessDef)> {
        self.processes.iter()
    }

    /// Total number of entities.
    pub fn len(&self) -> usize {
        self.variables.len()
            + self.layers.len()
            + self.buffers.len()
            + self.functions.len()
            + self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haecc_types::{Expr, VarKind};

    fn var(kind: VarKind) -> Variable {
        Variable {
            kind,
            source: Expr::int(0),
        }
    }

    #[test]
    fn redeclaring_moves_name_between_mappings() {
        let mut store = EntityStore::new();
        store.declare_variable("main", var(VarKind::VideoIn));
        store.declare_layer(Layer::new("main"));

        assert!(store.variable("main").is_none());
        assert!(store.layer("main").is_some());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn last_write_wins_within_a_mapping() {
        let mut store = EntityStore::new();
        store.declare_variable("x", var(VarKind::Number));
        store.declare_variable("x", var(VarKind::Generic));
        assert_eq!(store.variable("x").map(|v| v.kind), Some(VarKind::Generic));
    }

    #[test]
    fn remove_reports_what_was_there() {
        let mut store = EntityStore::new();
        store.declare_buffer(Buffer::new("scratch"));
        let removed = store.remove("scratch").expect("buffer removed");
        assert_eq!(removed.keyword(), "buffer_obj");
        assert!(store.remove("scratch").is_none());
        assert!(store.is_empty());
    }
}
