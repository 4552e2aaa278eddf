//! Inverse effects for retracted journal commands.
//!
//! The stored command text is matched against a few shapes rather than
//! re-parsed, so lines that no longer parse (or never did) still map to an
//! inverse. Only declarations touch the store; method calls, property
//! assignments and process calls are undone by the backend alone.

use std::sync::LazyLock;

use regex::Regex;

use crate::store::EntityStore;
use haecc_types::BackendMessage;

static DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(video_invar|video_outvar|audio_invar|audio_outvar|number_var|window_var|layer_obj|buffer_obj|var|func|function|process)\s+(\$?[A-Za-z_][A-Za-z0-9_]*)",
    )
    .expect("declaration regex is valid")
});

static METHOD_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\.([A-Za-z_][A-Za-z0-9_]*)\s*\(")
        .expect("method call regex is valid")
});

static PROPERTY_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\.([A-Za-z_][A-Za-z0-9_]*)\s*=")
        .expect("property assignment regex is valid")
});

static PROCESS_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\$[A-Za-z_][A-Za-z0-9_]*)\s*\(").expect("process call regex is valid")
});

/// What retracting a command means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InverseEffect {
    /// A declaration or definition: forget the name.
    Retract { name: String, keyword: String },
    UndoMethod { object: String, method: String },
    UndoProperty { object: String, property: String },
    StopProcess { process: String },
    /// Nothing recognizable (print, plain function call, import, ...).
    None,
}

impl InverseEffect {
    /// Classify a command by its text.
    pub fn derive(text: &str) -> Self {
        if let Some(caps) = DECLARATION.captures(text) {
            let keyword = match &caps[1] {
                "function" => "func",
                other => other,
            };
            let name = &caps[2];
            // Processes are only ever stored under their `$` name
            if (keyword == "process") != name.starts_with('$') {
                return InverseEffect::None;
            }
            return InverseEffect::Retract {
                name: name.to_string(),
                keyword: keyword.to_string(),
            };
        }
        if let Some(caps) = METHOD_CALL.captures(text) {
            return InverseEffect::UndoMethod {
                object: caps[1].to_string(),
                method: caps[2].to_string(),
            };
        }
        if let Some(caps) = PROPERTY_ASSIGNMENT.captures(text) {
            return InverseEffect::UndoProperty {
                object: caps[1].to_string(),
                property: caps[2].to_string(),
            };
        }
        if let Some(caps) = PROCESS_CALL.captures(text) {
            return InverseEffect::StopProcess {
                process: caps[1].to_string(),
            };
        }
        InverseEffect::None
    }

    /// Apply the local half of the inverse and return the backend half.
    ///
    /// Retracting an absent name is not an error; the backend is still told.
    pub fn apply(&self, original_text: &str, store: &mut EntityStore) -> Vec<BackendMessage> {
        match self {
            InverseEffect::Retract { name, keyword } => {
                store.remove(name);
                vec![BackendMessage::CleanupVariable {
                    name: name.clone(),
                    kind: keyword.clone(),
                }]
            }
            InverseEffect::UndoMethod { object, method } => vec![BackendMessage::UndoMethod {
                object: object.clone(),
                method: method.clone(),
                original_text: original_text.to_string(),
            }],
            InverseEffect::UndoProperty { object, property } => {
                vec![BackendMessage::UndoProperty {
                    object: object.clone(),
                    property: property.clone(),
                }]
            }
            InverseEffect::StopProcess { process } => vec![BackendMessage::StopProcess {
                process: process.clone(),
                original_text: original_text.to_string(),
            }],
            InverseEffect::None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn retract(name: &str, keyword: &str) -> InverseEffect {
        InverseEffect::Retract {
            name: name.into(),
            keyword: keyword.into(),
        }
    }

    #[rstest]
    #[case::variable("video_invar webcam = capture(0)", retract("webcam", "video_invar"))]
    #[case::bare_layer("layer_obj main", retract("main", "layer_obj"))]
    #[case::function("function double(x) = mul(x, 2)", retract("double", "func"))]
    #[case::process("process $spin(s) { return s }", retract("$spin", "process"))]
    #[case::process_without_sigil("process spin(s) { return s }", InverseEffect::None)]
    #[case::method("main.cast(webcam)", InverseEffect::UndoMethod { object: "main".into(), method: "cast".into() })]
    #[case::property("main.opacity = 40", InverseEffect::UndoProperty { object: "main".into(), property: "opacity".into() })]
    #[case::process_call("$spin(2)", InverseEffect::StopProcess { process: "$spin".into() })]
    #[case::print(r#"print("hi")"#, InverseEffect::None)]
    #[case::keyword_prefix("variable.x = 1", InverseEffect::UndoProperty { object: "variable".into(), property: "x".into() })]
    fn derives(#[case] text: &str, #[case] expected: InverseEffect) {
        assert_eq!(InverseEffect::derive(text), expected);
    }

    #[test]
    fn method_undo_keeps_layer_state() {
        let mut store = EntityStore::new();
        let mut layer = haecc_types::Layer::new("main");
        layer.source = Some("webcam".into());
        store.declare_layer(layer);

        let text = "main.cast(webcam)";
        let messages = InverseEffect::derive(text).apply(text, &mut store);

        assert_eq!(
            messages,
            vec![BackendMessage::UndoMethod {
                object: "main".into(),
                method: "cast".into(),
                original_text: text.into(),
            }]
        );
        // The local cast binding is left for the backend to reconcile
        assert_eq!(
            store.layer("main").and_then(|l| l.source.as_deref()),
            Some("webcam")
        );
    }
}
