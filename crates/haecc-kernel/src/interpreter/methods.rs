//! Methods and properties with local semantics.
//!
//! `cast` and `project` are validated here and produce dedicated backend
//! messages. `transform`, `scale` and `opacity` only change the local layer.
//! Every other method is forwarded as a generic method call.

use haecc_types::{Args, BackendMessage, Expr, Layer, Value};

use super::{number_of, EvalError, Evaluation};
use crate::store::EntityStore;

pub(super) fn call(
    object: &str,
    method: &str,
    args: &Args,
    store: &mut EntityStore,
) -> Result<Evaluation, EvalError> {
    if matches!(method, "transform" | "scale" | "opacity") && store.layer(object).is_none() {
        return Err(EvalError::UnknownLayer(object.to_string()));
    }

    match method {
        "cast" => cast(object, args, store),
        "project" => project(object, args, store),
        "transform" => {
            let xy = number_pair("transform", args, store)?;
            layer_mut(object, store)?.transform = xy;
            Ok(Evaluation::success(format!(
                "Layer '{object}' transform set to ({}, {})",
                xy.0, xy.1
            )))
        }
        "scale" => {
            let xy = number_pair("scale", args, store)?;
            layer_mut(object, store)?.scale = xy;
            Ok(Evaluation::success(format!(
                "Layer '{object}' scale set to ({}, {})",
                xy.0, xy.1
            )))
        }
        "opacity" => {
            let value = args.get("value", 0).ok_or(EvalError::MissingArgument {
                method: "opacity",
                expected: "a value from 0 to 100",
            })?;
            let opacity = percent("opacity", value, store)?;
            layer_mut(object, store)?.opacity = opacity;
            Ok(Evaluation::success(format!(
                "Layer '{object}' opacity set to {opacity}"
            )))
        }
        _ => Ok(
            Evaluation::success(format!("Method '{object}.{method}()' called")).emit(
                BackendMessage::MethodCall {
                    object: object.to_string(),
                    method: method.to_string(),
                    args: args.clone(),
                },
            ),
        ),
    }
}

/// `layer.cast(source)`, or `source.cast(layer)` when only the argument is a layer.
fn cast(object: &str, args: &Args, store: &mut EntityStore) -> Result<Evaluation, EvalError> {
    let arg = args
        .get("source", 0)
        .and_then(Expr::as_identifier)
        .ok_or(EvalError::MissingArgument {
            method: "cast",
            expected: "a variable or layer name",
        })?;

    let reversed = store.layer(object).is_none() && store.layer(arg).is_some();
    let (layer_name, source_name) = if reversed { (arg, object) } else { (object, arg) };

    let source = store
        .variable(source_name)
        .ok_or_else(|| EvalError::UnknownVariable(source_name.to_string()))?;
    if store.layer(layer_name).is_none() {
        return Err(EvalError::UnknownLayer(layer_name.to_string()));
    }
    if !source.kind.is_input() {
        return Err(EvalError::WrongKind {
            name: source_name.to_string(),
            expected: "an input variable",
            found: source.kind,
        });
    }

    let device = source.source.clone();
    layer_mut(layer_name, store)?.source = Some(source_name.to_string());

    Ok(
        Evaluation::success(format!("Cast '{source_name}' into layer '{layer_name}'")).emit(
            BackendMessage::StartCapture {
                device,
                layer: layer_name.to_string(),
            },
        ),
    )
}

/// `output.project(layer, z_index)`. The layer is sent as a snapshot.
fn project(object: &str, args: &Args, store: &EntityStore) -> Result<Evaluation, EvalError> {
    let layer_name = args
        .get("layer", 0)
        .and_then(Expr::as_identifier)
        .ok_or(EvalError::MissingArgument {
            method: "project",
            expected: "a layer name",
        })?;
    let z_index = match args.get("z_index", 1) {
        Some(expr) => number_of(expr, store)
            .map(|z| z as i64)
            .ok_or_else(|| EvalError::NotANumber {
                what: "z_index".into(),
                found: expr.to_string(),
            })?,
        None => 0,
    };

    let output = store
        .variable(object)
        .ok_or_else(|| EvalError::UnknownVariable(object.to_string()))?;
    if !output.kind.is_output() {
        return Err(EvalError::WrongKind {
            name: object.to_string(),
            expected: "an output variable",
            found: output.kind,
        });
    }
    let layer = store
        .layer(layer_name)
        .ok_or_else(|| EvalError::UnknownLayer(layer_name.to_string()))?;

    Ok(Evaluation::success(format!(
        "Projected layer '{layer_name}' onto '{object}' at z={z_index}"
    ))
    .emit(BackendMessage::ProjectLayer {
        monitor: output.source.clone(),
        layer: layer.clone(),
        z_index,
    }))
}

/// `object.property = value`. Known layer and buffer fields are updated
/// locally; the assignment is always forwarded.
pub(super) fn assign(
    object: &str,
    property: &str,
    value: &Expr,
    store: &mut EntityStore,
) -> Result<Evaluation, EvalError> {
    if store.layer(object).is_some() {
        match property {
            "canvas" => {
                let canvas = value.as_int_pair();
                layer_mut(object, store)?.canvas = canvas;
            }
            "opacity" => {
                let opacity = percent("opacity", value, store)?;
                layer_mut(object, store)?.opacity = opacity;
            }
            "transform" | "scale" => {
                let pair = expr_number_pair(property, value, store)?;
                let layer = layer_mut(object, store)?;
                if property == "transform" {
                    layer.transform = pair;
                } else {
                    layer.scale = pair;
                }
            }
            _ => {}
        }
    } else if let Some(buffer) = store.buffer_mut(object) {
        match (property, value) {
            ("canvas", _) => buffer.canvas = value.as_int_pair(),
            ("format", Expr::Literal(Value::String(format))) => buffer.format = format.clone(),
            _ => {}
        }
    }

    Ok(
        Evaluation::success(format!("Property '{object}.{property}' set")).emit(
            BackendMessage::PropertyAssignment {
                object: object.to_string(),
                property: property.to_string(),
                value: value.clone(),
            },
        ),
    )
}

/// `object.property`. Shows the local value when there is one.
pub(super) fn access(object: &str, property: &str, store: &EntityStore) -> String {
    let local = store
        .layer(object)
        .and_then(|layer| layer_field(layer, property))
        .or_else(|| {
            store.buffer(object).and_then(|buffer| match property {
                "canvas" => buffer.canvas.map(|(w, h)| format!("({w}, {h})")),
                "format" => Some(buffer.format.clone()),
                _ => None,
            })
        });

    match local {
        Some(value) => format!("{object}.{property} = {value}"),
        None => format!("Property '{object}.{property}' accessed"),
    }
}

fn layer_field(layer: &Layer, property: &str) -> Option<String> {
    match property {
        "canvas" => layer.canvas.map(|(w, h)| format!("({w}, {h})")),
        "source" => layer.source.clone(),
        "transform" => Some(format!("({}, {})", layer.transform.0, layer.transform.1)),
        "scale" => Some(format!("({}, {})", layer.scale.0, layer.scale.1)),
        "opacity" => Some(layer.opacity.to_string()),
        _ => None,
    }
}

fn layer_mut<'a>(name: &str, store: &'a mut EntityStore) -> Result<&'a mut Layer, EvalError> {
    store
        .layer_mut(name)
        .ok_or_else(|| EvalError::UnknownLayer(name.to_string()))
}

fn number(what: &str, expr: &Expr, store: &EntityStore) -> Result<f64, EvalError> {
    number_of(expr, store).ok_or_else(|| EvalError::NotANumber {
        what: what.to_string(),
        found: expr.to_string(),
    })
}

/// Opacity is a percentage; out-of-range values are clamped.
fn percent(what: &str, expr: &Expr, store: &EntityStore) -> Result<u8, EvalError> {
    let value = number(what, expr, store)?;
    Ok(value.round().clamp(0.0, 100.0) as u8)
}

fn number_pair(
    method: &'static str,
    args: &Args,
    store: &EntityStore,
) -> Result<(f64, f64), EvalError> {
    let (Some(x), Some(y)) = (args.get("x", 0), args.get("y", 1)) else {
        return Err(EvalError::MissingArgument {
            method,
            expected: "two numbers",
        });
    };
    Ok((number(method, x, store)?, number(method, y, store)?))
}

/// A `(x, y)` tuple of numbers on the right of an assignment.
fn expr_number_pair(what: &str, expr: &Expr, store: &EntityStore) -> Result<(f64, f64), EvalError> {
    match expr {
        Expr::Tuple(items) if items.len() == 2 => {
            Ok((number(what, &items[0], store)?, number(what, &items[1], store)?))
        }
        _ => Err(EvalError::NotANumber {
            what: what.to_string(),
            found: expr.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::{evaluate, EvalError, Outcome};
    use crate::parser::parse_line;
    use crate::store::EntityStore;
    use haecc_types::{BackendMessage, Expr};
    use rstest::rstest;

    fn run(store: &mut EntityStore, line: &str) -> crate::interpreter::Evaluation {
        evaluate(&parse_line(line), store)
    }

    #[test]
    fn cast_requires_declared_source() {
        let mut store = EntityStore::new();
        run(&mut store, "layer_obj layer");
        let eval = run(&mut store, "layer.cast(webcam)");
        assert_eq!(
            eval.outcome,
            Outcome::Failure(EvalError::UnknownVariable("webcam".into()))
        );
        assert!(eval.emitted.is_empty());
    }

    #[test]
    fn cast_emits_start_capture_once() {
        let mut store = EntityStore::new();
        run(&mut store, "layer_obj layer");
        run(&mut store, "video_invar webcam = capture(0)");
        let eval = run(&mut store, "layer.cast(webcam)");

        assert!(eval.is_success());
        assert_eq!(eval.emitted.len(), 1);
        match &eval.emitted[0] {
            BackendMessage::StartCapture { layer, device } => {
                assert_eq!(layer, "layer");
                assert_eq!(device.to_string(), "capture(0)");
            }
            other => panic!("unexpected message {other:?}"),
        }
        assert_eq!(
            store.layer("layer").and_then(|l| l.source.as_deref()),
            Some("webcam")
        );
    }

    #[test]
    fn cast_accepts_source_receiver() {
        let mut store = EntityStore::new();
        run(&mut store, "layer_obj main");
        run(&mut store, "video_invar cam = capture(1)");
        let eval = run(&mut store, "cam.cast(main)");
        assert!(eval.is_success());
        assert_eq!(store.layer("main").and_then(|l| l.source.clone()), Some("cam".into()));
    }

    #[test]
    fn cast_rejects_output_source() {
        let mut store = EntityStore::new();
        run(&mut store, "layer_obj main");
        run(&mut store, "video_outvar screen = monitor(1)");
        let eval = run(&mut store, "main.cast(screen)");
        assert!(matches!(
            eval.outcome,
            Outcome::Failure(EvalError::WrongKind { .. })
        ));
    }

    #[test]
    fn project_sends_snapshot() {
        let mut store = EntityStore::new();
        run(&mut store, "layer_obj main");
        run(&mut store, "video_outvar screen = monitor(1)");
        run(&mut store, "main.opacity(40)");
        let eval = run(&mut store, "screen.project(main, 2)");

        let snapshot = match &eval.emitted[..] {
            [BackendMessage::ProjectLayer {
                monitor,
                layer,
                z_index,
            }] => {
                assert_eq!(*z_index, 2);
                assert_eq!(monitor.to_string(), "monitor(1)");
                layer.clone()
            }
            other => panic!("unexpected messages {other:?}"),
        };

        run(&mut store, "main.opacity(90)");
        assert_eq!(snapshot.opacity, 40);
        assert_eq!(store.layer("main").map(|l| l.opacity), Some(90));
    }

    #[test]
    fn project_defaults_z_to_zero() {
        let mut store = EntityStore::new();
        run(&mut store, "layer_obj main");
        run(&mut store, "window_var win = window(800, 600)");
        let eval = run(&mut store, "win.project(main)");
        assert!(matches!(
            eval.emitted.as_slice(),
            [BackendMessage::ProjectLayer { z_index: 0, .. }]
        ));
    }

    #[test]
    fn layer_methods_are_local() {
        let mut store = EntityStore::new();
        run(&mut store, "layer_obj main");
        run(&mut store, "number_var dx = 12");

        let eval = run(&mut store, "main.transform(dx, -4)");
        assert!(eval.emitted.is_empty());
        assert_eq!(store.layer("main").map(|l| l.transform), Some((12.0, -4.0)));

        run(&mut store, r#"main.scale("2", 0.5)"#);
        assert_eq!(store.layer("main").map(|l| l.scale), Some((2.0, 0.5)));

        run(&mut store, "main.opacity(250)");
        assert_eq!(store.layer("main").map(|l| l.opacity), Some(100));
    }

    #[rstest]
    #[case("ghost.opacity(10)")]
    #[case("ghost.transform(1, 2)")]
    #[case("ghost.scale(2, 2)")]
    #[case("ghost.transform()")]
    #[case("ghost.scale(\"wide\")")]
    fn layer_methods_need_a_layer(#[case] line: &str) {
        let mut store = EntityStore::new();
        let eval = run(&mut store, line);
        assert_eq!(
            eval.outcome,
            Outcome::Failure(EvalError::UnknownLayer("ghost".into()))
        );
        assert!(eval.emitted.is_empty());
    }

    #[test]
    fn cast_onto_undeclared_layer_names_the_layer() {
        let mut store = EntityStore::new();
        run(&mut store, "video_invar webcam = capture(0)");
        let eval = run(&mut store, "layer.cast(webcam)");
        assert_eq!(
            eval.outcome,
            Outcome::Failure(EvalError::UnknownLayer("layer".into()))
        );
        assert!(eval.emitted.is_empty());
    }

    #[rstest]
    #[case::undeclared_output("screen.project(main)", EvalError::UnknownVariable("screen".into()))]
    #[case::undeclared_layer("win.project(ghost)", EvalError::UnknownLayer("ghost".into()))]
    fn project_requires_declared_entities(#[case] line: &str, #[case] expected: EvalError) {
        let mut store = EntityStore::new();
        run(&mut store, "layer_obj main");
        run(&mut store, "window_var win = window(800, 600)");
        let eval = run(&mut store, line);
        assert_eq!(eval.outcome, Outcome::Failure(expected));
        assert!(eval.emitted.is_empty());
    }

    #[test]
    fn project_rejects_input_variables() {
        let mut store = EntityStore::new();
        run(&mut store, "layer_obj main");
        run(&mut store, "video_invar webcam = capture(0)");
        let eval = run(&mut store, "webcam.project(main)");
        assert!(matches!(
            eval.outcome,
            Outcome::Failure(EvalError::WrongKind { ref name, .. }) if name == "webcam"
        ));
        assert!(eval.emitted.is_empty());
    }

    #[test]
    fn other_methods_forward() {
        let mut store = EntityStore::new();
        let eval = run(&mut store, "fx.blur(radius=3)");
        assert_eq!(eval.outcome, Outcome::Success("Method 'fx.blur()' called".into()));
        assert!(matches!(
            eval.emitted.as_slice(),
            [BackendMessage::MethodCall { method, .. }] if method == "blur"
        ));
    }

    #[test]
    fn buffer_properties_update_locally() {
        let mut store = EntityStore::new();
        run(&mut store, "buffer_obj mask");
        run(&mut store, r#"mask.format = "r8""#);
        run(&mut store, "mask.canvas = (64, 64)");

        let buffer = store.buffer("mask").expect("buffer declared");
        assert_eq!(buffer.format, "r8");
        assert_eq!(buffer.canvas, Some((64, 64)));
    }

    #[test]
    fn property_assignment_always_forwards() {
        let mut store = EntityStore::new();
        let eval = run(&mut store, "scene.mood = \"calm\"");
        assert_eq!(
            eval.emitted,
            vec![BackendMessage::PropertyAssignment {
                object: "scene".into(),
                property: "mood".into(),
                value: Expr::string("calm"),
            }]
        );
    }

    #[test]
    fn property_access_reads_local_value() {
        let mut store = EntityStore::new();
        run(&mut store, "layer_obj main");
        let eval = run(&mut store, "main.opacity");
        assert_eq!(eval.outcome, Outcome::Success("main.opacity = 100".into()));

        let eval = run(&mut store, "other.thing");
        assert_eq!(
            eval.outcome,
            Outcome::Success("Property 'other.thing' accessed".into())
        );
    }
}
