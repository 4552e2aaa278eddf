//! Integration tests for the haecc REPL.
//!
//! These tests run lines through an offline REPL and check what it prints.

use haecc_kernel::SessionConfig;
use haecc_repl::Repl;
use rstest::rstest;

fn offline() -> Repl {
    Repl::with_config(SessionConfig::isolated()).expect("Failed to create REPL")
}

/// Run lines through `repl` and collect outputs.
fn run_lines(repl: &mut Repl, script: &str) -> Vec<String> {
    let mut outputs = Vec::new();
    for line in script.lines() {
        match repl.process_line(line) {
            Ok(Some(output)) => outputs.push(output),
            Ok(None) => {}
            Err(e) => outputs.push(format!("ERROR: {}", e)),
        }
    }
    outputs
}

fn run_script(script: &str) -> Vec<String> {
    run_lines(&mut offline(), script)
}

#[test]
fn declarations_report_success() {
    let outputs = run_script(
        r#"
video_invar webcam = capture(0)
layer_obj main
main.cast(webcam)
"#,
    );
    assert_eq!(
        outputs,
        vec![
            "✓ Variable 'webcam' declared",
            "✓ Layer 'main' declared",
            "✓ Cast 'webcam' into layer 'main'",
        ]
    );
}

#[test]
fn failures_are_marked() {
    let outputs = run_script("layer_obj main\nmain.cast(webcam)");
    assert_eq!(outputs[1], "✗ Unknown variable: webcam");
}

#[test]
fn print_is_raw() {
    let outputs = run_script(
        r#"
number_var speed = 3
print("speed is {}", speed)
"#,
    );
    assert_eq!(outputs.last().map(String::as_str), Some("speed is 3"));
}

#[test]
fn journal_and_delete() {
    let mut repl = offline();
    run_lines(&mut repl, "var x = 1\nvar y = 2");

    let journal = repl.process_line("/journal").unwrap().unwrap();
    assert!(journal.starts_with("0  > var x = 1"), "{journal}");

    let deleted = repl.process_line("/delete 0").unwrap().unwrap();
    assert_eq!(deleted, "✓ Deleted 'var x = 1' (removed var 'x')");
    assert!(repl.session().store().variable("x").is_none());
    assert!(repl.session().store().variable("y").is_some());

    let failed = repl.process_line("/delete 0").unwrap().unwrap();
    assert!(failed.starts_with("✗ Delete failed"), "{failed}");
}

#[rstest]
#[case("/delete")]
#[case("/delete two")]
fn delete_needs_a_number(#[case] line: &str) {
    let output = offline().process_line(line).unwrap().unwrap();
    assert!(output.starts_with("Usage: /delete"), "{output}");
}

#[test]
fn dossier_is_json() {
    let mut repl = offline();
    run_lines(&mut repl, "layer_obj main = (1280, 720)");
    let json = repl.process_line("/dossier").unwrap().unwrap();
    let dossier: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(dossier["layers"]["main"]["canvas"], serde_json::json!([1280, 720]));
    assert_eq!(dossier["backend"]["kind"], "detached");
}

#[test]
fn dossier_carries_the_description() {
    let config = SessionConfig::isolated().with_description("rehearsal");
    let mut repl = Repl::with_config(config).unwrap();
    let json = repl.process_line("/dossier").unwrap().unwrap();
    let dossier: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(dossier["session"]["description"], "rehearsal");
}

#[test]
fn save_commands_write_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = SessionConfig::isolated().with_composition_dir(dir.path());
    let mut repl = Repl::with_config(config).unwrap();
    run_lines(&mut repl, "var x = 1");

    let saved = repl.process_line("/save-journal take1").unwrap().unwrap();
    assert!(saved.starts_with("✓ Saved"), "{saved}");
    assert!(dir.path().join("take1.txt").exists());

    repl.process_line("/save-dossier take1").unwrap();
    assert!(dir.path().join("take1.json").exists());

    let usage = repl.process_line("/save-dossier").unwrap().unwrap();
    assert_eq!(usage, "Usage: /save-dossier <name>");
}

#[test]
fn save_without_directory_fails() {
    let output = offline().process_line("/save-journal x").unwrap().unwrap();
    assert!(output.starts_with("✗ Save failed"), "{output}");
}

#[test]
fn reset_clears_state() {
    let mut repl = offline();
    run_lines(&mut repl, "var x = 1");
    repl.process_line("/reset").unwrap();
    assert!(repl.session().store().is_empty());
    assert_eq!(
        repl.process_line("/journal").unwrap().as_deref(),
        Some("(journal is empty)")
    );
}

#[test]
fn ast_mode_parses_without_executing() {
    let mut repl = offline();
    repl.process_line("/ast").unwrap();
    let output = repl.process_line("var x = 1").unwrap().unwrap();
    assert!(output.contains("VariableDeclaration"), "{output}");
    assert!(repl.session().store().is_empty());

    let toggled = repl.process_line("/ast").unwrap().unwrap();
    assert_eq!(toggled, "AST mode: OFF");
}

#[rstest]
#[case("/quit")]
#[case("/q")]
#[case("quit")]
#[case("exit")]
fn quit_signals_exit(#[case] line: &str) {
    let err = offline().process_line(line).unwrap_err();
    assert_eq!(err.to_string(), "__REPL_EXIT__");
}

#[test]
fn help_and_unknown_commands() {
    let mut repl = offline();
    let help = repl.process_line("help").unwrap().unwrap();
    assert!(help.contains("/delete <line>"));

    let unknown = repl.process_line("/bogus").unwrap().unwrap();
    assert!(unknown.starts_with("Unknown command: /bogus"));
}

#[test]
fn blank_lines_print_nothing() {
    let mut repl = offline();
    assert_eq!(repl.process_line("").unwrap(), None);
    assert_eq!(repl.process_line("   ").unwrap(), None);
    assert_eq!(repl.process_line("# comment").unwrap(), None);
}

#[test]
fn ping_detached() {
    let output = offline().process_line("/ping").unwrap().unwrap();
    assert_eq!(output, "✓ detached: detached");
}

#[test]
fn missing_socket_starts_detached() {
    let dir = tempfile::tempdir().unwrap();
    let config = SessionConfig::isolated().with_socket(dir.path().join("none.sock"));
    let repl = Repl::with_config(config).unwrap();
    assert!(repl.notice().is_some_and(|n| n.contains("running detached")));
    assert_eq!(repl.session().backend().describe(), "detached");
}
