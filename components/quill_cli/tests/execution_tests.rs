//! Runtime execution tests
//!
//! Drive the CLI runtime the way main does: run files, collect
//! diagnostics, and check the status each path reports.

use core_types::{DiagnosticKind, RunStatus, Value};
use quill_cli::runtime::{diagnostics_json, exit_code};
use quill_cli::Runtime;

fn write_script(dir: &tempfile::TempDir, name: &str, source: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, source).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn files_run_against_the_core_module() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_script(&dir, "demo.qs", "let banner = str(6 * 7);");

    let mut runtime = Runtime::new(true).unwrap();
    assert_eq!(runtime.run_file(&path), RunStatus::Success);
    assert_eq!(runtime.vm().get_global("banner"), Some(Value::str("42")));
    assert!(runtime.diagnostics().is_empty());
}

#[test]
fn syntax_errors_in_files_are_compile_diagnostics() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_script(&dir, "broken.qs", "let = 3;");

    let mut runtime = Runtime::new(true).unwrap();
    assert_eq!(runtime.run_file(&path), RunStatus::CompileError);

    let diagnostics = runtime.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::CompileError);
    assert!(diagnostics[0].message.contains("expected a variable name"));
}

#[test]
fn runtime_errors_in_files_carry_the_file_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_script(&dir, "crash.qs", "let a = 1;\nundefined_thing");

    let mut runtime = Runtime::new(true).unwrap();
    assert_eq!(runtime.run_file(&path), RunStatus::RuntimeError);

    let diagnostics = runtime.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::RuntimeError);
    assert!(diagnostics[0].message.contains("undefined_thing"));
    assert!(diagnostics[0].message.contains("crash.qs"));
    assert!(diagnostics[0].message.contains("line 2"));
}

#[test]
fn missing_files_are_compile_diagnostics() {
    let mut runtime = Runtime::new(true).unwrap();
    assert_eq!(
        runtime.run_file("/nonexistent/out-of-reach.qs"),
        RunStatus::CompileError
    );
    let diagnostics = runtime.diagnostics();
    assert!(diagnostics[0].message.contains("cannot read"));
}

#[test]
fn statuses_map_to_process_exit_codes() {
    let dir = tempfile::tempdir().unwrap();
    let ok = write_script(&dir, "ok.qs", "1 + 1;");
    let bad = write_script(&dir, "bad.qs", "let;");

    let mut runtime = Runtime::new(true).unwrap();
    assert_eq!(exit_code(runtime.run_file(&ok)), 0);
    assert_eq!(exit_code(runtime.run_file(&bad)), 65);

    let error = runtime.eval("no_such_global").unwrap_err();
    assert_eq!(exit_code(runtime.report(&error)), 70);
}

#[test]
fn collected_diagnostics_serialize_for_json_output() {
    let dir = tempfile::tempdir().unwrap();
    let bad = write_script(&dir, "bad.qs", "let;");

    let mut runtime = Runtime::new(true).unwrap();
    runtime.run_file(&bad);

    let json = diagnostics_json(&runtime.diagnostics());
    assert!(json.starts_with(r#"[{"kind":"compile error""#));
    assert!(json.contains("expected a variable name"));
}

#[test]
fn state_persists_across_files() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_script(&dir, "first.qs", "let shared = 10;");
    let second = write_script(&dir, "second.qs", "shared = shared + 5;");

    let mut runtime = Runtime::new(true).unwrap();
    assert_eq!(runtime.run_file(&first), RunStatus::Success);
    assert_eq!(runtime.run_file(&second), RunStatus::Success);
    assert_eq!(runtime.vm().get_global("shared"), Some(Value::Num(15.0)));
}
