//! End-to-End CLI Integration Tests
//!
//! Tests the complete runtime through the quill_cli Runtime API: script
//! files on disk, the core module, diagnostics, and the exit codes the
//! binary derives from them. This is the highest level integration
//! suite, source file to host-visible outcome.

use core_types::{DiagnosticKind, RunStatus, Value};
use quill_cli::runtime::{diagnostics_json, exit_code, EXIT_COMPILE, EXIT_OK, EXIT_RUNTIME};
use quill_cli::Runtime;

/// Helper writing a script into a temp directory and returning its path.
fn write_script(dir: &tempfile::TempDir, name: &str, source: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, source).expect("script is writable");
    path.to_string_lossy().into_owned()
}

/// Test: a script file runs with the core module in scope
#[test]
fn test_e2e_script_file_runs() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = write_script(
        &dir,
        "sum.qs",
        "let total = 0;\nlet i = 1;\nwhile (i <= 10) { total = total + i; i = i + 1; }\nlet label = str(total);",
    );

    let mut runtime = Runtime::new(true).expect("runtime builds");
    assert_eq!(runtime.run_file(&path), RunStatus::Success);
    assert_eq!(runtime.vm().get_global("total"), Some(Value::Num(55.0)));
    assert_eq!(runtime.vm().get_global("label"), Some(Value::str("55")));
    assert!(runtime.diagnostics().is_empty());
}

/// Test: globals written by one file are visible to the next
#[test]
fn test_e2e_state_flows_between_files() {
    let dir = tempfile::tempdir().expect("temp dir");
    let first = write_script(&dir, "config.qs", "let limit = 8;");
    let second = write_script(&dir, "use.qs", "let doubled = limit * 2;");

    let mut runtime = Runtime::new(true).expect("runtime builds");
    assert_eq!(runtime.run_file(&first), RunStatus::Success);
    assert_eq!(runtime.run_file(&second), RunStatus::Success);
    assert_eq!(runtime.vm().get_global("doubled"), Some(Value::Num(16.0)));
}

/// Test: each failure class maps to its documented exit code
#[test]
fn test_e2e_statuses_become_exit_codes() {
    let dir = tempfile::tempdir().expect("temp dir");
    let ok = write_script(&dir, "ok.qs", "1 + 1;");
    let broken = write_script(&dir, "broken.qs", "while (");
    let crashing = write_script(&dir, "crashing.qs", "missing_fn();");

    let mut runtime = Runtime::new(true).expect("runtime builds");
    assert_eq!(exit_code(runtime.run_file(&ok)), EXIT_OK);
    assert_eq!(exit_code(runtime.run_file(&broken)), EXIT_COMPILE);
    assert_eq!(exit_code(runtime.run_file(&crashing)), EXIT_RUNTIME);
}

/// Test: runtime failures name the script file in the diagnostic
#[test]
fn test_e2e_diagnostics_name_the_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = write_script(&dir, "fail.qs", "let a = 1;\nlet b = a + oops;");

    let mut runtime = Runtime::new(true).expect("runtime builds");
    assert_eq!(runtime.run_file(&path), RunStatus::RuntimeError);

    let diagnostics = runtime.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::RuntimeError);
    assert!(diagnostics[0].message.contains("undefined variable 'oops'"));
    assert!(diagnostics[0].message.contains("fail.qs at line 2"));
}

/// Test: a missing script is a compile-class diagnostic, not a panic
#[test]
fn test_e2e_missing_file() {
    let mut runtime = Runtime::new(true).expect("runtime builds");
    let status = runtime.run_file("/no/such/place/ghost.qs");
    assert_eq!(status, RunStatus::CompileError);

    let diagnostics = runtime.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::CompileError);
    assert!(diagnostics[0].message.contains("cannot read"));
}

/// Test: collected diagnostics serialize for --json output
#[test]
fn test_e2e_diagnostics_as_json() {
    let dir = tempfile::tempdir().expect("temp dir");
    let broken = write_script(&dir, "broken.qs", "let 9 = x;");

    let mut runtime = Runtime::new(true).expect("runtime builds");
    assert_eq!(runtime.run_file(&broken), RunStatus::CompileError);

    let json = diagnostics_json(&runtime.diagnostics());
    assert!(json.starts_with("[{"));
    assert!(json.contains(r#""kind":"compile error""#));
}

/// Test: eval snippets behave like the --eval flag
#[test]
fn test_e2e_eval_snippet() {
    let mut runtime = Runtime::new(true).expect("runtime builds");
    let value = runtime.eval("str(2 + 2)").expect("snippet failed");
    assert_eq!(value, Value::str("4"));

    let error = runtime.eval("nope").expect_err("should fail");
    assert_eq!(exit_code(runtime.report(&error)), EXIT_RUNTIME);
    assert_eq!(runtime.diagnostics().len(), 1);
}

/// Test: core builtins are live in CLI-built VMs
#[test]
fn test_e2e_core_module_is_installed() {
    let mut runtime = Runtime::new(true).expect("runtime builds");

    assert_eq!(
        runtime.eval("type_name(true)").expect("snippet failed"),
        Value::str("bool")
    );
    let clock = runtime.eval("clock()").expect("snippet failed");
    match clock {
        Value::Num(seconds) => assert!(seconds > 1.0e9, "clock reads the epoch"),
        other => panic!("expected a number, got {other:?}"),
    }
    assert_eq!(
        runtime.eval("core.str(null)").expect("snippet failed"),
        Value::str("null")
    );
}

/// Test: a bad extension library is reported and fails the launch
#[test]
fn test_e2e_extension_failure_is_reported() {
    let dir = tempfile::tempdir().expect("temp dir");
    let not_a_library = write_script(&dir, "libnotreal.so", "this is not a shared object");

    let mut runtime = Runtime::new(true).expect("runtime builds");
    assert!(runtime.load_extension(&not_a_library).is_err());

    let diagnostics = runtime.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::Extension);
    assert!(diagnostics[0].message.contains("libnotreal"));
}
