//! Full Pipeline Integration Tests
//!
//! Tests the complete flow: source -> parser -> bytecode -> VM -> result.
//! Every test here crosses the parser, bytecode_system, and interpreter
//! component boundaries in one step.

use core_types::{ErrorKind, RunStatus, Value};
use interpreter::Vm;

/// Helper to evaluate Quill source in a fresh VM.
fn run(source: &str) -> Value {
    Vm::new().eval(source).expect("evaluation failed")
}

/// Test: a number literal flows through unchanged
#[test]
fn test_pipeline_number() {
    assert_eq!(run("42"), Value::Num(42.0));
}

/// Test: arithmetic respects precedence and parentheses
#[test]
fn test_pipeline_arithmetic() {
    assert_eq!(run("2 + 3 * 4"), Value::Num(14.0));
    assert_eq!(run("(2 + 3) * 4"), Value::Num(20.0));
    assert_eq!(run("(10 + 20) * 2 - 18"), Value::Num(42.0));
}

/// Test: remainder and unary negation
#[test]
fn test_pipeline_remainder_and_negation() {
    assert_eq!(run("17 % 5"), Value::Num(2.0));
    assert_eq!(run("-(3 + 4)"), Value::Num(-7.0));
}

/// Test: numbers keep IEEE division semantics
#[test]
fn test_pipeline_float_division() {
    assert_eq!(run("7 / 2"), Value::Num(3.5));
    assert_eq!(run("1 / 0"), Value::Num(f64::INFINITY));
}

/// Test: booleans and null survive the trip
#[test]
fn test_pipeline_literals() {
    assert_eq!(run("true"), Value::Bool(true));
    assert_eq!(run("false"), Value::Bool(false));
    assert_eq!(run("null"), Value::Null);
}

/// Test: variable declaration and use
#[test]
fn test_pipeline_variables() {
    assert_eq!(run("let x = 50; x"), Value::Num(50.0));
    assert_eq!(run("let a = 10; let b = 20; a + b"), Value::Num(30.0));
}

/// Test: assignment updates an existing global
#[test]
fn test_pipeline_assignment() {
    assert_eq!(run("let x = 1; x = x + 9; x"), Value::Num(10.0));
}

/// Test: comparison operators produce booleans
#[test]
fn test_pipeline_comparisons() {
    assert_eq!(run("5 < 10"), Value::Bool(true));
    assert_eq!(run("5 >= 10"), Value::Bool(false));
    assert_eq!(run("3 <= 3"), Value::Bool(true));
}

/// Test: equality covers numbers, strings, and null
#[test]
fn test_pipeline_equality() {
    assert_eq!(run("42 == 42"), Value::Bool(true));
    assert_eq!(run("\"a\" == \"a\""), Value::Bool(true));
    assert_eq!(run("null != null"), Value::Bool(false));
    assert_eq!(run("1 == \"1\""), Value::Bool(false));
}

/// Test: string concatenation with plus
#[test]
fn test_pipeline_string_concat() {
    assert_eq!(run("\"quill\" + \"-\" + \"vm\""), Value::str("quill-vm"));
}

/// Test: if statements pick the right branch
#[test]
fn test_pipeline_branching() {
    let source = "let r = 0; if (2 > 1) { r = 1; } else { r = 2; } r";
    assert_eq!(run(source), Value::Num(1.0));

    let source = "let r = 0; if (false) { r = 1; } else { r = 2; } r";
    assert_eq!(run(source), Value::Num(2.0));
}

/// Test: while loops iterate until the condition fails
#[test]
fn test_pipeline_loops() {
    let source = "let n = 1; let i = 0; while (i < 6) { n = n * 2; i = i + 1; } n";
    assert_eq!(run(source), Value::Num(64.0));
}

/// Test: empty programs evaluate to null
#[test]
fn test_pipeline_empty_program() {
    assert_eq!(run(""), Value::Null);
}

/// Test: the final expression statement is the result
#[test]
fn test_pipeline_last_expression_wins() {
    assert_eq!(run("1; 2; 3"), Value::Num(3.0));
    assert_eq!(run("let x = 9;"), Value::Null);
}

/// Test: globals persist across eval calls on one VM
#[test]
fn test_pipeline_state_persists() {
    let mut vm = Vm::new();
    vm.eval("let total = 40;").expect("first eval failed");
    assert_eq!(vm.eval("total + 2").expect("second eval failed"), Value::Num(42.0));
}

/// Test: type mismatches become runtime type errors
#[test]
fn test_pipeline_type_errors() {
    let error = Vm::new().eval("1 + \"one\"").expect_err("should fail");
    assert_eq!(error.kind, ErrorKind::Type);
}

/// Test: unknown variables become runtime name errors
#[test]
fn test_pipeline_name_errors() {
    let error = Vm::new().eval("phantom").expect_err("should fail");
    assert_eq!(error.kind, ErrorKind::Name);
    assert!(error.message.contains("undefined variable 'phantom'"));
}

/// Test: run_source maps the three outcomes onto statuses
#[test]
fn test_pipeline_run_statuses() {
    let mut vm = Vm::new();
    assert_eq!(vm.run_source("ok.qs", "let fine = 1;"), RunStatus::Success);
    assert_eq!(vm.run_source("bad.qs", "let 5 = x;"), RunStatus::CompileError);
    assert_eq!(vm.run_source("boom.qs", "ghost"), RunStatus::RuntimeError);
}

/// Test: a failed run leaves the VM usable for the next one
#[test]
fn test_pipeline_recovers_after_errors() {
    let mut vm = Vm::new();
    assert_eq!(vm.run_source("boom.qs", "ghost"), RunStatus::RuntimeError);
    assert_eq!(vm.eval("2 + 2").expect("evaluation failed"), Value::Num(4.0));
}
