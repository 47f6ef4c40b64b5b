//! Parser to Bytecode Integration Tests
//!
//! Tests the integration between the parser and bytecode_system
//! components. Verifies that Quill source code is parsed and compiled
//! into the instruction stream, constant pool, and line table the
//! interpreter executes.

use bytecode_system::{Chunk, Opcode};
use core_types::{ErrorKind, Value};

/// Helper to compile source, panicking on syntax errors.
fn compile(source: &str) -> Chunk {
    parser::compile("<test>", source).expect("compilation failed")
}

/// Test: a number literal compiles to a constant load plus a return
#[test]
fn test_number_literal_to_bytecode() {
    let chunk = compile("42");

    assert!(!chunk.is_empty(), "bytecode should not be empty");
    assert_eq!(chunk.constant(0), Some(&Value::Num(42.0)));

    let has_constant = chunk
        .code
        .iter()
        .any(|op| matches!(op, Opcode::Constant(_)));
    assert!(has_constant, "should have a Constant instruction");
    assert_eq!(chunk.code.last(), Some(&Opcode::Return));
}

/// Test: an addition expression emits an Add with both operands pooled
#[test]
fn test_addition_to_bytecode() {
    let chunk = compile("1 + 2");

    let has_add = chunk.code.iter().any(|op| matches!(op, Opcode::Add));
    assert!(has_add, "should have an Add instruction");
    assert_eq!(chunk.constants.len(), 2);
}

/// Test: a let statement becomes a global definition
#[test]
fn test_let_declaration_to_bytecode() {
    let chunk = compile("let x = 100;");

    let defines_x = chunk
        .code
        .iter()
        .any(|op| matches!(op, Opcode::DefineGlobal(name) if name == "x"));
    assert!(defines_x, "should define the global 'x'");
}

/// Test: property reads and writes carry the property name
#[test]
fn test_property_access_to_bytecode() {
    let chunk = compile("v.x = v.y;");

    let loads_y = chunk
        .code
        .iter()
        .any(|op| matches!(op, Opcode::LoadProperty(name) if name == "y"));
    let stores_x = chunk
        .code
        .iter()
        .any(|op| matches!(op, Opcode::StoreProperty(name) if name == "x"));
    assert!(loads_y, "should load the property 'y'");
    assert!(stores_x, "should store the property 'x'");
}

/// Test: a method call compiles to an Invoke with its argument count
#[test]
fn test_method_call_to_bytecode() {
    let chunk = compile("point.translate(3, 4);");

    let invokes = chunk.code.iter().any(
        |op| matches!(op, Opcode::Invoke(name, argc) if name == "translate" && *argc == 2),
    );
    assert!(invokes, "should invoke 'translate' with 2 arguments");
}

/// Test: a call through a bare callee compiles to Call
#[test]
fn test_function_call_to_bytecode() {
    let chunk = compile("hypot(3, 4)");

    let calls = chunk
        .code
        .iter()
        .any(|op| matches!(op, Opcode::Call(argc) if *argc == 2));
    assert!(calls, "should have a Call with 2 arguments");
}

/// Test: if statements emit a forward conditional jump
#[test]
fn test_if_jumps_forward() {
    let chunk = compile("if (true) { 1; } else { 2; }");

    let forward = chunk.code.iter().enumerate().any(
        |(index, op)| matches!(op, Opcode::JumpIfFalse(target) if *target > index),
    );
    assert!(forward, "the conditional jump should point past the branch");
}

/// Test: while loops emit a backward jump to the condition
#[test]
fn test_while_jumps_backward() {
    let chunk = compile("let i = 0; while (i < 3) { i = i + 1; }");

    let backward = chunk
        .code
        .iter()
        .enumerate()
        .any(|(index, op)| matches!(op, Opcode::Jump(target) if *target < index));
    assert!(backward, "the loop should jump back to its condition");
}

/// Test: the line table attributes instructions to their source lines
#[test]
fn test_line_table_follows_source() {
    let chunk = compile("let a = 1;\nlet b = 2;\na + b");

    assert_eq!(chunk.line_for(0), 1);
    let last = chunk.len() - 1;
    assert_eq!(chunk.line_for(last), 3);
}

/// Test: the chunk keeps the name given at compile time
#[test]
fn test_chunk_carries_its_name() {
    let chunk = parser::compile("scripts/boot.qs", "1;").expect("compilation failed");
    assert_eq!(chunk.name, "scripts/boot.qs");
}

/// Test: syntax errors surface with kind and position intact
#[test]
fn test_syntax_errors_carry_positions() {
    let error = parser::compile("<test>", "let = 5;").expect_err("should not compile");

    assert_eq!(error.kind, ErrorKind::Syntax);
    let position = error.position.expect("syntax errors carry a position");
    assert_eq!(position.line, 1);
}

/// Test: string literals land in the constant pool
#[test]
fn test_string_literals_are_pooled() {
    let chunk = compile("\"hello\" + \"!\"");

    assert_eq!(chunk.constant(0), Some(&Value::str("hello")));
    assert_eq!(chunk.constant(1), Some(&Value::str("!")));
}
