//! Host Embedding Integration Tests
//!
//! Drives the embedding surface the way a host application would:
//! register a native vector class and module functions, let scripts
//! compute with them, then read the results back out. Crosses the
//! native_bridge, interpreter, memory_manager, and builtins boundaries.

use core_types::{format_num, ErrorKind, Value};
use interpreter::{Vm, VmConfig};
use memory_manager::Payload;
use native_bridge::{ClassDecl, NativeCall, NativeError, Operator};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Vec2 {
    x: f64,
    y: f64,
}

fn vec2_allocate(_call: &mut NativeCall<'_>) -> Result<Payload, NativeError> {
    Ok(Payload::new(Vec2 { x: 0.0, y: 0.0 }))
}

fn vec2_init(call: &mut NativeCall<'_>) -> Result<(), NativeError> {
    let x = call.slot_num(1)?;
    let y = call.slot_num(2)?;
    let vec = call.payload_mut::<Vec2>()?;
    vec.x = x;
    vec.y = y;
    Ok(())
}

fn vec2_add(call: &mut NativeCall<'_>) -> Result<(), NativeError> {
    let rhs = *call.slot_payload::<Vec2>(1)?;
    let lhs = *call.payload::<Vec2>()?;
    let class = call.receiver_class().expect("operator has a receiver");
    let sum = match call.instantiate(
        class,
        &[Value::Num(lhs.x + rhs.x), Value::Num(lhs.y + rhs.y)],
    ) {
        Ok(value) => value,
        Err(error) => return Err(call.rethrow(error)),
    };
    call.set_return(sum);
    Ok(())
}

fn vec2_scale(call: &mut NativeCall<'_>) -> Result<(), NativeError> {
    let factor = call.slot_num(1)?;
    let vec = *call.payload::<Vec2>()?;
    let class = call.receiver_class().expect("method has a receiver");
    let scaled = match call.instantiate(
        class,
        &[Value::Num(vec.x * factor), Value::Num(vec.y * factor)],
    ) {
        Ok(value) => value,
        Err(error) => return Err(call.rethrow(error)),
    };
    call.set_return(scaled);
    Ok(())
}

fn vec2_stringify(call: &mut NativeCall<'_>) -> Result<(), NativeError> {
    let vec = *call.payload::<Vec2>()?;
    call.set_str(0, format!("[{}, {}]", format_num(vec.x), format_num(vec.y)))?;
    Ok(())
}

fn get_x(payload: &Payload) -> Option<Value> {
    payload.downcast_ref::<Vec2>().map(|v| Value::Num(v.x))
}

fn get_y(payload: &Payload) -> Option<Value> {
    payload.downcast_ref::<Vec2>().map(|v| Value::Num(v.y))
}

fn set_x(payload: &mut Payload, value: &Value) -> bool {
    match (payload.downcast_mut::<Vec2>(), value.as_num()) {
        (Some(v), Some(n)) => {
            v.x = n;
            true
        }
        _ => false,
    }
}

fn set_y(payload: &mut Payload, value: &Value) -> bool {
    match (payload.downcast_mut::<Vec2>(), value.as_num()) {
        (Some(v), Some(n)) => {
            v.y = n;
            true
        }
        _ => false,
    }
}

fn hypot(call: &mut NativeCall<'_>) -> Result<(), NativeError> {
    let a = call.slot_num(1)?;
    let b = call.slot_num(2)?;
    call.set_num(0, a.hypot(b))?;
    Ok(())
}

/// Helper building a VM with the core module and a geometry module.
fn geometry_vm() -> Vm {
    let mut vm = Vm::new();
    builtins::install(&mut vm).expect("core module installs");

    let module = vm.new_module("geom").expect("module creates");
    let class = vm
        .register_class(
            module,
            ClassDecl::new("Vec2", vec2_allocate)
                .init(2, vec2_init)
                .operator(Operator::Add, vec2_add)
                .method("scale", 1, vec2_scale)
                .stringify(vec2_stringify)
                .field("x", get_x, Some(set_x))
                .field("y", get_y, Some(set_y)),
        )
        .expect("class registers");
    vm.add_function(module, "hypot", 2, hypot)
        .expect("function registers");
    vm.publish_module(module).expect("module publishes");
    vm.set_global("Vec2", Value::Class(class));
    vm
}

/// Test: the canonical embedding scenario, script math on host vectors
#[test]
fn test_embedding_vector_addition() {
    let mut vm = geometry_vm();
    vm.eval("let v = Vec2(1, 2) + Vec2(3, 4);")
        .expect("script failed");

    let v = vm.get_global("v").expect("v is defined");
    assert_eq!(
        vm.get_property(&v, "x").expect("x reads"),
        Value::Num(4.0)
    );
    assert_eq!(
        vm.get_property(&v, "y").expect("y reads"),
        Value::Num(6.0)
    );
    assert_eq!(vm.stringify(&v).expect("stringify"), "[4, 6]");
}

/// Test: scripts and the host see the same fields
#[test]
fn test_embedding_field_round_trip() {
    let mut vm = geometry_vm();
    vm.eval("let v = Vec2(7, 8); v.x = v.y + 1;")
        .expect("script failed");

    let v = vm.get_global("v").expect("v is defined");
    assert_eq!(
        vm.get_property(&v, "x").expect("x reads"),
        Value::Num(9.0)
    );

    vm.set_property(&v, "y", Value::Num(0.5)).expect("y writes");
    assert_eq!(vm.eval("v.y").expect("script read failed"), Value::Num(0.5));
}

/// Test: method calls dispatch from script syntax to native code
#[test]
fn test_embedding_method_invocation() {
    let mut vm = geometry_vm();
    let result = vm
        .eval("let v = Vec2(3, 4).scale(10); v.x + v.y")
        .expect("script failed");
    assert_eq!(result, Value::Num(70.0));
}

/// Test: module functions resolve through the module value
#[test]
fn test_embedding_module_functions() {
    let mut vm = geometry_vm();
    assert_eq!(
        vm.eval("geom.hypot(3, 4)").expect("script failed"),
        Value::Num(5.0)
    );
    assert_eq!(
        vm.eval("geom.Vec2(2, 3).y").expect("script failed"),
        Value::Num(3.0)
    );
}

/// Test: native instances flow through the core print builtin
#[test]
fn test_embedding_print_uses_stringify() {
    let printed = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let sink = std::rc::Rc::clone(&printed);

    let mut config = VmConfig::default();
    config.print = Box::new(move |text| sink.borrow_mut().push(text.to_string()));
    let mut vm = Vm::with_config(config);
    builtins::install(&mut vm).expect("core module installs");

    let module = vm.new_module("geom").expect("module creates");
    let class = vm
        .register_class(
            module,
            ClassDecl::new("Vec2", vec2_allocate)
                .init(2, vec2_init)
                .operator(Operator::Add, vec2_add)
                .stringify(vec2_stringify),
        )
        .expect("class registers");
    vm.publish_module(module).expect("module publishes");
    vm.set_global("Vec2", Value::Class(class));

    vm.eval("print(Vec2(1, 2) + Vec2(3, 4))").expect("script failed");
    assert_eq!(printed.borrow().as_slice(), ["[4, 6]"]);
}

/// Test: str and type_name builtins understand native instances
#[test]
fn test_embedding_core_builtins_on_instances() {
    let mut vm = geometry_vm();
    assert_eq!(
        vm.eval("str(Vec2(4, 6))").expect("script failed"),
        Value::str("[4, 6]")
    );
    assert_eq!(
        vm.eval("type_name(Vec2(0, 0))").expect("script failed"),
        Value::str("instance")
    );
}

/// Test: the host can drive construction and calls without any script
#[test]
fn test_embedding_scriptless_host() {
    let mut vm = geometry_vm();
    let class = match vm.get_global("Vec2") {
        Some(Value::Class(class)) => class,
        other => panic!("expected a class, got {other:?}"),
    };

    let v = vm
        .instantiate(class, &[Value::Num(1.5), Value::Num(2.5)])
        .expect("instantiation failed");
    let scaled = vm
        .invoke_method(v, "scale", &[Value::Num(2.0)])
        .expect("invocation failed");
    assert_eq!(
        vm.get_property(&scaled, "x").expect("x reads"),
        Value::Num(3.0)
    );
    assert_eq!(vm.stringify(&scaled).expect("stringify"), "[3, 5]");
}

/// Test: wrong operand types surface as script-visible errors
#[test]
fn test_embedding_error_paths() {
    let mut vm = geometry_vm();

    let error = vm.eval("Vec2(1, 2) + 3").expect_err("should fail");
    assert_eq!(error.kind, ErrorKind::Type);

    let error = vm.eval("Vec2(1, 2).z").expect_err("should fail");
    assert_eq!(error.kind, ErrorKind::Name);
    assert!(error.message.contains("undefined property 'z' on Vec2"));

    let error = vm.eval("Vec2(1)").expect_err("should fail");
    assert_eq!(error.kind, ErrorKind::Arity);
    assert!(error.message.contains("Vec2.init expects 2 arguments, got 1"));
}

/// Test: errors inside a loop unwind without corrupting later runs
#[test]
fn test_embedding_recovers_mid_loop() {
    let mut vm = geometry_vm();
    let source = "
        let i = 0;
        while (i < 10) {
            let v = Vec2(i, i).scale(2);
            i = i + v.z;
        }
    ";
    let error = vm.eval(source).expect_err("should fail");
    assert_eq!(error.kind, ErrorKind::Name);

    assert_eq!(
        vm.eval("Vec2(2, 2).scale(3).x").expect("script failed"),
        Value::Num(6.0)
    );
}
