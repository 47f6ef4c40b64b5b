//! Memory Management Integration Tests
//!
//! Exercises the garbage collector across component boundaries: scripts
//! allocate native instances through the interpreter, the host roots
//! some of them through the handle table, and finalizers observe every
//! reclamation exactly once.

use std::cell::Cell;
use std::cell::RefCell;
use std::rc::Rc;

use core_types::{Diagnostic, DiagnosticKind, ErrorKind, RunStatus, Value};
use interpreter::{Vm, VmConfig};
use memory_manager::Payload;
use native_bridge::{ClassDecl, NativeCall, NativeError};

thread_local! {
    static FINALIZED: Cell<usize> = const { Cell::new(0) };
}

fn finalized() -> usize {
    FINALIZED.with(Cell::get)
}

#[derive(Debug)]
struct Resource;

fn resource_allocate(_call: &mut NativeCall<'_>) -> Result<Payload, NativeError> {
    Ok(Payload::with_size(Resource, 1024))
}

fn resource_finalize(_payload: Payload) {
    FINALIZED.with(|count| count.set(count.get() + 1));
}

/// Helper wiring a Resource class into a VM built from `config`.
///
/// Resets the thread's finalizer count, so each test starts from zero.
fn resource_vm(config: VmConfig) -> Vm {
    FINALIZED.with(|count| count.set(0));
    let mut vm = Vm::with_config(config);
    let module = vm.new_module("mem").expect("module creates");
    let class = vm
        .register_class(
            module,
            ClassDecl::new("Resource", resource_allocate).finalize(resource_finalize),
        )
        .expect("class registers");
    vm.publish_module(module).expect("module publishes");
    vm.set_global("Resource", Value::Class(class));
    vm
}

fn quiet_config() -> VmConfig {
    let mut config = VmConfig::default();
    config.report = Box::new(|_| {});
    config
}

/// Test: a host handle keeps a script-created instance alive
#[test]
fn test_memory_handles_root_script_instances() {
    let mut vm = resource_vm(quiet_config());
    vm.eval("let keep = Resource();").expect("script failed");

    let keep = vm.get_global("keep").expect("keep is defined");
    let handle = vm.acquire(keep);
    vm.eval("keep = null;").expect("script failed");

    assert_eq!(vm.collect_garbage(), 0, "the handle should root it");
    assert_eq!(finalized(), 0);

    vm.release(handle);
    assert_eq!(vm.collect_garbage(), 1);
    assert_eq!(finalized(), 1);
    assert_eq!(vm.heap_bytes(), 0);
}

/// Test: a scoped root holds its value alive and releases on drop
#[test]
fn test_memory_scoped_roots() {
    let mut vm = resource_vm(quiet_config());
    vm.eval("let r = Resource();").expect("script failed");
    let value = vm.get_global("r").expect("r is defined");
    vm.eval("r = null;").expect("script failed");

    {
        let root = vm.scoped(value);
        assert!(matches!(root.value(), Value::Instance(_)));
    }
    assert_eq!(vm.live_handles(), 0, "the scope released its root");
    assert_eq!(vm.collect_garbage(), 1);
    assert_eq!(finalized(), 1);
}

/// Test: loop garbage is reclaimed by threshold collections mid-script
#[test]
fn test_memory_threshold_collections_during_loops() {
    let mut config = quiet_config();
    config.gc_threshold = 8 * 1024;
    let mut vm = resource_vm(config);

    vm.eval("let i = 0; while (i < 32) { let t = Resource(); i = i + 1; }")
        .expect("script failed");

    assert!(
        vm.collections() >= 2,
        "expected repeated collections, got {}",
        vm.collections()
    );
    assert!(
        vm.live_instances() < 32,
        "loop garbage should have been reclaimed"
    );

    vm.collect_garbage();
    assert_eq!(vm.live_instances(), 1, "the last t stays rooted as a global");
    assert_eq!(finalized(), 31);
}

/// Test: allocation past the configured cap fails the script, not the VM
#[test]
fn test_memory_heap_cap_reports_a_runtime_error() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    let mut config = VmConfig::default();
    config.report = Box::new(move |diagnostic: Diagnostic| sink.borrow_mut().push(diagnostic));
    config.max_heap_bytes = 4 * 1024;
    let mut vm = resource_vm(config);

    let source = "
        let a = Resource();
        let b = Resource();
        let c = Resource();
        let d = Resource();
        let e = Resource();
    ";
    assert_eq!(vm.run_source("fill.qs", source), RunStatus::RuntimeError);

    let log = log.borrow();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].kind, DiagnosticKind::RuntimeError);
    assert!(log[0].message.contains("heap limit of 4096 bytes reached"));
    drop(log);

    assert_eq!(vm.live_instances(), 4);
    let error = vm.eval("Resource()").expect_err("still at the cap");
    assert_eq!(error.kind, ErrorKind::Memory);
}

/// Test: freeing garbage makes room under the cap again
#[test]
fn test_memory_cap_recovers_after_collection() {
    let mut config = quiet_config();
    config.max_heap_bytes = 2 * 1024;
    let mut vm = resource_vm(config);

    vm.eval("let a = Resource(); let b = Resource();")
        .expect("script failed");
    let error = vm.eval("Resource()").expect_err("should be at the cap");
    assert_eq!(error.kind, ErrorKind::Memory);

    vm.eval("a = null; b = null;").expect("script failed");
    assert_eq!(vm.collect_garbage(), 2);
    vm.eval("let c = Resource();").expect("room should be free again");
    assert_eq!(vm.live_instances(), 1);
}

/// Test: teardown finalizes survivors exactly once
#[test]
fn test_memory_teardown_finalizes_survivors() {
    {
        let mut vm = resource_vm(quiet_config());
        vm.eval("let a = Resource(); let b = Resource(); let junk = Resource(); junk = null;")
            .expect("script failed");
        vm.collect_garbage();
        assert_eq!(finalized(), 1, "only the unrooted instance is collected");
    }
    assert_eq!(finalized(), 3, "teardown finalizes the rest, once each");
}

/// Test: dropping a VM with live handles reports a resource leak
#[test]
fn test_memory_leaked_handles_are_reported() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    let mut config = VmConfig::default();
    config.report = Box::new(move |diagnostic: Diagnostic| sink.borrow_mut().push(diagnostic));

    {
        let mut vm = resource_vm(config);
        vm.eval("let r = Resource();").expect("script failed");
        let value = vm.get_global("r").expect("r is defined");
        let _leaked = vm.acquire(value);
    }

    let log = log.borrow();
    assert!(log
        .iter()
        .any(|d| d.kind == DiagnosticKind::ResourceLeak
            && d.message.contains("1 handles still live")));
    assert_eq!(finalized(), 1, "leak reporting does not skip finalizers");
}
