//! The Quill virtual machine
//!
//! [`Vm`] owns every piece of execution state: globals, the operand and
//! frame stacks, the slot stack, the instance heap, the handle table,
//! the class and module registries, and the extension loader. Hosts
//! configure it with a [`VmConfig`] and drive it through `run_source`,
//! `run_file`, and `eval`.

use std::collections::HashMap;
use std::path::Path;

use core_types::{
    ClassId, Diagnostic, DiagnosticKind, ErrorKind, FnId, InstanceId, ModuleId, RunStatus,
    ScriptError, ScriptResult, Value,
};
use memory_manager::Heap;
use native_bridge::{
    ClassDecl, ClassRegistry, ExtensionError, ExtensionLoader, Handle, HandleTable, ModuleRegistry,
    NativeFn, NativeImpl, RegistryError, ScopedRoot, SlotStack, VmServices,
};

use crate::call_frame::CallFrame;

/// Default allocated-byte threshold that triggers a collection.
pub const DEFAULT_GC_THRESHOLD: usize = 1 << 20;

/// Default bound on native call nesting and frame depth.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 64;

/// Host configuration for a [`Vm`].
///
/// ```
/// use interpreter::{Vm, VmConfig};
///
/// let mut config = VmConfig::default();
/// config.max_call_depth = 16;
/// let vm = Vm::with_config(config);
/// assert_eq!(vm.live_handles(), 0);
/// ```
pub struct VmConfig {
    /// Destination for script output. Called once per `print`, without a
    /// trailing newline. Defaults to stdout.
    pub print: Box<dyn FnMut(&str)>,
    /// Destination for diagnostics. Defaults to stderr, as
    /// `quill: <kind>: <message>`.
    pub report: Box<dyn FnMut(Diagnostic)>,
    /// Allocated-byte threshold that triggers a collection between
    /// instructions.
    pub gc_threshold: usize,
    /// Hard cap on heap bytes; allocation past it is a runtime error.
    pub max_heap_bytes: usize,
    /// Bound on native call nesting and frame depth.
    pub max_call_depth: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            print: Box::new(|text| println!("{text}")),
            report: Box::new(|diagnostic| eprintln!("quill: {diagnostic}")),
            gc_threshold: DEFAULT_GC_THRESHOLD,
            max_heap_bytes: usize::MAX,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

/// An embeddable Quill virtual machine.
///
/// The VM is single-threaded; values hold `Rc` strings, so it is
/// `!Send` by construction.
pub struct Vm {
    pub(crate) globals: HashMap<String, Value>,
    pub(crate) operands: Vec<Value>,
    pub(crate) frames: Vec<CallFrame>,
    pub(crate) slots: SlotStack,
    pub(crate) heap: Heap,
    pub(crate) handles: HandleTable,
    pub(crate) classes: ClassRegistry,
    pub(crate) modules: ModuleRegistry,
    pub(crate) pending: Option<ScriptError>,
    pub(crate) native_depth: usize,
    pub(crate) print: Box<dyn FnMut(&str)>,
    pub(crate) report: Box<dyn FnMut(Diagnostic)>,
    pub(crate) gc_threshold: usize,
    pub(crate) next_gc: usize,
    pub(crate) max_heap_bytes: usize,
    pub(crate) max_call_depth: usize,
    collections: usize,
    /// Declared last: extension libraries must stay mapped until every
    /// registry holding their callbacks has been torn down.
    loader: ExtensionLoader,
}

impl Vm {
    /// Create a VM with the default configuration.
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    /// Create a VM with the given configuration.
    pub fn with_config(config: VmConfig) -> Self {
        Self {
            globals: HashMap::new(),
            operands: Vec::with_capacity(64),
            frames: Vec::new(),
            slots: SlotStack::new(),
            heap: Heap::new(),
            handles: HandleTable::new(),
            classes: ClassRegistry::new(),
            modules: ModuleRegistry::new(),
            pending: None,
            native_depth: 0,
            print: config.print,
            report: config.report,
            gc_threshold: config.gc_threshold,
            next_gc: config.gc_threshold,
            max_heap_bytes: config.max_heap_bytes,
            max_call_depth: config.max_call_depth,
            collections: 0,
            loader: ExtensionLoader::new(),
        }
    }

    /// Compile and run a source string.
    ///
    /// Errors are routed to the report callback; the status tells an
    /// embedder which phase failed.
    pub fn run_source(&mut self, name: &str, source: &str) -> RunStatus {
        let chunk = match parser::compile(name, source) {
            Ok(chunk) => chunk,
            Err(error) => {
                self.report_error(&error);
                return RunStatus::CompileError;
            }
        };
        match self.execute(chunk) {
            Ok(_) => RunStatus::Success,
            Err(error) => {
                self.report_error(&error);
                RunStatus::RuntimeError
            }
        }
    }

    /// Read and run a script file.
    ///
    /// An unreadable file reports a compile-class diagnostic.
    pub fn run_file(&mut self, path: impl AsRef<Path>) -> RunStatus {
        let path = path.as_ref();
        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(io) => {
                (self.report)(Diagnostic::new(
                    DiagnosticKind::CompileError,
                    format!("cannot read {}: {io}", path.display()),
                ));
                return RunStatus::CompileError;
            }
        };
        self.run_source(&path.display().to_string(), &source)
    }

    /// Compile and run a source string, returning the value of its
    /// final expression statement.
    ///
    /// This is the embedding and REPL entry point; errors come back to
    /// the caller instead of the report callback.
    pub fn eval(&mut self, source: &str) -> ScriptResult<Value> {
        let chunk = parser::compile("<eval>", source)?;
        self.execute(chunk)
    }

    // ---- Registration ----

    /// Create a new building module.
    pub fn new_module(&mut self, name: &str) -> Result<ModuleId, RegistryError> {
        self.modules.create(name)
    }

    /// Register a native function as a module member.
    pub fn add_function(
        &mut self,
        module: ModuleId,
        name: &str,
        arity: u8,
        imp: NativeFn,
    ) -> Result<FnId, RegistryError> {
        self.modules
            .add_function(module, name, arity, NativeImpl::Static(imp))
    }

    /// Register a native class as a module member.
    ///
    /// The declaration is registered and the class value added to the
    /// module in one step; on any failure nothing is registered.
    pub fn register_class(
        &mut self,
        module: ModuleId,
        decl: ClassDecl,
    ) -> Result<ClassId, RegistryError> {
        self.modules.check_member_free(module, decl.name())?;
        let name = decl.name().to_string();
        let class = self.classes.register(decl, module)?;
        self.modules.add_member(module, &name, Value::Class(class))?;
        Ok(class)
    }

    /// Add a plain value as a module member.
    pub fn add_value(
        &mut self,
        module: ModuleId,
        name: &str,
        value: Value,
    ) -> Result<(), RegistryError> {
        self.modules.add_member(module, name, value)
    }

    /// Freeze a module and make it visible to scripts.
    pub fn publish_module(&mut self, module: ModuleId) -> Result<(), RegistryError> {
        self.modules.publish(module)
    }

    // ---- Globals ----

    /// Read a global variable.
    pub fn get_global(&self, name: &str) -> Option<Value> {
        self.globals.get(name).cloned()
    }

    /// Define or overwrite a global variable.
    pub fn set_global(&mut self, name: impl Into<String>, value: Value) {
        self.globals.insert(name.into(), value);
    }

    // ---- Handles ----

    /// Root a value for the host.
    pub fn acquire(&mut self, value: Value) -> Handle {
        self.handles.acquire(value)
    }

    /// Release a handle, consuming the ownership token.
    pub fn release(&mut self, handle: Handle) {
        self.handles.release(handle);
    }

    /// Read the value a handle roots.
    pub fn handle_value(&self, handle: &Handle) -> Option<&Value> {
        self.handles.get(handle)
    }

    /// Root a value for the duration of a scope.
    ///
    /// The root exclusively borrows the VM, so it suits inspection
    /// between operations; use [`Vm::acquire`] for roots that must
    /// survive across script execution.
    pub fn scoped(&mut self, value: Value) -> ScopedRoot<'_> {
        ScopedRoot::new(&mut self.handles, value)
    }

    // ---- Host calls into script values ----

    /// Construct an instance of a registered class.
    pub fn instantiate(&mut self, class: ClassId, args: &[Value]) -> ScriptResult<Value> {
        self.services().instantiate(class, args)
    }

    /// Call a registered function.
    pub fn call_function(&mut self, function: FnId, args: &[Value]) -> ScriptResult<Value> {
        self.services().call_function(function, args)
    }

    /// Call any callable value.
    pub fn call_value(&mut self, callee: Value, args: &[Value]) -> ScriptResult<Value> {
        self.services().call_value(callee, args)
    }

    /// Invoke a named method on a receiver.
    pub fn invoke_method(
        &mut self,
        receiver: Value,
        name: &str,
        args: &[Value],
    ) -> ScriptResult<Value> {
        self.services().invoke_method(receiver, name, args)
    }

    /// Read a property of a value.
    pub fn get_property(&mut self, receiver: &Value, name: &str) -> ScriptResult<Value> {
        self.services().get_property(receiver, name)
    }

    /// Write a property of a value.
    pub fn set_property(
        &mut self,
        receiver: &Value,
        name: &str,
        value: Value,
    ) -> ScriptResult<()> {
        self.services().set_property(receiver, name, value)
    }

    /// Render a value the way the script language prints it.
    pub fn stringify(&mut self, value: &Value) -> ScriptResult<String> {
        self.services().stringify(value)
    }

    // ---- Extensions ----

    /// Load a dynamic extension library and register its module.
    pub fn load_extension(&mut self, path: impl AsRef<Path>) -> Result<ModuleId, ExtensionError> {
        self.loader.load(path.as_ref(), &mut self.modules)
    }

    // ---- Memory ----

    /// Mark live instances from every root set and sweep the rest.
    ///
    /// Returns the number of instances collected. Roots are globals,
    /// module members, the operand stack, live slot windows, and the
    /// handle table.
    pub fn collect_garbage(&mut self) -> usize {
        self.heap.clear_marks();

        let mut roots = Vec::new();
        mark_instances(self.globals.values(), &mut roots);
        mark_instances(self.modules.values(), &mut roots);
        mark_instances(self.operands.iter(), &mut roots);
        mark_instances(self.slots.live(), &mut roots);
        mark_instances(self.handles.roots(), &mut roots);
        for id in roots {
            self.heap.mark(id);
        }

        let swept = self.heap.sweep();
        let count = swept.len();
        for (class, payload) in swept {
            if let Some(finalize) = self.classes.finalizer(class) {
                finalize(payload);
            }
        }
        self.collections += 1;
        if count > 0 {
            tracing::debug!(target: "quill::gc", collected = count, "collection finished");
        }
        count
    }

    /// Bytes currently attributed to instance payloads.
    pub fn heap_bytes(&self) -> usize {
        self.heap.bytes_allocated()
    }

    /// Number of live instances on the heap.
    pub fn live_instances(&self) -> usize {
        self.heap.len()
    }

    /// Number of live host handles.
    pub fn live_handles(&self) -> usize {
        self.handles.live_count()
    }

    /// Number of collections run so far.
    pub fn collections(&self) -> usize {
        self.collections
    }

    // ---- Internal plumbing ----

    /// Build the service view native callbacks and dispatch run against.
    pub(crate) fn services(&mut self) -> VmServices<'_> {
        VmServices {
            slots: &mut self.slots,
            heap: &mut self.heap,
            handles: &mut self.handles,
            classes: &self.classes,
            modules: &self.modules,
            pending: &mut self.pending,
            out: &mut *self.print,
            report: &mut *self.report,
            depth: &mut self.native_depth,
            max_depth: self.max_call_depth,
            max_heap_bytes: self.max_heap_bytes,
        }
    }

    /// Route a script error to the report callback.
    fn report_error(&mut self, error: &ScriptError) {
        let kind = match error.kind {
            ErrorKind::Syntax => DiagnosticKind::CompileError,
            _ => DiagnosticKind::RuntimeError,
        };
        (self.report)(Diagnostic::new(kind, render_error(error)));
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Vm {
    fn drop(&mut self) {
        let live = self.handles.live_count();
        if live > 0 {
            (self.report)(Diagnostic::new(
                DiagnosticKind::ResourceLeak,
                format!("{live} handles still live at teardown"),
            ));
        }
        // Leaked roots must not keep payloads from their finalizers.
        self.handles.drain();
        for (class, payload) in self.heap.drain() {
            if let Some(finalize) = self.classes.finalizer(class) {
                finalize(payload);
            }
        }
    }
}

fn mark_instances<'a>(values: impl Iterator<Item = &'a Value>, roots: &mut Vec<InstanceId>) {
    for value in values {
        if let Value::Instance(id) = value {
            roots.push(*id);
        }
    }
}

/// Render an error the way `run_source` reports it: message, position,
/// then the trace innermost-first.
pub fn render_error(error: &ScriptError) -> String {
    let mut text = error.message.clone();
    if let Some(position) = error.position {
        text.push_str(&format!(
            " at line {}, column {}",
            position.line, position.column
        ));
    }
    for frame in &error.trace {
        match frame.line {
            Some(line) => text.push_str(&format!("\n  in {} at line {line}", frame.function)),
            None => text.push_str(&format!("\n  in native {}", frame.function)),
        }
    }
    text
}
