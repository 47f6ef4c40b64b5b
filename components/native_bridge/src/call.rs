//! Native call machinery
//!
//! [`VmServices`] is the VM-side view of a running context: the slot
//! stack, heap, handle table, and registries, wired together for the
//! duration of one dispatch step. [`NativeCall`] is the host-side view a
//! callback receives: typed slot access, error raising, and reentrant
//! calls back into the VM.
//!
//! Every native invocation follows the same shape: arity and depth are
//! checked, a slot window is pushed with the receiver in slot 0 and the
//! arguments after it, the callback runs, and slot 0 becomes the result.
//! A recorded script error always wins over whatever the callback
//! returned.

use crate::api::{self, ExternNativeFn};
use crate::classes::{AllocateFn, ClassRegistry, MethodId, Operator, PropertyGet, PropertySet};
use crate::error::{HandleFault, NativeError, SlotError};
use crate::handles::{Handle, HandleTable};
use crate::modules::{Module, ModuleRegistry};
use crate::slots::SlotStack;
use core_types::{
    ClassId, Diagnostic, DiagnosticKind, ErrorKind, FnId, InstanceId, ScriptError, ScriptResult,
    TraceFrame, TypeTag, Value,
};
use memory_manager::{Heap, Payload};
use std::any::Any;
use std::rc::Rc;

/// Signature of a statically registered native callback.
///
/// The callback reads its arguments from slots 1 and up, leaves its
/// result in slot 0, and reports failure by raising through the call
/// context before returning `Err`.
pub type NativeFn = fn(&mut NativeCall<'_>) -> Result<(), NativeError>;

/// A native callback implementation, either linked into the host or
/// loaded from an extension library.
#[derive(Debug, Clone, Copy)]
pub enum NativeImpl {
    /// Plain Rust function registered by the embedding host.
    Static(NativeFn),
    /// C ABI function registered by a dynamic extension.
    Extern(ExternNativeFn),
}

/// Mutable view over every VM structure a native call can touch.
///
/// The interpreter assembles one of these around each dispatch step that
/// may enter native code. All fields are borrowed from the owning
/// context, so a `VmServices` is cheap to build and carries no state of
/// its own.
pub struct VmServices<'a> {
    /// Windowed slot stack shared with script execution.
    pub slots: &'a mut SlotStack,
    /// Instance heap.
    pub heap: &'a mut Heap,
    /// Host-held value roots.
    pub handles: &'a mut HandleTable,
    /// Registered native classes.
    pub classes: &'a ClassRegistry,
    /// Registered modules and functions.
    pub modules: &'a ModuleRegistry,
    /// Error recorded by the innermost native callback, if any.
    pub pending: &'a mut Option<ScriptError>,
    /// Destination for script output.
    pub out: &'a mut dyn FnMut(&str),
    /// Destination for host-facing diagnostics.
    pub report: &'a mut dyn FnMut(Diagnostic),
    /// Current native call nesting depth.
    pub depth: &'a mut usize,
    /// Nesting depth at which further native calls are refused.
    pub max_depth: usize,
    /// Heap size at which instantiation is refused.
    pub max_heap_bytes: usize,
}

impl VmServices<'_> {
    /// Reborrow all fields at a shorter lifetime, for handing to a
    /// nested [`NativeCall`] without giving up this view.
    pub fn reborrow(&mut self) -> VmServices<'_> {
        VmServices {
            slots: &mut *self.slots,
            heap: &mut *self.heap,
            handles: &mut *self.handles,
            classes: self.classes,
            modules: self.modules,
            pending: &mut *self.pending,
            out: &mut *self.out,
            report: &mut *self.report,
            depth: &mut *self.depth,
            max_depth: self.max_depth,
            max_heap_bytes: self.max_heap_bytes,
        }
    }

    /// Call a registered module-level function.
    pub fn call_function(&mut self, function: FnId, args: &[Value]) -> ScriptResult<Value> {
        let entry = self.modules.function(function).ok_or_else(|| {
            ScriptError::new(
                ErrorKind::Internal,
                format!("function id {} is not registered", function.0),
            )
        })?;
        self.invoke(&entry.name, entry.arity, entry.imp, None, args)
    }

    /// Call a pooled class method with an explicit receiver.
    pub fn call_method(
        &mut self,
        method: MethodId,
        receiver: Value,
        args: &[Value],
    ) -> ScriptResult<Value> {
        let entry = self.classes.method(method);
        self.invoke(&entry.name, entry.arity, entry.imp, Some(receiver), args)
    }

    /// Call whatever `callee` is: a function or a class constructor.
    pub fn call_value(&mut self, callee: Value, args: &[Value]) -> ScriptResult<Value> {
        match callee {
            Value::Fn(id) => self.call_function(id, args),
            Value::Class(id) => self.instantiate(id, args),
            other => Err(ScriptError::type_error(format!(
                "{} is not callable",
                other.tag().name()
            ))),
        }
    }

    /// Invoke a method by name on a receiver value.
    pub fn invoke_method(
        &mut self,
        receiver: Value,
        name: &str,
        args: &[Value],
    ) -> ScriptResult<Value> {
        if let Value::Instance(id) = receiver {
            let class = self.class_of(id)?;
            let class_name = self.class_name(class);
            let Some(method) = self.classes.resolve_method(class, name) else {
                return Err(ScriptError::name_error(format!(
                    "undefined method '{name}' on {class_name}"
                )));
            };
            return self.call_method(method, receiver, args);
        }
        if let Value::Module(id) = receiver {
            let member = match self.modules.member(id, name) {
                Some(v) => v.clone(),
                None => {
                    let module_name = self.modules.get(id).map(Module::name).unwrap_or("?");
                    return Err(ScriptError::name_error(format!(
                        "module '{module_name}' has no member '{name}'"
                    )));
                }
            };
            return self.call_value(member, args);
        }
        Err(ScriptError::type_error(format!(
            "cannot invoke '{name}' on {}",
            receiver.tag().name()
        )))
    }

    /// Construct an instance of a native class.
    ///
    /// Runs the allocator with a one-slot window holding the new
    /// instance, attaches the payload it returns, then runs the
    /// initializer with the constructor arguments. An allocator failure
    /// discards the shell before its payload exists, so the finalizer
    /// never sees it; an initializer failure leaves the instance for the
    /// next collection.
    pub fn instantiate(&mut self, class: ClassId, args: &[Value]) -> ScriptResult<Value> {
        let info = self.classes.get(class).ok_or_else(|| {
            ScriptError::new(
                ErrorKind::Internal,
                format!("class id {} is not registered", class.0),
            )
        })?;
        let class_name = info.name();
        if self.heap.bytes_allocated() >= self.max_heap_bytes {
            return Err(ScriptError::memory_error(format!(
                "heap limit of {} bytes reached",
                self.max_heap_bytes
            )));
        }

        let shell = self.heap.allocate(class);
        let alloc_name = format!("{class_name}.new");
        let payload = match self.run_allocator(info.allocate_fn(), shell, &alloc_name) {
            Ok(payload) => payload,
            Err(error) => {
                self.heap.discard(shell);
                return Err(error);
            }
        };
        self.heap.attach_payload(shell, payload);

        let instance = Value::Instance(shell);
        match self.classes.resolve_initializer(class) {
            Some(init) => {
                self.call_method(init, instance.clone(), args)?;
            }
            None if !args.is_empty() => {
                return Err(ScriptError::arity_error(format!(
                    "{class_name} takes no constructor arguments, got {}",
                    args.len()
                )));
            }
            None => {}
        }
        Ok(instance)
    }

    /// Read a property of a receiver value.
    pub fn get_property(&mut self, receiver: &Value, name: &str) -> ScriptResult<Value> {
        match receiver {
            Value::Instance(id) => {
                let id = *id;
                let class = self.class_of(id)?;
                let class_name = self.class_name(class);
                let Some(def) = self.classes.resolve_property(class, name) else {
                    return Err(ScriptError::name_error(format!(
                        "undefined property '{name}' on {class_name}"
                    )));
                };
                match def.get {
                    Some(PropertyGet::Field(get)) => {
                        let payload = self.heap.payload(id).ok_or_else(|| {
                            ScriptError::new(
                                ErrorKind::Internal,
                                format!("instance of {class_name} has no payload"),
                            )
                        })?;
                        get(payload).ok_or_else(|| {
                            ScriptError::new(
                                ErrorKind::Internal,
                                format!("accessor for {class_name}.{name} rejected the payload"),
                            )
                        })
                    }
                    Some(PropertyGet::Hook(hook)) => self.invoke(
                        &format!("{class_name}.{name}"),
                        0,
                        NativeImpl::Static(hook),
                        Some(Value::Instance(id)),
                        &[],
                    ),
                    None => Err(ScriptError::type_error(format!(
                        "property '{name}' of {class_name} is write-only"
                    ))),
                }
            }
            Value::Module(id) => {
                let module = self.modules.get(*id).ok_or_else(|| {
                    ScriptError::new(
                        ErrorKind::Internal,
                        format!("module id {} is not registered", id.0),
                    )
                })?;
                match module.member(name) {
                    Some(value) => Ok(value.clone()),
                    None => Err(ScriptError::name_error(format!(
                        "module '{}' has no member '{name}'",
                        module.name()
                    ))),
                }
            }
            other => Err(ScriptError::type_error(format!(
                "{} has no properties",
                other.tag().name()
            ))),
        }
    }

    /// Write a property of a receiver value.
    pub fn set_property(
        &mut self,
        receiver: &Value,
        name: &str,
        value: Value,
    ) -> ScriptResult<()> {
        match receiver {
            Value::Instance(id) => {
                let id = *id;
                let class = self.class_of(id)?;
                let class_name = self.class_name(class);
                let Some(def) = self.classes.resolve_property(class, name) else {
                    return Err(ScriptError::name_error(format!(
                        "undefined property '{name}' on {class_name}"
                    )));
                };
                match def.set {
                    Some(PropertySet::Field(set)) => {
                        let accepted = match self.heap.payload_mut(id) {
                            Some(payload) => set(payload, &value),
                            None => {
                                return Err(ScriptError::new(
                                    ErrorKind::Internal,
                                    format!("instance of {class_name} has no payload"),
                                ))
                            }
                        };
                        if accepted {
                            Ok(())
                        } else {
                            Err(ScriptError::type_error(format!(
                                "cannot assign {} to {class_name}.{name}",
                                value.tag().name()
                            )))
                        }
                    }
                    Some(PropertySet::Hook(hook)) => {
                        self.invoke(
                            &format!("{class_name}.{name}="),
                            1,
                            NativeImpl::Static(hook),
                            Some(Value::Instance(id)),
                            &[value],
                        )?;
                        Ok(())
                    }
                    None => Err(ScriptError::type_error(format!(
                        "property '{name}' of {class_name} is read-only"
                    ))),
                }
            }
            Value::Module(_) => Err(ScriptError::type_error(
                "module members are read-only".to_string(),
            )),
            other => Err(ScriptError::type_error(format!(
                "{} has no properties",
                other.tag().name()
            ))),
        }
    }

    /// Produce the script-visible string form of a value.
    ///
    /// Instances use their class stringify hook when one exists; other
    /// registry-backed values resolve their names through the
    /// registries. Primitives follow [`Value`]'s `Display`.
    pub fn stringify(&mut self, value: &Value) -> ScriptResult<String> {
        match value {
            Value::Instance(id) => {
                let id = *id;
                let class = self.class_of(id)?;
                let class_name = self.class_name(class);
                match self.classes.resolve_stringify(class) {
                    Some(method) => {
                        let entry_name = self.classes.method(method).name.clone();
                        let result = self.call_method(method, Value::Instance(id), &[])?;
                        match result {
                            Value::Str(text) => Ok(text.to_string()),
                            other => Err(ScriptError::type_error(format!(
                                "{entry_name} must return a string, got {}",
                                other.tag().name()
                            ))),
                        }
                    }
                    None => Ok(format!("[instance of {class_name}]")),
                }
            }
            Value::Class(id) => match self.classes.get(*id) {
                Some(class) => Ok(format!("[class {}]", class.name())),
                None => Ok(value.to_string()),
            },
            Value::Module(id) => match self.modules.get(*id) {
                Some(module) => Ok(format!("[module {}]", module.name())),
                None => Ok(value.to_string()),
            },
            Value::Fn(id) => match self.modules.function(*id) {
                Some(entry) => Ok(format!("[fn {}]", entry.name)),
                None => Ok(value.to_string()),
            },
            other => Ok(other.to_string()),
        }
    }

    /// Test two values for script-level equality.
    ///
    /// An instance whose class overloads `==` decides the answer; the
    /// result is taken by truthiness. Everything else compares
    /// structurally, with instances falling back to identity.
    pub fn equals(&mut self, a: &Value, b: &Value) -> ScriptResult<bool> {
        if let Value::Instance(id) = a {
            let class = self.class_of(*id)?;
            if let Some(method) = self.classes.resolve_operator(class, Operator::Eq) {
                let result = self.call_method(method, a.clone(), &[b.clone()])?;
                return Ok(result.is_truthy());
            }
        }
        Ok(a == b)
    }

    /// Dispatch a binary operator whose left operand is an instance.
    ///
    /// The interpreter handles primitive operands itself; this is the
    /// overload path.
    pub fn binary_operator(
        &mut self,
        op: Operator,
        lhs: Value,
        rhs: Value,
    ) -> ScriptResult<Value> {
        if let Value::Instance(id) = lhs {
            let class = self.class_of(id)?;
            let class_name = self.class_name(class);
            let Some(method) = self.classes.resolve_operator(class, op) else {
                return Err(ScriptError::type_error(format!(
                    "{class_name} does not overload '{}'",
                    op.symbol()
                )));
            };
            return self.call_method(method, lhs, &[rhs]);
        }
        Err(ScriptError::type_error(format!(
            "unsupported operand type for '{}': {}",
            op.symbol(),
            lhs.tag().name()
        )))
    }

    /// Dispatch a unary operator whose operand is an instance.
    pub fn unary_operator(&mut self, op: Operator, operand: Value) -> ScriptResult<Value> {
        if let Value::Instance(id) = operand {
            let class = self.class_of(id)?;
            let class_name = self.class_name(class);
            let Some(method) = self.classes.resolve_operator(class, op) else {
                return Err(ScriptError::type_error(format!(
                    "{class_name} does not overload unary '{}'",
                    op.symbol()
                )));
            };
            return self.call_method(method, operand, &[]);
        }
        Err(ScriptError::type_error(format!(
            "unsupported operand type for unary '{}': {}",
            op.symbol(),
            operand.tag().name()
        )))
    }

    /// Report a host protocol violation without touching script state.
    pub fn protocol_fault(&mut self, context: &str, message: &str) {
        let text = format!("{context}: {message}");
        tracing::warn!(target: "quill::host", "{text}");
        (self.report)(Diagnostic::new(DiagnosticKind::HostProtocol, text));
    }

    fn class_of(&self, id: InstanceId) -> ScriptResult<ClassId> {
        self.heap.class_of(id).ok_or_else(|| {
            ScriptError::new(
                ErrorKind::Internal,
                "instance is no longer on the heap".to_string(),
            )
        })
    }

    fn class_name(&self, class: ClassId) -> &str {
        self.classes.get(class).map_or("instance", |c| c.name())
    }

    /// Run one native callback inside a fresh slot window.
    ///
    /// Slot 0 holds the receiver (or null for plain functions) on entry
    /// and the result on exit. An error the callback recorded takes
    /// precedence over its return value. The window is always popped,
    /// and a failing call gains a trace frame naming the callback.
    fn invoke(
        &mut self,
        name: &str,
        arity: u8,
        imp: NativeImpl,
        receiver: Option<Value>,
        args: &[Value],
    ) -> ScriptResult<Value> {
        if args.len() != arity as usize {
            return Err(ScriptError::arity_error(format!(
                "{name} expects {arity} arguments, got {}",
                args.len()
            )));
        }
        if *self.depth >= self.max_depth {
            return Err(ScriptError::memory_error(format!(
                "native call depth limit of {} exceeded",
                self.max_depth
            )));
        }

        let mut window = Vec::with_capacity(args.len() + 1);
        window.push(receiver.clone().unwrap_or(Value::Null));
        window.extend_from_slice(args);
        self.slots.push_window_with(&window);
        *self.depth += 1;

        let outcome = {
            let mut call = NativeCall {
                name: name.to_string(),
                vm: self.reborrow(),
                receiver,
            };
            match imp {
                NativeImpl::Static(f) => f(&mut call),
                NativeImpl::Extern(f) => api::invoke_extern(f, &mut call),
            }
        };

        *self.depth -= 1;
        let pending = self.pending.take();
        let result = match (pending, outcome) {
            (Some(error), _) => Err(error),
            (None, Ok(())) => Ok(self.slots.take(0).unwrap_or(Value::Null)),
            (None, Err(NativeError::Raised)) => Err(ScriptError::native(format!(
                "{name} failed without raising an error"
            ))),
            (None, Err(NativeError::Protocol(fault))) => {
                Err(ScriptError::native(fault.to_string()))
            }
        };
        self.slots.pop_window();
        result.map_err(|error| error.push_frame(TraceFrame::native(name)))
    }

    /// Run a class allocator and hand back the payload it built.
    fn run_allocator(
        &mut self,
        allocate: AllocateFn,
        shell: InstanceId,
        name: &str,
    ) -> ScriptResult<Payload> {
        if *self.depth >= self.max_depth {
            return Err(ScriptError::memory_error(format!(
                "native call depth limit of {} exceeded",
                self.max_depth
            )));
        }
        self.slots.push_window_with(&[Value::Instance(shell)]);
        *self.depth += 1;

        let outcome = {
            let mut call = NativeCall {
                name: name.to_string(),
                vm: self.reborrow(),
                receiver: Some(Value::Instance(shell)),
            };
            allocate(&mut call)
        };

        *self.depth -= 1;
        self.slots.pop_window();
        let pending = self.pending.take();
        let result = match (pending, outcome) {
            (Some(error), _) => Err(error),
            (None, Ok(payload)) => Ok(payload),
            (None, Err(NativeError::Raised)) => Err(ScriptError::native(format!(
                "{name} failed without raising an error"
            ))),
            (None, Err(NativeError::Protocol(fault))) => {
                Err(ScriptError::native(fault.to_string()))
            }
        };
        result.map_err(|error| error.push_frame(TraceFrame::native(name)))
    }
}

/// Execution context handed to a native callback.
///
/// Wraps the VM services for the duration of one call. Arguments live in
/// slots 1 and up; slot 0 starts as the receiver and becomes the return
/// value. Typed accessors record a script error on mismatch, so a
/// callback can end with `?` and let the VM produce the failure report.
pub struct NativeCall<'a> {
    name: String,
    vm: VmServices<'a>,
    receiver: Option<Value>,
}

impl NativeCall<'_> {
    /// Number of argument slots in this call's window.
    pub fn arg_count(&self) -> usize {
        self.vm.slots.len().saturating_sub(1)
    }

    /// Total slot count of this call's window, including slot 0.
    pub fn slot_count(&self) -> usize {
        self.vm.slots.len()
    }

    /// Grow the window to at least `len` slots.
    pub fn reserve(&mut self, len: usize) {
        self.vm.slots.reserve(len);
    }

    /// Current native call nesting depth, this call included.
    pub fn depth(&self) -> usize {
        *self.vm.depth
    }

    /// The receiver this callback was invoked on, if any.
    pub fn receiver(&self) -> Option<&Value> {
        self.receiver.as_ref()
    }

    /// Class of the instance receiver, if the receiver is an instance.
    pub fn receiver_class(&self) -> Option<ClassId> {
        match &self.receiver {
            Some(Value::Instance(id)) => self.vm.heap.class_of(*id),
            _ => None,
        }
    }

    /// Raw read of a window slot.
    pub fn slot(&self, index: usize) -> Option<&Value> {
        self.vm.slots.get(index).ok()
    }

    /// Read slot `index` as a boolean.
    pub fn slot_bool(&mut self, index: usize) -> Result<bool, NativeError> {
        let probe = self.vm.slots.get_bool(index);
        probe.map_err(|fault| self.fail(fault))
    }

    /// Read slot `index` as a number.
    pub fn slot_num(&mut self, index: usize) -> Result<f64, NativeError> {
        let probe = self.vm.slots.get_num(index);
        probe.map_err(|fault| self.fail(fault))
    }

    /// Read slot `index` as an integer-valued number.
    pub fn slot_int(&mut self, index: usize) -> Result<i64, NativeError> {
        let probe = self.vm.slots.get_int(index);
        probe.map_err(|fault| self.fail(fault))
    }

    /// Read slot `index` as a string.
    pub fn slot_str(&mut self, index: usize) -> Result<Rc<str>, NativeError> {
        let probe = self.vm.slots.get_str(index);
        probe.map_err(|fault| self.fail(fault))
    }

    /// Read slot `index` as an instance id.
    pub fn slot_instance(&mut self, index: usize) -> Result<InstanceId, NativeError> {
        let probe = match self.vm.slots.get(index) {
            Ok(Value::Instance(id)) => Ok(*id),
            Ok(other) => Err(SlotError::TypeMismatch {
                index,
                expected: "instance",
                found: other.tag().name(),
            }),
            Err(fault) => Err(fault),
        };
        probe.map_err(|fault| self.fail(fault))
    }

    /// Borrow the payload of the instance in slot `index` as `T`.
    pub fn slot_payload<T: Any>(&mut self, index: usize) -> Result<&T, NativeError> {
        let id = self.slot_instance(index)?;
        let present = self
            .vm
            .heap
            .payload(id)
            .and_then(|p| p.downcast_ref::<T>())
            .is_some();
        if !present {
            return Err(self.raise(
                ErrorKind::Internal,
                format!("payload in slot {index} is not the expected type"),
            ));
        }
        self.vm
            .heap
            .payload(id)
            .and_then(|p| p.downcast_ref::<T>())
            .ok_or(NativeError::Raised)
    }

    /// Check that slot `index` holds a value of type `tag`.
    pub fn check_type(&mut self, index: usize, tag: TypeTag) -> Result<(), NativeError> {
        let probe = match self.vm.slots.get(index) {
            Ok(value) if value.tag() == tag => Ok(()),
            Ok(value) => Err(SlotError::TypeMismatch {
                index,
                expected: tag.name(),
                found: value.tag().name(),
            }),
            Err(fault) => Err(fault),
        };
        probe.map_err(|fault| self.fail(fault))
    }

    /// Write a value into a window slot.
    pub fn set_slot(&mut self, index: usize, value: Value) -> Result<(), NativeError> {
        let probe = self.vm.slots.set(index, value);
        probe.map_err(|fault| self.fail(fault))
    }

    /// Write `null` into a window slot.
    pub fn set_null(&mut self, index: usize) -> Result<(), NativeError> {
        self.set_slot(index, Value::Null)
    }

    /// Write a boolean into a window slot.
    pub fn set_bool(&mut self, index: usize, value: bool) -> Result<(), NativeError> {
        self.set_slot(index, Value::Bool(value))
    }

    /// Write a number into a window slot.
    pub fn set_num(&mut self, index: usize, value: f64) -> Result<(), NativeError> {
        self.set_slot(index, Value::Num(value))
    }

    /// Write a string into a window slot.
    pub fn set_str(&mut self, index: usize, value: impl AsRef<str>) -> Result<(), NativeError> {
        self.set_slot(index, Value::str(value))
    }

    /// Set the call's return value.
    pub fn set_return(&mut self, value: Value) {
        // Slot 0 always exists: every call window holds at least the
        // receiver slot.
        let _ = self.vm.slots.set(0, value);
    }

    /// Borrow the payload of the instance receiver as `T`.
    pub fn payload<T: Any>(&mut self) -> Result<&T, NativeError> {
        let id = self.receiver_instance()?;
        let present = self
            .vm
            .heap
            .payload(id)
            .and_then(|p| p.downcast_ref::<T>())
            .is_some();
        if !present {
            return Err(self.raise(
                ErrorKind::Internal,
                "receiver payload is not the expected type",
            ));
        }
        self.vm
            .heap
            .payload(id)
            .and_then(|p| p.downcast_ref::<T>())
            .ok_or(NativeError::Raised)
    }

    /// Mutably borrow the payload of the instance receiver as `T`.
    pub fn payload_mut<T: Any>(&mut self) -> Result<&mut T, NativeError> {
        let id = self.receiver_instance()?;
        let present = self
            .vm
            .heap
            .payload(id)
            .and_then(|p| p.downcast_ref::<T>())
            .is_some();
        if !present {
            return Err(self.raise(
                ErrorKind::Internal,
                "receiver payload is not the expected type",
            ));
        }
        self.vm
            .heap
            .payload_mut(id)
            .and_then(|p| p.downcast_mut::<T>())
            .ok_or(NativeError::Raised)
    }

    fn receiver_instance(&mut self) -> Result<InstanceId, NativeError> {
        match &self.receiver {
            Some(Value::Instance(id)) => Ok(*id),
            _ => Err(self.raise(ErrorKind::Native, "call has no instance receiver")),
        }
    }

    /// Record a script error and return the signal to propagate.
    ///
    /// The first recorded error wins; later raises in the same call are
    /// dropped.
    pub fn raise(&mut self, kind: ErrorKind, message: impl Into<String>) -> NativeError {
        self.record(ScriptError::new(kind, message));
        NativeError::Raised
    }

    /// Re-record an error from a reentrant call so it propagates out of
    /// this one.
    pub fn rethrow(&mut self, error: ScriptError) -> NativeError {
        self.record(error);
        NativeError::Raised
    }

    fn record(&mut self, error: ScriptError) {
        if self.vm.pending.is_none() {
            *self.vm.pending = Some(error);
        }
    }

    fn fail(&mut self, fault: SlotError) -> NativeError {
        match fault {
            SlotError::OutOfBounds { .. } => {
                let message = fault.to_string();
                let name = self.name.clone();
                self.vm.protocol_fault(&name, &message);
                self.record(ScriptError::native(message));
                NativeError::Protocol(fault)
            }
            SlotError::TypeMismatch { .. } | SlotError::NotAnInteger { .. } => {
                self.record(ScriptError::type_error(fault.to_string()));
                NativeError::Raised
            }
        }
    }

    /// Construct an instance of a native class.
    pub fn instantiate(&mut self, class: ClassId, args: &[Value]) -> ScriptResult<Value> {
        self.vm.instantiate(class, args)
    }

    /// Call a registered module-level function.
    pub fn call_function(&mut self, function: FnId, args: &[Value]) -> ScriptResult<Value> {
        self.vm.call_function(function, args)
    }

    /// Call a function or class value.
    pub fn call_value(&mut self, callee: Value, args: &[Value]) -> ScriptResult<Value> {
        self.vm.call_value(callee, args)
    }

    /// Invoke a method by name on a receiver.
    pub fn invoke_method(
        &mut self,
        receiver: Value,
        name: &str,
        args: &[Value],
    ) -> ScriptResult<Value> {
        self.vm.invoke_method(receiver, name, args)
    }

    /// Read a property of a receiver.
    pub fn get_property(&mut self, receiver: &Value, name: &str) -> ScriptResult<Value> {
        self.vm.get_property(receiver, name)
    }

    /// Write a property of a receiver.
    pub fn set_property(
        &mut self,
        receiver: &Value,
        name: &str,
        value: Value,
    ) -> ScriptResult<()> {
        self.vm.set_property(receiver, name, value)
    }

    /// Produce the script-visible string form of a value.
    pub fn stringify(&mut self, value: &Value) -> ScriptResult<String> {
        self.vm.stringify(value)
    }

    /// Write text to the context's output.
    pub fn print(&mut self, text: &str) {
        (self.vm.out)(text);
    }

    /// Root a value so it survives collection while the host holds it.
    pub fn acquire(&mut self, value: Value) -> Handle {
        self.vm.handles.acquire(value)
    }

    /// Release a previously acquired handle.
    pub fn release(&mut self, handle: Handle) {
        self.vm.handles.release(handle);
    }

    /// Release a handle by raw token, reporting misuse as a protocol
    /// diagnostic. The script keeps running either way.
    pub fn release_raw(&mut self, raw: u64) -> Result<(), HandleFault> {
        let result = self.vm.handles.release_raw(raw);
        if let Err(fault) = &result {
            let message = fault.to_string();
            let name = self.name.clone();
            self.vm.protocol_fault(&name, &message);
        }
        result
    }

    /// Read the value behind a raw handle token.
    pub fn handle_value(&self, raw: u64) -> Option<Value> {
        self.vm.handles.get_raw(raw).cloned()
    }

    /// Borrow the string in a slot without copying, for callers that
    /// need a stable view into the slot's buffer.
    pub fn borrow_str(&self, index: usize) -> Option<&str> {
        match self.vm.slots.get(index) {
            Ok(Value::Str(s)) => Some(&**s),
            _ => None,
        }
    }
}
