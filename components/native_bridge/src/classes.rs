//! Native class registry
//!
//! A native class describes a script-visible type whose storage and
//! behavior live in host code: an allocator for its payload, an optional
//! finalizer, named methods, property accessors, and overloads for a
//! fixed set of operators. Classes form single-inheritance chains; lookup
//! walks from the class to its base until a match is found.

use crate::call::{NativeCall, NativeFn, NativeImpl};
use crate::error::{NativeError, RegistryError};
use core_types::{ClassId, ModuleId, Value};
use memory_manager::Payload;
use std::collections::HashMap;

/// Builds the payload for a new instance. Runs with a one-slot window
/// whose slot 0 holds the uninitialized instance.
pub type AllocateFn = fn(&mut NativeCall<'_>) -> Result<Payload, NativeError>;

/// Tears down a payload when its instance is collected or the VM shuts
/// down. Runs exactly once per allocated payload, with no VM access.
pub type FinalizeFn = fn(Payload);

/// Direct field read against an instance payload.
///
/// Returns `None` when the payload is not the type the accessor expects,
/// which the VM reports as an internal error.
pub type FieldGetFn = fn(&Payload) -> Option<Value>;

/// Direct field write against an instance payload.
///
/// Returns `false` when the incoming value has an unacceptable type.
pub type FieldSetFn = fn(&mut Payload, &Value) -> bool;

/// The operators a native class may overload.
///
/// The set is closed: scripts cannot mint new operators, so dispatch is
/// an array index instead of a name lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Binary `+`.
    Add,
    /// Binary `-`.
    Sub,
    /// Binary `*`.
    Mul,
    /// Binary `/`.
    Div,
    /// Binary `%`.
    Rem,
    /// Unary `-`.
    Neg,
    /// Binary `==`.
    Eq,
    /// Binary `<`.
    Lt,
    /// Binary `<=`.
    Le,
    /// Binary `>`.
    Gt,
    /// Binary `>=`.
    Ge,
}

impl Operator {
    /// Number of overloadable operators.
    pub const COUNT: usize = 11;

    /// Source-level spelling of the operator.
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Rem => "%",
            Operator::Neg => "-",
            Operator::Eq => "==",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
        }
    }

    /// Operand count, including the receiver: 1 for `Neg`, 2 otherwise.
    pub fn arity(&self) -> u8 {
        match self {
            Operator::Neg => 1,
            _ => 2,
        }
    }

    /// Stable slot of this operator in a class overload table.
    pub fn index(&self) -> usize {
        match self {
            Operator::Add => 0,
            Operator::Sub => 1,
            Operator::Mul => 2,
            Operator::Div => 3,
            Operator::Rem => 4,
            Operator::Neg => 5,
            Operator::Eq => 6,
            Operator::Lt => 7,
            Operator::Le => 8,
            Operator::Gt => 9,
            Operator::Ge => 10,
        }
    }
}

/// How a property read is served.
#[derive(Debug, Clone, Copy)]
pub enum PropertyGet {
    /// Read straight from the payload, no slot window involved.
    Field(FieldGetFn),
    /// Run a native callback; slot 0 receives the result.
    Hook(NativeFn),
}

/// How a property write is served.
#[derive(Debug, Clone, Copy)]
pub enum PropertySet {
    /// Write straight into the payload.
    Field(FieldSetFn),
    /// Run a native callback; slot 1 holds the incoming value.
    Hook(NativeFn),
}

/// Accessor pair for one named property.
#[derive(Debug, Clone, Copy)]
pub struct PropertyDef {
    /// Read side, absent for write-only properties.
    pub get: Option<PropertyGet>,
    /// Write side, absent for read-only properties.
    pub set: Option<PropertySet>,
}

impl PropertyDef {
    /// Field-backed property with a getter and optional setter.
    pub fn field(get: FieldGetFn, set: Option<FieldSetFn>) -> Self {
        PropertyDef {
            get: Some(PropertyGet::Field(get)),
            set: set.map(PropertySet::Field),
        }
    }

    /// Read-only field-backed property.
    pub fn read_only(get: FieldGetFn) -> Self {
        PropertyDef {
            get: Some(PropertyGet::Field(get)),
            set: None,
        }
    }
}

/// Index of a method in the registry's shared pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodId(pub u32);

/// One callable native method: display name, declared arity, and the
/// implementation to invoke.
#[derive(Debug, Clone)]
pub struct MethodEntry {
    /// Qualified name used in stack traces, e.g. `Vec2.len`.
    pub name: String,
    /// Number of arguments the method expects (receiver excluded).
    pub arity: u8,
    /// The callback behind the method.
    pub imp: NativeImpl,
}

/// Declaration of a native class, built up before registration.
///
/// # Examples
///
/// ```no_run
/// use native_bridge::{ClassDecl, Operator, PropertyDef};
/// # use native_bridge::{NativeCall, NativeError};
/// # use memory_manager::Payload;
/// # use core_types::Value;
/// # fn alloc(_: &mut NativeCall<'_>) -> Result<Payload, NativeError> { Ok(Payload::new(0.0_f64)) }
/// # fn init(_: &mut NativeCall<'_>) -> Result<(), NativeError> { Ok(()) }
/// # fn add(_: &mut NativeCall<'_>) -> Result<(), NativeError> { Ok(()) }
/// # fn get_x(p: &Payload) -> Option<Value> { p.downcast_ref::<f64>().map(|n| Value::Num(*n)) }
///
/// let decl = ClassDecl::new("Meters", alloc)
///     .init(1, init)
///     .operator(Operator::Add, add)
///     .property("value", PropertyDef::read_only(get_x));
/// ```
#[derive(Debug)]
pub struct ClassDecl {
    name: String,
    base: Option<ClassId>,
    allocate: AllocateFn,
    finalize: Option<FinalizeFn>,
    init: Option<(u8, NativeFn)>,
    stringify: Option<NativeFn>,
    operators: Vec<(Operator, NativeFn)>,
    methods: Vec<(String, u8, NativeFn)>,
    properties: Vec<(String, PropertyDef)>,
}

impl ClassDecl {
    /// Start a declaration with the class name and payload allocator.
    pub fn new(name: impl Into<String>, allocate: AllocateFn) -> Self {
        ClassDecl {
            name: name.into(),
            base: None,
            allocate,
            finalize: None,
            init: None,
            stringify: None,
            operators: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Inherit methods, properties, and operators from `base`.
    pub fn base(mut self, base: ClassId) -> Self {
        self.base = Some(base);
        self
    }

    /// Run `finalize` on the payload when an instance is reclaimed.
    pub fn finalize(mut self, finalize: FinalizeFn) -> Self {
        self.finalize = Some(finalize);
        self
    }

    /// Initializer invoked on construction with `arity` arguments.
    pub fn init(mut self, arity: u8, imp: NativeFn) -> Self {
        self.init = Some((arity, imp));
        self
    }

    /// Hook producing the string form of an instance in slot 0.
    pub fn stringify(mut self, imp: NativeFn) -> Self {
        self.stringify = Some(imp);
        self
    }

    /// Overload `op` with `imp`.
    pub fn operator(mut self, op: Operator, imp: NativeFn) -> Self {
        self.operators.push((op, imp));
        self
    }

    /// Add a named method taking `arity` arguments.
    pub fn method(mut self, name: impl Into<String>, arity: u8, imp: NativeFn) -> Self {
        self.methods.push((name.into(), arity, imp));
        self
    }

    /// Add a named property with explicit accessors.
    pub fn property(mut self, name: impl Into<String>, def: PropertyDef) -> Self {
        self.properties.push((name.into(), def));
        self
    }

    /// Shorthand for a field-backed property.
    pub fn field(self, name: impl Into<String>, get: FieldGetFn, set: Option<FieldSetFn>) -> Self {
        self.property(name, PropertyDef::field(get, set))
    }
}

/// A registered native class.
#[derive(Debug)]
pub struct NativeClass {
    name: String,
    module: ModuleId,
    base: Option<ClassId>,
    allocate: AllocateFn,
    finalize: Option<FinalizeFn>,
    init: Option<MethodId>,
    stringify: Option<MethodId>,
    operators: [Option<MethodId>; Operator::COUNT],
    methods: HashMap<String, MethodId>,
    properties: HashMap<String, PropertyDef>,
}

impl NativeClass {
    /// Class name as scripts see it.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Module the class was registered under.
    pub fn module(&self) -> ModuleId {
        self.module
    }

    /// Base class, when one was declared.
    pub fn base(&self) -> Option<ClassId> {
        self.base
    }

    /// The allocator that builds this class's payloads.
    pub fn allocate_fn(&self) -> AllocateFn {
        self.allocate
    }
}

/// Registry of all native classes and their shared method pool.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: Vec<NativeClass>,
    methods: Vec<MethodEntry>,
}

impl ClassRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        ClassRegistry {
            classes: Vec::new(),
            methods: Vec::new(),
        }
    }

    fn add_method(&mut self, name: String, arity: u8, imp: NativeImpl) -> MethodId {
        let id = MethodId(self.methods.len() as u32);
        self.methods.push(MethodEntry { name, arity, imp });
        id
    }

    /// Register `decl` as a class belonging to `module`.
    ///
    /// The base class (if any) must already be registered, so class ids
    /// along a chain strictly decrease and lookup always terminates.
    pub fn register(&mut self, decl: ClassDecl, module: ModuleId) -> Result<ClassId, RegistryError> {
        if let Some(base) = decl.base {
            if base.0 as usize >= self.classes.len() {
                return Err(RegistryError::UnknownClass(base.0));
            }
        }

        let id = ClassId(self.classes.len() as u32);
        let class_name = decl.name;

        let init = decl
            .init
            .map(|(arity, imp)| {
                self.add_method(format!("{class_name}.init"), arity, NativeImpl::Static(imp))
            });
        let stringify = decl.stringify.map(|imp| {
            self.add_method(format!("{class_name}.str"), 0, NativeImpl::Static(imp))
        });

        let mut operators = [None; Operator::COUNT];
        for (op, imp) in decl.operators {
            let method = self.add_method(
                format!("{class_name}.{}", op.symbol()),
                op.arity() - 1,
                NativeImpl::Static(imp),
            );
            operators[op.index()] = Some(method);
        }

        let mut methods = HashMap::new();
        for (name, arity, imp) in decl.methods {
            let method = self.add_method(
                format!("{class_name}.{name}"),
                arity,
                NativeImpl::Static(imp),
            );
            methods.insert(name, method);
        }

        let properties = decl.properties.into_iter().collect();

        self.classes.push(NativeClass {
            name: class_name,
            module,
            base: decl.base,
            allocate: decl.allocate,
            finalize: decl.finalize,
            init,
            stringify,
            operators,
            methods,
            properties,
        });
        Ok(id)
    }

    /// Look up a registered class.
    pub fn get(&self, id: ClassId) -> Option<&NativeClass> {
        self.classes.get(id.0 as usize)
    }

    /// Number of registered classes.
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Read a pooled method entry.
    pub fn method(&self, id: MethodId) -> &MethodEntry {
        &self.methods[id.0 as usize]
    }

    /// The finalizer for `class`, when one was declared.
    pub fn finalizer(&self, class: ClassId) -> Option<FinalizeFn> {
        self.get(class).and_then(|c| c.finalize)
    }

    /// Find `name` as a method on `class` or any of its bases.
    pub fn resolve_method(&self, class: ClassId, name: &str) -> Option<MethodId> {
        let mut cursor = Some(class);
        while let Some(id) = cursor {
            let c = self.get(id)?;
            if let Some(&method) = c.methods.get(name) {
                return Some(method);
            }
            cursor = c.base;
        }
        None
    }

    /// Find `name` as a property on `class` or any of its bases.
    pub fn resolve_property(&self, class: ClassId, name: &str) -> Option<&PropertyDef> {
        let mut cursor = Some(class);
        while let Some(id) = cursor {
            let c = self.get(id)?;
            if let Some(def) = c.properties.get(name) {
                return Some(def);
            }
            cursor = c.base;
        }
        None
    }

    /// Find the overload for `op` on `class` or any of its bases.
    pub fn resolve_operator(&self, class: ClassId, op: Operator) -> Option<MethodId> {
        let mut cursor = Some(class);
        while let Some(id) = cursor {
            let c = self.get(id)?;
            if let Some(method) = c.operators[op.index()] {
                return Some(method);
            }
            cursor = c.base;
        }
        None
    }

    /// Find the initializer for `class`, searching base classes.
    pub fn resolve_initializer(&self, class: ClassId) -> Option<MethodId> {
        let mut cursor = Some(class);
        while let Some(id) = cursor {
            let c = self.get(id)?;
            if let Some(method) = c.init {
                return Some(method);
            }
            cursor = c.base;
        }
        None
    }

    /// Find the stringify hook for `class`, searching base classes.
    pub fn resolve_stringify(&self, class: ClassId) -> Option<MethodId> {
        let mut cursor = Some(class);
        while let Some(id) = cursor {
            let c = self.get(id)?;
            if let Some(method) = c.stringify {
                return Some(method);
            }
            cursor = c.base;
        }
        None
    }
}
