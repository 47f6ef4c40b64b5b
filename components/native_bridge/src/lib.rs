//! Native Bridge - the interop boundary between the VM and native code
//!
//! This component provides everything a host application or dynamically
//! loaded extension uses to talk to the VM:
//!
//! - [`SlotStack`] - windowed value slots, the calling convention for all
//!   native↔VM data transfer
//! - [`HandleTable`] - counted roots for script values held by native code
//! - [`ClassRegistry`] - native class metadata: allocators, finalizers,
//!   methods, operators, property accessors
//! - [`ModuleRegistry`] - named, publishable collections of functions,
//!   classes, and values
//! - [`NativeCall`] / [`VmServices`] - the execution-context interface a
//!   callback sees: typed slot access, error raising, reentrant calls
//! - [`ExtensionLoader`] and the versioned C ABI in [`api`] for shared
//!   libraries that register modules at runtime

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod call;
pub mod classes;
pub mod error;
pub mod extension;
pub mod handles;
pub mod modules;
pub mod slots;

pub use call::{NativeCall, NativeFn, NativeImpl, VmServices};
pub use classes::{
    AllocateFn, ClassDecl, ClassRegistry, FieldGetFn, FieldSetFn, FinalizeFn, MethodEntry,
    MethodId, NativeClass, Operator, PropertyDef, PropertyGet, PropertySet,
};
pub use error::{ExtensionError, HandleFault, NativeError, RegistryError, SlotError};
pub use extension::{resolve_library_path, ExtensionLoader, LoadedExtension, EXTENSION_ENTRY_SYMBOL};
pub use handles::{Handle, HandleTable, ScopedRoot};
pub use modules::{FnEntry, Module, ModuleRegistry};
pub use slots::SlotStack;
