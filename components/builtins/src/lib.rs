//! The `core` module: built-in functions every script gets
//!
//! Installation is explicit so embedders control exactly what scripts
//! can reach. [`install`] registers the module through the same public
//! registration API extensions use, publishes it, and mirrors each
//! function into a convenience global so scripts write `print(x)`
//! instead of `core.print(x)`.
//!
//! # Example
//!
//! ```
//! use interpreter::Vm;
//! use core_types::Value;
//!
//! let mut vm = Vm::new();
//! builtins::install(&mut vm).unwrap();
//!
//! let name = vm.eval(r#"type_name(1 + 2)"#).unwrap();
//! assert_eq!(name, Value::str("num"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::time::{SystemTime, UNIX_EPOCH};

use core_types::Value;
use interpreter::Vm;
use native_bridge::{NativeCall, NativeError, RegistryError};

/// Script-visible name of the module [`install`] registers.
pub const MODULE_NAME: &str = "core";

/// Register the `core` module and its convenience globals.
///
/// Fails if a module named `core` already exists, leaving the VM
/// untouched in that case.
pub fn install(vm: &mut Vm) -> Result<(), RegistryError> {
    let module = vm.new_module(MODULE_NAME)?;
    let print = vm.add_function(module, "print", 1, print_native)?;
    let clock = vm.add_function(module, "clock", 0, clock_native)?;
    let to_str = vm.add_function(module, "str", 1, str_native)?;
    let type_name = vm.add_function(module, "type_name", 1, type_name_native)?;
    vm.publish_module(module)?;

    vm.set_global("print", Value::Fn(print));
    vm.set_global("clock", Value::Fn(clock));
    vm.set_global("str", Value::Fn(to_str));
    vm.set_global("type_name", Value::Fn(type_name));
    Ok(())
}

/// `print(value)`: stringify through the VM, then write to the print
/// sink. Instances print via their class stringify hook.
fn print_native(call: &mut NativeCall<'_>) -> Result<(), NativeError> {
    let value = call.slot(1).cloned().unwrap_or(Value::Null);
    let text = match call.stringify(&value) {
        Ok(text) => text,
        Err(error) => return Err(call.rethrow(error)),
    };
    call.print(&text);
    Ok(())
}

/// `clock()`: seconds since the Unix epoch, fractional.
fn clock_native(call: &mut NativeCall<'_>) -> Result<(), NativeError> {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |elapsed| elapsed.as_secs_f64());
    call.set_num(0, seconds)?;
    Ok(())
}

/// `str(value)`: the same string form `print` writes.
fn str_native(call: &mut NativeCall<'_>) -> Result<(), NativeError> {
    let value = call.slot(1).cloned().unwrap_or(Value::Null);
    let text = match call.stringify(&value) {
        Ok(text) => text,
        Err(error) => return Err(call.rethrow(error)),
    };
    call.set_str(0, text)?;
    Ok(())
}

/// `type_name(value)`: the value's type tag, e.g. `"num"` or `"instance"`.
fn type_name_native(call: &mut NativeCall<'_>) -> Result<(), NativeError> {
    let name = match call.slot(1) {
        Some(value) => value.tag().name(),
        None => "null",
    };
    call.set_str(0, name)?;
    Ok(())
}
