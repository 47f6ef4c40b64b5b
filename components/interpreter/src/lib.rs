//! Bytecode interpreter and embedding surface for the Quill VM
//!
//! This crate provides the virtual machine that ties the other
//! components together:
//! - Stack-based execution of compiled chunks
//! - Host registration of native modules, functions, and classes
//! - Handle-based rooting for values the host retains
//! - Mark/sweep garbage collection over instance payloads
//!
//! # Example
//!
//! ```
//! use interpreter::Vm;
//! use core_types::Value;
//!
//! let mut vm = Vm::new();
//! let result = vm.eval("let answer = 6 * 7; answer").unwrap();
//! assert_eq!(result, Value::Num(42.0));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod call_frame;
pub mod dispatch;
pub mod vm;

// Re-export main types at crate root
pub use call_frame::CallFrame;
pub use vm::{render_error, Vm, VmConfig, DEFAULT_GC_THRESHOLD, DEFAULT_MAX_CALL_DEPTH};
