//! Bytecode system for the Quill VM
//!
//! This crate defines the stack-machine instruction set and the compiled
//! chunk container the parser emits and the interpreter executes.
//!
//! # Example
//!
//! ```
//! use bytecode_system::{Chunk, Opcode};
//! use core_types::Value;
//!
//! let mut chunk = Chunk::new("demo");
//! let idx = chunk.add_constant(Value::Num(42.0));
//! chunk.emit(Opcode::Constant(idx), 1);
//! chunk.emit(Opcode::Return, 1);
//!
//! assert_eq!(chunk.len(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chunk;
pub mod opcode;

pub use chunk::Chunk;
pub use opcode::Opcode;
