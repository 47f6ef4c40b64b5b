//! Quill Parser Component
//!
//! Provides lexer, parser, AST construction, and bytecode generation
//! for Quill syntax.
//!
//! # Overview
//!
//! - [`Lexer`] - Tokenizes Quill source code
//! - [`Token`] - Token types including identifiers, literals, keywords
//! - [`Parser`] - Recursive descent parser producing an AST
//! - [`Program`] - Abstract syntax tree root
//! - [`BytecodeGenerator`] - Converts an AST to bytecode
//!
//! # Example
//!
//! ```
//! use parser::compile;
//!
//! let chunk = compile("demo", "let x = 40 + 2; x").unwrap();
//! assert_eq!(chunk.name, "demo");
//! assert!(!chunk.is_empty());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod bytecode_gen;
pub mod error;
pub mod lexer;
pub mod parser;

pub use ast::{BinaryOp, Expression, Literal, Program, Statement, UnaryOp};
pub use bytecode_gen::BytecodeGenerator;
pub use lexer::{Keyword, Lexer, Punctuator, Token};
pub use parser::{Parser, MAX_ARGUMENTS};

use bytecode_system::Chunk;
use core_types::ScriptResult;

/// Parse and compile source code into a bytecode chunk.
///
/// `name` labels the chunk in traces, typically the script's file name
/// or `"<eval>"`.
pub fn compile(name: &str, source: &str) -> ScriptResult<Chunk> {
    let mut parser = Parser::new(source);
    let program = parser.parse()?;
    Ok(BytecodeGenerator::new(name).generate(&program))
}
