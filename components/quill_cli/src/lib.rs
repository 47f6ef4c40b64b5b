//! Quill CLI library
//!
//! The binary's argument surface, runtime orchestration, and REPL,
//! exposed as a library so integration tests can drive them directly.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod error;
pub mod repl;
pub mod runtime;

pub use cli::Cli;
pub use error::{CliError, CliResult};
pub use runtime::Runtime;
