//! Core Quill value types and error handling.
//!
//! This crate provides the foundational types shared by every Quill
//! component: the script value representation, identifier newtypes for
//! registry-managed objects, error and diagnostic types, and source
//! location tracking.
//!
//! # Overview
//!
//! - [`Value`] - Tagged representation of Quill script values
//! - [`TypeTag`] - Value type names for diagnostics
//! - [`ScriptError`] - Compile and runtime errors with call traces
//! - [`RunStatus`] - Coarse result code of a script run
//! - [`Diagnostic`] - Payload of the host report callback
//! - [`SourcePosition`] - Source code location
//!
//! # Examples
//!
//! ```
//! use core_types::{ScriptError, TypeTag, Value};
//!
//! let num = Value::Num(42.0);
//! assert!(num.is_truthy());
//! assert_eq!(num.tag(), TypeTag::Num);
//!
//! let error = ScriptError::type_error("expected a number");
//! assert_eq!(error.message, "expected a number");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod diagnostics;
mod error;
mod ids;
mod source;
mod value;

pub use diagnostics::{Diagnostic, DiagnosticKind, RunStatus};
pub use error::{ErrorKind, ScriptError, ScriptResult};
pub use ids::{ClassId, FnId, InstanceId, ModuleId};
pub use source::{SourcePosition, TraceFrame};
pub use value::{format_num, TypeTag, Value};
