//! Script error types.
//!
//! A [`ScriptError`] is any failure a script run can produce: a syntax
//! error from the compiler or a runtime error from execution. Host-side
//! protocol and extension-loading failures have their own types in the
//! native bridge; they never surface as script errors.

use std::fmt;

use crate::diagnostics::RunStatus;
use crate::{SourcePosition, TraceFrame};

/// The kind of script error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Syntax or lexical error found while compiling
    Syntax,
    /// Operation applied to a value of the wrong type
    Type,
    /// Reference to an unknown variable, member, or property
    Name,
    /// Call with the wrong number of arguments
    Arity,
    /// Heap limit exceeded or allocation failure
    Memory,
    /// Error raised by a native callback
    Native,
    /// Internal engine error
    Internal,
}

/// A script error with message, call trace, and source position.
///
/// # Examples
///
/// ```
/// use core_types::{ErrorKind, ScriptError};
///
/// let error = ScriptError::name_error("undefined variable 'speed'");
/// assert_eq!(error.kind, ErrorKind::Name);
/// assert!(error.to_string().contains("speed"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptError {
    /// The kind of error
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Call trace at the time of the error, innermost frame first
    pub trace: Vec<TraceFrame>,
    /// Source position where the error occurred
    pub position: Option<SourcePosition>,
}

impl ScriptError {
    /// Create an error of the given kind with no trace or position.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            trace: Vec::new(),
            position: None,
        }
    }

    /// Syntax error at a source position.
    pub fn syntax(message: impl Into<String>, position: SourcePosition) -> Self {
        Self {
            kind: ErrorKind::Syntax,
            message: message.into(),
            trace: Vec::new(),
            position: Some(position),
        }
    }

    /// Type error.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Type, message)
    }

    /// Unknown-name error.
    pub fn name_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Name, message)
    }

    /// Wrong-argument-count error.
    pub fn arity_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Arity, message)
    }

    /// Allocation-failure error.
    pub fn memory_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Memory, message)
    }

    /// Error raised from a native callback.
    pub fn native(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Native, message)
    }

    /// Append a frame to the call trace.
    pub fn push_frame(mut self, frame: TraceFrame) -> Self {
        self.trace.push(frame);
        self
    }

    /// Attach a source position if none is set yet.
    pub fn at(mut self, position: SourcePosition) -> Self {
        if self.position.is_none() {
            self.position = Some(position);
        }
        self
    }

    /// The coarse run status this error maps to.
    pub fn status(&self) -> RunStatus {
        match self.kind {
            ErrorKind::Syntax => RunStatus::CompileError,
            _ => RunStatus::RuntimeError,
        }
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(pos) => write!(f, "line {}: {}", pos.line, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ScriptError {}

/// Result type for script operations.
pub type ScriptResult<T> = Result<T, ScriptError>;
