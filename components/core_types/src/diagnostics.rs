//! Run result codes and host-facing diagnostics.

use std::fmt;

/// Coarse result of running a script source.
///
/// This is what embedders branch on; the detailed error goes to the
/// configured report callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The script compiled and ran to completion
    Success,
    /// The source failed to compile
    CompileError,
    /// The script failed while executing
    RuntimeError,
}

/// Category of a reported diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Syntax or lexical error
    CompileError,
    /// Script execution failure
    RuntimeError,
    /// Host misuse of the embedding API (bad slot index, stale handle)
    HostProtocol,
    /// Resources still live at context teardown
    ResourceLeak,
    /// Extension library load failure
    Extension,
}

impl DiagnosticKind {
    /// Short name used when printing the diagnostic.
    pub fn name(self) -> &'static str {
        match self {
            DiagnosticKind::CompileError => "compile error",
            DiagnosticKind::RuntimeError => "runtime error",
            DiagnosticKind::HostProtocol => "host protocol",
            DiagnosticKind::ResourceLeak => "resource leak",
            DiagnosticKind::Extension => "extension",
        }
    }
}

/// A diagnostic delivered to the host's report callback.
///
/// Diagnostics never unwind; they describe a failure that was already
/// contained (an errored run, an ignored protocol violation, a leak
/// noticed at teardown).
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Category of the diagnostic
    pub kind: DiagnosticKind,
    /// Human-readable description
    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic.
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.name(), self.message)
    }
}
