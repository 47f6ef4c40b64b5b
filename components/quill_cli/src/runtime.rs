//! Runtime orchestration for the quill CLI
//!
//! [`Runtime`] wraps a [`Vm`] with the core module installed, funnels
//! every diagnostic into a shared log, and exposes the small surface
//! the argument handling and REPL drive.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use core_types::{Diagnostic, DiagnosticKind, RunStatus, ScriptError, ScriptResult, Value};
use interpreter::{render_error, Vm, VmConfig};

use crate::error::CliResult;

/// Exit code for a clean run.
pub const EXIT_OK: i32 = 0;
/// Exit code for a compile failure, following sysexits EX_DATAERR.
pub const EXIT_COMPILE: i32 = 65;
/// Exit code for a runtime failure, following sysexits EX_SOFTWARE.
pub const EXIT_RUNTIME: i32 = 70;

/// Map a run status to the process exit code.
pub fn exit_code(status: RunStatus) -> i32 {
    match status {
        RunStatus::Success => EXIT_OK,
        RunStatus::CompileError => EXIT_COMPILE,
        RunStatus::RuntimeError => EXIT_RUNTIME,
    }
}

/// Render diagnostics as the JSON array `--json` prints.
pub fn diagnostics_json(diagnostics: &[Diagnostic]) -> String {
    let entries: Vec<serde_json::Value> = diagnostics
        .iter()
        .map(|d| {
            serde_json::json!({
                "kind": d.kind.name(),
                "message": d.message,
            })
        })
        .collect();
    serde_json::Value::Array(entries).to_string()
}

/// A VM prepared for command-line use.
pub struct Runtime {
    vm: Vm,
    diagnostics: Rc<RefCell<Vec<Diagnostic>>>,
    quiet: bool,
}

impl Runtime {
    /// Create a runtime with the core module installed.
    ///
    /// With `quiet` set, diagnostics are only collected; otherwise each
    /// one is also printed to stderr as it arrives.
    pub fn new(quiet: bool) -> CliResult<Self> {
        let diagnostics = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&diagnostics);
        let mut config = VmConfig::default();
        config.report = Box::new(move |diagnostic: Diagnostic| {
            if !quiet {
                eprintln!("quill: {diagnostic}");
            }
            sink.borrow_mut().push(diagnostic);
        });

        let mut vm = Vm::with_config(config);
        builtins::install(&mut vm)?;
        Ok(Self {
            vm,
            diagnostics,
            quiet,
        })
    }

    /// Load a native extension library, recording a failure as an
    /// extension diagnostic.
    pub fn load_extension(&mut self, path: &str) -> CliResult<()> {
        match self.vm.load_extension(Path::new(path)) {
            Ok(_) => Ok(()),
            Err(error) => {
                self.emit(Diagnostic::new(DiagnosticKind::Extension, error.to_string()));
                Err(error.into())
            }
        }
    }

    /// Run a script file; failures go to the diagnostic stream.
    pub fn run_file(&mut self, path: &str) -> RunStatus {
        self.vm.run_file(path)
    }

    /// Evaluate a snippet and hand back its result value.
    pub fn eval(&mut self, source: &str) -> ScriptResult<Value> {
        self.vm.eval(source)
    }

    /// Produce the script-visible string form of a value.
    pub fn stringify(&mut self, value: &Value) -> ScriptResult<String> {
        self.vm.stringify(value)
    }

    /// Record an eval failure the way `run_source` would have, and map
    /// it to its run status.
    pub fn report(&mut self, error: &ScriptError) -> RunStatus {
        let status = error.status();
        let kind = match status {
            RunStatus::CompileError => DiagnosticKind::CompileError,
            _ => DiagnosticKind::RuntimeError,
        };
        self.emit(Diagnostic::new(kind, render_error(error)));
        status
    }

    /// Every diagnostic collected so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    /// Borrow the underlying VM.
    pub fn vm(&mut self) -> &mut Vm {
        &mut self.vm
    }

    fn emit(&mut self, diagnostic: Diagnostic) {
        if !self.quiet {
            eprintln!("quill: {diagnostic}");
        }
        self.diagnostics.borrow_mut().push(diagnostic);
    }
}
