//! Error types raised at the native interop boundary

use std::path::PathBuf;
use thiserror::Error;

/// Faults detected while validating slot access from native code.
///
/// These describe protocol violations (bad index, wrong type) rather than
/// script-level failures; the call context decides how each one surfaces.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    /// Slot index is outside the current window.
    #[error("slot index {index} out of bounds for window of {len}")]
    OutOfBounds {
        /// Requested slot index.
        index: usize,
        /// Window length at the time of access.
        len: usize,
    },
    /// Slot held a value of a different type than requested.
    #[error("expected {expected} in slot {index}, found {found}")]
    TypeMismatch {
        /// Requested slot index.
        index: usize,
        /// Type name the caller asked for.
        expected: &'static str,
        /// Type name actually present.
        found: &'static str,
    },
    /// Slot held a number that is not representable as an integer.
    #[error("number in slot {index} is not an integer")]
    NotAnInteger {
        /// Requested slot index.
        index: usize,
    },
}

/// Faults detected while releasing a handle token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HandleFault {
    /// Token was valid once but has already been released.
    #[error("handle {0} has already been released")]
    Stale(u64),
    /// Token was never issued by this table.
    #[error("handle {0} was never issued")]
    Unknown(u64),
}

/// Failures reported while registering classes, functions, or modules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A module with this name already exists.
    #[error("module '{0}' is already registered")]
    DuplicateModule(String),
    /// A member with this name already exists in the module.
    #[error("module '{module}' already has a member named '{member}'")]
    DuplicateMember {
        /// Module being added to.
        module: String,
        /// Conflicting member name.
        member: String,
    },
    /// The module has been published and no longer accepts members.
    #[error("module '{0}' is published and cannot be modified")]
    ModuleFrozen(String),
    /// Referenced module id does not name a live module.
    #[error("module id {0} is not registered")]
    UnknownModule(u32),
    /// Referenced class id does not name a registered class.
    #[error("class id {0} is not registered")]
    UnknownClass(u32),
}

/// Failures reported while loading a dynamic extension library.
#[derive(Debug, Error)]
pub enum ExtensionError {
    /// The shared library could not be opened.
    #[error("cannot open extension '{}': {source}", .path.display())]
    Open {
        /// Path that was attempted.
        path: PathBuf,
        /// Loader error from the platform.
        #[source]
        source: libloading::Error,
    },
    /// The library does not export the required entry symbol.
    #[error("extension '{}' does not export an entry point", .path.display())]
    MissingEntry {
        /// Path of the offending library.
        path: PathBuf,
    },
    /// The extension was built against a different ABI revision.
    #[error("extension '{}' targets ABI version {found}, host provides {expected}", .path.display())]
    AbiMismatch {
        /// Path of the offending library.
        path: PathBuf,
        /// Version the extension declared.
        found: u32,
        /// Version this host implements.
        expected: u32,
    },
    /// The entry point ran but failed to produce a valid module.
    #[error("extension '{}' entry point failed: {reason}", .path.display())]
    Entry {
        /// Path of the offending library.
        path: PathBuf,
        /// Human-readable failure description.
        reason: String,
    },
    /// Registration of the extension's module failed.
    #[error("extension registration failed")]
    Register(#[source] RegistryError),
}

/// Failure signal returned by native callbacks.
///
/// `Raised` means the callback already recorded a script error through
/// [`crate::NativeCall::raise`]; the VM converts it into a runtime error
/// using that record. `Protocol` carries a slot fault that was detected
/// but could not be attributed to a recorded error.
#[derive(Debug)]
pub enum NativeError {
    /// A script error has been recorded on the call context.
    Raised,
    /// A slot protocol violation with no recorded script error.
    Protocol(SlotError),
}

impl From<SlotError> for NativeError {
    fn from(fault: SlotError) -> Self {
        NativeError::Protocol(fault)
    }
}
