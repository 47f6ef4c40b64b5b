//! Error types for the CLI

use native_bridge::{ExtensionError, RegistryError};
use thiserror::Error;

/// Failures the CLI surfaces outside the script diagnostic stream.
#[derive(Debug, Error)]
pub enum CliError {
    /// Registering the core module failed during startup.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// An extension library failed to load.
    #[error(transparent)]
    Extension(#[from] ExtensionError),

    /// The line editor failed.
    #[error("readline: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;
