//! Integration test suite for the Quill VM
//!
//! This crate provides integration tests that verify components work
//! together correctly across component boundaries, from source text all
//! the way to host-visible results.

/// Re-export components for test convenience
pub mod components {
    pub use builtins;
    pub use bytecode_system;
    pub use core_types;
    pub use interpreter;
    pub use memory_manager;
    pub use native_bridge;
    pub use parser;
    pub use quill_cli;
}
