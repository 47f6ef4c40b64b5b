//! Memory Manager - Native instance heap and collection support
//!
//! This component provides:
//! - Payload storage for native instance state (type-erased, byte-accounted)
//! - A slab heap of instance shells with free-list reuse
//! - Mark bits and sweep support for the interpreter's collector
//! - Tracked allocation totals for threshold-driven collection
//!
//! The heap does not trace into payloads: payload state is opaque to the
//! collector, and native code that retains script values inside a payload
//! must root them through the handle table.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod heap;
pub mod payload;

pub use heap::{Heap, HeapStats};
pub use payload::Payload;
