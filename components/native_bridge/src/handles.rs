//! Handle table - counted roots for values held outside the VM
//!
//! Native code may keep a script value alive across calls by acquiring a
//! handle for it. Each handle is an opaque token; releasing it drops one
//! reference. Heap-backed values (instances, classes, modules, functions)
//! share a single root entry per identity so the table stays small no
//! matter how many handles point at the same object.

use crate::error::HandleFault;
use core_types::Value;
use std::collections::HashMap;

/// Identity key for a rooted value.
///
/// Heap-backed values root by id so repeated acquires share one entry.
/// Primitives have no identity, so each acquire gets its own token-keyed
/// entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RootKey {
    Instance(u32),
    Class(u32),
    Module(u32),
    Fn(u32),
    Token(u64),
}

#[derive(Debug)]
struct RootEntry {
    value: Value,
    strong: u32,
}

/// An opaque token naming one acquired reference.
///
/// Handles are deliberately not `Clone`: each token stands for exactly one
/// acquire and is consumed by [`HandleTable::release`]. Hosts that need a
/// raw integer (for the C ABI) use [`Handle::raw`] and release through
/// [`HandleTable::release_raw`].
#[derive(Debug, PartialEq, Eq)]
pub struct Handle {
    serial: u64,
}

impl Handle {
    /// The raw token value, for transport across the C ABI.
    pub fn raw(&self) -> u64 {
        self.serial
    }
}

/// Root table mapping live handle tokens to retained values.
///
/// # Examples
///
/// ```
/// use native_bridge::HandleTable;
/// use core_types::{InstanceId, Value};
///
/// let mut table = HandleTable::new();
/// let h = table.acquire(Value::Instance(InstanceId(3)));
/// assert_eq!(table.get(&h), Some(&Value::Instance(InstanceId(3))));
/// table.release(h);
/// assert_eq!(table.live_count(), 0);
/// ```
#[derive(Debug, Default)]
pub struct HandleTable {
    roots: HashMap<RootKey, RootEntry>,
    live: HashMap<u64, RootKey>,
    next_serial: u64,
}

impl HandleTable {
    /// Create an empty table. Serials start at 1 so 0 can act as a
    /// failure sentinel across the C ABI.
    pub fn new() -> Self {
        HandleTable {
            roots: HashMap::new(),
            live: HashMap::new(),
            next_serial: 1,
        }
    }

    fn key_for(&mut self, value: &Value, serial: u64) -> RootKey {
        match value {
            Value::Instance(id) => RootKey::Instance(id.0),
            Value::Class(id) => RootKey::Class(id.0),
            Value::Module(id) => RootKey::Module(id.0),
            Value::Fn(id) => RootKey::Fn(id.0),
            _ => RootKey::Token(serial),
        }
    }

    /// Root `value` and return a fresh token for it.
    pub fn acquire(&mut self, value: Value) -> Handle {
        let serial = self.next_serial;
        self.next_serial += 1;
        let key = self.key_for(&value, serial);
        self.live.insert(serial, key);
        self.roots
            .entry(key)
            .and_modify(|e| e.strong += 1)
            .or_insert(RootEntry { value, strong: 1 });
        Handle { serial }
    }

    /// Read the value a live handle refers to.
    pub fn get(&self, handle: &Handle) -> Option<&Value> {
        self.get_raw(handle.serial)
    }

    /// Read the value behind a raw token, for C ABI callers.
    pub fn get_raw(&self, raw: u64) -> Option<&Value> {
        let key = self.live.get(&raw)?;
        self.roots.get(key).map(|e| &e.value)
    }

    /// Release a handle, consuming the token.
    pub fn release(&mut self, handle: Handle) {
        // A Handle can only exist for a token this table issued and has
        // not yet released, so this cannot fault.
        let _ = self.release_raw(handle.serial);
    }

    /// Release by raw token, reporting stale and unknown tokens.
    ///
    /// `Stale` means the token was issued and already released; `Unknown`
    /// means it was never issued at all. Both leave the table unchanged.
    pub fn release_raw(&mut self, raw: u64) -> Result<(), HandleFault> {
        match self.live.remove(&raw) {
            Some(key) => {
                let drop_entry = match self.roots.get_mut(&key) {
                    Some(entry) => {
                        entry.strong -= 1;
                        entry.strong == 0
                    }
                    None => false,
                };
                if drop_entry {
                    self.roots.remove(&key);
                }
                Ok(())
            }
            None => {
                if raw != 0 && raw < self.next_serial {
                    Err(HandleFault::Stale(raw))
                } else {
                    Err(HandleFault::Unknown(raw))
                }
            }
        }
    }

    /// Number of live (unreleased) handle tokens.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Strong count of the root a live handle shares, 0 for a released
    /// handle.
    pub fn strong_count(&self, handle: &Handle) -> u32 {
        self.live
            .get(&handle.serial)
            .and_then(|key| self.roots.get(key))
            .map_or(0, |e| e.strong)
    }

    /// Iterate every rooted value, for GC root marking.
    pub fn roots(&self) -> impl Iterator<Item = &Value> {
        self.roots.values().map(|e| &e.value)
    }

    /// Empty the table, returning the values that were still rooted.
    ///
    /// Used at context teardown to diagnose leaked handles.
    pub fn drain(&mut self) -> Vec<Value> {
        self.live.clear();
        self.roots.drain().map(|(_, e)| e.value).collect()
    }
}

/// RAII wrapper that releases its handle when dropped.
///
/// Borrows the table for its lifetime, so scoped roots suit short host
/// sections that must not leak on early return. Longer-lived retention
/// uses bare [`Handle`] tokens instead.
#[derive(Debug)]
pub struct ScopedRoot<'t> {
    table: &'t mut HandleTable,
    handle: Option<Handle>,
}

impl<'t> ScopedRoot<'t> {
    /// Root `value` in `table` for the lifetime of the wrapper.
    pub fn new(table: &'t mut HandleTable, value: Value) -> Self {
        let handle = table.acquire(value);
        ScopedRoot {
            table,
            handle: Some(handle),
        }
    }

    /// Read the rooted value.
    pub fn value(&self) -> &Value {
        // The handle is live for the whole wrapper lifetime.
        let handle = self.handle.as_ref().unwrap();
        self.table.get(handle).unwrap()
    }
}

impl Drop for ScopedRoot<'_> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.table.release(handle);
        }
    }
}
