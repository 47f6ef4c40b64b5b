//! Slab heap of native instance shells.
//!
//! Instances live in a slab indexed by `InstanceId`. A shell is created
//! first, the payload is attached once the class allocator has run, and the
//! interpreter's collector drives the mark and sweep phases from outside.

use core_types::{ClassId, InstanceId};

use crate::payload::Payload;

/// One live instance on the heap.
#[derive(Debug)]
struct InstanceCell {
    /// Class that allocated this instance
    class: ClassId,
    /// Native state; `None` between shell creation and allocator completion,
    /// and taken exactly once at sweep or teardown
    payload: Option<Payload>,
    /// Mark bit for the current collection cycle
    marked: bool,
}

/// Allocation and collection counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapStats {
    /// Number of live instances
    pub live_instances: usize,
    /// Payload bytes currently accounted for
    pub bytes_allocated: usize,
    /// Collections performed over the heap's lifetime
    pub collections: usize,
}

/// The native instance heap.
///
/// Ids are slab indexes and are reused after collection; the handle table
/// is what keeps host-held ids valid. The heap itself never traces values:
/// the interpreter marks roots, the heap sweeps.
#[derive(Debug, Default)]
pub struct Heap {
    /// Instance slots, `None` where an id is free
    slots: Vec<Option<InstanceCell>>,
    /// Free slot indexes available for reuse
    free: Vec<u32>,
    /// Total payload bytes accounted for
    bytes_allocated: usize,
    /// Completed collection cycles
    collections: usize,
}

impl Heap {
    /// Creates an empty heap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an instance shell for `class`, with no payload yet.
    pub fn allocate(&mut self, class: ClassId) -> InstanceId {
        let cell = InstanceCell {
            class,
            payload: None,
            marked: false,
        };
        match self.free.pop() {
            Some(index) => {
                self.slots[index as usize] = Some(cell);
                InstanceId(index)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Some(cell));
                InstanceId(index)
            }
        }
    }

    /// Remove a shell whose allocator failed, without any finalization.
    pub fn discard(&mut self, id: InstanceId) {
        if let Some(slot) = self.slots.get_mut(id.0 as usize) {
            if let Some(cell) = slot.take() {
                if let Some(payload) = cell.payload {
                    self.bytes_allocated -= payload.bytes();
                }
                self.free.push(id.0);
            }
        }
    }

    /// Attach the allocator's payload to a shell.
    ///
    /// Returns false if the id is not live.
    pub fn attach_payload(&mut self, id: InstanceId, payload: Payload) -> bool {
        match self.cell_mut(id) {
            Some(cell) => {
                self.bytes_allocated += payload.bytes();
                cell.payload = Some(payload);
                true
            }
            None => false,
        }
    }

    /// The class of a live instance.
    pub fn class_of(&self, id: InstanceId) -> Option<ClassId> {
        self.cell(id).map(|cell| cell.class)
    }

    /// Whether the id refers to a live instance.
    pub fn contains(&self, id: InstanceId) -> bool {
        self.cell(id).is_some()
    }

    /// Borrow an instance's payload.
    pub fn payload(&self, id: InstanceId) -> Option<&Payload> {
        self.cell(id).and_then(|cell| cell.payload.as_ref())
    }

    /// Mutably borrow an instance's payload.
    pub fn payload_mut(&mut self, id: InstanceId) -> Option<&mut Payload> {
        self.cell_mut(id).and_then(|cell| cell.payload.as_mut())
    }

    /// Clear all mark bits ahead of a collection cycle.
    pub fn clear_marks(&mut self) {
        for cell in self.slots.iter_mut().flatten() {
            cell.marked = false;
        }
    }

    /// Mark an instance as reachable.
    pub fn mark(&mut self, id: InstanceId) {
        if let Some(cell) = self.cell_mut(id) {
            cell.marked = true;
        }
    }

    /// Remove every unmarked instance.
    ///
    /// Returns the class and payload of each swept instance so the caller
    /// can run finalizers. Shells that never completed allocation are
    /// dropped silently; taking the payload out of the cell is what makes
    /// a second finalization impossible.
    pub fn sweep(&mut self) -> Vec<(ClassId, Payload)> {
        let mut dead = Vec::new();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if matches!(slot, Some(cell) if cell.marked) {
                continue;
            }
            if let Some(cell) = slot.take() {
                if let Some(payload) = cell.payload {
                    self.bytes_allocated -= payload.bytes();
                    dead.push((cell.class, payload));
                }
                self.free.push(index as u32);
            }
        }
        self.collections += 1;
        dead
    }

    /// Remove every instance regardless of marks, for context teardown.
    pub fn drain(&mut self) -> Vec<(ClassId, Payload)> {
        let mut all = Vec::new();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(cell) = slot.take() {
                if let Some(payload) = cell.payload {
                    self.bytes_allocated -= payload.bytes();
                    all.push((cell.class, payload));
                }
                self.free.push(index as u32);
            }
        }
        all
    }

    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Whether the heap holds no instances.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Payload bytes currently accounted for.
    pub fn bytes_allocated(&self) -> usize {
        self.bytes_allocated
    }

    /// Current counters.
    pub fn stats(&self) -> HeapStats {
        HeapStats {
            live_instances: self.len(),
            bytes_allocated: self.bytes_allocated,
            collections: self.collections,
        }
    }

    /// Iterate over all live instance ids.
    pub fn ids(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(index, _)| InstanceId(index as u32))
    }

    fn cell(&self, id: InstanceId) -> Option<&InstanceCell> {
        self.slots.get(id.0 as usize).and_then(|slot| slot.as_ref())
    }

    fn cell_mut(&mut self, id: InstanceId) -> Option<&mut InstanceCell> {
        self.slots
            .get_mut(id.0 as usize)
            .and_then(|slot| slot.as_mut())
    }
}
