//! Identifier newtypes for registry-managed objects.
//!
//! Scripts and hosts refer to classes, modules, functions, and instances
//! through small copyable ids rather than pointers. The registries that
//! assign an id are the only authority on whether it is still valid.

/// Identifier of a native class in the class registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(pub u32);

/// Identifier of a module in the module registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleId(pub u32);

/// Identifier of a native function in the module registry's function table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FnId(pub u32);

/// Identifier of a native instance on the heap.
///
/// Instance ids index heap slots and are reused after collection. A host
/// that keeps a `Value::Instance` across calls must root it in the handle
/// table, otherwise the id may be collected out from under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(pub u32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_copy_and_comparable() {
        let a = ClassId(1);
        let b = a;
        assert_eq!(a, b);
        assert_ne!(ModuleId(0), ModuleId(1));
        assert_eq!(InstanceId(7), InstanceId(7));
        assert_ne!(FnId(2), FnId(3));
    }
}
