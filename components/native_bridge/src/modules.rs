//! Module registry
//!
//! Modules are named collections of functions, classes, and plain values.
//! A module starts in the building state, accepts members, and is then
//! published. Published modules are frozen and become visible to scripts;
//! building modules never are, which lets a failed extension load vanish
//! without a trace.

use crate::call::NativeImpl;
use crate::error::RegistryError;
use core_types::{FnId, ModuleId, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModuleState {
    Building,
    Published,
}

/// One registered module.
#[derive(Debug)]
pub struct Module {
    name: String,
    state: ModuleState,
    members: HashMap<String, Value>,
}

impl Module {
    /// The module's registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True once the module has been published.
    pub fn is_published(&self) -> bool {
        self.state == ModuleState::Published
    }

    /// Look up a member by name.
    pub fn member(&self, name: &str) -> Option<&Value> {
        self.members.get(name)
    }

    /// Iterate members as `(name, value)` pairs.
    pub fn members(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.members.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// One registered module-level native function.
#[derive(Debug, Clone)]
pub struct FnEntry {
    /// Qualified name used in stack traces, e.g. `core.print`.
    pub name: String,
    /// Number of arguments the function expects.
    pub arity: u8,
    /// The callback behind the function.
    pub imp: NativeImpl,
    /// Module the function belongs to.
    pub module: ModuleId,
}

/// Registry of all modules and their function pool.
///
/// Module slots are never reused: a rolled-back module leaves a `None`
/// hole so stale `ModuleId`s cannot alias a later module.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: Vec<Option<Module>>,
    by_name: HashMap<String, ModuleId>,
    fns: Vec<FnEntry>,
}

impl ModuleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        ModuleRegistry {
            modules: Vec::new(),
            by_name: HashMap::new(),
            fns: Vec::new(),
        }
    }

    /// Create a module in the building state, reserving its name.
    pub fn create(&mut self, name: &str) -> Result<ModuleId, RegistryError> {
        if self.by_name.contains_key(name) {
            return Err(RegistryError::DuplicateModule(name.to_string()));
        }
        let id = ModuleId(self.modules.len() as u32);
        self.modules.push(Some(Module {
            name: name.to_string(),
            state: ModuleState::Building,
            members: HashMap::new(),
        }));
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    fn module_mut(&mut self, id: ModuleId) -> Result<&mut Module, RegistryError> {
        self.modules
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(RegistryError::UnknownModule(id.0))
    }

    /// Check that `member` could be added to `module` right now.
    ///
    /// Callers that must register elsewhere before calling
    /// [`ModuleRegistry::add_member`] use this to fail early instead of
    /// leaving half-registered state behind.
    pub fn check_member_free(&self, id: ModuleId, member: &str) -> Result<(), RegistryError> {
        let module = self
            .modules
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .ok_or(RegistryError::UnknownModule(id.0))?;
        if module.state == ModuleState::Published {
            return Err(RegistryError::ModuleFrozen(module.name.clone()));
        }
        if module.members.contains_key(member) {
            return Err(RegistryError::DuplicateMember {
                module: module.name.clone(),
                member: member.to_string(),
            });
        }
        Ok(())
    }

    /// Add a named member to a building module.
    pub fn add_member(
        &mut self,
        id: ModuleId,
        name: &str,
        value: Value,
    ) -> Result<(), RegistryError> {
        self.check_member_free(id, name)?;
        let module = self.module_mut(id)?;
        module.members.insert(name.to_string(), value);
        Ok(())
    }

    /// Register a native function and add it to the module's members.
    pub fn add_function(
        &mut self,
        id: ModuleId,
        name: &str,
        arity: u8,
        imp: NativeImpl,
    ) -> Result<FnId, RegistryError> {
        self.check_member_free(id, name)?;
        let module = self.module_mut(id)?;
        let qualified = format!("{}.{}", module.name, name);
        let fn_id = FnId(self.fns.len() as u32);
        module.members.insert(name.to_string(), Value::Fn(fn_id));
        self.fns.push(FnEntry {
            name: qualified,
            arity,
            imp,
            module: id,
        });
        Ok(fn_id)
    }

    /// Freeze a module and make it visible to scripts.
    pub fn publish(&mut self, id: ModuleId) -> Result<(), RegistryError> {
        let module = self.module_mut(id)?;
        if module.state == ModuleState::Published {
            return Err(RegistryError::ModuleFrozen(module.name.clone()));
        }
        module.state = ModuleState::Published;
        Ok(())
    }

    /// Drop a module that is still building, releasing its name.
    ///
    /// Published modules are permanent; this returns `false` for them.
    /// Function-pool entries owned by the removed module stay in the pool
    /// but become unreachable once its members are gone.
    pub fn remove_building(&mut self, id: ModuleId) -> bool {
        let removable = matches!(
            self.modules.get(id.0 as usize).and_then(Option::as_ref),
            Some(m) if m.state == ModuleState::Building
        );
        if removable {
            if let Some(slot) = self.modules.get_mut(id.0 as usize) {
                if let Some(module) = slot.take() {
                    self.by_name.remove(&module.name);
                }
            }
        }
        removable
    }

    /// Look up a module by id.
    pub fn get(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(id.0 as usize).and_then(Option::as_ref)
    }

    /// Resolve a published module by name. Building modules are
    /// invisible here; scripts can never observe one.
    pub fn lookup_published(&self, name: &str) -> Option<ModuleId> {
        let id = *self.by_name.get(name)?;
        match self.get(id) {
            Some(m) if m.is_published() => Some(id),
            _ => None,
        }
    }

    /// Read a member of a module.
    pub fn member(&self, id: ModuleId, name: &str) -> Option<&Value> {
        self.get(id)?.member(name)
    }

    /// Read a pooled function entry.
    pub fn function(&self, id: FnId) -> Option<&FnEntry> {
        self.fns.get(id.0 as usize)
    }

    /// Number of live modules.
    pub fn module_count(&self) -> usize {
        self.modules.iter().filter(|m| m.is_some()).count()
    }

    /// Iterate every member value of every live module, for GC root
    /// marking. Building modules count: the host may hold one open
    /// across a collection.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.modules
            .iter()
            .filter_map(Option::as_ref)
            .flat_map(|m| m.members.values())
    }
}
