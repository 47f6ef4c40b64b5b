//! Dynamic extension loader
//!
//! An extension is a shared library exporting one entry point under
//! [`EXTENSION_ENTRY_SYMBOL`]. The loader opens the library, hands the
//! entry point the ABI table and a registration context, and then
//! validates what came back: the ABI revision must match and the
//! declared module must be one the entry point actually created.
//! Registration is all or nothing; a failed load removes every module
//! the entry point managed to create before it died.

use crate::api::{
    ExtEntryFn, ExtensionCtx, RawExtensionCtx, API_TABLE, INVALID_ID, NATIVE_ABI_VERSION,
};
use crate::error::ExtensionError;
use crate::modules::ModuleRegistry;
use core_types::ModuleId;
use libloading::{Library, Symbol};
use std::path::{Path, PathBuf};

/// Symbol an extension library must export as its entry point.
pub const EXTENSION_ENTRY_SYMBOL: &[u8] = b"quill_ext_open";

/// One successfully loaded extension.
#[derive(Debug)]
pub struct LoadedExtension {
    path: PathBuf,
    module: ModuleId,
    /// Keeps the library mapped while its callbacks are registered.
    _lib: Library,
}

impl LoadedExtension {
    /// Path the library was loaded from, after platform resolution.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The module this extension registered.
    pub fn module(&self) -> ModuleId {
        self.module
    }
}

/// Loader that opens extension libraries and registers their modules.
///
/// The loader must outlive every call into code it loaded: dropping it
/// unmaps the libraries behind any still-registered callbacks.
#[derive(Debug, Default)]
pub struct ExtensionLoader {
    loaded: Vec<LoadedExtension>,
}

impl ExtensionLoader {
    /// Create a loader with nothing loaded.
    pub fn new() -> Self {
        ExtensionLoader { loaded: Vec::new() }
    }

    /// Load the library at `path` and register the module it declares.
    ///
    /// On success every module the entry point created is published and
    /// the id of the declared one is returned. On any failure they are
    /// all removed, leaving the registry as it was.
    pub fn load(
        &mut self,
        path: &Path,
        modules: &mut ModuleRegistry,
    ) -> Result<ModuleId, ExtensionError> {
        let resolved = resolve_library_path(path);
        // SAFETY: opening a library runs its initializers; the embedder
        // vouches for the file it asked to load.
        let lib = unsafe { Library::new(&resolved) }.map_err(|source| ExtensionError::Open {
            path: resolved.clone(),
            source,
        })?;
        let entry: Symbol<ExtEntryFn> = unsafe { lib.get(EXTENSION_ENTRY_SYMBOL) }.map_err(
            |_| ExtensionError::MissingEntry {
                path: resolved.clone(),
            },
        )?;

        let mut ctx = ExtensionCtx::new(modules);
        let raw = (&mut ctx as *mut ExtensionCtx<'_>).cast::<RawExtensionCtx>();
        // SAFETY: the table is 'static and the context outlives the call.
        let decl = unsafe { entry(&API_TABLE, raw) };
        let created = ctx.created().to_vec();
        drop(ctx);

        if decl.abi_version != NATIVE_ABI_VERSION {
            Self::rollback(modules, &created);
            return Err(ExtensionError::AbiMismatch {
                path: resolved,
                found: decl.abi_version,
                expected: NATIVE_ABI_VERSION,
            });
        }
        if decl.module == INVALID_ID {
            Self::rollback(modules, &created);
            return Err(ExtensionError::Entry {
                path: resolved,
                reason: "entry point reported failure".to_string(),
            });
        }
        let module = ModuleId(decl.module);
        if !created.contains(&module) {
            Self::rollback(modules, &created);
            return Err(ExtensionError::Entry {
                path: resolved,
                reason: "entry point declared a module it did not create".to_string(),
            });
        }

        // Every created module is still building (the ABI exposes no way
        // to publish), so this loop cannot conflict.
        for id in &created {
            if let Err(error) = modules.publish(*id) {
                Self::rollback(modules, &created);
                return Err(ExtensionError::Register(error));
            }
        }

        tracing::info!(
            target: "quill::ext",
            path = %resolved.display(),
            module = module.0,
            "loaded extension"
        );
        self.loaded.push(LoadedExtension {
            path: resolved,
            module,
            _lib: lib,
        });
        Ok(module)
    }

    fn rollback(modules: &mut ModuleRegistry, created: &[ModuleId]) {
        for id in created {
            modules.remove_building(*id);
        }
    }

    /// Extensions loaded so far, in load order.
    pub fn loaded(&self) -> &[LoadedExtension] {
        &self.loaded
    }

    /// Number of loaded extensions.
    pub fn count(&self) -> usize {
        self.loaded.len()
    }
}

/// Resolve a user-supplied extension path to a platform library file.
///
/// A path that already exists or carries a file extension is used as
/// given. Otherwise the platform prefix and suffix are applied to the
/// name, so `ext/trig` becomes `ext/libtrig.so` on Linux.
pub fn resolve_library_path(path: &Path) -> PathBuf {
    if path.exists() || path.extension().is_some() {
        return path.to_path_buf();
    }
    let Some(stem) = path.file_name().and_then(|n| n.to_str()) else {
        return path.to_path_buf();
    };
    let decorated = format!(
        "{}{}{}",
        std::env::consts::DLL_PREFIX,
        stem,
        std::env::consts::DLL_SUFFIX
    );
    path.with_file_name(decorated)
}
