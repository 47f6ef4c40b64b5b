//! Versioned C ABI for dynamic extensions
//!
//! Extensions never link against VM internals. At load time the host
//! hands the entry point a pointer to a [`NativeApiTable`], a fixed
//! `#[repr(C)]` table of function pointers, together with an opaque
//! registration context. Callbacks registered through the table later
//! receive an opaque [`RawNativeCall`] they pass back through the same
//! table to touch slots, raise errors, and manage handles.
//!
//! Strings cross the boundary as UTF-8 pointer/length pairs, never
//! null-terminated. Ids cross as plain integers with [`INVALID_ID`] as
//! the failure sentinel, and handles as `u64` tokens where 0 means
//! failure.

use crate::call::{NativeCall, NativeImpl};
use crate::error::NativeError;
use crate::modules::ModuleRegistry;
use core_types::{ErrorKind, ModuleId, Value};

/// ABI revision this host implements. An extension declaring any other
/// revision is refused at load time.
pub const NATIVE_ABI_VERSION: u32 = 1;

/// Sentinel returned by table functions that mint ids, when the
/// operation failed.
pub const INVALID_ID: u32 = u32::MAX;

/// Status codes returned by extension callbacks and fallible table
/// functions.
pub mod ext_status {
    /// The operation completed.
    pub const OK: u32 = 0;
    /// The operation failed; callbacks raise before returning this.
    pub const ERROR: u32 = 1;
}

/// Opaque call context passed to extension callbacks.
#[repr(C)]
pub struct RawNativeCall {
    _opaque: [u8; 0],
}

/// Opaque registration context passed to extension entry points.
#[repr(C)]
pub struct RawExtensionCtx {
    _opaque: [u8; 0],
}

/// Signature of a callback registered by an extension.
pub type ExternNativeFn = extern "C" fn(*mut RawNativeCall) -> u32;

/// Signature of the extension entry point exported under
/// [`crate::EXTENSION_ENTRY_SYMBOL`].
pub type ExtEntryFn =
    unsafe extern "C" fn(*const NativeApiTable, *mut RawExtensionCtx) -> ExtensionDecl;

/// What an extension entry point reports back to the loader.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ExtensionDecl {
    /// ABI revision the extension was built against.
    pub abi_version: u32,
    /// Id of the module the extension registered, or [`INVALID_ID`] if
    /// registration failed.
    pub module: u32,
}

/// The function table handed to extension entry points.
///
/// Table functions taking a [`RawNativeCall`] are only valid on the
/// pointer given to the currently running callback. String pointers
/// returned by `get_str` stay valid until the slot they came from is
/// overwritten or the callback returns, whichever comes first.
#[repr(C)]
pub struct NativeApiTable {
    /// ABI revision of this table.
    pub version: u32,
    /// Byte size of this table, for forward-compatible probing.
    pub size: u32,
    /// Create a module owned by the loading extension. Returns its id
    /// or [`INVALID_ID`].
    pub new_module:
        unsafe extern "C" fn(ctx: *mut RawExtensionCtx, name_ptr: *const u8, name_len: u32) -> u32,
    /// Register a function on a module created through this context.
    /// Returns the function id or [`INVALID_ID`].
    pub add_function: unsafe extern "C" fn(
        ctx: *mut RawExtensionCtx,
        module: u32,
        name_ptr: *const u8,
        name_len: u32,
        arity: u32,
        func: ExternNativeFn,
    ) -> u32,
    /// Slot count of the current call window.
    pub slot_count: unsafe extern "C" fn(call: *mut RawNativeCall) -> u32,
    /// Grow the current call window to at least `len` slots.
    pub reserve_slots: unsafe extern "C" fn(call: *mut RawNativeCall, len: u32),
    /// Read a boolean slot into `out`.
    pub get_bool:
        unsafe extern "C" fn(call: *mut RawNativeCall, slot: u32, out: *mut bool) -> u32,
    /// Read a number slot into `out`.
    pub get_num: unsafe extern "C" fn(call: *mut RawNativeCall, slot: u32, out: *mut f64) -> u32,
    /// Borrow a string slot as a pointer/length pair.
    pub get_str: unsafe extern "C" fn(
        call: *mut RawNativeCall,
        slot: u32,
        out_ptr: *mut *const u8,
        out_len: *mut usize,
    ) -> u32,
    /// Write `null` into a slot.
    pub set_null: unsafe extern "C" fn(call: *mut RawNativeCall, slot: u32),
    /// Write a boolean into a slot.
    pub set_bool: unsafe extern "C" fn(call: *mut RawNativeCall, slot: u32, value: bool),
    /// Write a number into a slot.
    pub set_num: unsafe extern "C" fn(call: *mut RawNativeCall, slot: u32, value: f64),
    /// Write a UTF-8 string into a slot.
    pub set_str:
        unsafe extern "C" fn(call: *mut RawNativeCall, slot: u32, ptr: *const u8, len: usize),
    /// Record a runtime error for the current call.
    pub raise:
        unsafe extern "C" fn(call: *mut RawNativeCall, msg_ptr: *const u8, msg_len: usize),
    /// Root the value in a slot and return its handle token, or 0.
    pub acquire_slot: unsafe extern "C" fn(call: *mut RawNativeCall, slot: u32) -> u64,
    /// Release a handle token.
    pub release_handle: unsafe extern "C" fn(call: *mut RawNativeCall, handle: u64) -> u32,
    /// Write the value behind a handle token into a slot.
    pub set_handle:
        unsafe extern "C" fn(call: *mut RawNativeCall, slot: u32, handle: u64) -> u32,
}

/// VM-side registration context behind [`RawExtensionCtx`].
///
/// Tracks every module the entry point creates so the loader can
/// publish them all on success or remove them all on failure.
pub(crate) struct ExtensionCtx<'a> {
    modules: &'a mut ModuleRegistry,
    created: Vec<ModuleId>,
}

impl<'a> ExtensionCtx<'a> {
    pub(crate) fn new(modules: &'a mut ModuleRegistry) -> Self {
        ExtensionCtx {
            modules,
            created: Vec::new(),
        }
    }

    pub(crate) fn created(&self) -> &[ModuleId] {
        &self.created
    }
}

/// The one table instance handed to every extension.
pub(crate) static API_TABLE: NativeApiTable = NativeApiTable {
    version: NATIVE_ABI_VERSION,
    size: std::mem::size_of::<NativeApiTable>() as u32,
    new_module: raw_new_module,
    add_function: raw_add_function,
    slot_count: raw_slot_count,
    reserve_slots: raw_reserve_slots,
    get_bool: raw_get_bool,
    get_num: raw_get_num,
    get_str: raw_get_str,
    set_null: raw_set_null,
    set_bool: raw_set_bool,
    set_num: raw_set_num,
    set_str: raw_set_str,
    raise: raw_raise,
    acquire_slot: raw_acquire_slot,
    release_handle: raw_release_handle,
    set_handle: raw_set_handle,
};

/// Run an extension callback against a live call context.
pub(crate) fn invoke_extern(
    f: ExternNativeFn,
    call: &mut NativeCall<'_>,
) -> Result<(), NativeError> {
    let raw = (call as *mut NativeCall<'_>).cast::<RawNativeCall>();
    let status = f(raw);
    if status == ext_status::OK {
        Ok(())
    } else {
        Err(NativeError::Raised)
    }
}

/// Recover the call context from its opaque pointer.
///
/// # Safety
///
/// `raw` must be the pointer minted by [`invoke_extern`] for the
/// currently running callback, and must not be used after that callback
/// returns.
unsafe fn call_mut<'a>(raw: *mut RawNativeCall) -> &'a mut NativeCall<'a> {
    unsafe { &mut *raw.cast::<NativeCall<'a>>() }
}

/// Recover the registration context from its opaque pointer.
///
/// # Safety
///
/// `raw` must be the pointer minted by the loader for the currently
/// running entry point.
unsafe fn ctx_mut<'a>(raw: *mut RawExtensionCtx) -> &'a mut ExtensionCtx<'a> {
    unsafe { &mut *raw.cast::<ExtensionCtx<'a>>() }
}

/// Read a UTF-8 string from a pointer/length pair.
///
/// # Safety
///
/// `ptr` must point to `len` readable bytes when non-null.
unsafe fn str_from_raw<'a>(ptr: *const u8, len: usize) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    let bytes = unsafe { std::slice::from_raw_parts(ptr, len) };
    std::str::from_utf8(bytes).ok()
}

unsafe extern "C" fn raw_new_module(
    ctx: *mut RawExtensionCtx,
    name_ptr: *const u8,
    name_len: u32,
) -> u32 {
    // SAFETY: the loader keeps the context alive for the entry call.
    let ctx = unsafe { ctx_mut(ctx) };
    let Some(name) = (unsafe { str_from_raw(name_ptr, name_len as usize) }) else {
        return INVALID_ID;
    };
    match ctx.modules.create(name) {
        Ok(id) => {
            ctx.created.push(id);
            id.0
        }
        Err(_) => INVALID_ID,
    }
}

unsafe extern "C" fn raw_add_function(
    ctx: *mut RawExtensionCtx,
    module: u32,
    name_ptr: *const u8,
    name_len: u32,
    arity: u32,
    func: ExternNativeFn,
) -> u32 {
    // SAFETY: the loader keeps the context alive for the entry call.
    let ctx = unsafe { ctx_mut(ctx) };
    let Some(name) = (unsafe { str_from_raw(name_ptr, name_len as usize) }) else {
        return INVALID_ID;
    };
    if arity > u32::from(u8::MAX) {
        return INVALID_ID;
    }
    let id = ModuleId(module);
    // Extensions may only touch modules they created themselves.
    if !ctx.created.contains(&id) {
        return INVALID_ID;
    }
    match ctx
        .modules
        .add_function(id, name, arity as u8, NativeImpl::Extern(func))
    {
        Ok(fn_id) => fn_id.0,
        Err(_) => INVALID_ID,
    }
}

unsafe extern "C" fn raw_slot_count(call: *mut RawNativeCall) -> u32 {
    // SAFETY: callbacks receive this pointer from invoke_extern.
    let call = unsafe { call_mut(call) };
    call.slot_count() as u32
}

unsafe extern "C" fn raw_reserve_slots(call: *mut RawNativeCall, len: u32) {
    // SAFETY: callbacks receive this pointer from invoke_extern.
    let call = unsafe { call_mut(call) };
    call.reserve(len as usize);
}

unsafe extern "C" fn raw_get_bool(call: *mut RawNativeCall, slot: u32, out: *mut bool) -> u32 {
    // SAFETY: callbacks receive this pointer from invoke_extern.
    let call = unsafe { call_mut(call) };
    match call.slot_bool(slot as usize) {
        Ok(value) => {
            if !out.is_null() {
                // SAFETY: the caller owns the out pointer.
                unsafe { *out = value };
            }
            ext_status::OK
        }
        Err(_) => ext_status::ERROR,
    }
}

unsafe extern "C" fn raw_get_num(call: *mut RawNativeCall, slot: u32, out: *mut f64) -> u32 {
    // SAFETY: callbacks receive this pointer from invoke_extern.
    let call = unsafe { call_mut(call) };
    match call.slot_num(slot as usize) {
        Ok(value) => {
            if !out.is_null() {
                // SAFETY: the caller owns the out pointer.
                unsafe { *out = value };
            }
            ext_status::OK
        }
        Err(_) => ext_status::ERROR,
    }
}

unsafe extern "C" fn raw_get_str(
    call: *mut RawNativeCall,
    slot: u32,
    out_ptr: *mut *const u8,
    out_len: *mut usize,
) -> u32 {
    // SAFETY: callbacks receive this pointer from invoke_extern.
    let call = unsafe { call_mut(call) };
    match call.borrow_str(slot as usize) {
        Some(text) => {
            if !out_ptr.is_null() && !out_len.is_null() {
                // SAFETY: the caller owns both out pointers. The slot
                // keeps the buffer alive until overwritten.
                unsafe {
                    *out_ptr = text.as_ptr();
                    *out_len = text.len();
                }
            }
            ext_status::OK
        }
        None => {
            // Drive the typed accessor so the right error is recorded.
            let _ = call.slot_str(slot as usize);
            ext_status::ERROR
        }
    }
}

unsafe extern "C" fn raw_set_null(call: *mut RawNativeCall, slot: u32) {
    // SAFETY: callbacks receive this pointer from invoke_extern.
    let call = unsafe { call_mut(call) };
    let _ = call.set_null(slot as usize);
}

unsafe extern "C" fn raw_set_bool(call: *mut RawNativeCall, slot: u32, value: bool) {
    // SAFETY: callbacks receive this pointer from invoke_extern.
    let call = unsafe { call_mut(call) };
    let _ = call.set_bool(slot as usize, value);
}

unsafe extern "C" fn raw_set_num(call: *mut RawNativeCall, slot: u32, value: f64) {
    // SAFETY: callbacks receive this pointer from invoke_extern.
    let call = unsafe { call_mut(call) };
    let _ = call.set_num(slot as usize, value);
}

unsafe extern "C" fn raw_set_str(
    call: *mut RawNativeCall,
    slot: u32,
    ptr: *const u8,
    len: usize,
) {
    // SAFETY: callbacks receive this pointer from invoke_extern.
    let call = unsafe { call_mut(call) };
    let Some(text) = (unsafe { str_from_raw(ptr, len) }) else {
        let _ = call.raise(ErrorKind::Type, "set_str received invalid UTF-8");
        return;
    };
    let _ = call.set_slot(slot as usize, Value::str(text));
}

unsafe extern "C" fn raw_raise(call: *mut RawNativeCall, msg_ptr: *const u8, msg_len: usize) {
    // SAFETY: callbacks receive this pointer from invoke_extern.
    let call = unsafe { call_mut(call) };
    let message = unsafe { str_from_raw(msg_ptr, msg_len) }
        .unwrap_or("extension raised with an invalid message");
    let _ = call.raise(ErrorKind::Native, message);
}

unsafe extern "C" fn raw_acquire_slot(call: *mut RawNativeCall, slot: u32) -> u64 {
    // SAFETY: callbacks receive this pointer from invoke_extern.
    let call = unsafe { call_mut(call) };
    let value = match call.slot(slot as usize) {
        Some(value) => value.clone(),
        None => return 0,
    };
    call.acquire(value).raw()
}

unsafe extern "C" fn raw_release_handle(call: *mut RawNativeCall, handle: u64) -> u32 {
    // SAFETY: callbacks receive this pointer from invoke_extern.
    let call = unsafe { call_mut(call) };
    match call.release_raw(handle) {
        Ok(()) => ext_status::OK,
        Err(_) => ext_status::ERROR,
    }
}

unsafe extern "C" fn raw_set_handle(call: *mut RawNativeCall, slot: u32, handle: u64) -> u32 {
    // SAFETY: callbacks receive this pointer from invoke_extern.
    let call = unsafe { call_mut(call) };
    let Some(value) = call.handle_value(handle) else {
        return ext_status::ERROR;
    };
    match call.set_slot(slot as usize, value) {
        Ok(()) => ext_status::OK,
        Err(_) => ext_status::ERROR,
    }
}
