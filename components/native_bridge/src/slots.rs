//! Windowed slot stack - the calling convention for native interop
//!
//! Every native call sees a contiguous window of value slots. Slot 0 holds
//! the receiver (or the function value) on entry and the return value on
//! exit; slots 1..n hold the arguments. Windows nest: a reentrant call
//! pushes a fresh window above the caller's without disturbing it.

use crate::error::SlotError;
use core_types::Value;
use std::rc::Rc;

/// One active call window over the shared slot array.
#[derive(Debug, Clone, Copy)]
struct Window {
    base: usize,
    len: usize,
}

/// Stack of value slots organized into per-call windows.
///
/// All indices taken by the accessor methods are window-relative; the
/// stack translates them against the innermost window. Reads outside the
/// window are refused rather than clamped so that protocol violations
/// from native code surface immediately.
///
/// # Examples
///
/// ```
/// use native_bridge::SlotStack;
/// use core_types::Value;
///
/// let mut slots = SlotStack::new();
/// slots.push_window_with(&[Value::Num(1.0), Value::Num(2.0)]);
/// assert_eq!(slots.len(), 2);
/// assert_eq!(slots.get_num(1), Ok(2.0));
/// slots.pop_window();
/// ```
#[derive(Debug, Default)]
pub struct SlotStack {
    values: Vec<Value>,
    windows: Vec<Window>,
}

impl SlotStack {
    /// Create an empty slot stack with no active window.
    pub fn new() -> Self {
        SlotStack {
            values: Vec::new(),
            windows: Vec::new(),
        }
    }

    /// Push a new window of `len` slots, all initialized to `Null`.
    pub fn push_window(&mut self, len: usize) {
        let base = self.values.len();
        self.values.resize(base + len, Value::Null);
        self.windows.push(Window { base, len });
    }

    /// Push a new window populated from `values` in slot order.
    pub fn push_window_with(&mut self, values: &[Value]) {
        let base = self.values.len();
        self.values.extend_from_slice(values);
        self.windows.push(Window {
            base,
            len: values.len(),
        });
    }

    /// Pop the innermost window, discarding its slots.
    ///
    /// Popping with no window active is a host bug; it is ignored so a
    /// confused embedder cannot corrupt an outer window.
    pub fn pop_window(&mut self) {
        if let Some(window) = self.windows.pop() {
            self.values.truncate(window.base);
        }
    }

    /// Number of nested windows currently active.
    pub fn depth(&self) -> usize {
        self.windows.len()
    }

    /// Length of the innermost window, or 0 when none is active.
    pub fn len(&self) -> usize {
        self.windows.last().map_or(0, |w| w.len)
    }

    /// True when no window is active or the innermost window is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Grow the innermost window to hold at least `len` slots.
    ///
    /// Only the top window may grow, because growth appends to the shared
    /// array. New slots are `Null`; a window never shrinks.
    pub fn reserve(&mut self, len: usize) {
        if let Some(window) = self.windows.last_mut() {
            if len > window.len {
                let grow = len - window.len;
                window.len = len;
                let new_total = self.values.len() + grow;
                self.values.resize(new_total, Value::Null);
            }
        }
    }

    fn resolve(&self, index: usize) -> Result<usize, SlotError> {
        let window = self.windows.last().ok_or(SlotError::OutOfBounds {
            index,
            len: 0,
        })?;
        if index >= window.len {
            return Err(SlotError::OutOfBounds {
                index,
                len: window.len,
            });
        }
        Ok(window.base + index)
    }

    /// Read the value in window slot `index`.
    pub fn get(&self, index: usize) -> Result<&Value, SlotError> {
        let at = self.resolve(index)?;
        Ok(&self.values[at])
    }

    /// Overwrite window slot `index` with `value`.
    pub fn set(&mut self, index: usize, value: Value) -> Result<(), SlotError> {
        let at = self.resolve(index)?;
        self.values[at] = value;
        Ok(())
    }

    /// Move the value out of window slot `index`, leaving `Null` behind.
    pub fn take(&mut self, index: usize) -> Result<Value, SlotError> {
        let at = self.resolve(index)?;
        Ok(std::mem::replace(&mut self.values[at], Value::Null))
    }

    /// Read slot `index` as a boolean.
    pub fn get_bool(&self, index: usize) -> Result<bool, SlotError> {
        match self.get(index)? {
            Value::Bool(b) => Ok(*b),
            other => Err(SlotError::TypeMismatch {
                index,
                expected: "bool",
                found: other.tag().name(),
            }),
        }
    }

    /// Read slot `index` as a number.
    pub fn get_num(&self, index: usize) -> Result<f64, SlotError> {
        match self.get(index)? {
            Value::Num(n) => Ok(*n),
            other => Err(SlotError::TypeMismatch {
                index,
                expected: "number",
                found: other.tag().name(),
            }),
        }
    }

    /// Read slot `index` as an integer-valued number.
    pub fn get_int(&self, index: usize) -> Result<i64, SlotError> {
        let n = self.get_num(index)?;
        if n.fract() == 0.0 && n.is_finite() {
            Ok(n as i64)
        } else {
            Err(SlotError::NotAnInteger { index })
        }
    }

    /// Read slot `index` as a string, sharing the underlying buffer.
    pub fn get_str(&self, index: usize) -> Result<Rc<str>, SlotError> {
        match self.get(index)? {
            Value::Str(s) => Ok(Rc::clone(s)),
            other => Err(SlotError::TypeMismatch {
                index,
                expected: "string",
                found: other.tag().name(),
            }),
        }
    }

    /// Iterate every live slot across all windows, for GC root marking.
    pub fn live(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }
}
