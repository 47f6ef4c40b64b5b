//! Quill script value representation.
//!
//! This module provides the core `Value` enum that represents all possible
//! Quill values. Primitives are stored inline; registry-managed objects are
//! referenced by id.

use std::fmt;
use std::rc::Rc;

use crate::ids::{ClassId, FnId, InstanceId, ModuleId};

/// Represents any Quill script value.
///
/// Primitive values are stored inline. Strings are immutable and
/// reference-counted, so cloning a `Value` is always cheap. Functions,
/// classes, modules, and native instances are referenced by id; the
/// registries and the heap own the actual records.
///
/// Equality is structural for primitives (IEEE semantics for numbers,
/// content comparison for strings) and identity for id-carrying variants.
///
/// # Examples
///
/// ```
/// use core_types::{TypeTag, Value};
///
/// let n = Value::Num(3.5);
/// let s = Value::str("hello");
///
/// assert!(n.is_truthy());
/// assert_eq!(n.tag(), TypeTag::Num);
/// assert_eq!(s.to_string(), "hello");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The null value
    Null,
    /// Boolean (true or false)
    Bool(bool),
    /// IEEE 754 double-precision number
    Num(f64),
    /// Immutable reference-counted string
    Str(Rc<str>),
    /// Native function reference into the module registry
    Fn(FnId),
    /// Native class reference into the class registry
    Class(ClassId),
    /// Module reference into the module registry
    Module(ModuleId),
    /// Native instance reference onto the heap
    Instance(InstanceId),
}

/// Type name of a [`Value`] variant, used in diagnostics and type checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// The null value
    Null,
    /// Booleans
    Bool,
    /// Numbers
    Num,
    /// Strings
    Str,
    /// Native functions
    Fn,
    /// Native classes
    Class,
    /// Modules
    Module,
    /// Native instances
    Instance,
}

impl TypeTag {
    /// Script-facing name of this type.
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Null => "null",
            TypeTag::Bool => "bool",
            TypeTag::Num => "num",
            TypeTag::Str => "str",
            TypeTag::Fn => "fn",
            TypeTag::Class => "class",
            TypeTag::Module => "module",
            TypeTag::Instance => "instance",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Value {
    /// Build a string value from anything string-like.
    pub fn str(s: impl AsRef<str>) -> Self {
        Value::Str(Rc::from(s.as_ref()))
    }

    /// Returns whether this value is truthy.
    ///
    /// Only `null` and `false` are falsy; every other value, including
    /// `0` and the empty string, is truthy.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_types::Value;
    ///
    /// assert!(!Value::Null.is_truthy());
    /// assert!(!Value::Bool(false).is_truthy());
    /// assert!(Value::Num(0.0).is_truthy());
    /// assert!(Value::str("").is_truthy());
    /// ```
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Null | Value::Bool(false))
    }

    /// The type tag of this value.
    pub fn tag(&self) -> TypeTag {
        match self {
            Value::Null => TypeTag::Null,
            Value::Bool(_) => TypeTag::Bool,
            Value::Num(_) => TypeTag::Num,
            Value::Str(_) => TypeTag::Str,
            Value::Fn(_) => TypeTag::Fn,
            Value::Class(_) => TypeTag::Class,
            Value::Module(_) => TypeTag::Module,
            Value::Instance(_) => TypeTag::Instance,
        }
    }

    /// The number inside a `Num`, if this is one.
    pub fn as_num(&self) -> Option<f64> {
        match self {
            Value::Num(n) => Some(*n),
            _ => None,
        }
    }

    /// The string inside a `Str`, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// Display follows the default string conversion rules.
///
/// Numbers with an integral value print without a decimal point; other
/// numbers use the shortest round-trippable form. Registry-managed values
/// print a bare type marker here; rich forms (class names, stringify
/// methods) require registry access and live in the interpreter.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Value::Num(n) => write!(f, "{}", format_num(*n)),
            Value::Str(s) => write!(f, "{}", s),
            Value::Fn(_) => write!(f, "[fn]"),
            Value::Class(_) => write!(f, "[class]"),
            Value::Module(_) => write!(f, "[module]"),
            Value::Instance(_) => write!(f, "[instance]"),
        }
    }
}

/// Format a number the way scripts see it.
pub fn format_num(n: f64) -> String {
    if n.is_nan() {
        "nan".to_string()
    } else if n.is_infinite() {
        if n.is_sign_positive() {
            "inf".to_string()
        } else {
            "-inf".to_string()
        }
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        // Integer-valued doubles display without a decimal point
        format!("{}", n as i64)
    } else {
        let mut buffer = ryu::Buffer::new();
        buffer.format(n).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Num(0.0).is_truthy());
        assert!(Value::str("").is_truthy());
        assert!(Value::Instance(InstanceId(0)).is_truthy());
    }

    #[test]
    fn test_tags() {
        assert_eq!(Value::Null.tag(), TypeTag::Null);
        assert_eq!(Value::Num(1.0).tag(), TypeTag::Num);
        assert_eq!(Value::str("x").tag(), TypeTag::Str);
        assert_eq!(Value::Class(ClassId(0)).tag(), TypeTag::Class);
        assert_eq!(TypeTag::Instance.name(), "instance");
    }

    #[test]
    fn test_equality_semantics() {
        assert_eq!(Value::Num(2.0), Value::Num(2.0));
        assert_ne!(Value::Num(f64::NAN), Value::Num(f64::NAN));
        assert_eq!(Value::str("ab"), Value::str("ab"));
        assert_eq!(Value::Instance(InstanceId(3)), Value::Instance(InstanceId(3)));
        assert_ne!(Value::Instance(InstanceId(3)), Value::Instance(InstanceId(4)));
        assert_ne!(Value::Num(1.0), Value::str("1"));
    }

    #[test]
    fn test_display_numbers() {
        assert_eq!(Value::Num(42.0).to_string(), "42");
        assert_eq!(Value::Num(-7.0).to_string(), "-7");
        assert_eq!(Value::Num(3.5).to_string(), "3.5");
        assert_eq!(Value::Num(f64::NAN).to_string(), "nan");
        assert_eq!(Value::Num(f64::INFINITY).to_string(), "inf");
        assert_eq!(Value::Num(f64::NEG_INFINITY).to_string(), "-inf");
    }

    #[test]
    fn test_display_basic() {
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::str("hi").to_string(), "hi");
        assert_eq!(Value::Module(ModuleId(0)).to_string(), "[module]");
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::Num(2.5).as_num(), Some(2.5));
        assert_eq!(Value::Null.as_num(), None);
        assert_eq!(Value::str("s").as_str(), Some("s"));
        assert_eq!(Value::Bool(true).as_str(), None);
    }
}
