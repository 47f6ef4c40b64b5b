//! Type-erased native instance state.

use std::any::Any;
use std::fmt;

/// Opaque native state attached to an instance.
///
/// A payload wraps whatever Rust value a class allocator produced, together
/// with the number of bytes it accounts for. The byte figure feeds the
/// heap's allocation total, which drives threshold-based collection and the
/// optional hard heap cap.
///
/// # Examples
///
/// ```
/// use memory_manager::Payload;
///
/// struct Vec2 { x: f64, y: f64 }
///
/// let payload = Payload::new(Vec2 { x: 1.0, y: 2.0 });
/// assert_eq!(payload.bytes(), std::mem::size_of::<Vec2>());
/// assert_eq!(payload.downcast_ref::<Vec2>().unwrap().x, 1.0);
/// ```
pub struct Payload {
    data: Box<dyn Any>,
    bytes: usize,
}

impl Payload {
    /// Wrap a value, accounting for its inline size.
    pub fn new<T: Any>(value: T) -> Self {
        Self {
            bytes: std::mem::size_of::<T>(),
            data: Box::new(value),
        }
    }

    /// Wrap a value with an explicit byte figure.
    ///
    /// Use this for payloads that own heap storage (buffers, maps) so the
    /// accounted size reflects the real footprint, not just the inline part.
    pub fn with_size<T: Any>(value: T, bytes: usize) -> Self {
        Self {
            bytes,
            data: Box::new(value),
        }
    }

    /// Bytes this payload accounts for.
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    /// Borrow the payload as a concrete type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.data.downcast_ref::<T>()
    }

    /// Mutably borrow the payload as a concrete type.
    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.data.downcast_mut::<T>()
    }

    /// Consume the payload, returning the boxed value.
    pub fn into_inner(self) -> Box<dyn Any> {
        self.data
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload").field("bytes", &self.bytes).finish()
    }
}
