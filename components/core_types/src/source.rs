//! Source position and call trace types for error tracking.

/// Represents a position in source code.
///
/// Used for error reporting to indicate where an issue occurred.
///
/// # Examples
///
/// ```
/// use core_types::SourcePosition;
///
/// let pos = SourcePosition {
///     line: 10,
///     column: 5,
///     offset: 150,
/// };
///
/// assert_eq!(pos.line, 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePosition {
    /// Line number (1-indexed)
    pub line: u32,
    /// Column number (1-indexed)
    pub column: u32,
    /// Byte offset from the start of the source
    pub offset: usize,
}

impl SourcePosition {
    /// Create a new source position.
    pub fn new(line: u32, column: u32, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

/// A single frame in a runtime error's call trace.
///
/// Script frames carry the line of the failing instruction; native frames
/// carry only the function or method name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFrame {
    /// Name of the function or method
    pub function: String,
    /// Line number in the script, if this is a script frame
    pub line: Option<u32>,
}

impl TraceFrame {
    /// Frame for a native function or method.
    pub fn native(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            line: None,
        }
    }

    /// Frame for a script location.
    pub fn script(function: impl Into<String>, line: u32) -> Self {
        Self {
            function: function.into(),
            line: Some(line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_position_new() {
        let pos = SourcePosition::new(3, 7, 42);
        assert_eq!(pos.line, 3);
        assert_eq!(pos.column, 7);
        assert_eq!(pos.offset, 42);
    }

    #[test]
    fn test_trace_frames() {
        let native = TraceFrame::native("Vec2.+");
        assert_eq!(native.function, "Vec2.+");
        assert_eq!(native.line, None);

        let script = TraceFrame::script("<main>", 12);
        assert_eq!(script.line, Some(12));
    }
}
