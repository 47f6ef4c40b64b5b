//! Call frame for script execution state

use bytecode_system::Chunk;

/// One entry of the VM's frame stack.
///
/// A frame tracks the chunk being executed, the next instruction to
/// run, and the operand stack height at entry so unwinding can restore
/// it.
#[derive(Debug, Clone, PartialEq)]
pub struct CallFrame {
    /// Chunk being executed
    pub chunk: Chunk,
    /// Index of the next instruction to execute
    pub ip: usize,
    /// Operand stack height when this frame was entered
    pub base: usize,
}

impl CallFrame {
    /// Create a frame positioned at the chunk's first instruction.
    pub fn new(chunk: Chunk, base: usize) -> Self {
        Self { chunk, ip: 0, base }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_start_at_the_first_instruction() {
        let frame = CallFrame::new(Chunk::new("demo"), 3);
        assert_eq!(frame.ip, 0);
        assert_eq!(frame.base, 3);
        assert_eq!(frame.chunk.name, "demo");
    }
}
