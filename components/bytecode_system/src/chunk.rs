//! Bytecode chunk - compiled bytecode container
//!
//! Holds the instruction sequence, the constant pool, and a parallel
//! line table mapping each instruction back to its source line.

use crate::opcode::Opcode;
use core_types::Value;

/// A compiled bytecode chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Name for diagnostics, usually the script or file name.
    pub name: String,
    /// Instruction sequence.
    pub code: Vec<Opcode>,
    /// Constant pool for literal values.
    pub constants: Vec<Value>,
    /// Source line of each instruction, parallel to `code`.
    pub lines: Vec<u32>,
}

impl Chunk {
    /// Create an empty chunk.
    pub fn new(name: impl Into<String>) -> Self {
        Chunk {
            name: name.into(),
            code: Vec::new(),
            constants: Vec::new(),
            lines: Vec::new(),
        }
    }

    /// Append an instruction attributed to a source line.
    pub fn emit(&mut self, opcode: Opcode, line: u32) {
        self.code.push(opcode);
        self.lines.push(line);
    }

    /// Append a jump with a placeholder target; returns its index for
    /// [`Chunk::patch_jump`].
    pub fn emit_jump(&mut self, opcode: Opcode, line: u32) -> usize {
        debug_assert!(opcode.is_jump());
        let at = self.code.len();
        self.emit(opcode, line);
        at
    }

    /// Point the jump at `at` to the next instruction to be emitted.
    pub fn patch_jump(&mut self, at: usize) {
        let dest = self.code.len();
        match &mut self.code[at] {
            Opcode::Jump(target) | Opcode::JumpIfFalse(target) => *target = dest,
            _ => debug_assert!(false, "patched instruction is not a jump"),
        }
    }

    /// Add a constant to the pool and return its index.
    pub fn add_constant(&mut self, value: Value) -> usize {
        let idx = self.constants.len();
        self.constants.push(value);
        idx
    }

    /// Look up a constant by pool index.
    pub fn constant(&self, idx: usize) -> Option<&Value> {
        self.constants.get(idx)
    }

    /// Source line attributed to the instruction at `ip`, `0` if unknown.
    pub fn line_for(&self, ip: usize) -> u32 {
        self.lines.get(ip).copied().unwrap_or(0)
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// Whether the chunk has no instructions.
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}
