//! Bytecode opcodes for the Quill stack machine.

/// Bytecode opcodes for Quill execution.
///
/// The machine is stack-based: operands are pushed, operations pop their
/// inputs and push one result. Jump targets are absolute instruction
/// indexes within the chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum Opcode {
    // Literals
    /// Push a constant from the constant pool.
    Constant(usize),
    /// Push `null`.
    Null,
    /// Push `true`.
    True,
    /// Push `false`.
    False,

    // Globals
    /// Declare a global, taking its initial value from the stack.
    DefineGlobal(String),
    /// Push the value of a global variable.
    LoadGlobal(String),
    /// Store the top of stack into an existing global, leaving it pushed.
    StoreGlobal(String),

    // Properties
    /// Pop a receiver and push the named property's value.
    LoadProperty(String),
    /// Pop value then receiver; store the property and push the value.
    StoreProperty(String),

    // Arithmetic
    /// Add top two stack values.
    Add,
    /// Subtract top from second-top.
    Sub,
    /// Multiply top two stack values.
    Mul,
    /// Divide second-top by top.
    Div,
    /// Remainder of second-top by top.
    Rem,
    /// Negate the top value.
    Neg,
    /// Invert the truthiness of the top value.
    Not,

    // Comparison
    /// Equality.
    Equal,
    /// Inequality.
    NotEqual,
    /// Less than.
    Less,
    /// Less than or equal.
    LessEqual,
    /// Greater than.
    Greater,
    /// Greater than or equal.
    GreaterEqual,

    // Control flow
    /// Unconditional jump to an instruction index.
    Jump(usize),
    /// Pop a condition; jump to the index if it is falsy.
    JumpIfFalse(usize),

    // Calls
    /// Call a function or class value with `argc` arguments.
    Call(u8),
    /// Invoke a named method on a receiver with `argc` arguments.
    Invoke(String, u8),

    // Stack management
    /// Discard the top of stack.
    Pop,
    /// Finish the program, yielding the top of stack.
    Return,
}

impl Opcode {
    /// Mnemonic for trace output.
    pub fn name(&self) -> &'static str {
        match self {
            Opcode::Constant(_) => "constant",
            Opcode::Null => "null",
            Opcode::True => "true",
            Opcode::False => "false",
            Opcode::DefineGlobal(_) => "define_global",
            Opcode::LoadGlobal(_) => "load_global",
            Opcode::StoreGlobal(_) => "store_global",
            Opcode::LoadProperty(_) => "load_property",
            Opcode::StoreProperty(_) => "store_property",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mul => "mul",
            Opcode::Div => "div",
            Opcode::Rem => "rem",
            Opcode::Neg => "neg",
            Opcode::Not => "not",
            Opcode::Equal => "equal",
            Opcode::NotEqual => "not_equal",
            Opcode::Less => "less",
            Opcode::LessEqual => "less_equal",
            Opcode::Greater => "greater",
            Opcode::GreaterEqual => "greater_equal",
            Opcode::Jump(_) => "jump",
            Opcode::JumpIfFalse(_) => "jump_if_false",
            Opcode::Call(_) => "call",
            Opcode::Invoke(_, _) => "invoke",
            Opcode::Pop => "pop",
            Opcode::Return => "return",
        }
    }

    /// Whether this opcode carries a jump target.
    pub fn is_jump(&self) -> bool {
        matches!(self, Opcode::Jump(_) | Opcode::JumpIfFalse(_))
    }
}
