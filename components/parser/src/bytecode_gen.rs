//! Bytecode generation from the AST

use bytecode_system::{Chunk, Opcode};
use core_types::Value;

use crate::ast::{BinaryOp, Expression, Literal, Program, Statement, UnaryOp};

/// Compiles a parsed program into a bytecode chunk.
///
/// Generation cannot fail: every program the parser accepts has a
/// bytecode rendering. Bad assignment targets and oversized argument
/// lists are rejected during parsing.
pub struct BytecodeGenerator {
    chunk: Chunk,
}

impl BytecodeGenerator {
    /// Create a generator whose output chunk carries the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            chunk: Chunk::new(name),
        }
    }

    /// Generate bytecode for a whole program.
    ///
    /// The value of the final expression statement becomes the program
    /// result; any other shape of program yields `null`.
    pub fn generate(mut self, program: &Program) -> Chunk {
        let last = program.statements.len().saturating_sub(1);
        let mut ends_in_value = false;
        for (index, statement) in program.statements.iter().enumerate() {
            let keep = index == last && matches!(statement, Statement::Expression { .. });
            self.visit_statement(statement, keep);
            ends_in_value = keep;
        }

        let line = program.statements.last().map(statement_line).unwrap_or(0);
        if !ends_in_value {
            self.chunk.emit(Opcode::Null, line);
        }
        self.chunk.emit(Opcode::Return, line);
        self.chunk
    }

    fn visit_statement(&mut self, statement: &Statement, keep_result: bool) {
        match statement {
            Statement::Let {
                name,
                value,
                position,
            } => {
                self.visit_expression(value);
                self.chunk
                    .emit(Opcode::DefineGlobal(name.clone()), position.line);
            }

            Statement::Expression {
                expression,
                position,
            } => {
                self.visit_expression(expression);
                if !keep_result {
                    self.chunk.emit(Opcode::Pop, position.line);
                }
            }

            Statement::If {
                condition,
                then_branch,
                else_branch,
                position,
            } => {
                self.visit_expression(condition);
                let to_else = self
                    .chunk
                    .emit_jump(Opcode::JumpIfFalse(0), position.line);
                for inner in then_branch {
                    self.visit_statement(inner, false);
                }
                let to_end = self.chunk.emit_jump(Opcode::Jump(0), position.line);
                self.chunk.patch_jump(to_else);
                for inner in else_branch {
                    self.visit_statement(inner, false);
                }
                self.chunk.patch_jump(to_end);
            }

            Statement::While {
                condition,
                body,
                position,
            } => {
                let loop_start = self.chunk.len();
                self.visit_expression(condition);
                let exit = self
                    .chunk
                    .emit_jump(Opcode::JumpIfFalse(0), position.line);
                for inner in body {
                    self.visit_statement(inner, false);
                }
                self.chunk.emit(Opcode::Jump(loop_start), position.line);
                self.chunk.patch_jump(exit);
            }
        }
    }

    fn visit_expression(&mut self, expression: &Expression) {
        match expression {
            Expression::Literal { value, position } => {
                let line = position.line;
                match value {
                    Literal::Null => self.chunk.emit(Opcode::Null, line),
                    Literal::Bool(true) => self.chunk.emit(Opcode::True, line),
                    Literal::Bool(false) => self.chunk.emit(Opcode::False, line),
                    Literal::Num(n) => self.emit_constant(Value::Num(*n), line),
                    Literal::Str(s) => self.emit_constant(Value::str(s), line),
                }
            }

            Expression::Variable { name, position } => {
                self.chunk
                    .emit(Opcode::LoadGlobal(name.clone()), position.line);
            }

            Expression::Assign {
                name,
                value,
                position,
            } => {
                self.visit_expression(value);
                self.chunk
                    .emit(Opcode::StoreGlobal(name.clone()), position.line);
            }

            Expression::Unary {
                operator,
                operand,
                position,
            } => {
                self.visit_expression(operand);
                let opcode = match operator {
                    UnaryOp::Neg => Opcode::Neg,
                    UnaryOp::Not => Opcode::Not,
                };
                self.chunk.emit(opcode, position.line);
            }

            Expression::Binary {
                operator,
                left,
                right,
                position,
            } => {
                self.visit_expression(left);
                self.visit_expression(right);
                let opcode = match operator {
                    BinaryOp::Add => Opcode::Add,
                    BinaryOp::Sub => Opcode::Sub,
                    BinaryOp::Mul => Opcode::Mul,
                    BinaryOp::Div => Opcode::Div,
                    BinaryOp::Rem => Opcode::Rem,
                    BinaryOp::Eq => Opcode::Equal,
                    BinaryOp::Ne => Opcode::NotEqual,
                    BinaryOp::Lt => Opcode::Less,
                    BinaryOp::Le => Opcode::LessEqual,
                    BinaryOp::Gt => Opcode::Greater,
                    BinaryOp::Ge => Opcode::GreaterEqual,
                };
                self.chunk.emit(opcode, position.line);
            }

            Expression::Call {
                callee,
                arguments,
                position,
            } => {
                self.visit_expression(callee);
                for argument in arguments {
                    self.visit_expression(argument);
                }
                self.chunk
                    .emit(Opcode::Call(arguments.len() as u8), position.line);
            }

            Expression::Property {
                object,
                name,
                position,
            } => {
                self.visit_expression(object);
                self.chunk
                    .emit(Opcode::LoadProperty(name.clone()), position.line);
            }

            Expression::SetProperty {
                object,
                name,
                value,
                position,
            } => {
                self.visit_expression(object);
                self.visit_expression(value);
                self.chunk
                    .emit(Opcode::StoreProperty(name.clone()), position.line);
            }

            Expression::Invoke {
                object,
                name,
                arguments,
                position,
            } => {
                self.visit_expression(object);
                for argument in arguments {
                    self.visit_expression(argument);
                }
                self.chunk.emit(
                    Opcode::Invoke(name.clone(), arguments.len() as u8),
                    position.line,
                );
            }
        }
    }

    fn emit_constant(&mut self, value: Value, line: u32) {
        let idx = self.chunk.add_constant(value);
        self.chunk.emit(Opcode::Constant(idx), line);
    }
}

fn statement_line(statement: &Statement) -> u32 {
    match statement {
        Statement::Let { position, .. }
        | Statement::Expression { position, .. }
        | Statement::If { position, .. }
        | Statement::While { position, .. } => position.line,
    }
}
