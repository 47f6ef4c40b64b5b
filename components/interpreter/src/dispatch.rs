//! Dispatch loop for bytecode execution
//!
//! Primitive arithmetic, comparison, and truthiness run in the core;
//! any instance operand routes its operator through registry dispatch.

use bytecode_system::{Chunk, Opcode};
use core_types::{ErrorKind, ScriptError, ScriptResult, TraceFrame, Value};
use native_bridge::Operator;

use crate::call_frame::CallFrame;
use crate::vm::Vm;

/// What an executed instruction asks the loop to do next.
enum Flow {
    Continue,
    Return(Value),
}

impl Vm {
    /// Run a chunk to completion on a fresh frame.
    ///
    /// On error the frame and everything it pushed are unwound and the
    /// VM stays usable.
    pub(crate) fn execute(&mut self, chunk: Chunk) -> ScriptResult<Value> {
        if self.frames.len() >= self.max_call_depth {
            return Err(ScriptError::memory_error(format!(
                "frame depth limit of {} exceeded",
                self.max_call_depth
            )));
        }
        let frame_floor = self.frames.len();
        let operand_floor = self.operands.len();
        let window_floor = self.slots.depth();

        self.frames.push(CallFrame::new(chunk, operand_floor));
        let result = self.run();
        if result.is_err() {
            self.frames.truncate(frame_floor);
            self.operands.truncate(operand_floor);
            while self.slots.depth() > window_floor {
                self.slots.pop_window();
            }
            self.pending = None;
        }
        result
    }

    fn run(&mut self) -> ScriptResult<Value> {
        loop {
            if self.heap.bytes_allocated() >= self.next_gc {
                self.collect_garbage();
                self.next_gc = self
                    .gc_threshold
                    .max(self.heap.bytes_allocated().saturating_mul(2));
            }

            let Some(frame) = self.frames.last_mut() else {
                return Ok(Value::Null);
            };
            let ip = frame.ip;
            if ip >= frame.chunk.len() {
                // Fell off the chunk without a Return: implicit null.
                if let Some(finished) = self.frames.pop() {
                    self.operands.truncate(finished.base);
                }
                return Ok(Value::Null);
            }
            let opcode = frame.chunk.code[ip].clone();
            let line = frame.chunk.line_for(ip);
            frame.ip = ip + 1;

            match self.step(opcode) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Return(value)) => {
                    if let Some(finished) = self.frames.pop() {
                        self.operands.truncate(finished.base);
                    }
                    return Ok(value);
                }
                Err(error) => {
                    let name = self
                        .frames
                        .last()
                        .map(|frame| frame.chunk.name.clone())
                        .unwrap_or_else(|| "<script>".to_string());
                    return Err(error.push_frame(TraceFrame::script(name, line)));
                }
            }
        }
    }

    fn step(&mut self, opcode: Opcode) -> ScriptResult<Flow> {
        match opcode {
            Opcode::Constant(idx) => {
                let value = self
                    .frames
                    .last()
                    .and_then(|frame| frame.chunk.constant(idx))
                    .cloned()
                    .ok_or_else(|| {
                        ScriptError::new(
                            ErrorKind::Internal,
                            format!("constant {idx} is out of range"),
                        )
                    })?;
                self.operands.push(value);
            }
            Opcode::Null => self.operands.push(Value::Null),
            Opcode::True => self.operands.push(Value::Bool(true)),
            Opcode::False => self.operands.push(Value::Bool(false)),

            Opcode::DefineGlobal(name) => {
                let value = self.pop()?;
                self.globals.insert(name, value);
            }
            Opcode::LoadGlobal(name) => {
                let value = if let Some(value) = self.globals.get(&name) {
                    value.clone()
                } else if let Some(module) = self.modules.lookup_published(&name) {
                    Value::Module(module)
                } else {
                    return Err(ScriptError::name_error(format!(
                        "undefined variable '{name}'"
                    )));
                };
                self.operands.push(value);
            }
            Opcode::StoreGlobal(name) => {
                let value = self.peek()?.clone();
                match self.globals.get_mut(&name) {
                    Some(slot) => *slot = value,
                    None => {
                        return Err(ScriptError::name_error(format!(
                            "undefined variable '{name}'"
                        )))
                    }
                }
            }

            Opcode::LoadProperty(name) => {
                let receiver = self.pop()?;
                let value = self.services().get_property(&receiver, &name)?;
                self.operands.push(value);
            }
            Opcode::StoreProperty(name) => {
                let value = self.pop()?;
                let receiver = self.pop()?;
                self.services().set_property(&receiver, &name, value.clone())?;
                self.operands.push(value);
            }

            Opcode::Add => self.binary(Operator::Add)?,
            Opcode::Sub => self.binary(Operator::Sub)?,
            Opcode::Mul => self.binary(Operator::Mul)?,
            Opcode::Div => self.binary(Operator::Div)?,
            Opcode::Rem => self.binary(Operator::Rem)?,
            Opcode::Less => self.binary(Operator::Lt)?,
            Opcode::LessEqual => self.binary(Operator::Le)?,
            Opcode::Greater => self.binary(Operator::Gt)?,
            Opcode::GreaterEqual => self.binary(Operator::Ge)?,

            Opcode::Neg => {
                let operand = self.pop()?;
                let result = match operand {
                    Value::Num(n) => Value::Num(-n),
                    other => self.services().unary_operator(Operator::Neg, other)?,
                };
                self.operands.push(result);
            }
            Opcode::Not => {
                let operand = self.pop()?;
                self.operands.push(Value::Bool(!operand.is_truthy()));
            }

            Opcode::Equal => {
                let rhs = self.pop()?;
                let lhs = self.pop()?;
                let eq = self.services().equals(&lhs, &rhs)?;
                self.operands.push(Value::Bool(eq));
            }
            Opcode::NotEqual => {
                let rhs = self.pop()?;
                let lhs = self.pop()?;
                let eq = self.services().equals(&lhs, &rhs)?;
                self.operands.push(Value::Bool(!eq));
            }

            Opcode::Jump(target) => self.jump(target),
            Opcode::JumpIfFalse(target) => {
                let condition = self.pop()?;
                if !condition.is_truthy() {
                    self.jump(target);
                }
            }

            Opcode::Call(argc) => {
                let args = self.pop_args(argc as usize)?;
                let callee = self.pop()?;
                let result = self.services().call_value(callee, &args)?;
                self.operands.push(result);
            }
            Opcode::Invoke(name, argc) => {
                let args = self.pop_args(argc as usize)?;
                let receiver = self.pop()?;
                let result = self.services().invoke_method(receiver, &name, &args)?;
                self.operands.push(result);
            }

            Opcode::Pop => {
                self.pop()?;
            }
            Opcode::Return => {
                let value = self.operands.pop().unwrap_or(Value::Null);
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Continue)
    }

    /// Binary operator: numbers (and `+` on strings) in the core,
    /// everything else through registry dispatch.
    fn binary(&mut self, op: Operator) -> ScriptResult<()> {
        let rhs = self.pop()?;
        let lhs = self.pop()?;
        let result = match (&lhs, &rhs) {
            (Value::Num(a), Value::Num(b)) => numeric(op, *a, *b)?,
            (Value::Str(a), Value::Str(b)) if op == Operator::Add => {
                Value::str(format!("{a}{b}"))
            }
            _ => self.services().binary_operator(op, lhs, rhs)?,
        };
        self.operands.push(result);
        Ok(())
    }

    fn jump(&mut self, target: usize) {
        if let Some(frame) = self.frames.last_mut() {
            frame.ip = target;
        }
    }

    fn pop(&mut self) -> ScriptResult<Value> {
        self.operands
            .pop()
            .ok_or_else(|| ScriptError::new(ErrorKind::Internal, "operand stack underflow"))
    }

    fn peek(&self) -> ScriptResult<&Value> {
        self.operands
            .last()
            .ok_or_else(|| ScriptError::new(ErrorKind::Internal, "operand stack underflow"))
    }

    fn pop_args(&mut self, argc: usize) -> ScriptResult<Vec<Value>> {
        if self.operands.len() < argc {
            return Err(ScriptError::new(
                ErrorKind::Internal,
                "operand stack underflow",
            ));
        }
        Ok(self.operands.split_off(self.operands.len() - argc))
    }
}

fn numeric(op: Operator, a: f64, b: f64) -> ScriptResult<Value> {
    let value = match op {
        Operator::Add => Value::Num(a + b),
        Operator::Sub => Value::Num(a - b),
        Operator::Mul => Value::Num(a * b),
        Operator::Div => Value::Num(a / b),
        Operator::Rem => Value::Num(a % b),
        Operator::Lt => Value::Bool(a < b),
        Operator::Le => Value::Bool(a <= b),
        Operator::Gt => Value::Bool(a > b),
        Operator::Ge => Value::Bool(a >= b),
        Operator::Neg | Operator::Eq => {
            return Err(ScriptError::new(
                ErrorKind::Internal,
                format!("operator '{}' has no binary fast path", op.symbol()),
            ))
        }
    };
    Ok(value)
}
