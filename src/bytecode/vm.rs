//! Stack-based virtual machine for executing bytecode.

use std::rc::Rc;

use crate::bytecode::chunk::Chunk;
use crate::bytecode::compiler::compile;
use crate::bytecode::instruction::OpCode;
use crate::error::{LoxError, RuntimeError};
use crate::table::Table;
use crate::value::object::ObjString;
use crate::value::{Heap, Obj, Value};

/// Maximum value stack depth.
pub const STACK_MAX: usize = 256;

/// A virtual machine. Globals and interned strings persist across
/// `interpret` calls; each chunk lives only for the call that compiled it.
#[derive(Debug)]
pub struct Vm {
    stack: Vec<Value>,
    pub globals: Table,
    pub heap: Heap,
}

impl Vm {
    pub fn new() -> Self {
        Self {
            stack: Vec::with_capacity(STACK_MAX),
            globals: Table::new(),
            heap: Heap::new(),
        }
    }

    /// Compile and run a source string.
    pub fn interpret(&mut self, source: &str) -> Result<(), LoxError> {
        let chunk = compile(source, &mut self.heap).map_err(LoxError::Compile)?;
        match self.run(&chunk) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.stack.clear();
                Err(err.into())
            }
        }
    }

    /// Main decode-execute loop. `ip` always indexes the next byte.
    fn run(&mut self, chunk: &Chunk) -> Result<(), RuntimeError> {
        let mut ip = 0;
        loop {
            let line = chunk.get_line(ip);
            let byte = chunk.code[ip];
            ip += 1;
            let op = OpCode::from_u8(byte)
                .ok_or_else(|| RuntimeError::new(format!("Invalid opcode {}.", byte), line))?;

            match op {
                OpCode::Constant => {
                    let index = chunk.code[ip] as usize;
                    ip += 1;
                    let value = read_constant(chunk, index, line)?.clone();
                    self.push(value, line)?;
                }

                OpCode::Nil => self.push(Value::Nil, line)?,
                OpCode::True => self.push(Value::Bool(true), line)?,
                OpCode::False => self.push(Value::Bool(false), line)?,

                OpCode::Pop => {
                    self.pop(line)?;
                }

                OpCode::GetGlobal => {
                    let index = chunk.code[ip] as usize;
                    ip += 1;
                    let name = read_string_constant(chunk, index, line)?;
                    let value = self.globals.get(&name).cloned().ok_or_else(|| {
                        RuntimeError::new(format!("Undefined variable '{}'.", name), line)
                    })?;
                    self.push(value, line)?;
                }

                OpCode::DefineGlobal => {
                    let index = chunk.code[ip] as usize;
                    ip += 1;
                    let name = read_string_constant(chunk, index, line)?;
                    let value = self.peek(0, line)?.clone();
                    self.globals.set(name, value);
                    self.pop(line)?;
                }

                OpCode::SetGlobal => {
                    let index = chunk.code[ip] as usize;
                    ip += 1;
                    let name = read_string_constant(chunk, index, line)?;
                    let value = self.peek(0, line)?.clone();
                    // Assigning to an undefined name is an error; undo the
                    // insertion so the failed assignment leaves no trace.
                    if self.globals.set(Rc::clone(&name), value) {
                        self.globals.delete(&name);
                        return Err(RuntimeError::new(
                            format!("Undefined variable '{}'.", name),
                            line,
                        ));
                    }
                }

                OpCode::Equal => {
                    let b = self.pop(line)?;
                    let a = self.pop(line)?;
                    self.push(Value::Bool(a == b), line)?;
                }

                OpCode::Greater => self.binary_number_op(line, |a, b| Value::Bool(a > b))?,
                OpCode::Less => self.binary_number_op(line, |a, b| Value::Bool(a < b))?,

                OpCode::Add => {
                    let b = self.pop(line)?;
                    let a = self.pop(line)?;
                    match (&a, &b) {
                        (Value::Number(x), Value::Number(y)) => {
                            let sum = x + y;
                            self.push(Value::Number(sum), line)?;
                        }
                        (Value::Obj(Obj::String(x)), Value::Obj(Obj::String(y))) => {
                            let result = self.heap.take_string(format!("{}{}", x, y));
                            self.push(Value::Obj(Obj::String(result)), line)?;
                        }
                        _ => {
                            return Err(RuntimeError::new(
                                "Operands must be two numbers or two strings.",
                                line,
                            ))
                        }
                    }
                }

                OpCode::Subtract => self.binary_number_op(line, |a, b| Value::Number(a - b))?,
                OpCode::Multiply => self.binary_number_op(line, |a, b| Value::Number(a * b))?,
                // Division by zero follows IEEE and yields an infinity.
                OpCode::Divide => self.binary_number_op(line, |a, b| Value::Number(a / b))?,

                OpCode::Not => {
                    let value = self.pop(line)?;
                    self.push(Value::Bool(value.is_falsey()), line)?;
                }

                OpCode::Negate => match self.pop(line)? {
                    Value::Number(value) => self.push(Value::Number(-value), line)?,
                    _ => return Err(RuntimeError::new("Operands must be numbers.", line)),
                },

                OpCode::Print => {
                    let value = self.pop(line)?;
                    println!("{}", value);
                }

                OpCode::Return => return Ok(()),
            }
        }
    }

    fn binary_number_op<F>(&mut self, line: u32, op: F) -> Result<(), RuntimeError>
    where
        F: FnOnce(f64, f64) -> Value,
    {
        let b = self.pop(line)?;
        let a = self.pop(line)?;
        match (a, b) {
            (Value::Number(a), Value::Number(b)) => self.push(op(a, b), line),
            _ => Err(RuntimeError::new("Operands must be numbers.", line)),
        }
    }

    fn push(&mut self, value: Value, line: u32) -> Result<(), RuntimeError> {
        if self.stack.len() == STACK_MAX {
            return Err(RuntimeError::new("Stack overflow.", line));
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self, line: u32) -> Result<Value, RuntimeError> {
        self.stack
            .pop()
            .ok_or_else(|| RuntimeError::new("Stack underflow.", line))
    }

    fn peek(&self, distance: usize, line: u32) -> Result<&Value, RuntimeError> {
        let len = self.stack.len();
        if distance < len {
            Ok(&self.stack[len - 1 - distance])
        } else {
            Err(RuntimeError::new("Stack underflow.", line))
        }
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

fn read_constant<'c>(chunk: &'c Chunk, index: usize, line: u32) -> Result<&'c Value, RuntimeError> {
    chunk
        .constants
        .get(index)
        .ok_or_else(|| RuntimeError::new(format!("Invalid constant index {}.", index), line))
}

fn read_string_constant(
    chunk: &Chunk,
    index: usize,
    line: u32,
) -> Result<Rc<ObjString>, RuntimeError> {
    match read_constant(chunk, index, line)? {
        Value::Obj(Obj::String(name)) => Ok(Rc::clone(name)),
        _ => Err(RuntimeError::new("Expected a string constant.", line)),
    }
}
