use std::io::Write;

use super::code::{BytecodeError, branch_target};
use super::error::{ExecutionError, ExecutionErrorKind};
use super::frame::Frame;
use super::instruction_set::{Opcode, Operand};
use super::program::{ConstantPool, FunctionId, Program};
use super::stack::Stack;
use crate::api::ExecutionOptions;
use crate::values::{Value, VarType};

/// What the dispatch loop does after an instruction.
enum Flow {
    Continue,
    Halt,
}

/// Stack machine executing a translated [`Program`].
///
/// Program output goes to `out`. String values are ids into the interpreter's
/// constant pool, which starts as a copy of the program's.
pub struct Interpreter<'p, W: Write> {
    program: &'p Program,
    constants: ConstantPool,
    stack: Stack<Value>,
    frames: Stack<Frame>,
    out: W,
    /// Locals of the entry frame, captured when execution finishes.
    finished: Option<Vec<Value>>,
}

impl<'p, W: Write> Interpreter<'p, W> {
    pub fn new(program: &'p Program, options: &ExecutionOptions, out: W) -> Self {
        Self {
            program,
            constants: program.constants().clone(),
            stack: Stack::new(options.max_stack_size),
            frames: Stack::new(options.max_call_depth),
            out,
            finished: None,
        }
    }

    pub fn constants(&self) -> &ConstantPool {
        &self.constants
    }

    /// Pool used to intern strings handed to [`Interpreter::run_with_locals`].
    pub fn constants_mut(&mut self) -> &mut ConstantPool {
        &mut self.constants
    }

    /// Run the entry function with zero-initialised locals.
    pub fn run(&mut self) -> Result<(), ExecutionError> {
        self.run_with_locals(&[]).map(|_| ())
    }

    /// Run the entry function with the given `(slot, value)` pairs preset.
    ///
    /// Returns the entry function's locals as they were when it stopped.
    pub fn run_with_locals(&mut self, preset: &[(u16, Value)]) -> Result<Vec<Value>, ExecutionError> {
        let entry = self.program.entry().ok_or(ExecutionError {
            kind: ExecutionErrorKind::UnknownFunction(FunctionId::ENTRY.0),
            function: FunctionId::ENTRY,
            address: 0,
        })?;

        let mut frame = Frame::new(entry);
        for &(slot, value) in preset {
            if let Some(local) = frame.locals.get_mut(slot as usize) {
                *local = value;
            }
        }

        self.stack.clear();
        self.frames.clear();
        self.finished = None;
        self.push_frame(frame).map_err(|kind| ExecutionError {
            kind,
            function: FunctionId::ENTRY,
            address: 0,
        })?;

        tracing::debug!(functions = self.program.functions().len(), "Starting execution");
        self.execute()?;
        self.out.flush().map_err(|err| ExecutionError {
            kind: err.into(),
            function: FunctionId::ENTRY,
            address: 0,
        })?;
        Ok(self.finished.take().unwrap_or_default())
    }

    fn execute(&mut self) -> Result<(), ExecutionError> {
        loop {
            let Some(frame) = self.frames.peek() else {
                return Ok(());
            };
            let (function, address) = (frame.function, frame.ip);
            match self.step() {
                Ok(Flow::Continue) => {}
                Ok(Flow::Halt) => return Ok(()),
                Err(kind) => {
                    tracing::debug!(function = function.0, address, error = %kind, "Execution failed");
                    return Err(ExecutionError {
                        kind,
                        function,
                        address,
                    });
                }
            }
        }
    }

    fn step(&mut self) -> Result<Flow, ExecutionErrorKind> {
        use ExecutionErrorKind as E;
        use Opcode::*;

        let program = self.program;
        let frame = self.frames.peek_mut().ok_or(E::UnexpectedEnd)?;
        let current = frame.function;
        let address = frame.ip;
        let function = program.function(current).ok_or(E::UnknownFunction(current.0))?;
        let (instruction, length) = function.bytecode.decode_at(address).map_err(|err| match err {
            BytecodeError::UnknownOpcode { byte, .. } => E::InvalidInstruction(byte),
            _ => E::UnexpectedEnd,
        })?;
        frame.ip += length;
        tracing::trace!(function = current.0, address, %instruction, depth = self.stack.len());

        match (instruction.opcode, instruction.operand) {
            // Literals
            (ILoad, Operand::Int(v)) => self.push(Value::Int(v))?,
            (DLoad, Operand::Double(v)) => self.push(Value::Double(v))?,
            (SLoad, Operand::StringId(id)) => self.push(Value::Str(id))?,
            (ILoad0, _) => self.push(Value::Int(0))?,
            (ILoad1, _) => self.push(Value::Int(1))?,
            (ILoadM1, _) => self.push(Value::Int(-1))?,
            (DLoad0, _) => self.push(Value::Double(0.0))?,
            (DLoad1, _) => self.push(Value::Double(1.0))?,
            (DLoadM1, _) => self.push(Value::Double(-1.0))?,
            (SLoad0, _) => self.push(Value::Str(Value::EMPTY_STRING))?,

            // Arithmetic
            (IAdd, _) => self.int_binary(|a, b| Ok(a.wrapping_add(b)))?,
            (ISub, _) => self.int_binary(|a, b| Ok(a.wrapping_sub(b)))?,
            (IMul, _) => self.int_binary(|a, b| Ok(a.wrapping_mul(b)))?,
            (IDiv, _) => self.int_binary(|a, b| match b {
                0 => Err(E::DivisionByZero),
                _ => Ok(a.wrapping_div(b)),
            })?,
            (IMod, _) => self.int_binary(|a, b| match b {
                0 => Err(E::DivisionByZero),
                _ => Ok(a.wrapping_rem(b)),
            })?,
            (IAOr, _) => self.int_binary(|a, b| Ok(a | b))?,
            (IAAnd, _) => self.int_binary(|a, b| Ok(a & b))?,
            (IAXor, _) => self.int_binary(|a, b| Ok(a ^ b))?,
            (DAdd, _) => self.double_binary(|a, b| a + b)?,
            (DSub, _) => self.double_binary(|a, b| a - b)?,
            (DMul, _) => self.double_binary(|a, b| a * b)?,
            (DDiv, _) => self.double_binary(|a, b| a / b)?,
            (INeg, _) => {
                let v = self.pop_int()?;
                self.push(Value::Int(v.wrapping_neg()))?;
            }
            (DNeg, _) => {
                let v = self.pop_double()?;
                self.push(Value::Double(-v))?;
            }

            // Comparison
            (ICmp, _) => {
                let upper = self.pop_int()?;
                let lower = self.pop_int()?;
                self.push(Value::Int(lower.cmp(&upper) as i64))?;
            }
            (DCmp, _) => {
                let upper = self.pop_double()?;
                let lower = self.pop_double()?;
                let ordering = lower.partial_cmp(&upper).map_or(1, |o| o as i64);
                self.push(Value::Int(ordering))?;
            }

            // Conversions
            (I2D, _) => {
                let v = self.pop_int()?;
                self.push(Value::Double(v as f64))?;
            }
            (D2I, _) => {
                let v = self.pop_double()?;
                if !v.is_finite() {
                    return Err(E::InvalidConversion(format!("{} to int", v)));
                }
                self.push(Value::Int(v as i64))?;
            }
            (S2I, _) => {
                let id = self.pop_string()?;
                let s = self.constants.resolve(id).ok_or(E::UnknownString(id))?;
                let v = parse_leading_int(s)
                    .ok_or_else(|| E::InvalidConversion(format!("{:?} to int", s)))?;
                self.push(Value::Int(v))?;
            }

            // Output
            (IPrint, _) => {
                let v = self.pop_int()?;
                write!(self.out, "{}", v)?;
            }
            (DPrint, _) => {
                let v = self.pop_double()?;
                write!(self.out, "{}", v)?;
            }
            (SPrint, _) => {
                let id = self.pop_string()?;
                let s = self.constants.resolve(id).ok_or(E::UnknownString(id))?;
                self.out.write_all(s.as_bytes())?;
            }

            // Stack
            (Swap, _) => {
                let upper = self.pop()?;
                let lower = self.pop()?;
                self.push(upper)?;
                self.push(lower)?;
            }
            (Pop, _) => {
                self.pop()?;
            }

            // Variables
            (op @ (LoadDVar0 | LoadDVar1 | LoadDVar2 | LoadDVar3), _) => {
                self.load_local(fast_slot(op, LoadDVar0), VarType::Double)?
            }
            (op @ (LoadIVar0 | LoadIVar1 | LoadIVar2 | LoadIVar3), _) => {
                self.load_local(fast_slot(op, LoadIVar0), VarType::Int)?
            }
            (op @ (LoadSVar0 | LoadSVar1 | LoadSVar2 | LoadSVar3), _) => {
                self.load_local(fast_slot(op, LoadSVar0), VarType::String)?
            }
            (op @ (StoreDVar0 | StoreDVar1 | StoreDVar2 | StoreDVar3), _) => {
                self.store_local(fast_slot(op, StoreDVar0), VarType::Double)?
            }
            (op @ (StoreIVar0 | StoreIVar1 | StoreIVar2 | StoreIVar3), _) => {
                self.store_local(fast_slot(op, StoreIVar0), VarType::Int)?
            }
            (op @ (StoreSVar0 | StoreSVar1 | StoreSVar2 | StoreSVar3), _) => {
                self.store_local(fast_slot(op, StoreSVar0), VarType::String)?
            }
            (LoadDVar, Operand::Slot(slot)) => self.load_local(slot, VarType::Double)?,
            (LoadIVar, Operand::Slot(slot)) => self.load_local(slot, VarType::Int)?,
            (LoadSVar, Operand::Slot(slot)) => self.load_local(slot, VarType::String)?,
            (StoreDVar, Operand::Slot(slot)) => self.store_local(slot, VarType::Double)?,
            (StoreIVar, Operand::Slot(slot)) => self.store_local(slot, VarType::Int)?,
            (StoreSVar, Operand::Slot(slot)) => self.store_local(slot, VarType::String)?,
            (LoadCtxDVar, Operand::Context { function, slot }) => {
                self.load_context(function, slot, VarType::Double)?
            }
            (LoadCtxIVar, Operand::Context { function, slot }) => {
                self.load_context(function, slot, VarType::Int)?
            }
            (LoadCtxSVar, Operand::Context { function, slot }) => {
                self.load_context(function, slot, VarType::String)?
            }
            (StoreCtxDVar, Operand::Context { function, slot }) => {
                self.store_context(function, slot, VarType::Double)?
            }
            (StoreCtxIVar, Operand::Context { function, slot }) => {
                self.store_context(function, slot, VarType::Int)?
            }
            (StoreCtxSVar, Operand::Context { function, slot }) => {
                self.store_context(function, slot, VarType::String)?
            }

            // Control flow
            (Ja, Operand::Offset(offset)) => self.jump(address, offset)?,
            (op @ (IfICmpNe | IfICmpE | IfICmpG | IfICmpGe | IfICmpL | IfICmpLe), Operand::Offset(offset)) => {
                let upper = self.pop_int()?;
                let lower = self.pop_int()?;
                let taken = match op {
                    IfICmpNe => lower != upper,
                    IfICmpE => lower == upper,
                    IfICmpG => lower > upper,
                    IfICmpGe => lower >= upper,
                    IfICmpL => lower < upper,
                    _ => lower <= upper,
                };
                if taken {
                    self.jump(address, offset)?;
                }
            }

            // Debugging
            (Dump, _) => {
                let top = self.stack.peek().ok_or(E::StackUnderflow)?;
                tracing::debug!(function = current.0, address, value = %top, "DUMP");
            }
            (Break, _) => {
                tracing::debug!(function = current.0, address, depth = self.stack.len(), "BREAK");
            }

            // Calls and termination
            (Call, Operand::Function(id)) => {
                let callee = program.function(FunctionId(id)).ok_or(E::UnknownFunction(id))?;
                tracing::debug!(function = %callee.name, id, depth = self.frames.len(), "Call");
                self.push_frame(Frame::new(callee))?;
            }
            (Return, _) => {
                let frame = self.frames.pop().ok_or(E::UnexpectedEnd)?;
                tracing::debug!(id = frame.function.0, depth = self.frames.len(), "Return");
                if self.frames.is_empty() {
                    self.finished = Some(frame.locals);
                    return Ok(Flow::Halt);
                }
            }
            (Stop, _) => {
                if current != FunctionId::ENTRY {
                    return Err(E::IllegalStop);
                }
                let frame = self.frames.pop().ok_or(E::UnexpectedEnd)?;
                self.finished = Some(frame.locals);
                return Ok(Flow::Halt);
            }

            (op, _) => return Err(E::InvalidInstruction(op as u8)),
        }
        Ok(Flow::Continue)
    }

    // === Operand stack ===

    #[inline]
    fn push(&mut self, value: Value) -> Result<(), ExecutionErrorKind> {
        self.stack.push(value).map_err(|_| ExecutionErrorKind::StackOverflow {
            max_size: self.stack.capacity(),
        })
    }

    #[inline]
    fn pop(&mut self) -> Result<Value, ExecutionErrorKind> {
        self.stack.pop().ok_or(ExecutionErrorKind::StackUnderflow)
    }

    fn pop_typed(&mut self, expected: VarType) -> Result<Value, ExecutionErrorKind> {
        let value = self.pop()?;
        check_type(&value, expected)?;
        Ok(value)
    }

    fn pop_int(&mut self) -> Result<i64, ExecutionErrorKind> {
        let value = self.pop()?;
        value.as_int().ok_or(ExecutionErrorKind::TypeMismatch {
            expected: VarType::Int,
            found: value.var_type(),
        })
    }

    fn pop_double(&mut self) -> Result<f64, ExecutionErrorKind> {
        let value = self.pop()?;
        value.as_double().ok_or(ExecutionErrorKind::TypeMismatch {
            expected: VarType::Double,
            found: value.var_type(),
        })
    }

    fn pop_string(&mut self) -> Result<u16, ExecutionErrorKind> {
        let value = self.pop()?;
        value.as_string_id().ok_or(ExecutionErrorKind::TypeMismatch {
            expected: VarType::String,
            found: value.var_type(),
        })
    }

    fn int_binary(
        &mut self,
        op: impl FnOnce(i64, i64) -> Result<i64, ExecutionErrorKind>,
    ) -> Result<(), ExecutionErrorKind> {
        let upper = self.pop_int()?;
        let lower = self.pop_int()?;
        self.push(Value::Int(op(lower, upper)?))
    }

    fn double_binary(&mut self, op: impl FnOnce(f64, f64) -> f64) -> Result<(), ExecutionErrorKind> {
        let upper = self.pop_double()?;
        let lower = self.pop_double()?;
        self.push(Value::Double(op(lower, upper)))
    }

    // === Frames ===

    fn push_frame(&mut self, frame: Frame) -> Result<(), ExecutionErrorKind> {
        self.frames.push(frame).map_err(|_| ExecutionErrorKind::CallDepthExceeded {
            max_depth: self.frames.capacity(),
        })
    }

    fn jump(&mut self, address: usize, offset: i16) -> Result<(), ExecutionErrorKind> {
        let target = branch_target(address + 1, offset).ok_or(ExecutionErrorKind::UnexpectedEnd)?;
        let frame = self.frames.peek_mut().ok_or(ExecutionErrorKind::UnexpectedEnd)?;
        frame.ip = target;
        Ok(())
    }

    fn current_local(&mut self, slot: u16) -> Result<&mut Value, ExecutionErrorKind> {
        self.frames
            .peek_mut()
            .ok_or(ExecutionErrorKind::UnexpectedEnd)?
            .locals
            .get_mut(slot as usize)
            .ok_or(ExecutionErrorKind::InvalidSlot(slot))
    }

    /// Local `slot` of the most recent frame of `function`.
    fn context_local(&mut self, function: u16, slot: u16) -> Result<&mut Value, ExecutionErrorKind> {
        self.frames
            .iter_mut()
            .rev()
            .find(|frame| frame.function.0 == function)
            .ok_or(ExecutionErrorKind::InactiveContext(function))?
            .locals
            .get_mut(slot as usize)
            .ok_or(ExecutionErrorKind::InvalidSlot(slot))
    }

    fn load_local(&mut self, slot: u16, ty: VarType) -> Result<(), ExecutionErrorKind> {
        let value = *self.current_local(slot)?;
        check_type(&value, ty)?;
        self.push(value)
    }

    fn store_local(&mut self, slot: u16, ty: VarType) -> Result<(), ExecutionErrorKind> {
        let value = self.pop_typed(ty)?;
        *self.current_local(slot)? = value;
        Ok(())
    }

    fn load_context(&mut self, function: u16, slot: u16, ty: VarType) -> Result<(), ExecutionErrorKind> {
        let value = *self.context_local(function, slot)?;
        check_type(&value, ty)?;
        self.push(value)
    }

    fn store_context(&mut self, function: u16, slot: u16, ty: VarType) -> Result<(), ExecutionErrorKind> {
        let value = self.pop_typed(ty)?;
        *self.context_local(function, slot)? = value;
        Ok(())
    }
}

fn check_type(value: &Value, expected: VarType) -> Result<(), ExecutionErrorKind> {
    let found = value.var_type();
    if found == expected {
        Ok(())
    } else {
        Err(ExecutionErrorKind::TypeMismatch { expected, found })
    }
}

/// Slot addressed by a fast-path variable opcode, given the slot-0 opcode of its group.
fn fast_slot(op: Opcode, base: Opcode) -> u16 {
    (op as u8 - base as u8) as u16
}

/// Parse the integer at the start of `s`, ignoring leading whitespace and
/// anything after the digits.
fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let sign_len = usize::from(s.starts_with(['-', '+']));
    let digits = s[sign_len..].bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    s[..sign_len + digits].parse().ok()
}
