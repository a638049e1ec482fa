//! Bytecode representation and the stack machine that executes it.

mod code;
mod error;
mod frame;
mod instruction_set;
mod program;
mod runtime;
mod stack;

#[cfg(test)]
mod code_test;


pub use code::{Bytecode, BytecodeError, Instructions, Label, LeOperand, branch_target};
pub use error::{ExecutionError, ExecutionErrorKind};
pub use frame::Frame;
pub use instruction_set::{Instruction, InvalidOpcode, Opcode, Operand, OperandKind};
pub use program::{ConstantPool, Function, FunctionId, Global, Parameter, Program, ProgramError};
pub use runtime::Interpreter;
pub use stack::Stack;
