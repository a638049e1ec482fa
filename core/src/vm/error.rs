//! Runtime errors of the interpreter.
//!
//! Every error is fatal: execution stops at the failing instruction and the
//! error reports where that instruction lives.

use thiserror::Error;

use super::program::FunctionId;
use crate::values::VarType;

#[derive(Debug, Error)]
#[error("{kind} (function #{}, address {address})", .function.0)]
pub struct ExecutionError {
    pub kind: ExecutionErrorKind,
    /// Function executing when the error occurred.
    pub function: FunctionId,
    /// Byte address of the failing instruction within that function.
    pub address: usize,
}

#[derive(Debug, Error)]
pub enum ExecutionErrorKind {
    /// Operand stack is full.
    #[error("Operand stack overflow (limit: {max_size} values)")]
    StackOverflow { max_size: usize },

    #[error("Operand stack underflow")]
    StackUnderflow,

    /// Too many nested calls, typically runaway recursion.
    #[error("Call depth exceeded (limit: {max_depth} frames)")]
    CallDepthExceeded { max_depth: usize },

    #[error("Expected {expected} value, found {found}")]
    TypeMismatch { expected: VarType, found: VarType },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Cannot convert {0}")]
    InvalidConversion(String),

    #[error("Invalid instruction 0x{0:02X}")]
    InvalidInstruction(u8),

    #[error("Unknown function #{0}")]
    UnknownFunction(u16),

    #[error("Unknown string constant @{0}")]
    UnknownString(u16),

    #[error("Variable slot {0} does not exist")]
    InvalidSlot(u16),

    /// Context access to a function that has no frame on the call stack.
    #[error("Function #{0} is not active")]
    InactiveContext(u16),

    #[error("STOP outside the entry function")]
    IllegalStop,

    #[error("Execution ran past the end of the function")]
    UnexpectedEnd,

    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExecutionErrorKind {
    /// Resource limits, as opposed to errors caused by the program's logic.
    pub fn is_resource_exceeded(&self) -> bool {
        matches!(
            self,
            ExecutionErrorKind::StackOverflow { .. } | ExecutionErrorKind::CallDepthExceeded { .. }
        )
    }
}
