//! Bytecode translation errors.

use thiserror::Error;

use crate::api::{Diagnostic, RelatedInfo, Severity};
use crate::parser::Span;
use crate::values::VarType;
use crate::vm::{BytecodeError, ProgramError};

/// A translation error together with the source span it refers to.
///
/// Translation stops at the first error; no partial program is produced.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}")]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileErrorKind {
    #[error("Unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("Unknown function '{0}'")]
    UnknownFunction(String),

    #[error("Function '{name}' expects {expected} argument(s), found {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: VarType, found: VarType },

    #[error("Operator '{op}' cannot be applied to {ty}")]
    InvalidOperand { op: &'static str, ty: VarType },

    #[error("Function returns {expected}, but the returned value is {found}")]
    ReturnMismatch { expected: VarType, found: VarType },

    #[error("Function '{0}' can reach its end without returning a value")]
    MissingReturn(String),

    #[error("A for loop iterates over a range 'from..to'")]
    MalformedRange,

    #[error("Ranges are only allowed in for loops")]
    RangeOutsideFor,

    #[error("For loop variable '{0}' must be an int")]
    ForVariableNotInt(String),

    #[error("Expression has no value")]
    VoidValue,

    #[error("Variable '{0}' cannot be declared void")]
    InvalidVariableType(String),

    #[error("Variable '{name}' is already declared in this scope")]
    DuplicateVariable { name: String, first: Span },

    #[error("Function '{name}' is already declared in this scope")]
    DuplicateFunction { name: String, first: Span },

    #[error("Too many local variables in one function (limit: 65536)")]
    TooManyLocals,

    #[error("Too many string constants (limit: 65536)")]
    TooManyConstants,

    #[error("Too many functions (limit: 65536)")]
    TooManyFunctions,

    #[error("Jump distance too large (limit: 32767 bytes)")]
    JumpTooFar,

    #[error("Internal bytecode error: {0}")]
    Bytecode(BytecodeError),
}

impl CompileError {
    pub fn new(kind: CompileErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Convert to a Diagnostic for API boundary.
    pub fn to_diagnostic(&self) -> Diagnostic {
        use CompileErrorKind::*;

        let (code, help) = match &self.kind {
            UnknownVariable(_) => ("C001", Some("Declare the variable before using it")),
            UnknownFunction(_) => ("C002", None),
            ArityMismatch { .. } => ("C003", None),
            TypeMismatch { .. } => ("C004", None),
            InvalidOperand { .. } => ("C005", None),
            ReturnMismatch { .. } => ("C006", None),
            MissingReturn(_) => ("C007", Some("Add a return statement at the end of the function")),
            MalformedRange => ("C008", None),
            RangeOutsideFor => ("C009", None),
            ForVariableNotInt(_) => ("C010", None),
            VoidValue => ("C011", None),
            InvalidVariableType(_) => ("C012", Some("Use int, double or string")),
            DuplicateVariable { .. } => ("C013", None),
            DuplicateFunction { .. } => ("C014", None),
            TooManyLocals | TooManyConstants | TooManyFunctions | JumpTooFar => ("C015", None),
            Bytecode(_) => ("C999", None),
        };

        let related = match &self.kind {
            DuplicateVariable { first, .. } | DuplicateFunction { first, .. } => vec![RelatedInfo {
                span: first.clone(),
                message: "first declared here".to_string(),
            }],
            _ => Vec::new(),
        };

        Diagnostic {
            severity: Severity::Error,
            message: self.kind.to_string(),
            span: self.span.clone(),
            related,
            help: help.map(String::from),
            code: Some(code.to_string()),
        }
    }
}

impl From<ProgramError> for CompileErrorKind {
    fn from(err: ProgramError) -> Self {
        match err {
            ProgramError::TooManyConstants => CompileErrorKind::TooManyConstants,
            ProgramError::TooManyFunctions => CompileErrorKind::TooManyFunctions,
        }
    }
}

impl From<BytecodeError> for CompileErrorKind {
    fn from(err: BytecodeError) -> Self {
        match err {
            BytecodeError::JumpTooFar(_) => CompileErrorKind::JumpTooFar,
            other => CompileErrorKind::Bytecode(other),
        }
    }
}
