//! Public error types for the MathVM API.
//!
//! Internal errors (parse, translation, execution) are converted to these
//! types at the API boundary.

use std::fmt;

use crate::parser::Span;
use crate::vm::{ExecutionError, Program};

/// Public error type for all MathVM operations.
#[derive(Debug)]
pub enum Error {
    /// Invalid API usage, e.g. a seeded variable of the wrong type.
    Api(String),

    /// Parse or translation error. Translation stops at the first error, so
    /// there is exactly one diagnostic.
    Compilation {
        diagnostic: Diagnostic,
        /// The source text the diagnostic's span refers to.
        source: String,
    },

    /// Fatal error while executing the program.
    Runtime {
        message: String,
        /// Name of the function executing when the error occurred.
        function: String,
        /// Byte address of the failing instruction within that function.
        address: usize,
    },

    /// Resource limits exceeded (operand stack or call depth).
    ResourceExceeded(String),
}

impl Error {
    pub fn compilation(diagnostic: Diagnostic, source: &str) -> Self {
        Error::Compilation {
            diagnostic,
            source: source.to_string(),
        }
    }

    /// Convert an execution error, naming the failing function from `program`.
    pub fn from_execution(err: ExecutionError, program: &Program) -> Self {
        if err.kind.is_resource_exceeded() {
            return Error::ResourceExceeded(err.kind.to_string());
        }
        let function = program
            .function(err.function)
            .map(|f| f.name.clone())
            .unwrap_or_else(|| format!("#{}", err.function.0));
        Error::Runtime {
            message: err.kind.to_string(),
            function,
            address: err.address,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Api(msg) => write!(f, "API error: {}", msg),
            Error::Compilation { diagnostic, .. } => {
                write!(f, "Compilation failed: {}", diagnostic.message)
            }
            Error::Runtime {
                message,
                function,
                address,
            } => write!(f, "Runtime error in {} at {}: {}", function, address, message),
            Error::ResourceExceeded(msg) => write!(f, "Resource limit exceeded: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

/// A diagnostic message with source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,

    /// Primary diagnostic message.
    pub message: String,

    /// Source location of the primary issue.
    pub span: Span,

    /// Related locations that provide additional context.
    pub related: Vec<RelatedInfo>,

    /// Optional help text suggesting how to fix the issue.
    pub help: Option<String>,

    /// Optional error code (e.g., "C001").
    pub code: Option<String>,
}

/// Severity level for diagnostics. Every diagnostic produced today stops
/// compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Related information for a diagnostic (e.g., "declared here").
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedInfo {
    pub span: Span,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::{ExecutionErrorKind, FunctionId};

    #[test]
    fn test_runtime_error_names_function() {
        let mut program = Program::new();
        program.declare("<top>", Vec::new(), crate::values::VarType::Void).unwrap();
        let err = ExecutionError {
            kind: ExecutionErrorKind::DivisionByZero,
            function: FunctionId::ENTRY,
            address: 7,
        };
        match Error::from_execution(err, &program) {
            Error::Runtime {
                message,
                function,
                address,
            } => {
                assert_eq!(message, "Division by zero");
                assert_eq!(function, "<top>");
                assert_eq!(address, 7);
            }
            other => panic!("expected runtime error, got {:?}", other),
        }
    }

    #[test]
    fn test_resource_errors_are_separate() {
        let program = Program::new();
        let err = ExecutionError {
            kind: ExecutionErrorKind::CallDepthExceeded { max_depth: 8 },
            function: FunctionId(3),
            address: 0,
        };
        let err = Error::from_execution(err, &program);
        assert!(matches!(err, Error::ResourceExceeded(_)));
        assert_eq!(
            err.to_string(),
            "Resource limit exceeded: Call depth exceeded (limit: 8 frames)"
        );
    }
}
