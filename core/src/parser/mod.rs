//! Source parser for the MathVM language.
//!
//! Built on a `pest` grammar with a Pratt parser for operator precedence. The
//! result is a [`Block`]: the outermost scope of the program's entry function.

pub mod ast;
pub mod error;
#[allow(clippy::module_inception)]
pub mod parser;
mod syntax;

pub use ast::{Block, Expr, ExprKind, FunctionDecl, Param, Stmt, StmtKind, VarDecl};
pub use error::{ParseError, ParseErrorKind};
pub use parser::{MathVmParser, Rule, parse};
pub use syntax::{AssignOp, BinaryOp, Span, UnaryOp};
