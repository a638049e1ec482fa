//! Translation of the syntax tree into MathVM bytecode.
//!
//! The translator walks the tree once. Function signatures of a block are
//! registered before any statement of the block is lowered, so calls may
//! precede the function they refer to. Variables become visible where they are
//! declared. Variables of enclosing functions are reached through context
//! instructions keyed by the owning function's id.

mod error;
mod scope;
mod translator;


pub use error::{CompileError, CompileErrorKind};
pub use translator::{ENTRY_NAME, translate};
