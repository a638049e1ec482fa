//! Public API for MathVM.
//!
//! [`Engine::compile`] turns source text into a [`Program`](crate::vm::Program),
//! [`Engine::execute`] runs it. Internal errors are converted to [`Error`] at
//! this boundary.
//!
//! # Example
//!
//! ```
//! use mathvm_core::api::{Engine, EngineOptions, Var};
//!
//! let engine = Engine::new(EngineOptions::default());
//! let program = engine.compile("int n; int sq; sq = n * n;").unwrap();
//!
//! let mut vars = [Var::int("n", 7), Var::int("sq", 0)];
//! engine.execute(&program, &mut vars, std::io::sink()).unwrap();
//! assert_eq!(vars[1], Var::int("sq", 49));
//! ```

pub mod engine;
pub mod error;
pub mod options;
pub mod var;

pub use engine::Engine;
pub use error::{Diagnostic, Error, RelatedInfo, Severity};
pub use options::{EngineOptions, ExecutionOptions};
pub use var::{Var, VarValue};
