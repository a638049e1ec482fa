//! MathVM - a bytecode translator and stack virtual machine
//!
//! # Overview
//!
//! MathVM compiles a small statically typed language (`int`, `double` and
//! `string` variables, nested functions, `if`/`while`/`for` and `print`) to a
//! compact bytecode and executes it on a stack machine.
//!
//! # Quick Start
//!
//! ```
//! use mathvm::{Engine, EngineOptions};
//!
//! let engine = Engine::new(EngineOptions::default());
//! let mut out = Vec::new();
//! engine.run("for (i in 1..3) print(i);", &mut out).unwrap();
//! assert_eq!(out, b"123");
//! ```
//!
//! # External variables
//!
//! Variables declared in the outermost block can be seeded before a run and
//! read back afterwards:
//!
//! ```
//! use mathvm::{Engine, EngineOptions, Var};
//!
//! let engine = Engine::new(EngineOptions::default());
//! let program = engine.compile("double r; double area; area = 3.0 * r * r;").unwrap();
//!
//! let mut vars = [Var::double("r", 2.0), Var::double("area", 0.0)];
//! engine.execute(&program, &mut vars, std::io::sink()).unwrap();
//! assert_eq!(vars[1], Var::double("area", 12.0));
//! ```

// Re-export public API from mathvm_core
pub use mathvm_core::api::{
    Diagnostic, Engine, EngineOptions, Error, ExecutionOptions, RelatedInfo, Severity, Var,
    VarValue,
};

// Lower layers, for embedders that drive the pipeline themselves
pub use mathvm_core::compiler::{self, CompileError, CompileErrorKind, translate};
pub use mathvm_core::parser::{self, ParseError, parse};
pub use mathvm_core::values::{self, Value, VarType};
pub use mathvm_core::vm::{self, Bytecode, Instruction, Interpreter, Opcode, Program};

mod error_renderer;
pub use error_renderer::{
    render_error, render_error_to, render_error_to_string, render_error_to_string_no_color,
};
