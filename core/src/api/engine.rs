//! The MathVM compilation and execution engine.

use std::io::Write;

use super::{EngineOptions, Error, Var, VarValue};
use crate::values::Value;
use crate::vm::{Interpreter, Program};
use crate::{compiler, parser};

/// Compiles MathVM source into programs and runs them.
///
/// # Example
///
/// ```
/// use mathvm_core::api::{Engine, EngineOptions};
///
/// let engine = Engine::new(EngineOptions::default());
/// let mut out = Vec::new();
/// engine.run("int x; x = 2 + 3; print(x);", &mut out).unwrap();
/// assert_eq!(out, b"5");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Engine {
    options: EngineOptions,
}

impl Engine {
    pub fn new(options: EngineOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Parse and translate `source`.
    ///
    /// Nothing is returned on error: the first parse or translation error
    /// aborts compilation.
    pub fn compile(&self, source: &str) -> Result<Program, Error> {
        let ast = parser::parse(source).map_err(|err| Error::compilation(err.to_diagnostic(), source))?;
        let program =
            compiler::translate(&ast).map_err(|err| Error::compilation(err.to_diagnostic(), source))?;
        tracing::debug!(
            functions = program.functions().len(),
            constants = program.constants().len(),
            "Compiled program"
        );
        Ok(program)
    }

    /// Execute `program`, writing its output to `out`.
    ///
    /// Each of `vars` whose name matches a variable of the program's outermost
    /// block seeds that variable and, after a successful run, receives its
    /// final value. Names the program does not declare are ignored.
    pub fn execute(&self, program: &Program, vars: &mut [Var], out: impl Write) -> Result<(), Error> {
        let mut interpreter = Interpreter::new(program, &self.options.execution, out);

        let mut preset = Vec::new();
        for var in vars.iter() {
            let Some(global) = program.global(&var.name) else {
                continue;
            };
            if var.value.var_type() != global.ty {
                return Err(Error::Api(format!(
                    "Variable '{}' is declared as {}, but a {} value was supplied",
                    var.name,
                    global.ty,
                    var.value.var_type()
                )));
            }
            let value = match &var.value {
                VarValue::Int(v) => Value::Int(*v),
                VarValue::Double(v) => Value::Double(*v),
                VarValue::Str(s) => Value::Str(
                    interpreter
                        .constants_mut()
                        .intern(s)
                        .map_err(|err| Error::ResourceExceeded(err.to_string()))?,
                ),
            };
            preset.push((global.slot, value));
        }

        let locals = interpreter
            .run_with_locals(&preset)
            .map_err(|err| Error::from_execution(err, program))?;

        for var in vars.iter_mut() {
            let Some(value) = program
                .global(&var.name)
                .and_then(|global| locals.get(global.slot as usize))
            else {
                continue;
            };
            var.value = match *value {
                Value::Int(v) => VarValue::Int(v),
                Value::Double(v) => VarValue::Double(v),
                Value::Str(id) => VarValue::Str(
                    interpreter
                        .constants()
                        .resolve(id)
                        .unwrap_or_default()
                        .to_string(),
                ),
            };
        }
        Ok(())
    }

    /// Compile and execute `source` without external variables.
    pub fn run(&self, source: &str, out: impl Write) -> Result<(), Error> {
        let program = self.compile(source)?;
        self.execute(&program, &mut [], out)
    }
}
