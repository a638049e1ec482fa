//! The translation artifact: function table plus constant pool.

use hashbrown::HashMap;
use thiserror::Error;

use super::code::Bytecode;
use crate::values::VarType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProgramError {
    #[error("too many string constants (limit: 65536)")]
    TooManyConstants,
    #[error("too many functions (limit: 65536)")]
    TooManyFunctions,
}

// ============================================================================
// Constant Pool
// ============================================================================

/// Deduplicated table of string literals. Id 0 is always the empty string.
#[derive(Debug, Clone)]
pub struct ConstantPool {
    strings: Vec<Box<str>>,
    index: HashMap<Box<str>, u16>,
}

impl Default for ConstantPool {
    fn default() -> Self {
        let mut index = HashMap::new();
        index.insert(Box::from(""), 0);
        Self {
            strings: vec![Box::from("")],
            index,
        }
    }
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id of `s`, adding it to the pool if it was not seen before.
    pub fn intern(&mut self, s: &str) -> Result<u16, ProgramError> {
        if let Some(&id) = self.index.get(s) {
            return Ok(id);
        }
        let id = u16::try_from(self.strings.len()).map_err(|_| ProgramError::TooManyConstants)?;
        self.strings.push(Box::from(s));
        self.index.insert(Box::from(s), id);
        Ok(id)
    }

    pub fn resolve(&self, id: u16) -> Option<&str> {
        self.strings.get(id as usize).map(|s| &**s)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(|s| &**s)
    }
}

// ============================================================================
// Functions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub u16);

impl FunctionId {
    /// The program's entry function (the top-level code).
    pub const ENTRY: FunctionId = FunctionId(0);
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: VarType,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub id: FunctionId,
    pub name: String,
    pub params: Vec<Parameter>,
    pub return_type: VarType,
    /// Declared type of every local slot; parameters occupy the first slots.
    pub locals: Vec<VarType>,
    pub bytecode: Bytecode,
}

impl Function {
    pub fn locals_count(&self) -> usize {
        self.locals.len()
    }

    pub fn param_types(&self) -> impl Iterator<Item = VarType> + '_ {
        self.params.iter().map(|p| p.ty)
    }
}

/// A variable of the entry function's outermost block, visible to the embedder.
#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub name: String,
    pub ty: VarType,
    pub slot: u16,
}

// ============================================================================
// Program
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct Program {
    functions: Vec<Function>,
    by_name: HashMap<String, FunctionId>,
    constants: ConstantPool,
    globals: Vec<Global>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function and assign its id. The body is filled in later.
    pub fn declare(
        &mut self,
        name: &str,
        params: Vec<Parameter>,
        return_type: VarType,
    ) -> Result<FunctionId, ProgramError> {
        let id = FunctionId(
            u16::try_from(self.functions.len()).map_err(|_| ProgramError::TooManyFunctions)?,
        );
        let locals = params.iter().map(|p| p.ty).collect();
        self.functions.push(Function {
            id,
            name: name.to_owned(),
            params,
            return_type,
            locals,
            bytecode: Bytecode::new(),
        });
        self.by_name.entry(name.to_owned()).or_insert(id);
        tracing::debug!(function = name, id = id.0, "Declared function");
        Ok(id)
    }

    /// Record the final slot layout of a function once its scopes are resolved.
    pub fn set_locals(&mut self, id: FunctionId, locals: Vec<VarType>) {
        if let Some(function) = self.function_mut(id) {
            debug_assert!(locals.len() >= function.params.len());
            function.locals = locals;
        }
    }

    pub fn function(&self, id: FunctionId) -> Option<&Function> {
        self.functions.get(id.0 as usize)
    }

    pub fn function_mut(&mut self, id: FunctionId) -> Option<&mut Function> {
        self.functions.get_mut(id.0 as usize)
    }

    /// First function declared under `name`.
    pub fn function_by_name(&self, name: &str) -> Option<&Function> {
        self.by_name.get(name).and_then(|id| self.function(*id))
    }

    pub fn entry(&self) -> Option<&Function> {
        self.function(FunctionId::ENTRY)
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn constants(&self) -> &ConstantPool {
        &self.constants
    }

    pub fn constants_mut(&mut self) -> &mut ConstantPool {
        &mut self.constants
    }

    pub fn globals(&self) -> &[Global] {
        &self.globals
    }

    pub fn set_globals(&mut self, globals: Vec<Global>) {
        self.globals = globals;
    }

    pub fn global(&self, name: &str) -> Option<&Global> {
        self.globals.iter().find(|g| g.name == name)
    }
}
