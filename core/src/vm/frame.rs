use super::program::{Function, FunctionId};
use crate::values::Value;

/// One active function invocation.
#[derive(Debug, Clone)]
pub struct Frame {
    pub function: FunctionId,
    /// Address of the next instruction to execute.
    pub ip: usize,
    pub locals: Vec<Value>,
}

impl Frame {
    /// A fresh frame with every local set to the zero value of its declared type.
    pub fn new(function: &Function) -> Self {
        let locals = function
            .locals
            .iter()
            .map(|ty| Value::zero(*ty).unwrap_or(Value::Int(0)))
            .collect();
        Self {
            function: function.id,
            ip: 0,
            locals,
        }
    }
}
