//! Externally supplied variables.

use std::fmt;

use crate::values::VarType;

/// Value of an externally supplied variable.
#[derive(Debug, Clone, PartialEq)]
pub enum VarValue {
    Int(i64),
    Double(f64),
    Str(String),
}

impl VarValue {
    pub fn var_type(&self) -> VarType {
        match self {
            VarValue::Int(_) => VarType::Int,
            VarValue::Double(_) => VarType::Double,
            VarValue::Str(_) => VarType::String,
        }
    }
}

impl fmt::Display for VarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarValue::Int(v) => write!(f, "{}", v),
            VarValue::Double(v) => write!(f, "{}", v),
            VarValue::Str(s) => write!(f, "{:?}", s),
        }
    }
}

/// A named variable exchanged with a program's outermost block.
///
/// Before execution it seeds the global of the same name; afterwards it
/// receives that global's final value.
#[derive(Debug, Clone, PartialEq)]
pub struct Var {
    pub name: String,
    pub value: VarValue,
}

impl Var {
    pub fn new(name: impl Into<String>, value: VarValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn int(name: impl Into<String>, value: i64) -> Self {
        Self::new(name, VarValue::Int(value))
    }

    pub fn double(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, VarValue::Double(value))
    }

    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, VarValue::Str(value.into()))
    }
}
