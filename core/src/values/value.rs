use core::fmt;

use super::VarType;

/// A runtime value on the operand stack or in a locals slot.
///
/// Strings are never owned by the value itself: `Str` holds an id into the
/// constant pool of the program being executed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i64),
    Double(f64),
    Str(u16),
}
static_assertions::assert_eq_size!(Value, [u8; 16]);

impl Value {
    /// Id of the empty string in every constant pool.
    pub const EMPTY_STRING: u16 = 0;

    /// Zero value of a declared type, used for locals that were never stored to.
    ///
    /// Returns `None` for types that cannot be held in a slot.
    pub const fn zero(ty: VarType) -> Option<Value> {
        match ty {
            VarType::Int => Some(Value::Int(0)),
            VarType::Double => Some(Value::Double(0.0)),
            VarType::String => Some(Value::Str(Self::EMPTY_STRING)),
            VarType::Void | VarType::Invalid => None,
        }
    }

    pub const fn var_type(&self) -> VarType {
        match self {
            Value::Int(_) => VarType::Int,
            Value::Double(_) => VarType::Double,
            Value::Str(_) => VarType::String,
        }
    }

    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub const fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub const fn as_string_id(&self) -> Option<u16> {
        match self {
            Value::Str(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    /// Formats numbers the way `print` does; strings show their pool id since
    /// resolving them needs the constant pool.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Str(id) => write!(f, "<string #{}>", id),
        }
    }
}
