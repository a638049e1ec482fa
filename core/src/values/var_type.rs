//! Static types of the source language.

use core::fmt;

/// Static type of a variable, parameter, return value or expression.
///
/// There is no boolean type: conditions are `Int` values constrained to 0/1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarType {
    /// Placeholder for "no valid type" (e.g. the result of promoting a string).
    Invalid,
    Void,
    Int,
    Double,
    String,
}

impl VarType {
    /// Parse a type keyword as written in source code.
    pub fn from_name(name: &str) -> Option<VarType> {
        match name {
            "void" => Some(VarType::Void),
            "int" => Some(VarType::Int),
            "double" => Some(VarType::Double),
            "string" => Some(VarType::String),
            _ => None,
        }
    }

    pub const fn is_numeric(self) -> bool {
        matches!(self, VarType::Int | VarType::Double)
    }

    /// Types that can live in a variable slot or on the operand stack.
    pub const fn is_storable(self) -> bool {
        matches!(self, VarType::Int | VarType::Double | VarType::String)
    }

    /// Common type of two arithmetic operands.
    ///
    /// `int` and `double` widen to `double` when mixed; strings never take part in
    /// arithmetic, so any non-numeric operand yields `Invalid`.
    pub const fn promote(a: VarType, b: VarType) -> VarType {
        match (a, b) {
            (VarType::Int, VarType::Int) => VarType::Int,
            (VarType::Int | VarType::Double, VarType::Int | VarType::Double) => VarType::Double,
            _ => VarType::Invalid,
        }
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VarType::Invalid => "<invalid>",
            VarType::Void => "void",
            VarType::Int => "int",
            VarType::Double => "double",
            VarType::String => "string",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promotion_lattice() {
        assert_eq!(VarType::promote(VarType::Int, VarType::Int), VarType::Int);
        assert_eq!(VarType::promote(VarType::Int, VarType::Double), VarType::Double);
        assert_eq!(VarType::promote(VarType::Double, VarType::Int), VarType::Double);
        assert_eq!(VarType::promote(VarType::Double, VarType::Double), VarType::Double);
        assert_eq!(VarType::promote(VarType::String, VarType::Int), VarType::Invalid);
        assert_eq!(VarType::promote(VarType::Void, VarType::Void), VarType::Invalid);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(VarType::from_name("int"), Some(VarType::Int));
        assert_eq!(VarType::from_name("string"), Some(VarType::String));
        assert_eq!(VarType::from_name("bool"), None);
        assert_eq!(VarType::Double.to_string(), "double");
    }
}
