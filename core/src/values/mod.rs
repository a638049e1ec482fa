//! Runtime values and the static type lattice.

mod value;
mod var_type;

pub use value::Value;
pub use var_type::VarType;

#[cfg(test)]
mod value_test;
