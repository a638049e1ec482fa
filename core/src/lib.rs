//! Core of MathVM: a bytecode translator and stack-based virtual machine for
//! a small statically typed language.
//!
//! The pipeline is [`parser::parse`] → [`compiler::translate`] →
//! [`vm::Interpreter`]. [`api::Engine`] wraps all three.

pub mod api;
pub mod compiler;
pub mod parser;
pub mod values;
pub mod vm;
