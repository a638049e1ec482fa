//! Syntax tree produced by the parser and consumed by the translator.
//!
//! Every [`Block`] lists the variables and functions it declares separately from
//! the statements it runs. Each declaration records its `position`: the number of
//! the block's statements that precede it.

use super::syntax::{AssignOp, BinaryOp, Span, UnaryOp};
use crate::values::VarType;

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub variables: Vec<VarDecl>,
    pub functions: Vec<FunctionDecl>,
    pub statements: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: String,
    pub ty: VarType,
    pub position: usize,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub return_type: VarType,
    pub params: Vec<Param>,
    pub body: Block,
    pub position: usize,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: VarType,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Expr(Expr),
    Store {
        name: String,
        op: AssignOp,
        value: Expr,
    },
    Print(Vec<Expr>),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    For {
        var: String,
        var_span: Span,
        range: Expr,
        body: Box<Stmt>,
    },
    Return(Option<Expr>),
    Block(Block),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Int(i64),
    Double(f64),
    Str(String),
    Load(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

impl Stmt {
    /// Whether control can never fall through the end of this statement.
    pub fn always_returns(&self) -> bool {
        match &self.kind {
            StmtKind::Return(_) => true,
            StmtKind::Block(block) => block.always_returns(),
            StmtKind::If {
                then_branch,
                else_branch: Some(else_branch),
                ..
            } => then_branch.always_returns() && else_branch.always_returns(),
            _ => false,
        }
    }
}

impl Block {
    pub fn always_returns(&self) -> bool {
        self.statements.last().is_some_and(Stmt::always_returns)
    }
}
