//! Lowers the syntax tree into MathVM bytecode.

use crate::parser::{AssignOp, BinaryOp, Block, Expr, ExprKind, FunctionDecl, Span, Stmt, StmtKind, UnaryOp};
use crate::values::VarType;
use crate::vm::{Bytecode, FunctionId, Global, Label, Opcode, Parameter, Program};

use super::error::{CompileError, CompileErrorKind};
use super::scope::{ScopeArena, ScopeId, VarSlot};

/// Name of the function holding the program's top-level code.
pub const ENTRY_NAME: &str = "<top>";

/// Translate a parsed program into a [`Program`].
///
/// Translation is all-or-nothing: the first error aborts it and no program is
/// returned.
pub fn translate(top: &Block) -> Result<Program, CompileError> {
    let mut translator = Translator::new();
    translator.translate_entry(top)?;
    Ok(translator.program)
}

/// Per-function translation state.
struct FunctionContext {
    id: FunctionId,
    return_type: VarType,
    locals: Vec<VarType>,
    code: Bytecode,
}

impl FunctionContext {
    fn new(id: FunctionId, return_type: VarType) -> Self {
        Self {
            id,
            return_type,
            locals: Vec::new(),
            code: Bytecode::new(),
        }
    }
}

/// Opcode families for one value type.
struct VarOpcodes {
    fast: [Opcode; 4],
    slot: Opcode,
    context: Opcode,
}

fn load_opcodes(ty: VarType) -> Option<VarOpcodes> {
    use Opcode::*;
    match ty {
        VarType::Int => Some(VarOpcodes {
            fast: [LoadIVar0, LoadIVar1, LoadIVar2, LoadIVar3],
            slot: LoadIVar,
            context: LoadCtxIVar,
        }),
        VarType::Double => Some(VarOpcodes {
            fast: [LoadDVar0, LoadDVar1, LoadDVar2, LoadDVar3],
            slot: LoadDVar,
            context: LoadCtxDVar,
        }),
        VarType::String => Some(VarOpcodes {
            fast: [LoadSVar0, LoadSVar1, LoadSVar2, LoadSVar3],
            slot: LoadSVar,
            context: LoadCtxSVar,
        }),
        VarType::Void | VarType::Invalid => None,
    }
}

fn store_opcodes(ty: VarType) -> Option<VarOpcodes> {
    use Opcode::*;
    match ty {
        VarType::Int => Some(VarOpcodes {
            fast: [StoreIVar0, StoreIVar1, StoreIVar2, StoreIVar3],
            slot: StoreIVar,
            context: StoreCtxIVar,
        }),
        VarType::Double => Some(VarOpcodes {
            fast: [StoreDVar0, StoreDVar1, StoreDVar2, StoreDVar3],
            slot: StoreDVar,
            context: StoreCtxDVar,
        }),
        VarType::String => Some(VarOpcodes {
            fast: [StoreSVar0, StoreSVar1, StoreSVar2, StoreSVar3],
            slot: StoreSVar,
            context: StoreCtxSVar,
        }),
        VarType::Void | VarType::Invalid => None,
    }
}

/// Conditional branch taken when `lower op upper` holds.
fn branch_opcode(op: BinaryOp) -> Option<Opcode> {
    match op {
        BinaryOp::Eq => Some(Opcode::IfICmpE),
        BinaryOp::Ne => Some(Opcode::IfICmpNe),
        BinaryOp::Lt => Some(Opcode::IfICmpL),
        BinaryOp::Le => Some(Opcode::IfICmpLe),
        BinaryOp::Gt => Some(Opcode::IfICmpG),
        BinaryOp::Ge => Some(Opcode::IfICmpGe),
        _ => None,
    }
}

fn error(kind: CompileErrorKind, span: &Span) -> CompileError {
    CompileError::new(kind, span.clone())
}

fn at<T, E: Into<CompileErrorKind>>(result: Result<T, E>, span: &Span) -> Result<T, CompileError> {
    result.map_err(|err| CompileError::new(err.into(), span.clone()))
}

struct Translator {
    program: Program,
    scopes: ScopeArena,
    /// Function currently being emitted.
    current: FunctionContext,
    /// Enclosing functions whose translation is suspended.
    suspended: Vec<FunctionContext>,
}

impl Translator {
    fn new() -> Self {
        Self {
            program: Program::new(),
            scopes: ScopeArena::new(),
            current: FunctionContext::new(FunctionId::ENTRY, VarType::Void),
            suspended: Vec::new(),
        }
    }

    fn translate_entry(&mut self, top: &Block) -> Result<(), CompileError> {
        let id = at(self.program.declare(ENTRY_NAME, Vec::new(), VarType::Void), &top.span)?;
        tracing::debug!(id = id.0, "Translating entry function");
        self.current = FunctionContext::new(id, VarType::Void);

        let root = self.scopes.push(None);
        let scope = self.block(top, root)?;
        self.emit(Opcode::Stop);

        let globals = top
            .variables
            .iter()
            .filter_map(|decl| {
                self.scopes.lookup_variable(scope, &decl.name).map(|var| Global {
                    name: decl.name.clone(),
                    ty: var.ty,
                    slot: var.slot,
                })
            })
            .collect();
        self.program.set_globals(globals);
        self.finish_function();
        Ok(())
    }

    /// Move the current function's code and slot layout into the program.
    fn finish_function(&mut self) {
        let context = core::mem::replace(
            &mut self.current,
            FunctionContext::new(FunctionId::ENTRY, VarType::Void),
        );
        let FunctionContext {
            id, locals, code, ..
        } = context;
        tracing::debug!(
            id = id.0,
            locals = locals.len(),
            bytes = code.len(),
            "Finished function"
        );
        self.program.set_locals(id, locals);
        if let Some(function) = self.program.function_mut(id) {
            function.bytecode = code;
        }
    }

    // === Emission ===

    fn emit(&mut self, opcode: Opcode) {
        self.current.code.add_opcode(opcode);
    }

    fn emit_u16(&mut self, opcode: Opcode, operand: u16) {
        self.current.code.add_opcode(opcode);
        self.current.code.add_operand(operand);
    }

    fn branch(&mut self, opcode: Opcode, label: &mut Label, span: &Span) -> Result<(), CompileError> {
        at(self.current.code.add_branch(opcode, label), span)
    }

    fn bind(&mut self, label: &mut Label, span: &Span) -> Result<(), CompileError> {
        at(self.current.code.bind(label), span)
    }

    fn load_int(&mut self, value: i64) {
        match value {
            0 => self.emit(Opcode::ILoad0),
            1 => self.emit(Opcode::ILoad1),
            -1 => self.emit(Opcode::ILoadM1),
            _ => {
                self.emit(Opcode::ILoad);
                self.current.code.add_operand(value);
            }
        }
    }

    fn load_double(&mut self, value: f64) {
        if value.to_bits() == 0f64.to_bits() {
            self.emit(Opcode::DLoad0);
        } else if value == 1.0 {
            self.emit(Opcode::DLoad1);
        } else if value == -1.0 {
            self.emit(Opcode::DLoadM1);
        } else {
            self.emit(Opcode::DLoad);
            self.current.code.add_operand(value);
        }
    }

    fn load_string(&mut self, value: &str, span: &Span) -> Result<(), CompileError> {
        if value.is_empty() {
            self.emit(Opcode::SLoad0);
        } else {
            let id = at(self.program.constants_mut().intern(value), span)?;
            self.emit_u16(Opcode::SLoad, id);
        }
        Ok(())
    }

    fn access(&mut self, opcodes: Option<VarOpcodes>, var: VarSlot, span: &Span) -> Result<(), CompileError> {
        let Some(opcodes) = opcodes else {
            return Err(error(CompileErrorKind::VoidValue, span));
        };
        if var.owner != self.current.id {
            self.emit(opcodes.context);
            self.current.code.add_operand(var.owner.0);
            self.current.code.add_operand(var.slot);
        } else if let Some(&fast) = opcodes.fast.get(var.slot as usize) {
            self.emit(fast);
        } else {
            self.emit_u16(opcodes.slot, var.slot);
        }
        Ok(())
    }

    fn load_var(&mut self, var: VarSlot, span: &Span) -> Result<(), CompileError> {
        self.access(load_opcodes(var.ty), var, span)
    }

    fn store_var(&mut self, var: VarSlot, span: &Span) -> Result<(), CompileError> {
        self.access(store_opcodes(var.ty), var, span)
    }

    /// Emit the conversion of the value on top of the stack from `from` to `to`.
    fn convert(&mut self, from: VarType, to: VarType, span: &Span) -> Result<(), CompileError> {
        match (from, to) {
            _ if from == to && from.is_storable() => {}
            (VarType::Void, _) => return Err(error(CompileErrorKind::VoidValue, span)),
            (VarType::Int, VarType::Double) => self.emit(Opcode::I2D),
            (VarType::Double, VarType::Int) => self.emit(Opcode::D2I),
            (VarType::String, VarType::Int) => self.emit(Opcode::S2I),
            (VarType::String, VarType::Double) => {
                self.emit(Opcode::S2I);
                self.emit(Opcode::I2D);
            }
            _ => {
                return Err(error(
                    CompileErrorKind::TypeMismatch {
                        expected: to,
                        found: from,
                    },
                    span,
                ));
            }
        }
        Ok(())
    }

    // === Scopes ===

    fn declare_local(&mut self, scope: ScopeId, name: &str, ty: VarType, span: &Span) -> Result<VarSlot, CompileError> {
        if !ty.is_storable() {
            return Err(error(CompileErrorKind::InvalidVariableType(name.to_string()), span));
        }
        let slot = u16::try_from(self.current.locals.len())
            .map_err(|_| error(CompileErrorKind::TooManyLocals, span))?;
        let var = VarSlot {
            owner: self.current.id,
            slot,
            ty,
        };
        self.scopes.declare_variable(scope, name, var, span).map_err(|first| {
            let name = name.to_string();
            error(CompileErrorKind::DuplicateVariable { name, first }, span)
        })?;
        self.current.locals.push(ty);
        Ok(var)
    }

    fn resolve_variable(&self, scope: ScopeId, name: &str, span: &Span) -> Result<VarSlot, CompileError> {
        self.scopes
            .lookup_variable(scope, name)
            .ok_or_else(|| error(CompileErrorKind::UnknownVariable(name.to_string()), span))
    }

    /// Parameter types and return type of the function `name` resolves to.
    fn resolve_function(
        &self,
        scope: ScopeId,
        name: &str,
        span: &Span,
    ) -> Result<(FunctionId, Vec<VarType>, VarType), CompileError> {
        self.scopes
            .lookup_function(scope, name)
            .and_then(|id| self.program.function(id))
            .map(|f| (f.id, f.param_types().collect(), f.return_type))
            .ok_or_else(|| error(CompileErrorKind::UnknownFunction(name.to_string()), span))
    }

    /// Translate a block in source order.
    ///
    /// Functions are callable from anywhere in their block. A variable is visible
    /// only after its declaration; a function body is translated where it is
    /// declared and sees the enclosing locals declared before it.
    fn block(&mut self, block: &Block, parent: ScopeId) -> Result<ScopeId, CompileError> {
        let scope = self.scopes.push(Some(parent));

        let mut declared = Vec::with_capacity(block.functions.len());
        for decl in &block.functions {
            let mut params = Vec::with_capacity(decl.params.len());
            for param in &decl.params {
                if !param.ty.is_storable() {
                    return Err(error(
                        CompileErrorKind::InvalidVariableType(param.name.clone()),
                        &param.span,
                    ));
                }
                params.push(Parameter {
                    name: param.name.clone(),
                    ty: param.ty,
                });
            }
            let id = at(self.program.declare(&decl.name, params, decl.return_type), &decl.span)?;
            self.scopes.declare_function(scope, &decl.name, id, &decl.span).map_err(|first| {
                let name = decl.name.clone();
                error(CompileErrorKind::DuplicateFunction { name, first }, &decl.span)
            })?;
            declared.push(id);
        }

        let mut variables = block.variables.iter().peekable();
        let mut functions = block.functions.iter().zip(declared).peekable();
        for position in 0..=block.statements.len() {
            loop {
                let variable = variables
                    .peek()
                    .filter(|decl| decl.position == position)
                    .map(|decl| decl.span.0.start);
                let function = functions
                    .peek()
                    .filter(|(decl, _)| decl.position == position)
                    .map(|(decl, _)| decl.span.0.start);
                match (variable, function) {
                    (Some(var_start), fn_start) if fn_start.is_none_or(|start| var_start < start) => {
                        if let Some(decl) = variables.next() {
                            self.declare_local(scope, &decl.name, decl.ty, &decl.span)?;
                        }
                    }
                    (_, Some(_)) => {
                        if let Some((decl, id)) = functions.next() {
                            self.function(decl, id, scope)?;
                        }
                    }
                    _ => break,
                }
            }
            if let Some(stmt) = block.statements.get(position) {
                self.statement(stmt, scope)?;
            }
        }
        Ok(scope)
    }

    fn function(&mut self, decl: &FunctionDecl, id: FunctionId, parent: ScopeId) -> Result<(), CompileError> {
        tracing::debug!(function = %decl.name, id = id.0, "Translating function");
        let outer = core::mem::replace(&mut self.current, FunctionContext::new(id, decl.return_type));
        self.suspended.push(outer);

        let scope = self.scopes.push(Some(parent));
        let mut params = Vec::with_capacity(decl.params.len());
        for param in &decl.params {
            params.push(self.declare_local(scope, &param.name, param.ty, &param.span)?);
        }
        // Arguments arrive in declaration order, so the last one is on top.
        for param in params.into_iter().rev() {
            self.store_var(param, &decl.span)?;
        }

        self.block(&decl.body, scope)?;
        if !decl.body.always_returns() {
            if decl.return_type != VarType::Void {
                return Err(error(CompileErrorKind::MissingReturn(decl.name.clone()), &decl.span));
            }
            self.emit(Opcode::Return);
        }

        self.finish_function();
        if let Some(outer) = self.suspended.pop() {
            self.current = outer;
        }
        Ok(())
    }

    // === Statements ===

    fn statement(&mut self, stmt: &Stmt, scope: ScopeId) -> Result<(), CompileError> {
        let span = &stmt.span;
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                if self.expr(expr, scope)? != VarType::Void {
                    self.emit(Opcode::Pop);
                }
            }

            StmtKind::Store { name, op, value } => {
                let var = self.resolve_variable(scope, name, span)?;
                match op {
                    AssignOp::Assign => self.expr_as(value, scope, var.ty)?,
                    AssignOp::AddAssign | AssignOp::SubAssign => {
                        let (symbol, int_op, double_op) = match op {
                            AssignOp::AddAssign => ("+=", Opcode::IAdd, Opcode::DAdd),
                            _ => ("-=", Opcode::ISub, Opcode::DSub),
                        };
                        let opcode = match var.ty {
                            VarType::Int => int_op,
                            VarType::Double => double_op,
                            ty => return Err(error(CompileErrorKind::InvalidOperand { op: symbol, ty }, span)),
                        };
                        self.load_var(var, span)?;
                        self.expr_as(value, scope, var.ty)?;
                        self.emit(opcode);
                    }
                }
                self.store_var(var, span)?;
            }

            StmtKind::Print(args) => {
                for arg in args {
                    let opcode = match self.expr(arg, scope)? {
                        VarType::Int => Opcode::IPrint,
                        VarType::Double => Opcode::DPrint,
                        VarType::String => Opcode::SPrint,
                        _ => return Err(error(CompileErrorKind::VoidValue, &arg.span)),
                    };
                    self.emit(opcode);
                }
            }

            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let mut otherwise = Label::new();
                self.condition(cond, scope)?;
                self.emit(Opcode::ILoad0);
                self.branch(Opcode::IfICmpE, &mut otherwise, span)?;
                self.statement(then_branch, scope)?;
                match else_branch {
                    Some(else_branch) => {
                        let mut end = Label::new();
                        self.branch(Opcode::Ja, &mut end, span)?;
                        self.bind(&mut otherwise, span)?;
                        self.statement(else_branch, scope)?;
                        self.bind(&mut end, span)?;
                    }
                    None => self.bind(&mut otherwise, span)?,
                }
            }

            StmtKind::While { cond, body } => {
                let mut top = Label::new();
                let mut end = Label::new();
                self.bind(&mut top, span)?;
                self.condition(cond, scope)?;
                self.emit(Opcode::ILoad0);
                self.branch(Opcode::IfICmpE, &mut end, span)?;
                self.statement(body, scope)?;
                self.branch(Opcode::Ja, &mut top, span)?;
                self.bind(&mut end, span)?;
            }

            StmtKind::For {
                var,
                var_span,
                range,
                body,
            } => {
                let ExprKind::Binary {
                    op: BinaryOp::Range,
                    left: lower,
                    right: upper,
                } = &range.kind
                else {
                    return Err(error(CompileErrorKind::MalformedRange, &range.span));
                };

                let (var, loop_scope) = match self.scopes.lookup_variable(scope, var) {
                    Some(found) if found.ty == VarType::Int => (found, scope),
                    Some(_) => return Err(error(CompileErrorKind::ForVariableNotInt(var.clone()), var_span)),
                    None => {
                        let loop_scope = self.scopes.push(Some(scope));
                        let declared = self.declare_local(loop_scope, var, VarType::Int, var_span)?;
                        (declared, loop_scope)
                    }
                };

                // The bound is checked once on entry, then before each increment,
                // so the counter never steps past `upper` and cannot wrap.
                let mut top = Label::new();
                let mut end = Label::new();
                self.expr_as(lower, loop_scope, VarType::Int)?;
                self.store_var(var, var_span)?;
                self.load_var(var, var_span)?;
                self.expr_as(upper, loop_scope, VarType::Int)?;
                self.branch(Opcode::IfICmpG, &mut end, span)?;
                self.bind(&mut top, span)?;
                self.statement(body, loop_scope)?;
                self.load_var(var, var_span)?;
                self.expr_as(upper, loop_scope, VarType::Int)?;
                self.branch(Opcode::IfICmpGe, &mut end, span)?;
                self.load_var(var, var_span)?;
                self.emit(Opcode::ILoad1);
                self.emit(Opcode::IAdd);
                self.store_var(var, var_span)?;
                self.branch(Opcode::Ja, &mut top, span)?;
                self.bind(&mut end, span)?;
            }

            StmtKind::Return(value) => {
                let expected = self.current.return_type;
                match value {
                    Some(value) if expected != VarType::Void => self.expr_as(value, scope, expected)?,
                    Some(value) => {
                        let found = self.infer(value, scope)?;
                        return Err(error(CompileErrorKind::ReturnMismatch { expected, found }, &value.span));
                    }
                    None if expected != VarType::Void => {
                        return Err(error(
                            CompileErrorKind::ReturnMismatch {
                                expected,
                                found: VarType::Void,
                            },
                            span,
                        ));
                    }
                    None => {}
                }
                self.emit(Opcode::Return);
            }

            StmtKind::Block(block) => {
                self.block(block, scope)?;
            }
        }
        Ok(())
    }

    /// Leave the int truth value of `cond` on the stack.
    fn condition(&mut self, cond: &Expr, scope: ScopeId) -> Result<(), CompileError> {
        match self.expr(cond, scope)? {
            VarType::Int => Ok(()),
            VarType::Double => {
                self.emit(Opcode::D2I);
                Ok(())
            }
            VarType::Void => Err(error(CompileErrorKind::VoidValue, &cond.span)),
            found => Err(error(
                CompileErrorKind::TypeMismatch {
                    expected: VarType::Int,
                    found,
                },
                &cond.span,
            )),
        }
    }

    // === Expressions ===

    /// Static type of `expr`, without emitting code.
    fn infer(&self, expr: &Expr, scope: ScopeId) -> Result<VarType, CompileError> {
        let ty = match &expr.kind {
            ExprKind::Int(_) => VarType::Int,
            ExprKind::Double(_) => VarType::Double,
            ExprKind::Str(_) => VarType::String,
            ExprKind::Load(name) => self.resolve_variable(scope, name, &expr.span)?.ty,
            ExprKind::Call { name, .. } => self.resolve_function(scope, name, &expr.span)?.2,
            ExprKind::Unary {
                op: UnaryOp::Neg,
                operand,
            } => {
                let ty = self.infer(operand, scope)?;
                if !ty.is_numeric() {
                    return Err(error(CompileErrorKind::InvalidOperand { op: "-", ty }, &operand.span));
                }
                ty
            }
            ExprKind::Unary { op: UnaryOp::Not, .. } => VarType::Int,
            ExprKind::Binary { op, left, right } => match op {
                BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                    self.arithmetic_type(*op, left, right, scope)?
                }
                BinaryOp::Range => return Err(error(CompileErrorKind::RangeOutsideFor, &expr.span)),
                _ => VarType::Int,
            },
        };
        Ok(ty)
    }

    fn arithmetic_type(&self, op: BinaryOp, left: &Expr, right: &Expr, scope: ScopeId) -> Result<VarType, CompileError> {
        let lt = self.infer(left, scope)?;
        let rt = self.infer(right, scope)?;
        match VarType::promote(lt, rt) {
            VarType::Invalid => {
                let (ty, span) = if lt.is_numeric() { (rt, &right.span) } else { (lt, &left.span) };
                Err(error(CompileErrorKind::InvalidOperand { op: op.symbol(), ty }, span))
            }
            ty => Ok(ty),
        }
    }

    /// Translate `expr` and convert its value to `target`.
    fn expr_as(&mut self, expr: &Expr, scope: ScopeId, target: VarType) -> Result<(), CompileError> {
        let ty = self.expr(expr, scope)?;
        self.convert(ty, target, &expr.span)
    }

    /// Translate `expr`, returning the type of the value it leaves on the stack.
    fn expr(&mut self, expr: &Expr, scope: ScopeId) -> Result<VarType, CompileError> {
        let span = &expr.span;
        match &expr.kind {
            ExprKind::Int(v) => {
                self.load_int(*v);
                Ok(VarType::Int)
            }
            ExprKind::Double(v) => {
                self.load_double(*v);
                Ok(VarType::Double)
            }
            ExprKind::Str(s) => {
                self.load_string(s, span)?;
                Ok(VarType::String)
            }
            ExprKind::Load(name) => {
                let var = self.resolve_variable(scope, name, span)?;
                self.load_var(var, span)?;
                Ok(var.ty)
            }
            ExprKind::Call { name, args } => self.call(name, args, scope, span),
            ExprKind::Unary { op, operand } => self.unary(*op, operand, scope, span),
            ExprKind::Binary { op, left, right } => self.binary(*op, left, right, scope, span),
        }
    }

    fn call(&mut self, name: &str, args: &[Expr], scope: ScopeId, span: &Span) -> Result<VarType, CompileError> {
        let (id, params, return_type) = self.resolve_function(scope, name, span)?;
        if params.len() != args.len() {
            return Err(error(
                CompileErrorKind::ArityMismatch {
                    name: name.to_string(),
                    expected: params.len(),
                    found: args.len(),
                },
                span,
            ));
        }
        for (arg, ty) in args.iter().zip(params) {
            self.expr_as(arg, scope, ty)?;
        }
        self.emit_u16(Opcode::Call, id.0);
        Ok(return_type)
    }

    fn unary(&mut self, op: UnaryOp, operand: &Expr, scope: ScopeId, span: &Span) -> Result<VarType, CompileError> {
        match op {
            UnaryOp::Neg => match operand.kind {
                ExprKind::Int(v) => {
                    self.load_int(v.wrapping_neg());
                    Ok(VarType::Int)
                }
                ExprKind::Double(v) => {
                    self.load_double(-v);
                    Ok(VarType::Double)
                }
                _ => {
                    let ty = self.expr(operand, scope)?;
                    match ty {
                        VarType::Int => self.emit(Opcode::INeg),
                        VarType::Double => self.emit(Opcode::DNeg),
                        VarType::Void => return Err(error(CompileErrorKind::VoidValue, &operand.span)),
                        ty => {
                            return Err(error(CompileErrorKind::InvalidOperand { op: "-", ty }, &operand.span));
                        }
                    }
                    Ok(ty)
                }
            },
            UnaryOp::Not => {
                let mut truthy = Label::new();
                let mut end = Label::new();
                self.logical_operand(operand, scope, "!")?;
                self.emit(Opcode::ILoad0);
                self.branch(Opcode::IfICmpE, &mut truthy, span)?;
                self.emit(Opcode::ILoad0);
                self.branch(Opcode::Ja, &mut end, span)?;
                self.bind(&mut truthy, span)?;
                self.emit(Opcode::ILoad1);
                self.bind(&mut end, span)?;
                Ok(VarType::Int)
            }
        }
    }

    /// Operand of `!`, `&&` or `||`, coerced to int.
    fn logical_operand(&mut self, expr: &Expr, scope: ScopeId, op: &'static str) -> Result<(), CompileError> {
        match self.expr(expr, scope)? {
            VarType::Int => Ok(()),
            VarType::Double => {
                self.emit(Opcode::D2I);
                Ok(())
            }
            VarType::Void => Err(error(CompileErrorKind::VoidValue, &expr.span)),
            ty => Err(error(CompileErrorKind::InvalidOperand { op, ty }, &expr.span)),
        }
    }

    fn binary(
        &mut self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        scope: ScopeId,
        span: &Span,
    ) -> Result<VarType, CompileError> {
        match op {
            BinaryOp::Range => Err(error(CompileErrorKind::RangeOutsideFor, span)),

            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                let ty = self.arithmetic_type(op, left, right, scope)?;
                self.expr_as(left, scope, ty)?;
                self.expr_as(right, scope, ty)?;
                let opcode = match (op, ty) {
                    (BinaryOp::Add, VarType::Int) => Opcode::IAdd,
                    (BinaryOp::Add, _) => Opcode::DAdd,
                    (BinaryOp::Sub, VarType::Int) => Opcode::ISub,
                    (BinaryOp::Sub, _) => Opcode::DSub,
                    (BinaryOp::Mul, VarType::Int) => Opcode::IMul,
                    (BinaryOp::Mul, _) => Opcode::DMul,
                    (_, VarType::Int) => Opcode::IDiv,
                    _ => Opcode::DDiv,
                };
                self.emit(opcode);
                Ok(ty)
            }

            BinaryOp::Mod | BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::BitAnd => {
                for operand in [left, right] {
                    match self.expr(operand, scope)? {
                        VarType::Int => {}
                        VarType::Void => return Err(error(CompileErrorKind::VoidValue, &operand.span)),
                        ty => {
                            return Err(error(
                                CompileErrorKind::InvalidOperand { op: op.symbol(), ty },
                                &operand.span,
                            ));
                        }
                    }
                }
                self.emit(match op {
                    BinaryOp::Mod => Opcode::IMod,
                    BinaryOp::BitOr => Opcode::IAOr,
                    BinaryOp::BitXor => Opcode::IAXor,
                    _ => Opcode::IAAnd,
                });
                Ok(VarType::Int)
            }

            BinaryOp::And | BinaryOp::Or => {
                // `&&` jumps out as soon as an operand is 0, `||` as soon as one is not.
                let (symbol, exit, exit_value, fallthrough_value) = match op {
                    BinaryOp::And => ("&&", Opcode::IfICmpE, Opcode::ILoad0, Opcode::ILoad1),
                    _ => ("||", Opcode::IfICmpNe, Opcode::ILoad1, Opcode::ILoad0),
                };
                let mut short = Label::new();
                let mut end = Label::new();
                for operand in [left, right] {
                    self.logical_operand(operand, scope, symbol)?;
                    self.emit(Opcode::ILoad0);
                    self.branch(exit, &mut short, span)?;
                }
                self.emit(fallthrough_value);
                self.branch(Opcode::Ja, &mut end, span)?;
                self.bind(&mut short, span)?;
                self.emit(exit_value);
                self.bind(&mut end, span)?;
                Ok(VarType::Int)
            }

            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let ty = self.arithmetic_type(op, left, right, scope)?;
                self.expr_as(left, scope, ty)?;
                self.expr_as(right, scope, ty)?;
                self.emit(if ty == VarType::Int { Opcode::ICmp } else { Opcode::DCmp });

                let mut truthy = Label::new();
                let mut end = Label::new();
                self.emit(Opcode::ILoad0);
                if let Some(opcode) = branch_opcode(op) {
                    self.branch(opcode, &mut truthy, span)?;
                }
                self.emit(Opcode::ILoad0);
                self.branch(Opcode::Ja, &mut end, span)?;
                self.bind(&mut truthy, span)?;
                self.emit(Opcode::ILoad1);
                self.bind(&mut end, span)?;
                Ok(VarType::Int)
            }
        }
    }
}
