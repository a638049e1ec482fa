//! Static scope chain used during translation.
//!
//! Scopes live in an arena and refer to their parent by index. They are never
//! removed: the whole arena is dropped together with the translator.

use hashbrown::HashMap;

use crate::parser::Span;
use crate::values::VarType;
use crate::vm::FunctionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeId(u32);

/// Where a variable lives at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarSlot {
    /// Function whose frame holds the variable.
    pub owner: FunctionId,
    pub slot: u16,
    pub ty: VarType,
}

/// Declarations keep their span so a clash can point back at the first one.
#[derive(Debug)]
struct Scope {
    parent: Option<ScopeId>,
    variables: HashMap<String, (VarSlot, Span)>,
    functions: HashMap<String, (FunctionId, Span)>,
}

#[derive(Debug, Default)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
}

impl ScopeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent,
            variables: HashMap::new(),
            functions: HashMap::new(),
        });
        id
    }

    fn get(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.0 as usize)
    }

    fn get_mut(&mut self, id: ScopeId) -> Option<&mut Scope> {
        self.scopes.get_mut(id.0 as usize)
    }

    /// Fails with the earlier declaration's span if `name` is already
    /// declared in this very scope.
    pub fn declare_variable(&mut self, scope: ScopeId, name: &str, var: VarSlot, span: &Span) -> Result<(), Span> {
        let Some(s) = self.get_mut(scope) else {
            return Err(span.clone());
        };
        if let Some((_, first)) = s.variables.get(name) {
            return Err(first.clone());
        }
        s.variables.insert(name.to_owned(), (var, span.clone()));
        Ok(())
    }

    /// Same as [`Self::declare_variable`], for functions.
    pub fn declare_function(&mut self, scope: ScopeId, name: &str, id: FunctionId, span: &Span) -> Result<(), Span> {
        let Some(s) = self.get_mut(scope) else {
            return Err(span.clone());
        };
        if let Some((_, first)) = s.functions.get(name) {
            return Err(first.clone());
        }
        s.functions.insert(name.to_owned(), (id, span.clone()));
        Ok(())
    }

    /// Innermost declaration of `name` visible from `scope`.
    pub fn lookup_variable(&self, scope: ScopeId, name: &str) -> Option<VarSlot> {
        self.chain(scope).find_map(|s| s.variables.get(name).map(|(var, _)| *var))
    }

    pub fn lookup_function(&self, scope: ScopeId, name: &str) -> Option<FunctionId> {
        self.chain(scope).find_map(|s| s.functions.get(name).map(|(id, _)| *id))
    }

    fn chain(&self, scope: ScopeId) -> impl Iterator<Item = &Scope> {
        let mut next = self.get(scope);
        core::iter::from_fn(move || {
            let current = next?;
            next = current.parent.and_then(|p| self.get(p));
            Some(current)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(start: usize) -> Span {
        Span(start..start + 1)
    }

    fn var(owner: u16, slot: u16, ty: VarType) -> VarSlot {
        VarSlot {
            owner: FunctionId(owner),
            slot,
            ty,
        }
    }

    #[test]
    fn test_lookup_walks_parents() {
        let mut arena = ScopeArena::new();
        let root = arena.push(None);
        let child = arena.push(Some(root));
        assert_eq!(arena.declare_variable(root, "x", var(0, 0, VarType::Int), &at(0)), Ok(()));
        assert_eq!(arena.declare_function(root, "f", FunctionId(1), &at(5)), Ok(()));

        assert_eq!(arena.lookup_variable(child, "x"), Some(var(0, 0, VarType::Int)));
        assert_eq!(arena.lookup_function(child, "f"), Some(FunctionId(1)));
        assert_eq!(arena.lookup_variable(child, "y"), None);
    }

    #[test]
    fn test_shadowing_and_duplicates() {
        let mut arena = ScopeArena::new();
        let root = arena.push(None);
        let child = arena.push(Some(root));
        assert_eq!(arena.declare_variable(root, "x", var(0, 0, VarType::Int), &at(0)), Ok(()));
        assert_eq!(arena.declare_variable(root, "x", var(0, 1, VarType::Double), &at(7)), Err(at(0)));
        assert_eq!(arena.declare_variable(child, "x", var(0, 1, VarType::String), &at(9)), Ok(()));
        assert_eq!(arena.lookup_variable(child, "x"), Some(var(0, 1, VarType::String)));
        assert_eq!(arena.lookup_variable(root, "x"), Some(var(0, 0, VarType::Int)));

        assert_eq!(arena.declare_function(root, "f", FunctionId(1), &at(20)), Ok(()));
        assert_eq!(arena.declare_function(root, "f", FunctionId(2), &at(30)), Err(at(20)));
    }

    #[test]
    fn test_sibling_scopes_are_isolated() {
        let mut arena = ScopeArena::new();
        let root = arena.push(None);
        let a = arena.push(Some(root));
        let b = arena.push(Some(root));
        assert_eq!(arena.declare_variable(a, "only_a", var(0, 0, VarType::Int), &at(0)), Ok(()));
        assert_eq!(arena.lookup_variable(b, "only_a"), None);
    }
}
