use rustc_hash::FxHashMap;
use scopes_common::error::NameError;
use scopes_common::types::ScopeMode;
use scopes_syntax::ast::{FunId, Resolution, Type};

use std::ops::{Index, IndexMut};

use crate::value::Value;

/// Handle to a [`SymbolTable`] inside the [`Scopes`] arena that issued it.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ScopeId(usize);

impl ScopeId {
    pub const GLOBAL: ScopeId = ScopeId(0);
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SymbolKind {
    Builtin,
    Function {
        id: FunId,
        arity: usize,
        /// The table that was current where the function was defined. Only
        /// recorded under static scoping.
        closure: Option<ScopeId>,
    },
    Parameter(Type),
    Variable(Type),
}

/// A table entry. `value` is a live storage slot and is only present for
/// variables in the interpreter's global table.
#[derive(Clone, Debug, PartialEq)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub value: Option<Value>,
}

impl Symbol {
    pub fn new(kind: SymbolKind) -> Self {
        Self { kind, value: None }
    }

    pub fn with_value(self, value: Value) -> Self {
        Self { value: Some(value), ..self }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.kind, SymbolKind::Builtin | SymbolKind::Function { .. })
    }

    pub fn resolution(&self) -> Resolution {
        match self.kind {
            SymbolKind::Builtin => Resolution::Builtin,
            SymbolKind::Function { .. } => Resolution::Function,
            SymbolKind::Parameter(type_) => Resolution::Parameter(type_),
            SymbolKind::Variable(type_) => Resolution::Variable(type_),
        }
    }
}

#[derive(Debug)]
pub struct SymbolTable {
    name: String,
    parent: Option<ScopeId>,
    mode: ScopeMode,
    symbols: FxHashMap<String, Symbol>,
}

impl SymbolTable {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    /// Adds `name` to this table. Shadowing a name from an ancestor table is
    /// fine; repeating a name within one table is not.
    pub fn insert(&mut self, name: &str, symbol: Symbol) -> Result<(), NameError> {
        if self.symbols.contains_key(name) {
            return Err(NameError::Redeclaration { name: name.to_string(), mode: self.mode });
        }
        self.symbols.insert(name.to_string(), symbol);
        Ok(())
    }

    pub fn lookup_local(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn lookup_local_mut(&mut self, name: &str) -> Option<&mut Symbol> {
        self.symbols.get_mut(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Symbol)> {
        self.symbols.iter().map(|(name, symbol)| (name.as_str(), symbol))
    }
}

/// Arena owning every table of one analysis or run. Tables refer to their
/// parents by [`ScopeId`], so a parent always outlives its children.
#[derive(Debug)]
pub struct Scopes {
    mode: ScopeMode,
    tables: Vec<SymbolTable>,
}

impl Scopes {
    /// Creates an arena holding only the global table.
    pub fn new(mode: ScopeMode) -> Self {
        let global = SymbolTable {
            name: "global".to_string(),
            parent: None,
            mode,
            symbols: FxHashMap::default(),
        };
        Self { mode, tables: vec![global] }
    }

    pub fn push(&mut self, name: impl Into<String>, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.tables.len());
        self.tables.push(SymbolTable {
            name: name.into(),
            parent: Some(parent),
            mode: self.mode,
            symbols: FxHashMap::default(),
        });
        id
    }

    /// Searches `scope` and then each of its ancestors.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<(ScopeId, &Symbol)> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let table = &self[id];
            if let Some(symbol) = table.lookup_local(name) {
                return Some((id, symbol));
            }
            current = table.parent;
        }
        None
    }

    pub fn global(&self) -> &SymbolTable {
        &self[ScopeId::GLOBAL]
    }

    pub fn global_mut(&mut self) -> &mut SymbolTable {
        &mut self[ScopeId::GLOBAL]
    }

    /// Iterates over every table in creation order, starting with the global
    /// table.
    pub fn iter(&self) -> impl Iterator<Item = &SymbolTable> {
        self.tables.iter()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl Index<ScopeId> for Scopes {
    type Output = SymbolTable;

    fn index(&self, id: ScopeId) -> &Self::Output {
        self.tables
            .get(id.0)
            .unwrap_or_else(|| unreachable!("scope id points past the arena: {id:?}"))
    }
}

impl IndexMut<ScopeId> for Scopes {
    fn index_mut(&mut self, id: ScopeId) -> &mut Self::Output {
        self.tables
            .get_mut(id.0)
            .unwrap_or_else(|| unreachable!("scope id points past the arena: {id:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn int_var() -> Symbol {
        Symbol::new(SymbolKind::Variable(Type::Int))
    }

    #[test]
    fn insert_twice_in_one_table_fails() {
        let mut scopes = Scopes::new(ScopeMode::Static);
        scopes.global_mut().insert("x", int_var()).unwrap();
        let err = scopes.global_mut().insert("x", int_var()).unwrap_err();
        assert_eq!(err, NameError::Redeclaration { name: "x".to_string(), mode: ScopeMode::Static });
    }

    #[test]
    fn child_table_may_shadow_parent() {
        let mut scopes = Scopes::new(ScopeMode::Dynamic);
        scopes.global_mut().insert("x", int_var()).unwrap();
        let child = scopes.push("func_f_scope", ScopeId::GLOBAL);
        scopes[child].insert("x", Symbol::new(SymbolKind::Variable(Type::Float))).unwrap();

        let (found_in, symbol) = scopes.lookup(child, "x").unwrap();
        assert_eq!(found_in, child);
        assert_eq!(symbol.kind, SymbolKind::Variable(Type::Float));

        let (found_in, symbol) = scopes.lookup(ScopeId::GLOBAL, "x").unwrap();
        assert_eq!(found_in, ScopeId::GLOBAL);
        assert_eq!(symbol.kind, SymbolKind::Variable(Type::Int));
    }

    #[test]
    fn lookup_walks_to_root_but_lookup_local_does_not() {
        let mut scopes = Scopes::new(ScopeMode::Static);
        scopes.global_mut().insert("g", int_var()).unwrap();
        let f = scopes.push("func_f_scope", ScopeId::GLOBAL);
        let inner = scopes.push("inner", f);

        assert_eq!(scopes.lookup(inner, "g").map(|(id, _)| id), Some(ScopeId::GLOBAL));
        assert_eq!(scopes[inner].lookup_local("g"), None);
        assert_eq!(scopes.lookup(inner, "missing"), None);
        assert_eq!(scopes[inner].parent(), Some(f));
        assert_eq!(scopes[f].name(), "func_f_scope");
        assert_eq!(scopes.len(), 3);
    }

    #[test]
    fn value_slot_is_separate_from_kind() {
        let symbol = int_var().with_value(Value::Unset);
        assert_eq!(symbol.value, Some(Value::Unset));
        assert!(!symbol.is_callable());
        assert_eq!(symbol.resolution(), Resolution::Variable(Type::Int));

        let function = Symbol::new(SymbolKind::Function { id: 0, arity: 1, closure: None });
        assert!(function.is_callable());
        assert_eq!(function.resolution(), Resolution::Function);
    }
}
