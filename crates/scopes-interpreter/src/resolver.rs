use scopes_common::error::{Error, ErrorS, NameError};
use scopes_common::types::{ScopeMode, Span};
use scopes_syntax::ast::{Decl, DeclFun, Expr, ExprS, FunId, Program, Stmt, StmtS, Var};

use crate::symbol_table::{ScopeId, Scopes, Symbol, SymbolKind};

/// Builds the lexical scope tree of a program and annotates every identifier
/// use with what it refers to. Only meaningful under static scoping.
#[derive(Debug)]
pub struct Resolver {
    scopes: Scopes,
    current: ScopeId,
    errors: Vec<ErrorS>,
}

impl Default for Resolver {
    fn default() -> Self {
        let mut scopes = Scopes::new(ScopeMode::Static);
        scopes
            .global_mut()
            .insert("print", Symbol::new(SymbolKind::Builtin))
            .unwrap_or_else(|_| unreachable!("unable to define print in global scope"));
        Self { scopes, current: ScopeId::GLOBAL, errors: Vec::new() }
    }
}

impl Resolver {
    /// Resolves `program` in a single top-down pass. On success, returns the
    /// scope tree that was built.
    pub fn resolve(mut self, program: &mut Program) -> Result<Scopes, Vec<ErrorS>> {
        for (id, (decl, span)) in program.decls.iter_mut().enumerate() {
            match decl {
                Decl::Fun(fun) => self.resolve_fun(id, fun, span),
                Decl::Var(var) => {
                    self.declare(&var.name, SymbolKind::Variable(var.type_), span);
                }
            }
        }

        if self.errors.is_empty() {
            Ok(self.scopes)
        } else {
            Err(self.errors)
        }
    }

    fn resolve_fun(&mut self, id: FunId, fun: &mut DeclFun, span: &Span) {
        let kind = SymbolKind::Function { id, arity: fun.arity(), closure: Some(self.current) };
        self.declare(&fun.name, kind, span);

        let enclosing = self.current;
        self.current = self.scopes.push(format!("func_{}_scope", fun.name), enclosing);
        for (param, span) in &fun.params {
            self.declare(&param.name, SymbolKind::Parameter(param.type_), span);
        }
        for stmt_s in fun.body.stmts.iter_mut() {
            self.resolve_stmt(stmt_s);
        }
        self.current = enclosing;
    }

    fn resolve_stmt(&mut self, stmt_s: &mut StmtS) {
        let (stmt, span) = stmt_s;
        match stmt {
            Stmt::Assign(assign) => {
                self.access(&mut assign.var, span);
                self.resolve_expr(&mut assign.value);
            }
            Stmt::Call(call) => {
                self.access(&mut call.callee, span);
                for arg in call.args.iter_mut() {
                    self.resolve_expr(arg);
                }
            }
            Stmt::Print(print) => {
                if let Some(value) = &mut print.value {
                    self.resolve_expr(value);
                }
            }
            Stmt::Var(var) => self.declare(&var.name, SymbolKind::Variable(var.type_), span),
        }
    }

    fn resolve_expr(&mut self, expr_s: &mut ExprS) {
        let (expr, span) = expr_s;
        match expr {
            Expr::Infix(infix) => {
                self.resolve_expr(&mut infix.lt);
                self.resolve_expr(&mut infix.rt);
            }
            Expr::Literal(_) => {}
            Expr::Var(var) => self.access(var, span),
        }
    }

    fn declare(&mut self, name: &str, kind: SymbolKind, span: &Span) {
        if let Err(e) = self.scopes[self.current].insert(name, Symbol::new(kind)) {
            self.errors.push((Error::NameError(e), span.clone()));
        }
    }

    fn access(&mut self, var: &mut Var, span: &Span) {
        match self.scopes.lookup(self.current, &var.name) {
            Some((_, symbol)) => var.resolution = Some(symbol.resolution()),
            None => self.errors.push((
                Error::NameError(NameError::UndefinedIdentifier {
                    name: var.name.clone(),
                    mode: ScopeMode::Static,
                }),
                span.clone(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use scopes_syntax::ast::{Resolution, Type};

    fn resolve(source: &str) -> (Program, Result<Scopes, Vec<ErrorS>>) {
        let mut program = scopes_syntax::parse(source).unwrap();
        let result = Resolver::default().resolve(&mut program);
        (program, result)
    }

    fn body(program: &Program, id: FunId) -> &[StmtS] {
        &program.function(id).unwrap().body.stmts
    }

    #[test]
    fn builds_one_table_per_function() {
        let source = "int x; def f(float y) { char z; } main() { f(1); }";
        let (_, result) = resolve(source);
        let scopes = result.unwrap();

        assert_eq!(scopes.len(), 3);
        let global = scopes.global();
        assert_eq!(global.lookup_local("x").map(|s| s.kind), Some(SymbolKind::Variable(Type::Int)));
        assert_eq!(global.lookup_local("print").map(|s| s.kind), Some(SymbolKind::Builtin));
        assert_eq!(
            global.lookup_local("f").map(|s| s.kind),
            Some(SymbolKind::Function { id: 1, arity: 1, closure: Some(ScopeId::GLOBAL) })
        );

        let names = scopes.iter().map(|table| table.name()).collect::<Vec<_>>();
        assert_eq!(names, vec!["global", "func_f_scope", "func_main_scope"]);

        let f_table = scopes.iter().find(|table| table.name() == "func_f_scope").unwrap();
        assert_eq!(f_table.parent(), Some(ScopeId::GLOBAL));
        assert_eq!(
            f_table.lookup_local("y").map(|s| s.kind),
            Some(SymbolKind::Parameter(Type::Float))
        );
        assert_eq!(
            f_table.lookup_local("z").map(|s| s.kind),
            Some(SymbolKind::Variable(Type::Char))
        );
        assert_eq!(f_table.lookup_local("x"), None);
    }

    #[test]
    fn annotates_identifier_uses() {
        let source = "int x; def f(float y) { char z; x = 1; z = 'a'; f(y); } main() { }";
        let (program, result) = resolve(source);
        assert!(result.is_ok());

        let stmts = body(&program, 1);
        match &stmts[1].0 {
            Stmt::Assign(assign) => {
                assert_eq!(assign.var.resolution, Some(Resolution::Variable(Type::Int)))
            }
            stmt => panic!("expected assignment, got {stmt:?}"),
        }
        match &stmts[2].0 {
            Stmt::Assign(assign) => {
                assert_eq!(assign.var.resolution, Some(Resolution::Variable(Type::Char)))
            }
            stmt => panic!("expected assignment, got {stmt:?}"),
        }
        match &stmts[3].0 {
            Stmt::Call(call) => {
                assert_eq!(call.callee.resolution, Some(Resolution::Function));
                match &call.args[0].0 {
                    Expr::Var(var) => {
                        assert_eq!(var.resolution, Some(Resolution::Parameter(Type::Float)))
                    }
                    expr => panic!("expected identifier, got {expr:?}"),
                }
            }
            stmt => panic!("expected call, got {stmt:?}"),
        }
    }

    #[test]
    fn reports_every_undefined_identifier() {
        let source = "main() { y = q; h(); }";
        let (_, result) = resolve(source);
        let errors = result.unwrap_err();
        let names = errors
            .iter()
            .map(|(err, _)| match err {
                Error::NameError(NameError::UndefinedIdentifier { name, mode }) => {
                    assert_eq!(*mode, ScopeMode::Static);
                    name.as_str()
                }
                err => panic!("unexpected error: {err:?}"),
            })
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["y", "q", "h"]);
    }

    #[test]
    fn resolution_is_top_down() {
        // `g` is declared after `f`, so `f` cannot see it.
        let source = "def f() { g = 1; } int g; main() { f(); }";
        let (_, result) = resolve(source);
        let errors = result.unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].0,
            Error::NameError(NameError::UndefinedIdentifier {
                name: "g".to_string(),
                mode: ScopeMode::Static,
            })
        );
    }

    #[test]
    fn redeclaration_in_one_scope_fails_but_shadowing_is_fine() {
        let (_, result) = resolve("int x; float x; main() { }");
        let errors = result.unwrap_err();
        assert_eq!(
            errors,
            vec![(
                Error::NameError(NameError::Redeclaration {
                    name: "x".to_string(),
                    mode: ScopeMode::Static,
                }),
                7..15,
            )]
        );

        let (_, result) = resolve("int x; main() { float x; x = 1.5; }");
        assert!(result.is_ok());
    }

    #[test]
    fn parameter_and_local_share_a_table() {
        let (_, result) = resolve("def f(int a) { int a; } main() { }");
        let errors = result.unwrap_err();
        assert!(matches!(
            errors[0].0,
            Error::NameError(NameError::Redeclaration { ref name, .. }) if name == "a"
        ));
    }
}
