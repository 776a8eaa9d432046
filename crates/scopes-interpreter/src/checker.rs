use scopes_common::error::{Error, ErrorS, SemanticError};
use scopes_common::types::{ScopeMode, Span};
use scopes_syntax::ast::{Decl, DeclFun, Expr, ExprLiteral, ExprS, Program, Stmt, StmtBlock, Type};

use crate::symbol_table::{ScopeId, Scopes, Symbol, SymbolKind};

/// Type checks a program before it runs. Unlike the resolver, the checker
/// registers every top-level name up front, so declaration order does not
/// matter to it.
pub struct Checker<'a> {
    program: &'a Program,
    scopes: Scopes,
    errors: Vec<ErrorS>,
}

impl<'a> Checker<'a> {
    pub fn new(program: &'a Program, mode: ScopeMode) -> Self {
        Self { program, scopes: Scopes::new(mode), errors: Vec::new() }
    }

    pub fn check(mut self) -> Result<(), Vec<ErrorS>> {
        let program = self.program;
        for (id, (decl, span)) in program.decls.iter().enumerate() {
            let (name, kind) = match decl {
                Decl::Fun(fun) => {
                    (&fun.name, SymbolKind::Function { id, arity: fun.arity(), closure: None })
                }
                Decl::Var(var) => (&var.name, SymbolKind::Variable(var.type_)),
            };
            self.declare(ScopeId::GLOBAL, name, kind, span);
        }
        self.declare(ScopeId::GLOBAL, "print", SymbolKind::Builtin, &(0..0));

        for (decl, _) in &program.decls {
            if let Decl::Fun(fun) = decl {
                self.check_fun(fun);
            }
        }

        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    fn check_fun(&mut self, fun: &DeclFun) {
        let scope = self.scopes.push(format!("func_{}_scope", fun.name), ScopeId::GLOBAL);
        for (param, span) in &fun.params {
            self.declare(scope, &param.name, SymbolKind::Parameter(param.type_), span);
        }
        self.check_block(scope, &fun.body);
    }

    fn check_block(&mut self, scope: ScopeId, block: &StmtBlock) {
        // Local declarations are visible to the whole body.
        for (stmt, span) in &block.stmts {
            if let Stmt::Var(var) = stmt {
                self.declare(scope, &var.name, SymbolKind::Variable(var.type_), span);
            }
        }

        for (stmt, span) in &block.stmts {
            match stmt {
                Stmt::Assign(assign) => {
                    let name = &assign.var.name;
                    let exp_type = match self.scopes.lookup(scope, name).map(|(_, s)| s.kind) {
                        Some(SymbolKind::Parameter(type_) | SymbolKind::Variable(type_)) => {
                            Some(type_)
                        }
                        Some(SymbolKind::Builtin | SymbolKind::Function { .. }) => {
                            self.error(SemanticError::FunctionAsValue { name: name.clone() }, span);
                            None
                        }
                        None => {
                            self.error(SemanticError::NotDeclared { name: name.clone() }, span);
                            None
                        }
                    };
                    let got_type = self.check_expr(scope, &assign.value);
                    if let (Some(exp_type), Some(got_type)) = (exp_type, got_type) {
                        if !is_compatible(exp_type, got_type) {
                            self.error(
                                SemanticError::IncompatibleAssignment {
                                    name: name.clone(),
                                    exp_type: exp_type.to_string(),
                                    got_type: got_type.to_string(),
                                },
                                span,
                            );
                        }
                    }
                }
                Stmt::Call(call) => {
                    let name = &call.callee.name;
                    match self.scopes.lookup(scope, name).map(|(_, s)| s.kind) {
                        Some(SymbolKind::Builtin) => {
                            for arg in &call.args {
                                self.check_expr(scope, arg);
                            }
                        }
                        Some(SymbolKind::Function { id, arity, .. }) => {
                            if arity != call.args.len() {
                                self.error(
                                    SemanticError::ArityMismatch {
                                        name: name.clone(),
                                        exp_args: arity,
                                        got_args: call.args.len(),
                                    },
                                    span,
                                );
                                continue;
                            }
                            let program = self.program;
                            let params = match program.function(id) {
                                Some(fun) => &fun.params,
                                None => unreachable!("function entry points at a variable: {name:?}"),
                            };
                            for ((param, _), arg) in params.iter().zip(&call.args) {
                                let Some(got_type) = self.check_expr(scope, arg) else {
                                    continue;
                                };
                                if !is_compatible(param.type_, got_type) {
                                    self.error(
                                        SemanticError::IncompatibleArgument {
                                            name: name.clone(),
                                            param: param.name.clone(),
                                            exp_type: param.type_.to_string(),
                                            got_type: got_type.to_string(),
                                        },
                                        &arg.1,
                                    );
                                }
                            }
                        }
                        Some(SymbolKind::Parameter(_) | SymbolKind::Variable(_)) => {
                            self.error(SemanticError::NotCallable { name: name.clone() }, span);
                        }
                        None => {
                            self.error(SemanticError::NotDeclared { name: name.clone() }, span);
                        }
                    }
                }
                Stmt::Print(print) => {
                    if let Some(value) = &print.value {
                        self.check_expr(scope, value);
                    }
                }
                Stmt::Var(_) => {}
            }
        }
    }

    /// Returns the type of `expr_s`, or `None` if it could not be determined
    /// because of an error that has already been recorded.
    fn check_expr(&mut self, scope: ScopeId, expr_s: &ExprS) -> Option<Type> {
        let (expr, span) = expr_s;
        match expr {
            Expr::Infix(infix) => {
                let lt = self.check_expr(scope, &infix.lt);
                let rt = self.check_expr(scope, &infix.rt);
                match (lt?, rt?) {
                    (Type::Float, _) | (_, Type::Float) => Some(Type::Float),
                    _ => Some(Type::Int),
                }
            }
            Expr::Literal(literal) => Some(match literal {
                ExprLiteral::Char(_) => Type::Char,
                ExprLiteral::Float(_) => Type::Float,
                ExprLiteral::Int(_) => Type::Int,
            }),
            Expr::Var(var) => match self.scopes.lookup(scope, &var.name).map(|(_, s)| s.kind) {
                Some(SymbolKind::Parameter(type_) | SymbolKind::Variable(type_)) => Some(type_),
                Some(SymbolKind::Builtin | SymbolKind::Function { .. }) => {
                    self.error(SemanticError::FunctionAsValue { name: var.name.clone() }, span);
                    None
                }
                None => {
                    self.error(SemanticError::NotDeclared { name: var.name.clone() }, span);
                    None
                }
            },
        }
    }

    fn declare(&mut self, scope: ScopeId, name: &str, kind: SymbolKind, span: &Span) {
        if let Err(e) = self.scopes[scope].insert(name, Symbol::new(kind)) {
            self.errors.push((Error::NameError(e), span.clone()));
        }
    }

    fn error(&mut self, err: SemanticError, span: &Span) {
        self.errors.push((Error::SemanticError(err), span.clone()));
    }
}

/// A value of type `got` may be stored where `exp` is expected. The only
/// implicit conversion is int to float.
fn is_compatible(exp: Type, got: Type) -> bool {
    exp == got || (exp == Type::Float && got == Type::Int)
}
