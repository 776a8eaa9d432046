pub use scopes_common::types::{Span, Spanned};

use std::fmt::{self, Display, Formatter};

pub type DeclS = Spanned<Decl>;
pub type StmtS = Spanned<Stmt>;
pub type ExprS = Spanned<Expr>;

/// Index of a function definition within [`Program::decls`].
pub type FunId = usize;

#[derive(Debug, Default, PartialEq)]
pub struct Program {
    pub decls: Vec<DeclS>,
}

impl Program {
    pub fn function(&self, id: FunId) -> Option<&DeclFun> {
        match self.decls.get(id) {
            Some((Decl::Fun(fun), _)) => Some(fun),
            _ => None,
        }
    }
}

/// A top-level declaration.
#[derive(Debug, PartialEq)]
pub enum Decl {
    Fun(Box<DeclFun>),
    Var(DeclVar),
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeclVar {
    pub type_: Type,
    pub name: String,
}

#[derive(Debug, PartialEq)]
pub struct DeclFun {
    pub name: String,
    pub params: Vec<Spanned<DeclVar>>,
    pub body: StmtBlock,
}

impl DeclFun {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct StmtBlock {
    pub stmts: Vec<StmtS>,
}

#[derive(Debug, PartialEq)]
pub enum Stmt {
    Assign(StmtAssign),
    Call(StmtCall),
    Print(StmtPrint),
    /// A declaration local to the enclosing function body.
    Var(DeclVar),
}

#[derive(Debug, PartialEq)]
pub struct StmtAssign {
    pub var: Var,
    pub value: ExprS,
}

#[derive(Debug, PartialEq)]
pub struct StmtCall {
    pub callee: Var,
    pub args: Vec<ExprS>,
}

/// `print(expr);` writes the value, `print();` writes an empty line.
#[derive(Debug, PartialEq)]
pub struct StmtPrint {
    pub value: Option<ExprS>,
}

#[derive(Debug, PartialEq)]
pub enum Expr {
    Infix(Box<ExprInfix>),
    Literal(ExprLiteral),
    Var(Var),
}

impl Expr {
    /// Builds an infix expression spanning both of its operands.
    pub fn infix(lt: ExprS, op: OpInfix, rt: ExprS) -> ExprS {
        let span = lt.1.start..rt.1.end;
        (Expr::Infix(Box::new(ExprInfix { lt, op, rt })), span)
    }
}

#[derive(Debug, PartialEq)]
pub enum ExprLiteral {
    Char(char),
    Float(f64),
    Int(i64),
}

#[derive(Debug, PartialEq)]
pub struct ExprInfix {
    pub lt: ExprS,
    pub op: OpInfix,
    pub rt: ExprS,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OpInfix {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Display for OpInfix {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let op = match self {
            OpInfix::Add => "+",
            OpInfix::Subtract => "-",
            OpInfix::Multiply => "*",
            OpInfix::Divide => "/",
        };
        f.write_str(op)
    }
}

/// A use of an identifier.
///
/// `resolution` starts out empty and is filled in exactly once by the static
/// resolver. Nothing at run time depends on it being present.
#[derive(Clone, Debug, PartialEq)]
pub struct Var {
    pub name: String,
    pub resolution: Option<Resolution>,
}

impl Var {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), resolution: None }
    }
}

/// What an identifier was found to refer to during static resolution.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Resolution {
    Builtin,
    Function,
    Parameter(Type),
    Variable(Type),
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Type {
    Char,
    Float,
    Int,
}

impl Type {
    pub fn as_str(&self) -> &'static str {
        match self {
            Type::Char => "char",
            Type::Float => "float",
            Type::Int => "int",
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
