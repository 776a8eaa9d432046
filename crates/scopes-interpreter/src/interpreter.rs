use scopes_common::error::{Error, IoError, NameError, OverflowError, Result, TypeError};
use scopes_common::types::{ScopeMode, Span};
use scopes_syntax::ast::{Decl, Expr, ExprLiteral, ExprS, OpInfix, Program, Stmt, StmtBlock, StmtS};
use tracing::debug;

use std::io::Write;

use crate::call_stack::{ActivationRecord, CallStack, LexicalParent};
use crate::snapshot::{Snapshot, Tracer};
use crate::symbol_table::{ScopeId, Scopes, Symbol, SymbolKind};
use crate::value::Value;

/// Maximum number of live activation records.
pub const FRAMES_MAX: usize = 256;

/// A tree-walking evaluator whose identifier lookups follow either the
/// definition site of the running function or its callers, depending on
/// `mode`.
pub struct Interpreter<'a, W> {
    program: &'a Program,
    mode: ScopeMode,
    stack: CallStack,
    globals: Scopes,
    stdout: W,
    tracers: Vec<Box<dyn Tracer + 'a>>,
}

impl<'a, W: Write> Interpreter<'a, W> {
    /// Registers every top-level declaration of `program` in the global
    /// table. Variables start out unset.
    pub fn new(program: &'a Program, mode: ScopeMode, stdout: W) -> Result<Self> {
        let mut globals = Scopes::new(mode);
        for (id, (decl, span)) in program.decls.iter().enumerate() {
            let (name, symbol) = match decl {
                Decl::Fun(fun) => {
                    let closure = match mode {
                        ScopeMode::Static => Some(ScopeId::GLOBAL),
                        ScopeMode::Dynamic => None,
                    };
                    (&fun.name, Symbol::new(SymbolKind::Function { id, arity: fun.arity(), closure }))
                }
                Decl::Var(var) => {
                    (&var.name, Symbol::new(SymbolKind::Variable(var.type_)).with_value(Value::Unset))
                }
            };
            globals.global_mut().insert(name, symbol).map_err(|e| (Error::NameError(e), span.clone()))?;
        }
        globals
            .global_mut()
            .insert("print", Symbol::new(SymbolKind::Builtin))
            .map_err(|e| (Error::NameError(e), 0..0))?;

        Ok(Self { program, mode, stack: CallStack::default(), globals, stdout, tracers: Vec::new() })
    }

    pub fn add_tracer(&mut self, tracer: impl Tracer + 'a) {
        self.tracers.push(Box::new(tracer));
    }

    pub fn mode(&self) -> ScopeMode {
        self.mode
    }

    pub fn stack(&self) -> &CallStack {
        &self.stack
    }

    pub fn globals(&self) -> &Scopes {
        &self.globals
    }

    /// Current value of the global variable `name`.
    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.global().lookup_local(name).and_then(|symbol| symbol.value)
    }

    /// Runs `main` to completion. The call stack is empty afterwards, whether
    /// or not the run succeeded.
    pub fn run(&mut self) -> Result<()> {
        let result = self.run_main();
        if result.is_err() {
            self.stack.clear();
        }
        result
    }

    fn run_main(&mut self) -> Result<()> {
        let program = self.program;
        let (id, arity) = match self.globals.global().lookup_local("main").map(|symbol| symbol.kind) {
            Some(SymbolKind::Function { id, arity, .. }) => (id, arity),
            _ => return Err((Error::NameError(NameError::NoEntryPoint { mode: self.mode }), 0..0)),
        };
        let (fun, span) = match program.decls.get(id) {
            Some((Decl::Fun(fun), span)) => (fun, span),
            _ => unreachable!("function entry points at a variable: \"main\""),
        };
        if arity != 0 {
            return Err((
                Error::TypeError(TypeError::ArityMismatch {
                    name: fun.name.clone(),
                    exp_args: arity,
                    got_args: 0,
                    mode: self.mode,
                }),
                span.clone(),
            ));
        }

        let lexical_parent = match self.mode {
            ScopeMode::Static => Some(LexicalParent::Scope(ScopeId::GLOBAL)),
            ScopeMode::Dynamic => None,
        };
        self.stack.push(ActivationRecord::new("main", self.mode, None, lexical_parent));
        self.trace("Program Start", None, span)?;
        self.run_block(&fun.body)?;
        self.stack.pop();
        self.trace("Program End", None, span)
    }

    fn run_block(&mut self, block: &'a StmtBlock) -> Result<()> {
        for stmt_s in &block.stmts {
            self.run_stmt(stmt_s)?;
        }
        Ok(())
    }

    fn run_stmt(&mut self, stmt_s: &'a StmtS) -> Result<()> {
        let (stmt, span) = stmt_s;
        match stmt {
            Stmt::Assign(assign) => {
                let value = self.run_expr(&assign.value)?;
                self.assign(&assign.var.name, value, span)?;
                self.trace(format!("Assignment: {} = {value}", assign.var.name), None, span)
            }
            Stmt::Call(call) => self.call(&call.callee.name, &call.args, span),
            Stmt::Print(print) => {
                let value = match &print.value {
                    Some(value) => Some(self.run_expr(value)?),
                    None => None,
                };
                self.print(value, span)
            }
            Stmt::Var(var) => {
                if let Some(record) = self.stack.peek_mut() {
                    record.set_local(&var.name, Value::default_for(var.type_));
                }
                self.trace(format!("Declaration: {} {}", var.type_, var.name), None, span)
            }
        }
    }

    fn call(&mut self, name: &str, args: &'a [ExprS], span: &Span) -> Result<()> {
        let kind = self.globals.global().lookup_local(name).map(|symbol| symbol.kind);
        let (id, arity, closure) = match kind {
            Some(SymbolKind::Function { id, arity, closure }) => (id, arity, closure),
            Some(SymbolKind::Builtin) => {
                let value = match args.first() {
                    Some(arg) => Some(self.run_expr(arg)?),
                    None => None,
                };
                return self.print(value, span);
            }
            Some(SymbolKind::Parameter(_) | SymbolKind::Variable(_)) => {
                return Err((
                    Error::TypeError(TypeError::NotCallable { name: name.to_string(), mode: self.mode }),
                    span.clone(),
                ));
            }
            None => {
                return Err((
                    Error::NameError(NameError::CallTargetNotFound {
                        name: name.to_string(),
                        mode: self.mode,
                    }),
                    span.clone(),
                ));
            }
        };

        let args = args.iter().map(|arg| self.run_expr(arg)).collect::<Result<Vec<_>>>()?;
        if args.len() != arity {
            return Err((
                Error::TypeError(TypeError::ArityMismatch {
                    name: name.to_string(),
                    exp_args: arity,
                    got_args: args.len(),
                    mode: self.mode,
                }),
                span.clone(),
            ));
        }
        if self.stack.len() >= FRAMES_MAX {
            return Err((
                Error::OverflowError(OverflowError::StackOverflow {
                    name: name.to_string(),
                    depth: FRAMES_MAX,
                    mode: self.mode,
                }),
                span.clone(),
            ));
        }

        let program = self.program;
        let fun = match program.function(id) {
            Some(fun) => fun,
            None => unreachable!("function entry points at a variable: {name:?}"),
        };
        let record = match self.mode {
            ScopeMode::Static => {
                ActivationRecord::new(name, self.mode, None, closure.map(LexicalParent::Scope))
            }
            ScopeMode::Dynamic => ActivationRecord::new(name, self.mode, self.stack.top(), None),
        };
        let id = self.stack.push(record);
        for ((param, _), arg) in fun.params.iter().zip(args) {
            self.stack[id].set_local(&param.name, arg);
        }

        self.trace(format!("Function Call: {name}"), None, span)?;
        self.run_block(&fun.body)?;
        self.stack.pop();
        self.trace(format!("Function Return: {name}"), None, span)
    }

    fn print(&mut self, value: Option<Value>, span: &Span) -> Result<()> {
        let written = match value {
            Some(value) => writeln!(self.stdout, "{value}"),
            None => writeln!(self.stdout),
        };
        written.map_err(|_| {
            (Error::IoError(IoError::WriteError { file: "stdout".to_string() }), span.clone())
        })?;

        let action = match value {
            Some(value) => format!("Print statement: {value}"),
            None => "Print statement: (empty line)".to_string(),
        };
        self.trace(action, value, span)
    }

    /// Stores `value` in the variable `name`.
    ///
    /// Under static scoping only the running function's own locals are
    /// searched before the globals. Under dynamic scoping every caller is
    /// searched, innermost first.
    fn assign(&mut self, name: &str, value: Value, span: &Span) -> Result<()> {
        let frame = match self.mode {
            ScopeMode::Static => self.stack.top().filter(|&id| self.stack[id].has_local(name)),
            ScopeMode::Dynamic => self.stack.find_dynamic(name),
        };
        if let Some(id) = frame {
            self.stack[id].set_local(name, value);
            return Ok(());
        }

        match self.globals.global_mut().lookup_local_mut(name) {
            Some(Symbol { value: Some(slot), .. }) => {
                *slot = value;
                Ok(())
            }
            _ => Err((
                Error::NameError(NameError::AssignmentTargetNotFound {
                    name: name.to_string(),
                    mode: self.mode,
                }),
                span.clone(),
            )),
        }
    }

    /// Looks up the variable `name`.
    ///
    /// Under static scoping the search starts at the running function and
    /// follows lexical parents, which may lead through symbol tables as well
    /// as records. Under dynamic scoping it follows callers and falls back to
    /// the globals.
    fn read(&self, name: &str, span: &Span) -> Result<Value> {
        let found = match self.mode {
            ScopeMode::Static => {
                let mut cursor = match self.stack.top() {
                    Some(id) => Some(LexicalParent::Frame(id)),
                    None => Some(LexicalParent::Scope(ScopeId::GLOBAL)),
                };
                let mut found = None;
                while let Some(at) = cursor {
                    match at {
                        LexicalParent::Frame(id) => {
                            let record = &self.stack[id];
                            found = record.get_local(name);
                            cursor = record.lexical_parent;
                        }
                        LexicalParent::Scope(id) => {
                            let table = &self.globals[id];
                            found = table.lookup_local(name).and_then(|symbol| symbol.value);
                            cursor = table.parent().map(LexicalParent::Scope);
                        }
                    }
                    if found.is_some() {
                        break;
                    }
                }
                found
            }
            ScopeMode::Dynamic => match self.stack.find_dynamic(name) {
                Some(id) => self.stack[id].get_local(name),
                None => self.global(name),
            },
        };

        found.ok_or_else(|| {
            (
                Error::NameError(NameError::UndefinedVariable { name: name.to_string(), mode: self.mode }),
                span.clone(),
            )
        })
    }

    fn run_expr(&self, expr_s: &ExprS) -> Result<Value> {
        let (expr, span) = expr_s;
        match expr {
            Expr::Infix(infix) => {
                let lt = self.run_expr(&infix.lt)?;
                let rt = self.run_expr(&infix.rt)?;
                match (infix.op, lt, rt) {
                    (OpInfix::Add, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_add(b))),
                    (OpInfix::Subtract, Value::Int(a), Value::Int(b)) => {
                        Ok(Value::Int(a.wrapping_sub(b)))
                    }
                    (op @ (OpInfix::Add | OpInfix::Subtract), lt, rt) => {
                        match (lt.as_f64(), rt.as_f64()) {
                            (Some(a), Some(b)) if op == OpInfix::Add => Ok(Value::Float(a + b)),
                            (Some(a), Some(b)) => Ok(Value::Float(a - b)),
                            _ => Err((
                                Error::TypeError(TypeError::UnsupportedOperands {
                                    op: op.to_string(),
                                    lt_type: lt.type_().to_string(),
                                    rt_type: rt.type_().to_string(),
                                    mode: self.mode,
                                }),
                                span.clone(),
                            )),
                        }
                    }
                    (op, ..) => Err((
                        Error::TypeError(TypeError::UnsupportedOperator { op: op.to_string(), mode: self.mode }),
                        span.clone(),
                    )),
                }
            }
            Expr::Literal(literal) => Ok(match literal {
                ExprLiteral::Char(char) => Value::Char(*char),
                ExprLiteral::Float(float) => Value::Float(*float),
                ExprLiteral::Int(int) => Value::Int(*int),
            }),
            Expr::Var(var) => self.read(&var.name, span),
        }
    }

    fn trace(&mut self, action: impl Into<String>, output: Option<Value>, span: &Span) -> Result<()> {
        let action = action.into();
        debug!(mode = %self.mode, depth = self.stack.len(), "{action}");
        if self.tracers.is_empty() {
            return Ok(());
        }

        let snapshot = Snapshot::capture(action, self.mode, &self.stack, &self.globals, output);
        for tracer in self.tracers.iter_mut() {
            tracer.record(&snapshot).map_err(|_| {
                (Error::IoError(IoError::WriteError { file: "trace".to_string() }), span.clone())
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use scopes_common::error::ErrorS;

    const SCENARIO_A: &str = r#"
        int x;
        def f() { print(x); }
        def g() { int x; x = 2; f(); }
        main() { x = 1; g(); }
    "#;

    fn run(source: &str, mode: ScopeMode) -> Result<String> {
        let program = scopes_syntax::parse(source).unwrap();
        let mut stdout = Vec::new();
        let mut interpreter = Interpreter::new(&program, mode, &mut stdout)?;
        interpreter.run()?;
        assert!(interpreter.stack().is_empty());
        drop(interpreter);
        Ok(String::from_utf8(stdout).unwrap())
    }

    fn run_err(source: &str, mode: ScopeMode) -> Error {
        let program = scopes_syntax::parse(source).unwrap();
        let mut interpreter = Interpreter::new(&program, mode, Vec::new()).unwrap();
        let (err, _): ErrorS = interpreter.run().unwrap_err();
        assert!(interpreter.stack().is_empty());
        err
    }

    fn trace(source: &str, mode: ScopeMode) -> Vec<Snapshot> {
        let program = scopes_syntax::parse(source).unwrap();
        let mut snapshots = Vec::new();
        let mut interpreter = Interpreter::new(&program, mode, Vec::new()).unwrap();
        interpreter.add_tracer(&mut snapshots);
        interpreter.run().unwrap();
        drop(interpreter);
        snapshots
    }

    #[test]
    fn static_reads_follow_definition_site() {
        assert_eq!(run(SCENARIO_A, ScopeMode::Static).unwrap(), "1\n");
    }

    #[test]
    fn dynamic_reads_follow_callers() {
        assert_eq!(run(SCENARIO_A, ScopeMode::Dynamic).unwrap(), "2\n");
    }

    #[test]
    fn static_result_is_independent_of_call_chain() {
        let source = r#"
            int x;
            def f() { print(x); }
            def g() { int x; x = 9; f(); }
            def h() { float x; x = 4.5; g(); }
            main() { x = 7; f(); g(); h(); }
        "#;
        assert_eq!(run(source, ScopeMode::Static).unwrap(), "7\n7\n7\n");
        assert_eq!(run(source, ScopeMode::Dynamic).unwrap(), "7\n9\n9\n");
    }

    #[test]
    fn dynamic_result_is_independent_of_definition_site() {
        // `f` is defined after `g` and next to a global `y`, yet only the
        // caller's `y` matters.
        let source = r#"
            def g() { int y; y = 5; f(); }
            int y;
            def f() { print(y); }
            main() { y = 1; g(); }
        "#;
        assert_eq!(run(source, ScopeMode::Dynamic).unwrap(), "5\n");
        assert_eq!(run(source, ScopeMode::Static).unwrap(), "1\n");
    }

    #[test]
    fn write_then_read() {
        let source = "main() { int a; a = 5; print(a); a = a - 7; print(a); }";
        for mode in [ScopeMode::Static, ScopeMode::Dynamic] {
            assert_eq!(run(source, mode).unwrap(), "5\n-2\n");
        }
    }

    #[test]
    fn dynamic_assignment_reaches_caller_locals() {
        let source = r#"
            int x;
            def f() { x = 3; }
            def g() { int x; f(); print(x); }
            main() { x = 1; g(); print(x); }
        "#;
        assert_eq!(run(source, ScopeMode::Dynamic).unwrap(), "3\n1\n");
        assert_eq!(run(source, ScopeMode::Static).unwrap(), "0\n3\n");
    }

    #[test]
    fn locals_start_at_type_default() {
        let source = "main() { int i; float f; print(i); print(f); }";
        assert_eq!(run(source, ScopeMode::Static).unwrap(), "0\n0.0\n");
    }

    #[test]
    fn unassigned_global_reads_as_unset() {
        assert_eq!(run("char c; main() { print(c); print(); }", ScopeMode::Static).unwrap(), "unset\n\n");
    }

    #[test]
    fn arguments_bind_to_parameters() {
        let source = "def f(int a, char b) { print(b); print(a + 1); } main() { f(41, 'z'); }";
        assert_eq!(run(source, ScopeMode::Dynamic).unwrap(), "z\n42\n");
    }

    #[test]
    fn arithmetic_promotes_and_wraps() {
        let source = r#"main() { print(1 + 2.5); print(2.0 - 2); print(9223372036854775807 + 1); }"#;
        assert_eq!(run(source, ScopeMode::Static).unwrap(), "3.5\n0.0\n-9223372036854775808\n");
    }

    #[test]
    fn assignment_to_undeclared_name_fails() {
        for mode in [ScopeMode::Static, ScopeMode::Dynamic] {
            assert_eq!(
                run_err("main() { y = 1; }", mode),
                Error::NameError(NameError::AssignmentTargetNotFound { name: "y".to_string(), mode })
            );
        }
    }

    #[test]
    fn call_to_undeclared_function_fails() {
        for mode in [ScopeMode::Static, ScopeMode::Dynamic] {
            assert_eq!(
                run_err("main() { h(); }", mode),
                Error::NameError(NameError::CallTargetNotFound { name: "h".to_string(), mode })
            );
        }
    }

    #[test]
    fn call_with_wrong_argument_count_fails() {
        let source = "def f(int a) { } main() { f(); }";
        for mode in [ScopeMode::Static, ScopeMode::Dynamic] {
            assert_eq!(
                run_err(source, mode),
                Error::TypeError(TypeError::ArityMismatch {
                    name: "f".to_string(),
                    exp_args: 1,
                    got_args: 0,
                    mode,
                })
            );
        }
    }

    #[test]
    fn calling_a_variable_fails() {
        assert_eq!(
            run_err("int x; main() { x(); }", ScopeMode::Static),
            Error::TypeError(TypeError::NotCallable { name: "x".to_string(), mode: ScopeMode::Static })
        );
    }

    #[test]
    fn reading_a_function_fails() {
        for mode in [ScopeMode::Static, ScopeMode::Dynamic] {
            assert_eq!(
                run_err("def f() { } main() { print(f); }", mode),
                Error::NameError(NameError::UndefinedVariable { name: "f".to_string(), mode })
            );
        }
    }

    #[test]
    fn static_reads_ignore_caller_locals() {
        let source = "def f() { print(z); } def g() { int z; f(); } main() { g(); }";
        assert_eq!(
            run_err(source, ScopeMode::Static),
            Error::NameError(NameError::UndefinedVariable {
                name: "z".to_string(),
                mode: ScopeMode::Static,
            })
        );
        assert_eq!(run(source, ScopeMode::Dynamic).unwrap(), "0\n");
    }

    #[test]
    fn missing_main_fails() {
        for source in ["int x;", "int main;", "def f() { }"] {
            assert_eq!(
                run_err(source, ScopeMode::Dynamic),
                Error::NameError(NameError::NoEntryPoint { mode: ScopeMode::Dynamic })
            );
        }
    }

    #[test]
    fn main_must_take_no_arguments() {
        assert_eq!(
            run_err("def main(int a) { }", ScopeMode::Static),
            Error::TypeError(TypeError::ArityMismatch {
                name: "main".to_string(),
                exp_args: 1,
                got_args: 0,
                mode: ScopeMode::Static,
            })
        );
    }

    #[test]
    fn unbounded_recursion_overflows() {
        assert_eq!(
            run_err("def f() { f(); } main() { f(); }", ScopeMode::Dynamic),
            Error::OverflowError(OverflowError::StackOverflow {
                name: "f".to_string(),
                depth: FRAMES_MAX,
                mode: ScopeMode::Dynamic,
            })
        );
    }

    #[test]
    fn unsupported_arithmetic_fails() {
        assert_eq!(
            run_err("main() { print(2 * 3); }", ScopeMode::Static),
            Error::TypeError(TypeError::UnsupportedOperator {
                op: "*".to_string(),
                mode: ScopeMode::Static,
            })
        );
        assert_eq!(
            run_err("char c; main() { c = 'a'; print(c + 1); }", ScopeMode::Dynamic),
            Error::TypeError(TypeError::UnsupportedOperands {
                op: "+".to_string(),
                lt_type: "char".to_string(),
                rt_type: "int".to_string(),
                mode: ScopeMode::Dynamic,
            })
        );
    }

    #[test]
    fn duplicate_globals_are_rejected_at_construction() {
        let program = scopes_syntax::parse("int x; float x; main() { }").unwrap();
        let result = Interpreter::new(&program, ScopeMode::Dynamic, Vec::new());
        assert_eq!(
            result.err(),
            Some((
                Error::NameError(NameError::Redeclaration {
                    name: "x".to_string(),
                    mode: ScopeMode::Dynamic,
                }),
                7..15,
            ))
        );
    }

    #[test]
    fn globals_are_prepopulated() {
        let program = scopes_syntax::parse("int x; def f() { } main() { x = 4; }").unwrap();
        let mut interpreter = Interpreter::new(&program, ScopeMode::Static, Vec::new()).unwrap();
        assert_eq!(interpreter.global("x"), Some(Value::Unset));
        assert_eq!(
            interpreter.globals().global().lookup_local("f").map(|symbol| symbol.kind),
            Some(SymbolKind::Function { id: 1, arity: 0, closure: Some(ScopeId::GLOBAL) })
        );
        assert!(interpreter.globals().global().lookup_local("print").is_some());

        interpreter.run().unwrap();
        assert_eq!(interpreter.global("x"), Some(Value::Int(4)));
        assert_eq!(interpreter.global("f"), None);
    }

    #[test]
    fn snapshots_follow_each_step() {
        let snapshots = trace(SCENARIO_A, ScopeMode::Dynamic);
        let actions = snapshots.iter().map(|snapshot| snapshot.action.as_str()).collect::<Vec<_>>();
        assert_eq!(
            actions,
            vec![
                "Program Start",
                "Assignment: x = 1",
                "Function Call: g",
                "Declaration: int x",
                "Assignment: x = 2",
                "Function Call: f",
                "Print statement: 2",
                "Function Return: f",
                "Function Return: g",
                "Program End",
            ]
        );

        let print = &snapshots[6];
        assert_eq!(print.output, Some(Value::Int(2)));
        let names = print.call_stack.iter().map(|frame| frame.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["main", "g", "f"]);
        assert_eq!(print.call_stack[2].parent.as_deref(), Some("g"));
        assert_eq!(print.global_scope.get("x"), Some(&Value::Int(1)));

        let end = snapshots.last().unwrap();
        assert!(end.call_stack.is_empty());
    }

    #[test]
    fn static_frames_name_their_lexical_parent() {
        let snapshots = trace(SCENARIO_A, ScopeMode::Static);
        let call_f = snapshots.iter().find(|snapshot| snapshot.action == "Function Call: f").unwrap();
        for frame in &call_f.call_stack {
            assert_eq!(frame.lex_parent.as_deref(), Some("global"));
            assert_eq!(frame.parent, None);
        }
    }
}
