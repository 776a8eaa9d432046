use crate::types::{ScopeMode, Span, Spanned};

use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFile;
use codespan_reporting::term;
use termcolor::WriteColor;
use thiserror::Error;

pub type ErrorS = Spanned<Error>;
pub type Result<T, E = ErrorS> = std::result::Result<T, E>;

#[remain::sorted]
#[derive(Debug, Error, Eq, PartialEq)]
pub enum Error {
    #[error("IOError: {0}")]
    IoError(IoError),
    #[error("NameError: {0}")]
    NameError(NameError),
    #[error("OverflowError: {0}")]
    OverflowError(OverflowError),
    #[error("SemanticError: {0}")]
    SemanticError(SemanticError),
    #[error("SyntaxError: {0}")]
    SyntaxError(SyntaxError),
    #[error("TypeError: {0}")]
    TypeError(TypeError),
}

impl Error {
    /// The scope mode that was active when the error was raised, if the error
    /// came from scope resolution or execution.
    pub fn mode(&self) -> Option<ScopeMode> {
        match self {
            Error::NameError(e) => Some(e.mode()),
            Error::OverflowError(OverflowError::StackOverflow { mode, .. }) => Some(*mode),
            Error::TypeError(e) => Some(e.mode()),
            Error::IoError(_) | Error::SemanticError(_) | Error::SyntaxError(_) => None,
        }
    }
}

impl AsDiagnostic for Error {
    fn as_diagnostic(&self, span: &Span) -> Diagnostic<()> {
        let code = match self {
            Error::IoError(_) => "IOError",
            Error::NameError(_) => "NameError",
            Error::OverflowError(_) => "OverflowError",
            Error::SemanticError(_) => "SemanticError",
            Error::SyntaxError(_) => "SyntaxError",
            Error::TypeError(_) => "TypeError",
        };
        let diagnostic = Diagnostic::error().with_code(code).with_message(self.to_string());
        match self {
            Error::NameError(NameError::NoEntryPoint { .. }) => diagnostic
                .with_notes(vec![r#"define a function with "main() { ... }""#.to_string()]),
            Error::SyntaxError(
                SyntaxError::UnrecognizedEOF { expected }
                | SyntaxError::UnrecognizedToken { expected, .. },
            ) => diagnostic
                .with_labels(vec![Label::primary((), span.clone())])
                .with_notes(vec![format!("expected: {}", one_of(expected))]),
            _ => diagnostic.with_labels(vec![Label::primary((), span.clone())]),
        }
    }
}

#[remain::sorted]
#[derive(Debug, Error, Eq, PartialEq)]
pub enum IoError {
    #[error("unable to write to file: {file:?}")]
    WriteError { file: String },
}

#[remain::sorted]
#[derive(Debug, Error, Eq, PartialEq)]
pub enum NameError {
    #[error("cannot assign to {name:?}: no such variable under {mode} scoping")]
    AssignmentTargetNotFound { name: String, mode: ScopeMode },
    #[error("cannot call {name:?}: function is not defined")]
    CallTargetNotFound { name: String, mode: ScopeMode },
    #[error(r#"no "main" function found in the program"#)]
    NoEntryPoint { mode: ScopeMode },
    #[error("name {name:?} is already defined in this scope")]
    Redeclaration { name: String, mode: ScopeMode },
    #[error("identifier {name:?} is not defined in any enclosing scope")]
    UndefinedIdentifier { name: String, mode: ScopeMode },
    #[error("undefined variable {name:?} under {mode} scoping")]
    UndefinedVariable { name: String, mode: ScopeMode },
}

impl NameError {
    pub fn mode(&self) -> ScopeMode {
        match self {
            NameError::AssignmentTargetNotFound { mode, .. }
            | NameError::CallTargetNotFound { mode, .. }
            | NameError::NoEntryPoint { mode }
            | NameError::Redeclaration { mode, .. }
            | NameError::UndefinedIdentifier { mode, .. }
            | NameError::UndefinedVariable { mode, .. } => *mode,
        }
    }
}

#[remain::sorted]
#[derive(Debug, Error, Eq, PartialEq)]
pub enum OverflowError {
    #[error("stack overflow while calling {name:?}: more than {depth} frames")]
    StackOverflow { name: String, depth: usize, mode: ScopeMode },
}

#[remain::sorted]
#[derive(Debug, Error, Eq, PartialEq)]
pub enum SemanticError {
    #[error("{name}() takes {exp_args} arguments but {got_args} were given")]
    ArityMismatch { name: String, exp_args: usize, got_args: usize },
    #[error("function {name:?} cannot be used as a value")]
    FunctionAsValue { name: String },
    #[error("cannot pass {got_type:?} to parameter {param:?} of type {exp_type:?} in call to {name}()")]
    IncompatibleArgument { name: String, param: String, exp_type: String, got_type: String },
    #[error("cannot assign {got_type:?} to variable {name:?} of type {exp_type:?}")]
    IncompatibleAssignment { name: String, exp_type: String, got_type: String },
    #[error("{name:?} is not a function")]
    NotCallable { name: String },
    #[error("name {name:?} is not declared")]
    NotDeclared { name: String },
}

#[remain::sorted]
#[derive(Debug, Error, Eq, PartialEq)]
pub enum SyntaxError {
    #[error("extraneous input: {token:?}")]
    ExtraToken { token: String },
    #[error("invalid input")]
    InvalidToken,
    #[error(r#"function {name:?} must be introduced with "def""#)]
    MissingDef { name: String },
    #[error("unexpected input: {token:?}")]
    UnexpectedInput { token: String },
    #[error("unexpected end of file")]
    UnrecognizedEOF { expected: Vec<String> },
    #[error("unexpected {token:?}")]
    UnrecognizedToken { token: String, expected: Vec<String> },
}

#[remain::sorted]
#[derive(Debug, Error, Eq, PartialEq)]
pub enum TypeError {
    #[error("{name}() takes {exp_args} arguments but {got_args} were given")]
    ArityMismatch { name: String, exp_args: usize, got_args: usize, mode: ScopeMode },
    #[error("{name:?} is a variable, not a function")]
    NotCallable { name: String, mode: ScopeMode },
    #[error("unsupported operand type(s) for {op}: {lt_type:?} and {rt_type:?}")]
    UnsupportedOperands { op: String, lt_type: String, rt_type: String, mode: ScopeMode },
    #[error("unsupported binary operator: {op}")]
    UnsupportedOperator { op: String, mode: ScopeMode },
}

impl TypeError {
    pub fn mode(&self) -> ScopeMode {
        match self {
            TypeError::ArityMismatch { mode, .. }
            | TypeError::NotCallable { mode, .. }
            | TypeError::UnsupportedOperands { mode, .. }
            | TypeError::UnsupportedOperator { mode, .. } => *mode,
        }
    }
}

trait AsDiagnostic {
    fn as_diagnostic(&self, span: &Span) -> Diagnostic<()>;
}

fn one_of(tokens: &[String]) -> String {
    let (token_last, tokens) = match tokens.split_last() {
        Some((token_last, &[])) => return token_last.to_string(),
        Some((token_last, tokens)) => (token_last, tokens),
        None => return "nothing".to_string(),
    };

    let mut output = String::new();
    for token in tokens {
        output.push_str(token);
        output.push_str(", ");
    }
    output.push_str("or ");
    output.push_str(token_last);
    output
}

/// Renders `errors` against `source`, ordered by where they occur.
pub fn report_err(
    writer: &mut dyn WriteColor,
    name: &str,
    source: &str,
    mut errors: Vec<ErrorS>,
) -> Result<(), codespan_reporting::files::Error> {
    errors.sort_unstable_by_key(|(_, span)| (span.start, span.end));

    let file = SimpleFile::new(name, source);
    let config = term::Config::default();
    for (err, span) in errors {
        term::emit(writer, &config, &file, &err.as_diagnostic(&span))?;
    }
    Ok(())
}
