pub mod call_stack;
pub mod checker;
pub mod interpreter;
pub mod render;
pub mod resolver;
pub mod snapshot;
pub mod symbol_table;
pub mod value;

use scopes_common::error::ErrorS;
use scopes_common::types::ScopeMode;
use tracing::{debug, info};

use std::io::Write;

use crate::checker::Checker;
use crate::interpreter::Interpreter;
use crate::resolver::Resolver;
use crate::snapshot::Tracer;

/// Settings that apply to a whole run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Options {
    pub mode: ScopeMode,
    /// Type check the program before running it.
    pub check: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self { mode: ScopeMode::default(), check: true }
    }
}

/// Parses, analyses and runs `source`, writing program output to `stdout`
/// and every step to `tracers`.
pub fn run<'a>(
    source: &str,
    options: &Options,
    stdout: impl Write,
    tracers: Vec<Box<dyn Tracer + 'a>>,
) -> Result<(), Vec<ErrorS>> {
    let mut program = scopes_syntax::parse(source).map_err(|e| vec![e])?;
    debug!(decls = program.decls.len(), "parsed program");

    if options.mode == ScopeMode::Static {
        let scopes = Resolver::default().resolve(&mut program)?;
        debug!(tables = scopes.len(), "resolved static scopes");
    }
    if options.check {
        Checker::new(&program, options.mode).check()?;
        debug!("type check passed");
    }

    info!(mode = %options.mode, "running program");
    let mut interpreter = Interpreter::new(&program, options.mode, stdout).map_err(|e| vec![e])?;
    for tracer in tracers {
        interpreter.add_tracer(tracer);
    }
    interpreter.run().map_err(|e| vec![e])
}
