use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use scopes_common::error::{report_err, ErrorS};
use scopes_common::types::ScopeMode;
use scopes_interpreter::render::Render;
use scopes_interpreter::snapshot::{JsonLog, Tracer};
use scopes_interpreter::Options;
use termcolor::{ColorChoice, StandardStream};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use std::fmt::Write as _;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(about, author, disable_help_subcommand = true, propagate_version = true, version)]
pub enum Cmd {
    /// Run a program under one scoping discipline.
    Run {
        path: PathBuf,
        /// Resolve names where functions are defined (the default).
        #[arg(long = "static", conflicts_with = "dynamic")]
        static_: bool,
        /// Resolve names through the chain of callers.
        #[arg(long)]
        dynamic: bool,
        /// Write one JSON line per execution step to FILE, replacing its contents.
        #[arg(long, value_name = "FILE")]
        json_log: Option<PathBuf>,
        /// Print the call stack and global scope to stderr after every step.
        #[arg(long)]
        trace: bool,
        /// Skip type checking.
        #[arg(long)]
        no_check: bool,
        /// Increase diagnostic logging; repeat for more.
        #[arg(short, long, action = ArgAction::Count)]
        verbose: u8,
    },
    /// Run a program under both disciplines and print the outputs side by side.
    Compare {
        path: PathBuf,
        /// Skip type checking.
        #[arg(long)]
        no_check: bool,
    },
}

impl Cmd {
    pub fn run(&self) -> Result<ExitCode> {
        match self {
            Cmd::Run { path, dynamic, json_log, trace, no_check, verbose, .. } => {
                setup_logging(*verbose);
                let mode = if *dynamic { ScopeMode::Dynamic } else { ScopeMode::Static };
                run(path, Options { mode, check: !no_check }, json_log.as_deref(), *trace)
            }
            Cmd::Compare { path, no_check } => {
                setup_logging(0);
                compare(path, !no_check)
            }
        }
    }
}

/// Sends diagnostic logging to stderr, filtered by `RUST_LOG` if it is set
/// and by the number of `-v` flags otherwise.
fn setup_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(io::stderr).init();
}

fn run(path: &Path, options: Options, json_log: Option<&Path>, trace: bool) -> Result<ExitCode> {
    let source = read_source(path)?;
    debug!(path = %path.display(), mode = %options.mode, check = options.check, "read source");

    let mut tracers: Vec<Box<dyn Tracer>> = Vec::new();
    if let Some(json_log) = json_log {
        let log = JsonLog::create(json_log)
            .with_context(|| format!("could not open log file: {}", json_log.display()))?;
        tracers.push(Box::new(log));
    }
    if trace {
        tracers.push(Box::new(Render::new(StandardStream::stderr(ColorChoice::Auto))));
    }

    let stdout = io::stdout().lock();
    match scopes_interpreter::run(&source, &options, stdout, tracers) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(errors) => {
            report(path, &source, errors)?;
            Ok(ExitCode::FAILURE)
        }
    }
}

fn compare(path: &Path, check: bool) -> Result<ExitCode> {
    let source = read_source(path)?;

    let mut failed = false;
    let mut outputs = Vec::new();
    for mode in [ScopeMode::Static, ScopeMode::Dynamic] {
        let mut output = Vec::new();
        if let Err(errors) = scopes_interpreter::run(&source, &Options { mode, check }, &mut output, Vec::new()) {
            for (err, _) in &errors {
                writeln!(output, "{err}")?;
            }
            failed = true;
        }
        outputs.push(String::from_utf8_lossy(&output).into_owned());
    }

    let mut stdout = io::stdout().lock();
    write!(stdout, "{}", side_by_side(("static", &outputs[0]), ("dynamic", &outputs[1])))?;
    Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

/// Lays out two captured outputs as columns under their headers.
fn side_by_side((lt_title, lt): (&str, &str), (rt_title, rt): (&str, &str)) -> String {
    let width = lt.lines().chain([lt_title]).map(|line| line.chars().count()).max().unwrap_or(0);
    let rows = lt.lines().count().max(rt.lines().count());

    let mut table = String::new();
    let _ = writeln!(table, "{lt_title:width$} | {rt_title}");
    let _ = writeln!(table, "{:-<width$}-+-{:-<len$}", "", "", len = rt_title.len());
    let (mut lt, mut rt) = (lt.lines(), rt.lines());
    for _ in 0..rows {
        let left = lt.next().unwrap_or_default();
        let right = rt.next().unwrap_or_default();
        let _ = writeln!(table, "{left:width$} | {right}");
    }
    table
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("could not read file: {}", path.display()))
}

fn report(path: &Path, source: &str, errors: Vec<ErrorS>) -> Result<()> {
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    report_err(&mut stderr, &path.display().to_string(), source, errors)
        .context("could not report errors")
}
