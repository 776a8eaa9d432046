use scopes_common::types::ScopeMode;
use serde::Serialize;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::call_stack::{ActivationRecord, CallStack, LexicalParent};
use crate::symbol_table::Scopes;
use crate::value::Value;

/// The name/value view of interpreter state after one step.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Snapshot {
    pub action: String,
    pub scope_mode: ScopeMode,
    /// Frames from the base of the stack to the top.
    pub call_stack: Vec<FrameSnapshot>,
    pub global_scope: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameSnapshot {
    pub name: String,
    pub scope_type: ScopeMode,
    /// Name of the caller's record.
    pub parent: Option<String>,
    /// Name of the record or table static lookups continue in.
    pub lex_parent: Option<String>,
    pub locals: BTreeMap<String, Value>,
}

impl Snapshot {
    pub fn capture(
        action: impl Into<String>,
        mode: ScopeMode,
        stack: &CallStack,
        globals: &Scopes,
        output: Option<Value>,
    ) -> Self {
        let call_stack = stack.iter().map(|record| FrameSnapshot::capture(record, stack, globals)).collect();
        let global_scope = globals
            .global()
            .iter()
            .filter_map(|(name, symbol)| Some((name.to_string(), symbol.value?)))
            .collect();
        Self { action: action.into(), scope_mode: mode, call_stack, global_scope, output }
    }
}

impl FrameSnapshot {
    fn capture(record: &ActivationRecord, stack: &CallStack, globals: &Scopes) -> Self {
        let parent = record.dynamic_parent.and_then(|id| stack.get(id)).map(|parent| parent.name.clone());
        let lex_parent = record.lexical_parent.and_then(|parent| match parent {
            LexicalParent::Frame(id) => stack.get(id).map(|parent| parent.name.clone()),
            LexicalParent::Scope(id) => Some(globals[id].name().to_string()),
        });
        let locals = record.locals.iter().map(|(name, value)| (name.clone(), *value)).collect();
        Self { name: record.name.clone(), scope_type: record.mode, parent, lex_parent, locals }
    }
}

/// A consumer of snapshots, notified after every step of a run.
pub trait Tracer {
    fn record(&mut self, snapshot: &Snapshot) -> io::Result<()>;
}

impl<T: Tracer + ?Sized> Tracer for &mut T {
    fn record(&mut self, snapshot: &Snapshot) -> io::Result<()> {
        (**self).record(snapshot)
    }
}

impl<T: Tracer + ?Sized> Tracer for Box<T> {
    fn record(&mut self, snapshot: &Snapshot) -> io::Result<()> {
        (**self).record(snapshot)
    }
}

/// Keeps every snapshot in memory.
impl Tracer for Vec<Snapshot> {
    fn record(&mut self, snapshot: &Snapshot) -> io::Result<()> {
        self.push(snapshot.clone());
        Ok(())
    }
}

/// Writes each snapshot as one line of JSON.
#[derive(Debug)]
pub struct JsonLog<W> {
    writer: W,
}

impl JsonLog<BufWriter<File>> {
    /// Opens `path` for logging, discarding anything already in it.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> JsonLog<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Tracer for JsonLog<W> {
    fn record(&mut self, snapshot: &Snapshot) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, snapshot)?;
        writeln!(self.writer)?;
        self.writer.flush()
    }
}
