use rustc_hash::FxHashMap;
use scopes_common::types::ScopeMode;

use std::ops::{Index, IndexMut};

use crate::symbol_table::ScopeId;
use crate::value::Value;

/// Position of an [`ActivationRecord`] on the [`CallStack`]. A record's
/// parents always sit below it, so a handle held by a live record stays valid
/// for as long as that record is on the stack.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct FrameId(usize);

/// Where a static lookup continues once a record's own locals are exhausted.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LexicalParent {
    Frame(FrameId),
    Scope(ScopeId),
}

#[derive(Debug)]
pub struct ActivationRecord {
    pub name: String,
    pub mode: ScopeMode,
    pub locals: FxHashMap<String, Value>,
    /// The caller's record. Only set under dynamic scoping.
    pub dynamic_parent: Option<FrameId>,
    /// The defining scope. Only set under static scoping.
    pub lexical_parent: Option<LexicalParent>,
}

impl ActivationRecord {
    pub fn new(
        name: impl Into<String>,
        mode: ScopeMode,
        dynamic_parent: Option<FrameId>,
        lexical_parent: Option<LexicalParent>,
    ) -> Self {
        Self {
            name: name.into(),
            mode,
            locals: FxHashMap::default(),
            dynamic_parent,
            lexical_parent,
        }
    }

    pub fn get_local(&self, name: &str) -> Option<Value> {
        self.locals.get(name).copied()
    }

    pub fn has_local(&self, name: &str) -> bool {
        self.locals.contains_key(name)
    }

    pub fn set_local(&mut self, name: &str, value: Value) {
        match self.locals.get_mut(name) {
            Some(slot) => *slot = value,
            None => {
                self.locals.insert(name.to_string(), value);
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct CallStack {
    frames: Vec<ActivationRecord>,
}

impl CallStack {
    pub fn push(&mut self, record: ActivationRecord) -> FrameId {
        self.frames.push(record);
        FrameId(self.frames.len() - 1)
    }

    pub fn pop(&mut self) -> Option<ActivationRecord> {
        self.frames.pop()
    }

    pub fn peek(&self) -> Option<&ActivationRecord> {
        self.frames.last()
    }

    pub fn peek_mut(&mut self) -> Option<&mut ActivationRecord> {
        self.frames.last_mut()
    }

    /// Handle to the record currently executing.
    pub fn top(&self) -> Option<FrameId> {
        self.frames.len().checked_sub(1).map(FrameId)
    }

    pub fn get(&self, id: FrameId) -> Option<&ActivationRecord> {
        self.frames.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Iterates from the base of the stack to the top.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &ActivationRecord> {
        self.frames.iter()
    }

    /// Follows dynamic-parent links from the top record and returns the first
    /// record that holds `name` as a local.
    pub fn find_dynamic(&self, name: &str) -> Option<FrameId> {
        let mut current = self.top();
        while let Some(id) = current {
            let record = &self[id];
            if record.has_local(name) {
                return Some(id);
            }
            current = record.dynamic_parent;
        }
        None
    }
}

impl Index<FrameId> for CallStack {
    type Output = ActivationRecord;

    fn index(&self, id: FrameId) -> &Self::Output {
        self.frames
            .get(id.0)
            .unwrap_or_else(|| unreachable!("frame id points above the stack: {id:?}"))
    }
}

impl IndexMut<FrameId> for CallStack {
    fn index_mut(&mut self, id: FrameId) -> &mut Self::Output {
        self.frames
            .get_mut(id.0)
            .unwrap_or_else(|| unreachable!("frame id points above the stack: {id:?}"))
    }
}
