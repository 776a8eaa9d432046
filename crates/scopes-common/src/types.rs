use std::fmt::{self, Display, Formatter};
use std::ops::Range;

use serde::Serialize;

pub type Spanned<T> = (T, Span);
pub type Span = Range<usize>;

/// The name-resolution discipline an interpreter runs under. Fixed for the
/// lifetime of a run; switching requires a fresh interpreter.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeMode {
    /// Names resolve through the scopes active where a function was defined.
    #[default]
    Static,
    /// Names resolve through the callers active where a reference executes.
    Dynamic,
}

impl ScopeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeMode::Static => "static",
            ScopeMode::Dynamic => "dynamic",
        }
    }
}

impl Display for ScopeMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
