use scopes_syntax::ast::Type;
use serde::Serialize;

use std::fmt::{self, Display, Formatter};

/// A run-time value. `Unset` marks a global that has been declared but never
/// assigned.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Char(char),
    Float(f64),
    Int(i64),
    Unset,
}

impl Value {
    /// The value a local declaration of `type_` starts out with.
    pub fn default_for(type_: Type) -> Self {
        match type_ {
            Type::Char => Value::Char('\0'),
            Type::Float => Value::Float(0.0),
            Type::Int => Value::Int(0),
        }
    }

    pub fn type_(&self) -> &'static str {
        match self {
            Value::Char(_) => "char",
            Value::Float(_) => "float",
            Value::Int(_) => "int",
            Value::Unset => "unset",
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(float) => Some(*float),
            Value::Int(int) => Some(*int as f64),
            Value::Char(_) | Value::Unset => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Char(char) => write!(f, "{char}"),
            Value::Float(float) => write!(f, "{float:?}"),
            Value::Int(int) => write!(f, "{int}"),
            Value::Unset => write!(f, "unset"),
        }
    }
}
