//! Captured Values
//!
//! Owned deep copies of whatever the tracer observed for a variable. Because a
//! `Value` owns its whole tree, a capture can never alias the live object it
//! was taken from. Self-referential objects are captured with [`Value::BackRef`]
//! pointing at an enclosing container, which keeps every tree finite.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Nesting depth beyond which two values are no longer compared and are
/// reported as different.
pub const MAX_COMPARE_DEPTH: usize = 256;

/// A captured value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Set(Vec<Value>),
    /// Key/value pairs in insertion order.
    Dict(Vec<(Value, Value)>),
    Object {
        type_name: String,
        fields: Vec<(String, Value)>,
    },
    /// Reference to the container `n` levels up from this position.
    BackRef(usize),
    /// A value the tracer could only describe, e.g. a file handle.
    Opaque { type_name: String, repr: String },
}

impl Value {
    /// Structural equality that terminates on every captured value.
    ///
    /// `Opaque` values have no trustworthy equality and always compare
    /// unequal. Floats compare with `total_cmp`, so a `NaN` equals itself.
    /// `Set` and `Dict` ignore element order.
    pub fn deep_eq(&self, other: &Value) -> bool {
        deep_eq_at(self, other, 0)
    }

    /// `true` when a change from `old` to `self` should be reported.
    pub fn differs_from(&self, old: &Value) -> bool {
        !self.deep_eq(old)
    }
}

fn deep_eq_at(a: &Value, b: &Value, depth: usize) -> bool {
    if depth > MAX_COMPARE_DEPTH {
        return false;
    }
    let next = depth + 1;
    match (a, b) {
        (Value::None, Value::None) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x.total_cmp(y) == Ordering::Equal,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::List(xs), Value::List(ys)) | (Value::Tuple(xs), Value::Tuple(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| deep_eq_at(x, y, next))
        }
        (Value::Set(xs), Value::Set(ys)) => {
            xs.len() == ys.len()
                && xs.iter().all(|x| ys.iter().any(|y| deep_eq_at(x, y, next)))
                && ys.iter().all(|y| xs.iter().any(|x| deep_eq_at(x, y, next)))
        }
        (Value::Dict(xs), Value::Dict(ys)) => {
            xs.len() == ys.len()
                && xs.iter().all(|(k, v)| {
                    ys.iter()
                        .find(|(k2, _)| deep_eq_at(k, k2, next))
                        .is_some_and(|(_, v2)| deep_eq_at(v, v2, next))
                })
        }
        (
            Value::Object {
                type_name: ta,
                fields: fa,
            },
            Value::Object {
                type_name: tb,
                fields: fb,
            },
        ) => {
            ta == tb
                && fa.len() == fb.len()
                && fa.iter().all(|(name, v)| {
                    fb.iter()
                        .find(|(other, _)| other == name)
                        .is_some_and(|(_, v2)| deep_eq_at(v, v2, next))
                })
        }
        (Value::BackRef(x), Value::BackRef(y)) => x == y,
        _ => false,
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::List(items) => {
                write!(f, "[")?;
                write_seq(f, items)?;
                write!(f, "]")
            }
            Value::Tuple(items) => {
                write!(f, "(")?;
                write_seq(f, items)?;
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Value::Set(items) if items.is_empty() => write!(f, "set()"),
            Value::Set(items) => {
                write!(f, "{{")?;
                write_seq(f, items)?;
                write!(f, "}}")
            }
            Value::Dict(pairs) => {
                write!(f, "{{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Object { type_name, fields } => {
                write!(f, "{}(", type_name)?;
                for (i, (name, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", name, v)?;
                }
                write!(f, ")")
            }
            Value::BackRef(_) => write!(f, "[...]"),
            Value::Opaque { repr, .. } => write!(f, "{}", repr),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}
