// src/value.rs
//! The dynamic value universe runtypes validate.
//!
//! `Value` plays the role of the untyped data that arrives over a boundary:
//! a network payload deserialized with serde, user input, a config file.
//! Beyond the JSON kinds it carries the host-side kinds the combinators
//! need: symbols, callable functions, deferred computations, and opaque
//! native objects (for `instance_of`).

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::ValidationError;

/// A host function callable with dynamic values. Fallible so that enforced
/// contracts can surface argument/return violations from inside a call.
pub type NativeFn = Arc<dyn Fn(&[Value]) -> Result<Value, ValidationError> + Send + Sync>;

/// A dynamically-typed value.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Symbol(String),
    Array(Vec<Value>),
    /// Insertion order is preserved; validation never reorders keys.
    Object(IndexMap<String, Value>),
    Function(NativeFn),
    Deferred(Deferred),
    Opaque(Opaque),
}

impl Value {
    /// Kind label used in failure messages ("Expected number, but was string").
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
            Value::Deferred(_) => "deferred",
            Value::Opaque(o) => o.type_name(),
        }
    }

    /// One-line rendering for diagnostics. Composites show their kind only,
    /// so messages stay bounded no matter how large the input is.
    pub fn brief(&self) -> String {
        match self {
            Value::Null => "null".into(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => format!("\"{s}\""),
            Value::Symbol(s) => format!("Symbol({s})"),
            _ => self.kind_name().to_string(),
        }
    }

    /// Back across the serde boundary. `None` for the non-JSON kinds
    /// (symbol, function, deferred, opaque) and for non-finite numbers.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        Some(match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n).map(serde_json::Value::Number)?,
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(xs) => {
                serde_json::Value::Array(xs.iter().map(Value::to_json).collect::<Option<_>>()?)
            }
            Value::Object(m) => serde_json::Value::Object(
                m.iter()
                    .map(|(k, v)| Some((k.clone(), v.to_json()?)))
                    .collect::<Option<_>>()?,
            ),
            Value::Symbol(_) | Value::Function(_) | Value::Deferred(_) | Value::Opaque(_) => {
                return None;
            }
        })
    }
}

/// Representational equality. `Number` compares with `f64 ==`, so `NaN`
/// is never equal to anything (including itself). Functions, deferreds
/// and opaques compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len() && a.iter().all(|(k, v)| b.get(k) == Some(v))
            }
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (Value::Deferred(a), Value::Deferred(b)) => Arc::ptr_eq(&a.run, &b.run),
            (Value::Opaque(a), Value::Opaque(b)) => Arc::ptr_eq(&a.payload, &b.payload),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Array(xs) => f.debug_list().entries(xs).finish(),
            Value::Object(m) => f.debug_map().entries(m).finish(),
            other => write!(f, "{}", other.brief()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            // Large u64s fall outside f64's exact range; validation only
            // cares about kind and magnitude, so the rounding is accepted.
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(xs) => Value::Array(xs.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(m) => {
                Value::Object(m.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}
impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}
impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}
impl From<Vec<Value>> for Value {
    fn from(xs: Vec<Value>) -> Self {
        Value::Array(xs)
    }
}

// ------------------------------ Deferred ---------------------------------- //

/// A deferred computation: the synchronous stand-in for a promise.
///
/// Resolving runs the underlying thunk; the `deferred` combinator lifts
/// validation across this boundary without scheduling anything itself.
#[derive(Clone)]
pub struct Deferred {
    pub(crate) run: Arc<dyn Fn() -> Result<Value, ValidationError> + Send + Sync>,
}

impl Deferred {
    pub fn new(
        run: impl Fn() -> Result<Value, ValidationError> + Send + Sync + 'static,
    ) -> Self {
        Deferred { run: Arc::new(run) }
    }

    /// A deferred that resolves to an already-known value.
    pub fn ready(value: Value) -> Self {
        Deferred::new(move || Ok(value.clone()))
    }

    pub fn resolve(&self) -> Result<Value, ValidationError> {
        (self.run)()
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Deferred")
    }
}

// ------------------------------- Opaque ----------------------------------- //

/// A shared native object carried through the dynamic layer untouched.
/// `instance_of::<T>()` recognizes these by `TypeId`.
#[derive(Clone)]
pub struct Opaque {
    type_name: &'static str,
    pub(crate) payload: Arc<dyn Any + Send + Sync>,
}

impl Opaque {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Opaque {
            type_name: std::any::type_name::<T>(),
            payload: Arc::new(value),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn type_id(&self) -> TypeId {
        (*self.payload).type_id()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque<{}>", self.type_name)
    }
}

// ---------------------------- Literal bases -------------------------------- //

/// The primitive values a `literal` runtype can pin down.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LiteralValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

impl LiteralValue {
    /// Representational equality against a dynamic value. Numbers use
    /// `f64 ==`, so `LiteralValue::Number(NaN)` matches nothing at all.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (LiteralValue::Null, Value::Null) => true,
            (LiteralValue::Bool(a), Value::Bool(b)) => a == b,
            (LiteralValue::Number(a), Value::Number(b)) => a == b,
            (LiteralValue::String(a), Value::String(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Null => f.write_str("null"),
            LiteralValue::Bool(b) => write!(f, "{b}"),
            LiteralValue::Number(n) => write!(f, "{n}"),
            LiteralValue::String(s) => write!(f, "\"{s}\""),
        }
    }
}

impl From<bool> for LiteralValue {
    fn from(b: bool) -> Self {
        LiteralValue::Bool(b)
    }
}
impl From<f64> for LiteralValue {
    fn from(n: f64) -> Self {
        LiteralValue::Number(n)
    }
}
impl From<i64> for LiteralValue {
    fn from(n: i64) -> Self {
        LiteralValue::Number(n as f64)
    }
}
impl From<i32> for LiteralValue {
    fn from(n: i32) -> Self {
        LiteralValue::Number(n as f64)
    }
}
impl From<&str> for LiteralValue {
    fn from(s: &str) -> Self {
        LiteralValue::String(s.to_string())
    }
}
impl From<String> for LiteralValue {
    fn from(s: String) -> Self {
        LiteralValue::String(s)
    }
}

// ------------------------------- Tests ------------------------------------ //
