// src/error.rs
//! Failure data and the raised error type.
//!
//! `validate` reports failures as data (`Failure`); only `check` converts
//! them into a `ValidationError`. Composite combinators annotate the key
//! with their own index/field name while unwinding, so the final key is a
//! dotted path from the root to the offending leaf (e.g. `a.0.name`).

use thiserror::Error;

use crate::value::Value;

/// A failed validation: a human-readable message plus the path at which
/// validation first failed inside a composite value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
    pub message: String,
    pub key: Option<String>,
}

impl Failure {
    pub fn new(message: impl Into<String>) -> Self {
        Failure { message: message.into(), key: None }
    }

    pub fn at(message: impl Into<String>, key: impl Into<String>) -> Self {
        Failure { message: message.into(), key: Some(key.into()) }
    }

    /// Prepend a path segment while bubbling out of a composite.
    pub fn nest(self, segment: impl Into<String>) -> Self {
        let segment = segment.into();
        let key = match self.key {
            None => segment,
            Some(inner) => format!("{segment}.{inner}"),
        };
        Failure { message: self.message, key: Some(key) }
    }
}

/// The result of a validation. Success carries the (possibly wrapped)
/// value; failure carries the message and key as plain data.
pub type Checked<T = Value> = Result<T, Failure>;

/// The error raised by `check` and by enforced contracts.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}{}", .key.as_ref().map(|k| format!(" (at {k})")).unwrap_or_default())]
pub struct ValidationError {
    pub message: String,
    pub key: Option<String>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        ValidationError { message: message.into(), key: None }
    }
}

impl From<Failure> for ValidationError {
    fn from(f: Failure) -> Self {
        ValidationError { message: f.message, key: f.key }
    }
}

// ------------------------------- Tests ------------------------------------ //
