// src/matcher.rs
//! Order-sensitive pattern matching over a closed set of shapes.
//!
//! A `Matcher` pairs runtypes with handlers and dispatches a value to the
//! first case whose runtype accepts it: the runtime analogue of matching
//! on a tagged union. `Runtype::match_union` builds one directly from a
//! union's alternatives, enforcing that the handler count is exhaustive.

use thiserror::Error;

use crate::error::ValidationError;
use crate::reflect::Tag;
use crate::runtype::Runtype;
use crate::value::Value;

pub type Handler<Z> = Box<dyn Fn(&Value) -> Z + Send + Sync>;

pub struct Case<Z> {
    runtype: Runtype,
    handler: Handler<Z>,
}

/// Pair a runtype with the handler to run when it accepts.
pub fn when<Z>(runtype: Runtype, handler: impl Fn(&Value) -> Z + Send + Sync + 'static) -> Case<Z> {
    Case { runtype, handler: Box::new(handler) }
}

pub struct Matcher<Z> {
    cases: Vec<Case<Z>>,
}

impl<Z> std::fmt::Debug for Matcher<Z> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matcher")
            .field("cases", &self.cases.len())
            .finish()
    }
}

impl<Z> Matcher<Z> {
    pub fn new(cases: Vec<Case<Z>>) -> Self {
        Matcher { cases }
    }

    /// Re-validates against each case in declaration order and invokes the
    /// first accepting case's handler.
    pub fn apply(&self, value: &Value) -> Result<Z, ValidationError> {
        for case in &self.cases {
            if case.runtype.guard(value) {
                return Ok((case.handler)(value));
            }
        }
        Err(ValidationError::new("No alternatives were matched"))
    }
}

/// A matcher could not be built from a runtype.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatchError {
    #[error("expected a union runtype, but was {0:?}")]
    NotAUnion(Tag),
    #[error("union has {expected} alternatives, but {received} handlers were supplied")]
    CaseCount { expected: usize, received: usize },
}

impl Runtype {
    /// Exhaustive dispatch over a union: one handler per alternative, in
    /// the same order.
    pub fn match_union<Z>(&self, handlers: Vec<Handler<Z>>) -> Result<Matcher<Z>, MatchError> {
        let alternatives = self
            .alternatives()
            .ok_or_else(|| MatchError::NotAUnion(self.tag()))?;
        if alternatives.len() != handlers.len() {
            return Err(MatchError::CaseCount {
                expected: alternatives.len(),
                received: handlers.len(),
            });
        }
        let cases = alternatives
            .into_iter()
            .zip(handlers)
            .map(|(runtype, handler)| Case { runtype, handler })
            .collect();
        Ok(Matcher::new(cases))
    }
}

// ------------------------------- Tests ------------------------------------ //
