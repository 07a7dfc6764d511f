// src/lib.rs
//! Runtime validation for dynamic values.
//!
//! A runtype is a composable validator: build one leaf-up out of
//! primitives and combinators, then hand it untyped data and get back
//! either the value (now known to have the declared shape) or a failure
//! pointing at the exact spot that broke.
//!
//! ```
//! use runtypes::*;
//!
//! let asteroid = record([
//!     ("kind", literal("asteroid")),
//!     ("mass", number()),
//!     ("tags", array(string())),
//! ]);
//!
//! let payload = Value::from(serde_json::json!({
//!     "kind": "asteroid",
//!     "mass": 183.0,
//!     "tags": ["ceres"],
//! }));
//! assert!(asteroid.guard(&payload));
//!
//! let bad = Value::from(serde_json::json!({
//!     "kind": "asteroid",
//!     "mass": "heavy",
//!     "tags": [],
//! }));
//! let err = asteroid.check(&bad).unwrap_err();
//! assert_eq!(err.to_string(), "Expected number, but was string (at mass)");
//! ```
//!
//! Every runtype satisfies the same contract: `validate` reports success
//! or failure as data and never panics, `check` raises a
//! [`ValidationError`], `guard` collapses to a boolean, and `reflect`
//! exposes the shape for generic tooling. Composition never mutates;
//! self-referential shapes go through [`lazy`].

pub mod contract;
pub mod error;
pub mod matcher;
pub mod reflect;
pub mod runtype;
pub mod show;
mod validate;
pub mod value;

pub use contract::Contract;
pub use error::{Checked, Failure, ValidationError};
pub use matcher::{Case, Handler, MatchError, Matcher, when};
pub use reflect::{Reflect, Tag};
pub use runtype::{
    ConstraintOptions, KeyKind, Runtype, Verdict, array, boolean, callback, constraint,
    deferred, dictionary, function, guard_of, instance_of, intersect, lazy, literal, never,
    number, partial, record, string, symbol, tuple, union, unknown, void,
};
pub use show::show;
pub use value::{Deferred, LiteralValue, NativeFn, Opaque, Value};
