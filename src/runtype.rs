// src/runtype.rs
//! Runtype handles, the closed shape algebra, and the constructors.
//!
//! A `Runtype` is a cheap-to-clone, immutable handle over a node in a
//! shape tree. Composition builds new nodes and shares children by
//! reference; nothing mutates after construction, so a runtype built once
//! at startup is safely usable from any number of concurrent validations.
//!
//! Every combinator kind is one variant of the closed `Shape` sum type;
//! the variant *is* the tag. The uniform surface (`check` / `validate` /
//! `guard` / `reflect` plus the builder methods) is derived once here on
//! `Runtype`, so adding a combinator means adding a variant and its arm in
//! the validation walk, nothing else.

use std::any::{Any, TypeId};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, ThreadId};

use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::error::{Checked, ValidationError};
use crate::reflect::{Reflect, Tag};
use crate::value::{LiteralValue, Value};

/// Outcome of a user constraint predicate.
pub enum Verdict {
    Pass,
    /// Generic failure; the message names the constraint if it has a name.
    Fail,
    /// Failure with a custom message.
    Reject(String),
}

impl From<bool> for Verdict {
    fn from(ok: bool) -> Self {
        if ok { Verdict::Pass } else { Verdict::Fail }
    }
}

pub(crate) type Predicate = Arc<dyn Fn(&Value) -> Verdict + Send + Sync>;

/// Name and opaque metadata attached to a constraint, surfaced through
/// reflection and failure messages. `args` is never interpreted.
#[derive(Default)]
pub struct ConstraintOptions {
    pub name: Option<String>,
    pub args: Option<Value>,
}

impl ConstraintOptions {
    pub fn named(name: impl Into<String>) -> Self {
        ConstraintOptions { name: Some(name.into()), args: None }
    }
}

/// Key discipline for `dictionary`: arbitrary string keys, or keys that
/// must parse as finite numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    String,
    Number,
}

// ------------------------------ Shape tree -------------------------------- //

pub(crate) enum Shape {
    Unknown,
    Never,
    Boolean,
    Number,
    String,
    Symbol,
    Literal(LiteralValue),
    Array { element: Runtype, read_only: bool },
    Tuple(Vec<Runtype>),
    Record { fields: IndexMap<String, Runtype>, read_only: bool },
    Partial(IndexMap<String, Runtype>),
    Dictionary { key: KeyKind, value: Runtype },
    Union(Vec<Runtype>),
    Intersect(Vec<Runtype>),
    Constraint {
        underlying: Runtype,
        predicate: Predicate,
        name: Option<String>,
        args: Option<Value>,
    },
    Brand { brand: String, entity: Runtype },
    InstanceOf { type_name: &'static str, type_id: TypeId },
    Function,
    Callback { args: Vec<Runtype>, ret: Runtype },
    Deferred(Runtype),
    Lazy(LazyNode),
}

pub(crate) struct Node {
    pub(crate) shape: Shape,
    pub(crate) reflect: OnceCell<Reflect>,
}

/// A deferred, memoized runtype: the thunk runs at most once, on first
/// use, and the forced result is cached for the node's lifetime. This is
/// what lets a runtype reference itself without recursing at construction
/// time; the cycle bottoms out during value validation instead.
pub(crate) struct LazyNode {
    thunk: Mutex<Option<Box<dyn FnOnce() -> Runtype + Send>>>,
    /// Threads currently inside `force`. A thunk that forces its own node
    /// shows up here before `get_or_init` can deadlock on itself.
    forcing: Mutex<HashSet<ThreadId>>,
    forced: OnceCell<Runtype>,
}

impl LazyNode {
    pub(crate) fn force(&self) -> &Runtype {
        if let Some(rt) = self.forced.get() {
            return rt;
        }
        let me = thread::current().id();
        {
            let mut forcing = self.forcing.lock().unwrap_or_else(PoisonError::into_inner);
            if forcing.contains(&me) {
                panic!("recursive runtype forced while constructing itself");
            }
            forcing.insert(me);
        }
        let rt = self.forced.get_or_init(|| {
            let thunk = self
                .thunk
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            match thunk {
                Some(thunk) => thunk(),
                // The slot is emptied only by the thread running the init
                // closure, and that thread is blocked right here.
                None => unreachable!("lazy thunk consumed outside forcing"),
            }
        });
        self.forcing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&me);
        rt
    }
}

// ------------------------------- Runtype ---------------------------------- //

/// A composable validator for one shape of dynamic value.
#[derive(Clone)]
pub struct Runtype {
    pub(crate) node: Arc<Node>,
}

impl Runtype {
    pub(crate) fn from_shape(shape: Shape) -> Self {
        Runtype {
            node: Arc::new(Node { shape, reflect: OnceCell::new() }),
        }
    }

    pub(crate) fn shape(&self) -> &Shape {
        &self.node.shape
    }

    /// Node identity, used to detect cycles when walking reflections.
    pub(crate) fn node_id(&self) -> usize {
        Arc::as_ptr(&self.node) as *const () as usize
    }

    /// Chase `lazy` indirections to the underlying runtype, forcing each
    /// thunk at most once.
    pub(crate) fn resolved(&self) -> Runtype {
        let mut current = self.clone();
        loop {
            let next = match current.node.shape {
                Shape::Lazy(ref lazy) => lazy.force().clone(),
                _ => return current,
            };
            current = next;
        }
    }

    /// Single source of truth: never panics, reports the first failure
    /// depth-first, left-to-right. Success returns the input unchanged,
    /// except for the documented callback-wrapping case.
    pub fn validate(&self, value: &Value) -> Checked<Value> {
        crate::validate::validate(self, value)
    }

    /// `validate`, with failure raised as a `ValidationError`.
    pub fn check(&self, value: &Value) -> Result<Value, ValidationError> {
        self.validate(value).map_err(ValidationError::from)
    }

    /// Boolean form of `validate`; the message is discarded.
    pub fn guard(&self, value: &Value) -> bool {
        crate::validate::test(self, value).is_ok()
    }

    /// The combinator discriminant. Forces a `lazy` runtype.
    pub fn tag(&self) -> Tag {
        self.resolved().reflect_ref(|r| r.tag())
    }

    /// Shape description, computed on first access and cached per node.
    pub fn reflect(&self) -> Reflect {
        self.resolved().reflect_ref(Reflect::clone)
    }

    fn reflect_ref<T>(&self, f: impl FnOnce(&Reflect) -> T) -> T {
        f(self.node.reflect.get_or_init(|| Reflect::of(self)))
    }

    /// The ordered alternatives, if this is a union.
    pub fn alternatives(&self) -> Option<Vec<Runtype>> {
        match self.resolved().shape() {
            Shape::Union(alts) => Some(alts.clone()),
            _ => None,
        }
    }

    // ------------------------------ Builders ------------------------------ //

    /// Union this runtype with another.
    pub fn or(self, other: Runtype) -> Runtype {
        union([self, other])
    }

    /// Intersect this runtype with another.
    pub fn and(self, other: Runtype) -> Runtype {
        intersect([self, other])
    }

    /// Refine with an arbitrary predicate, applied only to values that
    /// already passed this runtype.
    pub fn with_constraint(
        self,
        predicate: impl Fn(&Value) -> Verdict + Send + Sync + 'static,
        options: ConstraintOptions,
    ) -> Runtype {
        constraint(self, predicate, options)
    }

    /// Refine with a boolean predicate (a type guard). Identical to
    /// `with_constraint` at runtime; the predicate cannot customize the
    /// failure message.
    pub fn with_guard(
        self,
        predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
        options: ConstraintOptions,
    ) -> Runtype {
        constraint(self, move |v| Verdict::from(predicate(v)), options)
    }

    /// Add a nominal brand. Validation is the entity's own, unchanged;
    /// the brand is visible only through reflection.
    pub fn with_brand(self, brand: impl Into<String>) -> Runtype {
        Runtype::from_shape(Shape::Brand { brand: brand.into(), entity: self })
    }

    /// Mark an array or record as read-only. Affects reflection only, not
    /// validation; other combinators are returned unchanged. Forces a
    /// `lazy` runtype, like `tag`.
    pub fn as_read_only(self) -> Runtype {
        let resolved = self.resolved();
        let replacement = match resolved.shape() {
            Shape::Array { element, .. } => Some(Shape::Array {
                element: element.clone(),
                read_only: true,
            }),
            Shape::Record { fields, .. } => Some(Shape::Record {
                fields: fields.clone(),
                read_only: true,
            }),
            _ => None,
        };
        match replacement {
            Some(shape) => Runtype::from_shape(shape),
            None => self,
        }
    }
}

impl fmt::Debug for Runtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Runtype({})", crate::show::show(self))
    }
}

// ---------------------------- Constructors -------------------------------- //

/// Accepts anything without refining it.
pub fn unknown() -> Runtype {
    Runtype::from_shape(Shape::Unknown)
}

/// Alias of `unknown`, kept for parity with older schemas.
pub fn void() -> Runtype {
    unknown()
}

/// Accepts nothing.
pub fn never() -> Runtype {
    Runtype::from_shape(Shape::Never)
}

pub fn boolean() -> Runtype {
    Runtype::from_shape(Shape::Boolean)
}

pub fn number() -> Runtype {
    Runtype::from_shape(Shape::Number)
}

pub fn string() -> Runtype {
    Runtype::from_shape(Shape::String)
}

pub fn symbol() -> Runtype {
    Runtype::from_shape(Shape::Symbol)
}

/// Accepts exactly one primitive value, by representational equality.
/// `literal(f64::NAN)` therefore accepts nothing at all.
pub fn literal(value: impl Into<LiteralValue>) -> Runtype {
    Runtype::from_shape(Shape::Literal(value.into()))
}

/// An ordered sequence whose every element matches `element`.
pub fn array(element: Runtype) -> Runtype {
    Runtype::from_shape(Shape::Array { element, read_only: false })
}

/// A fixed-length sequence with one runtype per position.
pub fn tuple(components: impl IntoIterator<Item = Runtype>) -> Runtype {
    Runtype::from_shape(Shape::Tuple(components.into_iter().collect()))
}

/// An object with the declared fields, all required. Keys not declared
/// here are ignored: matching is structural and open-world.
pub fn record<K: Into<String>>(fields: impl IntoIterator<Item = (K, Runtype)>) -> Runtype {
    Runtype::from_shape(Shape::Record {
        fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        read_only: false,
    })
}

/// Like `record`, but each field is validated only if its key is present.
/// A key explicitly set to null counts as present and is checked.
pub fn partial<K: Into<String>>(fields: impl IntoIterator<Item = (K, Runtype)>) -> Runtype {
    Runtype::from_shape(Shape::Partial(
        fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
    ))
}

/// An object of arbitrary keys whose every value matches `value`.
pub fn dictionary(value: Runtype, key: KeyKind) -> Runtype {
    Runtype::from_shape(Shape::Dictionary { key, value })
}

/// At least one alternative must accept, tried in declaration order.
pub fn union(alternatives: impl IntoIterator<Item = Runtype>) -> Runtype {
    Runtype::from_shape(Shape::Union(alternatives.into_iter().collect()))
}

/// Every intersectee must accept the same value, in declaration order.
pub fn intersect(intersectees: impl IntoIterator<Item = Runtype>) -> Runtype {
    Runtype::from_shape(Shape::Intersect(intersectees.into_iter().collect()))
}

pub fn constraint(
    underlying: Runtype,
    predicate: impl Fn(&Value) -> Verdict + Send + Sync + 'static,
    options: ConstraintOptions,
) -> Runtype {
    Runtype::from_shape(Shape::Constraint {
        underlying,
        predicate: Arc::new(predicate),
        name: options.name,
        args: options.args,
    })
}

/// A boolean predicate over anything: sugar for a constraint on `unknown`.
pub fn guard_of(
    predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
    options: ConstraintOptions,
) -> Runtype {
    unknown().with_guard(predicate, options)
}

/// A possibly-recursive runtype. The thunk is not evaluated here; it runs
/// at most once, the first time the runtype is used.
pub fn lazy(thunk: impl FnOnce() -> Runtype + Send + 'static) -> Runtype {
    Runtype::from_shape(Shape::Lazy(LazyNode {
        thunk: Mutex::new(Some(Box::new(thunk))),
        forcing: Mutex::new(HashSet::new()),
        forced: OnceCell::new(),
    }))
}

/// Accepts opaque values holding exactly a `T`.
pub fn instance_of<T: Any>() -> Runtype {
    Runtype::from_shape(Shape::InstanceOf {
        type_name: std::any::type_name::<T>(),
        type_id: TypeId::of::<T>(),
    })
}

/// Accepts any callable value, with no argument/return discipline.
pub fn function() -> Runtype {
    Runtype::from_shape(Shape::Function)
}

/// Accepts a callable value and, on success, hands back a wrapper that
/// enforces the argument and return runtypes on every future invocation.
/// The one combinator whose success value differs from its input.
pub fn callback(args: impl IntoIterator<Item = Runtype>, ret: Runtype) -> Runtype {
    Runtype::from_shape(Shape::Callback { args: args.into_iter().collect(), ret })
}

/// Accepts a deferred value; success is a new deferred that validates the
/// eventual result against `inner` when resolved.
pub fn deferred(inner: Runtype) -> Runtype {
    Runtype::from_shape(Shape::Deferred(inner))
}

// ------------------------------- Tests ------------------------------------ //
