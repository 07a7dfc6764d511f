// src/reflect.rs
//! Shallow, introspectable shape descriptions.
//!
//! `Reflect` is the shadow of a runtype: one variant per combinator tag,
//! carrying exactly the structural metadata needed to describe the shape.
//! Composite variants hold child `Runtype` handles rather than nested
//! reflections, so a self-referential shape reflects in O(1) and generic
//! tooling recurses only as far as it chooses to. A `lazy` runtype never
//! surfaces here: reflecting forces it.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::json;

use crate::runtype::{KeyKind, Runtype, Shape};
use crate::value::{LiteralValue, Value};

/// The combinator discriminant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    Unknown,
    Never,
    Boolean,
    Number,
    String,
    Symbol,
    Literal,
    Array,
    Record,
    Partial,
    Dictionary,
    Tuple,
    Union,
    Intersect,
    Function,
    Constraint,
    #[serde(rename = "instanceof")]
    InstanceOf,
    Brand,
    Callback,
    #[serde(rename = "promise")]
    Deferred,
}

/// One-level description of a runtype's shape.
#[derive(Clone)]
pub enum Reflect {
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
    Union { alternatives: Vec<Runtype> },
    Intersect { intersectees: Vec<Runtype> },
    Constraint { underlying: Runtype, name: Option<String>, args: Option<Value> },
    Brand { brand: String, entity: Runtype },
    InstanceOf { type_name: &'static str },
    Function,
    Callback { args: Vec<Runtype>, ret: Runtype },
    Deferred(Runtype),
}

impl Reflect {
    /// Mirror a (non-lazy) runtype node. The predicate closure of a
    /// constraint is not representable here; its name and args are.
    pub(crate) fn of(rt: &Runtype) -> Reflect {
        match rt.shape() {
            Shape::Unknown => Reflect::Unknown,
            Shape::Never => Reflect::Never,
            Shape::Boolean => Reflect::Boolean,
            Shape::Number => Reflect::Number,
            Shape::String => Reflect::String,
            Shape::Symbol => Reflect::Symbol,
            Shape::Literal(lit) => Reflect::Literal(lit.clone()),
            Shape::Array { element, read_only } => Reflect::Array {
                element: element.clone(),
                read_only: *read_only,
            },
            Shape::Tuple(components) => Reflect::Tuple(components.clone()),
            Shape::Record { fields, read_only } => Reflect::Record {
                fields: fields.clone(),
                read_only: *read_only,
            },
            Shape::Partial(fields) => Reflect::Partial(fields.clone()),
            Shape::Dictionary { key, value } => Reflect::Dictionary {
                key: *key,
                value: value.clone(),
            },
            Shape::Union(alternatives) => Reflect::Union {
                alternatives: alternatives.clone(),
            },
            Shape::Intersect(intersectees) => Reflect::Intersect {
                intersectees: intersectees.clone(),
            },
            Shape::Constraint { underlying, name, args, .. } => Reflect::Constraint {
                underlying: underlying.clone(),
                name: name.clone(),
                args: args.clone(),
            },
            Shape::Brand { brand, entity } => Reflect::Brand {
                brand: brand.clone(),
                entity: entity.clone(),
            },
            Shape::InstanceOf { type_name, .. } => Reflect::InstanceOf {
                type_name: *type_name,
            },
            Shape::Function => Reflect::Function,
            Shape::Callback { args, ret } => Reflect::Callback {
                args: args.clone(),
                ret: ret.clone(),
            },
            Shape::Deferred(inner) => Reflect::Deferred(inner.clone()),
            Shape::Lazy(lazy) => Reflect::of(&lazy.force().resolved()),
        }
    }

    pub fn tag(&self) -> Tag {
        match self {
            Reflect::Unknown => Tag::Unknown,
            Reflect::Never => Tag::Never,
            Reflect::Boolean => Tag::Boolean,
            Reflect::Number => Tag::Number,
            Reflect::String => Tag::String,
            Reflect::Symbol => Tag::Symbol,
            Reflect::Literal(_) => Tag::Literal,
            Reflect::Array { .. } => Tag::Array,
            Reflect::Record { .. } => Tag::Record,
            Reflect::Partial(_) => Tag::Partial,
            Reflect::Dictionary { .. } => Tag::Dictionary,
            Reflect::Tuple(_) => Tag::Tuple,
            Reflect::Union { .. } => Tag::Union,
            Reflect::Intersect { .. } => Tag::Intersect,
            Reflect::Function => Tag::Function,
            Reflect::Constraint { .. } => Tag::Constraint,
            Reflect::InstanceOf { .. } => Tag::InstanceOf,
            Reflect::Brand { .. } => Tag::Brand,
            Reflect::Callback { .. } => Tag::Callback,
            Reflect::Deferred(_) => Tag::Deferred,
        }
    }

    /// Serializable rendering for diagnostics. A node re-entered along the
    /// current path (a shared cycle) renders its tag alone, as does any
    /// node past the depth cap, so recursive shapes render finitely.
    pub fn to_value(&self) -> serde_json::Value {
        self.render(&mut Walk::default())
    }

    fn render(&self, walk: &mut Walk) -> serde_json::Value {
        let children = |rts: &[Runtype], walk: &mut Walk| {
            rts.iter().map(|rt| child(rt, walk)).collect::<Vec<_>>()
        };
        let field_map = |fields: &IndexMap<String, Runtype>, walk: &mut Walk| {
            fields
                .iter()
                .map(|(k, rt)| (k.clone(), child(rt, walk)))
                .collect::<serde_json::Map<_, _>>()
        };

        match self {
            Reflect::Unknown
            | Reflect::Never
            | Reflect::Boolean
            | Reflect::Number
            | Reflect::String
            | Reflect::Symbol
            | Reflect::Function => json!({ "tag": self.tag() }),
            Reflect::Literal(lit) => json!({ "tag": self.tag(), "value": lit }),
            Reflect::Array { element, read_only } => json!({
                "tag": self.tag(),
                "element": child(element, walk),
                "isReadonly": read_only,
            }),
            Reflect::Tuple(components) => json!({
                "tag": self.tag(),
                "components": children(components, walk),
            }),
            Reflect::Record { fields, read_only } => json!({
                "tag": self.tag(),
                "fields": field_map(fields, walk),
                "isReadonly": read_only,
            }),
            Reflect::Partial(fields) => json!({
                "tag": self.tag(),
                "fields": field_map(fields, walk),
            }),
            Reflect::Dictionary { key, value } => json!({
                "tag": self.tag(),
                "key": key,
                "value": child(value, walk),
            }),
            Reflect::Union { alternatives } => json!({
                "tag": self.tag(),
                "alternatives": children(alternatives, walk),
            }),
            Reflect::Intersect { intersectees } => json!({
                "tag": self.tag(),
                "intersectees": children(intersectees, walk),
            }),
            Reflect::Constraint { underlying, name, args } => json!({
                "tag": self.tag(),
                "underlying": child(underlying, walk),
                "name": name,
                "args": args.as_ref().and_then(Value::to_json),
            }),
            Reflect::Brand { brand, entity } => json!({
                "tag": self.tag(),
                "brand": brand,
                "entity": child(entity, walk),
            }),
            Reflect::InstanceOf { type_name } => json!({
                "tag": self.tag(),
                "type": type_name,
            }),
            Reflect::Callback { args, ret } => json!({
                "tag": self.tag(),
                "args": children(args, walk),
                "returns": child(ret, walk),
            }),
            Reflect::Deferred(inner) => json!({
                "tag": self.tag(),
                "type": child(inner, walk),
            }),
        }
    }
}

/// Cycle/size guard for the recursive rendering walk.
#[derive(Default)]
struct Walk {
    on_path: HashSet<usize>,
    depth: usize,
}

/// Recursive shapes defined through functions produce a fresh node per
/// forced level, which identity tracking alone cannot catch.
const MAX_RENDER_DEPTH: usize = 32;

fn child(rt: &Runtype, walk: &mut Walk) -> serde_json::Value {
    let resolved = rt.resolved();
    let id = resolved.node_id();
    if walk.depth >= MAX_RENDER_DEPTH || !walk.on_path.insert(id) {
        return json!({ "tag": resolved.tag() });
    }
    walk.depth += 1;
    let rendered = resolved.reflect().render(walk);
    walk.depth -= 1;
    walk.on_path.remove(&id);
    rendered
}

// ------------------------------- Tests ------------------------------------ //
