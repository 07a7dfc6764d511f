// src/show.rs
//! Human-readable type expressions for diagnostics.
//!
//! Renders a runtype tree the way the type would be written down:
//! `{ name: string; tags: string[]; }`, `number | string`, `[number, boolean]`.
//! Used by union failure messages; correctness of validation never depends
//! on this module.

use crate::reflect::Reflect;
use crate::runtype::{KeyKind, Runtype};

/// Nodes past this depth render as `...`; recursive shapes defined through
/// functions produce a fresh node per forced level, which identity
/// tracking alone cannot catch.
const MAX_SHOW_DEPTH: usize = 32;

pub fn show(rt: &Runtype) -> String {
    render(rt, false, &mut Vec::new())
}

fn render(rt: &Runtype, needs_parens: bool, path: &mut Vec<usize>) -> String {
    let rt = rt.resolved();
    let id = rt.node_id();
    if path.len() >= MAX_SHOW_DEPTH || path.contains(&id) {
        return "...".into();
    }
    path.push(id);
    let out = render_reflect(&rt.reflect(), needs_parens, path);
    path.pop();
    out
}

fn render_reflect(reflect: &Reflect, needs_parens: bool, path: &mut Vec<usize>) -> String {
    let parenthesize = |s: String| {
        if needs_parens { format!("({s})") } else { s }
    };

    match reflect {
        Reflect::Unknown => "unknown".into(),
        Reflect::Never => "never".into(),
        Reflect::Boolean => "boolean".into(),
        Reflect::Number => "number".into(),
        Reflect::String => "string".into(),
        Reflect::Symbol => "symbol".into(),
        Reflect::Literal(lit) => lit.to_string(),

        // Element type binds tighter than `[]`, so unions get parens.
        Reflect::Array { element, .. } => format!("{}[]", render(element, true, path)),

        Reflect::Tuple(components) => {
            let inner: Vec<String> = components.iter().map(|c| render(c, false, path)).collect();
            format!("[{}]", inner.join(", "))
        }

        Reflect::Record { fields, .. } => show_fields(fields, false, path),
        Reflect::Partial(fields) => show_fields(fields, true, path),

        Reflect::Dictionary { key, value } => {
            let key = match key {
                KeyKind::String => "string",
                KeyKind::Number => "number",
            };
            format!("{{ [_: {key}]: {} }}", render(value, false, path))
        }

        // The degenerate cases render as their semantics: a union of
        // nothing accepts nothing, an intersection of nothing accepts all.
        Reflect::Union { alternatives } if alternatives.is_empty() => "never".into(),
        Reflect::Union { alternatives } => {
            let inner: Vec<String> = alternatives.iter().map(|a| render(a, true, path)).collect();
            parenthesize(inner.join(" | "))
        }

        Reflect::Intersect { intersectees } if intersectees.is_empty() => "unknown".into(),
        Reflect::Intersect { intersectees } => {
            let inner: Vec<String> = intersectees.iter().map(|i| render(i, true, path)).collect();
            parenthesize(inner.join(" & "))
        }

        // A named constraint shows its name; an anonymous one is invisible.
        Reflect::Constraint { underlying, name, .. } => match name {
            Some(name) => name.clone(),
            None => render(underlying, needs_parens, path),
        },

        Reflect::Brand { entity, .. } => render(entity, needs_parens, path),

        Reflect::InstanceOf { type_name } => format!("InstanceOf<{type_name}>"),

        Reflect::Function => "function".into(),

        Reflect::Callback { args, ret } => {
            let inner: Vec<String> = args.iter().map(|a| render(a, false, path)).collect();
            format!("({}) => {}", inner.join(", "), render(ret, true, path))
        }

        Reflect::Deferred(inner) => format!("Promise<{}>", render(inner, false, path)),
    }
}

fn show_fields(
    fields: &indexmap::IndexMap<String, Runtype>,
    optional: bool,
    path: &mut Vec<usize>,
) -> String {
    if fields.is_empty() {
        return "{}".into();
    }
    let marker = if optional { "?" } else { "" };
    let inner: Vec<String> = fields
        .iter()
        .map(|(name, field)| format!("{name}{marker}: {};", render(field, false, path)))
        .collect();
    format!("{{ {} }}", inner.join(" "))
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtype::*;
    use crate::value::LiteralValue;

    #[test]
    fn scalars_and_literals() {
        assert_eq!(show(&number()), "number");
        assert_eq!(show(&literal("on")), "\"on\"");
        assert_eq!(show(&literal(3)), "3");
        assert_eq!(show(&literal(LiteralValue::Null)), "null");
        assert_eq!(show(&void()), "unknown");
    }

    #[test]
    fn composites_read_like_type_expressions() {
        assert_eq!(show(&array(number())), "number[]");
        assert_eq!(show(&array(number().or(string()))), "(number | string)[]");
        assert_eq!(show(&tuple([number(), string()])), "[number, string]");
        assert_eq!(
            show(&record([("a", number()), ("b", string())])),
            "{ a: number; b: string; }"
        );
        assert_eq!(show(&partial([("a", number())])), "{ a?: number; }");
        assert_eq!(
            show(&dictionary(boolean(), KeyKind::Number)),
            "{ [_: number]: boolean }"
        );
        assert_eq!(show(&record(Vec::<(&str, Runtype)>::new())), "{}");
    }

    #[test]
    fn logical_combinators_nest_with_parens() {
        assert_eq!(show(&number().or(string())), "number | string");
        assert_eq!(
            show(&union([number(), string()]).and(unknown())),
            "(number | string) & unknown"
        );
    }

    #[test]
    fn degenerate_logical_combinators_show_their_semantics() {
        assert_eq!(show(&union(Vec::new())), "never");
        assert_eq!(show(&intersect(Vec::new())), "unknown");
    }

    #[test]
    fn refinements_show_their_name_or_vanish() {
        let named = number().with_guard(|_| true, ConstraintOptions::named("Positive"));
        assert_eq!(show(&named), "Positive");
        let anonymous = number().with_guard(|_| true, ConstraintOptions::default());
        assert_eq!(show(&anonymous), "number");
        assert_eq!(show(&string().with_brand("UserId")), "string");
    }

    #[test]
    fn boundary_combinators() {
        assert_eq!(show(&function()), "function");
        assert_eq!(show(&callback([number(), string()], boolean())), "(number, string) => boolean");
        assert_eq!(show(&deferred(number())), "Promise<number>");
    }

    #[test]
    fn recursive_shapes_terminate() {
        static LIST: once_cell::sync::Lazy<Runtype> = once_cell::sync::Lazy::new(|| {
            union([literal(LiteralValue::Null), tuple([number(), lazy(|| LIST.clone())])])
        });
        let rendered = show(&LIST);
        assert!(rendered.starts_with("null | [number, "));
        assert!(rendered.contains("..."));
    }
}
