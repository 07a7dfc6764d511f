// src/validate.rs
//! The validation walk: one exhaustive match over the shape algebra.
//!
//! `test` is the pure yes/no core used by composites and `guard`; it never
//! clones the input. `validate` sits on top and produces the success
//! value: the input itself for every combinator except `callback` and
//! `deferred`, which wrap it (documented behavior, not a leak).
//!
//! Failures bubble unchanged except for the key: each composite layer
//! prepends its own index or field name while unwinding, so the final key
//! is the full path to the offending leaf.

use crate::contract::Contract;
use crate::error::{Checked, Failure};
use crate::runtype::{KeyKind, Runtype, Shape, Verdict};
use crate::show::show;
use crate::value::{Deferred, Value};

fn mismatch(expected: impl std::fmt::Display, value: &Value) -> Failure {
    Failure::new(format!("Expected {expected}, but was {}", value.kind_name()))
}

/// Check `value` against `rt` without producing a success value.
pub(crate) fn test(rt: &Runtype, value: &Value) -> Result<(), Failure> {
    match rt.shape() {
        Shape::Unknown => Ok(()),

        Shape::Never => Err(Failure::new(format!(
            "Expected nothing, but was {}",
            value.kind_name()
        ))),

        Shape::Boolean => match value {
            Value::Bool(_) => Ok(()),
            other => Err(mismatch("boolean", other)),
        },
        Shape::Number => match value {
            Value::Number(_) => Ok(()),
            other => Err(mismatch("number", other)),
        },
        Shape::String => match value {
            Value::String(_) => Ok(()),
            other => Err(mismatch("string", other)),
        },
        Shape::Symbol => match value {
            Value::Symbol(_) => Ok(()),
            other => Err(mismatch("symbol", other)),
        },

        Shape::Literal(lit) => {
            if lit.matches(value) {
                Ok(())
            } else {
                Err(Failure::new(format!(
                    "Expected literal {lit}, but was {}",
                    value.brief()
                )))
            }
        }

        Shape::Array { element, .. } => match value {
            Value::Array(xs) => {
                for (i, x) in xs.iter().enumerate() {
                    test(element, x).map_err(|f| f.nest(i.to_string()))?;
                }
                Ok(())
            }
            other => Err(mismatch("array", other)),
        },

        Shape::Tuple(components) => match value {
            Value::Array(xs) => {
                if xs.len() != components.len() {
                    return Err(Failure::new(format!(
                        "Expected an array of length {}, but was length {}",
                        components.len(),
                        xs.len()
                    )));
                }
                for (i, (component, x)) in components.iter().zip(xs).enumerate() {
                    test(component, x).map_err(|f| f.nest(i.to_string()))?;
                }
                Ok(())
            }
            other => Err(mismatch("array", other)),
        },

        Shape::Record { fields, .. } => match value {
            Value::Object(map) => {
                // Open-world: keys beyond the declared fields are ignored.
                for (name, field) in fields {
                    match map.get(name) {
                        Some(x) => test(field, x).map_err(|f| f.nest(name.clone()))?,
                        None => {
                            return Err(Failure::at(
                                format!("Expected {}, but was missing", show(field)),
                                name.clone(),
                            ));
                        }
                    }
                }
                Ok(())
            }
            other => Err(mismatch("object", other)),
        },

        Shape::Partial(fields) => match value {
            Value::Object(map) => {
                for (name, field) in fields {
                    // Present-but-null counts as present and is checked.
                    if let Some(x) = map.get(name) {
                        test(field, x).map_err(|f| f.nest(name.clone()))?;
                    }
                }
                Ok(())
            }
            other => Err(mismatch("object", other)),
        },

        Shape::Dictionary { key, value: value_rt } => match value {
            Value::Object(map) => {
                for (k, x) in map {
                    if *key == KeyKind::Number && !k.parse::<f64>().is_ok_and(f64::is_finite) {
                        return Err(Failure::at(
                            format!("Expected a numeric dictionary key, but was \"{k}\""),
                            k.clone(),
                        ));
                    }
                    test(value_rt, x).map_err(|f| f.nest(k.clone()))?;
                }
                Ok(())
            }
            other => Err(mismatch("object", other)),
        },

        Shape::Union(alternatives) => {
            if alternatives.iter().any(|alt| test(alt, value).is_ok()) {
                Ok(())
            } else {
                // No key: the alternatives failed uniformly at this level.
                Err(mismatch(show(rt), value))
            }
        }

        Shape::Intersect(intersectees) => {
            for part in intersectees {
                test(part, value)?;
            }
            Ok(())
        }

        Shape::Constraint { underlying, predicate, name, .. } => {
            test(underlying, value)?;
            verdict_to_result(predicate(value), name.as_deref())
        }

        Shape::Brand { entity, .. } => test(entity, value),

        Shape::InstanceOf { type_name, type_id } => match value {
            Value::Opaque(o) if o.type_id() == *type_id => Ok(()),
            other => Err(mismatch(format!("an instance of {type_name}"), other)),
        },

        Shape::Function => match value {
            Value::Function(_) => Ok(()),
            other => Err(mismatch("function", other)),
        },

        Shape::Callback { .. } => match value {
            Value::Function(_) => Ok(()),
            other => Err(mismatch("function", other)),
        },

        Shape::Deferred(_) => match value {
            Value::Deferred(_) => Ok(()),
            other => Err(mismatch("deferred", other)),
        },

        Shape::Lazy(lazy) => test(lazy.force(), value),
    }
}

fn verdict_to_result(verdict: Verdict, name: Option<&str>) -> Result<(), Failure> {
    match verdict {
        Verdict::Pass => Ok(()),
        Verdict::Fail => Err(Failure::new(format!(
            "Failed {} check",
            name.unwrap_or("constraint")
        ))),
        Verdict::Reject(message) => Err(Failure::new(message)),
    }
}

/// Full validation, producing the success value.
pub(crate) fn validate(rt: &Runtype, value: &Value) -> Checked<Value> {
    let rt = rt.resolved();
    match rt.shape() {
        // Wrapping combinators forward the (possibly wrapped) value so a
        // constraint or brand over a callback still yields the wrapper.
        Shape::Brand { entity, .. } => validate(entity, value),

        Shape::Constraint { underlying, predicate, name, .. } => {
            // The predicate sees the original input, exactly as in `test`;
            // a callback underneath may still wrap the success value.
            let out = validate(underlying, value)?;
            verdict_to_result(predicate(value), name.as_deref())?;
            Ok(out)
        }

        Shape::Callback { args, ret } => match value {
            Value::Function(f) => {
                let contract = Contract::new(args.clone(), ret.clone());
                Ok(Value::Function(contract.enforce(f.clone())))
            }
            other => Err(mismatch("function", other)),
        },

        Shape::Deferred(inner) => match value {
            Value::Deferred(d) => {
                let inner = inner.clone();
                let d = d.clone();
                Ok(Value::Deferred(Deferred::new(move || {
                    let resolved = d.resolve()?;
                    inner.check(&resolved)
                })))
            }
            other => Err(mismatch("deferred", other)),
        },

        _ => {
            test(&rt, value)?;
            Ok(value.clone())
        }
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use crate::error::Failure;
    use crate::runtype::*;
    use crate::value::{LiteralValue, Value};
    use serde_json::json;

    fn v(j: serde_json::Value) -> Value {
        Value::from(j)
    }

    #[test]
    fn primitives_match_kind_exactly() {
        assert!(number().guard(&v(json!(4.5))));
        assert!(!number().guard(&v(json!("4.5"))));
        assert!(string().guard(&v(json!("x"))));
        assert!(boolean().guard(&v(json!(false))));
        assert!(symbol().guard(&Value::Symbol("s".into())));
        assert!(unknown().guard(&v(json!({"anything": [1, null]}))));
        assert!(!never().guard(&v(json!(null))));

        let err = number().validate(&v(json!("4.5"))).unwrap_err();
        assert_eq!(err.message, "Expected number, but was string");
        assert_eq!(err.key, None);
    }

    #[test]
    fn literal_uses_representational_equality() {
        assert!(literal(42).guard(&v(json!(42))));
        assert!(literal(42).guard(&v(json!(42.0))));
        assert!(!literal(42).guard(&v(json!(43))));
        assert!(literal("on").guard(&v(json!("on"))));
        assert!(literal(LiteralValue::Null).guard(&v(json!(null))));
        // NaN is never equal to itself under the equality check used.
        assert!(!literal(f64::NAN).guard(&Value::Number(f64::NAN)));
    }

    #[test]
    fn array_reports_offending_index() {
        let rt = array(number());
        assert!(rt.guard(&v(json!([1, 2, 3]))));
        assert!(rt.guard(&v(json!([]))));
        let err = rt.validate(&v(json!([1, "x", 3]))).unwrap_err();
        assert_eq!(err.key.as_deref(), Some("1"));
        assert_eq!(err.message, "Expected number, but was string");
    }

    #[test]
    fn tuple_requires_exact_arity() {
        let rt = tuple([number(), string()]);
        assert!(rt.guard(&v(json!([1, "a"]))));
        let err = rt.validate(&v(json!([1, "a", true]))).unwrap_err();
        assert_eq!(err.message, "Expected an array of length 2, but was length 3");
        let err = rt.validate(&v(json!([1, 2]))).unwrap_err();
        assert_eq!(err.key.as_deref(), Some("1"));
    }

    #[test]
    fn record_paths_compose_depth_first() {
        let rt = record([("a", record([("b", number())]))]);
        let err = rt.validate(&v(json!({"a": {"b": "x"}}))).unwrap_err();
        assert_eq!(err.key.as_deref(), Some("a.b"));
        assert_eq!(err.message, "Expected number, but was string");
    }

    #[test]
    fn record_is_open_world_about_extra_keys() {
        // Deliberate permissiveness: unknown keys never reject.
        let rt = record([("name", string())]);
        assert!(rt.guard(&v(json!({"name": "a", "extra": [1, 2], "more": null}))));
    }

    #[test]
    fn record_missing_field_names_the_expected_type() {
        let rt = record([("count", number())]);
        let err = rt.validate(&v(json!({}))).unwrap_err();
        assert_eq!(err.key.as_deref(), Some("count"));
        assert_eq!(err.message, "Expected number, but was missing");
    }

    #[test]
    fn partial_skips_absent_but_checks_present_null() {
        let rt = partial([("a", number())]);
        assert!(rt.guard(&v(json!({}))));
        assert!(rt.guard(&v(json!({"a": 3, "other": true}))));
        // Present null is checked, not skipped.
        let err = rt.validate(&v(json!({"a": null}))).unwrap_err();
        assert_eq!(err.key.as_deref(), Some("a"));
    }

    #[test]
    fn dictionary_checks_values_and_numeric_keys() {
        let rt = dictionary(boolean(), KeyKind::String);
        assert!(rt.guard(&v(json!({"a": true, "b": false}))));
        let err = rt.validate(&v(json!({"a": true, "b": 0}))).unwrap_err();
        assert_eq!(err.key.as_deref(), Some("b"));

        let by_num = dictionary(string(), KeyKind::Number);
        assert!(by_num.guard(&v(json!({"0": "a", "1.5": "b", "-2": "c"}))));
        let err = by_num.validate(&v(json!({"zero": "a"}))).unwrap_err();
        assert_eq!(err.key.as_deref(), Some("zero"));
        assert!(err.message.contains("numeric dictionary key"));
    }

    #[test]
    fn union_takes_first_success_and_fails_without_key() {
        let rt = union([number(), string()]);
        assert!(rt.guard(&v(json!(1))));
        assert!(rt.guard(&v(json!("a"))));
        let err = rt.validate(&v(json!(true))).unwrap_err();
        assert_eq!(err.key, None);
        assert_eq!(err.message, "Expected number | string, but was boolean");
    }

    #[test]
    fn empty_union_rejects_everything_as_never() {
        let rt = union(Vec::new());
        for value in [v(json!(null)), v(json!(1)), v(json!({}))] {
            assert!(!rt.guard(&value));
        }
        let err = rt.validate(&v(json!(null))).unwrap_err();
        assert_eq!(err.message, "Expected never, but was null");
    }

    #[test]
    fn union_totality_against_alternatives() {
        let alts = [literal(1), string(), boolean()];
        let rt = union(alts.clone());
        for value in [v(json!(1)), v(json!(2)), v(json!("x")), v(json!(true)), v(json!(null))] {
            let any_ok = alts.iter().any(|a| a.guard(&value));
            assert_eq!(rt.guard(&value), any_ok, "union totality for {value:?}");
        }
    }

    #[test]
    fn intersect_requires_all_and_returns_input() {
        let rt = record([("a", number())]).and(record([("b", string())]));
        let input = v(json!({"a": 1, "b": "x", "c": null}));
        let out = rt.validate(&input).unwrap();
        assert_eq!(out, input);

        // First failing intersectee propagates unchanged.
        let err = rt.validate(&v(json!({"b": "x"}))).unwrap_err();
        assert_eq!(err.key.as_deref(), Some("a"));
    }

    #[test]
    fn constraint_runs_only_after_underlying_passes() {
        let positive = number().with_constraint(
            |x| match x {
                Value::Number(n) => Verdict::from(*n > 0.0),
                _ => Verdict::Fail,
            },
            ConstraintOptions::named("positive"),
        );
        assert!(positive.guard(&v(json!(3))));
        let err = positive.validate(&v(json!(-3))).unwrap_err();
        assert_eq!(err.message, "Failed positive check");
        // Underlying failure wins; the predicate never sees a string.
        let err = positive.validate(&v(json!("3"))).unwrap_err();
        assert_eq!(err.message, "Expected number, but was string");
    }

    #[test]
    fn constraint_custom_message_passes_through() {
        let rt = string().with_constraint(
            |x| match x {
                Value::String(s) if s.len() <= 3 => Verdict::Pass,
                _ => Verdict::Reject("string too long".into()),
            },
            ConstraintOptions::default(),
        );
        assert!(rt.guard(&v(json!("abc"))));
        let err = rt.validate(&v(json!("abcdef"))).unwrap_err();
        assert_eq!(err.message, "string too long");
    }

    #[test]
    fn guard_of_refines_unknown() {
        let even = guard_of(
            |x| matches!(x, Value::Number(n) if n % 2.0 == 0.0),
            ConstraintOptions::named("even"),
        );
        assert!(even.guard(&v(json!(4))));
        assert!(!even.guard(&v(json!(5))));
        assert!(!even.guard(&v(json!("4"))));
    }

    #[test]
    fn brand_is_transparent_at_runtime() {
        let plain = record([("id", string())]);
        let branded = plain.clone().with_brand("UserId");
        for value in [v(json!({"id": "u1"})), v(json!({"id": 3})), v(json!(null))] {
            assert_eq!(branded.guard(&value), plain.guard(&value));
        }
    }

    #[test]
    fn constraint_predicate_sees_the_original_value() {
        use crate::value::NativeFn;
        use std::sync::Arc;

        let f: NativeFn = Arc::new(|_| Ok(Value::Null));
        let input = Value::Function(f.clone());
        let expected = input.clone();
        // Identity-sensitive predicate over a wrapping combinator: it must
        // run against the input, not the enforced wrapper.
        let rt = callback(Vec::new(), unknown())
            .with_guard(move |x| *x == expected, ConstraintOptions::default());

        assert_eq!(rt.guard(&input), rt.validate(&input).is_ok());
        match rt.validate(&input).unwrap() {
            // The success value is still the wrapper, not the raw function.
            Value::Function(wrapped) => assert!(!Arc::ptr_eq(&wrapped, &f)),
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn guard_check_and_validate_agree() {
        let rt = union([number(), array(string())]);
        for value in [v(json!(1)), v(json!(["a"])), v(json!([1])), v(json!(null))] {
            let validated = rt.validate(&value);
            assert_eq!(rt.guard(&value), validated.is_ok());
            assert_eq!(rt.check(&value).is_ok(), validated.is_ok());
        }
    }

    #[test]
    fn check_is_idempotent_on_success() {
        let rt = record([("xs", array(number()))]);
        let input = v(json!({"xs": [1, 2, 3]}));
        let once = rt.check(&input).unwrap();
        assert_eq!(once, input);
        let twice = rt.check(&once).unwrap();
        assert_eq!(twice, input);
    }

    // A cons-style list: null, or [head, tail].
    fn number_list() -> Runtype {
        lazy(|| union([literal(LiteralValue::Null), tuple([number(), number_list()])]))
    }

    #[test]
    fn lazy_recursion_terminates_with_input_depth() {
        let rt = number_list();
        assert!(rt.guard(&v(json!(null))));
        assert!(rt.guard(&v(json!([1, null]))));
        assert!(rt.guard(&v(json!([1, [2, [3, null]]]))));
        assert!(!rt.guard(&v(json!([1]))));
        assert!(!rt.guard(&v(json!([1, [2, "x"]]))));
    }

    #[test]
    fn lazy_construction_does_not_force() {
        // Constructing a self-referential runtype must not run the thunk.
        let rt = number_list();
        drop(rt);
    }

    #[test]
    fn instance_of_checks_the_concrete_type() {
        struct Conn(#[allow(dead_code)] u16);
        struct Other;
        let rt = instance_of::<Conn>();
        assert!(rt.guard(&Value::Opaque(crate::value::Opaque::new(Conn(80)))));
        assert!(!rt.guard(&Value::Opaque(crate::value::Opaque::new(Other))));
        assert!(!rt.guard(&v(json!({}))));
    }

    #[test]
    fn deferred_lifts_validation_across_the_boundary() {
        use crate::value::Deferred;
        let rt = deferred(number());

        let good = Value::Deferred(Deferred::ready(v(json!(5))));
        let out = rt.validate(&good).unwrap();
        match out {
            Value::Deferred(d) => assert_eq!(d.resolve().unwrap(), v(json!(5))),
            other => panic!("expected deferred, got {other:?}"),
        }

        let bad = Value::Deferred(Deferred::ready(v(json!("five"))));
        match rt.validate(&bad).unwrap() {
            Value::Deferred(d) => {
                let err = d.resolve().unwrap_err();
                assert_eq!(err.message, "Expected number, but was string");
            }
            other => panic!("expected deferred, got {other:?}"),
        }

        assert!(rt.validate(&v(json!(5))).is_err());
    }

    #[test]
    fn failure_nest_matches_engine_paths() {
        let deep = record([("outer", array(record([("inner", boolean())])))]);
        let err = deep
            .validate(&v(json!({"outer": [{"inner": true}, {"inner": 1}]})))
            .unwrap_err();
        assert_eq!(
            err,
            Failure::at("Expected boolean, but was number", "outer.1.inner")
        );
    }
}
