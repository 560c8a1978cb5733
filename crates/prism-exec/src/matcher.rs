use std::cmp::Ordering;

use bson::{Bson, Document};
use prism_query::Predicate;

use crate::path;

/// Evaluate whether a document matches the given predicate.
///
/// Paths resolve through arrays: a comparison matches when any resolved value,
/// or any element of a resolved array, satisfies it.
pub fn matches(doc: &Document, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::And(children) => children.iter().all(|child| matches(doc, child)),
        Predicate::Or(children) => children.iter().any(|child| matches(doc, child)),
        Predicate::Eq(field, val) => eq_matches(doc, field.segments(), val),
        Predicate::Ne(field, val) => !eq_matches(doc, field.segments(), val),
        Predicate::In(field, vals) => vals.iter().any(|val| eq_matches(doc, field.segments(), val)),
        Predicate::Gt(field, val)
        | Predicate::Gte(field, val)
        | Predicate::Lt(field, val)
        | Predicate::Lte(field, val) => {
            let accept: fn(Ordering) -> bool = match predicate {
                Predicate::Gt(..) => |o| o == Ordering::Greater,
                Predicate::Gte(..) => |o| o != Ordering::Less,
                Predicate::Lt(..) => |o| o == Ordering::Less,
                _ => |o| o != Ordering::Greater,
            };
            any_candidate(doc, field.segments(), |candidate| {
                value_cmp(candidate, val).is_some_and(accept)
            })
        }
        Predicate::Regex(field, re) => any_candidate(doc, field.segments(), |candidate| {
            matches!(candidate, Bson::String(s) if re.is_match(s))
        }),
        // $exists checks physical presence; an explicit null counts as present
        Predicate::Exists(field, expected) => {
            !path::resolve(doc, field.segments()).is_empty() == *expected
        }
    }
}

/// `$eq`: null matches both missing fields and explicit nulls; an array field
/// matches when the whole array or any element is equal.
fn eq_matches(doc: &Document, field: &[String], val: &Bson) -> bool {
    let found = path::resolve(doc, field);
    if matches!(val, Bson::Null) && found.is_empty() {
        return true;
    }
    found.into_iter().any(|candidate| {
        value_eq(candidate, val)
            || matches!(candidate, Bson::Array(arr) if arr.iter().any(|elem| value_eq(elem, val)))
    })
}

fn any_candidate<F>(doc: &Document, field: &[String], mut test: F) -> bool
where
    F: FnMut(&Bson) -> bool,
{
    for candidate in path::resolve(doc, field) {
        match candidate {
            Bson::Array(arr) => {
                if arr.iter().any(&mut test) {
                    return true;
                }
            }
            other => {
                if test(other) {
                    return true;
                }
            }
        }
    }
    false
}

/// Equality with numeric coercion across Int32, Int64 and Double.
fn value_eq(stored: &Bson, query: &Bson) -> bool {
    match (as_number(stored), as_number(query)) {
        (Some(a), Some(b)) => a.eq(&b),
        _ => stored == query,
    }
}

/// Ordering between comparable values; `None` for incompatible types, which
/// never match a range operator.
fn value_cmp(stored: &Bson, query: &Bson) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (as_number(stored), as_number(query)) {
        return a.cmp(&b);
    }
    match (stored, query) {
        (Bson::String(a), Bson::String(b)) => Some(a.cmp(b)),
        (Bson::Boolean(a), Bson::Boolean(b)) => Some(a.cmp(b)),
        (Bson::DateTime(a), Bson::DateTime(b)) => {
            Some(a.timestamp_millis().cmp(&b.timestamp_millis()))
        }
        _ => None,
    }
}

#[derive(Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn cmp(&self, other: &Number) -> Option<Ordering> {
        match (*self, *other) {
            (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
            (Number::Int(a), Number::Float(b)) => (a as f64).partial_cmp(&b),
            (Number::Float(a), Number::Int(b)) => a.partial_cmp(&(b as f64)),
            (Number::Float(a), Number::Float(b)) => a.partial_cmp(&b),
        }
    }

    fn eq(&self, other: &Number) -> bool {
        self.cmp(other) == Some(Ordering::Equal)
    }
}

fn as_number(value: &Bson) -> Option<Number> {
    match value {
        Bson::Int32(i) => Some(Number::Int(i64::from(*i))),
        Bson::Int64(i) => Some(Number::Int(*i)),
        Bson::Double(f) => Some(Number::Float(*f)),
        _ => None,
    }
}
