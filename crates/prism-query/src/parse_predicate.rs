use bson::{Bson, Document};
use regex::{Regex, RegexBuilder};

use crate::path::FieldPath;
use crate::predicate::Predicate;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("predicate parse error: {0}")]
pub struct PredicateParseError(pub String);

/// Parse a query filter document into an owned predicate tree.
///
/// Multiple top-level fields are implicitly ANDed. Field conditions are either
/// an implicit `$eq` value or an operator sub-document such as
/// `{ "$gt": 21, "$lte": 100 }`.
pub fn parse_predicate(doc: &Document) -> Result<Predicate, PredicateParseError> {
    let mut children = Vec::new();

    for (key, value) in doc {
        match key.as_str() {
            "$and" => children.push(parse_logical_array(value, Predicate::And)?),
            "$or" => children.push(parse_logical_array(value, Predicate::Or)?),
            k if k.starts_with('$') => {
                return Err(PredicateParseError(format!(
                    "unknown top-level operator: {k}"
                )));
            }
            _ => children.push(parse_field_condition(key, value)?),
        }
    }

    match children.len() {
        0 => Err(PredicateParseError("empty filter document".into())),
        1 => Ok(children.remove(0)),
        _ => Ok(Predicate::And(children)),
    }
}

fn field_path(field: &str) -> Result<FieldPath, PredicateParseError> {
    FieldPath::parse(field).map_err(|e| PredicateParseError(e.to_string()))
}

/// Parse a `$and` or `$or` array value into a logical predicate.
fn parse_logical_array(
    value: &Bson,
    make: fn(Vec<Predicate>) -> Predicate,
) -> Result<Predicate, PredicateParseError> {
    let Bson::Array(arr) = value else {
        return Err(PredicateParseError("$and/$or value must be an array".into()));
    };

    let mut children = Vec::with_capacity(arr.len());
    for elem in arr {
        match elem {
            Bson::Document(sub_doc) => children.push(parse_predicate(sub_doc)?),
            _ => {
                return Err(PredicateParseError(
                    "$and/$or array elements must be documents".into(),
                ));
            }
        }
    }

    if children.is_empty() {
        return Err(PredicateParseError("$and/$or array must not be empty".into()));
    }

    Ok(make(children))
}

fn parse_field_condition(field: &str, value: &Bson) -> Result<Predicate, PredicateParseError> {
    let path = field_path(field)?;

    // An operator document is recognised by its first key.
    if let Bson::Document(sub_doc) = value
        && sub_doc.keys().next().is_some_and(|k| k.starts_with('$'))
    {
        return parse_operator_doc(path, sub_doc);
    }

    Ok(Predicate::Eq(path, value.clone()))
}

fn parse_operator_doc(path: FieldPath, doc: &Document) -> Result<Predicate, PredicateParseError> {
    if doc.contains_key("$regex") {
        return parse_regex(path, doc);
    }

    let mut conditions = Vec::with_capacity(doc.len());
    for (key, value) in doc {
        let predicate = match key.as_str() {
            "$eq" => Predicate::Eq(path.clone(), value.clone()),
            "$ne" => Predicate::Ne(path.clone(), value.clone()),
            "$gt" => Predicate::Gt(path.clone(), value.clone()),
            "$gte" => Predicate::Gte(path.clone(), value.clone()),
            "$lt" => Predicate::Lt(path.clone(), value.clone()),
            "$lte" => Predicate::Lte(path.clone(), value.clone()),
            "$in" => match value {
                Bson::Array(values) => Predicate::In(path.clone(), values.clone()),
                _ => return Err(PredicateParseError("$in value must be an array".into())),
            },
            "$exists" => match value {
                Bson::Boolean(b) => Predicate::Exists(path.clone(), *b),
                _ => {
                    return Err(PredicateParseError(
                        "$exists value must be a boolean".into(),
                    ));
                }
            },
            "$options" => {
                return Err(PredicateParseError("$options without $regex".into()));
            }
            k => {
                return Err(PredicateParseError(format!("unknown field operator: {k}")));
            }
        };
        conditions.push(predicate);
    }

    match conditions.len() {
        0 => Err(PredicateParseError("empty operator document".into())),
        1 => Ok(conditions.remove(0)),
        _ => Ok(Predicate::And(conditions)),
    }
}

/// Parse a `$regex` with an optional `$options` sibling.
fn parse_regex(path: FieldPath, doc: &Document) -> Result<Predicate, PredicateParseError> {
    let mut pattern = None;
    let mut options = String::new();

    for (key, value) in doc {
        match (key.as_str(), value) {
            ("$regex", Bson::String(s)) => pattern = Some(s.clone()),
            ("$regex", _) => {
                return Err(PredicateParseError("$regex value must be a string".into()));
            }
            ("$options", Bson::String(s)) => options = s.clone(),
            ("$options", _) => {
                return Err(PredicateParseError(
                    "$options value must be a string".into(),
                ));
            }
            (k, _) => {
                return Err(PredicateParseError(format!(
                    "unexpected operator alongside $regex: {k}"
                )));
            }
        }
    }

    let pattern = pattern.ok_or_else(|| PredicateParseError("missing $regex".into()))?;
    Ok(Predicate::Regex(path, compile_regex(&pattern, &options)?))
}

fn compile_regex(pattern: &str, options: &str) -> Result<Regex, PredicateParseError> {
    let mut builder = RegexBuilder::new(pattern);
    for flag in options.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            other => {
                return Err(PredicateParseError(format!("unsupported regex option: {other}")));
            }
        };
    }
    builder
        .build()
        .map_err(|e| PredicateParseError(format!("invalid regex: {e}")))
}
