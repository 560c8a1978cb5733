#![allow(dead_code)]

use bson::{Bson, Document};
use prism_exec::{ProjectionExecutor, ProjectionExecutorBuilder, compile_projection};
use prism_query::{
    Expression, FieldPath, Predicate, ProjectionPolicies, parse_predicate, parse_projection,
};

pub fn policies() -> ProjectionPolicies {
    ProjectionPolicies::default()
}

/// Executor for `spec` with default policies and no query.
pub fn executor(spec: Document) -> ProjectionExecutor {
    compile_projection(&spec, None, policies()).unwrap()
}

pub fn executor_with(spec: Document, policies: ProjectionPolicies) -> ProjectionExecutor {
    compile_projection(&spec, None, policies).unwrap()
}

/// Executor for `spec` whose root replacement is `expr`.
pub fn executor_with_replacement(spec: Document, expr: Expression) -> ProjectionExecutor {
    let projection = parse_projection(&spec, None, policies()).unwrap();
    ProjectionExecutorBuilder::from_projection(&projection)
        .root_replacement(expr)
        .build()
        .unwrap()
}

pub fn predicate(filter: Document) -> Predicate {
    parse_predicate(&filter).unwrap()
}

pub fn path(p: &str) -> FieldPath {
    FieldPath::parse(p).unwrap()
}

/// `$$ROOT` / post-image positional over `field`.
pub fn positional(field: &str, filter: Document) -> Expression {
    Expression::positional(path(field), predicate(filter))
}

/// Slice of the post-image.
pub fn slice(field: &str, skip: Option<i32>, limit: i32) -> Expression {
    Expression::slice(Expression::post_image(), path(field), skip, limit)
}

/// Equality that also checks field order, recursively.
pub fn assert_doc_eq(actual: &Document, expected: &Document) {
    assert_eq!(actual, expected);
    assert_eq!(
        key_order(actual),
        key_order(expected),
        "field order differs: {actual} vs {expected}"
    );
}

fn key_order(doc: &Document) -> Vec<String> {
    let mut out = Vec::new();
    collect_keys(doc, "", &mut out);
    out
}

fn collect_keys(doc: &Document, prefix: &str, out: &mut Vec<String>) {
    for (key, value) in doc {
        let path = format!("{prefix}{key}");
        out.push(path.clone());
        collect_value(value, &path, out);
    }
}

fn collect_value(value: &Bson, path: &str, out: &mut Vec<String>) {
    match value {
        Bson::Document(sub_doc) => collect_keys(sub_doc, &format!("{path}."), out),
        Bson::Array(arr) => {
            for (i, elem) in arr.iter().enumerate() {
                collect_value(elem, &format!("{path}.{i}"), out);
            }
        }
        _ => {}
    }
}
