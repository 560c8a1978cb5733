mod positional;
mod slice;

use std::collections::HashMap;

use bson::{Bson, Document};
use prism_query::{Expression, Variable};

use crate::deps::DepsTracker;
use crate::value::Value;

pub use positional::apply_positional;
pub use slice::{apply_slice, slice_window};

/// User-supplied variable bindings, referenced as `$$name`.
pub type Variables = HashMap<String, Bson>;

/// Everything an expression can read while it is evaluated.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    /// The original input document (`$$ROOT`).
    pub root: &'a Document,
    /// The base walk's output; absent while the walk itself is running.
    pub post_image: Option<&'a Document>,
    pub variables: &'a Variables,
}

impl<'a> EvalContext<'a> {
    pub fn new(root: &'a Document, variables: &'a Variables) -> Self {
        EvalContext {
            root,
            post_image: None,
            variables,
        }
    }

    pub fn with_post_image(self, post_image: &'a Document) -> Self {
        EvalContext {
            post_image: Some(post_image),
            ..self
        }
    }
}

/// Evaluate an expression. Shape mismatches yield `Missing` or pass the
/// input through; evaluation never fails.
pub fn evaluate(expr: &Expression, ctx: EvalContext<'_>) -> Value {
    match expr {
        Expression::Literal(value) => Value::from(value.clone()),
        Expression::FieldPath(field) => read_field(ctx.root, field.segments()),
        Expression::Variable(Variable::Root) => Value::from(ctx.root.clone()),
        Expression::Variable(Variable::PostImage) => {
            ctx.post_image.cloned().map(Value::Document).unwrap_or_default()
        }
        Expression::Variable(Variable::User(name)) => {
            Value::from(ctx.variables.get(name).cloned())
        }
        Expression::Positional(positional) => {
            let root = evaluate(&positional.root, ctx);
            let post_image = evaluate(&positional.post_image, ctx);
            match (root, post_image) {
                (Value::Document(root), Value::Document(post_image)) => Value::Document(
                    apply_positional(&root, post_image, &positional.path, &positional.predicate),
                ),
                (_, post_image) => post_image,
            }
        }
        Expression::Slice(slice) => match evaluate(&slice.source, ctx) {
            Value::Document(mut doc) => {
                apply_slice(&mut doc, &slice.path, slice.skip, slice.limit);
                Value::Document(doc)
            }
            other => other,
        },
    }
}

/// Read a computed field path from `doc`.
///
/// Unlike query matching, numeric segments are plain field names. An array met
/// along the path maps the rest of the path over its document and array
/// elements, so once an array is crossed the result is an array, possibly an
/// empty one.
fn read_field(doc: &Document, segments: &[String]) -> Value {
    let Some((head, rest)) = segments.split_first() else {
        return Value::from(doc.clone());
    };
    match doc.get(head) {
        Some(value) => read_value(value, rest),
        None => Value::Missing,
    }
}

fn read_value(value: &Bson, rest: &[String]) -> Value {
    if rest.is_empty() {
        return Value::from(value.clone());
    }
    match value {
        Bson::Document(sub_doc) => read_field(sub_doc, rest),
        Bson::Array(arr) => Value::Array(
            arr.iter()
                .filter(|elem| matches!(elem, Bson::Document(_) | Bson::Array(_)))
                .filter_map(|elem| read_value(elem, rest).into_bson())
                .collect(),
        ),
        _ => Value::Missing,
    }
}

/// Add the input fields `expr` reads to `deps`.
///
/// Reading `$$ROOT` needs the whole document. The post-image is produced by
/// the walk, whose own dependencies are tracked separately.
pub fn add_dependencies(expr: &Expression, deps: &mut DepsTracker) {
    match expr {
        Expression::Literal(_) => {}
        Expression::FieldPath(field) => deps.add_field(field.as_str()),
        Expression::Variable(Variable::Root) => deps.set_need_whole_document(),
        Expression::Variable(Variable::PostImage | Variable::User(_)) => {}
        Expression::Positional(positional) => {
            add_dependencies(&positional.root, deps);
            add_dependencies(&positional.post_image, deps);
            for field in positional.predicate.field_paths() {
                deps.add_field(field.as_str());
            }
        }
        Expression::Slice(slice) => add_dependencies(&slice.source, deps),
    }
}
