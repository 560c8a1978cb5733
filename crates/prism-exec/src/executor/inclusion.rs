use bson::{Bson, Document};
use prism_query::ArrayRecursionPolicy;

use super::tree::{WalkNode, WalkTree};
use crate::expression::EvalContext;

/// Build a document holding only the fields named by `tree`, in input order,
/// followed by any computed fields.
pub(crate) fn apply(
    src: &Document,
    tree: &WalkTree,
    include_id: bool,
    policy: ArrayRecursionPolicy,
    ctx: EvalContext<'_>,
) -> Document {
    let mut dest = Document::new();

    for (key, value) in src {
        match tree.get(key) {
            Some(WalkNode::Include) => {
                dest.insert(key.clone(), value.clone());
            }
            Some(WalkNode::Branch(children)) => {
                if let Some(projected) = project_value(value, children, policy, ctx) {
                    dest.insert(key.clone(), projected);
                }
            }
            // Computed fields are appended below; explicit `_id: 0` lands here.
            Some(WalkNode::Computed(_) | WalkNode::Exclude) => {}
            None if include_id && key == "_id" => {
                dest.insert(key.clone(), value.clone());
            }
            None => {}
        }
    }

    tree.apply_computed(&mut dest, ctx);
    dest
}

/// Apply a nested inclusion level to a field value.
///
/// Scalars have no sub-fields to include, so they yield nothing, both as a
/// field value and as an array element.
fn project_value(
    value: &Bson,
    tree: &WalkTree,
    policy: ArrayRecursionPolicy,
    ctx: EvalContext<'_>,
) -> Option<Bson> {
    match value {
        Bson::Document(sub_doc) => Some(Bson::Document(apply(sub_doc, tree, false, policy, ctx))),
        Bson::Array(arr) => {
            let mut out = Vec::with_capacity(arr.len());
            for elem in arr {
                match elem {
                    Bson::Array(_) if policy == ArrayRecursionPolicy::TreatAsLeaf => {}
                    _ => {
                        if let Some(projected) = project_value(elem, tree, policy, ctx) {
                            out.push(projected);
                        }
                    }
                }
            }
            Some(Bson::Array(out))
        }
        _ => None,
    }
}
