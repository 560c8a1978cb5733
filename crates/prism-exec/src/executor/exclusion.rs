use bson::{Bson, Document};
use prism_query::ArrayRecursionPolicy;

use super::tree::{WalkNode, WalkTree};
use crate::expression::EvalContext;

/// Copy `src` without the fields `tree` excludes. Everything else passes
/// through untouched, in input order.
pub(crate) fn apply(
    src: &Document,
    tree: &WalkTree,
    exclude_id: bool,
    policy: ArrayRecursionPolicy,
    ctx: EvalContext<'_>,
) -> Document {
    let mut dest = Document::new();

    for (key, value) in src {
        match tree.get(key) {
            Some(WalkNode::Exclude) => {}
            Some(WalkNode::Branch(children)) => {
                dest.insert(key.clone(), project_value(value, children, policy, ctx));
            }
            // Computed values are written in place by `apply_computed`.
            Some(WalkNode::Include | WalkNode::Computed(_)) => {
                dest.insert(key.clone(), value.clone());
            }
            None if exclude_id && key == "_id" => {}
            None => {
                dest.insert(key.clone(), value.clone());
            }
        }
    }

    tree.apply_computed(&mut dest, ctx);
    dest
}

fn project_value(
    value: &Bson,
    tree: &WalkTree,
    policy: ArrayRecursionPolicy,
    ctx: EvalContext<'_>,
) -> Bson {
    match value {
        Bson::Document(sub_doc) => Bson::Document(apply(sub_doc, tree, false, policy, ctx)),
        Bson::Array(arr) => Bson::Array(
            arr.iter()
                .map(|elem| match elem {
                    Bson::Array(_) if policy == ArrayRecursionPolicy::TreatAsLeaf => elem.clone(),
                    _ => project_value(elem, tree, policy, ctx),
                })
                .collect(),
        ),
        other => other.clone(),
    }
}
