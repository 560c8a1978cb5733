use bson::{Bson, Document};
use indexmap::IndexMap;
use prism_query::{Expression, ProjectionFields, ProjectionNode, ProjectionType};

use crate::error::ProjectionError;
use crate::expression::{EvalContext, evaluate};

/// A compiled projection level, walked once per input document.
///
/// Operator nodes from the AST are lowered here: positional and slice fields
/// become plain inclusions in inclusion mode (the root replacement rewrites
/// them afterwards) and disappear in exclusion mode.
#[derive(Debug, Clone, Default)]
pub(crate) struct WalkTree {
    fields: IndexMap<String, WalkNode>,
    /// Whether any computed node lives in this level or below.
    computed: bool,
}

#[derive(Debug, Clone)]
pub(crate) enum WalkNode {
    Include,
    Exclude,
    Computed(Expression),
    Branch(WalkTree),
}

impl WalkTree {
    pub(crate) fn compile(
        fields: &ProjectionFields,
        projection_type: ProjectionType,
    ) -> Result<WalkTree, ProjectionError> {
        compile_level(fields, projection_type, "")
    }

    pub(crate) fn get(&self, key: &str) -> Option<&WalkNode> {
        self.fields.get(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.fields.len()
    }

    /// Call `f` with the full dotted path of every leaf node.
    pub(crate) fn visit<F>(&self, f: &mut F)
    where
        F: FnMut(&str, &WalkNode),
    {
        self.visit_inner("", f);
    }

    fn visit_inner<F>(&self, prefix: &str, f: &mut F)
    where
        F: FnMut(&str, &WalkNode),
    {
        for (name, node) in &self.fields {
            let path = join(prefix, name);
            match node {
                WalkNode::Branch(children) => children.visit_inner(&path, f),
                leaf => f(&path, leaf),
            }
        }
    }

    /// Write computed fields of this level into `out`.
    ///
    /// A present result replaces the field in place or is appended; `Missing`
    /// removes it. Nested computed fields whose parent is absent or a scalar in
    /// `out` get a fresh sub-document holding only the computed values.
    pub(crate) fn apply_computed(&self, out: &mut Document, ctx: EvalContext<'_>) {
        if !self.computed {
            return;
        }
        for (key, node) in &self.fields {
            match node {
                WalkNode::Computed(expr) => match evaluate(expr, ctx).into_bson() {
                    Some(value) => {
                        out.insert(key.clone(), value);
                    }
                    None => {
                        out.remove(key);
                    }
                },
                WalkNode::Branch(children) if children.computed => {
                    // Documents and arrays were already handled by the walk.
                    if !matches!(out.get(key), Some(Bson::Document(_) | Bson::Array(_))) {
                        let mut sub_doc = Document::new();
                        children.apply_computed(&mut sub_doc, ctx);
                        if !sub_doc.is_empty() {
                            out.insert(key.clone(), Bson::Document(sub_doc));
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

fn compile_level(
    fields: &ProjectionFields,
    projection_type: ProjectionType,
    prefix: &str,
) -> Result<WalkTree, ProjectionError> {
    let mut tree = WalkTree::default();
    for (name, node) in fields {
        let path = join(prefix, name);
        let is_top_level_id = path == "_id";
        let compiled = match (node, projection_type) {
            (ProjectionNode::Include, ProjectionType::Inclusion) => WalkNode::Include,
            (ProjectionNode::Exclude, ProjectionType::Exclusion) => WalkNode::Exclude,
            (ProjectionNode::Include, ProjectionType::Exclusion) if is_top_level_id => {
                WalkNode::Include
            }
            (ProjectionNode::Exclude, ProjectionType::Inclusion) if is_top_level_id => {
                WalkNode::Exclude
            }
            (ProjectionNode::Include | ProjectionNode::Exclude, _) => {
                return Err(ProjectionError::InvalidProjection(format!(
                    "field {path} conflicts with {projection_type:?} mode"
                )));
            }
            (ProjectionNode::Expression(expr), _) => {
                tree.computed = true;
                WalkNode::Computed(expr.clone())
            }
            (ProjectionNode::Positional, ProjectionType::Inclusion) => WalkNode::Include,
            (ProjectionNode::Positional, ProjectionType::Exclusion) => {
                return Err(ProjectionError::InvalidProjection(format!(
                    "positional projection on {path} requires inclusion mode"
                )));
            }
            (ProjectionNode::Slice { .. }, ProjectionType::Inclusion) => WalkNode::Include,
            (ProjectionNode::Slice { .. }, ProjectionType::Exclusion) => continue,
            (ProjectionNode::Fields(children), _) => {
                let children = compile_level(children, projection_type, &path)?;
                if children.fields.is_empty() {
                    continue;
                }
                tree.computed |= children.computed;
                WalkNode::Branch(children)
            }
        };
        tree.fields.insert(name.clone(), compiled);
    }
    Ok(tree)
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use prism_query::{ProjectionPolicies, parse_projection};

    use super::*;

    fn compile(spec: Document) -> Result<WalkTree, ProjectionError> {
        let projection = parse_projection(&spec, None, ProjectionPolicies::default()).unwrap();
        WalkTree::compile(projection.fields(), projection.projection_type())
    }

    fn leaves(tree: &WalkTree) -> Vec<String> {
        let mut out = Vec::new();
        tree.visit(&mut |path, _| out.push(path.to_string()));
        out
    }

    #[test]
    fn nested_leaves() {
        let tree = compile(doc! { "a.b": 1, "a.c": 1, "d": 1 }).unwrap();
        assert_eq!(leaves(&tree), vec!["a.b", "a.c", "d"]);
        assert!(matches!(tree.get("a"), Some(WalkNode::Branch(_))));
    }

    #[test]
    fn slices_lower_by_mode() {
        let inclusion = compile(doc! { "a": 1, "b": { "$slice": 1 } }).unwrap();
        assert!(matches!(inclusion.get("b"), Some(WalkNode::Include)));

        let exclusion = compile(doc! { "a": 0, "b": { "$slice": 1 }, "c": { "d": { "$slice": 1 } } })
            .unwrap();
        assert_eq!(leaves(&exclusion), vec!["a"]);
    }

    #[test]
    fn mode_conflicts_are_rejected() {
        let mut fields = ProjectionFields::new();
        fields.insert("a".into(), ProjectionNode::Include);
        assert!(WalkTree::compile(&fields, ProjectionType::Exclusion).is_err());
        assert!(WalkTree::compile(&fields, ProjectionType::Inclusion).is_ok());

        let mut fields = ProjectionFields::new();
        fields.insert("_id".into(), ProjectionNode::Exclude);
        fields.insert("a".into(), ProjectionNode::Positional);
        assert!(WalkTree::compile(&fields, ProjectionType::Inclusion).is_ok());
        assert!(WalkTree::compile(&fields, ProjectionType::Exclusion).is_err());
    }

    #[test]
    fn computed_flag_propagates() {
        let tree = compile(doc! { "a": { "b": "$x" } }).unwrap();
        assert!(tree.computed);
        let tree = compile(doc! { "a": { "b": 1 } }).unwrap();
        assert!(!tree.computed);
    }
}
