use indexmap::IndexMap;

use crate::expression::Expression;
use crate::path::FieldPath;
use crate::policies::ProjectionPolicies;
use crate::predicate::Predicate;

/// Whether a projection whitelists or blacklists fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionType {
    Inclusion,
    Exclusion,
}

/// Children of a projection level, in specification order.
pub type ProjectionFields = IndexMap<String, ProjectionNode>;

/// One node of a parsed projection.
#[derive(Debug, Clone)]
pub enum ProjectionNode {
    Include,
    Exclude,
    /// Computed field.
    Expression(Expression),
    /// `"path.$": 1`; the predicate is the projection's query.
    Positional,
    /// `{ "$slice": limit }` or `{ "$slice": [skip, limit] }`.
    Slice { skip: Option<i32>, limit: i32 },
    /// Nested projection on a sub-document.
    Fields(ProjectionFields),
}

/// A parsed projection specification.
#[derive(Debug, Clone)]
pub struct Projection {
    projection_type: ProjectionType,
    fields: ProjectionFields,
    policies: ProjectionPolicies,
    query: Option<Predicate>,
}

/// A `$slice` found somewhere in the tree, with its full path.
#[derive(Debug, Clone, PartialEq)]
pub struct SliceSpec {
    pub path: FieldPath,
    pub skip: Option<i32>,
    pub limit: i32,
}

impl Projection {
    pub fn new(
        projection_type: ProjectionType,
        fields: ProjectionFields,
        policies: ProjectionPolicies,
    ) -> Self {
        Projection {
            projection_type,
            fields,
            policies,
            query: None,
        }
    }

    /// Attach the query whose predicate drives a positional projection.
    pub fn with_query(mut self, query: Predicate) -> Self {
        self.query = Some(query);
        self
    }

    pub fn projection_type(&self) -> ProjectionType {
        self.projection_type
    }

    pub fn fields(&self) -> &ProjectionFields {
        &self.fields
    }

    pub fn policies(&self) -> ProjectionPolicies {
        self.policies
    }

    pub fn query(&self) -> Option<&Predicate> {
        self.query.as_ref()
    }

    /// Path of the positional node, if the projection has one.
    pub fn positional_path(&self) -> Option<FieldPath> {
        let mut found = None;
        visit(&self.fields, &mut Vec::new(), &mut |path, node| {
            if found.is_none() && matches!(node, ProjectionNode::Positional) {
                found = FieldPath::from_segments(path).ok();
            }
        });
        found
    }

    /// Every `$slice` node, in specification order.
    pub fn slices(&self) -> Vec<SliceSpec> {
        let mut out = Vec::new();
        visit(&self.fields, &mut Vec::new(), &mut |path, node| {
            if let ProjectionNode::Slice { skip, limit } = node
                && let Ok(path) = FieldPath::from_segments(path)
            {
                out.push(SliceSpec {
                    path,
                    skip: *skip,
                    limit: *limit,
                });
            }
        });
        out
    }
}

fn visit<'a, F>(fields: &'a ProjectionFields, prefix: &mut Vec<&'a str>, f: &mut F)
where
    F: FnMut(&[&'a str], &'a ProjectionNode),
{
    for (name, node) in fields {
        prefix.push(name);
        match node {
            ProjectionNode::Fields(children) => visit(children, prefix, f),
            leaf => f(prefix, leaf),
        }
        prefix.pop();
    }
}
