mod exclusion;
mod inclusion;
mod tree;

use std::collections::BTreeSet;

use bson::Document;
use prism_query::{
    DefaultIdPolicy, Expression, Predicate, Projection, ProjectionFields, ProjectionPolicies,
    ProjectionType, parse_projection,
};

use crate::deps::DepsTracker;
use crate::error::ProjectionError;
use crate::expression::{self, EvalContext, Variables};
use crate::modified_paths::ModifiedPaths;
use crate::value::Value;
use tree::{WalkNode, WalkTree};

/// Turns input documents into projected output documents.
///
/// Built once per query through [`ProjectionExecutorBuilder`] and immutable
/// afterwards, so a single instance can be shared across threads and reused
/// for every document of a batch.
#[derive(Debug, Clone)]
pub struct ProjectionExecutor {
    projection_type: ProjectionType,
    policies: ProjectionPolicies,
    tree: WalkTree,
    root_replacement: Option<Expression>,
    variables: Variables,
}

#[derive(Debug, Clone)]
pub struct ProjectionExecutorBuilder {
    projection_type: ProjectionType,
    policies: ProjectionPolicies,
    fields: ProjectionFields,
    root_replacement: Option<Expression>,
    variables: Variables,
}

impl ProjectionExecutorBuilder {
    pub fn new(projection_type: ProjectionType, policies: ProjectionPolicies) -> Self {
        ProjectionExecutorBuilder {
            projection_type,
            policies,
            fields: ProjectionFields::new(),
            root_replacement: None,
            variables: Variables::new(),
        }
    }

    /// Start from a parsed projection's mode, policies and fields.
    ///
    /// Operator nodes only shape the base walk here; use
    /// [`build_projection_executor`] to also derive their root replacement.
    pub fn from_projection(projection: &Projection) -> Self {
        ProjectionExecutorBuilder::new(projection.projection_type(), projection.policies())
            .fields(projection.fields().clone())
    }

    pub fn fields(mut self, fields: ProjectionFields) -> Self {
        self.fields = fields;
        self
    }

    /// Expression evaluated after the base walk whose result becomes the
    /// output. Replaces any previously set expression.
    pub fn root_replacement(mut self, expr: Expression) -> Self {
        self.root_replacement = Some(expr);
        self
    }

    pub fn variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    pub fn build(self) -> Result<ProjectionExecutor, ProjectionError> {
        if let Some(expr) = &self.root_replacement
            && !expr.produces_document()
        {
            return Err(ProjectionError::InvalidRootReplacement(format!("{expr:?}")));
        }

        let tree = WalkTree::compile(&self.fields, self.projection_type)?;
        tracing::debug!(
            projection_type = ?self.projection_type,
            fields = tree.len(),
            root_replacement = self.root_replacement.is_some(),
            "built projection executor"
        );

        Ok(ProjectionExecutor {
            projection_type: self.projection_type,
            policies: self.policies,
            tree,
            root_replacement: self.root_replacement,
            variables: self.variables,
        })
    }
}

/// Build an executor for a parsed projection, chaining its positional and
/// slice operators into the root replacement.
///
/// The positional operator runs first and each slice wraps the previous
/// result, so all operators apply in one evaluation pass.
pub fn build_projection_executor(
    projection: &Projection,
) -> Result<ProjectionExecutor, ProjectionError> {
    let mut replacement = None;

    if let Some(path) = projection.positional_path() {
        let predicate = projection.query().ok_or_else(|| {
            ProjectionError::InvalidProjection(format!(
                "positional projection on {path} has no query predicate"
            ))
        })?;
        replacement = Some(Expression::positional(path, predicate.clone()));
    }
    for slice in projection.slices() {
        let source = replacement.take().unwrap_or_else(Expression::post_image);
        replacement = Some(Expression::slice(source, slice.path, slice.skip, slice.limit));
    }

    let mut builder = ProjectionExecutorBuilder::from_projection(projection);
    if let Some(expr) = replacement {
        builder = builder.root_replacement(expr);
    }
    builder.build()
}

/// Parse `spec` and build its executor in one step.
pub fn compile_projection(
    spec: &Document,
    query: Option<&Predicate>,
    policies: ProjectionPolicies,
) -> Result<ProjectionExecutor, ProjectionError> {
    let projection = parse_projection(spec, query, policies)?;
    build_projection_executor(&projection)
}

impl ProjectionExecutor {
    pub fn builder(
        projection_type: ProjectionType,
        policies: ProjectionPolicies,
    ) -> ProjectionExecutorBuilder {
        ProjectionExecutorBuilder::new(projection_type, policies)
    }

    pub fn projection_type(&self) -> ProjectionType {
        self.projection_type
    }

    pub fn policies(&self) -> ProjectionPolicies {
        self.policies
    }

    pub fn root_replacement(&self) -> Option<&Expression> {
        self.root_replacement.as_ref()
    }

    /// Project one document.
    ///
    /// Runs the base field walk, then, if a root replacement is attached,
    /// evaluates it with `$$ROOT` bound to `input` and the post-image bound to
    /// the walk's result.
    pub fn apply_transformation(&self, input: &Document) -> Document {
        let ctx = EvalContext::new(input, &self.variables);
        let policy = self.policies.array_recursion_policy;
        let walked = match self.projection_type {
            ProjectionType::Inclusion => {
                inclusion::apply(input, &self.tree, self.id_implicitly_included(), policy, ctx)
            }
            ProjectionType::Exclusion => {
                exclusion::apply(input, &self.tree, self.id_implicitly_excluded(), policy, ctx)
            }
        };

        let Some(expr) = &self.root_replacement else {
            return walked;
        };
        match expression::evaluate(expr, ctx.with_post_image(&walked)) {
            Value::Document(doc) => doc,
            other => {
                tracing::warn!(result = ?other, "root replacement did not produce a document");
                walked
            }
        }
    }

    /// Add the input fields this projection reads.
    pub fn add_dependencies(&self, deps: &mut DepsTracker) {
        match self.projection_type {
            ProjectionType::Inclusion => {
                self.tree.visit(&mut |path, node| match node {
                    WalkNode::Include => deps.add_field(path),
                    WalkNode::Computed(expr) => expression::add_dependencies(expr, deps),
                    WalkNode::Exclude | WalkNode::Branch(_) => {}
                });
                if self.id_implicitly_included() {
                    deps.add_field("_id");
                }
            }
            ProjectionType::Exclusion => {
                deps.set_need_whole_document();
                self.tree.visit(&mut |_, node| {
                    if let WalkNode::Computed(expr) = node {
                        expression::add_dependencies(expr, deps);
                    }
                });
            }
        }

        // The operators may read any field through their predicates or the
        // root document, whatever the walk needs.
        if let Some(expr) = &self.root_replacement {
            expression::add_dependencies(expr, deps);
            deps.set_need_whole_document();
        }
    }

    /// Which output paths this projection may change.
    pub fn modified_paths(&self) -> ModifiedPaths {
        if self.root_replacement.is_some() {
            return ModifiedPaths::AllPaths;
        }
        match self.projection_type {
            ProjectionType::Inclusion => ModifiedPaths::AllExcept(self.preserved_paths()),
            ProjectionType::Exclusion => {
                let mut modified = BTreeSet::new();
                self.tree.visit(&mut |path, node| {
                    if matches!(node, WalkNode::Exclude | WalkNode::Computed(_)) {
                        modified.insert(path.to_string());
                    }
                });
                if self.id_implicitly_excluded() {
                    modified.insert("_id".to_string());
                }
                ModifiedPaths::Finite(modified)
            }
        }
    }

    /// The complete set of paths kept by an inclusion projection.
    ///
    /// `None` when no finite set describes the output: exclusion projections
    /// keep every unnamed path, and root replacements may rewrite any of them.
    pub fn exhaustive_paths(&self) -> Option<BTreeSet<String>> {
        match (self.projection_type, &self.root_replacement) {
            (ProjectionType::Inclusion, None) => Some(self.preserved_paths()),
            _ => None,
        }
    }

    fn preserved_paths(&self) -> BTreeSet<String> {
        let mut preserved = BTreeSet::new();
        self.tree.visit(&mut |path, node| {
            if matches!(node, WalkNode::Include) {
                preserved.insert(path.to_string());
            }
        });
        if self.id_implicitly_included() {
            preserved.insert("_id".to_string());
        }
        preserved
    }

    fn id_implicitly_included(&self) -> bool {
        self.tree.get("_id").is_none() && self.policies.default_id_policy == DefaultIdPolicy::Include
    }

    fn id_implicitly_excluded(&self) -> bool {
        self.tree.get("_id").is_none() && self.policies.default_id_policy == DefaultIdPolicy::Exclude
    }
}
