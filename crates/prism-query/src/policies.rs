use serde::{Deserialize, Serialize};

/// Whether `_id` is part of the output when the projection does not mention it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultIdPolicy {
    #[default]
    Include,
    Exclude,
}

/// How arrays nested directly inside arrays are handled by nested specs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrayRecursionPolicy {
    #[default]
    Recurse,
    TreatAsLeaf,
}

/// Options fixed when a projection is parsed and carried by its executor.
///
/// Deserializable so an embedding service can keep them in its own config:
///
/// ```text
/// { "default_id_policy": "exclude", "array_recursion_policy": "treat_as_leaf" }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionPolicies {
    /// Reject dotted keys like `"a.b"` in the spec; nested documents must be used.
    pub ban_dots_in_field_names: bool,
    pub default_id_policy: DefaultIdPolicy,
    pub array_recursion_policy: ArrayRecursionPolicy,
}

impl ProjectionPolicies {
    pub fn with_default_id_policy(mut self, policy: DefaultIdPolicy) -> Self {
        self.default_id_policy = policy;
        self
    }

    pub fn with_array_recursion_policy(mut self, policy: ArrayRecursionPolicy) -> Self {
        self.array_recursion_policy = policy;
        self
    }

    pub fn with_ban_dots_in_field_names(mut self, ban: bool) -> Self {
        self.ban_dots_in_field_names = ban;
        self
    }
}
