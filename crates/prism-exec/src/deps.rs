use std::collections::BTreeSet;

use bson::{Bson, Document};

/// Static accumulator of the input fields a pipeline stage reads.
///
/// Callers thread one tracker through every stage; the result must never
/// under-report, so `need_whole_document` is sticky once set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepsTracker {
    pub fields: BTreeSet<String>,
    pub need_whole_document: bool,
}

impl DepsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_field(&mut self, path: impl Into<String>) {
        self.fields.insert(path.into());
    }

    pub fn set_need_whole_document(&mut self) {
        self.need_whole_document = true;
    }

    /// Inclusion spec that fetches exactly the tracked fields, or `None` when
    /// the whole document is required.
    ///
    /// Paths covered by a tracked ancestor are dropped, and `_id` is excluded
    /// unless it is tracked, e.g. `{a, a.b, c}` becomes `{a: 1, c: 1, _id: 0}`.
    pub fn to_projection(&self) -> Option<Document> {
        if self.need_whole_document {
            return None;
        }
        let covered = |field: &str| {
            self.fields.iter().any(|other| {
                field
                    .strip_prefix(other.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
            })
        };
        let mut spec = Document::new();
        for field in self.fields.iter().filter(|f| !covered(f.as_str())) {
            spec.insert(field.clone(), Bson::Int32(1));
        }
        if !self.fields.contains("_id") {
            spec.insert("_id", Bson::Int32(0));
        }
        Some(spec)
    }
}
