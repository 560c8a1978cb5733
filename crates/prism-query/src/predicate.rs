use std::collections::BTreeSet;

use bson::Bson;
use regex::Regex;

use crate::path::FieldPath;

/// A recursive match expression over documents.
///
/// Used as the element predicate of the positional operator. Owns field paths
/// and values so it can outlive the filter document it was parsed from.
#[derive(Debug, Clone)]
pub enum Predicate {
    // Logical
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    // Comparison
    Eq(FieldPath, Bson),
    Ne(FieldPath, Bson),
    Gt(FieldPath, Bson),
    Gte(FieldPath, Bson),
    Lt(FieldPath, Bson),
    Lte(FieldPath, Bson),
    In(FieldPath, Vec<Bson>),
    // Pattern
    Regex(FieldPath, Regex),
    // Existence
    Exists(FieldPath, bool),
}

impl Predicate {
    /// Every field path the predicate reads, in sorted order.
    pub fn field_paths(&self) -> BTreeSet<&FieldPath> {
        let mut out = BTreeSet::new();
        self.collect_paths(&mut out);
        out
    }

    fn collect_paths<'a>(&'a self, out: &mut BTreeSet<&'a FieldPath>) {
        match self {
            Predicate::And(children) | Predicate::Or(children) => {
                for child in children {
                    child.collect_paths(out);
                }
            }
            Predicate::Eq(path, _)
            | Predicate::Ne(path, _)
            | Predicate::Gt(path, _)
            | Predicate::Gte(path, _)
            | Predicate::Lt(path, _)
            | Predicate::Lte(path, _)
            | Predicate::In(path, _)
            | Predicate::Regex(path, _)
            | Predicate::Exists(path, _) => {
                out.insert(path);
            }
        }
    }
}
