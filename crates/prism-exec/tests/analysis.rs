mod common;
use common::*;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

use bson::{Bson, doc};
use prism_exec::{
    DepsTracker, ModifiedPaths, ProjectionError, ProjectionExecutor, ProjectionExecutorBuilder,
};
use prism_query::{Expression, ProjectionPolicies, ProjectionType};

fn set(paths: &[&str]) -> BTreeSet<String> {
    paths.iter().map(|p| p.to_string()).collect()
}

fn deps_of(executor: &ProjectionExecutor) -> DepsTracker {
    let mut deps = DepsTracker::new();
    executor.add_dependencies(&mut deps);
    deps
}

#[test]
fn inclusion_dependencies() {
    let deps = deps_of(&executor(doc! { "a": 1, "b.c": 1 }));
    assert_eq!(deps.fields, set(&["_id", "a", "b.c"]));
    assert!(!deps.need_whole_document);
    assert_eq!(
        deps.to_projection(),
        Some(doc! { "_id": 1, "a": 1, "b.c": 1 })
    );

    let deps = deps_of(&executor(doc! { "a": 1, "_id": 0 }));
    assert_eq!(deps.fields, set(&["a"]));
    assert_eq!(deps.to_projection(), Some(doc! { "a": 1, "_id": 0 }));
}

#[test]
fn computed_field_dependencies() {
    let deps = deps_of(&executor(doc! { "x": "$a.b", "l": { "$literal": 1 }, "_id": 0 }));
    assert_eq!(deps.fields, set(&["a.b"]));
    assert!(!deps.need_whole_document);

    let deps = deps_of(&executor(doc! { "r": "$$ROOT", "_id": 0 }));
    assert!(deps.need_whole_document);
    assert_eq!(deps.to_projection(), None);
}

#[test]
fn exclusion_needs_whole_document() {
    let deps = deps_of(&executor(doc! { "a": 0 }));
    assert!(deps.fields.is_empty());
    assert!(deps.need_whole_document);
}

#[test]
fn need_whole_document_is_sticky() {
    let mut deps = DepsTracker::new();
    executor(doc! { "a": 0 }).add_dependencies(&mut deps);
    executor(doc! { "b": 1, "_id": 0 }).add_dependencies(&mut deps);
    assert!(deps.need_whole_document);
    assert_eq!(deps.fields, set(&["b"]));
}

#[test]
fn inclusion_modified_paths() {
    let executor = executor(doc! { "a": 1, "b.c": 1 });
    let modified = executor.modified_paths();
    assert_eq!(modified, ModifiedPaths::AllExcept(set(&["_id", "a", "b.c"])));
    assert!(!modified.can_modify("a"));
    assert!(!modified.can_modify("a.x"));
    assert!(!modified.can_modify("b.c"));
    assert!(modified.can_modify("b"));
    assert!(modified.can_modify("b.d"));
    assert!(modified.can_modify("z"));
}

#[test]
fn exclusion_modified_paths() {
    let modified = executor(doc! { "a": 0, "b.c": 0 }).modified_paths();
    assert_eq!(modified, ModifiedPaths::Finite(set(&["a", "b.c"])));
    assert!(modified.can_modify("a.x"));
    assert!(modified.can_modify("b"));
    assert!(!modified.can_modify("b.d"));
    assert!(!modified.can_modify("_id"));

    let policies = ProjectionPolicies::default()
        .with_default_id_policy(prism_query::DefaultIdPolicy::Exclude);
    let modified = executor_with(doc! { "a": 0 }, policies).modified_paths();
    assert_eq!(modified, ModifiedPaths::Finite(set(&["_id", "a"])));
}

#[test]
fn root_replacement_modifies_everything() {
    let modified = executor(doc! { "a": { "$slice": 1 } }).modified_paths();
    assert!(modified.is_all_paths());
    assert!(modified.can_modify("anything"));
}

#[test]
fn exhaustive_paths() {
    assert_eq!(
        executor(doc! { "a": 1, "b.c": 1, "_id": 0 }).exhaustive_paths(),
        Some(set(&["a", "b.c"]))
    );
    assert_eq!(executor(doc! { "a": 0 }).exhaustive_paths(), None);
    assert_eq!(
        executor(doc! { "a": 1, "b": { "$slice": 1 } }).exhaustive_paths(),
        None
    );
}

#[test]
fn rejects_non_document_root_replacement() {
    let build = |expr: Expression| {
        ProjectionExecutorBuilder::new(ProjectionType::Inclusion, ProjectionPolicies::default())
            .root_replacement(expr)
            .build()
    };

    assert!(matches!(
        build(Expression::Literal(Bson::Int32(1))),
        Err(ProjectionError::InvalidRootReplacement(_))
    ));
    assert!(matches!(
        build(Expression::field_path(path("a"))),
        Err(ProjectionError::InvalidRootReplacement(_))
    ));
    assert!(matches!(
        build(Expression::slice(Expression::field_path(path("a")), path("b"), None, 1)),
        Err(ProjectionError::InvalidRootReplacement(_))
    ));
    assert!(build(Expression::Literal(Bson::Document(doc! { "k": 1 }))).is_ok());
    assert!(build(Expression::root()).is_ok());
}

#[test]
fn literal_document_replaces_output() {
    let executor = executor_with_replacement(
        doc! { "a": 1 },
        Expression::Literal(Bson::Document(doc! { "k": 1 })),
    );
    assert_doc_eq(&executor.apply_transformation(&doc! { "a": 2 }), &doc! { "k": 1 });
}

#[test]
fn executor_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ProjectionExecutor>();

    let executor = Arc::new(executor_with_replacement(
        doc! { "foo": 1, "_id": 0 },
        positional("foo", doc! { "foo": { "$gte": 5 } }),
    ));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let executor = Arc::clone(&executor);
            thread::spawn(move || {
                let hit = i + 5;
                let input = doc! { "_id": i, "foo": [1, hit, 2] };
                executor.apply_transformation(&input)
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let out = handle.join().unwrap();
        assert_eq!(out, doc! { "foo": [i as i32 + 5] });
    }
}
