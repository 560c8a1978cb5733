mod common;
use common::*;

use bson::doc;
use prism_exec::{ProjectionError, compile_projection};
use prism_query::{ArrayRecursionPolicy, DefaultIdPolicy, ProjectionParseError, ProjectionType};

#[test]
fn drops_named_fields() {
    let executor = executor(doc! { "a": 0, "b.c": 0 });
    assert_eq!(executor.projection_type(), ProjectionType::Exclusion);
    assert_doc_eq(
        &executor.apply_transformation(&doc! {
            "_id": 1,
            "a": 2,
            "b": { "c": 3, "d": 4 },
            "e": 5,
        }),
        &doc! { "_id": 1, "b": { "d": 4 }, "e": 5 },
    );
}

#[test]
fn id_alone_selects_exclusion() {
    let executor = executor(doc! { "_id": 0 });
    assert_eq!(executor.projection_type(), ProjectionType::Exclusion);
    assert_doc_eq(
        &executor.apply_transformation(&doc! { "_id": 1, "a": 2 }),
        &doc! { "a": 2 },
    );
}

#[test]
fn empty_spec_is_identity() {
    let executor = executor(doc! {});
    let input = doc! { "_id": 1, "a": [1, { "b": 2 }] };
    assert_doc_eq(&executor.apply_transformation(&input), &input);
}

#[test]
fn id_can_be_included_explicitly() {
    let policies = policies().with_default_id_policy(DefaultIdPolicy::Exclude);
    let executor = executor_with(doc! { "a": 0, "_id": 1 }, policies);
    assert_eq!(executor.projection_type(), ProjectionType::Exclusion);
    assert_doc_eq(
        &executor.apply_transformation(&doc! { "_id": 1, "a": 2, "b": 3 }),
        &doc! { "_id": 1, "b": 3 },
    );
}

#[test]
fn default_id_policy_exclude() {
    let policies = policies().with_default_id_policy(DefaultIdPolicy::Exclude);
    let executor = executor_with(doc! { "a": 0 }, policies);
    assert_doc_eq(
        &executor.apply_transformation(&doc! { "_id": 1, "a": 2, "b": 3 }),
        &doc! { "b": 3 },
    );
}

#[test]
fn arrays_of_documents_are_walked() {
    let executor = executor(doc! { "a.b": 0 });
    assert_doc_eq(
        &executor.apply_transformation(&doc! {
            "a": [ { "b": 1, "c": 2 }, 5, [ { "b": 3, "c": 4 } ] ],
        }),
        &doc! { "a": [ { "c": 2 }, 5, [ { "c": 4 } ] ] },
    );
}

#[test]
fn treat_as_leaf_keeps_nested_arrays() {
    let policies = policies().with_array_recursion_policy(ArrayRecursionPolicy::TreatAsLeaf);
    let executor = executor_with(doc! { "a.b": 0 }, policies);
    assert_doc_eq(
        &executor.apply_transformation(&doc! {
            "a": [ { "b": 1, "c": 2 }, [ { "b": 3, "c": 4 } ] ],
        }),
        &doc! { "a": [ { "c": 2 }, [ { "b": 3, "c": 4 } ] ] },
    );
}

#[test]
fn scalar_under_nested_spec_is_kept() {
    let executor = executor(doc! { "a.b": 0 });
    assert_doc_eq(
        &executor.apply_transformation(&doc! { "a": 5, "c": 1 }),
        &doc! { "a": 5, "c": 1 },
    );
}

#[test]
fn complements_inclusion_at_top_level() {
    let input = doc! { "_id": 1, "a": 1, "b": { "x": 1 }, "c": [1, 2], "d": "s" };

    let included = executor(doc! { "a": 1, "c": 1, "_id": 0 }).apply_transformation(&input);
    let excluded = executor(doc! { "_id": 0, "b": 0, "d": 0 }).apply_transformation(&input);
    assert_doc_eq(&included, &excluded);
}

#[test]
fn complements_inclusion_on_nested_paths() {
    let input = doc! {
        "_id": 1,
        "a": 1,
        "b": { "x": 1, "y": 2 },
        "c": [ { "p": 1, "q": 2 }, { "p": 3, "q": 4 } ],
    };

    let included = executor(doc! { "a": 1, "b.x": 1, "c.p": 1, "_id": 0 })
        .apply_transformation(&input);
    let excluded =
        executor(doc! { "_id": 0, "b.y": 0, "c.q": 0 }).apply_transformation(&input);
    assert_doc_eq(&included, &excluded);
    assert_doc_eq(
        &excluded,
        &doc! { "a": 1, "b": { "x": 1 }, "c": [ { "p": 1 }, { "p": 3 } ] },
    );
}

#[test]
fn idempotent() {
    let executor = executor(doc! { "a.b": 0, "c": 0 });
    let input = doc! {
        "_id": 1,
        "a": [ { "b": 1, "x": 0 }, [ { "b": 2 } ], 4 ],
        "c": 3,
    };
    let once = executor.apply_transformation(&input);
    let twice = executor.apply_transformation(&once);
    assert_doc_eq(&twice, &once);
}

#[test]
fn mixed_specs_are_rejected() {
    let err = compile_projection(&doc! { "a": 1, "b": 0 }, None, policies()).unwrap_err();
    assert!(matches!(
        err,
        ProjectionError::Parse(ProjectionParseError::MixedProjection { .. })
    ));

    let err = compile_projection(&doc! { "a": 0, "b": "$c" }, None, policies()).unwrap_err();
    assert!(matches!(
        err,
        ProjectionError::Parse(ProjectionParseError::MixedProjection { .. })
    ));
}
