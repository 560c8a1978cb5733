use bson::{Bson, Document};
use prism_query::{FieldPath, Predicate};

use crate::{matcher, path};

/// Collapse the array at `field` in `post_image` to its first element that
/// satisfies `predicate`.
///
/// The array is the first one met walking `field` through sub-documents. The
/// elements of that array in `root` are tested in index order, each one
/// against a copy of `root` holding that element in place of the array. The
/// element kept is the one at the matching index in `post_image`, so fields
/// the walk removed stay removed. With no match, or no element at that index,
/// the field is removed. If `post_image` has no array along `field`, it is
/// returned unchanged.
pub fn apply_positional(
    root: &Document,
    mut post_image: Document,
    field: &FieldPath,
    predicate: &Predicate,
) -> Document {
    let segments = field.segments();
    let Some(depth) = path::first_array_depth(&post_image, segments) else {
        return post_image;
    };
    let array_path = &segments[..depth];
    let Some(Bson::Array(elements)) = path::get(root, array_path) else {
        return post_image;
    };

    let mut candidate = root.clone();
    let matched = elements.iter().position(|elem| {
        path::replace(&mut candidate, array_path, elem.clone());
        matcher::matches(&candidate, predicate)
    });

    let projected = matched.and_then(|index| match path::get(&post_image, array_path) {
        Some(Bson::Array(projected)) => projected.get(index).cloned(),
        _ => None,
    });
    match projected {
        Some(elem) => {
            path::replace(&mut post_image, array_path, Bson::Array(vec![elem]));
        }
        None => {
            tracing::trace!(
                path = %field,
                index = ?matched,
                "positional projection found no matching element"
            );
            path::remove(&mut post_image, array_path);
        }
    }
    post_image
}
