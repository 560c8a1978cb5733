use std::ops::Range;

use bson::{Bson, Document};
use prism_query::FieldPath;

/// Cut the array at `field` down to the window selected by `skip`/`limit`.
///
/// Arrays of sub-documents met before the last segment are traversed
/// element-wise, so `a.b` slices `b` inside every element of `a`. Anything
/// that is not an array at the end of the path is left alone.
pub fn apply_slice(doc: &mut Document, field: &FieldPath, skip: Option<i32>, limit: i32) {
    slice_in_document(doc, field.segments(), skip, limit);
}

fn slice_in_document(doc: &mut Document, segments: &[String], skip: Option<i32>, limit: i32) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };
    if let Some(value) = doc.get_mut(head) {
        slice_value(value, rest, skip, limit);
    }
}

fn slice_value(value: &mut Bson, rest: &[String], skip: Option<i32>, limit: i32) {
    match value {
        Bson::Array(arr) if rest.is_empty() => {
            let window = slice_window(arr.len(), skip, limit);
            arr.truncate(window.end);
            arr.drain(..window.start);
        }
        _ if rest.is_empty() => {}
        Bson::Document(sub_doc) => slice_in_document(sub_doc, rest, skip, limit),
        Bson::Array(arr) => {
            for elem in arr.iter_mut() {
                if let Bson::Document(sub_doc) = elem {
                    slice_in_document(sub_doc, rest, skip, limit);
                }
            }
        }
        _ => {}
    }
}

/// Index range kept from an array of `len` elements.
///
/// * `limit < 0`: the last `|limit|` elements; `skip` is ignored.
/// * `skip >= 0`: `[skip, skip + limit)`.
/// * `skip < 0`: the window starts `|skip|` elements from the end.
///
/// Bounds clip to `0..len`; the range never wraps.
pub fn slice_window(len: usize, skip: Option<i32>, limit: i32) -> Range<usize> {
    let len = len as i64;
    let limit = i64::from(limit);
    if limit < 0 {
        let start = (len + limit).max(0);
        return start as usize..len as usize;
    }
    let start = match i64::from(skip.unwrap_or(0)) {
        s if s >= 0 => s.min(len),
        s => (len + s).max(0),
    };
    let end = (start + limit).min(len);
    start as usize..end as usize
}
