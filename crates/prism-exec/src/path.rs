//! Field-path resolution over owned documents.

use bson::{Bson, Document};

/// Every value reachable at `path`, traversing arrays implicitly.
///
/// When an intermediate value is an array, each document element is checked
/// for the remaining suffix. A numeric segment also addresses the element at
/// that index. The order of the result follows document and array order.
///
/// ```text
/// resolve({a: [{b: 1}, {b: 2}, 3]}, "a.b") == [1, 2]
/// ```
pub fn resolve<'a>(doc: &'a Document, path: &[String]) -> Vec<&'a Bson> {
    let mut out = Vec::new();
    if let Some((head, rest)) = path.split_first()
        && let Some(value) = doc.get(head)
    {
        resolve_value(value, rest, &mut out);
    }
    out
}

fn resolve_value<'a>(value: &'a Bson, rest: &[String], out: &mut Vec<&'a Bson>) {
    let Some((head, tail)) = rest.split_first() else {
        out.push(value);
        return;
    };
    match value {
        Bson::Document(sub_doc) => {
            if let Some(child) = sub_doc.get(head) {
                resolve_value(child, tail, out);
            }
        }
        Bson::Array(arr) => {
            if let Ok(index) = head.parse::<usize>()
                && let Some(elem) = arr.get(index)
            {
                resolve_value(elem, tail, out);
            }
            for elem in arr {
                if let Bson::Document(sub_doc) = elem
                    && let Some(child) = sub_doc.get(head)
                {
                    resolve_value(child, tail, out);
                }
            }
        }
        _ => {}
    }
}

/// Value at `path` following sub-documents only. Arrays are not traversed.
pub fn get<'a>(doc: &'a Document, path: &[String]) -> Option<&'a Bson> {
    let (last, parents) = path.split_last()?;
    let mut current = doc;
    for segment in parents {
        match current.get(segment)? {
            Bson::Document(sub_doc) => current = sub_doc,
            _ => return None,
        }
    }
    current.get(last)
}

/// Number of leading segments of `path` that lead to the first array, walking
/// sub-documents only.
///
/// `{a: {b: [..]}}` with `a.b.c` gives `Some(2)`. `None` when the walk hits a
/// missing field or a scalar first.
pub fn first_array_depth(doc: &Document, path: &[String]) -> Option<usize> {
    let mut current = doc;
    for (i, segment) in path.iter().enumerate() {
        match current.get(segment)? {
            Bson::Array(_) => return Some(i + 1),
            Bson::Document(sub_doc) => current = sub_doc,
            _ => return None,
        }
    }
    None
}

/// Overwrite the existing value at `path`. Returns `false`, leaving the
/// document untouched, when the path does not already exist.
pub fn replace(doc: &mut Document, path: &[String], value: Bson) -> bool {
    let Some((last, parents)) = path.split_last() else {
        return false;
    };
    let Some(parent) = parent_mut(doc, parents) else {
        return false;
    };
    match parent.get_mut(last) {
        Some(slot) => {
            *slot = value;
            true
        }
        None => false,
    }
}

/// Remove the value at `path`, if present.
pub fn remove(doc: &mut Document, path: &[String]) -> Option<Bson> {
    let (last, parents) = path.split_last()?;
    parent_mut(doc, parents)?.remove(last)
}

fn parent_mut<'a>(doc: &'a mut Document, parents: &[String]) -> Option<&'a mut Document> {
    let mut current = doc;
    for segment in parents {
        match current.get_mut(segment)? {
            Bson::Document(sub_doc) => current = sub_doc,
            _ => return None,
        }
    }
    Some(current)
}
