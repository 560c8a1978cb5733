use bson::Bson;

use crate::path::FieldPath;
use crate::predicate::Predicate;

/// Named values an expression can reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variable {
    /// The original, unprojected input document.
    Root,
    /// The document produced by the base field walk.
    PostImage,
    /// A caller-supplied binding.
    User(String),
}

/// A computed-expression tree. Every node owns its children.
#[derive(Debug, Clone)]
pub enum Expression {
    Literal(Bson),
    /// Field read from the root document, e.g. `"$a.b"`.
    FieldPath(FieldPath),
    Variable(Variable),
    Positional(Box<Positional>),
    Slice(Box<Slice>),
}

/// Keep only the first element of the array at `path` whose value satisfies
/// `predicate`.
///
/// Elements are tested against `root`; the output shape comes from
/// `post_image`.
#[derive(Debug, Clone)]
pub struct Positional {
    pub root: Expression,
    pub post_image: Expression,
    pub path: FieldPath,
    pub predicate: Predicate,
}

/// Cut the array at `path` down to a window. A negative `limit` counts from
/// the end and ignores `skip`.
#[derive(Debug, Clone)]
pub struct Slice {
    pub source: Expression,
    pub path: FieldPath,
    pub skip: Option<i32>,
    pub limit: i32,
}

impl Expression {
    pub fn root() -> Self {
        Expression::Variable(Variable::Root)
    }

    pub fn post_image() -> Self {
        Expression::Variable(Variable::PostImage)
    }

    pub fn field_path(path: FieldPath) -> Self {
        Expression::FieldPath(path)
    }

    /// `$$ROOT` / post-image positional over `path`, the shape produced for a
    /// `"path.$"` projection.
    pub fn positional(path: FieldPath, predicate: Predicate) -> Self {
        Expression::Positional(Box::new(Positional {
            root: Expression::root(),
            post_image: Expression::post_image(),
            path,
            predicate,
        }))
    }

    /// Slice applied to the result of `source`.
    pub fn slice(source: Expression, path: FieldPath, skip: Option<i32>, limit: i32) -> Self {
        Expression::Slice(Box::new(Slice {
            source,
            path,
            skip,
            limit,
        }))
    }

    /// Whether every evaluation of this expression yields a document, given
    /// that the root and post-image bindings are documents.
    pub fn produces_document(&self) -> bool {
        match self {
            Expression::Literal(value) => matches!(value, Bson::Document(_)),
            Expression::Variable(Variable::Root | Variable::PostImage) => true,
            Expression::Variable(Variable::User(_)) | Expression::FieldPath(_) => false,
            Expression::Positional(p) => {
                p.root.produces_document() && p.post_image.produces_document()
            }
            Expression::Slice(s) => s.source.produces_document(),
        }
    }
}
