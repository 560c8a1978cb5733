use bson::{Bson, Document};

/// The result of evaluating an expression.
///
/// `Missing` means "no value": it is distinct from `Bson::Null`, and a field
/// whose computed value is `Missing` is left out of the output.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Missing,
    Scalar(Bson),
    Array(Vec<Bson>),
    Document(Document),
}

impl Value {
    /// Owned BSON for writing into a document; `None` for `Missing`.
    pub fn into_bson(self) -> Option<Bson> {
        match self {
            Value::Missing => None,
            Value::Scalar(b) => Some(b),
            Value::Array(arr) => Some(Bson::Array(arr)),
            Value::Document(doc) => Some(Bson::Document(doc)),
        }
    }
}

impl From<Bson> for Value {
    fn from(value: Bson) -> Self {
        match value {
            Bson::Array(arr) => Value::Array(arr),
            Bson::Document(doc) => Value::Document(doc),
            scalar => Value::Scalar(scalar),
        }
    }
}

impl From<Option<Bson>> for Value {
    fn from(value: Option<Bson>) -> Self {
        value.map(Value::from).unwrap_or_default()
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Document(doc)
    }
}
