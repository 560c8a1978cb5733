use std::fmt;

use serde::{Deserialize, Serialize};

/// A validated dot-notation field path such as `address.city`.
///
/// Segments are non-empty and never start with `$`. The dotted form is kept
/// alongside the segments so dependency sets can hand it out without
/// re-joining.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath {
    dotted: String,
    segments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid field path '{path}': {reason}")]
pub struct InvalidPath {
    pub path: String,
    pub reason: &'static str,
}

impl FieldPath {
    pub fn parse(path: &str) -> Result<Self, InvalidPath> {
        let invalid = |reason| InvalidPath {
            path: path.to_string(),
            reason,
        };
        if path.is_empty() {
            return Err(invalid("path must not be empty"));
        }
        let mut segments = Vec::new();
        for segment in path.split('.') {
            if segment.is_empty() {
                return Err(invalid("empty path segment"));
            }
            if segment.starts_with('$') {
                return Err(invalid("path segment must not start with '$'"));
            }
            segments.push(segment.to_string());
        }
        Ok(FieldPath {
            dotted: path.to_string(),
            segments,
        })
    }

    pub fn from_segments<I, S>(segments: I) -> Result<Self, InvalidPath>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = segments
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(".");
        FieldPath::parse(&joined)
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn first(&self) -> &str {
        &self.segments[0]
    }

    pub fn as_str(&self) -> &str {
        &self.dotted
    }

    /// Append a child segment, producing `self.child`.
    pub fn child(&self, segment: &str) -> Result<FieldPath, InvalidPath> {
        FieldPath::parse(&format!("{}.{segment}", self.dotted))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dotted)
    }
}

impl TryFrom<String> for FieldPath {
    type Error = InvalidPath;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        FieldPath::parse(&value)
    }
}

impl TryFrom<&str> for FieldPath {
    type Error = InvalidPath;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        FieldPath::parse(value)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.dotted
    }
}
