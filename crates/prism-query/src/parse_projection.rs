use bson::{Bson, Document};

use crate::expression::{Expression, Variable};
use crate::path::FieldPath;
use crate::policies::ProjectionPolicies;
use crate::predicate::Predicate;
use crate::projection::{Projection, ProjectionFields, ProjectionNode, ProjectionType};

const POSITIONAL_SUFFIX: &str = ".$";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProjectionParseError {
    #[error("invalid projection path: {0}")]
    InvalidPath(String),
    #[error("cannot do inclusion on field {field} in exclusion projection")]
    MixedProjection { field: String },
    #[error("path collision at {0}")]
    PathCollision(String),
    #[error("field names may not contain '.' under this policy: {0}")]
    DottedFieldName(String),
    #[error("positional projection on {0} requires a query referencing that field")]
    PositionalWithoutQuery(String),
    #[error("cannot specify more than one positional projection")]
    MultiplePositional,
    #[error("positional projection value must be 1 or true")]
    PositionalValue,
    #[error("invalid $slice argument: {0}")]
    InvalidSlice(String),
    #[error("unsupported projection operator: {0}")]
    UnsupportedOperator(String),
    #[error("projection operator document must have exactly one field: {0}")]
    OperatorArity(String),
    #[error("empty nested projection at {0}")]
    EmptyNested(String),
}

#[derive(Default)]
struct ParseState {
    saw_include: Option<String>,
    saw_exclude: Option<String>,
    id: Option<bool>,
    positional: bool,
}

/// Parse a projection specification document.
///
/// `query` is the find filter; it is required when the spec contains a
/// positional `"path.$"` field and becomes that operator's predicate.
pub fn parse_projection(
    spec: &Document,
    query: Option<&Predicate>,
    policies: ProjectionPolicies,
) -> Result<Projection, ProjectionParseError> {
    let mut state = ParseState::default();
    let mut fields = ProjectionFields::new();

    for (key, value) in spec {
        if let Some(base) = key.strip_suffix(POSITIONAL_SUFFIX) {
            let path = parse_path(base, policies)?;
            parse_positional(&path, value, query, &mut state)?;
            insert_at(&mut fields, path.segments(), ProjectionNode::Positional, &path)?;
            continue;
        }

        let path = parse_path(key, policies)?;
        let node = parse_value(&path, value, policies, &mut state)?;
        if key == "_id" {
            match node {
                ProjectionNode::Include => state.id = Some(true),
                ProjectionNode::Exclude => state.id = Some(false),
                _ => {}
            }
        }
        insert_at(&mut fields, path.segments(), node, &path)?;
    }

    let projection_type = match (&state.saw_include, &state.saw_exclude) {
        (Some(_), Some(excluded)) => {
            return Err(ProjectionParseError::MixedProjection {
                field: excluded.clone(),
            });
        }
        (Some(_), None) => ProjectionType::Inclusion,
        (None, Some(_)) => ProjectionType::Exclusion,
        (None, None) if state.id == Some(true) => ProjectionType::Inclusion,
        (None, None) => ProjectionType::Exclusion,
    };

    let mut projection = Projection::new(projection_type, fields, policies);
    if state.positional
        && let Some(query) = query
    {
        projection = projection.with_query(query.clone());
    }
    Ok(projection)
}

fn parse_path(key: &str, policies: ProjectionPolicies) -> Result<FieldPath, ProjectionParseError> {
    if policies.ban_dots_in_field_names && key.contains('.') {
        return Err(ProjectionParseError::DottedFieldName(key.to_string()));
    }
    FieldPath::parse(key).map_err(|e| ProjectionParseError::InvalidPath(e.to_string()))
}

fn parse_positional(
    path: &FieldPath,
    value: &Bson,
    query: Option<&Predicate>,
    state: &mut ParseState,
) -> Result<(), ProjectionParseError> {
    if state.positional {
        return Err(ProjectionParseError::MultiplePositional);
    }
    if truthiness(value) != Some(true) {
        return Err(ProjectionParseError::PositionalValue);
    }
    let referenced = query.is_some_and(|q| {
        q.field_paths()
            .iter()
            .any(|p| p.first() == path.first())
    });
    if !referenced {
        return Err(ProjectionParseError::PositionalWithoutQuery(path.to_string()));
    }
    state.positional = true;
    mark_include(state, path);
    Ok(())
}

fn parse_value(
    path: &FieldPath,
    value: &Bson,
    policies: ProjectionPolicies,
    state: &mut ParseState,
) -> Result<ProjectionNode, ProjectionParseError> {
    if let Some(included) = truthiness(value) {
        if path.as_str() != "_id" {
            if included {
                mark_include(state, path);
            } else {
                mark_exclude(state, path);
            }
        }
        return Ok(if included {
            ProjectionNode::Include
        } else {
            ProjectionNode::Exclude
        });
    }

    match value {
        Bson::Document(doc) if doc.is_empty() => {
            Err(ProjectionParseError::EmptyNested(path.to_string()))
        }
        Bson::Document(doc) if doc.keys().next().is_some_and(|k| k.starts_with('$')) => {
            parse_operator(path, doc, state)
        }
        Bson::Document(doc) => {
            let mut children = ProjectionFields::new();
            for (key, value) in doc {
                let relative = parse_path(key, policies)?;
                let full = path
                    .child(relative.as_str())
                    .map_err(|e| ProjectionParseError::InvalidPath(e.to_string()))?;
                let node = parse_value(&full, value, policies, state)?;
                insert_at(&mut children, relative.segments(), node, &full)?;
            }
            Ok(ProjectionNode::Fields(children))
        }
        Bson::String(s) if s.starts_with('$') => {
            mark_include(state, path);
            Ok(ProjectionNode::Expression(parse_field_reference(s)?))
        }
        literal => {
            mark_include(state, path);
            Ok(ProjectionNode::Expression(Expression::Literal(literal.clone())))
        }
    }
}

fn parse_operator(
    path: &FieldPath,
    doc: &Document,
    state: &mut ParseState,
) -> Result<ProjectionNode, ProjectionParseError> {
    if doc.len() != 1 {
        return Err(ProjectionParseError::OperatorArity(path.to_string()));
    }
    let Some((op, arg)) = doc.iter().next() else {
        return Err(ProjectionParseError::OperatorArity(path.to_string()));
    };
    match op.as_str() {
        "$slice" => parse_slice(arg),
        "$literal" => {
            mark_include(state, path);
            Ok(ProjectionNode::Expression(Expression::Literal(arg.clone())))
        }
        other => Err(ProjectionParseError::UnsupportedOperator(other.to_string())),
    }
}

fn parse_slice(arg: &Bson) -> Result<ProjectionNode, ProjectionParseError> {
    match arg {
        Bson::Array(args) => {
            let [skip, limit] = args.as_slice() else {
                return Err(ProjectionParseError::InvalidSlice(
                    "array form takes exactly [skip, limit]".into(),
                ));
            };
            let skip = as_i32(skip)
                .ok_or_else(|| ProjectionParseError::InvalidSlice("skip must be an integer".into()))?;
            let limit = as_i32(limit).ok_or_else(|| {
                ProjectionParseError::InvalidSlice("limit must be an integer".into())
            })?;
            if limit <= 0 {
                return Err(ProjectionParseError::InvalidSlice(
                    "limit must be positive when skip is given".into(),
                ));
            }
            Ok(ProjectionNode::Slice {
                skip: Some(skip),
                limit,
            })
        }
        other => {
            let limit = as_i32(other).ok_or_else(|| {
                ProjectionParseError::InvalidSlice("expected a number or [skip, limit]".into())
            })?;
            Ok(ProjectionNode::Slice { skip: None, limit })
        }
    }
}

/// `"$a.b"` reads a field, `"$$ROOT"` / `"$$CURRENT"` the root document and
/// `"$$name"` a user variable.
fn parse_field_reference(s: &str) -> Result<Expression, ProjectionParseError> {
    if let Some(name) = s.strip_prefix("$$") {
        return match name {
            "ROOT" | "CURRENT" => Ok(Expression::root()),
            "" => Err(ProjectionParseError::InvalidPath(s.to_string())),
            name => Ok(Expression::Variable(Variable::User(name.to_string()))),
        };
    }
    let field = &s[1..];
    FieldPath::parse(field)
        .map(Expression::FieldPath)
        .map_err(|e| ProjectionParseError::InvalidPath(e.to_string()))
}

fn truthiness(value: &Bson) -> Option<bool> {
    match value {
        Bson::Boolean(b) => Some(*b),
        Bson::Int32(i) => Some(*i != 0),
        Bson::Int64(i) => Some(*i != 0),
        Bson::Double(f) => Some(*f != 0.0),
        _ => None,
    }
}

fn as_i32(value: &Bson) -> Option<i32> {
    match value {
        Bson::Int32(i) => Some(*i),
        Bson::Int64(i) => i32::try_from(*i).ok(),
        Bson::Double(f) if f.fract() == 0.0 && *f >= i32::MIN as f64 && *f <= i32::MAX as f64 => {
            Some(*f as i32)
        }
        _ => None,
    }
}

fn mark_include(state: &mut ParseState, path: &FieldPath) {
    state.saw_include.get_or_insert_with(|| path.to_string());
}

fn mark_exclude(state: &mut ParseState, path: &FieldPath) {
    state.saw_exclude.get_or_insert_with(|| path.to_string());
}

/// Insert `node` under `segments`, creating intermediate levels.
fn insert_at(
    fields: &mut ProjectionFields,
    segments: &[String],
    node: ProjectionNode,
    full: &FieldPath,
) -> Result<(), ProjectionParseError> {
    let collision = || ProjectionParseError::PathCollision(full.to_string());
    let Some((last, parents)) = segments.split_last() else {
        return Err(ProjectionParseError::InvalidPath(full.to_string()));
    };

    let mut level = fields;
    for segment in parents {
        let entry = level
            .entry(segment.clone())
            .or_insert_with(|| ProjectionNode::Fields(ProjectionFields::new()));
        match entry {
            ProjectionNode::Fields(children) => level = children,
            _ => return Err(collision()),
        }
    }

    if !level.contains_key(last) {
        level.insert(last.clone(), node);
        return Ok(());
    }

    match (level.get_mut(last), node) {
        // `{a: {b: 1}, "a.c": 1}` merges into one nested level.
        (Some(ProjectionNode::Fields(existing)), ProjectionNode::Fields(incoming)) => {
            for (key, child) in incoming {
                if existing.contains_key(&key) {
                    return Err(collision());
                }
                existing.insert(key, child);
            }
            Ok(())
        }
        _ => Err(collision()),
    }
}
