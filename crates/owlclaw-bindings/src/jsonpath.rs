//! Dot-path extraction from JSON responses.
//!
//! Supports `$.a.b`, `a.b`, `items[0].name` and numeric segments
//! (`items.0.name`). Filters, wildcards and slices are not supported.

use serde_json::Value;

/// A parsed path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Object field access.
    Field(String),
    /// Array index access.
    Index(usize),
}

/// Path syntax error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported response path '{0}'")]
pub struct PathError(pub String);

/// Parse a dot path into segments. `$` and the empty path select the root.
///
/// # Errors
///
/// Returns [`PathError`] for empty segments or malformed indexes.
pub fn parse(path: &str) -> Result<Vec<Segment>, PathError> {
    let trimmed = path.trim();
    let body = match trimmed {
        "" | "$" => return Ok(Vec::new()),
        p => p.strip_prefix("$.").unwrap_or(p),
    };

    let mut segments = Vec::new();
    for part in body.split('.') {
        if part.is_empty() {
            return Err(PathError(path.to_string()));
        }

        match part.find('[') {
            Some(bracket) => {
                let field = &part[..bracket];
                if !field.is_empty() {
                    segments.push(Segment::Field(field.to_string()));
                }
                // Allow chained indexes: matrix[0][1]
                for index in part[bracket..].split_inclusive(']') {
                    let digits = index
                        .strip_prefix('[')
                        .and_then(|s| s.strip_suffix(']'))
                        .ok_or_else(|| PathError(path.to_string()))?;
                    let index = digits.parse().map_err(|_| PathError(path.to_string()))?;
                    segments.push(Segment::Index(index));
                }
            }
            None => match part.parse::<usize>() {
                Ok(index) => segments.push(Segment::Index(index)),
                Err(_) => segments.push(Segment::Field(part.to_string())),
            },
        }
    }

    Ok(segments)
}

/// Walk `segments` from `value`. A numeric segment also matches an object key.
#[must_use]
pub fn apply<'a>(value: &'a Value, segments: &[Segment]) -> Option<&'a Value> {
    segments.iter().try_fold(value, |current, segment| match segment {
        Segment::Field(name) => current.get(name),
        Segment::Index(index) => current
            .get(*index)
            .or_else(|| current.get(index.to_string())),
    })
}

/// Parse and apply in one step, cloning the selected value.
///
/// # Errors
///
/// Returns [`PathError`] when `path` is malformed.
pub fn extract(value: &Value, path: &str) -> Result<Option<Value>, PathError> {
    let segments = parse(path)?;
    Ok(apply(value, &segments).cloned())
}
