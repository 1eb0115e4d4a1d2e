//! Field paths addressing locations inside an event.

use super::{Kind, ObjectMap, Value};
use crate::transform::lexer::tokenize;
use crate::transform::token::TokenKind;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Object key access (`.name` or `."quoted name"`)
    Key(String),
    /// Array index access (`[2]`, or `[-1]` counted from the end)
    Index(isize),
}

/// An ordered sequence of segments starting at the event root.
///
/// The empty path is the root itself and renders as `.`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

/// Why a write through a field path could not be performed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PathError {
    #[error("cannot index into missing array at {path}")]
    MissingArray { path: FieldPath },

    #[error("index {index} is out of range for array of length {len} at {path}")]
    IndexOutOfRange {
        path: FieldPath,
        index: isize,
        len: usize,
    },

    #[error("cannot write key {key:?} into {kind} at {path}")]
    NotAnObject {
        path: FieldPath,
        key: String,
        kind: Kind,
    },

    #[error("cannot write index {index} into {kind} at {path}")]
    NotAnArray {
        path: FieldPath,
        index: isize,
        kind: Kind,
    },
}

impl FieldPath {
    /// The root path (`.`).
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    /// Appends the segments of `other` to this path.
    pub fn extend(&mut self, other: &FieldPath) {
        self.segments.extend(other.segments.iter().cloned());
    }

    fn prefix(&self, len: usize) -> FieldPath {
        FieldPath::new(self.segments[..len].to_vec())
    }
}

fn is_plain_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '@')
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, ".");
        }
        for segment in &self.segments {
            match segment {
                Segment::Key(key) if is_plain_key(key) => write!(f, ".{}", key)?,
                Segment::Key(key) => write!(f, ".{:?}", key)?,
                Segment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tokens, diagnostics) = tokenize(s);
        if let Some(diagnostic) = diagnostics.first() {
            return Err(diagnostic.message.clone());
        }
        let mut kinds = tokens
            .into_iter()
            .map(|token| token.kind)
            .filter(|kind| *kind != TokenKind::Eof);
        match (kinds.next(), kinds.next()) {
            (Some(TokenKind::Path(path)), None) => Ok(path),
            _ => Err(format!("invalid field path: {}", s)),
        }
    }
}

/// Resolves a possibly negative index against a length.
fn normalize_index(index: isize, len: usize) -> Option<usize> {
    if index >= 0 {
        let index = index as usize;
        (index < len).then_some(index)
    } else {
        len.checked_sub(index.unsigned_abs())
    }
}

pub(super) fn get<'a>(value: &'a Value, segments: &[Segment]) -> Option<&'a Value> {
    let mut current = value;
    for segment in segments {
        current = match (segment, current) {
            (Segment::Key(key), Value::Object(map)) => map.get(key)?,
            (Segment::Index(index), Value::Array(items)) => {
                &items[normalize_index(*index, items.len())?]
            }
            _ => return None,
        };
    }
    Some(current)
}

/// Walks `path` read-only and reports whether a write would succeed, so a
/// failed write never leaves partially created parents behind.
fn check_writable(root: &Value, path: &FieldPath) -> Result<(), PathError> {
    let mut current = Some(root);
    for (depth, segment) in path.segments.iter().enumerate() {
        current = match (segment, current) {
            (Segment::Key(key), Some(Value::Object(map))) => map.get(key),
            (Segment::Key(_), None | Some(Value::Null)) => None,
            (Segment::Key(key), Some(other)) => {
                return Err(PathError::NotAnObject {
                    path: path.prefix(depth),
                    key: key.clone(),
                    kind: other.kind(),
                })
            }
            (Segment::Index(index), Some(Value::Array(items))) => {
                match normalize_index(*index, items.len()) {
                    Some(i) => Some(&items[i]),
                    None => {
                        return Err(PathError::IndexOutOfRange {
                            path: path.prefix(depth),
                            index: *index,
                            len: items.len(),
                        })
                    }
                }
            }
            (Segment::Index(_), None | Some(Value::Null)) => {
                return Err(PathError::MissingArray {
                    path: path.prefix(depth),
                })
            }
            (Segment::Index(index), Some(other)) => {
                return Err(PathError::NotAnArray {
                    path: path.prefix(depth),
                    index: *index,
                    kind: other.kind(),
                })
            }
        };
    }
    Ok(())
}

/// Steps one segment into `current` for writing, creating a missing object
/// for a key segment.
fn descend<'v>(
    current: &'v mut Value,
    segment: &Segment,
    path: &FieldPath,
    depth: usize,
) -> Result<&'v mut Value, PathError> {
    match segment {
        Segment::Key(key) => {
            if current.is_null() {
                *current = Value::Object(ObjectMap::new());
            }
            match current {
                Value::Object(map) => Ok(map.entry(key.clone()).or_insert(Value::Null)),
                other => Err(PathError::NotAnObject {
                    path: path.prefix(depth),
                    key: key.clone(),
                    kind: other.kind(),
                }),
            }
        }
        Segment::Index(index) => match current {
            Value::Array(items) => {
                let len = items.len();
                match normalize_index(*index, len) {
                    Some(i) => Ok(&mut items[i]),
                    None => Err(PathError::IndexOutOfRange {
                        path: path.prefix(depth),
                        index: *index,
                        len,
                    }),
                }
            }
            Value::Null => Err(PathError::MissingArray {
                path: path.prefix(depth),
            }),
            other => Err(PathError::NotAnArray {
                path: path.prefix(depth),
                index: *index,
                kind: other.kind(),
            }),
        },
    }
}

pub(super) fn insert(
    root: &mut Value,
    path: &FieldPath,
    value: Value,
) -> Result<Option<Value>, PathError> {
    check_writable(root, path)?;

    let Some((last, parents)) = path.segments.split_last() else {
        return Ok(Some(std::mem::replace(root, value)));
    };

    let mut current = root;
    for (depth, segment) in parents.iter().enumerate() {
        current = descend(current, segment, path, depth)?;
    }

    match last {
        Segment::Key(key) => {
            if current.is_null() {
                *current = Value::Object(ObjectMap::new());
            }
            match current {
                Value::Object(map) => Ok(map.insert(key.clone(), value)),
                other => Err(PathError::NotAnObject {
                    path: path.prefix(parents.len()),
                    key: key.clone(),
                    kind: other.kind(),
                }),
            }
        }
        Segment::Index(_) => {
            let slot = descend(current, last, path, parents.len())?;
            Ok(Some(std::mem::replace(slot, value)))
        }
    }
}

pub(super) fn remove(root: &mut Value, path: &FieldPath) -> Option<Value> {
    let Some((last, parents)) = path.segments.split_last() else {
        return Some(std::mem::replace(root, Value::empty_object()));
    };

    let mut current = root;
    for segment in parents {
        current = match (segment, current) {
            (Segment::Key(key), Value::Object(map)) => map.get_mut(key)?,
            (Segment::Index(index), Value::Array(items)) => {
                let i = normalize_index(*index, items.len())?;
                &mut items[i]
            }
            _ => return None,
        };
    }

    match (last, current) {
        (Segment::Key(key), Value::Object(map)) => map.remove(key),
        (Segment::Index(index), Value::Array(items)) => {
            let i = normalize_index(*index, items.len())?;
            Some(items.remove(i))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event() -> Value {
        Value::from(json!({
            "message": "hello",
            "nested": { "level": "info", "tags": ["a", "b", "c"] },
            "empty": null
        }))
    }

    fn path(s: &str) -> FieldPath {
        s.parse().unwrap()
    }

    #[test]
    fn test_get_present_absent_and_null() {
        let event = event();
        assert_eq!(event.get(&path(".message")), Some(&Value::from("hello")));
        assert_eq!(event.get(&path(".empty")), Some(&Value::Null));
        assert_eq!(event.get(&path(".missing")), None);
        assert_eq!(event.get(&path(".nested.tags[1]")), Some(&Value::from("b")));
        assert_eq!(event.get(&path(".nested.tags[-1]")), Some(&Value::from("c")));
        assert_eq!(event.get(&path(".nested.tags[3]")), None);
        assert_eq!(event.get(&path(".message.inner")), None);
    }

    #[test]
    fn test_insert_creates_object_parents() {
        let mut event = event();
        let previous = event.insert(&path(".a.b.c"), Value::Integer(1)).unwrap();
        assert_eq!(previous, None);
        assert_eq!(event.get(&path(".a.b.c")), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_insert_in_range_index_replaces() {
        let mut event = event();
        let previous = event
            .insert(&path(".nested.tags[0]"), Value::from("z"))
            .unwrap();
        assert_eq!(previous, Some(Value::from("a")));
        assert_eq!(event.get(&path(".nested.tags[0]")), Some(&Value::from("z")));
    }

    #[test]
    fn test_insert_out_of_range_index_is_rejected_without_side_effects() {
        let mut event = event();
        let before = event.clone();
        let err = event
            .insert(&path(".nested.tags[5]"), Value::from("z"))
            .unwrap_err();
        assert!(matches!(err, PathError::IndexOutOfRange { index: 5, len: 3, .. }));
        assert_eq!(event, before);

        let err = event.insert(&path(".new.list[0]"), Value::Null).unwrap_err();
        assert!(matches!(err, PathError::MissingArray { .. }));
        assert_eq!(event, before);
    }

    #[test]
    fn test_insert_through_scalar_fails() {
        let mut event = event();
        let err = event.insert(&path(".message.inner"), Value::Null).unwrap_err();
        assert!(matches!(err, PathError::NotAnObject { kind: Kind::String, .. }));
    }

    #[test]
    fn test_insert_through_null_creates_object() {
        let mut event = event();
        assert_eq!(event.insert(&path(".empty.x"), Value::Integer(2)), Ok(None));
        assert_eq!(event.get(&path(".empty.x")), Some(&Value::Integer(2)));
    }

    #[test]
    fn test_descend_reports_conflicts() {
        let target = path(".list[0]");
        let mut scalar = Value::from("text");
        let err = descend(&mut scalar, &Segment::Index(0), &target, 1).unwrap_err();
        assert!(matches!(err, PathError::NotAnArray { kind: Kind::String, .. }));

        let mut null = Value::Null;
        let err = descend(&mut null, &Segment::Index(0), &target, 1).unwrap_err();
        assert!(matches!(err, PathError::MissingArray { .. }));

        let mut items = Value::Array(vec![Value::Null]);
        let err = descend(&mut items, &Segment::Index(2), &target, 1).unwrap_err();
        assert!(matches!(err, PathError::IndexOutOfRange { index: 2, len: 1, .. }));
    }

    #[test]
    fn test_remove() {
        let mut event = event();
        assert_eq!(event.remove(&path(".missing")), None);
        assert_eq!(event.remove(&path(".nested.tags[0]")), Some(Value::from("a")));
        assert_eq!(event.get(&path(".nested.tags[0]")), Some(&Value::from("b")));
        assert_eq!(event.remove(&path(".message")), Some(Value::from("hello")));
        assert_eq!(event.get(&path(".message")), None);
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for text in [".", ".a.b[0]", ".\"with space\".x", ".list[-1]", ".@timestamp"] {
            assert_eq!(path(text).to_string(), text);
        }
    }
}
