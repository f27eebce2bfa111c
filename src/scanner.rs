//! Byte-level JSON primitives.
//!
//! Everything in this module works on raw JSON bytes: parse, walk a
//! [`Path`], mutate, re-serialize. `serde_json` (with `preserve_order`)
//! is the substrate, so object key order survives every mutation and
//! `object_each` observes document order.

use serde_json::Value;
use thiserror::Error;

use crate::path::{Path, Segment};

/// Type tags produced at the scanner boundary, before they are mapped
/// into the value lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanType {
    NotExist,
    String,
    Number,
    Object,
    Array,
    Boolean,
    Null,
    Unknown,
}

/// Errors surfaced by the mutating primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("invalid json: {0}")]
    Parse(String),
    #[error("invalid value payload: {0}")]
    InvalidValue(String),
    #[error("key path not found: {0}")]
    PathNotFound(String),
    #[error("value at {0:?} is not an array")]
    NotAnArray(String),
    #[error("value at {0:?} is not an object")]
    NotAnObject(String),
    #[error("array index {index} out of bounds at {path:?}")]
    IndexOutOfBounds { index: usize, path: String },
    #[error("wildcard paths cannot be mutated")]
    WildcardWrite,
}

fn parse(raw: &[u8]) -> Result<Value, ScanError> {
    serde_json::from_slice(raw).map_err(|e| ScanError::Parse(e.to_string()))
}

fn scan_type(value: &Value) -> ScanType {
    match value {
        Value::Null => ScanType::Null,
        Value::Bool(_) => ScanType::Boolean,
        Value::Number(_) => ScanType::Number,
        Value::String(_) => ScanType::String,
        Value::Array(_) => ScanType::Array,
        Value::Object(_) => ScanType::Object,
    }
}

/// Serialize a subtree. Strings come back unquoted, mirroring what the
/// rest of the crate stores for string-typed documents.
fn value_bytes(value: &Value) -> (Vec<u8>, ScanType) {
    let tag = scan_type(value);
    let bytes = match value {
        Value::String(s) => s.clone().into_bytes(),
        other => other.to_string().into_bytes(),
    };
    (bytes, tag)
}

/// Walk `path` inside `raw` and return the subtree.
///
/// A missing segment (or unparseable input) yields `NotExist`. A path
/// containing `*` collects every match of the remaining path into an
/// array, in document order.
pub fn get(raw: &[u8], path: &Path) -> (Vec<u8>, ScanType) {
    let root = match parse(raw) {
        Ok(v) => v,
        Err(_) => return (Vec::new(), ScanType::NotExist),
    };

    if path.segments().contains(&Segment::Wildcard) {
        let mut matches = Vec::new();
        collect(&root, path.segments(), &mut matches);
        let all = Value::Array(matches.into_iter().cloned().collect());
        return value_bytes(&all);
    }

    match walk(&root, path.segments()) {
        Some(v) => value_bytes(v),
        None => (Vec::new(), ScanType::NotExist),
    }
}

fn walk<'a>(value: &'a Value, segments: &[Segment]) -> Option<&'a Value> {
    let mut current = value;
    for seg in segments {
        current = match seg {
            Segment::Key(k) => current.as_object()?.get(k)?,
            Segment::Index(i) => current.as_array()?.get(*i)?,
            Segment::Wildcard => return None,
        };
    }
    Some(current)
}

fn collect<'a>(value: &'a Value, segments: &[Segment], out: &mut Vec<&'a Value>) {
    let (seg, rest) = match segments.split_first() {
        Some(split) => split,
        None => {
            out.push(value);
            return;
        }
    };
    match seg {
        Segment::Key(k) => {
            if let Some(child) = value.as_object().and_then(|m| m.get(k)) {
                collect(child, rest, out);
            }
        }
        Segment::Index(i) => {
            if let Some(child) = value.as_array().and_then(|a| a.get(*i)) {
                collect(child, rest, out);
            }
        }
        Segment::Wildcard => match value {
            Value::Array(items) => {
                for child in items {
                    collect(child, rest, out);
                }
            }
            Value::Object(map) => {
                for child in map.values() {
                    collect(child, rest, out);
                }
            }
            _ => {}
        },
    }
}

/// Replace the value at `path`, creating intermediate objects as needed.
/// Sibling order is preserved; replacing an existing key keeps its
/// position. An array index equal to the current length appends, a
/// larger one errors.
pub fn set(raw: &[u8], path: &Path, value: &[u8]) -> Result<Vec<u8>, ScanError> {
    let payload: Value =
        serde_json::from_slice(value).map_err(|e| ScanError::InvalidValue(e.to_string()))?;
    let (last, inner) = match path.segments().split_last() {
        Some(split) => split,
        // Root path: the payload replaces the whole document.
        None => return Ok(payload.to_string().into_bytes()),
    };

    let mut root = parse(raw)?;
    let mut current = &mut root;

    for seg in inner {
        current = match seg {
            Segment::Key(k) => {
                let map = current
                    .as_object_mut()
                    .ok_or_else(|| ScanError::NotAnObject(path.to_string()))?;
                let slot = map
                    .entry(k.clone())
                    .or_insert_with(|| Value::Object(Default::default()));
                if !slot.is_object() && !slot.is_array() {
                    *slot = Value::Object(Default::default());
                }
                slot
            }
            Segment::Index(i) => {
                let arr = current
                    .as_array_mut()
                    .ok_or_else(|| ScanError::NotAnArray(path.to_string()))?;
                if *i == arr.len() {
                    arr.push(Value::Object(Default::default()));
                } else if *i > arr.len() {
                    return Err(ScanError::IndexOutOfBounds {
                        index: *i,
                        path: path.to_string(),
                    });
                }
                &mut arr[*i]
            }
            Segment::Wildcard => return Err(ScanError::WildcardWrite),
        };
    }

    match last {
        Segment::Key(k) => {
            if let Value::Object(map) = current {
                map.insert(k.clone(), payload);
            } else {
                // A scalar in leaf position is overwritten by the object
                // the path implies, matching intermediate-creation rules.
                let mut map = serde_json::Map::new();
                map.insert(k.clone(), payload);
                *current = Value::Object(map);
            }
        }
        Segment::Index(i) => {
            let arr = current
                .as_array_mut()
                .ok_or_else(|| ScanError::NotAnArray(path.to_string()))?;
            if *i < arr.len() {
                arr[*i] = payload;
            } else if *i == arr.len() {
                arr.push(payload);
            } else {
                return Err(ScanError::IndexOutOfBounds {
                    index: *i,
                    path: path.to_string(),
                });
            }
        }
        Segment::Wildcard => return Err(ScanError::WildcardWrite),
    }

    Ok(root.to_string().into_bytes())
}

/// Push `value` onto the array at `path`. The root path appends to a
/// top-level array. A missing leaf yields [`ScanError::PathNotFound`],
/// which callers use to distinguish the create-singleton fallback.
pub fn append(raw: &[u8], path: &Path, value: &[u8]) -> Result<Vec<u8>, ScanError> {
    let payload: Value =
        serde_json::from_slice(value).map_err(|e| ScanError::InvalidValue(e.to_string()))?;
    let mut root = parse(raw)?;

    let target = match walk_mut(&mut root, path.segments()) {
        Some(v) => v,
        None => return Err(ScanError::PathNotFound(path.to_string())),
    };
    match target {
        Value::Array(items) => items.push(payload),
        _ => return Err(ScanError::NotAnArray(path.to_string())),
    }

    Ok(root.to_string().into_bytes())
}

fn walk_mut<'a>(value: &'a mut Value, segments: &[Segment]) -> Option<&'a mut Value> {
    let mut current = value;
    for seg in segments {
        current = match seg {
            Segment::Key(k) => current.as_object_mut()?.get_mut(k)?,
            Segment::Index(i) => current.as_array_mut()?.get_mut(*i)?,
            Segment::Wildcard => return None,
        };
    }
    Some(current)
}

/// Remove the value at `path`. Missing paths (and unparseable input)
/// leave the bytes unchanged.
pub fn delete(raw: &[u8], path: &Path) -> Vec<u8> {
    let mut root = match parse(raw) {
        Ok(v) => v,
        Err(_) => return raw.to_vec(),
    };
    let (last, inner) = match path.segments().split_last() {
        Some(split) => split,
        None => return raw.to_vec(),
    };
    let parent = match walk_mut(&mut root, inner) {
        Some(v) => v,
        None => return raw.to_vec(),
    };
    match (parent, last) {
        (Value::Object(map), Segment::Key(k)) => {
            map.shift_remove(k);
        }
        (Value::Array(items), Segment::Index(i)) => {
            if *i < items.len() {
                items.remove(*i);
            }
        }
        _ => {}
    }

    root.to_string().into_bytes()
}

/// Visit every member of a top-level object in document order.
pub fn object_each<F>(raw: &[u8], mut f: F) -> Result<(), ScanError>
where
    F: FnMut(&str, &[u8], ScanType),
{
    let root = parse(raw)?;
    let map = match root.as_object() {
        Some(m) => m,
        None => return Err(ScanError::NotAnObject(String::new())),
    };
    for (key, value) in map {
        let (bytes, tag) = value_bytes(value);
        f(key, &bytes, tag);
    }
    Ok(())
}

/// Visit every element of a top-level array in order.
pub fn array_each<F>(raw: &[u8], mut f: F) -> Result<(), ScanError>
where
    F: FnMut(usize, &[u8], ScanType),
{
    let root = parse(raw)?;
    let items = match root.as_array() {
        Some(a) => a,
        None => return Err(ScanError::NotAnArray(String::new())),
    };
    for (idx, value) in items.iter().enumerate() {
        let (bytes, tag) = value_bytes(value);
        f(idx, &bytes, tag);
    }
    Ok(())
}
