//! The JSON document layer.
//!
//! A [`JsonNode`] owns a byte slice holding the current JSON text plus a
//! type tag cached at construction. Mutations replace the bytes; when a
//! mutation fails the error is recorded on the node and the bytes keep
//! their last successful state. Pure reads never consult the error.

use thiserror::Error;
use tracing::debug;

use crate::path::{Path, PathError};
use crate::scanner::{self, ScanError, ScanType};
use crate::value::{datatype, Node, Type};

/// The sticky error channel of a document node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("invalid json: {0}")]
    Parse(String),
    #[error("{op}: datatype is not {expected}")]
    Datatype {
        op: &'static str,
        expected: &'static str,
    },
    #[error("cannot write an undefined value at {0:?}")]
    UndefinedValue(String),
    #[error("cannot write to the empty path")]
    EmptyPath,
    #[error("arrays of length {keys} and {values} cannot be combined")]
    LengthMismatch { keys: usize, values: usize },
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// A JSON document value: raw bytes plus a cached, refined type tag.
///
/// String-typed documents store their text unquoted; [`JsonNode::raw`]
/// re-quotes it. All other types store the raw JSON encoding.
#[derive(Debug, Clone)]
pub struct JsonNode {
    value: Vec<u8>,
    datatype: Type,
    err: Option<DocumentError>,
}

impl JsonNode {
    /// Parse raw JSON text. On a syntax error the node carries
    /// `Type::Undefined`, the bytes as given, and the parse error.
    pub fn new(raw: impl AsRef<[u8]>) -> JsonNode {
        let raw = raw.as_ref();
        match serde_json::from_slice::<serde_json::Value>(raw) {
            Ok(serde_json::Value::String(s)) => JsonNode {
                value: s.into_bytes(),
                datatype: Type::String,
                err: None,
            },
            Ok(value) => {
                let (bytes, tag) = (raw.to_vec(), scan_tag(&value));
                JsonNode {
                    datatype: datatype(tag, &bytes),
                    value: bytes,
                    err: None,
                }
            }
            Err(e) => JsonNode {
                value: raw.to_vec(),
                datatype: Type::Undefined,
                err: Some(DocumentError::Parse(e.to_string())),
            },
        }
    }

    /// Wrap a scanner result without re-parsing.
    pub(crate) fn from_scan(value: Vec<u8>, tag: ScanType) -> JsonNode {
        JsonNode {
            datatype: datatype(tag, &value),
            value,
            err: None,
        }
    }

    /// An empty object document.
    pub fn object() -> JsonNode {
        JsonNode::new("{}")
    }

    /// An empty array document.
    pub fn array() -> JsonNode {
        JsonNode::new("[]")
    }

    pub fn datatype(&self) -> Type {
        self.datatype
    }

    pub fn error(&self) -> Option<&DocumentError> {
        self.err.as_ref()
    }

    /// The stored bytes (unquoted for string-typed documents).
    pub fn bytes(&self) -> &[u8] {
        &self.value
    }

    /// The JSON encoding. Only the string sub-case differs from
    /// [`JsonNode::bytes`]: it is re-quoted.
    pub fn raw(&self) -> Vec<u8> {
        match self.datatype {
            Type::String => crate::value::quote(&self.string()).into_bytes(),
            _ => self.value.clone(),
        }
    }

    pub fn string(&self) -> String {
        String::from_utf8_lossy(&self.value).into_owned()
    }

    /// Refine into the scalar [`Node`] this document denotes. Containers
    /// stay documents; `Undefined` and `Null` both refine per the
    /// coercion table.
    pub fn node(&self) -> Node {
        match self.datatype {
            Type::Undefined => Node::Undefined,
            Type::Bool | Type::Number | Type::Int | Type::Float => {
                Node::String(self.string()).to(self.datatype)
            }
            Type::String => Node::String(self.string()),
            _ => Node::Json(self.clone()),
        }
    }

    /// Re-parse into an independent node. Goes through [`JsonNode::raw`]
    /// so string-typed documents survive the round trip.
    pub fn copy(&self) -> JsonNode {
        JsonNode::new(self.raw())
    }

    // ------------------------------------------------------------------
    // Path-addressed primitives
    // ------------------------------------------------------------------

    /// Get the subtree at `path`. The empty path returns a copy of the
    /// whole document; a missing segment yields an undefined node.
    pub fn get(&self, path: &str) -> JsonNode {
        if path.is_empty() {
            return self.clone();
        }
        let parsed = match Path::parse(path) {
            Ok(p) => p,
            Err(e) => {
                return JsonNode {
                    value: Vec::new(),
                    datatype: Type::Undefined,
                    err: Some(e.into()),
                }
            }
        };
        let (bytes, tag) = scanner::get(&self.value, &parsed);
        JsonNode::from_scan(bytes, tag)
    }

    /// Replace the value at `path`, creating intermediate objects as
    /// needed. Writing an undefined (or otherwise empty) value records
    /// an error and leaves the bytes untouched.
    pub fn set(&mut self, path: &str, value: &Node) {
        if path.is_empty() {
            self.err = Some(DocumentError::EmptyPath);
            return;
        }
        let raw = value.raw();
        if raw.is_empty() {
            self.err = Some(DocumentError::UndefinedValue(path.to_string()));
            return;
        }
        match Path::parse(path) {
            Ok(parsed) => self.record(scanner::set(&self.value, &parsed, &raw)),
            Err(e) => self.err = Some(e.into()),
        }
    }

    /// Append `value` to the array at `path`. When the leaf does not
    /// exist, falls back to `set(path, [value])`, creating a singleton
    /// array; this fallback is what distinguishes append from set.
    pub fn append(&mut self, path: &str, value: &Node) {
        let raw = value.raw();
        if raw.is_empty() {
            self.err = Some(DocumentError::UndefinedValue(path.to_string()));
            return;
        }
        let parsed = match Path::parse(path) {
            Ok(p) => p,
            Err(e) => {
                self.err = Some(e.into());
                return;
            }
        };
        match scanner::append(&self.value, &parsed, &raw) {
            Err(ScanError::PathNotFound(_)) => {
                let mut singleton = Vec::with_capacity(raw.len() + 2);
                singleton.push(b'[');
                singleton.extend_from_slice(&raw);
                singleton.push(b']');
                self.record(scanner::set(&self.value, &parsed, &singleton));
            }
            result => self.record(result),
        }
    }

    /// Remove each path in order. Missing paths are silently ignored.
    pub fn del<S: AsRef<str>>(&mut self, paths: &[S]) {
        for path in paths {
            if let Ok(parsed) = Path::parse(path.as_ref()) {
                self.value = scanner::delete(&self.value, &parsed);
            }
        }
    }

    fn record(&mut self, result: Result<Vec<u8>, ScanError>) {
        match result {
            Ok(bytes) => {
                self.value = bytes;
                self.err = None;
            }
            Err(e) => self.err = Some(e.into()),
        }
    }

    // ------------------------------------------------------------------
    // Bulk operations
    // ------------------------------------------------------------------

    /// Visit every member in document order: `(key, value)` for objects,
    /// `("[i]", value)` for arrays. The bytes must not be mutated from
    /// inside the callback. On non-container types the error is set and
    /// nothing is visited.
    pub fn foreach<F>(&mut self, f: F)
    where
        F: FnMut(&str, &JsonNode),
    {
        if !matches!(self.datatype, Type::Object | Type::Array) {
            self.fail("foreach", "object or array");
            return;
        }
        self.each(f);
    }

    /// Container iteration without the datatype guard. Callers have
    /// already checked the tag.
    fn each<F>(&self, mut f: F)
    where
        F: FnMut(&str, &JsonNode),
    {
        match self.datatype {
            Type::Object => {
                let _ = scanner::object_each(&self.value, |key, bytes, tag| {
                    f(key, &JsonNode::from_scan(bytes.to_vec(), tag));
                });
            }
            Type::Array => {
                let _ = scanner::array_each(&self.value, |idx, bytes, tag| {
                    f(
                        &format!("[{}]", idx),
                        &JsonNode::from_scan(bytes.to_vec(), tag),
                    );
                });
            }
            _ => {}
        }
    }

    /// Rewrite every member in place: the result of `f(key, value)` is
    /// written back at `key`. Deterministic, preserves key order.
    pub fn map<F>(&mut self, mut f: F)
    where
        F: FnMut(&str, &JsonNode) -> Node,
    {
        if !matches!(self.datatype, Type::Object | Type::Array) {
            self.fail("map", "object or array");
            return;
        }
        let mut out = self.copy();
        self.each(|key, value| {
            out.set(key, &f(key, value));
        });
        self.value = out.value;
        self.datatype = out.datatype;
    }

    /// Partition an array into an object keyed by the stringified value
    /// at `path` in each element (dots become underscores so keys stay
    /// flat). Elements missing the key are skipped.
    pub fn group_by(&mut self, path: &str) -> JsonNode {
        if self.datatype != Type::Array {
            self.fail("group_by", "array");
            return self.clone();
        }
        let mut out = JsonNode::object();
        self.each(|_key, value| {
            let group = value.get(path).string();
            if group.is_empty() {
                return;
            }
            let group = group.replace('.', "_");
            out.append(&group, &Node::Json(value.clone()));
        });
        out
    }

    /// Merge array elements sharing a composite key into one object per
    /// key. The key joins the stringified values at `paths` with `+`
    /// (dots become underscores); elements missing any component are
    /// skipped.
    pub fn merge_by<S: AsRef<str>>(&mut self, paths: &[S]) -> JsonNode {
        if self.datatype != Type::Array {
            self.fail("merge_by", "array");
            return self.clone();
        }
        let mut out = JsonNode::object();
        self.each(|_key, value| {
            let mut components = Vec::with_capacity(paths.len());
            for path in paths {
                let component = value.get(path.as_ref()).string();
                if component.is_empty() {
                    return;
                }
                components.push(component);
            }
            if components.is_empty() {
                return;
            }
            let group = components.join("+").replace('.', "_");

            let mut merged = out.get(&group);
            merged.merge(value);
            let merge_err = merged.error().cloned();
            out.set(&group, &Node::Json(merged));
            // The element's own merge error survives the write-back.
            if merge_err.is_some() {
                out.err = merge_err;
            }
        });
        out
    }

    /// Re-key an array into an object by the stringified value at `path`.
    /// Last write wins for duplicate keys.
    pub fn key_by(&mut self, path: &str) -> JsonNode {
        if self.datatype != Type::Array {
            self.fail("key_by", "array");
            return self.clone();
        }
        let mut out = JsonNode::object();
        self.each(|_key, value| {
            let key = value.get(path).string();
            out.set(&key, &Node::Json(value.clone()));
        });
        out
    }

    /// Stable-sort the values of an array or object by `less`, rebuilding
    /// the document as an array.
    pub fn sort_by<F>(&mut self, mut less: F)
    where
        F: FnMut(&JsonNode, &JsonNode) -> bool,
    {
        if !matches!(self.datatype, Type::Object | Type::Array) {
            self.fail("sort_by", "array or object");
            return;
        }
        let mut values = Vec::new();
        self.each(|_key, value| values.push(value.clone()));
        values.sort_by(|a, b| {
            if less(a, b) {
                std::cmp::Ordering::Less
            } else if less(b, a) {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            }
        });

        let mut out = JsonNode::array();
        for value in &values {
            out.append("", &Node::Json(value.clone()));
        }
        self.value = out.value;
        self.datatype = out.datatype;
    }

    /// Shallow-merge `other`'s keys into self; duplicates overwrite. A
    /// null (or undefined) self becomes a copy of `other`; non-object
    /// operands set the error.
    pub fn merge(&mut self, other: &JsonNode) {
        if matches!(self.datatype, Type::Null | Type::Undefined) {
            *self = other.copy();
            return;
        }
        if self.datatype != Type::Object || other.datatype != Type::Object {
            self.fail("merge", "object");
            return;
        }
        other.each(|key, value| {
            self.set(key, &Node::Json(value.clone()));
        });
    }

    /// Zip two equal-length arrays into an object: keys from `keys`
    /// (coerced to string), values from `values` at the same index.
    pub fn combine(keys: &JsonNode, values: &JsonNode) -> JsonNode {
        let mut out = JsonNode::object();
        if keys.datatype != Type::Array || values.datatype != Type::Array {
            debug!(op = "combine", keys = %keys.datatype, values = %values.datatype, "datatype precondition failed");
            out.err = Some(DocumentError::Datatype {
                op: "combine",
                expected: "array",
            });
            return out;
        }
        let (key_len, value_len) = (keys.len(), values.len());
        if key_len != value_len {
            out.err = Some(DocumentError::LengthMismatch {
                keys: key_len,
                values: value_len,
            });
            return out;
        }
        let mut idx = 0usize;
        keys.each(|_key, key_value| {
            let value = values.get(&format!("[{}]", idx));
            out.set(&key_value.string(), &Node::Json(value));
            idx += 1;
        });
        out
    }

    /// Element count for arrays, member count for objects, 0 otherwise.
    pub fn len(&self) -> usize {
        let mut count = 0usize;
        self.each(|_, _| count += 1);
        count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn fail(&mut self, op: &'static str, expected: &'static str) {
        debug!(op, datatype = %self.datatype, "datatype precondition failed");
        self.err = Some(DocumentError::Datatype { op, expected });
    }
}

fn scan_tag(value: &serde_json::Value) -> ScanType {
    match value {
        serde_json::Value::Null => ScanType::Null,
        serde_json::Value::Bool(_) => ScanType::Boolean,
        serde_json::Value::Number(_) => ScanType::Number,
        serde_json::Value::String(_) => ScanType::String,
        serde_json::Value::Array(_) => ScanType::Array,
        serde_json::Value::Object(_) => ScanType::Object,
    }
}
