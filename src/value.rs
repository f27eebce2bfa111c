use std::fmt;

use crate::document::{DocumentError, JsonNode};
use crate::scanner::ScanType;

/// Type tag for a [`Node`] in the value lattice.
///
/// `Number` is an abstract super-tag used as a coercion target; concrete
/// values always carry `Int` or `Float`. `Json` is a super-tag for
/// `Object`/`Array` that is refined on inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    /// Not a value. Produced by failed lookups and failed coercions.
    Undefined,
    /// JSON null
    Null,
    /// JSON boolean
    Bool,
    /// Abstract numeric tag (coercion target only)
    Number,
    /// Integer number
    Int,
    /// Floating-point number
    Float,
    /// UTF-8 string
    String,
    /// A raw block of JSON, not yet refined
    Json,
    /// JSON object
    Object,
    /// JSON array
    Array,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Type::Null => "Null",
            Type::Bool => "Bool",
            Type::Number => "Number",
            Type::Int => "Int",
            Type::Float => "Float",
            Type::String => "String",
            Type::Json => "JSON",
            Type::Object => "Object",
            Type::Array => "Array",
            Type::Undefined => "Undefined",
        };
        write!(f, "{}", name)
    }
}

/// Map a scanner type tag into the lattice, refining `Number` into
/// `Int`/`Float` by inspecting the raw text for a decimal point.
pub fn datatype(tag: ScanType, raw: &[u8]) -> Type {
    match tag {
        ScanType::NotExist => Type::Undefined,
        ScanType::Null | ScanType::Unknown => Type::Null,
        ScanType::Boolean => Type::Bool,
        ScanType::String => Type::String,
        ScanType::Object => Type::Object,
        ScanType::Array => Type::Array,
        ScanType::Number => {
            if raw.contains(&b'.') {
                Type::Float
            } else {
                Type::Int
            }
        }
    }
}

/// A polymorphic value: the closed sum of everything the evaluator can
/// produce or consume.
///
/// Scalar variants are immutable; [`Node::Json`] carries a byte-backed
/// document that is mutated through the operations layer.
///
/// # Equality
///
/// Equality is structural for scalars and bytes-plus-tag for documents,
/// with one rule on top: `Undefined` is never equal to anything, itself
/// included. Use [`Node::is_undefined`] to test for it.
///
/// # Examples
///
/// ```
/// use tdtl::{Node, Type};
///
/// let n = Node::from(42i64);
/// assert_eq!(n.node_type(), Type::Int);
/// assert_eq!(n.string(), "42");
/// assert_eq!(n.to(Type::Float), Node::Float(42.0));
/// ```
#[derive(Debug, Clone)]
pub enum Node {
    /// The shared sentinel for "no meaningful result".
    Undefined,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Json(JsonNode),
}

impl Node {
    /// Parse raw JSON text into a node, tagging it with its refined type.
    pub fn from_raw(raw: impl AsRef<[u8]>) -> Node {
        Node::Json(JsonNode::new(raw.as_ref()))
    }

    pub fn node_type(&self) -> Type {
        match self {
            Node::Undefined => Type::Undefined,
            Node::Bool(_) => Type::Bool,
            Node::Int(_) => Type::Int,
            Node::Float(_) => Type::Float,
            Node::String(_) => Type::String,
            Node::Json(j) => j.datatype(),
        }
    }

    /// The sticky error channel. Only document nodes carry one.
    pub fn error(&self) -> Option<&DocumentError> {
        match self {
            Node::Json(j) => j.error(),
            _ => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Node::Undefined)
    }

    /// The JSON encoding of the value. Strings come back quoted; document
    /// nodes return their bytes as-is except for the string sub-case,
    /// which is re-quoted.
    pub fn raw(&self) -> Vec<u8> {
        match self {
            Node::Undefined => Vec::new(),
            Node::Bool(b) => {
                if *b {
                    b"true".to_vec()
                } else {
                    b"false".to_vec()
                }
            }
            Node::Int(n) => n.to_string().into_bytes(),
            Node::Float(n) => format!("{:.6}", n).into_bytes(),
            Node::String(s) => quote(s).into_bytes(),
            Node::Json(j) => j.raw(),
        }
    }

    /// The textual form of the value. Strings come back unquoted; floats
    /// use the canonical six-decimal-digit form.
    pub fn string(&self) -> String {
        match self {
            Node::Undefined => String::new(),
            Node::Bool(b) => b.to_string(),
            Node::Int(n) => n.to_string(),
            Node::Float(n) => format!("{:.6}", n),
            Node::String(s) => s.clone(),
            Node::Json(j) => j.string(),
        }
    }

    /// Full-precision text form. Identical to [`Node::string`] except that
    /// floats use shortest-round-trip formatting instead of the canonical
    /// six-digit form.
    pub fn full_string(&self) -> String {
        match self {
            Node::Float(n) => n.to_string(),
            other => other.string(),
        }
    }

    /// Convert to the target type.
    ///
    /// Total: every impossible conversion yields [`Node::Undefined`]
    /// rather than an error. `Number` picks `Int` or `Float` for string
    /// sources by inspecting for a decimal point.
    pub fn to(&self, target: Type) -> Node {
        match self {
            Node::Undefined => Node::Undefined,
            Node::Bool(b) => match target {
                Type::Bool => self.clone(),
                Type::String => Node::String(b.to_string()),
                _ => Node::Undefined,
            },
            Node::Int(n) => match target {
                Type::Number | Type::Int => self.clone(),
                Type::Float => Node::Float(*n as f64),
                Type::String => Node::String(n.to_string()),
                _ => Node::Undefined,
            },
            Node::Float(n) => match target {
                Type::Number | Type::Float => self.clone(),
                Type::Int => Node::Int(*n as i64),
                Type::String => Node::String(format!("{:.6}", n)),
                _ => Node::Undefined,
            },
            Node::String(s) => match target {
                Type::String => self.clone(),
                Type::Bool => match s.parse::<bool>() {
                    Ok(b) => Node::Bool(b),
                    Err(_) => Node::Undefined,
                },
                Type::Number => {
                    if s.contains('.') {
                        self.to(Type::Float)
                    } else {
                        self.to(Type::Int)
                    }
                }
                Type::Int => match s.parse::<i64>() {
                    Ok(n) => Node::Int(n),
                    Err(_) => Node::Undefined,
                },
                Type::Float => match s.parse::<f64>() {
                    Ok(n) => Node::Float(n),
                    Err(_) => Node::Undefined,
                },
                _ => Node::Undefined,
            },
            Node::Json(j) => match target {
                Type::Json | Type::Object | Type::Array => self.clone(),
                Type::String => Node::String(j.string()),
                Type::Bool | Type::Number | Type::Int | Type::Float => {
                    Node::String(j.string()).to(target)
                }
                _ => Node::Undefined,
            },
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            // Undefined compares equal to nothing, itself included.
            (Node::Undefined, _) | (_, Node::Undefined) => false,
            (Node::Bool(a), Node::Bool(b)) => a == b,
            (Node::Int(a), Node::Int(b)) => a == b,
            (Node::Float(a), Node::Float(b)) => a == b,
            (Node::String(a), Node::String(b)) => a == b,
            (Node::Json(a), Node::Json(b)) => {
                a.datatype() == b.datatype() && a.bytes() == b.bytes()
            }
            _ => false,
        }
    }
}

impl From<bool> for Node {
    fn from(v: bool) -> Self {
        Node::Bool(v)
    }
}

impl From<i64> for Node {
    fn from(v: i64) -> Self {
        Node::Int(v)
    }
}

impl From<f64> for Node {
    fn from(v: f64) -> Self {
        Node::Float(v)
    }
}

impl From<&str> for Node {
    fn from(v: &str) -> Self {
        Node::String(v.to_string())
    }
}

impl From<String> for Node {
    fn from(v: String) -> Self {
        Node::String(v)
    }
}

impl From<JsonNode> for Node {
    fn from(v: JsonNode) -> Self {
        Node::Json(v)
    }
}

/// JSON-quote a string, escaping as needed.
pub(crate) fn quote(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}
