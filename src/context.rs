use std::collections::HashMap;

use regex::Regex;

use crate::ast::CallExpr;
use crate::value::{Node, Type};

/// The evaluator's adapter to the outside world: JSON-path resolution
/// and function dispatch. Returning [`Node::Undefined`] from either
/// method means "not mine", letting chained contexts take over.
pub trait Context {
    /// Resolve a dotted JSON path to a value.
    fn value(&self, path: &str) -> Node;

    /// Dispatch a function call with already-evaluated arguments.
    fn call(&self, call: &CallExpr, args: &[Node]) -> Node;
}

/// An ordered chain of contexts. The first non-Undefined answer wins,
/// for both path lookups and calls.
pub struct MultiContext<'a> {
    contexts: Vec<&'a dyn Context>,
}

impl<'a> MultiContext<'a> {
    pub fn new(contexts: Vec<&'a dyn Context>) -> MultiContext<'a> {
        MultiContext { contexts }
    }
}

impl Context for MultiContext<'_> {
    fn value(&self, path: &str) -> Node {
        for ctx in &self.contexts {
            let ret = ctx.value(path);
            if !ret.is_undefined() {
                return ret;
            }
        }
        Node::Undefined
    }

    fn call(&self, call: &CallExpr, args: &[Node]) -> Node {
        for ctx in &self.contexts {
            let ret = ctx.call(call, args);
            if !ret.is_undefined() {
                return ret;
            }
        }
        Node::Undefined
    }
}

/// A context backed by a flat `path -> value` map. This is the shape a
/// statement executor feeds the evaluator with: one entry per source
/// entity property.
#[derive(Debug, Clone, Default)]
pub struct MapContext {
    values: HashMap<String, Node>,
}

impl MapContext {
    pub fn new() -> MapContext {
        MapContext::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, value: Node) -> &mut Self {
        self.values.insert(path.into(), value);
        self
    }
}

impl From<HashMap<String, Node>> for MapContext {
    fn from(values: HashMap<String, Node>) -> Self {
        MapContext { values }
    }
}

impl Context for MapContext {
    fn value(&self, path: &str) -> Node {
        self.values.get(path).cloned().unwrap_or(Node::Undefined)
    }

    fn call(&self, _call: &CallExpr, _args: &[Node]) -> Node {
        Node::Undefined
    }
}

/// The builtin function table, chained in front of every user context by
/// the evaluator's public entry points.
///
/// Every builtin answers `Undefined` on an arity or type mismatch; path
/// lookups always answer `Undefined` (this context only knows functions).
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultContext;

impl Context for DefaultContext {
    fn value(&self, _path: &str) -> Node {
        Node::Undefined
    }

    fn call(&self, call: &CallExpr, args: &[Node]) -> Node {
        match call.name.as_str() {
            "upper" => with_string(args, |s| Node::String(s.to_uppercase())),
            "lower" => with_string(args, |s| Node::String(s.to_lowercase())),
            "trim" => with_string(args, |s| Node::String(s.trim().to_string())),
            "length" => length(args),
            "concat" => concat(args),
            "abs" => match args {
                [Node::Int(n)] => Node::Int(n.wrapping_abs()),
                [Node::Float(n)] => Node::Float(n.abs()),
                _ => Node::Undefined,
            },
            "ceil" => with_float(args, |n| Node::Int(n.ceil() as i64)),
            "floor" => with_float(args, |n| Node::Int(n.floor() as i64)),
            "round" => with_float(args, |n| Node::Int(n.round() as i64)),
            "contains" => with_two_strings(args, |s, sub| Node::Bool(s.contains(sub))),
            "starts_with" => with_two_strings(args, |s, p| Node::Bool(s.starts_with(p))),
            "ends_with" => with_two_strings(args, |s, p| Node::Bool(s.ends_with(p))),
            "matches" => with_two_strings(args, |s, pattern| match Regex::new(pattern) {
                Ok(re) => Node::Bool(re.is_match(s)),
                Err(_) => Node::Undefined,
            }),
            _ => Node::Undefined,
        }
    }
}

fn with_string(args: &[Node], f: impl FnOnce(&str) -> Node) -> Node {
    match args {
        [Node::String(s)] => f(s),
        _ => Node::Undefined,
    }
}

fn with_two_strings(args: &[Node], f: impl FnOnce(&str, &str) -> Node) -> Node {
    match args {
        [Node::String(a), Node::String(b)] => f(a, b),
        _ => Node::Undefined,
    }
}

fn with_float(args: &[Node], f: impl FnOnce(f64) -> Node) -> Node {
    match args {
        [Node::Int(n)] => Node::Int(*n),
        [Node::Float(n)] => f(*n),
        _ => Node::Undefined,
    }
}

fn length(args: &[Node]) -> Node {
    match args {
        [Node::String(s)] => Node::Int(s.chars().count() as i64),
        [Node::Json(j)] if matches!(j.datatype(), Type::Array | Type::Object) => {
            Node::Int(j.len() as i64)
        }
        _ => Node::Undefined,
    }
}

fn concat(args: &[Node]) -> Node {
    let mut out = String::new();
    for arg in args {
        match arg.to(Type::String) {
            Node::String(s) => out.push_str(&s),
            _ => return Node::Undefined,
        }
    }
    Node::String(out)
}
