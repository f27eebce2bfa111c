//! The expression evaluator.
//!
//! Three public entry points dispatch over the pre-parsed AST:
//! [`eval_rule_ql`] for generic value-producing evaluation,
//! [`eval_filter`] for boolean filtering, and [`eval_select`] for the
//! specialized statement-to-projection path. Each chains the builtin
//! [`DefaultContext`] in front of the caller's context before
//! dispatching, so builtin functions are always in scope.

use std::sync::OnceLock;

use tracing::debug;

use crate::ast::{BinOp, CallExpr, Expr, Field, SelectStatement, Window};
use crate::context::{Context, DefaultContext, MultiContext};
use crate::document::JsonNode;
use crate::value::{Node, Type};

static DEFAULT_CONTEXT: DefaultContext = DefaultContext;

/// The process-wide fallback dispatcher consulted when no context
/// answers a call.
pub type CallFallback = Box<dyn Fn(&dyn Context, &CallExpr, &[Node]) -> Node + Send + Sync>;

static CALL_FALLBACK: OnceLock<CallFallback> = OnceLock::new();

/// Install the call fallback. Set once at initialization; a second call
/// returns the rejected hook unchanged.
pub fn set_call_fallback(hook: CallFallback) -> Result<(), CallFallback> {
    CALL_FALLBACK.set(hook)
}

/// Generic evaluation: a select statement evaluates to its projection,
/// anything else evaluates as a value-producing expression. Unknown
/// shapes reduce to `Undefined`.
pub fn eval_rule_ql(ctx: &dyn Context, expr: &Expr) -> Node {
    let chained = MultiContext::new(vec![&DEFAULT_CONTEXT as &dyn Context, ctx]);
    eval_rule(&chained, expr)
}

/// Boolean filtering. A statement with no filter passes everything;
/// otherwise the filter expression's boolean value decides, and any
/// non-boolean result rejects.
pub fn eval_filter(ctx: &dyn Context, expr: &Expr) -> bool {
    let chained = MultiContext::new(vec![&DEFAULT_CONTEXT as &dyn Context, ctx]);
    eval_filter_expr(&chained, expr)
}

/// Specialized statement path: statement (or bare field list) to
/// projection; anything else reduces to `Undefined`.
pub fn eval_select(ctx: &dyn Context, expr: &Expr) -> Node {
    let chained = MultiContext::new(vec![&DEFAULT_CONTEXT as &dyn Context, ctx]);
    match expr {
        Expr::Select(stmt) => eval_field_list(&chained, &stmt.fields),
        Expr::Fields(fields) => eval_field_list(&chained, fields),
        _ => Node::Undefined,
    }
}

fn eval_rule(ctx: &dyn Context, expr: &Expr) -> Node {
    match expr {
        Expr::Select(stmt) => eval_field_list(ctx, &stmt.fields),
        Expr::Fields(fields) => eval_field_list(ctx, fields),
        _ => eval(ctx, expr),
    }
}

fn eval_filter_expr(ctx: &dyn Context, expr: &Expr) -> bool {
    match expr {
        Expr::Select(stmt) => match &stmt.filter {
            None => true,
            Some(filter) => match eval(ctx, filter) {
                Node::Bool(b) => b,
                _ => false,
            },
        },
        Expr::Fields(_) => false,
        other => match eval(ctx, other) {
            Node::Bool(b) => b,
            _ => false,
        },
    }
}

/// Value-producing evaluation over the expression variants.
fn eval(ctx: &dyn Context, expr: &Expr) -> Node {
    match expr {
        Expr::Filter(exp) => eval(ctx, exp),
        Expr::Binary { op, lhs, rhs } => {
            let lhs = eval(ctx, lhs);
            let rhs = eval(ctx, rhs);
            if let Some(ret) = eval_binary_overload(*op, &lhs, &rhs) {
                return ret;
            }
            eval_binary(*op, &lhs, &rhs)
        }
        Expr::JsonPath(path) => ctx.value(path),
        Expr::Switch {
            exp,
            cases,
            default,
        } => {
            let value = eval(ctx, exp);
            for arm in cases {
                if value == eval(ctx, &arm.when) {
                    return eval(ctx, &arm.then);
                }
            }
            match default {
                Some(last) => eval(ctx, last),
                None => Node::Undefined,
            }
        }
        Expr::Call(call) => eval_call(ctx, call),
        Expr::Literal(node) => node.clone(),
        // Statements are not value expressions.
        Expr::Select(_) | Expr::Fields(_) => Node::Undefined,
    }
}

/// Project a field list into a fresh object, in declaration order.
/// A field whose set fails is skipped; the rest of the projection
/// survives.
fn eval_field_list(ctx: &dyn Context, fields: &[Field]) -> Node {
    let mut out = JsonNode::object();
    for field in fields {
        let ret = eval(ctx, &field.exp);
        if field.alias.is_empty() {
            continue;
        }
        out.set(&field.alias, &ret);
        if out.error().is_some() {
            debug!(alias = %field.alias, "projection field skipped");
            continue;
        }
    }
    Node::Json(out)
}

/// The `+` overload: string concatenation whenever either operand is a
/// string and the other is a string or a number.
fn eval_binary_overload(op: BinOp, lhs: &Node, rhs: &Node) -> Option<Node> {
    if op != BinOp::Add {
        return None;
    }
    match (lhs, rhs) {
        (Node::String(a), Node::String(b)) => {
            let mut out = String::with_capacity(a.len() + b.len());
            out.push_str(a);
            out.push_str(b);
            Some(Node::String(out))
        }
        (Node::String(_), Node::Int(_) | Node::Float(_)) => {
            eval_binary_overload(op, lhs, &rhs.to(Type::String))
        }
        (Node::Int(_) | Node::Float(_), Node::String(_)) => {
            eval_binary_overload(op, &lhs.to(Type::String), rhs)
        }
        _ => None,
    }
}

/// The type promotion matrix. Coercion failures and unsupported cells
/// reduce to `Undefined`; nothing here panics.
fn eval_binary(op: BinOp, lhs: &Node, rhs: &Node) -> Node {
    match (lhs, rhs) {
        (Node::Undefined, _) | (_, Node::Undefined) => Node::Undefined,

        (Node::String(a), Node::String(b)) => eval_binary_string(op, a, b),
        (Node::String(_), Node::Int(_) | Node::Float(_)) => match lhs.to(Type::Number) {
            Node::Undefined => Node::Undefined,
            coerced => eval_binary(op, &coerced, rhs),
        },
        (Node::String(_), Node::Bool(_)) => match lhs.to(Type::Bool) {
            Node::Undefined => Node::Undefined,
            coerced => eval_binary(op, &coerced, rhs),
        },

        (Node::Float(a), Node::Float(b)) => eval_binary_float(op, *a, *b),
        (Node::Float(a), Node::Int(b)) => eval_binary_float(op, *a, *b as f64),
        (Node::Float(a), Node::String(_)) => match rhs.to(Type::Float) {
            Node::Float(b) => eval_binary_float(op, *a, b),
            _ => Node::Undefined,
        },

        (Node::Int(a), Node::Int(b)) => eval_binary_int(op, *a, *b),
        (Node::Int(a), Node::Float(b)) => eval_binary_float(op, *a as f64, *b),
        (Node::Int(a), Node::String(_)) => match rhs.to(Type::Number) {
            Node::Int(b) => eval_binary_int(op, *a, b),
            Node::Float(b) => eval_binary_float(op, *a as f64, b),
            _ => Node::Undefined,
        },

        (Node::Bool(a), Node::Bool(b)) => eval_binary_bool(op, *a, *b),
        (Node::Bool(a), Node::String(_)) => match rhs.to(Type::Bool) {
            Node::Bool(b) => eval_binary_bool(op, *a, b),
            _ => Node::Undefined,
        },
        // A document operand participates in boolean algebra as `false`.
        (Node::Bool(a), Node::Json(_)) if op.is_boolean() || op.is_logic() => {
            eval_binary_bool(op, *a, false)
        }

        (Node::Json(_), _) if op.is_boolean() => Node::Bool(false),
        (Node::Json(_), _) if op.is_logic() => eval_binary(op, &Node::Bool(false), rhs),

        _ => Node::Undefined,
    }
}

/// String comparison is lexicographic byte order; every non-comparison
/// operator re-enters the matrix with both sides coerced to numbers.
fn eval_binary_string(op: BinOp, lhs: &str, rhs: &str) -> Node {
    if !op.is_boolean() {
        return eval_binary(
            op,
            &Node::String(lhs.to_string()).to(Type::Number),
            &Node::String(rhs.to_string()).to(Type::Number),
        );
    }
    let ord = lhs.cmp(rhs);
    match op {
        BinOp::Eq => Node::Bool(ord.is_eq()),
        BinOp::Ne => Node::Bool(ord.is_ne()),
        BinOp::Lt => Node::Bool(ord.is_lt()),
        BinOp::Lte => Node::Bool(ord.is_le()),
        BinOp::Gt => Node::Bool(ord.is_gt()),
        BinOp::Gte => Node::Bool(ord.is_ge()),
        _ => Node::Undefined,
    }
}

fn eval_binary_int(op: BinOp, lhs: i64, rhs: i64) -> Node {
    match op {
        BinOp::Add => Node::Int(lhs.wrapping_add(rhs)),
        BinOp::Sub => Node::Int(lhs.wrapping_sub(rhs)),
        BinOp::Mul => Node::Int(lhs.wrapping_mul(rhs)),
        BinOp::Div => match lhs.checked_div(rhs) {
            Some(n) => Node::Int(n),
            None => Node::Undefined,
        },
        BinOp::Mod => match lhs.checked_rem(rhs) {
            Some(n) => Node::Int(n),
            None => Node::Undefined,
        },
        BinOp::Eq => Node::Bool(lhs == rhs),
        BinOp::Ne => Node::Bool(lhs != rhs),
        BinOp::Lt => Node::Bool(lhs < rhs),
        BinOp::Lte => Node::Bool(lhs <= rhs),
        BinOp::Gt => Node::Bool(lhs > rhs),
        BinOp::Gte => Node::Bool(lhs >= rhs),
        _ => Node::Undefined,
    }
}

fn eval_binary_float(op: BinOp, lhs: f64, rhs: f64) -> Node {
    match op {
        BinOp::Add => Node::Float(lhs + rhs),
        BinOp::Sub => Node::Float(lhs - rhs),
        BinOp::Mul => Node::Float(lhs * rhs),
        BinOp::Div => {
            if rhs == 0.0 {
                Node::Undefined
            } else {
                Node::Float(lhs / rhs)
            }
        }
        BinOp::Mod => {
            if rhs == 0.0 {
                Node::Undefined
            } else {
                Node::Float(lhs % rhs)
            }
        }
        BinOp::Eq => Node::Bool(lhs == rhs),
        BinOp::Ne => Node::Bool(lhs != rhs),
        BinOp::Lt => Node::Bool(lhs < rhs),
        BinOp::Lte => Node::Bool(lhs <= rhs),
        BinOp::Gt => Node::Bool(lhs > rhs),
        BinOp::Gte => Node::Bool(lhs >= rhs),
        _ => Node::Undefined,
    }
}

fn eval_binary_bool(op: BinOp, lhs: bool, rhs: bool) -> Node {
    match op {
        BinOp::And => Node::Bool(lhs && rhs),
        BinOp::Or => Node::Bool(lhs || rhs),
        BinOp::Eq => Node::Bool(lhs == rhs),
        BinOp::Ne => Node::Bool(lhs != rhs),
        BinOp::Not => Node::Bool(!rhs),
        _ => Node::Undefined,
    }
}

/// Evaluate arguments, ask the context chain, then the process-wide
/// fallback hook. Zero-argument calls skip argument evaluation.
fn eval_call(ctx: &dyn Context, call: &CallExpr) -> Node {
    let args: Vec<Node> = if call.args.is_empty() {
        Vec::new()
    } else {
        call.args.iter().map(|arg| eval(ctx, arg)).collect()
    };
    let ret = ctx.call(call, &args);
    if !ret.is_undefined() {
        return ret;
    }
    match CALL_FALLBACK.get() {
        Some(hook) => {
            debug!(name = %call.name, "call fallback consulted");
            hook(ctx, call, &args)
        }
        None => Node::Undefined,
    }
}

// ----------------------------------------------------------------------
// Statement helpers
// ----------------------------------------------------------------------

/// Whether the statement carries grouping dimensions.
pub fn has_dimensions(expr: &Expr) -> bool {
    matches!(expr, Expr::Select(SelectStatement { dimensions: Some(_), .. }))
}

/// The statement's topic, segments joined with `/`.
pub fn topic(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Select(SelectStatement { topic: Some(segments), .. }) => {
            Some(segments.join("/"))
        }
        _ => None,
    }
}

/// The statement's window metadata, if its dimensions carry one.
pub fn window(expr: &Expr) -> Option<&Window> {
    match expr {
        Expr::Select(SelectStatement {
            dimensions: Some(dims),
            ..
        }) => dims.window.as_ref(),
        _ => None,
    }
}

/// Resolve each dimension path and join the stringified values with `-`
/// into the group key.
pub fn eval_dimensions(ctx: &dyn Context, paths: &[String]) -> Node {
    if paths.is_empty() {
        return Node::Undefined;
    }
    let chained = MultiContext::new(vec![&DEFAULT_CONTEXT as &dyn Context, ctx]);
    let keys: Vec<String> = paths
        .iter()
        .map(|path| chained.value(path).string())
        .collect();
    Node::String(keys.join("-"))
}
