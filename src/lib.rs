pub mod ast;
pub mod context;
pub mod document;
pub mod evaluator;
pub mod path;
pub mod scanner;
pub mod value;

pub use ast::{BinOp, CallExpr, CaseArm, Dimensions, Expr, Field, SelectStatement, Window, WindowKind};
pub use context::{Context, DefaultContext, MapContext, MultiContext};
pub use document::{DocumentError, JsonNode};
pub use evaluator::{
    eval_dimensions, eval_filter, eval_rule_ql, eval_select, has_dimensions, set_call_fallback,
    topic, window,
};
pub use path::{Path, PathError, Segment};
pub use value::{datatype, Node, Type};
