use crate::ast::BinOp;
use crate::value::Node;

/// Abstract Syntax Tree node representing a parsed expression.
///
/// Produced by the (external) parser; consumed by the evaluator. Every
/// variant the evaluator does not recognize in a given position reduces
/// to `Undefined`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A full `insert into ... select ...` statement
    Select(SelectStatement),

    /// An ordered field list, outside of a full statement
    Fields(Vec<Field>),

    /// A boolean filter wrapper (`where ...`)
    Filter(Box<Expr>),

    /// Binary operation (arithmetic, comparison, logical)
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    /// Function call
    ///
    /// # Example
    /// ```text
    /// upper(entity1.name)
    /// ```
    Call(CallExpr),

    /// JSON-path dereference, resolved through the evaluation context
    ///
    /// # Example
    /// ```text
    /// entity2.property2.name
    /// ```
    JsonPath(String),

    /// `switch <exp> case <when> then <then> ... [else <last>]`
    Switch {
        exp: Box<Expr>,
        cases: Vec<CaseArm>,
        default: Option<Box<Expr>>,
    },

    /// Literal value (the leaf nodes are themselves values)
    Literal(Node),
}

/// A `(when, then)` arm of a switch expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseArm {
    pub when: Expr,
    pub then: Expr,
}

/// A projected field: expression plus output alias.
///
/// The alias is the key the result lands under in the projection; an
/// empty alias drops the field from the output.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub exp: Expr,
    pub alias: String,
}

impl Field {
    pub fn new(exp: Expr, alias: impl Into<String>) -> Field {
        Field {
            exp,
            alias: alias.into(),
        }
    }
}

/// A named function call with pre-parsed argument expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub name: String,
    pub args: Vec<Expr>,
}

/// The top-level statement shape.
///
/// # Example
/// ```text
/// insert into t select e1.p1 as p1, e1.p1 + '/' + e2.p3 as p3 where e1.p2 > 0
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    /// Projected fields, in declaration order
    pub fields: Vec<Field>,
    /// Optional boolean filter
    pub filter: Option<Box<Expr>>,
    /// Optional topic segments, joined with `/` when read
    pub topic: Option<Vec<String>>,
    /// Optional grouping dimensions + window metadata
    pub dimensions: Option<Dimensions>,
}

/// Grouping dimensions: the paths whose values key a group, plus the
/// window the group is evaluated over. Window execution is out of scope
/// here; the metadata is only surfaced.
#[derive(Debug, Clone, PartialEq)]
pub struct Dimensions {
    pub paths: Vec<String>,
    pub window: Option<Window>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    Sliding,
    Tumbling,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub kind: WindowKind,
    pub length_ms: i64,
    pub interval_ms: i64,
}
