//! # TDTL - Abstract Syntax Tree
//!
//! The expression shapes the evaluator consumes. The grammar and parser
//! that produce them live outside this crate; everything here is the
//! contract between the two.
//!
//! ## Architecture Overview
//!
//! - **[operators]** - The closed, exported binary operator enumeration
//! - **[expressions]** - Expression nodes (select statements, fields,
//!   filters, calls, switches, path references, literal values)
//!
//! ## Statement shape
//!
//! A statement arrives as a [`SelectStatement`](expressions::SelectStatement):
//!
//! ```text
//! insert into <target> select <fields> [where <filter>] [group by <dimensions>]
//! ```
//!
//! Field expressions reference source entities through dotted JSON paths
//! (`entity1.property1`), combine them with binary operators and function
//! calls, and land in the projection under their alias.

pub mod expressions;
pub mod operators;

pub use expressions::{
    CallExpr, CaseArm, Dimensions, Expr, Field, SelectStatement, Window, WindowKind,
};
pub use operators::BinOp;
