use tdtl::{
    eval_dimensions, eval_filter, eval_rule_ql, eval_select, has_dimensions, topic, window,
    BinOp, CallExpr, CaseArm, Context, Dimensions, Expr, Field, MapContext, MultiContext, Node,
    SelectStatement, Window, WindowKind,
};

// Helper constructors to build AST for testing
fn path(p: &str) -> Expr {
    Expr::JsonPath(p.to_string())
}

fn lit(n: impl Into<Node>) -> Expr {
    Expr::Literal(n.into())
}

fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

fn call(name: &str, args: Vec<Expr>) -> Expr {
    Expr::Call(CallExpr {
        name: name.to_string(),
        args,
    })
}

fn select(fields: Vec<Field>) -> Expr {
    Expr::Select(SelectStatement {
        fields,
        filter: None,
        topic: None,
        dimensions: None,
    })
}

fn select_where(fields: Vec<Field>, filter: Expr) -> Expr {
    Expr::Select(SelectStatement {
        fields,
        filter: Some(Box::new(filter)),
        topic: None,
        dimensions: None,
    })
}

fn ctx(pairs: &[(&str, Node)]) -> MapContext {
    let mut ctx = MapContext::new();
    for (key, value) in pairs {
        ctx.insert(*key, value.clone());
    }
    ctx
}

// ============================================================================
// Projection
// ============================================================================

#[test]
fn test_projection_with_rename_and_concat() {
    // insert into t select e1.p1 as p1, e2.p2.name as p2,
    //                      e1.p1 + '/' + e2.p3 as p3
    let stmt = select(vec![
        Field::new(path("e1.p1"), "p1"),
        Field::new(path("e2.p2.name"), "p2"),
        Field::new(
            binary(
                BinOp::Add,
                binary(BinOp::Add, path("e1.p1"), lit("/")),
                path("e2.p3"),
            ),
            "p3",
        ),
    ]);
    let ctx = ctx(&[
        ("e1.p1", Node::from("123")),
        ("e2.p2.name", Node::from("g123")),
        ("e2.p3", Node::from("d123")),
    ]);

    let result = eval_select(&ctx, &stmt);
    assert_eq!(
        result.string(),
        r#"{"p1":"123","p2":"g123","p3":"123/d123"}"#
    );
}

#[test]
fn test_projection_preserves_declaration_order() {
    let stmt = select(vec![
        Field::new(lit(1i64), "z"),
        Field::new(lit(2i64), "a"),
        Field::new(lit(3i64), "m"),
    ]);
    let result = eval_select(&MapContext::new(), &stmt);
    assert_eq!(result.string(), r#"{"z":1,"a":2,"m":3}"#);
}

#[test]
fn test_projection_skips_failed_fields() {
    let stmt = select(vec![
        Field::new(path("e.present"), "ok"),
        Field::new(path("e.absent"), "gone"),
        Field::new(lit(5i64), "tail"),
    ]);
    let ctx = ctx(&[("e.present", Node::from("v"))]);
    let result = eval_rule_ql(&ctx, &stmt);
    assert_eq!(result.string(), r#"{"ok":"v","tail":5}"#);
}

#[test]
fn test_projection_drops_fields_without_alias() {
    let stmt = select(vec![
        Field::new(lit(1i64), "kept"),
        Field::new(lit(2i64), ""),
    ]);
    let result = eval_select(&MapContext::new(), &stmt);
    assert_eq!(result.string(), r#"{"kept":1}"#);
}

#[test]
fn test_projection_dotted_alias_nests() {
    let stmt = select(vec![Field::new(lit("test/sub"), "sysField.spacePath")]);
    let result = eval_select(&MapContext::new(), &stmt);
    assert_eq!(result.string(), r#"{"sysField":{"spacePath":"test/sub"}}"#);
}

#[test]
fn test_eval_select_rejects_non_statements() {
    assert!(eval_select(&MapContext::new(), &lit(1i64)).is_undefined());
}

// ============================================================================
// Concatenation and numeric promotion
// ============================================================================

#[test]
fn test_concat_with_numeric_promotion() {
    // e.a + '/' + e.b with a=42 (Int), b=1.5 (Float)
    let expr = binary(
        BinOp::Add,
        binary(BinOp::Add, path("e.a"), lit("/")),
        path("e.b"),
    );
    let ctx = ctx(&[("e.a", Node::Int(42)), ("e.b", Node::Float(1.5))]);
    assert_eq!(eval_rule_ql(&ctx, &expr), Node::from("42/1.500000"));
}

#[test]
fn test_string_string_add_concatenates() {
    let expr = binary(BinOp::Add, lit("foo"), lit("bar"));
    assert_eq!(eval_rule_ql(&MapContext::new(), &expr), Node::from("foobar"));
}

// ============================================================================
// Binary operator matrix
// ============================================================================

fn eval_bin(op: BinOp, lhs: Node, rhs: Node) -> Node {
    eval_rule_ql(&MapContext::new(), &binary(op, lit(lhs), lit(rhs)))
}

#[test]
fn test_int_arithmetic() {
    assert_eq!(eval_bin(BinOp::Add, Node::Int(2), Node::Int(3)), Node::Int(5));
    assert_eq!(eval_bin(BinOp::Sub, Node::Int(2), Node::Int(3)), Node::Int(-1));
    assert_eq!(eval_bin(BinOp::Mul, Node::Int(4), Node::Int(3)), Node::Int(12));
    assert_eq!(eval_bin(BinOp::Div, Node::Int(9), Node::Int(2)), Node::Int(4));
    assert_eq!(eval_bin(BinOp::Mod, Node::Int(9), Node::Int(2)), Node::Int(1));
}

#[test]
fn test_mixed_arithmetic_promotes_to_float() {
    assert_eq!(
        eval_bin(BinOp::Add, Node::Int(2), Node::Float(0.5)),
        Node::Float(2.5)
    );
    assert_eq!(
        eval_bin(BinOp::Mul, Node::Float(1.5), Node::Int(2)),
        Node::Float(3.0)
    );
}

#[test]
fn test_divide_by_zero_is_undefined() {
    assert!(eval_bin(BinOp::Div, Node::Int(10), Node::Int(0)).is_undefined());
    assert!(eval_bin(BinOp::Div, Node::Int(10), Node::Float(0.0)).is_undefined());
    assert!(eval_bin(BinOp::Mod, Node::Int(10), Node::Int(0)).is_undefined());
}

#[test]
fn test_string_operand_coerces_to_number() {
    assert_eq!(
        eval_bin(BinOp::Sub, Node::from("10"), Node::Int(4)),
        Node::Int(6)
    );
    assert_eq!(
        eval_bin(BinOp::Mul, Node::Int(3), Node::from("2.5")),
        Node::Float(7.5)
    );
    assert!(eval_bin(BinOp::Sub, Node::from("abc"), Node::Int(1)).is_undefined());
}

#[test]
fn test_string_comparison_is_lexicographic() {
    assert_eq!(
        eval_bin(BinOp::Lt, Node::from("a"), Node::from("b")),
        Node::Bool(true)
    );
    assert_eq!(
        eval_bin(BinOp::Lt, Node::from("b"), Node::from("a")),
        Node::Bool(false)
    );
    assert_eq!(
        eval_bin(BinOp::Eq, Node::from("a"), Node::from("a")),
        Node::Bool(true)
    );
    assert_eq!(
        eval_bin(BinOp::Ne, Node::from("a"), Node::from("b")),
        Node::Bool(true)
    );
}

#[test]
fn test_bool_algebra() {
    assert_eq!(
        eval_bin(BinOp::And, Node::Bool(true), Node::Bool(false)),
        Node::Bool(false)
    );
    assert_eq!(
        eval_bin(BinOp::Or, Node::Bool(false), Node::Bool(true)),
        Node::Bool(true)
    );
    assert_eq!(
        eval_bin(BinOp::Not, Node::Bool(true), Node::Bool(true)),
        Node::Bool(false)
    );
    assert_eq!(
        eval_bin(BinOp::Eq, Node::Bool(true), Node::from("true")),
        Node::Bool(true)
    );
}

#[test]
fn test_json_operand_in_comparisons_is_false() {
    let json = Node::from_raw(r#"{"a":1}"#);
    assert_eq!(
        eval_bin(BinOp::Eq, json.clone(), Node::Int(1)),
        Node::Bool(false)
    );
    // Logic operators demote the document operand to false.
    assert_eq!(
        eval_bin(BinOp::Or, json.clone(), Node::Bool(true)),
        Node::Bool(true)
    );
    assert_eq!(
        eval_bin(BinOp::And, Node::Bool(true), json),
        Node::Bool(false)
    );
}

#[test]
fn test_type_mismatches_are_undefined() {
    assert!(eval_bin(BinOp::Add, Node::Int(1), Node::Bool(true)).is_undefined());
    assert!(eval_bin(BinOp::Add, Node::Bool(true), Node::Int(1)).is_undefined());
    assert!(eval_bin(
        BinOp::Sub,
        Node::from_raw("[1]"),
        Node::Int(1)
    )
    .is_undefined());
}

// ============================================================================
// Filtering
// ============================================================================

#[test]
fn test_filter_absent_passes() {
    let stmt = select(vec![Field::new(lit(1i64), "a")]);
    assert!(eval_filter(&MapContext::new(), &stmt));
}

#[test]
fn test_filter_boolean_result_decides() {
    let pass = select_where(
        vec![Field::new(lit(1i64), "a")],
        binary(BinOp::Gt, path("e.n"), lit(10i64)),
    );
    let ctx = ctx(&[("e.n", Node::Int(20))]);
    assert!(eval_filter(&ctx, &pass));

    let reject = select_where(
        vec![Field::new(lit(1i64), "a")],
        binary(BinOp::Lt, path("e.n"), lit(10i64)),
    );
    assert!(!eval_filter(&ctx, &reject));
}

#[test]
fn test_filter_non_boolean_rejects() {
    let stmt = select_where(vec![Field::new(lit(1i64), "a")], lit(5i64));
    assert!(!eval_filter(&MapContext::new(), &stmt));

    let undefined = select_where(vec![Field::new(lit(1i64), "a")], path("e.missing"));
    assert!(!eval_filter(&MapContext::new(), &undefined));
}

#[test]
fn test_filter_bare_field_list_rejects() {
    let fields = Expr::Fields(vec![Field::new(lit(1i64), "a")]);
    assert!(!eval_filter(&MapContext::new(), &fields));
}

#[test]
fn test_filter_plain_expression() {
    let expr = binary(BinOp::Eq, lit("x"), lit("x"));
    assert!(eval_filter(&MapContext::new(), &expr));
}

// ============================================================================
// Switch
// ============================================================================

fn switch(exp: Expr, cases: Vec<(Expr, Expr)>, default: Option<Expr>) -> Expr {
    Expr::Switch {
        exp: Box::new(exp),
        cases: cases
            .into_iter()
            .map(|(when, then)| CaseArm { when, then })
            .collect(),
        default: default.map(Box::new),
    }
}

#[test]
fn test_switch_first_match_wins() {
    let expr = switch(
        path("e.k"),
        vec![(lit("a"), lit(1i64)), (lit("b"), lit(2i64))],
        Some(lit(0i64)),
    );
    let ctx = ctx(&[("e.k", Node::from("b"))]);
    assert_eq!(eval_rule_ql(&ctx, &expr), Node::Int(2));
}

#[test]
fn test_switch_falls_back_to_default() {
    let expr = switch(
        path("e.k"),
        vec![(lit("a"), lit(1i64)), (lit("b"), lit(2i64))],
        Some(lit(0i64)),
    );
    let ctx = ctx(&[("e.k", Node::from("c"))]);
    assert_eq!(eval_rule_ql(&ctx, &expr), Node::Int(0));
}

#[test]
fn test_switch_without_default_is_undefined() {
    let expr = switch(path("e.k"), vec![(lit("a"), lit(1i64))], None);
    let ctx = ctx(&[("e.k", Node::from("z"))]);
    assert!(eval_rule_ql(&ctx, &expr).is_undefined());
}

#[test]
fn test_switch_undefined_scrutinee_never_matches() {
    // Even an arm whose `when` also evaluates to Undefined must not match.
    let expr = switch(
        path("e.absent"),
        vec![(path("e.also_absent"), lit(1i64))],
        Some(lit(9i64)),
    );
    assert_eq!(eval_rule_ql(&MapContext::new(), &expr), Node::Int(9));
}

// ============================================================================
// Calls and contexts
// ============================================================================

#[test]
fn test_builtin_calls() {
    let ctx = MapContext::new();
    assert_eq!(
        eval_rule_ql(&ctx, &call("upper", vec![lit("abc")])),
        Node::from("ABC")
    );
    assert_eq!(
        eval_rule_ql(&ctx, &call("concat", vec![lit("a"), lit(1i64)])),
        Node::from("a1")
    );
    assert_eq!(
        eval_rule_ql(&ctx, &call("length", vec![lit("abcd")])),
        Node::Int(4)
    );
    assert_eq!(
        eval_rule_ql(&ctx, &call("matches", vec![lit("h2o"), lit("^h[0-9]o$")])),
        Node::Bool(true)
    );
}

#[test]
fn test_unknown_call_is_undefined() {
    assert!(eval_rule_ql(&MapContext::new(), &call("nope", vec![lit(1i64)])).is_undefined());
}

#[test]
fn test_builtin_type_mismatch_is_undefined() {
    assert!(eval_rule_ql(&MapContext::new(), &call("upper", vec![lit(3i64)])).is_undefined());
}

struct Doubler;

impl Context for Doubler {
    fn value(&self, _path: &str) -> Node {
        Node::Undefined
    }

    fn call(&self, call: &CallExpr, args: &[Node]) -> Node {
        match (call.name.as_str(), args) {
            ("double", [Node::Int(n)]) => Node::Int(n * 2),
            _ => Node::Undefined,
        }
    }
}

#[test]
fn test_user_context_dispatches_calls() {
    let expr = call("double", vec![lit(21i64)]);
    assert_eq!(eval_rule_ql(&Doubler, &expr), Node::Int(42));
}

#[test]
fn test_multi_context_first_answer_wins() {
    let a = ctx(&[("k", Node::from("first"))]);
    let b = ctx(&[("k", Node::from("second")), ("only_b", Node::Int(1))]);
    let chained = MultiContext::new(vec![&a, &b]);
    assert_eq!(chained.value("k"), Node::from("first"));
    assert_eq!(chained.value("only_b"), Node::Int(1));
    assert!(chained.value("missing").is_undefined());
}

// ============================================================================
// Statement helpers
// ============================================================================

fn statement_with_dimensions() -> Expr {
    Expr::Select(SelectStatement {
        fields: vec![Field::new(lit(1i64), "a")],
        filter: None,
        topic: Some(vec!["core".into(), "events".into(), "device1".into()]),
        dimensions: Some(Dimensions {
            paths: vec!["e.region".into(), "e.kind".into()],
            window: Some(Window {
                kind: WindowKind::Sliding,
                length_ms: 60_000,
                interval_ms: 10_000,
            }),
        }),
    })
}

#[test]
fn test_has_dimensions() {
    assert!(has_dimensions(&statement_with_dimensions()));
    let plain = select(vec![Field::new(lit(1i64), "a")]);
    assert!(!has_dimensions(&plain));
    assert!(!has_dimensions(&lit(1i64)));
}

#[test]
fn test_topic_joins_segments() {
    assert_eq!(
        topic(&statement_with_dimensions()),
        Some("core/events/device1".to_string())
    );
    let plain = select(vec![Field::new(lit(1i64), "a")]);
    assert_eq!(topic(&plain), None);
}

#[test]
fn test_window_surfaces_metadata() {
    let stmt = statement_with_dimensions();
    let win = window(&stmt).expect("window present");
    assert_eq!(win.kind, WindowKind::Sliding);
    assert_eq!(win.length_ms, 60_000);
    let plain = select(vec![Field::new(lit(1i64), "a")]);
    assert!(window(&plain).is_none());
}

#[test]
fn test_eval_dimensions_joins_path_values() {
    let ctx = ctx(&[("e.region", Node::from("eu")), ("e.kind", Node::Int(3))]);
    let dims = eval_dimensions(&ctx, &["e.region".to_string(), "e.kind".to_string()]);
    assert_eq!(dims, Node::from("eu-3"));
    assert!(eval_dimensions(&ctx, &[]).is_undefined());
}
