//! Render/reparse stability for expressions.
//!
//! Rendering a parsed expression and parsing the rendering again must reach
//! a fixed point after one step: the second rendering equals the first.
//! This pins the renderer and the Pratt tables against each other for the
//! dialect's expression forms (lists, structs, lambdas, indexing included).

use rstest::rstest;
use sqltrace_core::ast::{Expr, SelectItem};
use sqltrace_core::{dialect, parse};

fn rendered(expr_sql: &str) -> String {
    let sql = format!("SELECT {expr_sql}");
    let stmt = parse(&sql, &dialect::duckdb())
        .unwrap_or_else(|e| panic!("parse failed for {sql:?}: {e}"));
    let SelectItem::Expr { expr, .. } = &stmt.body.left.items[0] else {
        panic!("expected an expression item for {sql:?}");
    };
    expr.to_string()
}

#[rstest]
#[case("x + y * z")]
#[case("(x + y) * z")]
#[case("a.b")]
#[case("a = 1 AND b < 2 OR c >= 3")]
#[case("NOT a AND b")]
#[case("-x + +y")]
#[case("x || 'suffix'")]
#[case("x // 2 % 3")]
#[case("'it''s quoted'")]
#[case("count(*)")]
#[case("sum(DISTINCT x)")]
#[case("coalesce(a, b, 0)")]
#[case("sum(x) FILTER (WHERE x > 0)")]
#[case("sum(x) OVER (PARTITION BY y ORDER BY z DESC)")]
#[case("row_number() OVER w")]
#[case("CASE WHEN a THEN 1 ELSE 2 END")]
#[case("CASE x WHEN 1 THEN 'one' WHEN 2 THEN 'two' END")]
#[case("CAST(x AS int)")]
#[case("x IS NOT NULL")]
#[case("x IS TRUE")]
#[case("a IN (1, 2, 3)")]
#[case("a NOT IN (1, 2)")]
#[case("a BETWEEN 1 AND 2")]
#[case("a NOT BETWEEN 1 AND 2")]
#[case("name LIKE '%a%' ESCAPE '!'")]
#[case("name ILIKE '%a%'")]
#[case("[1, 2, 3]")]
#[case("[]")]
#[case("{'a': 1, 'b': x}")]
#[case("x -> x + 1")]
#[case("(x, y) -> x + y")]
#[case("x -> x -> x + 1")]
#[case("items[1]")]
#[case("items[1:2]")]
#[case("items[:2]")]
#[case("items[1:]")]
#[case("list_transform([1, 2, 3], x -> x * 2)")]
fn render_reparse_reaches_a_fixed_point(#[case] input: &str) {
    let once = rendered(input);
    let twice = rendered(&once);
    assert_eq!(once, twice, "rendering is not stable for {input:?}");
}

#[test]
fn cast_operator_renders_as_cast_call() {
    assert_eq!(rendered("x::int"), "CAST(x AS int)");
    assert_eq!(rendered("x::decimal(10,2)"), "CAST(x AS decimal(10,2))");
    assert_eq!(rendered("x::int[]"), "CAST(x AS int[])");
}

#[test]
fn lambda_shapes() {
    let sql = "SELECT list_filter(xs, (a, b) -> a + b)";
    let stmt = parse(sql, &dialect::duckdb()).unwrap();
    let SelectItem::Expr { expr, .. } = &stmt.body.left.items[0] else {
        panic!("expected expression");
    };
    let Expr::FuncCall { args, .. } = expr else {
        panic!("expected call");
    };
    let Expr::Lambda { params, .. } = &args[1] else {
        panic!("expected lambda argument, got {:?}", args[1]);
    };
    let names: Vec<&str> = params.iter().map(|p| p.value.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[test]
fn index_shapes() {
    for (sql, is_slice) in [("xs[1]", false), ("xs[1:2]", true), ("xs[:]", true)] {
        let stmt = parse(&format!("SELECT {sql}"), &dialect::duckdb()).unwrap();
        let SelectItem::Expr { expr, .. } = &stmt.body.left.items[0] else {
            panic!("expected expression");
        };
        let Expr::Index { index, .. } = expr else {
            panic!("expected index expression for {sql:?}");
        };
        assert_eq!(
            matches!(index, sqltrace_core::ast::IndexOp::Slice { .. }),
            is_slice,
            "{sql:?}"
        );
    }
}
