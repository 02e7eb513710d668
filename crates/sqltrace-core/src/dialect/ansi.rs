//! Base ANSI dialect: the keyword/operator/clause/function tables every
//! shipped dialect extends.

use crate::dialect::{
    Dialect, DialectBuilder, FunctionClass, JoinTypeDef, Normalization, PlaceholderStyle,
};
use crate::parser::{
    clause_group_by, clause_having, clause_limit, clause_offset, clause_order_by, clause_window,
    expr,
};
use crate::token::TokenKind as K;

const AGGREGATES: &[&str] = &[
    "sum",
    "count",
    "avg",
    "min",
    "max",
    "stddev",
    "stddev_pop",
    "stddev_samp",
    "variance",
    "var_pop",
    "var_samp",
    "corr",
    "covar_pop",
    "covar_samp",
    "array_agg",
    "string_agg",
    "bool_and",
    "bool_or",
];

const WINDOW_FUNCTIONS: &[&str] = &[
    "row_number",
    "rank",
    "dense_rank",
    "percent_rank",
    "cume_dist",
    "ntile",
    "lag",
    "lead",
    "first_value",
    "last_value",
    "nth_value",
];

const GENERATORS: &[&str] = &[
    "now",
    "random",
    "uuid",
    "current_date",
    "current_time",
    "current_timestamp",
    "current_user",
    "session_user",
    "localtime",
    "localtimestamp",
];

const TABLE_VALUED: &[&str] = &["generate_series", "unnest"];

// Unknown functions default to Passthrough; listing the common ones anyway
// keeps the classification table an explicit inventory.
const PASSTHROUGH: &[&str] = &[
    "coalesce",
    "nullif",
    "lower",
    "upper",
    "trim",
    "ltrim",
    "rtrim",
    "substring",
    "substr",
    "replace",
    "length",
    "abs",
    "round",
    "floor",
    "ceil",
    "concat",
    "left",
    "right",
    "greatest",
    "least",
    "mod",
    "sign",
    "sqrt",
    "exp",
    "ln",
    "log",
    "power",
    "position",
    "initcap",
    "reverse",
    "lpad",
    "rpad",
    "split_part",
    "strpos",
    "translate",
    "to_char",
    "to_date",
    "to_number",
    "date_trunc",
    "date_part",
];

/// The base ANSI dialect. Case-insensitive identifiers, `"` quoting, `?`
/// placeholders, no default schema.
pub fn ansi() -> Dialect {
    let builder = DialectBuilder::new("ansi")
        .ident_quote('"')
        .normalization(Normalization::CaseInsensitive)
        .default_schema("")
        .placeholder(PlaceholderStyle::QuestionMark)
        .pipe_is_concat(true)
        .concat_null_as_empty(false);

    let builder = keywords(builder);
    let builder = operators(builder);
    let builder = expressions(builder);
    let builder = clauses(builder);
    let builder = joins(builder);

    builder
        .classify(FunctionClass::Aggregate, AGGREGATES)
        .classify(FunctionClass::Window, WINDOW_FUNCTIONS)
        .classify(FunctionClass::Generator, GENERATORS)
        .classify(FunctionClass::TableValued, TABLE_VALUED)
        .classify(FunctionClass::Passthrough, PASSTHROUGH)
        .function_alias("ifnull", "coalesce")
        .function_alias("nvl", "coalesce")
        .function_alias("ceiling", "ceil")
        .function_alias("lcase", "lower")
        .function_alias("ucase", "upper")
        .function_alias("char_length", "length")
        .function_alias("character_length", "length")
        .function_alias("mean", "avg")
        .function_alias("every", "bool_and")
        .function_alias("some", "bool_or")
        .build()
}

fn keywords(builder: DialectBuilder) -> DialectBuilder {
    builder
        .keyword("SELECT", K::SELECT)
        .keyword("FROM", K::FROM)
        .keyword("WHERE", K::WHERE)
        .keyword("GROUP", K::GROUP)
        .keyword("BY", K::BY)
        .keyword("HAVING", K::HAVING)
        .keyword("ORDER", K::ORDER)
        .keyword("LIMIT", K::LIMIT)
        .keyword("OFFSET", K::OFFSET)
        .keyword("AS", K::AS)
        .keyword("ON", K::ON)
        .keyword("USING", K::USING)
        .keyword("JOIN", K::JOIN)
        .keyword("INNER", K::INNER)
        .keyword("LEFT", K::LEFT)
        .keyword("RIGHT", K::RIGHT)
        .keyword("FULL", K::FULL)
        .keyword("OUTER", K::OUTER)
        .keyword("CROSS", K::CROSS)
        .keyword("NATURAL", K::NATURAL)
        .keyword("AND", K::AND)
        .keyword("OR", K::OR)
        .keyword("NOT", K::NOT)
        .keyword("IN", K::IN)
        .keyword("IS", K::IS)
        .keyword("NULL", K::NULL)
        .keyword("LIKE", K::LIKE)
        .keyword("BETWEEN", K::BETWEEN)
        .keyword("CASE", K::CASE)
        .keyword("WHEN", K::WHEN)
        .keyword("THEN", K::THEN)
        .keyword("ELSE", K::ELSE)
        .keyword("END", K::END)
        .keyword("CAST", K::CAST)
        .keyword("DISTINCT", K::DISTINCT)
        .keyword("ALL", K::ALL)
        .keyword("UNION", K::UNION)
        .keyword("INTERSECT", K::INTERSECT)
        .keyword("EXCEPT", K::EXCEPT)
        .keyword("WITH", K::WITH)
        .keyword("RECURSIVE", K::RECURSIVE)
        .keyword("TRUE", K::TRUE)
        .keyword("FALSE", K::FALSE)
        .keyword("EXISTS", K::EXISTS)
        .keyword("OVER", K::OVER)
        .keyword("PARTITION", K::PARTITION)
        .keyword("ROWS", K::ROWS)
        .keyword("RANGE", K::RANGE)
        .keyword("UNBOUNDED", K::UNBOUNDED)
        .keyword("PRECEDING", K::PRECEDING)
        .keyword("FOLLOWING", K::FOLLOWING)
        .keyword("CURRENT", K::CURRENT)
        .keyword("ROW", K::ROW)
        .keyword("WINDOW", K::WINDOW)
        .keyword("LATERAL", K::LATERAL)
        .keyword("ASC", K::ASC)
        .keyword("DESC", K::DESC)
        .keyword("NULLS", K::NULLS)
        .keyword("FIRST", K::FIRST)
        .keyword("LAST", K::LAST)
        .keyword("FILTER", K::FILTER)
        .keyword("MATERIALIZED", K::MATERIALIZED)
        .keyword("ESCAPE", K::ESCAPE)
        .keyword("FOR", K::FOR)
}

fn operators(builder: DialectBuilder) -> DialectBuilder {
    builder
        .operator("<=", K::LTE)
        .operator(">=", K::GTE)
        .operator("<>", K::NEQ)
        .operator("!=", K::NEQ)
        .operator("||", K::CONCAT)
}

fn expressions(builder: DialectBuilder) -> DialectBuilder {
    builder
        // Prefix positions. A few keyword kinds double as identifier heads
        // so that `left(s, 3)` or a column named `left` still parse.
        .prefix(K::IDENT, expr::prefix_ident)
        .prefix(K::QUOTED_IDENT, expr::prefix_ident)
        .prefix(K::LEFT, expr::prefix_ident)
        .prefix(K::RIGHT, expr::prefix_ident)
        .prefix(K::FILTER, expr::prefix_ident)
        .prefix(K::NUMBER, expr::prefix_number)
        .prefix(K::STRING, expr::prefix_string)
        .prefix(K::TRUE, expr::prefix_bool)
        .prefix(K::FALSE, expr::prefix_bool)
        .prefix(K::NULL, expr::prefix_null)
        .prefix(K::PLACEHOLDER, expr::prefix_placeholder)
        .prefix(K::MINUS, expr::prefix_sign)
        .prefix(K::PLUS, expr::prefix_sign)
        .prefix(K::NOT, expr::prefix_not)
        .prefix(K::CASE, expr::prefix_case)
        .prefix(K::CAST, expr::prefix_cast)
        .prefix(K::EXISTS, expr::prefix_exists)
        .prefix(K::LPAREN, expr::prefix_lparen)
        .prefix(K::STAR, expr::prefix_star)
        // Infix positions on the standard ladder.
        .infix(K::OR, expr::P_OR, expr::infix_binary)
        .infix(K::AND, expr::P_AND, expr::infix_binary)
        .infix(K::EQ, expr::P_CMP, expr::infix_binary)
        .infix(K::NEQ, expr::P_CMP, expr::infix_binary)
        .infix(K::LT, expr::P_CMP, expr::infix_binary)
        .infix(K::LTE, expr::P_CMP, expr::infix_binary)
        .infix(K::GT, expr::P_CMP, expr::infix_binary)
        .infix(K::GTE, expr::P_CMP, expr::infix_binary)
        .infix(K::IS, expr::P_CMP, expr::infix_is)
        .infix(K::LIKE, expr::P_CMP, expr::infix_like)
        .infix(K::IN, expr::P_CMP, expr::infix_in)
        .infix(K::BETWEEN, expr::P_CMP, expr::infix_between)
        .infix(K::NOT, expr::P_CMP, expr::infix_not)
        .infix(K::CONCAT, expr::P_CONCAT, expr::infix_binary)
        .infix(K::PLUS, expr::P_ADD, expr::infix_binary)
        .infix(K::MINUS, expr::P_ADD, expr::infix_binary)
        .infix(K::STAR, expr::P_MUL, expr::infix_binary)
        .infix(K::SLASH, expr::P_MUL, expr::infix_binary)
        .infix(K::PERCENT, expr::P_MUL, expr::infix_binary)
}

fn clauses(builder: DialectBuilder) -> DialectBuilder {
    builder
        .clause(K::GROUP, clause_group_by)
        .clause(K::HAVING, clause_having)
        .clause(K::WINDOW, clause_window)
        .clause(K::ORDER, clause_order_by)
        .clause(K::LIMIT, clause_limit)
        .clause(K::OFFSET, clause_offset)
}

fn joins(builder: DialectBuilder) -> DialectBuilder {
    builder
        .join_type(
            K::INNER,
            JoinTypeDef {
                name: "INNER",
                requires_on: true,
                allows_using: true,
            },
        )
        .join_type(
            K::LEFT,
            JoinTypeDef {
                name: "LEFT",
                requires_on: true,
                allows_using: true,
            },
        )
        .join_type(
            K::RIGHT,
            JoinTypeDef {
                name: "RIGHT",
                requires_on: true,
                allows_using: true,
            },
        )
        .join_type(
            K::FULL,
            JoinTypeDef {
                name: "FULL",
                requires_on: true,
                allows_using: true,
            },
        )
        .join_type(
            K::CROSS,
            JoinTypeDef {
                name: "CROSS",
                requires_on: false,
                allows_using: false,
            },
        )
}
