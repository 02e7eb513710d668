//! Postgres dialect: extends ANSI with ILIKE, `$n` placeholders, `E'...'`
//! escape strings, dollar quoting, `::` casts, and the JSON arrows.

use crate::dialect::{ansi, Dialect, FunctionClass, PlaceholderStyle};
use crate::parser::expr;
use crate::token::TokenKind as K;

const AGGREGATES: &[&str] = &[
    "json_agg",
    "jsonb_agg",
    "json_object_agg",
    "jsonb_object_agg",
    "percentile_cont",
    "percentile_disc",
];

const GENERATORS: &[&str] = &[
    "gen_random_uuid",
    "clock_timestamp",
    "statement_timestamp",
    "transaction_timestamp",
    "txid_current",
];

const TABLE_VALUED: &[&str] = &[
    "json_array_elements",
    "jsonb_array_elements",
    "regexp_split_to_table",
];

const PASSTHROUGH: &[&str] = &[
    "to_json",
    "to_jsonb",
    "json_build_object",
    "jsonb_build_object",
    "age",
    "justify_days",
    "quote_ident",
    "quote_literal",
];

/// The Postgres dialect. Case-insensitive (lowercase-folding) identifiers,
/// `public` default schema, `$n` placeholders.
pub fn postgres() -> Dialect {
    let builder = ansi()
        .extend("postgres")
        .default_schema("public")
        .placeholder(PlaceholderStyle::Dollar)
        .escape_strings(true)
        .dollar_strings(true)
        .concat_null_as_empty(true)
        .operator("::", K::DOUBLE_COLON)
        .operator("->", K::ARROW);

    let (builder, ilike) = builder.dynamic_keyword("ILIKE");
    let json_text_arrow = K::register("JSON_TEXT_ARROW");

    builder
        .operator("->>", json_text_arrow)
        .infix(ilike, expr::P_CMP, expr::infix_like)
        .infix(K::DOUBLE_COLON, expr::P_POSTFIX, expr::infix_cast)
        .infix(K::LBRACKET, expr::P_POSTFIX, expr::infix_index)
        .infix(K::ARROW, expr::P_POSTFIX, expr::infix_binary)
        .infix(json_text_arrow, expr::P_POSTFIX, expr::infix_binary)
        .classify(FunctionClass::Aggregate, AGGREGATES)
        .classify(FunctionClass::Generator, GENERATORS)
        .classify(FunctionClass::TableValued, TABLE_VALUED)
        .classify(FunctionClass::Passthrough, PASSTHROUGH)
        .build()
}
