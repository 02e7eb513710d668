//! DuckDB dialect: extends ANSI with QUALIFY, star modifiers, PIVOT/UNPIVOT,
//! lambdas, list/struct literals, integer division, ILIKE, and the extra
//! join types.

use crate::dialect::{ansi, Dialect, FunctionClass, JoinTypeDef};
use crate::parser::{
    clause_qualify, expr, from_pivot, from_unpivot, star_exclude, star_rename, star_replace,
};
use crate::token::TokenKind as K;

const AGGREGATES: &[&str] = &[
    "list",
    "histogram",
    "arg_max",
    "arg_min",
    "max_by",
    "min_by",
    "bit_and",
    "bit_or",
    "bit_xor",
    "median",
    "mode",
    "quantile",
    "quantile_cont",
    "quantile_disc",
    "approx_count_distinct",
    "product",
    "favg",
    "fsum",
    "group_concat",
    // Lambda-taking list functions carry the aggregate lineage contract:
    // report the function name, union the argument sources.
    "list_transform",
    "list_filter",
    "list_reduce",
    "list_aggregate",
    "array_transform",
    "array_filter",
    "array_reduce",
];

const GENERATORS: &[&str] = &["gen_random_uuid", "today", "get_current_timestamp", "version"];

const TABLE_VALUED: &[&str] = &[
    "range",
    "read_csv",
    "read_csv_auto",
    "read_parquet",
    "read_json",
    "read_json_auto",
    "glob",
];

const PASSTHROUGH: &[&str] = &[
    "list_contains",
    "list_extract",
    "list_sort",
    "len",
    "array_length",
    "struct_extract",
    "struct_pack",
    "regexp_matches",
    "regexp_replace",
    "regexp_extract",
    "date_diff",
    "date_add",
    "date_sub",
    "strftime",
    "strptime",
];

/// The DuckDB dialect. Case-insensitive identifiers (quoted ones included),
/// `main` default schema, `?` placeholders.
pub fn duckdb() -> Dialect {
    let builder = ansi()
        .extend("duckdb")
        .default_schema("main")
        .dollar_strings(true)
        .concat_null_as_empty(true)
        .operator("::", K::DOUBLE_COLON)
        .operator("//", K::SLASH_SLASH)
        .operator("->", K::ARROW);

    let (builder, qualify) = builder.dynamic_keyword("QUALIFY");
    let (builder, pivot) = builder.dynamic_keyword("PIVOT");
    let (builder, unpivot) = builder.dynamic_keyword("UNPIVOT");
    let (builder, exclude) = builder.dynamic_keyword("EXCLUDE");
    let (builder, replace) = builder.dynamic_keyword("REPLACE");
    let (builder, rename) = builder.dynamic_keyword("RENAME");
    let (builder, semi) = builder.dynamic_keyword("SEMI");
    let (builder, anti) = builder.dynamic_keyword("ANTI");
    let (builder, asof) = builder.dynamic_keyword("ASOF");
    let (builder, positional) = builder.dynamic_keyword("POSITIONAL");
    let (builder, ilike) = builder.dynamic_keyword("ILIKE");

    builder
        .clause_after(K::HAVING, qualify, clause_qualify)
        .from_item(pivot, from_pivot)
        .from_item(unpivot, from_unpivot)
        .star_modifier(exclude, star_exclude)
        .star_modifier(replace, star_replace)
        .star_modifier(rename, star_rename)
        // `replace(s, 'a', 'b')` stays callable even though REPLACE is a
        // star-modifier keyword here.
        .prefix(replace, expr::prefix_ident)
        .prefix(K::LBRACKET, expr::prefix_list)
        .prefix(K::LBRACE, expr::prefix_struct)
        .infix(ilike, expr::P_CMP, expr::infix_like)
        .infix(K::DOUBLE_COLON, expr::P_POSTFIX, expr::infix_cast)
        .infix(K::LBRACKET, expr::P_POSTFIX, expr::infix_index)
        .infix(K::SLASH_SLASH, expr::P_MUL, expr::infix_binary)
        .infix(K::ARROW, expr::P_LAMBDA, expr::infix_lambda)
        .join_type(
            semi,
            JoinTypeDef {
                name: "SEMI",
                requires_on: true,
                allows_using: true,
            },
        )
        .join_type(
            anti,
            JoinTypeDef {
                name: "ANTI",
                requires_on: true,
                allows_using: true,
            },
        )
        .join_type(
            asof,
            JoinTypeDef {
                name: "ASOF",
                requires_on: true,
                allows_using: false,
            },
        )
        .join_type(
            positional,
            JoinTypeDef {
                name: "POSITIONAL",
                requires_on: false,
                allows_using: false,
            },
        )
        .classify(FunctionClass::Aggregate, AGGREGATES)
        .classify(FunctionClass::Generator, GENERATORS)
        .classify(FunctionClass::TableValued, TABLE_VALUED)
        .classify(FunctionClass::Passthrough, PASSTHROUGH)
        .function_alias("list_apply", "list_transform")
        .function_alias("array_apply", "list_transform")
        .function_alias("apply", "list_transform")
        .function_alias("filter", "list_filter")
        .function_alias("aggregate", "list_aggregate")
        .function_alias("datepart", "date_part")
        .function_alias("datediff", "date_diff")
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extends_ansi_tables() {
        let dialect = duckdb();
        assert_eq!(dialect.name(), "duckdb");
        assert_eq!(dialect.default_schema(), "main");
        assert!(dialect.keyword_kind("SELECT").is_some());
        assert!(dialect.keyword_kind("QUALIFY").is_some());
        assert!(dialect.keyword_kind("PIVOT").is_some());
    }

    #[test]
    fn ansi_is_unaffected_by_the_extension() {
        assert!(ansi().keyword_kind("QUALIFY").is_none());
        assert!(ansi().keyword_kind("ILIKE").is_none());
    }

    #[test]
    fn lambda_list_functions_report_their_name() {
        let dialect = duckdb();
        assert_eq!(
            dialect.function_lineage("list_transform").1,
            FunctionClass::Aggregate
        );
        assert_eq!(
            dialect.function_lineage("apply"),
            ("list_transform".to_string(), FunctionClass::Aggregate)
        );
    }

    #[test]
    fn sum_still_classifies_through_the_base() {
        assert_eq!(
            duckdb().function_lineage("Sum"),
            ("sum".to_string(), FunctionClass::Aggregate)
        );
    }
}
