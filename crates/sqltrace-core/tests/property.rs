//! Property tests over generated identifiers: determinism, source-set
//! invariants, and CTE-alias stripping.

use proptest::prelude::*;
use sqltrace_core::{dialect, extract_lineage, ExtractOptions, ModelLineage};
use std::sync::Arc;

fn run(sql: &str) -> ModelLineage {
    extract_lineage(sql, &ExtractOptions::new(Arc::new(dialect::duckdb())))
        .unwrap_or_else(|e| panic!("extraction failed for {sql:?}: {e}"))
}

proptest! {
    #[test]
    fn join_lineage_is_deterministic_and_well_formed(
        table_a in "[a-z]{1,6}[0-9]",
        table_b in "[a-z]{1,6}[0-9]",
        col_a in "[a-z]{1,6}[0-9]",
        col_b in "[a-z]{1,6}[0-9]",
    ) {
        prop_assume!(table_a != table_b);

        let sql = format!(
            "SELECT {ta}.{ca}, {tb}.{cb} FROM {ta} JOIN {tb} ON {ta}.{ca} = {tb}.{cb}",
            ta = table_a,
            tb = table_b,
            ca = col_a,
            cb = col_b,
        );

        let lineage = run(&sql);
        prop_assert_eq!(&lineage, &run(&sql));

        let mut sorted = lineage.sources.clone();
        sorted.sort();
        sorted.dedup();
        prop_assert_eq!(&lineage.sources, &sorted);
        prop_assert_eq!(lineage.sources.len(), 2);
        prop_assert!(lineage.sources.contains(&table_a));
        prop_assert!(lineage.sources.contains(&table_b));
        prop_assert_eq!(lineage.columns.len(), 2);
    }

    /// A CTE alias never appears in the source set; only the physical table
    /// it reads does.
    #[test]
    fn cte_alias_is_always_stripped(
        cte in "[a-z]{1,6}[0-9]",
        table in "[a-z]{1,6}[0-9]",
        column in "[a-z]{1,6}[0-9]",
    ) {
        prop_assume!(cte != table);

        let sql = format!(
            "WITH {cte} AS (SELECT {column} FROM {table}) SELECT {column} FROM {cte}"
        );
        let lineage = run(&sql);
        prop_assert_eq!(&lineage.sources, &vec![table.clone()]);
        prop_assert!(!lineage.sources.contains(&cte));
    }

    /// Case-insensitive dialects fold identifier casing away entirely.
    #[test]
    fn casing_never_changes_lineage(
        table in "[a-z]{1,6}[0-9]",
        column in "[a-z]{1,6}[0-9]",
    ) {
        let lower = format!("SELECT {column} FROM {table}");
        let upper = format!(
            "SELECT {} FROM {}",
            column.to_uppercase(),
            table.to_uppercase()
        );
        prop_assert_eq!(run(&lower), run(&upper));
    }

    /// Quoting an identifier changes nothing in a quoted-case-insensitive
    /// dialect.
    #[test]
    fn quoting_never_changes_lineage(
        table in "[a-z]{1,6}[0-9]",
        column in "[a-z]{1,6}[0-9]",
    ) {
        let bare = format!("SELECT {column} FROM {table}");
        let quoted = format!("SELECT \"{column}\" FROM \"{table}\"");
        prop_assert_eq!(run(&bare), run(&quoted));
    }
}
