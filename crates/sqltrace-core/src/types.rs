//! Public input and output types for the lineage API.
//!
//! Outputs are plain owned data: nothing borrows from the input SQL, and
//! nothing references the AST or scope structures, which live only for the
//! duration of a single extraction call.

use crate::dialect::Dialect;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Options for [`crate::extract_lineage`].
///
/// The dialect is mandatory in practice: extraction fails with
/// [`crate::Error::DialectRequired`] when it is `None`. The schema is
/// optional; without it, star expansion degrades to an opaque column and
/// unqualified references resolve by binding position only.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    pub dialect: Option<Arc<Dialect>>,
    pub schema: Option<Schema>,
}

impl ExtractOptions {
    pub fn new(dialect: Arc<Dialect>) -> Self {
        Self {
            dialect: Some(dialect),
            schema: None,
        }
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }
}

/// Caller-provided table metadata: table name to ordered column list.
///
/// Names are stored as written; comparisons are normalized under the active
/// dialect at lookup time. A qualified reference must match a qualified
/// schema name exactly; an unqualified reference matches an exact name
/// first, then the dialect's default schema, then the terminal name
/// component of a qualified schema entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    pub tables: Vec<SchemaTable>,
}

/// One table's schema: name (optionally `catalog.schema.table` qualified)
/// plus ordered column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchemaTable {
    pub name: String,
    pub columns: Vec<String>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table, builder-style.
    pub fn table(
        mut self,
        name: impl Into<String>,
        columns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.tables.push(SchemaTable {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Looks up the column list for a normalized table reference.
    pub(crate) fn lookup(&self, dialect: &Dialect, reference: &str) -> Option<Vec<String>> {
        let normalized_columns = |table: &SchemaTable| {
            table
                .columns
                .iter()
                .map(|c| dialect.normalize(c))
                .collect::<Vec<_>>()
        };

        // Qualified (or exact) match first.
        for table in &self.tables {
            if dialect.normalize(&table.name) == reference {
                return Some(normalized_columns(table));
            }
        }
        if reference.contains('.') {
            return None;
        }
        // Unqualified: try the dialect's default schema, then the terminal
        // component of qualified schema names.
        let default_schema = dialect.normalize(dialect.default_schema());
        if !default_schema.is_empty() {
            let qualified = format!("{default_schema}.{reference}");
            for table in &self.tables {
                if dialect.normalize(&table.name) == qualified {
                    return Some(normalized_columns(table));
                }
            }
        }
        for table in &self.tables {
            let name = dialect.normalize(&table.name);
            let terminal = name.rsplit('.').next().unwrap_or(&name);
            if terminal == reference {
                return Some(normalized_columns(table));
            }
        }
        None
    }
}

/// The lineage of one SELECT statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ModelLineage {
    /// Sorted, deduplicated physical table names (dot-joined qualifiers).
    /// CTE and derived-table aliases never appear here.
    pub sources: Vec<String>,

    /// Output columns in SELECT-list order.
    pub columns: Vec<ColumnLineage>,

    /// True when the outermost SELECT projected `*` or `t.*`.
    pub uses_select_star: bool,
}

/// Lineage of a single output column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColumnLineage {
    /// Output name: alias, inferred column/function name, or `column<N>`.
    pub name: String,

    /// Source columns in first-seen order, deduplicated by (table, column).
    pub sources: Vec<SourceRef>,

    /// Direct passthrough vs computed expression.
    pub transform: Transform,

    /// Lowercased canonical function name for aggregate, window, generator,
    /// and table-valued calls; empty otherwise.
    #[serde(default)]
    pub function: String,
}

/// One source column. `table` is a physical qualified name, a CTE/derived
/// alias when no single physical substitution exists, or empty for an
/// unresolvable reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
    pub table: String,
    pub column: String,
}

impl SourceRef {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

/// Transform class of an output column. The wire form is the empty string
/// for direct passthrough and `"EXPR"` for computed expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub enum Transform {
    #[default]
    #[serde(rename = "")]
    Direct,
    #[serde(rename = "EXPR")]
    Expression,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{ansi, duckdb, postgres};

    #[test]
    fn transform_wire_format() {
        assert_eq!(serde_json::to_string(&Transform::Direct).unwrap(), "\"\"");
        assert_eq!(
            serde_json::to_string(&Transform::Expression).unwrap(),
            "\"EXPR\""
        );
        let back: Transform = serde_json::from_str("\"EXPR\"").unwrap();
        assert_eq!(back, Transform::Expression);
    }

    #[test]
    fn model_lineage_serializes_camel_case() {
        let lineage = ModelLineage {
            sources: vec!["users".into()],
            columns: vec![ColumnLineage {
                name: "id".into(),
                sources: vec![SourceRef::new("users", "id")],
                transform: Transform::Direct,
                function: String::new(),
            }],
            uses_select_star: false,
        };
        let json = serde_json::to_value(&lineage).unwrap();
        assert_eq!(json["usesSelectStar"], false);
        assert_eq!(json["columns"][0]["transform"], "");
        assert_eq!(json["columns"][0]["function"], "");
        assert_eq!(json["columns"][0]["sources"][0]["table"], "users");
    }

    #[test]
    fn schema_lookup_exact_then_terminal() {
        let schema = Schema::new()
            .table("analytics.events", ["id", "ts"])
            .table("Users", ["Id", "Name"]);
        let dialect = ansi();

        assert_eq!(
            schema.lookup(&dialect, "analytics.events"),
            Some(vec!["id".to_string(), "ts".to_string()])
        );
        // Terminal-component match for unqualified references.
        assert_eq!(
            schema.lookup(&dialect, "events"),
            Some(vec!["id".to_string(), "ts".to_string()])
        );
        // Case-insensitive dialect folds both sides.
        assert_eq!(
            schema.lookup(&dialect, "users"),
            Some(vec!["id".to_string(), "name".to_string()])
        );
        assert_eq!(schema.lookup(&dialect, "missing"), None);
    }

    #[test]
    fn schema_lookup_uses_default_schema() {
        let schema = Schema::new().table("main.sales", ["amount"]);
        assert_eq!(
            schema.lookup(&duckdb(), "sales"),
            Some(vec!["amount".to_string()])
        );
        let schema = Schema::new().table("public.users", ["id"]);
        assert_eq!(
            schema.lookup(&postgres(), "users"),
            Some(vec!["id".to_string()])
        );
    }

    #[test]
    fn qualified_reference_does_not_match_terminal() {
        let schema = Schema::new().table("users", ["id"]);
        assert_eq!(schema.lookup(&ansi(), "other.users"), None);
    }
}
