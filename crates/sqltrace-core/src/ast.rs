//! Typed AST for SELECT statements.
//!
//! Every variant is a closed sum type and every node carries the [`Span`] of
//! the source text it was parsed from. Ownership is strictly tree-shaped: a
//! parent node owns its children, and nothing else holds references into the
//! tree.

use crate::token::Span;
use std::fmt;

/// An identifier as written in the source.
///
/// `value` has quoting stripped and escapes resolved but keeps the original
/// casing; comparisons go through the dialect's normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub value: String,
    pub quoted: bool,
    pub span: Span,
}

impl Ident {
    pub fn new(value: impl Into<String>, quoted: bool, span: Span) -> Self {
        Self {
            value: value.into(),
            quoted,
            span,
        }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quoted {
            write!(f, "\"{}\"", self.value.replace('"', "\"\""))
        } else {
            write!(f, "{}", self.value)
        }
    }
}

/// A full SELECT statement: optional WITH prefix plus the body.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStmt {
    pub with: Option<With>,
    pub body: SelectBody,
    pub span: Span,
}

/// The WITH clause: ordered CTEs plus the RECURSIVE flag.
#[derive(Debug, Clone, PartialEq)]
pub struct With {
    pub recursive: bool,
    pub ctes: Vec<Cte>,
    pub span: Span,
}

/// A single common table expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Cte {
    pub name: Ident,
    /// Explicit column list, when written: `name (a, b) AS (...)`.
    pub columns: Option<Vec<Ident>>,
    /// `AS MATERIALIZED` / `AS NOT MATERIALIZED` hint, when written.
    pub materialized: Option<bool>,
    pub select: SelectStmt,
    pub span: Span,
}

/// A select body: a core plus an optional set-operation tail.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectBody {
    pub left: SelectCore,
    pub set: Option<SetTail>,
}

/// The right side of a set operation, right-nested per the grammar.
#[derive(Debug, Clone, PartialEq)]
pub struct SetTail {
    pub op: SetOp,
    pub right: Box<SelectBody>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOp {
    Union,
    UnionAll,
    Intersect,
    Except,
}

impl fmt::Display for SetOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SetOp::Union => "UNION",
            SetOp::UnionAll => "UNION ALL",
            SetOp::Intersect => "INTERSECT",
            SetOp::Except => "EXCEPT",
        };
        write!(f, "{text}")
    }
}

/// One `SELECT ... FROM ... WHERE ...` core.
///
/// Clause slots past WHERE are filled by the dialect's ordered clause
/// handlers; a slot a dialect does not know stays empty.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectCore {
    pub distinct: bool,
    pub items: Vec<SelectItem>,
    pub from: Option<FromClause>,
    pub where_clause: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub qualify: Option<Expr>,
    /// Named windows from the WINDOW clause, in declaration order.
    pub windows: Vec<NamedWindow>,
    pub order_by: Vec<OrderByItem>,
    pub limit: Option<Expr>,
    pub offset: Option<Expr>,
    pub span: Span,
}

impl SelectCore {
    pub fn new(span: Span) -> Self {
        Self {
            distinct: false,
            items: Vec::new(),
            from: None,
            where_clause: None,
            group_by: Vec::new(),
            having: None,
            qualify: None,
            windows: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            span,
        }
    }
}

/// `WINDOW w AS (...)`.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedWindow {
    pub name: Ident,
    pub spec: WindowSpec,
}

/// One item of the SELECT list.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// `*` with optional star modifiers.
    Star {
        modifiers: Vec<StarModifier>,
        span: Span,
    },
    /// `t.*` with optional star modifiers.
    TableStar {
        table: Ident,
        modifiers: Vec<StarModifier>,
        span: Span,
    },
    /// An expression with an optional alias.
    Expr { expr: Expr, alias: Option<Ident> },
}

/// DuckDB-style star modifiers.
#[derive(Debug, Clone, PartialEq)]
pub enum StarModifier {
    /// `EXCLUDE (a, b)`.
    Exclude(Vec<Ident>),
    /// `REPLACE (expr AS a, ...)`.
    Replace(Vec<ReplaceItem>),
    /// `RENAME (a AS b, ...)`.
    Rename(Vec<RenameItem>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceItem {
    pub expr: Expr,
    pub alias: Ident,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenameItem {
    pub old: Ident,
    pub new: Ident,
}

/// The FROM clause: a leading source plus joined sources in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct FromClause {
    pub source: TableRef,
    pub joins: Vec<Join>,
}

/// A source in the FROM clause.
#[derive(Debug, Clone, PartialEq)]
pub enum TableRef {
    /// A (possibly qualified) table name.
    Table {
        catalog: Option<Ident>,
        schema: Option<Ident>,
        name: Ident,
        alias: Option<Ident>,
        span: Span,
    },
    /// A parenthesized subquery with its required alias.
    Derived {
        select: Box<SelectStmt>,
        alias: Ident,
        span: Span,
    },
    /// `LATERAL (SELECT ...)`: like Derived, but the subquery sees FROM
    /// bindings to its left.
    Lateral {
        select: Box<SelectStmt>,
        alias: Ident,
        span: Span,
    },
    /// `source PIVOT(agg FOR col IN (values))`.
    Pivot {
        source: Box<TableRef>,
        aggregates: Vec<Expr>,
        for_column: Ident,
        values: Vec<Expr>,
        alias: Option<Ident>,
        span: Span,
    },
    /// `source UNPIVOT(value_col FOR name_col IN (cols))`.
    Unpivot {
        source: Box<TableRef>,
        value_name: Ident,
        name_column: Ident,
        columns: Vec<Ident>,
        alias: Option<Ident>,
        span: Span,
    },
}

impl TableRef {
    pub fn span(&self) -> Span {
        match self {
            TableRef::Table { span, .. }
            | TableRef::Derived { span, .. }
            | TableRef::Lateral { span, .. }
            | TableRef::Pivot { span, .. }
            | TableRef::Unpivot { span, .. } => *span,
        }
    }

    /// The binding name this source introduces into its scope: the alias
    /// when present, otherwise the terminal table name.
    pub fn binding_name(&self) -> Option<&Ident> {
        match self {
            TableRef::Table { alias, name, .. } => Some(alias.as_ref().unwrap_or(name)),
            TableRef::Derived { alias, .. } | TableRef::Lateral { alias, .. } => Some(alias),
            TableRef::Pivot { alias, source, .. } | TableRef::Unpivot { alias, source, .. } => {
                alias.as_ref().or_else(|| source.binding_name())
            }
        }
    }
}

/// One join step. `join_type` is the resolved name from the dialect's join
/// registry ("INNER", "LEFT", "SEMI", ...).
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub join_type: String,
    pub natural: bool,
    pub right: TableRef,
    pub on: Option<Expr>,
    pub using: Option<Vec<Ident>>,
    pub span: Span,
}

/// Ordering item: expression plus direction and NULLS placement.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub expr: Expr,
    pub desc: Option<bool>,
    pub nulls_first: Option<bool>,
}

/// An OVER clause: either a named window or an inline spec.
#[derive(Debug, Clone, PartialEq)]
pub enum Window {
    Named(Ident),
    Spec(WindowSpec),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WindowSpec {
    pub partition_by: Vec<Expr>,
    pub order_by: Vec<OrderByItem>,
    pub frame: Option<WindowFrame>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowFrame {
    pub units: FrameUnits,
    pub start: FrameBound,
    pub end: Option<FrameBound>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameUnits {
    Rows,
    Range,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameBound {
    UnboundedPreceding,
    Preceding(Box<Expr>),
    CurrentRow,
    Following(Box<Expr>),
    UnboundedFollowing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Number,
    String,
    Boolean,
    Null,
    Placeholder,
}

/// A scalar expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `c` or `t.c` (an optional qualifier; catalog-qualified columns fold
    /// the qualifier into `table` as written).
    ColumnRef {
        table: Option<Ident>,
        column: Ident,
        span: Span,
    },
    /// A literal with its raw source text.
    Literal {
        kind: LiteralKind,
        raw: String,
        span: Span,
    },
    /// `*` in argument position (`COUNT(*)`).
    Wildcard { span: Span },
    FuncCall {
        name: Ident,
        args: Vec<Expr>,
        distinct: bool,
        filter: Option<Box<Expr>>,
        over: Option<Box<Window>>,
        span: Span,
    },
    Case {
        operand: Option<Box<Expr>>,
        branches: Vec<CaseBranch>,
        else_expr: Option<Box<Expr>>,
        span: Span,
    },
    /// `CAST(expr AS type)` or `expr::type`.
    Cast {
        expr: Box<Expr>,
        type_name: String,
        span: Span,
    },
    Binary {
        op: String,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    Unary {
        op: String,
        expr: Box<Expr>,
        span: Span,
    },
    Paren { expr: Box<Expr>, span: Span },
    /// A scalar subquery (or EXISTS subquery) in expression position.
    Subquery { select: Box<SelectStmt>, span: Span },
    In {
        expr: Box<Expr>,
        set: InSet,
        negated: bool,
        span: Span,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
        span: Span,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
        span: Span,
    },
    /// `IS [NOT] TRUE/FALSE`.
    IsBool {
        expr: Box<Expr>,
        negated: bool,
        value: bool,
        span: Span,
    },
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        negated: bool,
        case_insensitive: bool,
        escape: Option<Box<Expr>>,
        span: Span,
    },
    /// `x -> x + 1` or `(x, y) -> x + y`.
    Lambda {
        params: Vec<Ident>,
        body: Box<Expr>,
        span: Span,
    },
    /// `[a, b, c]`.
    List { items: Vec<Expr>, span: Span },
    /// `{'k': v, ...}`.
    Struct {
        fields: Vec<(String, Expr)>,
        span: Span,
    },
    /// `expr[i]` or `expr[a:b]`.
    Index {
        expr: Box<Expr>,
        index: IndexOp,
        span: Span,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseBranch {
    pub condition: Expr,
    pub result: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InSet {
    List(Vec<Expr>),
    Subquery(Box<SelectStmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndexOp {
    Element(Box<Expr>),
    Slice {
        start: Option<Box<Expr>>,
        end: Option<Box<Expr>>,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::ColumnRef { span, .. }
            | Expr::Literal { span, .. }
            | Expr::Wildcard { span }
            | Expr::FuncCall { span, .. }
            | Expr::Case { span, .. }
            | Expr::Cast { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Paren { span, .. }
            | Expr::Subquery { span, .. }
            | Expr::In { span, .. }
            | Expr::Between { span, .. }
            | Expr::IsNull { span, .. }
            | Expr::IsBool { span, .. }
            | Expr::Like { span, .. }
            | Expr::Lambda { span, .. }
            | Expr::List { span, .. }
            | Expr::Struct { span, .. }
            | Expr::Index { span, .. } => *span,
        }
    }
}

// Rendering exists to round-trip expressions through the parser in tests and
// to echo expressions back in diagnostics. It is not a formatter: no layout,
// no dialect-specific quoting beyond identifiers.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::ColumnRef { table, column, .. } => {
                if let Some(table) = table {
                    write!(f, "{table}.{column}")
                } else {
                    write!(f, "{column}")
                }
            }
            Expr::Literal { kind, raw, .. } => match kind {
                LiteralKind::String => write!(f, "'{}'", raw.replace('\'', "''")),
                _ => write!(f, "{raw}"),
            },
            Expr::Wildcard { .. } => write!(f, "*"),
            Expr::FuncCall {
                name,
                args,
                distinct,
                filter,
                over,
                ..
            } => {
                write!(f, "{name}(")?;
                if *distinct {
                    write!(f, "DISTINCT ")?;
                }
                write_list(f, args)?;
                write!(f, ")")?;
                if let Some(filter) = filter {
                    write!(f, " FILTER (WHERE {filter})")?;
                }
                if let Some(over) = over {
                    match over.as_ref() {
                        Window::Named(name) => write!(f, " OVER {name}")?,
                        Window::Spec(spec) => write!(f, " OVER ({spec})")?,
                    }
                }
                Ok(())
            }
            Expr::Case {
                operand,
                branches,
                else_expr,
                ..
            } => {
                write!(f, "CASE")?;
                if let Some(operand) = operand {
                    write!(f, " {operand}")?;
                }
                for branch in branches {
                    write!(f, " WHEN {} THEN {}", branch.condition, branch.result)?;
                }
                if let Some(else_expr) = else_expr {
                    write!(f, " ELSE {else_expr}")?;
                }
                write!(f, " END")
            }
            Expr::Cast {
                expr, type_name, ..
            } => write!(f, "CAST({expr} AS {type_name})"),
            Expr::Binary {
                op, left, right, ..
            } => write!(f, "{left} {op} {right}"),
            Expr::Unary { op, expr, .. } => {
                if op.chars().all(|c| c.is_ascii_alphabetic()) {
                    write!(f, "{op} {expr}")
                } else {
                    write!(f, "{op}{expr}")
                }
            }
            Expr::Paren { expr, .. } => write!(f, "({expr})"),
            Expr::Subquery { .. } => write!(f, "(<subquery>)"),
            Expr::In {
                expr, set, negated, ..
            } => {
                write!(f, "{expr} {}IN ", if *negated { "NOT " } else { "" })?;
                match set {
                    InSet::List(items) => {
                        write!(f, "(")?;
                        write_list(f, items)?;
                        write!(f, ")")
                    }
                    InSet::Subquery(_) => write!(f, "(<subquery>)"),
                }
            }
            Expr::Between {
                expr,
                low,
                high,
                negated,
                ..
            } => write!(
                f,
                "{expr} {}BETWEEN {low} AND {high}",
                if *negated { "NOT " } else { "" }
            ),
            Expr::IsNull { expr, negated, .. } => {
                write!(f, "{expr} IS {}NULL", if *negated { "NOT " } else { "" })
            }
            Expr::IsBool {
                expr,
                negated,
                value,
                ..
            } => write!(
                f,
                "{expr} IS {}{}",
                if *negated { "NOT " } else { "" },
                if *value { "TRUE" } else { "FALSE" }
            ),
            Expr::Like {
                expr,
                pattern,
                negated,
                case_insensitive,
                escape,
                ..
            } => {
                write!(
                    f,
                    "{expr} {}{} {pattern}",
                    if *negated { "NOT " } else { "" },
                    if *case_insensitive { "ILIKE" } else { "LIKE" }
                )?;
                if let Some(escape) = escape {
                    write!(f, " ESCAPE {escape}")?;
                }
                Ok(())
            }
            Expr::Lambda { params, body, .. } => {
                if params.len() == 1 {
                    write!(f, "{} -> {body}", params[0])
                } else {
                    write!(f, "(")?;
                    for (i, param) in params.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{param}")?;
                    }
                    write!(f, ") -> {body}")
                }
            }
            Expr::List { items, .. } => {
                write!(f, "[")?;
                write_list(f, items)?;
                write!(f, "]")
            }
            Expr::Struct { fields, .. } => {
                write!(f, "{{")?;
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "'{key}': {value}")?;
                }
                write!(f, "}}")
            }
            Expr::Index { expr, index, .. } => match index {
                IndexOp::Element(element) => write!(f, "{expr}[{element}]"),
                IndexOp::Slice { start, end } => {
                    write!(f, "{expr}[")?;
                    if let Some(start) = start {
                        write!(f, "{start}")?;
                    }
                    write!(f, ":")?;
                    if let Some(end) = end {
                        write!(f, "{end}")?;
                    }
                    write!(f, "]")
                }
            },
        }
    }
}

impl fmt::Display for WindowSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        if !self.partition_by.is_empty() {
            write!(f, "PARTITION BY ")?;
            write_list(f, &self.partition_by)?;
            first = false;
        }
        if !self.order_by.is_empty() {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "ORDER BY ")?;
            for (i, item) in self.order_by.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", item.expr)?;
                match item.desc {
                    Some(true) => write!(f, " DESC")?,
                    Some(false) => write!(f, " ASC")?,
                    None => {}
                }
            }
        }
        Ok(())
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Span;

    fn sp() -> Span {
        Span::new(0, 0, 1, 1)
    }

    #[test]
    fn binding_name_prefers_alias() {
        let table = TableRef::Table {
            catalog: None,
            schema: None,
            name: Ident::new("users", false, sp()),
            alias: Some(Ident::new("u", false, sp())),
            span: sp(),
        };
        assert_eq!(table.binding_name().unwrap().value, "u");
    }

    #[test]
    fn binding_name_falls_back_to_table_name() {
        let table = TableRef::Table {
            catalog: None,
            schema: None,
            name: Ident::new("users", false, sp()),
            alias: None,
            span: sp(),
        };
        assert_eq!(table.binding_name().unwrap().value, "users");
    }

    #[test]
    fn quoted_ident_display_escapes() {
        let ident = Ident::new("we\"ird", true, sp());
        assert_eq!(ident.to_string(), "\"we\"\"ird\"");
    }
}
