//! Column-level lineage extraction.
//!
//! Walks a parsed SELECT statement, builds the scope tree FROM-first, and
//! computes per-output-column source sets. Resolution gaps degrade instead
//! of failing: an unbindable column keeps its name with an empty table, and
//! star expansion without schema produces a single opaque column.

use crate::ast::{
    Expr, SelectBody, SelectCore, SelectItem, SelectStmt, StarModifier, TableRef,
};
use crate::dialect::{Dialect, FunctionClass};
use crate::error::Error;
use crate::parser::parse;
use crate::scope::{BindingKind, CteDef, ScopeEntry, ScopeId, ScopeTree};
use crate::token::Span;
use crate::types::{ColumnLineage, ExtractOptions, ModelLineage, Schema, SourceRef, Transform};
use std::collections::{BTreeSet, HashSet};
#[cfg(feature = "tracing")]
use tracing::trace;

/// Parses `sql` and computes its column-level lineage.
///
/// Fails with [`Error::DialectRequired`] when the options carry no dialect;
/// the core never assumes a default.
pub fn extract_lineage(sql: &str, opts: &ExtractOptions) -> Result<ModelLineage, Error> {
    let Some(dialect) = opts.dialect.as_deref() else {
        return Err(Error::DialectRequired);
    };
    #[cfg(feature = "tracing")]
    trace!(dialect = dialect.name(), "extracting lineage");

    let stmt = parse(sql, dialect)?;
    let mut extractor = Extractor {
        dialect,
        schema: opts.schema.as_ref(),
        scopes: ScopeTree::new(),
        sources: BTreeSet::new(),
    };
    let result = extractor.extract_stmt(&stmt, None)?;

    let sources: Vec<String> = extractor
        .sources
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect();
    Ok(ModelLineage {
        sources,
        columns: result.columns,
        uses_select_star: result.uses_star,
    })
}

/// Lineage of one statement (or one set-operation arm) during extraction.
struct StmtLineage {
    columns: Vec<ColumnLineage>,
    uses_star: bool,
    /// Physical tables reachable through this statement's FROM bindings;
    /// becomes the `UnderlyingSources` closure of a CTE or derived table.
    underlying: BTreeSet<String>,
}

/// Per-call extraction state. All of it dies with the call.
struct Extractor<'a> {
    dialect: &'a Dialect,
    schema: Option<&'a Schema>,
    scopes: ScopeTree,
    /// Global source set: every physical table registered anywhere in the
    /// statement, CTE bodies included. Sorted and deduplicated by
    /// construction.
    sources: BTreeSet<String>,
}

/// Lineage of one expression.
struct ExprLineage {
    sources: Vec<SourceRef>,
    transform: Transform,
    function: String,
}

impl ExprLineage {
    fn expression(sources: Vec<SourceRef>) -> Self {
        Self {
            sources,
            transform: Transform::Expression,
            function: String::new(),
        }
    }

    fn empty() -> Self {
        Self::expression(Vec::new())
    }
}

impl<'a> Extractor<'a> {
    fn norm(&self, ident: &crate::ast::Ident) -> String {
        self.dialect.normalize(&ident.value)
    }

    // -- statements ---------------------------------------------------------

    fn extract_stmt(
        &mut self,
        stmt: &SelectStmt,
        parent: Option<ScopeId>,
    ) -> Result<StmtLineage, Error> {
        let scope = self.scopes.push_scope(parent);

        if let Some(with) = &stmt.with {
            for cte in &with.ctes {
                let name = self.norm(&cte.name);
                if self.scopes.has_local_cte(scope, &name) {
                    return Err(Error::resolve(
                        cte.name.span,
                        format!("duplicate CTE name '{}'", cte.name.value),
                    ));
                }
                // Provisional stub so a self-reference binds (RECURSIVE or
                // not; self-reference without RECURSIVE is accepted).
                self.scopes.add_cte(scope, name.clone(), CteDef::default());

                let mut inner = self.extract_stmt(&cte.select, Some(scope))?;
                if let Some(columns) = &cte.columns {
                    for (idx, col) in columns.iter().enumerate() {
                        if let Some(lineage) = inner.columns.get_mut(idx) {
                            lineage.name = self.norm(col);
                        }
                    }
                }
                #[cfg(feature = "tracing")]
                trace!(cte = %name, columns = inner.columns.len(), "resolved CTE");
                self.scopes.add_cte(
                    scope,
                    name,
                    CteDef {
                        columns: inner.columns,
                        underlying: std::mem::take(&mut inner.underlying),
                    },
                );
            }
        }

        self.extract_body(&stmt.body, scope)
    }

    fn extract_body(&mut self, body: &SelectBody, stmt_scope: ScopeId) -> Result<StmtLineage, Error> {
        let mut left = self.extract_core(&body.left, stmt_scope)?;
        if let Some(tail) = &body.set {
            let right = self.extract_body(&tail.right, stmt_scope)?;
            left.uses_star |= right.uses_star;
            left.underlying.extend(right.underlying);
            // Positional merge: the left arm names the output; a merged
            // column is always a computed expression.
            for (idx, column) in left.columns.iter_mut().enumerate() {
                if let Some(right_column) = right.columns.get(idx) {
                    for source in &right_column.sources {
                        push_unique(&mut column.sources, source.clone());
                    }
                }
                column.transform = Transform::Expression;
            }
        }
        Ok(left)
    }

    fn extract_core(&mut self, core: &SelectCore, stmt_scope: ScopeId) -> Result<StmtLineage, Error> {
        let scope = self.scopes.push_scope(Some(stmt_scope));
        let mut underlying = BTreeSet::new();

        if let Some(from) = &core.from {
            self.register_table_ref(&from.source, scope, stmt_scope, &mut underlying)?;
            for join in &from.joins {
                self.register_table_ref(&join.right, scope, stmt_scope, &mut underlying)?;
            }
        }

        let mut columns = Vec::new();
        let mut uses_star = false;
        for (idx, item) in core.items.iter().enumerate() {
            match item {
                SelectItem::Star { modifiers, span } => {
                    uses_star = true;
                    columns.extend(self.expand_star(scope, None, modifiers, *span)?);
                }
                SelectItem::TableStar {
                    table,
                    modifiers,
                    span,
                } => {
                    uses_star = true;
                    columns.extend(self.expand_star(scope, Some(table), modifiers, *span)?);
                }
                SelectItem::Expr { expr, alias } => {
                    let lineage = self.expr_lineage(expr, scope, &mut Vec::new())?;
                    let name = match alias {
                        Some(alias) => alias.value.clone(),
                        None => output_name(expr, idx),
                    };
                    columns.push(ColumnLineage {
                        // Output names are normalized like every other
                        // identifier, so equal queries in different casing
                        // produce identical lineage.
                        name: self.dialect.normalize(&name),
                        sources: lineage.sources,
                        transform: lineage.transform,
                        function: lineage.function,
                    });
                }
            }
        }

        Ok(StmtLineage {
            columns,
            uses_star,
            underlying,
        })
    }

    // -- FROM bindings ------------------------------------------------------

    fn register_table_ref(
        &mut self,
        table_ref: &TableRef,
        scope: ScopeId,
        stmt_scope: ScopeId,
        underlying: &mut BTreeSet<String>,
    ) -> Result<(), Error> {
        match table_ref {
            TableRef::Table {
                catalog,
                schema,
                name,
                alias,
                ..
            } => {
                let binding = match alias {
                    Some(alias) => self.norm(alias),
                    None => self.norm(name),
                };
                let unqualified = catalog.is_none() && schema.is_none();
                if unqualified {
                    let cte_name = self.norm(name);
                    if let Some(def) = self.scopes.lookup_cte(scope, &cte_name) {
                        let def = def.clone();
                        underlying.extend(def.underlying.iter().cloned());
                        self.sources.extend(def.underlying.iter().cloned());
                        self.scopes.add_entry(
                            scope,
                            ScopeEntry {
                                name: binding,
                                kind: BindingKind::Cte,
                                source_table: None,
                                columns: Some(
                                    def.columns.iter().map(|c| c.name.clone()).collect(),
                                ),
                                column_lineage: Some(def.columns),
                                underlying: def.underlying,
                            },
                        );
                        return Ok(());
                    }
                }

                let qualified = [catalog, schema]
                    .into_iter()
                    .flatten()
                    .map(|part| self.norm(part))
                    .chain(std::iter::once(self.norm(name)))
                    .collect::<Vec<_>>()
                    .join(".");
                let columns = self
                    .schema
                    .and_then(|schema| schema.lookup(self.dialect, &qualified));
                underlying.insert(qualified.clone());
                self.sources.insert(qualified.clone());
                self.scopes.add_entry(
                    scope,
                    ScopeEntry {
                        name: binding,
                        kind: BindingKind::Table,
                        source_table: Some(qualified.clone()),
                        columns,
                        column_lineage: None,
                        underlying: BTreeSet::from([qualified]),
                    },
                );
                Ok(())
            }

            TableRef::Derived { select, alias, .. } => {
                // Plain derived tables resolve against the statement scope:
                // outer CTEs are visible, sibling FROM bindings are not.
                let inner = self.extract_stmt(select, Some(stmt_scope))?;
                underlying.extend(inner.underlying.iter().cloned());
                self.scopes.add_entry(
                    scope,
                    ScopeEntry {
                        name: self.norm(alias),
                        kind: BindingKind::Derived,
                        source_table: None,
                        columns: Some(inner.columns.iter().map(|c| c.name.clone()).collect()),
                        column_lineage: Some(inner.columns),
                        underlying: inner.underlying,
                    },
                );
                Ok(())
            }

            TableRef::Lateral { select, alias, .. } => {
                // LATERAL sees the bindings registered so far in this FROM.
                let inner = self.extract_stmt(select, Some(scope))?;
                underlying.extend(inner.underlying.iter().cloned());
                self.scopes.add_entry(
                    scope,
                    ScopeEntry {
                        name: self.norm(alias),
                        kind: BindingKind::Lateral,
                        source_table: None,
                        columns: Some(inner.columns.iter().map(|c| c.name.clone()).collect()),
                        column_lineage: Some(inner.columns),
                        underlying: inner.underlying,
                    },
                );
                Ok(())
            }

            TableRef::Pivot {
                source,
                aggregates,
                for_column,
                values,
                alias,
                ..
            } => {
                self.register_table_ref(source, scope, stmt_scope, underlying)?;
                let src = self
                    .scopes
                    .pop_entry(scope)
                    .expect("pivot source was just registered");

                // Aggregate arguments and the FOR column resolve against the
                // pivot source; their sources become the lineage of every
                // value column.
                let mut agg_sources = Vec::new();
                let mut agg_function = String::new();
                for aggregate in aggregates {
                    let lineage = self.pivot_expr_lineage(aggregate, &src)?;
                    for source in lineage.sources {
                        push_unique(&mut agg_sources, source);
                    }
                    if !lineage.function.is_empty() {
                        agg_function = lineage.function;
                    }
                }
                let (for_sources, _) = resolve_in_entry(&src, &self.norm(for_column));
                for source in for_sources {
                    push_unique(&mut agg_sources, source);
                }

                let column_lineage: Vec<ColumnLineage> = values
                    .iter()
                    .map(|value| ColumnLineage {
                        name: value_column_name(value),
                        sources: agg_sources.clone(),
                        transform: Transform::Expression,
                        function: agg_function.clone(),
                    })
                    .collect();

                let binding = match alias {
                    Some(alias) => self.norm(alias),
                    None => src.name.clone(),
                };
                self.scopes.add_entry(
                    scope,
                    ScopeEntry {
                        name: binding,
                        kind: BindingKind::Pivot,
                        source_table: None,
                        columns: Some(column_lineage.iter().map(|c| c.name.clone()).collect()),
                        column_lineage: Some(column_lineage),
                        underlying: src.underlying,
                    },
                );
                Ok(())
            }

            TableRef::Unpivot {
                source,
                value_name,
                name_column,
                columns,
                alias,
                ..
            } => {
                self.register_table_ref(source, scope, stmt_scope, underlying)?;
                let src = self
                    .scopes
                    .pop_entry(scope)
                    .expect("unpivot source was just registered");

                let in_set: HashSet<String> =
                    columns.iter().map(|c| self.norm(c)).collect();

                let mut column_lineage = Vec::new();
                if let Some(src_columns) = &src.columns {
                    for column in src_columns {
                        if in_set.contains(column) {
                            continue;
                        }
                        let (sources, direct) = resolve_in_entry(&src, column);
                        column_lineage.push(ColumnLineage {
                            name: column.clone(),
                            sources,
                            transform: if direct {
                                Transform::Direct
                            } else {
                                Transform::Expression
                            },
                            function: String::new(),
                        });
                    }
                }
                // The name column holds column names, not data.
                column_lineage.push(ColumnLineage {
                    name: self.norm(name_column),
                    sources: Vec::new(),
                    transform: Transform::Expression,
                    function: String::new(),
                });
                let mut value_sources = Vec::new();
                for column in columns {
                    let (sources, _) = resolve_in_entry(&src, &self.norm(column));
                    for source in sources {
                        push_unique(&mut value_sources, source);
                    }
                }
                column_lineage.push(ColumnLineage {
                    name: self.norm(value_name),
                    sources: value_sources,
                    transform: Transform::Expression,
                    function: String::new(),
                });

                let binding = match alias {
                    Some(alias) => self.norm(alias),
                    None => src.name.clone(),
                };
                self.scopes.add_entry(
                    scope,
                    ScopeEntry {
                        name: binding,
                        kind: BindingKind::Unpivot,
                        source_table: None,
                        columns: Some(column_lineage.iter().map(|c| c.name.clone()).collect()),
                        column_lineage: Some(column_lineage),
                        underlying: src.underlying,
                    },
                );
                Ok(())
            }
        }
    }

    /// Pivot aggregates resolve against the source entry alone, outside the
    /// enclosing scope's other bindings.
    fn pivot_expr_lineage(
        &mut self,
        expr: &Expr,
        src: &ScopeEntry,
    ) -> Result<ExprLineage, Error> {
        let scratch = self.scopes.push_scope(None);
        self.scopes.add_entry(scratch, src.clone());
        self.expr_lineage(expr, scratch, &mut Vec::new())
    }

    // -- star expansion -----------------------------------------------------

    fn expand_star(
        &mut self,
        scope: ScopeId,
        qualifier: Option<&crate::ast::Ident>,
        modifiers: &[StarModifier],
        _span: Span,
    ) -> Result<Vec<ColumnLineage>, Error> {
        let entries: Vec<ScopeEntry> = match qualifier {
            Some(q) => match self.scopes.lookup_entry(scope, &self.norm(q)) {
                Some(entry) => vec![entry.clone()],
                None => {
                    return Ok(vec![opaque_star(format!("{}.*", q.value))]);
                }
            },
            None => self.scopes.entries(scope).to_vec(),
        };

        // Expansion needs every covered binding's column list; anything
        // opaque degrades the whole item to a single opaque column.
        if entries.is_empty() || entries.iter().any(|e| e.columns.is_none()) {
            let name = match qualifier {
                Some(q) => format!("{}.*", q.value),
                None => "*".to_string(),
            };
            return Ok(vec![opaque_star(name)]);
        }

        let mut columns = Vec::new();
        for entry in &entries {
            // Pivot/unpivot bindings expand through their computed column
            // lineage; everything else expands to one direct SourceRef per
            // column, attributed to the binding (single underlying physical
            // for CTE/derived, alias otherwise).
            if matches!(entry.kind, BindingKind::Pivot | BindingKind::Unpivot) {
                if let Some(lineage) = &entry.column_lineage {
                    columns.extend(lineage.iter().cloned());
                    continue;
                }
            }
            let attribution = entry.attribution();
            for column in entry.columns.as_ref().expect("checked above") {
                columns.push(ColumnLineage {
                    name: column.clone(),
                    sources: vec![SourceRef::new(attribution.clone(), column.clone())],
                    transform: Transform::Direct,
                    function: String::new(),
                });
            }
        }

        for modifier in modifiers {
            match modifier {
                StarModifier::Exclude(excluded) => {
                    let names: HashSet<String> =
                        excluded.iter().map(|c| self.norm(c)).collect();
                    columns.retain(|c| !names.contains(&self.dialect.normalize(&c.name)));
                }
                StarModifier::Replace(items) => {
                    for item in items {
                        let target = self.norm(&item.alias);
                        let lineage = self.expr_lineage(&item.expr, scope, &mut Vec::new())?;
                        if let Some(column) = columns
                            .iter_mut()
                            .find(|c| self.dialect.normalize(&c.name) == target)
                        {
                            column.sources = lineage.sources;
                            column.transform = Transform::Expression;
                            column.function = lineage.function;
                        }
                    }
                }
                StarModifier::Rename(items) => {
                    for item in items {
                        let target = self.norm(&item.old);
                        if let Some(column) = columns
                            .iter_mut()
                            .find(|c| self.dialect.normalize(&c.name) == target)
                        {
                            column.name = self.norm(&item.new);
                        }
                    }
                }
            }
        }

        Ok(columns)
    }

    // -- expressions --------------------------------------------------------

    fn expr_lineage(
        &mut self,
        expr: &Expr,
        scope: ScopeId,
        shadowed: &mut Vec<String>,
    ) -> Result<ExprLineage, Error> {
        match expr {
            Expr::ColumnRef { table, column, .. } => {
                if table.is_none() && shadowed.contains(&self.norm(column)) {
                    // Lambda parameters are local bindings, not column refs.
                    return Ok(ExprLineage::empty());
                }
                let (sources, direct) = self.resolve_column(scope, table.as_ref(), column);
                Ok(ExprLineage {
                    sources,
                    transform: if direct {
                        Transform::Direct
                    } else {
                        Transform::Expression
                    },
                    function: String::new(),
                })
            }

            Expr::Literal { .. } | Expr::Wildcard { .. } => Ok(ExprLineage::empty()),

            Expr::FuncCall {
                name, args, over, ..
            } => {
                let (canonical, class) = self.dialect.function_lineage(&name.value);
                let mut sources = Vec::new();
                for arg in args {
                    let lineage = self.expr_lineage(arg, scope, shadowed)?;
                    for source in lineage.sources {
                        push_unique(&mut sources, source);
                    }
                }
                let class = if over.is_some() && class == FunctionClass::Passthrough {
                    FunctionClass::Window
                } else {
                    class
                };
                let lineage = match class {
                    FunctionClass::Aggregate | FunctionClass::Window => ExprLineage {
                        sources,
                        transform: Transform::Expression,
                        function: canonical,
                    },
                    FunctionClass::Generator | FunctionClass::TableValued => ExprLineage {
                        sources: Vec::new(),
                        transform: Transform::Expression,
                        function: canonical,
                    },
                    FunctionClass::Passthrough => {
                        let transform = if sources.len() == 1 {
                            Transform::Direct
                        } else {
                            Transform::Expression
                        };
                        ExprLineage {
                            sources,
                            transform,
                            function: String::new(),
                        }
                    }
                };
                Ok(lineage)
            }

            Expr::Binary { left, right, .. } => {
                let mut lineage = self.expr_lineage(left, scope, shadowed)?;
                let right = self.expr_lineage(right, scope, shadowed)?;
                for source in right.sources {
                    push_unique(&mut lineage.sources, source);
                }
                Ok(ExprLineage::expression(lineage.sources))
            }

            Expr::Unary { expr, .. } => {
                let inner = self.expr_lineage(expr, scope, shadowed)?;
                Ok(ExprLineage::expression(inner.sources))
            }

            // Parentheses are transparent: `(x)` is still a direct ref.
            Expr::Paren { expr, .. } => self.expr_lineage(expr, scope, shadowed),

            Expr::Case {
                operand,
                branches,
                else_expr,
                ..
            } => {
                let mut sources = Vec::new();
                if let Some(operand) = operand {
                    self.collect_into(operand, scope, shadowed, &mut sources)?;
                }
                for branch in branches {
                    self.collect_into(&branch.condition, scope, shadowed, &mut sources)?;
                    self.collect_into(&branch.result, scope, shadowed, &mut sources)?;
                }
                if let Some(else_expr) = else_expr {
                    self.collect_into(else_expr, scope, shadowed, &mut sources)?;
                }
                Ok(ExprLineage::expression(sources))
            }

            Expr::Cast { expr, .. } => {
                let inner = self.expr_lineage(expr, scope, shadowed)?;
                Ok(ExprLineage::expression(inner.sources))
            }

            Expr::Subquery { select, .. } => {
                // Tunnel vision: the subquery's FROM and its own CTEs
                // contribute; WHERE/HAVING are never walked, and the parent
                // is the statement scope, so enclosing FROM bindings stay
                // invisible and correlated refs are not traced.
                let parent = self.scopes.parent_of(scope);
                let inner = self.extract_stmt(select, parent)?;
                let mut sources = Vec::new();
                for column in inner.columns {
                    for source in column.sources {
                        push_unique(&mut sources, source);
                    }
                }
                Ok(ExprLineage::expression(sources))
            }

            Expr::In { expr, set, .. } => {
                let mut sources = Vec::new();
                self.collect_into(expr, scope, shadowed, &mut sources)?;
                match set {
                    crate::ast::InSet::List(items) => {
                        for item in items {
                            self.collect_into(item, scope, shadowed, &mut sources)?;
                        }
                    }
                    crate::ast::InSet::Subquery(select) => {
                        let parent = self.scopes.parent_of(scope);
                        let inner = self.extract_stmt(select, parent)?;
                        for column in inner.columns {
                            for source in column.sources {
                                push_unique(&mut sources, source);
                            }
                        }
                    }
                }
                Ok(ExprLineage::expression(sources))
            }

            Expr::Between {
                expr, low, high, ..
            } => {
                let mut sources = Vec::new();
                self.collect_into(expr, scope, shadowed, &mut sources)?;
                self.collect_into(low, scope, shadowed, &mut sources)?;
                self.collect_into(high, scope, shadowed, &mut sources)?;
                Ok(ExprLineage::expression(sources))
            }

            Expr::IsNull { expr, .. } | Expr::IsBool { expr, .. } => {
                let inner = self.expr_lineage(expr, scope, shadowed)?;
                Ok(ExprLineage::expression(inner.sources))
            }

            Expr::Like {
                expr,
                pattern,
                escape,
                ..
            } => {
                let mut sources = Vec::new();
                self.collect_into(expr, scope, shadowed, &mut sources)?;
                self.collect_into(pattern, scope, shadowed, &mut sources)?;
                if let Some(escape) = escape {
                    self.collect_into(escape, scope, shadowed, &mut sources)?;
                }
                Ok(ExprLineage::expression(sources))
            }

            Expr::Lambda { params, body, .. } => {
                let added = params.len();
                for param in params {
                    shadowed.push(self.norm(param));
                }
                let lineage = self.expr_lineage(body, scope, shadowed);
                shadowed.truncate(shadowed.len() - added);
                lineage
            }

            Expr::List { items, .. } => {
                let mut sources = Vec::new();
                for item in items {
                    self.collect_into(item, scope, shadowed, &mut sources)?;
                }
                Ok(ExprLineage::expression(sources))
            }

            Expr::Struct { fields, .. } => {
                let mut sources = Vec::new();
                for (_, value) in fields {
                    self.collect_into(value, scope, shadowed, &mut sources)?;
                }
                Ok(ExprLineage::expression(sources))
            }

            Expr::Index { expr, index, .. } => {
                let mut sources = Vec::new();
                self.collect_into(expr, scope, shadowed, &mut sources)?;
                match index {
                    crate::ast::IndexOp::Element(element) => {
                        self.collect_into(element, scope, shadowed, &mut sources)?;
                    }
                    crate::ast::IndexOp::Slice { start, end } => {
                        if let Some(start) = start {
                            self.collect_into(start, scope, shadowed, &mut sources)?;
                        }
                        if let Some(end) = end {
                            self.collect_into(end, scope, shadowed, &mut sources)?;
                        }
                    }
                }
                Ok(ExprLineage::expression(sources))
            }
        }
    }

    fn collect_into(
        &mut self,
        expr: &Expr,
        scope: ScopeId,
        shadowed: &mut Vec<String>,
        sources: &mut Vec<SourceRef>,
    ) -> Result<(), Error> {
        let lineage = self.expr_lineage(expr, scope, shadowed)?;
        for source in lineage.sources {
            push_unique(sources, source);
        }
        Ok(())
    }

    // -- name resolution ----------------------------------------------------

    /// Resolves a column reference to its sources. Returns the sources plus
    /// whether the reference is a direct passthrough.
    fn resolve_column(
        &self,
        scope: ScopeId,
        qualifier: Option<&crate::ast::Ident>,
        column: &crate::ast::Ident,
    ) -> (Vec<SourceRef>, bool) {
        let column_name = self.norm(column);

        if let Some(qualifier) = qualifier {
            let qualifier_name = self.norm(qualifier);
            if let Some(entry) = self.scopes.lookup_entry(scope, &qualifier_name) {
                return resolve_in_entry(entry, &column_name);
            }
            // Unknown qualifier: unresolved but attributed as written.
            return (
                vec![SourceRef::new(qualifier_name, column_name)],
                true,
            );
        }

        // Unqualified: first binding (insertion order, inner scopes first)
        // whose known columns contain the name wins.
        let mut current = Some(scope);
        while let Some(id) = current {
            for entry in self.scopes.entries(id) {
                if let Some(columns) = &entry.columns {
                    if columns.contains(&column_name) {
                        return resolve_in_entry(entry, &column_name);
                    }
                }
            }
            current = self.scopes.parent_of(id);
        }

        // No column list matched: a lone binding still gets the attribution.
        let entries = self.scopes.entries(scope);
        if entries.len() == 1 {
            return resolve_in_entry(&entries[0], &column_name);
        }

        (vec![SourceRef::new("", column_name)], true)
    }
}

/// Resolves a column against one binding. CTE/derived entries resolve
/// through their inner column lineage; everything else attributes the
/// column to the binding's source table.
fn resolve_in_entry(entry: &ScopeEntry, column: &str) -> (Vec<SourceRef>, bool) {
    if let Some(lineage) = &entry.column_lineage {
        if let Some(inner) = lineage.iter().find(|c| c.name == column) {
            return (inner.sources.clone(), inner.transform == Transform::Direct);
        }
    }
    (
        vec![SourceRef::new(entry.attribution(), column)],
        true,
    )
}

fn push_unique(sources: &mut Vec<SourceRef>, source: SourceRef) {
    if !sources
        .iter()
        .any(|s| s.table == source.table && s.column == source.column)
    {
        sources.push(source);
    }
}

fn opaque_star(name: String) -> ColumnLineage {
    ColumnLineage {
        name,
        sources: Vec::new(),
        transform: Transform::Direct,
        function: String::new(),
    }
}

/// Output name for an unaliased select item.
fn output_name(expr: &Expr, idx: usize) -> String {
    match expr {
        Expr::ColumnRef { column, .. } => column.value.clone(),
        Expr::FuncCall { name, .. } => name.value.to_lowercase(),
        Expr::Cast { expr, .. } | Expr::Paren { expr, .. } => output_name(expr, idx),
        _ => format!("column{}", idx + 1),
    }
}

/// Pivot value columns are named after the IN values.
fn value_column_name(value: &Expr) -> String {
    match value {
        Expr::Literal { raw, .. } => raw.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::duckdb;
    use std::sync::Arc;

    fn extract(sql: &str) -> ModelLineage {
        let opts = ExtractOptions::new(Arc::new(duckdb()));
        extract_lineage(sql, &opts).unwrap_or_else(|e| panic!("extract failed for {sql:?}: {e}"))
    }

    fn extract_with_schema(sql: &str, schema: Schema) -> ModelLineage {
        let opts = ExtractOptions::new(Arc::new(duckdb())).with_schema(schema);
        extract_lineage(sql, &opts).unwrap_or_else(|e| panic!("extract failed for {sql:?}: {e}"))
    }

    #[test]
    fn missing_dialect_is_an_error() {
        let err = extract_lineage("SELECT 1", &ExtractOptions::default()).unwrap_err();
        assert_eq!(err, Error::DialectRequired);
    }

    #[test]
    fn lone_binding_attribution_without_schema() {
        let lineage = extract("SELECT id, name FROM users");
        assert_eq!(lineage.sources, vec!["users"]);
        assert_eq!(lineage.columns[0].sources, vec![SourceRef::new("users", "id")]);
        assert_eq!(lineage.columns[0].transform, Transform::Direct);
    }

    #[test]
    fn unqualified_ambiguity_degrades_to_empty_table() {
        // Two bindings, no schema: the reference cannot be attributed.
        let lineage = extract("SELECT amount FROM a, b");
        assert_eq!(
            lineage.columns[0].sources,
            vec![SourceRef::new("", "amount")]
        );
    }

    #[test]
    fn unqualified_resolves_first_match_in_insertion_order() {
        let schema = Schema::new().table("a", ["x"]).table("b", ["x", "y"]);
        let lineage = extract_with_schema("SELECT x FROM a, b", schema);
        assert_eq!(lineage.columns[0].sources, vec![SourceRef::new("a", "x")]);
    }

    #[test]
    fn qualified_unknown_table_keeps_attribution() {
        let lineage = extract("SELECT z.id FROM users u");
        assert_eq!(lineage.columns[0].sources, vec![SourceRef::new("z", "id")]);
        // The phantom qualifier never reaches the source set.
        assert_eq!(lineage.sources, vec!["users"]);
    }

    #[test]
    fn case_insensitive_binding_lookup() {
        let lineage = extract("SELECT U.Id FROM Users U");
        assert_eq!(lineage.sources, vec!["users"]);
        assert_eq!(lineage.columns[0].sources, vec![SourceRef::new("users", "id")]);
    }

    #[test]
    fn literal_only_select() {
        let lineage = extract("SELECT 1");
        assert!(lineage.sources.is_empty());
        assert_eq!(lineage.columns.len(), 1);
        assert_eq!(lineage.columns[0].name, "column1");
        assert_eq!(lineage.columns[0].transform, Transform::Expression);
        assert!(lineage.columns[0].sources.is_empty());
        assert!(!lineage.uses_select_star);
    }

    #[test]
    fn output_names_infer_from_expressions() {
        let lineage = extract("SELECT id, count(*), cast(x AS int), (y), 1 + 2 FROM t");
        let names: Vec<&str> = lineage.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "count", "x", "y", "column5"]);
    }

    #[test]
    fn generator_has_no_sources() {
        let lineage = extract("SELECT now() AS ts FROM events");
        assert_eq!(lineage.columns[0].function, "now");
        assert!(lineage.columns[0].sources.is_empty());
        assert_eq!(lineage.columns[0].transform, Transform::Expression);
    }

    #[test]
    fn passthrough_single_source_stays_direct() {
        let lineage = extract("SELECT coalesce(name, 'n/a') FROM users");
        assert_eq!(lineage.columns[0].transform, Transform::Direct);
        assert_eq!(lineage.columns[0].function, "");
        assert_eq!(
            lineage.columns[0].sources,
            vec![SourceRef::new("users", "name")]
        );
    }

    #[test]
    fn passthrough_two_sources_becomes_expression() {
        let lineage = extract("SELECT coalesce(nick, name) FROM users");
        assert_eq!(lineage.columns[0].transform, Transform::Expression);
        assert_eq!(lineage.columns[0].sources.len(), 2);
    }

    #[test]
    fn any_call_with_over_counts_as_window() {
        let lineage = extract("SELECT my_udf(x) OVER (PARTITION BY y) FROM t");
        assert_eq!(lineage.columns[0].function, "my_udf");
        assert_eq!(lineage.columns[0].transform, Transform::Expression);
    }

    #[test]
    fn scalar_subquery_is_tunnel_visioned() {
        let lineage = extract(
            "SELECT (SELECT max(price) FROM products WHERE products.id = o.product_id) \
             FROM orders o",
        );
        assert_eq!(lineage.sources, vec!["orders", "products"]);
        let column = &lineage.columns[0];
        assert_eq!(column.transform, Transform::Expression);
        // Only the subquery's own SELECT list contributes; the correlated
        // predicate in WHERE is not traced.
        assert_eq!(column.sources, vec![SourceRef::new("products", "price")]);
    }

    #[test]
    fn lambda_parameters_are_not_columns() {
        let lineage = extract("SELECT list_transform([1, 2, 3], x -> x * 2)");
        let column = &lineage.columns[0];
        assert_eq!(column.function, "list_transform");
        assert!(column.sources.is_empty());
        assert!(lineage.sources.is_empty());
    }

    #[test]
    fn lambda_over_a_column_keeps_the_column() {
        let lineage = extract("SELECT list_transform(tags, x -> upper(x)) FROM posts");
        assert_eq!(
            lineage.columns[0].sources,
            vec![SourceRef::new("posts", "tags")]
        );
        assert_eq!(lineage.columns[0].function, "list_transform");
    }

    #[test]
    fn index_and_struct_and_list_union_sources() {
        let lineage = extract("SELECT {'a': x, 'b': y}, items[1], items[1:2] FROM t");
        assert_eq!(lineage.columns[0].sources.len(), 2);
        assert_eq!(
            lineage.columns[1].sources,
            vec![SourceRef::new("t", "items")]
        );
        assert_eq!(lineage.columns[0].transform, Transform::Expression);
    }

    #[test]
    fn duplicate_cte_names_are_rejected() {
        let err = extract_lineage(
            "WITH c AS (SELECT 1), c AS (SELECT 2) SELECT 1 FROM c",
            &ExtractOptions::new(Arc::new(duckdb())),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Resolve { .. }));
        assert!(err.to_string().contains("duplicate CTE"));
    }

    #[test]
    fn recursive_cte_self_reference_binds() {
        let lineage = extract(
            "WITH RECURSIVE walk AS (\
               SELECT id, parent_id FROM nodes \
               UNION ALL \
               SELECT n.id, n.parent_id FROM nodes n JOIN walk w ON n.parent_id = w.id\
             ) SELECT id FROM walk",
        );
        assert_eq!(lineage.sources, vec!["nodes"]);
    }

    #[test]
    fn cte_explicit_column_list_renames() {
        let lineage = extract(
            "WITH totals (cust, amt) AS (SELECT customer_id, sum(amount) FROM orders GROUP BY 1) \
             SELECT cust, amt FROM totals",
        );
        assert_eq!(lineage.sources, vec!["orders"]);
        assert_eq!(lineage.columns[0].name, "cust");
        assert_eq!(
            lineage.columns[0].sources,
            vec![SourceRef::new("orders", "customer_id")]
        );
        // The renamed aggregate column keeps its expression lineage, but an
        // outer reference to it is itself no function call.
        assert_eq!(lineage.columns[1].transform, Transform::Expression);
        assert_eq!(lineage.columns[1].function, "");
        assert_eq!(
            lineage.columns[1].sources,
            vec![SourceRef::new("orders", "amount")]
        );
    }

    #[test]
    fn unused_cte_tables_still_count_as_sources() {
        let lineage = extract("WITH unused AS (SELECT 1 FROM audit_log) SELECT id FROM users");
        assert_eq!(lineage.sources, vec!["audit_log", "users"]);
    }

    #[test]
    fn pivot_contributes_table_level_lineage() {
        let lineage =
            extract("SELECT * FROM sales PIVOT (sum(amount) FOR region IN ('east', 'west')) p");
        assert_eq!(lineage.sources, vec!["sales"]);
        // Pivot value columns are named by the IN values and trace to the
        // aggregate and FOR columns.
        assert_eq!(lineage.columns.len(), 2);
        assert_eq!(lineage.columns[0].name, "east");
        assert_eq!(lineage.columns[0].function, "sum");
        assert!(lineage.columns[0]
            .sources
            .contains(&SourceRef::new("sales", "amount")));
    }

    #[test]
    fn unpivot_value_column_unions_in_columns() {
        let lineage = extract(
            "SELECT amount FROM monthly UNPIVOT (amount FOR month IN (jan, feb)) u",
        );
        assert_eq!(lineage.sources, vec!["monthly"]);
        let amount = &lineage.columns[0];
        assert_eq!(amount.transform, Transform::Expression);
        assert_eq!(
            amount.sources,
            vec![
                SourceRef::new("monthly", "jan"),
                SourceRef::new("monthly", "feb"),
            ]
        );
    }

    #[test]
    fn lateral_sees_left_siblings() {
        let lineage = extract(
            "SELECT l.doubled FROM t, LATERAL (SELECT t.x * 2 AS doubled) l",
        );
        assert_eq!(lineage.sources, vec!["t"]);
        assert_eq!(
            lineage.columns[0].sources,
            vec![SourceRef::new("t", "x")]
        );
    }

    #[test]
    fn derived_table_does_not_see_siblings() {
        // The derived table's `a.x` cannot bind to the sibling binding; it
        // stays attributed to the unknown qualifier.
        let lineage = extract("SELECT d.v FROM a, (SELECT a.x AS v) d");
        assert_eq!(lineage.columns[0].sources, vec![SourceRef::new("a", "x")]);
        assert_eq!(lineage.sources, vec!["a"]);
    }

    #[test]
    fn deterministic_across_calls() {
        let sql = "WITH c AS (SELECT id FROM users) \
                   SELECT c.id, o.total FROM c JOIN orders o ON c.id = o.user_id";
        let first = extract(sql);
        let second = extract(sql);
        assert_eq!(first, second);
    }
}
