//! Scope tree for name resolution.
//!
//! Scopes form an index-based arena: a statement scope holds the CTE
//! namespace, each SELECT core gets a child scope holding FROM bindings in
//! insertion order, and subqueries hang off the statement scope so they see
//! CTEs but not the enclosing FROM bindings (LATERAL subqueries hang off
//! the core scope instead, which is what gives them sibling visibility).
//! The tree references no AST nodes and owns only derived data.

use crate::types::ColumnLineage;
use std::collections::{BTreeSet, HashMap};

pub(crate) type ScopeId = usize;

/// What a FROM binding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BindingKind {
    Table,
    Cte,
    Derived,
    Lateral,
    Pivot,
    Unpivot,
}

/// One FROM binding. Names and columns are stored normalized.
#[derive(Debug, Clone)]
pub(crate) struct ScopeEntry {
    /// Binding name: the alias when present, otherwise the table/CTE name.
    pub name: String,
    pub kind: BindingKind,
    /// Fully-qualified physical name; `Table` entries only.
    pub source_table: Option<String>,
    /// Output columns when known: schema-provided for physical tables,
    /// select-list derived for CTE/derived/pivot entries.
    pub columns: Option<Vec<String>>,
    /// Per-column inner lineage for CTE/derived/pivot/unpivot entries, so
    /// outer references resolve through to physical sources.
    pub column_lineage: Option<Vec<ColumnLineage>>,
    /// Closure of physical tables reachable through this binding.
    pub underlying: BTreeSet<String>,
}

impl ScopeEntry {
    /// The table name outer references are attributed to: the physical name
    /// for tables, the single underlying physical for CTE/derived bindings
    /// when there is exactly one, and the alias otherwise.
    pub fn attribution(&self) -> String {
        match self.kind {
            BindingKind::Table => self
                .source_table
                .clone()
                .unwrap_or_else(|| self.name.clone()),
            _ => {
                if self.underlying.len() == 1 {
                    self.underlying.iter().next().expect("one element").clone()
                } else {
                    self.name.clone()
                }
            }
        }
    }
}

/// A resolved CTE: its output column lineage plus the closure of physical
/// tables its body reads.
#[derive(Debug, Clone, Default)]
pub(crate) struct CteDef {
    pub columns: Vec<ColumnLineage>,
    pub underlying: BTreeSet<String>,
}

#[derive(Debug, Default)]
struct ScopeData {
    parent: Option<ScopeId>,
    entries: Vec<ScopeEntry>,
    ctes: HashMap<String, CteDef>,
}

/// Arena of scopes for one extraction call.
#[derive(Debug, Default)]
pub(crate) struct ScopeTree {
    scopes: Vec<ScopeData>,
}

impl ScopeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_scope(&mut self, parent: Option<ScopeId>) -> ScopeId {
        debug_assert!(parent.is_none_or(|p| p < self.scopes.len()));
        self.scopes.push(ScopeData {
            parent,
            ..ScopeData::default()
        });
        self.scopes.len() - 1
    }

    pub fn parent_of(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope].parent
    }

    pub fn add_entry(&mut self, scope: ScopeId, entry: ScopeEntry) {
        self.scopes[scope].entries.push(entry);
    }

    /// Removes and returns the most recently added binding; used by
    /// PIVOT/UNPIVOT, which replace their source binding.
    pub fn pop_entry(&mut self, scope: ScopeId) -> Option<ScopeEntry> {
        self.scopes[scope].entries.pop()
    }

    pub fn entries(&self, scope: ScopeId) -> &[ScopeEntry] {
        &self.scopes[scope].entries
    }

    /// First binding with the given normalized name, walking the scope
    /// chain inner-to-outer.
    pub fn lookup_entry(&self, scope: ScopeId, name: &str) -> Option<&ScopeEntry> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let data = &self.scopes[id];
            if let Some(entry) = data.entries.iter().find(|e| e.name == name) {
                return Some(entry);
            }
            current = data.parent;
        }
        None
    }

    /// True when the scope itself (not an ancestor) declares the CTE.
    pub fn has_local_cte(&self, scope: ScopeId, name: &str) -> bool {
        self.scopes[scope].ctes.contains_key(name)
    }

    pub fn add_cte(&mut self, scope: ScopeId, name: String, def: CteDef) {
        self.scopes[scope].ctes.insert(name, def);
    }

    /// CTE lookup walks the chain, so an inner query sees outer CTEs and a
    /// CTE declared in an inner scope hides an outer one of the same name.
    pub fn lookup_cte(&self, scope: ScopeId, name: &str) -> Option<&CteDef> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let data = &self.scopes[id];
            if let Some(def) = data.ctes.get(name) {
                return Some(def);
            }
            current = data.parent;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SourceRef, Transform};

    fn table_entry(name: &str, source: &str) -> ScopeEntry {
        ScopeEntry {
            name: name.to_string(),
            kind: BindingKind::Table,
            source_table: Some(source.to_string()),
            columns: None,
            column_lineage: None,
            underlying: BTreeSet::from([source.to_string()]),
        }
    }

    #[test]
    fn lookup_walks_the_chain() {
        let mut tree = ScopeTree::new();
        let outer = tree.push_scope(None);
        let inner = tree.push_scope(Some(outer));
        tree.add_entry(outer, table_entry("u", "users"));

        assert!(tree.lookup_entry(inner, "u").is_some());
        assert!(tree.lookup_entry(inner, "missing").is_none());
    }

    #[test]
    fn inner_entry_shadows_outer() {
        let mut tree = ScopeTree::new();
        let outer = tree.push_scope(None);
        let inner = tree.push_scope(Some(outer));
        tree.add_entry(outer, table_entry("t", "outer_table"));
        tree.add_entry(inner, table_entry("t", "inner_table"));

        let entry = tree.lookup_entry(inner, "t").unwrap();
        assert_eq!(entry.source_table.as_deref(), Some("inner_table"));
    }

    #[test]
    fn cte_lookup_walks_and_shadows() {
        let mut tree = ScopeTree::new();
        let outer = tree.push_scope(None);
        let inner = tree.push_scope(Some(outer));
        tree.add_cte(
            outer,
            "c".to_string(),
            CteDef {
                columns: vec![],
                underlying: BTreeSet::from(["users".to_string()]),
            },
        );

        assert!(tree.lookup_cte(inner, "c").is_some());
        assert!(!tree.has_local_cte(inner, "c"));

        tree.add_cte(inner, "c".to_string(), CteDef::default());
        assert!(tree.lookup_cte(inner, "c").unwrap().underlying.is_empty());
    }

    #[test]
    fn attribution_substitutes_single_underlying() {
        let single = ScopeEntry {
            name: "active".to_string(),
            kind: BindingKind::Cte,
            source_table: None,
            columns: Some(vec!["id".to_string()]),
            column_lineage: Some(vec![ColumnLineage {
                name: "id".to_string(),
                sources: vec![SourceRef::new("users", "id")],
                transform: Transform::Direct,
                function: String::new(),
            }]),
            underlying: BTreeSet::from(["users".to_string()]),
        };
        assert_eq!(single.attribution(), "users");

        let mut multi = single.clone();
        multi.underlying.insert("orders".to_string());
        assert_eq!(multi.attribution(), "active");
    }

    #[test]
    fn entries_preserve_insertion_order() {
        let mut tree = ScopeTree::new();
        let scope = tree.push_scope(None);
        tree.add_entry(scope, table_entry("a", "alpha"));
        tree.add_entry(scope, table_entry("b", "beta"));
        let names: Vec<&str> = tree.entries(scope).iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
