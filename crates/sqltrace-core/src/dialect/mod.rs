//! Dialect values and the process-global dialect registry.
//!
//! A [`Dialect`] is an immutable bundle of tables the lexer and parser are
//! parameterized by: keywords, operators, Pratt parse functions, clause
//! handlers, star-modifier and FROM-item handlers, join types, and function
//! classifications. Dialects are built with [`DialectBuilder`] and composed
//! with [`Dialect::extend`], which merges tables additively (later additions
//! win on conflict).
//!
//! The registry is the only process-wide mutable state in the crate. It is
//! expected to be populated during process init and treated as read-only
//! afterwards; readers take a short read lock.

mod ansi;
mod duckdb;
mod postgres;

pub use ansi::ansi;
pub use duckdb::duckdb;
pub use postgres::postgres;

use crate::ast::{Expr, SelectCore, StarModifier, TableRef};
use crate::error::Error;
use crate::parser::Parser;
use crate::token::{Token, TokenKind};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

/// Parses a prefix position: the token has been consumed and is passed in.
pub type PrefixFn = fn(&mut Parser<'_>, Token) -> Result<Expr, Error>;

/// Parses an infix position: the left operand and the consumed operator
/// token are passed in.
pub type InfixFn = fn(&mut Parser<'_>, Expr, Token) -> Result<Expr, Error>;

/// An infix parse function with its Pratt binding power.
#[derive(Clone, Copy)]
pub struct InfixEntry {
    pub power: u8,
    pub parse: InfixFn,
}

/// Parses one post-WHERE clause into its slot on the core. The handler
/// consumes its own start keyword.
pub type ClauseFn = fn(&mut Parser<'_>, &mut SelectCore) -> Result<(), Error>;

/// One entry of the dialect's ordered clause sequence.
#[derive(Clone, Copy)]
pub struct ClauseHandler {
    pub start: TokenKind,
    pub parse: ClauseFn,
}

/// Parses a FROM-item suffix (PIVOT/UNPIVOT) wrapping the source to its
/// left. The start token has been consumed and is passed in.
pub type FromItemFn = fn(&mut Parser<'_>, TableRef, Token) -> Result<TableRef, Error>;

/// Parses one star modifier. The start token has been consumed.
pub type StarModifierFn = fn(&mut Parser<'_>, Token) -> Result<StarModifier, Error>;

/// A join type recognized by the dialect.
#[derive(Debug, Clone, Copy)]
pub struct JoinTypeDef {
    pub name: &'static str,
    pub requires_on: bool,
    pub allows_using: bool,
}

/// Identifier normalization mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Normalization {
    /// Identifiers compare case-insensitively; normalized form is lowercase.
    #[default]
    CaseInsensitive,
    /// Identifiers compare exactly as written.
    CaseSensitive,
}

/// Placeholder syntax accepted by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceholderStyle {
    /// `?`
    #[default]
    QuestionMark,
    /// `$1`, `$2`, ...
    Dollar,
    /// `:name`
    Colon,
}

/// Lineage classification of a function, resolved after alias expansion.
///
/// The class names describe the lineage contract, not SQL taxonomy: an
/// `Aggregate` classification means "report the function name and union the
/// argument sources".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionClass {
    Aggregate,
    Window,
    Generator,
    TableValued,
    Passthrough,
}

/// An immutable dialect value. Construct with [`DialectBuilder`] or one of
/// the shipped constructors ([`ansi`], [`duckdb`], [`postgres`]).
#[derive(Clone)]
pub struct Dialect {
    name: String,
    ident_quote: char,
    normalization: Normalization,
    default_schema: String,
    placeholder: PlaceholderStyle,
    pipe_is_concat: bool,
    concat_null_as_empty: bool,
    escape_strings: bool,
    dollar_strings: bool,
    keywords: HashMap<String, TokenKind>,
    /// Multi-char operator texts, kept sorted longest-first for the lexer's
    /// longest-match scan.
    operators: Vec<(String, TokenKind)>,
    prefix: HashMap<TokenKind, PrefixFn>,
    infix: HashMap<TokenKind, InfixEntry>,
    clauses: Vec<ClauseHandler>,
    from_items: HashMap<TokenKind, FromItemFn>,
    star_modifiers: HashMap<TokenKind, StarModifierFn>,
    join_types: HashMap<TokenKind, JoinTypeDef>,
    function_classes: HashMap<String, FunctionClass>,
    function_aliases: HashMap<String, String>,
}

impl std::fmt::Debug for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dialect")
            .field("name", &self.name)
            .field("normalization", &self.normalization)
            .field("default_schema", &self.default_schema)
            .finish_non_exhaustive()
    }
}

impl Dialect {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ident_quote(&self) -> char {
        self.ident_quote
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    pub fn default_schema(&self) -> &str {
        &self.default_schema
    }

    pub fn placeholder(&self) -> PlaceholderStyle {
        self.placeholder
    }

    pub fn pipe_is_concat(&self) -> bool {
        self.pipe_is_concat
    }

    pub fn concat_null_as_empty(&self) -> bool {
        self.concat_null_as_empty
    }

    pub fn escape_strings(&self) -> bool {
        self.escape_strings
    }

    pub fn dollar_strings(&self) -> bool {
        self.dollar_strings
    }

    /// Normalizes an identifier for comparison per the dialect mode.
    pub fn normalize(&self, ident: &str) -> String {
        match self.normalization {
            Normalization::CaseInsensitive => ident.to_lowercase(),
            Normalization::CaseSensitive => ident.to_string(),
        }
    }

    /// Keyword lookup for the lexer; `upper` must already be uppercased.
    pub(crate) fn keyword_kind(&self, upper: &str) -> Option<TokenKind> {
        self.keywords.get(upper).copied()
    }

    /// Operator texts, longest first.
    pub(crate) fn operators(&self) -> &[(String, TokenKind)] {
        &self.operators
    }

    pub(crate) fn prefix_fn(&self, kind: TokenKind) -> Option<PrefixFn> {
        self.prefix.get(&kind).copied()
    }

    pub(crate) fn infix_entry(&self, kind: TokenKind) -> Option<InfixEntry> {
        self.infix.get(&kind).copied()
    }

    pub(crate) fn clauses(&self) -> &[ClauseHandler] {
        &self.clauses
    }

    pub(crate) fn from_item_fn(&self, kind: TokenKind) -> Option<FromItemFn> {
        self.from_items.get(&kind).copied()
    }

    pub(crate) fn star_modifier_fn(&self, kind: TokenKind) -> Option<StarModifierFn> {
        self.star_modifiers.get(&kind).copied()
    }

    pub(crate) fn join_type(&self, kind: TokenKind) -> Option<JoinTypeDef> {
        self.join_types.get(&kind).copied()
    }

    /// Resolves a raw function name to its canonical lowercase form and its
    /// lineage classification. Aliases (`IFNULL` → `coalesce`) are expanded
    /// before classification; unknown names classify as Passthrough.
    pub fn function_lineage(&self, raw: &str) -> (String, FunctionClass) {
        let lowered = raw.to_lowercase();
        let canonical = self
            .function_aliases
            .get(&lowered)
            .cloned()
            .unwrap_or(lowered);
        let class = self
            .function_classes
            .get(&canonical)
            .copied()
            .unwrap_or(FunctionClass::Passthrough);
        (canonical, class)
    }

    /// Starts a builder seeded with this dialect's tables.
    pub fn extend(&self, name: impl Into<String>) -> DialectBuilder {
        let mut builder = DialectBuilder::from_dialect(self.clone());
        builder.dialect.name = name.into();
        builder
    }
}

/// Builder producing an immutable [`Dialect`].
pub struct DialectBuilder {
    dialect: Dialect,
}

impl DialectBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            dialect: Dialect {
                name: name.into(),
                ident_quote: '"',
                normalization: Normalization::CaseInsensitive,
                default_schema: String::new(),
                placeholder: PlaceholderStyle::QuestionMark,
                pipe_is_concat: true,
                concat_null_as_empty: false,
                escape_strings: false,
                dollar_strings: false,
                keywords: HashMap::new(),
                operators: Vec::new(),
                prefix: HashMap::new(),
                infix: HashMap::new(),
                clauses: Vec::new(),
                from_items: HashMap::new(),
                star_modifiers: HashMap::new(),
                join_types: HashMap::new(),
                function_classes: HashMap::new(),
                function_aliases: HashMap::new(),
            },
        }
    }

    fn from_dialect(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn ident_quote(mut self, quote: char) -> Self {
        self.dialect.ident_quote = quote;
        self
    }

    pub fn normalization(mut self, mode: Normalization) -> Self {
        self.dialect.normalization = mode;
        self
    }

    pub fn default_schema(mut self, schema: impl Into<String>) -> Self {
        self.dialect.default_schema = schema.into();
        self
    }

    pub fn placeholder(mut self, style: PlaceholderStyle) -> Self {
        self.dialect.placeholder = style;
        self
    }

    pub fn pipe_is_concat(mut self, yes: bool) -> Self {
        self.dialect.pipe_is_concat = yes;
        self
    }

    pub fn concat_null_as_empty(mut self, yes: bool) -> Self {
        self.dialect.concat_null_as_empty = yes;
        self
    }

    pub fn escape_strings(mut self, yes: bool) -> Self {
        self.dialect.escape_strings = yes;
        self
    }

    pub fn dollar_strings(mut self, yes: bool) -> Self {
        self.dialect.dollar_strings = yes;
        self
    }

    /// Maps an uppercase keyword text to an existing token kind.
    pub fn keyword(mut self, text: &str, kind: TokenKind) -> Self {
        self.dialect.keywords.insert(text.to_string(), kind);
        self
    }

    /// Registers a dialect-specific keyword, minting (or reusing) its global
    /// token kind. Returns the kind alongside the builder for chaining into
    /// parse-table registrations.
    pub fn dynamic_keyword(mut self, text: &str) -> (Self, TokenKind) {
        let kind = TokenKind::register(text);
        self.dialect.keywords.insert(text.to_string(), kind);
        (self, kind)
    }

    /// Registers a multi-char operator text.
    pub fn operator(mut self, text: &str, kind: TokenKind) -> Self {
        self.dialect
            .operators
            .retain(|(existing, _)| existing != text);
        self.dialect.operators.push((text.to_string(), kind));
        self.dialect
            .operators
            .sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        self
    }

    pub fn prefix(mut self, kind: TokenKind, parse: PrefixFn) -> Self {
        self.dialect.prefix.insert(kind, parse);
        self
    }

    pub fn infix(mut self, kind: TokenKind, power: u8, parse: InfixFn) -> Self {
        self.dialect.infix.insert(kind, InfixEntry { power, parse });
        self
    }

    /// Appends a clause handler to the ordered sequence.
    pub fn clause(mut self, start: TokenKind, parse: ClauseFn) -> Self {
        self.dialect.clauses.push(ClauseHandler { start, parse });
        self
    }

    /// Inserts a clause handler right after the handler for `anchor`, or at
    /// the end when no handler starts with `anchor`.
    pub fn clause_after(mut self, anchor: TokenKind, start: TokenKind, parse: ClauseFn) -> Self {
        let handler = ClauseHandler { start, parse };
        match self.dialect.clauses.iter().position(|c| c.start == anchor) {
            Some(idx) => self.dialect.clauses.insert(idx + 1, handler),
            None => self.dialect.clauses.push(handler),
        }
        self
    }

    pub fn from_item(mut self, kind: TokenKind, parse: FromItemFn) -> Self {
        self.dialect.from_items.insert(kind, parse);
        self
    }

    pub fn star_modifier(mut self, kind: TokenKind, parse: StarModifierFn) -> Self {
        self.dialect.star_modifiers.insert(kind, parse);
        self
    }

    pub fn join_type(mut self, kind: TokenKind, def: JoinTypeDef) -> Self {
        self.dialect.join_types.insert(kind, def);
        self
    }

    pub fn classify(mut self, class: FunctionClass, names: &[&str]) -> Self {
        for name in names {
            self.dialect
                .function_classes
                .insert(name.to_lowercase(), class);
        }
        self
    }

    pub fn function_alias(mut self, alias: &str, canonical: &str) -> Self {
        self.dialect
            .function_aliases
            .insert(alias.to_lowercase(), canonical.to_lowercase());
        self
    }

    pub fn build(self) -> Dialect {
        self.dialect
    }
}

fn registry() -> &'static RwLock<HashMap<String, Arc<Dialect>>> {
    static REGISTRY: OnceLock<RwLock<HashMap<String, Arc<Dialect>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Registers a dialect under its name. Idempotent per name: the first
/// registration wins and later calls with the same name are no-ops.
pub fn register(dialect: Dialect) {
    let mut table = registry().write().expect("dialect registry poisoned");
    table
        .entry(dialect.name.clone())
        .or_insert_with(|| Arc::new(dialect));
}

/// Looks up a registered dialect by name.
pub fn get(name: &str) -> Option<Arc<Dialect>> {
    registry()
        .read()
        .expect("dialect registry poisoned")
        .get(name)
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_idempotent_per_name() {
        let first = DialectBuilder::new("reg_test").default_schema("one").build();
        let second = DialectBuilder::new("reg_test").default_schema("two").build();
        register(first);
        register(second);
        let got = get("reg_test").expect("registered dialect");
        assert_eq!(got.default_schema(), "one");
    }

    #[test]
    fn get_unknown_returns_none() {
        assert!(get("no_such_dialect").is_none());
    }

    #[test]
    fn extend_merges_tables_additively() {
        let base = DialectBuilder::new("base")
            .keyword("SELECT", TokenKind::SELECT)
            .operator("<=", TokenKind::LTE)
            .classify(FunctionClass::Aggregate, &["sum"])
            .build();
        let extended = base
            .extend("derived")
            .keyword("QUALIFY", TokenKind::register("QUALIFY"))
            .operator("//", TokenKind::SLASH_SLASH)
            .classify(FunctionClass::Aggregate, &["list_agg"])
            .build();

        assert_eq!(extended.name(), "derived");
        assert!(extended.keyword_kind("SELECT").is_some());
        assert!(extended.keyword_kind("QUALIFY").is_some());
        assert!(base.keyword_kind("QUALIFY").is_none());
        assert_eq!(
            extended.function_lineage("SUM"),
            ("sum".to_string(), FunctionClass::Aggregate)
        );
    }

    #[test]
    fn later_classification_wins_on_conflict() {
        let dialect = DialectBuilder::new("conflict")
            .classify(FunctionClass::Passthrough, &["nextval"])
            .classify(FunctionClass::Generator, &["nextval"])
            .build();
        assert_eq!(
            dialect.function_lineage("nextval").1,
            FunctionClass::Generator
        );
    }

    #[test]
    fn alias_resolves_before_classification() {
        let dialect = DialectBuilder::new("alias_test")
            .classify(FunctionClass::Passthrough, &["coalesce"])
            .function_alias("IFNULL", "COALESCE")
            .build();
        let (canonical, class) = dialect.function_lineage("IfNull");
        assert_eq!(canonical, "coalesce");
        assert_eq!(class, FunctionClass::Passthrough);
    }

    #[test]
    fn operators_sorted_longest_first() {
        let dialect = DialectBuilder::new("ops")
            .operator("<", TokenKind::LT)
            .operator("<=", TokenKind::LTE)
            .operator("<=>", TokenKind::register("SPACESHIP"))
            .build();
        let lengths: Vec<usize> = dialect.operators().iter().map(|(t, _)| t.len()).collect();
        assert_eq!(lengths, vec![3, 2, 1]);
    }
}
