//! Dialect-pluggable SQL parser and column-level lineage engine.
//!
//! The crate is a four-stage pipeline: a dialect registry parameterizes a
//! lexer, a Pratt/recursive-descent parser, and a scope resolver plus
//! lineage extractor. One call does everything:
//!
//! ```
//! use std::sync::Arc;
//! use sqltrace_core::{dialect, extract_lineage, ExtractOptions};
//!
//! let opts = ExtractOptions::new(Arc::new(dialect::duckdb()));
//! let lineage = extract_lineage("SELECT id, name FROM users", &opts).unwrap();
//! assert_eq!(lineage.sources, vec!["users"]);
//! ```
//!
//! Everything lives for the duration of a single call; the only process-wide
//! state is the dialect registry ([`dialect::register`] / [`dialect::get`]),
//! which callers populate during init.

pub mod ast;
pub mod dialect;
pub mod error;
pub mod lexer;
pub mod lineage;
pub mod parser;
pub mod token;
pub mod types;

mod scope;

// Re-export the main operations and types.
pub use error::Error;
pub use lineage::extract_lineage;
pub use parser::parse;
pub use token::Span;
pub use types::{
    ColumnLineage, ExtractOptions, ModelLineage, Schema, SchemaTable, SourceRef, Transform,
};
