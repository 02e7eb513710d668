//! Error types for SQL lexing, parsing, and scope resolution.
//!
//! # Error Handling Strategy
//!
//! This crate uses two complementary error handling patterns:
//!
//! - [`Error`]: Fatal errors that stop processing of the current call.
//!   Returned as `Result<T, Error>` from every public entry point. The first
//!   error wins; no recovery is attempted.
//!
//! - Degraded lineage output: non-fatal resolution gaps (an unresolvable
//!   column reference, a star expansion without schema) are preserved in the
//!   [`crate::ModelLineage`] result as partial information instead of being
//!   raised. This keeps extraction resilient: parsing must succeed, but
//!   lineage can be incomplete.

use crate::token::Span;
use thiserror::Error;

/// Error encountered while lexing, parsing, or resolving a statement.
///
/// Every variant that originates inside the SQL text carries the [`Span`] of
/// the offending tokens so callers can point diagnostics at the source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The caller omitted a dialect. The core never assumes a default.
    #[error("a dialect is required; none was provided")]
    DialectRequired,

    /// Tokenization failed (unterminated string, malformed number, ...).
    #[error("lex error at line {}, column {}: {message}", .span.line, .span.column)]
    Lex { span: Span, message: String },

    /// The token stream did not match the SELECT grammar.
    #[error("parse error at line {}, column {}: {message}", .span.line, .span.column)]
    Parse { span: Span, message: String },

    /// Scope construction failed (e.g. duplicate CTE names).
    #[error("resolve error at line {}, column {}: {message}", .span.line, .span.column)]
    Resolve { span: Span, message: String },
}

impl Error {
    /// Creates a lex error at the given span.
    pub fn lex(span: Span, message: impl Into<String>) -> Self {
        Self::Lex {
            span,
            message: message.into(),
        }
    }

    /// Creates a parse error at the given span.
    pub fn parse(span: Span, message: impl Into<String>) -> Self {
        Self::Parse {
            span,
            message: message.into(),
        }
    }

    /// Creates a resolver error at the given span.
    pub fn resolve(span: Span, message: impl Into<String>) -> Self {
        Self::Resolve {
            span,
            message: message.into(),
        }
    }

    /// The source span this error points at, when it has one.
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::DialectRequired => None,
            Self::Lex { span, .. } | Self::Parse { span, .. } | Self::Resolve { span, .. } => {
                Some(*span)
            }
        }
    }
}
