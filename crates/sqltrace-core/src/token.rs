//! Tokens, spans, and the global token-kind table.
//!
//! Token kinds are small integers rather than a closed enum so that dialects
//! can mint new kinds at load time (`QUALIFY`, `PIVOT`, ...) and key their
//! parse tables by kind. Kind identity is process-global: registering the
//! same name twice returns the same kind.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{OnceLock, RwLock};

/// A byte range in the source SQL string, plus the line/column of its start.
///
/// Lines and columns are 1-indexed; offsets are byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    /// Byte offset from start of the SQL string (inclusive).
    pub start: usize,
    /// Byte offset from start of the SQL string (exclusive).
    pub end: usize,
    /// Line of the first byte (1-indexed).
    pub line: u32,
    /// Column of the first byte (1-indexed).
    pub column: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// A span covering both `self` and `other`.
    ///
    /// Assumes `self` starts no later than `other`; line/column are taken
    /// from `self`.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start,
            end: other.end.max(self.end),
            line: self.line,
            column: self.column,
        }
    }
}

/// Identity of a token class (keyword, operator, punctuation, literal, ...).
///
/// Known kinds are associated constants; dialect-specific kinds come from
/// [`TokenKind::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenKind(pub u16);

impl TokenKind {
    // Sentinels and literals.
    pub const EOF: TokenKind = TokenKind(0);
    pub const IDENT: TokenKind = TokenKind(1);
    pub const QUOTED_IDENT: TokenKind = TokenKind(2);
    pub const NUMBER: TokenKind = TokenKind(3);
    pub const STRING: TokenKind = TokenKind(4);
    pub const PLACEHOLDER: TokenKind = TokenKind(5);

    // Punctuation.
    pub const LPAREN: TokenKind = TokenKind(10);
    pub const RPAREN: TokenKind = TokenKind(11);
    pub const LBRACKET: TokenKind = TokenKind(12);
    pub const RBRACKET: TokenKind = TokenKind(13);
    pub const LBRACE: TokenKind = TokenKind(14);
    pub const RBRACE: TokenKind = TokenKind(15);
    pub const COMMA: TokenKind = TokenKind(16);
    pub const DOT: TokenKind = TokenKind(17);
    pub const SEMICOLON: TokenKind = TokenKind(18);
    pub const COLON: TokenKind = TokenKind(19);

    // Operators. Single-char kinds are produced by the lexer fallback;
    // multi-char kinds come from the dialect operator table.
    pub const PLUS: TokenKind = TokenKind(20);
    pub const MINUS: TokenKind = TokenKind(21);
    pub const STAR: TokenKind = TokenKind(22);
    pub const SLASH: TokenKind = TokenKind(23);
    pub const PERCENT: TokenKind = TokenKind(24);
    pub const EQ: TokenKind = TokenKind(25);
    pub const NEQ: TokenKind = TokenKind(26);
    pub const LT: TokenKind = TokenKind(27);
    pub const LTE: TokenKind = TokenKind(28);
    pub const GT: TokenKind = TokenKind(29);
    pub const GTE: TokenKind = TokenKind(30);
    pub const CONCAT: TokenKind = TokenKind(31);
    pub const DOUBLE_COLON: TokenKind = TokenKind(32);
    pub const ARROW: TokenKind = TokenKind(33);
    pub const SLASH_SLASH: TokenKind = TokenKind(34);

    // Keywords shared by every dialect.
    pub const SELECT: TokenKind = TokenKind(40);
    pub const FROM: TokenKind = TokenKind(41);
    pub const WHERE: TokenKind = TokenKind(42);
    pub const GROUP: TokenKind = TokenKind(43);
    pub const BY: TokenKind = TokenKind(44);
    pub const HAVING: TokenKind = TokenKind(45);
    pub const ORDER: TokenKind = TokenKind(46);
    pub const LIMIT: TokenKind = TokenKind(47);
    pub const OFFSET: TokenKind = TokenKind(48);
    pub const AS: TokenKind = TokenKind(49);
    pub const ON: TokenKind = TokenKind(50);
    pub const USING: TokenKind = TokenKind(51);
    pub const JOIN: TokenKind = TokenKind(52);
    pub const INNER: TokenKind = TokenKind(53);
    pub const LEFT: TokenKind = TokenKind(54);
    pub const RIGHT: TokenKind = TokenKind(55);
    pub const FULL: TokenKind = TokenKind(56);
    pub const OUTER: TokenKind = TokenKind(57);
    pub const CROSS: TokenKind = TokenKind(58);
    pub const NATURAL: TokenKind = TokenKind(59);
    pub const AND: TokenKind = TokenKind(60);
    pub const OR: TokenKind = TokenKind(61);
    pub const NOT: TokenKind = TokenKind(62);
    pub const IN: TokenKind = TokenKind(63);
    pub const IS: TokenKind = TokenKind(64);
    pub const NULL: TokenKind = TokenKind(65);
    pub const LIKE: TokenKind = TokenKind(66);
    pub const BETWEEN: TokenKind = TokenKind(67);
    pub const CASE: TokenKind = TokenKind(68);
    pub const WHEN: TokenKind = TokenKind(69);
    pub const THEN: TokenKind = TokenKind(70);
    pub const ELSE: TokenKind = TokenKind(71);
    pub const END: TokenKind = TokenKind(72);
    pub const CAST: TokenKind = TokenKind(73);
    pub const DISTINCT: TokenKind = TokenKind(74);
    pub const ALL: TokenKind = TokenKind(75);
    pub const UNION: TokenKind = TokenKind(76);
    pub const INTERSECT: TokenKind = TokenKind(77);
    pub const EXCEPT: TokenKind = TokenKind(78);
    pub const WITH: TokenKind = TokenKind(79);
    pub const RECURSIVE: TokenKind = TokenKind(80);
    pub const TRUE: TokenKind = TokenKind(81);
    pub const FALSE: TokenKind = TokenKind(82);
    pub const EXISTS: TokenKind = TokenKind(83);
    pub const OVER: TokenKind = TokenKind(84);
    pub const PARTITION: TokenKind = TokenKind(85);
    pub const ROWS: TokenKind = TokenKind(86);
    pub const RANGE: TokenKind = TokenKind(87);
    pub const UNBOUNDED: TokenKind = TokenKind(88);
    pub const PRECEDING: TokenKind = TokenKind(89);
    pub const FOLLOWING: TokenKind = TokenKind(90);
    pub const CURRENT: TokenKind = TokenKind(91);
    pub const ROW: TokenKind = TokenKind(92);
    pub const WINDOW: TokenKind = TokenKind(93);
    pub const LATERAL: TokenKind = TokenKind(94);
    pub const ASC: TokenKind = TokenKind(95);
    pub const DESC: TokenKind = TokenKind(96);
    pub const NULLS: TokenKind = TokenKind(97);
    pub const FIRST: TokenKind = TokenKind(98);
    pub const LAST: TokenKind = TokenKind(99);
    pub const FILTER: TokenKind = TokenKind(100);
    pub const MATERIALIZED: TokenKind = TokenKind(101);
    pub const ESCAPE: TokenKind = TokenKind(102);
    pub const FOR: TokenKind = TokenKind(103);

    /// First kind id handed out to dynamically registered kinds.
    const FIRST_DYNAMIC: u16 = 512;

    /// Registers (or looks up) a dialect-specific token kind by name.
    ///
    /// Registration is idempotent per name and process-global, so two
    /// dialects registering `QUALIFY` share a kind and parse tables keyed by
    /// it compose across `extend`.
    pub fn register(name: &str) -> TokenKind {
        let table = dynamic_kinds();
        if let Some(kind) = table.read().expect("token kind table poisoned").get(name) {
            return *kind;
        }
        let mut table = table.write().expect("token kind table poisoned");
        if let Some(kind) = table.get(name) {
            return *kind;
        }
        let kind = TokenKind(Self::FIRST_DYNAMIC + table.len() as u16);
        table.insert(name.to_string(), kind);
        kind
    }
}

fn dynamic_kinds() -> &'static RwLock<HashMap<String, TokenKind>> {
    static KINDS: OnceLock<RwLock<HashMap<String, TokenKind>>> = OnceLock::new();
    KINDS.get_or_init(|| RwLock::new(HashMap::new()))
}

/// A single token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Original text with quoting stripped and escapes resolved. Keyword
    /// tokens keep the casing the user wrote.
    pub raw: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, raw: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            raw: raw.into(),
            span,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::EOF
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_eof() {
            write!(f, "end of input")
        } else {
            write!(f, "'{}'", self.raw)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_idempotent() {
        let a = TokenKind::register("QUALIFY_TEST_KIND");
        let b = TokenKind::register("QUALIFY_TEST_KIND");
        assert_eq!(a, b);
        assert!(a.0 >= 512);
    }

    #[test]
    fn registered_kinds_are_distinct() {
        let a = TokenKind::register("KIND_A_TEST");
        let b = TokenKind::register("KIND_B_TEST");
        assert_ne!(a, b);
    }

    #[test]
    fn span_merge_extends_end() {
        let a = Span::new(0, 3, 1, 1);
        let b = Span::new(5, 9, 1, 6);
        let merged = a.merge(b);
        assert_eq!(merged.start, 0);
        assert_eq!(merged.end, 9);
        assert_eq!(merged.line, 1);
        assert_eq!(merged.column, 1);
    }

    #[test]
    fn token_display_quotes_raw() {
        let tok = Token::new(TokenKind::IDENT, "users", Span::new(0, 5, 1, 1));
        assert_eq!(tok.to_string(), "'users'");
        let eof = Token::new(TokenKind::EOF, "", Span::new(5, 5, 1, 6));
        assert_eq!(eof.to_string(), "end of input");
    }
}
