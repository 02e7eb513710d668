//! Dialect-parameterized SQL lexer.
//!
//! Scans a UTF-8 input string into a token vector: keywords, bare and quoted
//! identifiers, numeric and string literals, multi-char operators
//! (longest-match against the dialect table), punctuation, and placeholders.
//! Whitespace and comments (`-- line`, nestable `/* block */`) are skipped.
//!
//! The lexer is fail-fast: the first malformed construct returns
//! [`Error::Lex`] with the span of the offending text.

use crate::dialect::{Dialect, PlaceholderStyle};
use crate::error::Error;
use crate::token::{Span, Token, TokenKind};

/// Tokenizes the whole input up front.
///
/// Returning a vector (instead of a pull iterator) gives the parser free
/// speculative lookahead: a snapshot is just an index.
pub fn tokenize(sql: &str, dialect: &Dialect) -> Result<Vec<Token>, Error> {
    let mut lexer = Lexer::new(sql, dialect);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.is_eof();
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

struct Lexer<'a> {
    input: &'a str,
    dialect: &'a Dialect,
    pos: usize,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str, dialect: &'a Dialect) -> Self {
        Self {
            input,
            dialect,
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.rest().chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn here(&self) -> (usize, u32, u32) {
        (self.pos, self.line, self.column)
    }

    fn span_from(&self, start: (usize, u32, u32)) -> Span {
        Span::new(start.0, self.pos, start.1, start.2)
    }

    fn next_token(&mut self) -> Result<Token, Error> {
        self.skip_trivia()?;

        let start = self.here();
        let Some(ch) = self.peek_char() else {
            return Ok(Token::new(TokenKind::EOF, "", self.span_from(start)));
        };

        if ch == '\'' {
            return self.lex_string(start, false);
        }
        if (ch == 'E' || ch == 'e')
            && self.peek_second() == Some('\'')
            && self.dialect.escape_strings()
        {
            self.bump();
            return self.lex_string(start, true);
        }
        if ch == '$' && self.dialect.dollar_strings() {
            if let Some(token) = self.try_lex_dollar_string(start)? {
                return Ok(token);
            }
        }
        if ch == self.dialect.ident_quote() {
            return self.lex_quoted_ident(start);
        }
        if ch.is_ascii_digit() || (ch == '.' && self.peek_second().is_some_and(|c| c.is_ascii_digit()))
        {
            return self.lex_number(start);
        }
        if is_ident_start(ch) {
            return Ok(self.lex_word(start));
        }
        if let Some(token) = self.try_lex_placeholder(start) {
            return Ok(token);
        }
        if let Some(token) = self.try_lex_operator(start) {
            return Ok(token);
        }
        self.lex_punct(start, ch)
    }

    fn skip_trivia(&mut self) -> Result<(), Error> {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('-') if self.peek_second() == Some('-') => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some('/') if self.peek_second() == Some('*') => {
                    self.skip_block_comment()?;
                }
                _ => return Ok(()),
            }
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), Error> {
        let start = self.here();
        self.bump();
        self.bump();
        let mut depth = 1usize;
        while depth > 0 {
            match (self.peek_char(), self.peek_second()) {
                (Some('/'), Some('*')) => {
                    self.bump();
                    self.bump();
                    depth += 1;
                }
                (Some('*'), Some('/')) => {
                    self.bump();
                    self.bump();
                    depth -= 1;
                }
                (Some(_), _) => {
                    self.bump();
                }
                (None, _) => {
                    return Err(Error::lex(self.span_from(start), "unterminated block comment"));
                }
            }
        }
        Ok(())
    }

    /// Single-quoted string. `''` escapes a quote; with `escaped` (the
    /// `E'...'` form) a backslash also escapes the next character.
    fn lex_string(&mut self, start: (usize, u32, u32), escaped: bool) -> Result<Token, Error> {
        self.bump();
        let mut value = String::new();
        loop {
            match self.peek_char() {
                Some('\'') => {
                    self.bump();
                    if self.peek_char() == Some('\'') {
                        self.bump();
                        value.push('\'');
                    } else {
                        return Ok(Token::new(TokenKind::STRING, value, self.span_from(start)));
                    }
                }
                Some('\\') if escaped => {
                    self.bump();
                    match self.bump() {
                        Some(c) => value.push(c),
                        None => {
                            return Err(Error::lex(
                                self.span_from(start),
                                "unterminated string literal",
                            ));
                        }
                    }
                }
                Some(c) => {
                    self.bump();
                    value.push(c);
                }
                None => {
                    return Err(Error::lex(self.span_from(start), "unterminated string literal"));
                }
            }
        }
    }

    /// `$tag$ ... $tag$`. Returns `None` when the `$` does not open a valid
    /// tag (so `$1` placeholders still lex).
    fn try_lex_dollar_string(
        &mut self,
        start: (usize, u32, u32),
    ) -> Result<Option<Token>, Error> {
        let rest = self.rest();
        let mut tag_len = 0usize;
        for (i, c) in rest.char_indices().skip(1) {
            if c == '$' {
                tag_len = i;
                break;
            }
            if !(c.is_ascii_alphanumeric() || c == '_') {
                return Ok(None);
            }
            if i == 1 && c.is_ascii_digit() {
                return Ok(None);
            }
        }
        if tag_len == 0 {
            return Ok(None);
        }
        // `tag_len` is the byte index of the closing `$` of the opener, so
        // the opener (all ASCII) is rest[..tag_len + 1].
        let opener = rest[..tag_len + 1].to_string();
        for _ in 0..opener.len() {
            self.bump();
        }
        let body_start = self.pos;
        match self.input[self.pos..].find(&opener) {
            Some(offset) => {
                let value = self.input[body_start..body_start + offset].to_string();
                let target = self.pos + offset + opener.len();
                while self.pos < target {
                    self.bump();
                }
                Ok(Some(Token::new(
                    TokenKind::STRING,
                    value,
                    self.span_from(start),
                )))
            }
            None => Err(Error::lex(self.span_from(start), "unterminated string literal")),
        }
    }

    fn lex_quoted_ident(&mut self, start: (usize, u32, u32)) -> Result<Token, Error> {
        let quote = self.dialect.ident_quote();
        self.bump();
        let mut value = String::new();
        loop {
            match self.peek_char() {
                Some(c) if c == quote => {
                    self.bump();
                    if self.peek_char() == Some(quote) {
                        self.bump();
                        value.push(quote);
                    } else {
                        return Ok(Token::new(
                            TokenKind::QUOTED_IDENT,
                            value,
                            self.span_from(start),
                        ));
                    }
                }
                Some(c) => {
                    self.bump();
                    value.push(c);
                }
                None => {
                    return Err(Error::lex(
                        self.span_from(start),
                        "unterminated quoted identifier",
                    ));
                }
            }
        }
    }

    fn lex_number(&mut self, start: (usize, u32, u32)) -> Result<Token, Error> {
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        if self.peek_char() == Some('.')
            && self.peek_second().is_none_or(|c| !is_ident_start(c))
        {
            self.bump();
            while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        if matches!(self.peek_char(), Some('e') | Some('E')) {
            let mut probe = self.rest().chars();
            probe.next();
            let mut lookahead = probe.next();
            if matches!(lookahead, Some('+') | Some('-')) {
                lookahead = probe.next();
            }
            if lookahead.is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
                if matches!(self.peek_char(), Some('+') | Some('-')) {
                    self.bump();
                }
                while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                }
            }
        }
        if self.peek_char().is_some_and(is_ident_start) {
            let bad = self.here();
            while self.peek_char().is_some_and(is_ident_continue) {
                self.bump();
            }
            return Err(Error::lex(
                self.span_from(bad),
                "invalid suffix on numeric literal",
            ));
        }
        let raw = &self.input[start.0..self.pos];
        Ok(Token::new(TokenKind::NUMBER, raw, self.span_from(start)))
    }

    fn lex_word(&mut self, start: (usize, u32, u32)) -> Token {
        while self.peek_char().is_some_and(is_ident_continue) {
            self.bump();
        }
        let raw = &self.input[start.0..self.pos];
        let upper = raw.to_uppercase();
        match self.dialect.keyword_kind(&upper) {
            Some(kind) => Token::new(kind, raw, self.span_from(start)),
            None => Token::new(TokenKind::IDENT, raw, self.span_from(start)),
        }
    }

    fn try_lex_placeholder(&mut self, start: (usize, u32, u32)) -> Option<Token> {
        match (self.dialect.placeholder(), self.peek_char()?) {
            (PlaceholderStyle::QuestionMark, '?') => {
                self.bump();
                Some(Token::new(TokenKind::PLACEHOLDER, "?", self.span_from(start)))
            }
            (PlaceholderStyle::Dollar, '$')
                if self.peek_second().is_some_and(|c| c.is_ascii_digit()) =>
            {
                self.bump();
                while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                }
                let raw = &self.input[start.0..self.pos];
                Some(Token::new(TokenKind::PLACEHOLDER, raw, self.span_from(start)))
            }
            (PlaceholderStyle::Colon, ':')
                if self.peek_second().is_some_and(is_ident_start)
                    && !self.operator_starts_here() =>
            {
                self.bump();
                while self.peek_char().is_some_and(is_ident_continue) {
                    self.bump();
                }
                let raw = &self.input[start.0..self.pos];
                Some(Token::new(TokenKind::PLACEHOLDER, raw, self.span_from(start)))
            }
            _ => None,
        }
    }

    fn operator_starts_here(&self) -> bool {
        let rest = self.rest();
        self.dialect
            .operators()
            .iter()
            .any(|(text, _)| rest.starts_with(text.as_str()))
    }

    fn try_lex_operator(&mut self, start: (usize, u32, u32)) -> Option<Token> {
        let rest = self.rest();
        // Operators are kept longest-first, so the first prefix hit is the
        // longest match.
        let (text, kind) = self
            .dialect
            .operators()
            .iter()
            .find(|(text, _)| rest.starts_with(text.as_str()))?;
        let (text, kind) = (text.clone(), *kind);
        for _ in 0..text.chars().count() {
            self.bump();
        }
        Some(Token::new(kind, text, self.span_from(start)))
    }

    fn lex_punct(&mut self, start: (usize, u32, u32), ch: char) -> Result<Token, Error> {
        let kind = match ch {
            '(' => TokenKind::LPAREN,
            ')' => TokenKind::RPAREN,
            '[' => TokenKind::LBRACKET,
            ']' => TokenKind::RBRACKET,
            '{' => TokenKind::LBRACE,
            '}' => TokenKind::RBRACE,
            ',' => TokenKind::COMMA,
            '.' => TokenKind::DOT,
            ';' => TokenKind::SEMICOLON,
            ':' => TokenKind::COLON,
            '+' => TokenKind::PLUS,
            '-' => TokenKind::MINUS,
            '*' => TokenKind::STAR,
            '/' => TokenKind::SLASH,
            '%' => TokenKind::PERCENT,
            '=' => TokenKind::EQ,
            '<' => TokenKind::LT,
            '>' => TokenKind::GT,
            _ => {
                self.bump();
                return Err(Error::lex(
                    self.span_from(start),
                    format!("unexpected character '{ch}'"),
                ));
            }
        };
        self.bump();
        let raw = &self.input[start.0..self.pos];
        Ok(Token::new(kind, raw, self.span_from(start)))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{ansi, duckdb, postgres};

    fn kinds(sql: &str) -> Vec<TokenKind> {
        tokenize(sql, &ansi())
            .expect("tokenize")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn keywords_and_identifiers() {
        let tokens = tokenize("SELECT id FROM users", &ansi()).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::SELECT);
        assert_eq!(tokens[1].kind, TokenKind::IDENT);
        assert_eq!(tokens[1].raw, "id");
        assert_eq!(tokens[2].kind, TokenKind::FROM);
        assert_eq!(tokens[3].raw, "users");
        assert_eq!(tokens[4].kind, TokenKind::EOF);
    }

    #[test]
    fn keyword_lookup_is_case_insensitive() {
        let tokens = tokenize("select SeLeCt", &ansi()).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::SELECT);
        assert_eq!(tokens[0].raw, "select");
        assert_eq!(tokens[1].kind, TokenKind::SELECT);
    }

    #[test]
    fn spans_track_lines_and_columns() {
        let tokens = tokenize("SELECT\n  id", &ansi()).unwrap();
        let id = &tokens[1];
        assert_eq!(id.span.line, 2);
        assert_eq!(id.span.column, 3);
        assert_eq!(id.span.start, 9);
        assert_eq!(id.span.end, 11);
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("SELECT -- trailing\n1 /* a /* nested */ block */ + 2"),
            vec![
                TokenKind::SELECT,
                TokenKind::NUMBER,
                TokenKind::PLUS,
                TokenKind::NUMBER,
                TokenKind::EOF
            ]
        );
    }

    #[test]
    fn unterminated_block_comment_errors() {
        let err = tokenize("SELECT /* oops", &ansi()).unwrap_err();
        assert!(matches!(err, Error::Lex { .. }));
    }

    #[test]
    fn string_with_doubled_quote() {
        let tokens = tokenize("SELECT 'it''s'", &ansi()).unwrap();
        assert_eq!(tokens[1].kind, TokenKind::STRING);
        assert_eq!(tokens[1].raw, "it's");
    }

    #[test]
    fn unterminated_string_errors() {
        let err = tokenize("SELECT 'oops", &ansi()).unwrap_err();
        assert!(matches!(err, Error::Lex { .. }));
    }

    #[test]
    fn escape_string_requires_dialect_flag() {
        // Postgres lexes E'..' as a single escaped string.
        let tokens = tokenize(r"SELECT E'a\'b'", &postgres()).unwrap();
        assert_eq!(tokens[1].kind, TokenKind::STRING);
        assert_eq!(tokens[1].raw, "a'b");
        // ANSI sees an identifier E followed by a string.
        let tokens = tokenize("SELECT E'ab'", &ansi()).unwrap();
        assert_eq!(tokens[1].kind, TokenKind::IDENT);
        assert_eq!(tokens[2].kind, TokenKind::STRING);
    }

    #[test]
    fn dollar_quoted_string() {
        let tokens = tokenize("SELECT $tag$it's raw$tag$", &postgres()).unwrap();
        assert_eq!(tokens[1].kind, TokenKind::STRING);
        assert_eq!(tokens[1].raw, "it's raw");
    }

    #[test]
    fn dollar_placeholder_still_lexes_in_postgres() {
        let tokens = tokenize("SELECT $1", &postgres()).unwrap();
        assert_eq!(tokens[1].kind, TokenKind::PLACEHOLDER);
        assert_eq!(tokens[1].raw, "$1");
    }

    #[test]
    fn quoted_identifier_keeps_case() {
        let tokens = tokenize("SELECT \"MiXeD\"\"q\"", &ansi()).unwrap();
        assert_eq!(tokens[1].kind, TokenKind::QUOTED_IDENT);
        assert_eq!(tokens[1].raw, "MiXeD\"q");
    }

    #[test]
    fn numbers() {
        let tokens = tokenize("SELECT 1, 2.5, .5, 1e10, 1.5e-3", &ansi()).unwrap();
        let numbers: Vec<&str> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::NUMBER)
            .map(|t| t.raw.as_str())
            .collect();
        assert_eq!(numbers, vec!["1", "2.5", ".5", "1e10", "1.5e-3"]);
    }

    #[test]
    fn invalid_numeric_suffix_errors() {
        let err = tokenize("SELECT 12abc", &ansi()).unwrap_err();
        assert!(err.to_string().contains("invalid suffix"));
    }

    #[test]
    fn qualified_name_is_dot_separated() {
        assert_eq!(
            kinds("a.b.c"),
            vec![
                TokenKind::IDENT,
                TokenKind::DOT,
                TokenKind::IDENT,
                TokenKind::DOT,
                TokenKind::IDENT,
                TokenKind::EOF
            ]
        );
    }

    #[test]
    fn multichar_operators_longest_match() {
        let tokens = tokenize("a <= b != c || d", &ansi()).unwrap();
        let ops: Vec<TokenKind> = tokens
            .iter()
            .filter(|t| {
                matches!(
                    t.kind,
                    TokenKind::LTE | TokenKind::NEQ | TokenKind::CONCAT
                )
            })
            .map(|t| t.kind)
            .collect();
        assert_eq!(ops, vec![TokenKind::LTE, TokenKind::NEQ, TokenKind::CONCAT]);
    }

    #[test]
    fn duckdb_lexes_lambda_arrow_and_intdiv() {
        let tokens = tokenize("x -> x // 2", &duckdb()).unwrap();
        assert_eq!(tokens[1].kind, TokenKind::ARROW);
        assert_eq!(tokens[3].kind, TokenKind::SLASH_SLASH);
    }

    #[test]
    fn double_colon_cast_operator() {
        let tokens = tokenize("a::int", &duckdb()).unwrap();
        assert_eq!(tokens[1].kind, TokenKind::DOUBLE_COLON);
    }

    #[test]
    fn question_mark_placeholder() {
        let tokens = tokenize("SELECT ?", &duckdb()).unwrap();
        assert_eq!(tokens[1].kind, TokenKind::PLACEHOLDER);
    }

    #[test]
    fn unexpected_character_errors() {
        let err = tokenize("SELECT #", &ansi()).unwrap_err();
        assert!(err.to_string().contains("unexpected character"));
    }
}
