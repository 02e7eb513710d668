//! Recursive-descent statement parser over the dialect's tables.
//!
//! The statement shell (WITH/CTEs, set operations, FROM/joins, windows) is
//! fixed; everything past the WHERE clause is dispatched through the
//! dialect's ordered clause handlers, and FROM-item suffixes, star
//! modifiers, and expression positions are dispatched through the dialect's
//! handler tables. Only SELECT (and WITH-prefixed SELECT) statements are
//! recognized.

pub(crate) mod expr;

use crate::ast::{
    Cte, FrameBound, FrameUnits, FromClause, Ident, Join, NamedWindow, OrderByItem, RenameItem,
    ReplaceItem, SelectBody, SelectCore, SelectStmt, SetOp, SetTail, StarModifier, TableRef,
    WindowFrame, WindowSpec, With,
};
use crate::dialect::{Dialect, JoinTypeDef};
use crate::error::Error;
use crate::lexer::tokenize;
use crate::token::{Span, Token, TokenKind};

/// Parses a single SELECT statement under the given dialect.
///
/// A trailing semicolon is accepted; any other trailing token is a parse
/// error.
pub fn parse(sql: &str, dialect: &Dialect) -> Result<SelectStmt, Error> {
    let tokens = tokenize(sql, dialect)?;
    let mut parser = Parser::new(tokens, dialect);
    let stmt = parser.parse_select_stmt()?;
    let _ = parser.eat(TokenKind::SEMICOLON);
    let trailing = parser.peek();
    if !trailing.is_eof() {
        return Err(Error::parse(
            trailing.span,
            format!("unexpected {trailing} after statement"),
        ));
    }
    Ok(stmt)
}

/// One-token-lookahead parser over a pre-lexed token vector.
///
/// The vector always ends with an EOF token, so `peek`/`advance` never run
/// off the end. A snapshot is just an index into the vector, which is what
/// makes speculative parsing cheap.
pub struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    dialect: &'a Dialect,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(tokens: Vec<Token>, dialect: &'a Dialect) -> Self {
        debug_assert!(tokens.last().is_some_and(Token::is_eof));
        Self {
            tokens,
            pos: 0,
            dialect,
        }
    }

    pub(crate) fn dialect(&self) -> &Dialect {
        self.dialect
    }

    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    pub(crate) fn peek_ahead(&self, n: usize) -> &Token {
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    pub(crate) fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    pub(crate) fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    pub(crate) fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, Error> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let found = self.peek();
            Err(Error::parse(
                found.span,
                format!("expected {what}, found {found}"),
            ))
        }
    }

    /// Span of the most recently consumed token.
    pub(crate) fn prev_span(&self) -> Span {
        if self.pos == 0 {
            self.tokens[0].span
        } else {
            self.tokens[self.pos - 1].span
        }
    }

    pub(crate) fn parse_ident(&mut self, what: &str) -> Result<Ident, Error> {
        let token = self.peek();
        match token.kind {
            TokenKind::IDENT => {
                let token = self.advance();
                Ok(Ident::new(token.raw, false, token.span))
            }
            TokenKind::QUOTED_IDENT => {
                let token = self.advance();
                Ok(Ident::new(token.raw, true, token.span))
            }
            _ => Err(Error::parse(
                token.span,
                format!("expected {what}, found {token}"),
            )),
        }
    }

    // -- statements ---------------------------------------------------------

    pub(crate) fn parse_select_stmt(&mut self) -> Result<SelectStmt, Error> {
        let start = self.peek().span;
        let with = if self.check(TokenKind::WITH) {
            Some(self.parse_with()?)
        } else {
            None
        };
        if !self.check(TokenKind::SELECT) {
            let found = self.peek();
            return Err(Error::parse(
                found.span,
                format!("expected SELECT, found {found}"),
            ));
        }
        let body = self.parse_select_body()?;
        Ok(SelectStmt {
            with,
            body,
            span: start.merge(self.prev_span()),
        })
    }

    fn parse_with(&mut self) -> Result<With, Error> {
        let start = self.expect(TokenKind::WITH, "WITH")?.span;
        let recursive = self.eat(TokenKind::RECURSIVE).is_some();
        let mut ctes = Vec::new();
        loop {
            ctes.push(self.parse_cte()?);
            if self.eat(TokenKind::COMMA).is_none() {
                break;
            }
        }
        Ok(With {
            recursive,
            ctes,
            span: start.merge(self.prev_span()),
        })
    }

    fn parse_cte(&mut self) -> Result<Cte, Error> {
        let name = self.parse_ident("CTE name")?;
        let columns = if self.eat(TokenKind::LPAREN).is_some() {
            let list = self.parse_ident_list("CTE column name")?;
            self.expect(TokenKind::RPAREN, ") to close CTE columns")?;
            Some(list)
        } else {
            None
        };
        self.expect(TokenKind::AS, "AS in CTE")?;
        let materialized = if self.eat(TokenKind::MATERIALIZED).is_some() {
            Some(true)
        } else if self.check(TokenKind::NOT)
            && self.peek_ahead(1).kind == TokenKind::MATERIALIZED
        {
            self.advance();
            self.advance();
            Some(false)
        } else {
            None
        };
        self.expect(TokenKind::LPAREN, "( to open CTE body")?;
        let select = self.parse_select_stmt()?;
        self.expect(TokenKind::RPAREN, ") to close CTE body")?;
        let span = name.span.merge(self.prev_span());
        Ok(Cte {
            name,
            columns,
            materialized,
            select,
            span,
        })
    }

    fn parse_select_body(&mut self) -> Result<SelectBody, Error> {
        let left = self.parse_select_core()?;
        let set = if let Some(op) = self.parse_set_op() {
            let right = self.parse_select_body()?;
            Some(SetTail {
                op,
                right: Box::new(right),
            })
        } else {
            None
        };
        Ok(SelectBody { left, set })
    }

    fn parse_set_op(&mut self) -> Option<SetOp> {
        match self.peek().kind {
            TokenKind::UNION => {
                self.advance();
                if self.eat(TokenKind::ALL).is_some() {
                    Some(SetOp::UnionAll)
                } else {
                    Some(SetOp::Union)
                }
            }
            TokenKind::INTERSECT => {
                self.advance();
                Some(SetOp::Intersect)
            }
            TokenKind::EXCEPT => {
                self.advance();
                Some(SetOp::Except)
            }
            _ => None,
        }
    }

    fn parse_select_core(&mut self) -> Result<SelectCore, Error> {
        let start = self.expect(TokenKind::SELECT, "SELECT")?.span;
        let mut core = SelectCore::new(start);
        if self.eat(TokenKind::DISTINCT).is_some() {
            core.distinct = true;
        } else {
            let _ = self.eat(TokenKind::ALL);
        }

        loop {
            core.items.push(expr::parse_select_item(self)?);
            if self.eat(TokenKind::COMMA).is_none() {
                break;
            }
        }

        if self.eat(TokenKind::FROM).is_some() {
            core.from = Some(self.parse_from_clause()?);
        }
        if self.eat(TokenKind::WHERE).is_some() {
            core.where_clause = Some(expr::parse_expr(self)?);
        }

        // Post-WHERE clauses are dialect-ordered: each handler fires at most
        // once, in sequence.
        let handlers = self.dialect.clauses().to_vec();
        for handler in handlers {
            if self.check(handler.start) {
                (handler.parse)(self, &mut core)?;
            }
        }

        core.span = start.merge(self.prev_span());
        Ok(core)
    }

    // -- FROM ---------------------------------------------------------------

    fn parse_from_clause(&mut self) -> Result<FromClause, Error> {
        let source = self.parse_table_ref()?;
        let mut joins = Vec::new();
        loop {
            if let Some(comma) = self.eat(TokenKind::COMMA) {
                // Implicit cross join.
                let right = self.parse_table_ref()?;
                let span = comma.span.merge(self.prev_span());
                joins.push(Join {
                    join_type: "CROSS".to_string(),
                    natural: false,
                    right,
                    on: None,
                    using: None,
                    span,
                });
                continue;
            }
            let natural = self.check(TokenKind::NATURAL);
            let looks_like_join = if natural {
                true
            } else {
                self.check(TokenKind::JOIN) || self.dialect.join_type(self.peek().kind).is_some()
            };
            if !looks_like_join {
                break;
            }
            if natural {
                self.advance();
            }
            joins.push(self.parse_join(natural)?);
        }
        Ok(FromClause { source, joins })
    }

    fn parse_join(&mut self, natural: bool) -> Result<Join, Error> {
        let start = self.peek().span;
        let def = if self.eat(TokenKind::JOIN).is_some() {
            JoinTypeDef {
                name: "INNER",
                requires_on: true,
                allows_using: true,
            }
        } else {
            let tok = self.advance();
            let Some(def) = self.dialect.join_type(tok.kind) else {
                return Err(Error::parse(
                    tok.span,
                    format!("expected join type, found {tok}"),
                ));
            };
            let _ = self.eat(TokenKind::OUTER);
            self.expect(TokenKind::JOIN, "JOIN")?;
            def
        };

        let right = self.parse_table_ref()?;
        let mut on = None;
        let mut using = None;
        if !natural {
            if self.eat(TokenKind::ON).is_some() {
                on = Some(expr::parse_expr(self)?);
            } else if self.check(TokenKind::USING) {
                if !def.allows_using {
                    let found = self.peek();
                    return Err(Error::parse(
                        found.span,
                        format!("{} JOIN does not allow USING", def.name),
                    ));
                }
                self.advance();
                self.expect(TokenKind::LPAREN, "( after USING")?;
                let columns = self.parse_ident_list("USING column")?;
                self.expect(TokenKind::RPAREN, ") to close USING")?;
                using = Some(columns);
            } else if def.requires_on {
                let found = self.peek();
                return Err(Error::parse(
                    found.span,
                    format!("expected ON or USING after {} JOIN, found {found}", def.name),
                ));
            }
        }

        Ok(Join {
            join_type: def.name.to_string(),
            natural,
            right,
            on,
            using,
            span: start.merge(self.prev_span()),
        })
    }

    fn parse_table_ref(&mut self) -> Result<TableRef, Error> {
        let mut table = self.parse_table_ref_primary()?;
        // Dialect FROM-item suffixes (PIVOT/UNPIVOT) wrap the source to
        // their left and may stack.
        while let Some(handler) = self.dialect.from_item_fn(self.peek().kind) {
            let tok = self.advance();
            table = handler(self, table, tok)?;
        }
        Ok(table)
    }

    fn parse_table_ref_primary(&mut self) -> Result<TableRef, Error> {
        if let Some(lateral) = self.eat(TokenKind::LATERAL) {
            self.expect(TokenKind::LPAREN, "( after LATERAL")?;
            let select = self.parse_select_stmt()?;
            self.expect(TokenKind::RPAREN, ") to close LATERAL subquery")?;
            let alias = self.parse_table_alias(true, "LATERAL subquery")?;
            let span = lateral.span.merge(self.prev_span());
            return Ok(TableRef::Lateral {
                select: Box::new(select),
                alias: alias.expect("required alias"),
                span,
            });
        }

        if let Some(open) = self.eat(TokenKind::LPAREN) {
            let select = self.parse_select_stmt()?;
            self.expect(TokenKind::RPAREN, ") to close derived table")?;
            let alias = self.parse_table_alias(true, "derived table")?;
            let span = open.span.merge(self.prev_span());
            return Ok(TableRef::Derived {
                select: Box::new(select),
                alias: alias.expect("required alias"),
                span,
            });
        }

        let first = self.parse_ident("table name")?;
        let mut parts = vec![first];
        while self.check(TokenKind::DOT) {
            self.advance();
            parts.push(self.parse_ident("identifier after '.'")?);
        }
        if parts.len() > 3 {
            let span = parts[0].span.merge(parts[parts.len() - 1].span);
            return Err(Error::parse(
                span,
                "table names have at most three parts (catalog.schema.table)",
            ));
        }
        let name = parts.pop().expect("table name");
        let schema = parts.pop();
        let catalog = parts.pop();
        let alias = self.parse_table_alias(false, "table")?;
        let span = catalog
            .as_ref()
            .or(schema.as_ref())
            .map(|i| i.span)
            .unwrap_or(name.span)
            .merge(self.prev_span());
        Ok(TableRef::Table {
            catalog,
            schema,
            name,
            alias,
            span,
        })
    }

    /// Parses an optional (or required) `AS? ident` table alias.
    fn parse_table_alias(
        &mut self,
        required: bool,
        what: &str,
    ) -> Result<Option<Ident>, Error> {
        if self.eat(TokenKind::AS).is_some() {
            return Ok(Some(self.parse_ident("alias after AS")?));
        }
        if matches!(self.peek().kind, TokenKind::IDENT | TokenKind::QUOTED_IDENT) {
            return Ok(Some(self.parse_ident("alias")?));
        }
        if required {
            let found = self.peek();
            return Err(Error::parse(
                found.span,
                format!("{what} requires an alias, found {found}"),
            ));
        }
        Ok(None)
    }

    pub(crate) fn parse_ident_list(&mut self, what: &str) -> Result<Vec<Ident>, Error> {
        let mut idents = Vec::new();
        loop {
            idents.push(self.parse_ident(what)?);
            if self.eat(TokenKind::COMMA).is_none() {
                break;
            }
        }
        Ok(idents)
    }

    // -- star modifiers -----------------------------------------------------

    pub(crate) fn parse_star_modifiers(&mut self) -> Result<Vec<StarModifier>, Error> {
        let mut modifiers = Vec::new();
        while let Some(handler) = self.dialect.star_modifier_fn(self.peek().kind) {
            let tok = self.advance();
            modifiers.push(handler(self, tok)?);
        }
        Ok(modifiers)
    }

    // -- windows ------------------------------------------------------------

    /// Parses a window spec after its opening `(`, consuming the closing `)`.
    pub(crate) fn parse_window_spec(&mut self) -> Result<WindowSpec, Error> {
        let mut spec = WindowSpec::default();
        if self.eat(TokenKind::PARTITION).is_some() {
            self.expect(TokenKind::BY, "BY after PARTITION")?;
            loop {
                spec.partition_by.push(expr::parse_expr(self)?);
                if self.eat(TokenKind::COMMA).is_none() {
                    break;
                }
            }
        }
        if self.eat(TokenKind::ORDER).is_some() {
            self.expect(TokenKind::BY, "BY after ORDER")?;
            loop {
                spec.order_by.push(self.parse_order_item()?);
                if self.eat(TokenKind::COMMA).is_none() {
                    break;
                }
            }
        }
        if matches!(self.peek().kind, TokenKind::ROWS | TokenKind::RANGE) {
            spec.frame = Some(self.parse_window_frame()?);
        }
        self.expect(TokenKind::RPAREN, ") to close window")?;
        Ok(spec)
    }

    pub(crate) fn parse_order_item(&mut self) -> Result<OrderByItem, Error> {
        let expr = expr::parse_expr(self)?;
        let desc = if self.eat(TokenKind::DESC).is_some() {
            Some(true)
        } else if self.eat(TokenKind::ASC).is_some() {
            Some(false)
        } else {
            None
        };
        let nulls_first = if self.eat(TokenKind::NULLS).is_some() {
            if self.eat(TokenKind::FIRST).is_some() {
                Some(true)
            } else {
                self.expect(TokenKind::LAST, "FIRST or LAST after NULLS")?;
                Some(false)
            }
        } else {
            None
        };
        Ok(OrderByItem {
            expr,
            desc,
            nulls_first,
        })
    }

    fn parse_window_frame(&mut self) -> Result<WindowFrame, Error> {
        let units_tok = self.advance();
        let units = match units_tok.kind {
            TokenKind::ROWS => FrameUnits::Rows,
            TokenKind::RANGE => FrameUnits::Range,
            _ => unreachable!("caller checked frame units"),
        };
        if self.eat(TokenKind::BETWEEN).is_some() {
            let start = self.parse_frame_bound()?;
            self.expect(TokenKind::AND, "AND in frame")?;
            let end = self.parse_frame_bound()?;
            Ok(WindowFrame {
                units,
                start,
                end: Some(end),
            })
        } else {
            let start = self.parse_frame_bound()?;
            Ok(WindowFrame {
                units,
                start,
                end: None,
            })
        }
    }

    fn parse_frame_bound(&mut self) -> Result<FrameBound, Error> {
        if self.eat(TokenKind::UNBOUNDED).is_some() {
            if self.eat(TokenKind::PRECEDING).is_some() {
                return Ok(FrameBound::UnboundedPreceding);
            }
            self.expect(TokenKind::FOLLOWING, "PRECEDING or FOLLOWING")?;
            return Ok(FrameBound::UnboundedFollowing);
        }
        if self.eat(TokenKind::CURRENT).is_some() {
            self.expect(TokenKind::ROW, "ROW after CURRENT")?;
            return Ok(FrameBound::CurrentRow);
        }
        let offset = expr::parse_expr(self)?;
        if self.eat(TokenKind::PRECEDING).is_some() {
            return Ok(FrameBound::Preceding(Box::new(offset)));
        }
        self.expect(TokenKind::FOLLOWING, "PRECEDING or FOLLOWING")?;
        Ok(FrameBound::Following(Box::new(offset)))
    }
}

// ---------------------------------------------------------------------------
// Clause handlers (registered into dialect clause tables)
// ---------------------------------------------------------------------------

pub(crate) fn clause_group_by(p: &mut Parser<'_>, core: &mut SelectCore) -> Result<(), Error> {
    p.advance();
    p.expect(TokenKind::BY, "BY after GROUP")?;
    loop {
        core.group_by.push(expr::parse_expr(p)?);
        if p.eat(TokenKind::COMMA).is_none() {
            break;
        }
    }
    Ok(())
}

pub(crate) fn clause_having(p: &mut Parser<'_>, core: &mut SelectCore) -> Result<(), Error> {
    p.advance();
    core.having = Some(expr::parse_expr(p)?);
    Ok(())
}

pub(crate) fn clause_qualify(p: &mut Parser<'_>, core: &mut SelectCore) -> Result<(), Error> {
    p.advance();
    core.qualify = Some(expr::parse_expr(p)?);
    Ok(())
}

pub(crate) fn clause_window(p: &mut Parser<'_>, core: &mut SelectCore) -> Result<(), Error> {
    p.advance();
    loop {
        let name = p.parse_ident("window name")?;
        p.expect(TokenKind::AS, "AS in WINDOW clause")?;
        p.expect(TokenKind::LPAREN, "( to open window")?;
        let spec = p.parse_window_spec()?;
        core.windows.push(NamedWindow { name, spec });
        if p.eat(TokenKind::COMMA).is_none() {
            break;
        }
    }
    Ok(())
}

pub(crate) fn clause_order_by(p: &mut Parser<'_>, core: &mut SelectCore) -> Result<(), Error> {
    p.advance();
    p.expect(TokenKind::BY, "BY after ORDER")?;
    loop {
        let item = p.parse_order_item()?;
        core.order_by.push(item);
        if p.eat(TokenKind::COMMA).is_none() {
            break;
        }
    }
    Ok(())
}

pub(crate) fn clause_limit(p: &mut Parser<'_>, core: &mut SelectCore) -> Result<(), Error> {
    p.advance();
    core.limit = Some(expr::parse_expr(p)?);
    Ok(())
}

pub(crate) fn clause_offset(p: &mut Parser<'_>, core: &mut SelectCore) -> Result<(), Error> {
    p.advance();
    core.offset = Some(expr::parse_expr(p)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Star-modifier handlers
// ---------------------------------------------------------------------------

/// `EXCLUDE col` or `EXCLUDE (a, b)`.
pub(crate) fn star_exclude(p: &mut Parser<'_>, _tok: Token) -> Result<StarModifier, Error> {
    let columns = if p.eat(TokenKind::LPAREN).is_some() {
        let list = p.parse_ident_list("EXCLUDE column")?;
        p.expect(TokenKind::RPAREN, ") to close EXCLUDE")?;
        list
    } else {
        vec![p.parse_ident("EXCLUDE column")?]
    };
    Ok(StarModifier::Exclude(columns))
}

/// `REPLACE (expr AS name, ...)`.
pub(crate) fn star_replace(p: &mut Parser<'_>, _tok: Token) -> Result<StarModifier, Error> {
    p.expect(TokenKind::LPAREN, "( after REPLACE")?;
    let mut items = Vec::new();
    loop {
        let replacement = expr::parse_expr(p)?;
        p.expect(TokenKind::AS, "AS in REPLACE")?;
        let alias = p.parse_ident("REPLACE target column")?;
        items.push(ReplaceItem {
            expr: replacement,
            alias,
        });
        if p.eat(TokenKind::COMMA).is_none() {
            break;
        }
    }
    p.expect(TokenKind::RPAREN, ") to close REPLACE")?;
    Ok(StarModifier::Replace(items))
}

/// `RENAME (old AS new, ...)`.
pub(crate) fn star_rename(p: &mut Parser<'_>, _tok: Token) -> Result<StarModifier, Error> {
    p.expect(TokenKind::LPAREN, "( after RENAME")?;
    let mut items = Vec::new();
    loop {
        let old = p.parse_ident("RENAME source column")?;
        p.expect(TokenKind::AS, "AS in RENAME")?;
        let new = p.parse_ident("RENAME target column")?;
        items.push(RenameItem { old, new });
        if p.eat(TokenKind::COMMA).is_none() {
            break;
        }
    }
    p.expect(TokenKind::RPAREN, ") to close RENAME")?;
    Ok(StarModifier::Rename(items))
}

// ---------------------------------------------------------------------------
// FROM-item handlers
// ---------------------------------------------------------------------------

/// `source PIVOT(agg [, agg...] FOR col IN (values)) [alias]`.
pub(crate) fn from_pivot(
    p: &mut Parser<'_>,
    source: TableRef,
    tok: Token,
) -> Result<TableRef, Error> {
    p.expect(TokenKind::LPAREN, "( after PIVOT")?;
    let mut aggregates = Vec::new();
    loop {
        aggregates.push(expr::parse_expr(p)?);
        if p.eat(TokenKind::COMMA).is_none() {
            break;
        }
    }
    p.expect(TokenKind::FOR, "FOR in PIVOT")?;
    let for_column = p.parse_ident("PIVOT column")?;
    p.expect(TokenKind::IN, "IN in PIVOT")?;
    p.expect(TokenKind::LPAREN, "( to open PIVOT values")?;
    let mut values = Vec::new();
    loop {
        values.push(expr::parse_expr(p)?);
        if p.eat(TokenKind::COMMA).is_none() {
            break;
        }
    }
    p.expect(TokenKind::RPAREN, ") to close PIVOT values")?;
    p.expect(TokenKind::RPAREN, ") to close PIVOT")?;
    let alias = p.parse_table_alias(false, "PIVOT")?;
    let span = tok.span.merge(p.prev_span());
    Ok(TableRef::Pivot {
        source: Box::new(source),
        aggregates,
        for_column,
        values,
        alias,
        span,
    })
}

/// `source UNPIVOT(value_col FOR name_col IN (cols)) [alias]`.
pub(crate) fn from_unpivot(
    p: &mut Parser<'_>,
    source: TableRef,
    tok: Token,
) -> Result<TableRef, Error> {
    p.expect(TokenKind::LPAREN, "( after UNPIVOT")?;
    let value_name = p.parse_ident("UNPIVOT value column")?;
    p.expect(TokenKind::FOR, "FOR in UNPIVOT")?;
    let name_column = p.parse_ident("UNPIVOT name column")?;
    p.expect(TokenKind::IN, "IN in UNPIVOT")?;
    p.expect(TokenKind::LPAREN, "( to open UNPIVOT columns")?;
    let columns = p.parse_ident_list("UNPIVOT column")?;
    p.expect(TokenKind::RPAREN, ") to close UNPIVOT columns")?;
    p.expect(TokenKind::RPAREN, ") to close UNPIVOT")?;
    let alias = p.parse_table_alias(false, "UNPIVOT")?;
    let span = tok.span.merge(p.prev_span());
    Ok(TableRef::Unpivot {
        source: Box::new(source),
        value_name,
        name_column,
        columns,
        alias,
        span,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, SelectItem};
    use crate::dialect::{ansi, duckdb, postgres};

    fn parse_ansi(sql: &str) -> SelectStmt {
        parse(sql, &ansi()).unwrap_or_else(|e| panic!("parse failed for {sql:?}: {e}"))
    }

    fn parse_duck(sql: &str) -> SelectStmt {
        parse(sql, &duckdb()).unwrap_or_else(|e| panic!("parse failed for {sql:?}: {e}"))
    }

    #[test]
    fn simple_select() {
        let stmt = parse_ansi("SELECT id, name FROM users");
        assert_eq!(stmt.body.left.items.len(), 2);
        let from = stmt.body.left.from.expect("from clause");
        match from.source {
            TableRef::Table { name, .. } => assert_eq!(name.value, "users"),
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn empty_input_is_parse_error() {
        let err = parse("", &ansi()).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        let err = parse("   -- just a comment", &ansi()).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn non_select_is_rejected() {
        let err = parse("INSERT INTO t VALUES (1)", &ansi()).unwrap_err();
        assert!(err.to_string().contains("expected SELECT"));
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        let err = parse("SELECT 1 pending junk !", &ansi()).unwrap_err();
        assert!(matches!(err, Error::Parse { .. } | Error::Lex { .. }));
    }

    #[test]
    fn trailing_semicolon_is_fine() {
        parse_ansi("SELECT 1;");
    }

    #[test]
    fn qualified_table_names() {
        let stmt = parse_ansi("SELECT 1 FROM cat.sch.tbl AS t");
        let from = stmt.body.left.from.expect("from");
        match from.source {
            TableRef::Table {
                catalog,
                schema,
                name,
                alias,
                ..
            } => {
                assert_eq!(catalog.unwrap().value, "cat");
                assert_eq!(schema.unwrap().value, "sch");
                assert_eq!(name.value, "tbl");
                assert_eq!(alias.unwrap().value, "t");
            }
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn four_part_table_name_is_error() {
        let err = parse("SELECT 1 FROM a.b.c.d", &ansi()).unwrap_err();
        assert!(err.to_string().contains("at most three parts"));
    }

    #[test]
    fn join_variants() {
        let stmt = parse_ansi(
            "SELECT 1 FROM a \
             INNER JOIN b ON a.x = b.x \
             LEFT OUTER JOIN c USING (x) \
             CROSS JOIN d",
        );
        let from = stmt.body.left.from.expect("from");
        let names: Vec<&str> = from.joins.iter().map(|j| j.join_type.as_str()).collect();
        assert_eq!(names, vec!["INNER", "LEFT", "CROSS"]);
        assert!(from.joins[0].on.is_some());
        assert_eq!(from.joins[1].using.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn implicit_cross_join_from_comma() {
        let stmt = parse_ansi("SELECT 1 FROM a, b");
        let from = stmt.body.left.from.expect("from");
        assert_eq!(from.joins.len(), 1);
        assert_eq!(from.joins[0].join_type, "CROSS");
    }

    #[test]
    fn natural_join_takes_no_condition() {
        let stmt = parse_ansi("SELECT 1 FROM a NATURAL JOIN b");
        let from = stmt.body.left.from.expect("from");
        assert!(from.joins[0].natural);
        assert!(from.joins[0].on.is_none());
    }

    #[test]
    fn inner_join_without_condition_is_error() {
        let err = parse("SELECT 1 FROM a JOIN b", &ansi()).unwrap_err();
        assert!(err.to_string().contains("expected ON or USING"));
    }

    #[test]
    fn duckdb_semi_join() {
        let stmt = parse_duck("SELECT 1 FROM a SEMI JOIN b ON a.x = b.x");
        let from = stmt.body.left.from.expect("from");
        assert_eq!(from.joins[0].join_type, "SEMI");
    }

    #[test]
    fn derived_table_requires_alias() {
        let err = parse("SELECT 1 FROM (SELECT 1)", &ansi()).unwrap_err();
        assert!(err.to_string().contains("requires an alias"));
        parse_ansi("SELECT 1 FROM (SELECT 1) sub");
    }

    #[test]
    fn lateral_subquery() {
        let stmt = parse_ansi("SELECT 1 FROM a, LATERAL (SELECT a.x) l");
        let from = stmt.body.left.from.expect("from");
        assert!(matches!(from.joins[0].right, TableRef::Lateral { .. }));
    }

    #[test]
    fn cte_with_columns_and_recursion_flag() {
        let stmt = parse_ansi(
            "WITH RECURSIVE nums (n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM nums) \
             SELECT n FROM nums",
        );
        let with = stmt.with.expect("with");
        assert!(with.recursive);
        assert_eq!(with.ctes.len(), 1);
        assert_eq!(with.ctes[0].columns.as_ref().unwrap()[0].value, "n");
    }

    #[test]
    fn cte_materialization_hint() {
        let stmt = parse_ansi("WITH c AS MATERIALIZED (SELECT 1) SELECT 1 FROM c");
        assert_eq!(stmt.with.unwrap().ctes[0].materialized, Some(true));
        let stmt = parse_ansi("WITH c AS NOT MATERIALIZED (SELECT 1) SELECT 1 FROM c");
        assert_eq!(stmt.with.unwrap().ctes[0].materialized, Some(false));
    }

    #[test]
    fn set_operations_nest_right() {
        let stmt = parse_ansi("SELECT 1 UNION SELECT 2 UNION ALL SELECT 3");
        let tail = stmt.body.set.expect("set tail");
        assert_eq!(tail.op, SetOp::Union);
        let inner = tail.right.set.expect("nested tail");
        assert_eq!(inner.op, SetOp::UnionAll);
    }

    #[test]
    fn clause_sequence_fills_slots() {
        let stmt = parse_duck(
            "SELECT x, count(*) c FROM t GROUP BY x HAVING count(*) > 1 \
             QUALIFY row_number() OVER (PARTITION BY x ORDER BY x) = 1 \
             ORDER BY x DESC NULLS LAST LIMIT 10 OFFSET 5",
        );
        let core = &stmt.body.left;
        assert_eq!(core.group_by.len(), 1);
        assert!(core.having.is_some());
        assert!(core.qualify.is_some());
        assert_eq!(core.order_by.len(), 1);
        assert_eq!(core.order_by[0].desc, Some(true));
        assert_eq!(core.order_by[0].nulls_first, Some(false));
        assert!(core.limit.is_some());
        assert!(core.offset.is_some());
    }

    #[test]
    fn qualify_is_not_an_ansi_clause() {
        let err = parse("SELECT x FROM t QUALIFY x > 1", &ansi()).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn named_windows() {
        let stmt = parse_ansi(
            "SELECT sum(x) OVER w FROM t WINDOW w AS (PARTITION BY y ORDER BY z)",
        );
        let core = &stmt.body.left;
        assert_eq!(core.windows.len(), 1);
        assert_eq!(core.windows[0].name.value, "w");
        assert_eq!(core.windows[0].spec.partition_by.len(), 1);
    }

    #[test]
    fn window_frames() {
        let stmt = parse_ansi(
            "SELECT sum(x) OVER (ORDER BY y ROWS BETWEEN 2 PRECEDING AND CURRENT ROW) FROM t",
        );
        let SelectItem::Expr { expr, .. } = &stmt.body.left.items[0] else {
            panic!("expected expression item");
        };
        let Expr::FuncCall { over, .. } = expr else {
            panic!("expected call");
        };
        let Some(over) = over else { panic!("expected OVER") };
        let crate::ast::Window::Spec(spec) = over.as_ref() else {
            panic!("expected inline spec");
        };
        let frame = spec.frame.as_ref().expect("frame");
        assert_eq!(frame.units, FrameUnits::Rows);
        assert!(matches!(frame.start, FrameBound::Preceding(_)));
        assert!(matches!(frame.end, Some(FrameBound::CurrentRow)));
    }

    #[test]
    fn star_modifiers_parse_in_any_order() {
        let stmt = parse_duck(
            "SELECT * EXCLUDE (password) RENAME (id AS user_id) \
             REPLACE (lower(email) AS email) FROM users",
        );
        let SelectItem::Star { modifiers, .. } = &stmt.body.left.items[0] else {
            panic!("expected star item");
        };
        assert_eq!(modifiers.len(), 3);
        assert!(matches!(modifiers[0], StarModifier::Exclude(_)));
        assert!(matches!(modifiers[1], StarModifier::Rename(_)));
        assert!(matches!(modifiers[2], StarModifier::Replace(_)));
    }

    #[test]
    fn star_modifiers_unknown_in_ansi() {
        let err = parse("SELECT * EXCLUDE (x) FROM t", &ansi()).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn table_star_item() {
        let stmt = parse_ansi("SELECT u.*, o.amount FROM users u JOIN orders o ON u.id = o.id");
        assert!(matches!(
            stmt.body.left.items[0],
            SelectItem::TableStar { .. }
        ));
    }

    #[test]
    fn pivot_from_item() {
        let stmt = parse_duck(
            "SELECT * FROM sales PIVOT (sum(amount) FOR region IN ('east', 'west')) p",
        );
        let from = stmt.body.left.from.expect("from");
        match from.source {
            TableRef::Pivot {
                aggregates,
                for_column,
                values,
                alias,
                ..
            } => {
                assert_eq!(aggregates.len(), 1);
                assert_eq!(for_column.value, "region");
                assert_eq!(values.len(), 2);
                assert_eq!(alias.unwrap().value, "p");
            }
            other => panic!("expected pivot, got {other:?}"),
        }
    }

    #[test]
    fn unpivot_from_item() {
        let stmt = parse_duck(
            "SELECT * FROM monthly UNPIVOT (amount FOR month IN (jan, feb, mar))",
        );
        let from = stmt.body.left.from.expect("from");
        match from.source {
            TableRef::Unpivot {
                value_name,
                name_column,
                columns,
                ..
            } => {
                assert_eq!(value_name.value, "amount");
                assert_eq!(name_column.value, "month");
                assert_eq!(columns.len(), 3);
            }
            other => panic!("expected unpivot, got {other:?}"),
        }
    }

    #[test]
    fn pivot_is_a_plain_identifier_in_ansi() {
        // Without the FROM-item handler, `pivot` is just a table name.
        let stmt = parse_ansi("SELECT 1 FROM pivot");
        let from = stmt.body.left.from.expect("from");
        assert!(matches!(from.source, TableRef::Table { .. }));
    }

    #[test]
    fn postgres_placeholders_and_ilike() {
        let stmt = parse("SELECT name FROM users WHERE name ILIKE $1", &postgres())
            .expect("postgres parse");
        assert!(stmt.body.left.where_clause.is_some());
    }

    #[test]
    fn unbalanced_parens_error() {
        let err = parse("SELECT (1 + 2 FROM t", &ansi()).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn unclosed_case_errors() {
        let err = parse("SELECT CASE WHEN x THEN 1 FROM t", &ansi()).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }
}
