//! Pratt expression parser.
//!
//! Binding powers and parse functions are supplied by the dialect's prefix
//! and infix tables, keyed by token kind. The functions in this module are
//! the standard inventory the shipped dialects register; a dialect can add
//! its own on top (the lambda arrow and list/struct literals are DuckDB
//! registrations of exactly this shape).

use crate::ast::{
    CaseBranch, Expr, Ident, InSet, IndexOp, LiteralKind, SelectItem, Window,
};
use crate::error::Error;
use crate::parser::Parser;
use crate::token::{Token, TokenKind};

// The precedence ladder, ascending. Comparison-class operators (including
// LIKE/IN/BETWEEN) share one level; `->` sits at OR level so a lambda body
// swallows everything up to the enclosing argument boundary.
pub(crate) const P_LAMBDA: u8 = 10;
pub(crate) const P_OR: u8 = 10;
pub(crate) const P_AND: u8 = 20;
pub(crate) const P_NOT: u8 = 25;
pub(crate) const P_CMP: u8 = 30;
pub(crate) const P_CONCAT: u8 = 35;
pub(crate) const P_ADD: u8 = 40;
pub(crate) const P_MUL: u8 = 50;
pub(crate) const P_UNARY: u8 = 60;
pub(crate) const P_POSTFIX: u8 = 70;

pub(crate) fn parse_expr(p: &mut Parser<'_>) -> Result<Expr, Error> {
    parse_expr_bp(p, 0)
}

pub(crate) fn parse_expr_bp(p: &mut Parser<'_>, min_bp: u8) -> Result<Expr, Error> {
    let tok = p.advance();
    let Some(prefix) = p.dialect().prefix_fn(tok.kind) else {
        return Err(Error::parse(
            tok.span,
            format!("unexpected {tok} in expression"),
        ));
    };
    let mut left = prefix(p, tok)?;
    loop {
        let Some(entry) = p.dialect().infix_entry(p.peek().kind) else {
            break;
        };
        if entry.power <= min_bp {
            break;
        }
        let tok = p.advance();
        left = (entry.parse)(p, left, tok)?;
    }
    Ok(left)
}

// ---------------------------------------------------------------------------
// Prefix positions
// ---------------------------------------------------------------------------

/// Identifier: plain column, qualified column, or function call.
pub(crate) fn prefix_ident(p: &mut Parser<'_>, tok: Token) -> Result<Expr, Error> {
    let mut parts = vec![ident_from(&tok)];
    while p.check(TokenKind::DOT) {
        // `t.*` is a select-item form, not an expression; stop before the
        // star and let the caller deal with it.
        if p.peek_ahead(1).kind == TokenKind::STAR {
            break;
        }
        p.advance();
        let part = p.parse_ident("identifier after '.'")?;
        parts.push(part);
    }

    if p.check(TokenKind::LPAREN) {
        let name = fold_idents(parts);
        return parse_func_call(p, name);
    }

    let column = parts.pop().expect("at least one identifier part");
    let table = if parts.is_empty() {
        None
    } else {
        Some(fold_idents(parts))
    };
    let span = table
        .as_ref()
        .map(|t| t.span.merge(column.span))
        .unwrap_or(column.span);
    Ok(Expr::ColumnRef {
        table,
        column,
        span,
    })
}

pub(crate) fn prefix_number(_p: &mut Parser<'_>, tok: Token) -> Result<Expr, Error> {
    Ok(Expr::Literal {
        kind: LiteralKind::Number,
        raw: tok.raw,
        span: tok.span,
    })
}

pub(crate) fn prefix_string(_p: &mut Parser<'_>, tok: Token) -> Result<Expr, Error> {
    Ok(Expr::Literal {
        kind: LiteralKind::String,
        raw: tok.raw,
        span: tok.span,
    })
}

pub(crate) fn prefix_bool(_p: &mut Parser<'_>, tok: Token) -> Result<Expr, Error> {
    Ok(Expr::Literal {
        kind: LiteralKind::Boolean,
        raw: tok.raw,
        span: tok.span,
    })
}

pub(crate) fn prefix_null(_p: &mut Parser<'_>, tok: Token) -> Result<Expr, Error> {
    Ok(Expr::Literal {
        kind: LiteralKind::Null,
        raw: tok.raw,
        span: tok.span,
    })
}

pub(crate) fn prefix_placeholder(_p: &mut Parser<'_>, tok: Token) -> Result<Expr, Error> {
    Ok(Expr::Literal {
        kind: LiteralKind::Placeholder,
        raw: tok.raw,
        span: tok.span,
    })
}

/// `*` in argument position (`COUNT(*)`).
pub(crate) fn prefix_star(_p: &mut Parser<'_>, tok: Token) -> Result<Expr, Error> {
    Ok(Expr::Wildcard { span: tok.span })
}

/// Unary `-` / `+`.
pub(crate) fn prefix_sign(p: &mut Parser<'_>, tok: Token) -> Result<Expr, Error> {
    let operand = parse_expr_bp(p, P_UNARY)?;
    let span = tok.span.merge(operand.span());
    Ok(Expr::Unary {
        op: tok.raw,
        expr: Box::new(operand),
        span,
    })
}

/// Prefix NOT binds looser than comparisons: `NOT a = b` is `NOT (a = b)`.
pub(crate) fn prefix_not(p: &mut Parser<'_>, tok: Token) -> Result<Expr, Error> {
    let operand = parse_expr_bp(p, P_NOT)?;
    let span = tok.span.merge(operand.span());
    Ok(Expr::Unary {
        op: tok.raw,
        expr: Box::new(operand),
        span,
    })
}

pub(crate) fn prefix_case(p: &mut Parser<'_>, tok: Token) -> Result<Expr, Error> {
    let operand = if p.check(TokenKind::WHEN) {
        None
    } else {
        Some(Box::new(parse_expr(p)?))
    };
    let mut branches = Vec::new();
    while p.eat(TokenKind::WHEN).is_some() {
        let condition = parse_expr(p)?;
        p.expect(TokenKind::THEN, "THEN")?;
        let result = parse_expr(p)?;
        branches.push(CaseBranch { condition, result });
    }
    if branches.is_empty() {
        return Err(Error::parse(tok.span, "CASE requires at least one WHEN branch"));
    }
    let else_expr = if p.eat(TokenKind::ELSE).is_some() {
        Some(Box::new(parse_expr(p)?))
    } else {
        None
    };
    let end = p.expect(TokenKind::END, "END to close CASE")?;
    Ok(Expr::Case {
        operand,
        branches,
        else_expr,
        span: tok.span.merge(end.span),
    })
}

pub(crate) fn prefix_cast(p: &mut Parser<'_>, tok: Token) -> Result<Expr, Error> {
    p.expect(TokenKind::LPAREN, "( after CAST")?;
    let expr = parse_expr(p)?;
    p.expect(TokenKind::AS, "AS in CAST")?;
    let type_name = parse_type_name(p)?;
    let close = p.expect(TokenKind::RPAREN, ") to close CAST")?;
    Ok(Expr::Cast {
        expr: Box::new(expr),
        type_name,
        span: tok.span.merge(close.span),
    })
}

pub(crate) fn prefix_exists(p: &mut Parser<'_>, tok: Token) -> Result<Expr, Error> {
    p.expect(TokenKind::LPAREN, "( after EXISTS")?;
    let select = p.parse_select_stmt()?;
    let close = p.expect(TokenKind::RPAREN, ") to close EXISTS")?;
    Ok(Expr::Subquery {
        select: Box::new(select),
        span: tok.span.merge(close.span),
    })
}

/// `(` opens a scalar subquery, a parenthesized expression, or a lambda
/// parameter list.
pub(crate) fn prefix_lparen(p: &mut Parser<'_>, tok: Token) -> Result<Expr, Error> {
    if p.check(TokenKind::SELECT) || p.check(TokenKind::WITH) {
        let select = p.parse_select_stmt()?;
        let close = p.expect(TokenKind::RPAREN, ") to close subquery")?;
        return Ok(Expr::Subquery {
            select: Box::new(select),
            span: tok.span.merge(close.span),
        });
    }

    let first = parse_expr(p)?;
    if p.check(TokenKind::COMMA) {
        let mut exprs = vec![first];
        while p.eat(TokenKind::COMMA).is_some() {
            exprs.push(parse_expr(p)?);
        }
        p.expect(TokenKind::RPAREN, ") to close parameter list")?;
        let arrow = p.expect(TokenKind::ARROW, "-> after parameter list")?;
        let params = exprs
            .into_iter()
            .map(|expr| lambda_param(expr, arrow.span))
            .collect::<Result<Vec<_>, _>>()?;
        let body = parse_expr_bp(p, P_LAMBDA - 1)?;
        let span = tok.span.merge(body.span());
        return Ok(Expr::Lambda {
            params,
            body: Box::new(body),
            span,
        });
    }

    let close = p.expect(TokenKind::RPAREN, ") to close expression")?;
    Ok(Expr::Paren {
        expr: Box::new(first),
        span: tok.span.merge(close.span),
    })
}

/// `[a, b, c]` list literal.
pub(crate) fn prefix_list(p: &mut Parser<'_>, tok: Token) -> Result<Expr, Error> {
    let mut items = Vec::new();
    if !p.check(TokenKind::RBRACKET) {
        loop {
            items.push(parse_expr(p)?);
            if p.eat(TokenKind::COMMA).is_none() {
                break;
            }
        }
    }
    let close = p.expect(TokenKind::RBRACKET, "] to close list")?;
    Ok(Expr::List {
        items,
        span: tok.span.merge(close.span),
    })
}

/// `{'key': value, ...}` struct literal.
pub(crate) fn prefix_struct(p: &mut Parser<'_>, tok: Token) -> Result<Expr, Error> {
    let mut fields = Vec::new();
    if !p.check(TokenKind::RBRACE) {
        loop {
            let key_tok = p.advance();
            let key = match key_tok.kind {
                TokenKind::STRING | TokenKind::IDENT | TokenKind::QUOTED_IDENT => key_tok.raw,
                _ => {
                    return Err(Error::parse(
                        key_tok.span,
                        format!("expected struct field name, found {key_tok}"),
                    ));
                }
            };
            p.expect(TokenKind::COLON, ": after struct field name")?;
            let value = parse_expr(p)?;
            fields.push((key, value));
            if p.eat(TokenKind::COMMA).is_none() {
                break;
            }
        }
    }
    let close = p.expect(TokenKind::RBRACE, "} to close struct")?;
    Ok(Expr::Struct {
        fields,
        span: tok.span.merge(close.span),
    })
}

// ---------------------------------------------------------------------------
// Infix positions
// ---------------------------------------------------------------------------

/// Generic left-associative binary operator.
pub(crate) fn infix_binary(p: &mut Parser<'_>, left: Expr, tok: Token) -> Result<Expr, Error> {
    let power = p
        .dialect()
        .infix_entry(tok.kind)
        .map(|e| e.power)
        .unwrap_or(P_CMP);
    let right = parse_expr_bp(p, power)?;
    let span = left.span().merge(right.span());
    Ok(Expr::Binary {
        op: tok.raw,
        left: Box::new(left),
        right: Box::new(right),
        span,
    })
}

/// `IS [NOT] NULL` / `IS [NOT] TRUE|FALSE`.
pub(crate) fn infix_is(p: &mut Parser<'_>, left: Expr, _tok: Token) -> Result<Expr, Error> {
    let negated = p.eat(TokenKind::NOT).is_some();
    let next = p.advance();
    let span = left.span().merge(next.span);
    match next.kind {
        TokenKind::NULL => Ok(Expr::IsNull {
            expr: Box::new(left),
            negated,
            span,
        }),
        TokenKind::TRUE | TokenKind::FALSE => Ok(Expr::IsBool {
            expr: Box::new(left),
            negated,
            value: next.kind == TokenKind::TRUE,
            span,
        }),
        _ => Err(Error::parse(
            next.span,
            format!("expected NULL, TRUE, or FALSE after IS, found {next}"),
        )),
    }
}

/// `LIKE` / `ILIKE` with optional ESCAPE.
pub(crate) fn infix_like(p: &mut Parser<'_>, left: Expr, tok: Token) -> Result<Expr, Error> {
    like_tail(p, left, tok, false)
}

fn like_tail(
    p: &mut Parser<'_>,
    left: Expr,
    tok: Token,
    negated: bool,
) -> Result<Expr, Error> {
    let case_insensitive = tok.raw.eq_ignore_ascii_case("ilike");
    let pattern = parse_expr_bp(p, P_CMP)?;
    let escape = if p.eat(TokenKind::ESCAPE).is_some() {
        Some(Box::new(parse_expr_bp(p, P_CMP)?))
    } else {
        None
    };
    let span = left.span().merge(
        escape
            .as_ref()
            .map(|e| e.span())
            .unwrap_or_else(|| pattern.span()),
    );
    Ok(Expr::Like {
        expr: Box::new(left),
        pattern: Box::new(pattern),
        negated,
        case_insensitive,
        escape,
        span,
    })
}

/// `IN (list)` / `IN (subquery)`.
pub(crate) fn infix_in(p: &mut Parser<'_>, left: Expr, _tok: Token) -> Result<Expr, Error> {
    in_tail(p, left, false)
}

fn in_tail(p: &mut Parser<'_>, left: Expr, negated: bool) -> Result<Expr, Error> {
    p.expect(TokenKind::LPAREN, "( after IN")?;
    let set = if p.check(TokenKind::SELECT) || p.check(TokenKind::WITH) {
        let select = p.parse_select_stmt()?;
        InSet::Subquery(Box::new(select))
    } else {
        let mut items = Vec::new();
        loop {
            items.push(parse_expr(p)?);
            if p.eat(TokenKind::COMMA).is_none() {
                break;
            }
        }
        InSet::List(items)
    };
    let close = p.expect(TokenKind::RPAREN, ") to close IN")?;
    let span = left.span().merge(close.span);
    Ok(Expr::In {
        expr: Box::new(left),
        set,
        negated,
        span,
    })
}

/// `BETWEEN low AND high`.
pub(crate) fn infix_between(p: &mut Parser<'_>, left: Expr, _tok: Token) -> Result<Expr, Error> {
    between_tail(p, left, false)
}

fn between_tail(p: &mut Parser<'_>, left: Expr, negated: bool) -> Result<Expr, Error> {
    let low = parse_expr_bp(p, P_CMP)?;
    p.expect(TokenKind::AND, "AND in BETWEEN")?;
    let high = parse_expr_bp(p, P_CMP)?;
    let span = left.span().merge(high.span());
    Ok(Expr::Between {
        expr: Box::new(left),
        low: Box::new(low),
        high: Box::new(high),
        negated,
        span,
    })
}

/// Infix NOT dispatches to the negated comparison forms.
pub(crate) fn infix_not(p: &mut Parser<'_>, left: Expr, tok: Token) -> Result<Expr, Error> {
    let next = p.advance();
    match next.kind {
        TokenKind::IN => in_tail(p, left, true),
        TokenKind::BETWEEN => between_tail(p, left, true),
        TokenKind::LIKE => like_tail(p, left, next, true),
        _ if next.raw.eq_ignore_ascii_case("ilike") => like_tail(p, left, next, true),
        _ => Err(Error::parse(
            tok.span,
            format!("expected IN, LIKE, or BETWEEN after NOT, found {next}"),
        )),
    }
}

/// `expr::type` cast.
pub(crate) fn infix_cast(p: &mut Parser<'_>, left: Expr, _tok: Token) -> Result<Expr, Error> {
    let type_name = parse_type_name(p)?;
    let span = left.span().merge(p.prev_span());
    Ok(Expr::Cast {
        expr: Box::new(left),
        type_name,
        span,
    })
}

/// `expr[i]` / `expr[a:b]` indexing and slicing.
pub(crate) fn infix_index(p: &mut Parser<'_>, left: Expr, _tok: Token) -> Result<Expr, Error> {
    let index = if p.eat(TokenKind::COLON).is_some() {
        let end = if p.check(TokenKind::RBRACKET) {
            None
        } else {
            Some(Box::new(parse_expr(p)?))
        };
        IndexOp::Slice { start: None, end }
    } else {
        let first = parse_expr(p)?;
        if p.eat(TokenKind::COLON).is_some() {
            let end = if p.check(TokenKind::RBRACKET) {
                None
            } else {
                Some(Box::new(parse_expr(p)?))
            };
            IndexOp::Slice {
                start: Some(Box::new(first)),
                end,
            }
        } else {
            IndexOp::Element(Box::new(first))
        }
    };
    let close = p.expect(TokenKind::RBRACKET, "] to close index")?;
    let span = left.span().merge(close.span);
    Ok(Expr::Index {
        expr: Box::new(left),
        index,
        span,
    })
}

/// Single-parameter lambda: `x -> body`. The parenthesized multi-parameter
/// form is handled by [`prefix_lparen`].
pub(crate) fn infix_lambda(p: &mut Parser<'_>, left: Expr, tok: Token) -> Result<Expr, Error> {
    let param = lambda_param(left, tok.span)?;
    let body = parse_expr_bp(p, P_LAMBDA - 1)?;
    let span = param.span.merge(body.span());
    Ok(Expr::Lambda {
        params: vec![param],
        body: Box::new(body),
        span,
    })
}

fn lambda_param(expr: Expr, at: crate::token::Span) -> Result<Ident, Error> {
    match expr {
        Expr::ColumnRef {
            table: None,
            column,
            ..
        } => Ok(column),
        other => Err(Error::parse(
            at,
            format!("lambda parameter must be a bare identifier, found '{other}'"),
        )),
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Call tail: the name has been parsed and the `(` is the current token.
pub(crate) fn parse_func_call(p: &mut Parser<'_>, name: Ident) -> Result<Expr, Error> {
    p.expect(TokenKind::LPAREN, "( to open call")?;
    let mut args = Vec::new();
    let mut distinct = false;
    if !p.check(TokenKind::RPAREN) {
        distinct = p.eat(TokenKind::DISTINCT).is_some();
        loop {
            args.push(parse_expr(p)?);
            if p.eat(TokenKind::COMMA).is_none() {
                break;
            }
        }
    }
    let mut close = p.expect(TokenKind::RPAREN, ") to close call")?;

    let filter = if p.eat(TokenKind::FILTER).is_some() {
        p.expect(TokenKind::LPAREN, "( after FILTER")?;
        p.expect(TokenKind::WHERE, "WHERE in FILTER")?;
        let predicate = parse_expr(p)?;
        close = p.expect(TokenKind::RPAREN, ") to close FILTER")?;
        Some(Box::new(predicate))
    } else {
        None
    };

    let over = if p.eat(TokenKind::OVER).is_some() {
        if p.eat(TokenKind::LPAREN).is_some() {
            let spec = p.parse_window_spec()?;
            close = Token::new(TokenKind::RPAREN, ")", p.prev_span());
            Some(Box::new(Window::Spec(spec)))
        } else {
            let window_name = p.parse_ident("window name after OVER")?;
            close = Token::new(TokenKind::RPAREN, ")", window_name.span);
            Some(Box::new(Window::Named(window_name)))
        }
    } else {
        None
    };

    let span = name.span.merge(close.span);
    Ok(Expr::FuncCall {
        name,
        args,
        distinct,
        filter,
        over,
        span,
    })
}

/// A type name: one identifier plus optional `(args)` and `[]` suffixes.
pub(crate) fn parse_type_name(p: &mut Parser<'_>) -> Result<String, Error> {
    let base = p.parse_ident("type name")?;
    let mut name = base.value;
    if p.eat(TokenKind::LPAREN).is_some() {
        name.push('(');
        loop {
            let tok = p.expect(TokenKind::NUMBER, "type parameter")?;
            name.push_str(&tok.raw);
            if p.eat(TokenKind::COMMA).is_some() {
                name.push(',');
            } else {
                break;
            }
        }
        p.expect(TokenKind::RPAREN, ") to close type parameters")?;
        name.push(')');
    }
    while p.eat(TokenKind::LBRACKET).is_some() {
        p.expect(TokenKind::RBRACKET, "] in array type")?;
        name.push_str("[]");
    }
    Ok(name)
}

fn ident_from(tok: &Token) -> Ident {
    Ident::new(
        tok.raw.clone(),
        tok.kind == TokenKind::QUOTED_IDENT,
        tok.span,
    )
}

/// Folds a qualified name's parts into a single qualifier identifier: the
/// last part stays separate as the column, handled by the caller.
fn fold_idents(mut parts: Vec<Ident>) -> Ident {
    if parts.len() == 1 {
        return parts.pop().expect("one part");
    }
    let first = parts.first().expect("at least one part");
    let last = parts.last().expect("at least one part");
    let span = first.span.merge(last.span);
    let quoted = parts.iter().any(|p| p.quoted);
    let value = parts
        .iter()
        .map(|p| p.value.as_str())
        .collect::<Vec<_>>()
        .join(".");
    Ident::new(value, quoted, span)
}

/// Parses a select item: star, table-star, or aliased expression.
pub(crate) fn parse_select_item(p: &mut Parser<'_>) -> Result<SelectItem, Error> {
    if p.check(TokenKind::STAR) {
        let star = p.advance();
        let modifiers = p.parse_star_modifiers()?;
        return Ok(SelectItem::Star {
            modifiers,
            span: star.span.merge(p.prev_span()),
        });
    }

    let is_table_star = matches!(
        p.peek().kind,
        TokenKind::IDENT | TokenKind::QUOTED_IDENT
    ) && p.peek_ahead(1).kind == TokenKind::DOT
        && p.peek_ahead(2).kind == TokenKind::STAR;
    if is_table_star {
        let table = p.parse_ident("table qualifier")?;
        p.expect(TokenKind::DOT, ".")?;
        p.expect(TokenKind::STAR, "*")?;
        let modifiers = p.parse_star_modifiers()?;
        return Ok(SelectItem::TableStar {
            table: table.clone(),
            modifiers,
            span: table.span.merge(p.prev_span()),
        });
    }

    let expr = parse_expr(p)?;
    let alias = if p.eat(TokenKind::AS).is_some() {
        Some(p.parse_ident("alias after AS")?)
    } else if matches!(p.peek().kind, TokenKind::IDENT | TokenKind::QUOTED_IDENT) {
        Some(p.parse_ident("alias")?)
    } else {
        None
    };
    Ok(SelectItem::Expr { expr, alias })
}
