//! Structured concurrency: `spawn`, `concurrent { }` and `select { }`.
//!
//! All three words are ordinary identifiers; each trigger looks ahead so
//! that variables named `spawn`, `concurrent` or `select` keep working.

use super::{Dialect, Placement, Production, Trigger};
use crate::ast::{
    Arg, ConcurrentMode, DialectNode, Expr, ExprKind, SelectCase, SelectKind, Stmt,
};
use crate::diagnostics::ErrorCode;
use crate::lexer::TokenKind;
use crate::parser::{PResult, Parser};

#[derive(Debug, Clone, Copy, Default)]
pub struct ConcurrencyDialect;

impl Dialect for ConcurrencyDialect {
    fn name(&self) -> &'static str {
        "concurrency"
    }

    fn productions(&self) -> Vec<Production> {
        vec![
            Production::statement(
                Trigger::word("concurrent", concurrent_follows),
                Placement::Anywhere,
                parse_concurrent,
            ),
            Production::statement(
                Trigger::word_before("select", &[TokenKind::LBrace]),
                Placement::Anywhere,
                parse_select,
            ),
            Production::expression(Trigger::word("spawn", spawn_follows), parse_spawn),
        ]
    }
}

/// `concurrent {`, `concurrent all {`, `concurrent timeout(`.
fn concurrent_follows(p: &Parser) -> bool {
    let next = p.peek(1);
    match next.kind {
        TokenKind::LBrace => true,
        TokenKind::Ident => match next.value.as_str() {
            "all" | "cancel_on_error" | "first" => p.peek(2).kind == TokenKind::LBrace,
            "timeout" => p.peek(2).kind == TokenKind::LParen,
            _ => false,
        },
        _ => false,
    }
}

/// `spawn` followed on the same line by a call target or a lambda.
fn spawn_follows(p: &Parser) -> bool {
    let spawn = p.current();
    let next = p.peek(1);
    next.line() == spawn.line()
        && (next.kind == TokenKind::Ident
            || Parser::is_contextual_keyword(next.kind)
            || matches!(next.kind, TokenKind::Fn | TokenKind::Async))
}

/// `concurrent [all | cancel_on_error | first | timeout(ms)] { ... }`
fn parse_concurrent(p: &mut Parser) -> PResult<Stmt> {
    let start = p.expect_word("concurrent")?.span;

    let mode = if p.check(TokenKind::LBrace) {
        ConcurrentMode::All
    } else {
        let word = p.expect_ident()?;
        match word.node.as_str() {
            "all" => ConcurrentMode::All,
            "cancel_on_error" => ConcurrentMode::CancelOnError,
            "first" => ConcurrentMode::First,
            "timeout" => {
                p.expect(TokenKind::LParen)?;
                let ms = p.parse_expression()?;
                p.expect(TokenKind::RParen)?;
                ConcurrentMode::Timeout(ms)
            }
            other => {
                return Err(p
                    .error_at(
                        ErrorCode::InvalidDialectEntry,
                        format!("unknown concurrency mode `{}`", other),
                        word.span,
                    )
                    .with_hint("expected `all`, `cancel_on_error`, `first` or `timeout(ms)`"))
            }
        }
    };

    let body = p.parse_block()?;
    let span = start.merge(body.span);
    Ok(Stmt::dialect(DialectNode::Concurrent { mode, body }, span))
}

/// ```text
/// select {
///     msg from inbox => handle(msg)
///     outbox.send(item) => log(item)
///     timeout(1000) => print("idle")
///     _ => {}
/// }
/// ```
fn parse_select(p: &mut Parser) -> PResult<Stmt> {
    let start = p.expect_word("select")?.span;
    p.expect(TokenKind::LBrace)?;

    let mut cases = Vec::new();
    while !p.check(TokenKind::RBrace) && !p.is_at_end() {
        cases.push(parse_select_case(p)?);
        p.eat(TokenKind::Comma);
    }
    let close = p.expect(TokenKind::RBrace)?;

    Ok(Stmt::dialect(
        DialectNode::Select { cases },
        start.merge(close.span),
    ))
}

fn parse_select_case(p: &mut Parser) -> PResult<SelectCase> {
    let start = p.current().span;
    let next = p.peek(1).kind;

    let kind = if p.check_word("_") && next == TokenKind::FatArrow {
        p.advance();
        SelectKind::Default
    } else if p.check_word("timeout") && next == TokenKind::LParen {
        p.advance();
        p.advance();
        let ms = p.parse_expression()?;
        p.expect(TokenKind::RParen)?;
        SelectKind::Timeout(ms)
    } else if p.check_ident() && next == TokenKind::From {
        let binding = p.expect_ident()?;
        p.advance();
        let channel = p.parse_expression_before_arrow()?;
        SelectKind::Receive { binding, channel }
    } else {
        let expr = p.parse_expression_before_arrow()?;
        send_case(p, expr)?
    };

    if !p.check(TokenKind::FatArrow) {
        return Err(p.error_expected("`=>` after select case"));
    }
    p.advance();
    let body = p.parse_body()?;

    Ok(SelectCase {
        span: start.merge(body.span()),
        kind,
        body,
    })
}

/// `channel.send(value)` split into its channel and value.
fn send_case(p: &Parser, expr: Expr) -> PResult<SelectKind> {
    let span = expr.span;
    if let ExprKind::Call { callee, mut args } = expr.kind {
        if let ExprKind::Member {
            object, property, ..
        } = callee.kind
        {
            if property.node == "send" && args.len() == 1 {
                if let Some(Arg::Positional(value)) = args.pop() {
                    return Ok(SelectKind::Send {
                        channel: *object,
                        value,
                    });
                }
            }
        }
    }
    Err(p
        .error_at(
            ErrorCode::InvalidDialectEntry,
            "expected a select case",
            span,
        )
        .with_hint("cases are `x from ch`, `ch.send(v)`, `timeout(ms)` or `_`"))
}

/// `spawn expr`
fn parse_spawn(p: &mut Parser) -> PResult<Expr> {
    let start = p.expect_word("spawn")?.span;
    let task = p.nested(|p| p.parse_unary())?;
    let span = start.merge(task.span);
    Ok(Expr::new(ExprKind::Spawn(task.boxed()), span))
}
