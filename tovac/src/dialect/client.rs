//! `client { }` blocks: reactive state, computed values, effects,
//! components and stores.
//!
//! `state`, `computed`, `effect`, `component` and `store` are keywords only
//! inside a client body; elsewhere they are ordinary names.

use super::{Dialect, GrammarExtensions, Placement, Production, Trigger};
use crate::ast::{Block, DialectNode, Stmt};
use crate::lexer::TokenKind;
use crate::parser::{PResult, Parser};

const CONTEXT: &str = "client";

#[derive(Debug, Clone, Copy, Default)]
pub struct ClientDialect;

impl Dialect for ClientDialect {
    fn name(&self) -> &'static str {
        "client"
    }

    fn productions(&self) -> Vec<Production> {
        vec![Production::statement(
            Trigger::keyword(TokenKind::Client),
            Placement::TopLevel,
            parse_client,
        )]
    }

    fn install(&self, grammar: &mut GrammarExtensions) {
        const NAMED: &[TokenKind] = &[TokenKind::Ident];
        grammar.add_body_rule(CONTEXT, Trigger::keyword_before(TokenKind::State, NAMED), parse_state);
        grammar.add_body_rule(
            CONTEXT,
            Trigger::keyword_before(TokenKind::Computed, NAMED),
            parse_computed,
        );
        grammar.add_body_rule(
            CONTEXT,
            Trigger::keyword_before(TokenKind::Effect, &[TokenKind::LBrace]),
            parse_effect,
        );
        grammar.add_body_rule(
            CONTEXT,
            Trigger::keyword_before(TokenKind::Component, NAMED),
            parse_component,
        );
        grammar.add_body_rule(CONTEXT, Trigger::keyword_before(TokenKind::Store, NAMED), parse_store);
    }
}

fn parse_client(p: &mut Parser) -> PResult<Stmt> {
    let start = p.expect(TokenKind::Client)?.span;
    let name = p.parse_block_name();
    let (body, span) = p.parse_dialect_body(CONTEXT)?;
    Ok(Stmt::dialect(DialectNode::Client { name, body }, start.merge(span)))
}

/// `state name[: Type] = value`
fn parse_state(p: &mut Parser) -> PResult<Stmt> {
    let start = p.expect(TokenKind::State)?.span;
    let name = p.expect_ident()?;
    let ty = if p.eat(TokenKind::Colon) {
        Some(p.parse_type()?)
    } else {
        None
    };
    p.expect(TokenKind::Eq)?;
    let value = p.parse_expression()?;
    let span = start.merge(value.span);
    Ok(Stmt::dialect(DialectNode::State { name, ty, value }, span))
}

/// `computed name = value`
fn parse_computed(p: &mut Parser) -> PResult<Stmt> {
    let start = p.expect(TokenKind::Computed)?.span;
    let name = p.expect_ident()?;
    p.expect(TokenKind::Eq)?;
    let value = p.parse_expression()?;
    let span = start.merge(value.span);
    Ok(Stmt::dialect(DialectNode::Computed { name, value }, span))
}

/// `effect { ... }`
fn parse_effect(p: &mut Parser) -> PResult<Stmt> {
    let start = p.expect(TokenKind::Effect)?.span;
    let body = p.parse_block()?;
    let span = start.merge(body.span);
    Ok(Stmt::dialect(DialectNode::Effect { body }, span))
}

/// `component Name[(params)] { ... }`; the body is itself a client body.
fn parse_component(p: &mut Parser) -> PResult<Stmt> {
    let start = p.expect(TokenKind::Component)?.span;
    let name = p.expect_ident()?;
    let params = if p.eat(TokenKind::LParen) {
        let params = p.parse_params()?;
        p.expect(TokenKind::RParen)?;
        params
    } else {
        Vec::new()
    };
    let (stmts, body_span) = p.parse_dialect_body(CONTEXT)?;
    Ok(Stmt::dialect(
        DialectNode::Component {
            name,
            params,
            body: Block {
                stmts,
                span: body_span,
            },
        },
        start.merge(body_span),
    ))
}

/// `store Name { ... }`
fn parse_store(p: &mut Parser) -> PResult<Stmt> {
    let start = p.expect(TokenKind::Store)?.span;
    let name = p.expect_ident()?;
    let (body, span) = p.parse_dialect_body(CONTEXT)?;
    Ok(Stmt::dialect(DialectNode::Store { name, body }, start.merge(span)))
}
