//! `server { }` blocks with routes and middleware.

use super::{Dialect, GrammarExtensions, Placement, Production, Trigger};
use crate::ast::{DialectNode, Stmt};
use crate::diagnostics::ErrorCode;
use crate::lexer::TokenKind;
use crate::parser::{PResult, Parser};

const CONTEXT: &str = "server";

const METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS", "WS"];

/// ```text
/// server "api" {
///     middleware fn log(req, next) { next(req) }
///     route GET "/users/:id" => get_user
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerDialect;

impl Dialect for ServerDialect {
    fn name(&self) -> &'static str {
        "server"
    }

    fn productions(&self) -> Vec<Production> {
        vec![Production::statement(
            Trigger::keyword(TokenKind::Server),
            Placement::TopLevel,
            parse_server,
        )]
    }

    fn install(&self, grammar: &mut GrammarExtensions) {
        grammar.add_body_rule(
            CONTEXT,
            Trigger::keyword_before(TokenKind::Route, &[TokenKind::Ident]),
            parse_route,
        );
        grammar.add_body_rule(
            CONTEXT,
            Trigger::word_before("middleware", &[TokenKind::Fn, TokenKind::Async]),
            parse_middleware,
        );
    }
}

fn parse_server(p: &mut Parser) -> PResult<Stmt> {
    let start = p.expect(TokenKind::Server)?.span;
    let name = p.parse_block_name();
    let (body, span) = p.parse_dialect_body(CONTEXT)?;
    Ok(Stmt::dialect(DialectNode::Server { name, body }, start.merge(span)))
}

/// `route METHOD "path" => handler`
fn parse_route(p: &mut Parser) -> PResult<Stmt> {
    let start = p.expect(TokenKind::Route)?.span;
    let method = p.expect_ident()?;
    if !METHODS.contains(&method.node.as_str()) {
        return Err(p
            .error_at(
                ErrorCode::InvalidDialectEntry,
                format!("unknown HTTP method `{}`", method.node),
                method.span,
            )
            .with_hint(format!("expected one of {}", METHODS.join(", "))));
    }

    let path = match p.current().kind {
        TokenKind::StringLit | TokenKind::RawStringLit => p.advance(),
        _ => return Err(p.error_expected("route path string")),
    };
    p.expect(TokenKind::FatArrow)?;
    let handler = p.parse_body()?;

    let span = start.merge(handler.span());
    Ok(Stmt::dialect(
        DialectNode::Route {
            method: method.node,
            path: path.value,
            handler,
        },
        span,
    ))
}

/// `middleware [async] fn name(params) { ... }`
fn parse_middleware(p: &mut Parser) -> PResult<Stmt> {
    let start = p.expect_word("middleware")?.span;
    let function = p.parse_function_decl(Vec::new(), false)?;
    let span = start.merge(function.body.span);
    Ok(Stmt::dialect(DialectNode::Middleware { function }, span))
}

