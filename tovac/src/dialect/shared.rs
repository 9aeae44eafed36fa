//! `shared { }` blocks: code visible to both server and client.

use super::{Dialect, Placement, Production, Trigger};
use crate::ast::{DialectNode, Stmt};
use crate::lexer::TokenKind;
use crate::parser::{PResult, Parser};

#[derive(Debug, Clone, Copy, Default)]
pub struct SharedDialect;

impl Dialect for SharedDialect {
    fn name(&self) -> &'static str {
        "shared"
    }

    fn productions(&self) -> Vec<Production> {
        vec![Production::statement(
            Trigger::keyword(TokenKind::Shared),
            Placement::TopLevel,
            parse_shared,
        )]
    }
}

fn parse_shared(p: &mut Parser) -> PResult<Stmt> {
    let start = p.expect(TokenKind::Shared)?.span;
    let name = p.parse_block_name();
    let (body, span) = p.parse_dialect_body("shared")?;
    Ok(Stmt::dialect(DialectNode::Shared { name, body }, start.merge(span)))
}
