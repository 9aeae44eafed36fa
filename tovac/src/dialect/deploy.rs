//! `deploy ["name"] { key: value }` blocks.

use super::{parse_config_entries, Dialect, Placement, Production, Trigger};
use crate::ast::{DialectNode, Stmt};
use crate::lexer::TokenKind;
use crate::parser::{PResult, Parser};

#[derive(Debug, Clone, Copy, Default)]
pub struct DeployDialect;

impl Dialect for DeployDialect {
    fn name(&self) -> &'static str {
        "deploy"
    }

    fn productions(&self) -> Vec<Production> {
        vec![Production::statement(
            Trigger::word_before(
                "deploy",
                &[TokenKind::StringLit, TokenKind::RawStringLit, TokenKind::LBrace],
            ),
            Placement::TopLevel,
            parse_deploy,
        )]
    }
}

fn parse_deploy(p: &mut Parser) -> PResult<Stmt> {
    let start = p.expect_word("deploy")?.span;
    let name = match p.current().kind {
        TokenKind::StringLit | TokenKind::RawStringLit => Some(p.advance().value),
        _ => None,
    };
    let (config, span) = parse_config_entries(p)?;
    Ok(Stmt::dialect(DialectNode::Deploy { name, config }, start.merge(span)))
}
