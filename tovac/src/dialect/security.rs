//! `security { }` policy blocks.
//!
//! ```text
//! security {
//!     auth jwt { secret: env("JWT_SECRET") }
//!     role Admin { can: ["manage_users"] }
//!     protect "/admin/*" { require: Admin }
//!     cors { origins: ["https://example.com"] }
//!     rate_limit { max: 100, window: 60 }
//! }
//! ```

use super::{parse_config_entries, Dialect, Placement, Production, Trigger};
use crate::ast::{DialectNode, SecurityEntry, SecurityKind, Stmt};
use crate::diagnostics::ErrorCode;
use crate::lexer::TokenKind;
use crate::parser::{PResult, Parser};

#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityDialect;

impl Dialect for SecurityDialect {
    fn name(&self) -> &'static str {
        "security"
    }

    fn productions(&self) -> Vec<Production> {
        vec![Production::statement(
            Trigger::word_before("security", &[TokenKind::LBrace]),
            Placement::TopLevel,
            parse_security,
        )]
    }
}

fn parse_security(p: &mut Parser) -> PResult<Stmt> {
    let start = p.expect_word("security")?.span;
    p.expect(TokenKind::LBrace)?;

    let mut entries = Vec::new();
    while !p.check(TokenKind::RBrace) && !p.is_at_end() {
        entries.push(parse_entry(p)?);
        p.eat(TokenKind::Comma);
    }
    let close = p.expect(TokenKind::RBrace)?;

    Ok(Stmt::dialect(
        DialectNode::Security { entries },
        start.merge(close.span),
    ))
}

/// `kind [target] [{ config }]`
fn parse_entry(p: &mut Parser) -> PResult<SecurityEntry> {
    let word = p.current().clone();
    let kind = match word.kind {
        TokenKind::Ident => SecurityKind::from_keyword(&word.value),
        _ => None,
    };
    let Some(kind) = kind else {
        return Err(p
            .error_at(
                ErrorCode::InvalidDialectEntry,
                format!("unknown security entry `{}`", word.value),
                word.span,
            )
            .with_hint("expected `role`, `protect`, `auth`, `cors`, `csp` or `rate_limit`"));
    };
    p.advance();

    let mut span = word.span;
    let target = if !p.check(TokenKind::LBrace) && p.on_same_line() && !p.check(TokenKind::RBrace) {
        let target = p.parse_expression()?;
        span = span.merge(target.span);
        Some(target)
    } else {
        None
    };

    let config = if p.check(TokenKind::LBrace) {
        let (config, config_span) = parse_config_entries(p)?;
        span = span.merge(config_span);
        config
    } else {
        Vec::new()
    };

    Ok(SecurityEntry {
        kind,
        target,
        config,
        span,
    })
}
