//! Primary expressions: literals, names, lambdas, collections and their
//! comprehension forms, templates, and `match`/`if` expressions.

use std::sync::Arc;

use super::{PResult, Parser};
use crate::ast::*;
use crate::diagnostics::ErrorCode;
use crate::lexer::{TemplateSegment, Token, TokenKind};
use crate::span::Span;

impl Parser {
    pub(super) fn parse_primary(&mut self) -> PResult<Expr> {
        let registry = Arc::clone(&self.registry);
        if let Some((dialect, entry)) = registry.match_expression(self) {
            self.ensure_installed(dialect);
            return entry(self);
        }

        let token = self.current().clone();
        match token.kind {
            TokenKind::IntLit => {
                self.advance();
                let value = self.parse_int_literal(&token)?;
                Ok(Expr::new(ExprKind::Literal(Literal::Int(value)), token.span))
            }
            TokenKind::FloatLit => {
                self.advance();
                let value = self.parse_float_literal(&token)?;
                Ok(Expr::new(ExprKind::Literal(Literal::Float(value)), token.span))
            }
            TokenKind::StringLit | TokenKind::RawStringLit => {
                self.advance();
                Ok(Expr::new(
                    ExprKind::Literal(Literal::String(token.value)),
                    token.span,
                ))
            }
            TokenKind::TemplateString => {
                self.advance();
                self.parse_template(token)
            }
            TokenKind::Regex => {
                self.advance();
                let (pattern, flags) = split_regex(&token.value);
                Ok(Expr::new(ExprKind::Regex { pattern, flags }, token.span))
            }
            TokenKind::True | TokenKind::False => {
                self.advance();
                let value = token.kind == TokenKind::True;
                Ok(Expr::new(ExprKind::Literal(Literal::Bool(value)), token.span))
            }
            TokenKind::Nil => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Literal::Nil), token.span))
            }
            _ if self.check_ident() => {
                if self.peek(1).kind == TokenKind::FatArrow && !self.no_arrow_lambda {
                    return self.parse_arrow_lambda(false, token.span);
                }
                self.advance();
                Ok(Expr::new(ExprKind::Ident(token.value), token.span))
            }
            TokenKind::Async => {
                self.advance();
                if self.check(TokenKind::Fn) {
                    self.parse_fn_lambda(true, token.span)
                } else {
                    self.parse_arrow_lambda(true, token.span)
                }
            }
            TokenKind::Fn => self.parse_fn_lambda(false, token.span),
            TokenKind::LParen => self.parse_paren(),
            TokenKind::LBracket => self.parse_array(),
            TokenKind::LBrace => self.parse_object(),
            TokenKind::Match => self.parse_match_expr(),
            TokenKind::If => self.parse_if_expr(),
            _ => Err(self.error_expected_code(ErrorCode::ExpectedExpression, "expression")),
        }
    }

    pub(super) fn parse_int_literal(&self, token: &Token) -> PResult<i64> {
        let text = token.value.replace('_', "");
        let parsed = if let Some(hex) = text.strip_prefix("0x") {
            i64::from_str_radix(hex, 16)
        } else if let Some(oct) = text.strip_prefix("0o") {
            i64::from_str_radix(oct, 8)
        } else if let Some(bin) = text.strip_prefix("0b") {
            i64::from_str_radix(bin, 2)
        } else {
            text.parse()
        };
        parsed.map_err(|_| {
            self.error_at(
                ErrorCode::InvalidInteger,
                format!("invalid integer literal `{}`", token.value),
                token.span,
            )
        })
    }

    pub(super) fn parse_float_literal(&self, token: &Token) -> PResult<f64> {
        token.value.replace('_', "").parse().map_err(|_| {
            self.error_at(
                ErrorCode::InvalidFloat,
                format!("invalid float literal `{}`", token.value),
                token.span,
            )
        })
    }

    /// Each interpolation is parsed by its own parser over the segment's
    /// tokens.
    fn parse_template(&mut self, token: Token) -> PResult<Expr> {
        let segments = token.template.unwrap_or_default();
        let mut parts = Vec::with_capacity(segments.len());
        for segment in segments {
            match segment {
                TemplateSegment::Text(text) => parts.push(TemplatePart::Text(text)),
                TemplateSegment::Tokens(tokens) => {
                    let expr = self.parse_sub_expression(tokens, token.span)?;
                    parts.push(TemplatePart::Expr(expr));
                }
            }
        }
        Ok(Expr::new(ExprKind::Template(parts), token.span))
    }

    // ============================================================
    // Lambdas
    // ============================================================

    /// `x => body` or `(a, b) => body`, cursor at the name or `(`.
    fn parse_arrow_lambda(&mut self, is_async: bool, start: Span) -> PResult<Expr> {
        let params = if self.check(TokenKind::LParen) {
            self.advance();
            let params = self.parse_lambda_params()?;
            self.expect(TokenKind::RParen)?;
            params
        } else {
            let name = self.expect_ident()?;
            vec![Param {
                pattern: DestructurePattern::name(name.node, name.span),
                ty: None,
                default: None,
                span: name.span,
            }]
        };
        self.expect(TokenKind::FatArrow)?;
        self.finish_lambda(params, is_async, start)
    }

    /// `fn(params) body`, cursor at `fn`.
    fn parse_fn_lambda(&mut self, is_async: bool, start: Span) -> PResult<Expr> {
        self.expect(TokenKind::Fn)?;
        self.expect(TokenKind::LParen)?;
        let params = self.parse_params()?;
        self.expect(TokenKind::RParen)?;
        self.eat(TokenKind::FatArrow);
        self.finish_lambda(params, is_async, start)
    }

    fn finish_lambda(&mut self, params: Vec<Param>, is_async: bool, start: Span) -> PResult<Expr> {
        let body = self.parse_body()?;
        let span = start.merge(body.span());
        Ok(Expr::new(
            ExprKind::Lambda(Box::new(Lambda {
                params,
                body,
                is_async,
            })),
            span,
        ))
    }

    /// A block if the cursor is at `{`, otherwise one expression.
    pub fn parse_body(&mut self) -> PResult<Body> {
        if self.check(TokenKind::LBrace) {
            Ok(Body::Block(self.parse_block()?))
        } else {
            Ok(Body::Expr(self.parse_expression()?.boxed()))
        }
    }

    /// Arrow-lambda parameters: names, each optionally typed and defaulted.
    fn parse_lambda_params(&mut self) -> PResult<Vec<Param>> {
        let mut params = Vec::new();
        while !self.check(TokenKind::RParen) {
            let name = self.expect_ident()?;
            let ty = if self.eat(TokenKind::Colon) {
                Some(self.parse_type()?)
            } else {
                None
            };
            let default = if self.eat(TokenKind::Eq) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            params.push(Param {
                span: name.span,
                pattern: DestructurePattern::name(name.node, name.span),
                ty,
                default,
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        Ok(params)
    }

    /// `(`: an arrow lambda, a parenthesized expression, or a tuple.
    ///
    /// The lambda reading is attempted speculatively: a parameter list
    /// followed by `)` and `=>`. If that fails the cursor and error list are
    /// restored and the contents are parsed as an expression; a top-level
    /// comma makes it a tuple.
    fn parse_paren(&mut self) -> PResult<Expr> {
        let open = self.current().span;
        let lambda_params = self.speculate(|p| {
            p.expect(TokenKind::LParen)?;
            let params = p.parse_lambda_params()?;
            p.expect(TokenKind::RParen)?;
            if !p.check(TokenKind::FatArrow) {
                return Err(p.error_expected("`=>`"));
            }
            Ok(params)
        });
        if let Some(params) = lambda_params {
            self.expect(TokenKind::FatArrow)?;
            return self.finish_lambda(params, false, open);
        }

        self.expect(TokenKind::LParen)?;
        if let Some(close) = self.match_kind(&[TokenKind::RParen]) {
            return Ok(Expr::new(ExprKind::Tuple(Vec::new()), open.merge(close.span)));
        }

        let first = self.parse_expression()?;
        if !self.check(TokenKind::Comma) {
            let close = self.expect(TokenKind::RParen)?;
            return Ok(Expr::new(first.kind, open.merge(close.span)));
        }

        let mut elements = vec![first];
        while self.eat(TokenKind::Comma) {
            if self.check(TokenKind::RParen) {
                break;
            }
            elements.push(self.parse_expression()?);
        }
        let close = self.expect(TokenKind::RParen)?;
        Ok(Expr::new(ExprKind::Tuple(elements), open.merge(close.span)))
    }

    // ============================================================
    // Collections
    // ============================================================

    /// `[a, b]` or `[expr for binding in iter if filter]`.
    fn parse_array(&mut self) -> PResult<Expr> {
        let open = self.expect(TokenKind::LBracket)?;
        if let Some(close) = self.match_kind(&[TokenKind::RBracket]) {
            return Ok(Expr::new(ExprKind::Array(Vec::new()), open.span.merge(close.span)));
        }

        let first = self.parse_expression()?;
        if self.check(TokenKind::For) {
            let (binding, iter, filter) = self.parse_comprehension_tail()?;
            let close = self.expect(TokenKind::RBracket)?;
            return Ok(Expr::new(
                ExprKind::ListComprehension {
                    element: first.boxed(),
                    binding,
                    iter: iter.boxed(),
                    filter: filter.map(Expr::boxed),
                },
                open.span.merge(close.span),
            ));
        }

        let mut elements = vec![first];
        while self.eat(TokenKind::Comma) {
            if self.check(TokenKind::RBracket) {
                break;
            }
            elements.push(self.parse_expression()?);
        }
        let close = self.expect(TokenKind::RBracket)?;
        Ok(Expr::new(ExprKind::Array(elements), open.span.merge(close.span)))
    }

    /// `for binding in iter [if filter]` inside a comprehension.
    fn parse_comprehension_tail(&mut self) -> PResult<(DestructurePattern, Expr, Option<Expr>)> {
        self.expect(TokenKind::For)?;
        let binding = self.parse_for_binding()?;
        self.expect(TokenKind::In)?;
        let iter = self.parse_expression()?;
        let filter = if self.eat(TokenKind::If) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok((binding, iter, filter))
    }

    /// `{a, b: 1, "c": 2, [k]: v, ...rest}` or `{k: v for k, v in pairs}`.
    fn parse_object(&mut self) -> PResult<Expr> {
        let open = self.expect(TokenKind::LBrace)?;
        if let Some(close) = self.match_kind(&[TokenKind::RBrace]) {
            return Ok(Expr::new(ExprKind::Object(Vec::new()), open.span.merge(close.span)));
        }

        let key_span = self.current().span;
        let first = self.parse_object_entry()?;
        if self.check(TokenKind::For) {
            let ObjectEntry::KeyValue { key, value } = first else {
                return Err(self.error_expected("`key: value` before `for`"));
            };
            let key = object_key_expr(key, key_span);
            let (binding, iter, filter) = self.parse_comprehension_tail()?;
            let close = self.expect(TokenKind::RBrace)?;
            return Ok(Expr::new(
                ExprKind::DictComprehension {
                    key: key.boxed(),
                    value: value.boxed(),
                    binding,
                    iter: iter.boxed(),
                    filter: filter.map(Expr::boxed),
                },
                open.span.merge(close.span),
            ));
        }

        let mut entries = vec![first];
        while self.eat(TokenKind::Comma) {
            if self.check(TokenKind::RBrace) {
                break;
            }
            entries.push(self.parse_object_entry()?);
        }
        let close = self.expect(TokenKind::RBrace)?;
        Ok(Expr::new(ExprKind::Object(entries), open.span.merge(close.span)))
    }

    fn parse_object_entry(&mut self) -> PResult<ObjectEntry> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::DotDotDot => {
                self.advance();
                Ok(ObjectEntry::Spread(self.parse_expression()?))
            }
            TokenKind::LBracket => {
                self.advance();
                let key = self.parse_expression()?;
                self.expect(TokenKind::RBracket)?;
                self.expect(TokenKind::Colon)?;
                let value = self.parse_expression()?;
                Ok(ObjectEntry::KeyValue {
                    key: ObjectKey::Computed(key.boxed()),
                    value,
                })
            }
            TokenKind::StringLit | TokenKind::RawStringLit => {
                self.advance();
                self.expect(TokenKind::Colon)?;
                let value = self.parse_expression()?;
                Ok(ObjectEntry::KeyValue {
                    key: ObjectKey::String(token.value),
                    value,
                })
            }
            _ if self.peek(1).kind == TokenKind::Colon
                && (token.kind == TokenKind::Ident || token.kind.as_keyword_str().is_some()) =>
            {
                self.advance();
                self.advance();
                let value = self.parse_expression()?;
                Ok(ObjectEntry::KeyValue {
                    key: ObjectKey::Name(token.value),
                    value,
                })
            }
            _ if self.check_ident() => {
                self.advance();
                Ok(ObjectEntry::Shorthand(Ident::new(token.value, token.span)))
            }
            _ => Err(self.error_expected_one_of(&["property name", "`...`", "`}`"])),
        }
    }

    // ============================================================
    // match / if expressions
    // ============================================================

    fn parse_match_expr(&mut self) -> PResult<Expr> {
        let start = self.expect(TokenKind::Match)?;
        let subject = self.parse_expression()?;
        self.expect(TokenKind::LBrace)?;

        let mut arms = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            arms.push(self.parse_match_arm()?);
            self.eat(TokenKind::Comma);
        }
        let close = self.expect(TokenKind::RBrace)?;
        Ok(Expr::new(
            ExprKind::Match {
                subject: subject.boxed(),
                arms,
            },
            start.span.merge(close.span),
        ))
    }

    fn parse_match_arm(&mut self) -> PResult<MatchArm> {
        let pattern = self.parse_match_pattern()?;
        let guard = if self.eat(TokenKind::If) {
            Some(self.parse_expression_before_arrow()?)
        } else {
            None
        };
        if !self.check(TokenKind::FatArrow) {
            let err = self.error_expected_code(ErrorCode::InvalidMatchArm, "`=>` after match pattern");
            return Err(err);
        }
        self.advance();
        let body = self.parse_body()?;
        let span = pattern.span.merge(body.span());
        Ok(MatchArm {
            pattern,
            guard,
            body,
            span,
        })
    }

    /// `if` in expression position; the `else` branch is mandatory.
    fn parse_if_expr(&mut self) -> PResult<Expr> {
        let start = self.current().span;
        let (branches, else_body) = self.parse_if_chain()?;
        match else_body {
            Some(else_body) => {
                let span = start.merge(else_body.span);
                Ok(Expr::new(ExprKind::If { branches, else_body }, span))
            }
            None => Err(self.error_at(
                ErrorCode::IfExpressionWithoutElse,
                "`if` expression is missing an `else` branch",
                start,
            )),
        }
    }
}

/// Split `/pattern/flags` into its parts.
fn split_regex(raw: &str) -> (String, String) {
    let body = raw.strip_prefix('/').unwrap_or(raw);
    match body.rfind('/') {
        Some(idx) => (body[..idx].to_string(), body[idx + 1..].to_string()),
        None => (body.to_string(), String::new()),
    }
}

/// The key of a dict comprehension as an expression.
fn object_key_expr(key: ObjectKey, span: Span) -> Expr {
    match key {
        ObjectKey::Name(name) => Expr::new(ExprKind::Ident(name), span),
        ObjectKey::String(value) => Expr::new(ExprKind::Literal(Literal::String(value)), span),
        ObjectKey::Computed(expr) => *expr,
    }
}
