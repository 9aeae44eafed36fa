//! Pattern parsing.
//!
//! Two sub-grammars share token syntax but stay separate:
//!
//! - destructure patterns bind names without testing shape (`let`,
//!   parameters, loop variables);
//! - match patterns test shape and bind (`match` arms only).
//!
//! In a match pattern a capitalized bare name is a variant and a lowercase
//! name is a binding; the case of the first character is the only
//! disambiguator.

use super::{PResult, Parser};
use crate::ast::*;
use crate::diagnostics::ErrorCode;
use crate::lexer::TokenKind;

fn starts_uppercase(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

impl Parser {
    // ============================================================
    // Destructure patterns
    // ============================================================

    /// `name`, `{a, b: alias, c = default}`, `[a, b, ...rest]`, `(a, b)`.
    pub fn parse_destructure_pattern(&mut self) -> PResult<DestructurePattern> {
        self.nested(Self::parse_destructure_pattern_inner)
    }

    fn parse_destructure_pattern_inner(&mut self) -> PResult<DestructurePattern> {
        match self.current().kind {
            TokenKind::LBrace => self.parse_object_pattern(),
            TokenKind::LBracket => self.parse_array_pattern(),
            TokenKind::LParen => {
                let open = self.advance();
                let mut elements = Vec::new();
                while !self.check(TokenKind::RParen) && !self.is_at_end() {
                    elements.push(self.parse_destructure_pattern()?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                let close = self.expect(TokenKind::RParen)?;
                Ok(DestructurePattern {
                    kind: DestructureKind::Tuple(elements),
                    span: open.span.merge(close.span),
                })
            }
            _ if self.check_ident() => {
                let name = self.expect_ident()?;
                Ok(DestructurePattern::name(name.node, name.span))
            }
            _ => Err(self.error_expected_code(ErrorCode::ExpectedPattern, "pattern")),
        }
    }

    fn parse_object_pattern(&mut self) -> PResult<DestructurePattern> {
        let open = self.expect(TokenKind::LBrace)?;
        let mut entries = Vec::new();
        let mut rest = None;

        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            if self.check(TokenKind::DotDotDot) {
                rest = Some(self.parse_rest_binding(TokenKind::RBrace)?);
                break;
            }

            let key = self.expect_ident()?;
            let value = if self.eat(TokenKind::Colon) {
                self.parse_destructure_pattern()?
            } else {
                DestructurePattern::name(key.node.clone(), key.span)
            };
            let default = if self.eat(TokenKind::Eq) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            let end = default.as_ref().map_or(value.span, |d| d.span);
            entries.push(ObjectPatternEntry {
                span: key.span.merge(end),
                key: key.node,
                value,
                default,
            });

            if !self.eat(TokenKind::Comma) {
                break;
            }
        }

        let close = self.expect(TokenKind::RBrace)?;
        Ok(DestructurePattern {
            kind: DestructureKind::Object { entries, rest },
            span: open.span.merge(close.span),
        })
    }

    fn parse_array_pattern(&mut self) -> PResult<DestructurePattern> {
        let open = self.expect(TokenKind::LBracket)?;
        let mut elements = Vec::new();
        let mut rest = None;

        while !self.check(TokenKind::RBracket) && !self.is_at_end() {
            if self.check(TokenKind::DotDotDot) {
                rest = Some(self.parse_rest_binding(TokenKind::RBracket)?);
                break;
            }
            elements.push(self.parse_destructure_pattern()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }

        let close = self.expect(TokenKind::RBracket)?;
        Ok(DestructurePattern {
            kind: DestructureKind::Array { elements, rest },
            span: open.span.merge(close.span),
        })
    }

    /// `...name` as the last element before `closing`. A bare `...` binds `_`.
    fn parse_rest_binding(&mut self, closing: TokenKind) -> PResult<Ident> {
        let dots = self.expect(TokenKind::DotDotDot)?;
        let name = if self.check_ident() {
            self.expect_ident()?
        } else {
            Ident::new("_".to_string(), dots.span)
        };
        self.eat(TokenKind::Comma);
        if !self.check(closing) {
            let span = self.current().span;
            return Err(self.error_at(
                ErrorCode::RestNotLast,
                "a rest element must be the last element of a pattern",
                span,
            ));
        }
        Ok(name)
    }

    /// A `for` loop or comprehension variable: a destructure pattern, or
    /// `k, v` as shorthand for a tuple pattern.
    pub fn parse_for_binding(&mut self) -> PResult<DestructurePattern> {
        let first = self.parse_destructure_pattern()?;
        if !self.check(TokenKind::Comma) {
            return Ok(first);
        }
        let mut elements = vec![first];
        while self.eat(TokenKind::Comma) {
            elements.push(self.parse_destructure_pattern()?);
        }
        let span = elements[0].span.merge(elements[elements.len() - 1].span);
        Ok(DestructurePattern {
            kind: DestructureKind::Tuple(elements),
            span,
        })
    }

    // ============================================================
    // Match patterns
    // ============================================================

    pub fn parse_match_pattern(&mut self) -> PResult<MatchPattern> {
        self.nested(Self::parse_match_pattern_inner)
    }

    fn parse_match_pattern_inner(&mut self) -> PResult<MatchPattern> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Ident if token.value == "_" => {
                self.advance();
                Ok(MatchPattern {
                    kind: MatchPatternKind::Wildcard,
                    span: token.span,
                })
            }
            TokenKind::Ident if starts_uppercase(&token.value) => self.parse_variant_pattern(),
            _ if self.check_ident() => {
                self.advance();
                Ok(MatchPattern {
                    kind: MatchPatternKind::Binding(token.value),
                    span: token.span,
                })
            }
            TokenKind::StringLit | TokenKind::RawStringLit if self.peek(1).kind == TokenKind::PlusPlus => {
                self.advance();
                self.advance();
                let rest = self.expect_ident()?;
                Ok(MatchPattern {
                    span: token.span.merge(rest.span),
                    kind: MatchPatternKind::StringConcat {
                        prefix: token.value,
                        rest,
                    },
                })
            }
            TokenKind::Minus
            | TokenKind::IntLit
            | TokenKind::FloatLit
            | TokenKind::StringLit
            | TokenKind::RawStringLit
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Nil => {
                let (start, start_span) = self.parse_pattern_literal()?;
                if let Some(op) = self.match_kind(&[TokenKind::DotDot, TokenKind::DotDotEq]) {
                    let (end, end_span) = self.parse_pattern_literal()?;
                    return Ok(MatchPattern {
                        kind: MatchPatternKind::Range {
                            start,
                            end,
                            inclusive: op.kind == TokenKind::DotDotEq,
                        },
                        span: start_span.merge(end_span),
                    });
                }
                Ok(MatchPattern {
                    kind: MatchPatternKind::Literal(start),
                    span: start_span,
                })
            }
            TokenKind::LParen => {
                self.advance();
                let elements = self.parse_match_pattern_list(TokenKind::RParen)?;
                let close = self.expect(TokenKind::RParen)?;
                Ok(MatchPattern {
                    kind: MatchPatternKind::Tuple(elements),
                    span: token.span.merge(close.span),
                })
            }
            TokenKind::LBracket => {
                self.advance();
                let mut elements = Vec::new();
                let mut rest = None;
                while !self.check(TokenKind::RBracket) && !self.is_at_end() {
                    if self.check(TokenKind::DotDotDot) {
                        rest = Some(self.parse_rest_binding(TokenKind::RBracket)?);
                        break;
                    }
                    elements.push(self.parse_match_pattern()?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                let close = self.expect(TokenKind::RBracket)?;
                Ok(MatchPattern {
                    kind: MatchPatternKind::Array { elements, rest },
                    span: token.span.merge(close.span),
                })
            }
            _ => Err(self.error_expected_code(ErrorCode::ExpectedPattern, "pattern")),
        }
    }

    /// `Name` or `Name(p, q)`.
    fn parse_variant_pattern(&mut self) -> PResult<MatchPattern> {
        let name = self.expect_ident()?;
        if !(self.check(TokenKind::LParen) && self.on_same_line()) {
            return Ok(MatchPattern {
                span: name.span,
                kind: MatchPatternKind::Variant {
                    name,
                    fields: Vec::new(),
                },
            });
        }
        self.advance();
        let fields = self.parse_match_pattern_list(TokenKind::RParen)?;
        let close = self.expect(TokenKind::RParen)?;
        Ok(MatchPattern {
            span: name.span.merge(close.span),
            kind: MatchPatternKind::Variant { name, fields },
        })
    }

    fn parse_match_pattern_list(&mut self, closing: TokenKind) -> PResult<Vec<MatchPattern>> {
        let mut patterns = Vec::new();
        while !self.check(closing) && !self.is_at_end() {
            patterns.push(self.parse_match_pattern()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        Ok(patterns)
    }

    /// A literal usable in patterns, including negative numbers.
    fn parse_pattern_literal(&mut self) -> PResult<(Literal, crate::span::Span)> {
        let negative = self.check(TokenKind::Minus);
        let minus_span = self.current().span;
        if negative {
            self.advance();
        }

        let token = self.current().clone();
        let literal = match token.kind {
            TokenKind::IntLit => {
                let value = self.parse_int_literal(&token)?;
                Literal::Int(if negative { -value } else { value })
            }
            TokenKind::FloatLit => {
                let value = self.parse_float_literal(&token)?;
                Literal::Float(if negative { -value } else { value })
            }
            TokenKind::StringLit | TokenKind::RawStringLit if !negative => {
                Literal::String(token.value.clone())
            }
            TokenKind::True if !negative => Literal::Bool(true),
            TokenKind::False if !negative => Literal::Bool(false),
            TokenKind::Nil if !negative => Literal::Nil,
            _ => {
                let expected = if negative { "number" } else { "literal" };
                return Err(self.error_expected_code(ErrorCode::ExpectedPattern, expected));
            }
        };
        self.advance();
        let span = if negative {
            minus_span.merge(token.span)
        } else {
            token.span
        };
        Ok((literal, span))
    }
}
