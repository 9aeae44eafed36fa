//! Type parsing.

use super::{PResult, Parser};
use crate::ast::*;
use crate::diagnostics::ErrorCode;
use crate::lexer::TokenKind;

impl Parser {
    /// Parse a type annotation.
    ///
    /// ```text
    /// Type := Name ('<' Type (',' Type)* '>')?
    ///       | '[' Type ']'
    ///       | '(' Types? ')' ('->' Type)?
    ///       | 'fn' '(' Types? ')' '->' Type
    /// ```
    pub fn parse_type(&mut self) -> PResult<TypeExpr> {
        self.nested(Self::parse_type_inner)
    }

    fn parse_type_inner(&mut self) -> PResult<TypeExpr> {
        let start = self.current().span;

        match self.current().kind {
            TokenKind::LBracket => {
                self.advance();
                let element = self.parse_type()?;
                let close = self.expect(TokenKind::RBracket)?;
                Ok(TypeExpr {
                    kind: TypeKind::Array(Box::new(element)),
                    span: start.merge(close.span),
                })
            }
            TokenKind::LParen => {
                self.advance();
                let mut types = self.parse_type_list(TokenKind::RParen)?;
                let close = self.expect(TokenKind::RParen)?;

                if self.eat(TokenKind::Arrow) {
                    let ret = self.parse_type()?;
                    let span = start.merge(ret.span);
                    return Ok(TypeExpr {
                        kind: TypeKind::Function {
                            params: types,
                            ret: Box::new(ret),
                        },
                        span,
                    });
                }

                // (T) is just T
                if types.len() == 1 {
                    if let Some(inner) = types.pop() {
                        return Ok(inner);
                    }
                }
                Ok(TypeExpr {
                    kind: TypeKind::Tuple(types),
                    span: start.merge(close.span),
                })
            }
            TokenKind::Fn => {
                self.advance();
                self.expect(TokenKind::LParen)?;
                let params = self.parse_type_list(TokenKind::RParen)?;
                self.expect(TokenKind::RParen)?;
                self.expect(TokenKind::Arrow)?;
                let ret = self.parse_type()?;
                let span = start.merge(ret.span);
                Ok(TypeExpr {
                    kind: TypeKind::Function {
                        params,
                        ret: Box::new(ret),
                    },
                    span,
                })
            }
            TokenKind::Nil => {
                self.advance();
                Ok(TypeExpr {
                    kind: TypeKind::Named {
                        name: "Nil".to_string(),
                        args: Vec::new(),
                    },
                    span: start,
                })
            }
            _ if self.check_ident() => self.parse_named_type(),
            _ => Err(self.error_expected_code(ErrorCode::ExpectedType, "type")),
        }
    }

    /// `Name`, `module.Name`, `Name<A, B>`.
    fn parse_named_type(&mut self) -> PResult<TypeExpr> {
        let first = self.expect_ident()?;
        let mut name = first.node;
        let mut span = first.span;

        while self.check(TokenKind::Dot) && self.peek(1).kind == TokenKind::Ident {
            self.advance();
            let segment = self.expect_ident()?;
            name.push('.');
            name.push_str(&segment.node);
            span = span.merge(segment.span);
        }

        let mut args = Vec::new();
        if self.check(TokenKind::Lt) && self.on_same_line() {
            self.advance();
            args = self.parse_type_list(TokenKind::Gt)?;
            let close = self.expect(TokenKind::Gt)?;
            span = span.merge(close.span);
        }

        Ok(TypeExpr {
            kind: TypeKind::Named { name, args },
            span,
        })
    }

    /// Comma-separated types up to (not including) `closing`.
    fn parse_type_list(&mut self, closing: TokenKind) -> PResult<Vec<TypeExpr>> {
        let mut types = Vec::new();
        while !self.check(closing) && !self.is_at_end() {
            types.push(self.parse_type()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        Ok(types)
    }
}
