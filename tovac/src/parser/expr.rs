//! Expression parsing by precedence climbing.
//!
//! Each level parses the next tighter level first, then loops over its own
//! operators. From loosest to tightest:
//!
//! | level | operators |
//! |-------|-----------|
//! | pipe | `\|>` |
//! | coalesce | `??` |
//! | or | `or` `\|\|` |
//! | and | `and` `&&` |
//! | not | prefix `not` |
//! | comparison | `==` `!=` `<` `<=` `>` `>=` (chained) |
//! | membership | `in` `not in` `is` `is not` |
//! | range | `..` `..=` |
//! | additive | `+` `-` `++` |
//! | multiplicative | `*` `/` `%` |
//! | power | `**` (right-associative) |
//! | unary | `-` `!` `await` `yield` `...` |
//! | postfix | `.` `?.` `[]` `()` `?` |

use super::{PResult, Parser};
use crate::ast::*;
use crate::diagnostics::ErrorCode;
use crate::lexer::TokenKind;

/// Binary operator levels handled by the generic loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Additive,
    Multiplicative,
}

/// Map a token to the binary operator it denotes at `level`.
fn binary_op(kind: TokenKind, level: Precedence) -> Option<BinOp> {
    match (level, kind) {
        (Precedence::Additive, TokenKind::Plus) => Some(BinOp::Add),
        (Precedence::Additive, TokenKind::Minus) => Some(BinOp::Sub),
        (Precedence::Additive, TokenKind::PlusPlus) => Some(BinOp::Concat),
        (Precedence::Multiplicative, TokenKind::Star) => Some(BinOp::Mul),
        (Precedence::Multiplicative, TokenKind::Slash) => Some(BinOp::Div),
        (Precedence::Multiplicative, TokenKind::Percent) => Some(BinOp::Mod),
        _ => None,
    }
}

fn comparison_op(kind: TokenKind) -> Option<BinOp> {
    match kind {
        TokenKind::EqEq => Some(BinOp::Eq),
        TokenKind::NotEq => Some(BinOp::NotEq),
        TokenKind::Lt => Some(BinOp::Lt),
        TokenKind::LtEq => Some(BinOp::LtEq),
        TokenKind::Gt => Some(BinOp::Gt),
        TokenKind::GtEq => Some(BinOp::GtEq),
        _ => None,
    }
}

/// Whether a token of this kind can begin an expression.
pub(super) fn can_start_expression(kind: TokenKind) -> bool {
    Parser::is_contextual_keyword(kind)
        || matches!(
            kind,
            TokenKind::Ident
                | TokenKind::IntLit
                | TokenKind::FloatLit
                | TokenKind::StringLit
                | TokenKind::RawStringLit
                | TokenKind::TemplateString
                | TokenKind::Regex
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Nil
                | TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::LBrace
                | TokenKind::Minus
                | TokenKind::Bang
                | TokenKind::Not
                | TokenKind::Await
                | TokenKind::Yield
                | TokenKind::DotDotDot
                | TokenKind::Fn
                | TokenKind::Async
                | TokenKind::Match
                | TokenKind::If
        )
}

impl Parser {
    /// Parse a full expression.
    pub fn parse_expression(&mut self) -> PResult<Expr> {
        self.nested(|p| p.parse_pipe())
    }

    /// Parse an expression that a `=>` follows (match guards, select
    /// channels).
    pub fn parse_expression_before_arrow(&mut self) -> PResult<Expr> {
        let saved = std::mem::replace(&mut self.no_arrow_lambda, true);
        let result = self.parse_expression();
        self.no_arrow_lambda = saved;
        result
    }

    fn parse_pipe(&mut self) -> PResult<Expr> {
        let mut left = self.parse_coalesce()?;
        while self.eat(TokenKind::PipeGt) {
            let right = if self.check(TokenKind::Dot) {
                self.parse_pipe_method()?
            } else {
                self.parse_coalesce()?
            };
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Pipe {
                    left: left.boxed(),
                    right: right.boxed(),
                },
                span,
            );
        }
        Ok(left)
    }

    /// `|> .method(args)`: a call on a placeholder receiver.
    fn parse_pipe_method(&mut self) -> PResult<Expr> {
        let dot = self.expect(TokenKind::Dot)?;
        let property = self.expect_member_name()?;
        let receiver = Expr::new(ExprKind::Placeholder, dot.span);
        let member_span = dot.span.merge(property.span);
        let member = Expr::new(
            ExprKind::Member {
                object: receiver.boxed(),
                property,
                optional: false,
            },
            member_span,
        );
        self.expect(TokenKind::LParen)?;
        let args = self.parse_args()?;
        let close = self.expect(TokenKind::RParen)?;
        Ok(Expr::new(
            ExprKind::Call {
                callee: member.boxed(),
                args,
            },
            member_span.merge(close.span),
        ))
    }

    fn parse_coalesce(&mut self) -> PResult<Expr> {
        let mut left = self.parse_or()?;
        while self.eat(TokenKind::QuestionQuestion) {
            let right = self.parse_or()?;
            left = logical(LogicalOp::Coalesce, left, right);
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> PResult<Expr> {
        let mut left = self.parse_and()?;
        while self.match_kind(&[TokenKind::Or, TokenKind::OrOr]).is_some() {
            let right = self.parse_and()?;
            left = logical(LogicalOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> PResult<Expr> {
        let mut left = self.parse_not()?;
        while self.match_kind(&[TokenKind::And, TokenKind::AndAnd]).is_some() {
            let right = self.parse_not()?;
            left = logical(LogicalOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> PResult<Expr> {
        if self.check(TokenKind::Not) {
            let not = self.advance();
            let operand = self.nested(|p| p.parse_not())?;
            let span = not.span.merge(operand.span);
            return Ok(Expr::new(
                ExprKind::Unary {
                    op: UnaryOp::Not,
                    operand: operand.boxed(),
                },
                span,
            ));
        }
        self.parse_comparison()
    }

    /// A run of two or more comparisons becomes one `Chain` node.
    fn parse_comparison(&mut self) -> PResult<Expr> {
        let first = self.parse_membership()?;
        let mut operands = vec![first];
        let mut operators = Vec::new();
        while let Some(op) = comparison_op(self.current().kind) {
            self.advance();
            operators.push(op);
            operands.push(self.parse_membership()?);
        }

        match operators.len() {
            0 => Ok(operands.remove(0)),
            1 => {
                let right = operands.remove(1);
                let left = operands.remove(0);
                let span = left.span.merge(right.span);
                Ok(Expr::new(
                    ExprKind::Binary {
                        op: operators[0],
                        left: left.boxed(),
                        right: right.boxed(),
                    },
                    span,
                ))
            }
            _ => {
                let span = operands[0].span.merge(operands[operands.len() - 1].span);
                Ok(Expr::new(ExprKind::Chain { operands, operators }, span))
            }
        }
    }

    fn parse_membership(&mut self) -> PResult<Expr> {
        let mut left = self.parse_range()?;
        loop {
            if self.eat(TokenKind::In) {
                left = self.finish_membership(left, false)?;
            } else if self.check(TokenKind::Not) && self.peek(1).kind == TokenKind::In {
                self.advance();
                self.advance();
                left = self.finish_membership(left, true)?;
            } else if self.eat(TokenKind::Is) {
                let negated = self.eat(TokenKind::Not);
                let ty = self.parse_type()?;
                let span = left.span.merge(ty.span);
                left = Expr::new(
                    ExprKind::TypeTest {
                        value: left.boxed(),
                        ty,
                        negated,
                    },
                    span,
                );
            } else {
                return Ok(left);
            }
        }
    }

    fn finish_membership(&mut self, value: Expr, negated: bool) -> PResult<Expr> {
        let collection = self.parse_range()?;
        let span = value.span.merge(collection.span);
        Ok(Expr::new(
            ExprKind::Membership {
                value: value.boxed(),
                collection: collection.boxed(),
                negated,
            },
            span,
        ))
    }

    fn parse_range(&mut self) -> PResult<Expr> {
        let start = self.parse_binary(Precedence::Additive)?;
        if let Some(op) = self.match_kind(&[TokenKind::DotDot, TokenKind::DotDotEq]) {
            let end = self.parse_binary(Precedence::Additive)?;
            let span = start.span.merge(end.span);
            return Ok(Expr::new(
                ExprKind::Range {
                    start: start.boxed(),
                    end: end.boxed(),
                    inclusive: op.kind == TokenKind::DotDotEq,
                },
                span,
            ));
        }
        Ok(start)
    }

    /// Left-associative binary levels.
    fn parse_binary(&mut self, level: Precedence) -> PResult<Expr> {
        let mut left = self.parse_tighter(level)?;
        while let Some(op) = binary_op(self.current().kind, level) {
            self.advance();
            let right = self.parse_tighter(level)?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_tighter(&mut self, level: Precedence) -> PResult<Expr> {
        match level {
            Precedence::Additive => self.parse_binary(Precedence::Multiplicative),
            Precedence::Multiplicative => self.parse_power(),
        }
    }

    /// `**` is right-associative: `2 ** 3 ** 2` is `2 ** (3 ** 2)`.
    fn parse_power(&mut self) -> PResult<Expr> {
        let base = self.parse_unary()?;
        if self.eat(TokenKind::StarStar) {
            let exponent = self.nested(|p| p.parse_power())?;
            return Ok(binary(BinOp::Pow, base, exponent));
        }
        Ok(base)
    }

    /// Prefix operators: `-`, `!`, `await`, `yield [from]`, `...`.
    pub fn parse_unary(&mut self) -> PResult<Expr> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Minus | TokenKind::Bang => {
                self.advance();
                let operand = self.nested(|p| p.parse_unary())?;
                let op = if token.kind == TokenKind::Minus {
                    UnaryOp::Neg
                } else {
                    UnaryOp::Not
                };
                let span = token.span.merge(operand.span);
                Ok(Expr::new(
                    ExprKind::Unary {
                        op,
                        operand: operand.boxed(),
                    },
                    span,
                ))
            }
            TokenKind::Await => {
                self.advance();
                let operand = self.nested(|p| p.parse_unary())?;
                let span = token.span.merge(operand.span);
                Ok(Expr::new(ExprKind::Await(operand.boxed()), span))
            }
            TokenKind::DotDotDot => {
                self.advance();
                let operand = self.nested(|p| p.parse_unary())?;
                let span = token.span.merge(operand.span);
                Ok(Expr::new(ExprKind::Spread(operand.boxed()), span))
            }
            TokenKind::Yield => {
                self.advance();
                let delegate = self.eat(TokenKind::From);
                let value = if self.on_same_line() && can_start_expression(self.current().kind) {
                    Some(self.parse_expression()?.boxed())
                } else if delegate {
                    return Err(self.error_expected_code(
                        ErrorCode::ExpectedExpression,
                        "expression after `yield from`",
                    ));
                } else {
                    None
                };
                let span = value
                    .as_ref()
                    .map_or(token.span, |v| token.span.merge(v.span));
                Ok(Expr::new(ExprKind::Yield { value, delegate }, span))
            }
            _ => self.nested(|p| p.parse_postfix()),
        }
    }

    /// Member access, optional chaining, indexing/slicing, calls and `?`.
    ///
    /// `(`, `[` and `?` only continue the chain when they sit on the same
    /// line as the token before them.
    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.current().kind {
                TokenKind::Dot => {
                    self.advance();
                    let property = self.expect_member_name()?;
                    let span = expr.span.merge(property.span);
                    expr = Expr::new(
                        ExprKind::Member {
                            object: expr.boxed(),
                            property,
                            optional: false,
                        },
                        span,
                    );
                }
                TokenKind::QuestionDot => {
                    self.advance();
                    if self.eat(TokenKind::LBracket) {
                        let index = self.parse_expression()?;
                        let close = self.expect(TokenKind::RBracket)?;
                        let span = expr.span.merge(close.span);
                        expr = Expr::new(
                            ExprKind::Index {
                                object: expr.boxed(),
                                index: index.boxed(),
                                optional: true,
                            },
                            span,
                        );
                    } else {
                        let property = self.expect_member_name()?;
                        let span = expr.span.merge(property.span);
                        expr = Expr::new(
                            ExprKind::Member {
                                object: expr.boxed(),
                                property,
                                optional: true,
                            },
                            span,
                        );
                    }
                }
                TokenKind::LBracket if self.on_same_line() => {
                    self.advance();
                    expr = self.parse_index_or_slice(expr)?;
                }
                TokenKind::LParen if self.on_same_line() => {
                    self.advance();
                    let args = self.parse_args()?;
                    let close = self.expect(TokenKind::RParen)?;
                    let span = expr.span.merge(close.span);
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: expr.boxed(),
                            args,
                        },
                        span,
                    );
                }
                TokenKind::Question if self.on_same_line() => {
                    let question = self.advance();
                    let span = expr.span.merge(question.span);
                    expr = Expr::new(ExprKind::Propagate(expr.boxed()), span);
                }
                _ => return Ok(expr),
            }
        }
    }

    /// After `[`: `a[i]` or `a[start:end:step]` with any bound omitted.
    fn parse_index_or_slice(&mut self, object: Expr) -> PResult<Expr> {
        let start = if self.check(TokenKind::Colon) {
            None
        } else {
            Some(self.parse_expression()?)
        };

        if !self.eat(TokenKind::Colon) {
            let close = self.expect(TokenKind::RBracket)?;
            let span = object.span.merge(close.span);
            let index = match start {
                Some(index) => index,
                None => {
                    return Err(self.error_expected_code(ErrorCode::ExpectedExpression, "index"))
                }
            };
            return Ok(Expr::new(
                ExprKind::Index {
                    object: object.boxed(),
                    index: index.boxed(),
                    optional: false,
                },
                span,
            ));
        }

        let end = if self.check(TokenKind::Colon) || self.check(TokenKind::RBracket) {
            None
        } else {
            Some(self.parse_expression()?.boxed())
        };
        let step = if self.eat(TokenKind::Colon) && !self.check(TokenKind::RBracket) {
            Some(self.parse_expression()?.boxed())
        } else {
            None
        };
        let close = self.expect(TokenKind::RBracket)?;
        let span = object.span.merge(close.span);
        Ok(Expr::new(
            ExprKind::Slice {
                object: object.boxed(),
                start: start.map(Expr::boxed),
                end,
                step,
            },
            span,
        ))
    }

    /// Call arguments after `(`, up to (not including) `)`.
    ///
    /// `name: value` is a named argument.
    pub fn parse_args(&mut self) -> PResult<Vec<Arg>> {
        let saved = std::mem::replace(&mut self.no_arrow_lambda, false);
        let result = self.parse_arg_list();
        self.no_arrow_lambda = saved;
        result
    }

    fn parse_arg_list(&mut self) -> PResult<Vec<Arg>> {
        let mut args = Vec::new();
        while !self.check(TokenKind::RParen) && !self.is_at_end() {
            if self.check_ident() && self.peek(1).kind == TokenKind::Colon {
                let name = self.expect_ident()?;
                self.advance();
                let value = self.parse_expression()?;
                args.push(Arg::Named { name, value });
            } else {
                args.push(Arg::Positional(self.parse_expression()?));
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        Ok(args)
    }

    /// A property name after `.`: any identifier or keyword.
    pub fn expect_member_name(&mut self) -> PResult<Ident> {
        let token = self.current();
        if token.kind == TokenKind::Ident
            || token.kind == TokenKind::IntLit
            || token.kind.as_keyword_str().is_some()
        {
            let token = self.advance();
            return Ok(Ident::new(token.value, token.span));
        }
        Err(self.error_expected_code(ErrorCode::ExpectedIdentifier, "property name"))
    }
}

fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
    let span = left.span.merge(right.span);
    Expr::new(
        ExprKind::Binary {
            op,
            left: left.boxed(),
            right: right.boxed(),
        },
        span,
    )
}

fn logical(op: LogicalOp, left: Expr, right: Expr) -> Expr {
    let span = left.span.merge(right.span);
    Expr::new(
        ExprKind::Logical {
            op,
            left: left.boxed(),
            right: right.boxed(),
        },
        span,
    )
}
