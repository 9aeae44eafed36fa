//! Statement parsing.
//!
//! Declarations live in `item`; this module covers bindings, control flow,
//! blocks (with their error-recovery loop) and the expression/assignment
//! boundary.

use std::sync::Arc;

use super::{PResult, Parser};
use crate::ast::*;
use crate::diagnostics::ErrorCode;
use crate::lexer::TokenKind;
use crate::span::Span;

impl Parser {
    /// Parse a statement, followed by an optional `;`.
    pub fn parse_statement(&mut self) -> PResult<Stmt> {
        let registry = Arc::clone(&self.registry);
        let stmt = if let Some((dialect, entry)) = registry.match_statement(self, false) {
            self.ensure_installed(dialect);
            entry(self)?
        } else {
            self.nested(|p| p.parse_statement_kind())?
        };
        self.eat(TokenKind::Semi);
        Ok(stmt)
    }

    fn parse_statement_kind(&mut self) -> PResult<Stmt> {
        let kind = self.current().kind;
        let next = self.peek(1).kind;
        let start = self.current().span;
        match kind {
            TokenKind::Fn if next == TokenKind::Ident || Self::is_contextual_keyword(next) => {
                let function = self.parse_function_decl(Vec::new(), false)?;
                Ok(function_stmt(function, start))
            }
            TokenKind::Async if next == TokenKind::Fn && self.peek(2).kind != TokenKind::LParen => {
                let function = self.parse_function_decl(Vec::new(), false)?;
                Ok(function_stmt(function, start))
            }
            TokenKind::At => self.parse_decorated_function(),
            TokenKind::Pub => self.parse_pub_item(),
            TokenKind::Type => self.parse_type_decl(false),
            TokenKind::Interface | TokenKind::Trait => self.parse_interface_decl(false),
            TokenKind::Impl => self.parse_impl(),
            TokenKind::Extern => self.parse_extern(),
            TokenKind::Import => self.parse_import(),

            TokenKind::Var => self.parse_var(),
            TokenKind::Let => self.parse_let(),
            TokenKind::Mut => {
                let span = self.current().span;
                Err(self
                    .error_at(ErrorCode::MutNotSupported, "`mut` is not supported", span)
                    .with_hint("declare mutable bindings with `var`"))
            }

            TokenKind::If => self.parse_if_stmt(),
            TokenKind::For => self.parse_for(None),
            TokenKind::While => self.parse_while(None),
            TokenKind::Loop => self.parse_loop(None),
            TokenKind::Try => self.parse_try(),
            TokenKind::Guard => self.parse_guard(),
            TokenKind::Break | TokenKind::Continue => self.parse_break_continue(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Defer => {
                let start = self.advance().span;
                let body = self.parse_body()?;
                let span = start.merge(body.span());
                Ok(Stmt::new(StmtKind::Defer(body), span))
            }
            TokenKind::With => self.parse_with(),

            TokenKind::Ident
                if next == TokenKind::Colon
                    && matches!(
                        self.peek(2).kind,
                        TokenKind::For | TokenKind::While | TokenKind::Loop
                    ) =>
            {
                self.parse_labeled_loop()
            }

            _ => self.parse_expression_statement(),
        }
    }

    // ============================================================
    // Blocks
    // ============================================================

    /// `{ stmt* }`
    pub fn parse_block(&mut self) -> PResult<Block> {
        self.nested(|p| {
            let (stmts, span) = p.parse_stmt_list(None)?;
            Ok(Block { stmts, span })
        })
    }

    /// The `{ ... }` body of a dialect block; the dialect's contextual body
    /// rules for `context` are consulted before ordinary statements.
    pub fn parse_dialect_body(&mut self, context: &str) -> PResult<(Vec<Stmt>, Span)> {
        self.nested(|p| p.parse_stmt_list(Some(context)))
    }

    /// Statements between braces. A failing statement is recorded and the
    /// loop resynchronizes, so one bad line does not lose the block.
    fn parse_stmt_list(&mut self, context: Option<&str>) -> PResult<(Vec<Stmt>, Span)> {
        let open = self.expect(TokenKind::LBrace)?;
        let mut stmts = Vec::new();

        while !self.check(TokenKind::RBrace) && !self.is_at_end() && !self.truncated {
            let before = self.pos;
            let rule = context.and_then(|ctx| self.grammar.body_rule(ctx, self));
            let result = match rule {
                Some(entry) => entry(self),
                None => self.parse_statement(),
            };
            match result {
                Ok(stmt) => {
                    self.eat(TokenKind::Semi);
                    stmts.push(stmt);
                }
                Err(err) => {
                    self.record(err);
                    self.synchronize(before);
                }
            }
        }

        let close = self.expect(TokenKind::RBrace)?;
        Ok((stmts, open.span.merge(close.span)))
    }

    /// Optional name after a block keyword: `server "api" { }` or
    /// `store Cart { }`.
    pub fn parse_block_name(&mut self) -> Option<String> {
        let token = self.current();
        let named = match token.kind {
            TokenKind::StringLit | TokenKind::RawStringLit => true,
            _ => self.check_ident() && self.peek(1).kind == TokenKind::LBrace,
        };
        if named {
            Some(self.advance().value)
        } else {
            None
        }
    }

    /// `keyword ["name"] { stmt* }` for a dialect defined outside this crate.
    pub fn parse_extension_block(&mut self, dialect: &str) -> PResult<Stmt> {
        let start = self.advance().span;
        let name = self.parse_block_name();
        let (body, body_span) = self.parse_dialect_body(dialect)?;
        Ok(Stmt::dialect(
            DialectNode::Extension {
                dialect: dialect.to_string(),
                name,
                body,
            },
            start.merge(body_span),
        ))
    }

    // ============================================================
    // Bindings
    // ============================================================

    /// `var a, b = 1, 2`
    fn parse_var(&mut self) -> PResult<Stmt> {
        let start = self.expect(TokenKind::Var)?.span;
        if self.check(TokenKind::Mut) {
            let span = self.current().span;
            return Err(self
                .error_at(ErrorCode::MutNotSupported, "`var mut` is not supported", span)
                .with_hint("`var` bindings are already mutable; drop `mut`"));
        }

        let mut targets = vec![self.expect_ident()?];
        while self.eat(TokenKind::Comma) {
            targets.push(self.expect_ident()?);
        }
        self.expect(TokenKind::Eq)?;
        let values = self.parse_expression_list()?;

        let span = start.merge(values[values.len() - 1].span);
        Ok(Stmt::new(StmtKind::Var { targets, values }, span))
    }

    /// `let <destructure pattern> = value`
    fn parse_let(&mut self) -> PResult<Stmt> {
        let start = self.expect(TokenKind::Let)?.span;

        if self.check(TokenKind::Mut) {
            let span = self.current().span;
            return Err(self
                .error_at(ErrorCode::MutNotSupported, "`let mut` is not supported", span)
                .with_hint("declare mutable bindings with `var`"));
        }
        if self.check_ident() {
            let token = self.current().clone();
            return Err(self
                .error_at(
                    ErrorCode::LetRequiresPattern,
                    format!("`let` requires a destructuring pattern, found `{}`", token.value),
                    token.span,
                )
                .with_hint(format!(
                    "write `{0} = ...` for an immutable binding or `var {0} = ...` for a mutable one",
                    token.value
                )));
        }

        let pattern = self.parse_destructure_pattern()?;
        self.expect(TokenKind::Eq)?;
        let value = self.parse_expression()?;
        let span = start.merge(value.span);
        Ok(Stmt::new(StmtKind::Let { pattern, value }, span))
    }

    // ============================================================
    // Control flow
    // ============================================================

    /// `if c { } elif d { } else if e { } else { }`, starting at `if`.
    pub(super) fn parse_if_chain(&mut self) -> PResult<(Vec<IfBranch>, Option<Block>)> {
        self.expect(TokenKind::If)?;
        let mut branches = vec![self.parse_if_branch()?];

        loop {
            if self.eat(TokenKind::Elif) {
                branches.push(self.parse_if_branch()?);
                continue;
            }
            if self.check(TokenKind::Else) {
                self.advance();
                if self.eat(TokenKind::If) {
                    branches.push(self.parse_if_branch()?);
                    continue;
                }
                let else_body = self.parse_block()?;
                return Ok((branches, Some(else_body)));
            }
            return Ok((branches, None));
        }
    }

    fn parse_if_branch(&mut self) -> PResult<IfBranch> {
        let cond = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(IfBranch { cond, body })
    }

    fn parse_if_stmt(&mut self) -> PResult<Stmt> {
        let start = self.current().span;
        let (branches, else_body) = self.parse_if_chain()?;
        let end = match &else_body {
            Some(block) => block.span,
            None => branches[branches.len() - 1].body.span,
        };
        Ok(Stmt::new(StmtKind::If { branches, else_body }, start.merge(end)))
    }

    /// `for x in xs [if cond] { } [else { }]`
    fn parse_for(&mut self, label: Option<Ident>) -> PResult<Stmt> {
        let start = self.expect(TokenKind::For)?.span;
        let binding = self.parse_for_binding()?;
        self.expect(TokenKind::In)?;
        let iter = self.parse_expression()?;
        let guard = if self.eat(TokenKind::If) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        let body = self.parse_block()?;
        let else_body = if self.eat(TokenKind::Else) {
            Some(self.parse_block()?)
        } else {
            None
        };

        let start = label.as_ref().map_or(start, |l| l.span);
        let end = else_body.as_ref().map_or(body.span, |b| b.span);
        Ok(Stmt::new(
            StmtKind::For {
                label,
                binding,
                iter,
                guard,
                body,
                else_body,
            },
            start.merge(end),
        ))
    }

    fn parse_while(&mut self, label: Option<Ident>) -> PResult<Stmt> {
        let start = self.expect(TokenKind::While)?.span;
        let cond = self.parse_expression()?;
        let body = self.parse_block()?;
        let start = label.as_ref().map_or(start, |l| l.span);
        let span = start.merge(body.span);
        Ok(Stmt::new(StmtKind::While { label, cond, body }, span))
    }

    fn parse_loop(&mut self, label: Option<Ident>) -> PResult<Stmt> {
        let start = self.expect(TokenKind::Loop)?.span;
        let body = self.parse_block()?;
        let start = label.as_ref().map_or(start, |l| l.span);
        let span = start.merge(body.span);
        Ok(Stmt::new(StmtKind::Loop { label, body }, span))
    }

    /// `outer: for ...`; the label and the loop share a line.
    fn parse_labeled_loop(&mut self) -> PResult<Stmt> {
        let label = self.expect_ident()?;
        self.expect(TokenKind::Colon)?;
        if !self.on_same_line() {
            return Err(self.error_expected("loop on the same line as its label"));
        }
        match self.current().kind {
            TokenKind::For => self.parse_for(Some(label)),
            TokenKind::While => self.parse_while(Some(label)),
            _ => self.parse_loop(Some(label)),
        }
    }

    /// `try { } catch [name] { } finally { }`; at least one handler.
    fn parse_try(&mut self) -> PResult<Stmt> {
        let start = self.expect(TokenKind::Try)?.span;
        let body = self.parse_block()?;
        let mut end = body.span;

        let catch = if self.eat(TokenKind::Catch) {
            let parenthesized = self.eat(TokenKind::LParen);
            let name = if self.check_ident() {
                Some(self.expect_ident()?)
            } else {
                None
            };
            if parenthesized {
                self.expect(TokenKind::RParen)?;
            }
            let body = self.parse_block()?;
            end = body.span;
            Some(CatchClause { name, body })
        } else {
            None
        };

        let finally = if self.eat(TokenKind::Finally) {
            let block = self.parse_block()?;
            end = block.span;
            Some(block)
        } else {
            None
        };

        if catch.is_none() && finally.is_none() {
            return Err(self.error_expected_one_of(&["`catch`", "`finally`"]));
        }

        Ok(Stmt::new(
            StmtKind::Try {
                body,
                catch,
                finally,
            },
            start.merge(end),
        ))
    }

    /// `guard cond else { }`
    fn parse_guard(&mut self) -> PResult<Stmt> {
        let start = self.expect(TokenKind::Guard)?.span;
        let cond = self.parse_expression()?;
        self.expect(TokenKind::Else)?;
        let else_body = self.parse_block()?;
        let span = start.merge(else_body.span);
        Ok(Stmt::new(StmtKind::Guard { cond, else_body }, span))
    }

    /// `break [label]`, `continue [label]`; a label on the next line is a
    /// separate statement.
    fn parse_break_continue(&mut self) -> PResult<Stmt> {
        let keyword = self.advance();
        let label = if self.check_ident() && self.on_same_line() {
            Some(self.expect_ident()?)
        } else {
            None
        };
        let span = label.as_ref().map_or(keyword.span, |l| keyword.span.merge(l.span));
        let kind = if keyword.kind == TokenKind::Break {
            StmtKind::Break { label }
        } else {
            StmtKind::Continue { label }
        };
        Ok(Stmt::new(kind, span))
    }

    /// `return [value]`; the value must start on the same line.
    fn parse_return(&mut self) -> PResult<Stmt> {
        let start = self.expect(TokenKind::Return)?.span;
        let has_value = self.on_same_line()
            && !self.is_at_end()
            && !self.check(TokenKind::RBrace)
            && !self.check(TokenKind::Semi);
        let value = if has_value {
            Some(self.parse_expression()?)
        } else {
            None
        };
        let span = value.as_ref().map_or(start, |v| start.merge(v.span));
        Ok(Stmt::new(StmtKind::Return(value), span))
    }

    /// `with resource [as name] { }`
    fn parse_with(&mut self) -> PResult<Stmt> {
        let start = self.expect(TokenKind::With)?.span;
        let resource = self.parse_expression()?;
        let alias = if self.eat(TokenKind::As) {
            Some(self.expect_ident()?)
        } else {
            None
        };
        let body = self.parse_block()?;
        let span = start.merge(body.span);
        Ok(Stmt::new(
            StmtKind::With {
                resource,
                alias,
                body,
            },
            span,
        ))
    }

    // ============================================================
    // Expressions and assignment
    // ============================================================

    /// An expression statement, or an assignment decided by what follows
    /// the first expression: `=`, `,` (multiple targets) or a compound
    /// operator.
    fn parse_expression_statement(&mut self) -> PResult<Stmt> {
        let first = self.parse_expression()?;
        let start = first.span;

        if self.check(TokenKind::Comma) {
            let mut targets = vec![first];
            while self.eat(TokenKind::Comma) {
                targets.push(self.parse_expression()?);
            }
            self.expect(TokenKind::Eq)?;
            for target in &targets {
                self.check_assign_target(target)?;
            }
            let values = self.parse_expression_list()?;
            let span = start.merge(values[values.len() - 1].span);
            return Ok(Stmt::new(StmtKind::Assign { targets, values }, span));
        }

        if self.eat(TokenKind::Eq) {
            if matches!(
                first.kind,
                ExprKind::Array(_) | ExprKind::Object(_) | ExprKind::Tuple(_)
            ) {
                let pattern = self.expr_to_pattern(first)?;
                let value = self.parse_expression()?;
                let span = start.merge(value.span);
                return Ok(Stmt::new(StmtKind::Let { pattern, value }, span));
            }
            self.check_assign_target(&first)?;
            let values = self.parse_expression_list()?;
            let span = start.merge(values[values.len() - 1].span);
            return Ok(Stmt::new(
                StmtKind::Assign {
                    targets: vec![first],
                    values,
                },
                span,
            ));
        }

        if let Some(op) = compound_op(self.current().kind) {
            self.advance();
            self.check_assign_target(&first)?;
            let value = self.parse_expression()?;
            let span = start.merge(value.span);
            return Ok(Stmt::new(
                StmtKind::CompoundAssign {
                    target: first,
                    op,
                    value,
                },
                span,
            ));
        }

        Ok(Stmt::new(StmtKind::Expr(first), start))
    }

    /// One or more comma-separated expressions.
    fn parse_expression_list(&mut self) -> PResult<Vec<Expr>> {
        let mut values = vec![self.parse_expression()?];
        while self.eat(TokenKind::Comma) {
            values.push(self.parse_expression()?);
        }
        Ok(values)
    }

    fn check_assign_target(&self, target: &Expr) -> PResult<()> {
        match target.kind {
            ExprKind::Ident(_) | ExprKind::Member { .. } | ExprKind::Index { .. } => Ok(()),
            _ => Err(self.error_at(
                ErrorCode::InvalidAssignmentTarget,
                "invalid assignment target",
                target.span,
            )),
        }
    }

    /// Reinterpret an array/object literal on the left of `=` as a
    /// destructure pattern.
    fn expr_to_pattern(&self, expr: Expr) -> PResult<DestructurePattern> {
        let span = expr.span;
        let kind = match expr.kind {
            ExprKind::Ident(name) => DestructureKind::Name(name),
            ExprKind::Tuple(elements) => DestructureKind::Tuple(
                elements
                    .into_iter()
                    .map(|e| self.expr_to_pattern(e))
                    .collect::<PResult<_>>()?,
            ),
            ExprKind::Array(elements) => {
                let mut patterns = Vec::new();
                let mut rest = None;
                let count = elements.len();
                for (i, element) in elements.into_iter().enumerate() {
                    if let ExprKind::Spread(inner) = element.kind {
                        if i + 1 != count {
                            return Err(self.error_at(
                                ErrorCode::RestNotLast,
                                "a rest element must be the last element of a pattern",
                                element.span,
                            ));
                        }
                        rest = Some(self.rest_name(*inner)?);
                    } else {
                        patterns.push(self.expr_to_pattern(element)?);
                    }
                }
                DestructureKind::Array {
                    elements: patterns,
                    rest,
                }
            }
            ExprKind::Object(entries) => {
                let mut pattern_entries = Vec::new();
                let mut rest = None;
                let count = entries.len();
                for (i, entry) in entries.into_iter().enumerate() {
                    match entry {
                        ObjectEntry::Shorthand(name) => pattern_entries.push(ObjectPatternEntry {
                            key: name.node.clone(),
                            value: DestructurePattern::name(name.node, name.span),
                            default: None,
                            span: name.span,
                        }),
                        ObjectEntry::KeyValue {
                            key: ObjectKey::Name(key) | ObjectKey::String(key),
                            value,
                        } => {
                            let value = self.expr_to_pattern(value)?;
                            pattern_entries.push(ObjectPatternEntry {
                                key,
                                span: value.span,
                                value,
                                default: None,
                            });
                        }
                        ObjectEntry::Spread(inner) if i + 1 == count => {
                            rest = Some(self.rest_name(inner)?);
                        }
                        ObjectEntry::Spread(inner) => {
                            return Err(self.error_at(
                                ErrorCode::RestNotLast,
                                "a rest element must be the last element of a pattern",
                                inner.span,
                            ));
                        }
                        ObjectEntry::KeyValue {
                            key: ObjectKey::Computed(key),
                            ..
                        } => {
                            return Err(self.error_at(
                                ErrorCode::InvalidAssignmentTarget,
                                "computed keys cannot be destructured",
                                key.span,
                            ));
                        }
                    }
                }
                DestructureKind::Object {
                    entries: pattern_entries,
                    rest,
                }
            }
            _ => {
                return Err(self.error_at(
                    ErrorCode::InvalidAssignmentTarget,
                    "invalid destructuring target",
                    span,
                ))
            }
        };
        Ok(DestructurePattern { kind, span })
    }

    fn rest_name(&self, expr: Expr) -> PResult<Ident> {
        match expr.kind {
            ExprKind::Ident(name) => Ok(Ident::new(name, expr.span)),
            _ => Err(self.error_at(
                ErrorCode::InvalidAssignmentTarget,
                "a rest element must be a name",
                expr.span,
            )),
        }
    }
}

fn compound_op(kind: TokenKind) -> Option<AssignOp> {
    let op = match kind {
        TokenKind::PlusEq => AssignOp::Add,
        TokenKind::MinusEq => AssignOp::Sub,
        TokenKind::StarEq => AssignOp::Mul,
        TokenKind::SlashEq => AssignOp::Div,
        TokenKind::PercentEq => AssignOp::Mod,
        TokenKind::QuestionQuestionEq => AssignOp::Coalesce,
        _ => return None,
    };
    Some(op)
}

pub(super) fn function_stmt(function: FunctionDecl, start: Span) -> Stmt {
    let span = start.merge(function.body.span);
    Stmt::new(StmtKind::Function(Box::new(function)), span)
}
