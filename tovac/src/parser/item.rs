//! Declaration parsing: functions, types, interfaces and traits, impls,
//! externs and imports.

use super::stmt::function_stmt;
use super::{PResult, Parser};
use crate::ast::*;
use crate::diagnostics::ErrorCode;
use crate::lexer::TokenKind;
use crate::span::Span;

impl Parser {
    // ============================================================
    // Functions
    // ============================================================

    /// `[async] fn name[<T>](params) [-> Type] { body }`
    pub fn parse_function_decl(
        &mut self,
        decorators: Vec<Decorator>,
        is_pub: bool,
    ) -> PResult<FunctionDecl> {
        let is_async = self.eat(TokenKind::Async);
        self.expect(TokenKind::Fn)?;
        let name = self.expect_ident()?;
        let type_params = self.parse_type_params()?;

        self.expect(TokenKind::LParen)?;
        let params = self.parse_params()?;
        self.expect(TokenKind::RParen)?;

        let ret = if self.eat(TokenKind::Arrow) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let body = self.parse_block()?;

        Ok(FunctionDecl {
            name,
            decorators,
            is_pub,
            is_async,
            type_params,
            params,
            ret,
            body,
        })
    }

    /// Function parameters up to (not including) `)`.
    ///
    /// Each is a destructure pattern with an optional type and default.
    pub fn parse_params(&mut self) -> PResult<Vec<Param>> {
        let mut params = Vec::new();

        while !self.check(TokenKind::RParen) && !self.is_at_end() {
            params.push(self.parse_param()?);

            if !self.eat(TokenKind::Comma) {
                break;
            }
        }

        Ok(params)
    }

    fn parse_param(&mut self) -> PResult<Param> {
        let pattern = self.parse_destructure_pattern()?;
        let mut span = pattern.span;

        let ty = if self.eat(TokenKind::Colon) {
            let ty = self.parse_type()?;
            span = span.merge(ty.span);
            Some(ty)
        } else {
            None
        };
        let default = if self.eat(TokenKind::Eq) {
            let value = self.parse_expression()?;
            span = span.merge(value.span);
            Some(value)
        } else {
            None
        };

        Ok(Param {
            pattern,
            ty,
            default,
            span,
        })
    }

    /// `<T, U>` after a declaration name; empty if absent.
    fn parse_type_params(&mut self) -> PResult<Vec<Ident>> {
        let mut params = Vec::new();
        if !self.eat(TokenKind::Lt) {
            return Ok(params);
        }
        while !self.check(TokenKind::Gt) && !self.is_at_end() {
            params.push(self.expect_ident()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Gt)?;
        Ok(params)
    }

    /// `@name` or `@name(args)`.
    fn parse_decorator(&mut self) -> PResult<Decorator> {
        let at = self.expect(TokenKind::At)?;
        let name = self.expect_ident()?;
        let mut span = at.span.merge(name.span);

        let args = if self.check(TokenKind::LParen) && self.on_same_line() {
            self.advance();
            let args = self.parse_args()?;
            let close = self.expect(TokenKind::RParen)?;
            span = span.merge(close.span);
            args
        } else {
            Vec::new()
        };

        Ok(Decorator { name, args, span })
    }

    /// One or more decorators followed by a function.
    pub(super) fn parse_decorated_function(&mut self) -> PResult<Stmt> {
        let start = self.current().span;
        let mut decorators = Vec::new();
        while self.check(TokenKind::At) {
            decorators.push(self.parse_decorator()?);
        }
        let is_pub = self.eat(TokenKind::Pub);
        let function = self.parse_function_decl(decorators, is_pub)?;
        Ok(function_stmt(function, start))
    }

    /// `pub` before a function, type, interface or trait.
    pub(super) fn parse_pub_item(&mut self) -> PResult<Stmt> {
        let start = self.expect(TokenKind::Pub)?.span;

        let mut stmt = match self.current().kind {
            TokenKind::Fn | TokenKind::Async => {
                let function = self.parse_function_decl(Vec::new(), true)?;
                function_stmt(function, start)
            }
            TokenKind::Type => self.parse_type_decl(true)?,
            TokenKind::Interface | TokenKind::Trait => self.parse_interface_decl(true)?,
            _ => {
                return Err(self.error_expected_one_of(&["`fn`", "`type`", "`interface`", "`trait`"]))
            }
        };
        stmt.span = start.merge(stmt.span);
        Ok(stmt)
    }

    // ============================================================
    // Types
    // ============================================================

    /// ```text
    /// type Point { x: Int, y: Int }
    /// type Shape { Circle(r: Float), Empty }
    /// type Color = Red | Green | Blue
    /// type Id = String
    /// type Email = String where it.contains("@")
    /// ```
    ///
    /// Each form may be followed by `derive [Eq, Show]`.
    pub(super) fn parse_type_decl(&mut self, is_pub: bool) -> PResult<Stmt> {
        let start = self.expect(TokenKind::Type)?.span;
        let name = self.expect_ident()?;
        let type_params = self.parse_type_params()?;

        let (body, mut end) = if self.check(TokenKind::LBrace) {
            self.parse_type_body()?
        } else if self.eat(TokenKind::Eq) {
            self.parse_type_rhs()?
        } else {
            return Err(self.error_expected_one_of(&["`{`", "`=`"]));
        };

        let mut derives = Vec::new();
        if self.eat(TokenKind::Derive) {
            self.expect(TokenKind::LBracket)?;
            while !self.check(TokenKind::RBracket) && !self.is_at_end() {
                derives.push(self.expect_ident()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            end = self.expect(TokenKind::RBracket)?.span;
        }

        Ok(Stmt::new(
            StmtKind::Type(Box::new(TypeDecl {
                name,
                is_pub,
                type_params,
                body,
                derives,
            })),
            start.merge(end),
        ))
    }

    /// `{ ... }` holding either record fields or variants, never both.
    fn parse_type_body(&mut self) -> PResult<(TypeBody, Span)> {
        self.expect(TokenKind::LBrace)?;
        let mut fields = Vec::new();
        let mut variants = Vec::new();

        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            let is_field = self.peek(1).kind == TokenKind::Colon;
            let span = self.current().span;
            if is_field {
                fields.push(self.parse_field()?);
            } else {
                variants.push(self.parse_variant()?);
            }
            if !fields.is_empty() && !variants.is_empty() {
                return Err(self
                    .error_at(
                        ErrorCode::MixedTypeBody,
                        "a type body cannot mix record fields and variants",
                        span,
                    )
                    .with_hint("split the fields into a separate record type"));
            }
            self.eat(TokenKind::Comma);
        }

        let close = self.expect(TokenKind::RBrace)?;
        let body = if variants.is_empty() {
            TypeBody::Record(fields)
        } else {
            TypeBody::Variants(variants)
        };
        Ok((body, close.span))
    }

    /// The right-hand side of `type Name = ...`.
    fn parse_type_rhs(&mut self) -> PResult<(TypeBody, Span)> {
        let next = self.peek(1).kind;
        if self.check(TokenKind::Ident) && matches!(next, TokenKind::Bar | TokenKind::LParen) {
            let mut variants = vec![self.parse_variant()?];
            while self.eat(TokenKind::Bar) {
                variants.push(self.parse_variant()?);
            }
            let end = variants[variants.len() - 1].span;
            return Ok((TypeBody::Variants(variants), end));
        }

        let base = self.parse_type()?;
        if self.check_word("where") {
            self.advance();
            let predicate = self.parse_expression()?;
            let end = predicate.span;
            return Ok((TypeBody::Refinement { base, predicate }, end));
        }
        let end = base.span;
        Ok((TypeBody::Alias(base), end))
    }

    /// `name: Type`
    fn parse_field(&mut self) -> PResult<Field> {
        let name = self.expect_ident()?;
        self.expect(TokenKind::Colon)?;
        let ty = self.parse_type()?;
        Ok(Field {
            span: name.span.merge(ty.span),
            name: Some(name),
            ty,
        })
    }

    /// `Name` or `Name(field, name: Type)`.
    fn parse_variant(&mut self) -> PResult<Variant> {
        let name = self.expect_ident()?;
        let mut span = name.span;
        let mut fields = Vec::new();

        if self.eat(TokenKind::LParen) {
            while !self.check(TokenKind::RParen) && !self.is_at_end() {
                if self.check_ident() && self.peek(1).kind == TokenKind::Colon {
                    fields.push(self.parse_field()?);
                } else {
                    let ty = self.parse_type()?;
                    fields.push(Field {
                        name: None,
                        span: ty.span,
                        ty,
                    });
                }
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            span = span.merge(self.expect(TokenKind::RParen)?.span);
        }

        Ok(Variant { name, fields, span })
    }

    // ============================================================
    // Interfaces, traits, impls, externs
    // ============================================================

    /// `interface Name { fn sig(...) -> T }` or `trait Name { ... }`; only
    /// traits may give default bodies.
    pub(super) fn parse_interface_decl(&mut self, is_pub: bool) -> PResult<Stmt> {
        let keyword = self.advance();
        let kind = if keyword.kind == TokenKind::Trait {
            InterfaceKind::Trait
        } else {
            InterfaceKind::Interface
        };
        let name = self.expect_ident()?;
        let type_params = self.parse_type_params()?;

        self.expect(TokenKind::LBrace)?;
        let mut methods = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            methods.push(self.parse_method_sig(kind)?);
            self.eat(TokenKind::Comma);
            self.eat(TokenKind::Semi);
        }
        let close = self.expect(TokenKind::RBrace)?;

        Ok(Stmt::new(
            StmtKind::Interface(Box::new(InterfaceDecl {
                kind,
                name,
                is_pub,
                type_params,
                methods,
            })),
            keyword.span.merge(close.span),
        ))
    }

    fn parse_method_sig(&mut self, kind: InterfaceKind) -> PResult<MethodSig> {
        let start = self.current().span;
        let is_async = self.eat(TokenKind::Async);
        self.expect(TokenKind::Fn)?;
        let name = self.expect_ident()?;
        self.expect(TokenKind::LParen)?;
        let params = self.parse_params()?;
        let mut end = self.expect(TokenKind::RParen)?.span;
        let ret = if self.eat(TokenKind::Arrow) {
            let ty = self.parse_type()?;
            end = ty.span;
            Some(ty)
        } else {
            None
        };

        let default_body = if self.check(TokenKind::LBrace) {
            if kind == InterfaceKind::Interface {
                let span = self.current().span;
                return Err(self
                    .error_at(
                        ErrorCode::UnexpectedToken,
                        format!("interface method `{}` cannot have a body", name.node),
                        span,
                    )
                    .with_hint("declare a `trait` to provide default implementations"));
            }
            let body = self.parse_block()?;
            end = body.span;
            Some(body)
        } else {
            None
        };

        Ok(MethodSig {
            name,
            is_async,
            params,
            ret,
            default_body,
            span: start.merge(end),
        })
    }

    /// `impl [Trait for] Type { fn ... }`
    pub(super) fn parse_impl(&mut self) -> PResult<Stmt> {
        let start = self.expect(TokenKind::Impl)?.span;
        let first = self.parse_type()?;
        let (trait_ty, target) = if self.eat(TokenKind::For) {
            (Some(first), self.parse_type()?)
        } else {
            (None, first)
        };

        self.expect(TokenKind::LBrace)?;
        let mut methods = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            let mut decorators = Vec::new();
            while self.check(TokenKind::At) {
                decorators.push(self.parse_decorator()?);
            }
            let is_pub = self.eat(TokenKind::Pub);
            methods.push(self.parse_function_decl(decorators, is_pub)?);
            self.eat(TokenKind::Semi);
        }
        let close = self.expect(TokenKind::RBrace)?;

        Ok(Stmt::new(
            StmtKind::Impl(Box::new(ImplDecl {
                trait_ty,
                target,
                methods,
            })),
            start.merge(close.span),
        ))
    }

    /// `extern [async] fn name(params) [-> Type]`
    pub(super) fn parse_extern(&mut self) -> PResult<Stmt> {
        let start = self.expect(TokenKind::Extern)?.span;
        let is_async = self.eat(TokenKind::Async);
        self.expect(TokenKind::Fn)?;
        let name = self.expect_ident()?;
        self.expect(TokenKind::LParen)?;
        let params = self.parse_params()?;
        let mut end = self.expect(TokenKind::RParen)?.span;
        let ret = if self.eat(TokenKind::Arrow) {
            let ty = self.parse_type()?;
            end = ty.span;
            Some(ty)
        } else {
            None
        };

        Ok(Stmt::new(
            StmtKind::Extern(Box::new(ExternDecl {
                name,
                is_async,
                params,
                ret,
            })),
            start.merge(end),
        ))
    }

    // ============================================================
    // Imports
    // ============================================================

    /// ```text
    /// import { a, b as c } from "module"
    /// import d from "module"
    /// import * as ns from "module"
    /// ```
    pub fn parse_import(&mut self) -> PResult<Stmt> {
        let start = self.expect(TokenKind::Import)?.span;

        let kind = if self.eat(TokenKind::LBrace) {
            let mut specs = Vec::new();
            while !self.check(TokenKind::RBrace) && !self.is_at_end() {
                let name = self.expect_ident()?;
                let alias = if self.eat(TokenKind::As) {
                    Some(self.expect_ident()?)
                } else {
                    None
                };
                specs.push(ImportSpec { name, alias });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RBrace)?;
            ImportKind::Named(specs)
        } else if self.eat(TokenKind::Star) {
            self.expect(TokenKind::As)?;
            ImportKind::Namespace(self.expect_ident()?)
        } else {
            ImportKind::Default(self.expect_ident()?)
        };

        self.expect(TokenKind::From)?;
        let source = match self.current().kind {
            TokenKind::StringLit | TokenKind::RawStringLit => self.advance(),
            _ => return Err(self.error_expected("module path string")),
        };

        Ok(Stmt::new(
            StmtKind::Import(Box::new(ImportDecl {
                kind,
                source: source.value,
            })),
            start.merge(source.span),
        ))
    }
}
