//! Parser for Tova.
//!
//! This module implements a hand-written recursive descent parser with
//! precedence climbing for expressions. It consumes the token stream produced
//! by [`crate::lexer`] and builds a [`Program`].
//!
//! # Parser Architecture
//!
//! The parser is organized into several submodules:
//!
//! - `expr` - Operator levels, from pipe down to postfix chains
//! - `primary` - Literals, lambdas, collections, templates, `match`/`if` expressions
//! - `pattern` - Destructure patterns and match patterns
//! - `stmt` - Statements, blocks, control flow, assignments
//! - `item` - Declarations (functions, types, interfaces, imports)
//! - `types` - Type annotations
//!
//! Block dialects plug in through the [`DialectRegistry`]; the top-level
//! loop asks it first, then falls back to imports and ordinary statements.
//!
//! # Example
//!
//! ```rust
//! use tovac::Parser;
//! use tovac::ast::StmtKind;
//!
//! let source = "fn add(a: Int, b: Int) -> Int { a + b }";
//! let program = Parser::from_source(source).parse_program().expect("parse failed");
//! assert_eq!(program.body.len(), 1);
//!
//! match &program.body[0].kind {
//!     StmtKind::Function(f) => assert_eq!(f.params.len(), 2),
//!     _ => panic!("expected function"),
//! }
//! ```
//!
//! # Error Recovery
//!
//! Grammar functions return [`PResult`] and propagate failures with `?`.
//! The top-level loop and every block loop catch a failure, record it, and
//! synchronize: tokens are skipped up to the enclosing `}` or to a token
//! that reliably starts a new statement. Parsing stops once the configured
//! error cap is reached and the result is flagged as truncated.
//!
//! Speculative parses snapshot the cursor and the error count and restore
//! both when abandoned, so nothing from a failed attempt leaks out.

mod expr;
mod item;
mod pattern;
mod primary;
mod stmt;
mod types;

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::ast::*;
use crate::config::ParserConfig;
use crate::diagnostics::{ErrorCode, ParseError, ParseFailure};
use crate::dialect::{Dialect, DialectRegistry, GrammarExtensions};
use crate::lexer::{tokenize, DocComment, Token, TokenKind};
use crate::span::Span;

/// Result of a grammar function.
pub type PResult<T> = Result<T, ParseError>;

/// Format a list of expected items in natural English.
///
/// - Single item: "X"
/// - Two items: "X or Y"
/// - Multiple items: "X, Y, or Z"
fn format_expected_list(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [one] => one.to_string(),
        [a, b] => format!("{} or {}", a, b),
        [rest @ .., last] => format!("{}, or {}", rest.join(", "), last),
    }
}

/// A saved cursor position plus error count, for speculative parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pos: usize,
    errors: usize,
}

/// The Tova parser.
///
/// Owns its token stream; the position is a plain index, so backtracking is
/// restoring an integer.
pub struct Parser {
    /// Tokens, always ending with exactly one `Eof`.
    tokens: Vec<Token>,
    pos: usize,
    /// Recorded (committed) errors.
    errors: Vec<ParseError>,
    /// Set once an error arrives after the cap was reached.
    truncated: bool,
    config: ParserConfig,
    registry: Arc<DialectRegistry>,
    grammar: GrammarExtensions,
    /// Current nesting depth of expressions and blocks.
    depth: usize,
    doc_comments: Vec<DocComment>,
    /// Set while parsing an expression that `=>` follows; a bare
    /// `name =>` then ends the expression instead of starting a lambda.
    no_arrow_lambda: bool,
}

impl Parser {
    /// Create a parser over a token stream.
    ///
    /// An `Eof` token is appended if the stream does not end with one.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        match tokens.last() {
            Some(last) if last.kind == TokenKind::Eof => {}
            Some(last) => {
                let end = Span::new(last.span.end, last.span.end, last.span.line, last.span.column);
                tokens.push(Token::eof(end));
            }
            None => tokens.push(Token::eof(Span::new(0, 0, 1, 1))),
        }
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
            truncated: false,
            config: ParserConfig::default(),
            registry: Arc::new(DialectRegistry::standard()),
            grammar: GrammarExtensions::default(),
            depth: 0,
            doc_comments: Vec::new(),
            no_arrow_lambda: false,
        }
    }

    /// Lex `source` with the reference lexer and create a parser over it.
    pub fn from_source(source: &str) -> Self {
        let lexed = tokenize(source);
        Self::new(lexed.tokens).with_doc_comments(lexed.doc_comments)
    }

    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_registry(mut self, registry: Arc<DialectRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Doc comments to associate with declarations by line adjacency.
    pub fn with_doc_comments(mut self, mut doc_comments: Vec<DocComment>) -> Self {
        doc_comments.sort_by_key(|doc| doc.line);
        self.doc_comments = doc_comments;
        self
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn grammar(&self) -> &GrammarExtensions {
        &self.grammar
    }

    /// Errors recorded so far.
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Parse a complete program.
    ///
    /// On any recorded error the partial program is returned inside the
    /// [`ParseFailure`] together with the ordered error list.
    #[must_use = "parsing has no effect if the result is not used"]
    pub fn parse_program(mut self) -> Result<Program, ParseFailure> {
        let start = self.current().span;
        let mut body = Vec::new();

        while !self.is_at_end() && !self.truncated {
            let before = self.pos;
            if self.check(TokenKind::RBrace) {
                let brace = self.advance();
                let err = self.error_at(
                    ErrorCode::UnmatchedClosingBrace,
                    "unexpected `}` with no open block",
                    brace.span,
                );
                self.record(err);
                continue;
            }
            match self.parse_top_level() {
                Ok(stmt) => body.push(stmt),
                Err(err) => {
                    self.record(err);
                    self.synchronize(before);
                }
            }
        }

        let end = self.current().span;
        let mut program = Program {
            body,
            file: Arc::clone(&self.config.file),
            span: start.merge(end),
        };
        self.attach_docs(&mut program.body);

        debug!(
            file = %program.file,
            statements = program.body.len(),
            errors = self.errors.len(),
            "parsed program"
        );

        if self.errors.is_empty() {
            Ok(program)
        } else {
            Err(ParseFailure {
                program,
                errors: self.errors,
                truncated: self.truncated,
            })
        }
    }

    /// Parse one top-level construct: a registered dialect form, an import,
    /// or an ordinary statement.
    pub fn parse_top_level(&mut self) -> PResult<Stmt> {
        let registry = Arc::clone(&self.registry);
        let stmt = if let Some((dialect, entry)) = registry.match_statement(self, true) {
            self.ensure_installed(dialect);
            entry(self)?
        } else if self.check(TokenKind::Import) {
            self.parse_import()?
        } else {
            return self.parse_statement();
        };
        self.eat(TokenKind::Semi);
        Ok(stmt)
    }

    /// Install a dialect's grammar extensions once per parse.
    pub fn ensure_installed(&mut self, dialect: &dyn Dialect) {
        if self.grammar.mark_installed(dialect.name()) {
            dialect.install(&mut self.grammar);
            debug!(dialect = dialect.name(), "installed dialect grammar");
        }
    }

    /// Parse an isolated token run (a template interpolation) as one
    /// expression, sharing this parser's configuration and dialects.
    fn parse_sub_expression(&self, tokens: Vec<Token>, fallback: Span) -> PResult<Expr> {
        let mut sub = Parser::new(tokens);
        if sub.tokens.len() == 1 {
            sub.tokens[0].span = Span::new(fallback.end, fallback.end, fallback.line, fallback.column);
        }
        sub.config = self.config.clone();
        sub.registry = Arc::clone(&self.registry);
        sub.grammar = self.grammar.clone();
        sub.depth = self.depth;

        let expr = sub.parse_expression()?;
        if !sub.is_at_end() {
            return Err(sub.error_expected("`}` to end the interpolation"));
        }
        Ok(expr)
    }

    // ============================================================
    // Token handling
    // ============================================================

    /// The token at the cursor; the `Eof` token once past the end.
    pub fn current(&self) -> &Token {
        self.peek(0)
    }

    /// The token `k` positions ahead of the cursor, saturating at `Eof`.
    pub fn peek(&self, k: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + k).min(last)]
    }

    /// The most recently consumed token.
    pub fn previous(&self) -> Option<&Token> {
        self.pos.checked_sub(1).and_then(|i| self.tokens.get(i))
    }

    /// Consume and return the current token. Never moves past `Eof`.
    pub fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    pub fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    /// Whether the current token is the identifier `word`.
    pub fn check_word(&self, word: &str) -> bool {
        let current = self.current();
        current.kind == TokenKind::Ident && current.value == word
    }

    /// Check if a token kind is a contextual keyword that can be used as an
    /// identifier. These keywords only carry grammar meaning inside specific
    /// block contexts and are plain names everywhere else.
    pub fn is_contextual_keyword(kind: TokenKind) -> bool {
        matches!(
            kind,
            TokenKind::From
                | TokenKind::Derive
                | TokenKind::Route
                | TokenKind::State
                | TokenKind::Computed
                | TokenKind::Effect
                | TokenKind::Component
                | TokenKind::Store
        )
    }

    /// Check if the current token is an identifier or a contextual keyword.
    pub fn check_ident(&self) -> bool {
        let kind = self.current().kind;
        kind == TokenKind::Ident || Self::is_contextual_keyword(kind)
    }

    pub fn is_at_end(&self) -> bool {
        self.check(TokenKind::Eof)
    }

    /// Whether the current token starts on the line the previous token
    /// started on.
    pub fn on_same_line(&self) -> bool {
        self.previous()
            .map_or(true, |prev| prev.line() == self.current().line())
    }

    /// Consume a token of the expected kind, or fail.
    pub fn expect(&mut self, kind: TokenKind) -> PResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_expected(kind.description()))
        }
    }

    /// Consume the current token if it is one of `kinds`.
    pub fn match_kind(&mut self, kinds: &[TokenKind]) -> Option<Token> {
        if kinds.contains(&self.current().kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    /// Consume a token of the given kind if present.
    pub fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume a name (identifier or contextual keyword).
    pub fn expect_ident(&mut self) -> PResult<Ident> {
        if self.check_ident() {
            let token = self.advance();
            Ok(Ident::new(token.value, token.span))
        } else {
            Err(self.error_expected_code(ErrorCode::ExpectedIdentifier, "identifier"))
        }
    }

    /// Consume the identifier `word`.
    pub fn expect_word(&mut self, word: &str) -> PResult<Token> {
        if self.check_word(word) {
            Ok(self.advance())
        } else {
            Err(self.error_expected(&format!("`{}`", word)))
        }
    }

    // ============================================================
    // Error handling
    // ============================================================

    /// Build an error at `span` in this parser's file.
    pub fn error_at(&self, code: ErrorCode, message: impl Into<String>, span: Span) -> ParseError {
        ParseError::new(code, message, span, Arc::clone(&self.config.file))
    }

    /// "expected X, found Y" at the current token.
    pub fn error_expected(&self, expected: &str) -> ParseError {
        self.error_expected_code(ErrorCode::UnexpectedToken, expected)
    }

    /// Report an error expecting one of several things.
    pub fn error_expected_one_of(&self, expected: &[&str]) -> ParseError {
        self.error_expected(&format_expected_list(expected))
    }

    fn error_expected_code(&self, code: ErrorCode, expected: &str) -> ParseError {
        let token = self.current();
        let code = match token.kind {
            TokenKind::Eof => ErrorCode::UnexpectedEof,
            TokenKind::Error if token.value.starts_with("/*") => ErrorCode::UnclosedBlockComment,
            TokenKind::Error if token.value == "unterminated interpolation" => {
                ErrorCode::UnclosedInterpolation
            }
            TokenKind::Error => ErrorCode::InvalidToken,
            _ => code,
        };
        let found = match token.kind {
            TokenKind::Ident => format!("identifier `{}`", token.value),
            TokenKind::Error => format!("invalid token `{}`", token.value),
            kind => kind.description().to_string(),
        };
        let err = self.error_at(code, format!("expected {}, found {}", expected, found), token.span);
        match self.previous() {
            Some(prev) if token.kind != TokenKind::Eof && prev.line() < token.line() => {
                err.with_hint(format!("the construct on line {} is not finished", prev.line()))
            }
            _ => err,
        }
    }

    /// Append a committed error, honoring the error cap.
    fn record(&mut self, err: ParseError) {
        if self.truncated {
            return;
        }
        if self.errors.len() >= self.config.max_errors {
            self.truncated = true;
            warn!(
                file = %self.config.file,
                max_errors = self.config.max_errors,
                "error cap reached, parse truncated"
            );
            return;
        }
        self.errors.push(err);
    }

    /// Whether parsing has stopped because of the error cap.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Skip to a safe resumption point after an error.
    ///
    /// Stops at the enclosing `}` (not consumed), at a statement keyword, or
    /// at a token that can start a statement on a later line than the last
    /// token the failed statement consumed. A statement left open at the end
    /// of a line therefore does not swallow the next one. A `{ ... }` group
    /// met along the way is skipped as a whole. At least one token is
    /// consumed when the failed statement consumed none.
    fn synchronize(&mut self, start_pos: usize) {
        let from = self.pos;
        let anchor_line = if self.pos > start_pos {
            self.tokens[self.pos - 1].line()
        } else {
            self.current().line()
        };
        if self.pos == start_pos && !self.check(TokenKind::RBrace) {
            self.advance();
        }

        while !self.is_at_end() {
            let token = self.current();
            if token.kind == TokenKind::RBrace || is_statement_keyword(token.kind) {
                break;
            }
            if token.line() > anchor_line && can_start_statement(token.kind) {
                break;
            }
            if token.kind == TokenKind::LBrace {
                self.advance();
                self.skip_to_closing(TokenKind::RBrace);
                self.eat(TokenKind::RBrace);
                continue;
            }
            self.advance();
        }

        trace!(skipped = self.pos - from, "synchronized");
    }

    /// Skip tokens until we find a closing delimiter, handling nested delimiters.
    /// Returns true if the closing delimiter was found (it is not consumed).
    fn skip_to_closing(&mut self, closing: TokenKind) -> bool {
        let opening = match closing {
            TokenKind::RParen => TokenKind::LParen,
            TokenKind::RBracket => TokenKind::LBracket,
            TokenKind::RBrace => TokenKind::LBrace,
            _ => return false,
        };

        let mut depth = 1;
        while !self.is_at_end() {
            let kind = self.current().kind;
            if kind == opening {
                depth += 1;
            } else if kind == closing {
                depth -= 1;
                if depth == 0 {
                    return true;
                }
            }
            self.advance();
        }
        false
    }

    /// Run `f` one nesting level deeper, failing cleanly past the maximum.
    pub(crate) fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        if self.depth >= self.config.max_depth {
            let span = self.current().span;
            return Err(self.error_at(
                ErrorCode::NestingTooDeep,
                format!("nesting exceeds the maximum depth of {}", self.config.max_depth),
                span,
            ));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    // ============================================================
    // Speculative parsing
    // ============================================================

    /// Snapshot the cursor and error count.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            pos: self.pos,
            errors: self.errors.len(),
        }
    }

    /// Return to a snapshot, discarding errors recorded since.
    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.pos = checkpoint.pos;
        self.errors.truncate(checkpoint.errors);
    }

    /// Attempt `f`; on failure restore the cursor and error list and return
    /// `None`.
    pub fn speculate<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> Option<T> {
        let checkpoint = self.checkpoint();
        let truncated = self.truncated;
        match f(self) {
            Ok(value) => Some(value),
            Err(err) => {
                trace!(at = err.line(), reason = %err.message, "abandoned speculative parse");
                self.restore(checkpoint);
                self.truncated = truncated;
                None
            }
        }
    }

    // ============================================================
    // Doc comments
    // ============================================================

    fn attach_docs(&self, stmts: &mut [Stmt]) {
        if self.doc_comments.is_empty() {
            return;
        }
        let by_line: BTreeMap<u32, &str> = self
            .doc_comments
            .iter()
            .map(|doc| (doc.line, doc.text.as_str()))
            .collect();
        attach_docs_to(&by_line, stmts);
    }
}

fn attach_docs_to(docs: &BTreeMap<u32, &str>, stmts: &mut [Stmt]) {
    for stmt in stmts {
        let mut lines = Vec::new();
        let mut line = stmt.span.line;
        while line > 1 {
            line -= 1;
            match docs.get(&line) {
                Some(text) => lines.push(*text),
                None => break,
            }
        }
        if !lines.is_empty() {
            lines.reverse();
            stmt.docs = Some(lines.join("\n"));
        }

        match &mut stmt.kind {
            StmtKind::Function(function) => attach_docs_to(docs, &mut function.body.stmts),
            StmtKind::Dialect(node) => match node.as_mut() {
                DialectNode::Server { body, .. }
                | DialectNode::Client { body, .. }
                | DialectNode::Shared { body, .. }
                | DialectNode::Store { body, .. }
                | DialectNode::Extension { body, .. } => attach_docs_to(docs, body),
                DialectNode::Middleware { function } => {
                    attach_docs_to(docs, &mut function.body.stmts)
                }
                _ => {}
            },
            _ => {}
        }
    }
}

/// Keywords that always begin a new statement; synchronization stops here.
fn is_statement_keyword(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Fn
            | TokenKind::Type
            | TokenKind::If
            | TokenKind::For
            | TokenKind::While
            | TokenKind::Loop
            | TokenKind::Return
            | TokenKind::Import
            | TokenKind::Match
            | TokenKind::Try
            | TokenKind::Var
            | TokenKind::Let
            | TokenKind::Guard
            | TokenKind::Defer
            | TokenKind::With
            | TokenKind::Break
            | TokenKind::Continue
            | TokenKind::Server
            | TokenKind::Client
            | TokenKind::Shared
            | TokenKind::Interface
            | TokenKind::Trait
            | TokenKind::Impl
            | TokenKind::Extern
            | TokenKind::Pub
            | TokenKind::Async
            | TokenKind::At
    )
}

/// Tokens that can begin a statement when they start a fresh line.
fn can_start_statement(kind: TokenKind) -> bool {
    is_statement_keyword(kind)
        || Parser::is_contextual_keyword(kind)
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
        )
}
