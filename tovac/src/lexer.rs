//! Reference lexer for Tova.
//!
//! Lexing is a collaborator of the parser, not part of it: the parser only
//! needs an ordered `Vec<Token>` ending in [`TokenKind::Eof`]. This module
//! provides that stream from source text so the parser can be exercised by
//! the CLI, tests, benches and fuzzers.
//!
//! Notable behaviour:
//!
//! - Newlines are skipped; every token keeps its line/column in its span.
//! - `///` doc comments are diverted into a separate list and associated with
//!   declarations by line adjacency after parsing.
//! - Double-quoted strings with `{...}` interpolations become
//!   [`TokenKind::TemplateString`] tokens whose segments carry the
//!   interpolation's own tokens.
//! - `/.../flags` is a regex literal wherever an expression may start.
//!
//! # Example
//!
//! ```rust
//! use tovac::lexer::{tokenize, TokenKind};
//!
//! let lexed = tokenize("x = 42");
//! let kinds: Vec<_> = lexed.tokens.iter().map(|t| t.kind).collect();
//! assert_eq!(kinds, vec![TokenKind::Ident, TokenKind::Eq, TokenKind::IntLit, TokenKind::Eof]);
//! ```

use std::sync::Arc;

use logos::Logos;
use serde::Serialize;

use crate::span::{LineIndex, Span};

/// Token kinds for the Tova lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum TokenKind {
    // ============================================================
    // Keywords
    // ============================================================
    #[token("fn")]
    Fn,
    #[token("async")]
    Async,
    #[token("await")]
    Await,
    #[token("yield")]
    Yield,
    #[token("return")]
    Return,
    #[token("if")]
    If,
    #[token("elif")]
    Elif,
    #[token("else")]
    Else,
    #[token("for")]
    For,
    #[token("in")]
    In,
    #[token("while")]
    While,
    #[token("loop")]
    Loop,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("match")]
    Match,
    #[token("try")]
    Try,
    #[token("catch")]
    Catch,
    #[token("finally")]
    Finally,
    #[token("guard")]
    Guard,
    #[token("defer")]
    Defer,
    #[token("with")]
    With,
    #[token("as")]
    As,
    #[token("var")]
    Var,
    #[token("let")]
    Let,
    #[token("mut")]
    Mut,
    #[token("pub")]
    Pub,
    #[token("type")]
    Type,
    #[token("interface")]
    Interface,
    #[token("trait")]
    Trait,
    #[token("impl")]
    Impl,
    #[token("extern")]
    Extern,
    #[token("import")]
    Import,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("nil")]
    Nil,
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("not")]
    Not,
    #[token("is")]
    Is,

    // Block keywords
    #[token("server")]
    Server,
    #[token("client")]
    Client,
    #[token("shared")]
    Shared,

    // Contextual keywords: grammar keywords inside a block context,
    // plain names everywhere else.
    #[token("from")]
    From,
    #[token("derive")]
    Derive,
    #[token("route")]
    Route,
    #[token("state")]
    State,
    #[token("computed")]
    Computed,
    #[token("effect")]
    Effect,
    #[token("component")]
    Component,
    #[token("store")]
    Store,

    // ============================================================
    // Literals
    // ============================================================
    /// Integer literal (decimal, hex, octal, or binary)
    #[regex(r"0x[0-9a-fA-F_]+")]
    #[regex(r"0o[0-7_]+")]
    #[regex(r"0b[01_]+")]
    #[regex(r"[0-9][0-9_]*")]
    IntLit,

    /// Float literal
    #[regex(r"[0-9][0-9_]*\.[0-9][0-9_]*([eE][+-]?[0-9_]+)?")]
    #[regex(r"[0-9][0-9_]*[eE][+-]?[0-9_]+")]
    FloatLit,

    /// Double-quoted string without interpolations
    #[regex(r#""([^"\\]|\\.)*""#)]
    StringLit,

    /// Single-quoted string, never interpolated
    #[regex(r"'([^'\\]|\\.)*'")]
    RawStringLit,

    /// Double-quoted string with `{expr}` interpolations (produced by the wrapper)
    TemplateString,

    /// Regex literal `/pattern/flags` (produced by the wrapper)
    Regex,

    // ============================================================
    // Identifiers
    // ============================================================
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    // ============================================================
    // Operators
    // ============================================================
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("**")]
    StarStar,
    #[token("++")]
    PlusPlus,

    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,

    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("!")]
    Bang,
    #[token("|")]
    Bar,

    #[token("=")]
    Eq,
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    StarEq,
    #[token("/=")]
    SlashEq,
    #[token("%=")]
    PercentEq,
    #[token("??=")]
    QuestionQuestionEq,

    #[token("|>")]
    PipeGt,
    #[token("??")]
    QuestionQuestion,
    #[token("?.")]
    QuestionDot,
    #[token("?")]
    Question,

    // ============================================================
    // Punctuation
    // ============================================================
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,

    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("..")]
    DotDot,
    #[token("..=")]
    DotDotEq,
    #[token("...")]
    DotDotDot,

    #[token("->")]
    Arrow,
    #[token("=>")]
    FatArrow,
    #[token("@")]
    At,

    // ============================================================
    // Comments
    // ============================================================
    /// Doc comment (`///`), diverted out of the main stream by the wrapper
    #[regex(r"///[^/\n][^\n]*", priority = 3)]
    #[regex(r"///", priority = 2)]
    DocComment,

    /// Line comment (skipped)
    #[regex(r"//[^/\n][^\n]*", logos::skip)]
    #[regex(r"////[^\n]*", logos::skip)]
    #[token("//", logos::skip)]
    LineComment,

    /// Block comment (skipped; nested)
    #[token("/*", block_comment)]
    BlockComment,

    // ============================================================
    // Special
    // ============================================================
    /// End of input (added by the wrapper)
    Eof,

    /// Unrecognised input
    Error,
}

/// Callback for nested block comments. Unclosed comments become error tokens.
fn block_comment(lexer: &mut logos::Lexer<TokenKind>) -> logos::FilterResult<(), ()> {
    let mut depth = 1;
    let mut chars = lexer.remainder().chars().peekable();
    let mut consumed = 0;

    while depth > 0 {
        match chars.next() {
            Some('/') if chars.peek() == Some(&'*') => {
                chars.next();
                consumed += 2;
                depth += 1;
            }
            Some('*') if chars.peek() == Some(&'/') => {
                chars.next();
                consumed += 2;
                depth -= 1;
            }
            Some(c) => consumed += c.len_utf8(),
            None => {
                lexer.bump(consumed);
                return logos::FilterResult::Error(());
            }
        }
    }

    lexer.bump(consumed);
    logos::FilterResult::Skip
}

impl TokenKind {
    /// Returns the keyword string if this is a keyword token.
    pub fn as_keyword_str(&self) -> Option<&'static str> {
        let kw = match self {
            TokenKind::Fn => "fn",
            TokenKind::Async => "async",
            TokenKind::Await => "await",
            TokenKind::Yield => "yield",
            TokenKind::Return => "return",
            TokenKind::If => "if",
            TokenKind::Elif => "elif",
            TokenKind::Else => "else",
            TokenKind::For => "for",
            TokenKind::In => "in",
            TokenKind::While => "while",
            TokenKind::Loop => "loop",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::Match => "match",
            TokenKind::Try => "try",
            TokenKind::Catch => "catch",
            TokenKind::Finally => "finally",
            TokenKind::Guard => "guard",
            TokenKind::Defer => "defer",
            TokenKind::With => "with",
            TokenKind::As => "as",
            TokenKind::Var => "var",
            TokenKind::Let => "let",
            TokenKind::Mut => "mut",
            TokenKind::Pub => "pub",
            TokenKind::Type => "type",
            TokenKind::Interface => "interface",
            TokenKind::Trait => "trait",
            TokenKind::Impl => "impl",
            TokenKind::Extern => "extern",
            TokenKind::Import => "import",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Nil => "nil",
            TokenKind::And => "and",
            TokenKind::Or => "or",
            TokenKind::Not => "not",
            TokenKind::Is => "is",
            TokenKind::Server => "server",
            TokenKind::Client => "client",
            TokenKind::Shared => "shared",
            TokenKind::From => "from",
            TokenKind::Derive => "derive",
            TokenKind::Route => "route",
            TokenKind::State => "state",
            TokenKind::Computed => "computed",
            TokenKind::Effect => "effect",
            TokenKind::Component => "component",
            TokenKind::Store => "store",
            _ => return None,
        };
        Some(kw)
    }

    /// Returns a human-readable description of the token kind.
    pub fn description(&self) -> &'static str {
        if let Some(kw) = self.as_keyword_str() {
            return match kw {
                "fn" => "keyword `fn`",
                "async" => "keyword `async`",
                "await" => "keyword `await`",
                "yield" => "keyword `yield`",
                "return" => "keyword `return`",
                "if" => "keyword `if`",
                "elif" => "keyword `elif`",
                "else" => "keyword `else`",
                "for" => "keyword `for`",
                "in" => "keyword `in`",
                "while" => "keyword `while`",
                "loop" => "keyword `loop`",
                "break" => "keyword `break`",
                "continue" => "keyword `continue`",
                "match" => "keyword `match`",
                "try" => "keyword `try`",
                "catch" => "keyword `catch`",
                "finally" => "keyword `finally`",
                "guard" => "keyword `guard`",
                "defer" => "keyword `defer`",
                "with" => "keyword `with`",
                "as" => "keyword `as`",
                "var" => "keyword `var`",
                "let" => "keyword `let`",
                "mut" => "keyword `mut`",
                "pub" => "keyword `pub`",
                "type" => "keyword `type`",
                "interface" => "keyword `interface`",
                "trait" => "keyword `trait`",
                "impl" => "keyword `impl`",
                "extern" => "keyword `extern`",
                "import" => "keyword `import`",
                "true" => "keyword `true`",
                "false" => "keyword `false`",
                "nil" => "keyword `nil`",
                "and" => "keyword `and`",
                "or" => "keyword `or`",
                "not" => "keyword `not`",
                "is" => "keyword `is`",
                "server" => "keyword `server`",
                "client" => "keyword `client`",
                "shared" => "keyword `shared`",
                "from" => "contextual keyword `from`",
                "derive" => "contextual keyword `derive`",
                "route" => "contextual keyword `route`",
                "state" => "contextual keyword `state`",
                "computed" => "contextual keyword `computed`",
                "effect" => "contextual keyword `effect`",
                "component" => "contextual keyword `component`",
                "store" => "contextual keyword `store`",
                _ => "keyword",
            };
        }
        match self {
            TokenKind::IntLit => "integer literal",
            TokenKind::FloatLit => "float literal",
            TokenKind::StringLit | TokenKind::RawStringLit => "string literal",
            TokenKind::TemplateString => "template string",
            TokenKind::Regex => "regex literal",
            TokenKind::Ident => "identifier",
            TokenKind::Plus => "`+`",
            TokenKind::Minus => "`-`",
            TokenKind::Star => "`*`",
            TokenKind::Slash => "`/`",
            TokenKind::Percent => "`%`",
            TokenKind::StarStar => "`**`",
            TokenKind::PlusPlus => "`++`",
            TokenKind::EqEq => "`==`",
            TokenKind::NotEq => "`!=`",
            TokenKind::Lt => "`<`",
            TokenKind::Gt => "`>`",
            TokenKind::LtEq => "`<=`",
            TokenKind::GtEq => "`>=`",
            TokenKind::AndAnd => "`&&`",
            TokenKind::OrOr => "`||`",
            TokenKind::Bang => "`!`",
            TokenKind::Bar => "`|`",
            TokenKind::Eq => "`=`",
            TokenKind::PlusEq => "`+=`",
            TokenKind::MinusEq => "`-=`",
            TokenKind::StarEq => "`*=`",
            TokenKind::SlashEq => "`/=`",
            TokenKind::PercentEq => "`%=`",
            TokenKind::QuestionQuestionEq => "`??=`",
            TokenKind::PipeGt => "`|>`",
            TokenKind::QuestionQuestion => "`??`",
            TokenKind::QuestionDot => "`?.`",
            TokenKind::Question => "`?`",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::LBrace => "`{`",
            TokenKind::RBrace => "`}`",
            TokenKind::LBracket => "`[`",
            TokenKind::RBracket => "`]`",
            TokenKind::Comma => "`,`",
            TokenKind::Semi => "`;`",
            TokenKind::Colon => "`:`",
            TokenKind::Dot => "`.`",
            TokenKind::DotDot => "`..`",
            TokenKind::DotDotEq => "`..=`",
            TokenKind::DotDotDot => "`...`",
            TokenKind::Arrow => "`->`",
            TokenKind::FatArrow => "`=>`",
            TokenKind::At => "`@`",
            TokenKind::DocComment => "doc comment",
            TokenKind::LineComment => "comment",
            TokenKind::BlockComment => "block comment",
            TokenKind::Eof => "end of file",
            TokenKind::Error => "invalid token",
            _ => "token",
        }
    }

    /// Whether a token of this kind can be the last token of an expression.
    ///
    /// The lexer uses this to decide whether a `/` divides or opens a regex.
    pub fn ends_expression(&self) -> bool {
        matches!(
            self,
            TokenKind::IntLit
                | TokenKind::FloatLit
                | TokenKind::StringLit
                | TokenKind::RawStringLit
                | TokenKind::TemplateString
                | TokenKind::Regex
                | TokenKind::Ident
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Nil
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
                | TokenKind::Question
                | TokenKind::From
                | TokenKind::Derive
                | TokenKind::Route
                | TokenKind::State
                | TokenKind::Computed
                | TokenKind::Effect
                | TokenKind::Component
                | TokenKind::Store
        )
    }
}

/// One piece of a template string: literal text or an interpolation's tokens.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TemplateSegment {
    Text(String),
    /// The tokens of one `{...}` interpolation, without a trailing `Eof`.
    Tokens(Vec<Token>),
}

/// A token with its kind, text value and source span.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Identifier/keyword text, unescaped string contents, or raw literal text.
    pub value: String,
    pub span: Span,
    /// Segments of a [`TokenKind::TemplateString`].
    pub template: Option<Vec<TemplateSegment>>,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            value: value.into(),
            span,
            template: None,
        }
    }

    /// An end-of-stream token positioned at `span`.
    pub fn eof(span: Span) -> Self {
        Self::new(TokenKind::Eof, "", span)
    }

    pub fn line(&self) -> u32 {
        self.span.line
    }

    pub fn column(&self) -> u32 {
        self.span.column
    }
}

/// A `///` comment line, kept out of the main token stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocComment {
    /// Comment text with the `///` marker and one leading space removed.
    pub text: String,
    pub line: u32,
}

/// Output of [`tokenize`].
#[derive(Debug, Clone, Default)]
pub struct Lexed {
    /// The token stream, always terminated by exactly one `Eof` token.
    pub tokens: Vec<Token>,
    pub doc_comments: Vec<DocComment>,
}

/// Tokenize `source` into a parser-ready token stream plus its doc comments.
pub fn tokenize(source: &str) -> Lexed {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    let mut doc_comments = Vec::new();
    for token in lexer.by_ref() {
        if token.kind == TokenKind::DocComment {
            let text = token.value.trim_start_matches("///");
            let text = text.strip_prefix(' ').unwrap_or(text);
            doc_comments.push(DocComment {
                text: text.trim_end().to_string(),
                line: token.span.line,
            });
        } else {
            tokens.push(token);
        }
    }
    Lexed {
        tokens,
        doc_comments,
    }
}

/// The lexer for Tova source code.
///
/// Yields every token including doc comments, then a single `Eof`.
#[derive(Clone)]
pub struct Lexer<'src> {
    inner: logos::Lexer<'src, TokenKind>,
    source: &'src str,
    /// Byte offset of `inner`'s input within the whole file.
    offset: usize,
    line_index: Arc<LineIndex>,
    /// Kind of the last significant token, for regex detection.
    last: Option<TokenKind>,
    /// Whether to emit a trailing `Eof`.
    emit_eof: bool,
    finished: bool,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given source.
    pub fn new(source: &'src str) -> Self {
        Self {
            inner: TokenKind::lexer(source),
            source,
            offset: 0,
            line_index: Arc::new(LineIndex::new(source)),
            last: None,
            emit_eof: true,
            finished: false,
        }
    }

    /// Lex `range` of a file whose full text is `source`, with absolute spans.
    fn sub(source: &'src str, range: std::ops::Range<usize>, line_index: Arc<LineIndex>) -> Self {
        Self {
            inner: TokenKind::lexer(&source[range.clone()]),
            source,
            offset: range.start,
            line_index,
            last: None,
            emit_eof: false,
            finished: false,
        }
    }

    fn span_of(&self, range: std::ops::Range<usize>) -> Span {
        let start = range.start + self.offset;
        let end = range.end + self.offset;
        let (line, column) = self.line_index.line_col(start);
        Span::new(start, end, line, column)
    }

    fn eof_token(&self) -> Token {
        let end = self.source.len();
        let (line, column) = self.line_index.line_col(end);
        Token::eof(Span::new(end, end, line, column))
    }

    /// Scan a regex body after an opening `/`, returning its byte length
    /// (closing slash and flags included) or `None` if the line ends first.
    fn scan_regex(remainder: &str) -> Option<usize> {
        let mut in_class = false;
        let mut escaped = false;
        let mut iter = remainder.char_indices();
        let close = loop {
            let (idx, ch) = iter.next()?;
            match ch {
                '\n' => return None,
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '[' => in_class = true,
                ']' => in_class = false,
                '/' if !in_class => break idx,
                _ => {}
            }
        };
        let flags = remainder[close + 1..]
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .count();
        Some(close + 1 + flags)
    }

    /// Build the token for a double-quoted string, splitting interpolations.
    fn string_token(&self, raw: &str, span: Span) -> Token {
        let body = &raw[1..raw.len() - 1];
        if !has_interpolation(body) {
            return Token::new(TokenKind::StringLit, unescape(body), span);
        }
        match self.template_segments(body, span.start + 1) {
            Some(segments) => Token {
                kind: TokenKind::TemplateString,
                value: unescape(body),
                span,
                template: Some(segments),
            },
            None => Token::new(TokenKind::Error, "unterminated interpolation", span),
        }
    }

    fn template_segments(&self, body: &str, body_start: usize) -> Option<Vec<TemplateSegment>> {
        let mut segments = Vec::new();
        let mut text = String::new();
        let bytes = body.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' if i + 1 < bytes.len() => {
                    let esc_len = body[i + 1..].chars().next().map_or(1, char::len_utf8);
                    text.push_str(&unescape(&body[i..i + 1 + esc_len]));
                    i += 1 + esc_len;
                }
                b'{' => {
                    let close = matching_brace(&body[i + 1..])? + i + 1;
                    if !text.is_empty() {
                        segments.push(TemplateSegment::Text(std::mem::take(&mut text)));
                    }
                    let start = body_start + i + 1;
                    let end = body_start + close;
                    let tokens: Vec<Token> =
                        Lexer::sub(self.source, start..end, Arc::clone(&self.line_index))
                            .collect();
                    segments.push(TemplateSegment::Tokens(tokens));
                    i = close + 1;
                }
                _ => {
                    let ch_len = body[i..].chars().next().map_or(1, char::len_utf8);
                    text.push_str(&body[i..i + ch_len]);
                    i += ch_len;
                }
            }
        }
        if !text.is_empty() {
            segments.push(TemplateSegment::Text(text));
        }
        Some(segments)
    }
}

/// Whether a string body contains an unescaped `{`.
fn has_interpolation(body: &str) -> bool {
    let mut escaped = false;
    for ch in body.chars() {
        match ch {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '{' => return true,
            _ => {}
        }
    }
    false
}

/// Byte index of the `}` closing an interpolation whose `{` precedes `rest`.
fn matching_brace(rest: &str) -> Option<usize> {
    let mut depth = 1usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (idx, ch) in rest.char_indices() {
        if let Some(q) = quote {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                c if c == q => quote = None,
                _ => {}
            }
            continue;
        }
        match ch {
            '\'' => quote = Some('\''),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Resolve escape sequences in a string body.
pub fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('u') if chars.peek() == Some(&'{') => {
                chars.next();
                let hex: String = chars.by_ref().take_while(|c| *c != '}').collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(c) => out.push(c),
                    None => out.push('\u{FFFD}'),
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let token = match self.inner.next() {
            Some(Ok(TokenKind::Slash)) if !self.last.is_some_and(|k| k.ends_expression()) => {
                let range = self.inner.span();
                match Self::scan_regex(self.inner.remainder()) {
                    Some(len) => {
                        self.inner.bump(len);
                        let end = range.start + 1 + len;
                        let raw = self.inner.source()[range.start..end].to_string();
                        Token::new(TokenKind::Regex, raw, self.span_of(range.start..end))
                    }
                    None => Token::new(TokenKind::Slash, "/", self.span_of(range)),
                }
            }
            Some(Ok(TokenKind::StringLit)) => {
                let range = self.inner.span();
                let span = self.span_of(range);
                let raw = self.inner.slice();
                self.string_token(raw, span)
            }
            Some(Ok(TokenKind::RawStringLit)) => {
                let raw = self.inner.slice();
                let value = unescape(&raw[1..raw.len() - 1]);
                Token::new(TokenKind::RawStringLit, value, self.span_of(self.inner.span()))
            }
            Some(Ok(kind)) => {
                let text = self.inner.slice().to_string();
                Token::new(kind, text, self.span_of(self.inner.span()))
            }
            Some(Err(())) => {
                let text = self.inner.slice().to_string();
                Token::new(TokenKind::Error, text, self.span_of(self.inner.span()))
            }
            None => {
                self.finished = true;
                if !self.emit_eof {
                    return None;
                }
                return Some(self.eof_token());
            }
        };

        if token.kind != TokenKind::DocComment {
            self.last = Some(token.kind);
        }
        Some(token)
    }
}
