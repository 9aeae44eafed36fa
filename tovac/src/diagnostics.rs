//! Diagnostic reporting infrastructure.
//!
//! This module provides the structured parse error, the failure value that
//! carries a partial program, and pretty-printed output.
//!
//! # Error Codes
//!
//! Tova front-end error codes are organized by category:
//!
//! - **E0001-E0099**: Lexical errors surfaced by the parser (invalid tokens, unclosed comments)
//! - **E0100-E0129**: Expectation errors (a required token or construct was absent)
//! - **E0130-E0149**: Shape errors (well-tokenized input the grammar rejects, with a hint)
//! - **E0150-E0159**: Depth errors (nesting beyond the configured maximum)

use std::io;
use std::sync::Arc;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use serde::Serialize;
use thiserror::Error;

use crate::ast::Program;
use crate::span::Span;

/// Parse error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u16)]
pub enum ErrorCode {
    // ============================================================
    // Lexical errors (E0001-E0099)
    // ============================================================
    /// Unrecognised input in source.
    InvalidToken = 1,
    /// Unclosed block comment.
    UnclosedBlockComment = 2,
    /// Template interpolation without a closing `}`.
    UnclosedInterpolation = 3,
    /// Integer literal out of range or malformed.
    InvalidInteger = 5,
    /// Malformed float literal.
    InvalidFloat = 6,

    // ============================================================
    // Expectation errors (E0100-E0129)
    // ============================================================
    /// Unexpected token.
    UnexpectedToken = 100,
    /// Unexpected end of file.
    UnexpectedEof = 101,
    /// Missing closing delimiter.
    UnclosedDelimiter = 104,
    /// Expected identifier.
    ExpectedIdentifier = 108,
    /// Expected type.
    ExpectedType = 109,
    /// Expected expression.
    ExpectedExpression = 110,
    /// Expected pattern.
    ExpectedPattern = 111,
    /// Invalid match arm.
    InvalidMatchArm = 115,
    /// Left-hand side cannot be assigned to.
    InvalidAssignmentTarget = 116,
    /// `}` with no open block.
    UnmatchedClosingBrace = 117,

    // ============================================================
    // Shape errors (E0130-E0149)
    // ============================================================
    /// `let` followed by a plain name instead of a destructuring pattern.
    LetRequiresPattern = 130,
    /// `mut` bindings are not part of the language.
    MutNotSupported = 131,
    /// A type body mixing record fields and variants.
    MixedTypeBody = 132,
    /// `if` used as an expression without an `else` branch.
    IfExpressionWithoutElse = 133,
    /// Rest element that is not the last element of a pattern.
    RestNotLast = 134,
    /// Entry not allowed inside a dialect block.
    InvalidDialectEntry = 135,

    // ============================================================
    // Depth errors (E0150-E0159)
    // ============================================================
    /// Nesting deeper than the configured maximum.
    NestingTooDeep = 150,
}

/// The error taxonomy a code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCategory {
    /// A required token or construct was absent.
    Expectation,
    /// The input is well-formed token-wise but the grammar rejects its shape.
    Shape,
    /// Nesting exceeded the configured maximum.
    Depth,
}

impl ErrorCode {
    /// Get the formatted error code string (e.g., "E0001").
    pub fn as_str(&self) -> String {
        format!("E{:04}", *self as u16)
    }

    /// Get a human-readable description of the error.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::InvalidToken => "invalid token",
            ErrorCode::UnclosedBlockComment => "unclosed block comment",
            ErrorCode::UnclosedInterpolation => "unclosed template interpolation",
            ErrorCode::InvalidInteger => "invalid integer literal",
            ErrorCode::InvalidFloat => "invalid float literal",
            ErrorCode::UnexpectedToken => "unexpected token",
            ErrorCode::UnexpectedEof => "unexpected end of file",
            ErrorCode::UnclosedDelimiter => "unclosed delimiter",
            ErrorCode::ExpectedIdentifier => "expected identifier",
            ErrorCode::ExpectedType => "expected type",
            ErrorCode::ExpectedExpression => "expected expression",
            ErrorCode::ExpectedPattern => "expected pattern",
            ErrorCode::InvalidMatchArm => "invalid match arm",
            ErrorCode::InvalidAssignmentTarget => "invalid assignment target",
            ErrorCode::UnmatchedClosingBrace => "unmatched closing brace",
            ErrorCode::LetRequiresPattern => "`let` requires a destructuring pattern",
            ErrorCode::MutNotSupported => "`mut` is not supported",
            ErrorCode::MixedTypeBody => "type body mixes fields and variants",
            ErrorCode::IfExpressionWithoutElse => "`if` expression without `else`",
            ErrorCode::RestNotLast => "rest element must come last",
            ErrorCode::InvalidDialectEntry => "invalid entry in block",
            ErrorCode::NestingTooDeep => "nesting too deep",
        }
    }

    /// Get a help message suggesting how to fix the error.
    pub fn help(&self) -> Option<&'static str> {
        match self {
            ErrorCode::UnclosedBlockComment => Some("add `*/` to close the block comment"),
            ErrorCode::UnclosedInterpolation => Some("add `}` to close the interpolation"),
            ErrorCode::UnclosedDelimiter => {
                Some("check for matching opening and closing delimiters")
            }
            ErrorCode::LetRequiresPattern => {
                Some("use `x = value` for a binding or `var x = value` for a mutable one")
            }
            ErrorCode::MutNotSupported => Some("use `var` to declare a mutable binding"),
            ErrorCode::IfExpressionWithoutElse => {
                Some("add an `else` branch so the expression always has a value")
            }
            ErrorCode::NestingTooDeep => Some("split the expression into smaller parts"),
            _ => None,
        }
    }

    /// The taxonomy this code belongs to.
    pub fn category(&self) -> ErrorCategory {
        match *self as u16 {
            130..=149 => ErrorCategory::Shape,
            150..=159 => ErrorCategory::Depth,
            _ => ErrorCategory::Expectation,
        }
    }
}

/// A structured parse error.
///
/// Carries the location of the token that was actually found, and for shape
/// errors a corrective hint.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{message}")]
pub struct ParseError {
    pub code: ErrorCode,
    pub message: String,
    pub span: Span,
    pub file: Arc<str>,
    pub hint: Option<String>,
}

impl ParseError {
    pub fn new(code: ErrorCode, message: impl Into<String>, span: Span, file: Arc<str>) -> Self {
        Self {
            code,
            message: message.into(),
            span,
            file,
            hint: code.help().map(str::to_string),
        }
    }

    /// Replace the hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn line(&self) -> u32 {
        self.span.line
    }

    pub fn column(&self) -> u32 {
        self.span.column
    }

    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }
}

/// A failed parse: the best-effort partial program plus every collected error.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{} parse error(s) in {}", .errors.len(), .program.file)]
pub struct ParseFailure {
    pub program: Program,
    /// Errors in the order they were encountered. Never empty.
    pub errors: Vec<ParseError>,
    /// Whether collection stopped at the error cap.
    pub truncated: bool,
}

/// The kind of diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// An error.
    Error,
    /// A warning.
    Warning,
}

impl DiagnosticKind {
    fn to_report_kind(self) -> ReportKind<'static> {
        match self {
            DiagnosticKind::Error => ReportKind::Error,
            DiagnosticKind::Warning => ReportKind::Warning,
        }
    }

    fn color(self) -> Color {
        match self {
            DiagnosticKind::Error => Color::Red,
            DiagnosticKind::Warning => Color::Yellow,
        }
    }
}

/// A renderable diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// The error code (e.g., "E0100").
    pub code: Option<String>,
    pub message: String,
    /// The primary span where the error occurred.
    pub span: Span,
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: DiagnosticKind::Error,
            code: None,
            message: message.into(),
            span,
            suggestions: Vec::new(),
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: DiagnosticKind::Warning,
            ..Self::error(message, span)
        }
    }

    /// Set the error code.
    pub fn with_error_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code.as_str());
        self
    }

    /// Add a suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }
}

impl From<&ParseError> for Diagnostic {
    fn from(error: &ParseError) -> Self {
        let mut diagnostic =
            Diagnostic::error(error.message.clone(), error.span).with_error_code(error.code);
        if let Some(hint) = &error.hint {
            diagnostic = diagnostic.with_suggestion(hint.clone());
        }
        diagnostic
    }
}

/// Renders diagnostics against one source file.
pub struct DiagnosticEmitter<'a> {
    filename: &'a str,
    source: &'a str,
    color: bool,
}

impl<'a> DiagnosticEmitter<'a> {
    pub fn new(filename: &'a str, source: &'a str) -> Self {
        Self {
            filename,
            source,
            color: true,
        }
    }

    /// Disable ANSI colours (used for tests and non-terminal output).
    pub fn without_color(mut self) -> Self {
        self.color = false;
        self
    }

    fn report(&self, diagnostic: &Diagnostic) -> Report<'a, (&'a str, std::ops::Range<usize>)> {
        // Spans of synthesized tokens may sit past the end of the text.
        let start = diagnostic.span.start.min(self.source.len());
        let end = diagnostic.span.end.clamp(start, self.source.len());

        let mut builder = Report::build(diagnostic.kind.to_report_kind(), self.filename, start)
            .with_config(Config::default().with_color(self.color));

        let message = match &diagnostic.code {
            Some(code) => format!("[{}] {}", code, diagnostic.message),
            None => diagnostic.message.clone(),
        };
        builder = builder.with_message(message);

        builder = builder.with_label(
            Label::new((self.filename, start..end))
                .with_color(diagnostic.kind.color())
                .with_message(&diagnostic.message),
        );

        if !diagnostic.suggestions.is_empty() {
            builder = builder.with_help(diagnostic.suggestions.join("\n"));
        }

        builder.finish()
    }

    /// Write a diagnostic to stderr.
    pub fn emit(&self, diagnostic: &Diagnostic) -> io::Result<()> {
        self.report(diagnostic)
            .eprint((self.filename, Source::from(self.source)))
    }

    /// Render a diagnostic to a string.
    pub fn render(&self, diagnostic: &Diagnostic) -> io::Result<String> {
        let mut out = Vec::new();
        self.report(diagnostic)
            .write((self.filename, Source::from(self.source)), &mut out)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}
