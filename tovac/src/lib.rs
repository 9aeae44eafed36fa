//! # Tova Compiler Front End
//!
//! Parser for the Tova language: a token cursor with speculative parsing, a
//! precedence-climbing expression grammar, destructure and match patterns,
//! a statement grammar with error recovery, and a registry through which
//! block dialects (`server`, `client`, `security`, `select`, ...) extend the
//! grammar.
//!
//! ## Pipeline
//!
//! ```text
//! Source -> Lexer -> Tokens (+ doc comments) -> Parser -> Program
//!                                                  |
//!                                          DialectRegistry
//! ```
//!
//! ## Quick Start
//!
//! ### Lexing Source Code
//!
//! ```rust
//! use tovac::Lexer;
//!
//! let source = "fn main() { 42 }";
//! for token in Lexer::new(source) {
//!     println!("{:?}", token.kind);
//! }
//! ```
//!
//! ### Parsing Source Code
//!
//! ```rust
//! let source = r#"
//! fn hello(name: String) {
//!     print("Hello, {name}!")
//! }
//! "#;
//!
//! let program = tovac::parse_source(source, "hello.tova").expect("parse failed");
//! assert_eq!(program.body.len(), 1);
//! ```
//!
//! ### Error Handling
//!
//! A failed parse still yields the partial program together with every
//! recorded error:
//!
//! ```rust
//! use tovac::diagnostics::{Diagnostic, DiagnosticEmitter};
//!
//! let source = "x = )\nprint(\"ok\")";
//! let failure = tovac::parse_source(source, "broken.tova").unwrap_err();
//! assert_eq!(failure.program.body.len(), 1);
//!
//! let emitter = DiagnosticEmitter::new("broken.tova", source).without_color();
//! for error in &failure.errors {
//!     let rendered = emitter.render(&Diagnostic::from(error)).unwrap();
//!     assert!(rendered.contains("E0110"));
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`ast`] - Abstract Syntax Tree types
//! - [`config`] - Parser limits and where they come from
//! - [`diagnostics`] - Error codes, parse errors and rendering
//! - [`dialect`] - Dialect extension registry and the built-in dialects
//! - [`lexer`] - Reference tokenizer
//! - [`parser`] - Parsing (syntax analysis)
//! - [`span`] - Source location tracking

pub mod ast;
pub mod config;
pub mod diagnostics;
pub mod dialect;
pub mod lexer;
pub mod parser;
pub mod span;

// Re-export commonly used types
pub use ast::Program;
pub use config::ParserConfig;
pub use diagnostics::{Diagnostic, DiagnosticEmitter, DiagnosticKind, ErrorCode, ParseError, ParseFailure};
pub use dialect::{Dialect, DialectRegistry};
pub use lexer::{tokenize, Lexer, Token, TokenKind};
pub use parser::Parser;
pub use span::Span;

use std::sync::Arc;

/// Lex and parse `source` with the standard dialects and default limits.
///
/// `file` is recorded on the program and on every error.
pub fn parse_source(source: &str, file: &str) -> Result<Program, ParseFailure> {
    let config = ParserConfig {
        file: Arc::from(file),
        ..ParserConfig::default()
    };
    parse_with(source, config, Arc::new(DialectRegistry::standard()))
}

/// Lex and parse `source` with explicit configuration and dialects.
pub fn parse_with(
    source: &str,
    config: ParserConfig,
    registry: Arc<DialectRegistry>,
) -> Result<Program, ParseFailure> {
    Parser::from_source(source)
        .with_config(config)
        .with_registry(registry)
        .parse_program()
}
