//! Fuzz target for the Tova lexer.
//!
//! The lexer must accept any input without panicking and must produce
//! spans that lie inside the source.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tovac::Lexer;

fuzz_target!(|data: &str| {
    for token in Lexer::new(data) {
        assert!(token.span.start <= token.span.end);
        assert!(token.span.end <= data.len());
    }
    let _ = tovac::tokenize(data);
});
