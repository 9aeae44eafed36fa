//! Fuzz target for the Tova parser.
//!
//! Arbitrary input may fail to parse but must never panic, and a failed parse
//! always carries at least one error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tovac::Parser;

fuzz_target!(|data: &str| {
    if let Err(failure) = Parser::from_source(data).parse_program() {
        assert!(!failure.errors.is_empty());
    }
});
