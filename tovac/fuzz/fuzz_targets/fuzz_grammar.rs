//! Grammar-directed fuzz target.
//!
//! Generates structurally plausible Tova programs so the parser is exercised
//! deep inside statements, match arms and dialect blocks.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tovac::Parser;
use tovac_fuzz::grammar::FuzzProgram;

fuzz_target!(|program: FuzzProgram| {
    let source = program.to_source();
    let _ = Parser::from_source(&source).parse_program();
});
