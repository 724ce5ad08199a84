// LUX - Symbol table and execution engine for the LUX scripting language
// Copyright (C) 2026  Marcel Joachim Kloubert <marcel@kloubert.dev>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Fuzz target for the LUX parser and symbol constructor.
//!
//! Every top-level item is parsed into a fresh interpreter. Nothing is
//! executed, so generated loops cannot hang the fuzzer.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_parser -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use lux::parser::Parser;
use lux::{Interpreter, InterpreterConfig};

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(tokens) = lux::lexer::tokenize(source) else {
        return;
    };
    let Ok((mut interp, _)) = Interpreter::capture(InterpreterConfig::default()) else {
        return;
    };
    let mut parser = Parser::new(&tokens, &mut interp);
    while parser.position() < tokens.len() {
        let before = parser.position();
        if parser.parse_top_level().is_err() || parser.position() == before {
            break;
        }
    }
});
