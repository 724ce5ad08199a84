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


//! LUX Interpreter Library
//!
//! This library provides the symbol table and execution engine of the LUX
//! scripting language: a flat symbol store with mark/sweep reclamation,
//! hashed name tables, a symbol constructor driven straight from the
//! parser, a two-pass routine compiler and the undefine/zap engine.
//!
//! # Modules
//!
//! - [`error`] - Error types and error reporting
//! - [`config`] - Interpreter capacities and search paths
//! - [`lexer`] - Tokenization of source code
//! - [`parser`] - Parsing tokens straight into symbols
//! - [`symbols`] - Symbol store, name tables, mark and list stacks
//! - [`runtime`] - The interpreter: construction, execution, built-ins
//!
//! # Example
//!
//! ```
//! use lux::{Interpreter, InterpreterConfig};
//!
//! let (mut interp, output) = Interpreter::capture(InterpreterConfig::default()).unwrap();
//! interp.run_source("x = indgen(4)\nprint, total(x)").unwrap();
//! assert_eq!(output.contents(), "6\n");
//! ```

pub mod config;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod runtime;
pub mod symbols;

// Re-export commonly used types
pub use config::InterpreterConfig;
pub use error::{format_error, render_report, ErrorCode, LuxError, Result, SourceLocation, Span};
pub use lexer::Token;
pub use runtime::{Interpreter, OutputBuffer};
pub use symbols::{Region, RegionStats, SymbolClass, SymbolId};

/// The version of the interpreter.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of the interpreter.
pub const NAME: &str = "LUX";

/// Run source code in a fresh interpreter and return everything it printed.
///
/// # Example
///
/// ```
/// let output = lux::run("print, 1 + 2").unwrap();
/// assert_eq!(output, "3\n");
/// ```
pub fn run(source: &str) -> Result<String> {
    let (mut interp, output) = Interpreter::capture(InterpreterConfig::default())?;
    interp.run_source(source)?;
    Ok(output.take())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "LUX");
    }

    #[test]
    fn test_run_collects_output() {
        assert_eq!(run("x = 2\nprint, x * 3").unwrap(), "6\n");
    }

    #[test]
    fn test_run_reports_errors() {
        let err = run("x = 1 + nothing_here").unwrap_err();
        assert_eq!(err.code, ErrorCode::UndefinedVariable);
    }
}
