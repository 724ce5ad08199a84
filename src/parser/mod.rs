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

//! Parser module for the LUX interpreter.
//!
//! The parser is a recursive descent parser with precedence climbing for
//! expressions. It does not build a separate tree: every reduction goes
//! straight through the symbol constructor, so the result of parsing a
//! statement is the index of an executable symbol.
//!
//! # Module Structure
//!
//! - `blocks` - Routine definitions (BlockParser trait)
//! - `control_flow` - Control flow statement parsing (ControlFlowParser trait)
//! - `expressions` - Expression parsing (ExpressionParser trait)
//! - `helpers` - Token stream navigation and error handling (ParserHelpers trait)
//! - `statements` - Statement parsing (StatementParser trait)

// Submodules
pub mod blocks;
pub mod control_flow;
pub mod expressions;
pub mod helpers;
pub mod statements;

// Internal imports from submodules
use blocks::BlockParser;
use helpers::ParserHelpers;
use statements::StatementParser;

use crate::error::{Result, Span};
use crate::lexer::Token;
use crate::runtime::Interpreter;
use crate::symbols::SymbolId;

/// The parser state.
pub struct Parser<'a> {
    /// The token stream to parse.
    pub(crate) tokens: &'a [(Token, Span)],
    /// Current position in the token stream.
    pub(crate) position: usize,
    /// The interpreter that receives the constructed symbols.
    pub(crate) interp: &'a mut Interpreter,
    /// Number of enclosing loops, for `BREAK` and `CONTINUE`.
    pub(crate) loop_depth: usize,
}

impl<'a> Parser<'a> {
    /// Create a parser at the start of `tokens`.
    pub fn new(tokens: &'a [(Token, Span)], interp: &'a mut Interpreter) -> Self {
        Self::resume(tokens, 0, interp)
    }

    /// Create a parser that continues at `position`.
    pub fn resume(tokens: &'a [(Token, Span)], position: usize, interp: &'a mut Interpreter) -> Self {
        Self {
            tokens,
            position,
            interp,
            loop_depth: 0,
        }
    }

    /// Index of the next unread token.
    pub fn position(&self) -> usize {
        self.position
    }

    // ========================================
    // Top Level
    // ========================================

    /// Parse the next top-level item.
    ///
    /// Returns the statement to execute, or `None` when the item was a
    /// routine definition or only separators were left.
    pub fn parse_top_level(&mut self) -> Result<Option<SymbolId>> {
        self.skip_newlines();
        match self.peek() {
            None => Ok(None),
            Some(Token::Subr | Token::Func | Token::Block) => {
                self.parse_routine_definition()?;
                self.expect_statement_end()?;
                Ok(None)
            }
            Some(_) => {
                let statement = self.parse_statement()?;
                self.expect_statement_end()?;
                Ok(Some(statement))
            }
        }
    }
}
