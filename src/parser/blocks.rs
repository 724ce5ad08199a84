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

//! Routine definition parsing for the parser.
//!
//! This module provides routine definition parsing:
//! - `SUBR NAME [, p ...] ... ENDSUBR`
//! - `FUNC NAME[(p, ...)] ... ENDFUNC` (or `FUNC NAME, p ...`)
//! - `BLOCK NAME ... ENDBLOCK`
//!
//! The header drives the first compiler pass, the closing keyword the second.

use super::helpers::ParserHelpers;
use super::statements::StatementParser;
use super::Parser;
use crate::error::{ErrorCode, Result};
use crate::lexer::Token;
use crate::runtime::construct::{NewSymbol, SymbolConstructor};
use crate::runtime::routine::RoutineCompiler;
use crate::symbols::{RoutineKind, SymbolId};

/// Extension trait for routine definitions.
pub trait BlockParser {
    /// Parse a complete routine definition and return the routine symbol.
    fn parse_routine_definition(&mut self) -> Result<SymbolId>;

    /// Parse the parameter names of a routine header.
    fn parse_parameter_list(&mut self, kind: RoutineKind) -> Result<Vec<String>>;
}

impl<'a> BlockParser for Parser<'a> {
    fn parse_routine_definition(&mut self) -> Result<SymbolId> {
        let (kind, end) = match self.peek() {
            Some(Token::Subr) => (RoutineKind::Subroutine, Token::EndSubr),
            Some(Token::Func) => (RoutineKind::Function, Token::EndFunc),
            Some(Token::Block) => (RoutineKind::Block, Token::EndBlock),
            _ => return Err(self.unexpected("Expected SUBR, FUNC or BLOCK")),
        };
        self.advance();
        let name = self.expect_identifier(&format!("a {} name", kind.name()))?;
        let params = self.parse_parameter_list(kind)?;
        // The body may start on the header line.
        let routine = self
            .interp
            .new_symbol(NewSymbol::RoutineStart { kind, name })?;
        for param in &params {
            self.interp.add_parameter(param)?;
        }
        self.interp.open_routine_body()?;

        let loop_depth = std::mem::replace(&mut self.loop_depth, 0);
        let body = self.parse_statement_list(std::slice::from_ref(&end));
        self.loop_depth = loop_depth;
        body?;

        self.expect(&end, &format!("Expected {}", end))?;
        self.interp.new_symbol(NewSymbol::RoutineEnd)?;
        Ok(routine)
    }

    fn parse_parameter_list(&mut self, kind: RoutineKind) -> Result<Vec<String>> {
        let mut params = Vec::new();

        if kind == RoutineKind::Function && self.match_token(&Token::LeftParen) {
            if !self.match_token(&Token::RightParen) {
                loop {
                    params.push(self.expect_identifier("a parameter name")?);
                    if !self.match_token(&Token::Comma) {
                        break;
                    }
                }
                self.expect(&Token::RightParen, "Expected ')' after parameters")?;
            }
            return Ok(params);
        }

        if self.check(&Token::Comma) {
            if kind == RoutineKind::Block {
                return Err(self.error(
                    ErrorCode::UnexpectedToken,
                    "A block routine takes no parameters",
                ));
            }
            while self.match_token(&Token::Comma) {
                params.push(self.expect_identifier("a parameter name")?);
            }
        }
        Ok(params)
    }
}
