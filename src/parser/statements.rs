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

//! Statement parsing for the parser.
//!
//! This module provides statement parsing functionality:
//! - Assignment statements (simple and compound)
//! - Subroutine calls
//! - Inclusion
//! - Dispatch to the control flow parser

use super::control_flow::ControlFlowParser;
use super::expressions::ExpressionParser;
use super::helpers::ParserHelpers;
use super::Parser;
use crate::error::{ErrorCode, Result};
use crate::lexer::Token;
use crate::runtime::construct::{CallTarget, NewSymbol, SymbolConstructor};
use crate::symbols::{BinaryOp, Evb, IncludeMode, NameSpace, RoutineKind, SymbolId};

/// Extension trait for statement parsing.
pub trait StatementParser {
    /// Parse one statement and return its executable symbol.
    fn parse_statement(&mut self) -> Result<SymbolId>;

    /// Parse a statement starting with an identifier: an assignment or a
    /// subroutine call.
    fn parse_identifier_statement(&mut self) -> Result<SymbolId>;

    /// Parse `NAME [, arg ...]`.
    fn parse_subroutine_call(&mut self) -> Result<SymbolId>;

    /// Try to parse an assignment operator.
    fn try_parse_assign_op(&mut self) -> Option<Option<BinaryOp>>;

    /// Parse statements separated by newlines up to one of `terminators`,
    /// pushing each onto the current list. The terminator is not consumed.
    fn parse_statement_list(&mut self, terminators: &[Token]) -> Result<usize>;
}

impl<'a> StatementParser for Parser<'a> {
    fn parse_statement(&mut self) -> Result<SymbolId> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.unexpected("Expected statement"));
        };

        match token {
            Token::Identifier(_) => self.parse_identifier_statement(),
            Token::If => self.parse_if_statement(),
            Token::For => self.parse_for_statement(),
            Token::While => self.parse_while_statement(),
            Token::Do => self.parse_do_while_statement(),
            Token::Repeat => self.parse_repeat_statement(),
            Token::Begin => self.parse_begin_block(),
            Token::Case => self.parse_case_statement(),
            Token::NCase => self.parse_ncase_statement(),
            Token::Return => self.parse_return_statement(),
            Token::Break | Token::Continue => self.parse_loop_jump(),
            Token::Run => self.parse_run_statement(),
            Token::Include(path) => {
                self.advance();
                self.interp.new_symbol(NewSymbol::Evb(Evb::Include {
                    path,
                    mode: IncludeMode::Execute,
                }))
            }
            Token::IncludeReport(path) => {
                self.advance();
                self.interp.new_symbol(NewSymbol::Evb(Evb::Include {
                    path,
                    mode: IncludeMode::Report,
                }))
            }
            Token::Subr | Token::Func | Token::Block => Err(self.error(
                ErrorCode::NestedRoutineDefinition,
                format!("{} is only allowed at the top level", token),
            )),
            ref t if t.closes_block() => Err(self.error(
                ErrorCode::MismatchedEnd,
                format!("{} without a matching opening statement", t),
            )),
            other => Err(self.error(
                ErrorCode::ExpectedStatement,
                format!("Expected statement, found {}", other),
            )),
        }
    }

    fn parse_identifier_statement(&mut self) -> Result<SymbolId> {
        let is_assignment = matches!(
            self.peek_ahead(1),
            Some(
                Token::Assign
                    | Token::LeftParen
                    | Token::Dot
                    | Token::PlusAssign
                    | Token::MinusAssign
                    | Token::StarAssign
                    | Token::SlashAssign
            )
        );
        if !is_assignment {
            return self.parse_subroutine_call();
        }

        let target = self.parse_postfix_expression(true)?;
        let Some(op) = self.try_parse_assign_op() else {
            return Err(self.unexpected("Expected '=' after assignment target"));
        };
        let value = self.parse_expression()?;
        let value = match op {
            Some(op) => self.interp.new_symbol(NewSymbol::BinOp {
                op,
                lhs: target,
                rhs: value,
            })?,
            None => value,
        };
        self.interp
            .new_symbol(NewSymbol::Evb(Evb::Replace { target, value }))
    }

    fn parse_subroutine_call(&mut self) -> Result<SymbolId> {
        let name = self.expect_identifier("a subroutine name")?;
        let target = match self.known_routine(RoutineKind::Subroutine, &name) {
            Some(id) => CallTarget::User(id),
            None => match self.interp.builtins.find(RoutineKind::Subroutine, &name) {
                Some(index) => CallTarget::Builtin(index),
                None => CallTarget::User(self.interp.find_sym(NameSpace::Subroutine, &name)?),
            },
        };

        self.interp.lists.push_start()?;
        if self.match_token(&Token::Comma) {
            loop {
                self.parse_argument_item()?;
                if !self.match_token(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect_statement_end()?;
        self.interp.new_symbol(NewSymbol::SubCall(target))
    }

    fn try_parse_assign_op(&mut self) -> Option<Option<BinaryOp>> {
        let op = match self.peek()? {
            Token::Assign => None,
            Token::PlusAssign => Some(BinaryOp::Add),
            Token::MinusAssign => Some(BinaryOp::Sub),
            Token::StarAssign => Some(BinaryOp::Mul),
            Token::SlashAssign => Some(BinaryOp::Div),
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn parse_statement_list(&mut self, terminators: &[Token]) -> Result<usize> {
        let mut count = 0;
        loop {
            self.skip_newlines();
            if self.is_at_end() {
                return Err(self.unexpected(&format!("Expected {}", terminators[0])));
            }
            if self.check_any(terminators) {
                return Ok(count);
            }
            let statement = self.parse_statement()?;
            self.interp.lists.push(statement)?;
            count += 1;
            if !self.check_any(terminators) {
                if self.at_statement_end() && !self.check(&Token::Newline) {
                    let found = self.peek().map(|t| t.to_string()).unwrap_or_default();
                    return Err(self.error(
                        ErrorCode::MismatchedEnd,
                        format!("Expected {}, found {}", terminators[0], found),
                    ));
                }
                self.expect_statement_end()?;
            }
        }
    }
}
