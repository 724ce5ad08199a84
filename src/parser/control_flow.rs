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

//! Control flow statement parsing for the parser.
//!
//! This module provides control flow statement parsing:
//! - IF/THEN/ELSE
//! - FOR, WHILE/DO, DO/WHILE and REPEAT/UNTIL loops
//! - BEGIN/END blocks
//! - CASE and NCASE
//! - RETURN, BREAK, CONTINUE and RUN

use super::expressions::ExpressionParser;
use super::helpers::ParserHelpers;
use super::statements::StatementParser;
use super::Parser;
use crate::error::{ErrorCode, Result};
use crate::lexer::Token;
use crate::runtime::construct::{NewSymbol, SymbolConstructor};
use crate::symbols::{Evb, NameSpace, RoutineKind, SymbolId};

/// Extension trait for control flow parsing.
pub trait ControlFlowParser {
    /// Parse `IF c THEN s [ELSE s]`.
    fn parse_if_statement(&mut self) -> Result<SymbolId>;

    /// Parse `FOR v = a, b [, step] DO s`.
    fn parse_for_statement(&mut self) -> Result<SymbolId>;

    /// Parse `WHILE c DO s`.
    fn parse_while_statement(&mut self) -> Result<SymbolId>;

    /// Parse `DO s WHILE c`.
    fn parse_do_while_statement(&mut self) -> Result<SymbolId>;

    /// Parse `REPEAT s UNTIL c`.
    fn parse_repeat_statement(&mut self) -> Result<SymbolId>;

    /// Parse a loop body.
    fn parse_loop_body(&mut self) -> Result<SymbolId>;

    /// Parse `BEGIN ... END`.
    fn parse_begin_block(&mut self) -> Result<SymbolId>;

    /// Parse `CASE` arms up to `ENDCASE`.
    fn parse_case_statement(&mut self) -> Result<SymbolId>;

    /// Parse `NCASE selector` statements up to `ENDCASE`.
    fn parse_ncase_statement(&mut self) -> Result<SymbolId>;

    /// Parse `RETURN [[,] expr]`.
    fn parse_return_statement(&mut self) -> Result<SymbolId>;

    /// Parse `BREAK` or `CONTINUE`.
    fn parse_loop_jump(&mut self) -> Result<SymbolId>;

    /// Parse `RUN, NAME`.
    fn parse_run_statement(&mut self) -> Result<SymbolId>;
}

impl<'a> ControlFlowParser for Parser<'a> {
    fn parse_if_statement(&mut self) -> Result<SymbolId> {
        self.expect(&Token::If, "Expected IF")?;
        let condition = self.parse_expression()?;
        self.expect(&Token::Then, "Expected THEN after condition")?;
        self.skip_newlines();
        let then = self.parse_statement()?;

        let otherwise = if self.match_token(&Token::Else) {
            self.skip_newlines();
            Some(self.parse_statement()?)
        } else {
            None
        };

        self.interp.new_symbol(NewSymbol::Evb(Evb::If {
            condition,
            then,
            otherwise,
        }))
    }

    fn parse_for_statement(&mut self) -> Result<SymbolId> {
        self.expect(&Token::For, "Expected FOR")?;
        let name = self.expect_identifier("a loop variable")?;
        let counter = self.interp.find_var(&name)?;
        self.expect(&Token::Assign, "Expected '=' after loop variable")?;
        let start = self.parse_expression()?;
        self.expect(&Token::Comma, "Expected ',' after start value")?;
        let end = self.parse_expression()?;
        let step = if self.match_token(&Token::Comma) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(&Token::Do, "Expected DO after loop range")?;
        let body = self.parse_loop_body()?;

        self.interp.new_symbol(NewSymbol::Evb(Evb::For {
            counter,
            start,
            end,
            step,
            body,
        }))
    }

    fn parse_while_statement(&mut self) -> Result<SymbolId> {
        self.expect(&Token::While, "Expected WHILE")?;
        let condition = self.parse_expression()?;
        self.expect(&Token::Do, "Expected DO after condition")?;
        let body = self.parse_loop_body()?;
        self.interp
            .new_symbol(NewSymbol::Evb(Evb::WhileDo { condition, body }))
    }

    fn parse_do_while_statement(&mut self) -> Result<SymbolId> {
        self.expect(&Token::Do, "Expected DO")?;
        let body = self.parse_loop_body()?;
        self.skip_newlines();
        self.expect(&Token::While, "Expected WHILE after loop body")?;
        let condition = self.parse_expression()?;
        self.interp
            .new_symbol(NewSymbol::Evb(Evb::DoWhile { body, condition }))
    }

    fn parse_repeat_statement(&mut self) -> Result<SymbolId> {
        self.expect(&Token::Repeat, "Expected REPEAT")?;
        let body = self.parse_loop_body()?;
        self.skip_newlines();
        self.expect(&Token::Until, "Expected UNTIL after loop body")?;
        let condition = self.parse_expression()?;
        self.interp
            .new_symbol(NewSymbol::Evb(Evb::Repeat { body, condition }))
    }

    fn parse_loop_body(&mut self) -> Result<SymbolId> {
        self.skip_newlines();
        self.loop_depth += 1;
        let body = self.parse_statement();
        self.loop_depth -= 1;
        body
    }

    fn parse_begin_block(&mut self) -> Result<SymbolId> {
        self.expect(&Token::Begin, "Expected BEGIN")?;
        self.interp.lists.push_start()?;
        self.parse_statement_list(&[Token::End])?;
        self.expect(&Token::End, "Expected END")?;
        self.interp.new_symbol(NewSymbol::Block)
    }

    fn parse_case_statement(&mut self) -> Result<SymbolId> {
        self.expect(&Token::Case, "Expected CASE")?;
        self.interp.lists.push_start()?;
        let mut has_else = false;

        loop {
            self.skip_newlines();
            if self.check(&Token::EndCase) {
                break;
            }
            if self.match_token(&Token::Else) {
                let statement = self.parse_statement()?;
                self.interp.lists.push(statement)?;
                has_else = true;
                self.skip_newlines();
                break;
            }
            if self.is_at_end() || self.peek().is_some_and(Token::closes_block) {
                break;
            }
            let condition = self.parse_expression()?;
            self.expect(&Token::Colon, "Expected ':' after CASE condition")?;
            let statement = self.parse_statement()?;
            self.interp.lists.push(condition)?;
            self.interp.lists.push(statement)?;
            self.expect_statement_end()?;
        }

        self.expect_case_end()?;
        self.interp.new_symbol(NewSymbol::Case { has_else })
    }

    fn parse_ncase_statement(&mut self) -> Result<SymbolId> {
        self.expect(&Token::NCase, "Expected NCASE")?;
        self.interp.lists.push_start()?;
        let selector = self.parse_expression()?;
        self.interp.lists.push(selector)?;

        self.parse_statement_list(&[Token::EndCase, Token::Else])?;
        let has_else = self.match_token(&Token::Else);
        if has_else {
            let statement = self.parse_statement()?;
            self.interp.lists.push(statement)?;
            self.skip_newlines();
        }

        self.expect_case_end()?;
        self.interp.new_symbol(NewSymbol::NCase { has_else })
    }

    fn parse_return_statement(&mut self) -> Result<SymbolId> {
        self.expect(&Token::Return, "Expected RETURN")?;
        self.match_token(&Token::Comma);
        let value = if self.at_statement_end() {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.interp.new_symbol(NewSymbol::Evb(Evb::Return(value)))
    }

    fn parse_loop_jump(&mut self) -> Result<SymbolId> {
        let (evb, code) = if self.check(&Token::Break) {
            (Evb::Break, ErrorCode::BreakOutsideLoop)
        } else {
            (Evb::Continue, ErrorCode::ContinueOutsideLoop)
        };
        if self.loop_depth == 0 {
            return Err(self.error(code, format!("{} outside a loop", evb.kind_name())));
        }
        self.advance();
        self.interp.new_symbol(NewSymbol::Evb(evb))
    }

    fn parse_run_statement(&mut self) -> Result<SymbolId> {
        self.expect(&Token::Run, "Expected RUN")?;
        self.expect(&Token::Comma, "Expected ',' after RUN")?;
        let name = self.expect_identifier("a block routine name")?;
        let routine = match self.known_routine(RoutineKind::Block, &name) {
            Some(id) => id,
            None => self.interp.find_sym(NameSpace::Block, &name)?,
        };
        self.interp
            .new_symbol(NewSymbol::Evb(Evb::BlockCall(routine)))
    }
}

impl<'a> Parser<'a> {
    fn expect_case_end(&mut self) -> Result<()> {
        if self.check(&Token::EndCase) {
            self.advance();
            return Ok(());
        }
        match self.peek() {
            Some(t) if t.closes_block() => Err(self.error(
                ErrorCode::MismatchedEnd,
                format!("Expected ENDCASE, found {}", t),
            )),
            _ => Err(self.unexpected("Expected ENDCASE")),
        }
    }
}
