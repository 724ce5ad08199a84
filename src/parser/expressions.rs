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

//! Expression parsing for the parser.
//!
//! This module provides expression parsing functionality:
//! - Precedence climbing for binary operators
//! - Unary operators (through the `NEG` and `NOT` built-ins)
//! - Primary expressions (literals, identifiers, grouping, lists)
//! - Postfix expressions (function calls, subscripts, tags)
//! - Argument items (keywords, ranges)
//!
//! Every reduction constructs a symbol right away and returns its index.

use super::helpers::ParserHelpers;
use super::Parser;
use crate::error::{ErrorCode, LuxError, Result};
use crate::lexer::Token;
use crate::runtime::construct::{CallTarget, NewSymbol, SymbolConstructor};
use crate::symbols::{
    BinaryOp, Context, LogicOp, NameSpace, Payload, PreRangeEnd, RangeFlags, RoutineKind,
    RoutineRef, Scalar, SymbolClass, SymbolId,
};

/// Extension trait for expression parsing.
pub trait ExpressionParser {
    /// Parse an expression.
    fn parse_expression(&mut self) -> Result<SymbolId>;

    /// Parse `ANDIF` / `ORIF` chains.
    fn parse_conditional_expression(&mut self) -> Result<SymbolId>;

    /// Parse `AND` / `OR` / `XOR` chains.
    fn parse_logical_expression(&mut self) -> Result<SymbolId>;

    /// Parse a comparison expression.
    fn parse_comparison_expression(&mut self) -> Result<SymbolId>;

    /// Try to parse a comparison operator.
    fn try_parse_comparison_op(&mut self) -> Option<BinaryOp>;

    /// Parse an additive expression.
    fn parse_additive_expression(&mut self) -> Result<SymbolId>;

    /// Parse a multiplicative expression.
    fn parse_multiplicative_expression(&mut self) -> Result<SymbolId>;

    /// Parse a unary expression.
    fn parse_unary_expression(&mut self) -> Result<SymbolId>;

    /// Parse `^` (right associative).
    fn parse_power_expression(&mut self) -> Result<SymbolId>;

    /// Parse a primary expression.
    fn parse_primary_expression(&mut self) -> Result<SymbolId>;

    /// Parse a name with its subscripts and tags. With `lvalue` the name is
    /// always a variable.
    fn parse_postfix_expression(&mut self, lvalue: bool) -> Result<SymbolId>;

    /// Parse one item of an argument or subscript list and push it onto the
    /// list stack.
    fn parse_argument_item(&mut self) -> Result<()>;

    /// Parse items up to `close` into a new list on the list stack.
    fn parse_argument_list(&mut self, close: &Token) -> Result<()>;
}

impl<'a> ExpressionParser for Parser<'a> {
    fn parse_expression(&mut self) -> Result<SymbolId> {
        self.parse_conditional_expression()
    }

    fn parse_conditional_expression(&mut self) -> Result<SymbolId> {
        let mut left = self.parse_logical_expression()?;

        loop {
            let op = if self.match_token(&Token::AndIf) {
                LogicOp::AndIf
            } else if self.match_token(&Token::OrIf) {
                LogicOp::OrIf
            } else {
                break;
            };
            let right = self.parse_logical_expression()?;
            left = self.interp.new_symbol(NewSymbol::IfOp {
                op,
                lhs: left,
                rhs: right,
            })?;
        }

        Ok(left)
    }

    fn parse_logical_expression(&mut self) -> Result<SymbolId> {
        let mut left = self.parse_comparison_expression()?;

        loop {
            let op = if self.match_token(&Token::And) {
                BinaryOp::And
            } else if self.match_token(&Token::Or) {
                BinaryOp::Or
            } else if self.match_token(&Token::Xor) {
                BinaryOp::Xor
            } else {
                break;
            };
            let right = self.parse_comparison_expression()?;
            left = self.binary(op, left, right)?;
        }

        Ok(left)
    }

    fn parse_comparison_expression(&mut self) -> Result<SymbolId> {
        let mut left = self.parse_additive_expression()?;

        while let Some(op) = self.try_parse_comparison_op() {
            let right = self.parse_additive_expression()?;
            left = self.binary(op, left, right)?;
        }

        Ok(left)
    }

    fn try_parse_comparison_op(&mut self) -> Option<BinaryOp> {
        let op = match self.peek()? {
            Token::Eq | Token::EqualEqual => BinaryOp::Eq,
            Token::Ne | Token::BangEqual => BinaryOp::Ne,
            Token::Lt | Token::Less => BinaryOp::Lt,
            Token::Le | Token::LessEqual => BinaryOp::Le,
            Token::Gt | Token::Greater => BinaryOp::Gt,
            Token::Ge | Token::GreaterEqual => BinaryOp::Ge,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn parse_additive_expression(&mut self) -> Result<SymbolId> {
        let mut left = self.parse_multiplicative_expression()?;

        loop {
            let op = if self.match_token(&Token::Plus) {
                BinaryOp::Add
            } else if self.match_token(&Token::Minus) {
                BinaryOp::Sub
            } else {
                break;
            };
            let right = self.parse_multiplicative_expression()?;
            left = self.binary(op, left, right)?;
        }

        Ok(left)
    }

    fn parse_multiplicative_expression(&mut self) -> Result<SymbolId> {
        let mut left = self.parse_unary_expression()?;

        loop {
            let op = if self.match_token(&Token::Star) {
                BinaryOp::Mul
            } else if self.match_token(&Token::Slash) {
                BinaryOp::Div
            } else if self.match_token(&Token::Mod) {
                BinaryOp::Mod
            } else {
                break;
            };
            let right = self.parse_unary_expression()?;
            left = self.binary(op, left, right)?;
        }

        Ok(left)
    }

    fn parse_unary_expression(&mut self) -> Result<SymbolId> {
        if self.check(&Token::Minus) {
            // fold negative literals, except as the base of a power
            let literal = match self.peek_ahead(1) {
                Some(Token::Integer(value)) | Some(Token::Real(value)) => Some(*value),
                _ => None,
            };
            if let (Some(value), false) = (literal, matches!(self.peek_ahead(2), Some(Token::Caret))) {
                self.advance();
                self.advance();
                return self.interp.new_symbol(NewSymbol::Number(negate_literal(value)));
            }
            self.advance();
            let operand = self.parse_unary_expression()?;
            return self.unary("NEG", operand);
        }
        if self.match_token(&Token::Not) {
            let operand = self.parse_unary_expression()?;
            return self.unary("NOT", operand);
        }
        self.match_token(&Token::Plus);
        self.parse_power_expression()
    }

    fn parse_power_expression(&mut self) -> Result<SymbolId> {
        let base = self.parse_primary_expression()?;
        if self.match_token(&Token::Caret) {
            let exponent = self.parse_unary_expression()?;
            return self.binary(BinaryOp::Pow, base, exponent);
        }
        Ok(base)
    }

    fn parse_primary_expression(&mut self) -> Result<SymbolId> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.unexpected("Expected expression"));
        };

        match token {
            Token::Integer(value) | Token::Real(value) => {
                self.advance();
                self.interp.new_symbol(NewSymbol::Number(value))
            }
            Token::Imaginary(value) => {
                self.advance();
                self.interp.new_symbol(NewSymbol::Imaginary(value))
            }
            Token::String(text) => {
                self.advance();
                self.interp.new_symbol(NewSymbol::Text(text))
            }
            Token::Identifier(_) => self.parse_postfix_expression(false),
            Token::LeftParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(&Token::RightParen, "Expected ')' after expression")?;
                Ok(inner)
            }
            Token::LeftBracket => {
                self.advance();
                if self.check(&Token::RightBracket) {
                    return Err(self.error(
                        ErrorCode::ExpectedExpression,
                        "An array needs at least one element",
                    ));
                }
                self.interp.lists.push_start()?;
                loop {
                    let element = self.parse_expression()?;
                    self.interp.lists.push(element)?;
                    if !self.match_token(&Token::Comma) {
                        break;
                    }
                }
                self.expect(&Token::RightBracket, "Expected ']' after array elements")?;
                let concat = self.builtin(RoutineKind::Function, "CONCAT")?;
                self.interp
                    .new_symbol(NewSymbol::FuncCall(CallTarget::Builtin(concat)))
            }
            Token::LeftBrace => {
                self.advance();
                self.parse_list_literal()
            }
            Token::Ampersand => {
                self.advance();
                let name = self.expect_identifier("a routine name after '&'")?;
                let target = self.routine_pointer(&name)?;
                self.interp.new_symbol(NewSymbol::FuncPtr(target))
            }
            other => Err(self.error(
                ErrorCode::ExpectedExpression,
                format!("Expected expression, found {}", other),
            )),
        }
    }

    fn parse_postfix_expression(&mut self, lvalue: bool) -> Result<SymbolId> {
        let name = self.expect_identifier("a name")?;

        let target = if !lvalue && self.check(&Token::LeftParen) && !self.has_value(&name) {
            match self.function_target(&name) {
                Some(target) => {
                    self.advance();
                    self.parse_argument_list(&Token::RightParen)?;
                    Some(self.interp.new_symbol(NewSymbol::FuncCall(target))?)
                }
                None => None,
            }
        } else {
            None
        };

        // an unknown name with subscripts is resolved when it runs
        let deferred = target.is_none()
            && !lvalue
            && self.check(&Token::LeftParen)
            && !self.has_value(&name)
            && !name.starts_with(['!', '#']);
        let base = match target {
            Some(call) => Some(call),
            None if deferred => None,
            None => Some(self.interp.find_var(&name).map_err(|e| e.or_span(self.previous_span()))?),
        };

        let mut sections = 0;
        loop {
            if self.match_token(&Token::LeftParen) {
                self.parse_argument_list(&Token::RightParen)?;
            } else if self.check(&Token::Dot) {
                self.advance();
                let tag = self.expect_identifier("a tag name after '.'")?;
                self.interp.lists.push_start()?;
                self.interp.lists.push_name(tag)?;
            } else {
                break;
            }
            sections += 1;
        }

        match base {
            Some(base) if sections == 0 => Ok(base),
            Some(target) => self
                .interp
                .new_symbol(NewSymbol::Extract { target, sections }),
            None => self
                .interp
                .new_symbol(NewSymbol::PreExtract { name, sections }),
        }
    }

    fn parse_argument_item(&mut self) -> Result<()> {
        // /KEY sets a mode keyword
        if self.match_token(&Token::Slash) {
            let name = self.expect_identifier("a keyword name after '/'")?;
            let one = self.interp.new_symbol(NewSymbol::Number(Scalar::Long(1)))?;
            let keyword = self.interp.new_symbol(NewSymbol::Keyword { name, value: one })?;
            return self.interp.lists.push(keyword);
        }

        // KEY=value
        if let (Some(Token::Identifier(name)), Some(Token::Assign)) =
            (self.peek(), self.peek_ahead(1))
        {
            let name = name.clone();
            self.advance();
            self.advance();
            let value = self.parse_expression()?;
            let keyword = self.interp.new_symbol(NewSymbol::Keyword { name, value })?;
            return self.interp.lists.push(keyword);
        }

        // ranges: *, *-n, a:b, a:*, a:*-n, each with optional :+ and :>n
        let start = if self.check(&Token::Star) {
            self.advance();
            let offset = if self.match_token(&Token::Minus) {
                Some(self.parse_additive_expression()?)
            } else {
                None
            };
            if offset.is_none() && (!self.check(&Token::Colon) || self.at_range_suffix()) {
                let flags = self.parse_range_flags()?;
                let whole = self.interp.new_symbol(NewSymbol::PreRange {
                    start: None,
                    end: Some(PreRangeEnd::FromEnd(None)),
                    flags,
                })?;
                return self.interp.lists.push(whole);
            }
            RangeStart::FromEnd(offset)
        } else {
            RangeStart::Index(self.parse_expression()?)
        };

        let item = if self.match_token(&Token::Colon) {
            let end = self.parse_range_end()?;
            let flags = self.parse_range_flags()?;
            self.interp.new_symbol(NewSymbol::PreRange {
                start: Some(start.into()),
                end: Some(end),
                flags,
            })?
        } else {
            match start {
                RangeStart::Index(expr) => expr,
                RangeStart::FromEnd(offset) => self.interp.new_symbol(NewSymbol::PreRange {
                    start: Some(PreRangeEnd::FromEnd(offset)),
                    end: None,
                    flags: RangeFlags::default(),
                })?,
            }
        };
        self.interp.lists.push(item)
    }

    fn parse_argument_list(&mut self, close: &Token) -> Result<()> {
        self.interp.lists.push_start()?;
        if self.match_token(close) {
            return Ok(());
        }
        loop {
            self.parse_argument_item()?;
            if !self.match_token(&Token::Comma) {
                break;
            }
        }
        self.expect(close, &format!("Expected '{}' after arguments", close))?;
        Ok(())
    }
}

/// First end of a subscript range before the `:` is seen.
enum RangeStart {
    Index(SymbolId),
    FromEnd(Option<SymbolId>),
}

impl From<RangeStart> for PreRangeEnd {
    fn from(start: RangeStart) -> Self {
        match start {
            RangeStart::Index(id) => PreRangeEnd::Index(id),
            RangeStart::FromEnd(offset) => PreRangeEnd::FromEnd(offset),
        }
    }
}

fn negate_literal(value: Scalar) -> Scalar {
    match value {
        Scalar::Byte(v) => Scalar::Word(-(v as i16)),
        Scalar::Word(v) => Scalar::Word(v.wrapping_neg()),
        Scalar::Long(v) => Scalar::Long(v.wrapping_neg()),
        Scalar::Int64(v) => Scalar::Int64(v.wrapping_neg()),
        Scalar::Float(v) => Scalar::Float(-v),
        Scalar::Double(v) => Scalar::Double(-v),
    }
}

impl<'a> Parser<'a> {
    fn binary(&mut self, op: BinaryOp, lhs: SymbolId, rhs: SymbolId) -> Result<SymbolId> {
        self.interp.new_symbol(NewSymbol::BinOp { op, lhs, rhs })
    }

    fn unary(&mut self, builtin: &str, operand: SymbolId) -> Result<SymbolId> {
        let index = self.builtin(RoutineKind::Function, builtin)?;
        self.interp.lists.push_start()?;
        self.interp.lists.push(operand)?;
        self.interp
            .new_symbol(NewSymbol::FuncCall(CallTarget::Builtin(index)))
    }

    /// Registry index of a built-in that the grammar relies on.
    pub(crate) fn builtin(&self, kind: RoutineKind, name: &str) -> Result<usize> {
        self.interp.builtins.find(kind, name).ok_or_else(|| {
            LuxError::new(
                ErrorCode::UndefinedRoutine,
                format!("Built-in {} {} is missing", kind.name(), name),
            )
        })
    }

    /// Whether `name` is a variable with a value in the current scope.
    fn has_value(&self, name: &str) -> bool {
        self.interp.lookup_var(name).is_some_and(|id| {
            let class = self.interp.store[id].class();
            class != SymbolClass::Undefined && class != SymbolClass::Unused
        })
    }

    /// A user routine of `kind` that is defined, being defined or deferred.
    pub(crate) fn known_routine(&self, kind: RoutineKind, name: &str) -> Option<SymbolId> {
        let space = match kind {
            RoutineKind::Subroutine => NameSpace::Subroutine,
            RoutineKind::Function => NameSpace::Function,
            RoutineKind::Block => NameSpace::Block,
        };
        let id = self.interp.names.lookup(space, name, Context::Global)?;
        match &self.interp.store[id].payload {
            Payload::Routine(k, _) | Payload::Deferred(k, _) if *k == kind => Some(id),
            _ => None,
        }
    }

    /// Callee for `name(...)`: a user function first, then a built-in.
    fn function_target(&self, name: &str) -> Option<CallTarget> {
        if let Some(id) = self.known_routine(RoutineKind::Function, name) {
            return Some(CallTarget::User(id));
        }
        self.interp
            .builtins
            .find(RoutineKind::Function, name)
            .map(CallTarget::Builtin)
    }

    /// Target of `&NAME`. A name that matches nothing is retried once as
    /// `NAME_F`.
    fn routine_pointer(&self, name: &str) -> Result<RoutineRef> {
        if let Some(target) = self
            .pointer_target(name)
            .or_else(|| self.pointer_target(&format!("{}_F", name)))
        {
            return Ok(target);
        }
        Err(LuxError::at(
            ErrorCode::UndefinedRoutine,
            format!("No routine named {}", name),
            self.previous_span(),
        ))
    }

    fn pointer_target(&self, name: &str) -> Option<RoutineRef> {
        const KINDS: [RoutineKind; 3] = [
            RoutineKind::Function,
            RoutineKind::Subroutine,
            RoutineKind::Block,
        ];
        if let Some(id) = KINDS.iter().find_map(|&kind| self.known_routine(kind, name)) {
            return Some(RoutineRef::User(id));
        }
        KINDS[..2].iter().find_map(|&kind| {
            self.interp
                .builtins
                .find(kind, name)
                .map(|index| RoutineRef::Builtin(kind, index))
        })
    }

    /// `{a, b}` or `{KEY=a, b}`; the opening brace is consumed.
    fn parse_list_literal(&mut self) -> Result<SymbolId> {
        self.interp.lists.push_start()?;
        let mut keyed = false;
        if !self.check(&Token::RightBrace) {
            loop {
                if let (Some(Token::Identifier(key)), Some(Token::Assign)) =
                    (self.peek(), self.peek_ahead(1))
                {
                    let key = key.clone();
                    self.advance();
                    self.advance();
                    self.interp.lists.push_name(key)?;
                    keyed = true;
                }
                let value = self.parse_expression()?;
                self.interp.lists.push(value)?;
                if !self.match_token(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RightBrace, "Expected '}' after list members")?;
        if keyed {
            self.interp.new_symbol(NewSymbol::PreList)
        } else {
            self.interp.new_symbol(NewSymbol::PreCList)
        }
    }

    /// `:+` or `:>` follows. A `+` only counts when nothing but a closing
    /// token comes after it, so `a:+5` stays an ordinary range.
    fn at_range_suffix(&self) -> bool {
        if !self.check(&Token::Colon) {
            return false;
        }
        match self.peek_ahead(1) {
            Some(Token::Greater) => true,
            Some(Token::Plus) => matches!(
                self.peek_ahead(2),
                Some(Token::Comma | Token::RightParen | Token::RightBracket | Token::Colon)
            ),
            _ => false,
        }
    }

    fn parse_range_flags(&mut self) -> Result<RangeFlags> {
        let mut flags = RangeFlags::default();
        while self.at_range_suffix() {
            self.advance();
            if self.match_token(&Token::Plus) {
                flags.sum = true;
                continue;
            }
            self.advance();
            let axis = match self.peek() {
                Some(Token::Integer(value)) => u8::try_from(value.as_i64()).ok(),
                _ => None,
            };
            let Some(axis) = axis else {
                return Err(self.error(
                    ErrorCode::InvalidRange,
                    "Expected an axis number after ':>'",
                ));
            };
            self.advance();
            flags.redirect = Some(axis);
        }
        Ok(flags)
    }

    fn parse_range_end(&mut self) -> Result<PreRangeEnd> {
        if self.match_token(&Token::Star) {
            let offset = if self.match_token(&Token::Minus) {
                Some(self.parse_additive_expression()?)
            } else {
                None
            };
            return Ok(PreRangeEnd::FromEnd(offset));
        }
        Ok(PreRangeEnd::Index(self.parse_expression()?))
    }
}
