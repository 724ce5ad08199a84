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

//! Parser helper methods for token stream navigation and error handling.
//!
//! This module provides utility methods for the parser including:
//! - Token stream navigation (peek, advance, check)
//! - Token matching and expectation
//! - Statement boundaries
//! - Error creation

use super::Parser;
use crate::error::{ErrorCode, LuxError, Result, Span};
use crate::lexer::Token;

/// Trait for parser helper operations.
pub trait ParserHelpers {
    /// Check if we've reached the end of the token stream.
    fn is_at_end(&self) -> bool;

    /// Peek at the current token without advancing.
    fn peek(&self) -> Option<&Token>;

    /// Peek at the current token's span.
    fn peek_span(&self) -> Option<Span>;

    /// Peek at a token ahead by n positions.
    fn peek_ahead(&self, n: usize) -> Option<&Token>;

    /// Get the previous token's span (for error reporting).
    fn previous_span(&self) -> Span;

    /// Advance to the next token and return the current one.
    fn advance(&mut self) -> Option<(Token, Span)>;

    /// Check if the current token matches the expected type.
    fn check(&self, expected: &Token) -> bool;

    /// Check if the current token matches any of the expected types.
    fn check_any(&self, expected: &[Token]) -> bool;

    /// Consume the current token if it matches the expected type.
    fn match_token(&mut self, expected: &Token) -> bool;

    /// Expect the current token to match, or return an error.
    fn expect(&mut self, expected: &Token, message: &str) -> Result<Span>;

    /// Expect an identifier and return its (upper-cased) name.
    fn expect_identifier(&mut self, what: &str) -> Result<String>;

    /// Skip statement separators.
    fn skip_newlines(&mut self);

    /// Whether the current token ends a statement.
    fn at_statement_end(&self) -> bool;

    /// Create an error at the current position.
    fn error(&self, code: ErrorCode, message: impl Into<String>) -> LuxError;
}

impl<'a> ParserHelpers for Parser<'a> {
    fn is_at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position).map(|(t, _)| t)
    }

    fn peek_span(&self) -> Option<Span> {
        self.tokens.get(self.position).map(|(_, s)| s.clone())
    }

    fn peek_ahead(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n).map(|(t, _)| t)
    }

    fn previous_span(&self) -> Span {
        if self.position > 0 {
            self.tokens[self.position - 1].1.clone()
        } else if let Some((_, span)) = self.tokens.first() {
            span.clone()
        } else {
            Span::new(0, 0)
        }
    }

    fn advance(&mut self) -> Option<(Token, Span)> {
        let result = self.tokens.get(self.position).cloned();
        if result.is_some() {
            self.position += 1;
        }
        result
    }

    fn check(&self, expected: &Token) -> bool {
        self.peek()
            .is_some_and(|t| std::mem::discriminant(t) == std::mem::discriminant(expected))
    }

    fn check_any(&self, expected: &[Token]) -> bool {
        expected.iter().any(|e| self.check(e))
    }

    fn match_token(&mut self, expected: &Token) -> bool {
        if self.check(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token, message: &str) -> Result<Span> {
        if self.check(expected) {
            if let Some((_, span)) = self.advance() {
                return Ok(span);
            }
        }
        Err(self.unexpected(message))
    }

    fn expect_identifier(&mut self, what: &str) -> Result<String> {
        match self.peek() {
            Some(Token::Identifier(name)) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            None => Err(self.unexpected(&format!("Expected {}", what))),
            Some(found) => Err(self.error(
                ErrorCode::ExpectedIdentifier,
                format!("Expected {}, found {}", what, found),
            )),
        }
    }

    fn skip_newlines(&mut self) {
        while self.check(&Token::Newline) {
            self.advance();
        }
    }

    fn at_statement_end(&self) -> bool {
        match self.peek() {
            None => true,
            Some(token) => {
                token.is_separator()
                    || token.closes_block()
                    || matches!(token, Token::Else | Token::Until)
            }
        }
    }

    fn error(&self, code: ErrorCode, message: impl Into<String>) -> LuxError {
        let span = self.peek_span().unwrap_or_else(|| self.previous_span());
        LuxError::at(code, message, span)
    }
}

impl<'a> Parser<'a> {
    /// Error for an unexpected token, or for running out of input.
    pub(crate) fn unexpected(&self, message: &str) -> LuxError {
        match self.peek() {
            Some(found) => self.error(
                ErrorCode::UnexpectedToken,
                format!("{}, found {}", message, found),
            ),
            None => LuxError::at(
                ErrorCode::UnexpectedEndOfInput,
                format!("{}, found end of input", message),
                self.previous_span(),
            ),
        }
    }

    /// Require the end of a statement: a separator, an end keyword or the
    /// end of input.
    pub(crate) fn expect_statement_end(&self) -> Result<()> {
        if self.at_statement_end() {
            Ok(())
        } else {
            Err(self.unexpected("Expected end of statement"))
        }
    }
}
