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

//! Lexer module for the LUX interpreter.
//!
//! This module tokenizes LUX source code into a stream of tokens.
//! It handles:
//! - Case-insensitive keywords and upper-cased identifiers
//! - Typed number literals (suffixes, hex, doubles, imaginary numbers)
//! - Single and double quoted strings
//! - `@file` and `@@file` inclusion
//! - Comments (starting with `;`)
//!
//! Newlines separate statements, except inside `()`, `[]` and `{}`.

mod tokens;

pub use tokens::Token;

use logos::Logos;

use crate::error::{ErrorCode, LuxError, Result, Span};

/// Tokenize LUX source code.
pub fn tokenize(source: &str) -> Result<Vec<(Token, Span)>> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);
    let mut depth = 0usize;

    while let Some(result) = lexer.next() {
        let span = Span::from(lexer.span());
        match result {
            Ok(Token::Newline) if depth > 0 => {}
            Ok(token) => {
                match token {
                    Token::LeftParen | Token::LeftBracket | Token::LeftBrace => depth += 1,
                    Token::RightParen | Token::RightBracket | Token::RightBrace => {
                        depth = depth.saturating_sub(1)
                    }
                    _ => {}
                }
                tokens.push((token, span));
            }
            Err(()) => return Err(lex_error(lexer.slice(), span)),
        }
    }

    Ok(tokens)
}

fn lex_error(slice: &str, span: Span) -> LuxError {
    match slice.chars().next() {
        Some('\'') | Some('"') => LuxError::at(
            ErrorCode::UnterminatedString,
            "Unterminated string literal",
            span,
        )
        .with_hint("strings must be closed on the same line"),
        Some(c) if c.is_ascii_digit() || c == '.' => LuxError::at(
            ErrorCode::InvalidNumber,
            format!("Invalid number literal '{}'", slice),
            span,
        ),
        _ => LuxError::at(
            ErrorCode::InvalidCharacter,
            format!("Unexpected character '{}'", slice),
            span,
        ),
    }
}

/// Whether `source` ends inside an open construct (an unclosed bracket or a
/// `BEGIN`, `CASE` or routine definition without its end keyword).
///
/// Text that does not tokenize is reported as complete so that executing it
/// surfaces the lexical error.
pub fn needs_more_input(source: &str) -> bool {
    let mut blocks = 0i64;
    let mut brackets = 0i64;
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        let Ok(token) = result else {
            return false;
        };
        match token {
            Token::LeftParen | Token::LeftBracket | Token::LeftBrace => brackets += 1,
            Token::RightParen | Token::RightBracket | Token::RightBrace => brackets -= 1,
            ref t if t.opens_block() => blocks += 1,
            ref t if t.closes_block() => blocks -= 1,
            _ => {}
        }
    }

    blocks > 0 || brackets > 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::Scalar;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|(t, _)| t)
            .collect()
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenize("").unwrap().is_empty());
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(
            kinds("if Then ELSE endFunc"),
            vec![Token::If, Token::Then, Token::Else, Token::EndFunc]
        );
    }

    #[test]
    fn test_identifiers_are_upper_cased() {
        assert_eq!(
            kinds("x my_var !errors #pi"),
            vec![
                Token::Identifier("X".to_string()),
                Token::Identifier("MY_VAR".to_string()),
                Token::Identifier("!ERRORS".to_string()),
                Token::Identifier("#PI".to_string()),
            ]
        );
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        assert_eq!(kinds("iffy"), vec![Token::Identifier("IFFY".to_string())]);
    }

    #[test]
    fn test_integer_suffixes() {
        assert_eq!(
            kinds("1 2b 3w 4l 5q 0x1F"),
            vec![
                Token::Integer(Scalar::Long(1)),
                Token::Integer(Scalar::Byte(2)),
                Token::Integer(Scalar::Word(3)),
                Token::Integer(Scalar::Long(4)),
                Token::Integer(Scalar::Int64(5)),
                Token::Integer(Scalar::Long(31)),
            ]
        );
    }

    #[test]
    fn test_large_integer_becomes_int64() {
        assert_eq!(
            kinds("5000000000"),
            vec![Token::Integer(Scalar::Int64(5_000_000_000))]
        );
    }

    #[test]
    fn test_real_literals() {
        assert_eq!(
            kinds("1.5 2d 3.0d0 .25"),
            vec![
                Token::Real(Scalar::Float(1.5)),
                Token::Real(Scalar::Double(2.0)),
                Token::Real(Scalar::Double(3.0)),
                Token::Real(Scalar::Float(0.25)),
            ]
        );
    }

    #[test]
    fn test_imaginary_literal() {
        assert_eq!(kinds("2i"), vec![Token::Imaginary(2.0)]);
    }

    #[test]
    fn test_strings_with_doubled_quotes() {
        assert_eq!(
            kinds(r#"'it''s' "say ""hi""""#),
            vec![
                Token::String("it's".to_string()),
                Token::String("say \"hi\"".to_string()),
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("x = 1 ; the answer"),
            vec![
                Token::Identifier("X".to_string()),
                Token::Assign,
                Token::Integer(Scalar::Long(1)),
            ]
        );
    }

    #[test]
    fn test_newline_suppressed_inside_brackets() {
        let tokens = kinds("f(1,\n2)\nx");
        assert_eq!(
            tokens.iter().filter(|t| **t == Token::Newline).count(),
            1
        );
    }

    #[test]
    fn test_include_tokens() {
        assert_eq!(
            kinds("@setup.lux @@lib"),
            vec![
                Token::Include("setup.lux".to_string()),
                Token::IncludeReport("lib".to_string()),
            ]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("x = 'abc").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnterminatedString);
    }

    #[test]
    fn test_invalid_character() {
        let err = tokenize("x = ?").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidCharacter);
        assert_eq!(err.span, Some(Span::new(4, 5)));
    }

    #[test]
    fn test_needs_more_input() {
        assert!(needs_more_input("func f(x)"));
        assert!(needs_more_input("print, (1 +"));
        assert!(!needs_more_input("func f(x)\nreturn, x\nendfunc"));
        assert!(!needs_more_input("x = 1"));
    }
}
