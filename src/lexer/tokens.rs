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

//! Token definitions for the LUX language.

use logos::{Lexer, Logos};

use crate::symbols::Scalar;

/// A token in the LUX language.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\f]+")]
#[logos(skip r";[^\n]*")]
pub enum Token {
    // Literals
    /// Integer literal, typed by its suffix (`B`, `W`, `L`, `Q`).
    #[regex(r"[0-9]+[bBwWlLqQ]?", integer)]
    #[regex(r"0[xX][0-9a-fA-F]+", hex_integer)]
    Integer(Scalar),
    /// Real literal; a `D` exponent or suffix makes it a double.
    #[regex(r"[0-9]+\.[0-9]*([eEdD][+-]?[0-9]+)?[dD]?", real)]
    #[regex(r"\.[0-9]+([eEdD][+-]?[0-9]+)?[dD]?", real)]
    #[regex(r"[0-9]+[eEdD][+-]?[0-9]+[dD]?", real)]
    #[regex(r"[0-9]+[dD]", real)]
    Real(Scalar),
    /// Imaginary literal (`2i`, `1.5j`).
    #[regex(r"[0-9]+(\.[0-9]*)?([eE][+-]?[0-9]+)?[iIjJ]", imaginary)]
    Imaginary(f64),
    /// String literal in single or double quotes.
    #[regex(r"'([^'\n]|'')*'", |lex| unquote(lex.slice()))]
    #[regex(r#""([^"\n]|"")*""#, |lex| unquote(lex.slice()))]
    String(String),
    /// Identifier, folded to upper case. Sigil names (`!X`, `#X`, `$X`) may
    /// start with a digit after the sigil.
    #[regex(r"[A-Za-z_][A-Za-z0-9_$]*", |lex| lex.slice().to_ascii_uppercase())]
    #[regex(r"[!#$][A-Za-z0-9_$]+", |lex| lex.slice().to_ascii_uppercase())]
    Identifier(String),
    /// `@file`: compile and execute a file.
    #[regex(r"@[^@ \t\r\n;,][^ \t\r\n;,]*", |lex| lex.slice()[1..].to_string())]
    Include(String),
    /// `@@file`: record the routines of a file for deferred compilation.
    #[regex(r"@@[^ \t\r\n;,]+", |lex| lex.slice()[2..].to_string())]
    IncludeReport(String),

    // Statement keywords
    #[token("if", ignore(ascii_case))]
    If,
    #[token("then", ignore(ascii_case))]
    Then,
    #[token("else", ignore(ascii_case))]
    Else,
    #[token("for", ignore(ascii_case))]
    For,
    #[token("do", ignore(ascii_case))]
    Do,
    #[token("while", ignore(ascii_case))]
    While,
    #[token("repeat", ignore(ascii_case))]
    Repeat,
    #[token("until", ignore(ascii_case))]
    Until,
    #[token("begin", ignore(ascii_case))]
    Begin,
    #[token("end", ignore(ascii_case))]
    End,
    #[token("case", ignore(ascii_case))]
    Case,
    #[token("ncase", ignore(ascii_case))]
    NCase,
    #[token("endcase", ignore(ascii_case))]
    EndCase,
    #[token("return", ignore(ascii_case))]
    Return,
    #[token("break", ignore(ascii_case))]
    Break,
    #[token("continue", ignore(ascii_case))]
    Continue,
    #[token("run", ignore(ascii_case))]
    Run,

    // Routine keywords
    #[token("subr", ignore(ascii_case))]
    #[token("subroutine", ignore(ascii_case))]
    Subr,
    #[token("endsubr", ignore(ascii_case))]
    EndSubr,
    #[token("func", ignore(ascii_case))]
    #[token("function", ignore(ascii_case))]
    Func,
    #[token("endfunc", ignore(ascii_case))]
    EndFunc,
    #[token("block", ignore(ascii_case))]
    Block,
    #[token("endblock", ignore(ascii_case))]
    EndBlock,

    // Word operators
    #[token("eq", ignore(ascii_case))]
    Eq,
    #[token("ne", ignore(ascii_case))]
    Ne,
    #[token("lt", ignore(ascii_case))]
    Lt,
    #[token("le", ignore(ascii_case))]
    Le,
    #[token("gt", ignore(ascii_case))]
    Gt,
    #[token("ge", ignore(ascii_case))]
    Ge,
    #[token("and", ignore(ascii_case))]
    And,
    #[token("or", ignore(ascii_case))]
    Or,
    #[token("xor", ignore(ascii_case))]
    Xor,
    #[token("andif", ignore(ascii_case))]
    AndIf,
    #[token("orif", ignore(ascii_case))]
    OrIf,
    #[token("mod", ignore(ascii_case))]
    Mod,
    #[token("not", ignore(ascii_case))]
    Not,

    // Symbol operators
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("^")]
    Caret,
    #[token("=")]
    Assign,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    StarAssign,
    #[token("/=")]
    SlashAssign,
    #[token("==")]
    EqualEqual,
    #[token("!=")]
    BangEqual,
    #[token("<")]
    Less,
    #[token("<=")]
    LessEqual,
    #[token(">")]
    Greater,
    #[token(">=")]
    GreaterEqual,
    #[token("&")]
    Ampersand,

    // Delimiters
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("[")]
    LeftBracket,
    #[token("]")]
    RightBracket,
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,

    /// Statement separator.
    #[token("\n")]
    Newline,
}

fn integer(lex: &mut Lexer<Token>) -> Option<Scalar> {
    let slice = lex.slice();
    let (digits, suffix) = match slice.chars().last() {
        Some(c) if c.is_ascii_alphabetic() => (&slice[..slice.len() - 1], Some(c.to_ascii_uppercase())),
        _ => (slice, None),
    };
    let value: i64 = digits.parse().ok()?;
    match suffix {
        Some('B') => u8::try_from(value).ok().map(Scalar::Byte),
        Some('W') => i16::try_from(value).ok().map(Scalar::Word),
        Some('L') => i32::try_from(value).ok().map(Scalar::Long),
        Some('Q') => Some(Scalar::Int64(value)),
        _ => Some(
            i32::try_from(value)
                .map(Scalar::Long)
                .unwrap_or(Scalar::Int64(value)),
        ),
    }
}

fn hex_integer(lex: &mut Lexer<Token>) -> Option<Scalar> {
    let value = i64::from_str_radix(&lex.slice()[2..], 16).ok()?;
    Some(
        i32::try_from(value)
            .map(Scalar::Long)
            .unwrap_or(Scalar::Int64(value)),
    )
}

fn real(lex: &mut Lexer<Token>) -> Option<Scalar> {
    let slice = lex.slice();
    let double = slice.contains(['d', 'D']);
    let normalized: String = slice
        .trim_end_matches(['d', 'D'])
        .chars()
        .map(|c| if c == 'd' || c == 'D' { 'e' } else { c })
        .collect();
    let value: f64 = normalized.parse().ok()?;
    Some(if double {
        Scalar::Double(value)
    } else {
        Scalar::Float(value as f32)
    })
}

fn imaginary(lex: &mut Lexer<Token>) -> Option<f64> {
    let slice = lex.slice();
    slice[..slice.len() - 1].parse().ok()
}

fn unquote(slice: &str) -> String {
    let quote = &slice[..1];
    let doubled = quote.repeat(2);
    slice[1..slice.len() - 1].replace(&doubled, quote)
}

impl Token {
    /// Tokens that open a construct closed by a later end keyword.
    pub fn opens_block(&self) -> bool {
        matches!(
            self,
            Token::Begin | Token::Case | Token::NCase | Token::Subr | Token::Func | Token::Block
        )
    }

    /// End keywords that close a construct.
    pub fn closes_block(&self) -> bool {
        matches!(
            self,
            Token::End | Token::EndCase | Token::EndSubr | Token::EndFunc | Token::EndBlock
        )
    }

    /// Whether this token terminates a statement.
    pub fn is_separator(&self) -> bool {
        matches!(self, Token::Newline)
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Integer(value) | Token::Real(value) => write!(f, "{}", value),
            Token::Imaginary(value) => write!(f, "{}i", value),
            Token::String(s) => write!(f, "'{}'", s),
            Token::Identifier(name) => write!(f, "{}", name),
            Token::Include(file) => write!(f, "@{}", file),
            Token::IncludeReport(file) => write!(f, "@@{}", file),
            Token::If => write!(f, "IF"),
            Token::Then => write!(f, "THEN"),
            Token::Else => write!(f, "ELSE"),
            Token::For => write!(f, "FOR"),
            Token::Do => write!(f, "DO"),
            Token::While => write!(f, "WHILE"),
            Token::Repeat => write!(f, "REPEAT"),
            Token::Until => write!(f, "UNTIL"),
            Token::Begin => write!(f, "BEGIN"),
            Token::End => write!(f, "END"),
            Token::Case => write!(f, "CASE"),
            Token::NCase => write!(f, "NCASE"),
            Token::EndCase => write!(f, "ENDCASE"),
            Token::Return => write!(f, "RETURN"),
            Token::Break => write!(f, "BREAK"),
            Token::Continue => write!(f, "CONTINUE"),
            Token::Run => write!(f, "RUN"),
            Token::Subr => write!(f, "SUBR"),
            Token::EndSubr => write!(f, "ENDSUBR"),
            Token::Func => write!(f, "FUNC"),
            Token::EndFunc => write!(f, "ENDFUNC"),
            Token::Block => write!(f, "BLOCK"),
            Token::EndBlock => write!(f, "ENDBLOCK"),
            Token::Eq => write!(f, "EQ"),
            Token::Ne => write!(f, "NE"),
            Token::Lt => write!(f, "LT"),
            Token::Le => write!(f, "LE"),
            Token::Gt => write!(f, "GT"),
            Token::Ge => write!(f, "GE"),
            Token::And => write!(f, "AND"),
            Token::Or => write!(f, "OR"),
            Token::Xor => write!(f, "XOR"),
            Token::AndIf => write!(f, "ANDIF"),
            Token::OrIf => write!(f, "ORIF"),
            Token::Mod => write!(f, "MOD"),
            Token::Not => write!(f, "NOT"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Caret => write!(f, "^"),
            Token::Assign => write!(f, "="),
            Token::PlusAssign => write!(f, "+="),
            Token::MinusAssign => write!(f, "-="),
            Token::StarAssign => write!(f, "*="),
            Token::SlashAssign => write!(f, "/="),
            Token::EqualEqual => write!(f, "=="),
            Token::BangEqual => write!(f, "!="),
            Token::Less => write!(f, "<"),
            Token::LessEqual => write!(f, "<="),
            Token::Greater => write!(f, ">"),
            Token::GreaterEqual => write!(f, ">="),
            Token::Ampersand => write!(f, "&"),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::LeftBracket => write!(f, "["),
            Token::RightBracket => write!(f, "]"),
            Token::LeftBrace => write!(f, "{{"),
            Token::RightBrace => write!(f, "}}"),
            Token::Comma => write!(f, ","),
            Token::Colon => write!(f, ":"),
            Token::Dot => write!(f, "."),
            Token::Newline => write!(f, "newline"),
        }
    }
}
