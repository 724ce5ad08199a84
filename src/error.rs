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

//! Error types for the LUX interpreter core.
//!
//! Every fallible operation of the symbol table, the parser and the
//! execution engine returns a [`LuxError`]. Errors abort the current
//! statement; the caller runs the mark/sweep unwind as its cleanup action.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use thiserror::Error;

/// A source span representing a range in the source code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Span {
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
}

impl Span {
    /// Create a new span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Get the length of this span.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if the span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Merge two spans into one that covers both.
    pub fn merge(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

impl From<Span> for Range<usize> {
    fn from(span: Span) -> Self {
        span.start..span.end
    }
}

/// Error codes of the interpreter core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Lexical errors (E001-E030)
    InvalidCharacter,
    UnterminatedString,
    InvalidNumber,

    // Syntax errors (E100-E160)
    UnexpectedToken,
    UnexpectedEndOfInput,
    ExpectedExpression,
    ExpectedStatement,
    ExpectedIdentifier,
    InvalidAssignmentTarget,
    MismatchedEnd,
    NestedRoutineDefinition,
    DuplicateParameterName,
    BreakOutsideLoop,
    ContinueOutsideLoop,
    InvalidRange,

    // Name and visibility errors (E200-E240)
    UndefinedVariable,
    UndefinedSystemVariable,
    ProtectedConstant,
    UndefinedRoutine,
    WrongNumberOfArguments,
    UnknownKeyword,
    AmbiguousKeyword,
    SymbolOutOfBounds,

    // Resource exhaustion (E300-E310)
    OutOfSymbols,
    ListStackOverflow,
    ListStackUnderflow,
    MarkStackOverflow,
    AllocationFailed,
    IncludeTooDeep,

    // Type/class mismatches and evaluation errors (E400-E420)
    TypeMismatch,
    InvalidClass,
    NotScalar,
    IndexOutOfBounds,
    DivisionByZero,
    NoReturnValue,
    IllegalOperation,
    DimensionMismatch,

    // Inclusion errors (E500-E510)
    FileNotFound,
    FileReadError,
    RoutineNotInFile,

    // Internal state errors (E900-E910)
    MarkStackCorrupt,
    UnexpectedSentinel,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl ErrorCode {
    /// Get the numeric code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::InvalidCharacter => "E001",
            ErrorCode::UnterminatedString => "E010",
            ErrorCode::InvalidNumber => "E020",

            ErrorCode::UnexpectedToken => "E100",
            ErrorCode::UnexpectedEndOfInput => "E101",
            ErrorCode::ExpectedExpression => "E103",
            ErrorCode::ExpectedStatement => "E104",
            ErrorCode::ExpectedIdentifier => "E105",
            ErrorCode::InvalidAssignmentTarget => "E109",
            ErrorCode::MismatchedEnd => "E130",
            ErrorCode::NestedRoutineDefinition => "E131",
            ErrorCode::DuplicateParameterName => "E135",
            ErrorCode::BreakOutsideLoop => "E144",
            ErrorCode::ContinueOutsideLoop => "E145",
            ErrorCode::InvalidRange => "E150",

            ErrorCode::UndefinedVariable => "E200",
            ErrorCode::UndefinedSystemVariable => "E201",
            ErrorCode::ProtectedConstant => "E202",
            ErrorCode::UndefinedRoutine => "E220",
            ErrorCode::WrongNumberOfArguments => "E222",
            ErrorCode::UnknownKeyword => "E223",
            ErrorCode::AmbiguousKeyword => "E224",
            ErrorCode::SymbolOutOfBounds => "E230",

            ErrorCode::OutOfSymbols => "E300",
            ErrorCode::ListStackOverflow => "E301",
            ErrorCode::ListStackUnderflow => "E302",
            ErrorCode::MarkStackOverflow => "E303",
            ErrorCode::AllocationFailed => "E304",
            ErrorCode::IncludeTooDeep => "E305",

            ErrorCode::TypeMismatch => "E400",
            ErrorCode::InvalidClass => "E401",
            ErrorCode::NotScalar => "E402",
            ErrorCode::IndexOutOfBounds => "E403",
            ErrorCode::DivisionByZero => "E404",
            ErrorCode::NoReturnValue => "E405",
            ErrorCode::IllegalOperation => "E406",
            ErrorCode::DimensionMismatch => "E407",

            ErrorCode::FileNotFound => "E500",
            ErrorCode::FileReadError => "E501",
            ErrorCode::RoutineNotInFile => "E502",

            ErrorCode::MarkStackCorrupt => "E900",
            ErrorCode::UnexpectedSentinel => "E901",
        }
    }

    /// Whether the condition leaves the interpreter in a state that the
    /// embedding loop must not continue from.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ErrorCode::MarkStackCorrupt)
    }

    /// Whether more input could turn the failing text into a valid statement.
    pub fn is_incomplete_input(&self) -> bool {
        matches!(self, ErrorCode::UnexpectedEndOfInput)
    }
}

/// An interpreter error, optionally tied to a source location.
#[derive(Debug, Error)]
#[error("[{code}] {message}")]
pub struct LuxError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// The source span where the error occurred, if known.
    pub span: Option<Span>,
    /// Optional hint for fixing the error.
    pub hint: Option<String>,
}

impl LuxError {
    /// Create an error without a source location (runtime errors).
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            span: None,
            hint: None,
        }
    }

    /// Create an error at a source location.
    pub fn at(code: ErrorCode, message: impl Into<String>, span: Span) -> Self {
        Self {
            code,
            message: message.into(),
            span: Some(span),
            hint: None,
        }
    }

    /// Add a hint to this error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Attach a span unless the error already carries one.
    pub fn or_span(mut self, span: Span) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }

    /// Get the error code string.
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }
}

/// Result type for interpreter operations.
pub type Result<T> = std::result::Result<T, LuxError>;

/// Source location with line and column information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed).
    pub column: usize,
    /// The content of the line.
    pub line_content: String,
}

impl SourceLocation {
    /// Calculate line and column from a byte offset in source code.
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let before = &source[..offset];

        let line = before.chars().filter(|&c| c == '\n').count() + 1;

        let last_newline = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = before[last_newline..].chars().count() + 1;

        let line_end = source[offset..]
            .find('\n')
            .map(|i| offset + i)
            .unwrap_or(source.len());
        let line_content = source[last_newline..line_end].to_string();

        Self {
            line,
            column,
            line_content,
        }
    }
}

/// Format an error with source context.
///
/// Errors without a span (most runtime errors) produce only the header line.
pub fn format_error(error: &LuxError, source: &str, filename: Option<&str>) -> String {
    let mut output = format!("error[{}]: {}\n", error.code_str(), error.message);

    if let Some(span) = &error.span {
        let loc = SourceLocation::from_offset(source, span.start);
        let filename = filename.unwrap_or("<input>");
        output.push_str(&format!("  --> {}:{}:{}\n", filename, loc.line, loc.column));

        let width = loc.line.to_string().len();
        output.push_str(&format!("{:>width$} |\n", "", width = width));
        output.push_str(&format!(
            "{:>width$} | {}\n",
            loc.line,
            loc.line_content,
            width = width
        ));

        let underline_start = loc.column - 1;
        let underline_len = span
            .len()
            .max(1)
            .min(loc.line_content.len().saturating_sub(underline_start).max(1));
        output.push_str(&format!(
            "{:>width$} | {:>start$}{}\n",
            "",
            "",
            "^".repeat(underline_len),
            width = width,
            start = underline_start
        ));
    }

    if let Some(hint) = &error.hint {
        output.push_str(&format!("  = hint: {}\n", hint));
    }

    output
}

/// Render an error as an annotated source report.
///
/// Falls back to [`format_error`] when the error has no span.
pub fn render_report(error: &LuxError, source: &str, filename: Option<&str>, color: bool) -> String {
    let Some(span) = &error.span else {
        return format_error(error, source, filename);
    };
    let filename = filename.unwrap_or("<input>");
    let range = span.start.min(source.len())..span.end.min(source.len());

    let mut builder = Report::build(ReportKind::Error, filename, range.start)
        .with_config(Config::default().with_color(color))
        .with_code(error.code_str())
        .with_message(&error.message)
        .with_label(
            Label::new((filename, range))
                .with_message(&error.message)
                .with_color(Color::Red),
        );
    if let Some(hint) = &error.hint {
        builder = builder.with_help(hint);
    }

    let mut buffer = Vec::new();
    match builder
        .finish()
        .write((filename, Source::from(source.to_string())), &mut buffer)
    {
        Ok(()) => String::from_utf8_lossy(&buffer).into_owned(),
        Err(_) => format_error(error, source, Some(filename)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_merge() {
        let merged = Span::new(5, 10).merge(&Span::new(15, 20));
        assert_eq!(merged, Span::new(5, 20));
        assert_eq!(merged.len(), 15);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ErrorCode::InvalidCharacter.code(), "E001");
        assert_eq!(ErrorCode::UnexpectedToken.code(), "E100");
        assert_eq!(ErrorCode::UndefinedVariable.code(), "E200");
        assert_eq!(ErrorCode::OutOfSymbols.code(), "E300");
        assert!(ErrorCode::MarkStackCorrupt.is_fatal());
        assert!(!ErrorCode::OutOfSymbols.is_fatal());
    }

    #[test]
    fn test_error_display() {
        let error = LuxError::new(ErrorCode::UndefinedVariable, "X is undefined");
        assert_eq!(error.to_string(), "[E200] X is undefined");
    }

    #[test]
    fn test_format_error_with_span() {
        let source = "x = 1\ny = @\n";
        let error = LuxError::at(ErrorCode::InvalidCharacter, "Invalid character", Span::new(10, 11))
            .with_hint("remove it");
        let text = format_error(&error, source, Some("test.lux"));
        assert!(text.contains("error[E001]: Invalid character"));
        assert!(text.contains("test.lux:2:5"));
        assert!(text.contains("y = @"));
        assert!(text.contains("hint: remove it"));
    }

    #[test]
    fn test_format_error_without_span() {
        let error = LuxError::new(ErrorCode::DivisionByZero, "Division by zero");
        assert_eq!(
            format_error(&error, "", None),
            "error[E404]: Division by zero\n"
        );
    }

    #[test]
    fn test_render_report_with_span() {
        let source = "x = 1\ny = @\n";
        let error = LuxError::at(ErrorCode::InvalidCharacter, "Invalid character", Span::new(10, 11))
            .with_hint("remove it");
        let text = render_report(&error, source, Some("test.lux"), false);
        assert!(text.contains("E001"));
        assert!(text.contains("Invalid character"));
        assert!(text.contains("test.lux"));
        assert!(text.contains("remove it"));
    }

    #[test]
    fn test_render_report_without_span() {
        let error = LuxError::new(ErrorCode::DivisionByZero, "Division by zero");
        assert_eq!(
            render_report(&error, "", None, false),
            "error[E404]: Division by zero\n"
        );
    }
}
