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


//! Negative/Error tests for the LUX interpreter.
//!
//! These tests verify that invalid scripts are rejected with the right error
//! code and that a rejected statement leaves no temporaries behind.

use lux::{lexer, ErrorCode, Interpreter, InterpreterConfig, Region};
use test_case::test_case;

fn run_err(source: &str) -> (Interpreter, ErrorCode) {
    let (mut interp, _) = Interpreter::capture(InterpreterConfig::default()).unwrap();
    let code = match interp.run_source(source) {
        Ok(()) => panic!("expected {:?} to fail", source),
        Err(e) => e.code,
    };
    (interp, code)
}

// ============================================================================
// Lexer Error Tests
// ============================================================================

#[test_case("x = 'abc", ErrorCode::UnterminatedString; "single_quote")]
#[test_case("x = \"abc", ErrorCode::UnterminatedString; "double_quote")]
#[test_case("x = 1 ? 2", ErrorCode::InvalidCharacter; "question_mark")]
fn test_lexer_errors(source: &str, expected: ErrorCode) {
    let err = lexer::tokenize(source).unwrap_err();
    assert_eq!(err.code, expected);
    assert!(err.span.is_some());
}

// ============================================================================
// Parser Error Tests
// ============================================================================

#[test_case("break", ErrorCode::BreakOutsideLoop; "break_at_top_level")]
#[test_case("continue", ErrorCode::ContinueOutsideLoop; "continue_at_top_level")]
#[test_case("endfunc", ErrorCode::MismatchedEnd; "stray_end_keyword")]
#[test_case("begin\n x = 1\nendsubr", ErrorCode::MismatchedEnd; "wrong_block_end")]
#[test_case("case\n 1: x = 1\nend", ErrorCode::MismatchedEnd; "case_closed_by_end")]
#[test_case("subr s, p, p\nendsubr", ErrorCode::DuplicateParameterName; "duplicate_parameter")]
#[test_case("if 1 then func f", ErrorCode::NestedRoutineDefinition; "definition_inside_statement")]
#[test_case("x = []", ErrorCode::ExpectedExpression; "empty_array")]
#[test_case("x = 1 +", ErrorCode::UnexpectedEndOfInput; "truncated_expression")]
#[test_case("x = 1 2", ErrorCode::UnexpectedToken; "missing_separator")]
#[test_case("for 1 = 1, 2 do x = 1", ErrorCode::ExpectedIdentifier; "for_without_variable")]
#[test_case("x = &nowhere", ErrorCode::UndefinedRoutine; "pointer_to_unknown_routine")]
fn test_parse_errors(source: &str, expected: ErrorCode) {
    let (interp, code) = run_err(source);
    assert_eq!(code, expected);
    assert_eq!(interp.lists().depth(), 0);
    assert_eq!(interp.marks().depth(), 0);
    assert!(interp.compile_state().builder.is_none());
}

// ============================================================================
// Runtime Error Tests
// ============================================================================

#[test_case("x = 1 + nothing", ErrorCode::UndefinedVariable; "undefined_variable")]
#[test_case("nosuchsub, 1", ErrorCode::UndefinedRoutine; "undefined_subroutine")]
#[test_case("x = 1 / 0", ErrorCode::DivisionByZero; "integer_division_by_zero")]
#[test_case("for i = 1, 2, 0 do x = i", ErrorCode::IllegalOperation; "zero_step")]
#[test_case("x = sqrt(1, 2)", ErrorCode::WrongNumberOfArguments; "too_many_builtin_arguments")]
#[test_case("print, 1, sep2=1", ErrorCode::UnknownKeyword; "unknown_keyword")]
#[test_case("x = fltarr(-1)", ErrorCode::IllegalOperation; "negative_dimension")]
#[test_case("x = indgen(3)\ny = x(5)", ErrorCode::IndexOutOfBounds; "subscript_out_of_range")]
#[test_case("#pi = 3", ErrorCode::ProtectedConstant; "assign_to_constant")]
#[test_case("x = !nope", ErrorCode::UndefinedSystemVariable; "unknown_system_variable")]
#[test_case("subr one, a\nendsubr\none, 1, 2", ErrorCode::WrongNumberOfArguments; "too_many_user_arguments")]
#[test_case("@no_such_file_for_lux_tests", ErrorCode::FileNotFound; "missing_include")]
fn test_runtime_errors(source: &str, expected: ErrorCode) {
    let (interp, code) = run_err(source);
    assert_eq!(code, expected);
    assert_eq!(interp.store().in_use(Region::TempVar), 0);
    assert_eq!(interp.store().in_use(Region::TempExec), 0);
    assert_eq!(interp.marks().depth(), 0);
}

// ============================================================================
// Error Formatting Tests
// ============================================================================

#[test]
fn test_parse_error_carries_span() {
    let (mut interp, _) = Interpreter::capture(InterpreterConfig::default()).unwrap();
    let err = interp.run_source("x = 1\ny = )").unwrap_err();
    assert_eq!(err.code, ErrorCode::ExpectedExpression);
    let span = err.span.expect("parse errors carry a span");
    assert_eq!(span.start, 10);
}

#[test]
fn test_incomplete_input_detection() {
    assert!(lexer::needs_more_input("func f(x)\n return, x"));
    assert!(lexer::needs_more_input("x = [1, 2,"));
    assert!(!lexer::needs_more_input("x = 1"));
    assert!(!lexer::needs_more_input("begin\n x = 1\nend"));
}
