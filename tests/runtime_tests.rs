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

//! End-to-end runtime tests for the LUX interpreter.
//!
//! Each test runs a complete script and checks what it printed and what it
//! left behind in the symbol table.

use lux::{ErrorCode, Interpreter, InterpreterConfig, OutputBuffer, Region};
use pretty_assertions::assert_eq;

fn run(source: &str) -> String {
    match lux::run(source) {
        Ok(output) => output,
        Err(e) => panic!("script failed: {}", e),
    }
}

fn interp_with(config: InterpreterConfig) -> (Interpreter, OutputBuffer) {
    Interpreter::capture(config).unwrap()
}

// ============================================================================
// Expressions
// ============================================================================

#[test]
fn test_integer_arithmetic() {
    assert_eq!(run("print, 7 / 2, 7 mod 3, 2 + 3 * 4, (2 + 3) * 4"), "3 1 14 20\n");
}

#[test]
fn test_negative_literals_and_unary_minus() {
    assert_eq!(run("x = 5\nprint, -3, -x, 10 - -2"), "-3 -5 12\n");
}

#[test]
fn test_comparison_and_logic() {
    assert_eq!(
        run("x = 4\nif x gt 3 and x lt 10 then print, 'inside' else print, 'outside'"),
        "inside\n"
    );
}

#[test]
fn test_string_concatenation() {
    assert_eq!(run("a = 'foo'\nb = 'bar'\nprint, a + b"), "foobar\n");
}

// ============================================================================
// Arrays and Subscripts
// ============================================================================

#[test]
fn test_array_subscripts_and_ranges() {
    assert_eq!(
        run("x = indgen(6)\nprint, x(2), x(1:3), x(*-1)"),
        "2 1 2 3 4\n"
    );
}

#[test]
fn test_array_element_assignment() {
    assert_eq!(run("x = intarr(3)\nx(1) = 5\nprint, x"), "0 5 0\n");
}

#[test]
fn test_substring() {
    assert_eq!(run("s = 'hello'\nprint, s(1:3)"), "ell\n");
}

#[test]
fn test_summed_and_redirected_ranges() {
    let source = "x = indgen(3, 2)\n\
                  print, x(*:+, *)\n\
                  print, x(*, *:+)\n\
                  print, x(0:1:+, 1)\n\
                  print, x(*:>1, *)";
    assert_eq!(run(source), "3 12\n3 5 7\n7\n0 3 1 4 2 5\n");
}

#[test]
fn test_summed_range_cannot_be_assigned() {
    let err = lux::run("x = indgen(3, 2)\nx(*:+, 0) = 1").unwrap_err();
    assert_eq!(err.code, ErrorCode::IllegalOperation);
}

#[test]
fn test_array_literal_total() {
    assert_eq!(run("print, total([1, 2, 3, 4, 5])"), "15\n");
}

// ============================================================================
// Control Flow
// ============================================================================

#[test]
fn test_nested_loops() {
    let source = "s = 0\n\
                  for i = 1, 3 do begin\n\
                  \x20 for j = 1, 3 do begin\n\
                  \x20   if j gt i then break\n\
                  \x20   s = s + 1\n\
                  \x20 end\n\
                  end\n\
                  print, s";
    assert_eq!(run(source), "6\n");
}

#[test]
fn test_do_while_runs_body_once() {
    assert_eq!(run("i = 10\ndo i = i + 1 while i lt 5\nprint, i"), "11\n");
}

#[test]
fn test_top_level_return_stops_input() {
    assert_eq!(run("print, 1\nreturn\nprint, 2"), "1\n");
}

// ============================================================================
// Routines
// ============================================================================

#[test]
fn test_recursive_function() {
    let source = "func fib(n)\n\
                  \x20 if n lt 2 then return, n\n\
                  \x20 return, fib(n - 1) + fib(n - 2)\n\
                  endfunc\n\
                  print, fib(10)";
    assert_eq!(run(source), "55\n");
}

#[test]
fn test_one_line_function_definition() {
    assert_eq!(run("FUNC Y(x) return x+1 ENDFUNC\nprint, Y(3)"), "4\n");
    assert_eq!(run("subr show, v print, v * 2 endsubr\nshow, 5"), "10\n");
}

#[test]
fn test_nested_function_calls() {
    assert_eq!(
        run("func sq(x)\n return, x * x\nendfunc\nprint, sq(sq(3))"),
        "81\n"
    );
}

#[test]
fn test_redefinition_replaces_body() {
    let (mut interp, out) = interp_with(InterpreterConfig::default());
    interp.run_source("func f(x)\n return, x + 1\nendfunc\nprint, f(1)").unwrap();
    let exec_in_use = interp.store().in_use(Region::Exec);
    interp.run_source("func f(x)\n return, x + 2\nendfunc\nprint, f(1)").unwrap();
    assert_eq!(out.contents(), "2\n3\n");
    assert_eq!(interp.store().in_use(Region::Exec), exec_in_use);
}

#[test]
fn test_locals_are_private_to_routine() {
    let source = "func g(a)\n t = a * 10\n return, t\nendfunc\n\
                  t = 1\n\
                  print, g(4), t";
    assert_eq!(run(source), "40 1\n");
}

#[test]
fn test_block_routine_shares_scope() {
    assert_eq!(
        run("block twice\n n = n * 2\nendblock\nn = 3\nrun, twice\nprint, n"),
        "6\n"
    );
}

#[test]
fn test_function_pointer_falls_back_to_f_suffix() {
    let source = "subr greet_f, who\n print, 'hi ' + who\nendsubr\np = &greet\ncall, p, 'you'";
    assert_eq!(run(source), "hi you\n");
}

#[test]
fn test_recursive_call_writes_through_to_own_local() {
    let source = "subr s, a, depth\n\
                  \x20 if depth eq 0 then begin\n\
                  \x20   loc = 7\n\
                  \x20   s, loc, 1\n\
                  \x20   print, loc\n\
                  \x20 end else a = 99\n\
                  endsubr\n\
                  s, 0, 0";
    assert_eq!(run(source), "99\n");
}

#[test]
fn test_recursive_call_reads_own_local_by_reference() {
    let source = "subr s, a, depth\n\
                  \x20 if depth eq 0 then begin\n\
                  \x20   loc = 7\n\
                  \x20   s, loc, 1\n\
                  \x20   print, loc\n\
                  \x20 end else a = a + 92\n\
                  endsubr\n\
                  s, 0, 0";
    assert_eq!(run(source), "99\n");
}

#[test]
fn test_failed_definition_leaves_nothing_behind() {
    let (mut interp, _) = interp_with(InterpreterConfig::default());
    let exec = interp.store().in_use(Region::Exec);
    let err = interp
        .run_source("subr broken, a\n a = 1 +\nendsubr")
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ExpectedExpression);
    assert_eq!(interp.store().in_use(Region::Exec), exec);
    assert!(interp.compile_state().builder.is_none());
    assert_eq!(interp.lists().depth(), 0);
}

// ============================================================================
// Symbol Table Housekeeping
// ============================================================================

#[test]
fn test_long_loop_in_small_temporary_range() {
    let config = InterpreterConfig::default().with_capacities(200, 20, 400, 50);
    let (mut interp, out) = interp_with(config);
    interp
        .run_source("s = 0\nfor i = 1, 500 do s = s + i * 2\nprint, s")
        .unwrap();
    assert_eq!(out.contents(), "250500\n");
    assert_eq!(interp.store().in_use(Region::TempVar), 0);
    assert_eq!(interp.store().in_use(Region::TempExec), 0);
}

#[test]
fn test_exhausted_range_recovers() {
    let config = InterpreterConfig::default().with_capacities(200, 3, 400, 50);
    let (mut interp, out) = interp_with(config);
    let err = interp.run_source("x = [1, 2, 3, 4, 5]").unwrap_err();
    assert_eq!(err.code, ErrorCode::OutOfSymbols);
    assert_eq!(interp.store().in_use(Region::TempVar), 0);
    assert_eq!(interp.marks().depth(), 0);

    interp.run_source("print, 1 + 1").unwrap();
    assert_eq!(out.contents(), "2\n");
}

#[test]
fn test_restart_clears_user_symbols() {
    let (mut interp, out) = interp_with(InterpreterConfig::default());
    interp
        .run_source("x = 1\nfunc f(a)\n return, a\nendfunc\nrestart\nprint, classname(x)")
        .unwrap();
    assert_eq!(out.contents(), "UNDEFINED\n");
    assert!(interp.lookup_var("#PI").is_some());
}

#[test]
fn test_error_count_system_variable() {
    let (mut interp, out) = interp_with(InterpreterConfig::default());
    assert!(interp.run_source("x = nothing + 1").is_err());
    interp.record_error();
    interp.run_source("print, !errors").unwrap();
    assert_eq!(out.contents(), "1\n");
}

// ============================================================================
// Inclusion
// ============================================================================

#[test]
fn test_include_from_base_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("lib.lux"),
        "func triple(x)\n return, 3 * x\nendfunc\n",
    )
    .unwrap();

    let (mut interp, out) = interp_with(InterpreterConfig::default().with_base_dir(dir.path()));
    interp.run_source("@lib\nprint, triple(5)").unwrap();
    assert_eq!(out.contents(), "15\n");
    assert_eq!(interp.include_depth(), 0);
}

#[test]
fn test_include_inside_routine_runs_at_each_call() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("part.lux"), "print, 'included'\n").unwrap();

    let (mut interp, out) = interp_with(InterpreterConfig::default().with_base_dir(dir.path()));
    interp
        .run_source(
            "subr show\n print, 'before'\n @part\n print, 'after'\nendsubr\n\
             print, 'defined'\nshow\nshow",
        )
        .unwrap();
    assert_eq!(
        out.contents(),
        "defined\nbefore\nincluded\nafter\nbefore\nincluded\nafter\n"
    );
    assert_eq!(interp.include_depth(), 0);
}

#[test]
fn test_routine_loaded_from_search_path() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("cube.lux"),
        "func cube(x)\n return, x * x * x\nendfunc\n",
    )
    .unwrap();

    let config = InterpreterConfig::default()
        .with_base_dir(dir.path().join("missing"))
        .with_search_dir(dir.path());
    let (mut interp, out) = interp_with(config);
    interp.run_source("print, cube(3)").unwrap();
    assert_eq!(out.contents(), "27\n");
}

#[test]
fn test_include_error_names_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("bad.lux"), "x = 1 +\n").unwrap();

    let (mut interp, _) = interp_with(InterpreterConfig::default().with_base_dir(dir.path()));
    let err = interp.run_source("@bad").unwrap_err();
    assert!(err.message.contains("bad.lux"), "message: {}", err.message);
    assert_eq!(interp.include_depth(), 0);
    assert_eq!(interp.marks().depth(), 0);
}
