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

//! Statement execution and user routine calls.
//!
//! Every executed statement is bracketed by a statement peg: temporaries
//! created while it runs are swept when it finishes, whether it succeeded
//! or not. A `RETURN` value is unmarked before the sweeps so it survives
//! them, and is marked again in the caller.

use super::assign::Assigner;
use super::builtins::{match_keyword, BuiltinCaller};
use super::construct::Placement;
use super::destroy::Destroyer;
use super::eval::Evaluator;
use super::include::IncludeHandler;
use super::values::{Elems, Numeric};
use super::Interpreter;
use crate::error::{ErrorCode, LuxError, Result};
use crate::symbols::{Evb, IncludeMode, NumType, Payload, RoutineKind, SymbolId};

/// How a statement finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Normal,
    Break,
    Continue,
    /// `RETURN`, with the unmarked result of a function.
    Return(Option<SymbolId>),
}

/// Trait for executing statements.
pub trait Executor {
    /// Execute `id` inside its own statement peg.
    fn execute(&mut self, id: SymbolId) -> Result<Flow>;

    /// Execute `id` without a peg of its own.
    fn execute_node(&mut self, id: SymbolId) -> Result<Flow>;

    /// Call a user routine with the given argument nodes. Returns the
    /// function result, marked in the caller's scope.
    fn call_user_routine(
        &mut self,
        routine: SymbolId,
        args: &[SymbolId],
        kind: RoutineKind,
    ) -> Result<Option<SymbolId>>;

    /// Make sure `routine` is a compiled routine of `kind`, compiling a
    /// deferred one or loading it from the search path. Returns the
    /// routine symbol.
    fn ensure_routine(&mut self, routine: SymbolId, kind: RoutineKind) -> Result<SymbolId>;
}

impl Executor for Interpreter {
    fn execute(&mut self, id: SymbolId) -> Result<Flow> {
        self.bracketed(|interp| interp.execute_node(id))
    }

    fn execute_node(&mut self, id: SymbolId) -> Result<Flow> {
        let evb = match &self.store.get(id)?.payload {
            Payload::Evb(evb) => evb.clone(),
            _ => {
                self.eval(id)?;
                return Ok(Flow::Normal);
            }
        };

        match evb {
            Evb::Block(statements) => self.run_statements(&statements),
            Evb::Replace { target, value } => {
                self.assign(target, value)?;
                Ok(Flow::Normal)
            }
            Evb::InternalSub { builtin, args } => {
                self.call_builtin(RoutineKind::Subroutine, builtin, &args)?;
                Ok(Flow::Normal)
            }
            Evb::UserSub { routine, args } => {
                if let Some(result) =
                    self.call_user_routine(routine, &args, RoutineKind::Subroutine)?
                {
                    self.discard(result);
                }
                Ok(Flow::Normal)
            }
            Evb::For {
                counter,
                start,
                end,
                step,
                body,
            } => self.run_for(counter, start, end, step, body),
            Evb::If {
                condition,
                then,
                otherwise,
            } => {
                if self.test(condition)? {
                    self.execute(then)
                } else if let Some(otherwise) = otherwise {
                    self.execute(otherwise)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Evb::WhileDo { condition, body } => {
                while self.test(condition)? {
                    match self.execute(body)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                Ok(Flow::Normal)
            }
            Evb::DoWhile { body, condition } => {
                loop {
                    match self.execute(body)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                    if !self.test(condition)? {
                        break;
                    }
                }
                Ok(Flow::Normal)
            }
            Evb::Repeat { body, condition } => {
                loop {
                    match self.execute(body)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                    if self.test(condition)? {
                        break;
                    }
                }
                Ok(Flow::Normal)
            }
            Evb::Return(None) => Ok(Flow::Return(None)),
            Evb::Return(Some(expr)) => {
                let value = self.eval(expr)?;
                let value = self.resolve(value);
                let result = if self.store.is_temporary(value)
                    && self.store[value].context.is_unowned()
                    && self.marks.is_marked(value)
                {
                    value
                } else {
                    self.copy_value(value, Placement::Temp)?
                };
                self.marks.unmark(result);
                Ok(Flow::Return(Some(result)))
            }
            Evb::Case { arms, otherwise } => {
                for (condition, statement) in arms {
                    if self.test(condition)? {
                        return self.execute(statement);
                    }
                }
                match otherwise {
                    Some(statement) => self.execute(statement),
                    None => Ok(Flow::Normal),
                }
            }
            Evb::NCase {
                selector,
                arms,
                otherwise,
            } => {
                let index = self.bracketed(|interp| interp.eval_index(selector))?;
                let chosen = usize::try_from(index)
                    .ok()
                    .and_then(|i| arms.get(i).copied())
                    .or(otherwise);
                match chosen {
                    Some(statement) => self.execute(statement),
                    None => Ok(Flow::Normal),
                }
            }
            Evb::BlockCall(routine) => {
                let routine = self.ensure_routine(routine, RoutineKind::Block)?;
                let statements = match &self.store[routine].payload {
                    Payload::Routine(_, def) => def.statements.clone(),
                    _ => Vec::new(),
                };
                self.run_statements(&statements)
            }
            Evb::Include { path, mode } => {
                match mode {
                    IncludeMode::Execute => self.include_file(&path)?,
                    IncludeMode::Report => self.report_file(&path)?,
                }
                Ok(Flow::Normal)
            }
            Evb::Break => Ok(Flow::Break),
            Evb::Continue => Ok(Flow::Continue),
        }
    }

    fn call_user_routine(
        &mut self,
        routine: SymbolId,
        args: &[SymbolId],
        kind: RoutineKind,
    ) -> Result<Option<SymbolId>> {
        let routine = self.ensure_routine(routine, kind)?;
        let (params, param_names, statements, locals, active) = match &self.store[routine].payload
        {
            Payload::Routine(_, def) => (
                def.params.clone(),
                def.param_names.clone(),
                def.statements.clone(),
                def.locals.clone(),
                def.active,
            ),
            _ => return Err(undefined_routine(kind, &self.symbol_ident(routine))),
        };

        // arguments are evaluated in the caller's scope
        let mut bound: Vec<Option<SymbolId>> = vec![None; params.len()];
        let mut position = 0;
        for &arg in args {
            if let Payload::Keyword { name, value } = self.store.get(arg)?.payload {
                let key = self.store[name].payload.as_str().unwrap_or_default().to_string();
                let names: Vec<&str> = param_names.iter().map(String::as_str).collect();
                let slot = match_keyword(&names, &key)?;
                bound[slot] = Some(self.argument_target(value)?);
            } else {
                if position >= params.len() {
                    return Err(LuxError::new(
                        ErrorCode::WrongNumberOfArguments,
                        format!(
                            "{} takes at most {} arguments",
                            self.symbol_ident(routine),
                            params.len()
                        ),
                    ));
                }
                bound[position] = Some(self.argument_target(arg)?);
                position += 1;
            }
        }

        // a local passed by reference keeps the caller's value for the call
        let shared: Vec<SymbolId> = if active > 0 {
            locals
                .iter()
                .copied()
                .filter(|local| bound.contains(&Some(*local)))
                .collect()
        } else {
            Vec::new()
        };
        let mut saved = Vec::new();
        if active > 0 {
            for &local in &locals {
                if self.store.is_live(local) && !shared.contains(&local) {
                    let payload =
                        std::mem::replace(&mut self.store[local].payload, Payload::Undefined);
                    saved.push((local, payload));
                }
            }
        }
        self.set_active(routine, active + 1);
        for (&param, target) in params.iter().zip(&bound) {
            self.clear_payload(param);
            self.store[param].payload = match target {
                Some(target) if *target != param => Payload::Transfer(*target),
                _ => Payload::Undefined,
            };
        }

        log::trace!("calling {} (depth {})", self.symbol_ident(routine), active + 1);
        let result = self.run_statements(&statements);

        for &local in &locals {
            if self.store.is_live(local) && !shared.contains(&local) {
                self.clear_payload(local);
            }
        }
        for (local, payload) in saved {
            self.store[local].payload = payload;
        }
        self.set_active(routine, active);

        match result? {
            Flow::Return(Some(value)) if kind == RoutineKind::Function => {
                self.marks.mark(value)?;
                Ok(Some(value))
            }
            Flow::Return(Some(value)) => {
                self.discard(value);
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    fn ensure_routine(&mut self, routine: SymbolId, kind: RoutineKind) -> Result<SymbolId> {
        let compiled = |payload: &Payload| {
            matches!(payload, Payload::Routine(k, def) if *k == kind && def.complete)
        };
        let payload = &self.store.get(routine)?.payload;
        if compiled(payload) {
            return Ok(routine);
        }
        if matches!(payload, Payload::Deferred(k, _) if *k == kind) {
            self.compile_deferred(routine)?;
            if compiled(&self.store[routine].payload) {
                return Ok(routine);
            }
            return Err(undefined_routine(kind, &self.symbol_ident(routine)));
        }

        let name = self
            .name_of(routine)
            .map(str::to_string)
            .unwrap_or_else(|| self.symbol_ident(routine));
        match self.auto_load(kind, &name)? {
            Some(loaded) => Ok(loaded),
            None => Err(undefined_routine(kind, &name)),
        }
    }
}

fn undefined_routine(kind: RoutineKind, name: &str) -> LuxError {
    LuxError::new(
        ErrorCode::UndefinedRoutine,
        format!("{} {} is not defined", kind.name(), name),
    )
}

impl Interpreter {
    /// Run `f` inside a statement peg, sweeping its temporaries afterwards.
    pub(crate) fn bracketed<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.marks.peg()?;
        let result = f(self);
        self.sweep_to_last_peg()?;
        self.marks.pop_peg()?;
        result
    }

    fn test(&mut self, condition: SymbolId) -> Result<bool> {
        self.bracketed(|interp| interp.eval_truth(condition))
    }

    fn run_statements(&mut self, statements: &[SymbolId]) -> Result<Flow> {
        for &statement in statements {
            match self.execute(statement)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    /// Named variables are passed by reference, anything else by value.
    fn argument_target(&mut self, arg: SymbolId) -> Result<SymbolId> {
        let resolved = self.resolve(arg);
        if self.is_named_variable(resolved) {
            return Ok(resolved);
        }
        self.eval(arg)
    }

    fn set_active(&mut self, routine: SymbolId, active: u32) {
        if let Payload::Routine(_, def) = &mut self.store[routine].payload {
            def.active = active;
        }
    }

    fn run_for(
        &mut self,
        counter: SymbolId,
        start: SymbolId,
        end: SymbolId,
        step: Option<SymbolId>,
        body: SymbolId,
    ) -> Result<Flow> {
        let counter = self.assignment_destination(counter)?;
        let (first, last, step) = self.bracketed(|interp| {
            let first = interp.eval_numeric(start)?.single()?;
            let last = interp.eval_numeric(end)?.single()?;
            let step = match step {
                Some(step) => interp.eval_numeric(step)?.single()?,
                None => Numeric::long(1),
            };
            Ok((first, last, step))
        })?;

        let ty = first.ty.promote(last.ty).promote(step.ty);
        if ty.is_complex() || ty == NumType::String {
            return Err(LuxError::new(
                ErrorCode::TypeMismatch,
                format!("FOR bounds must be real numbers, found {}", ty.name()),
            ));
        }

        self.clear_payload(counter);
        if ty.is_integer() {
            let (mut i, last, step) = (first.as_index()?, last.as_index()?, step.as_index()?);
            if step == 0 {
                return Err(zero_step());
            }
            while (step > 0 && i <= last) || (step < 0 && i >= last) {
                self.store[counter].payload = Numeric {
                    ty,
                    dims: None,
                    elems: Elems::Int(vec![i]),
                }
                .into_payload();
                match self.execute(body)? {
                    Flow::Break => break,
                    Flow::Return(value) => return Ok(Flow::Return(value)),
                    Flow::Normal | Flow::Continue => {}
                }
                let Some(current) = self.store[counter].payload.as_scalar() else {
                    break;
                };
                match current.as_i64().checked_add(step) {
                    Some(next) => i = next,
                    None => break,
                }
            }
        } else {
            let real = |n: &Numeric| -> Result<f64> {
                Ok(n.reals()?.first().copied().unwrap_or_default())
            };
            let (mut x, last, step) = (real(&first)?, real(&last)?, real(&step)?);
            if step == 0.0 {
                return Err(zero_step());
            }
            while (step > 0.0 && x <= last) || (step < 0.0 && x >= last) {
                self.store[counter].payload = Numeric {
                    ty,
                    dims: None,
                    elems: Elems::Real(vec![x]),
                }
                .into_payload();
                match self.execute(body)? {
                    Flow::Break => break,
                    Flow::Return(value) => return Ok(Flow::Return(value)),
                    Flow::Normal | Flow::Continue => {}
                }
                let Some(current) = self.store[counter].payload.as_scalar() else {
                    break;
                };
                x = current.as_f64() + step;
            }
        }
        Ok(Flow::Normal)
    }
}

fn zero_step() -> LuxError {
    LuxError::new(ErrorCode::IllegalOperation, "FOR step must not be zero")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InterpreterConfig;
    use crate::runtime::OutputBuffer;
    use crate::symbols::Region;
    use pretty_assertions::assert_eq;

    fn run(source: &str) -> (Interpreter, OutputBuffer) {
        let (mut interp, out) = Interpreter::capture(InterpreterConfig::default()).unwrap();
        interp.run_source(source).unwrap();
        (interp, out)
    }

    // ========================================
    // Control Flow
    // ========================================

    #[test]
    fn test_for_loop_sum() {
        let (_, out) = run("s = 0\nfor i = 1, 10 do s = s + i\nprint, s, i");
        assert_eq!(out.contents(), "55 11\n");
    }

    #[test]
    fn test_for_loop_with_step_and_break() {
        let (_, out) = run(
            "for i = 10, 0, -3 do begin\n if i lt 5 then break\n print, i\nend",
        );
        assert_eq!(out.contents(), "10\n7\n");
    }

    #[test]
    fn test_while_and_continue() {
        let (_, out) = run(
            "i = 0\nwhile i lt 5 do begin\n i = i + 1\n if i eq 3 then continue\n print, i\nend",
        );
        assert_eq!(out.contents(), "1\n2\n4\n5\n");
    }

    #[test]
    fn test_repeat_until() {
        let (_, out) = run("i = 0\nrepeat i = i + 2 until i ge 7\nprint, i");
        assert_eq!(out.contents(), "8\n");
    }

    #[test]
    fn test_case_and_ncase() {
        let (_, out) = run(
            "x = 2\ncase\n x eq 1: print, 'one'\n x eq 2: print, 'two'\n else print, 'many'\nendcase\n\
             ncase x\n print, 'zero'\n print, 'one'\n print, 'two'\nendcase",
        );
        assert_eq!(out.contents(), "two\ntwo\n");
    }

    #[test]
    fn test_zero_step_is_refused() {
        let (mut interp, _) = Interpreter::capture(InterpreterConfig::default()).unwrap();
        let err = interp.run_source("for i = 1, 2, 0 do x = i").unwrap_err();
        assert_eq!(err.code, ErrorCode::IllegalOperation);
    }

    // ========================================
    // Routine Calls
    // ========================================

    #[test]
    fn test_function_call() {
        let (_, out) = run("func y(x)\n return, x + 1\nendfunc\nprint, y(3)");
        assert_eq!(out.contents(), "4\n");
    }

    #[test]
    fn test_recursion_restores_locals() {
        let (_, out) = run(
            "func fact(n)\n if n le 1 then return, 1\n return, n * fact(n - 1)\nendfunc\n\
             print, fact(6)",
        );
        assert_eq!(out.contents(), "720\n");
    }

    #[test]
    fn test_subroutine_writes_through_to_variable() {
        let (_, out) = run("subr setit, a\n a = 5\nendsubr\nv = 1\nsetit, v\nprint, v");
        assert_eq!(out.contents(), "5\n");
    }

    #[test]
    fn test_parameter_bound_to_temporary_is_local() {
        let (_, out) = run("subr setit, a\n a = 5\n print, a\nendsubr\nsetit, 1 + 1");
        assert_eq!(out.contents(), "5\n");
    }

    #[test]
    fn test_keyword_argument_by_prefix() {
        let (_, out) = run(
            "subr show, first, second\n print, first, second\nendsubr\nshow, 1, sec=2",
        );
        assert_eq!(out.contents(), "1 2\n");
    }

    #[test]
    fn test_too_many_arguments() {
        let (mut interp, _) = run("subr one, a\nendsubr");
        let err = interp.run_source("one, 1, 2").unwrap_err();
        assert_eq!(err.code, ErrorCode::WrongNumberOfArguments);
    }

    #[test]
    fn test_calls_leave_no_temporaries() {
        let (mut interp, _) = run("func y(x)\n t = x * 2\n return, t + 1\nendfunc");
        let cursor = interp.store().cursor(Region::TempVar);
        interp.run_source("z = y(3) + y(4)").unwrap();
        assert_eq!(interp.store().in_use(Region::TempVar), 0);
        assert_eq!(interp.store().cursor(Region::TempVar), cursor);
        assert_eq!(interp.marks().depth(), 0);
    }

    #[test]
    fn test_block_runs_in_caller_scope() {
        let (_, out) = run("block bump\n n = n + 1\nendblock\nn = 1\nrun, bump\nrun, bump\nprint, n");
        assert_eq!(out.contents(), "3\n");
    }

    #[test]
    fn test_undefined_routine() {
        let (mut interp, _) = Interpreter::capture(InterpreterConfig::default()).unwrap();
        let err = interp.run_source("nosuchthing, 1").unwrap_err();
        assert_eq!(err.code, ErrorCode::UndefinedRoutine);
    }
}
