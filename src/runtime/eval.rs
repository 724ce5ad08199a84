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

//! Expression evaluation.
//!
//! Evaluating a symbol yields the index of a symbol holding a value. Value
//! symbols evaluate to themselves; everything computed is a fresh marked
//! temporary that the enclosing statement sweep reclaims.

use super::assign::Assigner;
use super::builtins::BuiltinCaller;
use super::construct::SymbolConstructor;
use super::execute::Executor;
use super::extract::Extractor;
use super::format::ValueFormatter;
use super::include::IncludeHandler;
use super::values::{self, Numeric};
use super::Interpreter;
use crate::error::{ErrorCode, LuxError, Result};
use crate::symbols::{
    ListEntry, LogicOp, NameSpace, Payload, PreExtract, PreRange, PreRangeEnd, RangeBound,
    RangeValue, RoutineKind, Scalar, Section, SymbolClass, SymbolId,
};

/// Trait for expression evaluation.
pub trait Evaluator {
    /// Evaluate `id` to a value symbol.
    fn eval(&mut self, id: SymbolId) -> Result<SymbolId>;

    /// Evaluate `id` to its working numeric form.
    fn eval_numeric(&mut self, id: SymbolId) -> Result<Numeric>;

    /// Evaluate `id` to a single integer.
    fn eval_index(&mut self, id: SymbolId) -> Result<i64>;

    /// Evaluate `id` as a condition.
    fn eval_truth(&mut self, id: SymbolId) -> Result<bool>;

    /// Evaluate `id` and render it as text.
    fn eval_string(&mut self, id: SymbolId) -> Result<String>;

    /// Follow transfer symbols to the symbol they stand for.
    fn resolve(&self, id: SymbolId) -> SymbolId;
}

impl Evaluator for Interpreter {
    fn eval(&mut self, id: SymbolId) -> Result<SymbolId> {
        let id = self.resolve(id);
        let symbol = self.store.get(id)?;
        if symbol.payload.is_value() {
            return Ok(id);
        }

        match symbol.payload.clone() {
            Payload::Unused | Payload::Undefined => Err(LuxError::new(
                ErrorCode::UndefinedVariable,
                format!("{} is not defined", self.symbol_ident(id)),
            )),
            Payload::PreRange(range) => self.eval_range(range),
            Payload::PreList(entries) => self.eval_list(entries, true),
            Payload::PreCList(items) => self.eval_list(
                items
                    .into_iter()
                    .map(|value| ListEntry { key: None, value })
                    .collect(),
                false,
            ),
            Payload::Extract(extract) => self.extract_value(extract.target, &extract.sections),
            Payload::PreExtract(pre) => self.eval_pre_extract(&pre),
            Payload::IntFunc { builtin, args } => {
                let result = self.call_builtin(RoutineKind::Function, builtin, &args)?;
                result.ok_or_else(|| {
                    let name = self
                        .builtins
                        .entry(RoutineKind::Function, builtin)
                        .map_or("?", |e| e.name);
                    no_return_value(name)
                })
            }
            Payload::UsrFunc { routine, args } => {
                let result = self.call_user_routine(routine, &args, RoutineKind::Function)?;
                result.ok_or_else(|| no_return_value(&self.symbol_ident(routine)))
            }
            Payload::BinOp { op, lhs, rhs } => {
                let a = self.eval_numeric(lhs)?;
                let b = self.eval_numeric(rhs)?;
                let result = values::binary(op, a, b)?;
                self.new_value(result.into_payload())
            }
            Payload::IfOp { op, lhs, rhs } => {
                let left = self.eval_truth(lhs)?;
                let truth = match op {
                    LogicOp::AndIf => left && self.eval_truth(rhs)?,
                    LogicOp::OrIf => left || self.eval_truth(rhs)?,
                };
                self.new_value(Payload::Scalar(Scalar::Long(truth as i32)))
            }
            Payload::Keyword { name, .. } => Err(LuxError::new(
                ErrorCode::IllegalOperation,
                format!(
                    "Keyword {} is only allowed in an argument list",
                    self.store[name].payload.as_str().unwrap_or("?")
                ),
            )),
            other => Err(LuxError::new(
                ErrorCode::IllegalOperation,
                format!("Cannot evaluate a {} symbol", other.class()),
            )),
        }
    }

    fn eval_numeric(&mut self, id: SymbolId) -> Result<Numeric> {
        let value = self.eval(id)?;
        values::numeric(&self.store[value].payload)
    }

    fn eval_index(&mut self, id: SymbolId) -> Result<i64> {
        if let Some(scalar) = self.store.get(id)?.payload.as_scalar() {
            return Ok(scalar.as_i64());
        }
        self.eval_numeric(id)?.as_index()
    }

    fn eval_truth(&mut self, id: SymbolId) -> Result<bool> {
        self.eval_numeric(id)?.truth()
    }

    fn eval_string(&mut self, id: SymbolId) -> Result<String> {
        let value = self.eval(id)?;
        if let Some(text) = self.store[value].payload.as_str() {
            return Ok(text.to_string());
        }
        Ok(self.format_value(value))
    }

    fn resolve(&self, id: SymbolId) -> SymbolId {
        let mut current = id;
        // a transfer chain can never be longer than the number of live symbols
        for _ in 0..self.store.in_use_total() {
            match self.store.get(current).map(|s| &s.payload) {
                Ok(Payload::Transfer(target)) => current = *target,
                _ => break,
            }
        }
        current
    }
}

fn no_return_value(name: &str) -> LuxError {
    LuxError::new(
        ErrorCode::NoReturnValue,
        format!("Function {} did not return a value", name),
    )
}

impl Interpreter {
    fn eval_range(&mut self, range: PreRange) -> Result<SymbolId> {
        let start = match range.start {
            Some(end) => Some(self.eval_bound(end, range.scalar)?),
            None => None,
        };
        let end = match range.end {
            Some(end) => Some(self.eval_bound(end, range.scalar)?),
            None => None,
        };
        self.new_value(Payload::Range(RangeValue {
            start,
            end,
            flags: range.flags,
        }))
    }

    fn eval_bound(&mut self, end: PreRangeEnd, scalar: bool) -> Result<RangeBound> {
        let index = |interp: &mut Self, id: SymbolId| -> Result<i64> {
            if scalar {
                if let Some(value) = interp.store[id].payload.as_scalar() {
                    return Ok(value.as_i64());
                }
            }
            interp.eval_index(id)
        };
        Ok(match end {
            PreRangeEnd::Index(id) => RangeBound::Index(index(self, id)?),
            PreRangeEnd::FromEnd(None) => RangeBound::FromEnd(0),
            PreRangeEnd::FromEnd(Some(id)) => RangeBound::FromEnd(index(self, id)?),
        })
    }

    /// Build a list value. The list is created first so members can be
    /// owned by it as they are evaluated.
    fn eval_list(&mut self, entries: Vec<ListEntry>, keyed: bool) -> Result<SymbolId> {
        let list = self.new_value(if keyed {
            Payload::List(Vec::new())
        } else {
            Payload::CList(Vec::new())
        })?;
        for entry in entries {
            let value = self.eval(entry.value)?;
            let member = self.adopt_or_copy(value, list)?;
            match &mut self.store[list].payload {
                Payload::List(members) => members.push(ListEntry {
                    key: entry.key,
                    value: member,
                }),
                Payload::CList(members) => members.push(member),
                _ => {}
            }
        }
        Ok(list)
    }

    /// Resolve a name that was unknown at parse time: a variable defined
    /// since, a user function, a built-in function, or a function file on
    /// the search path.
    fn eval_pre_extract(&mut self, pre: &PreExtract) -> Result<SymbolId> {
        let variable = self.names.lookup(NameSpace::Variable, &pre.name, pre.context);
        if let Some(var) = variable {
            if self.store[self.resolve(var)].class() != SymbolClass::Undefined {
                return self.extract_value(var, &pre.sections);
            }
        }

        let (args, rest) = match pre.sections.split_first() {
            Some((Section::Subscripts(args), rest)) => (args.clone(), rest),
            _ => {
                return Err(LuxError::new(
                    ErrorCode::UndefinedVariable,
                    format!("{} is not defined", pre.name),
                ))
            }
        };

        let result = if let Some(routine) = self.find_routine(RoutineKind::Function, &pre.name)? {
            self.call_user_routine(routine, &args, RoutineKind::Function)?
        } else if let Some(index) = self.builtins.find(RoutineKind::Function, &pre.name) {
            self.call_builtin(RoutineKind::Function, index, &args)?
        } else if let Some(routine) = self.auto_load(RoutineKind::Function, &pre.name)? {
            self.call_user_routine(routine, &args, RoutineKind::Function)?
        } else {
            return Err(LuxError::new(
                ErrorCode::UndefinedRoutine,
                format!("No variable or function named {}", pre.name),
            ));
        };

        let result = result.ok_or_else(|| no_return_value(&pre.name))?;
        if rest.is_empty() {
            Ok(result)
        } else {
            self.extract_value(result, rest)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InterpreterConfig;
    use crate::runtime::construct::NewSymbol;
    use crate::symbols::{BinaryOp, Context, RangeFlags};

    fn interp() -> Interpreter {
        Interpreter::capture(InterpreterConfig::default()).unwrap().0
    }

    fn long(interp: &mut Interpreter, v: i32) -> SymbolId {
        interp.new_symbol(NewSymbol::Number(Scalar::Long(v))).unwrap()
    }

    #[test]
    fn test_value_evaluates_to_itself() {
        let mut interp = interp();
        let one = long(&mut interp, 1);
        assert_eq!(interp.eval(one).unwrap(), one);
    }

    #[test]
    fn test_binop() {
        let mut interp = interp();
        let (a, b) = (long(&mut interp, 6), long(&mut interp, 7));
        let op = interp
            .new_symbol(NewSymbol::BinOp {
                op: BinaryOp::Mul,
                lhs: a,
                rhs: b,
            })
            .unwrap();
        let result = interp.eval(op).unwrap();
        assert_eq!(interp.store[result].payload, Payload::Scalar(Scalar::Long(42)));
        assert!(interp.marks.is_marked(result));
        assert_eq!(interp.store[result].context, Context::Level(0));
    }

    #[test]
    fn test_undefined_variable() {
        let mut interp = interp();
        let x = interp.find_var("X").unwrap();
        let err = interp.eval(x).unwrap_err();
        assert_eq!(err.code, ErrorCode::UndefinedVariable);
        assert!(err.message.contains('X'));
    }

    #[test]
    fn test_transfer_is_followed() {
        let mut interp = interp();
        let x = interp.find_var("X").unwrap();
        interp.store[x].payload = Payload::Scalar(Scalar::Long(3));
        let y = interp.find_var("Y").unwrap();
        interp.store[y].payload = Payload::Transfer(x);
        assert_eq!(interp.resolve(y), x);
        assert_eq!(interp.eval_index(y).unwrap(), 3);
    }

    #[test]
    fn test_short_circuit_skips_rhs() {
        let mut interp = interp();
        let zero = long(&mut interp, 0);
        let undefined = interp.find_var("NOPE").unwrap();
        let op = interp
            .new_symbol(NewSymbol::IfOp {
                op: LogicOp::AndIf,
                lhs: zero,
                rhs: undefined,
            })
            .unwrap();
        assert!(!interp.eval_truth(op).unwrap());
    }

    #[test]
    fn test_range_from_end() {
        let mut interp = interp();
        let two = long(&mut interp, 2);
        let range = interp
            .new_symbol(NewSymbol::PreRange {
                start: Some(PreRangeEnd::Index(two)),
                end: Some(PreRangeEnd::FromEnd(None)),
                flags: RangeFlags::default(),
            })
            .unwrap();
        let value = interp.eval(range).unwrap();
        assert_eq!(
            interp.store[value].payload,
            Payload::Range(RangeValue {
                start: Some(RangeBound::Index(2)),
                end: Some(RangeBound::FromEnd(0)),
                flags: RangeFlags::default(),
            })
        );
    }
}
