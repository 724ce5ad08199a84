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

//! Two-pass routine compilation.
//!
//! A definition runs through `Named -> BodyOpen -> Complete`. The first pass
//! installs the name and collects the parameters; the body is compiled with
//! the routine as compile context and with permanent executables; the second
//! pass links parameters and statements into the routine. `@@file` produces
//! `Deferred` routines that are compiled on first use.

use std::path::PathBuf;

use super::destroy::Destroyer;
use super::Interpreter;
use crate::error::{ErrorCode, LuxError, Result};
use crate::symbols::{Context, NameSpace, Payload, RoutineDef, RoutineKind, SymbolId};

/// Where a definition currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineState {
    Named,
    BodyOpen,
    Complete,
    Deferred,
}

/// Bookkeeping for the routine under construction.
#[derive(Debug)]
pub struct RoutineBuilder {
    pub routine: SymbolId,
    pub kind: RoutineKind,
    pub name: String,
    pub state: RoutineState,
    saved_context: Context,
    saved_keep_evb: u32,
    list_base: usize,
    /// Named variables installed in the routine's context so far.
    pub locals: Vec<SymbolId>,
}

/// Name table of each routine kind.
pub fn name_space(kind: RoutineKind) -> NameSpace {
    match kind {
        RoutineKind::Subroutine => NameSpace::Subroutine,
        RoutineKind::Function => NameSpace::Function,
        RoutineKind::Block => NameSpace::Block,
    }
}

/// Trait for routine definition.
pub trait RoutineCompiler {
    /// First pass: install the name, drop an old body and open the parameter list.
    fn begin_routine(&mut self, kind: RoutineKind, name: &str) -> Result<SymbolId>;

    /// Declare the next parameter.
    fn add_parameter(&mut self, name: &str) -> Result<SymbolId>;

    /// Close the parameter list and open the statement list.
    fn open_routine_body(&mut self) -> Result<()>;

    /// Second pass: link parameters and statements into the routine.
    fn finish_routine(&mut self) -> Result<SymbolId>;

    /// Record a routine that lives in `file` without compiling it.
    fn defer_routine(&mut self, kind: RoutineKind, name: &str, file: PathBuf) -> Result<SymbolId>;

    /// Abandon the routine under construction, destroying everything the
    /// definition allocated so far. Returns the routine symbol.
    fn abort_routine(&mut self) -> Option<SymbolId>;

    /// Destroy the body of a routine. With `preserve` the symbol keeps its
    /// class with an empty body, otherwise it becomes undefined.
    fn teardown_routine(&mut self, routine: SymbolId, preserve: bool);
}

impl RoutineCompiler for Interpreter {
    fn begin_routine(&mut self, kind: RoutineKind, name: &str) -> Result<SymbolId> {
        if let Some(builder) = &self.compile.builder {
            return Err(LuxError::new(
                ErrorCode::NestedRoutineDefinition,
                format!(
                    "Cannot define {} {} inside {} {}",
                    kind.name(),
                    name,
                    builder.kind.name(),
                    builder.name
                ),
            ));
        }

        let id = self.find_sym(name_space(kind), name)?;
        if let Payload::Routine(_, def) = &self.store[id].payload {
            if def.active > 0 {
                return Err(LuxError::new(
                    ErrorCode::IllegalOperation,
                    format!("Cannot redefine {} while it is running", name),
                ));
            }
        }
        self.teardown_routine(id, true);
        self.store[id].payload = Payload::Routine(kind, Box::default());

        let list_base = self.lists.depth();
        self.lists.push_start()?;
        self.compile.builder = Some(RoutineBuilder {
            routine: id,
            kind,
            name: name.to_string(),
            state: RoutineState::Named,
            saved_context: self.compile.context,
            saved_keep_evb: self.compile.keep_evb,
            list_base,
            locals: Vec::new(),
        });
        self.compile.permanent.clear();
        if kind != RoutineKind::Block {
            self.compile.context = Context::Symbol(id);
        }
        log::debug!("compiling {} {} as #{}", kind.name(), name, id);
        Ok(id)
    }

    fn add_parameter(&mut self, name: &str) -> Result<SymbolId> {
        let routine = match &self.compile.builder {
            Some(b) if b.state == RoutineState::Named && b.kind != RoutineKind::Block => b.routine,
            _ => {
                return Err(LuxError::new(
                    ErrorCode::IllegalOperation,
                    format!("Parameter {} outside a routine header", name),
                ))
            }
        };
        if self
            .names
            .lookup(NameSpace::Variable, name, Context::Symbol(routine))
            .is_some()
        {
            return Err(LuxError::new(
                ErrorCode::DuplicateParameterName,
                format!("Parameter {} is declared twice", name),
            ));
        }
        let id = self.find_var(name)?;
        self.lists.push(id)?;
        Ok(id)
    }

    fn open_routine_body(&mut self) -> Result<()> {
        match self.compile.builder.as_mut() {
            Some(builder) if builder.state == RoutineState::Named => {
                builder.state = RoutineState::BodyOpen;
            }
            _ => {
                return Err(LuxError::new(
                    ErrorCode::UnexpectedSentinel,
                    "No routine header is open",
                ))
            }
        }
        self.compile.keep_evb += 1;
        self.lists.push_start()
    }

    fn finish_routine(&mut self) -> Result<SymbolId> {
        if !matches!(&self.compile.builder, Some(b) if b.state == RoutineState::BodyOpen) {
            return Err(LuxError::new(
                ErrorCode::UnexpectedSentinel,
                "No routine body is open",
            ));
        }
        let statements = self.lists.pop_symbols()?;
        let params = self.lists.pop_symbols()?;
        let Some(mut builder) = self.compile.builder.take() else {
            return Err(LuxError::new(ErrorCode::UnexpectedSentinel, "No routine body is open"));
        };

        let id = builder.routine;
        let param_names = params
            .iter()
            .map(|&p| self.name_of(p).unwrap_or_default().to_string())
            .collect();
        for &statement in &statements {
            if self.store[statement].context.is_unowned() {
                self.store[statement].context = Context::Symbol(id);
            }
        }
        builder.state = RoutineState::Complete;
        self.store[id].payload = Payload::Routine(
            builder.kind,
            Box::new(RoutineDef {
                params,
                param_names,
                statements,
                locals: std::mem::take(&mut builder.locals),
                active: 0,
                complete: true,
            }),
        );
        self.store[id].context = Context::Global;
        self.compile.context = builder.saved_context;
        self.compile.keep_evb = builder.saved_keep_evb;
        self.compile.permanent.clear();
        log::debug!("compiled {} {}", builder.kind.name(), builder.name);
        Ok(id)
    }

    fn defer_routine(&mut self, kind: RoutineKind, name: &str, file: PathBuf) -> Result<SymbolId> {
        let id = self.find_sym(name_space(kind), name)?;
        match &self.store[id].payload {
            Payload::Routine(_, def) if def.complete => {
                log::debug!("{} {} is already compiled; not deferring", kind.name(), name);
            }
            _ => {
                self.teardown_routine(id, false);
                log::debug!("deferred {} {} to {}", kind.name(), name, file.display());
                self.store[id].payload = Payload::Deferred(kind, file);
            }
        }
        Ok(id)
    }

    fn abort_routine(&mut self) -> Option<SymbolId> {
        let builder = self.compile.builder.take()?;
        self.lists.truncate(builder.list_base);

        let permanent = std::mem::take(&mut self.compile.permanent);
        for &id in permanent.iter().rev() {
            if self.store.is_live(id) && self.store[id].context.is_unowned() {
                self.discard(id);
            }
        }
        for &id in builder.locals.iter().rev() {
            if self.store.is_live(id) {
                self.discard(id);
            }
        }

        self.compile.context = builder.saved_context;
        self.compile.keep_evb = builder.saved_keep_evb;
        log::debug!("aborted definition of {} {}", builder.kind.name(), builder.name);
        Some(builder.routine)
    }

    fn teardown_routine(&mut self, routine: SymbolId, preserve: bool) {
        if !self.store.is_live(routine) {
            return;
        }
        let kind = match &self.store[routine].payload {
            Payload::Routine(kind, _) | Payload::Deferred(kind, _) => Some(*kind),
            _ => None,
        };
        self.clear_payload(routine);
        if let (true, Some(kind)) = (preserve, kind) {
            self.store[routine].payload = Payload::Routine(kind, Box::default());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InterpreterConfig;
    use crate::runtime::construct::{NewSymbol, SymbolConstructor};
    use crate::symbols::{BinaryOp, Evb, Region, Scalar, SymbolClass};

    fn interp() -> Interpreter {
        Interpreter::capture(InterpreterConfig::default()).unwrap().0
    }

    /// FUNC NAME(X) RETURN X + 1
    fn define_increment(interp: &mut Interpreter, name: &str) -> SymbolId {
        interp.begin_routine(RoutineKind::Function, name).unwrap();
        let x = interp.add_parameter("X").unwrap();
        interp.open_routine_body().unwrap();
        let body_x = interp.find_var("X").unwrap();
        assert_eq!(body_x, x);
        let one = interp.new_symbol(NewSymbol::Number(Scalar::Long(1))).unwrap();
        let sum = interp
            .new_symbol(NewSymbol::BinOp {
                op: BinaryOp::Add,
                lhs: body_x,
                rhs: one,
            })
            .unwrap();
        let ret = interp.new_symbol(NewSymbol::Evb(Evb::Return(Some(sum)))).unwrap();
        interp.lists.push(ret).unwrap();
        interp.new_symbol(NewSymbol::RoutineEnd).unwrap()
    }

    #[test]
    fn test_two_pass_definition() {
        let mut interp = interp();
        let id = define_increment(&mut interp, "Y");
        assert_eq!(interp.store[id].class(), SymbolClass::Function);
        assert_eq!(interp.compile.context, Context::Global);
        assert_eq!(interp.compile.keep_evb, 0);
        assert!(interp.compile.builder.is_none());
        assert_eq!(interp.lists.depth(), 0);

        let Payload::Routine(_, def) = &interp.store[id].payload else {
            panic!("not a routine");
        };
        assert_eq!(def.param_names, vec!["X".to_string()]);
        assert_eq!(def.statements.len(), 1);
        assert!(def.complete);
        let statement = def.statements[0];
        assert_eq!(interp.store.region_of(statement), Some(Region::Exec));
        assert_eq!(interp.store[statement].context, Context::Symbol(id));
        assert_eq!(
            interp.names.lookup(NameSpace::Variable, "X", Context::Symbol(id)),
            Some(def.params[0])
        );
        assert!(interp.lookup_var("X").is_none());
    }

    #[test]
    fn test_redefinition_replaces_the_body() {
        let mut interp = interp();
        let first = define_increment(&mut interp, "Y");
        let exec_in_use = interp.store.in_use(Region::Exec);
        let second = define_increment(&mut interp, "Y");
        assert_eq!(first, second);
        assert_eq!(interp.store.in_use(Region::Exec), exec_in_use);
    }

    #[test]
    fn test_nested_definition_is_refused() {
        let mut interp = interp();
        interp.begin_routine(RoutineKind::Subroutine, "OUTER").unwrap();
        let err = interp
            .begin_routine(RoutineKind::Function, "INNER")
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NestedRoutineDefinition);
    }

    #[test]
    fn test_duplicate_parameter() {
        let mut interp = interp();
        interp.begin_routine(RoutineKind::Subroutine, "S").unwrap();
        interp.add_parameter("A").unwrap();
        assert_eq!(
            interp.add_parameter("A").unwrap_err().code,
            ErrorCode::DuplicateParameterName
        );
    }

    #[test]
    fn test_abort_releases_partial_definition() {
        let mut interp = interp();
        let exec_in_use = interp.store.in_use(Region::Exec);
        let named_in_use = interp.store.in_use(Region::Named);
        interp.begin_routine(RoutineKind::Function, "BROKEN").unwrap();
        interp.add_parameter("A").unwrap();
        interp.open_routine_body().unwrap();
        interp.find_var("LOCAL").unwrap();
        interp.new_symbol(NewSymbol::Number(Scalar::Long(5))).unwrap();

        let routine = interp.abort_routine().unwrap();
        interp.teardown_routine(routine, false);

        assert_eq!(interp.store.in_use(Region::Exec), exec_in_use);
        // only the routine name itself stays bound
        assert_eq!(interp.store.in_use(Region::Named), named_in_use + 1);
        assert_eq!(interp.store[routine].class(), SymbolClass::Undefined);
        assert_eq!(interp.compile.context, Context::Global);
        assert_eq!(interp.compile.keep_evb, 0);
        assert_eq!(interp.lists.depth(), 0);
        assert!(interp.abort_routine().is_none());
    }

    #[test]
    fn test_defer_keeps_compiled_routine() {
        let mut interp = interp();
        let id = define_increment(&mut interp, "Y");
        interp
            .defer_routine(RoutineKind::Function, "Y", PathBuf::from("y.lux"))
            .unwrap();
        assert_eq!(interp.store[id].class(), SymbolClass::Function);

        let z = interp
            .defer_routine(RoutineKind::Subroutine, "Z", PathBuf::from("z.lux"))
            .unwrap();
        assert_eq!(interp.store[z].class(), SymbolClass::DeferredSubroutine);
    }

    #[test]
    fn test_block_compiles_in_global_context() {
        let mut interp = interp();
        interp.begin_routine(RoutineKind::Block, "B").unwrap();
        interp.open_routine_body().unwrap();
        let v = interp.find_var("V").unwrap();
        assert_eq!(interp.store[v].context, Context::Global);
        interp.finish_routine().unwrap();
    }
}
