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

//! The interpreter: symbol table, compiler state and execution engine.
//!
//! # Module Structure
//!
//! - `construct` - The symbol constructor (SymbolConstructor trait)
//! - `destroy` - Undefine, zap and sweeps (Destroyer trait)
//! - `routine` - Two-pass routine compilation (RoutineCompiler trait)
//! - `eval` - Expression evaluation (Evaluator trait)
//! - `assign` - Value copies and assignment (Assigner trait)
//! - `extract` - Subscripts and tags (Extractor trait)
//! - `execute` - Statement execution and routine calls (Executor trait)
//! - `builtins` - Built-in registry and dispatch (BuiltinCaller trait)
//! - `natives` - Built-in subroutines and functions
//! - `include` - File inclusion and deferred compilation (IncludeHandler trait)
//! - `values` - Element-wise arithmetic on payloads
//! - `format` - Value formatting for output and diagnostics

pub mod assign;
pub mod builtins;
pub mod construct;
pub mod destroy;
pub mod eval;
pub mod execute;
pub mod extract;
pub mod format;
pub mod include;
pub mod natives;
pub mod routine;
pub mod values;

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use crate::config::InterpreterConfig;
use crate::error::{ErrorCode, LuxError, Result, SourceLocation, Span};
use crate::lexer::{self, Token};
use crate::parser::Parser;
use crate::symbols::{
    Context, ListStack, MarkStack, NameSpace, NameTables, Payload, Region, RegionStats, Scalar,
    StringKind, SymbolId, SymbolStore,
};

use builtins::BuiltinRegistry;
use destroy::Destroyer;
use execute::{Executor, Flow};
use include::{CompileFrame, IncludeResolver};
use routine::{RoutineBuilder, RoutineCompiler};

/// Compilation state saved and restored around nested compilation.
#[derive(Debug, Default)]
pub struct CompileState {
    /// Context new names are installed under.
    pub context: Context,
    /// Nesting depth of file inclusion.
    pub level: u32,
    /// While positive, executables are allocated permanently.
    pub keep_evb: u32,
    /// The routine currently being defined.
    pub builder: Option<RoutineBuilder>,
    /// Permanent executables allocated while the current routine compiles.
    pub permanent: Vec<SymbolId>,
}

/// Values of [`CompileState`] that an error unwind restores.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CompileSnapshot {
    context: Context,
    level: u32,
    keep_evb: u32,
    list_depth: usize,
}

/// Output sink that can be shared with the caller, for capturing `PRINT`.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer(Rc<RefCell<Vec<u8>>>);

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    /// Return and forget everything written so far.
    pub fn take(&self) -> String {
        let bytes = std::mem::take(&mut *self.0.borrow_mut());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// One interpreter instance. All symbol-table state lives here.
pub struct Interpreter {
    pub(crate) config: InterpreterConfig,
    pub(crate) store: SymbolStore,
    pub(crate) names: NameTables,
    pub(crate) marks: MarkStack,
    pub(crate) lists: ListStack,
    pub(crate) compile: CompileState,
    pub(crate) builtins: BuiltinRegistry,
    pub(crate) includes: IncludeResolver,
    pub(crate) frames: Vec<CompileFrame>,
    pub(crate) out: Box<dyn Write>,
    /// Named symbols below this index are startup constants.
    pub(crate) protected: SymbolId,
    pub(crate) restart_mode: bool,
    pub(crate) pending_restart: bool,
    pub(crate) errors: i32,
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("config", &self.config)
            .field("compile", &self.compile)
            .field("protected", &self.protected)
            .finish_non_exhaustive()
    }
}

impl Interpreter {
    /// Create an interpreter that prints to standard output.
    pub fn new(config: InterpreterConfig) -> Result<Self> {
        Self::with_output(config, Box::new(io::stdout()))
    }

    /// Create an interpreter that prints to `out`.
    pub fn with_output(config: InterpreterConfig, out: Box<dyn Write>) -> Result<Self> {
        let mut interp = Self {
            store: SymbolStore::new(config.capacities()),
            names: NameTables::new(config.hash_buckets),
            marks: MarkStack::new(config.mark_stack_size),
            lists: ListStack::new(config.list_stack_size),
            compile: CompileState::default(),
            builtins: BuiltinRegistry::new()?,
            includes: IncludeResolver::new(config.base_dir.clone(), config.search_path.clone()),
            frames: Vec::new(),
            out,
            protected: 0,
            restart_mode: false,
            pending_restart: false,
            errors: 0,
            config,
        };
        interp.install_system_symbols()?;
        Ok(interp)
    }

    /// Create an interpreter whose output is captured in the returned buffer.
    pub fn capture(config: InterpreterConfig) -> Result<(Self, OutputBuffer)> {
        let buffer = OutputBuffer::new();
        let interp = Self::with_output(config, Box::new(buffer.clone()))?;
        Ok((interp, buffer))
    }

    fn install_system_symbols(&mut self) -> Result<()> {
        use std::f64::consts::{E, PI};

        let constants = [
            ("#PI", PI),
            ("#2PI", 2.0 * PI),
            ("#E", E),
            ("#RAD", PI / 180.0),
            ("#DEG", 180.0 / PI),
        ];
        for (name, value) in constants {
            let id = self.install_global(name)?;
            self.store[id].payload = Payload::Scalar(Scalar::Double(value));
        }

        let id = self.install_global("!VERSION")?;
        self.store[id].payload = Payload::String(crate::VERSION.to_string(), StringKind::Fixed);
        let id = self.install_global("!ERRORS")?;
        self.store[id].payload = Payload::Scalar(Scalar::Long(self.errors));

        self.protected = self.store.cursor(Region::Named);
        log::debug!("installed system symbols below #{}", self.protected);
        Ok(())
    }

    fn install_global(&mut self, name: &str) -> Result<SymbolId> {
        let (id, _) = self
            .names
            .find_or_install(&mut self.store, NameSpace::Variable, name, Context::Global)?;
        Ok(id)
    }

    // ========================================
    // Name Resolution
    // ========================================

    /// Resolve a variable name in the current compile context, installing an
    /// undefined variable when it is new.
    ///
    /// Unknown `!` and `#` names are errors: system symbols cannot be created.
    pub fn find_var(&mut self, name: &str) -> Result<SymbolId> {
        let context = self.compile.context;
        if let Some(id) = self.names.lookup(NameSpace::Variable, name, context) {
            return Ok(id);
        }
        if name.starts_with(['!', '#']) {
            return Err(LuxError::new(
                ErrorCode::UndefinedSystemVariable,
                format!("No system variable or constant named {}", name),
            ));
        }
        let (id, _) = self
            .names
            .find_or_install(&mut self.store, NameSpace::Variable, name, context)?;
        let installed = self.store[id].context;
        if let Some(builder) = self.compile.builder.as_mut() {
            if installed == Context::Symbol(builder.routine) {
                builder.locals.push(id);
            }
        }
        Ok(id)
    }

    /// Look a variable up in the current compile context without installing it.
    pub fn lookup_var(&self, name: &str) -> Option<SymbolId> {
        self.names
            .lookup(NameSpace::Variable, name, self.compile.context)
    }

    /// Resolve a routine name, installing an undefined placeholder when new.
    pub fn find_sym(&mut self, space: NameSpace, name: &str) -> Result<SymbolId> {
        let (id, _) = self
            .names
            .find_or_install(&mut self.store, space, name, Context::Global)?;
        Ok(id)
    }

    /// Name of a bound symbol.
    pub fn name_of(&self, id: SymbolId) -> Option<&str> {
        let binding = self.store.get(id).ok()?.binding?;
        self.names.name_of(binding, id)
    }

    /// Identification of a symbol for diagnostics: its name or `#index`,
    /// followed by the routine it belongs to.
    pub fn symbol_ident(&self, id: SymbolId) -> String {
        let base = match self.name_of(id) {
            Some(name) => name.to_string(),
            None => format!("#{}", id),
        };
        match self.store.get(id).map(|s| s.context) {
            Ok(Context::Symbol(owner)) => match self.name_of(owner) {
                Some(owner_name) => format!("{} (in {})", base, owner_name),
                None => base,
            },
            _ => base,
        }
    }

    /// Whether `id` is a startup symbol that refuses deletion.
    pub fn is_protected(&self, id: SymbolId) -> bool {
        !self.restart_mode && self.store.region_of(id) == Some(Region::Named) && id < self.protected
    }

    // ========================================
    // Accessors
    // ========================================

    pub fn store(&self) -> &SymbolStore {
        &self.store
    }

    pub fn names(&self) -> &NameTables {
        &self.names
    }

    pub fn marks(&self) -> &MarkStack {
        &self.marks
    }

    pub fn lists(&self) -> &ListStack {
        &self.lists
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    pub fn compile_state(&self) -> &CompileState {
        &self.compile
    }

    /// Usage counters of all four ranges.
    pub fn stats(&self) -> Vec<RegionStats> {
        Region::ALL.iter().map(|r| self.store.stats(*r)).collect()
    }

    /// Number of errors reported through [`Interpreter::record_error`].
    pub fn error_count(&self) -> i32 {
        self.errors
    }

    /// Count an error in `!ERRORS`.
    pub fn record_error(&mut self) {
        self.errors += 1;
        if let Some(id) = self.names.lookup(NameSpace::Variable, "!ERRORS", Context::Global) {
            self.store[id].payload = Payload::Scalar(Scalar::Long(self.errors));
        }
    }

    pub(crate) fn write_output(&mut self, text: &str) -> Result<()> {
        self.out
            .write_all(text.as_bytes())
            .and_then(|_| self.out.flush())
            .map_err(|e| LuxError::new(ErrorCode::FileReadError, format!("Cannot write output: {}", e)))
    }

    // ========================================
    // Running Source
    // ========================================

    /// Parse and execute every statement of `source`.
    ///
    /// Execution stops at the first error. Everything the failing statement
    /// allocated is reclaimed before the error is returned.
    pub fn run_source(&mut self, source: &str) -> Result<()> {
        let tokens = lexer::tokenize(source)?;
        self.run_tokens(&tokens, source)
    }

    pub(crate) fn snapshot(&self) -> CompileSnapshot {
        CompileSnapshot {
            context: self.compile.context,
            level: self.compile.level,
            keep_evb: self.compile.keep_evb,
            list_depth: self.lists.depth(),
        }
    }

    pub(crate) fn run_tokens(&mut self, tokens: &[(Token, Span)], source: &str) -> Result<()> {
        let baseline = self.snapshot();
        let mut position = 0;

        loop {
            while matches!(tokens.get(position), Some((Token::Newline, _))) {
                position += 1;
            }
            let Some((_, span)) = tokens.get(position) else {
                return Ok(());
            };
            self.store
                .set_line(SourceLocation::from_offset(source, span.start).line as u32);
            self.store.next_statement();
            self.marks.peg_parse()?;

            let stop = match self.run_statement(tokens, &mut position) {
                Ok(stop) => stop,
                Err(error) => {
                    let error = error.or_span(span.clone());
                    return Err(self.unwind(&baseline).unwrap_or(error));
                }
            };
            self.sweep_to_parse_peg()?;
            self.marks.pop_parse_peg()?;

            if self.pending_restart && self.frames.is_empty() {
                self.pending_restart = false;
                self.restart()?;
            }
            if stop {
                return Ok(());
            }
        }
    }

    /// Parse one statement at `position` and execute it. Returns whether a
    /// top-level `RETURN` asked to stop the input.
    fn run_statement(&mut self, tokens: &[(Token, Span)], position: &mut usize) -> Result<bool> {
        let mut parser = Parser::resume(tokens, *position, self);
        let parsed = parser.parse_top_level()?;
        *position = parser.position();

        let Some(statement) = parsed else {
            return Ok(false);
        };
        match self.execute(statement)? {
            Flow::Return(value) => {
                if let Some(value) = value {
                    self.discard(value);
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Error-path cleanup: abort a routine under construction, sweep back to
    /// the parse peg and restore the compile state. Returns a fatal error if
    /// the mark stack turned out to be corrupt.
    pub(crate) fn unwind(&mut self, baseline: &CompileSnapshot) -> Option<LuxError> {
        if let Some(routine) = self.abort_routine() {
            self.teardown_routine(routine, false);
        }
        self.lists.truncate(baseline.list_depth);

        let fatal = match self.sweep_to_parse_peg() {
            Ok(()) => self.marks.pop_parse_peg().err(),
            Err(e) => Some(e),
        };

        self.compile.context = baseline.context;
        self.compile.level = baseline.level;
        self.compile.keep_evb = baseline.keep_evb;
        log::debug!(
            "unwound to parse peg; mark depth {}, temp cursor #{}",
            self.marks.depth(),
            self.store.cursor(Region::TempVar)
        );
        fatal.map(|e| {
            log::error!("{}", e);
            LuxError::new(ErrorCode::MarkStackCorrupt, e.message)
        })
    }

    /// Tear the whole symbol table down and reinstall the startup symbols.
    pub fn restart(&mut self) -> Result<()> {
        self.restart_mode = true;
        for space in [
            NameSpace::Subroutine,
            NameSpace::Function,
            NameSpace::Block,
            NameSpace::Variable,
        ] {
            let ids: Vec<SymbolId> = self.names.bindings(space).iter().map(|(_, _, id)| *id).collect();
            for id in ids {
                if self.store.is_live(id) {
                    self.zap(id)?;
                }
            }
        }
        self.store.reset();
        self.names.clear();
        self.marks.clear();
        self.lists.truncate(0);
        self.includes.clear_cache();
        self.compile = CompileState::default();
        self.frames.clear();
        self.errors = 0;
        self.restart_mode = false;
        log::debug!("symbol table restarted");
        self.install_system_symbols()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::SymbolClass;
    use pretty_assertions::assert_eq;

    fn interp() -> (Interpreter, OutputBuffer) {
        Interpreter::capture(InterpreterConfig::default()).unwrap()
    }

    #[test]
    fn test_system_symbols_installed() {
        let (interp, _) = interp();
        let pi = interp.lookup_var("#PI").unwrap();
        assert_eq!(
            interp.store()[pi].payload,
            Payload::Scalar(Scalar::Double(std::f64::consts::PI))
        );
        assert!(interp.is_protected(pi));
        assert!(interp.lookup_var("!VERSION").is_some());
    }

    #[test]
    fn test_find_var_installs_once() {
        let (mut interp, _) = interp();
        let a = interp.find_var("X").unwrap();
        let b = interp.find_var("X").unwrap();
        assert_eq!(a, b);
        assert_eq!(interp.store()[a].class(), SymbolClass::Undefined);
        assert!(!interp.is_protected(a));
    }

    #[test]
    fn test_unknown_system_variable() {
        let (mut interp, _) = interp();
        let err = interp.find_var("!NOPE").unwrap_err();
        assert_eq!(err.code, ErrorCode::UndefinedSystemVariable);
    }

    #[test]
    fn test_symbol_ident() {
        let (mut interp, _) = interp();
        let x = interp.find_var("X").unwrap();
        assert_eq!(interp.symbol_ident(x), "X");
        assert_eq!(interp.symbol_ident(9999), "#9999");
    }

    #[test]
    fn test_assignment_and_print() {
        let (mut interp, out) = interp();
        interp.run_source("x = 1\nprint, x").unwrap();
        assert_eq!(out.contents(), "1\n");
    }

    #[test]
    fn test_statement_leaves_no_temporaries() {
        let (mut interp, _) = interp();
        let cursor = interp.store().cursor(Region::TempVar);
        let exec_cursor = interp.store().cursor(Region::TempExec);
        interp.run_source("x = 1 + 2 * 3").unwrap();
        assert_eq!(interp.store().cursor(Region::TempVar), cursor);
        assert_eq!(interp.store().cursor(Region::TempExec), exec_cursor);
        assert_eq!(interp.marks().depth(), 0);
    }

    #[test]
    fn test_error_unwind_restores_state() {
        let (mut interp, _) = interp();
        let cursor = interp.store().cursor(Region::TempVar);
        let err = interp.run_source("x = 1 + undefined_thing").unwrap_err();
        assert_eq!(err.code, ErrorCode::UndefinedVariable);
        assert_eq!(interp.store().cursor(Region::TempVar), cursor);
        assert_eq!(interp.marks().depth(), 0);
        assert_eq!(interp.lists().depth(), 0);
    }

    #[test]
    fn test_record_error_updates_system_variable() {
        let (mut interp, out) = interp();
        interp.record_error();
        interp.run_source("print, !errors").unwrap();
        assert_eq!(out.contents(), "1\n");
    }

    #[test]
    fn test_restart_reinstalls_constants() {
        let (mut interp, _) = interp();
        interp.run_source("x = 5").unwrap();
        interp.restart().unwrap();
        assert!(interp.lookup_var("X").is_none());
        assert!(interp.lookup_var("#PI").is_some());
        assert_eq!(interp.store().in_use(Region::TempVar), 0);
    }
}
