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

//! File inclusion and deferred routine compilation.
//!
//! `@file` compiles and executes a file, `@@file` records the routines a file
//! defines so that each is compiled from that file on first use. A routine
//! that is called but not known at all is looked for as `NAME.lux` on the
//! search path.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::destroy::Destroyer;
use super::routine::{name_space, RoutineCompiler};
use super::{CompileSnapshot, Interpreter};
use crate::error::{ErrorCode, LuxError, Result, Span};
use crate::lexer::{self, Token};
use crate::parser::Parser;
use crate::symbols::{Context, Payload, RoutineKind, SymbolId};

/// Extension added to include names that have none.
pub const SOURCE_EXTENSION: &str = "lux";

/// Resolves and caches source files.
#[derive(Debug, Default)]
pub struct IncludeResolver {
    /// Directory relative names are tried against first.
    base_dir: PathBuf,
    /// Further directories, tried in order.
    search_path: Vec<PathBuf>,
    /// File contents by resolved path.
    cache: HashMap<PathBuf, String>,
}

impl IncludeResolver {
    pub fn new(base_dir: PathBuf, search_path: Vec<PathBuf>) -> Self {
        Self {
            base_dir,
            search_path,
            cache: HashMap::new(),
        }
    }

    /// Candidate paths for `name`, in search order.
    pub fn candidates(&self, name: &str) -> Vec<PathBuf> {
        let mut path = PathBuf::from(name);
        if path.extension().is_none() {
            path.set_extension(SOURCE_EXTENSION);
        }

        if path.is_absolute() {
            return vec![path];
        }
        std::iter::once(&self.base_dir)
            .chain(&self.search_path)
            .map(|dir| dir.join(&path))
            .collect()
    }

    /// First existing candidate for `name`, if any.
    pub fn try_locate(&self, name: &str) -> Option<PathBuf> {
        self.candidates(name).into_iter().find(|p| p.is_file())
    }

    /// Resolve `name` to an existing file.
    pub fn locate(&self, name: &str) -> Result<PathBuf> {
        self.try_locate(name).ok_or_else(|| {
            let searched: Vec<String> = std::iter::once(&self.base_dir)
                .chain(&self.search_path)
                .map(|dir| dir.display().to_string())
                .collect();
            LuxError::new(
                ErrorCode::FileNotFound,
                format!(
                    "File not found: \"{}\" (searched in: {})",
                    name,
                    searched.join(", ")
                ),
            )
        })
    }

    /// Read a resolved file. The contents are cached for subsequent reads.
    pub fn read(&mut self, path: &Path) -> Result<String> {
        if let Some(source) = self.cache.get(path) {
            return Ok(source.clone());
        }

        let source = fs::read_to_string(path).map_err(|e| {
            LuxError::new(
                ErrorCode::FileReadError,
                format!("Cannot read file \"{}\": {}", path.display(), e),
            )
        })?;
        self.cache.insert(path.to_path_buf(), source.clone());
        Ok(source)
    }

    /// Clear the file cache.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

/// One level of nested compilation.
#[derive(Debug, Clone)]
pub struct CompileFrame {
    /// File being compiled.
    pub file: PathBuf,
    /// Source line of the outer input when the frame was entered.
    pub line: u32,
    pub(crate) saved: CompileSnapshot,
}

/// Trait for file inclusion and routine lookup.
pub trait IncludeHandler {
    /// `@file`: compile and execute every statement of a file.
    fn include_file(&mut self, name: &str) -> Result<()>;

    /// `@@file`: record the routines of a file for deferred compilation.
    fn report_file(&mut self, name: &str) -> Result<()>;

    /// Compile a deferred routine from its recorded file.
    fn compile_deferred(&mut self, routine: SymbolId) -> Result<()>;

    /// Find a user routine by name, compiling it first when it is deferred.
    fn find_routine(&mut self, kind: RoutineKind, name: &str) -> Result<Option<SymbolId>>;

    /// Look for `NAME.lux` on the search path and compile routine `name`
    /// from it. `None` when there is no such file.
    fn auto_load(&mut self, kind: RoutineKind, name: &str) -> Result<Option<SymbolId>>;
}

impl IncludeHandler for Interpreter {
    fn include_file(&mut self, name: &str) -> Result<()> {
        let path = self.includes.locate(name)?;
        let source = self.includes.read(&path)?;
        let tokens = lexer::tokenize(&source).map_err(|e| in_file(e, &path))?;

        self.enter_frame(&path)?;
        log::debug!("including {}", path.display());
        let result = self.run_tokens(&tokens, &source);
        self.leave_frame();
        result.map_err(|e| in_file(e, &path))
    }

    fn report_file(&mut self, name: &str) -> Result<()> {
        let path = self.includes.locate(name)?;
        let source = self.includes.read(&path)?;
        let tokens = lexer::tokenize(&source).map_err(|e| in_file(e, &path))?;

        let definitions = definitions(&tokens);
        log::debug!(
            "{} defines {} routine(s) for deferred compilation",
            path.display(),
            definitions.len()
        );
        for (_, kind, routine) in definitions {
            self.defer_routine(kind, &routine, path.clone())?;
        }
        Ok(())
    }

    fn compile_deferred(&mut self, routine: SymbolId) -> Result<()> {
        let (kind, path) = match &self.store.get(routine)?.payload {
            Payload::Deferred(kind, path) => (*kind, path.clone()),
            _ => return Ok(()),
        };
        let name = self.name_of(routine).unwrap_or_default().to_string();
        let source = self.includes.read(&path)?;
        let tokens = lexer::tokenize(&source).map_err(|e| in_file(e, &path))?;

        let start = definitions(&tokens)
            .into_iter()
            .find(|(_, k, n)| *k == kind && *n == name)
            .map(|(position, _, _)| position)
            .ok_or_else(|| {
                LuxError::new(
                    ErrorCode::RoutineNotInFile,
                    format!("{} {} is not defined in {}", kind.name(), name, path.display()),
                )
            })?;

        self.enter_frame(&path)?;
        log::debug!("compiling deferred {} {} from {}", kind.name(), name, path.display());
        let baseline = self.snapshot();
        let result = self.marks.peg_parse().and_then(|_| {
            let mut parser = Parser::resume(&tokens, start, self);
            parser.parse_top_level()
        });
        let result = match result {
            Ok(_) => self
                .sweep_to_parse_peg()
                .and_then(|_| self.marks.pop_parse_peg()),
            Err(error) => Err(self.unwind(&baseline).unwrap_or(error)),
        };
        self.leave_frame();
        result.map_err(|e| in_file(e, &path))
    }

    fn find_routine(&mut self, kind: RoutineKind, name: &str) -> Result<Option<SymbolId>> {
        let Some(id) = self.names.lookup(name_space(kind), name, Context::Global) else {
            return Ok(None);
        };
        match &self.store[id].payload {
            Payload::Routine(k, def) if *k == kind && def.complete => Ok(Some(id)),
            Payload::Deferred(k, _) if *k == kind => {
                self.compile_deferred(id)?;
                Ok(Some(id))
            }
            _ => Ok(None),
        }
    }

    fn auto_load(&mut self, kind: RoutineKind, name: &str) -> Result<Option<SymbolId>> {
        let located = self
            .includes
            .try_locate(&name.to_lowercase())
            .or_else(|| self.includes.try_locate(name));
        let Some(path) = located else {
            return Ok(None);
        };

        log::debug!("loading {} {} from {}", kind.name(), name, path.display());
        let id = self.defer_routine(kind, name, path)?;
        self.compile_deferred(id)?;
        match &self.store[id].payload {
            Payload::Routine(k, def) if *k == kind && def.complete => Ok(Some(id)),
            _ => Ok(None),
        }
    }
}

impl Interpreter {
    /// Nesting depth of file compilation.
    pub fn include_depth(&self) -> usize {
        self.frames.len()
    }

    /// Push a compile frame for `path` and switch to global compilation.
    fn enter_frame(&mut self, path: &Path) -> Result<()> {
        if self.frames.len() >= self.config.max_include_depth {
            return Err(LuxError::new(
                ErrorCode::IncludeTooDeep,
                format!(
                    "Cannot include {}: nesting exceeds {} levels",
                    path.display(),
                    self.config.max_include_depth
                ),
            ));
        }
        self.frames.push(CompileFrame {
            file: path.to_path_buf(),
            line: self.store.line(),
            saved: self.snapshot(),
        });
        self.compile.level += 1;
        self.compile.context = Context::Global;
        Ok(())
    }

    /// Pop the innermost compile frame and resume the outer input.
    fn leave_frame(&mut self) {
        if let Some(frame) = self.frames.pop() {
            self.compile.context = frame.saved.context;
            self.compile.level = frame.saved.level;
            self.compile.keep_evb = frame.saved.keep_evb;
            self.store.set_line(frame.line);
        }
    }
}

/// Statement-initial `SUBR`, `FUNC` and `BLOCK` headers: token position,
/// kind and name.
fn definitions(tokens: &[(Token, Span)]) -> Vec<(usize, RoutineKind, String)> {
    let mut found = Vec::new();
    let mut at_start = true;
    for (position, window) in tokens.windows(2).enumerate() {
        let kind = match &window[0].0 {
            Token::Subr => Some(RoutineKind::Subroutine),
            Token::Func => Some(RoutineKind::Function),
            Token::Block => Some(RoutineKind::Block),
            _ => None,
        };
        if let (true, Some(kind), Token::Identifier(name)) = (at_start, kind, &window[1].0) {
            found.push((position, kind, name.clone()));
        }
        at_start = window[0].0.is_separator();
    }
    found
}

/// Tag an error with the file it came from. Spans into that file are
/// dropped, the including statement's span is attached instead.
fn in_file(mut error: LuxError, path: &Path) -> LuxError {
    if error.code == ErrorCode::MarkStackCorrupt {
        return error;
    }
    let suffix = format!(" (in {})", path.display());
    if !error.message.ends_with(&suffix) {
        error.message.push_str(&suffix);
    }
    error.span = None;
    error
}
