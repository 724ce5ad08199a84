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

//! The built-in registry and call dispatch.
//!
//! Each built-in carries a keyword specification string:
//!
//! ```text
//! spec := [flags] ["|" mode "|"] [">" offset] [key (":" key)*]
//! ```
//!
//! `+` lets the native reuse its first argument in place, `*` passes all
//! arguments unevaluated. `|mode|` is the initial mode word and `>offset`
//! the argument slot of the first ordinary keyword. A key with a leading
//! number is a mode keyword: a true value ORs the number into the mode. A
//! key with a leading `#` is passed unevaluated.

use super::eval::Evaluator;
use super::natives;
use super::Interpreter;
use crate::error::{ErrorCode, LuxError, Result};
use crate::symbols::{Payload, RoutineKind, SymbolId};

/// Signature of a native built-in.
pub type NativeFn = fn(&mut Interpreter, &CallArgs) -> Result<Option<SymbolId>>;

/// Unbounded argument count.
pub const MANY: usize = usize::MAX;

/// Static description of one built-in.
#[derive(Clone, Copy)]
pub struct BuiltinEntry {
    pub name: &'static str,
    pub min_args: usize,
    pub max_args: usize,
    pub native: NativeFn,
    pub keys: &'static str,
}

impl BuiltinEntry {
    pub const fn new(
        name: &'static str,
        min_args: usize,
        max_args: usize,
        native: NativeFn,
        keys: &'static str,
    ) -> Self {
        Self {
            name,
            min_args,
            max_args,
            native,
            keys,
        }
    }
}

impl std::fmt::Debug for BuiltinEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinEntry")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .field("keys", &self.keys)
            .finish()
    }
}

/// One key of a keyword specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyDef {
    pub name: &'static str,
    /// Mode bit set by a true value.
    pub bit: Option<u32>,
    pub unevaluated: bool,
}

/// Parsed keyword specification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordSpec {
    pub piping: bool,
    pub suppress_eval: bool,
    pub default_mode: u32,
    pub offset: usize,
    pub keys: Vec<KeyDef>,
}

fn malformed(spec: &str) -> LuxError {
    LuxError::new(
        ErrorCode::IllegalOperation,
        format!("Malformed keyword specification \"{}\"", spec),
    )
}

fn split_digits(text: &str) -> (&str, &str) {
    let end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    text.split_at(end)
}

impl KeywordSpec {
    pub fn parse(spec: &'static str) -> Result<Self> {
        let mut parsed = KeywordSpec::default();
        let mut rest = spec;

        loop {
            if let Some(r) = rest.strip_prefix('+') {
                parsed.piping = true;
                rest = r;
            } else if let Some(r) = rest.strip_prefix('*') {
                parsed.suppress_eval = true;
                rest = r;
            } else {
                break;
            }
        }

        if let Some(r) = rest.strip_prefix('|') {
            let end = r.find('|').ok_or_else(|| malformed(spec))?;
            parsed.default_mode = r[..end].parse().map_err(|_| malformed(spec))?;
            rest = &r[end + 1..];
        }

        if let Some(r) = rest.strip_prefix('>') {
            let (digits, r) = split_digits(r);
            parsed.offset = digits.parse().map_err(|_| malformed(spec))?;
            rest = r;
        }

        for key in rest.split(':').filter(|k| !k.is_empty()) {
            let def = if let Some(name) = key.strip_prefix('#') {
                KeyDef {
                    name,
                    bit: None,
                    unevaluated: true,
                }
            } else {
                let (digits, name) = split_digits(key);
                KeyDef {
                    name,
                    bit: if digits.is_empty() {
                        None
                    } else {
                        Some(digits.parse().map_err(|_| malformed(spec))?)
                    },
                    unevaluated: false,
                }
            };
            if def.name.is_empty() {
                return Err(malformed(spec));
            }
            parsed.keys.push(def);
        }
        Ok(parsed)
    }

    /// Ordinal of the key matching `key` exactly or by unique prefix.
    pub fn match_key(&self, key: &str) -> Result<usize> {
        let names: Vec<&str> = self.keys.iter().map(|k| k.name).collect();
        match_keyword(&names, key)
    }
}

/// Index of the name matching `key` exactly or as its unique prefix.
pub fn match_keyword(names: &[&str], key: &str) -> Result<usize> {
    if let Some(index) = names.iter().position(|n| *n == key) {
        return Ok(index);
    }
    let candidates: Vec<usize> = names
        .iter()
        .enumerate()
        .filter(|(_, n)| !key.is_empty() && n.starts_with(key))
        .map(|(i, _)| i)
        .collect();
    match candidates.as_slice() {
        [index] => Ok(*index),
        [] => Err(LuxError::new(
            ErrorCode::UnknownKeyword,
            format!("Unknown keyword {}", key),
        )),
        _ => Err(LuxError::new(
            ErrorCode::AmbiguousKeyword,
            format!(
                "Keyword {} is ambiguous: {}",
                key,
                candidates
                    .iter()
                    .map(|&i| names[i])
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        )),
    }
}

/// Arguments as handed to a native.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallArgs {
    /// Positional slots; keyword arguments may fill slots past the positionals.
    pub args: Vec<Option<SymbolId>>,
    /// Ordinary keyword values by key ordinal.
    pub keywords: Vec<Option<SymbolId>>,
    pub mode: u32,
    /// The first argument is a fresh temporary the native may overwrite.
    pub pipe: bool,
}

impl CallArgs {
    pub fn arg(&self, index: usize) -> Option<SymbolId> {
        self.args.get(index).copied().flatten()
    }

    /// Argument `index`, which must be present.
    pub fn required(&self, index: usize, name: &str) -> Result<SymbolId> {
        self.arg(index).ok_or_else(|| {
            LuxError::new(
                ErrorCode::WrongNumberOfArguments,
                format!("{} needs argument {}", name, index + 1),
            )
        })
    }

    pub fn count(&self) -> usize {
        self.args.len()
    }

    pub fn keyword(&self, ordinal: usize) -> Option<SymbolId> {
        self.keywords.get(ordinal).copied().flatten()
    }

    pub fn has_mode(&self, bit: u32) -> bool {
        self.mode & bit != 0
    }

    /// Present positional arguments in order.
    pub fn present(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.args.iter().flatten().copied()
    }
}

#[derive(Debug)]
struct Registered {
    entry: BuiltinEntry,
    spec: KeywordSpec,
}

/// Sorted tables of built-in subroutines and functions.
#[derive(Debug)]
pub struct BuiltinRegistry {
    subroutines: Vec<Registered>,
    functions: Vec<Registered>,
}

impl BuiltinRegistry {
    pub fn new() -> Result<Self> {
        Ok(Self {
            subroutines: Self::build(natives::SUBROUTINES)?,
            functions: Self::build(natives::FUNCTIONS)?,
        })
    }

    fn build(table: &[BuiltinEntry]) -> Result<Vec<Registered>> {
        let mut registered = table
            .iter()
            .map(|entry| {
                Ok(Registered {
                    entry: *entry,
                    spec: KeywordSpec::parse(entry.keys)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        registered.sort_by(|a, b| a.entry.name.cmp(b.entry.name));
        if let Some(pair) = registered
            .windows(2)
            .find(|pair| pair[0].entry.name == pair[1].entry.name)
        {
            return Err(LuxError::new(
                ErrorCode::IllegalOperation,
                format!("Built-in {} is registered twice", pair[0].entry.name),
            ));
        }
        Ok(registered)
    }

    fn table(&self, kind: RoutineKind) -> &[Registered] {
        match kind {
            RoutineKind::Subroutine => &self.subroutines,
            RoutineKind::Function => &self.functions,
            RoutineKind::Block => &[],
        }
    }

    /// Index of the built-in called `name`.
    pub fn find(&self, kind: RoutineKind, name: &str) -> Option<usize> {
        self.table(kind)
            .binary_search_by(|r| r.entry.name.cmp(name))
            .ok()
    }

    pub fn entry(&self, kind: RoutineKind, index: usize) -> Option<&BuiltinEntry> {
        self.table(kind).get(index).map(|r| &r.entry)
    }

    pub fn spec(&self, kind: RoutineKind, index: usize) -> Option<&KeywordSpec> {
        self.table(kind).get(index).map(|r| &r.spec)
    }

    /// Names of all built-ins of `kind`, sorted.
    pub fn names(&self, kind: RoutineKind) -> Vec<&'static str> {
        self.table(kind).iter().map(|r| r.entry.name).collect()
    }
}

/// Trait for calling built-ins.
pub trait BuiltinCaller {
    /// Call built-in `index` of `kind` with the given argument nodes.
    fn call_builtin(
        &mut self,
        kind: RoutineKind,
        index: usize,
        args: &[SymbolId],
    ) -> Result<Option<SymbolId>>;
}

impl BuiltinCaller for Interpreter {
    fn call_builtin(
        &mut self,
        kind: RoutineKind,
        index: usize,
        args: &[SymbolId],
    ) -> Result<Option<SymbolId>> {
        let (entry, spec) = match (self.builtins.entry(kind, index), self.builtins.spec(kind, index)) {
            (Some(entry), Some(spec)) => (*entry, spec.clone()),
            _ => {
                return Err(LuxError::new(
                    ErrorCode::UndefinedRoutine,
                    format!("No built-in {} #{}", kind.name(), index),
                ))
            }
        };

        let mut call = CallArgs {
            args: Vec::with_capacity(args.len()),
            keywords: vec![None; spec.keys.len()],
            mode: spec.default_mode,
            pipe: false,
        };

        let mut keywords = Vec::new();
        for &arg in args {
            if let Payload::Keyword { name, value } = self.store.get(arg)?.payload {
                keywords.push((name, value));
                continue;
            }
            let value = if spec.suppress_eval {
                arg
            } else {
                self.eval(arg)?
            };
            call.args.push(Some(value));
        }

        for (name, value) in keywords {
            let key = self.store[name].payload.as_str().unwrap_or_default().to_string();
            let ordinal = spec.match_key(&key).map_err(|mut e| {
                e.message = format!("{} (calling {})", e.message, entry.name);
                e
            })?;
            let def = spec.keys[ordinal];
            if let Some(bit) = def.bit {
                if self.eval_truth(value)? {
                    call.mode |= bit;
                } else {
                    call.mode &= !bit;
                }
                continue;
            }
            let value = if def.unevaluated || spec.suppress_eval {
                value
            } else {
                self.eval(value)?
            };
            call.keywords[ordinal] = Some(value);
            let slot = spec.offset + ordinal;
            if entry.max_args != MANY && slot < entry.max_args {
                if call.args.len() <= slot {
                    call.args.resize(slot + 1, None);
                }
                call.args[slot] = Some(value);
            }
        }

        let count = call.count();
        if count < entry.min_args || (entry.max_args != MANY && count > entry.max_args) {
            let expected = match entry.max_args {
                MANY => format!("at least {}", entry.min_args),
                max if max == entry.min_args => max.to_string(),
                max => format!("{} to {}", entry.min_args, max),
            };
            return Err(LuxError::new(
                ErrorCode::WrongNumberOfArguments,
                format!("{} takes {} arguments, got {}", entry.name, expected, count),
            ));
        }

        call.pipe = spec.piping
            && call.arg(0).is_some_and(|first| {
                self.store.is_temporary(first)
                    && self.store[first].context.is_unowned()
                    && self.marks.is_marked(first)
            });

        log::trace!("calling built-in {} with {} arguments", entry.name, count);
        (entry.native)(self, &call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_mode_and_keys() {
        let spec = KeywordSpec::parse("|0|1NONEWLINE:SEPARATOR").unwrap();
        assert_eq!(spec.default_mode, 0);
        assert_eq!(
            spec.keys,
            vec![
                KeyDef {
                    name: "NONEWLINE",
                    bit: Some(1),
                    unevaluated: false
                },
                KeyDef {
                    name: "SEPARATOR",
                    bit: None,
                    unevaluated: false
                },
            ]
        );
    }

    #[test]
    fn test_parse_flags_and_offset() {
        let spec = KeywordSpec::parse("+*>2#NAME:COUNT").unwrap();
        assert!(spec.piping);
        assert!(spec.suppress_eval);
        assert_eq!(spec.offset, 2);
        assert!(spec.keys[0].unevaluated);
        assert_eq!(spec.keys[0].name, "NAME");
        assert_eq!(spec.keys[1].name, "COUNT");
    }

    #[test]
    fn test_parse_rejects_unclosed_mode() {
        assert!(KeywordSpec::parse("|3").is_err());
    }

    #[test]
    fn test_keyword_prefix_matching() {
        let names = ["SEPARATOR", "SEQUENCE", "MEAN"];
        assert_eq!(match_keyword(&names, "MEAN").unwrap(), 2);
        assert_eq!(match_keyword(&names, "SEP").unwrap(), 0);
        assert_eq!(
            match_keyword(&names, "SE").unwrap_err().code,
            ErrorCode::AmbiguousKeyword
        );
        assert_eq!(
            match_keyword(&names, "X").unwrap_err().code,
            ErrorCode::UnknownKeyword
        );
    }

    #[test]
    fn test_exact_match_beats_prefix() {
        let names = ["MODE", "MODEL"];
        assert_eq!(match_keyword(&names, "MODE").unwrap(), 0);
    }

    #[test]
    fn test_registry_is_sorted_and_searchable() {
        let registry = BuiltinRegistry::new().unwrap();
        let names = registry.names(RoutineKind::Function);
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);

        let index = registry.find(RoutineKind::Subroutine, "PRINT").unwrap();
        assert_eq!(
            registry.entry(RoutineKind::Subroutine, index).unwrap().name,
            "PRINT"
        );
        assert!(registry.find(RoutineKind::Function, "PRINT").is_none());
        assert!(registry.find(RoutineKind::Block, "PRINT").is_none());
    }
}
