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

//! Value copies and assignment.

use super::construct::{Placement, SymbolConstructor};
use super::destroy::Destroyer;
use super::eval::Evaluator;
use super::extract::Extractor;
use super::Interpreter;
use crate::error::{ErrorCode, LuxError, Result};
use crate::symbols::{ListEntry, NameSpace, Payload, Region, StringKind, Structure, SymbolId};

/// Trait for assignment and value copies.
pub trait Assigner {
    /// Execute `target = value` where `value` is an expression node.
    fn assign(&mut self, target: SymbolId, value: SymbolId) -> Result<()>;

    /// The symbol an assignment to `target` writes into.
    fn assignment_destination(&self, target: SymbolId) -> Result<SymbolId>;

    /// Store the evaluated `value` into `dest`, replacing its payload.
    fn store_value(&mut self, dest: SymbolId, value: SymbolId) -> Result<()>;

    /// A deep copy of the value of `source`. Members are allocated as
    /// children of `owner`.
    fn copy_payload(&mut self, source: SymbolId, owner: SymbolId) -> Result<Payload>;

    /// A new symbol holding a deep copy of `source`.
    fn copy_value(&mut self, source: SymbolId, placement: Placement) -> Result<SymbolId>;

    /// Make `value` a member of `owner`: a fresh temporary is handed over
    /// as is when the owner is itself temporary, anything else is copied.
    fn adopt_or_copy(&mut self, value: SymbolId, owner: SymbolId) -> Result<SymbolId>;

    /// Whether `id` is a named variable.
    fn is_named_variable(&self, id: SymbolId) -> bool;
}

impl Assigner for Interpreter {
    fn assign(&mut self, target: SymbolId, value: SymbolId) -> Result<()> {
        if let Payload::Extract(extract) = &self.store.get(target)?.payload {
            let extract = extract.clone();
            return self.assign_extract(extract.target, &extract.sections, value);
        }
        let dest = self.assignment_destination(target)?;
        let evaluated = self.eval(value)?;
        self.store_value(dest, evaluated)
    }

    fn assignment_destination(&self, target: SymbolId) -> Result<SymbolId> {
        let mut dest = target;
        if let Payload::Transfer(_) = self.store.get(target)?.payload {
            let end = self.resolve(target);
            // writes reach the caller only when the argument was a variable
            if self.is_named_variable(end) {
                dest = end;
            }
        }
        if self.is_protected(dest) {
            return Err(LuxError::new(
                ErrorCode::ProtectedConstant,
                format!("Cannot assign to {}", self.symbol_ident(dest)),
            ));
        }
        if self.store.region_of(dest) != Some(Region::Named) && dest == target {
            return Err(LuxError::new(
                ErrorCode::InvalidAssignmentTarget,
                format!("Cannot assign to a {} symbol", self.store[dest].class()),
            ));
        }
        Ok(dest)
    }

    fn store_value(&mut self, dest: SymbolId, value: SymbolId) -> Result<()> {
        let value = self.resolve(value);
        if value == dest {
            return Ok(());
        }
        if !self.store.get(value)?.payload.is_value() {
            return Err(LuxError::new(
                ErrorCode::UndefinedVariable,
                format!("{} has no value", self.symbol_ident(value)),
            ));
        }

        let steal = self.store.is_temporary(value)
            && self.store[value].context.is_unowned()
            && self.store[value].payload.children().is_empty();
        let payload = if steal {
            let payload = std::mem::replace(&mut self.store[value].payload, Payload::Undefined);
            self.discard(value);
            match payload {
                Payload::String(text, _) => Payload::String(text, StringKind::Temporary),
                other => other,
            }
        } else {
            self.copy_payload(value, dest)?
        };

        self.clear_payload(dest);
        self.store[dest].payload = payload;
        Ok(())
    }

    fn copy_payload(&mut self, source: SymbolId, owner: SymbolId) -> Result<Payload> {
        let source = self.resolve(source);
        let payload = self.store.get(source)?.payload.clone();
        Ok(match payload {
            Payload::FixedNumber(value) => Payload::Scalar(value),
            Payload::FixedString(text) | Payload::String(text, _) => {
                Payload::String(text, StringKind::Temporary)
            }
            value @ (Payload::Scalar(_)
            | Payload::CScalar { .. }
            | Payload::Array(_)
            | Payload::Range(_)
            | Payload::FuncPtr(_)) => value,
            Payload::List(entries) => Payload::List(self.copy_members(entries, owner)?),
            Payload::CList(items) => {
                let entries = items
                    .into_iter()
                    .map(|value| ListEntry { key: None, value })
                    .collect();
                Payload::CList(
                    self.copy_members(entries, owner)?
                        .into_iter()
                        .map(|entry| entry.value)
                        .collect(),
                )
            }
            Payload::Structure(structure) => Payload::Structure(Box::new(Structure {
                entries: self.copy_members(structure.entries, owner)?,
                layout: structure.layout,
            })),
            Payload::Undefined | Payload::Unused => {
                return Err(LuxError::new(
                    ErrorCode::UndefinedVariable,
                    format!("{} is not defined", self.symbol_ident(source)),
                ))
            }
            other => {
                return Err(LuxError::new(
                    ErrorCode::IllegalOperation,
                    format!("Cannot copy a {} symbol", other.class()),
                ))
            }
        })
    }

    fn copy_value(&mut self, source: SymbolId, placement: Placement) -> Result<SymbolId> {
        let id = self.instantiate(placement, Payload::Undefined)?;
        match self.copy_payload(source, id) {
            Ok(payload) => {
                self.store[id].payload = payload;
                Ok(id)
            }
            Err(e) => {
                self.discard(id);
                Err(e)
            }
        }
    }

    fn adopt_or_copy(&mut self, value: SymbolId, owner: SymbolId) -> Result<SymbolId> {
        let value = self.resolve(value);
        if self.store.is_temporary(owner)
            && self.store.is_temporary(value)
            && self.store[value].context.is_unowned()
        {
            self.embed(value, owner);
            return Ok(value);
        }
        self.copy_value(value, Placement::ChildOf(owner))
    }

    fn is_named_variable(&self, id: SymbolId) -> bool {
        self.store.is_live(id)
            && matches!(self.store[id].binding, Some(b) if b.space == NameSpace::Variable)
    }
}

impl Interpreter {
    /// Copy list members as children of `owner`, releasing the partial copy
    /// on failure.
    fn copy_members(&mut self, entries: Vec<ListEntry>, owner: SymbolId) -> Result<Vec<ListEntry>> {
        let mut copied = Vec::with_capacity(entries.len());
        for entry in entries {
            match self.copy_value(entry.value, Placement::ChildOf(owner)) {
                Ok(value) => copied.push(ListEntry {
                    key: entry.key,
                    value,
                }),
                Err(e) => {
                    for done in copied {
                        self.discard(done.value);
                    }
                    return Err(e);
                }
            }
        }
        Ok(copied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InterpreterConfig;
    use crate::runtime::construct::NewSymbol;
    use crate::symbols::{Context, Scalar};

    fn interp() -> Interpreter {
        Interpreter::capture(InterpreterConfig::default()).unwrap().0
    }

    #[test]
    fn test_fixed_literal_is_copied_as_plain_value() {
        let mut interp = interp();
        interp.compile.keep_evb = 1;
        let literal = interp.new_symbol(NewSymbol::Text("hi".into())).unwrap();
        interp.compile.keep_evb = 0;
        let x = interp.find_var("X").unwrap();
        interp.store_value(x, literal).unwrap();
        assert_eq!(
            interp.store[x].payload,
            Payload::String("hi".into(), StringKind::Temporary)
        );
        assert!(interp.store.is_live(literal));
    }

    #[test]
    fn test_fresh_temporary_is_moved() {
        let mut interp = interp();
        let temp = interp
            .new_value(Payload::Scalar(Scalar::Long(9)))
            .unwrap();
        let x = interp.find_var("X").unwrap();
        interp.store_value(x, temp).unwrap();
        assert_eq!(interp.store[x].payload, Payload::Scalar(Scalar::Long(9)));
        assert!(!interp.store.is_live(temp));
        assert!(!interp.marks.is_marked(temp));
    }

    #[test]
    fn test_list_copy_goes_to_named_range() {
        let mut interp = interp();
        let list = interp.new_value(Payload::CList(Vec::new())).unwrap();
        let member = interp.new_value(Payload::Scalar(Scalar::Long(1))).unwrap();
        let member = interp.adopt_or_copy(member, list).unwrap();
        if let Payload::CList(items) = &mut interp.store[list].payload {
            items.push(member);
        }
        assert_eq!(interp.store[member].context, Context::Symbol(list));

        let x = interp.find_var("X").unwrap();
        interp.store_value(x, list).unwrap();
        let Payload::CList(items) = interp.store[x].payload.clone() else {
            panic!("not a list");
        };
        assert_eq!(items.len(), 1);
        assert_eq!(interp.store.region_of(items[0]), Some(Region::Named));
        assert_eq!(interp.store[items[0]].context, Context::Symbol(x));
    }

    #[test]
    fn test_transfer_to_variable_writes_through() {
        let mut interp = interp();
        let x = interp.find_var("X").unwrap();
        let p = interp.find_var("P").unwrap();
        interp.store[p].payload = Payload::Transfer(x);
        assert_eq!(interp.assignment_destination(p).unwrap(), x);

        let temp = interp.new_value(Payload::Scalar(Scalar::Long(1))).unwrap();
        interp.store[p].payload = Payload::Transfer(temp);
        assert_eq!(interp.assignment_destination(p).unwrap(), p);
    }

    #[test]
    fn test_protected_destination() {
        let interp = interp();
        let pi = interp.lookup_var("#PI").unwrap();
        assert_eq!(
            interp.assignment_destination(pi).unwrap_err().code,
            ErrorCode::ProtectedConstant
        );
    }

    #[test]
    fn test_copy_of_undefined_fails_cleanly() {
        let mut interp = interp();
        let before = interp.store.in_use(Region::TempVar);
        let x = interp.find_var("X").unwrap();
        let err = interp.copy_value(x, Placement::Temp).unwrap_err();
        assert_eq!(err.code, ErrorCode::UndefinedVariable);
        assert_eq!(interp.store.in_use(Region::TempVar), before);
    }
}
