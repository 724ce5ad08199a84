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

//! Undefine, zap and the mark-stack sweeps.
//!
//! Undefining releases everything a symbol owns and leaves the symbol
//! itself allocated as `Undefined`. Zapping also removes its name binding
//! and frees the slot.

use super::Interpreter;
use crate::error::{ErrorCode, LuxError, Result};
use crate::symbols::{Context, Payload, SymbolId};

/// Trait for symbol destruction.
pub trait Destroyer {
    /// Release the payload of `id` and everything it owns. The symbol stays
    /// allocated and becomes `Undefined`.
    fn undefine(&mut self, id: SymbolId) -> Result<()>;

    /// Undefine `id`, remove its name binding and free its slot.
    fn zap(&mut self, id: SymbolId) -> Result<()>;

    /// Destroy `id` without the protection check. Missing symbols are
    /// reported and skipped.
    fn discard(&mut self, id: SymbolId);

    /// Release the owned children of `id` and reset its payload.
    fn clear_payload(&mut self, id: SymbolId);

    /// Destroy every temporary marked since the last statement peg.
    fn sweep_to_last_peg(&mut self) -> Result<()>;

    /// Destroy every temporary marked since the last parse peg.
    fn sweep_to_parse_peg(&mut self) -> Result<()>;
}

impl Destroyer for Interpreter {
    fn undefine(&mut self, id: SymbolId) -> Result<()> {
        self.check_destroyable(id)?;
        self.clear_payload(id);
        Ok(())
    }

    fn zap(&mut self, id: SymbolId) -> Result<()> {
        self.check_destroyable(id)?;
        self.discard(id);
        Ok(())
    }

    fn discard(&mut self, id: SymbolId) {
        if !self.store.is_live(id) {
            log::warn!("attempt to destroy free symbol #{}", id);
            return;
        }
        self.clear_payload(id);
        if let Some(binding) = self.store[id].binding.take() {
            self.names.remove(binding, id);
        }
        if self.store.is_temporary(id) {
            self.marks.unmark(id);
        }
        self.store.release(id);
    }

    fn clear_payload(&mut self, id: SymbolId) {
        let payload = std::mem::replace(&mut self.store[id].payload, Payload::Undefined);
        let mut owned = payload.children();
        if let Payload::Routine(_, def) = &payload {
            owned.extend(&def.locals);
        }
        for child in owned {
            if child != id
                && self.store.is_live(child)
                && self.store[child].context == Context::Symbol(id)
            {
                self.discard(child);
            }
        }
    }

    fn sweep_to_last_peg(&mut self) -> Result<()> {
        for id in self.marks.drain_to_peg()? {
            self.discard(id);
        }
        Ok(())
    }

    fn sweep_to_parse_peg(&mut self) -> Result<()> {
        for id in self.marks.drain_to_parse_peg()? {
            self.discard(id);
        }
        Ok(())
    }
}

impl Interpreter {
    fn check_destroyable(&self, id: SymbolId) -> Result<()> {
        if self.is_protected(id) {
            return Err(LuxError::new(
                ErrorCode::ProtectedConstant,
                format!("Cannot delete {}", self.symbol_ident(id)),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InterpreterConfig;
    use crate::runtime::construct::{NewSymbol, SymbolConstructor};
    use crate::symbols::{BinaryOp, ListEntry, Region, Scalar, SymbolClass};

    fn interp() -> Interpreter {
        Interpreter::capture(InterpreterConfig::default()).unwrap().0
    }

    #[test]
    fn test_zap_frees_owned_children() {
        let mut interp = interp();
        let before = interp.store.in_use(Region::TempVar);
        let lhs = interp.new_symbol(NewSymbol::Number(Scalar::Long(1))).unwrap();
        let rhs = interp.new_symbol(NewSymbol::Number(Scalar::Long(2))).unwrap();
        let op = interp
            .new_symbol(NewSymbol::BinOp {
                op: BinaryOp::Add,
                lhs,
                rhs,
            })
            .unwrap();
        interp.zap(op).unwrap();
        assert!(!interp.store.is_live(op));
        assert!(!interp.store.is_live(lhs));
        assert!(!interp.store.is_live(rhs));
        assert_eq!(interp.store.in_use(Region::TempVar), before);
    }

    #[test]
    fn test_zap_keeps_referenced_named_variables() {
        let mut interp = interp();
        let x = interp.find_var("X").unwrap();
        let one = interp.new_symbol(NewSymbol::Number(Scalar::Long(1))).unwrap();
        let op = interp
            .new_symbol(NewSymbol::BinOp {
                op: BinaryOp::Add,
                lhs: x,
                rhs: one,
            })
            .unwrap();
        interp.zap(op).unwrap();
        assert!(interp.store.is_live(x));
        assert_eq!(interp.lookup_var("X"), Some(x));
    }

    #[test]
    fn test_zap_list_frees_embedded_members_only() {
        let mut interp = interp();
        let x = interp.find_var("X").unwrap();
        interp.store[x].payload = Payload::Scalar(Scalar::Long(2));
        let regions = [Region::Named, Region::TempVar, Region::Exec, Region::TempExec];
        let before: Vec<usize> = regions.iter().map(|&r| interp.store.in_use(r)).collect();

        let c1 = interp.new_symbol(NewSymbol::Number(Scalar::Long(1))).unwrap();
        let c3 = interp.new_symbol(NewSymbol::Text("three".into())).unwrap();
        let list = interp
            .new_value(Payload::List(vec![
                ListEntry {
                    key: Some("A".into()),
                    value: c1,
                },
                ListEntry {
                    key: Some("B".into()),
                    value: x,
                },
                ListEntry {
                    key: None,
                    value: c3,
                },
            ]))
            .unwrap();
        assert_eq!(interp.store[c1].context, Context::Symbol(list));
        assert_eq!(interp.store[c3].context, Context::Symbol(list));
        assert_ne!(interp.store[x].context, Context::Symbol(list));

        interp.zap(list).unwrap();
        assert!(!interp.store.is_live(list));
        assert!(!interp.store.is_live(c1));
        assert!(!interp.store.is_live(c3));
        assert!(interp.store.is_live(x));
        assert_eq!(interp.store[x].payload, Payload::Scalar(Scalar::Long(2)));
        assert_eq!(interp.lookup_var("X"), Some(x));
        let after: Vec<usize> = regions.iter().map(|&r| interp.store.in_use(r)).collect();
        assert_eq!(after, before);
    }

    #[test]
    fn test_zap_pre_list_from_list_stack() {
        let mut interp = interp();
        let x = interp.find_var("X").unwrap();
        let regions = [Region::Named, Region::TempVar, Region::Exec, Region::TempExec];
        let before: Vec<usize> = regions.iter().map(|&r| interp.store.in_use(r)).collect();

        let c1 = interp.new_symbol(NewSymbol::Number(Scalar::Long(1))).unwrap();
        let c3 = interp.new_symbol(NewSymbol::Number(Scalar::Long(3))).unwrap();
        interp.lists.push_start().unwrap();
        interp.lists.push(c1).unwrap();
        interp.lists.push_name("B").unwrap();
        interp.lists.push(x).unwrap();
        interp.lists.push(c3).unwrap();
        let pre = interp.new_symbol(NewSymbol::PreList).unwrap();
        assert_eq!(interp.lists.depth(), 0);

        interp.zap(pre).unwrap();
        assert!(!interp.store.is_live(pre));
        assert!(!interp.store.is_live(c1));
        assert!(!interp.store.is_live(c3));
        assert!(interp.store.is_live(x));
        let after: Vec<usize> = regions.iter().map(|&r| interp.store.in_use(r)).collect();
        assert_eq!(after, before);
    }

    #[test]
    fn test_undefine_keeps_the_slot() {
        let mut interp = interp();
        let x = interp.find_var("X").unwrap();
        interp.store[x].payload = Payload::Scalar(Scalar::Long(3));
        interp.undefine(x).unwrap();
        assert_eq!(interp.store[x].class(), SymbolClass::Undefined);
        assert_eq!(interp.lookup_var("X"), Some(x));
    }

    #[test]
    fn test_zap_removes_binding() {
        let mut interp = interp();
        let x = interp.find_var("X").unwrap();
        interp.zap(x).unwrap();
        assert!(interp.lookup_var("X").is_none());
        assert!(!interp.store.is_live(x));
    }

    #[test]
    fn test_protected_constant_refuses() {
        let mut interp = interp();
        let pi = interp.lookup_var("#PI").unwrap();
        assert_eq!(interp.zap(pi).unwrap_err().code, ErrorCode::ProtectedConstant);
        assert_eq!(interp.undefine(pi).unwrap_err().code, ErrorCode::ProtectedConstant);
        assert!(interp.store.is_live(pi));
    }

    #[test]
    fn test_discard_of_free_slot_is_ignored() {
        let mut interp = interp();
        let id = interp.new_symbol(NewSymbol::Number(Scalar::Long(1))).unwrap();
        interp.discard(id);
        interp.discard(id);
        assert!(!interp.store.is_live(id));
    }

    #[test]
    fn test_sweep_destroys_marked_temporaries() {
        let mut interp = interp();
        interp.marks.peg().unwrap();
        let a = interp.new_symbol(NewSymbol::Number(Scalar::Long(1))).unwrap();
        let b = interp.new_symbol(NewSymbol::Text("x".into())).unwrap();
        interp.sweep_to_last_peg().unwrap();
        interp.marks.pop_peg().unwrap();
        assert!(!interp.store.is_live(a));
        assert!(!interp.store.is_live(b));
        assert_eq!(interp.marks.depth(), 0);
    }
}
