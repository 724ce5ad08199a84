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


//! Property-based tests for the LUX symbol table.
//!
//! These tests verify invariants of the store, the name tables and the
//! interpreter that should hold for all inputs, using proptest for random
//! input generation.

use lux::symbols::{Context, ListItem, ListStack, NameSpace, NameTables, SymbolStore};
use lux::{lexer, Interpreter, InterpreterConfig, Region};
use proptest::prelude::*;
use std::collections::BTreeSet;

// ============================================================================
// Symbol Store Property Tests
// ============================================================================

proptest! {
    /// Property: the cursor always points at the lowest free slot, and the
    /// in-use counter matches the allocated set.
    #[test]
    fn prop_store_cursor_is_lowest_free(ops in prop::collection::vec(any::<(bool, u8)>(), 0..200)) {
        let mut store = SymbolStore::new([16, 16, 16, 16]);
        let mut live = BTreeSet::new();

        for (allocate, pick) in ops {
            if allocate {
                match store.allocate(Region::TempVar, Context::Level(0)) {
                    Ok(id) => {
                        prop_assert!(live.insert(id), "slot #{} handed out twice", id);
                    }
                    Err(_) => prop_assert_eq!(live.len(), 16),
                }
            } else if !live.is_empty() {
                let id = *live.iter().nth(pick as usize % live.len()).unwrap();
                store.release(id);
                live.remove(&id);
            }

            let start = store.stats(Region::TempVar).cursor;
            let expected = (17..33).find(|id| !live.contains(id)).unwrap_or(33);
            prop_assert_eq!(start, expected);
            prop_assert_eq!(store.in_use(Region::TempVar), live.len());
        }
    }

    /// Property: allocation in one range never touches another.
    #[test]
    fn prop_store_ranges_are_disjoint(counts in prop::array::uniform4(0usize..8)) {
        let mut store = SymbolStore::new([8, 8, 8, 8]);
        for (region, &count) in Region::ALL.iter().zip(counts.iter()) {
            for _ in 0..count {
                let id = store.allocate(*region, Context::Global).unwrap();
                prop_assert_eq!(store.region_of(id), Some(*region));
            }
        }
        for (region, &count) in Region::ALL.iter().zip(counts.iter()) {
            prop_assert_eq!(store.in_use(*region), count);
        }
    }
}

// ============================================================================
// List Stack Property Tests
// ============================================================================

proptest! {
    /// Property: duplicating the top list either pushes an exact copy or,
    /// on overflow, leaves the stack as it was.
    #[test]
    fn prop_duplicate_top_list_is_all_or_nothing(
        below in 0usize..6,
        top in prop::collection::vec(1usize..100, 0..6),
        capacity in 1usize..24,
    ) {
        let mut lists = ListStack::new(capacity);
        let mut pushed = Vec::new();
        for id in 0..below {
            if lists.push(id).is_err() {
                break;
            }
            pushed.push(ListItem::Symbol(id));
        }
        if lists.push_start().is_ok() {
            pushed.push(ListItem::Start);
            for &id in &top {
                if lists.push(id).is_err() {
                    break;
                }
                pushed.push(ListItem::Symbol(id));
            }
        }

        let depth = lists.depth();
        match lists.duplicate_top_list() {
            Ok(()) => {
                let len = lists.length_of_top_list();
                prop_assert_eq!(lists.depth(), depth + len + 1);
                let copy = lists.pop_list().unwrap();
                let original = lists.pop_list().unwrap();
                prop_assert_eq!(copy, original);
            }
            Err(_) => {
                prop_assert_eq!(lists.depth(), depth);
                let mut restored = Vec::new();
                while let Ok(item) = lists.pop() {
                    restored.push(item);
                }
                restored.reverse();
                prop_assert_eq!(restored, pushed);
            }
        }
    }

    /// Property: swapping two depths twice restores the stack.
    #[test]
    fn prop_swap_twice_is_identity(
        ids in prop::collection::vec(1usize..100, 1..10),
        a in 0usize..10,
        b in 0usize..10,
    ) {
        let mut lists = ListStack::new(16);
        for &id in &ids {
            lists.push(id).unwrap();
        }
        let in_range = a < ids.len() && b < ids.len();
        prop_assert_eq!(lists.swap(a, b).is_ok(), in_range);
        if in_range {
            lists.swap(a, b).unwrap();
        }
        let mut popped = Vec::new();
        while let Ok(item) = lists.pop() {
            popped.push(item);
        }
        popped.reverse();
        let expected: Vec<ListItem> = ids.iter().map(|&id| ListItem::Symbol(id)).collect();
        prop_assert_eq!(popped, expected);
    }
}

// ============================================================================
// Name Table Property Tests
// ============================================================================

proptest! {
    /// Property: the bucket of a name is stable and in range.
    #[test]
    fn prop_hash_in_range(name in "[A-Z_][A-Z0-9_]{0,20}", buckets in 1usize..128) {
        let tables = NameTables::new(buckets);
        let bucket = tables.hash(&name);
        prop_assert!(bucket < buckets);
        prop_assert_eq!(bucket, tables.hash(&name));
    }

    /// Property: a name installed under one context is invisible under
    /// another, and installing it again finds the same symbol.
    #[test]
    fn prop_names_are_scoped(names in prop::collection::btree_set("[A-Z][A-Z0-9]{0,6}", 1..20)) {
        let mut store = SymbolStore::new([64, 4, 4, 4]);
        let mut tables = NameTables::new(8);

        for name in &names {
            let (id, fresh) = tables
                .find_or_install(&mut store, NameSpace::Variable, name, Context::Global)
                .unwrap();
            prop_assert!(fresh);
            prop_assert_eq!(tables.lookup(NameSpace::Variable, name, Context::Global), Some(id));
            prop_assert_eq!(tables.lookup(NameSpace::Variable, name, Context::Symbol(1)), None);
            prop_assert_eq!(tables.lookup(NameSpace::Function, name, Context::Global), None);

            let (again, fresh) = tables
                .find_or_install(&mut store, NameSpace::Variable, name, Context::Global)
                .unwrap();
            prop_assert!(!fresh);
            prop_assert_eq!(again, id);
        }
        prop_assert_eq!(tables.bindings(NameSpace::Variable).len(), names.len());
    }
}

// ============================================================================
// Interpreter Property Tests
// ============================================================================

proptest! {
    /// Property: integer arithmetic matches Rust's wrapping arithmetic.
    #[test]
    fn prop_integer_arithmetic(a in -10000i32..10000, b in -10000i32..10000, c in 1i32..100) {
        let output = lux::run(&format!("print, ({}) + ({}) * ({})", a, b, c)).unwrap();
        prop_assert_eq!(output, format!("{}\n", a + b * c));
    }

    /// Property: every statement, successful or not, releases all of its
    /// temporaries and leaves the mark and list stacks empty.
    #[test]
    fn prop_statements_leave_no_temporaries(source in "[abc0-9 +*()=\\-\\n]{0,60}") {
        let (mut interp, _) = Interpreter::capture(InterpreterConfig::default()).unwrap();
        let _ = interp.run_source(&source);
        prop_assert_eq!(interp.store().in_use(Region::TempVar), 0);
        prop_assert_eq!(interp.store().in_use(Region::TempExec), 0);
        prop_assert_eq!(interp.marks().depth(), 0);
        prop_assert_eq!(interp.lists().depth(), 0);
    }

    /// Property: token spans stay within the source.
    #[test]
    fn prop_lexer_spans_in_bounds(source in "[a-zA-Z0-9_ +\\-*/=:(),'\\n]{0,200}") {
        if let Ok(tokens) = lexer::tokenize(&source) {
            for (token, span) in &tokens {
                prop_assert!(span.start <= span.end);
                prop_assert!(
                    span.end <= source.len(),
                    "Token {:?} span end {} exceeds source length {}",
                    token, span.end, source.len()
                );
            }
        }
    }
}
