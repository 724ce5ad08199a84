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

//! The symbol store: one vector of slots split into four ranges.
//!
//! Each range keeps a cursor that always points at its lowest free slot, so
//! a released slot is the next one handed out.

use std::ops::{Index, IndexMut};

use super::{Context, Symbol, SymbolId};
use crate::error::{ErrorCode, LuxError, Result};

/// The four allocation ranges, in store order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Named,
    TempVar,
    Exec,
    TempExec,
}

impl Region {
    pub const ALL: [Region; 4] = [Region::Named, Region::TempVar, Region::Exec, Region::TempExec];

    pub fn name(self) -> &'static str {
        match self {
            Region::Named => "named",
            Region::TempVar => "temporary",
            Region::Exec => "executable",
            Region::TempExec => "temporary executable",
        }
    }

    /// Whether symbols of this range are swept.
    pub fn is_temporary(self) -> bool {
        matches!(self, Region::TempVar | Region::TempExec)
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// Usage counters of one range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionStats {
    pub region: Region,
    pub capacity: usize,
    pub in_use: usize,
    /// Lowest free index, or one past the range when full.
    pub cursor: SymbolId,
}

#[derive(Debug, Clone)]
struct RegionState {
    start: SymbolId,
    end: SymbolId,
    cursor: SymbolId,
    in_use: usize,
}

/// Flat symbol storage.
#[derive(Debug, Clone)]
pub struct SymbolStore {
    symbols: Vec<Symbol>,
    regions: [RegionState; 4],
    line: u32,
    seq: u64,
}

impl SymbolStore {
    /// Create a store with the given range capacities (named, temporary,
    /// executable, temporary executable).
    pub fn new(capacities: [usize; 4]) -> Self {
        let mut start = 1;
        let regions = capacities.map(|capacity| {
            let state = RegionState {
                start,
                end: start + capacity,
                cursor: start,
                in_use: 0,
            };
            start += capacity;
            state
        });
        Self {
            symbols: vec![Symbol::unused(); start],
            regions,
            line: 0,
            seq: 0,
        }
    }

    /// Record the source line stamped onto new symbols.
    pub fn set_line(&mut self, line: u32) {
        self.line = line;
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    /// Advance the statement sequence number stamped onto new symbols.
    pub fn next_statement(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    /// Allocate the lowest free slot of `region`, stamped with `context`.
    pub fn allocate(&mut self, region: Region, context: Context) -> Result<SymbolId> {
        let state = &self.regions[region.slot()];
        let id = state.cursor;
        if id >= state.end {
            return Err(LuxError::new(
                ErrorCode::OutOfSymbols,
                format!("No free slot in the {} symbol range", region.name()),
            )
            .with_hint("release symbols or raise the range capacity"));
        }

        self.symbols[id] = Symbol {
            payload: super::Payload::Undefined,
            context,
            binding: None,
            line: self.line,
            seq: self.seq,
        };

        let end = state.end;
        let mut next = id + 1;
        while next < end && !self.symbols[next].is_unused() {
            next += 1;
        }
        let state = &mut self.regions[region.slot()];
        state.cursor = next;
        state.in_use += 1;

        log::trace!("allocated {} symbol #{}", region.name(), id);
        Ok(id)
    }

    pub fn allocate_named(&mut self, context: Context) -> Result<SymbolId> {
        self.allocate(Region::Named, context)
    }

    pub fn allocate_temp_var(&mut self, context: Context) -> Result<SymbolId> {
        self.allocate(Region::TempVar, context)
    }

    pub fn allocate_exec(&mut self, context: Context) -> Result<SymbolId> {
        self.allocate(Region::Exec, context)
    }

    pub fn allocate_temp_exec(&mut self, context: Context) -> Result<SymbolId> {
        self.allocate(Region::TempExec, context)
    }

    /// Return a slot to its range. Releasing a free or out-of-range slot is
    /// ignored.
    pub fn release(&mut self, id: SymbolId) {
        let Some(region) = self.region_of(id) else {
            return;
        };
        if self.symbols[id].is_unused() {
            return;
        }
        self.symbols[id] = Symbol::unused();
        let state = &mut self.regions[region.slot()];
        state.in_use -= 1;
        state.cursor = state.cursor.min(id);
        log::trace!("released {} symbol #{}", region.name(), id);
    }

    /// The range `id` belongs to.
    pub fn region_of(&self, id: SymbolId) -> Option<Region> {
        Region::ALL.into_iter().find(|region| {
            let state = &self.regions[region.slot()];
            (state.start..state.end).contains(&id)
        })
    }

    /// Whether `id` lies in one of the swept ranges.
    pub fn is_temporary(&self, id: SymbolId) -> bool {
        self.region_of(id).is_some_and(Region::is_temporary)
    }

    /// Checked access for indices that come from user input.
    pub fn get(&self, id: SymbolId) -> Result<&Symbol> {
        match self.symbols.get(id) {
            Some(symbol) if id > 0 => Ok(symbol),
            _ => Err(LuxError::new(
                ErrorCode::SymbolOutOfBounds,
                format!("Symbol #{} is out of bounds", id),
            )),
        }
    }

    /// Whether `id` is an allocated slot.
    pub fn is_live(&self, id: SymbolId) -> bool {
        id > 0 && self.symbols.get(id).is_some_and(|s| !s.is_unused())
    }

    pub fn stats(&self, region: Region) -> RegionStats {
        let state = &self.regions[region.slot()];
        RegionStats {
            region,
            capacity: state.end - state.start,
            in_use: state.in_use,
            cursor: state.cursor,
        }
    }

    pub fn cursor(&self, region: Region) -> SymbolId {
        self.regions[region.slot()].cursor
    }

    pub fn in_use(&self, region: Region) -> usize {
        self.regions[region.slot()].in_use
    }

    /// Number of allocated slots over all ranges.
    pub fn in_use_total(&self) -> usize {
        self.regions.iter().map(|state| state.in_use).sum()
    }

    /// Indices of all allocated slots of `region`, in ascending order.
    pub fn live_ids(&self, region: Region) -> Vec<SymbolId> {
        let state = &self.regions[region.slot()];
        (state.start..state.end)
            .filter(|&id| !self.symbols[id].is_unused())
            .collect()
    }

    /// Drop every symbol and rewind all cursors.
    pub fn reset(&mut self) {
        for symbol in &mut self.symbols {
            *symbol = Symbol::unused();
        }
        for state in &mut self.regions {
            state.cursor = state.start;
            state.in_use = 0;
        }
    }
}

impl Index<SymbolId> for SymbolStore {
    type Output = Symbol;

    fn index(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id]
    }
}

impl IndexMut<SymbolId> for SymbolStore {
    fn index_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::Payload;

    fn store() -> SymbolStore {
        SymbolStore::new([4, 4, 4, 4])
    }

    #[test]
    fn test_ranges_are_contiguous() {
        let store = store();
        assert_eq!(store.region_of(0), None);
        assert_eq!(store.region_of(1), Some(Region::Named));
        assert_eq!(store.region_of(5), Some(Region::TempVar));
        assert_eq!(store.region_of(9), Some(Region::Exec));
        assert_eq!(store.region_of(16), Some(Region::TempExec));
        assert_eq!(store.region_of(17), None);
    }

    #[test]
    fn test_allocate_stamps_context() {
        let mut store = store();
        let id = store.allocate_temp_var(Context::Level(0)).unwrap();
        assert_eq!(id, 5);
        assert_eq!(store[id].context, Context::Level(0));
        assert_eq!(store[id].payload, Payload::Undefined);
    }

    #[test]
    fn test_release_reuses_lowest_slot() {
        let mut store = store();
        let a = store.allocate_named(Context::Global).unwrap();
        let b = store.allocate_named(Context::Global).unwrap();
        let c = store.allocate_named(Context::Global).unwrap();
        store.release(b);
        store.release(a);
        assert_eq!(store.allocate_named(Context::Global).unwrap(), a);
        assert_eq!(store.allocate_named(Context::Global).unwrap(), b);
        assert_eq!(store.allocate_named(Context::Global).unwrap(), c + 1);
    }

    #[test]
    fn test_exhaustion_is_an_error() {
        let mut store = store();
        for _ in 0..4 {
            store.allocate_exec(Context::Global).unwrap();
        }
        let err = store.allocate_exec(Context::Global).unwrap_err();
        assert_eq!(err.code, ErrorCode::OutOfSymbols);
        assert_eq!(store.in_use(Region::Exec), 4);
        // other ranges are unaffected
        assert!(store.allocate_temp_exec(Context::Global).is_ok());
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut store = store();
        let id = store.allocate_temp_exec(Context::Global).unwrap();
        store.release(id);
        store.release(id);
        assert_eq!(store.in_use(Region::TempExec), 0);
        assert_eq!(store.cursor(Region::TempExec), id);
    }

    #[test]
    fn test_checked_get() {
        let store = store();
        assert!(store.get(0).is_err());
        assert!(store.get(3).is_ok());
        assert_eq!(store.get(99).unwrap_err().code, ErrorCode::SymbolOutOfBounds);
    }

    #[test]
    fn test_reset() {
        let mut store = store();
        store.allocate_named(Context::Global).unwrap();
        store.allocate_temp_var(Context::Level(0)).unwrap();
        store.reset();
        assert_eq!(store.in_use(Region::Named), 0);
        assert_eq!(store.cursor(Region::TempVar), 5);
        assert!(store.live_ids(Region::Named).is_empty());
    }
}
