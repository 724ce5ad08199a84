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

//! The symbol table.
//!
//! Variables, literals, syntax-tree nodes, routines and parser bookkeeping
//! objects all live in one flat store and share one numbering space. This
//! module provides:
//! - [`payload`]: the symbol payload sum type and class tags
//! - [`store`]: the four-range slot allocator
//! - [`names`]: the hash name tables
//! - [`marks`]: the mark stack for temporaries
//! - [`lists`]: the list/argument stack used while parsing

pub mod lists;
pub mod marks;
pub mod names;
pub mod payload;
pub mod store;

pub use lists::{ListItem, ListStack};
pub use marks::{Mark, MarkStack};
pub use names::{NameSpace, NameTables};
pub use payload::*;
pub use store::{Region, RegionStats, SymbolStore};

use std::fmt;

/// Index of a symbol in the store. Index 0 is never allocated.
pub type SymbolId = usize;

/// Owner or scope of a symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Context {
    /// Global scope (context 0).
    #[default]
    Global,
    /// Owned by, or scoped to, another symbol.
    Symbol(SymbolId),
    /// Fresh and unowned, created at the given compile level.
    Level(u32),
}

impl Context {
    /// Whether the symbol has not been embedded anywhere yet.
    pub fn is_unowned(self) -> bool {
        matches!(self, Context::Level(_))
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Context::Global => write!(f, "0"),
            Context::Symbol(id) => write!(f, "{}", id),
            Context::Level(level) => write!(f, "-{}", level + 1),
        }
    }
}

/// Where a named symbol is recorded in the name tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub space: NameSpace,
    pub bucket: usize,
}

/// One slot of the symbol store.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub payload: Payload,
    pub context: Context,
    pub binding: Option<Binding>,
    /// Source line that was being compiled when the slot was allocated.
    pub line: u32,
    /// Statement sequence number at allocation.
    pub seq: u64,
}

impl Symbol {
    /// A free slot.
    pub fn unused() -> Self {
        Self {
            payload: Payload::Unused,
            context: Context::Global,
            binding: None,
            line: 0,
            seq: 0,
        }
    }

    pub fn class(&self) -> SymbolClass {
        self.payload.class()
    }

    pub fn is_unused(&self) -> bool {
        matches!(self.payload, Payload::Unused)
    }
}
