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

//! Hash name tables.
//!
//! There is one table per name space. A binding matches only under the exact
//! context it was recorded with, except that sigil names (`!X`, `#X`, `$X`)
//! always resolve under the global context.

use super::store::SymbolStore;
use super::{Binding, Context, Payload, SymbolId};
use crate::error::Result;

/// The four independent name spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameSpace {
    Variable,
    Subroutine,
    Function,
    Block,
}

impl NameSpace {
    pub const ALL: [NameSpace; 4] = [
        NameSpace::Variable,
        NameSpace::Subroutine,
        NameSpace::Function,
        NameSpace::Block,
    ];

    fn slot(self) -> usize {
        self as usize
    }
}

/// Whether `name` carries a global-scope sigil.
pub fn is_sigil_name(name: &str) -> bool {
    name.starts_with(['!', '#', '$'])
}

/// The context a name is actually resolved under.
pub fn effective_context(name: &str, context: Context) -> Context {
    if is_sigil_name(name) {
        Context::Global
    } else {
        context
    }
}

#[derive(Debug, Clone)]
struct NameNode {
    name: String,
    context: Context,
    index: SymbolId,
}

/// Bucketed name tables for variables, subroutines, functions and blocks.
#[derive(Debug, Clone)]
pub struct NameTables {
    tables: [Vec<Vec<NameNode>>; 4],
    buckets: usize,
}

impl NameTables {
    pub fn new(buckets: usize) -> Self {
        let buckets = buckets.max(1);
        Self {
            tables: std::array::from_fn(|_| vec![Vec::new(); buckets]),
            buckets,
        }
    }

    /// Bucket of `name`.
    pub fn hash(&self, name: &str) -> usize {
        let mut hash: u32 = 0;
        for byte in name.bytes() {
            hash = hash.wrapping_mul(31).wrapping_add(byte as u32);
        }
        hash as usize % self.buckets
    }

    /// Find the symbol bound to `name` under `context`.
    pub fn lookup(&self, space: NameSpace, name: &str, context: Context) -> Option<SymbolId> {
        let context = effective_context(name, context);
        self.tables[space.slot()][self.hash(name)]
            .iter()
            .find(|node| node.context == context && node.name == name)
            .map(|node| node.index)
    }

    /// Record a binding of `name` to `index`. The caller must have checked
    /// that the name is not yet bound under this context.
    pub fn insert(&mut self, space: NameSpace, name: &str, context: Context, index: SymbolId) -> Binding {
        let bucket = self.hash(name);
        self.tables[space.slot()][bucket].insert(
            0,
            NameNode {
                name: name.to_string(),
                context: effective_context(name, context),
                index,
            },
        );
        Binding { space, bucket }
    }

    /// Look `name` up and install a new named symbol if it is missing.
    ///
    /// Returns the index and whether it was newly installed. New symbols are
    /// `Undefined` and carry the effective context.
    pub fn find_or_install(
        &mut self,
        store: &mut SymbolStore,
        space: NameSpace,
        name: &str,
        context: Context,
    ) -> Result<(SymbolId, bool)> {
        if let Some(id) = self.lookup(space, name, context) {
            return Ok((id, false));
        }
        let context = effective_context(name, context);
        let id = store.allocate_named(context)?;
        store[id].payload = Payload::Undefined;
        store[id].binding = Some(self.insert(space, name, context, id));
        log::debug!("installed {:?} name {} as #{} in context {}", space, name, id, context);
        Ok((id, true))
    }

    /// Remove the binding of `index`, returning the name it had.
    pub fn remove(&mut self, binding: Binding, index: SymbolId) -> Option<String> {
        let chain = &mut self.tables[binding.space.slot()][binding.bucket];
        let position = chain.iter().position(|node| node.index == index)?;
        Some(chain.remove(position).name)
    }

    /// The name recorded for `index`.
    pub fn name_of(&self, binding: Binding, index: SymbolId) -> Option<&str> {
        self.tables[binding.space.slot()][binding.bucket]
            .iter()
            .find(|node| node.index == index)
            .map(|node| node.name.as_str())
    }

    /// All `(name, context, index)` triples of a name space.
    pub fn bindings(&self, space: NameSpace) -> Vec<(&str, Context, SymbolId)> {
        self.tables[space.slot()]
            .iter()
            .flatten()
            .map(|node| (node.name.as_str(), node.context, node.index))
            .collect()
    }

    pub fn clear(&mut self) {
        for table in &mut self.tables {
            for chain in table.iter_mut() {
                chain.clear();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (NameTables, SymbolStore) {
        (NameTables::new(8), SymbolStore::new([16, 4, 4, 4]))
    }

    #[test]
    fn test_same_name_same_context_same_index() {
        let (mut names, mut store) = setup();
        let (a, new_a) = names
            .find_or_install(&mut store, NameSpace::Variable, "X", Context::Global)
            .unwrap();
        let (b, new_b) = names
            .find_or_install(&mut store, NameSpace::Variable, "X", Context::Global)
            .unwrap();
        assert_eq!(a, b);
        assert!(new_a);
        assert!(!new_b);
    }

    #[test]
    fn test_different_context_different_index() {
        let (mut names, mut store) = setup();
        let (a, _) = names
            .find_or_install(&mut store, NameSpace::Variable, "X", Context::Global)
            .unwrap();
        let (b, _) = names
            .find_or_install(&mut store, NameSpace::Variable, "X", Context::Symbol(7))
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(store[b].context, Context::Symbol(7));
    }

    #[test]
    fn test_sigil_names_are_global() {
        let (mut names, mut store) = setup();
        let (a, _) = names
            .find_or_install(&mut store, NameSpace::Variable, "$COUNT", Context::Symbol(3))
            .unwrap();
        let (b, _) = names
            .find_or_install(&mut store, NameSpace::Variable, "$COUNT", Context::Symbol(9))
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(store[a].context, Context::Global);
    }

    #[test]
    fn test_name_spaces_are_independent() {
        let (mut names, mut store) = setup();
        let (var, _) = names
            .find_or_install(&mut store, NameSpace::Variable, "F", Context::Global)
            .unwrap();
        let (func, _) = names
            .find_or_install(&mut store, NameSpace::Function, "F", Context::Global)
            .unwrap();
        assert_ne!(var, func);
        assert_eq!(names.lookup(NameSpace::Subroutine, "F", Context::Global), None);
    }

    #[test]
    fn test_remove_binding() {
        let (mut names, mut store) = setup();
        let (id, _) = names
            .find_or_install(&mut store, NameSpace::Block, "SETUP", Context::Global)
            .unwrap();
        let binding = store[id].binding.unwrap();
        assert_eq!(names.name_of(binding, id), Some("SETUP"));
        assert_eq!(names.remove(binding, id), Some("SETUP".to_string()));
        assert_eq!(names.lookup(NameSpace::Block, "SETUP", Context::Global), None);
        assert_eq!(names.remove(binding, id), None);
    }

    #[test]
    fn test_colliding_names_share_a_bucket() {
        let (mut names, mut store) = setup();
        for i in 0..20 {
            names
                .find_or_install(&mut store, NameSpace::Variable, &format!("V{}", i), Context::Global)
                .ok();
        }
        // 16 named slots: the rest failed to allocate but nothing was bound
        assert_eq!(names.bindings(NameSpace::Variable).len(), 16);
        assert!(names.lookup(NameSpace::Variable, "V15", Context::Global).is_some());
        assert!(names.lookup(NameSpace::Variable, "V16", Context::Global).is_none());
    }
}
