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

//! Interpreter configuration.

use std::path::PathBuf;

/// Capacities and search settings for one interpreter instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterConfig {
    /// Slots in the named-variable range.
    pub named_slots: usize,
    /// Slots in the temporary-variable range.
    pub temp_slots: usize,
    /// Slots in the executable range.
    pub exec_slots: usize,
    /// Slots in the temporary-executable range.
    pub temp_exec_slots: usize,
    /// Maximum number of entries on the list stack.
    pub list_stack_size: usize,
    /// Maximum number of entries on the mark stack.
    pub mark_stack_size: usize,
    /// Number of buckets per name table.
    pub hash_buckets: usize,
    /// Maximum nesting of `@file` / `@@file` inclusion.
    pub max_include_depth: usize,
    /// Directory that relative include paths are resolved against first.
    pub base_dir: PathBuf,
    /// Additional directories searched for include and routine files.
    pub search_path: Vec<PathBuf>,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            named_slots: 4000,
            temp_slots: 4000,
            exec_slots: 8000,
            temp_exec_slots: 2000,
            list_stack_size: 1000,
            mark_stack_size: 2000,
            hash_buckets: 64,
            max_include_depth: 16,
            base_dir: PathBuf::from("."),
            search_path: Vec::new(),
        }
    }
}

impl InterpreterConfig {
    /// Set all four range capacities at once.
    pub fn with_capacities(mut self, named: usize, temp: usize, exec: usize, temp_exec: usize) -> Self {
        self.named_slots = named;
        self.temp_slots = temp;
        self.exec_slots = exec;
        self.temp_exec_slots = temp_exec;
        self
    }

    /// Set the base directory for include resolution.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    /// Append a directory to the search path.
    pub fn with_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_path.push(dir.into());
        self
    }

    /// The four range capacities in store order.
    pub fn capacities(&self) -> [usize; 4] {
        [
            self.named_slots,
            self.temp_slots,
            self.exec_slots,
            self.temp_exec_slots,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacities() {
        let config = InterpreterConfig::default();
        assert_eq!(config.capacities(), [4000, 4000, 8000, 2000]);
        assert_eq!(config.hash_buckets, 64);
    }

    #[test]
    fn test_builder_methods() {
        let config = InterpreterConfig::default()
            .with_capacities(10, 20, 30, 40)
            .with_base_dir("/tmp")
            .with_search_dir("/opt/lux");
        assert_eq!(config.capacities(), [10, 20, 30, 40]);
        assert_eq!(config.base_dir, PathBuf::from("/tmp"));
        assert_eq!(config.search_path, vec![PathBuf::from("/opt/lux")]);
    }
}
