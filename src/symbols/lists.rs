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

//! The list stack, where the parser accumulates variable-length item lists
//! (arguments, list members, statements of a block) before the constructor
//! consumes them.

use super::SymbolId;
use crate::error::{ErrorCode, LuxError, Result};

/// One list-stack entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListItem {
    /// Start-of-list sentinel.
    Start,
    Symbol(SymbolId),
    /// A key or tag name.
    Name(String),
}

/// Bounded LIFO of list items.
#[derive(Debug, Clone)]
pub struct ListStack {
    items: Vec<ListItem>,
    capacity: usize,
}

impl ListStack {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::new(),
            capacity,
        }
    }

    fn push_item(&mut self, item: ListItem) -> Result<()> {
        self.reserve(1)?;
        self.items.push(item);
        Ok(())
    }

    fn reserve(&self, count: usize) -> Result<()> {
        if self.capacity.saturating_sub(self.items.len()) < count {
            return Err(LuxError::new(ErrorCode::ListStackOverflow, "List stack overflow")
                .with_hint("the expression nests too many lists"));
        }
        Ok(())
    }

    pub fn push_start(&mut self) -> Result<()> {
        self.push_item(ListItem::Start)
    }

    pub fn push(&mut self, id: SymbolId) -> Result<()> {
        self.push_item(ListItem::Symbol(id))
    }

    pub fn push_name(&mut self, name: impl Into<String>) -> Result<()> {
        self.push_item(ListItem::Name(name.into()))
    }

    pub fn pop(&mut self) -> Result<ListItem> {
        self.items.pop().ok_or_else(underflow)
    }

    /// Number of items above the topmost start sentinel.
    pub fn length_of_top_list(&self) -> usize {
        self.items
            .iter()
            .rev()
            .take_while(|item| **item != ListItem::Start)
            .count()
    }

    /// Pop the top list including its start sentinel. Items are returned in
    /// push order.
    pub fn pop_list(&mut self) -> Result<Vec<ListItem>> {
        let start = self
            .items
            .iter()
            .rposition(|item| *item == ListItem::Start)
            .ok_or_else(underflow)?;
        let list = self.items.split_off(start + 1);
        self.pop()?;
        Ok(list)
    }

    /// Pop the top list, which must hold symbols only.
    pub fn pop_symbols(&mut self) -> Result<Vec<SymbolId>> {
        self.pop_list()?
            .into_iter()
            .map(|item| match item {
                ListItem::Symbol(id) => Ok(id),
                other => Err(LuxError::new(
                    ErrorCode::UnexpectedSentinel,
                    format!("Expected a symbol on the list stack, found {:?}", other),
                )),
            })
            .collect()
    }

    /// Exchange the entries `depth1` and `depth2` below the top (0 is the top).
    pub fn swap(&mut self, depth1: usize, depth2: usize) -> Result<()> {
        let len = self.items.len();
        if depth1 >= len || depth2 >= len {
            return Err(underflow());
        }
        self.items.swap(len - 1 - depth1, len - 1 - depth2);
        Ok(())
    }

    /// Push a copy of the top list, start sentinel included. On overflow
    /// nothing is pushed.
    pub fn duplicate_top_list(&mut self) -> Result<()> {
        let start = self
            .items
            .iter()
            .rposition(|item| *item == ListItem::Start)
            .ok_or_else(underflow)?;
        self.reserve(self.items.len() - start)?;
        self.items.extend_from_within(start..);
        Ok(())
    }

    pub fn depth(&self) -> usize {
        self.items.len()
    }

    /// Drop everything above `depth`, returning the dropped items in push order.
    pub fn truncate(&mut self, depth: usize) -> Vec<ListItem> {
        if depth >= self.items.len() {
            return Vec::new();
        }
        self.items.split_off(depth)
    }
}

fn underflow() -> LuxError {
    LuxError::new(ErrorCode::ListStackUnderflow, "List stack underflow")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_pop_list_in_push_order() {
        let mut lists = ListStack::new(16);
        lists.push_start().unwrap();
        lists.push(1).unwrap();
        lists.push_start().unwrap();
        lists.push(2).unwrap();
        lists.push(3).unwrap();
        assert_eq!(lists.length_of_top_list(), 2);
        assert_eq!(lists.pop_symbols().unwrap(), vec![2, 3]);
        assert_eq!(lists.length_of_top_list(), 1);
        assert_eq!(lists.pop_symbols().unwrap(), vec![1]);
        assert_eq!(lists.depth(), 0);
    }

    #[test]
    fn test_names_and_symbols() {
        let mut lists = ListStack::new(16);
        lists.push_start().unwrap();
        lists.push_name("A").unwrap();
        lists.push(7).unwrap();
        assert_eq!(
            lists.pop_list().unwrap(),
            vec![ListItem::Name("A".to_string()), ListItem::Symbol(7)]
        );
    }

    #[test]
    fn test_swap() {
        let mut lists = ListStack::new(16);
        lists.push(1).unwrap();
        lists.push(2).unwrap();
        lists.swap(0, 1).unwrap();
        assert_eq!(lists.pop().unwrap(), ListItem::Symbol(1));
        assert_eq!(lists.pop().unwrap(), ListItem::Symbol(2));
        assert!(lists.swap(0, 1).is_err());
    }

    #[test]
    fn test_duplicate_top_list() {
        let mut lists = ListStack::new(16);
        lists.push_start().unwrap();
        lists.push(4).unwrap();
        lists.duplicate_top_list().unwrap();
        assert_eq!(lists.depth(), 4);
        assert_eq!(lists.pop_symbols().unwrap(), vec![4]);
        assert_eq!(lists.pop_symbols().unwrap(), vec![4]);
    }

    #[test]
    fn test_duplicate_overflow_leaves_stack_unchanged() {
        let mut lists = ListStack::new(5);
        lists.push_start().unwrap();
        lists.push(4).unwrap();
        lists.push(5).unwrap();
        let err = lists.duplicate_top_list().unwrap_err();
        assert_eq!(err.code, ErrorCode::ListStackOverflow);
        assert_eq!(lists.depth(), 3);
        assert_eq!(lists.pop_symbols().unwrap(), vec![4, 5]);
        assert_eq!(lists.depth(), 0);

        let mut lists = ListStack::new(4);
        lists.push_start().unwrap();
        lists.push(7).unwrap();
        lists.duplicate_top_list().unwrap();
        assert_eq!(lists.depth(), 4);
        assert_eq!(lists.duplicate_top_list().unwrap_err().code, ErrorCode::ListStackOverflow);
        assert_eq!(lists.depth(), 4);
    }

    #[test]
    fn test_overflow_and_underflow() {
        let mut lists = ListStack::new(1);
        lists.push(1).unwrap();
        assert_eq!(lists.push(2).unwrap_err().code, ErrorCode::ListStackOverflow);
        lists.pop().unwrap();
        assert_eq!(lists.pop().unwrap_err().code, ErrorCode::ListStackUnderflow);
        assert_eq!(lists.pop_list().unwrap_err().code, ErrorCode::ListStackUnderflow);
    }

    #[test]
    fn test_truncate() {
        let mut lists = ListStack::new(16);
        lists.push(1).unwrap();
        lists.push_start().unwrap();
        lists.push(2).unwrap();
        assert_eq!(lists.truncate(1), vec![ListItem::Start, ListItem::Symbol(2)]);
        assert_eq!(lists.depth(), 1);
        assert!(lists.truncate(5).is_empty());
    }
}
