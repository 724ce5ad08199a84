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

//! The mark stack.
//!
//! Every unowned temporary is recorded here exactly once until it is swept
//! or handed to an owner. Pegs delimit what a sweep may destroy: a statement
//! peg for one executed statement, a parse peg for one parsed statement.
//! This module only pops entries; destroying the popped symbols is up to
//! the caller.

use super::SymbolId;
use crate::error::{ErrorCode, LuxError, Result};

/// One mark-stack entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    /// An unowned temporary.
    Temp(SymbolId),
    /// Start of one executed statement.
    Peg,
    /// Start of one parsed statement.
    ParsePeg,
    /// A temporary that was unmarked in place.
    Null,
}

/// Bounded stack of temporaries and sentinels.
#[derive(Debug, Clone)]
pub struct MarkStack {
    entries: Vec<Mark>,
    capacity: usize,
}

impl MarkStack {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    fn push(&mut self, mark: Mark) -> Result<()> {
        if self.entries.len() >= self.capacity {
            return Err(LuxError::new(
                ErrorCode::MarkStackOverflow,
                "Too many temporaries are alive at once",
            ));
        }
        self.entries.push(mark);
        Ok(())
    }

    /// Record an unowned temporary.
    pub fn mark(&mut self, id: SymbolId) -> Result<()> {
        self.push(Mark::Temp(id))
    }

    /// Open a statement scope.
    pub fn peg(&mut self) -> Result<()> {
        self.push(Mark::Peg)
    }

    /// Open a parse scope.
    pub fn peg_parse(&mut self) -> Result<()> {
        self.push(Mark::ParsePeg)
    }

    /// Forget `id` without destroying it. Returns whether it was marked.
    pub fn unmark(&mut self, id: SymbolId) -> bool {
        match self
            .entries
            .iter_mut()
            .rev()
            .find(|entry| **entry == Mark::Temp(id))
        {
            Some(entry) => {
                *entry = Mark::Null;
                true
            }
            None => false,
        }
    }

    pub fn is_marked(&self, id: SymbolId) -> bool {
        self.entries.contains(&Mark::Temp(id))
    }

    /// Pop everything above the last statement peg and return the
    /// temporaries in pop order. The peg itself stays.
    ///
    /// Reaching a parse peg first means no statement scope is open; the
    /// temporaries popped so far are returned and the parse peg is kept.
    pub fn drain_to_peg(&mut self) -> Result<Vec<SymbolId>> {
        let mut doomed = Vec::new();
        loop {
            match self.entries.last().copied() {
                Some(Mark::Peg) => return Ok(doomed),
                Some(Mark::ParsePeg) => {
                    log::warn!("statement sweep reached a parse peg");
                    return Ok(doomed);
                }
                Some(_) => {
                    if let Some(Mark::Temp(id)) = self.entries.pop() {
                        doomed.push(id);
                    }
                }
                None => return Err(corrupt("statement")),
            }
        }
    }

    /// Pop everything above the last parse peg and return the temporaries in
    /// pop order. The parse peg itself stays. Statement pegs met on the way
    /// are reported and discarded.
    pub fn drain_to_parse_peg(&mut self) -> Result<Vec<SymbolId>> {
        let mut doomed = Vec::new();
        loop {
            match self.entries.last().copied() {
                Some(Mark::ParsePeg) => return Ok(doomed),
                Some(Mark::Peg) => {
                    log::warn!("parse sweep discarded an open statement peg");
                    self.entries.pop();
                }
                Some(_) => {
                    if let Some(Mark::Temp(id)) = self.entries.pop() {
                        doomed.push(id);
                    }
                }
                None => return Err(corrupt("parse")),
            }
        }
    }

    /// Remove the statement peg on top of the stack.
    pub fn pop_peg(&mut self) -> Result<()> {
        self.pop_sentinel(Mark::Peg)
    }

    /// Remove the parse peg on top of the stack.
    pub fn pop_parse_peg(&mut self) -> Result<()> {
        self.pop_sentinel(Mark::ParsePeg)
    }

    fn pop_sentinel(&mut self, expected: Mark) -> Result<()> {
        match self.entries.last().copied() {
            Some(top) if top == expected => {
                self.entries.pop();
                Ok(())
            }
            Some(top) => Err(LuxError::new(
                ErrorCode::UnexpectedSentinel,
                format!("Expected {:?} on the mark stack, found {:?}", expected, top),
            )),
            None => Err(corrupt("sentinel")),
        }
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

fn corrupt(kind: &str) -> LuxError {
    LuxError::new(
        ErrorCode::MarkStackCorrupt,
        format!("Mark stack exhausted during {} sweep", kind),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_stops_at_peg() {
        let mut marks = MarkStack::new(16);
        marks.mark(1).unwrap();
        marks.peg().unwrap();
        marks.mark(2).unwrap();
        marks.mark(3).unwrap();
        assert_eq!(marks.drain_to_peg().unwrap(), vec![3, 2]);
        assert_eq!(marks.depth(), 2);
        marks.pop_peg().unwrap();
        assert!(marks.is_marked(1));
    }

    #[test]
    fn test_unmarked_entries_are_skipped() {
        let mut marks = MarkStack::new(16);
        marks.peg().unwrap();
        marks.mark(5).unwrap();
        marks.mark(6).unwrap();
        assert!(marks.unmark(5));
        assert!(!marks.unmark(5));
        assert_eq!(marks.drain_to_peg().unwrap(), vec![6]);
    }

    #[test]
    fn test_parse_sweep_discards_statement_pegs() {
        let mut marks = MarkStack::new(16);
        marks.peg_parse().unwrap();
        marks.mark(1).unwrap();
        marks.peg().unwrap();
        marks.mark(2).unwrap();
        assert_eq!(marks.drain_to_parse_peg().unwrap(), vec![2, 1]);
        marks.pop_parse_peg().unwrap();
        assert_eq!(marks.depth(), 0);
    }

    #[test]
    fn test_statement_sweep_keeps_parse_peg() {
        let mut marks = MarkStack::new(16);
        marks.peg_parse().unwrap();
        marks.mark(4).unwrap();
        assert_eq!(marks.drain_to_peg().unwrap(), vec![4]);
        assert_eq!(marks.depth(), 1);
    }

    #[test]
    fn test_empty_stack_is_corrupt() {
        let mut marks = MarkStack::new(16);
        marks.mark(1).unwrap();
        let err = marks.drain_to_peg().unwrap_err();
        assert_eq!(err.code, ErrorCode::MarkStackCorrupt);
        assert!(err.code.is_fatal());
    }

    #[test]
    fn test_overflow() {
        let mut marks = MarkStack::new(2);
        marks.mark(1).unwrap();
        marks.mark(2).unwrap();
        assert_eq!(marks.mark(3).unwrap_err().code, ErrorCode::MarkStackOverflow);
    }

    #[test]
    fn test_pop_wrong_sentinel() {
        let mut marks = MarkStack::new(4);
        marks.peg_parse().unwrap();
        assert_eq!(marks.pop_peg().unwrap_err().code, ErrorCode::UnexpectedSentinel);
        assert!(marks.pop_parse_peg().is_ok());
    }
}
