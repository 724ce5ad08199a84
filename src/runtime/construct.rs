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

//! The symbol constructor.
//!
//! Every symbol is created here. The constructor picks the range, fills the
//! payload, consumes list-stack entries for variable-length classes and
//! embeds the children into the new symbol.

use super::routine::RoutineCompiler;
use super::Interpreter;
use crate::error::{ErrorCode, LuxError, Result};
use crate::symbols::{
    BinaryOp, Complex, Context, Evb, Extract, ListEntry, ListItem, LogicOp, NumType, Payload,
    PreExtract, PreRange, PreRangeEnd, RangeFlags, Region, RoutineKind, RoutineRef, Scalar,
    Section, StringKind, SymbolId,
};

/// Where a new symbol goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Temporary variable range, marked.
    Temp,
    /// Literal from source text: executable range while a routine body is
    /// compiled, otherwise a marked temporary.
    Literal,
    /// Syntax-tree node: executable range while a routine body is compiled,
    /// otherwise the temporary-executable range.
    Executable,
    /// Member of a container, owned by the given symbol from the start.
    ChildOf(SymbolId),
}

/// Callee of a call node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallTarget {
    Builtin(usize),
    User(SymbolId),
}

/// Construction request.
#[derive(Debug, Clone, PartialEq)]
pub enum NewSymbol {
    /// Numeric literal.
    Number(Scalar),
    /// Imaginary literal.
    Imaginary(f64),
    /// String literal.
    Text(String),
    /// Computed value (always a temporary).
    Value(Payload),
    /// Function pointer literal `&NAME`.
    FuncPtr(RoutineRef),
    PreRange {
        start: Option<PreRangeEnd>,
        end: Option<PreRangeEnd>,
        flags: RangeFlags,
    },
    /// `{...}` from the top list: `Name` items tag the following symbol.
    PreList,
    /// `{...}` without tags, from the top list.
    PreCList,
    Keyword {
        name: String,
        value: SymbolId,
    },
    /// Extraction from `target`, popping `sections` lists.
    Extract {
        target: SymbolId,
        sections: usize,
    },
    /// Extraction from a not yet known name, popping `sections` lists.
    PreExtract {
        name: String,
        sections: usize,
    },
    /// Function call; arguments from the top list.
    FuncCall(CallTarget),
    /// Subroutine call statement; arguments from the top list.
    SubCall(CallTarget),
    BinOp {
        op: BinaryOp,
        lhs: SymbolId,
        rhs: SymbolId,
    },
    IfOp {
        op: LogicOp,
        lhs: SymbolId,
        rhs: SymbolId,
    },
    /// `BEGIN ... END`; statements from the top list.
    Block,
    /// `CASE`; condition/statement pairs from the top list, plus a trailing
    /// `ELSE` statement when `has_else`.
    Case {
        has_else: bool,
    },
    /// `NCASE`; selector and statements from the top list, plus a trailing
    /// `ELSE` statement when `has_else`.
    NCase {
        has_else: bool,
    },
    /// Any statement node without list-stack operands.
    Evb(Evb),
    /// First pass of a routine definition.
    RoutineStart {
        kind: RoutineKind,
        name: String,
    },
    /// Second pass of the routine under construction.
    RoutineEnd,
}

/// Trait for symbol construction.
pub trait SymbolConstructor {
    /// Create a symbol of any class.
    fn new_symbol(&mut self, request: NewSymbol) -> Result<SymbolId>;

    /// Allocate a symbol with `payload` and embed its children.
    fn instantiate(&mut self, placement: Placement, payload: Payload) -> Result<SymbolId>;

    /// Allocate a slot in `region`, marking temporaries.
    fn allocate_in(&mut self, region: Region) -> Result<SymbolId>;

    /// Make `parent` the owner of `child` unless it is owned already.
    fn embed(&mut self, child: SymbolId, parent: SymbolId);

    /// Shorthand for a computed temporary value.
    fn new_value(&mut self, payload: Payload) -> Result<SymbolId>;

    /// Pop the top list as call arguments.
    fn pop_arguments(&mut self) -> Result<Vec<SymbolId>>;
}

impl SymbolConstructor for Interpreter {
    fn new_symbol(&mut self, request: NewSymbol) -> Result<SymbolId> {
        let permanent = self.compile.keep_evb > 0;
        match request {
            NewSymbol::Number(value) => {
                let payload = if permanent {
                    Payload::FixedNumber(value)
                } else {
                    Payload::Scalar(value)
                };
                self.instantiate(Placement::Literal, payload)
            }
            NewSymbol::Imaginary(im) => self.instantiate(
                Placement::Literal,
                Payload::CScalar {
                    value: Box::new(Complex::new(0.0, im)),
                    ty: NumType::CFloat,
                },
            ),
            NewSymbol::Text(text) => {
                let payload = if permanent {
                    Payload::FixedString(text)
                } else {
                    Payload::String(text, StringKind::Literal)
                };
                self.instantiate(Placement::Literal, payload)
            }
            NewSymbol::Value(payload) => self.instantiate(Placement::Temp, payload),
            NewSymbol::FuncPtr(target) => {
                self.instantiate(Placement::Literal, Payload::FuncPtr(target))
            }
            NewSymbol::PreRange { start, end, flags } => {
                let scalar = [start, end].iter().flatten().all(|end| {
                    end.child().map_or(true, |id| {
                        self.store[id].payload.as_scalar().is_some()
                    })
                });
                self.instantiate(
                    Placement::Executable,
                    Payload::PreRange(PreRange {
                        start,
                        end,
                        flags,
                        scalar,
                    }),
                )
            }
            NewSymbol::PreList => {
                let entries = keyed_entries(self.lists.pop_list()?)?;
                self.instantiate(Placement::Executable, Payload::PreList(entries))
            }
            NewSymbol::PreCList => {
                let items = self.lists.pop_symbols()?;
                self.instantiate(Placement::Executable, Payload::PreCList(items))
            }
            NewSymbol::Keyword { name, value } => {
                let name = self.new_symbol(NewSymbol::Text(name))?;
                self.instantiate(Placement::Executable, Payload::Keyword { name, value })
            }
            NewSymbol::Extract { target, sections } => {
                let sections = self.pop_sections(sections)?;
                self.instantiate(
                    Placement::Executable,
                    Payload::Extract(Extract { target, sections }),
                )
            }
            NewSymbol::PreExtract { name, sections } => {
                let sections = self.pop_sections(sections)?;
                let context = self.compile.context;
                self.instantiate(
                    Placement::Executable,
                    Payload::PreExtract(PreExtract {
                        name,
                        context,
                        sections,
                    }),
                )
            }
            NewSymbol::FuncCall(target) => {
                let args = self.pop_arguments()?;
                let payload = match target {
                    CallTarget::Builtin(builtin) => Payload::IntFunc { builtin, args },
                    CallTarget::User(routine) => Payload::UsrFunc { routine, args },
                };
                self.instantiate(Placement::Executable, payload)
            }
            NewSymbol::SubCall(target) => {
                let args = self.pop_arguments()?;
                let evb = match target {
                    CallTarget::Builtin(builtin) => Evb::InternalSub { builtin, args },
                    CallTarget::User(routine) => Evb::UserSub { routine, args },
                };
                self.instantiate(Placement::Executable, Payload::Evb(evb))
            }
            NewSymbol::BinOp { op, lhs, rhs } => {
                self.instantiate(Placement::Executable, Payload::BinOp { op, lhs, rhs })
            }
            NewSymbol::IfOp { op, lhs, rhs } => {
                self.instantiate(Placement::Executable, Payload::IfOp { op, lhs, rhs })
            }
            NewSymbol::Block => {
                let statements = self.lists.pop_symbols()?;
                self.instantiate(Placement::Executable, Payload::Evb(Evb::Block(statements)))
            }
            NewSymbol::Case { has_else } => {
                let mut items = self.lists.pop_symbols()?;
                let otherwise = if has_else { items.pop() } else { None };
                if items.len() % 2 != 0 {
                    return Err(LuxError::new(
                        ErrorCode::ListStackUnderflow,
                        "CASE arms must pair a condition with a statement",
                    ));
                }
                let arms = items.chunks(2).map(|pair| (pair[0], pair[1])).collect();
                self.instantiate(
                    Placement::Executable,
                    Payload::Evb(Evb::Case { arms, otherwise }),
                )
            }
            NewSymbol::NCase { has_else } => {
                let mut items = self.lists.pop_symbols()?;
                let otherwise = if has_else { items.pop() } else { None };
                if items.is_empty() {
                    return Err(LuxError::new(
                        ErrorCode::ListStackUnderflow,
                        "NCASE needs a selector",
                    ));
                }
                let selector = items.remove(0);
                self.instantiate(
                    Placement::Executable,
                    Payload::Evb(Evb::NCase {
                        selector,
                        arms: items,
                        otherwise,
                    }),
                )
            }
            NewSymbol::Evb(evb) => self.instantiate(Placement::Executable, Payload::Evb(evb)),
            NewSymbol::RoutineStart { kind, name } => self.begin_routine(kind, &name),
            NewSymbol::RoutineEnd => self.finish_routine(),
        }
    }

    fn instantiate(&mut self, placement: Placement, payload: Payload) -> Result<SymbolId> {
        let permanent = self.compile.keep_evb > 0;
        let id = match placement {
            Placement::Temp => self.allocate_in(Region::TempVar)?,
            Placement::Literal if permanent => self.allocate_in(Region::Exec)?,
            Placement::Literal => self.allocate_in(Region::TempVar)?,
            Placement::Executable if permanent => self.allocate_in(Region::Exec)?,
            Placement::Executable => self.allocate_in(Region::TempExec)?,
            Placement::ChildOf(owner) => {
                let region = if self.store.is_temporary(owner) {
                    Region::TempVar
                } else {
                    Region::Named
                };
                self.store.allocate(region, Context::Symbol(owner))?
            }
        };

        let children = payload.children();
        self.store[id].payload = payload;
        for child in children {
            self.embed(child, id);
        }
        Ok(id)
    }

    fn allocate_in(&mut self, region: Region) -> Result<SymbolId> {
        let id = self
            .store
            .allocate(region, Context::Level(self.compile.level))?;
        if region.is_temporary() {
            if let Err(e) = self.marks.mark(id) {
                self.store.release(id);
                return Err(e);
            }
        } else if self.compile.builder.is_some() {
            self.compile.permanent.push(id);
        }
        Ok(id)
    }

    fn embed(&mut self, child: SymbolId, parent: SymbolId) {
        if !self.store.is_live(child) || !self.store[child].context.is_unowned() {
            return;
        }
        self.store[child].context = Context::Symbol(parent);
        if self.store.is_temporary(child) {
            self.marks.unmark(child);
        }
    }

    fn new_value(&mut self, payload: Payload) -> Result<SymbolId> {
        self.new_symbol(NewSymbol::Value(payload))
    }

    fn pop_arguments(&mut self) -> Result<Vec<SymbolId>> {
        self.lists.pop_symbols()
    }
}

impl Interpreter {
    /// Pop `count` section lists; the first section is deepest on the stack.
    fn pop_sections(&mut self, count: usize) -> Result<Vec<Section>> {
        let mut sections = Vec::with_capacity(count);
        for _ in 0..count {
            let items = self.lists.pop_list()?;
            let section = match items.as_slice() {
                [ListItem::Name(tag)] => Section::Tag(tag.clone()),
                _ => Section::Subscripts(
                    items
                        .into_iter()
                        .map(|item| match item {
                            ListItem::Symbol(id) => Ok(id),
                            other => Err(LuxError::new(
                                ErrorCode::UnexpectedSentinel,
                                format!("Unexpected {:?} in a subscript list", other),
                            )),
                        })
                        .collect::<Result<Vec<_>>>()?,
                ),
            };
            sections.push(section);
        }
        sections.reverse();
        Ok(sections)
    }
}

/// Pair `Name` items with the symbol that follows them.
fn keyed_entries(items: Vec<ListItem>) -> Result<Vec<ListEntry>> {
    let mut entries = Vec::with_capacity(items.len());
    let mut key = None;
    for item in items {
        match item {
            ListItem::Name(name) => key = Some(name),
            ListItem::Symbol(value) => entries.push(ListEntry {
                key: key.take(),
                value,
            }),
            ListItem::Start => {
                return Err(LuxError::new(
                    ErrorCode::UnexpectedSentinel,
                    "Nested list start inside a list",
                ))
            }
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InterpreterConfig;
    use crate::runtime::destroy::Destroyer;
    use crate::symbols::SymbolClass;

    fn interp() -> Interpreter {
        Interpreter::capture(InterpreterConfig::default()).unwrap().0
    }

    #[test]
    fn test_literal_is_marked_temporary_at_top_level() {
        let mut interp = interp();
        let id = interp.new_symbol(NewSymbol::Number(Scalar::Long(1))).unwrap();
        assert_eq!(interp.store.region_of(id), Some(Region::TempVar));
        assert_eq!(interp.store[id].class(), SymbolClass::Scalar);
        assert!(interp.marks.is_marked(id));
        assert_eq!(interp.store[id].context, Context::Level(0));
    }

    #[test]
    fn test_literal_is_fixed_when_permanent() {
        let mut interp = interp();
        interp.compile.keep_evb = 1;
        let id = interp.new_symbol(NewSymbol::Number(Scalar::Long(1))).unwrap();
        assert_eq!(interp.store.region_of(id), Some(Region::Exec));
        assert_eq!(interp.store[id].class(), SymbolClass::FixedNumber);
        assert!(!interp.marks.is_marked(id));
    }

    #[test]
    fn test_embed_takes_ownership_and_unmarks() {
        let mut interp = interp();
        let lhs = interp.new_symbol(NewSymbol::Number(Scalar::Long(1))).unwrap();
        let rhs = interp.find_var("X").unwrap();
        let op = interp
            .new_symbol(NewSymbol::BinOp {
                op: BinaryOp::Add,
                lhs,
                rhs,
            })
            .unwrap();
        assert_eq!(interp.store.region_of(op), Some(Region::TempExec));
        assert_eq!(interp.store[lhs].context, Context::Symbol(op));
        assert!(!interp.marks.is_marked(lhs));
        assert_eq!(interp.store[rhs].context, Context::Global);
    }

    #[test]
    fn test_first_embed_wins() {
        let mut interp = interp();
        let shared = interp.new_symbol(NewSymbol::Number(Scalar::Long(2))).unwrap();
        let one = interp
            .new_symbol(NewSymbol::BinOp {
                op: BinaryOp::Mul,
                lhs: shared,
                rhs: shared,
            })
            .unwrap();
        let two = interp
            .new_symbol(NewSymbol::BinOp {
                op: BinaryOp::Add,
                lhs: shared,
                rhs: one,
            })
            .unwrap();
        assert_eq!(interp.store[shared].context, Context::Symbol(one));
        assert_eq!(interp.store[one].context, Context::Symbol(two));

        interp.zap(two).unwrap();
        assert!(!interp.store.is_live(one));
        assert!(!interp.store.is_live(shared));
    }

    #[test]
    fn test_pre_list_consumes_top_list() {
        let mut interp = interp();
        let a = interp.new_symbol(NewSymbol::Number(Scalar::Long(1))).unwrap();
        let b = interp.new_symbol(NewSymbol::Text("x".into())).unwrap();
        interp.lists.push_start().unwrap();
        interp.lists.push_name("A").unwrap();
        interp.lists.push(a).unwrap();
        interp.lists.push(b).unwrap();
        let list = interp.new_symbol(NewSymbol::PreList).unwrap();
        assert_eq!(
            interp.store[list].payload,
            Payload::PreList(vec![
                ListEntry {
                    key: Some("A".into()),
                    value: a
                },
                ListEntry { key: None, value: b },
            ])
        );
        assert_eq!(interp.lists.depth(), 0);
    }

    #[test]
    fn test_extract_sections_keep_order() {
        let mut interp = interp();
        let x = interp.find_var("X").unwrap();
        let i = interp.new_symbol(NewSymbol::Number(Scalar::Long(0))).unwrap();
        interp.lists.push_start().unwrap();
        interp.lists.push(i).unwrap();
        interp.lists.push_start().unwrap();
        interp.lists.push_name("TAG").unwrap();
        let extract = interp
            .new_symbol(NewSymbol::Extract {
                target: x,
                sections: 2,
            })
            .unwrap();
        match &interp.store[extract].payload {
            Payload::Extract(e) => assert_eq!(
                e.sections,
                vec![Section::Subscripts(vec![i]), Section::Tag("TAG".into())]
            ),
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_pop_underflow_releases_nothing() {
        let mut interp = interp();
        let cursor = interp.store.cursor(Region::TempExec);
        let err = interp.new_symbol(NewSymbol::Block).unwrap_err();
        assert_eq!(err.code, ErrorCode::ListStackUnderflow);
        assert_eq!(interp.store.cursor(Region::TempExec), cursor);
    }
}
