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

//! Value formatting for `PRINT`, `TYPE` and `DUMP`.

use super::eval::Evaluator;
use super::Interpreter;
use crate::symbols::{ArrayData, ListEntry, Payload, RangeBound, RoutineRef, SymbolId};

/// Trait for rendering symbols as text.
pub trait ValueFormatter {
    /// The value of `id` as `PRINT` shows it.
    fn format_value(&self, id: SymbolId) -> String;

    /// `NAME: CLASS TYPE[dims]`, as `TYPE` shows it.
    fn describe(&self, id: SymbolId) -> String;

    /// One `DUMP` line: index, class, context and name.
    fn dump_line(&self, id: SymbolId) -> String;
}

impl ValueFormatter for Interpreter {
    fn format_value(&self, id: SymbolId) -> String {
        let id = self.resolve(id);
        let Ok(symbol) = self.store.get(id) else {
            return format!("<#{}>", id);
        };
        match &symbol.payload {
            Payload::Scalar(s) | Payload::FixedNumber(s) => s.to_string(),
            Payload::CScalar { value, .. } => value.to_string(),
            Payload::String(s, _) | Payload::FixedString(s) => s.clone(),
            Payload::Array(array) => match &array.data {
                ArrayData::Byte(v) => join(v.iter()),
                ArrayData::Word(v) => join(v.iter()),
                ArrayData::Long(v) => join(v.iter()),
                ArrayData::Int64(v) => join(v.iter()),
                ArrayData::Float(v) => join(v.iter()),
                ArrayData::Double(v) => join(v.iter()),
                ArrayData::CFloat(v) | ArrayData::CDouble(v) => join(v.iter()),
                ArrayData::String(v) => join(v.iter()),
            },
            Payload::Range(range) => {
                let bound = |b: RangeBound| match b {
                    RangeBound::Index(i) => i.to_string(),
                    RangeBound::FromEnd(0) => "*".to_string(),
                    RangeBound::FromEnd(k) => format!("*-{}", k),
                };
                let mut suffix = String::new();
                if range.flags.sum {
                    suffix.push_str(":+");
                }
                if let Some(axis) = range.flags.redirect {
                    suffix.push_str(&format!(":>{}", axis));
                }
                match (range.start, range.end) {
                    (None, Some(RangeBound::FromEnd(0))) => format!("(*{})", suffix),
                    (start, Some(end)) => format!(
                        "({}:{}{})",
                        start.map_or_else(|| "0".to_string(), bound),
                        bound(end),
                        suffix
                    ),
                    (start, None) => format!("({})", start.map_or_else(|| "0".to_string(), bound)),
                }
            }
            Payload::List(entries) => self.format_entries(entries),
            Payload::Structure(structure) => self.format_entries(&structure.entries),
            Payload::CList(items) => format!(
                "{{{}}}",
                items
                    .iter()
                    .map(|&item| self.format_value(item))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Payload::FuncPtr(RoutineRef::User(routine)) => {
                format!("&{}", self.name_of(*routine).unwrap_or("?"))
            }
            Payload::FuncPtr(RoutineRef::Builtin(kind, index)) => format!(
                "&{}",
                self.builtins.entry(*kind, *index).map_or("?", |e| e.name)
            ),
            Payload::Undefined | Payload::Unused => "<undefined>".to_string(),
            other => format!("<{}>", other.class()),
        }
    }

    fn describe(&self, id: SymbolId) -> String {
        let value = self.resolve(id);
        let payload = self.store.get(value).ok().map(|s| &s.payload);
        let class = payload.map_or("UNUSED", |p| p.class().name());
        let mut text = format!("{}: {}", self.symbol_ident(id), class);
        match payload {
            Some(Payload::Array(array)) => {
                let dims: Vec<String> = array.dims.iter().map(usize::to_string).collect();
                text.push_str(&format!(" {}[{}]", array.num_type().name(), dims.join(",")));
            }
            Some(Payload::List(entries)) => text.push_str(&format!(" [{}]", entries.len())),
            Some(Payload::CList(items)) => text.push_str(&format!(" [{}]", items.len())),
            Some(Payload::Structure(structure)) => {
                text.push_str(&format!(" [{}] {} bytes", structure.entries.len(), structure.size()))
            }
            Some(p) => {
                if let Some(ty) = p.num_type() {
                    text.push(' ');
                    text.push_str(ty.name());
                }
            }
            None => {}
        }
        text
    }

    fn dump_line(&self, id: SymbolId) -> String {
        let Ok(symbol) = self.store.get(id) else {
            return format!("#{} out of bounds", id);
        };
        let region = self.store.region_of(id).map_or("?", |r| r.name());
        let name = self.name_of(id).unwrap_or("-");
        format!(
            "#{:<6} {:<14} {:<10} {:<12} {}",
            id,
            symbol.class().name(),
            region,
            symbol.context.to_string(),
            name
        )
    }
}

impl Interpreter {
    fn format_entries(&self, entries: &[ListEntry]) -> String {
        let parts: Vec<String> = entries
            .iter()
            .map(|entry| match &entry.key {
                Some(key) => format!("{}={}", key, self.format_value(entry.value)),
                None => self.format_value(entry.value),
            })
            .collect();
        format!("{{{}}}", parts.join(", "))
    }
}

fn join<T: ToString>(items: impl Iterator<Item = T>) -> String {
    items.map(|item| item.to_string()).collect::<Vec<_>>().join(" ")
}
