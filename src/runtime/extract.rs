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

//! Subscripts and tags.
//!
//! Arrays are stored with the first index varying fastest. A single
//! subscript on a multi-dimensional array addresses the flat element
//! sequence. Axes subscripted by a single index are dropped from the result
//! shape; a result without axes is a scalar.

use super::assign::Assigner;
use super::builtins::BuiltinCaller;
use super::construct::{Placement, SymbolConstructor};
use super::eval::Evaluator;
use super::execute::Executor;
use super::values::{self, Elems, Numeric};
use super::Interpreter;
use crate::error::{ErrorCode, LuxError, Result};
use crate::symbols::{
    Complex, ListEntry, NumType, Payload, RangeFlags, RangeValue, RoutineKind, RoutineRef,
    Section, StringKind, SymbolId,
};

/// One evaluated subscript.
#[derive(Debug, Clone, PartialEq)]
pub enum Subscript {
    Single(i64),
    Range(RangeValue),
    List(Vec<i64>),
}

/// Trait for subscripting and tag access.
pub trait Extractor {
    /// Evaluate `target` and apply every section in order.
    fn extract_value(&mut self, target: SymbolId, sections: &[Section]) -> Result<SymbolId>;

    /// Apply one section to an evaluated value.
    fn apply_section(&mut self, value: SymbolId, section: &Section) -> Result<SymbolId>;

    /// Execute `target(sections) = value`.
    fn assign_extract(
        &mut self,
        target: SymbolId,
        sections: &[Section],
        value: SymbolId,
    ) -> Result<()>;
}

impl Extractor for Interpreter {
    fn extract_value(&mut self, target: SymbolId, sections: &[Section]) -> Result<SymbolId> {
        let mut current = self.eval(target)?;
        for section in sections {
            current = self.apply_section(current, section)?;
        }
        Ok(current)
    }

    fn apply_section(&mut self, value: SymbolId, section: &Section) -> Result<SymbolId> {
        let value = self.resolve(value);
        let ids = match section {
            Section::Tag(tag) => return self.member_by_tag(value, tag),
            Section::Subscripts(ids) => ids,
        };

        if let Payload::FuncPtr(target) = self.store[value].payload {
            let result = match target {
                RoutineRef::User(routine) => {
                    self.call_user_routine(routine, ids, RoutineKind::Function)?
                }
                RoutineRef::Builtin(kind, index) => self.call_builtin(kind, index, ids)?,
            };
            return result.ok_or_else(|| {
                LuxError::new(
                    ErrorCode::NoReturnValue,
                    format!("{} did not return a value", self.symbol_ident(value)),
                )
            });
        }

        let subs = self.eval_subscripts(ids)?;
        let flagged = subs.iter().any(is_flagged);
        match &self.store[value].payload {
            Payload::Array(array) => {
                let (indices, dims) = flat_indices(&array.dims, &subs)?;
                let mut result = values::select(array, &indices)?;
                result.dims = if dims.is_empty() { None } else { Some(dims) };
                if flagged {
                    result = reshape_selection(result, &axis_flags(&subs))?;
                }
                self.new_value(result.into_payload())
            }
            Payload::String(..) | Payload::FixedString(_) if flagged => Err(flags_not_allowed()),
            Payload::String(text, _) | Payload::FixedString(text) => {
                let chars: Vec<char> = text.chars().collect();
                let (indices, _) = flat_indices(&[chars.len()], &subs)?;
                let picked: String = indices.iter().map(|&i| chars[i]).collect();
                self.new_value(Payload::String(picked, StringKind::Temporary))
            }
            Payload::List(_) | Payload::CList(_) | Payload::Structure(_) => {
                let index = single_subscript(&subs)?;
                member_at(&self.store[value].payload, index).ok_or_else(|| out_of_bounds(index))
            }
            Payload::Scalar(_) | Payload::FixedNumber(_) | Payload::CScalar { .. } => {
                match single_subscript(&subs)? {
                    0 => Ok(value),
                    index => Err(out_of_bounds(index)),
                }
            }
            other => Err(LuxError::new(
                ErrorCode::IllegalOperation,
                format!("Cannot subscript a {} symbol", other.class()),
            )),
        }
    }

    fn assign_extract(
        &mut self,
        target: SymbolId,
        sections: &[Section],
        value: SymbolId,
    ) -> Result<()> {
        let base = self.resolve(target);
        if self.is_protected(base) {
            return Err(LuxError::new(
                ErrorCode::ProtectedConstant,
                format!("Cannot assign to {}", self.symbol_ident(base)),
            ));
        }
        let Some((last, path)) = sections.split_last() else {
            return self.store_value(base, value);
        };

        let mut current = base;
        for section in path {
            current = self.apply_section(current, section)?;
            if self.store.is_temporary(current) && self.store[current].context.is_unowned() {
                return Err(LuxError::new(
                    ErrorCode::IllegalOperation,
                    "Cannot assign into a computed value",
                ));
            }
        }
        if self.store[current].class() == crate::symbols::SymbolClass::Undefined {
            return Err(LuxError::new(
                ErrorCode::UndefinedVariable,
                format!("{} is not defined", self.symbol_ident(current)),
            ));
        }

        match last {
            Section::Tag(tag) => self.assign_tag(current, tag, value),
            Section::Subscripts(ids) => {
                let subs = self.eval_subscripts(ids)?;
                self.assign_subscripts(current, &subs, value)
            }
        }
    }
}

impl Interpreter {
    fn eval_subscripts(&mut self, ids: &[SymbolId]) -> Result<Vec<Subscript>> {
        let mut subs = Vec::with_capacity(ids.len());
        for &id in ids {
            if let Some(scalar) = self.store.get(id)?.payload.as_scalar() {
                subs.push(Subscript::Single(scalar.as_i64()));
                continue;
            }
            let value = self.eval(id)?;
            let sub = match &self.store[value].payload {
                Payload::Range(range) => Subscript::Range(*range),
                Payload::Array(array) if array.num_type() != NumType::String => {
                    match values::numeric(&self.store[value].payload)?
                        .cast(NumType::Int64)?
                        .elems
                    {
                        Elems::Int(v) => Subscript::List(v),
                        _ => Subscript::List(Vec::new()),
                    }
                }
                Payload::Scalar(_) | Payload::FixedNumber(_) => {
                    Subscript::Single(values::numeric(&self.store[value].payload)?.as_index()?)
                }
                other => {
                    return Err(LuxError::new(
                        ErrorCode::TypeMismatch,
                        format!("A {} cannot be used as a subscript", other.class()),
                    ))
                }
            };
            subs.push(sub);
        }
        Ok(subs)
    }

    fn member_by_tag(&self, value: SymbolId, tag: &str) -> Result<SymbolId> {
        let entries = match &self.store[value].payload {
            Payload::List(entries) => entries,
            Payload::Structure(structure) => &structure.entries,
            other => {
                return Err(LuxError::new(
                    ErrorCode::TypeMismatch,
                    format!("Cannot take tag .{} of a {} symbol", tag, other.class()),
                ))
            }
        };
        entries
            .iter()
            .find(|e| e.key.as_deref() == Some(tag))
            .map(|e| e.value)
            .ok_or_else(|| {
                LuxError::new(
                    ErrorCode::IndexOutOfBounds,
                    format!("No member tagged {}", tag),
                )
            })
    }

    fn assign_tag(&mut self, container: SymbolId, tag: &str, value: SymbolId) -> Result<()> {
        match self.member_by_tag(container, tag) {
            Ok(member) => {
                let evaluated = self.eval(value)?;
                self.store_value(member, evaluated)
            }
            Err(e) if e.code == ErrorCode::IndexOutOfBounds => {
                if !matches!(self.store[container].payload, Payload::List(_)) {
                    return Err(e);
                }
                let evaluated = self.eval(value)?;
                let member = self.copy_value(evaluated, Placement::ChildOf(container))?;
                if let Payload::List(entries) = &mut self.store[container].payload {
                    entries.push(ListEntry {
                        key: Some(tag.to_string()),
                        value: member,
                    });
                }
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn assign_subscripts(
        &mut self,
        container: SymbolId,
        subs: &[Subscript],
        value: SymbolId,
    ) -> Result<()> {
        if subs.iter().any(is_flagged) {
            return Err(flags_not_allowed());
        }
        match &self.store[container].payload {
            Payload::Array(array) => {
                let (indices, _) = flat_indices(&array.dims, subs)?;
                let evaluated = self.eval(value)?;
                let source = values::numeric(&self.store[evaluated].payload)?;
                match &mut self.store[container].payload {
                    Payload::Array(array) => values::scatter(array, &indices, source),
                    _ => Ok(()),
                }
            }
            Payload::List(_) | Payload::CList(_) | Payload::Structure(_) => {
                let index = single_subscript(subs)?;
                let member = member_at(&self.store[container].payload, index)
                    .ok_or_else(|| out_of_bounds(index))?;
                let evaluated = self.eval(value)?;
                self.store_value(member, evaluated)
            }
            other => Err(LuxError::new(
                ErrorCode::IllegalOperation,
                format!("Cannot assign to an element of a {} symbol", other.class()),
            )),
        }
    }
}

fn is_flagged(sub: &Subscript) -> bool {
    matches!(sub, Subscript::Range(range) if !range.flags.is_plain())
}

fn flags_not_allowed() -> LuxError {
    LuxError::new(
        ErrorCode::IllegalOperation,
        "Summed or redirected ranges only select from numeric arrays",
    )
}

fn out_of_bounds(index: i64) -> LuxError {
    LuxError::new(
        ErrorCode::IndexOutOfBounds,
        format!("Subscript {} is out of bounds", index),
    )
}

fn check_index(index: i64, len: usize) -> Result<usize> {
    if index < 0 || index as u64 >= len as u64 {
        return Err(out_of_bounds(index));
    }
    Ok(index as usize)
}

fn single_subscript(subs: &[Subscript]) -> Result<i64> {
    match subs {
        [Subscript::Single(index)] => Ok(*index),
        _ => Err(LuxError::new(
            ErrorCode::IllegalOperation,
            "Lists and scalars take a single index",
        )),
    }
}

fn member_at(payload: &Payload, index: i64) -> Option<SymbolId> {
    let index = usize::try_from(index).ok()?;
    match payload {
        Payload::List(entries) => entries.get(index).map(|e| e.value),
        Payload::CList(items) => items.get(index).copied(),
        Payload::Structure(structure) => structure.entries.get(index).map(|e| e.value),
        _ => None,
    }
}

/// Indices selected by `sub` along an axis of `len` elements, and whether
/// the axis stays in the result shape.
fn axis_indices(sub: &Subscript, len: usize) -> Result<(Vec<usize>, bool)> {
    match sub {
        Subscript::Single(index) => Ok((vec![check_index(*index, len)?], false)),
        Subscript::List(list) => Ok((
            list.iter()
                .map(|&i| check_index(i, len))
                .collect::<Result<_>>()?,
            true,
        )),
        Subscript::Range(range) => {
            let start = range.start.map_or(0, |b| b.resolve(len));
            let Some(end) = range.end else {
                return Ok((vec![check_index(start, len)?], false));
            };
            let end = end.resolve(len);
            let first = check_index(start, len)?;
            let last = check_index(end, len)?;
            if first > last {
                return Err(LuxError::new(
                    ErrorCode::InvalidRange,
                    format!("Range start {} lies beyond its end {}", start, end),
                ));
            }
            Ok(((first..=last).collect(), true))
        }
    }
}

/// Flat element indices addressed by `subs` in an array of shape `dims`,
/// in storage order, plus the shape of the selection.
pub fn flat_indices(dims: &[usize], subs: &[Subscript]) -> Result<(Vec<usize>, Vec<usize>)> {
    if subs.len() == 1 && dims.len() > 1 {
        let total = dims.iter().product();
        let (indices, keep) = axis_indices(&subs[0], total)?;
        let shape = if keep { vec![indices.len()] } else { Vec::new() };
        return Ok((indices, shape));
    }
    if subs.len() != dims.len() {
        return Err(LuxError::new(
            ErrorCode::DimensionMismatch,
            format!(
                "{} subscripts for an array with {} dimensions",
                subs.len(),
                dims.len()
            ),
        ));
    }

    let mut axes = Vec::with_capacity(dims.len());
    for (sub, &len) in subs.iter().zip(dims) {
        axes.push(axis_indices(sub, len)?);
    }

    let mut strides = Vec::with_capacity(dims.len());
    let mut stride = 1;
    for &len in dims {
        strides.push(stride);
        stride *= len;
    }

    let mut flat = vec![0usize];
    for k in (0..dims.len()).rev() {
        let (axis, _) = &axes[k];
        let stride = strides[k];
        flat = flat
            .iter()
            .flat_map(|&offset| axis.iter().map(move |&i| offset + i * stride))
            .collect();
    }
    let shape = axes
        .iter()
        .filter(|(_, keep)| *keep)
        .map(|(axis, _)| axis.len())
        .collect();
    Ok((flat, shape))
}

/// Flags of the axes that stay in a selection's shape, in order.
fn axis_flags(subs: &[Subscript]) -> Vec<RangeFlags> {
    subs.iter()
        .filter_map(|sub| match sub {
            Subscript::Single(_) => None,
            Subscript::List(_) => Some(RangeFlags::default()),
            Subscript::Range(range) => range.end.map(|_| range.flags),
        })
        .collect()
}

/// Collapse every `:+` axis of a selection by summing over it, then move
/// every `:>n` axis to position `n` of what is left.
pub fn reshape_selection(mut value: Numeric, flags: &[RangeFlags]) -> Result<Numeric> {
    let mut shape = value.dims.take().unwrap_or_default();
    let mut axes = flags.to_vec();
    let mut summed = false;
    for k in (0..axes.len().min(shape.len())).rev() {
        if axes[k].sum {
            value.elems = sum_axis(value.elems, &shape, k)?;
            shape.remove(k);
            axes.remove(k);
            summed = true;
        }
    }
    if summed && matches!(value.ty, NumType::Byte | NumType::Word) {
        value.ty = NumType::Long;
    }

    let mut order: Vec<usize> = (0..shape.len()).collect();
    for (axis, flags) in axes.iter().enumerate().take(shape.len()) {
        let Some(target) = flags.redirect else {
            continue;
        };
        if let Some(from) = order.iter().position(|&a| a == axis) {
            order.remove(from);
            order.insert(usize::from(target).min(order.len()), axis);
        }
    }
    if order.iter().enumerate().any(|(p, &a)| p != a) {
        let indices = permuted_indices(&shape, &order)?;
        value.elems = gather(value.elems, &indices)?;
        shape = order.iter().map(|&a| shape[a]).collect();
    }

    value.dims = if shape.is_empty() { None } else { Some(shape) };
    Ok(value)
}

/// Sum elements of shape `shape` along `axis`, dropping that axis.
fn sum_axis(elems: Elems, shape: &[usize], axis: usize) -> Result<Elems> {
    let inner: usize = shape[..axis].iter().product();
    let len = shape[axis];
    let outer: usize = shape[axis + 1..].iter().product();
    let cells = 0..inner * outer;
    let base = move |c: usize| (c / inner) * len * inner + c % inner;
    let along = move |c: usize| (0..len).map(move |j| base(c) + j * inner);
    Ok(match elems {
        Elems::Int(v) => Elems::Int(values::try_collect(
            cells.map(|c| along(c).fold(0i64, |acc, i| acc.wrapping_add(v[i]))),
        )?),
        Elems::Real(v) => Elems::Real(values::try_collect(
            cells.map(|c| along(c).map(|i| v[i]).sum::<f64>()),
        )?),
        Elems::Cplx(v) => Elems::Cplx(values::try_collect(cells.map(|c| {
            along(c).fold(Complex::default(), |acc, i| {
                Complex::new(acc.re + v[i].re, acc.im + v[i].im)
            })
        }))?),
        Elems::Text(_) => {
            return Err(LuxError::new(
                ErrorCode::TypeMismatch,
                "Cannot sum strings over an axis",
            ))
        }
    })
}

/// Flat indices that read an array of shape `shape` with its axes in
/// `order`, first new axis fastest.
fn permuted_indices(shape: &[usize], order: &[usize]) -> Result<Vec<usize>> {
    let mut strides = Vec::with_capacity(shape.len());
    let mut stride = 1;
    for &len in shape {
        strides.push(stride);
        stride *= len;
    }
    let mut flat = vec![0usize];
    for &axis in order.iter().rev() {
        let (len, stride) = (shape[axis], strides[axis]);
        flat = values::try_collect(
            flat.iter()
                .flat_map(|&offset| (0..len).map(move |i| offset + i * stride)),
        )?;
    }
    Ok(flat)
}

fn gather(elems: Elems, indices: &[usize]) -> Result<Elems> {
    Ok(match elems {
        Elems::Int(v) => Elems::Int(values::try_collect(indices.iter().map(|&i| v[i]))?),
        Elems::Real(v) => Elems::Real(values::try_collect(indices.iter().map(|&i| v[i]))?),
        Elems::Cplx(v) => Elems::Cplx(values::try_collect(indices.iter().map(|&i| v[i]))?),
        Elems::Text(v) => {
            Elems::Text(values::try_collect(indices.iter().map(|&i| v[i].clone()))?)
        }
    })
}
