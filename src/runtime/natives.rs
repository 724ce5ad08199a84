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

//! Built-in subroutines and functions.

use super::assign::Assigner;
use super::builtins::{BuiltinCaller, BuiltinEntry, CallArgs, MANY};
use super::construct::{Placement, SymbolConstructor};
use super::destroy::Destroyer;
use super::eval::Evaluator;
use super::execute::Executor;
use super::format::ValueFormatter;
use super::include::IncludeHandler;
use super::values::{self, Elems, Numeric};
use super::Interpreter;
use crate::error::{ErrorCode, LuxError, Result};
use crate::symbols::{
    Complex, FieldLayout, ListEntry, NameSpace, NumType, Payload, RoutineKind, RoutineRef,
    Scalar, StringKind, Structure, SymbolId,
};

type Ret = Result<Option<SymbolId>>;

pub static SUBROUTINES: &[BuiltinEntry] = &[
    BuiltinEntry::new("CALL", 1, MANY, call, "*"),
    BuiltinEntry::new("DELETE", 1, MANY, delete, "*"),
    BuiltinEntry::new("DUMP", 0, MANY, dump, "*"),
    BuiltinEntry::new("PRINT", 0, MANY, print, "|0|1NONEWLINE:SEPARATOR"),
    BuiltinEntry::new("RESTART", 0, 0, restart, ""),
    BuiltinEntry::new("TYPE", 1, MANY, type_of, "*"),
];

pub static FUNCTIONS: &[BuiltinEntry] = &[
    BuiltinEntry::new("ABS", 1, 1, abs, "+"),
    BuiltinEntry::new("BYTARR", 1, 8, bytarr, ""),
    BuiltinEntry::new("BYTE", 1, 1, to_byte, "+"),
    BuiltinEntry::new("CLASSNAME", 1, 1, classname, "*"),
    BuiltinEntry::new("COMPLEX", 1, 2, complex, ""),
    BuiltinEntry::new("CONCAT", 1, MANY, concat, ""),
    BuiltinEntry::new("DBLARR", 1, 8, dblarr, ""),
    BuiltinEntry::new("DIMEN", 1, 2, dimen, ">1AXIS"),
    BuiltinEntry::new("DOUBLE", 1, 1, to_double, "+"),
    BuiltinEntry::new("FLOAT", 1, 1, to_float, "+"),
    BuiltinEntry::new("FLTARR", 1, 8, fltarr, ""),
    BuiltinEntry::new("IMAGINARY", 1, 1, imaginary, ""),
    BuiltinEntry::new("INDGEN", 1, 8, indgen, ""),
    BuiltinEntry::new("INT64", 1, 1, to_int64, "+"),
    BuiltinEntry::new("INTARR", 1, 8, intarr, ""),
    BuiltinEntry::new("LONARR", 1, 8, lonarr, ""),
    BuiltinEntry::new("LONG", 1, 1, to_long, "+"),
    BuiltinEntry::new("NEG", 1, 1, neg, "+"),
    BuiltinEntry::new("NOT", 1, 1, not, "+"),
    BuiltinEntry::new("NUM_ELEM", 1, 1, num_elem, ""),
    BuiltinEntry::new("REAL", 1, 1, real, ""),
    BuiltinEntry::new("SQRT", 1, 1, sqrt, "+"),
    BuiltinEntry::new("STRING", 1, MANY, string, ""),
    BuiltinEntry::new("STRUCT", 1, 1, structure, ""),
    BuiltinEntry::new("SYMBOL", 1, 1, symbol, "*"),
    BuiltinEntry::new("TOTAL", 1, 1, total, "2DOUBLE:4MEAN"),
    BuiltinEntry::new("WORD", 1, 1, to_word, "+"),
];

// ========================================
// Helpers
// ========================================

/// Return `result` in a new temporary, or in the first argument when the
/// call may reuse it.
fn deliver(interp: &mut Interpreter, call: &CallArgs, result: Numeric) -> Ret {
    match call.arg(0) {
        Some(first) if call.pipe => {
            interp.store[first].payload = result.into_payload();
            Ok(Some(first))
        }
        _ => interp.new_value(result.into_payload()).map(Some),
    }
}

fn first_numeric(interp: &mut Interpreter, call: &CallArgs, name: &str) -> Result<Numeric> {
    let arg = call.required(0, name)?;
    interp.eval_numeric(arg)
}

fn long_value(interp: &mut Interpreter, value: i64) -> Ret {
    interp
        .new_value(Payload::Scalar(Scalar::Long(value as i32)))
        .map(Some)
}

fn dimensions(interp: &mut Interpreter, call: &CallArgs) -> Result<Vec<usize>> {
    let mut dims = Vec::with_capacity(call.count());
    for arg in call.present() {
        let n = interp.eval_index(arg)?;
        let n = usize::try_from(n).map_err(|_| {
            LuxError::new(
                ErrorCode::IllegalOperation,
                format!("Array dimension {} is negative", n),
            )
        })?;
        dims.push(n);
    }
    Ok(dims)
}

fn array_of(interp: &mut Interpreter, call: &CallArgs, ty: NumType) -> Ret {
    let dims = dimensions(interp, call)?;
    let payload = values::zeros(ty, &dims)?;
    interp.new_value(payload).map(Some)
}

fn convert(interp: &mut Interpreter, call: &CallArgs, ty: NumType, name: &str) -> Ret {
    let value = first_numeric(interp, call, name)?.cast(ty)?;
    deliver(interp, call, value)
}

fn append(into: &mut Elems, from: Elems) {
    match (into, from) {
        (Elems::Int(a), Elems::Int(b)) => a.extend(b),
        (Elems::Real(a), Elems::Real(b)) => a.extend(b),
        (Elems::Cplx(a), Elems::Cplx(b)) => a.extend(b),
        (Elems::Text(a), Elems::Text(b)) => a.extend(b),
        _ => {}
    }
}

fn empty_elems(ty: NumType) -> Elems {
    match ty {
        NumType::String => Elems::Text(Vec::new()),
        NumType::CFloat | NumType::CDouble => Elems::Cplx(Vec::new()),
        NumType::Float | NumType::Double => Elems::Real(Vec::new()),
        _ => Elems::Int(Vec::new()),
    }
}

// ========================================
// Subroutines
// ========================================

fn print(interp: &mut Interpreter, call: &CallArgs) -> Ret {
    let separator = match call.keyword(1) {
        Some(sep) => interp.eval_string(sep)?,
        None => " ".to_string(),
    };
    let mut parts = Vec::with_capacity(call.count());
    for arg in call.present() {
        parts.push(interp.eval_string(arg)?);
    }
    let mut text = parts.join(&separator);
    if !call.has_mode(1) {
        text.push('\n');
    }
    interp.write_output(&text)?;
    Ok(None)
}

fn type_of(interp: &mut Interpreter, call: &CallArgs) -> Ret {
    let mut text = String::new();
    for arg in call.present() {
        text.push_str(&interp.describe(arg));
        text.push('\n');
    }
    interp.write_output(&text)?;
    Ok(None)
}

fn delete(interp: &mut Interpreter, call: &CallArgs) -> Ret {
    for arg in call.present() {
        let target = interp.resolve(arg);
        if !interp.is_named_variable(target) {
            return Err(LuxError::new(
                ErrorCode::IllegalOperation,
                format!("DELETE needs a named variable, not {}", interp.symbol_ident(arg)),
            ));
        }
        interp.undefine(target)?;
    }
    Ok(None)
}

fn dump(interp: &mut Interpreter, call: &CallArgs) -> Ret {
    let mut text = String::new();
    if call.count() == 0 {
        for stats in interp.stats() {
            text.push_str(&format!(
                "{:<10} {:>6} of {:>6} in use, next free #{}\n",
                stats.region.name(),
                stats.in_use,
                stats.capacity,
                stats.cursor
            ));
        }
    } else {
        for arg in call.present() {
            text.push_str(&interp.dump_line(arg));
            text.push('\n');
        }
    }
    interp.write_output(&text)?;
    Ok(None)
}

fn restart(interp: &mut Interpreter, _call: &CallArgs) -> Ret {
    interp.pending_restart = true;
    Ok(None)
}

/// `CALL, target, args...`: the target is a function pointer or the name of
/// a subroutine.
fn call(interp: &mut Interpreter, call: &CallArgs) -> Ret {
    let target = call.required(0, "CALL")?;
    let rest: Vec<SymbolId> = call.present().skip(1).collect();
    let value = interp.eval(target)?;
    let name = match &interp.store[value].payload {
        Payload::FuncPtr(routine) => Err(*routine),
        Payload::String(name, _) | Payload::FixedString(name) => Ok(name.to_uppercase()),
        other => {
            return Err(LuxError::new(
                ErrorCode::TypeMismatch,
                format!("CALL needs a function pointer or a name, found {}", other.class()),
            ))
        }
    };
    let routine = match name {
        Err(routine) => routine,
        Ok(name) => match interp.builtins.find(RoutineKind::Subroutine, &name) {
            Some(index) => RoutineRef::Builtin(RoutineKind::Subroutine, index),
            None => match interp.find_routine(RoutineKind::Subroutine, &name)? {
                Some(id) => RoutineRef::User(id),
                None => RoutineRef::User(interp.find_sym(NameSpace::Subroutine, &name)?),
            },
        },
    };
    let result = match routine {
        RoutineRef::Builtin(kind, index) => interp.call_builtin(kind, index, &rest)?,
        RoutineRef::User(id) => {
            let kind = match &interp.store[id].payload {
                Payload::Routine(kind, _) | Payload::Deferred(kind, _) => *kind,
                _ => RoutineKind::Subroutine,
            };
            interp.call_user_routine(id, &rest, kind)?
        }
    };
    if let Some(result) = result {
        interp.discard(result);
    }
    Ok(None)
}

// ========================================
// Functions
// ========================================

fn abs(interp: &mut Interpreter, call: &CallArgs) -> Ret {
    let Numeric { ty, dims, elems } = first_numeric(interp, call, "ABS")?;
    let result = match elems {
        Elems::Int(v) => Numeric {
            ty,
            dims,
            elems: Elems::Int(v.into_iter().map(i64::wrapping_abs).collect()),
        },
        Elems::Real(v) => Numeric {
            ty,
            dims,
            elems: Elems::Real(v.into_iter().map(f64::abs).collect()),
        },
        Elems::Cplx(v) => Numeric {
            ty: if ty == NumType::CDouble {
                NumType::Double
            } else {
                NumType::Float
            },
            dims,
            elems: Elems::Real(v.into_iter().map(|c| c.re.hypot(c.im)).collect()),
        },
        Elems::Text(_) => {
            return Err(LuxError::new(
                ErrorCode::TypeMismatch,
                "ABS is not defined for strings",
            ))
        }
    };
    let pipe = call.pipe && !ty.is_complex();
    deliver(interp, &CallArgs { pipe, ..call.clone() }, result.cast_keep()?)
}

trait CastKeep {
    fn cast_keep(self) -> Result<Numeric>;
}

impl CastKeep for Numeric {
    /// Narrow to the value's own type.
    fn cast_keep(self) -> Result<Numeric> {
        let ty = self.ty;
        self.cast(ty)
    }
}

fn bytarr(interp: &mut Interpreter, call: &CallArgs) -> Ret {
    array_of(interp, call, NumType::Byte)
}

fn intarr(interp: &mut Interpreter, call: &CallArgs) -> Ret {
    array_of(interp, call, NumType::Word)
}

fn lonarr(interp: &mut Interpreter, call: &CallArgs) -> Ret {
    array_of(interp, call, NumType::Long)
}

fn fltarr(interp: &mut Interpreter, call: &CallArgs) -> Ret {
    array_of(interp, call, NumType::Float)
}

fn dblarr(interp: &mut Interpreter, call: &CallArgs) -> Ret {
    array_of(interp, call, NumType::Double)
}

fn to_byte(interp: &mut Interpreter, call: &CallArgs) -> Ret {
    convert(interp, call, NumType::Byte, "BYTE")
}

fn to_word(interp: &mut Interpreter, call: &CallArgs) -> Ret {
    convert(interp, call, NumType::Word, "WORD")
}

fn to_long(interp: &mut Interpreter, call: &CallArgs) -> Ret {
    convert(interp, call, NumType::Long, "LONG")
}

fn to_int64(interp: &mut Interpreter, call: &CallArgs) -> Ret {
    convert(interp, call, NumType::Int64, "INT64")
}

fn to_float(interp: &mut Interpreter, call: &CallArgs) -> Ret {
    convert(interp, call, NumType::Float, "FLOAT")
}

fn to_double(interp: &mut Interpreter, call: &CallArgs) -> Ret {
    convert(interp, call, NumType::Double, "DOUBLE")
}

fn classname(interp: &mut Interpreter, call: &CallArgs) -> Ret {
    let arg = call.required(0, "CLASSNAME")?;
    let target = interp.resolve(arg);
    let name = interp.store.get(target)?.class().name().to_string();
    interp
        .new_value(Payload::String(name, StringKind::Temporary))
        .map(Some)
}

fn complex(interp: &mut Interpreter, call: &CallArgs) -> Ret {
    let re = first_numeric(interp, call, "COMPLEX")?;
    let im = match call.arg(1) {
        Some(arg) => Some(interp.eval_numeric(arg)?),
        None => None,
    };
    let double = re.ty == NumType::Double
        || re.ty == NumType::CDouble
        || im.as_ref().is_some_and(|im| im.ty == NumType::Double);
    let ty = if double {
        NumType::CDouble
    } else {
        NumType::CFloat
    };

    let dims = re
        .dims
        .clone()
        .or_else(|| im.as_ref().and_then(|im| im.dims.clone()));
    let real_parts = re.reals()?;
    let imaginary_parts = match &im {
        Some(im) => im.reals()?,
        None => vec![0.0],
    };
    if real_parts.len() != 1 && imaginary_parts.len() != 1 && real_parts.len() != imaginary_parts.len()
    {
        return Err(LuxError::new(
            ErrorCode::DimensionMismatch,
            "COMPLEX parts have different sizes",
        ));
    }
    let len = real_parts.len().max(imaginary_parts.len());
    let pick = |v: &[f64], i: usize| if v.len() == 1 { v[0] } else { v[i] };
    let elems = Elems::Cplx(
        (0..len)
            .map(|i| Complex::new(pick(&real_parts, i), pick(&imaginary_parts, i)))
            .collect(),
    );
    interp
        .new_value(Numeric { ty, dims, elems }.into_payload())
        .map(Some)
}

/// `[a, b, ...]`: all elements in one 1-D array of the common type.
fn concat(interp: &mut Interpreter, call: &CallArgs) -> Ret {
    let mut parts = Vec::with_capacity(call.count());
    for arg in call.present() {
        parts.push(interp.eval_numeric(arg)?);
    }
    let ty = parts
        .iter()
        .map(|p| p.ty)
        .reduce(NumType::promote)
        .unwrap_or(NumType::Long);
    let mut elems = empty_elems(ty);
    for part in parts {
        append(&mut elems, part.cast(ty)?.elems);
    }
    let len = elems.len();
    interp
        .new_value(
            Numeric {
                ty,
                dims: Some(vec![len]),
                elems,
            }
            .into_payload(),
        )
        .map(Some)
}

fn dimen(interp: &mut Interpreter, call: &CallArgs) -> Ret {
    let arg = call.required(0, "DIMEN")?;
    let value = interp.eval(arg)?;
    let dims = match &interp.store[value].payload {
        Payload::Array(array) => array.dims.clone(),
        Payload::List(entries) => vec![entries.len()],
        Payload::CList(items) => vec![items.len()],
        Payload::Structure(structure) => vec![structure.entries.len()],
        _ => vec![1],
    };
    match call.arg(1) {
        Some(axis) => {
            let axis = interp.eval_index(axis)?;
            let size = usize::try_from(axis)
                .ok()
                .and_then(|a| dims.get(a).copied())
                .ok_or_else(|| {
                    LuxError::new(
                        ErrorCode::IndexOutOfBounds,
                        format!("Axis {} does not exist", axis),
                    )
                })?;
            long_value(interp, size as i64)
        }
        None => {
            let n = dims.len();
            interp
                .new_value(
                    Numeric {
                        ty: NumType::Long,
                        dims: Some(vec![n]),
                        elems: Elems::Int(dims.into_iter().map(|d| d as i64).collect()),
                    }
                    .into_payload(),
                )
                .map(Some)
        }
    }
}

fn real(interp: &mut Interpreter, call: &CallArgs) -> Ret {
    complex_part(interp, call, "REAL", |c| c.re)
}

fn imaginary(interp: &mut Interpreter, call: &CallArgs) -> Ret {
    complex_part(interp, call, "IMAGINARY", |c| c.im)
}

fn complex_part(
    interp: &mut Interpreter,
    call: &CallArgs,
    name: &str,
    part: fn(Complex) -> f64,
) -> Ret {
    let value = first_numeric(interp, call, name)?;
    let ty = match value.ty {
        NumType::CDouble | NumType::Double => NumType::Double,
        _ => NumType::Float,
    };
    let parts = match value.elems {
        Elems::Cplx(v) => v.into_iter().map(part).collect(),
        Elems::Text(_) => {
            return Err(LuxError::new(
                ErrorCode::TypeMismatch,
                format!("{} is not defined for strings", name),
            ))
        }
        other => {
            let reals = Numeric {
                ty: value.ty,
                dims: None,
                elems: other,
            }
            .reals()?;
            reals
                .into_iter()
                .map(|re| part(Complex::new(re, 0.0)))
                .collect()
        }
    };
    let result = Numeric {
        ty,
        dims: value.dims,
        elems: Elems::Real(parts),
    }
    .cast(ty)?;
    interp.new_value(result.into_payload()).map(Some)
}

fn indgen(interp: &mut Interpreter, call: &CallArgs) -> Ret {
    let dims = dimensions(interp, call)?;
    let len = values::element_count(&dims)?;
    interp
        .new_value(
            Numeric {
                ty: NumType::Long,
                dims: Some(dims),
                elems: Elems::Int(values::try_collect(0..len as i64)?),
            }
            .into_payload(),
        )
        .map(Some)
}

fn neg(interp: &mut Interpreter, call: &CallArgs) -> Ret {
    let value = values::negate(first_numeric(interp, call, "NEG")?)?;
    deliver(interp, call, value)
}

fn not(interp: &mut Interpreter, call: &CallArgs) -> Ret {
    let value = first_numeric(interp, call, "NOT")?;
    let keeps_type = value.ty.is_integer();
    let result = values::logical_not(value)?;
    let pipe = call.pipe && keeps_type;
    deliver(interp, &CallArgs { pipe, ..call.clone() }, result)
}

fn num_elem(interp: &mut Interpreter, call: &CallArgs) -> Ret {
    let arg = call.required(0, "NUM_ELEM")?;
    let value = interp.eval(arg)?;
    let count = match &interp.store[value].payload {
        Payload::Array(array) => array.len(),
        Payload::List(entries) => entries.len(),
        Payload::CList(items) => items.len(),
        Payload::Structure(structure) => structure.entries.len(),
        _ => 1,
    };
    long_value(interp, count as i64)
}

fn sqrt(interp: &mut Interpreter, call: &CallArgs) -> Ret {
    let value = first_numeric(interp, call, "SQRT")?;
    let keeps_type = !value.ty.is_integer();
    let result = values::map_real(value, f64::sqrt)?;
    let pipe = call.pipe && keeps_type;
    deliver(interp, &CallArgs { pipe, ..call.clone() }, result)
}

fn string(interp: &mut Interpreter, call: &CallArgs) -> Ret {
    let mut text = String::new();
    for arg in call.present() {
        text.push_str(&interp.eval_string(arg)?);
    }
    interp
        .new_value(Payload::String(text, StringKind::Temporary))
        .map(Some)
}

/// Turn a list into a structure with a flat byte layout.
fn structure(interp: &mut Interpreter, call: &CallArgs) -> Ret {
    let arg = call.required(0, "STRUCT")?;
    let value = interp.eval(arg)?;
    let members: Vec<ListEntry> = match &interp.store[value].payload {
        Payload::List(entries) => entries.clone(),
        Payload::CList(items) => items
            .iter()
            .map(|&value| ListEntry { key: None, value })
            .collect(),
        other => {
            return Err(LuxError::new(
                ErrorCode::TypeMismatch,
                format!("STRUCT needs a list, found {}", other.class()),
            ))
        }
    };

    let mut layout = Vec::with_capacity(members.len());
    let mut offset = 0;
    for member in &members {
        let payload = &interp.store[interp.resolve(member.value)].payload;
        let (ty, count) = match payload {
            Payload::Array(array) => (array.num_type(), array.len()),
            Payload::String(s, _) | Payload::FixedString(s) => (NumType::String, s.len()),
            p => match p.num_type() {
                Some(ty) => (ty, 1),
                None => {
                    return Err(LuxError::new(
                        ErrorCode::TypeMismatch,
                        format!("A {} cannot be a structure member", p.class()),
                    ))
                }
            },
        };
        layout.push(FieldLayout {
            key: member.key.clone(),
            offset,
            ty,
            count,
        });
        offset += ty.size() * count;
    }

    let result = interp.instantiate(
        Placement::Temp,
        Payload::Structure(Box::new(Structure {
            entries: Vec::new(),
            layout,
        })),
    )?;
    for member in members {
        let copy = interp.copy_value(member.value, Placement::ChildOf(result))?;
        if let Payload::Structure(s) = &mut interp.store[result].payload {
            s.entries.push(ListEntry {
                key: member.key,
                value: copy,
            });
        }
    }
    Ok(Some(result))
}

fn symbol(interp: &mut Interpreter, call: &CallArgs) -> Ret {
    let arg = call.required(0, "SYMBOL")?;
    let target = interp.resolve(arg);
    if !interp.is_named_variable(target) {
        return Err(LuxError::new(
            ErrorCode::IllegalOperation,
            format!("SYMBOL needs a named variable, not {}", interp.symbol_ident(arg)),
        ));
    }
    long_value(interp, target as i64)
}

/// Sum of all elements; `/DOUBLE` sums in double precision, `/MEAN`
/// divides by the element count.
fn total(interp: &mut Interpreter, call: &CallArgs) -> Ret {
    let value = first_numeric(interp, call, "TOTAL")?;
    if value.ty == NumType::String || value.ty.is_complex() {
        return Err(LuxError::new(
            ErrorCode::TypeMismatch,
            format!("TOTAL is not defined for {}", value.ty.name()),
        ));
    }
    let double = call.has_mode(2) || value.ty == NumType::Double;
    let mean = call.has_mode(4);
    let count = value.len().max(1);

    let result = if value.ty.is_integer() && !double && !mean {
        let sum = match &value.elems {
            Elems::Int(v) => v.iter().fold(0i64, |acc, x| acc.wrapping_add(*x)),
            _ => 0,
        };
        let ty = if value.ty == NumType::Int64 {
            NumType::Int64
        } else {
            NumType::Long
        };
        Numeric {
            ty,
            dims: None,
            elems: Elems::Int(vec![sum]),
        }
    } else {
        let sum: f64 = value.reals()?.iter().sum();
        let sum = if mean { sum / count as f64 } else { sum };
        Numeric {
            ty: if double { NumType::Double } else { NumType::Float },
            dims: None,
            elems: Elems::Real(vec![sum]),
        }
    };
    interp.new_value(result.cast_keep()?.into_payload()).map(Some)
}
