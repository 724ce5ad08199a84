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

//! Element-wise arithmetic on numeric and string payloads.
//!
//! Operands are widened into a [`Numeric`] working form (64-bit integers,
//! doubles, complex doubles or strings), combined, and narrowed back to the
//! promoted element type when turned into a payload. Integer arithmetic
//! wraps at the width of the result type.

use crate::error::{ErrorCode, LuxError, Result};
use crate::symbols::{Array, ArrayData, BinaryOp, Complex, NumType, Payload, Scalar, StringKind};

/// Elements in working precision.
#[derive(Debug, Clone, PartialEq)]
pub enum Elems {
    Int(Vec<i64>),
    Real(Vec<f64>),
    Cplx(Vec<Complex>),
    Text(Vec<String>),
}

impl Elems {
    pub fn len(&self) -> usize {
        match self {
            Elems::Int(v) => v.len(),
            Elems::Real(v) => v.len(),
            Elems::Cplx(v) => v.len(),
            Elems::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn into_int(self) -> Result<Vec<i64>> {
        match self {
            Elems::Int(v) => Ok(v),
            Elems::Real(v) => try_collect(v.into_iter().map(|x| x as i64)),
            Elems::Cplx(v) => try_collect(v.into_iter().map(|c| c.re as i64)),
            Elems::Text(v) => try_collect_ok(v.iter().map(|s| parse_number(s).map(|x| x as i64))),
        }
    }

    fn into_real(self) -> Result<Vec<f64>> {
        match self {
            Elems::Int(v) => try_collect(v.into_iter().map(|x| x as f64)),
            Elems::Real(v) => Ok(v),
            Elems::Cplx(v) => try_collect(v.into_iter().map(|c| c.re)),
            Elems::Text(v) => try_collect_ok(v.iter().map(|s| parse_number(s))),
        }
    }

    fn into_cplx(self) -> Result<Vec<Complex>> {
        match self {
            Elems::Cplx(v) => Ok(v),
            other => try_collect(other.into_real()?.into_iter().map(|re| Complex::new(re, 0.0))),
        }
    }

    fn into_text(self) -> Result<Vec<String>> {
        match self {
            Elems::Int(v) => try_collect(v.iter().map(|x| x.to_string())),
            Elems::Real(v) => try_collect(v.iter().map(|x| x.to_string())),
            Elems::Cplx(v) => try_collect(v.iter().map(|c| c.to_string())),
            Elems::Text(v) => Ok(v),
        }
    }
}

/// Collect into a vector whose storage is reserved up front, reporting an
/// allocation failure instead of aborting.
pub fn try_collect<T>(items: impl Iterator<Item = T>) -> Result<Vec<T>> {
    let (lower, upper) = items.size_hint();
    let mut v = Vec::new();
    reserve(&mut v, upper.unwrap_or(lower))?;
    v.extend(items);
    Ok(v)
}

/// [`try_collect`] for fallible items; stops at the first error.
pub fn try_collect_ok<T>(items: impl Iterator<Item = Result<T>>) -> Result<Vec<T>> {
    let mut v = Vec::new();
    reserve(&mut v, items.size_hint().0)?;
    for item in items {
        v.push(item?);
    }
    Ok(v)
}

fn reserve<T>(v: &mut Vec<T>, len: usize) -> Result<()> {
    v.try_reserve_exact(len).map_err(|_| {
        LuxError::new(
            ErrorCode::AllocationFailed,
            format!("Cannot allocate {} array elements", len),
        )
    })
}

fn parse_number(text: &str) -> Result<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    trimmed.parse::<f64>().map_err(|_| {
        LuxError::new(
            ErrorCode::TypeMismatch,
            format!("Cannot convert \"{}\" to a number", text),
        )
    })
}

/// A value in working form.
#[derive(Debug, Clone, PartialEq)]
pub struct Numeric {
    pub ty: NumType,
    /// `None` for scalars.
    pub dims: Option<Vec<usize>>,
    pub elems: Elems,
}

impl Numeric {
    pub fn scalar(value: Scalar) -> Self {
        let ty = value.num_type();
        let elems = if ty.is_integer() {
            Elems::Int(vec![value.as_i64()])
        } else {
            Elems::Real(vec![value.as_f64()])
        };
        Self {
            ty,
            dims: None,
            elems,
        }
    }

    pub fn long(value: i64) -> Self {
        Self {
            ty: NumType::Long,
            dims: None,
            elems: Elems::Int(vec![value]),
        }
    }

    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    pub fn is_scalar(&self) -> bool {
        self.dims.is_none()
    }

    /// Convert every element to `ty`.
    pub fn cast(self, ty: NumType) -> Result<Numeric> {
        let elems = match ty {
            NumType::String => Elems::Text(self.elems.into_text()?),
            NumType::CFloat | NumType::CDouble => Elems::Cplx(self.elems.into_cplx()?),
            NumType::Float | NumType::Double => Elems::Real(self.elems.into_real()?),
            _ => Elems::Int(self.elems.into_int()?),
        };
        Ok(Numeric {
            ty,
            dims: self.dims,
            elems,
        }
        .narrowed())
    }

    /// Wrap integers to the width of `ty` and round floats to single
    /// precision where `ty` asks for it.
    fn narrowed(mut self) -> Self {
        match (&mut self.elems, self.ty) {
            (Elems::Int(v), NumType::Byte) => v.iter_mut().for_each(|x| *x = *x as u8 as i64),
            (Elems::Int(v), NumType::Word) => v.iter_mut().for_each(|x| *x = *x as i16 as i64),
            (Elems::Int(v), NumType::Long) => v.iter_mut().for_each(|x| *x = *x as i32 as i64),
            (Elems::Real(v), NumType::Float) => v.iter_mut().for_each(|x| *x = *x as f32 as f64),
            _ => {}
        }
        self
    }

    /// The only element of a one-element value.
    pub fn single(&self) -> Result<Numeric> {
        if self.len() != 1 {
            return Err(LuxError::new(
                ErrorCode::NotScalar,
                format!("Expected a single value, found {} elements", self.len()),
            ));
        }
        Ok(Numeric {
            ty: self.ty,
            dims: None,
            elems: self.elems.clone(),
        })
    }

    /// Integer value of a one-element value.
    pub fn as_index(&self) -> Result<i64> {
        let single = self.single()?;
        if single.ty == NumType::String {
            return Err(LuxError::new(
                ErrorCode::TypeMismatch,
                "Expected a number, found a string",
            ));
        }
        Ok(single.elems.into_int()?.first().copied().unwrap_or(0))
    }

    /// Truth value of a one-element value.
    pub fn truth(&self) -> Result<bool> {
        let single = self.single()?;
        Ok(match &single.elems {
            Elems::Int(v) => v.iter().any(|x| *x != 0),
            Elems::Real(v) => v.iter().any(|x| *x != 0.0),
            Elems::Cplx(v) => v.iter().any(|c| c.re != 0.0 || c.im != 0.0),
            Elems::Text(v) => v.iter().any(|s| !s.is_empty()),
        })
    }

    /// Elements as doubles (complex values contribute their real part).
    pub fn reals(&self) -> Result<Vec<f64>> {
        self.elems.clone().into_real()
    }

    /// Build the payload of a new symbol.
    pub fn into_payload(self) -> Payload {
        let ty = self.ty;
        match self.dims {
            None => match self.elems {
                Elems::Int(v) => {
                    let x = v.first().copied().unwrap_or(0);
                    Payload::Scalar(match ty {
                        NumType::Byte => Scalar::Byte(x as u8),
                        NumType::Word => Scalar::Word(x as i16),
                        NumType::Int64 => Scalar::Int64(x),
                        _ => Scalar::Long(x as i32),
                    })
                }
                Elems::Real(v) => {
                    let x = v.first().copied().unwrap_or(0.0);
                    Payload::Scalar(match ty {
                        NumType::Float => Scalar::Float(x as f32),
                        _ => Scalar::Double(x),
                    })
                }
                Elems::Cplx(v) => Payload::CScalar {
                    value: Box::new(v.first().copied().unwrap_or_default()),
                    ty,
                },
                Elems::Text(v) => Payload::String(
                    v.into_iter().next().unwrap_or_default(),
                    StringKind::Temporary,
                ),
            },
            Some(dims) => {
                let data = match self.elems {
                    Elems::Int(v) => match ty {
                        NumType::Byte => ArrayData::Byte(v.into_iter().map(|x| x as u8).collect()),
                        NumType::Word => ArrayData::Word(v.into_iter().map(|x| x as i16).collect()),
                        NumType::Int64 => ArrayData::Int64(v),
                        _ => ArrayData::Long(v.into_iter().map(|x| x as i32).collect()),
                    },
                    Elems::Real(v) => match ty {
                        NumType::Float => ArrayData::Float(v.into_iter().map(|x| x as f32).collect()),
                        _ => ArrayData::Double(v),
                    },
                    Elems::Cplx(v) => match ty {
                        NumType::CFloat => ArrayData::CFloat(v),
                        _ => ArrayData::CDouble(v),
                    },
                    Elems::Text(v) => ArrayData::String(v),
                };
                Payload::Array(Box::new(Array { dims, data }))
            }
        }
    }
}

/// Working form of a payload.
pub fn numeric(payload: &Payload) -> Result<Numeric> {
    match payload {
        Payload::Scalar(s) | Payload::FixedNumber(s) => Ok(Numeric::scalar(*s)),
        Payload::CScalar { value, ty } => Ok(Numeric {
            ty: *ty,
            dims: None,
            elems: Elems::Cplx(vec![**value]),
        }),
        Payload::String(s, _) | Payload::FixedString(s) => Ok(Numeric {
            ty: NumType::String,
            dims: None,
            elems: Elems::Text(vec![s.clone()]),
        }),
        Payload::Array(array) => {
            let indices = try_collect(0..array.len())?;
            let mut value = select(array, &indices)?;
            value.dims = Some(array.dims.clone());
            Ok(value)
        }
        other => Err(LuxError::new(
            ErrorCode::TypeMismatch,
            format!("Expected a numeric or string value, found {}", other.class()),
        )),
    }
}

/// Elements of `array` at the given flat indices, as a scalar-shaped value.
/// The caller has checked the indices.
pub fn select(array: &Array, indices: &[usize]) -> Result<Numeric> {
    fn pick<T: Copy, U>(v: &[T], indices: &[usize], f: impl Fn(T) -> U) -> Result<Vec<U>> {
        try_collect(indices.iter().filter_map(|&i| v.get(i).copied()).map(f))
    }

    let elems = match &array.data {
        ArrayData::Byte(v) => Elems::Int(pick(v, indices, i64::from)?),
        ArrayData::Word(v) => Elems::Int(pick(v, indices, i64::from)?),
        ArrayData::Long(v) => Elems::Int(pick(v, indices, i64::from)?),
        ArrayData::Int64(v) => Elems::Int(pick(v, indices, |x| x)?),
        ArrayData::Float(v) => Elems::Real(pick(v, indices, f64::from)?),
        ArrayData::Double(v) => Elems::Real(pick(v, indices, |x| x)?),
        ArrayData::CFloat(v) | ArrayData::CDouble(v) => Elems::Cplx(pick(v, indices, |x| x)?),
        ArrayData::String(v) => {
            Elems::Text(try_collect(indices.iter().filter_map(|&i| v.get(i).cloned()))?)
        }
    };
    Ok(Numeric {
        ty: array.num_type(),
        dims: None,
        elems,
    })
}

/// Store `source` into `array` at the given flat indices. A single source
/// element is broadcast.
pub fn scatter(array: &mut Array, indices: &[usize], source: Numeric) -> Result<()> {
    let source = source.cast(array.num_type())?;
    let n = source.len();
    if n != 1 && n != indices.len() {
        return Err(LuxError::new(
            ErrorCode::DimensionMismatch,
            format!(
                "Cannot store {} elements into {} array elements",
                n,
                indices.len()
            ),
        ));
    }

    fn put<S: Clone, T>(dest: &mut [T], indices: &[usize], src: &[S], f: impl Fn(S) -> T) {
        for (k, &i) in indices.iter().enumerate() {
            let value = if src.len() == 1 { &src[0] } else { &src[k] };
            if let Some(slot) = dest.get_mut(i) {
                *slot = f(value.clone());
            }
        }
    }

    match (&mut array.data, &source.elems) {
        (ArrayData::Byte(d), Elems::Int(s)) => put(d, indices, s, |x| x as u8),
        (ArrayData::Word(d), Elems::Int(s)) => put(d, indices, s, |x| x as i16),
        (ArrayData::Long(d), Elems::Int(s)) => put(d, indices, s, |x| x as i32),
        (ArrayData::Int64(d), Elems::Int(s)) => put(d, indices, s, |x| x),
        (ArrayData::Float(d), Elems::Real(s)) => put(d, indices, s, |x| x as f32),
        (ArrayData::Double(d), Elems::Real(s)) => put(d, indices, s, |x| x),
        (ArrayData::CFloat(d), Elems::Cplx(s)) | (ArrayData::CDouble(d), Elems::Cplx(s)) => {
            put(d, indices, s, |x| x)
        }
        (ArrayData::String(d), Elems::Text(s)) => put(d, indices, s, |x| x),
        _ => {
            return Err(LuxError::new(
                ErrorCode::TypeMismatch,
                "Element type changed during conversion",
            ))
        }
    }
    Ok(())
}

fn allocate<T: Clone>(len: usize, value: T) -> Result<Vec<T>> {
    let mut v = Vec::new();
    reserve(&mut v, len)?;
    v.resize(len, value);
    Ok(v)
}

/// Number of elements for `dims`.
pub fn element_count(dims: &[usize]) -> Result<usize> {
    if dims.is_empty() || dims.iter().any(|&d| d == 0) {
        return Err(LuxError::new(
            ErrorCode::IllegalOperation,
            "Array dimensions must be positive",
        ));
    }
    dims.iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| LuxError::new(ErrorCode::AllocationFailed, "Array is too large"))
}

/// A zero-filled array.
pub fn zeros(ty: NumType, dims: &[usize]) -> Result<Payload> {
    let len = element_count(dims)?;
    let data = match ty {
        NumType::Byte => ArrayData::Byte(allocate(len, 0)?),
        NumType::Word => ArrayData::Word(allocate(len, 0)?),
        NumType::Long => ArrayData::Long(allocate(len, 0)?),
        NumType::Int64 => ArrayData::Int64(allocate(len, 0)?),
        NumType::Float => ArrayData::Float(allocate(len, 0.0)?),
        NumType::Double => ArrayData::Double(allocate(len, 0.0)?),
        NumType::CFloat => ArrayData::CFloat(allocate(len, Complex::default())?),
        NumType::CDouble => ArrayData::CDouble(allocate(len, Complex::default())?),
        NumType::String => ArrayData::String(allocate(len, String::new())?),
    };
    Ok(Payload::Array(Box::new(Array {
        dims: dims.to_vec(),
        data,
    })))
}

/// Shape of the result of combining two operands.
fn result_dims(a: &Numeric, b: &Numeric) -> Result<Option<Vec<usize>>> {
    match (&a.dims, &b.dims) {
        (Some(da), Some(_)) => {
            if a.len() != b.len() {
                return Err(LuxError::new(
                    ErrorCode::DimensionMismatch,
                    format!(
                        "Operands have {} and {} elements",
                        a.len(),
                        b.len()
                    ),
                ));
            }
            Ok(Some(da.clone()))
        }
        (Some(d), None) | (None, Some(d)) => Ok(Some(d.clone())),
        (None, None) => Ok(None),
    }
}

fn zip_with<T, U>(
    a: &[T],
    b: &[T],
    mut f: impl FnMut(&T, &T) -> Result<U>,
) -> Result<Vec<U>> {
    let len = a.len().max(b.len());
    try_collect_ok((0..len).map(|i| {
        let x = if a.len() == 1 { &a[0] } else { &a[i] };
        let y = if b.len() == 1 { &b[0] } else { &b[i] };
        f(x, y)
    }))
}

fn int_pow(base: i64, exp: i64) -> i64 {
    match (base, exp) {
        (1, _) => 1,
        (-1, e) => {
            if e % 2 == 0 {
                1
            } else {
                -1
            }
        }
        (_, e) if e < 0 => 0,
        (b, e) => b.wrapping_pow(e.min(u32::MAX as i64) as u32),
    }
}

fn divide_by_zero() -> LuxError {
    LuxError::new(ErrorCode::DivisionByZero, "Integer division by zero")
}

fn complex_pow(a: Complex, b: Complex) -> Complex {
    if a.re == 0.0 && a.im == 0.0 {
        return if b.re == 0.0 && b.im == 0.0 {
            Complex::new(1.0, 0.0)
        } else {
            Complex::default()
        };
    }
    let modulus = a.re.hypot(a.im).ln();
    let arg = a.im.atan2(a.re);
    let re = b.re * modulus - b.im * arg;
    let im = b.im * modulus + b.re * arg;
    let scale = re.exp();
    Complex::new(scale * im.cos(), scale * im.sin())
}

/// Combine two operands element by element.
pub fn binary(op: BinaryOp, a: Numeric, b: Numeric) -> Result<Numeric> {
    let dims = result_dims(&a, &b)?;

    if a.ty == NumType::String || b.ty == NumType::String {
        let x = a.elems.into_text()?;
        let y = b.elems.into_text()?;
        let (ty, elems) = match op {
            BinaryOp::Add => (
                NumType::String,
                Elems::Text(zip_with(&x, &y, |p, q| Ok(format!("{}{}", p, q)))?),
            ),
            _ if op.is_comparison() => (
                NumType::Long,
                Elems::Int(zip_with(&x, &y, |p, q| Ok(compare(op, p.cmp(q)) as i64))?),
            ),
            _ => {
                return Err(LuxError::new(
                    ErrorCode::TypeMismatch,
                    format!("Operator {} is not defined for strings", op.symbol()),
                ))
            }
        };
        return Ok(Numeric { ty, dims, elems });
    }

    let ty = a.ty.promote(b.ty);
    if ty.is_complex() {
        let x = a.elems.into_cplx()?;
        let y = b.elems.into_cplx()?;
        let elems = match op {
            BinaryOp::Add => Elems::Cplx(zip_with(&x, &y, |p, q| {
                Ok(Complex::new(p.re + q.re, p.im + q.im))
            })?),
            BinaryOp::Sub => Elems::Cplx(zip_with(&x, &y, |p, q| {
                Ok(Complex::new(p.re - q.re, p.im - q.im))
            })?),
            BinaryOp::Mul => Elems::Cplx(zip_with(&x, &y, |p, q| {
                Ok(Complex::new(p.re * q.re - p.im * q.im, p.re * q.im + p.im * q.re))
            })?),
            BinaryOp::Div => Elems::Cplx(zip_with(&x, &y, |p, q| {
                let d = q.re * q.re + q.im * q.im;
                Ok(Complex::new(
                    (p.re * q.re + p.im * q.im) / d,
                    (p.im * q.re - p.re * q.im) / d,
                ))
            })?),
            BinaryOp::Pow => Elems::Cplx(zip_with(&x, &y, |p, q| Ok(complex_pow(*p, *q)))?),
            BinaryOp::Eq => {
                return Ok(Numeric {
                    ty: NumType::Long,
                    dims,
                    elems: Elems::Int(zip_with(&x, &y, |p, q| Ok((p == q) as i64))?),
                })
            }
            BinaryOp::Ne => {
                return Ok(Numeric {
                    ty: NumType::Long,
                    dims,
                    elems: Elems::Int(zip_with(&x, &y, |p, q| Ok((p != q) as i64))?),
                })
            }
            _ => {
                return Err(LuxError::new(
                    ErrorCode::IllegalOperation,
                    format!("Operator {} is not defined for complex values", op.symbol()),
                ))
            }
        };
        return Ok(Numeric { ty, dims, elems });
    }

    if ty.is_integer() {
        let x = a.elems.into_int()?;
        let y = b.elems.into_int()?;
        let values = zip_with(&x, &y, |&p, &q| {
            Ok(match op {
                BinaryOp::Add => p.wrapping_add(q),
                BinaryOp::Sub => p.wrapping_sub(q),
                BinaryOp::Mul => p.wrapping_mul(q),
                BinaryOp::Div => {
                    if q == 0 {
                        return Err(divide_by_zero());
                    }
                    p.wrapping_div(q)
                }
                BinaryOp::Mod => {
                    if q == 0 {
                        return Err(divide_by_zero());
                    }
                    p.wrapping_rem(q)
                }
                BinaryOp::Pow => int_pow(p, q),
                BinaryOp::And => p & q,
                BinaryOp::Or => p | q,
                BinaryOp::Xor => p ^ q,
                _ => compare(op, p.cmp(&q)) as i64,
            })
        })?;
        let ty = if op.is_comparison() { NumType::Long } else { ty };
        return Ok(Numeric {
            ty,
            dims,
            elems: Elems::Int(values),
        }
        .narrowed());
    }

    let x = a.elems.into_real()?;
    let y = b.elems.into_real()?;
    let elems = match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod
        | BinaryOp::Pow => Elems::Real(zip_with(&x, &y, |&p, &q| {
            Ok(match op {
                BinaryOp::Add => p + q,
                BinaryOp::Sub => p - q,
                BinaryOp::Mul => p * q,
                BinaryOp::Div => p / q,
                BinaryOp::Mod => p % q,
                _ => p.powf(q),
            })
        })?),
        BinaryOp::And => Elems::Int(zip_with(&x, &y, |&p, &q| Ok((p != 0.0 && q != 0.0) as i64))?),
        BinaryOp::Or => Elems::Int(zip_with(&x, &y, |&p, &q| Ok((p != 0.0 || q != 0.0) as i64))?),
        BinaryOp::Xor => Elems::Int(zip_with(&x, &y, |&p, &q| Ok(((p != 0.0) != (q != 0.0)) as i64))?),
        _ => Elems::Int(zip_with(&x, &y, |&p, &q| {
            Ok(match p.partial_cmp(&q) {
                Some(ordering) => compare(op, ordering) as i64,
                None => (op == BinaryOp::Ne) as i64,
            })
        })?),
    };
    let ty = if matches!(elems, Elems::Int(_)) {
        NumType::Long
    } else {
        ty
    };
    Ok(Numeric { ty, dims, elems }.narrowed())
}

fn compare(op: BinaryOp, ordering: std::cmp::Ordering) -> bool {
    use std::cmp::Ordering::*;
    match op {
        BinaryOp::Eq => ordering == Equal,
        BinaryOp::Ne => ordering != Equal,
        BinaryOp::Lt => ordering == Less,
        BinaryOp::Le => ordering != Greater,
        BinaryOp::Gt => ordering == Greater,
        BinaryOp::Ge => ordering != Less,
        _ => false,
    }
}

/// Arithmetic negation.
pub fn negate(value: Numeric) -> Result<Numeric> {
    let elems = match value.elems {
        Elems::Int(v) => Elems::Int(v.into_iter().map(i64::wrapping_neg).collect()),
        Elems::Real(v) => Elems::Real(v.into_iter().map(|x| -x).collect()),
        Elems::Cplx(v) => Elems::Cplx(v.into_iter().map(|c| Complex::new(-c.re, -c.im)).collect()),
        Elems::Text(_) => {
            return Err(LuxError::new(
                ErrorCode::TypeMismatch,
                "Cannot negate a string",
            ))
        }
    };
    Ok(Numeric { elems, ..value }.narrowed())
}

/// `NOT`: bitwise for integers, logical for reals.
pub fn logical_not(value: Numeric) -> Result<Numeric> {
    match value.elems {
        Elems::Int(v) => Ok(Numeric {
            elems: Elems::Int(v.into_iter().map(|x| !x).collect()),
            ..value
        }
        .narrowed()),
        Elems::Real(v) => Ok(Numeric {
            ty: NumType::Long,
            dims: value.dims,
            elems: Elems::Int(v.into_iter().map(|x| (x == 0.0) as i64).collect()),
        }),
        Elems::Cplx(_) => Err(LuxError::new(
            ErrorCode::IllegalOperation,
            "NOT is not defined for complex values",
        )),
        Elems::Text(_) => Err(LuxError::new(
            ErrorCode::TypeMismatch,
            "NOT is not defined for strings",
        )),
    }
}

/// Apply `f` to every element as a double; the result keeps the operand's
/// floating type, integers become float.
pub fn map_real(value: Numeric, f: impl Fn(f64) -> f64) -> Result<Numeric> {
    if value.ty.is_complex() || value.ty == NumType::String {
        return Err(LuxError::new(
            ErrorCode::TypeMismatch,
            format!("Expected a real value, found {}", value.ty.name()),
        ));
    }
    let ty = if value.ty == NumType::Double {
        NumType::Double
    } else {
        NumType::Float
    };
    let dims = value.dims.clone();
    let elems = Elems::Real(value.elems.into_real()?.into_iter().map(f).collect());
    Ok(Numeric { ty, dims, elems }.narrowed())
}
