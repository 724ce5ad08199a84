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

//! Symbol payloads.
//!
//! The payload is a sum type whose variant is the symbol's class; numeric
//! variants carry their element type. Child references are plain indices
//! into the symbol store. Which children a symbol owns is decided by the
//! children's context field, not by the payload.

use std::fmt;
use std::path::PathBuf;

use super::SymbolId;

/// Element type of numeric and string data.
///
/// The declaration order is the promotion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NumType {
    Byte,
    Word,
    Long,
    Int64,
    Float,
    Double,
    CFloat,
    CDouble,
    String,
}

impl NumType {
    /// Upper-case type name as shown by `TYPE` and `DUMP`.
    pub fn name(self) -> &'static str {
        match self {
            NumType::Byte => "BYTE",
            NumType::Word => "WORD",
            NumType::Long => "LONG",
            NumType::Int64 => "INT64",
            NumType::Float => "FLOAT",
            NumType::Double => "DOUBLE",
            NumType::CFloat => "CFLOAT",
            NumType::CDouble => "CDOUBLE",
            NumType::String => "STRING",
        }
    }

    /// Storage size of one element in bytes (strings report 1 per character).
    pub fn size(self) -> usize {
        match self {
            NumType::Byte | NumType::String => 1,
            NumType::Word => 2,
            NumType::Long | NumType::Float => 4,
            NumType::Int64 | NumType::Double | NumType::CFloat => 8,
            NumType::CDouble => 16,
        }
    }

    pub fn is_integer(self) -> bool {
        self <= NumType::Int64
    }

    pub fn is_complex(self) -> bool {
        matches!(self, NumType::CFloat | NumType::CDouble)
    }

    /// Common type of two operands.
    pub fn promote(self, other: NumType) -> NumType {
        match (self, other) {
            // complex float with a double operand keeps double precision
            (NumType::CFloat, NumType::Double) | (NumType::Double, NumType::CFloat) => {
                NumType::CDouble
            }
            _ => self.max(other),
        }
    }
}

/// A real scalar value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Byte(u8),
    Word(i16),
    Long(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
}

impl Scalar {
    pub fn num_type(self) -> NumType {
        match self {
            Scalar::Byte(_) => NumType::Byte,
            Scalar::Word(_) => NumType::Word,
            Scalar::Long(_) => NumType::Long,
            Scalar::Int64(_) => NumType::Int64,
            Scalar::Float(_) => NumType::Float,
            Scalar::Double(_) => NumType::Double,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Scalar::Byte(v) => v as f64,
            Scalar::Word(v) => v as f64,
            Scalar::Long(v) => v as f64,
            Scalar::Int64(v) => v as f64,
            Scalar::Float(v) => v as f64,
            Scalar::Double(v) => v,
        }
    }

    /// Integer value; reals are truncated toward zero.
    pub fn as_i64(self) -> i64 {
        match self {
            Scalar::Byte(v) => v as i64,
            Scalar::Word(v) => v as i64,
            Scalar::Long(v) => v as i64,
            Scalar::Int64(v) => v,
            Scalar::Float(v) => v as i64,
            Scalar::Double(v) => v as i64,
        }
    }

    pub fn is_true(self) -> bool {
        self.as_f64() != 0.0
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Byte(v) => write!(f, "{}", v),
            Scalar::Word(v) => write!(f, "{}", v),
            Scalar::Long(v) => write!(f, "{}", v),
            Scalar::Int64(v) => write!(f, "{}", v),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::Double(v) => write!(f, "{}", v),
        }
    }
}

/// A complex value, stored at double precision.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }
}

impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.re, self.im)
    }
}

/// String subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringKind {
    /// Computed at run time.
    Temporary,
    /// Taken from source text.
    Literal,
    /// Read-only system text.
    Fixed,
}

/// Element storage of an array.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    Byte(Vec<u8>),
    Word(Vec<i16>),
    Long(Vec<i32>),
    Int64(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    CFloat(Vec<Complex>),
    CDouble(Vec<Complex>),
    String(Vec<String>),
}

impl ArrayData {
    pub fn num_type(&self) -> NumType {
        match self {
            ArrayData::Byte(_) => NumType::Byte,
            ArrayData::Word(_) => NumType::Word,
            ArrayData::Long(_) => NumType::Long,
            ArrayData::Int64(_) => NumType::Int64,
            ArrayData::Float(_) => NumType::Float,
            ArrayData::Double(_) => NumType::Double,
            ArrayData::CFloat(_) => NumType::CFloat,
            ArrayData::CDouble(_) => NumType::CDouble,
            ArrayData::String(_) => NumType::String,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ArrayData::Byte(v) => v.len(),
            ArrayData::Word(v) => v.len(),
            ArrayData::Long(v) => v.len(),
            ArrayData::Int64(v) => v.len(),
            ArrayData::Float(v) => v.len(),
            ArrayData::Double(v) => v.len(),
            ArrayData::CFloat(v) | ArrayData::CDouble(v) => v.len(),
            ArrayData::String(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Array header and element data.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    /// Dimensions, first index fastest.
    pub dims: Vec<usize>,
    pub data: ArrayData,
}

impl Array {
    pub fn num_type(&self) -> NumType {
        self.data.num_type()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// One end of an evaluated range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeBound {
    /// Absolute index.
    Index(i64),
    /// Counted back from the last element: `*` is `FromEnd(0)`, `*-2` is `FromEnd(2)`.
    FromEnd(i64),
}

impl RangeBound {
    /// Resolve against a dimension of `len` elements.
    pub fn resolve(self, len: usize) -> i64 {
        match self {
            RangeBound::Index(i) => i,
            RangeBound::FromEnd(k) => len as i64 - 1 - k,
        }
    }
}

/// Range suffixes: `:+` sums over the axis, `:>n` moves the axis to
/// position `n` of the result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RangeFlags {
    pub sum: bool,
    pub redirect: Option<u8>,
}

impl RangeFlags {
    pub fn is_plain(self) -> bool {
        !self.sum && self.redirect.is_none()
    }
}

/// Evaluated range. A missing start means 0; a missing end means the range
/// selects the single element at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeValue {
    pub start: Option<RangeBound>,
    pub end: Option<RangeBound>,
    pub flags: RangeFlags,
}

/// One end of an unevaluated range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreRangeEnd {
    /// Expression giving an absolute index.
    Index(SymbolId),
    /// `*` (no offset) or `*-expr`.
    FromEnd(Option<SymbolId>),
}

impl PreRangeEnd {
    pub fn child(self) -> Option<SymbolId> {
        match self {
            PreRangeEnd::Index(id) => Some(id),
            PreRangeEnd::FromEnd(offset) => offset,
        }
    }
}

/// Unevaluated range as produced by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreRange {
    pub start: Option<PreRangeEnd>,
    pub end: Option<PreRangeEnd>,
    pub flags: RangeFlags,
    /// Both ends are literal scalars (or absent), so evaluation can read them
    /// without running the evaluator.
    pub scalar: bool,
}

/// A member of a list, pre-list or structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub key: Option<String>,
    pub value: SymbolId,
}

/// Byte layout of one structure member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    pub key: Option<String>,
    pub offset: usize,
    pub ty: NumType,
    pub count: usize,
}

/// A structure: list members plus a parallel layout array.
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    pub entries: Vec<ListEntry>,
    pub layout: Vec<FieldLayout>,
}

impl Structure {
    /// Total size in bytes.
    pub fn size(&self) -> usize {
        self.layout
            .last()
            .map(|f| f.offset + f.ty.size() * f.count)
            .unwrap_or(0)
    }
}

/// The three routine kinds; each has its own name table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoutineKind {
    Subroutine,
    Function,
    Block,
}

impl RoutineKind {
    pub fn name(self) -> &'static str {
        match self {
            RoutineKind::Subroutine => "subroutine",
            RoutineKind::Function => "function",
            RoutineKind::Block => "block routine",
        }
    }
}

/// Reference to something callable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineRef {
    /// A user routine symbol.
    User(SymbolId),
    /// An entry of the built-in registry.
    Builtin(RoutineKind, usize),
}

/// Body of a user routine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutineDef {
    /// Parameter symbols (named variables in the routine's context).
    pub params: Vec<SymbolId>,
    /// Parameter names, parallel to `params`.
    pub param_names: Vec<String>,
    /// Top-level statements.
    pub statements: Vec<SymbolId>,
    /// Every named variable installed in the routine's context, parameters included.
    pub locals: Vec<SymbolId>,
    /// Recursion guard: number of active invocations.
    pub active: u32,
    /// Set by the second compilation pass.
    pub complete: bool,
}

/// One extraction section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Section {
    /// `(i, j, ...)`
    Subscripts(Vec<SymbolId>),
    /// `.TAG`
    Tag(String),
}

impl Section {
    pub fn children(&self) -> &[SymbolId] {
        match self {
            Section::Subscripts(ids) => ids,
            Section::Tag(_) => &[],
        }
    }
}

/// Extraction from a resolved target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extract {
    pub target: SymbolId,
    pub sections: Vec<Section>,
}

/// Extraction from a name that was not yet known at parse time. It is
/// resolved at run time as a variable, a user function or a built-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreExtract {
    pub name: String,
    pub context: super::Context,
    pub sections: Vec<Section>,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Xor,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "MOD",
            BinaryOp::Pow => "^",
            BinaryOp::Eq => "EQ",
            BinaryOp::Ne => "NE",
            BinaryOp::Lt => "LT",
            BinaryOp::Le => "LE",
            BinaryOp::Gt => "GT",
            BinaryOp::Ge => "GE",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Xor => "XOR",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

/// Short-circuit operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    AndIf,
    OrIf,
}

/// `@file` executes, `@@file` only records routine names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeMode {
    Execute,
    Report,
}

/// Executable statement nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Evb {
    Block(Vec<SymbolId>),
    Replace {
        target: SymbolId,
        value: SymbolId,
    },
    InternalSub {
        builtin: usize,
        args: Vec<SymbolId>,
    },
    UserSub {
        routine: SymbolId,
        args: Vec<SymbolId>,
    },
    For {
        counter: SymbolId,
        start: SymbolId,
        end: SymbolId,
        step: Option<SymbolId>,
        body: SymbolId,
    },
    If {
        condition: SymbolId,
        then: SymbolId,
        otherwise: Option<SymbolId>,
    },
    WhileDo {
        condition: SymbolId,
        body: SymbolId,
    },
    DoWhile {
        body: SymbolId,
        condition: SymbolId,
    },
    Repeat {
        body: SymbolId,
        condition: SymbolId,
    },
    Return(Option<SymbolId>),
    /// `(condition, statement)` arms tried in order.
    Case {
        arms: Vec<(SymbolId, SymbolId)>,
        otherwise: Option<SymbolId>,
    },
    /// Statement selected by the integer value of `selector`.
    NCase {
        selector: SymbolId,
        arms: Vec<SymbolId>,
        otherwise: Option<SymbolId>,
    },
    BlockCall(SymbolId),
    Include {
        path: String,
        mode: IncludeMode,
    },
    Break,
    Continue,
}

impl Evb {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Evb::Block(_) => "BLOCK",
            Evb::Replace { .. } => "REPLACE",
            Evb::InternalSub { .. } => "INT_SUB",
            Evb::UserSub { .. } => "USR_SUB",
            Evb::For { .. } => "FOR",
            Evb::If { .. } => "IF",
            Evb::WhileDo { .. } => "WHILE_DO",
            Evb::DoWhile { .. } => "DO_WHILE",
            Evb::Repeat { .. } => "REPEAT",
            Evb::Return(_) => "RETURN",
            Evb::Case { .. } => "CASE",
            Evb::NCase { .. } => "NCASE",
            Evb::BlockCall(_) => "RUN",
            Evb::Include { .. } => "INCLUDE",
            Evb::Break => "BREAK",
            Evb::Continue => "CONTINUE",
        }
    }

    fn children(&self, out: &mut Vec<SymbolId>) {
        match self {
            Evb::Block(stmts) => out.extend(stmts),
            Evb::Replace { target, value } => out.extend([*target, *value]),
            Evb::InternalSub { args, .. } => out.extend(args),
            Evb::UserSub { routine, args } => {
                out.push(*routine);
                out.extend(args);
            }
            Evb::For {
                counter,
                start,
                end,
                step,
                body,
            } => {
                out.extend([*counter, *start, *end]);
                out.extend(step);
                out.push(*body);
            }
            Evb::If {
                condition,
                then,
                otherwise,
            } => {
                out.extend([*condition, *then]);
                out.extend(otherwise);
            }
            Evb::WhileDo { condition, body }
            | Evb::DoWhile { body, condition }
            | Evb::Repeat { body, condition } => out.extend([*condition, *body]),
            Evb::Return(value) => out.extend(value),
            Evb::Case { arms, otherwise } => {
                for (condition, statement) in arms {
                    out.extend([*condition, *statement]);
                }
                out.extend(otherwise);
            }
            Evb::NCase {
                selector,
                arms,
                otherwise,
            } => {
                out.push(*selector);
                out.extend(arms);
                out.extend(otherwise);
            }
            Evb::BlockCall(routine) => out.push(*routine),
            Evb::Include { .. } | Evb::Break | Evb::Continue => {}
        }
    }
}

/// Class tag of a symbol.
///
/// Executable classes are declared last; see [`SymbolClass::is_executable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SymbolClass {
    Unused,
    Undefined,
    Scalar,
    CScalar,
    String,
    Array,
    Range,
    List,
    CList,
    Structure,
    Transfer,
    FuncPtr,
    FixedNumber,
    FixedString,
    Subroutine,
    Function,
    BlockRoutine,
    DeferredSubroutine,
    DeferredFunction,
    DeferredBlockRoutine,
    Keyword,
    PreRange,
    PreList,
    PreCList,
    Extract,
    PreExtract,
    Evb,
    IntFunc,
    UsrFunc,
    BinOp,
    IfOp,
}

impl SymbolClass {
    /// Classes at or above this threshold are syntax-tree nodes and live in
    /// the executable ranges.
    pub const EXECUTABLE_THRESHOLD: SymbolClass = SymbolClass::Keyword;

    pub fn is_executable(self) -> bool {
        self >= Self::EXECUTABLE_THRESHOLD
    }

    pub fn name(self) -> &'static str {
        match self {
            SymbolClass::Unused => "UNUSED",
            SymbolClass::Undefined => "UNDEFINED",
            SymbolClass::Scalar => "SCALAR",
            SymbolClass::CScalar => "CSCALAR",
            SymbolClass::String => "STRING",
            SymbolClass::Array => "ARRAY",
            SymbolClass::Range => "RANGE",
            SymbolClass::List => "LIST",
            SymbolClass::CList => "CLIST",
            SymbolClass::Structure => "STRUCT",
            SymbolClass::Transfer => "TRANSFER",
            SymbolClass::FuncPtr => "FUNC_PTR",
            SymbolClass::FixedNumber => "FIXED_NUMBER",
            SymbolClass::FixedString => "FIXED_STRING",
            SymbolClass::Subroutine => "SUBROUTINE",
            SymbolClass::Function => "FUNCTION",
            SymbolClass::BlockRoutine => "BLOCKROUTINE",
            SymbolClass::DeferredSubroutine => "DEFERRED_SUBR",
            SymbolClass::DeferredFunction => "DEFERRED_FUNC",
            SymbolClass::DeferredBlockRoutine => "DEFERRED_BLOCK",
            SymbolClass::Keyword => "KEYWORD",
            SymbolClass::PreRange => "PRE_RANGE",
            SymbolClass::PreList => "PRE_LIST",
            SymbolClass::PreCList => "PRE_CLIST",
            SymbolClass::Extract => "EXTRACT",
            SymbolClass::PreExtract => "PRE_EXTRACT",
            SymbolClass::Evb => "EVB",
            SymbolClass::IntFunc => "INT_FUNC",
            SymbolClass::UsrFunc => "USR_FUNC",
            SymbolClass::BinOp => "BIN_OP",
            SymbolClass::IfOp => "IF_OP",
        }
    }
}

impl fmt::Display for SymbolClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The data of a symbol. The variant is the symbol's class.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    /// Free slot.
    #[default]
    Unused,
    /// Allocated, no value.
    Undefined,
    Scalar(Scalar),
    CScalar {
        value: Box<Complex>,
        ty: NumType,
    },
    String(String, StringKind),
    Array(Box<Array>),
    Range(RangeValue),
    PreRange(PreRange),
    List(Vec<ListEntry>),
    CList(Vec<SymbolId>),
    Structure(Box<Structure>),
    PreList(Vec<ListEntry>),
    PreCList(Vec<SymbolId>),
    /// `NAME=value` inside an argument list; `name` is a string literal symbol.
    Keyword {
        name: SymbolId,
        value: SymbolId,
    },
    /// Parameter bound to an argument symbol.
    Transfer(SymbolId),
    FuncPtr(RoutineRef),
    Extract(Extract),
    PreExtract(PreExtract),
    Evb(Evb),
    IntFunc {
        builtin: usize,
        args: Vec<SymbolId>,
    },
    UsrFunc {
        routine: SymbolId,
        args: Vec<SymbolId>,
    },
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
    FixedNumber(Scalar),
    FixedString(String),
    Routine(RoutineKind, Box<RoutineDef>),
    /// Routine known by name only; compiled from `file` on first use.
    Deferred(RoutineKind, PathBuf),
}

impl Payload {
    pub fn class(&self) -> SymbolClass {
        match self {
            Payload::Unused => SymbolClass::Unused,
            Payload::Undefined => SymbolClass::Undefined,
            Payload::Scalar(_) => SymbolClass::Scalar,
            Payload::CScalar { .. } => SymbolClass::CScalar,
            Payload::String(..) => SymbolClass::String,
            Payload::Array(_) => SymbolClass::Array,
            Payload::Range(_) => SymbolClass::Range,
            Payload::PreRange(_) => SymbolClass::PreRange,
            Payload::List(_) => SymbolClass::List,
            Payload::CList(_) => SymbolClass::CList,
            Payload::Structure(_) => SymbolClass::Structure,
            Payload::PreList(_) => SymbolClass::PreList,
            Payload::PreCList(_) => SymbolClass::PreCList,
            Payload::Keyword { .. } => SymbolClass::Keyword,
            Payload::Transfer(_) => SymbolClass::Transfer,
            Payload::FuncPtr(_) => SymbolClass::FuncPtr,
            Payload::Extract(_) => SymbolClass::Extract,
            Payload::PreExtract(_) => SymbolClass::PreExtract,
            Payload::Evb(_) => SymbolClass::Evb,
            Payload::IntFunc { .. } => SymbolClass::IntFunc,
            Payload::UsrFunc { .. } => SymbolClass::UsrFunc,
            Payload::BinOp { .. } => SymbolClass::BinOp,
            Payload::IfOp { .. } => SymbolClass::IfOp,
            Payload::FixedNumber(_) => SymbolClass::FixedNumber,
            Payload::FixedString(_) => SymbolClass::FixedString,
            Payload::Routine(RoutineKind::Subroutine, _) => SymbolClass::Subroutine,
            Payload::Routine(RoutineKind::Function, _) => SymbolClass::Function,
            Payload::Routine(RoutineKind::Block, _) => SymbolClass::BlockRoutine,
            Payload::Deferred(RoutineKind::Subroutine, _) => SymbolClass::DeferredSubroutine,
            Payload::Deferred(RoutineKind::Function, _) => SymbolClass::DeferredFunction,
            Payload::Deferred(RoutineKind::Block, _) => SymbolClass::DeferredBlockRoutine,
        }
    }

    /// Element type of numeric and string classes.
    pub fn num_type(&self) -> Option<NumType> {
        match self {
            Payload::Scalar(s) | Payload::FixedNumber(s) => Some(s.num_type()),
            Payload::CScalar { ty, .. } => Some(*ty),
            Payload::String(..) | Payload::FixedString(_) => Some(NumType::String),
            Payload::Array(array) => Some(array.num_type()),
            _ => None,
        }
    }

    /// Real scalar value of scalar classes.
    pub fn as_scalar(&self) -> Option<Scalar> {
        match self {
            Payload::Scalar(s) | Payload::FixedNumber(s) => Some(*s),
            _ => None,
        }
    }

    /// Text of string classes.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Payload::String(s, _) | Payload::FixedString(s) => Some(s),
            _ => None,
        }
    }

    /// Symbols referenced by this payload that it may own.
    ///
    /// Transfer targets and function-pointer targets are references only and
    /// are never listed. Routine locals are tracked separately in
    /// [`RoutineDef::locals`].
    pub fn children(&self) -> Vec<SymbolId> {
        let mut out = Vec::new();
        match self {
            Payload::PreRange(range) => {
                out.extend(range.start.and_then(PreRangeEnd::child));
                out.extend(range.end.and_then(PreRangeEnd::child));
            }
            Payload::List(entries) | Payload::PreList(entries) => {
                out.extend(entries.iter().map(|e| e.value))
            }
            Payload::Structure(structure) => {
                out.extend(structure.entries.iter().map(|e| e.value))
            }
            Payload::CList(items) | Payload::PreCList(items) => out.extend(items),
            Payload::Keyword { name, value } => out.extend([*name, *value]),
            Payload::Extract(extract) => {
                out.push(extract.target);
                for section in &extract.sections {
                    out.extend(section.children());
                }
            }
            Payload::PreExtract(extract) => {
                for section in &extract.sections {
                    out.extend(section.children());
                }
            }
            Payload::Evb(evb) => evb.children(&mut out),
            Payload::IntFunc { args, .. } => out.extend(args),
            Payload::UsrFunc { routine, args } => {
                out.push(*routine);
                out.extend(args);
            }
            Payload::BinOp { lhs, rhs, .. } | Payload::IfOp { lhs, rhs, .. } => {
                out.extend([*lhs, *rhs])
            }
            Payload::Routine(_, def) => {
                out.extend(&def.params);
                out.extend(&def.statements);
            }
            _ => {}
        }
        out
    }

    /// Whether this payload holds a value usable in expressions.
    pub fn is_value(&self) -> bool {
        matches!(
            self,
            Payload::Scalar(_)
                | Payload::CScalar { .. }
                | Payload::String(..)
                | Payload::Array(_)
                | Payload::Range(_)
                | Payload::List(_)
                | Payload::CList(_)
                | Payload::Structure(_)
                | Payload::FuncPtr(_)
                | Payload::FixedNumber(_)
                | Payload::FixedString(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_executable_threshold() {
        assert!(!SymbolClass::Scalar.is_executable());
        assert!(!SymbolClass::FixedNumber.is_executable());
        assert!(!SymbolClass::Function.is_executable());
        assert!(SymbolClass::Keyword.is_executable());
        assert!(SymbolClass::Evb.is_executable());
        assert!(SymbolClass::IfOp.is_executable());
    }

    #[test]
    fn test_class_follows_payload() {
        assert_eq!(Payload::Scalar(Scalar::Long(1)).class(), SymbolClass::Scalar);
        assert_eq!(
            Payload::Routine(RoutineKind::Function, Box::default()).class(),
            SymbolClass::Function
        );
        assert_eq!(
            Payload::Deferred(RoutineKind::Block, PathBuf::from("x.lux")).class(),
            SymbolClass::DeferredBlockRoutine
        );
    }

    #[test]
    fn test_type_promotion() {
        assert_eq!(NumType::Byte.promote(NumType::Long), NumType::Long);
        assert_eq!(NumType::Float.promote(NumType::Int64), NumType::Float);
        assert_eq!(NumType::CFloat.promote(NumType::Double), NumType::CDouble);
        assert_eq!(NumType::Long.promote(NumType::CFloat), NumType::CFloat);
    }

    #[test]
    fn test_children_skip_references() {
        assert!(Payload::Transfer(7).children().is_empty());
        assert!(Payload::FuncPtr(RoutineRef::User(7)).children().is_empty());
        assert_eq!(
            Payload::BinOp {
                op: BinaryOp::Add,
                lhs: 3,
                rhs: 4
            }
            .children(),
            vec![3, 4]
        );
    }

    #[test]
    fn test_from_end_bound() {
        assert_eq!(RangeBound::FromEnd(0).resolve(10), 9);
        assert_eq!(RangeBound::FromEnd(2).resolve(10), 7);
        assert_eq!(RangeBound::Index(3).resolve(10), 3);
    }

    #[test]
    fn test_structure_size() {
        let structure = Structure {
            entries: vec![],
            layout: vec![
                FieldLayout {
                    key: Some("A".into()),
                    offset: 0,
                    ty: NumType::Long,
                    count: 1,
                },
                FieldLayout {
                    key: Some("B".into()),
                    offset: 4,
                    ty: NumType::Double,
                    count: 3,
                },
            ],
        };
        assert_eq!(structure.size(), 28);
    }
}
