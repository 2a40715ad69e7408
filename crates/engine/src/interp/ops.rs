// ETP - Execution Trace Prediction
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Operator semantics, independent of the interpreter state.
//!
//! Integers are 64-bit and overflow raises `OverflowError`. Division and
//! modulo follow floor semantics (`-7 // 2 == -4`, `-7 % 2 == 1`).

use std::{cmp::Ordering, rc::Rc};

use super::value::{dict_lookup, Numeric, RangeValue, Value};
use crate::{
    lang::{BinOp, CmpOp, UnaryOp},
    ErrorKind,
};

/// Sequences longer than this are refused by `*` repetition
const MAX_REPEAT_LEN: usize = 10_000_000;

/// A failed operation, before the interpreter attaches the line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpError {
    /// Exception category
    pub kind: ErrorKind,
    /// Exception message
    pub message: String,
}

impl OpError {
    /// Create a new operation error
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message)
    }

    fn overflow() -> Self {
        Self::new(ErrorKind::OverflowError, "integer overflow")
    }
}

/// Result of applying an operator
pub type OpResult<T = Value> = Result<T, OpError>;

/// Apply a binary arithmetic or bitwise operator
pub fn apply_binary_op(op: BinOp, left: &Value, right: &Value) -> OpResult {
    if let (Some(l), Some(r)) = (left.as_numeric(), right.as_numeric()) {
        return apply_numeric_op(op, l, r);
    }

    match (op, left, right) {
        (BinOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::str(format!("{a}{b}"))),
        (BinOp::Add, Value::List(a), Value::List(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            Ok(Value::list(items))
        }
        (BinOp::Add, Value::Tuple(a), Value::Tuple(b)) => {
            Ok(Value::tuple(a.iter().chain(b.iter()).cloned().collect()))
        }
        (BinOp::Mul, seq, count) | (BinOp::Mul, count, seq)
            if count.as_int().is_some() && matches!(seq, Value::Str(_) | Value::List(_) | Value::Tuple(_)) =>
        {
            repeat(seq, count.as_int().unwrap_or(0))
        }
        _ => Err(OpError::type_error(format!(
            "unsupported operand type(s) for {}: '{}' and '{}'",
            op.symbol(),
            left.type_name(),
            right.type_name()
        ))),
    }
}

fn repeat(seq: &Value, count: i64) -> OpResult {
    let count = usize::try_from(count).unwrap_or(0);
    let too_long = |len: usize| len.checked_mul(count).is_none_or(|total| total > MAX_REPEAT_LEN);
    match seq {
        Value::Str(s) => {
            if too_long(s.len()) {
                return Err(OpError::overflow());
            }
            Ok(Value::str(s.repeat(count)))
        }
        Value::List(items) => {
            let items = items.borrow();
            if too_long(items.len()) {
                return Err(OpError::overflow());
            }
            Ok(Value::list(items.iter().cloned().cycle().take(items.len() * count).collect()))
        }
        Value::Tuple(items) => {
            if too_long(items.len()) {
                return Err(OpError::overflow());
            }
            Ok(Value::tuple(items.iter().cloned().cycle().take(items.len() * count).collect()))
        }
        _ => Err(OpError::type_error(format!("can't multiply sequence of type '{}'", seq.type_name()))),
    }
}

/// Apply `op` to two numbers
pub fn apply_numeric_op(op: BinOp, left: Numeric, right: Numeric) -> OpResult {
    match (left, right) {
        (Numeric::Int(l), Numeric::Int(r)) => apply_int_op(op, l, r),
        _ => apply_float_op(op, left, right),
    }
}

fn apply_int_op(op: BinOp, l: i64, r: i64) -> OpResult {
    let result = match op {
        BinOp::Add => l.checked_add(r).ok_or_else(OpError::overflow)?,
        BinOp::Sub => l.checked_sub(r).ok_or_else(OpError::overflow)?,
        BinOp::Mul => l.checked_mul(r).ok_or_else(OpError::overflow)?,
        BinOp::Div => {
            if r == 0 {
                return Err(OpError::new(ErrorKind::ZeroDivisionError, "division by zero"));
            }
            return Ok(Value::Float(l as f64 / r as f64));
        }
        BinOp::FloorDiv => {
            if r == 0 {
                return Err(OpError::new(
                    ErrorKind::ZeroDivisionError,
                    "integer division or modulo by zero",
                ));
            }
            let q = l.checked_div(r).ok_or_else(OpError::overflow)?;
            if l % r != 0 && ((l < 0) != (r < 0)) {
                q - 1
            } else {
                q
            }
        }
        BinOp::Mod => {
            if r == 0 {
                return Err(OpError::new(
                    ErrorKind::ZeroDivisionError,
                    "integer division or modulo by zero",
                ));
            }
            let m = l.checked_rem(r).unwrap_or(0);
            if m != 0 && ((m < 0) != (r < 0)) {
                m + r
            } else {
                m
            }
        }
        BinOp::Pow => {
            if r < 0 {
                if l == 0 {
                    return Err(OpError::new(
                        ErrorKind::ZeroDivisionError,
                        "0.0 cannot be raised to a negative power",
                    ));
                }
                return Ok(Value::Float((l as f64).powf(r as f64)));
            }
            let exp = u32::try_from(r).map_err(|_| OpError::overflow())?;
            l.checked_pow(exp).ok_or_else(OpError::overflow)?
        }
        BinOp::BitAnd => l & r,
        BinOp::BitOr => l | r,
        BinOp::BitXor => l ^ r,
        BinOp::LShift => {
            if r < 0 {
                return Err(OpError::new(ErrorKind::ValueError, "negative shift count"));
            }
            if l == 0 {
                0
            } else if r >= 64 {
                return Err(OpError::overflow());
            } else {
                i64::try_from((l as i128) << r).map_err(|_| OpError::overflow())?
            }
        }
        BinOp::RShift => {
            if r < 0 {
                return Err(OpError::new(ErrorKind::ValueError, "negative shift count"));
            }
            if r >= 64 {
                if l < 0 {
                    -1
                } else {
                    0
                }
            } else {
                l >> r
            }
        }
    };
    Ok(Value::Int(result))
}

fn apply_float_op(op: BinOp, left: Numeric, right: Numeric) -> OpResult {
    let (l, r) = (left.as_f64(), right.as_f64());
    let result = match op {
        BinOp::Add => l + r,
        BinOp::Sub => l - r,
        BinOp::Mul => l * r,
        BinOp::Div => {
            if r == 0.0 {
                return Err(OpError::new(ErrorKind::ZeroDivisionError, "float division by zero"));
            }
            l / r
        }
        BinOp::FloorDiv => {
            if r == 0.0 {
                return Err(OpError::new(ErrorKind::ZeroDivisionError, "float floor division by zero"));
            }
            (l / r).floor()
        }
        BinOp::Mod => {
            if r == 0.0 {
                return Err(OpError::new(ErrorKind::ZeroDivisionError, "float modulo"));
            }
            let m = l % r;
            if m != 0.0 && ((m < 0.0) != (r < 0.0)) {
                m + r
            } else {
                m
            }
        }
        BinOp::Pow => {
            if l == 0.0 && r < 0.0 {
                return Err(OpError::new(
                    ErrorKind::ZeroDivisionError,
                    "0.0 cannot be raised to a negative power",
                ));
            }
            if l < 0.0 && r.fract() != 0.0 {
                return Err(OpError::new(ErrorKind::ValueError, "complex results are not supported"));
            }
            let value = l.powf(r);
            if value.is_infinite() && l.is_finite() && r.is_finite() {
                return Err(OpError::new(ErrorKind::OverflowError, "numerical result out of range"));
            }
            value
        }
        BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor | BinOp::LShift | BinOp::RShift => {
            let name = |n: Numeric| if matches!(n, Numeric::Float(_)) { "float" } else { "int" };
            return Err(OpError::type_error(format!(
                "unsupported operand type(s) for {}: '{}' and '{}'",
                op.symbol(),
                name(left),
                name(right)
            )));
        }
    };
    Ok(Value::Float(result))
}

/// Apply a unary operator
pub fn apply_unary_op(op: UnaryOp, operand: &Value) -> OpResult {
    match (op, operand.as_numeric()) {
        (UnaryOp::Not, _) => Ok(Value::Bool(!operand.truthy())),
        (UnaryOp::Neg, Some(Numeric::Int(v))) => v.checked_neg().map(Value::Int).ok_or_else(OpError::overflow),
        (UnaryOp::Neg, Some(Numeric::Float(v))) => Ok(Value::Float(-v)),
        (UnaryOp::Pos, Some(Numeric::Int(v))) => Ok(Value::Int(v)),
        (UnaryOp::Pos, Some(Numeric::Float(v))) => Ok(Value::Float(v)),
        (UnaryOp::Invert, Some(Numeric::Int(v))) => Ok(Value::Int(!v)),
        _ => {
            let symbol = match op {
                UnaryOp::Neg => "-",
                UnaryOp::Pos => "+",
                _ => "~",
            };
            Err(OpError::type_error(format!(
                "bad operand type for unary {symbol}: '{}'",
                operand.type_name()
            )))
        }
    }
}

/// Apply one link of a comparison chain
pub fn apply_comparison_op(op: CmpOp, left: &Value, right: &Value) -> OpResult<bool> {
    let ordering = |op: CmpOp| -> OpResult<Option<Ordering>> {
        compare_order(left, right).ok_or_else(|| {
            OpError::type_error(format!(
                "'{}' not supported between instances of '{}' and '{}'",
                op.symbol(),
                left.type_name(),
                right.type_name()
            ))
        })
    };

    Ok(match op {
        CmpOp::Eq => left.py_eq(right),
        CmpOp::NotEq => !left.py_eq(right),
        CmpOp::Is => left.is_same(right),
        CmpOp::IsNot => !left.is_same(right),
        CmpOp::In => contains(right, left)?,
        CmpOp::NotIn => !contains(right, left)?,
        CmpOp::Lt => ordering(op)? == Some(Ordering::Less),
        CmpOp::LtE => matches!(ordering(op)?, Some(Ordering::Less | Ordering::Equal)),
        CmpOp::Gt => ordering(op)? == Some(Ordering::Greater),
        CmpOp::GtE => matches!(ordering(op)?, Some(Ordering::Greater | Ordering::Equal)),
    })
}

/// Order two values. The outer `None` means the types are not orderable;
/// the inner `None` means they are but compare unordered (NaN).
pub fn compare_order(left: &Value, right: &Value) -> Option<Option<Ordering>> {
    if let (Some(l), Some(r)) = (left.as_numeric(), right.as_numeric()) {
        return Some(match (l, r) {
            (Numeric::Int(a), Numeric::Int(b)) => Some(a.cmp(&b)),
            _ => l.as_f64().partial_cmp(&r.as_f64()),
        });
    }
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Some(Some(a.cmp(b))),
        (Value::List(a), Value::List(b)) => compare_sequences(&a.borrow(), &b.borrow()),
        (Value::Tuple(a), Value::Tuple(b)) => compare_sequences(a, b),
        _ => None,
    }
}

fn compare_sequences(a: &[Value], b: &[Value]) -> Option<Option<Ordering>> {
    for (x, y) in a.iter().zip(b) {
        if !x.py_eq(y) {
            return compare_order(x, y);
        }
    }
    Some(Some(a.len().cmp(&b.len())))
}

/// `item in container`
pub fn contains(container: &Value, item: &Value) -> OpResult<bool> {
    match container {
        Value::Str(haystack) => match item {
            Value::Str(needle) => Ok(haystack.contains(&**needle)),
            other => Err(OpError::type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
        },
        Value::List(items) => Ok(items.borrow().iter().any(|v| v.py_eq(item))),
        Value::Tuple(items) => Ok(items.iter().any(|v| v.py_eq(item))),
        Value::Dict(entries) => {
            check_hashable(item)?;
            Ok(dict_lookup(&entries.borrow(), item).is_some())
        }
        Value::Range(range) => Ok(match item.as_numeric() {
            Some(Numeric::Int(v)) => range.contains(v),
            Some(Numeric::Float(v)) => v.fract() == 0.0 && range.contains(v as i64),
            None => false,
        }),
        other => Err(OpError::type_error(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

/// Refuse unhashable dict keys
pub fn check_hashable(key: &Value) -> OpResult<()> {
    if key.is_hashable() {
        Ok(())
    } else {
        Err(OpError::type_error(format!("unhashable type: '{}'", key.type_name())))
    }
}

/// Number of items in a container
pub fn length(value: &Value) -> OpResult<usize> {
    match value {
        Value::Str(s) => Ok(s.chars().count()),
        Value::List(items) => Ok(items.borrow().len()),
        Value::Tuple(items) => Ok(items.len()),
        Value::Dict(entries) => Ok(entries.borrow().len()),
        Value::Range(range) => Ok(range.len()),
        other => Err(OpError::type_error(format!("object of type '{}' has no len()", other.type_name()))),
    }
}

fn normalize_index(index: &Value, len: usize, container: &Value) -> OpResult<usize> {
    let Some(raw) = index.as_int() else {
        return Err(OpError::type_error(format!(
            "{} indices must be integers or slices, not {}",
            container.type_name(),
            index.type_name()
        )));
    };
    let adjusted = if raw < 0 { raw + len as i64 } else { raw };
    usize::try_from(adjusted).ok().filter(|i| *i < len).ok_or_else(|| {
        OpError::new(ErrorKind::IndexError, format!("{} index out of range", container.type_name()))
    })
}

/// `container[index]`
pub fn get_item(container: &Value, index: &Value) -> OpResult {
    match container {
        Value::List(items) => {
            let items = items.borrow();
            let i = normalize_index(index, items.len(), container)?;
            Ok(items[i].clone())
        }
        Value::Tuple(items) => {
            let i = normalize_index(index, items.len(), container)?;
            Ok(items[i].clone())
        }
        Value::Str(s) => {
            let i = normalize_index(index, s.chars().count(), container)?;
            Ok(s.chars().nth(i).map(|c| Value::str(c.to_string())).unwrap_or(Value::None))
        }
        Value::Range(range) => {
            let i = normalize_index(index, range.len(), container)?;
            range.get(i).map(Value::Int).ok_or_else(OpError::overflow)
        }
        Value::Dict(entries) => {
            check_hashable(index)?;
            dict_lookup(&entries.borrow(), index)
                .cloned()
                .ok_or_else(|| OpError::new(ErrorKind::KeyError, index.repr()))
        }
        other => Err(OpError::type_error(format!("'{}' object is not subscriptable", other.type_name()))),
    }
}

/// `container[index] = value`
pub fn set_item(container: &Value, index: &Value, value: Value) -> OpResult<()> {
    match container {
        Value::List(items) => {
            let len = items.borrow().len();
            let i = normalize_index(index, len, container).map_err(|e| {
                if e.kind == ErrorKind::IndexError {
                    OpError::new(ErrorKind::IndexError, "list assignment index out of range")
                } else {
                    e
                }
            })?;
            items.borrow_mut()[i] = value;
            Ok(())
        }
        Value::Dict(entries) => {
            check_hashable(index)?;
            super::value::dict_insert(&mut entries.borrow_mut(), index.clone(), value);
            Ok(())
        }
        other => Err(OpError::type_error(format!(
            "'{}' object does not support item assignment",
            other.type_name()
        ))),
    }
}

/// Indices selected by `[lower:upper:step]` on a sequence of length `len`
pub fn slice_indices(
    len: usize,
    lower: Option<i64>,
    upper: Option<i64>,
    step: Option<i64>,
) -> OpResult<Vec<usize>> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(OpError::new(ErrorKind::ValueError, "slice step cannot be zero"));
    }
    let len = len as i64;
    let clamp = |bound: i64, low: i64, high: i64| {
        let bound = if bound < 0 { bound + len } else { bound };
        bound.clamp(low, high)
    };

    let mut indices = Vec::new();
    if step > 0 {
        let start = lower.map_or(0, |b| clamp(b, 0, len));
        let stop = upper.map_or(len, |b| clamp(b, 0, len));
        let mut i = start;
        while i < stop {
            indices.push(i as usize);
            match i.checked_add(step) {
                Some(next) => i = next,
                None => break,
            }
        }
    } else {
        let start = lower.map_or(len - 1, |b| clamp(b, -1, len - 1));
        let stop = upper.map_or(-1, |b| clamp(b, -1, len - 1));
        let mut i = start;
        while i > stop {
            indices.push(i as usize);
            match i.checked_add(step) {
                Some(next) => i = next,
                None => break,
            }
        }
    }
    Ok(indices)
}

/// `container[lower:upper:step]`
pub fn get_slice(
    container: &Value,
    lower: Option<i64>,
    upper: Option<i64>,
    step: Option<i64>,
) -> OpResult {
    match container {
        Value::List(items) => {
            let items = items.borrow();
            let indices = slice_indices(items.len(), lower, upper, step)?;
            Ok(Value::list(indices.into_iter().map(|i| items[i].clone()).collect()))
        }
        Value::Tuple(items) => {
            let indices = slice_indices(items.len(), lower, upper, step)?;
            Ok(Value::tuple(indices.into_iter().map(|i| items[i].clone()).collect()))
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let indices = slice_indices(chars.len(), lower, upper, step)?;
            Ok(Value::str(indices.into_iter().map(|i| chars[i]).collect::<String>()))
        }
        Value::Range(range) => {
            let indices = slice_indices(range.len(), lower, upper, step)?;
            let stride = range.step.checked_mul(step.unwrap_or(1)).ok_or_else(OpError::overflow)?;
            let start = indices.first().and_then(|i| range.get(*i)).unwrap_or(range.start);
            let stop = start as i128 + indices.len() as i128 * stride as i128;
            let stop = i64::try_from(stop).map_err(|_| OpError::overflow())?;
            Ok(Value::Range(RangeValue { start, stop, step: stride }))
        }
        other => Err(OpError::type_error(format!("'{}' object is not subscriptable", other.type_name()))),
    }
}

/// Iteration over a value.
///
/// Lists are iterated by index so items appended during a loop are visited.
#[derive(Debug)]
pub enum ValueIter {
    /// Live list
    List {
        /// The list
        items: super::value::ListRef,
        /// Next index
        next: usize,
    },
    /// Lazy range
    Range {
        /// Remaining range
        range: RangeValue,
        /// Next index
        next: usize,
    },
    /// Materialized items
    Items(std::vec::IntoIter<Value>),
}

impl ValueIter {
    /// Start iterating `value`
    pub fn new(value: &Value) -> OpResult<Self> {
        Ok(match value {
            Value::List(items) => Self::List { items: Rc::clone(items), next: 0 },
            Value::Range(range) => Self::Range { range: *range, next: 0 },
            Value::Tuple(items) => Self::Items(items.to_vec().into_iter()),
            Value::Str(s) => {
                Self::Items(s.chars().map(|c| Value::str(c.to_string())).collect::<Vec<_>>().into_iter())
            }
            Value::Dict(entries) => {
                Self::Items(entries.borrow().iter().map(|(k, _)| k.clone()).collect::<Vec<_>>().into_iter())
            }
            other => {
                return Err(OpError::type_error(format!(
                    "'{}' object is not iterable",
                    other.type_name()
                )))
            }
        })
    }
}

impl Iterator for ValueIter {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        match self {
            Self::List { items, next } => {
                let item = items.borrow().get(*next).cloned()?;
                *next += 1;
                Some(item)
            }
            Self::Range { range, next } => {
                let item = range.get(*next)?;
                *next += 1;
                Some(Value::Int(item))
            }
            Self::Items(items) => items.next(),
        }
    }
}

/// Collect every item of an iterable
pub fn collect_items(value: &Value) -> OpResult<Vec<Value>> {
    Ok(ValueIter::new(value)?.collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(v: i64) -> Value {
        Value::Int(v)
    }

    #[test]
    fn test_apply_arithmetic_op() {
        assert!(apply_binary_op(BinOp::Add, &int(5), &int(3)).unwrap().py_eq(&int(8)));
        assert!(apply_binary_op(BinOp::Div, &int(7), &int(2)).unwrap().py_eq(&Value::Float(3.5)));
        assert!(apply_binary_op(BinOp::FloorDiv, &int(-7), &int(2)).unwrap().py_eq(&int(-4)));
        assert!(apply_binary_op(BinOp::Mod, &int(-7), &int(2)).unwrap().py_eq(&int(1)));
        assert!(apply_binary_op(BinOp::Mod, &int(7), &int(-2)).unwrap().py_eq(&int(-1)));
        assert!(apply_binary_op(BinOp::Pow, &int(2), &int(10)).unwrap().py_eq(&int(1024)));
        assert!(apply_binary_op(BinOp::Pow, &int(2), &int(-1)).unwrap().py_eq(&Value::Float(0.5)));
        assert!(apply_binary_op(BinOp::Add, &Value::Bool(true), &int(1)).unwrap().py_eq(&int(2)));
        assert!(apply_binary_op(BinOp::Mod, &Value::Float(-1.5), &int(1)).unwrap().py_eq(&Value::Float(0.5)));
    }

    #[test]
    fn test_division_by_zero() {
        let err = apply_binary_op(BinOp::Div, &int(1), &int(0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ZeroDivisionError);
        let err = apply_binary_op(BinOp::Mod, &Value::Float(1.0), &int(0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ZeroDivisionError);
    }

    #[test]
    fn test_overflow() {
        let err = apply_binary_op(BinOp::Mul, &int(i64::MAX), &int(2)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::OverflowError);
        let err = apply_binary_op(BinOp::Pow, &int(10), &int(30)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::OverflowError);
        let err = apply_unary_op(UnaryOp::Neg, &int(i64::MIN)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::OverflowError);
    }

    #[test]
    fn test_sequence_ops() {
        let joined = apply_binary_op(BinOp::Add, &Value::str("ab"), &Value::str("c")).unwrap();
        assert_eq!(joined.to_string(), "abc");
        let repeated = apply_binary_op(BinOp::Mul, &int(2), &Value::list(vec![int(1)])).unwrap();
        assert_eq!(repeated.to_string(), "[1, 1]");
        let err = apply_binary_op(BinOp::Sub, &Value::str("a"), &int(1)).unwrap_err();
        assert_eq!(err.message, "unsupported operand type(s) for -: 'str' and 'int'");
    }

    #[test]
    fn test_apply_comparison_op() {
        assert!(apply_comparison_op(CmpOp::Lt, &int(1), &Value::Float(1.5)).unwrap());
        assert!(apply_comparison_op(CmpOp::GtE, &Value::str("b"), &Value::str("a")).unwrap());
        let a = Value::list(vec![int(1), int(2)]);
        let b = Value::list(vec![int(1), int(3)]);
        assert!(apply_comparison_op(CmpOp::Lt, &a, &b).unwrap());
        assert!(apply_comparison_op(CmpOp::In, &int(2), &a).unwrap());
        assert!(apply_comparison_op(CmpOp::NotIn, &Value::str("z"), &Value::str("abc")).unwrap());
        assert!(!apply_comparison_op(CmpOp::Lt, &Value::Float(f64::NAN), &int(1)).unwrap());
        let err = apply_comparison_op(CmpOp::Lt, &int(1), &Value::str("a")).unwrap_err();
        assert_eq!(err.message, "'<' not supported between instances of 'int' and 'str'");
    }

    #[test]
    fn test_indexing_and_slicing() {
        let xs = Value::list(vec![int(10), int(20), int(30), int(40)]);
        assert!(get_item(&xs, &int(-1)).unwrap().py_eq(&int(40)));
        assert_eq!(get_item(&xs, &int(4)).unwrap_err().kind, ErrorKind::IndexError);
        assert_eq!(get_slice(&xs, Some(1), None, None).unwrap().to_string(), "[20, 30, 40]");
        assert_eq!(get_slice(&xs, None, None, Some(-1)).unwrap().to_string(), "[40, 30, 20, 10]");
        assert_eq!(get_slice(&xs, Some(-2), Some(100), None).unwrap().to_string(), "[30, 40]");
        assert_eq!(get_slice(&Value::str("hello"), Some(1), Some(3), None).unwrap().to_string(), "el");
        assert_eq!(get_slice(&xs, None, None, Some(0)).unwrap_err().kind, ErrorKind::ValueError);

        let d = Value::dict(vec![]);
        set_item(&d, &Value::str("k"), int(1)).unwrap();
        assert!(get_item(&d, &Value::str("k")).unwrap().py_eq(&int(1)));
        assert_eq!(get_item(&d, &Value::str("missing")).unwrap_err().kind, ErrorKind::KeyError);
        assert_eq!(set_item(&d, &Value::list(vec![]), int(1)).unwrap_err().kind, ErrorKind::TypeError);
    }

    #[test]
    fn test_slice_with_extreme_step() {
        let xs = Value::list(vec![int(1), int(2)]);
        assert_eq!(get_slice(&xs, Some(1), Some(2), Some(i64::MAX)).unwrap().to_string(), "[2]");
        assert_eq!(get_slice(&xs, None, None, Some(i64::MIN)).unwrap().to_string(), "[2]");
        assert_eq!(slice_indices(3, Some(2), None, Some(i64::MAX - 1)).unwrap(), vec![2]);
    }

    #[test]
    fn test_list_iteration_sees_appends() {
        let xs = Value::list(vec![int(1)]);
        let mut iter = ValueIter::new(&xs).unwrap();
        assert!(iter.next().is_some());
        if let Value::List(items) = &xs {
            items.borrow_mut().push(int(2));
        }
        assert!(iter.next().unwrap().py_eq(&int(2)));
        assert!(iter.next().is_none());
    }
}
