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

//! Builtin functions and methods of the builtin types.

use std::{cmp::Ordering, rc::Rc};

use itertools::Itertools;

use super::{
    interpreter::{Exec, Interpreter},
    ops::{self, OpError, OpResult},
    value::{dict_insert, dict_lookup, RangeValue, Value},
};
use crate::{lang::BinOp, ErrorKind};

/// Builtin functions visible from every scope
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Print,
    Range,
    Len,
    Abs,
    Min,
    Max,
    Sum,
    Int,
    Float,
    Str,
    Bool,
    List,
    Tuple,
    Dict,
    Sorted,
    Reversed,
    Enumerate,
    Zip,
    Round,
}

impl Builtin {
    /// Every builtin
    pub const ALL: [Self; 19] = [
        Self::Print,
        Self::Range,
        Self::Len,
        Self::Abs,
        Self::Min,
        Self::Max,
        Self::Sum,
        Self::Int,
        Self::Float,
        Self::Str,
        Self::Bool,
        Self::List,
        Self::Tuple,
        Self::Dict,
        Self::Sorted,
        Self::Reversed,
        Self::Enumerate,
        Self::Zip,
        Self::Round,
    ];

    /// Look up a builtin by name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|builtin| builtin.name() == name)
    }

    /// Name the builtin is bound to
    pub fn name(self) -> &'static str {
        match self {
            Self::Print => "print",
            Self::Range => "range",
            Self::Len => "len",
            Self::Abs => "abs",
            Self::Min => "min",
            Self::Max => "max",
            Self::Sum => "sum",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
            Self::Bool => "bool",
            Self::List => "list",
            Self::Tuple => "tuple",
            Self::Dict => "dict",
            Self::Sorted => "sorted",
            Self::Reversed => "reversed",
            Self::Enumerate => "enumerate",
            Self::Zip => "zip",
            Self::Round => "round",
        }
    }
}

type Kwargs = Vec<(String, Value)>;

fn type_error(message: impl Into<String>) -> OpError {
    OpError::new(ErrorKind::TypeError, message)
}

fn value_error(message: impl Into<String>) -> OpError {
    OpError::new(ErrorKind::ValueError, message)
}

/// Check the positional argument count of `name`
fn arity(name: &str, args: &[Value], min: usize, max: usize) -> OpResult<()> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let expected = if min == max {
        match min {
            0 => "no arguments".to_string(),
            1 => "exactly one argument".to_string(),
            n => format!("exactly {n} arguments"),
        }
    } else if args.len() < min {
        format!("at least {min} argument{}", if min == 1 { "" } else { "s" })
    } else {
        format!("at most {max} argument{}", if max == 1 { "" } else { "s" })
    };
    Err(type_error(format!("{name}() takes {expected} ({} given)", args.len())))
}

/// Split off the accepted keyword arguments, refusing any other
fn take_kwargs<const N: usize>(
    name: &str,
    kwargs: Kwargs,
    accepted: [&str; N],
) -> OpResult<[Option<Value>; N]> {
    let mut taken: [Option<Value>; N] = std::array::from_fn(|_| None);
    for (key, value) in kwargs {
        match accepted.iter().position(|candidate| *candidate == key) {
            Some(i) => taken[i] = Some(value),
            None => {
                return Err(type_error(format!(
                    "'{key}' is an invalid keyword argument for {name}()"
                )))
            }
        }
    }
    Ok(taken)
}

fn expect_int(value: &Value) -> OpResult<i64> {
    value.as_int().ok_or_else(|| {
        type_error(format!("'{}' object cannot be interpreted as an integer", value.type_name()))
    })
}

fn expect_str<'a>(value: &'a Value, what: &str) -> OpResult<&'a str> {
    match value {
        Value::Str(s) => Ok(&**s),
        other => Err(type_error(format!("{what} must be str, not {}", other.type_name()))),
    }
}

fn order(left: &Value, right: &Value) -> OpResult<Ordering> {
    match ops::compare_order(left, right) {
        Some(ordering) => Ok(ordering.unwrap_or(Ordering::Equal)),
        None => Err(type_error(format!(
            "'<' not supported between instances of '{}' and '{}'",
            right.type_name(),
            left.type_name()
        ))),
    }
}

/// Stable sort of `items` by precomputed `keys`
fn sort_by_keys(items: Vec<Value>, keys: Vec<Value>, reverse: bool) -> OpResult<Vec<Value>> {
    let mut error = None;
    let mut pairs: Vec<(Value, Value)> = keys.into_iter().zip(items).collect();
    pairs.sort_by(|(a, _), (b, _)| {
        let result = if reverse { order(b, a) } else { order(a, b) };
        result.unwrap_or_else(|e| {
            error.get_or_insert(e);
            Ordering::Equal
        })
    });
    match error {
        Some(e) => Err(e),
        None => Ok(pairs.into_iter().map(|(_, item)| item).collect()),
    }
}

fn int_from(value: &Value, base: Option<i64>) -> OpResult<i64> {
    if let Some(base) = base {
        let Value::Str(text) = value else {
            return Err(type_error("int() can't convert non-string with explicit base"));
        };
        let radix = u32::try_from(base)
            .ok()
            .filter(|radix| (2..=36).contains(radix))
            .ok_or_else(|| value_error("int() base must be >= 2 and <= 36"))?;
        return i64::from_str_radix(&text.trim().replace('_', ""), radix).map_err(|_| {
            value_error(format!("invalid literal for int() with base {base}: {}", value.repr()))
        });
    }
    match value {
        Value::Bool(_) | Value::Int(_) => Ok(value.as_int().unwrap_or_default()),
        Value::Float(v) => {
            if v.is_nan() {
                Err(value_error("cannot convert float NaN to integer"))
            } else if v.is_infinite() {
                Err(OpError::new(ErrorKind::OverflowError, "cannot convert float infinity to integer"))
            } else if v.trunc() >= i64::MAX as f64 || v.trunc() < i64::MIN as f64 {
                Err(OpError::new(ErrorKind::OverflowError, "integer overflow"))
            } else {
                Ok(v.trunc() as i64)
            }
        }
        Value::Str(text) => text.trim().replace('_', "").parse::<i64>().map_err(|_| {
            value_error(format!("invalid literal for int() with base 10: {}", value.repr()))
        }),
        other => Err(type_error(format!(
            "int() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn float_from(value: &Value) -> OpResult<f64> {
    match value {
        Value::Str(text) => text.trim().parse::<f64>().map_err(|_| {
            value_error(format!("could not convert string to float: {}", value.repr()))
        }),
        other => other.as_numeric().map(|n| n.as_f64()).ok_or_else(|| {
            type_error(format!(
                "float() argument must be a string or a real number, not '{}'",
                other.type_name()
            ))
        }),
    }
}

fn round_value(value: &Value, digits: Option<i64>) -> OpResult {
    match (value, digits) {
        (Value::Float(v), None) => {
            let rounded = v.round_ties_even();
            int_from(&Value::Float(rounded), None).map(Value::Int)
        }
        (Value::Float(v), Some(digits)) => {
            let digits = i32::try_from(digits.clamp(-308, 308)).unwrap_or_default();
            let scale = 10f64.powi(digits);
            let rounded = (v * scale).round_ties_even() / scale;
            Ok(Value::Float(if rounded.is_finite() { rounded } else { *v }))
        }
        (Value::Int(_) | Value::Bool(_), digits) => {
            let v = value.as_int().unwrap_or_default();
            match digits {
                Some(digits) if digits < 0 => {
                    let Some(unit) = u32::try_from(-digits).ok().and_then(|p| 10i64.checked_pow(p)) else {
                        return Ok(Value::Int(0));
                    };
                    let (quotient, remainder) = (v.div_euclid(unit), v.rem_euclid(unit));
                    let round_up = remainder * 2 > unit || (remainder * 2 == unit && quotient % 2 != 0);
                    let quotient = if round_up { quotient + 1 } else { quotient };
                    quotient
                        .checked_mul(unit)
                        .map(Value::Int)
                        .ok_or_else(|| OpError::new(ErrorKind::OverflowError, "integer overflow"))
                }
                _ => Ok(Value::Int(v)),
            }
        }
        (other, _) => Err(type_error(format!(
            "type {} doesn't define __round__ method",
            other.type_name()
        ))),
    }
}

fn pair_items(value: &Value, position: usize) -> OpResult<(Value, Value)> {
    let items = ops::collect_items(value).map_err(|_| {
        type_error(format!(
            "cannot convert dictionary update sequence element #{position} to a sequence"
        ))
    })?;
    match <[Value; 2]>::try_from(items) {
        Ok([key, value]) => {
            ops::check_hashable(&key)?;
            Ok((key, value))
        }
        Err(items) => Err(value_error(format!(
            "dictionary update sequence element #{position} has length {}; 2 is required",
            items.len()
        ))),
    }
}

/// Entries of a dict, or of an iterable of pairs
fn mapping_entries(value: &Value) -> OpResult<Vec<(Value, Value)>> {
    if let Value::Dict(entries) = value {
        return Ok(entries.borrow().clone());
    }
    ops::collect_items(value)?.iter().enumerate().map(|(i, item)| pair_items(item, i)).collect()
}

fn char_index(haystack: &str, byte_index: usize) -> i64 {
    haystack[..byte_index].chars().count() as i64
}

impl Interpreter<'_> {
    /// Call a builtin function
    pub(super) fn call_builtin(&mut self, builtin: Builtin, args: Vec<Value>, kwargs: Kwargs) -> Exec {
        let name = builtin.name();
        match builtin {
            Builtin::Print => {
                let [sep, end] = self.op(take_kwargs(name, kwargs, ["sep", "end"]))?;
                let text_of = |value: Option<Value>, default: &str| -> OpResult<String> {
                    match value {
                        None | Some(Value::None) => Ok(default.to_string()),
                        Some(Value::Str(s)) => Ok(s.to_string()),
                        Some(other) => Err(type_error(format!(
                            "sep/end must be None or a string, not {}",
                            other.type_name()
                        ))),
                    }
                };
                let sep = self.op(text_of(sep, " "))?;
                let end = self.op(text_of(end, "\n"))?;
                let line = args.iter().join(&sep);
                self.write_output(&line);
                self.write_output(&end);
                Ok(Value::None)
            }
            Builtin::Range => {
                self.op(take_kwargs(name, kwargs, []))?;
                self.op(arity(name, &args, 1, 3))?;
                let bounds = self.op(args.iter().map(expect_int).collect::<OpResult<Vec<_>>>())?;
                let range = match bounds.as_slice() {
                    [stop] => RangeValue { start: 0, stop: *stop, step: 1 },
                    [start, stop] => RangeValue { start: *start, stop: *stop, step: 1 },
                    [start, stop, step] => {
                        if *step == 0 {
                            return Err(self.raise(value_error("range() arg 3 must not be zero")));
                        }
                        RangeValue { start: *start, stop: *stop, step: *step }
                    }
                    _ => return Err(self.raise(type_error("range expected at most 3 arguments"))),
                };
                Ok(Value::Range(range))
            }
            Builtin::Len => {
                self.op(take_kwargs(name, kwargs, []))?;
                self.op(arity(name, &args, 1, 1))?;
                let len = self.op(ops::length(&args[0]))?;
                Ok(Value::Int(len as i64))
            }
            Builtin::Abs => {
                self.op(take_kwargs(name, kwargs, []))?;
                self.op(arity(name, &args, 1, 1))?;
                match &args[0] {
                    Value::Float(v) => Ok(Value::Float(v.abs())),
                    value => match value.as_int() {
                        Some(v) => v.checked_abs().map(Value::Int).ok_or_else(|| {
                            self.raise(OpError::new(ErrorKind::OverflowError, "integer overflow"))
                        }),
                        None => Err(self.raise(type_error(format!(
                            "bad operand type for abs(): '{}'",
                            value.type_name()
                        )))),
                    },
                }
            }
            Builtin::Min | Builtin::Max => {
                let [key, default] = self.op(take_kwargs(name, kwargs, ["key", "default"]))?;
                if args.is_empty() {
                    return Err(self.raise(type_error(format!(
                        "{name} expected at least 1 argument, got 0"
                    ))));
                }
                let items = if args.len() == 1 {
                    self.op(ops::collect_items(&args[0]))?
                } else {
                    args
                };
                if items.is_empty() {
                    return match default {
                        Some(value) => Ok(value),
                        None => Err(self.raise(value_error(format!("{name}() arg is an empty sequence")))),
                    };
                }
                let keys = self.keys_of(&items, key.as_ref())?;
                let wanted = if builtin == Builtin::Min { Ordering::Less } else { Ordering::Greater };
                let mut best = 0;
                for i in 1..items.len() {
                    if self.op(order(&keys[i], &keys[best]))? == wanted {
                        best = i;
                    }
                }
                Ok(items[best].clone())
            }
            Builtin::Sum => {
                let [start] = self.op(take_kwargs(name, kwargs, ["start"]))?;
                self.op(arity(name, &args, 1, 2))?;
                let mut args = args.into_iter();
                let iterable = args.next().unwrap_or(Value::None);
                let mut total = args.next().or(start).unwrap_or(Value::Int(0));
                if matches!(total, Value::Str(_)) {
                    return Err(self.raise(type_error(
                        "sum() can't sum strings [use ''.join(seq) instead]",
                    )));
                }
                for item in self.op(ops::collect_items(&iterable))? {
                    total = self.op(ops::apply_binary_op(BinOp::Add, &total, &item))?;
                }
                Ok(total)
            }
            Builtin::Int => {
                let [base] = self.op(take_kwargs(name, kwargs, ["base"]))?;
                self.op(arity(name, &args, 0, 2))?;
                let mut args = args.into_iter();
                let Some(value) = args.next() else {
                    return Ok(Value::Int(0));
                };
                let base = match args.next().or(base) {
                    Some(base) => Some(self.op(expect_int(&base))?),
                    None => None,
                };
                self.op(int_from(&value, base)).map(Value::Int)
            }
            Builtin::Float => {
                self.op(take_kwargs(name, kwargs, []))?;
                self.op(arity(name, &args, 0, 1))?;
                match args.first() {
                    Some(value) => self.op(float_from(value)).map(Value::Float),
                    None => Ok(Value::Float(0.0)),
                }
            }
            Builtin::Str => {
                self.op(take_kwargs(name, kwargs, []))?;
                self.op(arity(name, &args, 0, 1))?;
                Ok(Value::str(args.first().map(Value::to_string).unwrap_or_default()))
            }
            Builtin::Bool => {
                self.op(take_kwargs(name, kwargs, []))?;
                self.op(arity(name, &args, 0, 1))?;
                Ok(Value::Bool(args.first().is_some_and(Value::truthy)))
            }
            Builtin::List | Builtin::Tuple => {
                self.op(take_kwargs(name, kwargs, []))?;
                self.op(arity(name, &args, 0, 1))?;
                let items = match args.first() {
                    Some(value) => self.op(ops::collect_items(value))?,
                    None => Vec::new(),
                };
                Ok(if builtin == Builtin::List { Value::list(items) } else { Value::tuple(items) })
            }
            Builtin::Dict => {
                self.op(arity(name, &args, 0, 1))?;
                let mut entries = match args.first() {
                    Some(value) => self.op(mapping_entries(value))?,
                    None => Vec::new(),
                };
                for (key, value) in kwargs {
                    dict_insert(&mut entries, Value::str(key), value);
                }
                let mut deduped = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    dict_insert(&mut deduped, key, value);
                }
                Ok(Value::dict(deduped))
            }
            Builtin::Sorted => {
                let [key, reverse] = self.op(take_kwargs(name, kwargs, ["key", "reverse"]))?;
                self.op(arity(name, &args, 1, 1))?;
                let items = self.op(ops::collect_items(&args[0]))?;
                let keys = self.keys_of(&items, key.as_ref())?;
                let reverse = reverse.is_some_and(|r| r.truthy());
                self.op(sort_by_keys(items, keys, reverse)).map(Value::list)
            }
            Builtin::Reversed => {
                self.op(take_kwargs(name, kwargs, []))?;
                self.op(arity(name, &args, 1, 1))?;
                let mut items = self.op(ops::collect_items(&args[0]))?;
                items.reverse();
                Ok(Value::list(items))
            }
            Builtin::Enumerate => {
                let [start_kw] = self.op(take_kwargs(name, kwargs, ["start"]))?;
                self.op(arity(name, &args, 1, 2))?;
                let start = match args.get(1).or(start_kw.as_ref()) {
                    Some(value) => self.op(expect_int(value))?,
                    None => 0,
                };
                let items = self.op(ops::collect_items(&args[0]))?;
                let mut pairs = Vec::with_capacity(items.len());
                for (offset, item) in items.into_iter().enumerate() {
                    let index = start.checked_add(offset as i64).ok_or_else(|| {
                        self.raise(OpError::new(ErrorKind::OverflowError, "integer overflow"))
                    })?;
                    pairs.push(Value::tuple(vec![Value::Int(index), item]));
                }
                Ok(Value::list(pairs))
            }
            Builtin::Zip => {
                self.op(take_kwargs(name, kwargs, []))?;
                let columns = self.op(args.iter().map(ops::collect_items).collect::<OpResult<Vec<_>>>())?;
                let len = columns.iter().map(Vec::len).min().unwrap_or(0);
                let rows = (0..len)
                    .map(|i| Value::tuple(columns.iter().map(|column| column[i].clone()).collect()))
                    .collect();
                Ok(Value::list(rows))
            }
            Builtin::Round => {
                let [ndigits] = self.op(take_kwargs(name, kwargs, ["ndigits"]))?;
                self.op(arity(name, &args, 1, 2))?;
                let digits = match args.get(1).or(ndigits.as_ref()) {
                    None | Some(Value::None) => None,
                    Some(value) => Some(self.op(expect_int(value))?),
                };
                self.op(round_value(&args[0], digits))
            }
        }
    }

    /// Sort keys of `items`, computed with `key` when given
    fn keys_of(&mut self, items: &[Value], key: Option<&Value>) -> Exec<Vec<Value>> {
        match key {
            None | Some(Value::None) => Ok(items.to_vec()),
            Some(key) => {
                let mut keys = Vec::with_capacity(items.len());
                for item in items {
                    keys.push(self.call_value(key, vec![item.clone()], Vec::new())?);
                }
                Ok(keys)
            }
        }
    }

    /// Call `receiver.method(args)`
    pub(super) fn call_method(
        &mut self,
        receiver: &Value,
        method: &str,
        args: Vec<Value>,
        kwargs: Kwargs,
    ) -> Exec {
        match receiver {
            Value::List(_) => self.call_list_method(receiver, method, args, kwargs),
            Value::Str(text) => {
                self.op(take_kwargs(method, kwargs, []))?;
                self.op(str_method(text, method, &args))
            }
            Value::Dict(_) => self.call_dict_method(receiver, method, args, kwargs),
            other => Err(self.raise(no_attribute(other, method))),
        }
    }

    fn call_list_method(
        &mut self,
        receiver: &Value,
        method: &str,
        args: Vec<Value>,
        kwargs: Kwargs,
    ) -> Exec {
        let Value::List(items) = receiver else {
            return Err(self.raise(no_attribute(receiver, method)));
        };
        if method == "sort" {
            let [key, reverse] = self.op(take_kwargs(method, kwargs, ["key", "reverse"]))?;
            self.op(arity(method, &args, 0, 0))?;
            let current = items.borrow().clone();
            let keys = self.keys_of(&current, key.as_ref())?;
            let reverse = reverse.is_some_and(|r| r.truthy());
            let sorted = self.op(sort_by_keys(current, keys, reverse))?;
            *items.borrow_mut() = sorted;
            return Ok(Value::None);
        }
        self.op(take_kwargs(method, kwargs, []))?;
        self.op(list_method(items, receiver, method, args))
    }

    fn call_dict_method(
        &mut self,
        receiver: &Value,
        method: &str,
        args: Vec<Value>,
        kwargs: Kwargs,
    ) -> Exec {
        let Value::Dict(entries) = receiver else {
            return Err(self.raise(no_attribute(receiver, method)));
        };
        if method == "update" {
            self.op(arity(method, &args, 0, 1))?;
            let mut updates = match args.first() {
                Some(value) => self.op(mapping_entries(value))?,
                None => Vec::new(),
            };
            updates.extend(kwargs.into_iter().map(|(key, value)| (Value::str(key), value)));
            let mut entries = entries.borrow_mut();
            for (key, value) in updates {
                dict_insert(&mut entries, key, value);
            }
            return Ok(Value::None);
        }
        self.op(take_kwargs(method, kwargs, []))?;
        self.op(dict_method(entries, receiver, method, args))
    }
}

fn no_attribute(receiver: &Value, method: &str) -> OpError {
    OpError::new(
        ErrorKind::AttributeError,
        format!("'{}' object has no attribute '{method}'", receiver.type_name()),
    )
}

fn list_method(
    items: &super::value::ListRef,
    receiver: &Value,
    method: &str,
    args: Vec<Value>,
) -> OpResult {
    let qualified = format!("list.{method}");
    match method {
        "append" => {
            arity(&qualified, &args, 1, 1)?;
            items.borrow_mut().extend(args);
            Ok(Value::None)
        }
        "extend" => {
            arity(&qualified, &args, 1, 1)?;
            let extra = ops::collect_items(&args[0])?;
            items.borrow_mut().extend(extra);
            Ok(Value::None)
        }
        "insert" => {
            arity(&qualified, &args, 2, 2)?;
            let mut args = args.into_iter();
            let index = expect_int(&args.next().unwrap_or(Value::None))?;
            let value = args.next().unwrap_or(Value::None);
            let mut items = items.borrow_mut();
            let len = items.len() as i64;
            let index = if index < 0 { (index + len).max(0) } else { index.min(len) };
            items.insert(index as usize, value);
            Ok(Value::None)
        }
        "pop" => {
            arity(&qualified, &args, 0, 1)?;
            let mut items = items.borrow_mut();
            if items.is_empty() {
                return Err(OpError::new(ErrorKind::IndexError, "pop from empty list"));
            }
            let len = items.len() as i64;
            let index = match args.first() {
                Some(value) => expect_int(value)?,
                None => -1,
            };
            let index = if index < 0 { index + len } else { index };
            if !(0..len).contains(&index) {
                return Err(OpError::new(ErrorKind::IndexError, "pop index out of range"));
            }
            Ok(items.remove(index as usize))
        }
        "remove" => {
            arity(&qualified, &args, 1, 1)?;
            let position = items.borrow().iter().position(|item| item.py_eq(&args[0]));
            match position {
                Some(i) => {
                    items.borrow_mut().remove(i);
                    Ok(Value::None)
                }
                None => Err(value_error("list.remove(x): x not in list")),
            }
        }
        "index" => {
            arity(&qualified, &args, 1, 1)?;
            let position = items.borrow().iter().position(|item| item.py_eq(&args[0]));
            position
                .map(|i| Value::Int(i as i64))
                .ok_or_else(|| value_error(format!("{} is not in list", args[0].repr())))
        }
        "count" => {
            arity(&qualified, &args, 1, 1)?;
            let count = items.borrow().iter().filter(|item| item.py_eq(&args[0])).count();
            Ok(Value::Int(count as i64))
        }
        "reverse" => {
            arity(&qualified, &args, 0, 0)?;
            items.borrow_mut().reverse();
            Ok(Value::None)
        }
        "clear" => {
            arity(&qualified, &args, 0, 0)?;
            items.borrow_mut().clear();
            Ok(Value::None)
        }
        "copy" => {
            arity(&qualified, &args, 0, 0)?;
            Ok(Value::list(items.borrow().clone()))
        }
        _ => Err(no_attribute(receiver, method)),
    }
}

fn dict_method(
    entries: &super::value::DictRef,
    receiver: &Value,
    method: &str,
    args: Vec<Value>,
) -> OpResult {
    let qualified = format!("dict.{method}");
    match method {
        "get" => {
            arity(&qualified, &args, 1, 2)?;
            ops::check_hashable(&args[0])?;
            let found = dict_lookup(&entries.borrow(), &args[0]).cloned();
            Ok(found.or_else(|| args.get(1).cloned()).unwrap_or(Value::None))
        }
        "keys" => {
            arity(&qualified, &args, 0, 0)?;
            Ok(Value::list(entries.borrow().iter().map(|(k, _)| k.clone()).collect()))
        }
        "values" => {
            arity(&qualified, &args, 0, 0)?;
            Ok(Value::list(entries.borrow().iter().map(|(_, v)| v.clone()).collect()))
        }
        "items" => {
            arity(&qualified, &args, 0, 0)?;
            Ok(Value::list(
                entries
                    .borrow()
                    .iter()
                    .map(|(k, v)| Value::tuple(vec![k.clone(), v.clone()]))
                    .collect(),
            ))
        }
        "pop" => {
            arity(&qualified, &args, 1, 2)?;
            ops::check_hashable(&args[0])?;
            let mut entries = entries.borrow_mut();
            match entries.iter().position(|(key, _)| key.py_eq(&args[0])) {
                Some(i) => Ok(entries.remove(i).1),
                None => args.get(1).cloned().ok_or_else(|| OpError::new(ErrorKind::KeyError, args[0].repr())),
            }
        }
        _ => Err(no_attribute(receiver, method)),
    }
}

fn str_method(text: &Rc<str>, method: &str, args: &[Value]) -> OpResult {
    let qualified = format!("str.{method}");
    let strip_chars = |args: &[Value]| -> OpResult<Option<Vec<char>>> {
        arity(&qualified, args, 0, 1)?;
        match args.first() {
            None | Some(Value::None) => Ok(None),
            Some(value) => Ok(Some(expect_str(value, "strip arg")?.chars().collect())),
        }
    };
    let trimmed = |chars: &Option<Vec<char>>, c: char| match chars {
        Some(chars) => chars.contains(&c),
        None => c.is_whitespace(),
    };

    match method {
        "upper" => {
            arity(&qualified, args, 0, 0)?;
            Ok(Value::str(text.to_uppercase()))
        }
        "lower" => {
            arity(&qualified, args, 0, 0)?;
            Ok(Value::str(text.to_lowercase()))
        }
        "strip" => {
            let chars = strip_chars(args)?;
            Ok(Value::str(text.trim_matches(|c| trimmed(&chars, c))))
        }
        "lstrip" => {
            let chars = strip_chars(args)?;
            Ok(Value::str(text.trim_start_matches(|c| trimmed(&chars, c))))
        }
        "rstrip" => {
            let chars = strip_chars(args)?;
            Ok(Value::str(text.trim_end_matches(|c| trimmed(&chars, c))))
        }
        "split" => {
            arity(&qualified, args, 0, 1)?;
            let parts: Vec<Value> = match args.first() {
                None | Some(Value::None) => text.split_whitespace().map(Value::str).collect(),
                Some(sep) => {
                    let sep = expect_str(sep, "separator")?;
                    if sep.is_empty() {
                        return Err(value_error("empty separator"));
                    }
                    text.split(sep).map(Value::str).collect()
                }
            };
            Ok(Value::list(parts))
        }
        "join" => {
            arity(&qualified, args, 1, 1)?;
            let items = ops::collect_items(&args[0])?;
            let mut parts = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                match item {
                    Value::Str(s) => parts.push(s.to_string()),
                    other => {
                        return Err(type_error(format!(
                            "sequence item {i}: expected str instance, {} found",
                            other.type_name()
                        )))
                    }
                }
            }
            Ok(Value::str(parts.join(&text[..])))
        }
        "replace" => {
            arity(&qualified, args, 2, 2)?;
            let old = expect_str(&args[0], "replace() argument 1")?;
            let new = expect_str(&args[1], "replace() argument 2")?;
            Ok(Value::str(text.replace(old, new)))
        }
        "startswith" | "endswith" => {
            arity(&qualified, args, 1, 1)?;
            let affix = expect_str(&args[0], &format!("{method} arg"))?;
            let found = if method == "startswith" {
                text.starts_with(affix)
            } else {
                text.ends_with(affix)
            };
            Ok(Value::Bool(found))
        }
        "find" => {
            arity(&qualified, args, 1, 1)?;
            let needle = expect_str(&args[0], "find arg")?;
            Ok(Value::Int(text.find(needle).map_or(-1, |i| char_index(text, i))))
        }
        "count" => {
            arity(&qualified, args, 1, 1)?;
            let needle = expect_str(&args[0], "count arg")?;
            let count = if needle.is_empty() {
                text.chars().count() + 1
            } else {
                text.matches(needle).count()
            };
            Ok(Value::Int(count as i64))
        }
        "isdigit" => {
            arity(&qualified, args, 0, 0)?;
            Ok(Value::Bool(!text.is_empty() && text.chars().all(|c| c.is_ascii_digit())))
        }
        "isalpha" => {
            arity(&qualified, args, 0, 0)?;
            Ok(Value::Bool(!text.is_empty() && text.chars().all(char::is_alphabetic)))
        }
        _ => Err(no_attribute(&Value::Str(Rc::clone(text)), method)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        interp::{ExecutionLimits, HookAction, LineEvent, SourceId},
        lang::parse_program,
    };

    fn eval_global(source: &str, name: &str) -> Result<String, crate::RuntimeError> {
        let program = parse_program(source).unwrap();
        let mut hook = |_: &LineEvent<'_>| HookAction::Continue;
        let mut interpreter = Interpreter::new(&mut hook, ExecutionLimits::default());
        interpreter.run_module(&program, SourceId::Snippet)?;
        Ok(interpreter.global(name).map(Value::repr).unwrap_or_default())
    }

    fn eval(expr: &str) -> String {
        eval_global(&format!("r = {expr}\n"), "r").unwrap()
    }

    fn eval_err(expr: &str) -> crate::RuntimeError {
        eval_global(&format!("r = {expr}\n"), "r").unwrap_err()
    }

    #[test]
    fn test_builtin_lookup() {
        assert_eq!(Builtin::from_name("sorted"), Some(Builtin::Sorted));
        assert_eq!(Builtin::from_name("open"), None);
        assert!(Builtin::ALL.iter().all(|b| Builtin::from_name(b.name()) == Some(*b)));
    }

    #[test]
    fn test_numeric_builtins() {
        assert_eq!(eval("abs(-3)"), "3");
        assert_eq!(eval("min(3, 1, 2)"), "1");
        assert_eq!(eval("max([1, 5, 2])"), "5");
        assert_eq!(eval("max(['aa', 'b'], key=len)"), "'aa'");
        assert_eq!(eval("sum([1, 2, 3])"), "6");
        assert_eq!(eval("sum([0.5, 0.5], 1)"), "2.0");
        assert_eq!(eval("int('42')"), "42");
        assert_eq!(eval("int(-2.7)"), "-2");
        assert_eq!(eval("int('ff', 16)"), "255");
        assert_eq!(eval("float('1.5')"), "1.5");
        assert_eq!(eval("round(2.5)"), "2");
        assert_eq!(eval("round(3.5)"), "4");
        assert_eq!(eval("round(1.25, 1)"), "1.2");
        assert_eq!(eval("round(1250, -2)"), "1200");
        assert_eq!(eval_err("min([])").kind, ErrorKind::ValueError);
        assert_eq!(eval_err("int('x')").message, "invalid literal for int() with base 10: 'x'");
        assert_eq!(eval_err("len(5)").kind, ErrorKind::TypeError);
        assert_eq!(eval_err("range(1, 2, 0)").kind, ErrorKind::ValueError);
    }

    #[test]
    fn test_sequence_builtins() {
        assert_eq!(eval("list(range(2, 8, 3))"), "[2, 5]");
        assert_eq!(eval("range(4)"), "range(0, 4)");
        assert_eq!(eval("len('héllo')"), "5");
        assert_eq!(eval("sorted([3, 1, 2], reverse=True)"), "[3, 2, 1]");
        assert_eq!(eval("sorted(['bb', 'a', 'cc'], key=len)"), "['a', 'bb', 'cc']");
        assert_eq!(eval("reversed('abc')"), "['c', 'b', 'a']");
        assert_eq!(eval("enumerate(['x', 'y'], 1)"), "[(1, 'x'), (2, 'y')]");
        assert_eq!(eval("zip([1, 2, 3], 'ab')"), "[(1, 'a'), (2, 'b')]");
        assert_eq!(eval("tuple([1])"), "(1,)");
        assert_eq!(eval("dict([(1, 2)], a=3)"), "{1: 2, 'a': 3}");
        assert_eq!(eval("str([1, 'a'])"), "\"[1, 'a']\"");
        assert_eq!(eval("bool([])"), "False");
        assert_eq!(eval_err("sorted([1, 'a'])").kind, ErrorKind::TypeError);
    }

    #[test]
    fn test_list_methods() {
        let source = "xs = [3, 1]\nxs.append(2)\nxs.insert(0, 9)\nxs.extend((7, 7))\nxs.remove(7)\nlast = xs.pop()\nxs.sort()\n";
        assert_eq!(eval_global(source, "xs").unwrap(), "[1, 2, 3, 9]");
        assert_eq!(eval_global(source, "last").unwrap(), "7");
        assert_eq!(eval("[1, 2, 2].count(2)"), "2");
        assert_eq!(eval("[1, 2].index(2)"), "1");
        assert_eq!(eval_err("[].pop()").message, "pop from empty list");
        assert_eq!(eval_err("[1].index(5)").message, "5 is not in list");
        assert_eq!(eval_err("[1].push(5)").kind, ErrorKind::AttributeError);
    }

    #[test]
    fn test_str_methods() {
        assert_eq!(eval("'Ab'.upper()"), "'AB'");
        assert_eq!(eval("'  x '.strip()"), "'x'");
        assert_eq!(eval("'xxaxx'.lstrip('x')"), "'axx'");
        assert_eq!(eval("'a b  c'.split()"), "['a', 'b', 'c']");
        assert_eq!(eval("'a,b'.split(',')"), "['a', 'b']");
        assert_eq!(eval("'-'.join(['a', 'b'])"), "'a-b'");
        assert_eq!(eval("'hello'.replace('l', 'L')"), "'heLLo'");
        assert_eq!(eval("'héllo'.find('l')"), "2");
        assert_eq!(eval("'banana'.count('an')"), "2");
        assert_eq!(eval("'123'.isdigit()"), "True");
        assert_eq!(eval_err("'-'.join([1])").kind, ErrorKind::TypeError);
    }

    #[test]
    fn test_dict_methods() {
        let source = "d = {'a': 1}\nd['b'] = 2\nd.update({'a': 5})\nv = d.pop('b')\nk = d.keys()\ng = d.get('z', 0)\n";
        assert_eq!(eval_global(source, "d").unwrap(), "{'a': 5}");
        assert_eq!(eval_global(source, "v").unwrap(), "2");
        assert_eq!(eval_global(source, "k").unwrap(), "['a']");
        assert_eq!(eval_global(source, "g").unwrap(), "0");
        assert_eq!(eval("{'a': 1}.items()"), "[('a', 1)]");
        assert_eq!(eval_err("{}.pop('x')").kind, ErrorKind::KeyError);
    }
}
