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

//! Runtime values and their textual rendering.

use std::{cell::RefCell, fmt, rc::Rc};

use etp_common::{format_float, VariableState};

use super::{builtins::Builtin, SourceId};
use crate::lang::FunctionDef;

/// Shared, mutable list storage
pub type ListRef = Rc<RefCell<Vec<Value>>>;

/// Shared, mutable, insertion-ordered dict storage
pub type DictRef = Rc<RefCell<Vec<(Value, Value)>>>;

/// A runtime value
#[derive(Debug, Clone)]
pub enum Value {
    /// `None`
    None,
    /// `True` / `False`
    Bool(bool),
    /// 64-bit integer
    Int(i64),
    /// Double precision float
    Float(f64),
    /// Immutable string
    Str(Rc<str>),
    /// Mutable list, shared by reference
    List(ListRef),
    /// Immutable tuple
    Tuple(Rc<[Value]>),
    /// Mutable dict, shared by reference
    Dict(DictRef),
    /// Lazy integer range
    Range(RangeValue),
    /// User-defined function
    Function(Rc<Function>),
    /// Builtin function
    Builtin(Builtin),
}

/// `range(start, stop, step)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeValue {
    /// First value
    pub start: i64,
    /// Exclusive bound
    pub stop: i64,
    /// Non-zero stride
    pub step: i64,
}

impl RangeValue {
    /// Number of values in the range
    pub fn len(&self) -> usize {
        let (start, stop, step) = (self.start as i128, self.stop as i128, self.step as i128);
        let len = if step > 0 && start < stop {
            (stop - start - 1) / step + 1
        } else if step < 0 && start > stop {
            (start - stop - 1) / (-step) + 1
        } else {
            0
        };
        usize::try_from(len).unwrap_or(usize::MAX)
    }

    /// Whether the range is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `index`-th value, if in bounds
    pub fn get(&self, index: usize) -> Option<i64> {
        if index >= self.len() {
            return None;
        }
        let value = self.start as i128 + index as i128 * self.step as i128;
        i64::try_from(value).ok()
    }

    /// Whether `value` is produced by the range
    pub fn contains(&self, value: i64) -> bool {
        let in_bounds = if self.step > 0 {
            self.start <= value && value < self.stop
        } else {
            self.stop < value && value <= self.start
        };
        in_bounds && (value as i128 - self.start as i128) % self.step as i128 == 0
    }

    /// Equality as sequences (`range(0) == range(2, 2)`)
    pub fn same_sequence(&self, other: &Self) -> bool {
        let len = self.len();
        len == other.len()
            && (len == 0 || (self.start == other.start && (len == 1 || self.step == other.step)))
    }
}

/// A user-defined function value
#[derive(Debug)]
pub struct Function {
    /// The definition
    pub def: Rc<FunctionDef>,
    /// Default values, aligned with `def.params`
    pub defaults: Vec<Option<Value>>,
    /// Source the definition came from
    pub source: SourceId,
}

/// A number view of `bool`, `int` and `float` values
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    /// Integer (booleans widen to this)
    Int(i64),
    /// Float
    Float(f64),
}

impl Numeric {
    /// Value as a float
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(v) => v as f64,
            Self::Float(v) => v,
        }
    }
}

impl Value {
    /// Build a string value
    pub fn str(text: impl Into<Rc<str>>) -> Self {
        Self::Str(text.into())
    }

    /// Build a fresh list
    pub fn list(items: Vec<Self>) -> Self {
        Self::List(Rc::new(RefCell::new(items)))
    }

    /// Build a tuple
    pub fn tuple(items: Vec<Self>) -> Self {
        Self::Tuple(items.into())
    }

    /// Build a fresh dict
    pub fn dict(entries: Vec<(Self, Self)>) -> Self {
        Self::Dict(Rc::new(RefCell::new(entries)))
    }

    /// Name of the value's type, as error messages spell it
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "NoneType",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::Dict(_) => "dict",
            Self::Range(_) => "range",
            Self::Function(_) => "function",
            Self::Builtin(_) => "builtin_function_or_method",
        }
    }

    /// Numeric view, if the value is a number (booleans count)
    pub fn as_numeric(&self) -> Option<Numeric> {
        match self {
            Self::Bool(b) => Some(Numeric::Int(i64::from(*b))),
            Self::Int(v) => Some(Numeric::Int(*v)),
            Self::Float(v) => Some(Numeric::Float(*v)),
            _ => None,
        }
    }

    /// Integer view (booleans count)
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Truthiness
    pub fn truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Int(v) => *v != 0,
            Self::Float(v) => *v != 0.0,
            Self::Str(s) => !s.is_empty(),
            Self::List(items) => !items.borrow().is_empty(),
            Self::Tuple(items) => !items.is_empty(),
            Self::Dict(entries) => !entries.borrow().is_empty(),
            Self::Range(range) => !range.is_empty(),
            Self::Function(_) | Self::Builtin(_) => true,
        }
    }

    /// Whether the value can be a dict key
    pub fn is_hashable(&self) -> bool {
        match self {
            Self::List(_) | Self::Dict(_) => false,
            Self::Tuple(items) => items.iter().all(Self::is_hashable),
            _ => true,
        }
    }

    /// `==`
    pub fn py_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) => {
                Rc::ptr_eq(a, b) || sequence_eq(&a.borrow(), &b.borrow())
            }
            (Self::Tuple(a), Self::Tuple(b)) => sequence_eq(a, b),
            (Self::Dict(a), Self::Dict(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len()
                    && a.iter().all(|(key, value)| dict_lookup(&b, key).is_some_and(|v| v.py_eq(value)))
            }
            (Self::Range(a), Self::Range(b)) => a.same_sequence(b),
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            (Self::Builtin(a), Self::Builtin(b)) => a == b,
            _ => match (self.as_numeric(), other.as_numeric()) {
                (Some(Numeric::Int(a)), Some(Numeric::Int(b))) => a == b,
                (Some(a), Some(b)) => a.as_f64() == b.as_f64(),
                _ => false,
            },
        }
    }

    /// `is`: identity for shared objects, value equality for scalars
    pub fn is_same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) => Rc::ptr_eq(a, b),
            (Self::Tuple(a), Self::Tuple(b)) => Rc::ptr_eq(a, b),
            (Self::Dict(a), Self::Dict(b)) => Rc::ptr_eq(a, b),
            (Self::Range(a), Self::Range(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            (Self::Builtin(a), Self::Builtin(b)) => a == b,
            _ => false,
        }
    }

    /// `repr(value)`
    pub fn repr(&self) -> String {
        let mut out = String::new();
        self.render(&mut out, true, &mut Vec::new());
        out
    }

    fn render(&self, out: &mut String, quoted: bool, active: &mut Vec<*const ()>) {
        match self {
            Self::None => out.push_str("None"),
            Self::Bool(true) => out.push_str("True"),
            Self::Bool(false) => out.push_str("False"),
            Self::Int(v) => out.push_str(&v.to_string()),
            Self::Float(v) => out.push_str(&format_float(*v)),
            Self::Str(s) if quoted => out.push_str(&repr_str(s)),
            Self::Str(s) => out.push_str(s),
            Self::List(items) => {
                let id = Rc::as_ptr(items) as *const ();
                if active.contains(&id) {
                    out.push_str("[...]");
                    return;
                }
                active.push(id);
                out.push('[');
                render_items(out, &items.borrow(), active);
                out.push(']');
                active.pop();
            }
            Self::Tuple(items) => {
                out.push('(');
                render_items(out, items, active);
                if items.len() == 1 {
                    out.push(',');
                }
                out.push(')');
            }
            Self::Dict(entries) => {
                let id = Rc::as_ptr(entries) as *const ();
                if active.contains(&id) {
                    out.push_str("{...}");
                    return;
                }
                active.push(id);
                out.push('{');
                for (i, (key, value)) in entries.borrow().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    key.render(out, true, active);
                    out.push_str(": ");
                    value.render(out, true, active);
                }
                out.push('}');
                active.pop();
            }
            Self::Range(range) if range.step == 1 => {
                out.push_str(&format!("range({}, {})", range.start, range.stop))
            }
            Self::Range(range) => {
                out.push_str(&format!("range({}, {}, {})", range.start, range.stop, range.step))
            }
            Self::Function(function) => out.push_str(&format!("<function {}>", function.def.name)),
            Self::Builtin(builtin) => {
                out.push_str(&format!("<built-in function {}>", builtin.name()))
            }
        }
    }
}

/// `str(value)`
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.render(&mut out, false, &mut Vec::new());
        f.write_str(&out)
    }
}

fn render_items(out: &mut String, items: &[Value], active: &mut Vec<*const ()>) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        item.render(out, true, active);
    }
}

fn sequence_eq(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.py_eq(y))
}

/// Quote a string the way `repr` does
pub fn repr_str(text: &str) -> String {
    let quote = if text.contains('\'') && !text.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(text.len() + 2);
    out.push(quote);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c == '\x7f' => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Value stored under `key`
pub fn dict_lookup<'a>(entries: &'a [(Value, Value)], key: &Value) -> Option<&'a Value> {
    entries.iter().find(|(k, _)| k.py_eq(key)).map(|(_, v)| v)
}

/// Insert or overwrite `key`, keeping the original insertion position
pub fn dict_insert(entries: &mut Vec<(Value, Value)>, key: Value, value: Value) {
    match entries.iter_mut().find(|(k, _)| k.py_eq(&key)) {
        Some(entry) => entry.1 = value,
        None => entries.push((key, value)),
    }
}

/// Ordered variable bindings of one scope
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    entries: Vec<(String, Value)>,
}

impl Bindings {
    /// Empty bindings
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a binding
    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.entries.push((name.into(), value));
    }

    /// Value bound to `name`
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no bindings
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Bound names in order
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Render every value with `str()`
    pub fn to_state(&self) -> VariableState {
        self.entries.iter().map(|(name, value)| (name.as_str(), value.to_string())).collect()
    }
}

/// Same names in the same order with `==` values
impl PartialEq for Bindings {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(&other.entries)
                .all(|((a, x), (b, y))| a == b && x.py_eq(y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_str_and_repr() {
        let list = Value::list(vec![Value::Int(1), Value::str("a"), Value::Float(2.0), Value::None]);
        assert_eq!(list.to_string(), "[1, 'a', 2.0, None]");
        assert_eq!(Value::str("it's").repr(), "\"it's\"");
        assert_eq!(Value::str("a\nb").repr(), "'a\\nb'");
        assert_eq!(Value::str("plain").to_string(), "plain");
        assert_eq!(Value::tuple(vec![Value::Int(1)]).to_string(), "(1,)");
        assert_eq!(Value::tuple(vec![]).to_string(), "()");
        assert_eq!(Value::Bool(true).to_string(), "True");
        assert_eq!(Value::Float(1e16).to_string(), "1e+16");
        let dict = Value::dict(vec![(Value::str("k"), Value::list(vec![]))]);
        assert_eq!(dict.to_string(), "{'k': []}");
        assert_eq!(Value::Range(RangeValue { start: 0, stop: 3, step: 1 }).to_string(), "range(0, 3)");
    }

    #[test]
    fn test_recursive_list_rendering() {
        let list = Value::list(vec![Value::Int(1)]);
        if let Value::List(items) = &list {
            items.borrow_mut().push(list.clone());
        }
        assert_eq!(list.to_string(), "[1, [...]]");
    }

    #[test]
    fn test_equality_across_numeric_types() {
        assert!(Value::Int(1).py_eq(&Value::Float(1.0)));
        assert!(Value::Bool(true).py_eq(&Value::Int(1)));
        assert!(!Value::Int(1).py_eq(&Value::str("1")));
        assert!(Value::list(vec![Value::Int(1)]).py_eq(&Value::list(vec![Value::Float(1.0)])));
        assert!(!Value::list(vec![]).py_eq(&Value::tuple(vec![])));
    }

    #[test]
    fn test_dict_insert_keeps_order() {
        let mut entries = Vec::new();
        dict_insert(&mut entries, Value::str("b"), Value::Int(1));
        dict_insert(&mut entries, Value::str("a"), Value::Int(2));
        dict_insert(&mut entries, Value::str("b"), Value::Int(3));
        assert_eq!(Value::dict(entries).to_string(), "{'b': 3, 'a': 2}");
    }

    #[test]
    fn test_range_helpers() {
        let range = RangeValue { start: 10, stop: 0, step: -3 };
        assert_eq!(range.len(), 4);
        assert_eq!(range.get(3), Some(1));
        assert!(range.contains(4));
        assert!(!range.contains(5));
        assert!(RangeValue { start: 0, stop: 0, step: 1 }
            .same_sequence(&RangeValue { start: 2, stop: 2, step: 5 }));
    }

    #[test]
    fn test_bindings_state() {
        let mut bindings = Bindings::new();
        bindings.push("x", Value::Int(3));
        bindings.push("s", Value::str("hi"));
        assert_eq!(bindings.to_state().encode(), "x?3;s?hi");

        let mut other = Bindings::new();
        other.push("x", Value::Float(3.0));
        other.push("s", Value::str("hi"));
        assert_eq!(bindings, other);
    }
}
