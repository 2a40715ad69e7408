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

//! The `name?value;name?value` state encoding used by every corpus label.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Separates `name?value` pairs inside a state string
pub const PAIR_SEPARATOR: char = ';';

/// Separates a variable name from its rendered value
pub const VALUE_SEPARATOR: char = '?';

/// Rendered in place of a value the model is asked to recover
pub const MASKED_VALUE: &str = "~";

/// One rendered binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEntry {
    /// Variable name
    pub name: String,
    /// Rendered value
    pub value: String,
}

/// Ordered, rendered variable bindings.
///
/// This is the text-level view of a snapshot: values are already rendered, so
/// two states compare equal exactly when their encodings do.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, derive_more::Deref)]
pub struct VariableState {
    entries: Vec<StateEntry>,
}

impl VariableState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a binding, keeping insertion order
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push(StateEntry { name: name.into(), value: value.into() });
    }

    /// Look up the rendered value of `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.value.as_str())
    }

    /// Encode as `name?value;name?value`
    pub fn encode(&self) -> String {
        let mut out = String::new();
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                out.push(PAIR_SEPARATOR);
            }
            out.push_str(&entry.name);
            out.push(VALUE_SEPARATOR);
            out.push_str(&entry.value);
        }
        out
    }

    /// Decode a state string.
    ///
    /// Pairs are split on `;`, then on the first `?`. Pieces without a `?` are
    /// dropped. Values that themselves contain `;` cannot be recovered; the
    /// format has no escaping.
    pub fn parse(encoded: &str) -> Self {
        let entries = encoded
            .split(PAIR_SEPARATOR)
            .filter_map(|part| part.split_once(VALUE_SEPARATOR))
            .map(|(name, value)| StateEntry { name: name.to_string(), value: value.to_string() })
            .collect();
        Self { entries }
    }

    /// Copy of the state with the value of `name` replaced by `~`
    pub fn masked(&self, name: &str) -> Self {
        let entries = self
            .entries
            .iter()
            .map(|e| {
                if e.name == name {
                    StateEntry { name: e.name.clone(), value: MASKED_VALUE.to_string() }
                } else {
                    e.clone()
                }
            })
            .collect();
        Self { entries }
    }
}

impl fmt::Display for VariableState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for VariableState {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let mut state = Self::new();
        for (name, value) in iter {
            state.push(name, value);
        }
        state
    }
}

/// Mask the value of `name` inside an encoded state string
pub fn mask_variable_value(encoded: &str, name: &str) -> String {
    VariableState::parse(encoded).masked(name).encode()
}
