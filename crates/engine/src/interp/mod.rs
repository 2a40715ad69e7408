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

//! Tree-walking evaluator for the snippet language.

mod builtins;
mod hook;
mod interpreter;
pub mod ops;
mod value;

pub use builtins::Builtin;
pub use hook::{FrameView, HookAction, LineEvent, LineHook};
pub use interpreter::{Completion, Interpreter};
pub use value::{repr_str, Bindings, DictRef, Function, ListRef, Numeric, RangeValue, Value};

/// Default bound on nested function calls
pub const DEFAULT_MAX_CALL_DEPTH: usize = 200;

/// Where a piece of executing code came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceId {
    /// Configured helper definitions, loaded before the snippet
    Prelude,
    /// The snippet under test
    Snippet,
}

/// Resource bounds of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionLimits {
    /// Abort after this many line events (prelude events included)
    pub max_line_events: Option<u64>,
    /// Raise `RecursionError` beyond this many nested calls
    pub max_call_depth: usize,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self { max_line_events: None, max_call_depth: DEFAULT_MAX_CALL_DEPTH }
    }
}
