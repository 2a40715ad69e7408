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

//! Line callbacks of the evaluator.
//!
//! A hook is handed to exactly one [`super::Interpreter`] for exactly one run.
//! There is no process-wide tracing state.

use std::collections::HashMap;

use super::{value::Bindings, SourceId, Value};

/// What the interpreter does after a line event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookAction {
    /// Execute the line
    Continue,
    /// Stop the run before the line executes
    Halt,
}

/// A line is about to execute
#[derive(Debug)]
pub struct LineEvent<'a> {
    /// Source the executing code came from
    pub source: SourceId,
    /// 1-based line number
    pub line: usize,
    /// The executing frame
    pub frame: FrameView<'a>,
}

/// Read-only view of the executing frame
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pub(super) layout: &'a [String],
    pub(super) locals: &'a HashMap<String, Value>,
    pub(super) function: Option<&'a str>,
}

impl<'a> FrameView<'a> {
    /// Bound locals in static first-appearance order (parameters first)
    pub fn bindings(&self) -> Bindings {
        let mut bindings = Bindings::new();
        for name in self.layout {
            if let Some(value) = self.locals.get(name) {
                bindings.push(name.as_str(), value.clone());
            }
        }
        bindings
    }

    /// Whether this is the module frame
    pub fn is_module(&self) -> bool {
        self.function.is_none()
    }

    /// Name of the executing function, if any
    pub fn function_name(&self) -> Option<&'a str> {
        self.function
    }
}

/// Receives a callback before every line executes
pub trait LineHook {
    /// Called with the frame state before `event.line` runs
    fn on_line(&mut self, event: &LineEvent<'_>) -> HookAction;
}

impl<F> LineHook for F
where
    F: FnMut(&LineEvent<'_>) -> HookAction,
{
    fn on_line(&mut self, event: &LineEvent<'_>) -> HookAction {
        self(event)
    }
}
