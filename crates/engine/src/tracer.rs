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

//! Line tracing of whole snippets.
//!
//! A [`LineTracer`] owns no per-run state: every call builds a fresh
//! interpreter and a fresh hook, so one tracer can serve any number of runs.

use std::collections::BTreeSet;

use etp_common::Snippet;
use tracing::trace;

use crate::{
    extract::assignment_targets,
    interp::{
        Bindings, Completion, ExecutionLimits, HookAction, Interpreter, LineEvent, LineHook,
        SourceId,
    },
    lang::{parse_program, Program},
    ConfigError, TraceError,
};

/// Where a stepped run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPoint {
    /// The requested step (1-based event index)
    pub step: usize,
    /// Line about to execute at that step
    pub highlighted_line: usize,
    /// Largest line reached up to and including the step
    pub max_line: usize,
    /// Whether execution had jumped back above `max_line` at the step
    pub is_revisit: bool,
}

/// Outcome of tracing one snippet
#[derive(Debug, Clone, PartialEq)]
pub struct TraceResult {
    /// Number of line events in the snippet's own source
    pub executed_line_count: usize,
    /// Lines that produced at least one event
    pub reached_lines: BTreeSet<usize>,
    /// Final module bindings of assigned names, or the frame snapshot of a
    /// stepped run
    pub variables: Bindings,
    /// Set for stepped runs
    pub step: Option<StepPoint>,
    /// Captured `print` output
    pub output: String,
}

impl TraceResult {
    /// Lines whose operators are known to have executed by the step.
    ///
    /// Without a step point every reached line counts.
    pub fn verified_lines_till_step(&self, reached: &BTreeSet<usize>) -> BTreeSet<usize> {
        match self.step {
            Some(point) => verified_lines_till_step(reached, &point),
            None => reached.clone(),
        }
    }
}

/// Reached lines at or before the step: `<= max_line` after a jump back,
/// `< max_line` otherwise (the max line itself has not run yet)
pub fn verified_lines_till_step(reached: &BTreeSet<usize>, point: &StepPoint) -> BTreeSet<usize> {
    reached
        .iter()
        .copied()
        .filter(|line| if point.is_revisit { *line <= point.max_line } else { *line < point.max_line })
        .collect()
}

/// Result of [`LineTracer::run_to_step`]
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// The step was reached; the result holds the snapshot
    Reached(TraceResult),
    /// The run finished in fewer steps
    NotReached,
}

/// Runs snippets under a line hook
#[derive(Debug, Clone, Default)]
pub struct LineTracer {
    prelude: Option<String>,
    limits: ExecutionLimits,
}

impl LineTracer {
    /// Create a tracer; the prelude, when given, must parse
    pub fn new(prelude: Option<String>, limits: ExecutionLimits) -> Result<Self, ConfigError> {
        if let Some(source) = &prelude {
            parse_program(source).map_err(ConfigError::Prelude)?;
        }
        Ok(Self { prelude, limits })
    }

    /// Resource bounds applied to every run
    pub fn limits(&self) -> ExecutionLimits {
        self.limits
    }

    /// Run `snippet` to completion
    pub fn run(&self, snippet: &Snippet) -> Result<TraceResult, TraceError> {
        let program = parse_program(snippet.source())?;
        let mut counter = LineCounter::default();
        let execution = self.execute(&program, &mut counter)?;
        Ok(TraceResult {
            executed_line_count: counter.count,
            reached_lines: counter.reached,
            variables: execution.variables,
            step: None,
            output: execution.output,
        })
    }

    /// Run `snippet` until the `step`-th line event and snapshot the frame
    /// about to execute it
    pub fn run_to_step(&self, snippet: &Snippet, step: usize) -> Result<StepOutcome, TraceError> {
        let program = parse_program(snippet.source())?;
        let mut probe = StepProbe::new(step);
        let execution = self.execute(&program, &mut probe)?;
        let Some((point, variables)) = probe.snapshot else {
            trace!(step, events = probe.count, "step not reached");
            return Ok(StepOutcome::NotReached);
        };
        Ok(StepOutcome::Reached(TraceResult {
            executed_line_count: probe.count,
            reached_lines: probe.reached,
            variables,
            step: Some(point),
            output: execution.output,
        }))
    }

    fn execute(&self, program: &Program, hook: &mut dyn LineHook) -> Result<Execution, TraceError> {
        let prelude = self.prelude.as_deref().map(parse_program).transpose()?;
        let mut interpreter = Interpreter::new(hook, self.limits);
        if let Some(prelude) = &prelude {
            interpreter.run_module(prelude, SourceId::Prelude)?;
        }
        let completion = interpreter.run_module(program, SourceId::Snippet)?;

        let targets = assignment_targets(program);
        let variables = match completion {
            Completion::Finished => {
                interpreter.module_bindings(targets.iter().map(|target| target.name.as_str()))
            }
            Completion::Halted => Bindings::new(),
        };
        Ok(Execution { variables, output: interpreter.output().to_string() })
    }
}

struct Execution {
    variables: Bindings,
    output: String,
}

/// Counts snippet line events
#[derive(Debug, Default)]
struct LineCounter {
    count: usize,
    reached: BTreeSet<usize>,
}

impl LineHook for LineCounter {
    fn on_line(&mut self, event: &LineEvent<'_>) -> HookAction {
        if event.source == SourceId::Snippet {
            self.count += 1;
            self.reached.insert(event.line);
        }
        HookAction::Continue
    }
}

/// Stops at the requested step and keeps a snapshot of the frame
#[derive(Debug)]
struct StepProbe {
    target: usize,
    count: usize,
    max_line: usize,
    is_revisit: bool,
    reached: BTreeSet<usize>,
    snapshot: Option<(StepPoint, Bindings)>,
}

impl StepProbe {
    fn new(target: usize) -> Self {
        Self {
            target,
            count: 0,
            max_line: 0,
            is_revisit: false,
            reached: BTreeSet::new(),
            snapshot: None,
        }
    }
}

impl LineHook for StepProbe {
    fn on_line(&mut self, event: &LineEvent<'_>) -> HookAction {
        if event.source != SourceId::Snippet {
            return HookAction::Continue;
        }
        if event.line < self.max_line {
            self.is_revisit = true;
        } else if event.line > self.max_line {
            self.is_revisit = false;
            self.max_line = event.line;
        }
        self.count += 1;
        self.reached.insert(event.line);

        if self.count != self.target {
            return HookAction::Continue;
        }
        let point = StepPoint {
            step: self.target,
            highlighted_line: event.line,
            max_line: self.max_line,
            is_revisit: self.is_revisit,
        };
        self.snapshot = Some((point, event.frame.bindings()));
        HookAction::Halt
    }
}
