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

//! Determinism checks for masked tokens.
//!
//! A masked token is kept only when every alternative token observably
//! changes the execution: otherwise a reader could not tell which token was
//! there from the trace alone.

use etp_common::{LiteralCandidate, OperatorCandidate, Snippet, SpliceError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    interp::Bindings,
    tracer::{LineTracer, StepOutcome, TraceResult},
};

/// How inconclusive variants are judged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessPolicy {
    /// A variant that fails to parse or run makes the token ambiguous;
    /// otherwise that alternative is ignored
    pub errors_are_ambiguous: bool,
    /// A variant that finishes before the step makes the token ambiguous;
    /// otherwise that alternative is ignored
    pub unreached_steps_are_ambiguous: bool,
    /// A variant that reaches the step on another line makes the token
    /// ambiguous
    pub shifted_highlight_is_ambiguous: bool,
}

impl Default for HarnessPolicy {
    fn default() -> Self {
        Self {
            errors_are_ambiguous: true,
            unreached_steps_are_ambiguous: true,
            shifted_highlight_is_ambiguous: false,
        }
    }
}

/// What a variant is compared against
#[derive(Debug, Clone, Copy)]
pub enum Reference<'a> {
    /// Final bindings of the unmutated snippet
    Final(&'a Bindings),
    /// Snapshot of the unmutated snippet at a step
    Step {
        /// The step to run variants to
        step: usize,
        /// The unmutated snapshot
        result: &'a TraceResult,
    },
}

/// Why a token was judged ambiguous
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// No alternative tokens are configured for the symbol
    NoAlternatives,
    /// The variant did not parse or run
    VariantFailed {
        /// Replacement text of the variant
        replacement: String,
        /// Failure category
        kind: &'static str,
    },
    /// The variant finished before the step
    StepNotReached {
        /// Replacement text of the variant
        replacement: String,
    },
    /// The variant produced the reference outcome
    SameOutcome {
        /// Replacement text of the variant
        replacement: String,
    },
    /// The variant reached the step on a different line
    ShiftedHighlight {
        /// Replacement text of the variant
        replacement: String,
    },
}

/// Result of a determinism check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationVerdict {
    /// Whether every alternative changed the outcome
    pub deterministic: bool,
    /// The first alternative that did not, if any
    pub rejection: Option<Rejection>,
}

impl MutationVerdict {
    fn accepted() -> Self {
        Self { deterministic: true, rejection: None }
    }

    fn rejected(rejection: Rejection) -> Self {
        debug!(?rejection, "mutation is ambiguous");
        Self { deterministic: false, rejection: Some(rejection) }
    }
}

/// Compares variants of a snippet against its reference outcome
#[derive(Debug, Clone, Copy)]
pub struct MutationHarness<'t> {
    tracer: &'t LineTracer,
    policy: HarnessPolicy,
}

impl<'t> MutationHarness<'t> {
    /// Create a harness running variants on `tracer`
    pub fn new(tracer: &'t LineTracer, policy: HarnessPolicy) -> Self {
        Self { tracer, policy }
    }

    /// The active policy
    pub fn policy(&self) -> HarnessPolicy {
        self.policy
    }

    /// Check whether the operator at `candidate` is recoverable, trying each
    /// of `replacements` in its place
    pub fn check_operator(
        &self,
        snippet: &Snippet,
        candidate: &OperatorCandidate,
        replacements: &[char],
        reference: Reference<'_>,
    ) -> Result<MutationVerdict, SpliceError> {
        if replacements.is_empty() {
            return Ok(MutationVerdict::rejected(Rejection::NoAlternatives));
        }
        for replacement in replacements {
            let variant = snippet.replace_char(candidate.position, *replacement)?;
            if let Some(rejection) =
                self.compare(&variant, replacement.to_string(), reference, |state| state.to_state())
            {
                return Ok(MutationVerdict::rejected(rejection));
            }
        }
        Ok(MutationVerdict::accepted())
    }

    /// Check whether the literal at `candidate` is recoverable from the step
    /// snapshot with its owning variable masked, trying `value + 1` and
    /// `value - 1` in its place
    pub fn check_literal(
        &self,
        snippet: &Snippet,
        candidate: &LiteralCandidate,
        step: usize,
        result: &TraceResult,
    ) -> Result<MutationVerdict, SpliceError> {
        let replacements: Vec<String> = [1, -1]
            .into_iter()
            .filter_map(|delta| candidate.value.offset(delta))
            .map(|value| value.to_string())
            .collect();
        if replacements.is_empty() {
            return Ok(MutationVerdict::rejected(Rejection::NoAlternatives));
        }

        let masked = |bindings: &Bindings| {
            let state = bindings.to_state();
            match &candidate.target {
                Some(target) => state.masked(target),
                None => state,
            }
        };
        for replacement in replacements {
            let variant = snippet.splice(&candidate.site, &replacement)?;
            if let Some(rejection) =
                self.compare(&variant, replacement, Reference::Step { step, result }, masked)
            {
                return Ok(MutationVerdict::rejected(rejection));
            }
        }
        Ok(MutationVerdict::accepted())
    }

    /// Run one variant; `None` means it is observably different (or ignored
    /// by policy)
    fn compare<F>(
        &self,
        variant: &Snippet,
        replacement: String,
        reference: Reference<'_>,
        render: F,
    ) -> Option<Rejection>
    where
        F: Fn(&Bindings) -> etp_common::VariableState,
    {
        let failed = |kind: &'static str, replacement: String| {
            self.policy
                .errors_are_ambiguous
                .then_some(Rejection::VariantFailed { replacement, kind })
        };

        match reference {
            Reference::Final(expected) => match self.tracer.run(variant) {
                Err(err) => failed(err.kind(), replacement),
                Ok(outcome) if outcome.variables == *expected => {
                    Some(Rejection::SameOutcome { replacement })
                }
                Ok(_) => None,
            },
            Reference::Step { step, result: expected } => match self.tracer.run_to_step(variant, step) {
                Err(err) => failed(err.kind(), replacement),
                Ok(StepOutcome::NotReached) => self
                    .policy
                    .unreached_steps_are_ambiguous
                    .then_some(Rejection::StepNotReached { replacement }),
                Ok(StepOutcome::Reached(outcome)) => {
                    let line = |r: &TraceResult| r.step.map(|point| point.highlighted_line);
                    let same_line = line(&outcome) == line(expected);
                    if same_line && render(&outcome.variables) == render(&expected.variables) {
                        Some(Rejection::SameOutcome { replacement })
                    } else if !same_line && self.policy.shifted_highlight_is_ambiguous {
                        Some(Rejection::ShiftedHighlight { replacement })
                    } else {
                        None
                    }
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use etp_common::{OperatorKind, Position};

    use super::*;
    use crate::{extract::numeric_literals, lang::parse_program};

    fn plus_at(line: usize, column: usize) -> OperatorCandidate {
        OperatorCandidate { symbol: '+', position: Position::new(line, column), kind: OperatorKind::Arithmetic }
    }

    fn check_final(source: &str, candidate: &OperatorCandidate, replacements: &[char]) -> MutationVerdict {
        let tracer = LineTracer::default();
        let snippet = Snippet::new(source);
        let reference = tracer.run(&snippet).unwrap();
        MutationHarness::new(&tracer, HarnessPolicy::default())
            .check_operator(&snippet, candidate, replacements, Reference::Final(&reference.variables))
            .unwrap()
    }

    #[test]
    fn test_distinguishable_operator_is_deterministic() {
        let verdict = check_final("a = 5 + 3", &plus_at(1, 6), &['-']);
        assert!(verdict.deterministic);
        assert_eq!(verdict.rejection, None);
    }

    #[test]
    fn test_indistinguishable_operator_is_ambiguous() {
        let verdict = check_final("a = 5 + 0", &plus_at(1, 6), &['-']);
        assert!(!verdict.deterministic);
        assert_eq!(verdict.rejection, Some(Rejection::SameOutcome { replacement: "-".to_string() }));
    }

    #[test]
    fn test_empty_replacement_set_is_ambiguous() {
        let verdict = check_final("a = 5 + 3", &plus_at(1, 6), &[]);
        assert_eq!(verdict.rejection, Some(Rejection::NoAlternatives));
    }

    #[test]
    fn test_failing_variant_follows_policy() {
        let tracer = LineTracer::default();
        let snippet = Snippet::new("a = 3 + 3\nb = 1 / a");
        let reference = tracer.run(&snippet).unwrap();
        let candidate = plus_at(1, 6);

        let strict = MutationHarness::new(&tracer, HarnessPolicy::default());
        let verdict = strict
            .check_operator(&snippet, &candidate, &['*'], Reference::Final(&reference.variables))
            .unwrap();
        assert!(verdict.deterministic);

        let verdict = strict
            .check_operator(&snippet, &candidate, &['-'], Reference::Final(&reference.variables))
            .unwrap();
        assert!(matches!(
            verdict.rejection,
            Some(Rejection::VariantFailed { kind: "ZeroDivisionError", .. })
        ));

        let lenient = MutationHarness::new(
            &tracer,
            HarnessPolicy { errors_are_ambiguous: false, ..Default::default() },
        );
        let verdict = lenient
            .check_operator(&snippet, &candidate, &['-'], Reference::Final(&reference.variables))
            .unwrap();
        assert!(verdict.deterministic);
    }

    #[test]
    fn test_step_mode() {
        let tracer = LineTracer::default();
        let snippet = Snippet::new("a = 2\nb = a + 2\nc = b");
        let StepOutcome::Reached(reference) = tracer.run_to_step(&snippet, 3).unwrap() else {
            panic!("step not reached");
        };
        let harness = MutationHarness::new(&tracer, HarnessPolicy::default());
        let candidate = plus_at(2, 6);

        // a + 2 == a * 2 when a is 2
        let verdict = harness
            .check_operator(&snippet, &candidate, &['*'], Reference::Step { step: 3, result: &reference })
            .unwrap();
        assert!(!verdict.deterministic);

        let verdict = harness
            .check_operator(&snippet, &candidate, &['-'], Reference::Step { step: 3, result: &reference })
            .unwrap();
        assert!(verdict.deterministic);

        let verdict = harness
            .check_operator(&snippet, &candidate, &['-'], Reference::Step { step: 9, result: &reference })
            .unwrap();
        assert_eq!(verdict.rejection, Some(Rejection::StepNotReached { replacement: "-".to_string() }));
    }

    #[test]
    fn test_unreached_step_follows_policy() {
        let tracer = LineTracer::default();
        let snippet = Snippet::new("a = 2\nb = a + 2\nc = b");
        let StepOutcome::Reached(reference) = tracer.run_to_step(&snippet, 3).unwrap() else {
            panic!("step not reached");
        };
        let lenient = MutationHarness::new(
            &tracer,
            HarnessPolicy { unreached_steps_are_ambiguous: false, ..Default::default() },
        );
        let verdict = lenient
            .check_operator(&snippet, &plus_at(2, 6), &['-'], Reference::Step { step: 9, result: &reference })
            .unwrap();
        assert!(verdict.deterministic);
        assert_eq!(verdict.rejection, None);
    }

    #[test]
    fn test_shifted_highlight_follows_policy() {
        let tracer = LineTracer::default();
        let snippet = Snippet::new("if 1 + 1 > 1:\n    print(1)\nprint(2)");
        let StepOutcome::Reached(reference) = tracer.run_to_step(&snippet, 2).unwrap() else {
            panic!("step not reached");
        };
        assert_eq!(reference.step.unwrap().highlighted_line, 2);
        let candidate = plus_at(1, 5);
        let reference = Reference::Step { step: 2, result: &reference };

        // `1 - 1 > 1` jumps to line 3
        let verdict = MutationHarness::new(&tracer, HarnessPolicy::default())
            .check_operator(&snippet, &candidate, &['-'], reference)
            .unwrap();
        assert!(verdict.deterministic);

        let strict = MutationHarness::new(
            &tracer,
            HarnessPolicy { shifted_highlight_is_ambiguous: true, ..Default::default() },
        );
        let verdict = strict.check_operator(&snippet, &candidate, &['-'], reference).unwrap();
        assert!(!verdict.deterministic);
        assert_eq!(verdict.rejection, Some(Rejection::ShiftedHighlight { replacement: "-".to_string() }));
    }

    #[test]
    fn test_literal_verification_masks_owner() {
        let tracer = LineTracer::default();
        let harness = MutationHarness::new(&tracer, HarnessPolicy::default());

        // `b` reveals `a`, so the literal is recoverable
        let snippet = Snippet::new("a = 3\nb = a * 2\nc = 0");
        let literal = numeric_literals(&parse_program(snippet.source()).unwrap()).remove(0);
        let StepOutcome::Reached(reference) = tracer.run_to_step(&snippet, 3).unwrap() else {
            panic!("step not reached");
        };
        let verdict = harness.check_literal(&snippet, &literal, 3, &reference).unwrap();
        assert!(verdict.deterministic);

        // nothing else depends on `a`
        let snippet = Snippet::new("a = 3\nb = 7\nc = 0");
        let literal = numeric_literals(&parse_program(snippet.source()).unwrap()).remove(0);
        let StepOutcome::Reached(reference) = tracer.run_to_step(&snippet, 3).unwrap() else {
            panic!("step not reached");
        };
        let verdict = harness.check_literal(&snippet, &literal, 3, &reference).unwrap();
        assert!(!verdict.deterministic);
    }
}
