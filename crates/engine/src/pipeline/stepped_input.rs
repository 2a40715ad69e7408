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

//! `stepped-input`: mask a numeric literal and show a later snapshot.

use etp_common::Snippet;
use tracing::{debug, trace};

use super::Pipeline;
use crate::{
    annotate::{append_label, highlight, input_label, mask_literal},
    config::SteppedInputConfig,
    extract::numeric_literals,
    lang::parse_program,
    mutation::{HarnessPolicy, MutationHarness},
    sampler::Sampler,
    tracer::{LineTracer, StepOutcome},
    SkipReason, TraceError,
};

/// Emits the snippet with one literal masked and the line about to run at a
/// sampled step highlighted with the visible bindings, the literal's owning
/// variable masked; labelled `input?<value>`
#[derive(Debug, Clone)]
pub struct SteppedInputPipeline {
    tracer: LineTracer,
    policy: HarnessPolicy,
    config: SteppedInputConfig,
}

impl SteppedInputPipeline {
    /// Create the pipeline
    pub fn new(tracer: LineTracer, policy: HarnessPolicy, config: SteppedInputConfig) -> Self {
        Self { tracer, policy, config }
    }
}

impl Pipeline for SteppedInputPipeline {
    fn name(&self) -> &'static str {
        "stepped-input"
    }

    fn process(&self, snippet: &Snippet, sampler: &mut Sampler) -> Result<Vec<String>, SkipReason> {
        let snippet = snippet.trimmed();
        let count = self.tracer.run(&snippet)?.executed_line_count;
        let program = parse_program(snippet.source()).map_err(TraceError::from)?;
        let literals = sampler.choose(numeric_literals(&program), self.config.literal_limit);
        let harness = MutationHarness::new(&self.tracer, self.policy);

        let mut artifacts = Vec::new();
        for literal in literals {
            let line = literal.site.line;
            if line == count {
                trace!(line, "literal on the last counted line");
                continue;
            }
            let masked_code = mask_literal(&snippet, &literal.site)?;
            for step in sampler.sample_steps(line + 1..=count, self.config.step_limit) {
                let StepOutcome::Reached(result) = self.tracer.run_to_step(&snippet, step)? else {
                    continue;
                };
                let Some(point) = result.step else { continue };
                let state = result.variables.to_state();
                if state.is_empty() {
                    continue;
                }
                if self.config.verify_literals &&
                    !harness.check_literal(&snippet, &literal, step, &result)?.deterministic
                {
                    debug!(step, value = %literal.value, "literal not recoverable at step");
                    continue;
                }

                let state = match &literal.target {
                    Some(target) => state.masked(target),
                    None => state,
                };
                let code = highlight(&masked_code, point.highlighted_line, &state.encode())?;
                artifacts.push(append_label(&code, &input_label(literal.value)));
            }
        }
        Ok(artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline(config: SteppedInputConfig) -> SteppedInputPipeline {
        SteppedInputPipeline::new(LineTracer::default(), HarnessPolicy::default(), config)
    }

    fn all_steps() -> SteppedInputConfig {
        SteppedInputConfig { literal_limit: 0, step_limit: 0, verify_literals: false }
    }

    #[test]
    fn test_stepped_input_artifacts() {
        let source = "\n\na = 3\nb = a + 4\n\n";
        let artifacts =
            pipeline(all_steps()).process(&Snippet::new(source), &mut Sampler::new(Some(0))).unwrap();
        // the literal in `b = a + 4` sits on the last counted line
        assert_eq!(artifacts, vec!["a = ?\n@b = a + 4$a?~\n# input?3"]);
    }

    #[test]
    fn test_literal_operands_and_negatives() {
        let source = "x = -2\ny = x * 5\nz = y";
        let artifacts =
            pipeline(all_steps()).process(&Snippet::new(source), &mut Sampler::new(Some(0))).unwrap();
        assert_eq!(
            artifacts,
            vec![
                "x = ?\n@y = x * 5$x?~\nz = y\n# input?-2",
                "x = ?\ny = x * 5\n@z = y$x?~;y?-10\n# input?-2",
                "x = -2\ny = x * ?\n@z = y$x?-2;y?~\n# input?5",
            ]
        );
    }

    #[test]
    fn test_step_limit_bounds_artifacts() {
        let source = "a = 1\nb = 2\nc = 3\nd = 4\ne = a";
        let config = SteppedInputConfig { literal_limit: 1, step_limit: 2, verify_literals: false };
        let artifacts =
            pipeline(config).process(&Snippet::new(source), &mut Sampler::new(Some(9))).unwrap();
        assert!(!artifacts.is_empty());
        assert!(artifacts.len() <= 2);
        for artifact in &artifacts {
            assert!(artifact.contains(" = ?"));
            assert!(artifact.contains("\n# input?"));
        }
    }

    #[test]
    fn test_verified_literals() {
        // nothing reads `b`, so its literal never shows in the other bindings
        let source = "a = 3\nb = 4\nc = a * 2\nd = c";
        let config = SteppedInputConfig { literal_limit: 0, step_limit: 0, verify_literals: true };
        let artifacts =
            pipeline(config).process(&Snippet::new(source), &mut Sampler::new(Some(0))).unwrap();
        assert_eq!(artifacts, vec!["a = ?\nb = 4\nc = a * 2\n@d = c$a?~;b?4;c?6\n# input?3"]);
    }
}
