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

//! `stepped-operator`: mask an operator and show a mid-execution snapshot.

use etp_common::Snippet;
use tracing::{debug, trace};

use super::{MutationSettings, Pipeline};
use crate::{
    annotate::{append_label, highlight, mask_operator, operator_label},
    config::SteppedOperatorConfig,
    extract::operators,
    lang::parse_program,
    mutation::{MutationHarness, Reference},
    sampler::Sampler,
    tracer::{verified_lines_till_step, StepOutcome},
    SkipReason, TraceError,
};

/// For sampled steps, emits one masked copy per operator that has already run
/// and that the snapshot pins down; the line about to run is highlighted with
/// the visible bindings and the label is `operator?<symbol>`
#[derive(Debug, Clone)]
pub struct SteppedOperatorPipeline {
    settings: MutationSettings,
    config: SteppedOperatorConfig,
}

impl SteppedOperatorPipeline {
    /// Create the pipeline
    pub fn new(settings: MutationSettings, config: SteppedOperatorConfig) -> Self {
        Self { settings, config }
    }
}

impl Pipeline for SteppedOperatorPipeline {
    fn name(&self) -> &'static str {
        "stepped-operator"
    }

    fn process(&self, snippet: &Snippet, sampler: &mut Sampler) -> Result<Vec<String>, SkipReason> {
        let snippet = snippet.trimmed();
        let tracer = &self.settings.tracer;
        let full = tracer.run(&snippet)?;
        let program = parse_program(snippet.source()).map_err(TraceError::from)?;
        let harness = MutationHarness::new(tracer, self.settings.policy);

        let mut artifacts = Vec::new();
        for step in sampler.sample_steps(1..=full.executed_line_count, self.config.step_limit) {
            let StepOutcome::Reached(snapshot) = tracer.run_to_step(&snippet, step)? else {
                continue;
            };
            let Some(point) = snapshot.step else { continue };
            if snapshot.variables.is_empty() {
                continue;
            }
            let verified = verified_lines_till_step(&full.reached_lines, &point);
            let extraction = operators(&program, &snippet, &verified, self.settings.masking);
            if extraction.dropped > 0 {
                debug!(step, dropped = extraction.dropped, "some operators could not be located");
            }
            let candidates = sampler.choose(extraction.candidates, self.config.candidate_limit);
            trace!(step, candidates = candidates.len(), "checking operators");

            let state = snapshot.variables.to_state().encode();
            for candidate in candidates {
                let verdict = harness.check_operator(
                    &snippet,
                    &candidate,
                    self.settings.alternatives(candidate.symbol),
                    Reference::Step { step, result: &snapshot },
                )?;
                if !verdict.deterministic {
                    continue;
                }
                let masked = mask_operator(&snippet, candidate.position)?;
                let code = highlight(&masked, point.highlighted_line, &state)?;
                artifacts.push(append_label(&code, &operator_label(None, candidate.symbol)));
            }
        }
        Ok(artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn pipeline(config: SteppedOperatorConfig) -> SteppedOperatorPipeline {
        let engine = EngineConfig::default();
        let settings = MutationSettings::from_config(engine.tracer().unwrap(), &engine).unwrap();
        SteppedOperatorPipeline::new(settings, config)
    }

    #[test]
    fn test_operator_before_step() {
        let source = "a = 5 + 3\nb = a\n";
        let config = SteppedOperatorConfig { step_limit: 0, candidate_limit: 0 };
        let artifacts =
            pipeline(config).process(&Snippet::new(source), &mut Sampler::new(Some(0))).unwrap();
        // at step 1 nothing has run yet; at step 2 `a` reveals the operator
        assert_eq!(artifacts, vec!["a = 5 ? 3\n@b = a$a?8\n# operator?+"]);
    }

    #[test]
    fn test_loop_revisit_verifies_current_line() {
        let source = "t = 0\nfor i in range(2):\n    t = t + i";
        let config = SteppedOperatorConfig { step_limit: 0, candidate_limit: 0 };
        let artifacts =
            pipeline(config).process(&Snippet::new(source), &mut Sampler::new(Some(0))).unwrap();
        assert!(!artifacts.is_empty());
        for artifact in &artifacts {
            assert!(artifact.contains("t = t ? i"));
            assert!(artifact.ends_with("\n# operator?+"));
        }
    }

    #[test]
    fn test_empty_snapshot_is_skipped() {
        let source = "if 1 + 1 > 1:\n    print(1)\nprint(2)";
        let config = SteppedOperatorConfig { step_limit: 0, candidate_limit: 0 };
        let artifacts =
            pipeline(config).process(&Snippet::new(source), &mut Sampler::new(Some(0))).unwrap();
        assert!(artifacts.is_empty());
    }

    #[test]
    fn test_step_limit() {
        let source = "a = 1 + 1\nb = a + 1\nc = b + 1\nd = c + 1";
        let config = SteppedOperatorConfig { step_limit: 1, candidate_limit: 1 };
        let artifacts =
            pipeline(config).process(&Snippet::new(source), &mut Sampler::new(Some(5))).unwrap();
        assert!(artifacts.len() <= 1);
    }
}
