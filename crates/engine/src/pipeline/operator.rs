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

//! `operator`: mask operators that the final bindings pin down.

use etp_common::Snippet;
use tracing::debug;

use super::{MutationSettings, Pipeline};
use crate::{
    annotate::{append_label, mask_operator, operator_label},
    extract::operators,
    lang::parse_program,
    mutation::{MutationHarness, Reference},
    sampler::Sampler,
    SkipReason, TraceError,
};

/// Emits one masked copy per deterministic operator, labelled with the final
/// bindings and the operator
#[derive(Debug, Clone)]
pub struct OperatorPipeline {
    settings: MutationSettings,
    candidate_limit: usize,
}

impl OperatorPipeline {
    /// Create the pipeline; `candidate_limit` 0 checks every candidate
    pub fn new(settings: MutationSettings, candidate_limit: usize) -> Self {
        Self { settings, candidate_limit }
    }
}

impl Pipeline for OperatorPipeline {
    fn name(&self) -> &'static str {
        "operator"
    }

    fn process(&self, snippet: &Snippet, sampler: &mut Sampler) -> Result<Vec<String>, SkipReason> {
        let reference = self.settings.tracer.run(snippet)?;
        let program = parse_program(snippet.source()).map_err(TraceError::from)?;
        let extraction =
            operators(&program, snippet, &reference.reached_lines, self.settings.masking);
        if extraction.dropped > 0 {
            debug!(dropped = extraction.dropped, "some operators could not be located");
        }

        let state = reference.variables.to_state();
        let harness = MutationHarness::new(&self.settings.tracer, self.settings.policy);
        let mut artifacts = Vec::new();
        for candidate in sampler.choose(extraction.candidates, self.candidate_limit) {
            let verdict = harness.check_operator(
                snippet,
                &candidate,
                self.settings.alternatives(candidate.symbol),
                Reference::Final(&reference.variables),
            )?;
            if !verdict.deterministic {
                continue;
            }
            let masked = mask_operator(snippet, candidate.position)?;
            artifacts.push(append_label(&masked, &operator_label(Some(&state), candidate.symbol)));
        }
        Ok(artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineConfig, ReplacementPreset};

    fn pipeline(config: &EngineConfig) -> OperatorPipeline {
        let settings = MutationSettings::from_config(config.tracer().unwrap(), config).unwrap();
        OperatorPipeline::new(settings, 0)
    }

    fn process(config: &EngineConfig, source: &str) -> Vec<String> {
        pipeline(config).process(&Snippet::new(source), &mut Sampler::new(Some(1))).unwrap()
    }

    #[test]
    fn test_deterministic_operator_is_masked() {
        let artifacts = process(&EngineConfig::default(), "a = 5 + 3\nb = a - 0");
        assert_eq!(artifacts, vec!["a = 5 ? 3\nb = a - 0\n# a?8;b?8;operator?+"]);
    }

    #[test]
    fn test_unreached_lines_are_not_candidates() {
        let source = "x = 1\nif x > 5:\n    y = x + 1\nz = x - 3";
        let artifacts = process(&EngineConfig::default(), source);
        assert_eq!(artifacts, vec!["x = 1\nif x > 5:\n    y = x + 1\nz = x ? 3\n# x?1;z?-2;operator?-"]);
    }

    #[test]
    fn test_comparison_masking() {
        let mut config = EngineConfig::default();
        config.masking.comparison = true;
        let artifacts = process(&config, "a = 4\nb = a < 2");
        assert_eq!(artifacts, vec!["a = 4\nb = a ? 2\n# a?4;b?False;operator?<"]);
    }

    #[test]
    fn test_symbol_without_alternatives_is_ambiguous() {
        assert!(process(&EngineConfig::default(), "a = 6 * 7").is_empty());

        let mut config = EngineConfig::default();
        config.replacements.preset = ReplacementPreset::Extended;
        assert_eq!(process(&config, "a = 6 * 7"), vec!["a = 6 ? 7\n# a?42;operator?*"]);
    }

    #[test]
    fn test_candidate_limit() {
        let config = EngineConfig::default();
        let settings = MutationSettings::from_config(config.tracer().unwrap(), &config).unwrap();
        let pipeline = OperatorPipeline::new(settings, 1);
        let artifacts = pipeline
            .process(&Snippet::new("a = 5 + 3\nb = a - 1"), &mut Sampler::new(Some(3)))
            .unwrap();
        assert_eq!(artifacts.len(), 1);
    }
}
