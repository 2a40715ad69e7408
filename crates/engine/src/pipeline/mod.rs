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

//! Corpus pipelines.
//!
//! A pipeline turns one snippet into zero or more training artifacts. Every
//! pipeline first traces the unmutated snippet; a snippet that does not parse
//! or run is skipped as a whole. Pipelines hold no per-snippet state, so one
//! instance can serve many snippets concurrently as long as each call gets its
//! own [`Sampler`].

mod line_count;
mod operator;
mod output;
mod stepped_input;
mod stepped_operator;

use std::{collections::HashMap, fmt, str::FromStr};

use etp_common::Snippet;

pub use line_count::LineCountPipeline;
pub use operator::OperatorPipeline;
pub use output::OutputPipeline;
pub use stepped_input::SteppedInputPipeline;
pub use stepped_operator::SteppedOperatorPipeline;

use crate::{
    config::EngineConfig, extract::OperatorMasking, mutation::HarnessPolicy, sampler::Sampler,
    tracer::LineTracer, ConfigError, SkipReason,
};

/// Transforms one snippet into artifacts
pub trait Pipeline: Send + Sync {
    /// Name used in logs and summaries
    fn name(&self) -> &'static str;

    /// Artifacts for `snippet`; an empty list means the snippet ran but
    /// nothing qualified
    fn process(&self, snippet: &Snippet, sampler: &mut Sampler) -> Result<Vec<String>, SkipReason>;
}

/// The available pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    /// Executed line count
    LineCount,
    /// Final variable bindings
    Output,
    /// Masked operators against the final bindings
    Operator,
    /// Masked numeric literals against a mid-execution snapshot
    SteppedInput,
    /// Masked operators against a mid-execution snapshot
    SteppedOperator,
}

impl PipelineKind {
    /// Every pipeline
    pub const ALL: [Self; 5] =
        [Self::LineCount, Self::Output, Self::Operator, Self::SteppedInput, Self::SteppedOperator];

    /// Command-line name
    pub fn name(self) -> &'static str {
        match self {
            Self::LineCount => "line-count",
            Self::Output => "output",
            Self::Operator => "operator",
            Self::SteppedInput => "stepped-input",
            Self::SteppedOperator => "stepped-operator",
        }
    }

    /// Instantiate the pipeline from `config`
    pub fn build(self, config: &EngineConfig) -> Result<Box<dyn Pipeline>, ConfigError> {
        let tracer = config.tracer()?;
        Ok(match self {
            Self::LineCount => Box::new(LineCountPipeline::new(tracer)),
            Self::Output => Box::new(OutputPipeline::new(tracer)),
            Self::Operator => Box::new(OperatorPipeline::new(
                MutationSettings::from_config(tracer, config)?,
                config.operator.candidate_limit,
            )),
            Self::SteppedInput => Box::new(SteppedInputPipeline::new(
                tracer,
                config.policy,
                config.stepped_input.clone(),
            )),
            Self::SteppedOperator => Box::new(SteppedOperatorPipeline::new(
                MutationSettings::from_config(tracer, config)?,
                config.stepped_operator.clone(),
            )),
        })
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PipelineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("unknown pipeline: {s}"))
    }
}

/// What the operator pipelines share: a tracer plus the rules for choosing
/// and judging operator masks
#[derive(Debug, Clone)]
pub struct MutationSettings {
    /// Runs the snippet and its variants
    pub tracer: LineTracer,
    /// Which operator families are candidates
    pub masking: OperatorMasking,
    /// How inconclusive variants are judged
    pub policy: HarnessPolicy,
    /// Alternatives tried for each operator symbol
    pub replacements: HashMap<char, Vec<char>>,
}

impl MutationSettings {
    /// Settings taken from `config`, running on `tracer`
    pub fn from_config(tracer: LineTracer, config: &EngineConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            tracer,
            masking: config.masking,
            policy: config.policy,
            replacements: config.replacement_table()?,
        })
    }

    /// Alternatives for `symbol`; empty when none are configured
    pub fn alternatives(&self, symbol: char) -> &[char] {
        self.replacements.get(&symbol).map(Vec::as_slice).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_names() {
        for kind in PipelineKind::ALL {
            assert_eq!(kind.name().parse::<PipelineKind>().unwrap(), kind);
        }
        assert!("lines".parse::<PipelineKind>().is_err());
    }

    #[test]
    fn test_build_every_pipeline() {
        let config = EngineConfig::default();
        for kind in PipelineKind::ALL {
            let pipeline = kind.build(&config).unwrap();
            assert_eq!(pipeline.name(), kind.name());
        }
    }

    #[test]
    fn test_build_rejects_bad_replacements() {
        let mut config = EngineConfig::default();
        config.replacements.overrides.insert("+".to_string(), vec!["--".to_string()]);
        assert!(PipelineKind::LineCount.build(&config).is_ok());
        assert!(matches!(
            PipelineKind::Operator.build(&config),
            Err(ConfigError::InvalidReplacement { .. })
        ));
    }
}
