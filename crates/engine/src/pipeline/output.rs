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

//! `output`: label a snippet with its final variable bindings.

use etp_common::Snippet;

use super::Pipeline;
use crate::{
    annotate::{append_label, state_label},
    sampler::Sampler,
    tracer::LineTracer,
    SkipReason,
};

/// Emits `<snippet>\n# name1?value1;name2?value2;...`
#[derive(Debug, Clone)]
pub struct OutputPipeline {
    tracer: LineTracer,
}

impl OutputPipeline {
    /// Create the pipeline
    pub fn new(tracer: LineTracer) -> Self {
        Self { tracer }
    }
}

impl Pipeline for OutputPipeline {
    fn name(&self) -> &'static str {
        "output"
    }

    fn process(&self, snippet: &Snippet, _sampler: &mut Sampler) -> Result<Vec<String>, SkipReason> {
        let result = self.tracer.run(snippet)?;
        if result.variables.is_empty() {
            return Err(SkipReason::NoBindings);
        }
        Ok(vec![append_label(snippet, &state_label(&result.variables.to_state()))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::ExecutionLimits;

    fn process(tracer: LineTracer, source: &str) -> Result<Vec<String>, SkipReason> {
        OutputPipeline::new(tracer).process(&Snippet::new(source), &mut Sampler::new(Some(0)))
    }

    #[test]
    fn test_final_state_artifact() {
        let source = "b = [1, 2]\na = len(b) + 6\nb.append(a)\nsquares = [n * n for n in b]";
        assert_eq!(
            process(LineTracer::default(), source).unwrap(),
            vec![format!("{source}\n# b?[1, 2, 8];a?8;squares?[1, 4, 64]")]
        );
    }

    #[test]
    fn test_snippet_without_bindings_is_skipped() {
        assert_eq!(process(LineTracer::default(), "print(1 + 2)"), Err(SkipReason::NoBindings));
    }

    #[test]
    fn test_prelude_names_are_not_reported() {
        let tracer =
            LineTracer::new(Some("offset = 10\n".to_string()), ExecutionLimits::default()).unwrap();
        assert_eq!(process(tracer, "x = offset + 1").unwrap(), vec!["x = offset + 1\n# x?11"]);
    }
}
