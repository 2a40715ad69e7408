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

//! `line-count`: label a snippet with its executed line count.

use etp_common::Snippet;
use tracing::trace;

use super::Pipeline;
use crate::{
    annotate::{append_label, count_label},
    sampler::Sampler,
    tracer::LineTracer,
    SkipReason,
};

/// Emits `<snippet>\n# count?<n>`
#[derive(Debug, Clone)]
pub struct LineCountPipeline {
    tracer: LineTracer,
}

impl LineCountPipeline {
    /// Create the pipeline
    pub fn new(tracer: LineTracer) -> Self {
        Self { tracer }
    }
}

impl Pipeline for LineCountPipeline {
    fn name(&self) -> &'static str {
        "line-count"
    }

    fn process(&self, snippet: &Snippet, _sampler: &mut Sampler) -> Result<Vec<String>, SkipReason> {
        let result = self.tracer.run(snippet)?;
        trace!(count = result.executed_line_count, "traced snippet");
        Ok(vec![append_label(snippet, &count_label(result.executed_line_count))])
    }
}
