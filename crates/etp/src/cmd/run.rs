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

//! Pipeline command: corpus in, artifacts out

use std::{fs, path::Path, sync::Arc};

use etp_common::{read_corpus, render_log, write_artifacts, LogEntry, RunSummary};
use etp_engine::{EngineConfig, PipelineKind, Sampler, SkipReason};
use eyre::{Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, info};

use crate::RunArgs;

/// Worker stack size; deeply nested snippets recurse in the evaluator
const WORKER_STACK_SIZE: usize = 16 * 1024 * 1024;

/// Run `kind` over the corpus named in `args`
pub fn run_pipeline(kind: PipelineKind, args: &RunArgs, config: &EngineConfig, jobs: usize) -> Result<()> {
    let snippets = read_corpus(&args.input)?;
    let pipeline = kind.build(config).wrap_err("Invalid pipeline configuration")?;
    let seed = config.sampling.seed;
    info!("Loaded {} snippets from {}", snippets.len(), args.input.display());

    let progress_bar = Arc::new(ProgressBar::new(snippets.len() as u64));
    progress_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} 🧪 Tracing snippets [{bar:40.cyan/blue}] {pos:>3}/{len:3} {msg}",
        )?
        .progress_chars("🟩🟦⬜")
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    progress_bar.set_message(kind.to_string());

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .stack_size(WORKER_STACK_SIZE)
        .build()
        .wrap_err("Failed to start worker pool")?;

    // Parallel process all snippets; results keep corpus order
    let results: Vec<Result<Vec<String>, SkipReason>> = pool.install(|| {
        snippets
            .par_iter()
            .enumerate()
            .map(|(index, snippet)| {
                let pb = progress_bar.clone();
                let mut sampler = Sampler::new(seed.map(|seed| seed.wrapping_add(index as u64)));
                let result = pipeline.process(snippet, &mut sampler);
                if let Err(reason) = &result {
                    debug!(index, %reason, "skipping snippet");
                }
                pb.inc(1);
                result
            })
            .collect()
    });

    let mut summary = RunSummary::new(kind.name());
    let mut entries = Vec::with_capacity(results.len());
    let mut artifacts = Vec::new();
    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(produced) => {
                summary.record_accepted(produced.len());
                entries.push(LogEntry { index, artifacts: produced.len() });
                artifacts.extend(produced);
            }
            Err(reason) => {
                summary.record_skipped(reason.kind());
                entries.push(LogEntry { index, artifacts: 0 });
            }
        }
    }

    progress_bar.finish_with_message(format!(
        "✨ Done! {} artifacts from {} of {} snippets",
        summary.artifacts, summary.accepted, summary.snippets
    ));

    write_artifacts(&args.output, &artifacts)?;
    if let Some(path) = &args.log {
        write_log(path, &entries)?;
    }
    if let Some(path) = &args.summary {
        summary.write_json(path)?;
    }
    info!(
        "Wrote {} artifacts to {} ({} snippets skipped)",
        summary.artifacts,
        args.output.display(),
        summary.skipped
    );
    Ok(())
}

fn write_log(path: &Path, entries: &[LogEntry]) -> Result<()> {
    fs::write(path, render_log(entries))
        .wrap_err_with(|| format!("Failed to write log to {}", path.display()))
}
