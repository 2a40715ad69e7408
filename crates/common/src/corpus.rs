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

//! Corpus text handling.
//!
//! A corpus is plain text holding snippets separated by one blank line
//! (`\n\n`), with no escaping. Generated artifacts are written back in the
//! same shape. Alongside the artifacts a run can emit a per-snippet log
//! (`<index> <artifact count>` per line) and a JSON summary.

use std::{collections::BTreeMap, fs, path::Path};

use derive_more::Display;
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};

use crate::Snippet;

/// Separator between snippets in corpus input and between artifacts in output
pub const SNIPPET_SEPARATOR: &str = "\n\n";

/// Split corpus text into snippets, keeping empty pieces so indices line up
/// with the input.
pub fn split_snippets(text: &str) -> Vec<Snippet> {
    text.split(SNIPPET_SEPARATOR).map(Snippet::from).collect()
}

/// Join artifacts with the corpus separator
pub fn join_artifacts<S: AsRef<str>>(artifacts: &[S]) -> String {
    artifacts.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(SNIPPET_SEPARATOR)
}

/// Read and split a corpus file
pub fn read_corpus(path: &Path) -> Result<Vec<Snippet>> {
    let text = fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read corpus from {}", path.display()))?;
    Ok(split_snippets(&text))
}

/// Write artifacts to `path`, joined with the corpus separator
pub fn write_artifacts<S: AsRef<str>>(path: &Path, artifacts: &[S]) -> Result<()> {
    fs::write(path, join_artifacts(artifacts))
        .wrap_err_with(|| format!("Failed to write artifacts to {}", path.display()))
}

/// One line of the per-snippet log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[display("{index} {artifacts}")]
pub struct LogEntry {
    /// 0-based snippet index in the corpus
    pub index: usize,
    /// Number of artifacts produced from the snippet (0 when skipped)
    pub artifacts: usize,
}

/// Render log entries, one per line, without a trailing newline
pub fn render_log(entries: &[LogEntry]) -> String {
    entries.iter().map(LogEntry::to_string).collect::<Vec<_>>().join("\n")
}

/// Aggregate numbers for one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Pipeline name
    pub pipeline: String,
    /// Snippets read from the corpus
    pub snippets: usize,
    /// Snippets that produced at least one artifact
    pub accepted: usize,
    /// Snippets that failed to parse or execute, or produced nothing
    pub skipped: usize,
    /// Total artifacts written
    pub artifacts: usize,
    /// Skip reasons keyed by error kind
    pub errors: BTreeMap<String, usize>,
}

impl RunSummary {
    /// Empty summary for `pipeline`
    pub fn new(pipeline: impl Into<String>) -> Self {
        Self { pipeline: pipeline.into(), ..Default::default() }
    }

    /// Account for a snippet that produced `artifacts` artifacts
    pub fn record_accepted(&mut self, artifacts: usize) {
        self.snippets += 1;
        if artifacts == 0 {
            self.skipped += 1;
            *self.errors.entry("NoArtifacts".to_string()).or_default() += 1;
        } else {
            self.accepted += 1;
            self.artifacts += artifacts;
        }
    }

    /// Account for a snippet skipped because of `reason`
    pub fn record_skipped(&mut self, reason: impl Into<String>) {
        self.snippets += 1;
        self.skipped += 1;
        *self.errors.entry(reason.into()).or_default() += 1;
    }

    /// Write the summary as pretty JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .wrap_err_with(|| format!("Failed to write summary to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_keeps_indices() {
        let snippets = split_snippets("a = 1\nb = 2\n\nc = 3\n\n\n\nd = 4");
        let sources: Vec<_> = snippets.iter().map(Snippet::source).collect();
        assert_eq!(sources, vec!["a = 1\nb = 2", "c = 3", "", "d = 4"]);
    }

    #[test]
    fn test_join_artifacts() {
        assert_eq!(join_artifacts(&["x = 1\n# count?1", "y = 2\n# count?1"]), "x = 1\n# count?1\n\ny = 2\n# count?1");
        assert_eq!(join_artifacts::<&str>(&[]), "");
    }

    #[test]
    fn test_corpus_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("corpus.txt");
        fs::write(&input, "x = 1\n\ny = 2\nz = y").unwrap();
        let snippets = read_corpus(&input).unwrap();
        assert_eq!(snippets.len(), 2);
        assert_eq!(snippets[1].line_count(), 2);

        let output = dir.path().join("out.txt");
        write_artifacts(&output, &["x = 1\n# count?1"]).unwrap();
        assert_eq!(fs::read_to_string(&output).unwrap(), "x = 1\n# count?1");

        let summary_path = dir.path().join("summary.json");
        RunSummary::new("line-count").write_json(&summary_path).unwrap();
        let written: RunSummary =
            serde_json::from_str(&fs::read_to_string(&summary_path).unwrap()).unwrap();
        assert_eq!(written, RunSummary::new("line-count"));

        assert!(read_corpus(&dir.path().join("missing.txt")).is_err());
    }

    #[test]
    fn test_render_log() {
        let entries = [LogEntry { index: 0, artifacts: 3 }, LogEntry { index: 1, artifacts: 0 }];
        assert_eq!(render_log(&entries), "0 3\n1 0");
        assert_eq!(render_log(&[]), "");
    }

    #[test]
    fn test_summary_accounting() {
        let mut summary = RunSummary::new("operator");
        summary.record_accepted(2);
        summary.record_accepted(0);
        summary.record_skipped("SyntaxError");
        summary.record_skipped("SyntaxError");

        assert_eq!(summary.snippets, 4);
        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.skipped, 3);
        assert_eq!(summary.artifacts, 2);
        assert_eq!(summary.errors.get("SyntaxError"), Some(&2));
        assert_eq!(summary.errors.get("NoArtifacts"), Some(&1));

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["pipeline"], "operator");
        assert_eq!(json["artifacts"], 2);
    }
}
