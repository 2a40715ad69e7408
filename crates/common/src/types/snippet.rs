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

//! Immutable snippet source and column-preserving textual mutation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Position, Site};

/// Errors raised when a mutation site does not index into the snippet
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpliceError {
    /// The line does not exist
    #[error("line {line} is out of range (snippet has {lines} lines)")]
    LineOutOfRange {
        /// Requested 1-based line
        line: usize,
        /// Number of lines in the snippet
        lines: usize,
    },
    /// The columns do not fit on the line
    #[error("columns {site} do not fit a line of {width} characters")]
    ColumnOutOfRange {
        /// Requested site
        site: Site,
        /// Number of characters on the line
        width: usize,
    },
}

/// Source text of one candidate program.
///
/// A snippet is never edited in place: every mutation returns a new snippet
/// whose lines are re-joined with `\n`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Snippet {
    source: String,
}

impl Snippet {
    /// Wrap source text
    pub fn new(source: impl Into<String>) -> Self {
        Self { source: source.into() }
    }

    /// The raw source text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Physical lines, without terminators
    pub fn lines(&self) -> Vec<&str> {
        self.source.lines().collect()
    }

    /// A single 1-based line
    pub fn line(&self, line: usize) -> Option<&str> {
        line.checked_sub(1).and_then(|idx| self.source.lines().nth(idx))
    }

    /// Number of physical lines
    pub fn line_count(&self) -> usize {
        self.source.lines().count()
    }

    /// The snippet without leading or trailing newline characters
    pub fn trimmed(&self) -> Self {
        Self::new(self.source.trim_matches('\n'))
    }

    /// Replace the characters covered by `site` with `replacement`.
    ///
    /// Only the mutated line changes; line count and every other line stay
    /// byte-identical, so positions extracted from the original snippet remain
    /// valid everywhere except to the right of the site on its own line.
    pub fn splice(&self, site: &Site, replacement: &str) -> Result<Self, SpliceError> {
        self.map_line(site.line, |text| {
            let chars: Vec<char> = text.chars().collect();
            if site.columns.start > site.columns.end || site.columns.end > chars.len() {
                return Err(SpliceError::ColumnOutOfRange { site: site.clone(), width: chars.len() });
            }
            let mut out: String = chars[..site.columns.start].iter().collect();
            out.push_str(replacement);
            out.extend(&chars[site.columns.end..]);
            Ok(out)
        })
    }

    /// Replace the single character at `position` with `symbol`
    pub fn replace_char(&self, position: Position, symbol: char) -> Result<Self, SpliceError> {
        let mut buf = [0u8; 4];
        self.splice(&Site::char_at(position), symbol.encode_utf8(&mut buf))
    }

    /// Rewrite one whole line through `f`
    pub fn map_line<F>(&self, line: usize, f: F) -> Result<Self, SpliceError>
    where
        F: FnOnce(&str) -> Result<String, SpliceError>,
    {
        let mut lines = self.lines();
        let total = lines.len();
        let idx = line
            .checked_sub(1)
            .filter(|idx| *idx < total)
            .ok_or(SpliceError::LineOutOfRange { line, lines: total })?;
        let rewritten = f(lines[idx])?;
        lines[idx] = &rewritten;
        Ok(Self::new(lines.join("\n")))
    }
}

impl fmt::Display for Snippet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl AsRef<str> for Snippet {
    fn as_ref(&self) -> &str {
        &self.source
    }
}

impl From<&str> for Snippet {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

impl From<String> for Snippet {
    fn from(source: String) -> Self {
        Self::new(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_char_preserves_layout() {
        let snippet = Snippet::new("a = 5 + 3\nb = a * 2");
        let mutated = snippet.replace_char(Position::new(1, 6), '-').unwrap();
        assert_eq!(mutated.source(), "a = 5 - 3\nb = a * 2");
        assert_eq!(mutated.line_count(), snippet.line_count());
        assert_eq!(mutated.line(2), snippet.line(2));
        // the original is untouched
        assert_eq!(snippet.source(), "a = 5 + 3\nb = a * 2");
    }

    #[test]
    fn test_splice_multi_char_site() {
        let snippet = Snippet::new("x = -12\ny = x");
        let site = Site { line: 1, columns: 4..7 };
        assert_eq!(snippet.splice(&site, "?").unwrap().source(), "x = ?\ny = x");
    }

    #[test]
    fn test_splice_handles_multibyte_characters() {
        let snippet = Snippet::new("s = 'é' + 'b'");
        let mutated = snippet.replace_char(Position::new(1, 8), '*').unwrap();
        assert_eq!(mutated.source(), "s = 'é' * 'b'");
    }

    #[test]
    fn test_splice_out_of_range() {
        let snippet = Snippet::new("x = 1");
        assert!(matches!(
            snippet.replace_char(Position::new(3, 0), '?'),
            Err(SpliceError::LineOutOfRange { line: 3, lines: 1 })
        ));
        assert!(matches!(
            snippet.splice(&Site { line: 1, columns: 4..9 }, "?"),
            Err(SpliceError::ColumnOutOfRange { .. })
        ));
    }

    #[test]
    fn test_trimmed_and_line_access() {
        let snippet = Snippet::new("\n\nx = 1\ny = 2\n");
        let trimmed = snippet.trimmed();
        assert_eq!(trimmed.source(), "x = 1\ny = 2");
        assert_eq!(trimmed.line(1), Some("x = 1"));
        assert_eq!(trimmed.line(0), None);
        assert_eq!(trimmed.line(3), None);
    }
}
