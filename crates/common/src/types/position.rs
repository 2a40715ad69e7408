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

//! Source positions.
//!
//! Lines are 1-based and columns are 0-based *character* offsets into a line,
//! so a position can be used directly to splice text without worrying about
//! multi-byte characters.

use std::{fmt, ops::Range};

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// A location in snippet source text
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, Display,
)]
#[display("{line}:{column}")]
pub struct Position {
    /// 1-based line number
    pub line: usize,
    /// 0-based character column
    pub column: usize,
}

impl Position {
    /// Create a new position
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// A half-open source range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// First character of the range
    pub start: Position,
    /// One past the last character of the range
    pub end: Position,
}

impl Span {
    /// Create a new span
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`
    pub fn to(self, other: Self) -> Self {
        Self { start: self.start.min(other.start), end: self.end.max(other.end) }
    }

    /// Whether the span starts and ends on the same line
    pub fn is_single_line(&self) -> bool {
        self.start.line == self.end.line
    }

    /// Convert to a single-line [`Site`], if the span does not cross lines
    pub fn site(&self) -> Option<Site> {
        self.is_single_line().then(|| Site {
            line: self.start.line,
            columns: self.start.column..self.end.column,
        })
    }
}

/// A range of characters on exactly one line: the unit of textual mutation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Site {
    /// 1-based line number
    pub line: usize,
    /// Character columns covered on that line
    pub columns: Range<usize>,
}

impl Site {
    /// A one-character site, as used for operator tokens
    pub fn char_at(position: Position) -> Self {
        Self { line: position.line, columns: position.column..position.column + 1 }
    }

    /// Start position of the site
    pub fn start(&self) -> Position {
        Position::new(self.line, self.columns.start)
    }

    /// Number of characters covered
    pub fn width(&self) -> usize {
        self.columns.len()
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}..{}", self.line, self.columns.start, self.columns.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_join_and_site() {
        let left = Span::new(Position::new(2, 4), Position::new(2, 5));
        let right = Span::new(Position::new(2, 8), Position::new(2, 10));
        let joined = left.to(right);
        assert_eq!(joined.start, Position::new(2, 4));
        assert_eq!(joined.end, Position::new(2, 10));

        let site = joined.site().unwrap();
        assert_eq!(site.line, 2);
        assert_eq!(site.columns, 4..10);
        assert_eq!(site.width(), 6);
    }

    #[test]
    fn test_multi_line_span_has_no_site() {
        let span = Span::new(Position::new(1, 4), Position::new(2, 1));
        assert!(!span.is_single_line());
        assert!(span.site().is_none());
    }

    #[test]
    fn test_position_ordering() {
        assert!(Position::new(1, 9) < Position::new(2, 0));
        assert!(Position::new(3, 1) < Position::new(3, 2));
        assert_eq!(Site::char_at(Position::new(4, 7)).columns, 7..8);
    }
}
