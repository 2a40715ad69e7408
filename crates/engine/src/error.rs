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

//! Error types of the engine.
//!
//! Failures are always local to one snippet (or one mutated variant of it):
//! callers log them and move on.

use std::path::PathBuf;

use derive_more::Display;
use etp_common::{Position, SpliceError};
use thiserror::Error;

/// The snippet (or a variant of it) is not valid snippet-language source
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("SyntaxError: {message} (line {}, column {})", position.line, position.column)]
pub struct ParseError {
    /// What went wrong
    pub message: String,
    /// Where it went wrong
    pub position: Position,
}

impl ParseError {
    /// Create a parse error at `position`
    pub fn new(message: impl Into<String>, position: Position) -> Self {
        Self { message: message.into(), position }
    }
}

/// Category of a runtime failure, named after the exception the snippet
/// language raises
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ErrorKind {
    NameError,
    UnboundLocalError,
    TypeError,
    ZeroDivisionError,
    IndexError,
    KeyError,
    ValueError,
    OverflowError,
    RecursionError,
    AttributeError,
    AssertionError,
    /// The configured line-event budget ran out
    EventBudgetExceeded,
}

impl ErrorKind {
    /// Exception name
    pub fn name(self) -> &'static str {
        match self {
            Self::NameError => "NameError",
            Self::UnboundLocalError => "UnboundLocalError",
            Self::TypeError => "TypeError",
            Self::ZeroDivisionError => "ZeroDivisionError",
            Self::IndexError => "IndexError",
            Self::KeyError => "KeyError",
            Self::ValueError => "ValueError",
            Self::OverflowError => "OverflowError",
            Self::RecursionError => "RecursionError",
            Self::AttributeError => "AttributeError",
            Self::AssertionError => "AssertionError",
            Self::EventBudgetExceeded => "EventBudgetExceeded",
        }
    }
}

/// Execution of a snippet failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message} (line {line})")]
pub struct RuntimeError {
    /// Exception category
    pub kind: ErrorKind,
    /// Exception message
    pub message: String,
    /// Line of the statement that was executing
    pub line: usize,
}

/// A trace could not be produced
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceError {
    /// The source did not parse
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The program raised
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl TraceError {
    /// Short name used to bucket failures in run summaries
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parse(_) => "SyntaxError",
            Self::Runtime(e) => e.kind.name(),
        }
    }
}

/// Why a pipeline produced nothing for a snippet
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SkipReason {
    /// The unmutated snippet failed to parse or run
    #[error("snippet does not run: {0}")]
    Trace(#[from] TraceError),
    /// The snippet has nothing to label
    #[error("snippet has no visible variable bindings")]
    NoBindings,
    /// A mutation site did not index into the snippet
    #[error("failed to mutate snippet: {0}")]
    Splice(#[from] SpliceError),
}

impl SkipReason {
    /// Short name used to bucket skips in run summaries
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Trace(e) => e.kind(),
            Self::NoBindings => "NoBindings",
            Self::Splice(_) => "SpliceError",
        }
    }
}

/// Invalid engine configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read or written
    #[error("failed to access config file {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// The configuration is not valid TOML for [`crate::EngineConfig`]
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// The configuration could not be rendered as TOML
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// A replacement table entry is not a single character
    #[error("invalid replacement entry {entry:?}: operators must be single characters")]
    InvalidReplacement {
        /// Offending table entry
        entry: String,
    },
    /// The configured prelude is not valid source
    #[error("invalid prelude: {0}")]
    Prelude(#[source] ParseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_rendering() {
        let err = RuntimeError {
            kind: ErrorKind::ZeroDivisionError,
            message: "division by zero".to_string(),
            line: 3,
        };
        assert_eq!(err.to_string(), "ZeroDivisionError: division by zero (line 3)");

        let trace: TraceError = err.into();
        assert_eq!(trace.kind(), "ZeroDivisionError");
        assert_eq!(SkipReason::from(trace).kind(), "ZeroDivisionError");

        let parse = ParseError::new("invalid syntax", Position::new(2, 4));
        assert_eq!(parse.to_string(), "SyntaxError: invalid syntax (line 2, column 4)");
        assert_eq!(TraceError::from(parse).kind(), "SyntaxError");
    }
}
