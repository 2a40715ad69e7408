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

//! Maskable tokens extracted from a snippet.

use serde::{Deserialize, Serialize};

use super::{Number, Position, Site};

/// Which family of candidates to extract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandidateKind {
    /// Names that receive a value
    AssignmentTarget,
    /// Binary arithmetic and comparison operators
    Operator,
    /// Numeric literals feeding top-level assignments
    NumericLiteral,
}

/// A variable that is assigned somewhere in the snippet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentTarget {
    /// Variable name
    pub name: String,
    /// Rank by first appearance (0 is the earliest)
    pub order: usize,
    /// Position of the first store
    pub position: Position,
}

/// Whether an operator belongs to an arithmetic or a comparison node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorKind {
    /// `+ - * / // % ** & | ^ << >>`
    Arithmetic,
    /// `< > <= >= == != in is ...`
    Comparison,
}

/// A single operator character located in the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorCandidate {
    /// The character found at the operator column (`<=` yields `<`)
    pub symbol: char,
    /// Exact location of that character
    pub position: Position,
    /// Node family the operator came from
    pub kind: OperatorKind,
}

impl OperatorCandidate {
    /// The one-character site a substitution must replace
    pub fn site(&self) -> Site {
        Site::char_at(self.position)
    }
}

/// A numeric literal that can be masked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteralCandidate {
    /// Value of the literal, including a leading unary minus
    pub value: Number,
    /// Source characters covered by the literal
    pub site: Site,
    /// The assignment target the literal feeds, when it is a single name
    pub target: Option<String>,
}

/// Any maskable token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Candidate {
    /// See [`AssignmentTarget`]
    AssignmentTarget(AssignmentTarget),
    /// See [`OperatorCandidate`]
    Operator(OperatorCandidate),
    /// See [`LiteralCandidate`]
    NumericLiteral(LiteralCandidate),
}

impl Candidate {
    /// The family this candidate belongs to
    pub fn kind(&self) -> CandidateKind {
        match self {
            Self::AssignmentTarget(_) => CandidateKind::AssignmentTarget,
            Self::Operator(_) => CandidateKind::Operator,
            Self::NumericLiteral(_) => CandidateKind::NumericLiteral,
        }
    }

    /// Where the candidate starts in the source
    pub fn position(&self) -> Position {
        match self {
            Self::AssignmentTarget(t) => t.position,
            Self::Operator(o) => o.position,
            Self::NumericLiteral(l) => l.site.start(),
        }
    }
}
