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

//! Static candidate extraction.
//!
//! Everything here works on the syntax tree of the unmutated snippet and is
//! deterministic: the same source always yields the same candidates in the
//! same order.

use std::collections::BTreeSet;

use etp_common::{
    AssignmentTarget, Candidate, CandidateKind, LiteralCandidate, Number, OperatorCandidate,
    OperatorKind, Position, Snippet, Span,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    lang::{
        parse_program, walk_program, Expr, ExprContext, ExprKind, Program, Stmt, StmtKind, UnaryOp,
        Visitor, VisitorAction,
    },
    ParseError,
};

/// Which operator families are eligible for masking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorMasking {
    /// Binary arithmetic operators
    pub arithmetic: bool,
    /// The first operator of comparison chains
    pub comparison: bool,
}

impl Default for OperatorMasking {
    fn default() -> Self {
        Self { arithmetic: true, comparison: false }
    }
}

/// Every name that receives a value, ordered by first store
pub fn assignment_targets(program: &Program) -> Vec<AssignmentTarget> {
    let mut collector = StoreCollector::default();
    walk_program(&mut collector, program);
    collector.stores.sort_by_key(|(position, _)| *position);

    let mut targets: Vec<AssignmentTarget> = Vec::new();
    for (position, name) in collector.stores {
        if targets.iter().all(|target| target.name != name) {
            targets.push(AssignmentTarget { name, order: targets.len(), position });
        }
    }
    targets
}

#[derive(Default)]
struct StoreCollector {
    stores: Vec<(Position, String)>,
}

impl Visitor for StoreCollector {
    fn visit_expr(&mut self, expr: &Expr) -> VisitorAction {
        if let ExprKind::Name { id, ctx: ExprContext::Store } = &expr.kind {
            self.stores.push((expr.span.start, id.clone()));
        }
        VisitorAction::Continue
    }
}

/// Operator candidates and how many operators could not be located
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperatorExtraction {
    /// Located operators, ordered by position
    pub candidates: Vec<OperatorCandidate>,
    /// Operators skipped because their column could not be determined
    pub dropped: usize,
}

/// Locate maskable operators on the `verified` lines of `snippet`
pub fn operators(
    program: &Program,
    snippet: &Snippet,
    verified: &BTreeSet<usize>,
    masking: OperatorMasking,
) -> OperatorExtraction {
    let mut collector = OperatorCollector { masking, verified, nodes: Vec::new() };
    walk_program(&mut collector, program);

    let mut extraction = OperatorExtraction::default();
    for node in collector.nodes {
        match locate_operator(snippet, node.left, node.right) {
            Some(position) => {
                let Some(symbol) =
                    snippet.line(position.line).and_then(|text| text.chars().nth(position.column))
                else {
                    extraction.dropped += 1;
                    continue;
                };
                extraction.candidates.push(OperatorCandidate { symbol, position, kind: node.kind });
            }
            None => {
                debug!(line = node.line, "dropping operator with ambiguous location");
                extraction.dropped += 1;
            }
        }
    }
    extraction.candidates.sort_by_key(|candidate| candidate.position);
    extraction
}

/// Operands of one binary or comparison node
struct OperatorNode {
    kind: OperatorKind,
    line: usize,
    left: Span,
    right: Span,
}

struct OperatorCollector<'a> {
    masking: OperatorMasking,
    verified: &'a BTreeSet<usize>,
    nodes: Vec<OperatorNode>,
}

impl Visitor for OperatorCollector<'_> {
    fn visit_expr(&mut self, expr: &Expr) -> VisitorAction {
        let line = expr.span.start.line;
        if !self.verified.contains(&line) {
            return VisitorAction::Continue;
        }
        match &expr.kind {
            ExprKind::Binary { left, right, .. } if self.masking.arithmetic => {
                self.nodes.push(OperatorNode {
                    kind: OperatorKind::Arithmetic,
                    line,
                    left: left.span,
                    right: right.span,
                });
            }
            ExprKind::Compare { left, comparators, .. } if self.masking.comparison => {
                if let Some(first) = comparators.first() {
                    self.nodes.push(OperatorNode {
                        kind: OperatorKind::Comparison,
                        line,
                        left: left.span,
                        right: first.span,
                    });
                }
            }
            _ => {}
        }
        VisitorAction::Continue
    }
}

/// First non-whitespace character between the two operands, when both
/// operands meet on one line
fn locate_operator(snippet: &Snippet, left: Span, right: Span) -> Option<Position> {
    if left.end.line != right.start.line || left.end.column >= right.start.column {
        return None;
    }
    let text = snippet.line(left.end.line)?;
    text.chars()
        .enumerate()
        .skip(left.end.column)
        .take(right.start.column - left.end.column)
        .find(|(_, c)| !c.is_whitespace())
        .map(|(column, _)| Position::new(left.end.line, column))
}

/// Numeric literals feeding the leading run of top-level assignments.
///
/// Extraction stops at the first top-level statement that is not a plain
/// assignment.
pub fn numeric_literals(program: &Program) -> Vec<LiteralCandidate> {
    let mut literals = Vec::new();
    for stmt in &program.body {
        let Stmt { kind: StmtKind::Assign { targets, value }, .. } = stmt else {
            break;
        };
        let target = match targets.as_slice() {
            [Expr { kind: ExprKind::Name { id, .. }, .. }] => Some(id.clone()),
            _ => None,
        };

        let operands: Vec<&Expr> = match &value.kind {
            ExprKind::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            _ => vec![value],
        };
        for operand in operands {
            let Some(number) = literal_value(operand) else {
                continue;
            };
            if let Some(site) = operand.span.site() {
                literals.push(LiteralCandidate { value: number, site, target: target.clone() });
            }
        }
    }
    literals
}

/// Value of a numeric literal, optionally behind a unary minus
fn literal_value(expr: &Expr) -> Option<Number> {
    match &expr.kind {
        ExprKind::Int(v) => Some(Number::Int(*v)),
        ExprKind::Float(v) => Some(Number::Float(*v)),
        ExprKind::Unary { op: UnaryOp::Neg, operand } => match operand.kind {
            ExprKind::Int(v) => Number::Int(v).negated(),
            ExprKind::Float(v) => Number::Float(v).negated(),
            _ => None,
        },
        _ => None,
    }
}

/// Candidates of one family, parsed from `snippet`; operators are limited to
/// the `verified` lines
pub fn extract(
    snippet: &Snippet,
    kind: CandidateKind,
    verified: &BTreeSet<usize>,
    masking: OperatorMasking,
) -> Result<Vec<Candidate>, ParseError> {
    let program = parse_program(snippet.source())?;
    let candidates = match kind {
        CandidateKind::AssignmentTarget => {
            assignment_targets(&program).into_iter().map(Candidate::AssignmentTarget).collect()
        }
        CandidateKind::Operator => operators(&program, snippet, verified, masking)
            .candidates
            .into_iter()
            .map(Candidate::Operator)
            .collect(),
        CandidateKind::NumericLiteral => {
            numeric_literals(&program).into_iter().map(Candidate::NumericLiteral).collect()
        }
    };
    Ok(candidates)
}
