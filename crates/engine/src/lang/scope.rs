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

//! Static scope layout: which names a frame binds, in first-appearance order.

use etp_common::Position;

use super::{
    ast::{Expr, ExprContext, ExprKind, Param, Stmt, StmtKind},
    visitor::{walk_block, Visitor, VisitorAction},
};

/// Names bound by a frame executing `body`: `params` first, then every other
/// store target and nested `def` name ordered by position, without
/// duplicates. Comprehension variables and nested function bodies belong to
/// other frames and are not included.
pub fn frame_locals(params: &[Param], body: &[Stmt]) -> Vec<String> {
    let mut collector = LocalCollector::default();
    walk_block(&mut collector, body);
    collector.found.sort_by_key(|(position, _)| *position);

    let mut names: Vec<String> = params.iter().map(|p| p.name.clone()).collect();
    for (_, name) in collector.found {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

#[derive(Default)]
struct LocalCollector {
    found: Vec<(Position, String)>,
}

impl Visitor for LocalCollector {
    fn visit_stmt(&mut self, stmt: &Stmt) -> VisitorAction {
        if let StmtKind::FunctionDef(def) = &stmt.kind {
            self.found.push((def.name_span.start, def.name.clone()));
            return VisitorAction::SkipSubtree;
        }
        VisitorAction::Continue
    }

    fn visit_expr(&mut self, expr: &Expr) -> VisitorAction {
        match &expr.kind {
            ExprKind::Comprehension { .. } => VisitorAction::SkipSubtree,
            ExprKind::Name { id, ctx: ExprContext::Store } => {
                self.found.push((expr.span.start, id.clone()));
                VisitorAction::Continue
            }
            _ => VisitorAction::Continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::lang::parse_program;

    #[test]
    fn test_module_locals_order() {
        let program = parse_program("b = 1\na, c = 2, 3\nfor i in range(2):\n    b += i\ndef f(x):\n    y = x\n").unwrap();
        assert_eq!(program.locals, vec!["b", "a", "c", "i", "f"]);
    }

    #[test]
    fn test_function_locals_start_with_params() {
        let program = parse_program("def f(x, y=2):\n    z = [k for k in range(x)]\n    x = z\n    return x").unwrap();
        let crate::lang::StmtKind::FunctionDef(def) = &program.body[0].kind else {
            panic!("expected a function definition");
        };
        assert_eq!(def.locals, vec!["x", "y", "z"]);
    }
}
