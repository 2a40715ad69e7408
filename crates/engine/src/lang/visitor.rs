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

//! Depth-first traversal over the syntax tree.

use super::ast::{Expr, ExprKind, Program, Stmt, StmtKind};

/// What the walker should do after visiting a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitorAction {
    /// Descend into the node's children
    Continue,
    /// Do not visit the node's children
    SkipSubtree,
}

/// Callbacks invoked by [`walk_program`] in source order
pub trait Visitor {
    /// Called before a statement's children are visited
    fn visit_stmt(&mut self, _stmt: &Stmt) -> VisitorAction {
        VisitorAction::Continue
    }

    /// Called before an expression's children are visited
    fn visit_expr(&mut self, _expr: &Expr) -> VisitorAction {
        VisitorAction::Continue
    }
}

/// Walk every statement of a program
pub fn walk_program<V: Visitor + ?Sized>(visitor: &mut V, program: &Program) {
    walk_block(visitor, &program.body);
}

/// Walk a statement list
pub fn walk_block<V: Visitor + ?Sized>(visitor: &mut V, stmts: &[Stmt]) {
    for stmt in stmts {
        walk_stmt(visitor, stmt);
    }
}

/// Walk a statement and its children
pub fn walk_stmt<V: Visitor + ?Sized>(visitor: &mut V, stmt: &Stmt) {
    if visitor.visit_stmt(stmt) == VisitorAction::SkipSubtree {
        return;
    }

    match &stmt.kind {
        StmtKind::Expr(expr) => walk_expr(visitor, expr),
        StmtKind::Assign { targets, value } => {
            for target in targets {
                walk_expr(visitor, target);
            }
            walk_expr(visitor, value);
        }
        StmtKind::AugAssign { target, value, .. } => {
            walk_expr(visitor, target);
            walk_expr(visitor, value);
        }
        StmtKind::If { test, body, orelse } | StmtKind::While { test, body, orelse } => {
            walk_expr(visitor, test);
            walk_block(visitor, body);
            walk_block(visitor, orelse);
        }
        StmtKind::For { target, iter, body, orelse } => {
            walk_expr(visitor, target);
            walk_expr(visitor, iter);
            walk_block(visitor, body);
            walk_block(visitor, orelse);
        }
        StmtKind::Return(value) => {
            if let Some(value) = value {
                walk_expr(visitor, value);
            }
        }
        StmtKind::Assert { test, msg } => {
            walk_expr(visitor, test);
            if let Some(msg) = msg {
                walk_expr(visitor, msg);
            }
        }
        StmtKind::FunctionDef(def) => {
            for default in def.params.iter().filter_map(|p| p.default.as_ref()) {
                walk_expr(visitor, default);
            }
            walk_block(visitor, &def.body);
        }
        StmtKind::Break | StmtKind::Continue | StmtKind::Pass => {}
    }
}

/// Walk an expression and its children
pub fn walk_expr<V: Visitor + ?Sized>(visitor: &mut V, expr: &Expr) {
    if visitor.visit_expr(expr) == VisitorAction::SkipSubtree {
        return;
    }

    match &expr.kind {
        ExprKind::Int(_)
        | ExprKind::Float(_)
        | ExprKind::Str(_)
        | ExprKind::Bool(_)
        | ExprKind::NoneLit
        | ExprKind::Name { .. } => {}
        ExprKind::List(items) | ExprKind::Tuple(items) => {
            for item in items {
                walk_expr(visitor, item);
            }
        }
        ExprKind::Dict(pairs) => {
            for (key, value) in pairs {
                walk_expr(visitor, key);
                walk_expr(visitor, value);
            }
        }
        ExprKind::Comprehension { element, generators, .. } => {
            walk_expr(visitor, element);
            for generator in generators {
                walk_expr(visitor, &generator.target);
                walk_expr(visitor, &generator.iter);
                for cond in &generator.conds {
                    walk_expr(visitor, cond);
                }
            }
        }
        ExprKind::Subscript { value, index } => {
            walk_expr(visitor, value);
            walk_expr(visitor, index);
        }
        ExprKind::Slice { lower, upper, step } => {
            for bound in [lower, upper, step].into_iter().flatten() {
                walk_expr(visitor, bound);
            }
        }
        ExprKind::Call { func, args, keywords } => {
            walk_expr(visitor, func);
            for arg in args {
                walk_expr(visitor, arg);
            }
            for keyword in keywords {
                walk_expr(visitor, &keyword.value);
            }
        }
        ExprKind::Attribute { value, .. } => walk_expr(visitor, value),
        ExprKind::Unary { operand, .. } => walk_expr(visitor, operand),
        ExprKind::Binary { left, right, .. } => {
            walk_expr(visitor, left);
            walk_expr(visitor, right);
        }
        ExprKind::Compare { left, comparators, .. } => {
            walk_expr(visitor, left);
            for comparator in comparators {
                walk_expr(visitor, comparator);
            }
        }
        ExprKind::Logical { values, .. } => {
            for value in values {
                walk_expr(visitor, value);
            }
        }
        ExprKind::IfExp { test, body, orelse } => {
            walk_expr(visitor, body);
            walk_expr(visitor, test);
            walk_expr(visitor, orelse);
        }
    }
}
