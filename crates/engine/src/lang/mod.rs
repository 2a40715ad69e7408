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

//! Front end of the snippet language: tokens, syntax tree, parser, traversal.

mod ast;
mod parser;
pub mod scope;
mod token;
pub mod visitor;

pub use ast::*;
pub use parser::parse_program;
pub use token::{tokenize, Token, TokenKind, KEYWORDS};
pub use visitor::{walk_block, walk_expr, walk_program, walk_stmt, Visitor, VisitorAction};
