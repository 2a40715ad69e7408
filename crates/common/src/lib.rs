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

//! ETP Common - Shared functionality for ETP components
//!
//! This crate provides the pieces shared by the execution engine and the
//! `etp` binary: source positions, snippets, candidate descriptions, the
//! `name?value` label encoding, corpus splitting/joining and logging setup.

/// Core data types shared across the ETP workspace
pub mod types;

/// Reading and writing corpus text (double-newline separated snippets)
pub mod corpus;
/// Logging setup and utilities for consistent logging across ETP components
pub mod logging;

pub use corpus::*;
pub use logging::*;
pub use types::*;
