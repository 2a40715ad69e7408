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

//! ETP Engine - tracing and mutation analysis of snippets
//!
//! The engine parses and runs snippets of a small Python-like language under a
//! per-run line hook, extracts maskable tokens, checks whether a masked token
//! can be recovered from the execution, and renders training artifacts through
//! the corpus [`pipeline`]s.

pub mod annotate;
pub use annotate::*;

pub mod config;
pub use config::*;

pub mod error;
pub use error::*;

pub mod extract;
pub use extract::*;

pub mod interp;
pub mod lang;

pub mod mutation;
pub use mutation::*;

pub mod pipeline;
pub use pipeline::*;

pub mod sampler;
pub use sampler::*;

pub mod tracer;
pub use tracer::*;
