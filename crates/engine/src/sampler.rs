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

//! Random selection of steps and candidates.

use std::ops::RangeInclusive;

use rand::{rngs::StdRng, seq::index, SeedableRng};

/// Selects bounded random subsets without replacement
#[derive(Debug, Clone)]
pub struct Sampler {
    rng: StdRng,
}

impl Sampler {
    /// Create a sampler; a seed makes every selection reproducible
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        Self { rng }
    }

    /// Steps from `range`: all of them in order when `limit` is 0 or covers
    /// the range, otherwise `limit` distinct steps in random order
    pub fn sample_steps(&mut self, range: RangeInclusive<usize>, limit: usize) -> Vec<usize> {
        let start = *range.start();
        let len = range.clone().count();
        if limit == 0 || limit >= len {
            return range.collect();
        }
        index::sample(&mut self.rng, len, limit).into_iter().map(|i| start + i).collect()
    }

    /// Up to `limit` items (all when `limit` is 0), with the same rules as
    /// [`Self::sample_steps`]
    pub fn choose<T>(&mut self, items: Vec<T>, limit: usize) -> Vec<T> {
        if limit == 0 || limit >= items.len() {
            return items;
        }
        let picked = index::sample(&mut self.rng, items.len(), limit);
        let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
        picked.into_iter().filter_map(|i| slots[i].take()).collect()
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new(None)
    }
}
