// Copyright 2019 Karl Sundequist Blomdahl <karl.sundequist.blomdahl@gmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The knobs a search call can tune, separate from the process-wide
//! defaults in `kr_utils::config` so an embedding application can override
//! them per call (e.g. a per-move thread or iteration budget) without
//! touching global state.

#[derive(Clone, Debug)]
pub struct SearchOptions {
    pub num_workers: usize,
    pub max_iterations: Option<i32>,
    pub max_msec: Option<u64>,
    pub expand_threshold: i32,
    pub uct_exp_root: f32,
    pub uct_exp: f32,
    pub max_cnn_depth: usize,
    pub virtual_loss: i32,
    /// Disables the per-worker RNG's entropy seeding in favour of a fixed
    /// seed, so the same position always searches to the same tree.
    pub deterministic: bool,
}

impl SearchOptions {
    pub fn new() -> Self {
        SearchOptions {
            num_workers: *kr_utils::config::NUM_THREADS,
            max_iterations: Some(*kr_utils::config::NUM_ROLLOUT as i32),
            max_msec: None,
            expand_threshold: *kr_utils::config::EXPAND_THRESHOLD,
            uct_exp_root: *kr_utils::config::UCT_EXP_ROOT,
            uct_exp: *kr_utils::config::UCT_EXP,
            max_cnn_depth: *kr_utils::config::MAX_CNN_DEPTH,
            virtual_loss: *kr_utils::config::VIRTUAL_LOSS,
            deterministic: false,
        }
    }

    pub fn with_num_workers(mut self, n: usize) -> Self {
        self.num_workers = n.max(1);
        self
    }

    pub fn with_max_iterations(mut self, n: i32) -> Self {
        self.max_iterations = Some(n);
        self
    }

    pub fn with_max_msec(mut self, msec: u64) -> Self {
        self.max_msec = Some(msec);
        self
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions::new()
    }
}
