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

//! Process-wide tunables, discovered from the environment at startup. The
//! engine itself never reads the environment anywhere except here.

use std::env;

fn read_env<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name).ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

lazy_static! {
    /// Number of MCTS worker threads to run in parallel. The engine itself
    /// parallelises, so `OMP_NUM_THREADS=1` is expected in the environment.
    pub static ref NUM_THREADS: usize = read_env("NUM_THREADS", 4);

    /// Iteration budget for a single `move` command when no explicit count
    /// is given on the command line.
    pub static ref NUM_ROLLOUT: usize = read_env("NUM_ROLLOUT", 3_200);

    /// Exploration constant at the root of the tree.
    pub static ref UCT_EXP_ROOT: f32 = read_env("UCT_EXP_ROOT", 0.4);

    /// Exploration constant below the root.
    pub static ref UCT_EXP: f32 = read_env("UCT_EXP", 0.14);

    /// Number of (playouts - prior playouts) that must accumulate on a node
    /// before it is allowed to be expanded (progressive widening).
    pub static ref EXPAND_THRESHOLD: i32 = read_env("EXPAND_THRESHOLD", 8);

    /// Virtual loss (in playouts) applied on the way down a descent.
    pub static ref VIRTUAL_LOSS: i32 = read_env("VIRTUAL_LOSS", 2);

    /// Maximum tree depth at which CNN priors are consulted.
    pub static ref MAX_CNN_DEPTH: usize = read_env("MAX_CNN_DEPTH", 3);

    /// Starting komi, mirrored onto player 2's score.
    pub static ref KOMI: i32 = read_env("KOMI", 0);

    /// Path to a pre-compiled pattern table, if not using the one embedded
    /// in the binary at build time.
    pub static ref PATTERN_TABLE_PATH: Option<String> = env::var("PATTERN_TABLE_PATH").ok();

    /// Path to a serialized CNN policy/value weight file. Absent means the
    /// engine runs without a CNN and priors skip that contribution entirely.
    pub static ref NN_WEIGHTS_PATH: Option<String> = env::var("NN_WEIGHTS_PATH").ok();

    /// When present, every move is appended as a line to this log file.
    pub static ref SAVE_MC_STATS: bool = std::path::Path::new("savemc.config").exists();
}

/// Raise the `log` max level once, ahead of whatever subscriber the
/// embedding application installs. Library tests install none and just
/// swallow the records.
pub fn init_logger() {
    static ONCE: std::sync::Once = std::sync::Once::new();
    ONCE.call_once(|| {
        let _ = log::set_max_level(log::LevelFilter::Info);
    });
}
