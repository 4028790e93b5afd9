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

//! The CNN integration point: one function, `(game, depth) -> probs`, plus
//! an availability check the search layer consults before spending a
//! lookup on it. There is no GPU backend here -- weights are a flat
//! per-plane linear model loaded from [`kr_utils::config::NN_WEIGHTS_PATH`],
//! which keeps the search correct (and, absent a weights file, a no-op)
//! without depending on a CUDA toolchain.

use std::fs;
use std::io;
use std::sync::RwLock;

use dashmap::DashMap;

use kr_go::{Color, Game};

use crate::features::{self, NUM_PLANES};

/// `value` is from the perspective of the colour the features were
/// extracted for; `policy` is `width * height` floats summing to ~1.
#[derive(Clone, Debug)]
pub struct Prediction {
    pub value: f32,
    pub policy: Vec<f32>,
}

/// One weight vector (plus bias) per output cell, shared across planes --
/// a single dense layer from the flattened feature stack straight to the
/// policy logits, with a separate value head sharing the same inputs.
struct Weights {
    width: usize,
    height: usize,
    policy_weight: Vec<f32>, // [cell][plane]
    policy_bias: Vec<f32>,
    value_weight: Vec<f32>, // [plane]
    value_bias: f32,
}

impl Weights {
    /// Binary layout: `u32 width`, `u32 height`, then
    /// `width*height*NUM_PLANES` policy weights, `width*height` policy
    /// biases, `NUM_PLANES` value weights, and one value bias -- all
    /// little-endian `f32` (dimensions as `u32`).
    fn load(path: &str) -> io::Result<Self> {
        let bytes = fs::read(path)?;
        let mut cursor = 0usize;

        let mut read_u32 = |buf: &[u8], at: &mut usize| -> io::Result<u32> {
            let v = u32::from_le_bytes(buf[*at..*at + 4].try_into().unwrap());
            *at += 4;
            Ok(v)
        };
        let width = read_u32(&bytes, &mut cursor)? as usize;
        let height = read_u32(&bytes, &mut cursor)? as usize;
        let cells = width * height;

        let mut read_f32s = |buf: &[u8], at: &mut usize, n: usize| -> io::Result<Vec<f32>> {
            let mut out = Vec::with_capacity(n);
            for _ in 0..n {
                out.push(f32::from_le_bytes(buf[*at..*at + 4].try_into().unwrap()));
                *at += 4;
            }
            Ok(out)
        };

        let policy_weight = read_f32s(&bytes, &mut cursor, cells * NUM_PLANES)?;
        let policy_bias = read_f32s(&bytes, &mut cursor, cells)?;
        let value_weight = read_f32s(&bytes, &mut cursor, NUM_PLANES)?;
        let value_bias = read_f32s(&bytes, &mut cursor, 1)?[0];

        Ok(Weights { width, height, policy_weight, policy_bias, value_weight, value_bias })
    }

    fn forward(&self, planes: &[f32]) -> Prediction {
        let cells = self.width * self.height;
        let mut policy = vec![0.0f32; cells];
        let mut value = self.value_bias;

        for plane in 0..NUM_PLANES {
            let base = plane * cells;
            for cell in 0..cells {
                let x = planes[base + cell];
                value += x * self.value_weight[plane];
            }
        }

        for cell in 0..cells {
            let mut logit = self.policy_bias[cell];
            for plane in 0..NUM_PLANES {
                logit += planes[plane * cells + cell] * self.policy_weight[cell * NUM_PLANES + plane];
            }
            policy[cell] = logit;
        }

        softmax(&mut policy);
        Prediction { value: value.tanh() * 0.5 + 0.5, policy }
    }
}

fn softmax(logits: &mut [f32]) {
    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0f32;
    for v in logits.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    if sum > 1e-6 {
        let recip = sum.recip();
        for v in logits.iter_mut() {
            *v *= recip;
        }
    }
}

fn load_weights() -> Option<Weights> {
    kr_utils::config::NN_WEIGHTS_PATH.as_ref().and_then(|path| match Weights::load(path) {
        Ok(w) => Some(w),
        Err(e) => {
            log::warn!("failed to load CNN weights from {:?}: {}", path, e);
            None
        }
    })
}

lazy_static! {
    static ref WEIGHTS: RwLock<Option<Weights>> = RwLock::new(load_weights());
    static ref CACHE: DashMap<(u64, Color), Prediction> = DashMap::new();
}

fn weights() -> &'static RwLock<Option<Weights>> {
    &WEIGHTS
}

/// Whether a CNN is actually loaded. The search layer skips the CNN
/// prior contribution entirely when this is false rather than asking for
/// a degenerate uniform distribution every node.
pub fn is_available() -> bool {
    weights().read().unwrap().is_some()
}

/// Runs the network for `game` from `who`'s perspective, returning a
/// dense policy over every board point in `Geometry::all_points` order
/// plus a value estimate, or `None` if no weights are loaded or the
/// search has gone deeper than it should spend a CNN call on.
pub fn evaluate(game: &Game, who: Color, depth: usize, max_depth: usize) -> Option<Prediction> {
    if depth > max_depth {
        return None;
    }

    let guard = weights().read().unwrap();
    let w = guard.as_ref()?;
    if w.width != game.simple.geo.width || w.height != game.simple.geo.height {
        return None;
    }

    let key = (zobrist_of(game, who), who);
    if let Some(cached) = CACHE.get(&key) {
        return Some(cached.clone());
    }

    let planes = features::extract(game, who);
    let prediction = w.forward(&planes);
    CACHE.insert(key, prediction.clone());
    Some(prediction)
}

/// A cheap position fingerprint built from the dot Zobrist tables already
/// maintained by the board -- good enough to key the prediction cache,
/// not intended as a cryptographic hash.
fn zobrist_of(game: &Game, who: Color) -> u64 {
    let geo = &game.simple.geo;
    use kr_go::enclosure::CellView;

    geo.all_points().fold(who.index() as u64, |acc, p| match game.simple.worms.owner_at(p) {
        Some(c) => acc ^ geo.z_dot[c.index()][p],
        None => acc,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kr_go::Geometry;
    use std::sync::Arc;

    #[test]
    fn unavailable_without_a_weights_file() {
        // NN_WEIGHTS_PATH is not set in the test environment, so the
        // network must report itself unavailable rather than guessing.
        let geo = Arc::new(Geometry::new(9, 9));
        let game = Game::new(geo);

        if !is_available() {
            assert!(evaluate(&game, Color::Black, 1, 3).is_none());
        }
    }
}
