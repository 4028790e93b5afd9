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

//! The shared search tree. Every `TreeNode` is an edge from its parent:
//! it carries the candidate move that was played to reach it, together
//! with atomic `(playouts, value_sum)` counters for the raw statistic and
//! its AMAF twin. `children` publishes once, behind a
//! [`std::sync::OnceLock`] -- the first worker to expand a node runs the
//! initializer under its internal lock, every later worker just reads the
//! result, matching the single-mutex-then-lock-free-reads discipline the
//! concurrency model calls for.

use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::sync::OnceLock;

use kr_go::geometry::Point;

/// A candidate move as stored in the tree: cheap to copy, unlike the
/// `Arc<Enclosure>` handles `kr_go::full_game::Move` carries -- the actual
/// enclosures are re-derived from each worker's own game copy via
/// `enclosures_available_at` at apply time.
#[derive(Clone, Copy, Debug)]
pub struct Candidate {
    pub point: Point,
    /// Whether playing `point` closes at least one enclosure -- selects
    /// the `k = 1/20` RAVE blend instead of the default `1/400`.
    pub is_enclosure_move: bool,
    /// Whether the point sits inside an opponent enclosure/territory with
    /// no atari in play -- applies the small `-0.02` selection penalty.
    pub is_inside_terr_no_atari: bool,
}

/// A running `(n, value_sum)` pair, updated with relaxed atomics. Exact
/// counts are not required -- concurrent updates may occasionally clobber
/// one another, which the design explicitly tolerates.
#[derive(Default)]
pub struct EdgeStats {
    playouts: AtomicI32,
    value_bits: AtomicU64,
}

impl EdgeStats {
    fn new(playouts: i32, value_sum: f64) -> Self {
        EdgeStats { playouts: AtomicI32::new(playouts), value_bits: AtomicU64::new(value_sum.to_bits()) }
    }

    pub fn playouts(&self) -> i32 {
        self.playouts.load(Ordering::Relaxed)
    }

    pub fn value_sum(&self) -> f64 {
        f64::from_bits(self.value_bits.load(Ordering::Relaxed))
    }

    pub fn mean(&self) -> f32 {
        let n = self.playouts();
        if n <= 0 {
            0.5
        } else {
            (self.value_sum() / n as f64) as f32
        }
    }

    /// Adds `playouts` (may be negative, to undo a virtual loss) and
    /// `value_sum` atomically with respect to other adders, via a
    /// compare-exchange retry loop on the packed float bits.
    pub fn add(&self, playouts: i32, value_sum: f64) {
        self.playouts.fetch_add(playouts, Ordering::Relaxed);

        let mut current = self.value_bits.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + value_sum).to_bits();
            match self.value_bits.compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
    }
}

pub struct TreeNode {
    pub candidate: Candidate,
    /// This edge's own statistic, as seen by the parent's selection step.
    edge: EdgeStats,
    /// AMAF (all-moves-as-first) counterpart of `edge`.
    amaf: EdgeStats,
    /// Pseudo-playouts contributed by priors at expansion time -- kept
    /// separate so `playouts - priors >= EXPAND_THRESHOLD` can be tested
    /// without the prior mass perpetually blocking expansion.
    prior_playouts: i32,
    children: OnceLock<Vec<TreeNode>>,
}

impl TreeNode {
    pub fn new_root() -> Self {
        TreeNode {
            candidate: Candidate { point: 0, is_enclosure_move: false, is_inside_terr_no_atari: false },
            edge: EdgeStats::default(),
            amaf: EdgeStats::default(),
            prior_playouts: 0,
            children: OnceLock::new(),
        }
    }

    pub fn from_prior(candidate: Candidate, playouts: i32, value_sum: f64) -> Self {
        TreeNode {
            candidate,
            edge: EdgeStats::new(playouts, value_sum),
            amaf: EdgeStats::default(),
            prior_playouts: playouts,
            children: OnceLock::new(),
        }
    }

    pub fn playouts(&self) -> i32 {
        self.edge.playouts()
    }

    pub fn value_sum(&self) -> f64 {
        self.edge.value_sum()
    }

    pub fn q(&self) -> f32 {
        self.edge.mean()
    }

    pub fn amaf_q(&self) -> f32 {
        self.amaf.mean()
    }

    pub fn amaf_playouts(&self) -> i32 {
        self.amaf.playouts()
    }

    pub fn add_virtual_loss(&self, amount: i32) {
        self.edge.add(amount, 0.0);
    }

    pub fn undo_virtual_loss_and_backprop(&self, amount: i32, value: f32) {
        self.edge.add(-amount, 0.0);
        self.edge.add(1, value as f64);
    }

    pub fn add_amaf(&self, weight: f32, value: f32) {
        self.amaf.add(1, (weight * value) as f64);
    }

    pub fn is_expanded(&self) -> bool {
        self.children.get().is_some()
    }

    pub fn children(&self) -> Option<&[TreeNode]> {
        self.children.get().map(|v| v.as_slice())
    }

    /// Expands the node with `make`'s children, unless another thread
    /// already won the race -- mirrors the per-node expansion mutex: the
    /// first caller runs `make` and every later caller (here or on other
    /// workers) observes its result without re-running it.
    pub fn expand_with<F: FnOnce() -> Vec<TreeNode>>(&self, make: F) -> &[TreeNode] {
        self.children.get_or_init(make)
    }

    /// Whether this node is eligible for expansion: it has no children
    /// yet, and either this is the first ply of the descent or enough
    /// real (non-prior) playouts have accumulated for progressive
    /// widening to allow it.
    pub fn wants_expansion(&self, depth: usize, expand_threshold: i32) -> bool {
        !self.is_expanded() && (depth == 1 || self.playouts() - self.prior_playouts >= expand_threshold)
    }

    /// The UCT + RAVE selection score used to pick a child during
    /// descent. `parent_total` is the parent's total visit count (`N` in
    /// the formula); `c` is the exploration constant for this depth.
    pub fn selection_value(&self, parent_total: i32, c: f32) -> f32 {
        let n = self.playouts().max(0) as f32;
        let amaf_n = self.amaf_playouts().max(0) as f32;
        let k = if self.candidate.is_enclosure_move { 1.0 / 20.0 } else { 1.0 / 400.0 };

        let beta = if amaf_n <= 0.0 {
            0.0
        } else {
            amaf_n / (amaf_n + n + n * amaf_n * k)
        };

        let blended = (1.0 - beta) * self.q() + beta * self.amaf_q();
        let explore = c * ((parent_total as f32 + 1.0).ln() / (n + 0.1)).sqrt();
        let penalty = if self.candidate.is_inside_terr_no_atari { -0.02 } else { 0.0 };

        blended + explore + penalty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_stats_accumulate_across_concurrent_style_adds() {
        let stats = EdgeStats::default();
        stats.add(3, 1.5);
        stats.add(2, 0.5);

        assert_eq!(stats.playouts(), 5);
        assert!((stats.value_sum() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn virtual_loss_round_trips_to_zero_extra_playouts() {
        let node = TreeNode::from_prior(Candidate { point: 10, is_enclosure_move: false, is_inside_terr_no_atari: false }, 30, 15.0);

        node.add_virtual_loss(2);
        assert_eq!(node.playouts(), 32);

        node.undo_virtual_loss_and_backprop(2, 0.7);
        assert_eq!(node.playouts(), 31);
    }

    #[test]
    fn enclosure_moves_use_the_faster_rave_decay() {
        let enclosure_move = Candidate { point: 1, is_enclosure_move: true, is_inside_terr_no_atari: false };
        let normal_move = Candidate { point: 2, is_enclosure_move: false, is_inside_terr_no_atari: false };

        let a = TreeNode::from_prior(enclosure_move, 10, 5.0);
        let b = TreeNode::from_prior(normal_move, 10, 5.0);
        a.add_amaf(1.0, 1.0);
        b.add_amaf(1.0, 1.0);

        // same raw stats, but the enclosure move's larger k pulls its
        // blend weight down, so its selection value differs from b's.
        assert_ne!(a.selection_value(100, 0.4), b.selection_value(100, 0.4));
    }

    #[test]
    fn wants_expansion_is_true_at_depth_one_regardless_of_playouts() {
        let node = TreeNode::new_root();
        assert!(node.wants_expansion(1, 8));
        assert!(!node.wants_expansion(2, 8));
    }
}
