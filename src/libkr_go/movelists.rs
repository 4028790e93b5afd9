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

//! Two mutually-exclusive partitions over every empty on-board point:
//! `possible_moves` (NEUTRAL / DAME / TERRM) and `interesting_moves`
//! (MOVE_0 / MOVE_1 / MOVE_2 / REMOVED). Both support O(1) reclassification
//! by swap-removing from one bucket's backing vector and pushing to another.

use rand::Rng;

use crate::geometry::{Geometry, Point};

/// A partition over points: `N` disjoint buckets, each a `Vec<Point>`,
/// with a side table recording `(bucket, position)` per point so removal
/// never has to scan.
#[derive(Clone)]
pub struct Partition<const N: usize> {
    buckets: [Vec<Point>; N],
    location: Vec<Option<(u8, u32)>>,
}

impl<const N: usize> Partition<N> {
    pub fn new(geo: &Geometry) -> Self {
        Partition {
            buckets: std::array::from_fn(|_| Vec::new()),
            location: vec![None; geo.size()],
        }
    }

    pub fn bucket(&self, i: usize) -> &[Point] {
        &self.buckets[i]
    }

    pub fn class_of(&self, p: Point) -> Option<usize> {
        self.location[p].map(|(b, _)| b as usize)
    }

    pub fn contains(&self, p: Point) -> bool {
        self.location[p].is_some()
    }

    /// Moves `p` into bucket `new_bucket`, removing it from its current
    /// bucket (if any) first. This is the single mutation entry point,
    /// mirroring the original's `changeMove`.
    pub fn change_move(&mut self, p: Point, new_bucket: usize) {
        self.remove(p);
        let pos = self.buckets[new_bucket].len() as u32;
        self.buckets[new_bucket].push(p);
        self.location[p] = Some((new_bucket as u8, pos));
    }

    pub fn remove(&mut self, p: Point) {
        if let Some((bucket, pos)) = self.location[p].take() {
            let bucket = bucket as usize;
            let pos = pos as usize;
            let last = self.buckets[bucket].len() - 1;

            self.buckets[bucket].swap(pos, last);
            self.buckets[bucket].pop();

            if pos < self.buckets[bucket].len() {
                let moved = self.buckets[bucket][pos];
                self.location[moved] = Some((bucket as u8, pos as u32));
            }
        }
    }

    pub fn len(&self, bucket: usize) -> usize {
        self.buckets[bucket].len()
    }

    pub fn total_len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }
}

pub const NEUTRAL: usize = 0;
pub const DAME: usize = 1;
pub const TERRM: usize = 2;

pub const MOVE_0: usize = 0;
pub const MOVE_1: usize = 1;
pub const MOVE_2: usize = 2;
pub const REMOVED: usize = 3;

pub type PossibleMoves = Partition<3>;
pub type InterestingMoves = Partition<4>;

/// Picks a uniformly random point from `possible`, preferring NEUTRAL,
/// then TERRM, then DAME -- the playout policy's fallback when no
/// heuristic move applies.
pub fn random_move(possible: &PossibleMoves, rng: &mut impl Rng) -> Option<Point> {
    for bucket in [NEUTRAL, TERRM, DAME] {
        let n = possible.len(bucket);
        if n > 0 {
            let i = rng.gen_range(0..n);
            return Some(possible.bucket(bucket)[i]);
        }
    }
    None
}

/// Tracks, per board edge, whether the margin still has an empty point.
/// When a margin is filled, every remaining NEUTRAL point on that edge
/// becomes DAME (except the point just played, which is no longer empty
/// at all).
#[derive(Copy, Clone, Debug, Default)]
pub struct MarginState {
    pub empty: [bool; 4],
}

impl MarginState {
    pub fn new() -> Self {
        MarginState { empty: [true; 4] }
    }

    /// Reclassifies the remaining NEUTRAL points of `edge` to DAME once
    /// that margin has lost its last empty point.
    pub fn close_margin(&mut self, geo: &Geometry, possible: &mut PossibleMoves, edge: usize) {
        if !self.empty[edge] {
            return;
        }
        self.empty[edge] = false;

        let on_edge: Vec<Point> = possible
            .bucket(NEUTRAL)
            .iter()
            .copied()
            .filter(|&p| point_on_edge(geo, p, edge))
            .collect();

        for p in on_edge {
            possible.change_move(p, DAME);
        }
    }
}

fn point_on_edge(geo: &Geometry, p: Point, edge: usize) -> bool {
    match edge {
        0 => geo.y(p) == 0,
        1 => geo.x(p) as usize == geo.width - 1,
        2 => geo.y(p) as usize == geo.height - 1,
        3 => geo.x(p) == 0,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn change_move_relocates_a_point_between_buckets() {
        let geo = Geometry::new(9, 9);
        let mut pm = PossibleMoves::new(&geo);
        let p = geo.index(3, 3);

        pm.change_move(p, NEUTRAL);
        assert_eq!(pm.class_of(p), Some(NEUTRAL));

        pm.change_move(p, DAME);
        assert_eq!(pm.class_of(p), Some(DAME));
        assert_eq!(pm.len(NEUTRAL), 0);
        assert_eq!(pm.len(DAME), 1);
    }

    #[test]
    fn removal_is_swap_with_last_and_keeps_other_entries_findable() {
        let geo = Geometry::new(9, 9);
        let mut pm = PossibleMoves::new(&geo);
        let a = geo.index(1, 1);
        let b = geo.index(2, 2);
        let c = geo.index(3, 3);

        pm.change_move(a, NEUTRAL);
        pm.change_move(b, NEUTRAL);
        pm.change_move(c, NEUTRAL);

        pm.remove(a);

        assert_eq!(pm.len(NEUTRAL), 2);
        assert!(pm.class_of(b) == Some(NEUTRAL));
        assert!(pm.class_of(c) == Some(NEUTRAL));
    }

    #[test]
    fn random_move_prefers_neutral_over_terrm_and_dame() {
        let geo = Geometry::new(9, 9);
        let mut pm = PossibleMoves::new(&geo);
        pm.change_move(geo.index(1, 1), DAME);
        pm.change_move(geo.index(2, 2), TERRM);
        pm.change_move(geo.index(3, 3), NEUTRAL);

        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let mv = random_move(&pm, &mut rng).unwrap();

        assert_eq!(mv, geo.index(3, 3));
    }

    #[test]
    fn closing_a_margin_demotes_remaining_neutral_points_to_dame() {
        let geo = Geometry::new(9, 9);
        let mut pm = PossibleMoves::new(&geo);
        let mut margins = MarginState::new();

        let top_a = geo.index(2, 0);
        let top_b = geo.index(3, 0);
        pm.change_move(top_a, NEUTRAL);
        pm.change_move(top_b, NEUTRAL);

        margins.close_margin(&geo, &mut pm, 0);

        assert_eq!(pm.class_of(top_a), Some(DAME));
        assert_eq!(pm.class_of(top_b), Some(DAME));
    }
}
