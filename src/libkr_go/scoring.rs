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

//! Territory scoring: the fast path that trusts the live `is_in_terr`
//! indices, and the general nested-pools path that re-derives ownership
//! from scratch via the enclosure finder for positions where pools can
//! be contained inside other pools.

use crate::enclosure::{find_enclosure, CellView};
use crate::full_game::Game;
use crate::geometry::{Color, Point};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Score {
    pub points: [i32; 2],
    pub komi: i32,
}

impl Score {
    pub fn total(&self, who: Color) -> i32 {
        self.points[who.index()] + if who == Color::White { self.komi } else { 0 }
    }

    pub fn winner(&self) -> Option<Color> {
        let b = self.total(Color::Black);
        let w = self.total(Color::White);
        if b > w {
            Some(Color::Black)
        } else if w > b {
            Some(Color::White)
        } else {
            None
        }
    }
}

/// Walks `is_in_terr` directly -- correct whenever no pool is nested
/// inside another player's already-closed pool, which covers the
/// overwhelming majority of finished games.
pub fn score_simple(game: &Game) -> Score {
    let geo = &game.simple.geo;
    let mut points = [0i32; 2];

    for p in geo.all_points() {
        let black_terr = game.simple.threats[Color::Black.index()].is_in_terr[p] > 0;
        let white_terr = game.simple.threats[Color::White.index()].is_in_terr[p] > 0;

        if black_terr && !white_terr {
            points[0] += 1;
        } else if white_terr && !black_terr {
            points[1] += 1;
        }
    }

    Score { points, komi: game.komi }
}

/// Re-derives territory from a scratch flood rather than trusting the
/// incremental `is_in_terr` tables -- used when pools may be nested
/// (an enclosure's border itself enclosed by a larger one).
pub fn score_general(game: &Game) -> Score {
    let geo = &game.simple.geo;
    let worms = &game.simple.worms;
    let mut points = [0i32; 2];
    let mut counted_worm: Vec<bool> = vec![false; geo.size()];

    for owner in [Color::Black, Color::White] {
        for p in geo.all_points() {
            if worms.is_dot_at(p) {
                continue;
            }
            if let Some(encl) = find_enclosure(geo, worms, owner, p) {
                for &i in encl.interior.iter() {
                    if worms.is_dot_at(i) {
                        let id = worms.worm_id_at(i);
                        if worms.owner_at(i) != Some(owner) && !counted_worm[worms.descr(id).leftmost] {
                            counted_worm[worms.descr(id).leftmost] = true;
                            points[owner.index()] += worms.descr(id).total_dots() as i32;
                        }
                    } else {
                        points[owner.index()] += 1;
                    }
                }
            }
        }
    }

    Score { points, komi: game.komi }
}

/// Picks the cheap path unless the position has enough dots on the
/// board that nested pools become plausible.
pub fn score(game: &Game) -> Score {
    if game.simple.history.len() < 4 {
        score_simple(game)
    } else {
        score_general(game)
    }
}

/// Maps a raw point differential into the (0,1) value MCTS backprop
/// expects: scaled by board size, clamped to +-1, then squashed into
/// [0.04, 0.96] with a tie-shading band around 0.5.
pub fn value_of(score: &Score, who: Color, width: usize, height: usize) -> f32 {
    let diff = (score.total(who) - score.total(who.opposite())) as f32;
    let scale = (width + height) as f32 / 2.0;
    let normalized = (diff / scale).clamp(-1.0, 1.0);

    (0.5 + 0.46 * normalized).clamp(0.04, 0.96)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_territory_is_a_tie_before_komi() {
        let score = Score { points: [10, 10], komi: 0 };
        assert_eq!(score.winner(), None);
    }

    #[test]
    fn komi_breaks_ties_in_whites_favour() {
        let score = Score { points: [10, 10], komi: 1 };
        assert_eq!(score.winner(), Some(Color::White));
    }

    #[test]
    fn value_of_clamps_to_the_squashed_range() {
        let huge_black_lead = Score { points: [1000, 0], komi: 0 };
        let v = value_of(&huge_black_lead, Color::Black, 9, 9);

        assert!(v <= 0.96);
        assert!(v > 0.5);
    }
}
