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

//! Prior assembly: turns every still-open point of the position at a
//! newly-expanded node into a `(playouts, value_sum)` pseudo-statistic,
//! cumulated from several independent signals and capped to a fixed
//! total mass so no single node starts out over-confident.

use kr_go::enclosure::CellView;
use kr_go::geometry::{Color, Point};
use kr_go::ladder;
use kr_go::{movelists, Game};

use crate::tree::{Candidate, TreeNode};

/// Every child's accumulated pseudo-statistic is rescaled to sum to at
/// most this many simulations, so a point that happens to match many
/// heuristics at once doesn't dwarf the others.
const PRIOR_CAP: f32 = 20.0;

struct Accum {
    point: Point,
    won: f32,
    total: f32,
    is_enclosure_move: bool,
    is_inside_terr_no_atari: bool,
}

impl Accum {
    fn new(point: Point) -> Self {
        Accum { point, won: 15.0, total: 30.0, is_enclosure_move: false, is_inside_terr_no_atari: false }
    }

    fn win(&mut self, n: f32) {
        self.won += n;
        self.total += n;
    }

    fn lose(&mut self, n: f32) {
        self.total += n;
    }
}

/// Builds one [`TreeNode`] per legal point, with priors assembled from
/// the pattern tables, safety, threats, ladder reading and (if available)
/// the CNN. `depth` is the distance of the node being expanded from the
/// tree root, 1-based.
pub fn build_children(game: &Game, who: Color, depth: usize, max_cnn_depth: usize) -> Vec<TreeNode> {
    let geo = &game.simple.geo;
    let opp = who.opposite();
    let last = game.simple.history.last();
    let last_but_one = game.simple.history.last_but_one();

    let mut candidates: Vec<Point> = game.simple.possible_moves.bucket(movelists::NEUTRAL).to_vec();
    candidates.extend_from_slice(game.simple.possible_moves.bucket(movelists::TERRM));
    candidates.extend_from_slice(game.simple.possible_moves.bucket(movelists::DAME));

    let mut accums: Vec<Accum> = candidates.into_iter().map(Accum::new).collect();

    for a in accums.iter_mut() {
        let p = a.point;

        // 3x3 pattern.
        let v = game.simple.patterns.get_value(p, who) as f32;
        if v > 0.0 {
            a.win((v + 15.0) / 8.0);
        }

        // Edge-move class, approximated by the soft-safety move value.
        let r = game.simple.safety.move_value_at(p)[who.index()] as f32;
        if r > 0.0 {
            a.win(3.0 * r);
        }

        // Interesting-move class: rank 0 (not interesting) .. 3 (best).
        let rank = match game.simple.interesting_moves.class_of(p) {
            Some(movelists::MOVE_0) => 3.0,
            Some(movelists::MOVE_1) => 2.0,
            Some(movelists::MOVE_2) => 1.0,
            _ => 0.0,
        };
        if rank > 0.0 {
            a.win(4.0 * rank);
        }

        // Distance from the opponent's last move / our own last-but-one.
        if let Some(ply) = last {
            let d = geo.chebyshev(p, ply.mv);
            if d <= 4 {
                a.win((6 - d) as f32);
            }
        }
        if let Some(ply) = last_but_one {
            let d = geo.chebyshev(p, ply.mv);
            if d <= 4 {
                a.win((6 - d) as f32 * 0.5);
            }
        }

        // Threats in two created or avoided.
        let n2 = (game.simple.threats[who.index()].is_in_2m_encl[p] + game.simple.threats[who.index()].is_in_2m_miai[p]) as f32;
        if n2 > 0.0 {
            a.win(5.0 + n2.min(15.0));
        }

        // Miai danger: this point sits on an opponent two-move miai index.
        if game.simple.threats[opp.index()].is_in_2m_miai[p] > 0 {
            a.lose(15.0);
        }

        // Our atari win value at this point: how many live one-move
        // threats of ours already cover it.
        let atari_v = game.simple.threats[who.index()].is_in_encl[p] as f32;
        if atari_v > 0.0 {
            a.win(5.0 + 2.0 * atari_v.min(15.0));
        }

        // Inside opponent territory: isolated (no border contact) is
        // worse than merely touching the border of their claim.
        let opp_terr = game.simple.threats[opp.index()].is_in_terr[p] > 0;
        let opp_border = game.simple.threats[opp.index()].is_in_border[p] > 0;
        if opp_terr && atari_v == 0.0 {
            a.is_inside_terr_no_atari = true;
            if opp_border {
                a.lose(14.0);
            } else {
                // Territory area isn't tracked per-enclosure here, so the
                // isolated case uses the minimum (most punishing) penalty
                // the original formula allows: 80 - min(area, 20).
                a.lose(60.0);
            }
        }

        // Ladder extension.
        match ladder::check_ladder(game, opp, p).status {
            ladder::ATTACKER_WINS => a.win(3.0),
            ladder::ESCAPER_WINS => a.lose(40.0),
            _ => {}
        }

        // Mandatory captures: a point that would close at least one
        // enclosure right now is flagged for the faster RAVE decay and
        // given a small boost proportional to the opponent dots it
        // would fold in.
        let (px, py) = (geo.x(p) as usize, geo.y(p) as usize);
        let encls = game.enclosures_available_at(px, py, who);
        if !encls.is_empty() {
            a.is_enclosure_move = true;
            let captured: usize = encls.iter().map(|e| e.interior.len()).sum();
            a.win(5.0 * (captured.min(8)) as f32);
        }
    }

    if let Some(prediction) = max_cnn_depth_allows(game, who, depth, max_cnn_depth) {
        let prior_max = match depth {
            1 => 800.0,
            2 => 400.0,
            _ => 200.0,
        };
        for a in accums.iter_mut() {
            let p = prediction.policy[point_cell_index(geo, a.point)];
            a.win(p.max(0.0).sqrt() * prior_max);
        }
    }

    accums
        .into_iter()
        .map(|a| {
            let (won, total) = if a.total > PRIOR_CAP {
                (a.won * PRIOR_CAP / a.total, PRIOR_CAP)
            } else {
                (a.won, a.total)
            };
            TreeNode::from_prior(
                Candidate { point: a.point, is_enclosure_move: a.is_enclosure_move, is_inside_terr_no_atari: a.is_inside_terr_no_atari },
                total as i32,
                won as f64,
            )
        })
        .collect()
}

/// Matches the flattening order `Geometry::all_points` uses (x-major,
/// then y), which is also how [`kr_nn::features::extract`] lays out a
/// plane.
fn point_cell_index(geo: &kr_go::Geometry, p: Point) -> usize {
    geo.x(p) as usize * geo.height + geo.y(p) as usize
}

fn max_cnn_depth_allows(game: &Game, who: Color, depth: usize, max_cnn_depth: usize) -> Option<kr_nn::Prediction> {
    if depth > max_cnn_depth || !kr_nn::is_available() {
        return None;
    }
    kr_nn::evaluate(game, who, depth, max_cnn_depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kr_go::Geometry;
    use std::sync::Arc;

    #[test]
    fn every_possible_move_gets_a_child() {
        let geo = Arc::new(Geometry::new(9, 9));
        let game = Game::new(geo.clone());

        let children = build_children(&game, Color::Black, 1, 3);

        assert_eq!(children.len(), game.simple.possible_moves.total_len());
    }

    #[test]
    fn every_child_starts_with_at_least_the_base_prior() {
        let geo = Arc::new(Geometry::new(9, 9));
        let game = Game::new(geo);

        let children = build_children(&game, Color::Black, 1, 3);

        assert!(children.iter().all(|c| c.playouts() >= 1));
    }
}
