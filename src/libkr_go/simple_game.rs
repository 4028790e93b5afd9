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

//! Aggregates geometry, worms, threats, patterns, safety and the move-list
//! partitions behind a single mutating entry point, `place_dot`. Everything
//! above this layer (the rule layer, scoring, MCTS) only ever talks to a
//! `SimpleGame`, never to the individual components directly.

use std::sync::Arc;

use kr_utils::RuleError;

use crate::enclosure::{find_enclosure, CellView, Enclosure, PretendOwner};
use crate::geometry::{Color, Geometry, Point};
use crate::history::History;
use crate::movelists::{self, InterestingMoves, MarginState, PossibleMoves};
use crate::patterns::Patterns;
use crate::safety::{Safety, UpdateScope};
use crate::threats::{AllThreats, Threat, ENCL};
use crate::worm::{DirtyFlags, SoftSafetyUpdate, Worms};

/// Chebyshev radius of the window rescanned for threats after each move.
/// Bounded and independent of board size, so the rescan stays proportional
/// to the local neighbourhood rather than the whole board.
const THREAT_RESCAN_RADIUS: i32 = 3;

#[derive(Clone)]
pub struct SimpleGame {
    pub geo: Arc<Geometry>,
    pub worms: Worms,
    pub threats: [AllThreats; 2],
    pub patterns: Patterns,
    pub safety: Safety,
    pub possible_moves: PossibleMoves,
    pub interesting_moves: InterestingMoves,
    pub margins: MarginState,
    pub history: History,
    pub now_moves: Color,
}

impl SimpleGame {
    pub fn new(geo: Arc<Geometry>) -> Self {
        let worms = Worms::new(&geo);
        let threats = [AllThreats::new(&geo), AllThreats::new(&geo)];
        let patterns = Patterns::new(&geo);
        let mut safety = Safety::new(&geo);
        safety.init(&geo, &worms);

        let mut possible_moves = PossibleMoves::new(&geo);
        for p in geo.all_points() {
            possible_moves.change_move(p, movelists::NEUTRAL);
        }

        SimpleGame {
            interesting_moves: InterestingMoves::new(&geo),
            worms,
            threats,
            patterns,
            safety,
            possible_moves,
            margins: MarginState::new(),
            history: History::new(),
            now_moves: Color::Black,
            geo,
        }
    }

    pub fn owner_at(&self, p: Point) -> Option<Color> {
        self.worms.owner_at(p)
    }

    /// The only mutating method: places a dot of colour `who` at
    /// `(x, y)`, then refreshes every derived structure that the new
    /// dot could have invalidated. Returns the dirty flags so the rule
    /// layer above knows whether a wider soft-safety refresh is needed.
    pub fn place_dot(&mut self, x: usize, y: usize, who: Color) -> Result<DirtyFlags, RuleError> {
        let ind = self.geo.index(x, y);
        if self.worms.is_dot_at(ind) {
            return Err(RuleError::Occupied);
        }

        let dirty = self.worms.place_dot(&self.geo, x, y, who);

        self.possible_moves.remove(ind);
        self.interesting_moves.remove(ind);

        if self.geo.dist(ind) == 0 {
            let edge = edge_index_of(&self.geo, ind);
            self.margins.close_margin(&self.geo, &mut self.possible_moves, edge);
        }

        for p in self.worms.drain_recalculate_list() {
            self.worms.refresh_conn_at(&self.geo, p);
            self.patterns.recalculate_point(&self.geo, &self.worms, p);
            self.reclassify(p);
        }

        match dirty.update_soft_safety {
            SoftSafetyUpdate::AllMargins => self.safety.update_after_move(&self.geo, &self.worms, UpdateScope::AllMargins),
            SoftSafetyUpdate::Point(p) => self.safety.update_after_move(&self.geo, &self.worms, UpdateScope::MarginsContaining(p)),
            SoftSafetyUpdate::None => self.safety.update_after_move_without_any_change(),
        }

        self.refresh_threats(ind);
        self.history.push(who, ind);

        Ok(dirty)
    }

    /// Rescans a fixed-radius window around the just-played point for
    /// one-move and two-move enclosure threats, for both colours. Every
    /// threat whose enclosure touches the window is dropped first and,
    /// if still live, rediscovered -- see [`crate::threats::AllThreats::retain_not_touching`].
    fn refresh_threats(&mut self, ind: Point) {
        let geo = Arc::clone(&self.geo);
        let window = local_window(&geo, ind, THREAT_RESCAN_RADIUS);

        for who in [Color::Black, Color::White] {
            self.threats[who.index()].retain_not_touching(&window);
            self.threats[who.index()].retain_2moves_not_touching(&window);
        }

        for who in [Color::Black, Color::White] {
            let opp = who.opposite();

            for &q in &window {
                if let Some(encl) = self.encl_threat_at(&geo, q, who) {
                    let z = encl.zobrist(&geo);
                    if self.threats[who.index()].find_threat_at(q, z).is_none() {
                        let mut t = Threat::new(encl.clone(), z);
                        t.r#where = Some(q);
                        t.kind = ENCL;
                        t.opp_dots = self.count_opp_dots(&encl, opp);
                        t.terr_points = encl.interior_size() as i16 - t.opp_dots;
                        self.threats[who.index()].add_threat(t);
                    }
                }
            }

            for (i, &q) in window.iter().enumerate() {
                for &q2 in &window[i + 1..] {
                    if geo.chebyshev(q, q2) > 2 {
                        continue;
                    }
                    if let Some(encl) = self.encl_threat2_at(&geo, q, q2, who) {
                        let z = encl.zobrist(&geo);
                        let safe0 = self.threats[opp.index()].is_in_encl[q] == 0;
                        let safe1 = self.threats[opp.index()].is_in_encl[q2] == 0;

                        let mut t = Threat::new(encl.clone(), z);
                        t.kind = ENCL;
                        t.opp_dots = self.count_opp_dots(&encl, opp);
                        t.terr_points = encl.interior_size() as i16 - t.opp_dots;

                        self.threats[who.index()].add_threat_2moves(&geo, q, q2, safe0, safe1, t);
                    }
                }
            }
        }
    }

    fn count_opp_dots(&self, encl: &Enclosure, opp: Color) -> i16 {
        encl.interior.iter().filter(|&&p| self.worms.owner_at(p) == Some(opp)).count() as i16
    }

    /// Does placing a `who` dot at the empty point `q` complete an
    /// enclosure? Tests every orthogonal neighbour of `q` as a candidate
    /// interior point on a board that pretends `q` already belongs to
    /// `who`, without mutating the real board.
    fn encl_threat_at(&self, geo: &Geometry, q: Point, who: Color) -> Option<Arc<Enclosure>> {
        if self.worms.is_dot_at(q) {
            return None;
        }

        let pretend = [(q, who)];
        let view = PretendOwner::new(&self.worms, &pretend);

        for d in 0..4 {
            let nb = geo.nb4_of(q, d);
            if !geo.is_on_board(nb) {
                continue;
            }
            if let Some(encl) = find_enclosure(geo, &view, who, nb) {
                if encl.contains_border(q) {
                    return Some(encl);
                }
            }
        }

        None
    }

    /// Does placing `who` dots at both `q` and `q2` (in either order)
    /// complete an enclosure that uses both as border points? The two-move
    /// analogue of [`Self::encl_threat_at`].
    fn encl_threat2_at(&self, geo: &Geometry, q: Point, q2: Point, who: Color) -> Option<Arc<Enclosure>> {
        if self.worms.is_dot_at(q) || self.worms.is_dot_at(q2) {
            return None;
        }

        let pretend = [(q, who), (q2, who)];
        let view = PretendOwner::new(&self.worms, &pretend);

        for &base in &[q, q2] {
            for d in 0..4 {
                let nb = geo.nb4_of(base, d);
                if !geo.is_on_board(nb) {
                    continue;
                }
                if let Some(encl) = find_enclosure(geo, &view, who, nb) {
                    if encl.contains_border(q) && encl.contains_border(q2) {
                        return Some(encl);
                    }
                }
            }
        }

        None
    }

    /// Reclassifies `p` into `possible_moves`/`interesting_moves` from
    /// its freshly recomputed pattern values, unless it is now occupied
    /// or belongs to somebody's territory (left to the rule layer, which
    /// owns TERRM classification).
    fn reclassify(&mut self, p: Point) {
        if self.worms.is_dot_at(p) {
            return;
        }
        if self.possible_moves.class_of(p) == Some(movelists::TERRM) {
            return;
        }

        let black = self.patterns.get_value(p, Color::Black);
        let white = self.patterns.get_value(p, Color::White);
        let dame = black < 0 && white < 0;

        self.possible_moves.change_move(p, if dame { movelists::DAME } else { movelists::NEUTRAL });

        let symm = crate::patterns::patt3_symm().value(self.patterns.patt3_at[p]);
        let bucket = match symm {
            v if v >= 60 => movelists::MOVE_0,
            v if v >= 30 => movelists::MOVE_1,
            v if v > 0 => movelists::MOVE_2,
            _ => movelists::REMOVED,
        };
        self.interesting_moves.change_move(p, bucket);
    }
}

/// Every on-board point within Chebyshev `radius` of `center`, found by
/// walking a clamped `(2r+1)x(2r+1)` window of `(x, y)` offsets rather
/// than scanning the whole board -- the cost is independent of board size.
fn local_window(geo: &Geometry, center: Point, radius: i32) -> Vec<Point> {
    let cx = geo.x(center) as i32;
    let cy = geo.y(center) as i32;
    let mut out = Vec::with_capacity(((2 * radius + 1) * (2 * radius + 1)) as usize);

    for dx in -radius..=radius {
        let x = cx + dx;
        if x < 0 || x as usize >= geo.width {
            continue;
        }
        for dy in -radius..=radius {
            let y = cy + dy;
            if y < 0 || y as usize >= geo.height {
                continue;
            }
            out.push(geo.index(x as usize, y as usize));
        }
    }

    out
}

fn edge_index_of(geo: &Geometry, p: Point) -> usize {
    if geo.y(p) == 0 {
        0
    } else if geo.x(p) as usize == geo.width - 1 {
        1
    } else if geo.y(p) as usize == geo.height - 1 {
        2
    } else {
        3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placing_a_dot_removes_the_point_from_possible_moves() {
        let geo = Arc::new(Geometry::new(9, 9));
        let mut game = SimpleGame::new(geo.clone());
        let p = geo.index(4, 4);

        assert!(game.possible_moves.contains(p));

        game.place_dot(4, 4, Color::Black).unwrap();

        assert!(!game.possible_moves.contains(p));
        assert_eq!(game.owner_at(p), Some(Color::Black));
    }

    #[test]
    fn placing_on_an_occupied_point_is_rejected() {
        let geo = Arc::new(Geometry::new(9, 9));
        let mut game = SimpleGame::new(geo);

        game.place_dot(4, 4, Color::Black).unwrap();
        let err = game.place_dot(4, 4, Color::White).unwrap_err();

        assert_eq!(err, RuleError::Occupied);
    }

    #[test]
    fn history_records_every_placed_dot_in_order() {
        let geo = Arc::new(Geometry::new(9, 9));
        let mut game = SimpleGame::new(geo.clone());

        game.place_dot(1, 1, Color::Black).unwrap();
        game.place_dot(2, 2, Color::White).unwrap();

        assert_eq!(game.history.len(), 2);
        assert_eq!(game.history.last().unwrap().who, Color::White);
        assert_eq!(game.history.last_but_one().unwrap().mv, geo.index(1, 1));
    }
}
