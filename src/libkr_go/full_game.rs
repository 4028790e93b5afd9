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

//! The rule layer: `make_move` composes `SimpleGame::place_dot` with
//! enclosure resolution, "must-surround" cleanup, and the end-of-move
//! safety/pattern refresh. This is the surface the MCTS tree and the
//! playout policy drive.

use std::sync::Arc;

use kr_utils::RuleError;

use crate::enclosure::{find_enclosure, CellView, Enclosure};
use crate::geometry::{Color, Geometry, Point};
use crate::safety::UpdateScope;
use crate::simple_game::SimpleGame;
use crate::worm::SoftSafetyUpdate;

/// A fully-specified move: the dot to place plus whichever enclosures
/// the player chose to close this turn (mandatory captures always
/// appear first; anything past that is optional).
#[derive(Clone, Debug)]
pub struct Move {
    pub x: usize,
    pub y: usize,
    pub who: Color,
    pub enclosures: Vec<Arc<Enclosure>>,
}

#[derive(Clone)]
pub struct Game {
    pub simple: SimpleGame,
    pub komi: i32,
    pub must_surround: bool,
    pub consecutive_dame: u32,
}

impl Game {
    pub fn new(geo: Arc<Geometry>) -> Self {
        Game {
            simple: SimpleGame::new(geo),
            komi: 0,
            must_surround: false,
            consecutive_dame: 0,
        }
    }

    pub fn now_moves(&self) -> Color {
        self.simple.now_moves
    }

    /// Every legal enclosure a dot at `(x, y)` of colour `who` would
    /// newly complete, found by probing the finder from each of the
    /// played point's empty or opponent-owned orthogonal neighbours.
    pub fn enclosures_available_at(&self, x: usize, y: usize, who: Color) -> Vec<Arc<Enclosure>> {
        let ind = self.simple.geo.index(x, y);
        let mut out = Vec::new();

        for d in 0..4 {
            let nb = self.simple.geo.nb4_of(ind, d);
            if !self.simple.geo.is_on_board(nb) {
                continue;
            }
            if let Some(encl) = find_enclosure(&self.simple.geo, &self.simple.worms, who, nb) {
                if !out.iter().any(|e: &Arc<Enclosure>| e.zobrist(&self.simple.geo) == encl.zobrist(&self.simple.geo)) {
                    out.push(encl);
                }
            }
        }

        out
    }

    /// Plays `mv`, applying every selected enclosure and refreshing
    /// derived state. Rejects only programming errors (occupied point);
    /// a missing mandatory enclosure is filled in automatically when
    /// `must_surround` is set.
    pub fn make_move(&mut self, mv: Move) -> Result<(), RuleError> {
        let dirty = self.simple.place_dot(mv.x, mv.y, mv.who)?;
        let mut scope = dirty.update_soft_safety;

        for encl in mv.enclosures {
            self.make_enclosure(&encl, mv.who);
            scope = scope.upgrade_all();
        }

        if self.must_surround {
            self.surround_remaining_opponent_dots(mv.who);
        }

        match scope {
            SoftSafetyUpdate::AllMargins => self.simple.safety.update_after_move(&self.simple.geo, &self.simple.worms, UpdateScope::AllMargins),
            SoftSafetyUpdate::Point(p) => self.simple.safety.update_after_move(&self.simple.geo, &self.simple.worms, UpdateScope::MarginsContaining(p)),
            SoftSafetyUpdate::None => {}
        }

        let was_dame = self.simple.possible_moves.class_of(self.simple.geo.index(mv.x, mv.y)).is_none()
            && self.simple.patterns.get_value(self.simple.geo.index(mv.x, mv.y), mv.who) < 0;
        self.consecutive_dame = if was_dame { self.consecutive_dame + 1 } else { 0 };

        self.simple.now_moves = self.simple.now_moves.opposite();

        Ok(())
    }

    /// Folds an enclosure's interior into the worm that was just placed
    /// on its border: empty cells become new dots for `who`, opponent
    /// dots are captured via an other-colour merge, and any own threat
    /// whose interior the enclosure swallows is dropped.
    fn make_enclosure(&mut self, encl: &Enclosure, who: Color) {
        let geo = Arc::clone(&self.simple.geo);
        let border_worm = encl
            .border
            .iter()
            .find(|&&p| self.simple.worms.owner_at(p) == Some(who))
            .map(|&p| self.simple.worms.worm_id_at(p));

        let Some(dst) = border_worm else { return };

        for &p in encl.interior.iter() {
            if self.simple.worms.is_dot_at(p) {
                let src = self.simple.worms.worm_id_at(p);
                if self.simple.worms.owner_at(p) != Some(who) {
                    self.simple.worms.merge_capture(dst, src);
                }
            } else {
                self.simple.possible_moves.remove(p);
                self.simple.interesting_moves.remove(p);
                self.simple.worms.adopt_into(&geo, p, dst, who);
            }
        }

        for &p in encl.interior.iter() {
            self.simple.worms.refresh_conn_at(&geo, p);
            if !self.simple.worms.is_dot_at(p) {
                self.simple.patterns.recalculate_point(&geo, &self.simple.worms, p);
            }
        }

        // Drop every threat (ours and theirs) the newly-claimed ground
        // touches before recording the realized capture, so the one we
        // add next survives the sweep.
        let swallowed: Vec<Point> = encl.interior.iter().copied().chain(encl.border.iter().copied()).collect();
        for owner in [who, who.opposite()] {
            self.simple.threats[owner.index()].retain_not_touching(&swallowed);
            self.simple.threats[owner.index()].retain_2moves_not_touching(&swallowed);
        }

        let mut realized = crate::threats::Threat::new(Arc::new(encl.clone()), encl.zobrist(&geo));
        realized.kind = crate::threats::TERR;
        realized.terr_points = encl.interior.iter().filter(|&&p| !self.simple.worms.is_dot_at(p)).count() as i16;
        // `add_threat` always books the interior into `is_in_encl`; move it
        // into `is_in_terr` since this capture is already realized, not a
        // future option.
        self.simple.threats[who.index()].add_threat(realized.clone());
        self.simple.threats[who.index()].change_encl_to_terr(&realized);
    }

    /// "Must-surround" cleanup: scans our territory for opponent dots
    /// that are not yet captured and wraps each in a fresh enclosure.
    fn surround_remaining_opponent_dots(&mut self, who: Color) {
        let geo = Arc::clone(&self.simple.geo);
        let opp = who.opposite();

        let stray: Vec<Point> = geo
            .all_points()
            .filter(|&p| self.simple.worms.owner_at(p) == Some(opp) && self.simple.threats[who.index()].is_in_terr[p] == 0)
            .collect();

        for p in stray {
            if let Some(encl) = find_enclosure(&geo, &self.simple.worms, who, p) {
                log::trace!("must-surround closed a stray enclosure around point {}", p);
                self.make_enclosure(&encl, who);
            }
        }
    }
}

impl SoftSafetyUpdate {
    fn upgrade_all(self) -> SoftSafetyUpdate {
        match self {
            SoftSafetyUpdate::None => SoftSafetyUpdate::None,
            other => { let _ = other; SoftSafetyUpdate::AllMargins }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_move_places_a_dot_and_flips_now_moves() {
        let geo = Arc::new(Geometry::new(9, 9));
        let mut game = Game::new(geo.clone());

        game.make_move(Move { x: 4, y: 4, who: Color::Black, enclosures: Vec::new() }).unwrap();

        assert_eq!(game.simple.owner_at(geo.index(4, 4)), Some(Color::Black));
        assert_eq!(game.now_moves(), Color::White);
    }

    #[test]
    fn one_point_enclosure_captures_the_single_interior_dot() {
        // Black dots at cb/bc/dc/cd close a diamond around a lone White
        // dot at cc. The closing dot (cd) is itself one of the four
        // orthogonal border points, so the capture can only be found once
        // it is actually on the board -- `must_surround` re-scans for
        // exactly that after every move, which is what realizes it here.
        let geo = Arc::new(Geometry::new(9, 9));
        let mut game = Game::new(geo.clone());
        game.must_surround = true;

        game.make_move(Move { x: 2, y: 2, who: Color::White, enclosures: Vec::new() }).unwrap();
        game.make_move(Move { x: 2, y: 1, who: Color::Black, enclosures: Vec::new() }).unwrap();
        game.make_move(Move { x: 1, y: 2, who: Color::Black, enclosures: Vec::new() }).unwrap();
        game.make_move(Move { x: 3, y: 2, who: Color::Black, enclosures: Vec::new() }).unwrap();
        game.make_move(Move { x: 2, y: 3, who: Color::Black, enclosures: Vec::new() }).unwrap();

        let centre = geo.index(2, 2);
        assert_eq!(game.simple.owner_at(centre), Some(Color::Black));
    }
}
