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

//! The single-threaded playout policy: a weighted heuristic cascade run
//! to completion (two consecutive dame moves, or no legal move left) on
//! a per-worker clone of the game. One random 24-bit word decides, per
//! ply, which heuristic in the cascade gets first refusal.

use std::collections::HashMap;

use rand::Rng;

use kr_go::enclosure::CellView;
use kr_go::full_game::{Game, Move};
use kr_go::geometry::{Color, Point};
use kr_go::ladder;
use kr_go::movelists::{self, random_move};
use kr_go::scoring;
use kr_go::worm::SAFE_THRESHOLD;

/// Remembers, per opponent move, the reply that was played immediately
/// after it the last time that reply's side went on to win -- the
/// "last-good-reply" heuristic. Lives for the duration of one search,
/// one table per worker thread.
#[derive(Default)]
pub struct LastGoodReply {
    table: HashMap<Point, Point>,
}

impl LastGoodReply {
    pub fn new() -> Self {
        LastGoodReply::default()
    }

    fn suggest(&self, last_move: Point) -> Option<Point> {
        self.table.get(&last_move).copied()
    }

    fn remember(&mut self, opponent_move: Point, our_reply: Point) {
        self.table.insert(opponent_move, our_reply);
    }
}

/// One full playout starting from `game`'s current position, mutating it
/// move by move until the game ends. Returns the value from `root_who`'s
/// perspective, already squashed into `[0.04, 0.96]`, plus the `(who,
/// point)` trace of every move played -- the AMAF/RAVE backprop step
/// needs it to credit sibling edges whose move shows up later in the
/// same rollout.
pub fn run_playout(game: &mut Game, root_who: Color, rng: &mut impl Rng, lgr: &mut LastGoodReply) -> (f32, Vec<(Color, Point)>) {
    let mut trace = Vec::new();

    loop {
        if game.simple.possible_moves.total_len() == 0 || game.consecutive_dame >= 2 {
            break;
        }

        let who = game.now_moves();
        let before_last = game.simple.history.last();

        let chosen = pick_move(game, who, rng, lgr);
        let Some(p) = chosen else { break };

        play(game, p, who);
        trace.push((who, p));

        if let Some(ply) = before_last {
            if ply.who != who {
                lgr.remember(ply.mv, p);
            }
        }
    }

    let score = scoring::score(game);
    let value = scoring::value_of(&score, root_who, game.simple.geo.width, game.simple.geo.height);
    (value, trace)
}

fn play(game: &mut Game, p: Point, who: Color) {
    let (x, y) = (game.simple.geo.x(p) as usize, game.simple.geo.y(p) as usize);
    let enclosures = game.enclosures_available_at(x, y, who);
    let _ = game.make_move(Move { x, y, who, enclosures });
}

/// Runs the bit-table cascade from the specification: the first
/// heuristic to produce a legal, still-open point wins. Falls back to a
/// uniform pick from `possible_moves` (preferring NEUTRAL, then TERRM,
/// then DAME) if nothing upstream fires.
fn pick_move(game: &Game, who: Color, rng: &mut impl Rng, lgr: &LastGoodReply) -> Option<Point> {
    let r: u32 = rng.gen::<u32>() & 0x00ff_ffff;
    let opp = who.opposite();
    let last = game.simple.history.last();
    let last_but_one = game.simple.history.last_but_one();

    let forbidden = last.and_then(|ply| {
        let result = ladder::check_ladder(game, opp, ply.mv);
        if result.status == ladder::ATTACKER_WINS {
            result.next_defender
        } else {
            None
        }
    });

    let is_open = |p: Point| game.simple.possible_moves.contains(p) && Some(p) != forbidden;

    if r & 0x1_0000 != 0 {
        if let Some(ply) = last {
            if let Some(p) = lgr.suggest(ply.mv).filter(|&p| is_open(p)) {
                return Some(p);
            }
        }
    }
    if r & 0xc00 != 0 {
        if let Some(p) = atari_response(game, last.map(|p| p.mv), who, is_open) {
            return Some(p);
        }
    }
    if r & 0xc000 != 0 {
        if let Some(p) = safety_suggestion(game, who, true, rng, is_open) {
            return Some(p);
        }
    }
    if r & 0x300 != 0 {
        if let Some(ply) = last {
            if let Some(p) = pattern3_around(game, ply.mv, who, is_open) {
                return Some(p);
            }
        }
    }
    if r & 0x2000 != 0 {
        if let Some(p) = safety_suggestion(game, who, false, rng, is_open) {
            return Some(p);
        }
    }
    if r & 0x4 != 0 {
        if let Some(ply) = last_but_one {
            if let Some(p) = pattern3_around(game, ply.mv, who, is_open) {
                return Some(p);
            }
        }
    }
    if r & 0x2 != 0 {
        if let Some(p) = atari_move(game, who, is_open) {
            return Some(p);
        }
    }
    if r & 0x80 != 0 {
        if let Some(p) = interesting_move_pick(game, rng, is_open) {
            return Some(p);
        }
    }
    if r & 0x1 != 0 {
        if let Some(p) = safety_suggestion(game, who, true, rng, is_open).or_else(|| safety_suggestion(game, who, false, rng, is_open)) {
            return Some(p);
        }
    }

    random_move(&game.simple.possible_moves, rng).filter(|&p| is_open(p))
}

fn atari_response(game: &Game, last_move: Option<Point>, who: Color, is_open: impl Fn(Point) -> bool) -> Option<Point> {
    let last_move = last_move?;
    let geo = &game.simple.geo;

    for d in 0..8 {
        let nb = geo.nb8_of(last_move, d);
        if !geo.is_on_board(nb) || !game.simple.worms.is_dot_at(nb) {
            continue;
        }
        if game.simple.worms.owner_at(nb) != Some(who) {
            continue;
        }
        let id = game.simple.worms.worm_id_at(nb);
        let descr = game.simple.worms.descr(id);
        if descr.safety >= SAFE_THRESHOLD {
            continue;
        }

        if let Some(reply) = ladder::check_ladder(game, who, last_move).next_attacker {
            if is_open(reply) {
                return Some(reply);
            }
        }
    }

    None
}

fn safety_suggestion(game: &Game, who: Color, just_added: bool, rng: &mut impl Rng, is_open: impl Fn(Point) -> bool) -> Option<Point> {
    let good = if just_added {
        game.simple.safety.currently_added_suggestions()
    } else {
        game.simple.safety.previously_added_suggestions()
    };

    let candidates: Vec<Point> = good.for_player[who.index()].iter().copied().filter(|&p| is_open(p)).collect();
    if candidates.is_empty() {
        return None;
    }
    Some(candidates[rng.gen_range(0..candidates.len())])
}

fn pattern3_around(game: &Game, anchor: Point, who: Color, is_open: impl Fn(Point) -> bool) -> Option<Point> {
    let geo = &game.simple.geo;
    let mut best: Option<(Point, i16)> = None;

    for d in 0..8 {
        let nb = geo.nb8_of(anchor, d);
        if !geo.is_on_board(nb) || !is_open(nb) {
            continue;
        }
        let v = game.simple.patterns.get_value(nb, who);
        if v > 0 && best.map_or(true, |(_, bv)| v > bv) {
            best = Some((nb, v));
        }
    }

    best.map(|(p, _)| p)
}

fn atari_move(game: &Game, who: Color, is_open: impl Fn(Point) -> bool) -> Option<Point> {
    let geo = &game.simple.geo;
    let opp = who.opposite();

    for id in game.simple.worms.all_worm_ids() {
        let descr = game.simple.worms.descr(id);
        if descr.owner != opp || descr.is_safe() {
            continue;
        }

        for dot in game.simple.worms.dots_of(id) {
            for d in 0..4 {
                let nb = geo.nb4_of(dot, d);
                if geo.is_on_board(nb) && is_open(nb) {
                    return Some(nb);
                }
            }
        }
    }

    None
}

fn interesting_move_pick(game: &Game, rng: &mut impl Rng, is_open: impl Fn(Point) -> bool) -> Option<Point> {
    for bucket in [movelists::MOVE_0, movelists::MOVE_1, movelists::MOVE_2] {
        let candidates: Vec<Point> = game.simple.interesting_moves.bucket(bucket).iter().copied().filter(|&p| is_open(p)).collect();
        if !candidates.is_empty() {
            return Some(candidates[rng.gen_range(0..candidates.len())]);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use kr_go::Geometry;
    use rand::SeedableRng;
    use std::sync::Arc;

    #[test]
    fn a_playout_terminates_and_returns_a_value_in_range() {
        let geo = Arc::new(Geometry::new(7, 7));
        let mut game = Game::new(geo);
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let mut lgr = LastGoodReply::new();

        let (v, _trace) = run_playout(&mut game, Color::Black, &mut rng, &mut lgr);

        assert!((0.0..=1.0).contains(&v));
    }

    #[test]
    fn playouts_are_deterministic_for_a_fixed_seed() {
        let geo = Arc::new(Geometry::new(7, 7));
        let mut a = Game::new(geo.clone());
        let mut b = Game::new(geo);

        let mut rng_a = rand::rngs::StdRng::seed_from_u64(7);
        let mut rng_b = rand::rngs::StdRng::seed_from_u64(7);
        let mut lgr_a = LastGoodReply::new();
        let mut lgr_b = LastGoodReply::new();

        let (va, _) = run_playout(&mut a, Color::Black, &mut rng_a, &mut lgr_a);
        let (vb, _) = run_playout(&mut b, Color::Black, &mut rng_b, &mut lgr_b);

        assert_eq!(va, vb);
    }
}
