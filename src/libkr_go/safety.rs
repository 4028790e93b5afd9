// Copyright 2021 Bartek Dyda <bartekdyda@protonmail.com>
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

//! Soft (edge-margin) safety: a continuous per-point, per-direction
//! value walked along each of the four board edges, used to seed dame
//! classification and playout-policy priors near the border. Distinct
//! from hard safety, which lives on the worm itself (see [`crate::worm`]).

use crate::enclosure::CellView;
use crate::geometry::{Color, Geometry, Point};
use crate::worm::{Worms, SAFE_THRESHOLD};

const GOOD_MOVE: i16 = 10;
const BAD_MOVE: i16 = -10;

/// Added to a still-good move value while ageing, so a value that is not
/// reconfirmed this round can be told apart from a fresh one.
const AGE_OFFSET: i16 = 10_000;
const AGE_THRESHOLD: i16 = 5_000;

#[derive(Copy, Clone, Debug, Default)]
pub struct Info {
    /// `saf[2*who + dir]`, `who` in {0,1}, `dir` in {0,1} (a margin is
    /// walked corner-to-corner in both directions, so every point on it
    /// picks up one contribution per direction per player).
    pub saf: [f32; 4],
}

impl Info {
    pub fn get_players_dir(&self, who: Color, dir: usize) -> f32 {
        self.saf[2 * who.index() + dir]
    }

    pub fn set_players_dir(&mut self, who: Color, dir: usize, v: f32) {
        self.saf[2 * who.index() + dir] = v;
    }

    pub fn sum(&self) -> f32 {
        self.saf.iter().sum()
    }
}

pub type ValueForBoth = [i16; 2];

#[derive(Default, Clone)]
pub struct GoodMoves {
    pub for_player: [Vec<Point>; 2],
}

/// What a call to [`Safety::update_after_move`] should recompute.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UpdateScope {
    AllMargins,
    MarginsContaining(Point),
}

/// One of the board's four edges, walked corner to corner by
/// [`Safety::compute_safety`] and [`Safety::find_move_values`].
#[derive(Copy, Clone)]
enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    const ALL: [Side; 4] = [Side::Top, Side::Right, Side::Bottom, Side::Left];

    fn len(self, geo: &Geometry) -> usize {
        match self {
            Side::Top | Side::Bottom => geo.width,
            Side::Left | Side::Right => geo.height,
        }
    }

    /// The point `depth` steps in from this side at tangential position
    /// `t` (`depth == 0` is the true edge, `depth == 1` one step toward
    /// the centre).
    fn axis_point(self, geo: &Geometry, t: usize, depth: usize) -> Point {
        match self {
            Side::Top => geo.index(t, depth),
            Side::Bottom => geo.index(t, geo.height - 1 - depth),
            Side::Left => geo.index(depth, t),
            Side::Right => geo.index(geo.width - 1 - depth, t),
        }
    }

    /// The true edge row/column, corner to corner, each point paired
    /// with the point one step further in (consulted for a one-in
    /// defender's hard safety).
    fn edge_line(self, geo: &Geometry) -> Vec<(Point, Point)> {
        (0..self.len(geo)).map(|t| (self.axis_point(geo, t, 0), self.axis_point(geo, t, 1))).collect()
    }

    /// The row/column one step in from the edge, with the two corner
    /// cells excluded (they belong to the adjoining side's own walk),
    /// each point paired with the true edge point directly outside it.
    fn inner_line(self, geo: &Geometry) -> Vec<(Point, Point)> {
        let len = self.len(geo);
        (1..len.saturating_sub(1)).map(|t| (self.axis_point(geo, t, 1), self.axis_point(geo, t, 0))).collect()
    }

    /// How close `p` is to this particular side, used to decide whether
    /// a localized refresh needs to walk it at all.
    fn distance_from(self, geo: &Geometry, p: Point) -> i32 {
        match self {
            Side::Top => geo.y(p) as i32,
            Side::Bottom => geo.height as i32 - 1 - geo.y(p) as i32,
            Side::Left => geo.x(p) as i32,
            Side::Right => geo.width as i32 - 1 - geo.x(p) as i32,
        }
    }
}

fn reversed(line: &[(Point, Point)]) -> Vec<(Point, Point)> {
    line.iter().rev().copied().collect()
}

#[derive(Clone)]
pub struct Safety {
    safety: Vec<Info>,
    move_value: Vec<ValueForBoth>,
    just_added: GoodMoves,
    prev_added: GoodMoves,
}

impl Safety {
    pub fn new(geo: &Geometry) -> Self {
        Safety {
            safety: vec![Info::default(); geo.size()],
            move_value: vec![[0, 0]; geo.size()],
            just_added: GoodMoves::default(),
            prev_added: GoodMoves::default(),
        }
    }

    pub fn init(&mut self, geo: &Geometry, worms: &Worms) {
        self.compute_safety(geo, worms, UpdateScope::AllMargins);
        self.find_move_values(geo, worms);
        // The first observation of a position is not a move transition --
        // nothing should show up as "freshly suggested" by it.
        self.just_added = GoodMoves::default();
        self.prev_added = GoodMoves::default();
    }

    pub fn safety_of(&self, p: Point) -> f32 {
        self.safety[p].sum()
    }

    pub fn info_at(&self, p: Point) -> &Info {
        &self.safety[p]
    }

    pub fn move_value_at(&self, p: Point) -> ValueForBoth {
        self.move_value[p]
    }

    pub fn is_dame_for(&self, who: Color, p: Point) -> bool {
        self.move_value[p][who.index()] < 0
    }

    pub fn currently_added_suggestions(&self) -> &GoodMoves {
        &self.just_added
    }

    pub fn previously_added_suggestions(&self) -> &GoodMoves {
        &self.prev_added
    }

    /// Recomputes safety over the requested scope and refreshes move
    /// values, rotating the "just added" suggestions into "previous".
    pub fn update_after_move(&mut self, geo: &Geometry, worms: &Worms, scope: UpdateScope) {
        self.mark_moves_as_old();
        self.compute_safety(geo, worms, scope);
        self.find_move_values(geo, worms);
    }

    pub fn update_after_move_without_any_change(&mut self) {
        self.mark_moves_as_old();
    }

    fn mark_moves_as_old(&mut self) {
        self.prev_added = std::mem::take(&mut self.just_added);
    }

    /// Sets `move_value[p][who]`, recording `p` as a freshly added
    /// suggestion the first time it turns positive.
    fn set_move_value(&mut self, who: Color, p: Point, value: i16) {
        if value > 0 && self.move_value[p][who.index()] <= 0 {
            self.just_added.for_player[who.index()].push(p);
        }
        self.move_value[p][who.index()] = value;
    }

    fn age_move_values(&mut self, geo: &Geometry) {
        for p in geo.all_points() {
            if geo.dist(p) > 1 {
                continue;
            }
            for who in 0..2 {
                if self.move_value[p][who] > 0 {
                    self.move_value[p][who] += AGE_OFFSET;
                } else {
                    self.move_value[p][who] = 0;
                }
            }
        }
    }

    /// Drops any move value that aged past the threshold without being
    /// reconfirmed this round, and prunes stale "previously added"
    /// suggestions to match.
    fn prune_stale_suggestions(&mut self, geo: &Geometry) {
        for p in geo.all_points() {
            if geo.dist(p) > 1 {
                continue;
            }
            for who in 0..2 {
                if self.move_value[p][who] >= AGE_THRESHOLD {
                    self.move_value[p][who] = 0;
                }
            }
        }

        let move_value = &self.move_value;
        for who in 0..2 {
            self.prev_added.for_player[who].retain(|&p| move_value[p][who] > 0);
        }
    }

    /// Walks the four margins, each corner to corner in both directions,
    /// maintaining a running `current_safety[owner]` per the
    /// specification: it jumps to 1.0 on contact with a safe worm, it
    /// accumulates half the hard safety of a not-yet-safe worm across
    /// the empty points that follow it, and it resets to 0.0 on contact
    /// with the opponent.
    fn compute_safety(&mut self, geo: &Geometry, worms: &Worms, scope: UpdateScope) -> bool {
        let mut changed = false;

        for side in Side::ALL {
            if let UpdateScope::MarginsContaining(anchor) = scope {
                if side.distance_from(geo, anchor) > 2 {
                    continue;
                }
            }

            let edge = side.edge_line(geo);
            let inner = side.inner_line(geo);

            changed |= self.walk_margin(&edge, worms, 0);
            changed |= self.walk_margin(&reversed(&edge), worms, 1);
            changed |= self.walk_margin(&inner, worms, 0);
            changed |= self.walk_margin(&reversed(&inner), worms, 1);
        }

        changed
    }

    fn walk_margin(&mut self, line: &[(Point, Point)], worms: &Worms, dir: usize) -> bool {
        let mut changed = false;
        let mut current = [0.0f32; 2];

        for &(p, companion) in line {
            if let Some(owner) = worms.owner_at(p) {
                // Record the value carried in from earlier points first --
                // a dot's own hard safety must not double-count into its
                // own recorded soft safety, only into what follows it.
                changed |= self.set_dir(p, owner, dir, current[owner.index()]);
                changed |= self.set_dir(p, owner.opposite(), dir, 0.0);
                self.fold_in_contact(&mut current, worms, owner, p);
            } else {
                if let Some(comp_owner) = worms.owner_at(companion) {
                    self.fold_in_contact(&mut current, worms, comp_owner, companion);
                }
                for c in [Color::Black, Color::White] {
                    changed |= self.set_dir(p, c, dir, current[c.index()]);
                }
            }
        }

        changed
    }

    /// Applies one dot's contact to the running `current_safety`: jump
    /// to 1.0 if its worm is already safe, otherwise accumulate half its
    /// hard safety; always reset the opponent's running value to 0.0.
    fn fold_in_contact(&self, current: &mut [f32; 2], worms: &Worms, owner: Color, at: Point) {
        let who = owner.index();
        let opp = owner.opposite().index();
        let hard = worms.descr(worms.worm_id_at(at)).safety;

        if hard >= SAFE_THRESHOLD {
            current[who] = 1.0;
        } else {
            current[who] = (current[who] + 0.5 * hard as f32).min(1.0);
        }
        current[opp] = 0.0;
    }

    fn set_dir(&mut self, p: Point, who: Color, dir: usize, value: f32) -> bool {
        let before = self.safety[p].get_players_dir(who, dir);
        self.safety[p].set_players_dir(who, dir, value);
        (before - value).abs() > f32::EPSILON
    }

    /// Derives `move_value[p]` from the freshly walked safety, following
    /// the four-case table: a worm at hard+soft safety ≥ 2 makes its
    /// empty neighbour dame for both; a lone hard=1 worm makes its true
    /// edge neighbour (and the two diagonal extensions) a good defence;
    /// hard=0 worms propose side extensions above soft ≥ 0.75 and a
    /// diagonal edge jump at soft == 0.5.
    fn find_move_values(&mut self, geo: &Geometry, worms: &Worms) {
        self.age_move_values(geo);

        for side in Side::ALL {
            self.find_move_values_on_edge(&side.edge_line(geo), worms);
            self.find_move_values_on_inner(&side.inner_line(geo), worms);
        }

        self.prune_stale_suggestions(geo);
    }

    /// A dot sitting directly on the true edge is always safe (infinite
    /// hard safety), so only the first case of the table ever applies:
    /// its empty neighbours along the edge are dame for both players.
    fn find_move_values_on_edge(&mut self, edge: &[(Point, Point)], worms: &Worms) {
        for i in 0..edge.len() {
            let (p, _) = edge[i];
            if worms.owner_at(p).is_none() {
                continue;
            }

            let prev = if i > 0 { Some(edge[i - 1]) } else { None };
            let next = edge.get(i + 1).copied();

            for (nbr, _) in [prev, next].into_iter().flatten() {
                if worms.owner_at(nbr).is_none() {
                    self.set_move_value(Color::Black, nbr, BAD_MOVE);
                    self.set_move_value(Color::White, nbr, BAD_MOVE);
                }
            }
        }
    }

    /// A dot one step in from the edge can still be under-defended, so
    /// all four cases of the table apply, keyed off its own hard safety
    /// and the soft safety accumulated by [`Safety::compute_safety`].
    fn find_move_values_on_inner(&mut self, inner: &[(Point, Point)], worms: &Worms) {
        for i in 0..inner.len() {
            let (p, edge_pt) = inner[i];
            let owner = match worms.owner_at(p) {
                Some(c) => c,
                None => continue,
            };

            let hard = worms.descr(worms.worm_id_at(p)).safety as f32;
            let soft = self.safety_of(p);
            let prev = if i > 0 { Some(inner[i - 1]) } else { None };
            let next = inner.get(i + 1).copied();

            if hard + soft >= 2.0 {
                if worms.owner_at(edge_pt).is_none() {
                    self.set_move_value(Color::Black, edge_pt, BAD_MOVE);
                    self.set_move_value(Color::White, edge_pt, BAD_MOVE);
                }
                continue;
            }

            if hard == 1.0 && soft == 0.0 {
                if worms.owner_at(edge_pt).is_none() {
                    self.set_move_value(Color::Black, edge_pt, GOOD_MOVE);
                    self.set_move_value(Color::White, edge_pt, GOOD_MOVE);
                }
                for (ext_p, ext_edge) in [next, prev].into_iter().flatten() {
                    if worms.owner_at(ext_p).is_none() && worms.owner_at(ext_edge).is_none() {
                        self.set_move_value(owner, ext_p, GOOD_MOVE);
                        self.set_move_value(owner, ext_edge, GOOD_MOVE);
                    }
                }
                continue;
            }

            if hard == 0.0 && (0.75..=1.0).contains(&soft) {
                for (ext_p, ext_edge) in [next, prev].into_iter().flatten() {
                    if worms.owner_at(ext_p).is_none() && worms.owner_at(ext_edge).is_none() {
                        self.set_move_value(Color::Black, ext_p, GOOD_MOVE);
                        self.set_move_value(Color::White, ext_p, GOOD_MOVE);
                    }
                }
                continue;
            }

            if hard == 0.0 && (soft - 0.5).abs() < f32::EPSILON {
                for (ext_p, ext_edge) in [next, prev].into_iter().flatten() {
                    if worms.owner_at(ext_p).is_none() && worms.owner_at(ext_edge).is_none() {
                        self.set_move_value(Color::Black, ext_edge, GOOD_MOVE);
                        self.set_move_value(Color::White, ext_edge, GOOD_MOVE);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_board_has_zero_safety_everywhere_near_the_edge() {
        let geo = Geometry::new(9, 9);
        let worms = Worms::new(&geo);
        let mut safety = Safety::new(&geo);

        safety.init(&geo, &worms);

        let edge = geo.index(4, 0);
        assert_eq!(safety.safety_of(edge), 0.0);
    }

    #[test]
    fn friendly_dots_along_the_edge_raise_safety_for_their_owner() {
        let geo = Geometry::new(9, 9);
        let mut worms = Worms::new(&geo);
        let mut safety = Safety::new(&geo);

        worms.place_dot(&geo, 3, 0, Color::Black);
        worms.place_dot(&geo, 5, 0, Color::Black);
        safety.init(&geo, &worms);

        let gap = geo.index(4, 0);
        assert!(safety.info_at(gap).get_players_dir(Color::Black, 0) > 0.0);
    }

    #[test]
    fn dame_points_have_negative_move_value() {
        let geo = Geometry::new(9, 9);
        let mut worms = Worms::new(&geo);
        let mut safety = Safety::new(&geo);

        worms.place_dot(&geo, 3, 0, Color::White);
        worms.place_dot(&geo, 5, 0, Color::White);
        safety.init(&geo, &worms);

        let gap = geo.index(4, 0);
        assert!(safety.is_dame_for(Color::Black, gap));
    }

    #[test]
    fn lone_one_in_dot_proposes_its_true_edge_neighbour_as_good_defence() {
        let geo = Geometry::new(9, 9);
        let mut worms = Worms::new(&geo);
        let mut safety = Safety::new(&geo);

        worms.place_dot(&geo, 3, 1, Color::Black);
        safety.init(&geo, &worms);

        let outward = geo.index(3, 0);
        assert_eq!(safety.move_value_at(outward), [GOOD_MOVE, GOOD_MOVE]);
    }

    #[test]
    fn margins_containing_scope_skips_distant_sides() {
        let geo = Geometry::new(9, 9);
        let mut worms = Worms::new(&geo);
        let mut safety = Safety::new(&geo);

        safety.init(&geo, &worms);
        worms.place_dot(&geo, 3, 1, Color::Black);
        safety.update_after_move(&geo, &worms, UpdateScope::MarginsContaining(geo.index(3, 1)));

        let outward = geo.index(3, 0);
        assert_eq!(safety.move_value_at(outward), [GOOD_MOVE, GOOD_MOVE]);

        let far_side = geo.index(0, 4);
        assert_eq!(safety.safety_of(far_side), 0.0);
    }
}
