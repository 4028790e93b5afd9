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

//! One-move and two-move enclosure threats, and the board-wide indexes
//! (`is_in_encl`, `is_in_terr`, ...) that let the move-list and playout
//! layers ask "is this point inside somebody's threat" in O(1).

use std::sync::Arc;

use crate::enclosure::Enclosure;
use crate::geometry::{Color, Geometry, Point};

pub const TERR: u16 = 1;
pub const ENCL: u16 = 2;
pub const TO_REMOVE: u16 = 64;
pub const TO_CHECK: u16 = 128;

pub mod threat2m_flags {
    pub const FLAG_SAFE: u16 = 1;
    pub const FLAG_RECALCULATE: u16 = 2;
}

pub mod encl2_flags {
    pub const MIAI: u16 = 1;
    pub const INSIDE_ADD: u16 = 2;
    pub const INSIDE_THRESHOLD: u16 = 2 * INSIDE_ADD;
}

/// A single "play one dot, this enclosure captures/claims territory"
/// threat, or (when reused inside a [`Threat2m`]) one leg of a two-move
/// combination.
#[derive(Clone, Debug)]
pub struct Threat {
    /// Where to put the dot that realizes this threat. `None` for a
    /// territory threat that needs no further move.
    pub r#where: Option<Point>,
    pub kind: u16,
    pub terr_points: i16,
    pub opp_dots: i16,
    pub singular_dots: i16,
    pub border_dots_in_danger: i16,
    pub zobrist_key: u64,
    pub encl: Arc<Enclosure>,
    pub opp_thr: Vec<u64>,
    /// Points that would make both legs of a two-move threat redundant
    /// with each other; unused for single-move threats.
    pub shortcuts: [Option<Point>; 4],
}

impl Threat {
    pub fn new(encl: Arc<Enclosure>, zobrist_key: u64) -> Self {
        Threat {
            r#where: None,
            kind: 0,
            terr_points: 0,
            opp_dots: 0,
            singular_dots: 0,
            border_dots_in_danger: 0,
            zobrist_key,
            encl,
            opp_thr: Vec::new(),
            shortcuts: [None; 4],
        }
    }

    pub fn is_shortcut(&self, x: Point) -> bool {
        self.shortcuts.contains(&Some(x))
    }

    /// Finds, for each of the two threat points, the (at most two)
    /// interior or border points that would render the *other* leg
    /// redundant -- these are excluded from move generation for the
    /// opponent's single defensive reply.
    pub fn add_shortcuts(&mut self, geo: &Geometry, ind0: Point, ind1: Point) {
        self.shortcuts = [None; 4];
        let mut count = 0;

        let border = &self.encl.border;
        debug_assert_eq!(border.first(), border.last());

        for ind in [ind0, ind1] {
            let nr = border.iter().position(|&b| b == ind).unwrap_or(0);
            let (prev, next) = if nr > 0 {
                (border[nr - 1], border[nr + 1])
            } else {
                (border[border.len() - 2], border[1])
            };

            for d in 0..4 {
                let nb = geo.nb4_of(ind, d);
                if is_in_neighbourhood(geo, nb, prev) && is_in_neighbourhood(geo, nb, next) {
                    debug_assert!(count < 4);
                    self.shortcuts[count] = Some(nb);
                    count += 1;
                }
            }
        }
    }
}

fn is_in_neighbourhood(geo: &Geometry, p: Point, q: Point) -> bool {
    geo.chebyshev(p, q) <= 1
}

/// A bundle of `Threat`s that all share the same first point `where0`:
/// the opponent playing there would let us realize whichever of these
/// is still live.
#[derive(Clone, Debug, Default)]
pub struct Threat2m {
    pub where0: Point,
    pub min_win: i16,
    pub min_win2: i16,
    pub flags: u16,
    pub win_move_count: i16,
    /// Per-point capture-strength accumulator; empty until a second
    /// capturing threat appears (mirrors the lazily-allocated original).
    pub is_in_encl2: Vec<u16>,
    pub thr_list: Vec<Threat>,
}

impl Threat2m {
    pub fn is_safe(&self) -> bool {
        self.flags & threat2m_flags::FLAG_SAFE != 0
    }
}

/// All currently-live threats for one colour, plus the point-indexed
/// membership counters used by move generation and the playout policy.
#[derive(Clone)]
pub struct AllThreats {
    pub threats: Vec<Threat>,
    pub threats2m: Vec<Threat2m>,
    pub is_in_encl: Vec<i16>,
    pub is_in_terr: Vec<i16>,
    pub is_in_border: Vec<i16>,
    pub is_in_2m_encl: Vec<i16>,
    pub is_in_2m_miai: Vec<i16>,
}

impl AllThreats {
    pub fn new(geo: &Geometry) -> Self {
        AllThreats {
            threats: Vec::new(),
            threats2m: Vec::new(),
            is_in_encl: vec![0; geo.size()],
            is_in_terr: vec![0; geo.size()],
            is_in_border: vec![0; geo.size()],
            is_in_2m_encl: vec![0; geo.size()],
            is_in_2m_miai: vec![0; geo.size()],
        }
    }

    pub fn find_threat_which_contains(&self, ind: Point) -> Option<&Threat> {
        self.threats.iter().find(|t| t.encl.contains_interior(ind) || t.encl.contains_border(ind))
    }

    pub fn find_threat_zobrist(&self, zobr: u64) -> Option<&Threat> {
        self.threats.iter().find(|t| t.zobrist_key == zobr)
    }

    /// Finds a specific one-move threat by its realizing point and
    /// enclosure identity, used by the incremental scan to dedupe a
    /// candidate against one already tracked.
    pub fn find_threat_at(&self, where_p: Point, zobr: u64) -> Option<&Threat> {
        self.threats.iter().find(|t| t.r#where == Some(where_p) && t.zobrist_key == zobr)
    }

    pub fn add_threat(&mut self, t: Threat) {
        for &p in t.encl.interior.iter() {
            self.is_in_encl[p] += 1;
        }
        for &p in t.encl.border.iter() {
            self.is_in_border[p] += 1;
        }
        self.threats.push(t);
    }

    /// Converts an already-placed `ENCL` threat into a standing `TERR`
    /// claim once its dot has actually been played.
    pub fn change_encl_to_terr(&mut self, t: &Threat) {
        for &p in t.encl.interior.iter() {
            self.is_in_encl[p] -= 1;
            self.is_in_terr[p] += 1;
        }
    }

    /// Registers that playing `ind0` then `ind1` (in either order)
    /// realizes threat `t`. Returns the number of fresh `Threat2m`
    /// buckets created (0, 1 or 2).
    pub fn add_threat_2moves(&mut self, geo: &Geometry, ind0: Point, ind1: Point, safe0: bool, safe1: bool, mut t: Threat) -> i32 {
        t.add_shortcuts(geo, ind0, ind1);

        let mut added = 0;
        let mut pair = [(ind0, safe0), (ind1, safe1)];

        for i in 0..2 {
            let (first, safe) = pair[i];
            let (second, _) = pair[1 - i];
            let mut leg = t.clone();
            leg.r#where = Some(second);

            if let Some(pos) = self.threats2m.iter_mut().find(|t2| t2.where0 == first) {
                if pos.thr_list.iter().any(|tt| tt.zobrist_key == leg.zobrist_key) {
                    continue;
                }

                if leg.opp_dots > 0 {
                    pos.win_move_count += 1;
                    if leg.opp_dots > pos.min_win {
                        pos.min_win2 = pos.min_win;
                        pos.min_win = leg.opp_dots;
                    } else if leg.opp_dots > pos.min_win2 {
                        pos.min_win2 = leg.opp_dots;
                    }

                    if pos.win_move_count >= 1 {
                        if pos.is_in_encl2.is_empty() {
                            pos.is_in_encl2 = vec![0; geo.size()];
                        }
                        Self::accumulate_2move_stats(&mut self.is_in_2m_encl, &mut self.is_in_2m_miai, pos, &leg);
                    }
                }

                pos.thr_list.push(leg);
            } else {
                let mut t2 = Threat2m {
                    where0: first,
                    flags: if safe { threat2m_flags::FLAG_SAFE } else { 0 },
                    ..Default::default()
                };

                if leg.opp_dots > 0 {
                    t2.min_win = leg.opp_dots;
                    t2.win_move_count = 1;
                }

                t2.thr_list.push(leg);
                self.threats2m.push(t2);
                added += 1;
            }

            pair[i] = (first, safe);
        }

        added
    }

    fn accumulate_2move_stats(is_in_2m_encl: &mut [i16], is_in_2m_miai: &mut [i16], t2: &mut Threat2m, t: &Threat) {
        let miai_possible = t2.win_move_count >= 2 || (t2.win_move_count == 1 && t.opp_dots == 0);
        let safe = t2.is_safe();

        for &p in t.encl.interior.iter() {
            if miai_possible && safe && t2.is_in_encl2[p] & encl2_flags::MIAI == 0 {
                t2.is_in_encl2[p] |= encl2_flags::MIAI;
                is_in_2m_miai[p] += 1;
            } else if miai_possible {
                t2.is_in_encl2[p] |= encl2_flags::MIAI;
            }

            let was_below = t2.is_in_encl2[p] < encl2_flags::INSIDE_THRESHOLD;
            t2.is_in_encl2[p] += encl2_flags::INSIDE_ADD;
            if safe && was_below && t2.is_in_encl2[p] >= encl2_flags::INSIDE_THRESHOLD {
                is_in_2m_encl[p] += 1;
            }
        }
    }

    pub fn remove_marked(&mut self) {
        self.threats.retain(|t| t.kind & TO_REMOVE == 0);
    }

    /// Drops every one-move threat whose interior or border intersects
    /// `touched`, undoing its contribution to the point-indexed counters.
    /// Used by the incremental per-move rescan: rather than reproduce the
    /// original's TO_REMOVE/TO_CHECK bookkeeping exactly, every threat
    /// touching the locally-rescanned window is dropped and, if still
    /// live, rediscovered fresh.
    pub fn retain_not_touching(&mut self, touched: &[Point]) {
        let mut kept = Vec::with_capacity(self.threats.len());

        for t in self.threats.drain(..) {
            let hits = t.encl.interior.iter().any(|p| touched.contains(p))
                || t.encl.border.iter().any(|p| touched.contains(p));

            if hits {
                for &p in t.encl.interior.iter() {
                    if t.kind & TERR != 0 {
                        self.is_in_terr[p] -= 1;
                    } else {
                        self.is_in_encl[p] -= 1;
                    }
                }
                for &p in t.encl.border.iter() {
                    self.is_in_border[p] -= 1;
                }
            } else {
                kept.push(t);
            }
        }

        self.threats = kept;
    }

    /// Same, but for two-move threats: drops every bucket whose `where0`
    /// is touched, and every leg whose enclosure touches the window.
    pub fn retain_2moves_not_touching(&mut self, touched: &[Point]) {
        for t2 in self.threats2m.iter_mut() {
            if t2.is_in_encl2.is_empty() {
                continue;
            }
            for leg in t2.thr_list.iter() {
                let hits = leg.encl.interior.iter().any(|p| touched.contains(p))
                    || leg.encl.border.iter().any(|p| touched.contains(p));
                if hits {
                    for &p in leg.encl.interior.iter() {
                        if t2.is_in_encl2[p] >= encl2_flags::INSIDE_ADD {
                            t2.is_in_encl2[p] -= encl2_flags::INSIDE_ADD;
                        }
                    }
                }
            }
            t2.thr_list.retain(|leg| {
                !(leg.encl.interior.iter().any(|p| touched.contains(p))
                    || leg.encl.border.iter().any(|p| touched.contains(p)))
            });
        }

        self.threats2m.retain(|t2| !touched.contains(&t2.where0) && !t2.thr_list.is_empty());
    }

    /// Drops every two-move threat whose first point is `ind`, along
    /// with any now-redundant legs elsewhere, undoing their contribution
    /// to the point-indexed counters.
    pub fn remove_marked_and_at_point_2moves(&mut self, ind: Point) {
        for t2 in self.threats2m.iter_mut() {
            if t2.is_in_encl2.is_empty() {
                continue;
            }
            for leg in t2.thr_list.iter() {
                if leg.kind & TO_REMOVE != 0 {
                    for &p in leg.encl.interior.iter() {
                        if t2.is_in_encl2[p] >= encl2_flags::INSIDE_ADD {
                            t2.is_in_encl2[p] -= encl2_flags::INSIDE_ADD;
                        }
                    }
                }
            }
            t2.thr_list.retain(|tt| tt.kind & TO_REMOVE == 0);
        }

        self.threats2m.retain(|t2| t2.where0 != ind && !t2.thr_list.is_empty());
    }

    pub fn clear(&mut self) {
        self.threats.clear();
        self.threats2m.clear();
        for v in [&mut self.is_in_encl, &mut self.is_in_terr, &mut self.is_in_border, &mut self.is_in_2m_encl, &mut self.is_in_2m_miai] {
            v.iter_mut().for_each(|x| *x = 0);
        }
    }
}

pub mod thr_info_consts {
    pub const MINF: i32 = -20_000;
    pub const VALUE_WON_DOT: i32 = 8;
    pub const VALUE_SAVED_DOT: i32 = 8;
}

/// Candidate move assembled while searching for the enclosure(s) needed
/// to answer an opponent's threat, ranked by [`ThrInfo::priority_value`].
#[derive(Clone, Debug)]
pub struct ThrInfo {
    pub opp_thr: Vec<u64>,
    pub saved_worms: Vec<crate::worm::WormId>,
    pub zobrist_key: u64,
    pub kind: u16,
    pub mv: Point,
    pub lost_terr_points: i32,
    pub won_dots: i32,
    pub saved_dots: i32,
    pub priority_value: i32,
    pub who: Color,
}

impl ThrInfo {
    pub fn new(mv: Point, who: Color) -> Self {
        ThrInfo {
            opp_thr: Vec::new(),
            saved_worms: Vec::new(),
            zobrist_key: 0,
            kind: 0,
            mv,
            lost_terr_points: 0,
            won_dots: 0,
            saved_dots: 0,
            priority_value: 0,
            who,
        }
    }

    pub fn calculate_priority_value(&self) -> i32 {
        thr_info_consts::VALUE_WON_DOT * self.won_dots + thr_info_consts::VALUE_SAVED_DOT * self.saved_dots
            - self.lost_terr_points
    }
}

impl PartialEq for ThrInfo {
    fn eq(&self, other: &Self) -> bool {
        self.priority_value == other.priority_value
    }
}
impl Eq for ThrInfo {}
impl PartialOrd for ThrInfo {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for ThrInfo {
    /// Descending by priority -- the best reply sorts first, matching the
    /// original's inverted `operator<`.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.priority_value.cmp(&self.priority_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enclosure::Enclosure;

    fn dummy_encl(interior: Vec<Point>) -> Arc<Enclosure> {
        Arc::new(Enclosure { owner: Color::Black, interior, border: vec![1, 2, 3, 1] })
    }

    #[test]
    fn adding_a_threat_bumps_is_in_encl() {
        let geo = Geometry::new(9, 9);
        let mut all = AllThreats::new(&geo);
        let t = Threat::new(dummy_encl(vec![10, 11]), 0xdead);

        all.add_threat(t);

        assert_eq!(all.is_in_encl[10], 1);
        assert_eq!(all.is_in_encl[11], 1);
    }

    #[test]
    fn converting_encl_to_terr_moves_the_counters() {
        let geo = Geometry::new(9, 9);
        let mut all = AllThreats::new(&geo);
        let t = Threat::new(dummy_encl(vec![10]), 0xdead);

        all.add_threat(t.clone());
        all.change_encl_to_terr(&t);

        assert_eq!(all.is_in_encl[10], 0);
        assert_eq!(all.is_in_terr[10], 1);
    }

    #[test]
    fn thr_info_orders_highest_priority_first() {
        let mut a = ThrInfo::new(5, Color::Black);
        a.won_dots = 3;
        let mut b = ThrInfo::new(6, Color::Black);
        b.won_dots = 1;

        let mut v = vec![
            { a.priority_value = a.calculate_priority_value(); a },
            { b.priority_value = b.calculate_priority_value(); b },
        ];
        v.sort();

        assert_eq!(v[0].mv, 5, "higher priority sorts first");
    }
}
