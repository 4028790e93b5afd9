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

//! Worms (maximal orthogonally-connected components of same-colour dots),
//! their diagonal group unions, and the per-point `Conn` tables that let
//! the threat layer ask "which groups does this empty point touch".

use smallvec::SmallVec;
use std::collections::HashMap;

use crate::enclosure::CellView;
use crate::geometry::{Color, Geometry, Point};

pub type WormId = u16;

/// Sentinel added to a worm's safety counter the moment one of its dots
/// touches the edge of the board -- effectively infinite.
pub const SAFE_INFINITY: i32 = 1_000_000;

/// A worm is considered immortal once its safety counter reaches this.
pub const SAFE_THRESHOLD: i32 = 2;

#[derive(Clone, Debug)]
pub struct WormDescr {
    pub owner: Color,
    /// Dots of each player currently folded into this worm -- player 2's
    /// count becomes non-zero only after an enclosure captures into it.
    pub dots: [u32; 2],
    pub leftmost: Point,
    pub group_id: WormId,
    pub safety: i32,
    pub neighb: SmallVec<[WormId; 6]>,
}

impl WormDescr {
    pub fn is_safe(&self) -> bool {
        self.safety >= SAFE_THRESHOLD
    }

    pub fn total_dots(&self) -> u32 {
        self.dots[0] + self.dots[1]
    }
}

#[derive(Clone, Debug, Default)]
pub struct OneConnection {
    pub groups_id: [WormId; 4],
    pub code: u16,
}

impl OneConnection {
    pub fn count(&self) -> usize {
        self.groups_id.iter().take_while(|&&g| g != 0).count()
    }

    pub fn unique_groups(&self) -> SmallVec<[WormId; 4]> {
        let mut out = SmallVec::new();

        for &g in self.groups_id.iter() {
            if g == 0 {
                break;
            }
            if !out.contains(&g) {
                out.push(g);
            }
        }

        out
    }

    pub fn contains(&self, g: WormId) -> bool {
        self.groups_id.contains(&g)
    }
}

/// Whether a `place_dot` requires a full soft-safety refresh, a refresh
/// limited to the margins touching the played point, or nothing at all.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SoftSafetyUpdate {
    None,
    Point(Point),
    AllMargins,
}

impl SoftSafetyUpdate {
    fn upgrade(self, other: SoftSafetyUpdate) -> SoftSafetyUpdate {
        match (self, other) {
            (SoftSafetyUpdate::AllMargins, _) | (_, SoftSafetyUpdate::AllMargins) => SoftSafetyUpdate::AllMargins,
            (SoftSafetyUpdate::None, x) => x,
            (x, SoftSafetyUpdate::None) => x,
            (SoftSafetyUpdate::Point(p), SoftSafetyUpdate::Point(_)) => SoftSafetyUpdate::Point(p),
        }
    }
}

/// Dirty flags returned by `place_dot`, consumed by the rule layer to
/// decide which ambient structures need a refresh.
#[derive(Copy, Clone, Debug)]
pub struct DirtyFlags {
    pub update_safety_dame: bool,
    pub update_soft_safety: SoftSafetyUpdate,
}

#[derive(Clone)]
pub struct Worms {
    cell: Vec<WormId>,
    next_dot: Vec<Point>,
    descr: HashMap<WormId, WormDescr>,
    last_id: [WormId; 2],
    pub conn: [Vec<OneConnection>; 2],
    /// Points whose pattern code needs recomputing after the last move.
    pub recalculate_list: Vec<Point>,
}

impl CellView for Worms {
    fn owner_at(&self, p: Point) -> Option<Color> {
        self.owner_of(p)
    }
}

impl Worms {
    pub fn new(geo: &Geometry) -> Self {
        Self {
            cell: vec![0; geo.size()],
            next_dot: vec![0; geo.size()],
            descr: HashMap::new(),
            last_id: [1, 2], // next mint adds CONST_WORM_INCR(4) -> first ids 5, 6
            conn: [vec![OneConnection::default(); geo.size()], vec![OneConnection::default(); geo.size()]],
            recalculate_list: Vec::new(),
        }
    }

    #[inline]
    pub fn worm_id_at(&self, p: Point) -> WormId {
        self.cell[p]
    }

    #[inline]
    pub fn is_dot_at(&self, p: Point) -> bool {
        self.cell[p] != 0
    }

    pub fn owner_of(&self, p: Point) -> Option<Color> {
        let id = self.cell[p];
        if id == 0 {
            None
        } else if id & 1 == 1 {
            Some(Color::Black)
        } else {
            Some(Color::White)
        }
    }

    pub fn descr(&self, id: WormId) -> &WormDescr {
        self.descr.get(&id).expect("dangling worm id")
    }

    pub fn descr_mut(&mut self, id: WormId) -> &mut WormDescr {
        self.descr.get_mut(&id).expect("dangling worm id")
    }

    pub fn try_descr(&self, id: WormId) -> Option<&WormDescr> {
        self.descr.get(&id)
    }

    pub fn all_worm_ids(&self) -> impl Iterator<Item = WormId> + '_ {
        self.descr.keys().copied()
    }

    /// Iterate every dot belonging to the worm rooted at `id`, following
    /// the cyclic `next_dot` linked list starting at `leftmost`.
    pub fn dots_of(&self, id: WormId) -> Vec<Point> {
        let leftmost = self.descr(id).leftmost;
        let mut out = Vec::new();
        let mut cur = leftmost;

        loop {
            out.push(cur);
            cur = self.next_dot[cur];
            if cur == leftmost {
                break;
            }
        }

        out
    }

    fn owner_bits(who: Color) -> u16 {
        match who {
            Color::Black => 1,
            Color::White => 0,
        }
    }

    /// The core mutation: places a dot of colour `who` at `(x, y)`,
    /// maintaining worms, groups, the `Conn` tables, and the pattern
    /// recalculation list. Returns flags describing what else needs a
    /// refresh.
    pub fn place_dot(&mut self, geo: &Geometry, x: usize, y: usize, who: Color) -> DirtyFlags {
        let ind = geo.index(x, y);
        debug_assert!(!self.is_dot_at(ind), "place_dot on an occupied point");

        let mut numb: SmallVec<[WormId; 4]> = SmallVec::new();
        for d in 0..4 {
            let nb = geo.nb4_of(ind, d);
            if !geo.is_on_board(nb) {
                continue;
            }
            if self.owner_of(nb) == Some(who) {
                let id = self.cell[nb];
                if !numb.contains(&id) {
                    numb.push(id);
                }
            }
        }

        let nonisolated = !numb.is_empty();

        if numb.is_empty() {
            let owner_parity = Self::owner_bits(who);
            let idx = who.index();
            self.last_id[idx] += 4;
            let id = self.last_id[idx] | owner_parity | 0b100; // keep >= 4 and carry owner parity
            let id = if id & 1 == owner_parity { id } else { id + 1 };

            self.cell[ind] = id;
            self.next_dot[ind] = ind;
            self.descr.insert(id, WormDescr {
                owner: who,
                dots: if who == Color::Black { [1, 0] } else { [0, 1] },
                leftmost: ind,
                group_id: id,
                safety: 0,
                neighb: SmallVec::new(),
            });
        } else {
            let mut numb = numb;
            while numb.len() >= 2 {
                let a = numb[numb.len() - 1];
                let b = numb[numb.len() - 2];

                let (dst, src) = if self.descr(a).total_dots() >= self.descr(b).total_dots() {
                    (a, b)
                } else {
                    (b, a)
                };

                self.merge_same(dst, src);
                let last = numb.len() - 1;
                numb[last - 1] = dst;
                numb.pop();
            }

            let surviving = numb[0];
            let leftmost = self.descr(surviving).leftmost;
            let next = self.next_dot[leftmost];
            self.next_dot[leftmost] = ind;
            self.next_dot[ind] = next;
            self.cell[ind] = surviving;

            let d = self.descr_mut(surviving);
            d.leftmost = d.leftmost.min(ind);
            d.dots[who.index()] += 1;
        }

        let worm_id = self.cell[ind];
        let mut update_safety_dame = false;
        let mut update_soft_safety = SoftSafetyUpdate::None;

        // -- safety bookkeeping --
        if geo.dist(ind) == 0 {
            if self.descr(worm_id).safety > 0 && self.descr(worm_id).safety < SAFE_THRESHOLD {
                update_soft_safety = update_soft_safety.upgrade(SoftSafetyUpdate::AllMargins);
            }
            self.descr_mut(worm_id).safety = SAFE_INFINITY;

            for d in 0..4 {
                let nb = geo.nb4_of(ind, d);
                if geo.is_on_board(nb) && geo.dist(nb) == 1 && self.is_dot_at(nb) {
                    let nb_id = self.cell[nb];
                    let before = self.descr(nb_id).safety;
                    self.descr_mut(nb_id).safety -= 1;
                    if before >= SAFE_THRESHOLD && self.descr(nb_id).safety < SAFE_THRESHOLD {
                        update_safety_dame = true;
                        update_soft_safety = update_soft_safety.upgrade(SoftSafetyUpdate::AllMargins);
                    }
                    break;
                }
            }

            if update_soft_safety != SoftSafetyUpdate::AllMargins {
                update_soft_safety = update_soft_safety.upgrade(SoftSafetyUpdate::Point(ind));
            }
        } else if geo.dist(ind) == 1 {
            let was_unsafe = nonisolated && !self.descr(worm_id).is_safe();
            let before = self.descr(worm_id).safety;

            for d in 0..4 {
                let nb = geo.nb4_of(ind, d);
                if geo.is_on_board(nb) && geo.dist(nb) == 0 && !self.is_dot_at(nb) {
                    self.descr_mut(worm_id).safety += 1;
                }
            }

            if was_unsafe && self.descr(worm_id).is_safe() {
                update_safety_dame = true;
            }
            if nonisolated && before < SAFE_THRESHOLD && before < self.descr(worm_id).safety {
                update_soft_safety = update_soft_safety.upgrade(SoftSafetyUpdate::AllMargins);
            } else if update_soft_safety != SoftSafetyUpdate::AllMargins {
                update_soft_safety = update_soft_safety.upgrade(SoftSafetyUpdate::Point(ind));
            }
        }

        // -- diagonal pass: unify groups, record opposite-colour neighbours --
        let our_group = self.descr(worm_id).group_id;
        let mut to_rename: SmallVec<[WormId; 4]> = SmallVec::new();

        for i in (0..8).step_by(2) {
            let nb = geo.nb8_of(ind, i);
            if !geo.is_on_board(nb) || !self.is_dot_at(nb) {
                continue;
            }

            let nb_id = self.cell[nb];
            if nb_id == worm_id {
                continue;
            }

            if self.owner_of(nb) == Some(who) {
                let nb_group = self.descr(nb_id).group_id;
                if nb_group != our_group && !to_rename.contains(&nb_group) {
                    to_rename.push(nb_group);
                }
            }

            if !self.descr(worm_id).neighb.contains(&nb_id) {
                self.descr_mut(worm_id).neighb.push(nb_id);
                self.descr_mut(nb_id).neighb.push(worm_id);
            }
        }

        for old_gid in to_rename {
            let ids: Vec<WormId> = self.descr.iter().filter(|(_, d)| d.group_id == old_gid).map(|(&id, _)| id).collect();
            for id in ids {
                self.descr_mut(id).group_id = our_group;
            }
        }

        self.recalculate_conn_around(geo, ind, who);
        self.recalculate_list.push(ind);
        for d in 0..8 {
            let nb = geo.nb8_of(ind, d);
            if geo.is_on_board(nb) && !self.is_dot_at(nb) {
                self.recalculate_list.push(nb);
            }
        }

        DirtyFlags { update_safety_dame, update_soft_safety }
    }

    fn merge_same(&mut self, dst: WormId, src: WormId) {
        {
            let src_neighb = self.descr(src).neighb.clone();
            for n in src_neighb {
                if n == dst || self.descr(dst).neighb.contains(&n) {
                    if let Some(pos) = self.descr_mut(n).neighb.iter().position(|&x| x == src) {
                        self.descr_mut(n).neighb.remove(pos);
                    }
                } else {
                    for slot in self.descr_mut(n).neighb.iter_mut() {
                        if *slot == src {
                            *slot = dst;
                        }
                    }
                    self.descr_mut(dst).neighb.push(n);
                }
            }
        }

        if self.descr(src).group_id != self.descr(dst).group_id {
            let old_gid = self.descr(src).group_id;
            let new_gid = self.descr(dst).group_id;
            let ids: Vec<WormId> = self.descr.iter().filter(|(_, d)| d.group_id == old_gid).map(|(&id, _)| id).collect();
            for id in ids {
                self.descr_mut(id).group_id = new_gid;
            }
        }

        self.merge_common(dst, src);
    }

    /// Merges `src` into `dst` when the two worms belong to different
    /// owners -- used when an enclosure captures `src` wholesale.
    pub fn merge_capture(&mut self, dst: WormId, src: WormId) {
        {
            let src_neighb = self.descr(src).neighb.clone();
            for n in src_neighb {
                if let Some(pos) = self.descr_mut(n).neighb.iter().position(|&x| x == src) {
                    self.descr_mut(n).neighb.remove(pos);
                }
            }
        }

        self.merge_common(dst, src);
    }

    fn merge_common(&mut self, dst: WormId, src: WormId) {
        let leftmost_src = self.descr(src).leftmost;
        let mut x = leftmost_src;
        loop {
            self.cell[x] = dst;
            x = self.next_dot[x];
            if x == leftmost_src {
                break;
            }
        }

        let (dots_src, safety_src) = {
            let s = self.descr(src);
            (s.dots, s.safety)
        };

        {
            let d = self.descr_mut(dst);
            d.dots[0] += dots_src[0];
            d.dots[1] += dots_src[1];
            d.safety = if d.safety >= SAFE_INFINITY || safety_src >= SAFE_INFINITY {
                SAFE_INFINITY
            } else {
                d.safety + safety_src
            };
        }

        let leftmost_dst = self.descr(dst).leftmost;
        let n = self.next_dot[leftmost_dst];
        self.next_dot[leftmost_dst] = self.next_dot[leftmost_src];
        self.next_dot[leftmost_src] = n;

        let d = self.descr_mut(dst);
        d.leftmost = d.leftmost.min(leftmost_src);

        self.descr.remove(&src);
    }

    /// Recomputes `Conn[who][*]` for the point just played and toggles the
    /// membership bit at each of its 8 ring-1 empty neighbours.
    fn recalculate_conn_around(&mut self, geo: &Geometry, ind: Point, who: Color) {
        for owner in [Color::Black, Color::White] {
            self.conn[owner.index()][ind] = OneConnection::default();
        }

        for d in 0..8 {
            let nb = geo.nb8_of(ind, d);
            if !geo.is_on_board(nb) || self.is_dot_at(nb) {
                continue;
            }
            self.recalculate_conn_point(geo, nb, who);
        }
    }

    /// Fully recomputes the connection record of empty point `p` for
    /// owner `who` from its current 8 neighbours.
    fn recalculate_conn_point(&mut self, geo: &Geometry, p: Point, who: Color) {
        let mut code = 0u16;
        let mut groups: SmallVec<[WormId; 4]> = SmallVec::new();

        for d in 0..8 {
            let nb = geo.nb8_of(p, d);
            if geo.is_on_board(nb) && self.owner_of(nb) == Some(who) {
                code |= 1 << d;
                let gid = self.descr(self.cell[nb]).group_id;
                if !groups.contains(&gid) {
                    groups.push(gid);
                }
            }
        }

        let mut groups_id = [0u16; 4];
        for (i, g) in groups.into_iter().take(4).enumerate() {
            groups_id[i] = g;
        }

        self.conn[who.index()][p] = OneConnection { groups_id, code };
    }

    /// Re-derive the `Conn` table entry of `p` for both owners from
    /// scratch -- used after an enclosure reshapes the board around `p`.
    pub fn refresh_conn_at(&mut self, geo: &Geometry, p: Point) {
        if self.is_dot_at(p) {
            return;
        }
        self.recalculate_conn_point(geo, p, Color::Black);
        self.recalculate_conn_point(geo, p, Color::White);
    }

    pub fn drain_recalculate_list(&mut self) -> Vec<Point> {
        std::mem::take(&mut self.recalculate_list)
    }

    /// Folds a previously-empty interior point of a freshly closed
    /// enclosure into worm `dst`, as a new dot owned by `who`. Used by
    /// the rule layer when filling territory, as opposed to
    /// `place_dot`'s ordinary single-point placement.
    pub fn adopt_into(&mut self, geo: &Geometry, p: Point, dst: WormId, who: Color) {
        debug_assert!(!self.is_dot_at(p));

        self.cell[p] = dst;
        let leftmost = self.descr(dst).leftmost;
        let next = self.next_dot[leftmost];
        self.next_dot[leftmost] = p;
        self.next_dot[p] = next;

        let d = self.descr_mut(dst);
        d.leftmost = d.leftmost.min(p);
        d.dots[who.index()] += 1;

        if geo.dist(p) == 0 {
            self.descr_mut(dst).safety = SAFE_INFINITY;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isolated_dot_creates_new_worm() {
        let geo = Geometry::new(9, 9);
        let mut worms = Worms::new(&geo);

        worms.place_dot(&geo, 4, 4, Color::Black);
        let id = worms.worm_id_at(geo.index(4, 4));

        assert_eq!(worms.descr(id).owner, Color::Black);
        assert_eq!(worms.descr(id).total_dots(), 1);
        assert_eq!(worms.descr(id).safety, 0);
    }

    #[test]
    fn two_orthogonally_adjacent_dots_merge_into_one_worm() {
        let geo = Geometry::new(9, 9);
        let mut worms = Worms::new(&geo);

        worms.place_dot(&geo, 4, 4, Color::Black);
        worms.place_dot(&geo, 5, 4, Color::Black);

        let id1 = worms.worm_id_at(geo.index(4, 4));
        let id2 = worms.worm_id_at(geo.index(5, 4));

        assert_eq!(id1, id2);
        assert_eq!(worms.descr(id1).total_dots(), 2);
    }

    #[test]
    fn diagonal_dots_do_not_merge_worms_but_merge_groups() {
        let geo = Geometry::new(9, 9);
        let mut worms = Worms::new(&geo);

        worms.place_dot(&geo, 4, 4, Color::Black);
        worms.place_dot(&geo, 5, 5, Color::Black);

        let id1 = worms.worm_id_at(geo.index(4, 4));
        let id2 = worms.worm_id_at(geo.index(5, 5));

        assert_ne!(id1, id2, "diagonal dots remain separate worms");
        assert_eq!(worms.descr(id1).group_id, worms.descr(id2).group_id, "but share a group");
    }

    #[test]
    fn corner_dot_is_immediately_safe() {
        let geo = Geometry::new(7, 7);
        let mut worms = Worms::new(&geo);

        worms.place_dot(&geo, 0, 0, Color::Black);
        let id = worms.worm_id_at(geo.index(0, 0));

        assert_eq!(worms.descr(id).safety, SAFE_INFINITY);
        assert!(worms.descr(id).is_safe());
    }

    #[test]
    fn interior_dot_starts_unsafe() {
        let geo = Geometry::new(7, 7);
        let mut worms = Worms::new(&geo);

        worms.place_dot(&geo, 3, 3, Color::White);
        let id = worms.worm_id_at(geo.index(3, 3));

        assert_eq!(worms.descr(id).safety, 0);
        assert!(!worms.descr(id).is_safe());
    }
}
