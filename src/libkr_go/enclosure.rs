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

//! A closed polyline of same-owner dots and the (possibly opponent-owned or
//! empty) interior it surrounds. Enclosures are immutable once built --
//! threats hold them behind `Arc` handles so a worker thread's cloned
//! `Game` can share them without re-deriving the polyline.

use std::sync::Arc;

use crate::geometry::{Color, Geometry, Point};

/// Anything that can answer "who owns this point" -- implemented by the
/// live board and, for threat scans, by a board with one point pretended
/// to belong to somebody.
pub trait CellView {
    fn owner_at(&self, p: Point) -> Option<Color>;
}

/// A scoped view that pretends `p` belongs to `who`, without mutating the
/// underlying board -- used by the threat layer's tentative enclosure
/// scans (simple finder on a candidate move).
pub struct PretendOwner<'a, C: CellView> {
    inner: &'a C,
    pretend: &'a [(Point, Color)],
}

impl<'a, C: CellView> PretendOwner<'a, C> {
    pub fn new(inner: &'a C, pretend: &'a [(Point, Color)]) -> Self {
        Self { inner, pretend }
    }
}

impl<'a, C: CellView> CellView for PretendOwner<'a, C> {
    fn owner_at(&self, p: Point) -> Option<Color> {
        for &(pp, c) in self.pretend {
            if pp == p {
                return Some(c);
            }
        }
        self.inner.owner_at(p)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Enclosure {
    pub owner: Color,
    /// Non-border points enclosed by `border` (empty or opponent-owned).
    pub interior: Vec<Point>,
    /// Closed polyline of `owner`-owned dots, in clockwise traversal order,
    /// with `border[0] == border[border.len() - 1]`.
    pub border: Vec<Point>,
}

impl Enclosure {
    pub fn empty(owner: Color) -> Self {
        Self { owner, interior: Vec::new(), border: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.border.is_empty()
    }

    pub fn contains_interior(&self, p: Point) -> bool {
        self.interior.contains(&p)
    }

    pub fn contains_border(&self, p: Point) -> bool {
        // every border point except the duplicated closing point
        self.border[..self.border.len().saturating_sub(1)].contains(&p)
    }

    pub fn border_element(&self) -> Option<Point> {
        self.border.first().copied()
    }

    pub fn interior_size(&self) -> usize {
        self.interior.len()
    }

    pub fn zobrist(&self, geo: &Geometry) -> u64 {
        let owner_ix = self.owner.index();

        self.interior.iter().fold(0u64, |acc, &p| acc ^ geo.z_encl[owner_ix][p])
    }

    /// Is `p` (a diagonal neighbour of `border_p`) a "shortcut": a dot whose
    /// two 4-neighbours on this enclosure's border are already adjacent to
    /// each other along the border, making `border_p` a redundant detour?
    pub fn is_shortcut(&self, geo: &Geometry, p: Point, border_p: Point) -> bool {
        if !self.contains_border(border_p) {
            return false;
        }

        let Some(pos) = self.border.iter().position(|&x| x == border_p) else { return false };
        let len = self.border.len() - 1; // ignore the duplicated closing entry
        let prev = self.border[(pos + len - 1) % len];
        let next = self.border[(pos + 1) % len];

        geo.chebyshev(p, prev) <= 1 && geo.chebyshev(p, next) <= 1
    }

    /// Do the two border-neighbours of `border_p` touch each other directly,
    /// making `border_p` itself redundant for enclosing the interior?
    pub fn is_redundant(&self, geo: &Geometry, border_p: Point) -> bool {
        let Some(pos) = self.border.iter().position(|&x| x == border_p) else { return false };
        let len = self.border.len() - 1;
        if len < 3 {
            return false;
        }
        let prev = self.border[(pos + len - 1) % len];
        let next = self.border[(pos + 1) % len];

        geo.chebyshev(prev, next) <= 1
    }
}

/// Tries the simple finder (one- or two-point enclosures directly around
/// `p`), falling back to the general flood-fill finder.
pub fn find_enclosure<C: CellView>(geo: &Geometry, cells: &C, owner: Color, p: Point) -> Option<Arc<Enclosure>> {
    find_simple(geo, cells, owner, p)
        .or_else(|| find_non_simple(geo, cells, owner, p))
}

/// Tests the 4 orthogonal neighbours of `p`: if all four are `owner`-owned,
/// `p` alone is the (1-point) interior. If three are and the fourth is
/// empty or opponent-owned, try extending through that gap by one step to
/// find a 2-point interior (the other common "simple" shape).
fn find_simple<C: CellView>(geo: &Geometry, cells: &C, owner: Color, p: Point) -> Option<Arc<Enclosure>> {
    let nb: Vec<Point> = (0..4).map(|d| geo.nb4_of(p, d)).collect();
    let owned: Vec<bool> = nb.iter().map(|&q| cells.owner_at(q) == Some(owner)).collect();
    let num_owned = owned.iter().filter(|&&b| b).count();

    if num_owned == 4 {
        return Some(Arc::new(build_from_interior(geo, cells, owner, vec![p])));
    }

    if num_owned == 3 {
        let gap_dir = owned.iter().position(|&b| !b)?;
        let gap = nb[gap_dir];

        if cells.owner_at(gap).is_some() && cells.owner_at(gap) == Some(owner.opposite()) {
            return None; // opponent dot there -- not a free 2-point gap
        }
        if geo.dist(gap) == 0 && !geo.is_on_board(geo.nb4_of(gap, gap_dir)) {
            return None;
        }

        // does extending one more step in the same direction close it off?
        let far = geo.nb4_of(gap, gap_dir);
        if !geo.is_on_board(far) {
            return None;
        }

        let perp = [(gap_dir + 1) % 4, (gap_dir + 3) % 4];
        let mut wall = true;
        for d in perp {
            let side = geo.nb4_of(gap, d);
            if cells.owner_at(side) != Some(owner) {
                wall = false;
            }
        }
        if wall && cells.owner_at(far) == Some(owner) {
            return Some(Arc::new(build_from_interior(geo, cells, owner, vec![p, gap])));
        }
    }

    None
}

/// Flood-fills the interior candidates reachable from `p` through 4-
/// neighbours, stopping at the edge (unbounded -> no enclosure) or at
/// `owner`-owned dots (which become the border). Then traces the border
/// clockwise starting from its leftmost point.
fn find_non_simple<C: CellView>(geo: &Geometry, cells: &C, owner: Color, p: Point) -> Option<Arc<Enclosure>> {
    if cells.owner_at(p) == Some(owner) {
        return None;
    }

    let mut seen = std::collections::HashSet::new();
    let mut stack = vec![p];
    let mut interior = Vec::new();
    seen.insert(p);

    while let Some(cur) = stack.pop() {
        interior.push(cur);

        for d in 0..4 {
            let nb = geo.nb4_of(cur, d);

            if !geo.is_on_board(nb) {
                return None; // escapes the board -- unbounded
            }
            if seen.contains(&nb) {
                continue;
            }
            if cells.owner_at(nb) == Some(owner) {
                continue; // border dot, not part of the interior flood
            }

            seen.insert(nb);
            stack.push(nb);
        }
    }

    Some(Arc::new(build_from_interior(geo, cells, owner, interior)))
}

fn build_from_interior<C: CellView>(geo: &Geometry, cells: &C, owner: Color, interior: Vec<Point>) -> Enclosure {
    let interior_set: std::collections::HashSet<Point> = interior.iter().copied().collect();
    let mut border_set = std::collections::HashSet::new();

    for &p in &interior {
        for d in 0..4 {
            let nb = geo.nb4_of(p, d);
            if cells.owner_at(nb) == Some(owner) {
                border_set.insert(nb);
            }
        }
    }

    let border = trace_border_clockwise(geo, &border_set);

    Enclosure { owner, interior: interior_set.into_iter().collect(), border }
}

/// Traces a closed polyline through `border_set` using a Moore-neighbour
/// boundary follower: starting at the leftmost (then topmost) point, keep
/// the interior on our right by scanning nb8 directions clockwise starting
/// two steps after the direction we arrived from.
fn trace_border_clockwise(geo: &Geometry, border_set: &std::collections::HashSet<Point>) -> Vec<Point> {
    if border_set.is_empty() {
        return Vec::new();
    }

    let start = *border_set.iter()
        .min_by_key(|&&p| (geo.x(p), geo.y(p)))
        .unwrap();

    if border_set.len() == 1 {
        return vec![start, start];
    }

    let mut path = vec![start];
    let mut current = start;
    // we "arrived" as-if from the north, so begin scanning from NE.
    let mut incoming_dir = 7usize; // N

    loop {
        let scan_start = (incoming_dir + 6) % 8; // two steps clockwise back
        let mut next = None;

        for step in 0..8 {
            let d = (scan_start + step) % 8;
            let cand = geo.nb8_of(current, d);

            if border_set.contains(&cand) {
                next = Some((cand, d));
                break;
            }
        }

        let (next_point, dir) = match next {
            Some(v) => v,
            None => break, // isolated / degenerate, bail out gracefully
        };

        if next_point == start && path.len() > 1 {
            path.push(start);
            break;
        }

        path.push(next_point);
        current = next_point;
        incoming_dir = dir;

        if path.len() > border_set.len() + 1 {
            break; // safety valve against non-terminating traces
        }
    }

    if *path.last().unwrap() != start {
        path.push(start);
    }

    path
}

/// Reconstructs an enclosure from a previously-known border list (e.g. when
/// restoring a threat snapshot) by scanning each column for parity changes
/// against the polyline.
pub fn from_border(geo: &Geometry, owner: Color, border: Vec<Point>) -> Enclosure {
    let border_set: std::collections::HashSet<Point> = border.iter().copied().collect();
    let mut interior = Vec::new();

    let xs: Vec<i32> = border.iter().map(|&p| geo.x(p) as i32).collect();
    let min_x = *xs.iter().min().unwrap_or(&0);
    let max_x = *xs.iter().max().unwrap_or(&0);

    for x in min_x..=max_x {
        let mut ys_on_border: Vec<i32> = border.iter()
            .filter(|&&p| geo.x(p) as i32 == x)
            .map(|&p| geo.y(p) as i32)
            .collect();
        ys_on_border.sort_unstable();
        ys_on_border.dedup();

        let mut inside = false;
        let mut prev_y = None;

        for &y in &ys_on_border {
            if let Some(py) = prev_y {
                if inside {
                    for yy in (py + 1)..y {
                        let p = geo.index(x as usize, yy as usize);
                        if !border_set.contains(&p) {
                            interior.push(p);
                        }
                    }
                }
            }
            inside = !inside;
            prev_y = Some(y);
        }
    }

    Enclosure { owner, interior, border }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakeBoard(HashMap<Point, Color>);

    impl CellView for FakeBoard {
        fn owner_at(&self, p: Point) -> Option<Color> {
            self.0.get(&p).copied()
        }
    }

    #[test]
    fn one_point_simple_enclosure() {
        let geo = Geometry::new(7, 7);
        let mut board = HashMap::new();

        // cb, bc, dc, cd for player 1 (Black), then cc is the interior point.
        board.insert(geo.index(2, 1), Color::Black); // cb
        board.insert(geo.index(1, 2), Color::Black); // bc
        board.insert(geo.index(3, 2), Color::Black); // dc
        board.insert(geo.index(2, 3), Color::Black); // cd

        let cc = geo.index(2, 2);
        let fake = FakeBoard(board);

        let encl = find_enclosure(&geo, &fake, Color::Black, cc).expect("enclosure found");
        assert_eq!(encl.interior, vec![cc]);
        assert_eq!(encl.border.len(), 5); // 4 distinct + closing repeat
    }

    #[test]
    fn unbounded_region_is_not_an_enclosure() {
        let geo = Geometry::new(7, 7);
        let board = HashMap::new();
        let fake = FakeBoard(board);

        assert!(find_enclosure(&geo, &fake, Color::Black, geo.index(3, 3)).is_none());
    }
}
