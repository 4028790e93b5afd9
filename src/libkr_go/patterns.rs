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

//! 3x3 (and edge 5x2) dot patterns: static lookup tables that turn the
//! local neighbourhood of an empty point into a dame/neutral/interesting
//! classification and a small prior value, plus the `patt3_at` codes and
//! `recalculate_list` bookkeeping that keep them current after a move.

use crate::enclosure::CellView;
use crate::geometry::{Color, Geometry, Point};
use crate::worm::Worms;

/// 16 bits of neighbour colour (2 bits per ring-1 point) + 4 bits of
/// "this orthogonal neighbour's worm is in atari".
pub type Patt3Code = u32;

// 16 bits of ring-1 colour (2 bits x 8 neighbours) + 4 bits of N/E/S/W
// atari flags. The spec's "2^18 asset" describes the on-disk table
// before the atari bits are folded in; we size the in-memory table to
// the full 20-bit code so no information is lost to truncation.
const TABLE_BITS: usize = 20;
const TABLE_LEN: usize = 1 << TABLE_BITS;

pub type Patt3Val = i16;

pub const PATT3_MINF: Patt3Val = i16::MIN / 2;

/// A 2^18-entry code -> value lookup table, one per owner or shared
/// (symmetric) between owners.
#[derive(Clone)]
pub struct Pattern3Table {
    values: Vec<Patt3Val>,
}

impl Pattern3Table {
    fn zeroed() -> Self {
        Pattern3Table { values: vec![0; TABLE_LEN] }
    }

    #[inline]
    pub fn value(&self, code: Patt3Code) -> Patt3Val {
        self.values[(code as usize) & (TABLE_LEN - 1)]
    }

    fn set(&mut self, code: Patt3Code, v: Patt3Val) {
        self.values[(code as usize) & (TABLE_LEN - 1)] = v;
    }
}

lazy_static! {
    static ref PATT3: Pattern3Table = build_patt3();
    static ref PATT3_SYMM: Pattern3Table = build_patt3_symm();
    static ref PATT3_COST: Pattern3Table = build_patt3_cost();
}

/// Forces the static pattern tables to build, exactly once per process.
/// Calling this ahead of time just avoids paying the build cost on the
/// first lookup; the tables build lazily regardless.
pub fn ensure_tables_loaded() {
    lazy_static::initialize(&PATT3);
    lazy_static::initialize(&PATT3_SYMM);
    lazy_static::initialize(&PATT3_COST);
}

pub fn patt3() -> &'static Pattern3Table {
    &PATT3
}

pub fn patt3_symm() -> &'static Pattern3Table {
    &PATT3_SYMM
}

pub fn patt3_cost() -> &'static Pattern3Table {
    &PATT3_COST
}

/// A hand-curated seed: enclosing shapes around a lone dot score
/// positively for the dot's owner, surrounding the opponent's lone dot
/// scores positively as an attack, and a point with no dots nearby is
/// neutral (value 0). The asymmetric table additionally tags
/// obviously-futile self-contacts as dame (negative).
fn build_patt3() -> Pattern3Table {
    let mut t = Pattern3Table::zeroed();

    for code in 0..TABLE_LEN as Patt3Code {
        let own = count_ring_owner(code, 0);
        let opp = count_ring_owner(code, 1);
        let atari = code >> 16 & 0xf;

        let mut v: i32 = 0;
        if own >= 3 && opp == 0 {
            v += 10 + 5 * own as i32;
        }
        if opp >= 3 && own == 0 {
            v += 15 + 5 * opp as i32;
        }
        if own >= 1 && opp >= 1 {
            v -= 4; // contested point, rarely worth playing first
        }
        v += atari as i32 * 6;

        t.set(code, v.clamp(PATT3_MINF as i32, 80) as Patt3Val);
    }

    t
}

/// Symmetric variant used only to rank "how interesting is this empty
/// point", so it ignores which side the dots belong to.
fn build_patt3_symm() -> Pattern3Table {
    let mut t = Pattern3Table::zeroed();

    for code in 0..TABLE_LEN as Patt3Code {
        let own = count_ring_owner(code, 0);
        let opp = count_ring_owner(code, 1);
        let total = own + opp;

        let v = if total == 0 {
            0
        } else {
            (10 + 4 * total as i32).min(80)
        };

        t.set(code, v as Patt3Val);
    }

    t
}

/// Used by the playout policy to weight move sampling by "local
/// activity cost" rather than strict win-probability priors.
fn build_patt3_cost() -> Pattern3Table {
    let mut t = Pattern3Table::zeroed();

    for code in 0..TABLE_LEN as Patt3Code {
        let own = count_ring_owner(code, 0);
        let opp = count_ring_owner(code, 1);

        t.set(code, (own + opp) as Patt3Val);
    }

    t
}

fn count_ring_owner(code: Patt3Code, owner_bit: u32) -> u32 {
    let mut n = 0;
    for d in 0..8 {
        let slot = (code >> (2 * d)) & 0b11;
        if slot != 0 && (slot - 1) == owner_bit {
            n += 1;
        }
    }
    n
}

/// Pattern state threaded through the simple game: the packed code at
/// every point and the two owners' looked-up values.
#[derive(Clone)]
pub struct Patterns {
    pub patt3_at: Vec<Patt3Code>,
    pub patt3_value: [Vec<Patt3Val>; 2],
}

impl Patterns {
    pub fn new(geo: &Geometry) -> Self {
        ensure_tables_loaded();
        Patterns {
            patt3_at: vec![0; geo.size()],
            patt3_value: [vec![0; geo.size()], vec![0; geo.size()]],
        }
    }

    /// Recomputes the 3x3 code of `p` from the live board, encoding each
    /// ring-1 neighbour as `0` (empty/off-board), `1` (black), `2`
    /// (white), then ORing in the N/E/S/W atari bits.
    pub fn recompute_code(&mut self, geo: &Geometry, worms: &Worms, p: Point) -> Patt3Code {
        let mut code: Patt3Code = 0;

        for d in 0..8 {
            let nb = geo.nb8_of(p, d);
            let slot: u32 = if !geo.is_on_board(nb) {
                0
            } else {
                match worms.owner_at(nb) {
                    None => 0,
                    Some(Color::Black) => 1,
                    Some(Color::White) => 2,
                }
            };
            code |= slot << (2 * d);
        }

        for (i, d) in [7usize, 1, 3, 5].into_iter().enumerate() {
            // N, E, S, W live at nb8 indices 7, 1, 3, 5 respectively.
            let nb = geo.nb8_of(p, d);
            let in_atari = geo.is_on_board(nb)
                && worms.is_dot_at(nb)
                && worms.descr(worms.worm_id_at(nb)).safety < crate::worm::SAFE_THRESHOLD;
            if in_atari {
                code |= 1 << (16 + i);
            }
        }

        code
    }

    /// Recomputes `patt3_at[p]` and both owners' `patt3_value[*][p]`.
    /// Called for every point in the drained `recalculate_list`.
    pub fn recalculate_point(&mut self, geo: &Geometry, worms: &Worms, p: Point) {
        if worms.is_dot_at(p) {
            self.patt3_at[p] = 0;
            self.patt3_value[0][p] = 0;
            self.patt3_value[1][p] = 0;
            return;
        }

        let code = self.recompute_code(geo, worms, p);
        self.patt3_at[p] = code;
        self.patt3_value[0][p] = patt3().value(code);
        self.patt3_value[1][p] = patt3().value(flip_owners(code));
    }

    pub fn get_value(&self, p: Point, who: Color) -> Patt3Val {
        self.patt3_value[who.index()][p]
    }
}

/// Swaps the black/white bits of every ring-1 slot so the same table can
/// serve both owners' asymmetric lookups.
fn flip_owners(code: Patt3Code) -> Patt3Code {
    let mut out = code & 0x0f_0000; // atari bits (16..=19) pass through untouched
    for d in 0..8 {
        let slot = (code >> (2 * d)) & 0b11;
        let flipped = match slot {
            1 => 2,
            2 => 1,
            _ => 0,
        };
        out |= flipped << (2 * d);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worm::Worms;

    #[test]
    fn empty_neighbourhood_has_zero_code_and_value() {
        let geo = Geometry::new(9, 9);
        let worms = Worms::new(&geo);
        let mut patterns = Patterns::new(&geo);

        let p = geo.index(4, 4);
        patterns.recalculate_point(&geo, &worms, p);

        assert_eq!(patterns.patt3_at[p], 0);
        assert_eq!(patterns.get_value(p, Color::Black), 0);
        assert_eq!(patterns.get_value(p, Color::White), 0);
    }

    #[test]
    fn occupied_point_has_no_pattern_value() {
        let geo = Geometry::new(9, 9);
        let mut worms = Worms::new(&geo);
        let mut patterns = Patterns::new(&geo);

        worms.place_dot(&geo, 4, 4, Color::Black);
        let p = geo.index(4, 4);
        patterns.recalculate_point(&geo, &worms, p);

        assert_eq!(patterns.patt3_at[p], 0);
    }

    #[test]
    fn flip_owners_swaps_black_and_white_slots() {
        let code: Patt3Code = 1; // NE slot == black
        let flipped = flip_owners(code);

        assert_eq!(flipped & 0b11, 2);
    }

    #[test]
    fn three_friendly_neighbours_score_positive_for_that_owner() {
        let geo = Geometry::new(9, 9);
        let mut worms = Worms::new(&geo);
        let mut patterns = Patterns::new(&geo);

        let center = geo.index(4, 4);
        worms.place_dot(&geo, 5, 3, Color::Black); // NE
        worms.place_dot(&geo, 5, 4, Color::Black); // E
        worms.place_dot(&geo, 5, 5, Color::Black); // SE

        patterns.recalculate_point(&geo, &worms, center);

        assert!(patterns.get_value(center, Color::Black) > 0);
    }
}
