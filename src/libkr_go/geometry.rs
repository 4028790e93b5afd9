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

//! Board geometry: point indexing, neighbour offsets, SGF coordinate
//! mapping, and Zobrist tables. Mirrors `coord` in the original engine --
//! a single value threaded through every other component instead of a
//! global singleton.

use kr_utils::ParseError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const MIN_SIZE: usize = 5;
pub const MAX_SIZE: usize = 45;

/// Index of a point into the padded one-dimensional board array. `0` is
/// reserved as a sentinel ("no point" / halo).
pub type Point = usize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Color {
    Black = 1,
    White = 2,
}

impl Color {
    pub fn opposite(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Color::Black => 0,
            Color::White => 1,
        }
    }
}

impl std::ops::Not for Color {
    type Output = Color;

    fn not(self) -> Color {
        self.opposite()
    }
}

/// The eight ring-1 directions, in the clockwise order fixed by the
/// specification: NE, E, SE, S, SW, W, NW, N.
pub const NUM_NB8: usize = 8;
/// The four orthogonal directions, in the order N, E, S, W.
pub const NUM_NB4: usize = 4;

#[derive(Clone)]
pub struct Geometry {
    pub width: usize,
    pub height: usize,
    size: usize,
    stride: isize,

    pub nb4: [isize; NUM_NB4],
    pub nb8: [isize; NUM_NB8],
    pub nb25: [isize; 25],

    dist: Vec<u8>,
    x_of: Vec<i16>,
    y_of: Vec<i16>,
    on_board: Vec<bool>,

    pub z_dot: [Vec<u64>; 2],
    pub z_encl: [Vec<u64>; 2],
}

impl Geometry {
    /// Builds a new geometry for a `width` x `height` board. Fails (via
    /// `ParseError`) only at the parsing boundary -- this constructor
    /// assumes the caller already validated the bounds.
    pub fn new(width: usize, height: usize) -> Self {
        assert!(width >= MIN_SIZE && width <= MAX_SIZE, "width out of range");
        assert!(height >= MIN_SIZE && height <= MAX_SIZE, "height out of range");

        let stride = (height + 1) as isize;
        let size = (width + 2) * (height + 1) + 1;

        let nb4 = [-1, stride, 1, -stride]; // N, E, S, W
        let nb8 = [
            stride - 1,  // NE
            stride,      // E
            stride + 1,  // SE
            1,           // S
            -stride + 1, // SW
            -stride,     // W
            -stride - 1, // NW
            -1,          // N
        ];

        let mut nb25 = [0isize; 25];
        let mut idx = 0;
        for dy in -2..=2isize {
            for dx in -2..=2isize {
                nb25[idx] = dx * stride + dy;
                idx += 1;
            }
        }

        let mut dist = vec![0u8; size];
        let mut x_of = vec![-1i16; size];
        let mut y_of = vec![-1i16; size];
        let mut on_board = vec![false; size];

        for x in 0..width {
            for y in 0..height {
                let p = Self::index_of(x, y, stride);
                let d = x.min(width - 1 - x).min(y).min(height - 1 - y);

                dist[p] = d as u8;
                x_of[p] = x as i16;
                y_of[p] = y as i16;
                on_board[p] = true;
            }
        }

        let mut rng = StdRng::seed_from_u64(0x4b524f_504b49); // "KROPKI" in hex-ish, fixed for reproducibility
        let mut z_dot = [vec![0u64; size], vec![0u64; size]];
        let mut z_encl = [vec![0u64; size], vec![0u64; size]];

        for p in 0..size {
            for owner in 0..2 {
                z_dot[owner][p] = rng.gen();
                z_encl[owner][p] = rng.gen();
            }
        }

        Geometry {
            width,
            height,
            size,
            stride,
            nb4,
            nb8,
            nb25,
            dist,
            x_of,
            y_of,
            on_board,
            z_dot,
            z_encl,
        }
    }

    fn index_of(x: usize, y: usize, stride: isize) -> Point {
        ((x as isize + 1) * stride + y as isize + 1) as Point
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> Point {
        Self::index_of(x, y, self.stride)
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn stride(&self) -> isize {
        self.stride
    }

    #[inline]
    pub fn is_on_board(&self, p: Point) -> bool {
        p < self.size && self.on_board[p]
    }

    #[inline]
    pub fn dist(&self, p: Point) -> u8 {
        self.dist[p]
    }

    #[inline]
    pub fn x(&self, p: Point) -> i16 {
        self.x_of[p]
    }

    #[inline]
    pub fn y(&self, p: Point) -> i16 {
        self.y_of[p]
    }

    /// The next neighbour clockwise from `dir` in the nb8 ring, used when
    /// tracing an enclosure's border.
    #[inline]
    pub fn next_clockwise(&self, dir: usize) -> usize {
        (dir + 1) % NUM_NB8
    }

    #[inline]
    pub fn prev_clockwise(&self, dir: usize) -> usize {
        (dir + NUM_NB8 - 1) % NUM_NB8
    }

    /// Offset to the `dir`-th nb8 neighbour of `p`, without bounds checks.
    #[inline]
    pub fn nb8_of(&self, p: Point, dir: usize) -> Point {
        (p as isize + self.nb8[dir]) as Point
    }

    #[inline]
    pub fn nb4_of(&self, p: Point, dir: usize) -> Point {
        (p as isize + self.nb4[dir]) as Point
    }

    pub fn all_points(&self) -> impl Iterator<Item = Point> + '_ {
        (0..self.width).flat_map(move |x| (0..self.height).map(move |y| self.index(x, y)))
    }

    pub fn chebyshev(&self, p1: Point, p2: Point) -> i32 {
        let dx = (self.x(p1) - self.x(p2)).abs() as i32;
        let dy = (self.y(p1) - self.y(p2)).abs() as i32;

        dx.max(dy)
    }

    pub fn manhattan(&self, p1: Point, p2: Point) -> i32 {
        let dx = (self.x(p1) - self.x(p2)).abs() as i32;
        let dy = (self.y(p1) - self.y(p2)).abs() as i32;

        dx + dy
    }

    /// Encode a point as SGF-style coordinates using the letters `a..zA..Z`
    /// (0..52) for each axis.
    pub fn point_to_sgf(&self, p: Point) -> String {
        let x = self.x(p);
        let y = self.y(p);

        format!("{}{}", letter_of(x as usize), letter_of(y as usize))
    }

    /// Decode a two-letter SGF coordinate pair into a point. Returns
    /// `BadCoordinate` for anything that is not two letters, and `OffBoard`
    /// if the resulting point does not lie on this board.
    pub fn sgf_to_point(&self, s: &str) -> Result<Point, ParseError> {
        let chars: Vec<char> = s.chars().collect();

        if chars.len() != 2 {
            return Err(ParseError::BadCoordinate { text: s.to_string(), column: 0 });
        }

        let x = index_of_letter(chars[0])
            .ok_or_else(|| ParseError::BadCoordinate { text: s.to_string(), column: 0 })?;
        let y = index_of_letter(chars[1])
            .ok_or_else(|| ParseError::BadCoordinate { text: s.to_string(), column: 1 })?;

        if x >= self.width || y >= self.height {
            return Err(ParseError::OffBoard {
                x: x as i32,
                y: y as i32,
                width: self.width,
                height: self.height,
            });
        }

        Ok(self.index(x, y))
    }
}

fn letter_of(i: usize) -> char {
    if i < 26 {
        (b'a' + i as u8) as char
    } else {
        (b'A' + (i - 26) as u8) as char
    }
}

fn index_of_letter(c: char) -> Option<usize> {
    if c.is_ascii_lowercase() {
        Some(c as usize - 'a' as usize)
    } else if c.is_ascii_uppercase() {
        Some(26 + c as usize - 'A' as usize)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_roundtrip() {
        let geo = Geometry::new(9, 9);

        for x in 0..9 {
            for y in 0..9 {
                let p = geo.index(x, y);
                assert_eq!(geo.x(p) as usize, x);
                assert_eq!(geo.y(p) as usize, y);
            }
        }
    }

    #[test]
    fn sgf_roundtrip_is_identity() {
        let geo = Geometry::new(19, 19);

        for p in geo.all_points() {
            let sgf = geo.point_to_sgf(p);
            let back = geo.sgf_to_point(&sgf).unwrap();

            assert_eq!(p, back);
        }
    }

    #[test]
    fn bad_coordinate_rejected() {
        let geo = Geometry::new(9, 9);

        assert!(geo.sgf_to_point("1a").is_err());
        assert!(geo.sgf_to_point("a").is_err());
        assert!(geo.sgf_to_point("zz").is_err()); // off board (9x9)
    }

    #[test]
    fn dist_is_chebyshev_to_edge() {
        let geo = Geometry::new(7, 7);
        let corner = geo.index(0, 0);
        let centre = geo.index(3, 3);

        assert_eq!(geo.dist(corner), 0);
        assert_eq!(geo.dist(centre), 3);
    }

    #[test]
    fn nb8_order_is_clockwise_from_ne() {
        let geo = Geometry::new(9, 9);
        let p = geo.index(4, 4);

        let ne = geo.nb8_of(p, 0);
        assert_eq!((geo.x(ne), geo.y(ne)), (5, 3));

        let e = geo.nb8_of(p, 1);
        assert_eq!((geo.x(e), geo.y(e)), (5, 4));

        let n = geo.nb8_of(p, 7);
        assert_eq!((geo.x(n), geo.y(n)), (4, 3));
    }

    #[test]
    fn zobrist_tables_are_populated_and_distinct() {
        let geo = Geometry::new(9, 9);
        let p = geo.index(2, 2);
        let q = geo.index(2, 3);

        assert_ne!(geo.z_dot[0][p], geo.z_dot[1][p]);
        assert_ne!(geo.z_dot[0][p], geo.z_dot[0][q]);
    }
}
