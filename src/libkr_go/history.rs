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

//! The linear move history a `Game` replays to reach its current state,
//! plus the last-move / last-but-one-move bookkeeping the playout
//! policy and pattern priors depend on.

use crate::geometry::{Color, Point};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Ply {
    pub who: Color,
    pub mv: Point,
    /// `None` for a pass; `Some(root)` identifies the first point of the
    /// enclosure border chosen for this move, for replay/debugging.
    pub enclosure_hint: Option<Point>,
}

#[derive(Clone, Default)]
pub struct History {
    moves: Vec<Ply>,
}

impl History {
    pub fn new() -> Self {
        History { moves: Vec::new() }
    }

    pub fn push(&mut self, who: Color, mv: Point) {
        self.moves.push(Ply { who, mv, enclosure_hint: None });
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn last(&self) -> Option<Ply> {
        self.moves.last().copied()
    }

    /// The move before `last` -- used by the "3x3 pattern around own
    /// last-but-one move" playout heuristic.
    pub fn last_but_one(&self) -> Option<Ply> {
        if self.moves.len() >= 2 {
            Some(self.moves[self.moves.len() - 2])
        } else {
            None
        }
    }

    pub fn last_by(&self, who: Color) -> Option<Ply> {
        self.moves.iter().rev().find(|p| p.who == who).copied()
    }

    pub fn all(&self) -> &[Ply] {
        &self.moves
    }

    pub fn truncate(&mut self, len: usize) {
        self.moves.truncate(len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_but_one_is_none_until_two_moves_are_played() {
        let mut h = History::new();
        assert_eq!(h.last_but_one(), None);

        h.push(Color::Black, 10);
        assert_eq!(h.last_but_one(), None);

        h.push(Color::White, 11);
        assert_eq!(h.last_but_one().unwrap().mv, 10);
    }

    #[test]
    fn last_by_finds_most_recent_move_of_that_colour() {
        let mut h = History::new();
        h.push(Color::Black, 1);
        h.push(Color::White, 2);
        h.push(Color::Black, 3);

        assert_eq!(h.last_by(Color::Black).unwrap().mv, 3);
        assert_eq!(h.last_by(Color::White).unwrap().mv, 2);
    }
}
