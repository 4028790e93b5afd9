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

//! Mid-search komi adaptation. Every time the iteration count crosses a
//! geometrically growing checkpoint (200, 1200, 7200, ...), a lopsided
//! root win-rate nudges komi two points toward the stronger side -- unless
//! a ratchet set by an earlier push already favours the other direction,
//! in which case the push is refused rather than oscillating.

use kr_go::geometry::Color;

const FIRST_CHECKPOINT: i32 = 200;
const CHECKPOINT_GROWTH: i32 = 6;
const GREEN_ZONE: f32 = 0.55;
const RED_ZONE: f32 = 0.45;

pub struct KomiRatchet {
    next_checkpoint: i32,
    favours: Option<Color>,
}

impl KomiRatchet {
    pub fn new() -> Self {
        KomiRatchet { next_checkpoint: FIRST_CHECKPOINT, favours: None }
    }

    /// Call once per completed iteration batch with the current total
    /// playout count at the root and the mover's win rate there. Returns
    /// the komi delta to apply (always `-2`, `0`, or `+2` from `mover`'s
    /// point of view), already folded into `*komi` if nonzero.
    pub fn maybe_adjust(&mut self, komi: &mut i32, total_playouts: i32, mover: Color, mover_win_rate: f32) {
        if total_playouts < self.next_checkpoint {
            return;
        }
        self.next_checkpoint = self.next_checkpoint.saturating_mul(CHECKPOINT_GROWTH);

        if mover_win_rate > GREEN_ZONE {
            if self.favours != Some(mover.opposite()) {
                *komi += if mover == Color::Black { 2 } else { -2 };
                self.favours = Some(mover);
            }
        } else if mover_win_rate < RED_ZONE {
            *komi += if mover == Color::Black { -2 } else { 2 };
            self.favours = Some(mover.opposite());
        }
    }
}

impl Default for KomiRatchet {
    fn default() -> Self {
        KomiRatchet::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_adjustment_before_the_first_checkpoint() {
        let mut ratchet = KomiRatchet::new();
        let mut komi = 0;

        ratchet.maybe_adjust(&mut komi, 199, Color::Black, 0.9);

        assert_eq!(komi, 0);
    }

    #[test]
    fn a_green_zone_win_rate_pushes_komi_toward_the_mover() {
        let mut ratchet = KomiRatchet::new();
        let mut komi = 0;

        ratchet.maybe_adjust(&mut komi, 200, Color::Black, 0.9);

        assert_eq!(komi, 2);
    }

    #[test]
    fn the_ratchet_refuses_to_immediately_reverse_its_own_push() {
        let mut ratchet = KomiRatchet::new();
        let mut komi = 0;

        ratchet.maybe_adjust(&mut komi, 200, Color::Black, 0.9);
        ratchet.next_checkpoint = 200;
        ratchet.maybe_adjust(&mut komi, 200, Color::White, 0.9);

        assert_eq!(komi, 2);
    }
}
