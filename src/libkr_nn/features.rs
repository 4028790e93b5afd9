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

//! Input planes for the CNN: each plane is `width * height` floats, laid
//! out in the same x-major order `Geometry::all_points` enumerates, i.e.
//! cell `x * height + y`.

use kr_go::enclosure::CellView;
use kr_go::{Color, Game};

/// Occupancy (empty / us / opponent), territory, enclosure and border
/// membership per side, plus total safety -- ten planes, matching the
/// richer end of the range the network is allowed to ask for.
pub const NUM_PLANES: usize = 10;

/// Builds the full feature stack for `who` to move. Planes, in order:
/// 0 empty, 1 us, 2 opponent, 3 our territory, 4 opponent territory,
/// 5 our enclosure, 6 opponent enclosure, 7 our border, 8 opponent
/// border, 9 total safety (scaled to roughly unit range).
pub fn extract(game: &Game, who: Color) -> Vec<f32> {
    let geo = &game.simple.geo;
    let opp = who.opposite();
    let cell_count = geo.width * geo.height;
    let mut planes = vec![0.0f32; NUM_PLANES * cell_count];

    for (i, p) in geo.all_points().enumerate() {
        let owner = game.simple.worms.owner_at(p);

        planes[0 * cell_count + i] = if owner.is_none() { 1.0 } else { 0.0 };
        planes[1 * cell_count + i] = if owner == Some(who) { 1.0 } else { 0.0 };
        planes[2 * cell_count + i] = if owner == Some(opp) { 1.0 } else { 0.0 };

        planes[3 * cell_count + i] = if game.simple.threats[who.index()].is_in_terr[p] > 0 { 1.0 } else { 0.0 };
        planes[4 * cell_count + i] = if game.simple.threats[opp.index()].is_in_terr[p] > 0 { 1.0 } else { 0.0 };

        planes[5 * cell_count + i] = if game.simple.threats[who.index()].is_in_encl[p] > 0 { 1.0 } else { 0.0 };
        planes[6 * cell_count + i] = if game.simple.threats[opp.index()].is_in_encl[p] > 0 { 1.0 } else { 0.0 };

        planes[7 * cell_count + i] = if game.simple.threats[who.index()].is_in_border[p] > 0 { 1.0 } else { 0.0 };
        planes[8 * cell_count + i] = if game.simple.threats[opp.index()].is_in_border[p] > 0 { 1.0 } else { 0.0 };

        planes[9 * cell_count + i] = (game.simple.safety.safety_of(p) / 8.0).clamp(-1.0, 1.0);
    }

    planes
}

#[cfg(test)]
mod tests {
    use super::*;
    use kr_go::Geometry;
    use std::sync::Arc;

    #[test]
    fn empty_board_has_every_point_marked_empty() {
        let geo = Arc::new(Geometry::new(9, 9));
        let game = Game::new(geo.clone());

        let planes = extract(&game, Color::Black);
        let cell_count = geo.width * geo.height;

        assert!(planes[0..cell_count].iter().all(|&v| v == 1.0));
        assert!(planes[cell_count..2 * cell_count].iter().all(|&v| v == 0.0));
    }
}
