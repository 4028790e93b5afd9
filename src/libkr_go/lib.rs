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

extern crate kr_utils;
#[macro_use] extern crate lazy_static;
extern crate log;
extern crate rand;
extern crate smallvec;

pub mod geometry;
pub mod enclosure;
pub mod worm;
pub mod threats;
pub mod patterns;
pub mod safety;
pub mod movelists;
pub mod simple_game;
pub mod full_game;
pub mod scoring;
pub mod ladder;
pub mod sgf;
pub mod history;

pub use self::geometry::{Geometry, Point, Color};
pub use self::full_game::Game;
pub use self::simple_game::SimpleGame;
pub use self::scoring::Score;
