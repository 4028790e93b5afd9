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

extern crate kr_go;
extern crate kr_nn;
extern crate kr_utils;
#[macro_use] extern crate lazy_static;
extern crate log;
extern crate rand;

/* -------- Modules -------- */

pub mod komi;
mod options;
mod playout;
mod priors;
pub mod search;
pub mod time_control;
pub mod tree;

/* -------- Exports -------- */

pub use self::komi::KomiRatchet;
pub use self::options::SearchOptions;
pub use self::search::{search, SearchResult};
pub use self::time_control::{TimeStrategy, Unbounded, WallClock};
