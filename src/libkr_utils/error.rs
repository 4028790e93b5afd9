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

//! The two user-facing error kinds described by the error handling design:
//! parse errors at the text boundary, and rule errors when a move is
//! illegal. Internal consistency failures are not represented here -- they
//! are `debug_assert!` panics, intentionally unrecoverable.

use thiserror::Error;

/// A malformed coordinate, out-of-board point, or unrecognised token in a
/// game transcript or interactive command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("bad coordinate at column {column}: {text:?}")]
    BadCoordinate { text: String, column: usize },

    #[error("point {x},{y} is off the {width}x{height} board")]
    OffBoard { x: i32, y: i32, width: usize, height: usize },

    #[error("unknown command {0:?}")]
    UnknownCommand(String),

    #[error("missing required property {0}")]
    MissingProperty(&'static str),

    #[error("malformed SGF: {0}")]
    Malformed(String),
}

/// A move that violates the rules of the game -- the only rule error is
/// playing on a non-empty point. Fatal in batch mode, rejected in
/// interactive mode.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("point is already occupied")]
    Occupied,

    #[error("must-surround is active and no legal enclosure was supplied")]
    MissingMandatoryEnclosure,
}
