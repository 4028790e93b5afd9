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

//! When a search round should stop. A round terminates as soon as any of
//! its three independent conditions fires: the iteration budget is spent,
//! the wall-clock budget is spent and the leader can no longer be caught,
//! or there is nothing left to choose between.

use std::time::Instant;

use crate::options::SearchOptions;

pub enum TimeStrategyResult {
    NotExpired(u64),
    Expired,
}

pub trait TimeStrategy: Send + Sync {
    /// Returns how many milliseconds remain, or that the budget is spent.
    fn try_extend(&self) -> TimeStrategyResult;
}

/// No wall-clock budget at all -- the round only ever stops on iteration
/// count or leader-is-uncatchable.
#[derive(Clone, Copy)]
pub struct Unbounded;

impl TimeStrategy for Unbounded {
    fn try_extend(&self) -> TimeStrategyResult {
        TimeStrategyResult::NotExpired(u64::MAX)
    }
}

/// A fixed wall-clock budget, started the moment the strategy is built.
#[derive(Clone, Copy)]
pub struct WallClock {
    started_at: Instant,
    budget_msec: u64,
}

impl WallClock {
    pub fn new(budget_msec: u64) -> Self {
        WallClock { started_at: Instant::now(), budget_msec }
    }

    pub fn elapsed_msec(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }
}

impl TimeStrategy for WallClock {
    fn try_extend(&self) -> TimeStrategyResult {
        let elapsed = self.elapsed_msec();
        if elapsed >= self.budget_msec {
            TimeStrategyResult::Expired
        } else {
            TimeStrategyResult::NotExpired(self.budget_msec - elapsed)
        }
    }
}

/// The minimum number of additional playouts the second most-visited
/// child would need for it to overtake the most-visited one.
pub fn min_promote_rollouts(counts: &[i32]) -> i32 {
    let mut top_1 = 0;
    let mut top_2_count = -1;
    let mut top_1_count = -1;

    for (i, &count) in counts.iter().enumerate() {
        if count > top_1_count {
            top_2_count = top_1_count;
            top_1_count = count;
            top_1 = i;
        } else if count > top_2_count {
            top_2_count = count;
        }
    }
    let _ = top_1;

    (top_1_count - top_2_count).max(0)
}

/// Whether a round should stop. `counts` is each root child's current
/// playout count. The wall-clock leg implements the `EARLY-C` rule: once
/// time is up, the round still runs on if the leader could plausibly be
/// overtaken in the time it took to get this far.
pub fn is_done(counts: &[i32], total: i32, options: &SearchOptions, time: &dyn TimeStrategy) -> bool {
    if counts.len() <= 1 {
        return true;
    }
    if let Some(max_iterations) = options.max_iterations {
        if total >= max_iterations {
            return true;
        }
    }

    match time.try_extend() {
        TimeStrategyResult::Expired => true,
        TimeStrategyResult::NotExpired(remaining_msec) => {
            if remaining_msec == u64::MAX {
                return false;
            }
            let min_promote = min_promote_rollouts(counts);
            let elapsed = options.max_msec.unwrap_or(1).saturating_sub(remaining_msec).max(1);
            let rate = total as f64 / elapsed as f64;
            (min_promote as f64) > rate * remaining_msec as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_promote_rollouts_is_the_gap_to_the_runner_up() {
        assert_eq!(min_promote_rollouts(&[10, 4, 1]), 6);
        assert_eq!(min_promote_rollouts(&[10, 10]), 0);
    }

    #[test]
    fn a_single_candidate_is_always_done() {
        let options = SearchOptions::new();
        assert!(is_done(&[5], 5, &options, &Unbounded));
    }

    #[test]
    fn unbounded_time_never_expires_on_its_own() {
        let options = SearchOptions::new().with_max_iterations(1_000_000);
        assert!(!is_done(&[5, 3], 8, &options, &Unbounded));
    }
}
