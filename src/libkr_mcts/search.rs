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

//! The top-level search loop: a fixed pool of worker threads, each
//! descending its own clone of the position through the shared tree,
//! expanding the first unexpanded node it reaches, running one playout
//! from there, and backing the result up the path it walked down. Workers
//! check a shared `finish` flag between iterations only -- a cancelled
//! round still completes whatever rollout it is in the middle of.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use rand::rngs::SmallRng;
use rand::SeedableRng;

use kr_go::full_game::{Game, Move};
use kr_go::geometry::{Color, Point};

use crate::komi::KomiRatchet;
use crate::options::SearchOptions;
use crate::playout::{self, LastGoodReply};
use crate::priors;
use crate::time_control::{self, TimeStrategy};
use crate::tree::TreeNode;

/// The result of a completed search: the move judged best (by playout
/// count, the standard MCTS tie-break against noisy value estimates), the
/// tree it was read from, in case the caller wants to keep it for
/// `mcstats.txt` reporting or tree reuse, and the mover's win rate at the
/// chosen child -- the input the caller's komi ratchet checks against its
/// checkpoint.
pub struct SearchResult {
    pub best_move: Option<Point>,
    pub root: TreeNode,
    pub root_win_rate: f32,
}

/// Runs one full search round from `game`'s current position and returns
/// the move the root judged best. `time` is cloned once per worker, so
/// any state it tracks (like a wall-clock start) must be meaningful when
/// shared across clones -- `WallClock` captures its start instant before
/// the first clone, so every worker agrees on when the round began.
pub fn search<T>(game: &Game, options: &SearchOptions, time: T) -> SearchResult
where
    T: TimeStrategy + Clone + 'static,
{
    let who = game.now_moves();
    let root = TreeNode::new_root();
    root.expand_with(|| priors::build_children(game, who, 1, options.max_cnn_depth));

    if root.children().map_or(0, |c| c.len()) <= 1 {
        let best_move = root.children().and_then(|c| c.first()).map(|c| c.candidate.point);
        let root_win_rate = root.children().and_then(|c| c.first()).map_or(0.5, |c| c.q());
        return SearchResult { best_move, root, root_win_rate };
    }

    log::debug!("search starting with {} root candidates across {} workers", root.children().map_or(0, |c| c.len()), options.num_workers.max(1));

    let root = Arc::new(root);
    let finished = Arc::new(AtomicBool::new(false));
    let total_playouts = Arc::new(AtomicI32::new(0));
    // Shared across workers so the ratchet's "which side did we last push
    // toward" state stays a single consistent sequence rather than one
    // independent (and oscillating) ratchet per worker.
    let komi_state = Arc::new(Mutex::new((game.komi, KomiRatchet::new())));

    let handles: Vec<_> = (0..options.num_workers.max(1))
        .map(|worker_id| {
            let root = Arc::clone(&root);
            let finished = Arc::clone(&finished);
            let total_playouts = Arc::clone(&total_playouts);
            let komi_state = Arc::clone(&komi_state);
            let game = game.clone();
            let options = options.clone();
            let time = time.clone();

            thread::Builder::new()
                .name(format!("kr-mcts-{}", worker_id))
                .spawn(move || {
                    let mut rng = if options.deterministic {
                        SmallRng::seed_from_u64(worker_id as u64)
                    } else {
                        SmallRng::from_entropy()
                    };
                    let mut lgr = LastGoodReply::new();

                    loop {
                        if finished.load(Ordering::Relaxed) {
                            break;
                        }

                        let mut worker_game = game.clone();
                        worker_game.komi = komi_state.lock().unwrap().0;
                        run_one_iteration(&root, &mut worker_game, who, &options, &mut rng, &mut lgr);
                        let total = total_playouts.fetch_add(1, Ordering::Relaxed) + 1;

                        {
                            let mut guard = komi_state.lock().unwrap();
                            let (komi, ratchet) = &mut *guard;
                            let win_rate = best_child(&root).map_or(0.5, |c| c.q());
                            ratchet.maybe_adjust(komi, total, who, win_rate);
                        }

                        if should_stop(&root, &total_playouts, &options, &time) {
                            finished.store(true, Ordering::Relaxed);
                            break;
                        }
                    }
                })
                .expect("failed to spawn MCTS worker thread")
        })
        .collect();

    for handle in handles {
        let _ = handle.join();
    }

    // every worker's `Arc` clone was moved into its closure and dropped
    // when the thread returned, so this is the only handle left.
    let root = Arc::try_unwrap(root).unwrap_or_else(|_| panic!("worker thread leaked a reference to the search tree"));
    let best_move = best_child(&root).map(|c| c.candidate.point);
    let root_win_rate = best_child(&root).map_or(0.5, |c| c.q());

    log::debug!(
        "search finished after {} playouts, best move {:?}, win rate {:.3}",
        total_playouts.load(Ordering::Relaxed),
        best_move,
        root_win_rate
    );

    SearchResult { best_move, root, root_win_rate }
}

fn should_stop(root: &TreeNode, total_playouts: &AtomicI32, options: &SearchOptions, time: &impl TimeStrategy) -> bool {
    let Some(children) = root.children() else { return true };
    let counts: Vec<i32> = children.iter().map(|c| c.playouts()).collect();
    time_control::is_done(&counts, total_playouts.load(Ordering::Relaxed), options, time)
}

fn best_child(root: &TreeNode) -> Option<&TreeNode> {
    root.children()?.iter().max_by_key(|c| c.playouts())
}

/// One descend-expand-playout-backprop cycle, starting at `root`.
fn run_one_iteration(root: &TreeNode, game: &mut Game, root_who: Color, options: &SearchOptions, rng: &mut SmallRng, lgr: &mut LastGoodReply) {
    let mut path: Vec<(Color, &TreeNode)> = Vec::new();
    let mut node = root;
    let mut who = root_who;
    let mut depth = 1usize;

    loop {
        let Some(children) = node.children() else { break };
        if children.is_empty() {
            break;
        }

        let parent_total = node.playouts().max(1);
        let c = if depth == 1 { options.uct_exp_root } else { options.uct_exp };
        let child = children
            .iter()
            .max_by(|a, b| a.selection_value(parent_total, c).partial_cmp(&b.selection_value(parent_total, c)).unwrap())
            .unwrap();

        child.add_virtual_loss(options.virtual_loss);
        apply_move(game, child.candidate.point, who);
        path.push((who, child));
        who = who.opposite();
        depth += 1;

        if child.wants_expansion(depth, options.expand_threshold) {
            let game_ref = &*game;
            child.expand_with(|| priors::build_children(game_ref, who, depth, options.max_cnn_depth));
            break;
        }
        if !child.is_expanded() {
            // another worker is mid-expansion or progressive widening has
            // not yet let this node open up; play it out from here.
            break;
        }
        node = child;
    }

    let (value, trace) = playout::run_playout(game, root_who, rng, lgr);
    backprop(root, &path, &trace, root_who, value, options.virtual_loss);
}

/// Credits the raw edge statistic along the descent path, plus the AMAF
/// twin of every sibling (at every visited ply) whose move reappears
/// later in the same colour's share of the path or rollout trace --
/// RAVE's "all moves as first" update.
fn backprop(root: &TreeNode, path: &[(Color, &TreeNode)], trace: &[(Color, Point)], root_who: Color, value: f32, virtual_loss: i32) {
    let mut played_by: [HashSet<Point>; 2] = [HashSet::new(), HashSet::new()];
    for &(who, p) in trace {
        played_by[who.index()].insert(p);
    }
    for &(who, node) in path {
        played_by[who.index()].insert(node.candidate.point);
    }

    let mut parent = root;
    for &(who, node) in path {
        let edge_value = if who == root_who { value } else { 1.0 - value };
        node.undo_virtual_loss_and_backprop(virtual_loss, edge_value);

        if let Some(siblings) = parent.children() {
            for sibling in siblings {
                if played_by[who.index()].contains(&sibling.candidate.point) {
                    sibling.add_amaf(1.0, edge_value);
                }
            }
        }

        parent = node;
    }
}

fn apply_move(game: &mut Game, p: Point, who: Color) {
    let (x, y) = (game.simple.geo.x(p) as usize, game.simple.geo.y(p) as usize);
    let enclosures = game.enclosures_available_at(x, y, who);
    let _ = game.make_move(Move { x, y, who, enclosures });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_control::Unbounded;
    use kr_go::Geometry;
    use std::sync::Arc as StdArc;

    #[test]
    fn search_on_an_empty_board_picks_some_legal_move() {
        let geo = StdArc::new(Geometry::new(7, 7));
        let game = Game::new(geo);
        let options = SearchOptions::new().with_num_workers(2).with_max_iterations(64);

        let result = search(&game, &options, Unbounded);

        assert!(result.best_move.is_some());
    }

    #[test]
    fn a_single_legal_candidate_short_circuits_the_worker_pool() {
        // Fill every point but one on the smallest legal board, so the
        // root has exactly one legal candidate and the search should
        // return it directly instead of spinning up any workers.
        let geo = StdArc::new(Geometry::new(5, 5));
        let mut game = Game::new(geo);
        let last = game.simple.geo.index(2, 2);

        for x in 0..5 {
            for y in 0..5 {
                let p = game.simple.geo.index(x, y);
                if p != last {
                    game.simple.place_dot(x, y, Color::Black).unwrap();
                }
            }
        }

        let options = SearchOptions::new().with_num_workers(4).with_max_iterations(64);

        let result = search(&game, &options, Unbounded);

        assert_eq!(result.best_move, Some(last));
    }
}
