//! Parallel Monte Carlo Tree Search.
//!
//! Each simulation walks the tree from the root (select), creates the
//! children of the leaf it reaches (expand), scores the leaf with the value
//! network mixed with a rollout (evaluate) and propagates the outcome back to
//! the root, flipping its sign at every ply (backpropagate).
//!
//! Nodes live in a fixed-capacity arena. The children of a node occupy a
//! contiguous index range claimed with an atomic bump pointer and published
//! once through the node's expansion state, so worker threads share the tree
//! without locks:
//!
//! - visit counts and virtual losses are atomic integers,
//! - value sums are `f64` bits updated with compare-and-swap,
//! - expansion is guarded by an `UNEXPANDED -> EXPANDING -> EXPANDED` flag.

use std::collections::HashSet;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::board::{Board, Color, Pos};
use crate::config::SearchConfig;
use crate::constants::{PASS, POLL_INTERVAL_MS, RESIGN_MIN_VISITS, max_records};
use crate::features;
use crate::oracle::{BatchQueue, Oracle};
use crate::rollout::{RolloutGame, RolloutPolicy};
use crate::score;

const UNEXPANDED: u8 = 0;
const EXPANDING: u8 = 1;
const EXPANDED: u8 = 2;

const ROOT: usize = 0;

#[derive(Copy, Clone, Debug, Default)]
struct Edge {
    mv: Pos,
    prior: f32,
}

/// A position in the search tree.
#[derive(Default)]
struct Node {
    /// Move leading here and its prior, written once before publication
    edge: OnceLock<Edge>,
    visits: AtomicU32,
    virtual_loss: AtomicU32,
    /// Sum of outcomes for the player who made the move into this node
    value_sum: AtomicU64,
    state: AtomicU8,
    first_child: AtomicUsize,
    num_children: AtomicUsize,
}

impl Node {
    #[inline]
    fn edge(&self) -> Edge {
        self.edge.get().copied().unwrap_or_default()
    }

    #[inline]
    fn visits(&self) -> u32 {
        self.visits.load(Ordering::Acquire)
    }

    #[inline]
    fn virtual_loss(&self) -> u32 {
        self.virtual_loss.load(Ordering::Acquire)
    }

    #[inline]
    fn value_sum(&self) -> f64 {
        f64::from_bits(self.value_sum.load(Ordering::Acquire))
    }

    fn add_value(&self, value: f64) {
        let mut current = self.value_sum.load(Ordering::Acquire);
        loop {
            let next = (f64::from_bits(current) + value).to_bits();
            match self.value_sum.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    /// Mean outcome for the player who moved into this node, 0 if unvisited.
    fn mean(&self) -> f64 {
        match self.visits() {
            0 => 0.0,
            n => self.value_sum() / f64::from(n),
        }
    }

    /// Index range of the children, once the node is expanded.
    fn children(&self) -> Option<Range<usize>> {
        if self.state.load(Ordering::Acquire) != EXPANDED {
            return None;
        }
        let first = self.first_child.load(Ordering::Relaxed);
        let n = self.num_children.load(Ordering::Relaxed);
        Some(first..first + n)
    }

    fn copy_stats(&self, other: &Node) {
        self.visits.store(other.visits(), Ordering::Relaxed);
        self.value_sum
            .store(other.value_sum.load(Ordering::Acquire), Ordering::Relaxed);
    }
}

/// Statistics of one root move.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ChildStats {
    pub mv: Pos,
    pub prior: f32,
    pub visits: u32,
    /// Winning probability of the player making the move, in `[0, 1]`
    pub winrate: f32,
}

/// The search tree rooted at one position.
pub struct Tree {
    nodes: Vec<Node>,
    next: AtomicUsize,
    full: AtomicBool,
    board: Board,
    komi: f32,
    /// Positions of the game so far, excluded at the root (superko)
    history: HashSet<u64>,
}

impl Tree {
    /// An empty tree for `board` with room for `capacity` nodes.
    pub fn new(board: Board, komi: f32, history: &[u64], capacity: usize) -> Tree {
        let nodes: Vec<Node> = (0..capacity.max(1)).map(|_| Node::default()).collect();
        let _ = nodes[ROOT].edge.set(Edge {
            mv: board.last_move(),
            prior: 1.0,
        });
        Tree {
            nodes,
            next: AtomicUsize::new(ROOT + 1),
            full: AtomicBool::new(false),
            board,
            komi,
            history: history.iter().copied().collect(),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn komi(&self) -> f32 {
        self.komi
    }

    /// Number of arena slots in use.
    pub fn node_count(&self) -> usize {
        self.next.load(Ordering::Acquire).min(self.nodes.len())
    }

    pub fn is_full(&self) -> bool {
        self.full.load(Ordering::Acquire)
    }

    pub fn root_visits(&self) -> u32 {
        self.nodes[ROOT].visits()
    }

    /// Winning probability of the player to move at the root.
    pub fn winrate(&self) -> f32 {
        ((1.0 - self.nodes[ROOT].mean()) / 2.0) as f32
    }

    /// Statistics of the root moves, in arena order.
    pub fn children(&self) -> Vec<ChildStats> {
        let Some(range) = self.nodes[ROOT].children() else {
            return Vec::new();
        };
        range
            .map(|i| {
                let node = &self.nodes[i];
                let edge = node.edge();
                ChildStats {
                    mv: edge.mv,
                    prior: edge.prior,
                    visits: node.visits(),
                    winrate: ((node.mean() + 1.0) / 2.0) as f32,
                }
            })
            .collect()
    }

    /// Most visited root move; ties go to the higher prior.
    pub fn best_child(&self) -> Option<ChildStats> {
        self.children().into_iter().max_by(|a, b| {
            a.visits
                .cmp(&b.visits)
                .then(a.prior.total_cmp(&b.prior))
        })
    }

    pub fn best_move(&self) -> Pos {
        self.best_child().map_or(PASS, |c| c.mv)
    }

    /// Log every root move at debug level.
    pub fn dump_children(&self) {
        if !log::log_enabled!(log::Level::Debug) {
            return;
        }
        for child in self.children() {
            log::debug!(
                "move {:>4} v={:<6} p={:.4} wr={:.3}",
                self.board.vertex(child.mv),
                child.visits,
                child.prior,
                child.winrate
            );
        }
    }

    fn repeats_position(&self, board: &Board, mv: Pos) -> bool {
        if mv == PASS || self.history.is_empty() {
            return false;
        }
        let mut next = board.clone();
        next.play(mv, board.to_move()).is_ok() && self.history.contains(&next.position_hash())
    }

    /// Pick the child maximising `Q + c * P * sqrt(N_parent) / (1 + N_child)`.
    /// Virtual losses count as visits that were lost; unvisited children
    /// start from an even `Q`.
    fn select(&self, parent: &Node, children: Range<usize>, puct: f32) -> usize {
        let total = parent.visits() + parent.virtual_loss();
        let sqrt_total = (total.max(1) as f32).sqrt();
        let mut best = children.start;
        let mut best_score = f32::NEG_INFINITY;
        for i in children {
            let child = &self.nodes[i];
            let n = child.visits() as f32;
            let vl = child.virtual_loss() as f32;
            let q = if n + vl > 0.0 {
                (child.value_sum() as f32 - vl) / (n + vl)
            } else {
                0.0
            };
            let u = puct * child.edge().prior * sqrt_total / (1.0 + n + vl);
            if q + u > best_score {
                best_score = q + u;
                best = i;
            }
        }
        best
    }

    /// Create the children of `index` from `priors` (`size * size + 1`
    /// entries) restricted to sensible moves plus pass. Returns false if
    /// another thread got there first or the arena is full.
    fn expand(&self, index: usize, board: &Board, priors: &[f32]) -> bool {
        let node = &self.nodes[index];
        if node
            .state
            .compare_exchange(UNEXPANDED, EXPANDING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let area = board.size() * board.size();
        let prior_of = |i: usize| priors.get(i).copied().unwrap_or(0.0).max(0.0);
        let mut edges: Vec<Edge> = board
            .sensible_moves(board.to_move())
            .into_iter()
            .filter(|&mv| index != ROOT || !self.repeats_position(board, mv))
            .map(|mv| Edge {
                mv,
                prior: prior_of(board.onboard_index(mv)),
            })
            .collect();
        edges.push(Edge {
            mv: PASS,
            prior: prior_of(area),
        });
        let sum: f32 = edges.iter().map(|e| e.prior).sum();
        let uniform = 1.0 / edges.len() as f32;
        for edge in &mut edges {
            edge.prior = if sum > 0.0 { edge.prior / sum } else { uniform };
        }

        let start = self.next.fetch_add(edges.len(), Ordering::AcqRel);
        if start + edges.len() > self.nodes.len() {
            if !self.full.swap(true, Ordering::AcqRel) {
                log::warn!("search tree is full ({} nodes)", self.nodes.len());
            }
            node.state.store(UNEXPANDED, Ordering::Release);
            return false;
        }
        for (k, edge) in edges.iter().enumerate() {
            let fresh = self.nodes[start + k].edge.set(*edge).is_ok();
            assert!(fresh, "arena slot {} claimed twice", start + k);
        }
        node.first_child.store(start, Ordering::Relaxed);
        node.num_children.store(edges.len(), Ordering::Relaxed);
        node.state.store(EXPANDED, Ordering::Release);
        true
    }

    fn backup(&self, path: &[usize], value: f32, virtual_loss: u32) {
        // `value` is for the player to move at the leaf; the leaf stores it
        // for the player who moved into it
        let mut value = -f64::from(value);
        for &i in path.iter().rev() {
            let node = &self.nodes[i];
            node.add_value(value);
            node.visits.fetch_add(1, Ordering::AcqRel);
            node.virtual_loss.fetch_sub(virtual_loss, Ordering::AcqRel);
            value = -value;
        }
    }

    fn simulate(&self, evaluator: &Evaluator, config: &SearchConfig, rng: &mut fastrand::Rng) {
        let vl = config.virtual_loss;
        let mut board = self.board.clone();
        let mut path = vec![ROOT];
        let mut index = ROOT;
        self.nodes[ROOT].virtual_loss.fetch_add(vl, Ordering::AcqRel);

        while board.pass_count() < 2
            && let Some(children) = self.nodes[index].children()
        {
            let child = self.select(&self.nodes[index], children, config.puct);
            let mv = self.nodes[child].edge().mv;
            let color = board.to_move();
            if let Err(e) = board.play(mv, color) {
                panic!("tree holds an illegal move {} for {color}: {e}", board.vertex(mv));
            }
            self.nodes[child].virtual_loss.fetch_add(vl, Ordering::AcqRel);
            path.push(child);
            index = child;
        }

        let value = if board.pass_count() >= 2 {
            terminal_value(&board, self.komi)
        } else {
            let expand = index == ROOT || self.nodes[index].visits() + 1 >= config.expand_visits;
            evaluator.evaluate(self, index, &board, expand, rng)
        };
        self.backup(&path, value, vl);
    }

    /// The tree after `mv` is played: the subtree under `mv` is copied into
    /// a fresh arena and everything else is dropped.
    pub fn advance(&self, mv: Pos, board: Board, history: &[u64], capacity: usize) -> Tree {
        let tree = Tree::new(board, self.komi, history, capacity);
        let child = self.nodes[ROOT]
            .children()
            .and_then(|mut range| range.find(|&i| self.nodes[i].edge().mv == mv));
        if let Some(child) = child {
            tree.copy_subtree(self, child);
        }
        tree
    }

    fn copy_subtree(&self, from: &Tree, start: usize) {
        self.nodes[ROOT].copy_stats(&from.nodes[start]);
        let mut stack = vec![(start, ROOT)];
        while let Some((old, new)) = stack.pop() {
            let Some(range) = from.nodes[old].children() else {
                continue;
            };
            let children: Vec<usize> = range
                .filter(|&i| {
                    new != ROOT || !self.repeats_position(&self.board, from.nodes[i].edge().mv)
                })
                .collect();
            let begin = self.next.load(Ordering::Acquire);
            if begin + children.len() > self.nodes.len() {
                self.full.store(true, Ordering::Release);
                continue;
            }
            self.next.store(begin + children.len(), Ordering::Release);
            for (k, &i) in children.iter().enumerate() {
                let slot = &self.nodes[begin + k];
                let _ = slot.edge.set(from.nodes[i].edge());
                slot.copy_stats(&from.nodes[i]);
                stack.push((i, begin + k));
            }
            let node = &self.nodes[new];
            node.first_child.store(begin, Ordering::Relaxed);
            node.num_children.store(children.len(), Ordering::Relaxed);
            node.state.store(EXPANDED, Ordering::Release);
        }
    }

    /// True if the leading root move cannot be overtaken by the second one
    /// within the remaining budget.
    fn is_decided(
        &self,
        done: usize,
        limit: usize,
        started: Instant,
        deadline: Option<Instant>,
    ) -> bool {
        let Some(range) = self.nodes[ROOT].children() else {
            return false;
        };
        let (mut first, mut second) = (0u32, 0u32);
        for i in range {
            let v = self.nodes[i].visits();
            if v > first {
                second = first;
                first = v;
            } else if v > second {
                second = v;
            }
        }
        let mut remaining = limit.saturating_sub(done);
        if let Some(deadline) = deadline {
            let elapsed = started.elapsed().as_secs_f64();
            if done > 0 && elapsed > 0.0 {
                let rate = done as f64 / elapsed;
                let left = deadline.saturating_duration_since(Instant::now()).as_secs_f64();
                remaining = remaining.min((rate * left) as usize);
            }
        }
        (first - second) as usize > remaining
    }
}

/// Outcome in `[-1, 1]` of a finished game for the player to move.
fn terminal_value(board: &Board, komi: f32) -> f32 {
    let margin = score::score(board, komi);
    let black = if margin > 0.0 {
        1.0
    } else if margin < 0.0 {
        -1.0
    } else {
        0.0
    };
    match board.to_move() {
        Color::Black => black,
        Color::White => -black,
    }
}

/// Leaf evaluation: oracle priors and value, mixed with a rollout.
struct Evaluator {
    size: usize,
    queue: Option<BatchQueue>,
    tree_policy: Arc<RolloutPolicy>,
    rollout_policy: Arc<RolloutPolicy>,
    mixing: f32,
    rollout_limit: usize,
}

impl Evaluator {
    fn new(
        config: &SearchConfig,
        size: usize,
        oracle: Option<Arc<dyn Oracle>>,
        tree_policy: Arc<RolloutPolicy>,
        rollout_policy: Arc<RolloutPolicy>,
    ) -> Evaluator {
        let queue = oracle.map(|oracle| {
            BatchQueue::new(
                oracle,
                size,
                config.batch_size,
                config.batch_wait,
                config.oracle_timeout,
            )
        });
        Evaluator {
            size,
            queue,
            tree_policy,
            rollout_policy,
            mixing: config.mixing.clamp(0.0, 1.0),
            rollout_limit: config.rollout_limit.unwrap_or(max_records(size)),
        }
    }

    /// Value of `board` for its player to move, expanding `index` on the way
    /// if asked to.
    fn evaluate(
        &self,
        tree: &Tree,
        index: usize,
        board: &Board,
        expand: bool,
        rng: &mut fastrand::Rng,
    ) -> f32 {
        let evaluation = self.queue.as_ref().and_then(|queue| {
            queue
                .evaluate(features::extract(board))
                .inspect_err(|e| log::warn!("oracle unavailable, falling back to rollouts: {e}"))
                .ok()
        });

        let rollout = if evaluation.is_none() || self.mixing > 0.0 {
            let mut game = RolloutGame::new(board.clone(), &self.rollout_policy, tree.komi);
            let black = game.playout(rng, self.rollout_limit);
            match board.to_move() {
                Color::Black => black,
                Color::White => -black,
            }
        } else {
            0.0
        };

        if expand {
            match &evaluation {
                Some(e) => tree.expand(index, board, &e.priors),
                None => tree.expand(index, board, &self.tree_policy.priors(board)),
            };
        }

        match evaluation {
            Some(e) => self.mixing * rollout + (1.0 - self.mixing) * e.value,
            None => rollout,
        }
    }
}

/// Run simulations on `threads` workers until `limit` playouts are done,
/// the deadline passes, the result is decided or `stop` is raised.
fn run_workers(
    tree: &Tree,
    evaluator: &Evaluator,
    config: &SearchConfig,
    limit: usize,
    deadline: Option<Instant>,
    stop: &AtomicBool,
    seed: u64,
) -> usize {
    let started = Instant::now();
    let playouts = AtomicUsize::new(0);
    let unbounded = limit == usize::MAX && deadline.is_none();

    thread::scope(|s| {
        let workers: Vec<_> = (0..config.threads.max(1))
            .map(|t| {
                let playouts = &playouts;
                s.spawn(move || {
                    let mut rng = fastrand::Rng::with_seed(seed.wrapping_add(t as u64));
                    while !stop.load(Ordering::Acquire) {
                        if playouts.fetch_add(1, Ordering::AcqRel) >= limit {
                            break;
                        }
                        tree.simulate(evaluator, config, &mut rng);
                    }
                })
            })
            .collect();

        while !workers.iter().all(|w| w.is_finished()) {
            thread::sleep(Duration::from_millis(POLL_INTERVAL_MS));
            let done = playouts.load(Ordering::Acquire).min(limit);
            let timed_out = deadline.is_some_and(|d| Instant::now() >= d);
            let decided = config.early_stop && tree.is_decided(done, limit, started, deadline);
            if timed_out || decided || (unbounded && tree.is_full()) {
                stop.store(true, Ordering::Release);
            }
        }
    });

    playouts.load(Ordering::Acquire).min(limit)
}

/// What the search recommends.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Play(Pos),
    Resign,
}

struct Pondering {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<usize>,
}

/// A search tree together with the machinery to grow it.
pub struct Search {
    config: SearchConfig,
    oracle: Option<Arc<dyn Oracle>>,
    evaluator: Arc<Evaluator>,
    tree: Arc<Tree>,
    pondering: Option<Pondering>,
    searches: u64,
}

impl Search {
    pub fn new(
        config: SearchConfig,
        board: Board,
        komi: f32,
        oracle: Option<Arc<dyn Oracle>>,
        tree_policy: Arc<RolloutPolicy>,
        rollout_policy: Arc<RolloutPolicy>,
    ) -> Search {
        let evaluator = Evaluator::new(
            &config,
            board.size(),
            oracle.clone(),
            tree_policy,
            rollout_policy,
        );
        let tree = Tree::new(board, komi, &[], config.capacity);
        Search {
            config,
            oracle,
            evaluator: Arc::new(evaluator),
            tree: Arc::new(tree),
            pondering: None,
            searches: 0,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    fn next_seed(&mut self) -> u64 {
        self.searches += 1;
        self.config
            .seed
            .wrapping_add(self.searches.wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }

    /// Run up to `playouts` simulations, for at most `time`. Returns the
    /// number of simulations performed.
    pub fn run(&mut self, playouts: usize, time: Option<Duration>) -> usize {
        self.stop_pondering();
        let started = Instant::now();
        let deadline = time.map(|t| started + t);
        let stop = AtomicBool::new(false);
        let seed = self.next_seed();
        let done = run_workers(
            &self.tree,
            &self.evaluator,
            &self.config,
            playouts,
            deadline,
            &stop,
            seed,
        );
        self.report(done, started.elapsed());
        done
    }

    fn report(&self, playouts: usize, elapsed: Duration) {
        let mut children = self.tree.children();
        children.sort_by(|a, b| b.visits.cmp(&a.visits));
        let best: Vec<String> = children
            .iter()
            .take(3)
            .map(|c| {
                format!(
                    "{}({} {:.1}%)",
                    self.tree.board().vertex(c.mv),
                    c.visits,
                    c.winrate * 100.0
                )
            })
            .collect();
        log::info!(
            "{playouts} playouts in {:.2}s, {} nodes, winrate {:.1}%, best {}",
            elapsed.as_secs_f64(),
            self.tree.node_count(),
            self.tree.winrate() * 100.0,
            best.join(" ")
        );
        self.tree.dump_children();
    }

    /// Best move of the current tree, or resignation when the best move
    /// wins too rarely after enough visits.
    pub fn decide(&self) -> Decision {
        match self.tree.best_child() {
            Some(best)
                if self.tree.root_visits() >= RESIGN_MIN_VISITS
                    && best.winrate < self.config.resign_threshold =>
            {
                Decision::Resign
            }
            Some(best) => Decision::Play(best.mv),
            None => Decision::Play(PASS),
        }
    }

    /// Search and decide.
    pub fn genmove(&mut self, playouts: usize, time: Option<Duration>) -> Decision {
        self.run(playouts, time);
        self.decide()
    }

    /// Re-root at the position after `mv`, keeping its subtree. `board` and
    /// `history` describe the game after the move.
    pub fn advance(&mut self, mv: Pos, board: &Board, history: &[u64]) {
        self.stop_pondering();
        let tree = self
            .tree
            .advance(mv, board.clone(), history, self.config.capacity);
        log::debug!("re-rooted with {} nodes kept", tree.node_count());
        self.tree = Arc::new(tree);
    }

    /// Drop the tree and start over from `board`.
    pub fn reset(&mut self, board: &Board, komi: f32, history: &[u64]) {
        self.stop_pondering();
        if board.size() != self.evaluator.size {
            let evaluator = Evaluator::new(
                &self.config,
                board.size(),
                self.oracle.clone(),
                Arc::clone(&self.evaluator.tree_policy),
                Arc::clone(&self.evaluator.rollout_policy),
            );
            self.evaluator = Arc::new(evaluator);
        }
        self.tree = Arc::new(Tree::new(board.clone(), komi, history, self.config.capacity));
    }

    /// Keep searching the current position in the background until
    /// [`Search::stop_pondering`] or the arena fills up.
    pub fn start_pondering(&mut self) {
        if self.pondering.is_some() {
            return;
        }
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let tree = Arc::clone(&self.tree);
        let evaluator = Arc::clone(&self.evaluator);
        let config = self.config.clone();
        let seed = self.next_seed();
        let handle = thread::spawn(move || {
            run_workers(&tree, &evaluator, &config, usize::MAX, None, &flag, seed)
        });
        self.pondering = Some(Pondering { stop, handle });
        log::debug!("pondering started");
    }

    /// Stop background search; returns the number of simulations it ran.
    pub fn stop_pondering(&mut self) -> usize {
        let Some(pondering) = self.pondering.take() else {
            return 0;
        };
        pondering.stop.store(true, Ordering::Release);
        match pondering.handle.join() {
            Ok(playouts) => {
                log::debug!("pondered {playouts} playouts");
                playouts
            }
            Err(_) => {
                log::warn!("pondering thread panicked");
                0
            }
        }
    }

    pub fn is_pondering(&self) -> bool {
        self.pondering.is_some()
    }
}

impl Drop for Search {
    fn drop(&mut self) {
        self.stop_pondering();
    }
}
