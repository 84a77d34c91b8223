//! Rollout policy and incremental rollout games.
//!
//! The rollout policy is a linear softmax over sparse binary features of
//! each candidate point. The tree policy uses the same machinery with a few
//! more (slower) features, and provides expansion priors when the network
//! is unavailable.
//!
//! [`RolloutGame`] keeps `exp(logit)` for every point and colour together
//! with per-row sums, and after each move recomputes only the points whose
//! features may have changed. With the tree feature set every point is
//! recomputed, since the distance to the last move changes everywhere.

use std::path::Path;
use std::sync::Arc;

use crate::board::{Board, Color, MoveOutcome, Pos};
use crate::constants::{MOVE_DISTANCE_MAX, PASS, PASS_PRIOR, ROLLOUT_RESAMPLE};
use crate::error::{IllegalMove, PatternError};
use crate::features::move_effect;
use crate::nakade::nakade_after_capture;
use crate::pattern::{D12_OFFSETS, PatternTables, X33_OFFSETS, d12_slot, x33_slot};
use crate::score;

/// Which feature set a policy evaluates.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PolicyKind {
    Rollout,
    Tree,
}

/// Offsets of every feature group in the weight vector.
#[derive(Clone, Debug)]
struct Layout {
    response: usize,
    save_atari: usize,
    neighbor: usize,
    nakade: usize,
    response_pattern: usize,
    x33: usize,
    self_atari: Option<usize>,
    distance: Option<usize>,
    nonres_d12: Option<usize>,
    len: usize,
}

impl Layout {
    fn new(tables: &PatternTables, kind: PolicyKind) -> Layout {
        let response = 0;
        let save_atari = response + 1;
        let neighbor = save_atari + 1;
        let nakade = neighbor + X33_OFFSETS.len();
        let response_pattern = nakade + 1;
        let x33 = response_pattern + tables.d12.len();
        let mut len = x33 + tables.x33.len();
        let (self_atari, distance, nonres_d12) = match kind {
            PolicyKind::Rollout => (None, None, None),
            PolicyKind::Tree => {
                let self_atari = len;
                let distance = self_atari + 1;
                let nonres_d12 = distance + MOVE_DISTANCE_MAX + 1;
                len = nonres_d12 + tables.nonres_d12.len();
                (Some(self_atari), Some(distance), Some(nonres_d12))
            }
        };
        Layout {
            response,
            save_atari,
            neighbor,
            nakade,
            response_pattern,
            x33,
            self_atari,
            distance,
            nonres_d12,
            len,
        }
    }
}

/// Parse a whitespace-separated list of weights.
pub fn parse_weights(text: &str, path: &Path, expected: usize) -> Result<Vec<f32>, PatternError> {
    let mut weights = Vec::with_capacity(expected);
    for (lineno, line) in text.lines().enumerate() {
        for token in line.split_whitespace() {
            let w = token.parse::<f32>().map_err(|_| PatternError::Malformed {
                path: path.to_path_buf(),
                line: lineno + 1,
                reason: format!("bad weight `{token}`"),
            })?;
            weights.push(w);
        }
    }
    if weights.len() != expected {
        return Err(PatternError::Malformed {
            path: path.to_path_buf(),
            line: text.lines().count(),
            reason: format!("expected {expected} weights, found {}", weights.len()),
        });
    }
    Ok(weights)
}

/// A linear softmax move policy over pattern features.
#[derive(Clone, Debug)]
pub struct RolloutPolicy {
    kind: PolicyKind,
    tables: Arc<PatternTables>,
    layout: Layout,
    weights: Vec<f32>,
}

impl RolloutPolicy {
    /// A policy with all weights zero: uniform over candidate points.
    pub fn zeros(tables: Arc<PatternTables>, kind: PolicyKind) -> RolloutPolicy {
        let layout = Layout::new(&tables, kind);
        let weights = vec![0.0; layout.len];
        RolloutPolicy {
            kind,
            tables,
            layout,
            weights,
        }
    }

    pub fn with_weights(
        tables: Arc<PatternTables>,
        kind: PolicyKind,
        weights: Vec<f32>,
    ) -> Result<RolloutPolicy, PatternError> {
        let mut policy = RolloutPolicy::zeros(tables, kind);
        if weights.len() != policy.layout.len {
            return Err(PatternError::Malformed {
                path: "<weights>".into(),
                line: 0,
                reason: format!(
                    "expected {} weights, found {}",
                    policy.layout.len,
                    weights.len()
                ),
            });
        }
        policy.weights = weights;
        Ok(policy)
    }

    /// Load weights from `path`, or zeros when no path is given.
    pub fn load(
        tables: Arc<PatternTables>,
        kind: PolicyKind,
        path: Option<&Path>,
    ) -> Result<RolloutPolicy, PatternError> {
        let mut policy = RolloutPolicy::zeros(tables, kind);
        if let Some(path) = path {
            let text = std::fs::read_to_string(path).map_err(|source| PatternError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            policy.weights = parse_weights(&text, path, policy.layout.len)?;
            log::info!(
                "{:?} policy: {} weights from {}",
                kind,
                policy.weights.len(),
                path.display()
            );
        }
        Ok(policy)
    }

    #[inline]
    pub fn kind(&self) -> PolicyKind {
        self.kind
    }

    #[inline]
    pub fn tables(&self) -> &Arc<PatternTables> {
        &self.tables
    }

    /// Number of weights the policy expects.
    #[inline]
    pub fn num_weights(&self) -> usize {
        self.layout.len
    }

    /// Indices of the features active for `color` at the empty point `pos`.
    pub fn active_features(
        &self,
        board: &Board,
        pos: Pos,
        color: Color,
        nakade: Option<Pos>,
    ) -> Vec<usize> {
        let layout = &self.layout;
        let tables = &self.tables;
        let mut active = Vec::with_capacity(8);

        let last = board.last_move();
        let responding = last != PASS && board.last_color() == Some(color.opposite());
        if responding {
            if let Some(slot) = d12_slot(board, last, pos) {
                active.push(layout.response);
                if let Some(id) = tables.response_id(board, last, slot, color) {
                    active.push(layout.response_pattern + id);
                }
            }
            if let Some(slot) = x33_slot(board, last, pos) {
                active.push(layout.neighbor + slot);
            }
        }

        let effect = move_effect(board, pos, color);
        let saves = board.neighbors4(pos).iter().any(|&n| {
            board
                .string_at(n)
                .is_some_and(|s| s.color() == color && s.libs() == 1)
        });
        if saves && effect.liberties > 1 {
            active.push(layout.save_atari);
        }
        if nakade == Some(pos) {
            active.push(layout.nakade);
        }
        if let Some(id) = tables.x33_id(board, pos, color) {
            active.push(layout.x33 + id);
        }

        if let Some(offset) = layout.self_atari
            && effect.is_self_atari()
        {
            active.push(offset);
        }
        if let Some(offset) = layout.distance
            && last != PASS
        {
            active.push(offset + board.move_distance(last, pos).min(MOVE_DISTANCE_MAX));
        }
        if let Some(offset) = layout.nonres_d12
            && let Some(id) = tables.d12_id(board, pos, color)
        {
            active.push(offset + id);
        }
        active
    }

    /// Linear score of `color` playing at the empty point `pos`.
    pub fn logit(&self, board: &Board, pos: Pos, color: Color, nakade: Option<Pos>) -> f32 {
        self.active_features(board, pos, color, nakade)
            .into_iter()
            .map(|i| self.weights[i])
            .sum()
    }

    /// Softmax over the legal, non-eye-filling moves of the player to move,
    /// as `size * size + 1` priors (the last one is pass).
    pub fn priors(&self, board: &Board) -> Vec<f32> {
        let area = board.size() * board.size();
        let color = board.to_move();
        let nakade = nakade_after_capture(board);
        let mut priors = vec![0.0f32; area + 1];
        let mut logits = Vec::with_capacity(area);
        for pos in board.sensible_moves(color) {
            logits.push((pos, self.logit(board, pos, color, nakade)));
        }
        let max = logits.iter().map(|&(_, l)| l).fold(f32::NEG_INFINITY, f32::max);
        let mut sum = 0.0;
        for &(pos, l) in &logits {
            let e = (l - max).exp();
            priors[board.onboard_index(pos)] = e;
            sum += e;
        }
        if sum > 0.0 {
            let scale = (1.0 - PASS_PRIOR) / sum;
            priors.iter_mut().for_each(|p| *p *= scale);
            priors[area] = PASS_PRIOR;
        } else {
            priors[area] = 1.0;
        }
        priors
    }
}

/// A game being played out by the rollout policy.
///
/// Cloning a `RolloutGame` forks the simulation; the copies share only the
/// read-only policy.
#[derive(Clone)]
pub struct RolloutGame<'a> {
    board: Board,
    policy: &'a RolloutPolicy,
    komi: f32,
    rates: [Vec<f64>; 2],
    row_sums: [Vec<f64>; 2],
    totals: [f64; 2],
    nakade: Option<Pos>,
    /// Points zeroed by `set_illegal`, restored at the next update
    zeroed: Vec<Pos>,
    updated: Vec<Pos>,
    mark: Vec<bool>,
}

impl<'a> RolloutGame<'a> {
    pub fn new(board: Board, policy: &'a RolloutPolicy, komi: f32) -> RolloutGame<'a> {
        let max = board.board_max();
        let size = board.size();
        let nakade = nakade_after_capture(&board);
        let mut game = RolloutGame {
            board,
            policy,
            komi,
            rates: [vec![0.0; max], vec![0.0; max]],
            row_sums: [vec![0.0; size], vec![0.0; size]],
            totals: [0.0; 2],
            nakade,
            zeroed: Vec::new(),
            updated: Vec::new(),
            mark: vec![false; max],
        };
        let points: Vec<Pos> = game.board.points().collect();
        for &p in &points {
            game.refresh_point(p);
        }
        game.refresh_rows(&points);
        game.updated = points;
        game
    }

    #[inline]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[inline]
    pub fn komi(&self) -> f32 {
        self.komi
    }

    /// Points whose rates were recomputed by the last update.
    #[inline]
    pub fn updated(&self) -> &[Pos] {
        &self.updated
    }

    /// Current `exp(logit)` of `color` at `pos` (0 for occupied points).
    #[inline]
    pub fn rate(&self, pos: Pos, color: Color) -> f64 {
        self.rates[color.index()][pos]
    }

    /// Sum of all rates of `color`.
    #[inline]
    pub fn total(&self, color: Color) -> f64 {
        self.totals[color.index()]
    }

    fn refresh_point(&mut self, pos: Pos) {
        for color in [Color::Black, Color::White] {
            let rate = if self.board.is_empty(pos) {
                (self.policy.logit(&self.board, pos, color, self.nakade) as f64).exp()
            } else {
                0.0
            };
            self.rates[color.index()][pos] = rate;
        }
    }

    /// Recompute the sums of every row touched by `points`, then the totals.
    fn refresh_rows(&mut self, points: &[Pos]) {
        let size = self.board.size();
        let mut rows = vec![false; size];
        for &p in points {
            rows[self.board.xy(p).1] = true;
        }
        for c in 0..2 {
            for (y, _) in rows.iter().enumerate().filter(|(_, r)| **r) {
                self.row_sums[c][y] = (0..size)
                    .map(|x| self.rates[c][self.board.point(x, y)])
                    .sum();
            }
            self.totals[c] = self.row_sums[c].iter().sum();
        }
    }

    fn mark_dirty(&mut self, pos: Pos, dirty: &mut Vec<Pos>) {
        if self.board.is_on_board(pos) && !self.mark[pos] {
            self.mark[pos] = true;
            dirty.push(pos);
        }
    }

    fn mark_x33(&mut self, center: Pos, dirty: &mut Vec<Pos>) {
        self.mark_dirty(center, dirty);
        for (dx, dy) in X33_OFFSETS {
            let p = self.board.offset(center, dx, dy);
            self.mark_dirty(p, dirty);
        }
    }

    fn mark_d12(&mut self, center: Pos, dirty: &mut Vec<Pos>) {
        self.mark_dirty(center, dirty);
        for (dx, dy) in D12_OFFSETS {
            let p = self.board.offset(center, dx, dy);
            self.mark_dirty(p, dirty);
        }
    }

    /// Play a move and update the rates of every point it may affect
    /// (every point for a tree policy).
    pub fn play(&mut self, pos: Pos, color: Color) -> Result<MoveOutcome, IllegalMove> {
        let prev_last = self.board.last_move();
        let outcome = self.board.play(pos, color)?;
        let old_nakade = self.nakade;
        self.nakade = nakade_after_capture(&self.board);

        let mut dirty = Vec::with_capacity(64);
        if self.policy.kind() == PolicyKind::Tree {
            // Move distance and the wider d12 patterns reach past the
            // neighbourhoods tracked below
            let points: Vec<Pos> = self.board.points().collect();
            for p in points {
                self.mark_dirty(p, &mut dirty);
            }
        }
        for p in std::mem::take(&mut self.zeroed) {
            self.mark_dirty(p, &mut dirty);
        }
        if pos != PASS {
            self.mark_x33(pos, &mut dirty);
            let mut strings = self.board.neighbor_strings(pos);
            for &s in &outcome.captured {
                self.mark_x33(s, &mut dirty);
                for id in self.board.neighbor_strings(s) {
                    if !strings.contains(&id) {
                        strings.push(id);
                    }
                }
            }
            for id in strings {
                let stones = self
                    .board
                    .string(id)
                    .map(|s| s.stones().to_vec())
                    .unwrap_or_default();
                for stone in stones {
                    self.mark_x33(stone, &mut dirty);
                }
            }
        }
        for last in [prev_last, pos] {
            if last != PASS {
                self.mark_d12(last, &mut dirty);
            }
        }
        for vital in [old_nakade, self.nakade].into_iter().flatten() {
            self.mark_dirty(vital, &mut dirty);
        }

        for &p in &dirty {
            self.mark[p] = false;
            self.refresh_point(p);
        }
        self.refresh_rows(&dirty);
        self.updated = dirty;
        Ok(outcome)
    }

    /// Exclude `pos` for `color` until the next move.
    pub fn set_illegal(&mut self, pos: Pos, color: Color) {
        let c = color.index();
        let old = self.rates[c][pos];
        if old == 0.0 {
            return;
        }
        self.rates[c][pos] = 0.0;
        let y = self.board.xy(pos).1;
        self.row_sums[c][y] = (self.row_sums[c][y] - old).max(0.0);
        self.totals[c] = (self.totals[c] - old).max(0.0);
        self.zeroed.push(pos);
    }

    fn sample(&self, c: usize, mut r: f64) -> Option<Pos> {
        let size = self.board.size();
        let mut fallback = None;
        for y in 0..size {
            let row = self.row_sums[c][y];
            if row <= 0.0 {
                continue;
            }
            if r >= row {
                r -= row;
                continue;
            }
            for x in 0..size {
                let p = self.board.point(x, y);
                let rate = self.rates[c][p];
                if rate <= 0.0 {
                    continue;
                }
                if r < rate {
                    return Some(p);
                }
                r -= rate;
                fallback = Some(p);
            }
            return fallback;
        }
        fallback
    }

    /// Sample a move for `color`. Sampled points that are illegal or fill
    /// an own eye are excluded and sampling is retried; gives up with a
    /// pass after too many attempts.
    pub fn choose_move(&mut self, color: Color, rng: &mut fastrand::Rng) -> Pos {
        let c = color.index();
        for _ in 0..ROLLOUT_RESAMPLE {
            let total = self.totals[c];
            if total <= 0.0 {
                break;
            }
            let Some(pos) = self.sample(c, rng.f64() * total) else {
                break;
            };
            if self.board.is_legal(pos, color) && !self.board.is_true_eye(pos, color) {
                return pos;
            }
            self.set_illegal(pos, color);
        }
        PASS
    }

    /// Play until two passes or `max_moves` moves, and return the result
    /// for Black: `1.0` win, `-1.0` loss, `0.0` jigo.
    pub fn playout(&mut self, rng: &mut fastrand::Rng, max_moves: usize) -> f32 {
        let mut played = 0;
        while self.board.pass_count() < 2 && played < max_moves {
            let color = self.board.to_move();
            let pos = self.choose_move(color, rng);
            if self.play(pos, color).is_err() {
                // choose_move only returns legal points
                let _ = self.play(PASS, color);
            }
            played += 1;
        }
        let margin = score::score(&self.board, self.komi);
        if margin > 0.0 {
            1.0
        } else if margin < 0.0 {
            -1.0
        } else {
            0.0
        }
    }
}
