//! The engine context: one game, its search tree, clocks and policies.
//!
//! A protocol front end owns an [`Engine`] and translates its commands into
//! these calls; nothing here is global.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;

use crate::board::{Color, MoveOutcome, Pos};
use crate::config::{PatternFiles, SearchConfig};
use crate::constants::{OWNERSHIP_PLAYOUTS, PASS};
use crate::error::{IllegalMove, SizeError};
use crate::game::GameState;
use crate::mcts::{Decision, Search};
use crate::oracle::Oracle;
use crate::pattern::PatternTables;
use crate::rollout::{PolicyKind, RolloutPolicy};
use crate::score::{self, Score, StoneStatus};
use crate::time_control::{Canadian, TimeControl};

/// The playing engine: the game, a search over it and both players' clocks.
/// Every GTP command that touches the game goes through here.
pub struct Engine {
    game: GameState,
    search: Search,
    clocks: [TimeControl; 2],
    rollout_policy: Arc<RolloutPolicy>,
    rng: fastrand::Rng,
}

impl Engine {
    pub fn new(
        config: SearchConfig,
        size: usize,
        oracle: Option<Arc<dyn Oracle>>,
        tree_policy: RolloutPolicy,
        rollout_policy: RolloutPolicy,
    ) -> Result<Engine, SizeError> {
        let game = GameState::new(size)?;
        let clock = match config.time_limit {
            Some(t) => TimeControl::ConstTime(t),
            None => TimeControl::ConstPlayout(config.playout_limit),
        };
        let rng = fastrand::Rng::with_seed(config.seed);
        let rollout_policy = Arc::new(rollout_policy);
        let search = Search::new(
            config,
            game.board().clone(),
            game.komi(),
            oracle,
            Arc::new(tree_policy),
            Arc::clone(&rollout_policy),
        );
        Ok(Engine {
            game,
            search,
            clocks: [clock.clone(), clock],
            rollout_policy,
            rng,
        })
    }

    /// Build an engine from pattern and weight files. Missing files fall
    /// back to generated tables and zero weights.
    pub fn load(
        config: SearchConfig,
        size: usize,
        files: &PatternFiles,
        oracle: Option<Arc<dyn Oracle>>,
    ) -> anyhow::Result<Engine> {
        let tables = Arc::new(PatternTables::load(files).context("failed to load pattern tables")?);
        let tree_policy = RolloutPolicy::load(
            Arc::clone(&tables),
            PolicyKind::Tree,
            files.tree_weights.as_deref(),
        )
        .context("failed to load tree policy weights")?;
        let rollout_policy = RolloutPolicy::load(
            tables,
            PolicyKind::Rollout,
            files.rollout_weights.as_deref(),
        )
        .context("failed to load rollout policy weights")?;
        Ok(Engine::new(config, size, oracle, tree_policy, rollout_policy)?)
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn search(&self) -> &Search {
        &self.search
    }

    pub fn clock(&self, color: Color) -> &TimeControl {
        &self.clocks[color.index()]
    }

    fn reset_search(&mut self) {
        self.search
            .reset(self.game.board(), self.game.komi(), self.game.history());
    }

    /// Search for `color`, play the chosen move and return it.
    pub fn genmove(&mut self, color: Color) -> Decision {
        if color != self.game.to_move() {
            // Keep the record alternating
            log::debug!("{} to move, passing for {}", color, color.opposite());
            let _ = self.play(PASS, color.opposite());
        }

        let budget = self.clocks[color.index()].budget(self.search.config().playout_limit);
        let started = Instant::now();
        let decision = self.search.genmove(budget.playouts, budget.time);
        self.clocks[color.index()].record(started.elapsed());

        match decision {
            Decision::Play(pos) => match self.play(pos, color) {
                Ok(_) => decision,
                Err(e) => {
                    log::warn!("search chose {}: {e}, passing", self.game.board().vertex(pos));
                    let _ = self.play(PASS, color);
                    Decision::Play(PASS)
                }
            },
            Decision::Resign => {
                log::info!("{color} resigns");
                decision
            }
        }
    }

    /// Commit a move and re-root the tree at it.
    pub fn play(&mut self, pos: Pos, color: Color) -> Result<MoveOutcome, IllegalMove> {
        let in_turn = color == self.game.to_move();
        let outcome = self.game.play(pos, color)?;
        if in_turn {
            self.search
                .advance(pos, self.game.board(), self.game.history());
        } else {
            self.reset_search();
        }
        Ok(outcome)
    }

    /// Canadian time settings for both players.
    pub fn set_time(&mut self, main: Duration, byoyomi: Duration, stones: u32) {
        let clock = TimeControl::Canadian(Canadian::new(main, byoyomi, stones));
        self.clocks = [clock.clone(), clock];
    }

    /// Time reported left for `color` in its current period.
    pub fn set_time_left(&mut self, color: Color, time: Duration, stones: u32) {
        match &mut self.clocks[color.index()] {
            TimeControl::Canadian(clock) => clock.set_time_left(time, stones),
            _ => log::debug!("ignoring time left without time settings"),
        }
    }

    pub fn set_const_time(&mut self, time: Duration) {
        self.clocks = [TimeControl::ConstTime(time), TimeControl::ConstTime(time)];
    }

    pub fn set_const_playout(&mut self, playouts: usize) {
        self.clocks = [
            TimeControl::ConstPlayout(playouts),
            TimeControl::ConstPlayout(playouts),
        ];
    }

    pub fn set_komi(&mut self, komi: f32) {
        self.game.set_komi(komi);
        self.reset_search();
    }

    pub fn set_size(&mut self, size: usize) -> Result<(), SizeError> {
        self.game.set_size(size)?;
        self.reset_search();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.game.clear();
        self.reset_search();
    }

    /// Place `n` handicap stones at the recommended points of a fresh
    /// board and return them.
    pub fn place_free_handicap(&mut self, n: usize) -> Option<Vec<Pos>> {
        let points = self.game.fixed_handicap(n)?;
        self.set_free_handicap(&points).ok()?;
        Some(points)
    }

    /// Place handicap stones chosen by the opponent.
    pub fn set_free_handicap(&mut self, points: &[Pos]) -> Result<(), IllegalMove> {
        let placed = self.game.place_handicaps(points);
        self.reset_search();
        placed
    }

    fn ownership(&mut self) -> Vec<f32> {
        score::estimate_ownership(
            self.game.board(),
            &self.rollout_policy,
            self.game.komi(),
            OWNERSHIP_PLAYOUTS,
            &mut self.rng,
        )
    }

    /// Score estimate of the current position from rollouts.
    pub fn final_score(&mut self) -> Score {
        let ownership = self.ownership();
        score::final_score(&ownership, self.game.komi())
    }

    /// Stones with the given status, judged from rollouts.
    pub fn final_status_list(&mut self, status: StoneStatus) -> Vec<Pos> {
        let ownership = self.ownership();
        score::status_list(self.game.board(), &ownership, status)
    }

    pub fn start_pondering(&mut self) {
        self.search.start_pondering();
    }

    pub fn stop_pondering(&mut self) -> usize {
        self.search.stop_pondering()
    }

    /// The board with move number, komi and prisoners.
    pub fn showboard(&self) -> String {
        let board = self.game.board();
        format!(
            "{board}move {}, komi {}, {} to play\nprisoners: B {} W {}\n",
            board.moves(),
            self.game.komi(),
            board.to_move(),
            board.prisoners(Color::Black),
            board.prisoners(Color::White),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::UniformOracle;

    fn engine(size: usize) -> Engine {
        let tables = Arc::new(PatternTables::from_seed(3));
        let config = SearchConfig {
            playout_limit: 50,
            mixing: 0.0,
            ..SearchConfig::default()
        };
        Engine::new(
            config,
            size,
            Some(Arc::new(UniformOracle)),
            RolloutPolicy::zeros(Arc::clone(&tables), PolicyKind::Tree),
            RolloutPolicy::zeros(tables, PolicyKind::Rollout),
        )
        .unwrap()
    }

    #[test]
    fn test_genmove_plays_the_move() {
        let mut engine = engine(9);
        let Decision::Play(pos) = engine.genmove(Color::Black) else {
            panic!("resigned on an empty board");
        };
        assert_eq!(engine.game().records().len(), 1);
        assert_eq!(engine.game().records()[0].pos, pos);
        assert_eq!(engine.game().to_move(), Color::White);
        assert_eq!(engine.search().tree().board().to_move(), Color::White);
    }

    #[test]
    fn test_genmove_out_of_turn_passes_first() {
        let mut engine = engine(9);
        engine.genmove(Color::White);
        let records = engine.game().records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].pos, PASS);
        assert_eq!(records[1].color, Color::White);
    }

    #[test]
    fn test_free_handicap() {
        let mut engine = engine(19);
        let points = engine.place_free_handicap(3).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(engine.game().to_move(), Color::White);
        assert!(engine.place_free_handicap(12).is_none());
    }

    #[test]
    fn test_time_settings() {
        let mut engine = engine(9);
        engine.set_time(Duration::from_secs(600), Duration::from_secs(30), 5);
        engine.set_time_left(Color::Black, Duration::from_secs(25), 3);
        match engine.clock(Color::Black) {
            TimeControl::Canadian(clock) => assert_eq!(clock.stones_left(), 3),
            other => panic!("unexpected clock {other:?}"),
        }
        engine.set_const_playout(10);
        assert_eq!(engine.clock(Color::White), &TimeControl::ConstPlayout(10));
    }

    #[test]
    fn test_final_score_is_bounded() {
        let mut engine = engine(5);
        engine.set_komi(0.5);
        let board = engine.game().board().clone();
        for y in 0..5 {
            engine.play(board.point(1, y), Color::Black).unwrap();
            engine.play(board.point(3, y), Color::White).unwrap();
        }
        assert!(engine.showboard().contains("komi 0.5"));
        let score = engine.final_score();
        assert!(score.0.abs() <= 25.5);
        assert!(engine.final_status_list(StoneStatus::Seki).is_empty());
    }
}
