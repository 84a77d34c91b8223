//! Integration tests for bamboo-go
//!
//! Board invariants under random play, game records, and the behaviour of
//! the parallel search with a uniform oracle.

use std::sync::Arc;

use bamboo_go::board::{Board, Color, Pos};
use bamboo_go::config::SearchConfig;
use bamboo_go::constants::PASS;
use bamboo_go::game::GameState;
use bamboo_go::mcts::Search;
use bamboo_go::oracle::{Oracle, UniformOracle};
use bamboo_go::pattern::PatternTables;
use bamboo_go::rollout::{PolicyKind, RolloutPolicy};
use bamboo_go::zobrist::{hash_from_scratch, side_key, stone_key};

// =============================================================================
// Helper functions
// =============================================================================

/// Play a random legal, non eye-filling move for the side to move, or pass.
fn random_move(board: &Board, rng: &mut fastrand::Rng) -> Pos {
    let moves = board.sensible_moves(board.to_move());
    if moves.is_empty() {
        PASS
    } else {
        moves[rng.usize(..moves.len())]
    }
}

fn uniform_search(board: Board, config: SearchConfig) -> Search {
    let tables = Arc::new(PatternTables::from_seed(11));
    let oracle: Arc<dyn Oracle> = Arc::new(UniformOracle);
    Search::new(
        config,
        board,
        6.5,
        Some(oracle),
        Arc::new(RolloutPolicy::zeros(tables.clone(), PolicyKind::Tree)),
        Arc::new(RolloutPolicy::zeros(tables, PolicyKind::Rollout)),
    )
}

// =============================================================================
// Board invariants
// =============================================================================

#[test]
fn test_liberties_match_recount_under_random_play() {
    let mut rng = fastrand::Rng::with_seed(42);
    for size in [9, 13] {
        let mut board = Board::new(size).unwrap();
        for _ in 0..(size * size * 2) {
            let pos = random_move(&board, &mut rng);
            board.play(pos, board.to_move()).unwrap();
            for string in board.strings() {
                assert_eq!(
                    string.libs(),
                    board.recount_liberties(string.origin()),
                    "string at {} after {} moves\n{board}",
                    board.vertex(string.origin()),
                    board.moves()
                );
            }
            if board.pass_count() >= 2 {
                break;
            }
        }
    }
}

#[test]
fn test_hash_matches_scratch_after_random_play() {
    let mut rng = fastrand::Rng::with_seed(7);
    let mut board = Board::new(9).unwrap();
    for _ in 0..150 {
        let pos = random_move(&board, &mut rng);
        board.play(pos, board.to_move()).unwrap();
        assert_eq!(board.hash(), hash_from_scratch(&board));
    }
}

#[test]
fn test_center_move_on_empty_board() {
    let mut board = Board::new(9).unwrap();
    let empty_hash = board.hash();
    let center = board.point(4, 4);
    assert_eq!(board.vertex(center), "E5");

    let outcome = board.play(center, Color::Black).unwrap();
    assert!(outcome.captured.is_empty());
    assert_eq!(board.color_at(center), Some(Color::Black));
    assert_eq!(board.liberties(center), 4);
    assert_ne!(board.hash(), empty_hash);
    assert_eq!(
        board.hash() ^ empty_hash,
        stone_key(center, Color::Black) ^ side_key()
    );
}

#[test]
fn test_suicide_is_rejected() {
    let board = Board::from_ascii(
        ". X . . .
         X X . . .
         . . . . .
         . . . . .
         . . . . .",
    )
    .unwrap();
    assert!(board.is_suicide(board.point(0, 0), Color::White));
    assert!(!board.is_legal(board.point(0, 0), Color::White));
    assert!(board.is_legal(board.point(0, 0), Color::Black));
}

#[test]
fn test_ko_recapture_waits_one_move() {
    let mut board = Board::from_ascii(
        ". X O . .
         X O . O .
         . X O . .
         . . . . .
         . . . . .",
    )
    .unwrap();
    // Black takes at C4; White may not retake at B4 at once
    let outcome = board.play(board.point(2, 1), Color::Black).unwrap();
    assert_eq!(outcome.captured, vec![board.point(1, 1)]);
    assert_eq!(board.ko(), Some(board.point(1, 1)));
    assert!(!board.is_legal(board.point(1, 1), Color::White));

    board.play(board.point(4, 4), Color::White).unwrap();
    board.play(board.point(4, 3), Color::Black).unwrap();
    let retake = board.play(board.point(1, 1), Color::White).unwrap();
    assert_eq!(retake.captured, vec![board.point(2, 1)]);
}

// =============================================================================
// Game records
// =============================================================================

#[test]
fn test_replay_reproduces_board() {
    let mut rng = fastrand::Rng::with_seed(3);
    let mut game = GameState::new(9).unwrap();
    let handicaps = game.fixed_handicap(3).unwrap();
    game.place_handicaps(&handicaps).unwrap();
    for _ in 0..120 {
        let pos = random_move(game.board(), &mut rng);
        if game.play(pos, game.to_move()).is_err() {
            game.play(PASS, game.to_move()).unwrap();
        }
    }
    let replayed = game.replay().unwrap();
    let live = game.board();
    assert_eq!(replayed.hash(), live.hash());
    assert_eq!(replayed.to_move(), live.to_move());
    for pos in live.points() {
        assert_eq!(replayed.stone(pos), live.stone(pos));
    }
}

// =============================================================================
// Search
// =============================================================================

#[test]
fn test_uniform_oracle_spreads_visits_evenly() {
    let config = SearchConfig {
        threads: 1,
        mixing: 0.0,
        early_stop: false,
        ..SearchConfig::default()
    };
    let mut search = uniform_search(Board::new(9).unwrap(), config);
    assert_eq!(search.run(400, None), 400);

    let visits: Vec<u32> = search.tree().children().iter().map(|c| c.visits).collect();
    assert_eq!(visits.len(), 82);
    let max = visits.iter().max().copied().unwrap();
    let min = visits.iter().min().copied().unwrap();
    assert!(max - min <= 1, "visits range {min}..{max}");
}

#[test]
fn test_parallel_search_loses_no_updates() {
    let config = SearchConfig {
        threads: 4,
        mixing: 0.0,
        early_stop: false,
        ..SearchConfig::default()
    };
    let mut search = uniform_search(Board::new(9).unwrap(), config);
    let done = search.run(500, None);
    assert_eq!(done, 500);

    let tree = search.tree();
    assert_eq!(tree.root_visits() as usize, done);
    let child_visits: u32 = tree.children().iter().map(|c| c.visits).sum();
    assert!(child_visits < tree.root_visits());
    assert!(child_visits + 4 >= tree.root_visits());
}

#[test]
fn test_rollout_search_without_oracle() {
    let tables = Arc::new(PatternTables::from_seed(5));
    let config = SearchConfig {
        threads: 2,
        playout_limit: 64,
        ..SearchConfig::default()
    };
    let board = Board::new(7).unwrap();
    let mut search = Search::new(
        config,
        board.clone(),
        6.5,
        None,
        Arc::new(RolloutPolicy::zeros(tables.clone(), PolicyKind::Tree)),
        Arc::new(RolloutPolicy::zeros(tables, PolicyKind::Rollout)),
    );
    search.run(64, None);
    let best = search.tree().best_move();
    assert!(best == PASS || board.is_legal(best, Color::Black));
    let winrate = search.tree().winrate();
    assert!((0.0..=1.0).contains(&winrate));
}
