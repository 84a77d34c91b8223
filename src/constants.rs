//! Constants for board geometry, search parameters, and rollout tuning.
//!
//! The board uses a 1D array representation with a border of width
//! [`OB_SIZE`] on every side, so that neighbourhoods up to Manhattan
//! distance two (the 12-point diamond) never need bounds checks.
//!
//! The board size itself is chosen at runtime (9, 13 or 19 are the usual
//! sizes); only upper bounds are fixed here.

// =============================================================================
// Board Geometry
// =============================================================================

/// Width of the out-of-board border around the playable area.
pub const OB_SIZE: usize = 2;

/// Largest supported board size (NxN).
pub const MAX_BOARD_SIZE: usize = 19;

/// Default board size.
pub const DEFAULT_BOARD_SIZE: usize = 19;

/// Padded width of the largest supported board.
pub const MAX_BOARD_WIDTH: usize = MAX_BOARD_SIZE + 2 * OB_SIZE;

/// Number of array cells of the largest supported padded board.
pub const MAX_BOARD_MAX: usize = MAX_BOARD_WIDTH * MAX_BOARD_WIDTH;

/// Pass move marker (index 0 is border, so safe to use).
pub const PASS: usize = 0;

/// Default komi (compensation points for White).
pub const KOMI: f32 = 6.5;

// =============================================================================
// MCTS (Monte Carlo Tree Search) Parameters
// =============================================================================

/// Default number of playouts per move.
pub const PLAYOUT_LIMIT: usize = 8000;

/// Exploration constant of the PUCT selection formula.
pub const PUCT_CONSTANT: f32 = 5.0;

/// Number of virtual visits (each counted as a loss) added to a node while
/// a thread is descending through it.
pub const VIRTUAL_LOSS: u32 = 3;

/// Visits a leaf needs, counting the current one, before it is expanded.
pub const EXPAND_VISITS: u32 = 1;

/// Mixing weight of rollout outcome vs. value network (1.0 = rollout only).
pub const MIXING: f32 = 0.5;

/// Default number of nodes the tree arena can hold.
pub const TREE_CAPACITY: usize = 1 << 18;

/// Prior probability given to the pass move when the policy omits it.
pub const PASS_PRIOR: f32 = 1e-3;

/// Winrate threshold below which the engine resigns.
pub const RESIGN_THRES: f32 = 0.1;

/// Minimum root visits before resignation is considered.
pub const RESIGN_MIN_VISITS: u32 = 1000;

/// Number of requests evaluated by the oracle in one batch.
pub const BATCH_SIZE: usize = 16;

/// Maximum time (ms) the batch collector waits to fill a batch.
pub const BATCH_WAIT_MS: u64 = 2;

/// Maximum time (ms) a search thread waits for an oracle answer.
pub const ORACLE_TIMEOUT_MS: u64 = 1000;

/// Interval (ms) at which the coordinating thread checks the deadline.
pub const POLL_INTERVAL_MS: u64 = 5;

// =============================================================================
// Rollout Parameters
// =============================================================================

/// Maximum number of records in a game (3 times board area).
pub const fn max_records(size: usize) -> usize {
    size * size * 3
}

/// Upper bound of the move distance feature.
pub const MOVE_DISTANCE_MAX: usize = 15;

/// Maximum number of sampling attempts before a rollout passes.
pub const ROLLOUT_RESAMPLE: usize = 64;

/// Number of playouts used to estimate final ownership.
pub const OWNERSHIP_PLAYOUTS: usize = 200;

// =============================================================================
// Tactical Reading
// =============================================================================

/// Maximum number of plies read in a ladder.
pub const LADDER_DEPTH: usize = 100;

// =============================================================================
// Neural Network Input
// =============================================================================

/// Number of input planes of the policy/value network.
pub const POLICY_FEATURES: usize = 48;
