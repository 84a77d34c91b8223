//! Runtime configuration of the search and of the data files it loads.

use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    BATCH_SIZE, BATCH_WAIT_MS, EXPAND_VISITS, MIXING, ORACLE_TIMEOUT_MS, PLAYOUT_LIMIT,
    PUCT_CONSTANT, RESIGN_THRES, TREE_CAPACITY, VIRTUAL_LOSS,
};

/// Parameters of one tree search.
#[derive(Clone, Debug)]
pub struct SearchConfig {
    /// Number of worker threads running simulations
    pub threads: usize,
    /// Maximum number of playouts per search
    pub playout_limit: usize,
    /// Wall-clock budget per search; `None` means playouts only
    pub time_limit: Option<Duration>,
    /// Number of nodes the tree arena can hold
    pub capacity: usize,
    /// Exploration constant of PUCT selection
    pub puct: f32,
    /// Losses added to a node while a thread is descending through it
    pub virtual_loss: u32,
    /// Visits a leaf needs before it is expanded
    pub expand_visits: u32,
    /// Weight of the rollout result against the value network (1.0 = rollouts only)
    pub mixing: f32,
    /// Move cap of one rollout; `None` means three times the board area
    pub rollout_limit: Option<usize>,
    /// Requests the oracle evaluates together
    pub batch_size: usize,
    /// How long the batch collector waits to fill a batch
    pub batch_wait: Duration,
    /// How long a search thread waits for the oracle before using the
    /// tree policy and a rollout instead
    pub oracle_timeout: Duration,
    /// Root winrate below which the engine resigns
    pub resign_threshold: f32,
    /// Stop when the leading move cannot be overtaken
    pub early_stop: bool,
    /// Base seed of the worker random number generators
    pub seed: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            threads: 1,
            playout_limit: PLAYOUT_LIMIT,
            time_limit: None,
            capacity: TREE_CAPACITY,
            puct: PUCT_CONSTANT,
            virtual_loss: VIRTUAL_LOSS,
            expand_visits: EXPAND_VISITS,
            mixing: MIXING,
            rollout_limit: None,
            batch_size: BATCH_SIZE,
            batch_wait: Duration::from_millis(BATCH_WAIT_MS),
            oracle_timeout: Duration::from_millis(ORACLE_TIMEOUT_MS),
            resign_threshold: RESIGN_THRES,
            early_stop: true,
            seed: 0,
        }
    }
}

/// Locations of the pattern and weight files. Missing entries fall back to
/// a seeded random table, empty id tables and zero weights.
#[derive(Clone, Debug, Default)]
pub struct PatternFiles {
    /// Whitespace-separated random numbers for pattern hashing
    pub rands: Option<PathBuf>,
    /// `hash,id` table of 3x3 patterns
    pub x33: Option<PathBuf>,
    /// `hash,id` table of 12-point diamond response patterns
    pub d12: Option<PathBuf>,
    /// `hash,id` table of 12-point diamond non-response patterns
    pub nonres_d12: Option<PathBuf>,
    /// Rollout policy weights
    pub rollout_weights: Option<PathBuf>,
    /// Tree policy weights
    pub tree_weights: Option<PathBuf>,
}
