//! Bamboo-Go: a Go engine core with pattern rollouts and parallel MCTS.
//!
//! The search combines a neural policy/value network, seen as an opaque
//! [`oracle::Oracle`], with a fast linear rollout policy over local shape
//! patterns.
//!
//! ## Modules
//!
//! - [`constants`] - Board geometry and engine parameters
//! - [`config`] - Runtime search configuration and data file locations
//! - [`error`] - Error types
//! - [`board`] - Board with strings, liberties, ko and coordinates
//! - [`zobrist`] - Position hashing
//! - [`pattern`] - 3x3 and 12-point diamond pattern encoding and hashing
//! - [`nakade`] - Nakade shapes and vital points
//! - [`ladder`] - Ladder reading
//! - [`seki`] - Seki detection
//! - [`features`] - Neural network input planes
//! - [`rollout`] - Rollout and tree policies, incremental rollout games
//! - [`score`] - Area scoring and ownership estimation
//! - [`oracle`] - Network oracle and request batching
//! - [`mcts`] - Parallel Monte Carlo Tree Search
//! - [`time_control`] - Thinking-time allotment
//! - [`game`] - Game state, handicap and records
//! - [`engine`] - Engine context tying it all together
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use bamboo_go::board::Color;
//! use bamboo_go::config::SearchConfig;
//! use bamboo_go::engine::Engine;
//! use bamboo_go::mcts::Decision;
//! use bamboo_go::pattern::PatternTables;
//! use bamboo_go::rollout::{PolicyKind, RolloutPolicy};
//!
//! let tables = Arc::new(PatternTables::from_seed(7));
//! let config = SearchConfig {
//!     playout_limit: 20,
//!     ..SearchConfig::default()
//! };
//! let mut engine = Engine::new(
//!     config,
//!     9,
//!     None,
//!     RolloutPolicy::zeros(tables.clone(), PolicyKind::Tree),
//!     RolloutPolicy::zeros(tables, PolicyKind::Rollout),
//! )
//! .unwrap();
//!
//! let d4 = engine.game().board().parse_vertex("D4").unwrap();
//! engine.play(d4, Color::Black).unwrap();
//!
//! if let Decision::Play(pos) = engine.genmove(Color::White) {
//!     println!("White plays {}", engine.game().board().vertex(pos));
//! }
//! ```

pub mod board;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod features;
pub mod game;
pub mod ladder;
pub mod mcts;
pub mod nakade;
pub mod oracle;
pub mod pattern;
pub mod rollout;
pub mod score;
pub mod seki;
pub mod time_control;
pub mod zobrist;
