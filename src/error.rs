//! Error types shared across the engine.

use std::path::PathBuf;

use thiserror::Error;

/// Why a move was rejected by the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IllegalMove {
    /// Point is not empty
    #[error("illegal move: point not empty")]
    Occupied,
    /// Point is outside the playable area
    #[error("illegal move: point off board")]
    OffBoard,
    /// Move retakes a ko immediately
    #[error("illegal move: retakes ko")]
    Ko,
    /// Move repeats an earlier whole-board position
    #[error("illegal move: repeats a previous position")]
    Superko,
    /// Move would leave its own string without liberties
    #[error("illegal move: suicide")]
    Suicide,
}

/// Board size problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SizeError {
    #[error("board size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("unsupported board size {0}")]
    UnsupportedSize(usize),
}

/// Game records outside of the acceptable length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("too few moves in record ({0})")]
    TooFewMoves(usize),
    #[error("too many moves in record ({0})")]
    TooManyMoves(usize),
}

/// Failures while loading pattern or weight files.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}:{line}: {reason}")]
    Malformed {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    #[error("random table has {found} numbers, at least {needed} are required")]
    TooFewRands { found: usize, needed: usize },
}

/// Failures of the external scoring oracle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("oracle did not answer in time")]
    Timeout,
    #[error("oracle queue is closed")]
    Disconnected,
    #[error("oracle returned malformed output: {0}")]
    BadOutput(String),
}
