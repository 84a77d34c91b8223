//! Zobrist hashing of board positions.
//!
//! Every (point, colour) pair owns a random 64-bit key, and the hash of a
//! position is the XOR of the keys of all stones on the board, plus a
//! side-to-move key when White is to play. The key table is generated once
//! from a fixed seed and shared read-only by every board and search thread.

use std::sync::OnceLock;

use crate::board::{Board, Color, Pos};
use crate::constants::MAX_BOARD_MAX;

/// Seed of the key table, fixed so hashes are stable between runs.
const ZOBRIST_SEED: u64 = 0x5EED_0F_B0A2D;

struct ZobristTable {
    stones: [[u64; 2]; MAX_BOARD_MAX],
    side: u64,
}

static TABLE: OnceLock<ZobristTable> = OnceLock::new();

fn make_table() -> ZobristTable {
    let mut rng = fastrand::Rng::with_seed(ZOBRIST_SEED);
    let mut stones = [[0u64; 2]; MAX_BOARD_MAX];
    for keys in stones.iter_mut() {
        keys[0] = rng.u64(1..);
        keys[1] = rng.u64(1..);
    }
    ZobristTable {
        stones,
        side: rng.u64(1..),
    }
}

#[inline]
fn table() -> &'static ZobristTable {
    TABLE.get_or_init(make_table)
}

/// Key of a stone of `color` at `pos`.
#[inline]
pub fn stone_key(pos: Pos, color: Color) -> u64 {
    table().stones[pos][color.index()]
}

/// Key toggled whenever the side to move changes.
#[inline]
pub fn side_key() -> u64 {
    table().side
}

/// Incrementally maintained position hash.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ZobristHash(u64);

impl ZobristHash {
    /// Hash of the empty board with Black to move.
    pub fn new() -> Self {
        ZobristHash(0)
    }

    /// Add or remove a stone (XOR is its own inverse).
    #[inline]
    pub fn toggle(&mut self, pos: Pos, color: Color) {
        self.0 ^= stone_key(pos, color);
    }

    /// Flip the side-to-move bit.
    #[inline]
    pub fn toggle_side(&mut self) {
        self.0 ^= side_key();
    }

    #[inline]
    pub fn current(&self) -> u64 {
        self.0
    }
}

/// Recompute the hash of a board by scanning every point.
pub fn hash_from_scratch(board: &Board) -> u64 {
    let mut hash = ZobristHash::new();
    for pos in board.points() {
        if let Some(color) = board.color_at(pos) {
            hash.toggle(pos, color);
        }
    }
    if board.to_move() == Color::White {
        hash.toggle_side();
    }
    hash.current()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_distinct() {
        let a = stone_key(100, Color::Black);
        let b = stone_key(100, Color::White);
        let c = stone_key(101, Color::Black);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, side_key());
    }

    #[test]
    fn test_toggle_is_involution() {
        let mut h = ZobristHash::new();
        h.toggle(50, Color::White);
        assert_ne!(h.current(), 0);
        h.toggle(50, Color::White);
        assert_eq!(h.current(), 0);
    }

    #[test]
    fn test_table_is_deterministic() {
        let fresh = make_table();
        assert_eq!(fresh.stones[77][1], stone_key(77, Color::White));
        assert_eq!(fresh.side, side_key());
    }
}
