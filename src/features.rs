//! Input planes of the policy and value networks.
//!
//! The tensor is laid out NCHW (plane-major) over the `size * size` points
//! of the board, seen from the player to move:
//!
//! | planes | feature                                                  |
//! |--------|----------------------------------------------------------|
//! | 0-2    | own stone, opponent stone, empty                         |
//! | 3      | ones                                                     |
//! | 4-11   | turns since the stone was played (0..7+)                 |
//! | 12-19  | liberties of the string (1..8+)                          |
//! | 20-27  | stones captured by playing here (0..7+)                  |
//! | 28-35  | size of the string left in self-atari by playing here    |
//! | 36-43  | liberties of the string after playing here (1..8+)       |
//! | 44     | ladder capture                                           |
//! | 45     | ladder escape                                            |
//! | 46     | sensibleness (legal and not filling an own true eye)     |
//! | 47     | zeros                                                    |

use crate::board::{Board, Color, Pos, Stone};
use crate::constants::POLICY_FEATURES;
use crate::ladder::{is_ladder_capture, is_ladder_escape};

pub const STONE_PLANES: usize = 0;
pub const ONES_PLANE: usize = 3;
pub const TURNS_SINCE_PLANES: usize = 4;
pub const LIBERTY_PLANES: usize = 12;
pub const CAPTURE_PLANES: usize = 20;
pub const SELF_ATARI_PLANES: usize = 28;
pub const LIBERTIES_AFTER_PLANES: usize = 36;
pub const LADDER_CAPTURE_PLANE: usize = 44;
pub const LADDER_ESCAPE_PLANE: usize = 45;
pub const SENSIBLENESS_PLANE: usize = 46;
pub const ZEROS_PLANE: usize = 47;

const ONE_HOT: usize = 8;

/// What a move would do, computed without playing it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MoveEffect {
    /// Opponent stones removed by the move
    pub captured: usize,
    /// Stones in the string containing the new stone
    pub size: usize,
    /// Liberties of the string containing the new stone
    pub liberties: usize,
}

impl MoveEffect {
    /// True if the move leaves its own string in atari.
    pub fn is_self_atari(&self) -> bool {
        self.liberties == 1
    }
}

/// Compute the effect of `color` playing on the empty point `pos` by
/// merging liberty sets of the neighbouring strings.
pub fn move_effect(board: &Board, pos: Pos, color: Color) -> MoveEffect {
    let mut merged = vec![pos];
    let mut captured_strings = Vec::new();
    let mut size = 1;
    let mut captured = 0;

    for id in board.neighbor_strings(pos) {
        let Some(string) = board.string(id) else {
            continue;
        };
        if string.color() == color {
            size += string.size();
            merged.extend_from_slice(string.stones());
        } else if string.libs() == 1 {
            captured += string.size();
            captured_strings.push(id);
        }
    }

    let mut libs: Vec<Pos> = Vec::with_capacity(16);
    for n in board.neighbors4(pos) {
        if board.stone(n) == Stone::Empty {
            libs.push(n);
        }
    }
    for id in board.neighbor_strings(pos) {
        if let Some(string) = board.string(id)
            && string.color() == color
        {
            libs.extend(string.liberties().iter().copied().filter(|&l| l != pos));
        }
    }
    for id in captured_strings {
        let Some(string) = board.string(id) else {
            continue;
        };
        for &s in string.stones() {
            if board.neighbors4(s).iter().any(|n| merged.contains(n)) {
                libs.push(s);
            }
        }
    }
    libs.sort_unstable();
    libs.dedup();

    MoveEffect {
        captured,
        size,
        liberties: libs.len(),
    }
}

/// Build the network input for the player to move.
pub fn extract(board: &Board) -> Vec<f32> {
    let area = board.size() * board.size();
    let mut planes = vec![0.0f32; POLICY_FEATURES * area];
    let to_move = board.to_move();
    let mut set = |plane: usize, index: usize| planes[plane * area + index] = 1.0;

    for pos in board.points() {
        let i = board.onboard_index(pos);
        set(ONES_PLANE, i);
        match board.color_at(pos) {
            Some(c) => {
                set(STONE_PLANES + if c == to_move { 0 } else { 1 }, i);
                let age = board.moves().saturating_sub(board.birth_move(pos) + 1);
                set(TURNS_SINCE_PLANES + age.min(ONE_HOT - 1), i);
                let libs = board.liberties(pos).clamp(1, ONE_HOT);
                set(LIBERTY_PLANES + libs - 1, i);
            }
            None => {
                set(STONE_PLANES + 2, i);
                if !board.is_legal(pos, to_move) {
                    continue;
                }
                let effect = move_effect(board, pos, to_move);
                set(CAPTURE_PLANES + effect.captured.min(ONE_HOT - 1), i);
                if effect.is_self_atari() {
                    set(SELF_ATARI_PLANES + effect.size.min(ONE_HOT) - 1, i);
                }
                set(
                    LIBERTIES_AFTER_PLANES + effect.liberties.clamp(1, ONE_HOT) - 1,
                    i,
                );
                if chases_two_liberty_string(board, pos, to_move)
                    && is_ladder_capture(board, pos, to_move)
                {
                    set(LADDER_CAPTURE_PLANE, i);
                }
                if is_ladder_escape(board, pos, to_move) {
                    set(LADDER_ESCAPE_PLANE, i);
                }
                if !board.is_true_eye(pos, to_move) {
                    set(SENSIBLENESS_PLANE, i);
                }
            }
        }
    }
    planes
}

fn chases_two_liberty_string(board: &Board, pos: Pos, color: Color) -> bool {
    board.neighbors4(pos).iter().any(|&n| {
        board
            .string_at(n)
            .is_some_and(|s| s.color() != color && s.libs() == 2)
    })
}

/// Value of one plane at a point, for inspection and tests.
pub fn plane_value(planes: &[f32], board: &Board, plane: usize, pos: Pos) -> f32 {
    let area = board.size() * board.size();
    planes[plane * area + board.onboard_index(pos)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stone_color() {
        let mut board = Board::new(9).unwrap();
        let b = board.point(2, 2);
        board.play(b, Color::Black).unwrap();
        let planes = extract(&board);
        // White to move: the black stone is an opponent stone
        assert_eq!(plane_value(&planes, &board, STONE_PLANES + 1, b), 1.0);
        assert_eq!(plane_value(&planes, &board, STONE_PLANES, b), 0.0);
        assert_eq!(plane_value(&planes, &board, STONE_PLANES + 2, board.point(0, 0)), 1.0);
        assert_eq!(planes.len(), POLICY_FEATURES * 81);
    }

    #[test]
    fn test_turns_since() {
        let mut board = Board::new(9).unwrap();
        let first = board.point(1, 1);
        let second = board.point(7, 7);
        board.play(first, Color::Black).unwrap();
        board.play(second, Color::White).unwrap();
        let planes = extract(&board);
        assert_eq!(plane_value(&planes, &board, TURNS_SINCE_PLANES, second), 1.0);
        assert_eq!(plane_value(&planes, &board, TURNS_SINCE_PLANES + 1, first), 1.0);
    }

    #[test]
    fn test_liberties_after_move_dupe_empty() {
        let board = Board::from_ascii(
            ". . . . .
             . X . . .
             . . X . .
             . . . . .
             . . . . .",
        )
        .unwrap();
        // B3 is a liberty of both stones and counts once
        let effect = move_effect(&board, board.point(2, 1), Color::Black);
        assert_eq!(effect.size, 3);
        assert_eq!(effect.liberties, 7);
        assert!(!effect.is_self_atari());
    }

    #[test]
    fn test_liberties_after_move_captured() {
        let board = Board::from_ascii(
            "O X O . .
             . . O . .
             . . . . .
             . . . . .
             . . . . .",
        )
        .unwrap();
        // B4 captures B5, joins the C column and regains the captured point
        let effect = move_effect(&board, board.point(1, 1), Color::White);
        assert_eq!(effect.captured, 1);
        assert_eq!(effect.size, 3);
        assert_eq!(effect.liberties, 6);
    }

    #[test]
    fn test_sensibleness_true_eye() {
        let board = Board::from_ascii(
            ". X . . .
             X X . . .
             . . . . .
             . . . . .
             . . . . .",
        )
        .unwrap();
        let planes = extract(&board);
        assert_eq!(plane_value(&planes, &board, SENSIBLENESS_PLANE, board.point(0, 0)), 0.0);
        assert_eq!(plane_value(&planes, &board, SENSIBLENESS_PLANE, board.point(3, 3)), 1.0);
        assert_eq!(plane_value(&planes, &board, ZEROS_PLANE, board.point(3, 3)), 0.0);
    }
}
