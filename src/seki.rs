//! Seki detection.
//!
//! A string is judged to be in seki when it cannot make two eyes, every
//! liberty that is not its own eye is self-atari for whichever side fills
//! it, and every opponent string sharing its liberties depends on those
//! same liberties (or on its own eyes).

use crate::board::{Board, Color, GoString, Pos};

fn is_eye_of(board: &Board, pos: Pos, color: Color) -> bool {
    board.is_eyeish(pos) == Some(color)
}

/// True if `color` playing at `pos` either is illegal or leaves the played
/// string with at most one liberty without capturing anything.
fn is_bad_fill(board: &Board, pos: Pos, color: Color) -> Option<bool> {
    let mut next = board.clone();
    match next.play(pos, color) {
        Err(_) => Some(true),
        // Filling a shared liberty that captures is no seki at all
        Ok(outcome) if !outcome.captured.is_empty() => None,
        Ok(_) => Some(next.liberties(pos) <= 1),
    }
}

fn eye_count(board: &Board, string: &GoString) -> usize {
    string
        .liberties()
        .iter()
        .filter(|&&l| is_eye_of(board, l, string.color()))
        .count()
}

/// True if the string at `pos` is in seki.
pub fn is_seki(board: &Board, pos: Pos) -> bool {
    let Some(string) = board.string_at(pos) else {
        return false;
    };
    let Some(id) = board.string_id(pos) else {
        return false;
    };
    let color = string.color();
    if string.libs() < 2 || eye_count(board, string) >= 2 {
        return false;
    }

    for &lib in string.liberties() {
        if is_eye_of(board, lib, color) {
            continue;
        }
        for c in [color, color.opposite()] {
            match is_bad_fill(board, lib, c) {
                Some(true) => {}
                Some(false) | None => return false,
            }
        }
    }

    let mut shared = 0;
    for other in board.adjacent_strings(id) {
        let Some(opponent) = board.string(other) else {
            continue;
        };
        if opponent.color() == color {
            continue;
        }
        let common = opponent
            .liberties()
            .iter()
            .filter(|&&l| string.has_liberty(l))
            .count();
        if common == 0 {
            continue;
        }
        shared += common;
        let depends = opponent
            .liberties()
            .iter()
            .all(|&l| string.has_liberty(l) || is_eye_of(board, l, opponent.color()));
        if !depends {
            return false;
        }
    }
    shared > 0
}

/// All stones belonging to strings in seki.
pub fn seki_points(board: &Board) -> Vec<Pos> {
    let mut points = Vec::new();
    for string in board.strings() {
        if is_seki(board, string.origin()) {
            points.extend_from_slice(string.stones());
        }
    }
    points.sort_unstable();
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_point_is_not_seki() {
        let board = Board::new(9).unwrap();
        assert!(!is_seki(&board, board.point(4, 4)));
        assert!(seki_points(&board).is_empty());
    }

    #[test]
    fn test_lone_stone_is_not_seki() {
        let board = Board::from_ascii(
            ". . . . .
             . . . . .
             . . X . .
             . . . . .
             . . . . .",
        )
        .unwrap();
        assert!(!is_seki(&board, board.point(2, 2)));
    }
}
