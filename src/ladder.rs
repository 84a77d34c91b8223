//! Ladder reading.
//!
//! A ladder is a sequence of ataris where the defender can only extend into
//! its last liberty and is left with two liberties each time. The reader
//! plays the sequence out on board copies: the attacker tries both
//! liberties, the defender tries capturing an adjacent string in atari and
//! extending. Reading stops after [`LADDER_DEPTH`] plies.
//!
//! [`ladder_status`] has no separate "breaker needed" result. A string in
//! atari that cannot run, and a string with two liberties that the attacker
//! can ladder, are both [`LadderStatus::Captured`]: only a ladder breaker
//! placed beforehand would save either of them.

use crate::board::{Board, Color, Pos};
use crate::constants::LADDER_DEPTH;

/// Result of reading a ladder against a string.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LadderStatus {
    /// The string is lost to a ladder; a breaker would be needed to save it
    Captured,
    /// The string is in atari but runs out of the ladder
    Escaped,
    /// The string cannot be chased by a ladder
    Safe,
}

/// True if the attacker, to move, captures the string at `target` by a
/// ladder.
fn attacker_captures(board: &Board, target: Pos, depth: usize) -> bool {
    let Some(string) = board.string_at(target) else {
        return true;
    };
    match string.libs() {
        1 => return true,
        2 => {}
        _ => return false,
    }
    if depth > LADDER_DEPTH {
        return false;
    }
    let attacker = string.color().opposite();
    let libs = string.liberties().to_vec();
    for lib in libs {
        let mut next = board.clone();
        if next.play(lib, attacker).is_err() {
            continue;
        }
        match next.string_at(target).map(|s| s.libs()) {
            None => return true,
            Some(1) => {
                if !defender_escapes(&next, target, depth + 1) {
                    return true;
                }
            }
            Some(_) => {}
        }
    }
    false
}

/// True if the string at `target`, in atari with its owner to move, gets
/// out of the ladder.
fn defender_escapes(board: &Board, target: Pos, depth: usize) -> bool {
    let Some(string) = board.string_at(target) else {
        return false;
    };
    if string.libs() > 1 {
        return !attacker_captures(board, target, depth);
    }
    if depth > LADDER_DEPTH {
        return true;
    }
    let defender = string.color();
    let sid = board.string_id(target);

    // Escape by capturing an attacking string in atari
    let mut captures = Vec::new();
    if let Some(id) = sid {
        for other in board.adjacent_strings(id) {
            if let Some(s) = board.string(other)
                && s.color() != defender
                && s.libs() == 1
                && !captures.contains(&s.liberties()[0])
            {
                captures.push(s.liberties()[0]);
            }
        }
    }
    for capture in captures {
        let mut next = board.clone();
        if next.play(capture, defender).is_ok() && !attacker_captures(&next, target, depth + 1) {
            return true;
        }
    }

    // Escape by extending into the last liberty
    let lib = string.liberties()[0];
    let mut next = board.clone();
    if next.play(lib, defender).is_err() {
        return false;
    }
    !attacker_captures(&next, target, depth + 1)
}

/// Ladder status of the string at `pos`.
///
/// A string in atari is read with its owner to move; a string with two
/// liberties is read with the attacker to move.
pub fn ladder_status(board: &Board, pos: Pos) -> LadderStatus {
    let Some(string) = board.string_at(pos) else {
        return LadderStatus::Safe;
    };
    match string.libs() {
        1 => {
            if defender_escapes(board, pos, 0) {
                LadderStatus::Escaped
            } else {
                LadderStatus::Captured
            }
        }
        2 => {
            if attacker_captures(board, pos, 0) {
                LadderStatus::Captured
            } else {
                LadderStatus::Safe
            }
        }
        _ => LadderStatus::Safe,
    }
}

/// True if `color` playing at `pos` puts an opponent string in atari that
/// cannot escape the resulting ladder.
pub fn is_ladder_capture(board: &Board, pos: Pos, color: Color) -> bool {
    let mut next = board.clone();
    if next.play(pos, color).is_err() {
        return false;
    }
    next.neighbor_strings(pos).into_iter().any(|id| {
        next.string(id).is_some_and(|s| {
            s.color() != color && s.libs() == 1 && !defender_escapes(&next, s.origin(), 0)
        })
    })
}

/// True if `color` playing at `pos` saves an own string in atari from a
/// ladder.
pub fn is_ladder_escape(board: &Board, pos: Pos, color: Color) -> bool {
    let in_atari = board.neighbors4(pos).iter().any(|&n| {
        board
            .string_at(n)
            .is_some_and(|s| s.color() == color && s.libs() == 1)
    });
    if !in_atari {
        return false;
    }
    let mut next = board.clone();
    if next.play(pos, color).is_err() {
        return false;
    }
    match next.liberties(pos) {
        0 | 1 => false,
        _ => !attacker_captures(&next, pos, 0),
    }
}
