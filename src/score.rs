//! Area scoring, Monte Carlo ownership and final stone status.

use std::fmt;

use crate::board::{Board, Color, Pos, Stone};
use crate::rollout::{RolloutGame, RolloutPolicy};
use crate::seki::is_seki;

/// Owner of every point under area scoring, indexed by
/// [`Board::onboard_index`]: `+1` Black, `-1` White, `0` neutral.
///
/// Empty regions belong to a colour when only that colour borders them.
pub fn owner_map(board: &Board) -> Vec<i8> {
    let area = board.size() * board.size();
    let mut owners = vec![0i8; area];
    let mut visited = vec![false; board.board_max()];
    let mut region = Vec::new();
    let mut stack = Vec::new();

    for pos in board.points() {
        match board.color_at(pos) {
            Some(Color::Black) => owners[board.onboard_index(pos)] = 1,
            Some(Color::White) => owners[board.onboard_index(pos)] = -1,
            None if !visited[pos] => {
                region.clear();
                let mut borders = [false; 2];
                stack.push(pos);
                visited[pos] = true;
                while let Some(p) = stack.pop() {
                    region.push(p);
                    for n in board.neighbors4(p) {
                        match board.stone(n) {
                            Stone::Empty if !visited[n] => {
                                visited[n] = true;
                                stack.push(n);
                            }
                            Stone::Black => borders[0] = true,
                            Stone::White => borders[1] = true,
                            _ => {}
                        }
                    }
                }
                let owner = match borders {
                    [true, false] => 1,
                    [false, true] => -1,
                    _ => 0,
                };
                for &p in &region {
                    owners[board.onboard_index(p)] = owner;
                }
            }
            None => {}
        }
    }
    owners
}

/// Points of Black and White under area scoring.
pub fn area_score(board: &Board) -> (usize, usize) {
    owner_map(board)
        .iter()
        .fold((0, 0), |(b, w), &o| match o {
            1 => (b + 1, w),
            -1 => (b, w + 1),
            _ => (b, w),
        })
}

/// Black's margin under area scoring with komi.
pub fn score(board: &Board, komi: f32) -> f32 {
    let (black, white) = area_score(board);
    black as f32 - white as f32 - komi
}

/// A margin from Black's point of view.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Score(pub f32);

impl fmt::Display for Score {
    /// GTP style: `B+3.5`, `W+0.5` or `0`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 > 0.0 {
            write!(f, "B+{:.1}", self.0)
        } else if self.0 < 0.0 {
            write!(f, "W+{:.1}", -self.0)
        } else {
            write!(f, "0")
        }
    }
}

/// Average owner of every point over `playouts` rollouts, in `[-1, 1]`
/// (positive for Black).
pub fn estimate_ownership(
    board: &Board,
    policy: &RolloutPolicy,
    komi: f32,
    playouts: usize,
    rng: &mut fastrand::Rng,
) -> Vec<f32> {
    let area = board.size() * board.size();
    let mut sums = vec![0.0f32; area];
    let root = RolloutGame::new(board.clone(), policy, komi);
    let max_moves = crate::constants::max_records(board.size());
    for _ in 0..playouts {
        let mut game = root.clone();
        game.playout(rng, max_moves);
        for (sum, owner) in sums.iter_mut().zip(owner_map(game.board())) {
            *sum += owner as f32;
        }
    }
    let n = playouts.max(1) as f32;
    sums.iter_mut().for_each(|s| *s /= n);
    sums
}

/// Status of a stone at the end of the game.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StoneStatus {
    Alive,
    Dead,
    Seki,
}

impl std::str::FromStr for StoneStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<StoneStatus, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "alive" => Ok(StoneStatus::Alive),
            "dead" => Ok(StoneStatus::Dead),
            "seki" => Ok(StoneStatus::Seki),
            _ => Err(()),
        }
    }
}

/// Status of the string at `pos` given an ownership estimate.
pub fn stone_status(board: &Board, ownership: &[f32], pos: Pos) -> Option<StoneStatus> {
    let color = board.color_at(pos)?;
    if is_seki(board, pos) {
        return Some(StoneStatus::Seki);
    }
    let own = ownership[board.onboard_index(pos)];
    let owned_by_opponent = match color {
        Color::Black => own < 0.0,
        Color::White => own > 0.0,
    };
    Some(if owned_by_opponent {
        StoneStatus::Dead
    } else {
        StoneStatus::Alive
    })
}

/// All stones with the given status.
pub fn status_list(board: &Board, ownership: &[f32], status: StoneStatus) -> Vec<Pos> {
    let mut stones = Vec::new();
    for string in board.strings() {
        if stone_status(board, ownership, string.origin()) == Some(status) {
            stones.extend_from_slice(string.stones());
        }
    }
    stones.sort_unstable();
    stones
}

/// Final margin: every point counts for the colour that owns it in most
/// playouts.
pub fn final_score(ownership: &[f32], komi: f32) -> Score {
    let black = ownership.iter().filter(|&&o| o > 0.0).count() as f32;
    let white = ownership.iter().filter(|&&o| o < 0.0).count() as f32;
    Score(black - white - komi)
}
