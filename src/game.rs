//! A game in progress: the board plus everything needed to export, replay
//! and judge it.

use crate::board::{Board, Color, MoveOutcome, Pos};
use crate::constants::{KOMI, PASS};
use crate::error::{IllegalMove, RecordError, SizeError};

/// One move of the game record.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub color: Color,
    pub pos: Pos,
}

/// A game in progress: the board with komi, handicap stones, the move
/// record and the position history used for superko.
#[derive(Clone, Debug)]
pub struct GameState {
    board: Board,
    komi: f32,
    handicaps: Vec<Pos>,
    records: Vec<Record>,
    /// Stone-only hashes of every position reached, oldest first
    history: Vec<u64>,
}

impl GameState {
    pub fn new(size: usize) -> Result<GameState, SizeError> {
        let board = Board::new(size)?;
        let history = vec![board.position_hash()];
        Ok(GameState {
            board,
            komi: KOMI,
            handicaps: Vec::new(),
            records: Vec::new(),
            history,
        })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn size(&self) -> usize {
        self.board.size()
    }

    pub fn komi(&self) -> f32 {
        self.komi
    }

    pub fn set_komi(&mut self, komi: f32) {
        self.komi = komi;
    }

    pub fn to_move(&self) -> Color {
        self.board.to_move()
    }

    /// Moves played so far, handicap stones excluded.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn handicaps(&self) -> &[Pos] {
        &self.handicaps
    }

    pub fn history(&self) -> &[u64] {
        &self.history
    }

    /// Both players passed in a row.
    pub fn is_over(&self) -> bool {
        self.board.pass_count() >= 2
    }

    /// Remove every stone and record, keeping size and komi.
    pub fn clear(&mut self) {
        self.reset(self.board.size());
    }

    fn reset(&mut self, size: usize) {
        if let Ok(board) = Board::new(size) {
            self.board = board;
        }
        self.handicaps.clear();
        self.records.clear();
        self.history.clear();
        self.history.push(self.board.position_hash());
    }

    /// Start a new game on a board of another size.
    pub fn set_size(&mut self, size: usize) -> Result<(), SizeError> {
        Board::new(size)?;
        self.reset(size);
        Ok(())
    }

    /// True if `color` playing at `pos` recreates an earlier position.
    pub fn is_superko(&self, pos: Pos, color: Color) -> bool {
        if pos == PASS {
            return false;
        }
        let mut next = self.board.clone();
        next.play(pos, color).is_ok() && self.history.contains(&next.position_hash())
    }

    /// Play a move, enforcing positional superko on top of the board rules.
    pub fn play(&mut self, pos: Pos, color: Color) -> Result<MoveOutcome, IllegalMove> {
        self.board.check_legal(pos, color)?;
        if self.is_superko(pos, color) {
            return Err(IllegalMove::Superko);
        }
        let outcome = self.board.play(pos, color)?;
        self.records.push(Record { color, pos });
        self.history.push(self.board.position_hash());
        Ok(outcome)
    }

    /// Start a new game with black stones on `points`, White to move.
    pub fn place_handicaps(&mut self, points: &[Pos]) -> Result<(), IllegalMove> {
        self.clear();
        let board = setup(self.board.size(), points)?;
        self.board = board;
        self.handicaps = points.to_vec();
        self.history.clear();
        self.history.push(self.board.position_hash());
        Ok(())
    }

    /// Standard placement of `n` handicap stones, if the board allows it.
    pub fn fixed_handicap(&self, n: usize) -> Option<Vec<Pos>> {
        fixed_handicap(&self.board, n)
    }

    /// Re-derive the board from the handicap stones and the move records.
    pub fn replay(&self) -> Result<Board, IllegalMove> {
        let mut board = setup(self.board.size(), &self.handicaps)?;
        for record in &self.records {
            board.play(record.pos, record.color)?;
        }
        Ok(board)
    }

    /// Validate the record length for training data.
    pub fn check_length(&self, min: usize, max: usize) -> Result<(), RecordError> {
        let n = self.records.len();
        if n < min {
            Err(RecordError::TooFewMoves(n))
        } else if n > max {
            Err(RecordError::TooManyMoves(n))
        } else {
            Ok(())
        }
    }
}

fn setup(size: usize, handicaps: &[Pos]) -> Result<Board, IllegalMove> {
    let mut board = Board::new(size).map_err(|_| IllegalMove::OffBoard)?;
    if handicaps.is_empty() {
        return Ok(board);
    }
    for &pos in handicaps {
        if pos == PASS {
            return Err(IllegalMove::OffBoard);
        }
        board.play(pos, Color::Black)?;
    }
    board.set_to_move(Color::White);
    Ok(board)
}

/// Handicap points in the conventional order: corners, then sides, then
/// the centre for odd counts.
pub fn fixed_handicap(board: &Board, n: usize) -> Option<Vec<Pos>> {
    let size = board.size();
    if !(2..=9).contains(&n) || size < 7 {
        return None;
    }
    let odd = size % 2 == 1;
    if n > 4 && !odd {
        return None;
    }
    let edge = if size >= 13 { 3 } else { 2 };
    let (lo, hi, mid) = (edge, size - 1 - edge, size / 2);

    // x grows to the right, y downward
    let lower_left = board.point(lo, hi);
    let upper_right = board.point(hi, lo);
    let upper_left = board.point(lo, lo);
    let lower_right = board.point(hi, hi);
    let left = board.point(lo, mid);
    let right = board.point(hi, mid);
    let bottom = board.point(mid, hi);
    let top = board.point(mid, lo);
    let center = board.point(mid, mid);

    let mut points = vec![lower_left, upper_right];
    if n >= 3 {
        points.push(upper_left);
    }
    if n >= 4 {
        points.push(lower_right);
    }
    if n >= 6 {
        points.extend([left, right]);
    }
    if n >= 8 {
        points.extend([bottom, top]);
    }
    if n % 2 == 1 && n >= 5 {
        points.push(center);
    }
    Some(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_handicap_vertices() {
        let game = GameState::new(19).unwrap();
        let board = game.board();
        let vertices: Vec<String> = game
            .fixed_handicap(4)
            .unwrap()
            .into_iter()
            .map(|p| board.vertex(p))
            .collect();
        assert_eq!(vertices, ["D4", "Q16", "D16", "Q4"]);
        assert_eq!(game.fixed_handicap(9).unwrap().len(), 9);
        assert!(game.fixed_handicap(1).is_none());
        assert!(game.fixed_handicap(10).is_none());

        let small = GameState::new(9).unwrap();
        let five: Vec<String> = small
            .fixed_handicap(5)
            .unwrap()
            .into_iter()
            .map(|p| small.board().vertex(p))
            .collect();
        assert_eq!(five, ["C3", "G7", "C7", "G3", "E5"]);
    }

    #[test]
    fn test_handicap_gives_white_the_move() {
        let mut game = GameState::new(9).unwrap();
        let stones = game.fixed_handicap(2).unwrap();
        game.place_handicaps(&stones).unwrap();
        assert_eq!(game.to_move(), Color::White);
        assert_eq!(game.handicaps(), &stones[..]);
        assert!(game.records().is_empty());
        assert_eq!(game.replay().unwrap().hash(), game.board().hash());
    }

    #[test]
    fn test_check_length() {
        let mut game = GameState::new(9).unwrap();
        game.play(game.board().point(4, 4), Color::Black).unwrap();
        game.play(PASS, Color::White).unwrap();
        assert_eq!(game.check_length(1, 10), Ok(()));
        assert_eq!(game.check_length(3, 10), Err(RecordError::TooFewMoves(2)));
        assert_eq!(game.check_length(0, 1), Err(RecordError::TooManyMoves(2)));
    }

    #[test]
    fn test_superko_on_tiny_board() {
        let mut game = GameState::new(2).unwrap();
        let p = |x, y| game.board().point(x, y);
        let (a, b, c, d) = (p(0, 0), p(1, 0), p(0, 1), p(1, 1));

        let moves = [
            (a, Color::Black),
            (d, Color::White),
            (PASS, Color::Black),
            (b, Color::White),
            // captures b and d
            (c, Color::Black),
            (d, Color::White),
            // captures d
            (b, Color::Black),
            // captures a, b and c
            (d, Color::White),
        ];
        for (pos, color) in moves {
            game.play(pos, color).unwrap();
        }
        // Black at a would recreate the position after the second move
        assert!(game.is_superko(a, Color::Black));
        assert_eq!(game.play(a, Color::Black), Err(IllegalMove::Superko));
        assert_eq!(game.records().len(), 8);
    }

    #[test]
    fn test_clear_keeps_komi() {
        let mut game = GameState::new(9).unwrap();
        game.set_komi(0.5);
        game.play(game.board().point(2, 2), Color::Black).unwrap();
        game.clear();
        assert_eq!(game.komi(), 0.5);
        assert!(game.records().is_empty());
        assert_eq!(game.history().len(), 1);
    }
}
