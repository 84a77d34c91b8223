//! Tactical regression positions: ladders, seki and nakade.
//!
//! Positions are set up either from ASCII diagrams or by placing stones at
//! `(x, y)` points counted from the top-left corner.

use bamboo_go::board::{Board, Color};
use bamboo_go::ladder::{LadderStatus, is_ladder_capture, is_ladder_escape, ladder_status};
use bamboo_go::nakade::{NakadeShape, nakade_after_capture, nakade_shape};
use bamboo_go::seki::{is_seki, seki_points};

// =============================================================================
// Helper functions
// =============================================================================

/// Place stones directly, Black to move afterwards.
fn setpos(size: usize, black: &[(usize, usize)], white: &[(usize, usize)]) -> Board {
    let mut board = Board::new(size).unwrap();
    for &(x, y) in black {
        board.play(board.point(x, y), Color::Black).unwrap();
    }
    for &(x, y) in white {
        board.play(board.point(x, y), Color::White).unwrap();
    }
    board.set_to_move(Color::Black);
    board
}

const LADDER_BLACK: [(usize, usize); 3] = [(1, 6), (2, 7), (3, 7)];

/// Map `(x, y)` through one of the eight board symmetries.
fn transform(t: usize, size: usize, (mut x, mut y): (usize, usize)) -> (usize, usize) {
    if t & 1 != 0 {
        x = size - 1 - x;
    }
    if t & 2 != 0 {
        y = size - 1 - y;
    }
    if t & 4 != 0 {
        std::mem::swap(&mut x, &mut y);
    }
    (x, y)
}

/// The diagram redrawn under symmetry `t`.
fn orient(diagram: &str, t: usize) -> String {
    let rows: Vec<Vec<char>> = diagram
        .lines()
        .map(|line| line.chars().filter(|c| !c.is_whitespace()).collect())
        .filter(|row: &Vec<char>| !row.is_empty())
        .collect();
    let size = rows.len();
    let mut out = vec![vec!['.'; size]; size];
    for (y, row) in rows.iter().enumerate() {
        for (x, &c) in row.iter().enumerate() {
            let (tx, ty) = transform(t, size, (x, y));
            out[ty][tx] = c;
        }
    }
    out.iter()
        .map(|row| row.iter().map(char::to_string).collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Check `is_seki` at each listed point in all eight orientations.
fn assert_seki_everywhere(diagram: &str, expected: &[((usize, usize), bool)]) {
    for t in 0..8 {
        let board = Board::from_ascii(&orient(diagram, t)).unwrap();
        let size = board.size();
        for &(at, seki) in expected {
            let (x, y) = transform(t, size, at);
            assert_eq!(
                is_seki(&board, board.point(x, y)),
                seki,
                "orientation {t}, point {at:?}"
            );
        }
    }
}

// =============================================================================
// Ladders
// =============================================================================

#[test]
fn test_ladder_without_breaker_is_captured() {
    let board = setpos(9, &LADDER_BLACK, &[(2, 6)]);
    let target = board.point(2, 6);
    assert_eq!(board.liberties(target), 2);
    assert_eq!(ladder_status(&board, target), LadderStatus::Captured);
    assert!(is_ladder_capture(&board, board.point(2, 5), Color::Black));
}

#[test]
fn test_ladder_with_breaker_is_safe() {
    let board = setpos(9, &LADDER_BLACK, &[(2, 6), (6, 2)]);
    let target = board.point(2, 6);
    assert_eq!(ladder_status(&board, target), LadderStatus::Safe);
    assert!(!is_ladder_capture(&board, board.point(2, 5), Color::Black));
}

#[test]
fn test_ladder_escape_needs_breaker() {
    let mut black = LADDER_BLACK.to_vec();
    black.push((2, 5));

    let caught = setpos(9, &black, &[(2, 6)]);
    let target = caught.point(2, 6);
    assert_eq!(caught.liberties(target), 1);
    assert_eq!(ladder_status(&caught, target), LadderStatus::Captured);
    assert!(!is_ladder_escape(&caught, caught.point(3, 6), Color::White));

    let broken = setpos(9, &black, &[(2, 6), (6, 2)]);
    assert_eq!(ladder_status(&broken, target), LadderStatus::Escaped);
    assert!(is_ladder_escape(&broken, broken.point(3, 6), Color::White));
}

#[test]
fn test_ladder_escape_by_capture() {
    // Black's B3 stone is in atari at B2, so White escapes by taking it
    let board = setpos(
        9,
        &[(1, 6), (2, 7), (3, 7), (2, 5)],
        &[(2, 6), (0, 6), (1, 5)],
    );
    let target = board.point(2, 6);
    assert_eq!(board.liberties(board.point(1, 6)), 1);
    assert_eq!(ladder_status(&board, target), LadderStatus::Escaped);
}

#[test]
fn test_ladder_multi_stone_target() {
    let black = [(1, 6), (1, 7), (2, 8), (3, 7)];
    let white = [(2, 6), (2, 7)];

    let caught = setpos(9, &black, &white);
    let target = caught.point(2, 6);
    assert_eq!(caught.string_at(target).unwrap().size(), 2);
    assert_eq!(caught.liberties(target), 2);
    assert_eq!(ladder_status(&caught, target), LadderStatus::Captured);
    assert!(is_ladder_capture(&caught, caught.point(2, 5), Color::Black));

    let mut with_breaker = white.to_vec();
    with_breaker.push((6, 2));
    let broken = setpos(9, &black, &with_breaker);
    assert_eq!(ladder_status(&broken, target), LadderStatus::Safe);
    assert!(!is_ladder_capture(&broken, broken.point(2, 5), Color::Black));
}

#[test]
fn test_ladder_escape_multi_stone_target() {
    let black = [(1, 6), (1, 7), (2, 8), (3, 7), (2, 5)];

    let caught = setpos(9, &black, &[(2, 6), (2, 7)]);
    let target = caught.point(2, 6);
    assert_eq!(caught.liberties(target), 1);
    assert_eq!(ladder_status(&caught, target), LadderStatus::Captured);
    assert!(!is_ladder_escape(&caught, caught.point(3, 6), Color::White));

    let broken = setpos(9, &black, &[(2, 6), (2, 7), (6, 2)]);
    assert_eq!(ladder_status(&broken, target), LadderStatus::Escaped);
    assert!(is_ladder_escape(&broken, broken.point(3, 6), Color::White));
}

#[test]
fn test_ladder_two_escapes() {
    let black = [(3, 3), (2, 4), (3, 5), (5, 3), (6, 4), (5, 5)];

    let open = setpos(9, &black, &[(3, 4), (5, 4), (4, 6), (4, 2)]);
    for (x, y) in [(3, 4), (5, 4)] {
        assert_eq!(ladder_status(&open, open.point(x, y)), LadderStatus::Escaped);
    }
    assert!(is_ladder_escape(&open, open.point(4, 4), Color::White));

    let closed = setpos(9, &black, &[(3, 4), (5, 4), (4, 6)]);
    for (x, y) in [(3, 4), (5, 4)] {
        assert_eq!(ladder_status(&closed, closed.point(x, y)), LadderStatus::Captured);
    }
    assert!(!is_ladder_escape(&closed, closed.point(4, 4), Color::White));
}

#[test]
fn test_ladder_throw_in() {
    let board = Board::from_ascii(
        ". . . . . . .
         . . . . . . .
         . . . . . . .
         . . . . . . .
         X X X X . . .
         O O O X . . .
         . . O X . . .",
    )
    .unwrap();
    let target = board.point(0, 5);
    assert_eq!(board.liberties(target), 2);
    assert_eq!(ladder_status(&board, target), LadderStatus::Captured);
    assert!(is_ladder_capture(&board, board.point(0, 6), Color::Black));
    assert!(is_ladder_capture(&board, board.point(1, 6), Color::Black));
}

#[test]
fn test_ladder_snapback() {
    let mut board = Board::from_ascii(
        ". . . . . . .
         . . . . . . .
         . . . . . . .
         . . . . . . .
         X X X X . . .
         X O O O X . .
         X O . X O . .",
    )
    .unwrap();
    let target = board.point(1, 5);
    assert_eq!(board.liberties(target), 1);
    assert_eq!(ladder_status(&board, target), LadderStatus::Captured);
    assert!(!is_ladder_escape(&board, board.point(2, 6), Color::White));

    // Taking the single stone leaves White in atari at the same point
    board.set_to_move(Color::White);
    let outcome = board.play(board.point(2, 6), Color::White).unwrap();
    assert_eq!(outcome.captured, vec![board.point(3, 6)]);
    assert_eq!(board.liberties(target), 1);
    let outcome = board.play(board.point(3, 6), Color::Black).unwrap();
    assert_eq!(outcome.captured.len(), 5);
}

#[test]
fn test_ladder_two_captures() {
    // The lone Black stone on E2 is short of liberties as well
    let board = Board::from_ascii(
        ". . . . . . .
         . . . . . . .
         . . . . . . .
         . . . . . . .
         X X X X . . .
         X O O O X O .
         X O . X O . .",
    )
    .unwrap();
    assert_eq!(board.liberties(board.point(4, 5)), 1);
    assert_eq!(ladder_status(&board, board.point(1, 5)), LadderStatus::Escaped);
}

// =============================================================================
// Seki
// =============================================================================

#[test]
fn test_seki_bent_four_in_the_corner() {
    let board = Board::from_ascii(
        "X X . O X . .
         . O O O X . .
         O O X X X . .
         X X X . . . .
         . . . . . . .
         . . . . . . .
         . . . . . . .",
    )
    .unwrap();
    assert!(is_seki(&board, board.point(0, 0)));
    assert!(is_seki(&board, board.point(3, 0)));
    assert!(!is_seki(&board, board.point(4, 0)));

    let points = seki_points(&board);
    assert!(points.contains(&board.point(1, 0)));
    assert!(points.contains(&board.point(0, 2)));
    assert!(!points.contains(&board.point(2, 2)));
}

#[test]
fn test_seki_with_one_eye_each() {
    let board = Board::from_ascii(
        ". X . O . O X
         X X X O O O X
         O O O X X X X
         . O O X . X .
         O O O X X X X
         . O . X . . .
         O O O X . . .",
    )
    .unwrap();
    assert!(is_seki(&board, board.point(1, 0)));
    assert!(is_seki(&board, board.point(3, 0)));
    assert!(!is_seki(&board, board.point(0, 2)));
    assert!(!is_seki(&board, board.point(6, 0)));
}

#[test]
fn test_two_eyes_is_not_seki() {
    let board = Board::from_ascii(
        ". X . X O . .
         X X X X O . .
         O O O O O . .
         . . . . . . .
         . . . . . . .
         . . . . . . .
         . . . . . . .",
    )
    .unwrap();
    assert!(!is_seki(&board, board.point(1, 0)));
    assert!(seki_points(&board).is_empty());
}

#[test]
fn test_seki_without_eyes() {
    assert_seki_everywhere(
        "X . O X O . .
         X . O X O . .
         X X X X O . .
         O O O O O . .
         . . . . . . .
         . . . . . . .
         . . . . . . .",
        &[((0, 0), true), ((2, 0), true), ((4, 0), false)],
    );
}

#[test]
fn test_seki_without_eyes_on_the_side() {
    assert_seki_everywhere(
        "O X . O X O . . .
         O X . O X O . . .
         O X X X X O . . .
         O O O O O O . . .
         . . . . . . . . .
         . . . . . . . . .
         . . . . . . . . .
         . . . . . . . . .
         . . . . . . . . .",
        &[((1, 0), true), ((3, 0), true), ((0, 0), false), ((5, 0), false)],
    );
}

#[test]
fn test_seki_shapes_in_every_orientation() {
    assert_seki_everywhere(
        "X X . O X . .
         . O O O X . .
         O O X X X . .
         X X X . . . .
         . . . . . . .
         . . . . . . .
         . . . . . . .",
        &[((0, 0), true), ((3, 0), true), ((4, 0), false)],
    );
    assert_seki_everywhere(
        ". X . O . O X
         X X X O O O X
         O O O X X X X
         . O O X . X .
         O O O X X X X
         . O . X . . .
         O O O X . . .",
        &[((1, 0), true), ((3, 0), true), ((0, 2), false), ((6, 0), false)],
    );
}

#[test]
fn test_eye_against_no_eye_is_not_seki() {
    // Black's eye at E9 wins the race for the shared liberties
    let board = Board::from_ascii(
        "X . O X . X O . .
         X . O X X X O . .
         X X X X O O O . .
         O O O O O . . . .
         . . . . . . . . .
         . . . . . . . . .
         . . . . . . . . .
         . . . . . . . . .
         . . . . . . . . .",
    )
    .unwrap();
    assert_eq!(board.liberties(board.point(0, 0)), 3);
    assert_eq!(board.liberties(board.point(2, 0)), 2);
    assert!(!is_seki(&board, board.point(0, 0)));
    assert!(!is_seki(&board, board.point(2, 0)));
    assert!(seki_points(&board).is_empty());
}

#[test]
fn test_capturing_fill_is_not_seki() {
    // Filling B7 takes the White stone on C7
    let board = Board::from_ascii(
        "X . O X O . .
         X . X X O . .
         X X X X O . .
         O O O O O . .
         . . . . . . .
         . . . . . . .
         . . . . . . .",
    )
    .unwrap();
    assert_eq!(board.liberties(board.point(0, 0)), 2);
    assert_eq!(board.liberties(board.point(2, 0)), 1);
    assert!(!is_seki(&board, board.point(0, 0)));
    assert!(seki_points(&board).is_empty());
}

#[test]
fn test_open_group_is_not_seki() {
    let board = Board::from_ascii(
        "X . O X . . .
         X . O X . . .
         X X X X . . .
         . . . . . . .
         . . . . . . .
         . . . . . . .
         . . . . . . .",
    )
    .unwrap();
    assert!(!is_seki(&board, board.point(0, 0)));
    assert!(!is_seki(&board, board.point(2, 0)));
}

// =============================================================================
// Nakade
// =============================================================================

#[test]
fn test_nakade_shapes_in_every_orientation() {
    let board = Board::new(9).unwrap();
    let bent: [[(usize, usize); 3]; 4] = [
        [(1, 1), (2, 1), (2, 2)],
        [(1, 1), (1, 2), (2, 1)],
        [(1, 2), (2, 2), (2, 1)],
        [(1, 1), (1, 2), (2, 2)],
    ];
    for shape in bent {
        let points: Vec<_> = shape.iter().map(|&(x, y)| board.point(x, y)).collect();
        assert_eq!(nakade_shape(&board, &points), Some(NakadeShape::BentThree));
    }
}

#[test]
fn test_vital_point_after_capturing_pyramid_four() {
    // Taking White's pyramid four at A9 leaves its vital point B8 empty
    let mut board = Board::from_ascii(
        ". O X . . . . . .
         O O O X . . . . .
         X X X . . . . . .
         . . . . . . . . .
         . . . . . . . . .
         . . . . . . . . .
         . . . . . . . . .
         . . . . . . . . .
         . . . . . . . . .",
    )
    .unwrap();
    assert_eq!(board.liberties(board.point(1, 1)), 1);
    assert_eq!(nakade_after_capture(&board), None);

    let outcome = board.play(board.point(0, 0), Color::Black).unwrap();
    assert_eq!(outcome.captured.len(), 4);
    assert_eq!(nakade_after_capture(&board), Some(board.point(1, 1)));
    assert_eq!(board.vertex(board.point(1, 1)), "B8");
}
