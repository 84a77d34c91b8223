//! Nakade shapes: eye spaces of 3 to 6 points that can be reduced to a
//! single eye by playing on their vital point.

use std::sync::OnceLock;

use crate::board::{Board, Pos};
use crate::pattern::transform;

/// Recognised nakade shapes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NakadeShape {
    StraightThree,
    BentThree,
    PyramidFour,
    CrossedFive,
    BulkyFive,
    RabbitySix,
}

impl NakadeShape {
    /// Number of points in the shape.
    pub fn size(self) -> usize {
        match self {
            NakadeShape::StraightThree | NakadeShape::BentThree => 3,
            NakadeShape::PyramidFour => 4,
            NakadeShape::CrossedFive | NakadeShape::BulkyFive => 5,
            NakadeShape::RabbitySix => 6,
        }
    }
}

const SHAPES: [(NakadeShape, &[(isize, isize)]); 6] = [
    (NakadeShape::StraightThree, &[(0, 0), (1, 0), (2, 0)]),
    (NakadeShape::BentThree, &[(0, 0), (1, 0), (0, 1)]),
    (NakadeShape::PyramidFour, &[(0, 0), (1, 0), (2, 0), (1, 1)]),
    (
        NakadeShape::CrossedFive,
        &[(1, 0), (0, 1), (1, 1), (2, 1), (1, 2)],
    ),
    (
        NakadeShape::BulkyFive,
        &[(0, 0), (1, 0), (0, 1), (1, 1), (2, 1)],
    ),
    (
        NakadeShape::RabbitySix,
        &[(1, 0), (0, 1), (1, 1), (2, 1), (0, 2), (1, 2)],
    ),
];

type ShapeKey = Vec<(isize, isize)>;

static CANONICAL: OnceLock<Vec<(ShapeKey, NakadeShape)>> = OnceLock::new();

/// Smallest translated, sorted image of `points` over the 8 symmetries.
fn canonical(points: &[(isize, isize)]) -> ShapeKey {
    (0..8)
        .map(|t| {
            let mut moved: Vec<_> = points.iter().map(|&p| transform(t, p)).collect();
            let min_x = moved.iter().map(|p| p.0).min().unwrap_or(0);
            let min_y = moved.iter().map(|p| p.1).min().unwrap_or(0);
            for p in moved.iter_mut() {
                *p = (p.0 - min_x, p.1 - min_y);
            }
            moved.sort_unstable();
            moved
        })
        .min()
        .unwrap_or_default()
}

fn shape_table() -> &'static [(ShapeKey, NakadeShape)] {
    CANONICAL.get_or_init(|| {
        SHAPES
            .iter()
            .map(|&(shape, points)| (canonical(points), shape))
            .collect()
    })
}

/// Classify a set of points as a nakade shape.
pub fn nakade_shape(board: &Board, points: &[Pos]) -> Option<NakadeShape> {
    if !(3..=6).contains(&points.len()) {
        return None;
    }
    let coords: Vec<(isize, isize)> = points
        .iter()
        .map(|&p| {
            let (x, y) = board.xy(p);
            (x as isize, y as isize)
        })
        .collect();
    let key = canonical(&coords);
    shape_table()
        .iter()
        .find(|(k, _)| *k == key)
        .map(|&(_, shape)| shape)
}

/// Vital point of a nakade shape: the point with the most neighbours inside
/// the shape.
pub fn vital_point(board: &Board, points: &[Pos]) -> Option<Pos> {
    nakade_shape(board, points)?;
    points.iter().copied().max_by_key(|&p| {
        board
            .neighbors4(p)
            .iter()
            .filter(|n| points.contains(n))
            .count()
    })
}

/// Vital point of the region emptied by the last move's captures, if that
/// region is a nakade shape.
pub fn nakade_after_capture(board: &Board) -> Option<Pos> {
    let captured = board.captured_last();
    vital_point(board, captured).filter(|&p| board.is_empty(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Color;

    fn region(board: &Board, coords: &[(usize, usize)]) -> Vec<Pos> {
        coords.iter().map(|&(x, y)| board.point(x, y)).collect()
    }

    #[test]
    fn test_nakade3() {
        let board = Board::new(9).unwrap();
        let bent = region(&board, &[(4, 4), (4, 5), (5, 5)]);
        assert_eq!(nakade_shape(&board, &bent), Some(NakadeShape::BentThree));
        assert_eq!(vital_point(&board, &bent), Some(board.point(4, 5)));

        let straight = region(&board, &[(2, 6), (2, 7), (2, 8)]);
        assert_eq!(vital_point(&board, &straight), Some(board.point(2, 7)));
    }

    #[test]
    fn test_nakade4() {
        let board = Board::new(9).unwrap();
        let pyramid = region(&board, &[(3, 3), (3, 4), (3, 5), (2, 4)]);
        assert_eq!(nakade_shape(&board, &pyramid), Some(NakadeShape::PyramidFour));
        assert_eq!(vital_point(&board, &pyramid), Some(board.point(3, 4)));

        let square = region(&board, &[(3, 3), (4, 3), (3, 4), (4, 4)]);
        assert_eq!(nakade_shape(&board, &square), None);
        let straight = region(&board, &[(0, 0), (1, 0), (2, 0), (3, 0)]);
        assert_eq!(vital_point(&board, &straight), None);
    }

    #[test]
    fn test_nakade5() {
        let board = Board::new(9).unwrap();
        let bulky = region(&board, &[(6, 6), (7, 6), (6, 7), (7, 7), (7, 8)]);
        assert_eq!(nakade_shape(&board, &bulky), Some(NakadeShape::BulkyFive));
        assert_eq!(vital_point(&board, &bulky), Some(board.point(7, 7)));

        let cross = region(&board, &[(4, 3), (3, 4), (4, 4), (5, 4), (4, 5)]);
        assert_eq!(vital_point(&board, &cross), Some(board.point(4, 4)));
    }

    #[test]
    fn test_nakade6() {
        let board = Board::new(9).unwrap();
        let rabbity = region(&board, &[(1, 0), (0, 1), (1, 1), (2, 1), (1, 2), (2, 2)]);
        assert_eq!(nakade_shape(&board, &rabbity), Some(NakadeShape::RabbitySix));
        assert_eq!(vital_point(&board, &rabbity), Some(board.point(1, 1)));
    }

    #[test]
    fn test_nakade_after_capture() {
        // White's bent three inside Black's corner is captured by A3
        let mut board = Board::from_ascii(
            "O O X . .
             O X X . .
             . X . . .
             X X . . .
             . . . . .",
        )
        .unwrap();
        let outcome = board.play(board.point(0, 2), Color::Black).unwrap();
        assert_eq!(outcome.captured.len(), 3);
        assert_eq!(nakade_after_capture(&board), Some(board.point(0, 0)));
    }
}
