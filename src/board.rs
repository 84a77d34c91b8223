//! Go board representation with incremental string and liberty tracking.
//!
//! The board is a 1D array with a border of width [`OB_SIZE`] around the
//! playable area. Every stone belongs to exactly one [`GoString`]; each
//! string keeps its stones and a sorted list of its liberties, which are
//! updated in place as stones are added, merged and captured. The Zobrist
//! hash is updated inside the same operations, so board and hash never
//! diverge.
//!
//! There is no undo: searches copy the board (`Clone`) before trying moves.

use std::fmt;

use crate::constants::{MAX_BOARD_SIZE, OB_SIZE, PASS};
use crate::error::{IllegalMove, SizeError};
use crate::zobrist::{self, ZobristHash};

/// A point on the board, represented as an index into the padded 1D array.
pub type Pos = usize;

const NO_STRING: u32 = u32::MAX;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Color {
    Black,
    White,
}

impl Color {
    /// The other player.
    #[inline]
    pub fn opposite(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    /// 0 for Black, 1 for White.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Color::Black => 0,
            Color::White => 1,
        }
    }

    #[inline]
    pub fn stone(self) -> Stone {
        match self {
            Color::Black => Stone::Black,
            Color::White => Stone::White,
        }
    }

    /// Parse a GTP colour (`b`, `black`, `w`, `white`, any case).
    pub fn parse(s: &str) -> Option<Color> {
        match s.to_ascii_lowercase().as_str() {
            "b" | "black" => Some(Color::Black),
            "w" | "white" => Some(Color::White),
            _ => None,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Black => write!(f, "B"),
            Color::White => write!(f, "W"),
        }
    }
}

/// Content of a board cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Stone {
    Empty,
    Black,
    White,
    Border,
}

impl Stone {
    /// Owner of the stone, `None` for empty and border points.
    #[inline]
    pub fn color(self) -> Option<Color> {
        match self {
            Stone::Black => Some(Color::Black),
            Stone::White => Some(Color::White),
            _ => None,
        }
    }
}

/// A maximal group of connected same-colour stones.
#[derive(Clone, Debug)]
pub struct GoString {
    color: Color,
    stones: Vec<Pos>,
    libs: Vec<Pos>,
    origin: Pos,
}

impl GoString {
    fn new(pos: Pos, color: Color) -> Self {
        GoString {
            color,
            stones: vec![pos],
            libs: Vec::with_capacity(4),
            origin: pos,
        }
    }

    #[inline]
    pub fn color(&self) -> Color {
        self.color
    }

    #[inline]
    pub fn stones(&self) -> &[Pos] {
        &self.stones
    }

    /// Liberties in ascending order.
    #[inline]
    pub fn liberties(&self) -> &[Pos] {
        &self.libs
    }

    #[inline]
    pub fn libs(&self) -> usize {
        self.libs.len()
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.stones.len()
    }

    /// Smallest stone index, a stable identifier of the string.
    #[inline]
    pub fn origin(&self) -> Pos {
        self.origin
    }

    #[inline]
    pub fn has_liberty(&self, pos: Pos) -> bool {
        self.libs.binary_search(&pos).is_ok()
    }

    fn add_liberty(&mut self, pos: Pos) {
        if let Err(i) = self.libs.binary_search(&pos) {
            self.libs.insert(i, pos);
        }
    }

    fn remove_liberty(&mut self, pos: Pos) {
        if let Ok(i) = self.libs.binary_search(&pos) {
            self.libs.remove(i);
        }
    }
}

/// Result of a successful move.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MoveOutcome {
    /// Stones removed from the board by this move
    pub captured: Vec<Pos>,
}

/// A Go board.
#[derive(Clone)]
pub struct Board {
    size: usize,
    width: usize,
    stones: Vec<Stone>,
    string_id: Vec<u32>,
    strings: Vec<Option<GoString>>,
    free_ids: Vec<u32>,
    /// Move number at which the stone on each point was placed
    birth_move: Vec<u32>,
    to_move: Color,
    moves: usize,
    ko: Option<Pos>,
    last_move: Pos,
    last_color: Option<Color>,
    prev_move: Pos,
    /// Stones captured by Black and by White
    prisoners: [usize; 2],
    captured_last: Vec<Pos>,
    pass_count: usize,
    hash: ZobristHash,
}

impl Board {
    /// Create an empty board of the given size with Black to move.
    pub fn new(size: usize) -> Result<Board, SizeError> {
        if !(2..=MAX_BOARD_SIZE).contains(&size) {
            return Err(SizeError::UnsupportedSize(size));
        }
        let width = size + 2 * OB_SIZE;
        let mut stones = vec![Stone::Border; width * width];
        for y in 0..size {
            for x in 0..size {
                stones[(y + OB_SIZE) * width + x + OB_SIZE] = Stone::Empty;
            }
        }
        Ok(Board {
            size,
            width,
            stones,
            string_id: vec![NO_STRING; width * width],
            strings: Vec::with_capacity(size * size),
            free_ids: Vec::new(),
            birth_move: vec![0; width * width],
            to_move: Color::Black,
            moves: 0,
            ko: None,
            last_move: PASS,
            last_color: None,
            prev_move: PASS,
            prisoners: [0; 2],
            captured_last: Vec::new(),
            pass_count: 0,
            hash: ZobristHash::new(),
        })
    }

    /// Build a position from a diagram such as
    ///
    /// ```text
    /// . X O
    /// X O .
    /// . . .
    /// ```
    ///
    /// `X`/`B` are black stones, `O`/`W` white stones, `.`/`+` empty
    /// points; whitespace is ignored. Black is to move.
    pub fn from_ascii(diagram: &str) -> Result<Board, SizeError> {
        let rows: Vec<Vec<char>> = diagram
            .lines()
            .map(|l| l.chars().filter(|c| !c.is_whitespace()).collect::<Vec<_>>())
            .filter(|r| !r.is_empty())
            .collect();
        let size = rows.len();
        let mut board = Board::new(size)?;
        for (y, row) in rows.iter().enumerate() {
            if row.len() != size {
                return Err(SizeError::SizeMismatch {
                    expected: size,
                    actual: row.len(),
                });
            }
            for (x, &c) in row.iter().enumerate() {
                let color = match c {
                    'X' | 'x' | 'B' | 'b' => Color::Black,
                    'O' | 'o' | 'W' | 'w' => Color::White,
                    _ => continue,
                };
                let pos = board.point(x, y);
                board.place_stone(pos, color);
            }
        }
        Ok(board)
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Width of the padded array.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Length of the padded array.
    #[inline]
    pub fn board_max(&self) -> usize {
        self.width * self.width
    }

    #[inline]
    pub fn to_move(&self) -> Color {
        self.to_move
    }

    /// Number of moves (including passes) played so far.
    #[inline]
    pub fn moves(&self) -> usize {
        self.moves
    }

    #[inline]
    pub fn ko(&self) -> Option<Pos> {
        self.ko
    }

    /// Last move played (`PASS` if it was a pass or no move was played).
    #[inline]
    pub fn last_move(&self) -> Pos {
        self.last_move
    }

    #[inline]
    pub fn last_color(&self) -> Option<Color> {
        self.last_color
    }

    #[inline]
    pub fn prev_move(&self) -> Pos {
        self.prev_move
    }

    /// Number of stones `color` has captured.
    #[inline]
    pub fn prisoners(&self, color: Color) -> usize {
        self.prisoners[color.index()]
    }

    /// Stones removed by the last move.
    #[inline]
    pub fn captured_last(&self) -> &[Pos] {
        &self.captured_last
    }

    /// Number of consecutive passes at the end of the game so far.
    #[inline]
    pub fn pass_count(&self) -> usize {
        self.pass_count
    }

    #[inline]
    pub fn hash(&self) -> u64 {
        self.hash.current()
    }

    /// Hash of the stones alone, without the side to move (positional
    /// superko).
    #[inline]
    pub fn position_hash(&self) -> u64 {
        match self.to_move {
            Color::Black => self.hash.current(),
            Color::White => self.hash.current() ^ zobrist::side_key(),
        }
    }

    #[inline]
    pub fn birth_move(&self, pos: Pos) -> usize {
        self.birth_move[pos] as usize
    }

    // -------------------------------------------------------------------------
    // Geometry
    // -------------------------------------------------------------------------

    /// Point at column `x` and row `y`, both 0-based from the top-left.
    #[inline]
    pub fn point(&self, x: usize, y: usize) -> Pos {
        (y + OB_SIZE) * self.width + x + OB_SIZE
    }

    /// 0-based (column, row) of a point, from the top-left.
    #[inline]
    pub fn xy(&self, pos: Pos) -> (usize, usize) {
        (pos % self.width - OB_SIZE, pos / self.width - OB_SIZE)
    }

    /// Index of a point in an unpadded row-major `size * size` array.
    #[inline]
    pub fn onboard_index(&self, pos: Pos) -> usize {
        let (x, y) = self.xy(pos);
        y * self.size + x
    }

    /// Inverse of [`Board::onboard_index`].
    #[inline]
    pub fn from_onboard_index(&self, index: usize) -> Pos {
        self.point(index % self.size, index / self.size)
    }

    /// All playable points in row-major order.
    pub fn points(&self) -> impl Iterator<Item = Pos> + '_ {
        (0..self.size * self.size).map(move |i| self.from_onboard_index(i))
    }

    #[inline]
    pub fn is_on_board(&self, pos: Pos) -> bool {
        pos < self.stones.len() && self.stones[pos] != Stone::Border
    }

    /// The 4 orthogonal neighbours (N, W, E, S) of a point.
    #[inline]
    pub fn neighbors4(&self, pos: Pos) -> [Pos; 4] {
        [pos - self.width, pos - 1, pos + 1, pos + self.width]
    }

    /// The 4 diagonal neighbours (NW, NE, SW, SE) of a point.
    #[inline]
    pub fn diagonals(&self, pos: Pos) -> [Pos; 4] {
        [
            pos - self.width - 1,
            pos - self.width + 1,
            pos + self.width - 1,
            pos + self.width + 1,
        ]
    }

    /// Offset a point by (dx, dy); the border keeps |d| <= OB_SIZE in range.
    #[inline]
    pub fn offset(&self, pos: Pos, dx: isize, dy: isize) -> Pos {
        (pos as isize + dy * self.width as isize + dx) as usize
    }

    /// Move distance `dx + dy + max(dx, dy)` between two points.
    pub fn move_distance(&self, a: Pos, b: Pos) -> usize {
        let (ax, ay) = self.xy(a);
        let (bx, by) = self.xy(b);
        let dx = ax.abs_diff(bx);
        let dy = ay.abs_diff(by);
        dx + dy + dx.max(dy)
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    #[inline]
    pub fn stone(&self, pos: Pos) -> Stone {
        self.stones[pos]
    }

    #[inline]
    pub fn color_at(&self, pos: Pos) -> Option<Color> {
        self.stones[pos].color()
    }

    #[inline]
    pub fn is_empty(&self, pos: Pos) -> bool {
        self.stones[pos] == Stone::Empty
    }

    /// Identifier of the string occupying `pos`.
    #[inline]
    pub fn string_id(&self, pos: Pos) -> Option<usize> {
        match self.string_id[pos] {
            NO_STRING => None,
            id => Some(id as usize),
        }
    }

    /// The string occupying `pos`.
    #[inline]
    pub fn string_at(&self, pos: Pos) -> Option<&GoString> {
        self.string_id(pos).and_then(|id| self.strings[id].as_ref())
    }

    /// The string with the given identifier.
    #[inline]
    pub fn string(&self, id: usize) -> Option<&GoString> {
        self.strings.get(id).and_then(|s| s.as_ref())
    }

    /// All strings currently on the board.
    pub fn strings(&self) -> impl Iterator<Item = &GoString> + '_ {
        self.strings.iter().filter_map(|s| s.as_ref())
    }

    /// Liberty count of the string at `pos` (0 for an empty point).
    #[inline]
    pub fn liberties(&self, pos: Pos) -> usize {
        self.string_at(pos).map_or(0, GoString::libs)
    }

    /// Distinct string ids adjacent to `pos`.
    pub fn neighbor_strings(&self, pos: Pos) -> Vec<usize> {
        let mut ids = Vec::with_capacity(4);
        for n in self.neighbors4(pos) {
            if let Some(id) = self.string_id(n)
                && !ids.contains(&id)
            {
                ids.push(id);
            }
        }
        ids
    }

    /// Distinct opponent string ids adjacent to any stone of a string.
    pub fn adjacent_strings(&self, id: usize) -> Vec<usize> {
        let mut ids = Vec::new();
        let Some(string) = self.string(id) else {
            return ids;
        };
        for &s in string.stones() {
            for n in self.neighbors4(s) {
                if let Some(other) = self.string_id(n)
                    && other != id
                    && !ids.contains(&other)
                {
                    ids.push(other);
                }
            }
        }
        ids
    }

    /// Number of empty orthogonal neighbours.
    pub fn empty_neighbors(&self, pos: Pos) -> usize {
        self.neighbors4(pos)
            .iter()
            .filter(|&&n| self.stones[n] == Stone::Empty)
            .count()
    }

    /// Count liberties of the string at `start` by flood fill, independently
    /// of the incrementally maintained liberty lists.
    pub fn recount_liberties(&self, start: Pos) -> usize {
        let Some(color) = self.color_at(start) else {
            return 0;
        };
        let mut stack = vec![start];
        let mut visited = vec![false; self.stones.len()];
        let mut liberty_visited = vec![false; self.stones.len()];
        let mut libs = 0;

        while let Some(pt) = stack.pop() {
            if visited[pt] {
                continue;
            }
            visited[pt] = true;
            for n in self.neighbors4(pt) {
                match self.stones[n] {
                    Stone::Empty => {
                        if !liberty_visited[n] {
                            liberty_visited[n] = true;
                            libs += 1;
                        }
                    }
                    s if s.color() == Some(color) && !visited[n] => stack.push(n),
                    _ => {}
                }
            }
        }
        libs
    }

    /// Colour of the stones surrounding `pos` on all four sides (borders
    /// ignored), or `None`. May report false eyes.
    pub fn is_eyeish(&self, pos: Pos) -> Option<Color> {
        let mut eyecolor = None;
        for n in self.neighbors4(pos) {
            match self.stones[n] {
                Stone::Border => continue,
                Stone::Empty => return None,
                s => match eyecolor {
                    None => eyecolor = s.color(),
                    Some(c) if Some(c) != s.color() => return None,
                    _ => {}
                },
            }
        }
        eyecolor
    }

    /// True if `pos` is an eye of `color` that cannot be made false:
    /// surrounded by `color`, with at most one opponent diagonal in the
    /// centre and none on the edge.
    pub fn is_true_eye(&self, pos: Pos, color: Color) -> bool {
        if self.stones[pos] != Stone::Empty || self.is_eyeish(pos) != Some(color) {
            return false;
        }
        let mut at_edge = false;
        let mut false_count = 0;
        for d in self.diagonals(pos) {
            match self.stones[d] {
                Stone::Border => at_edge = true,
                s if s.color() == Some(color.opposite()) => false_count += 1,
                _ => {}
            }
        }
        let tolerance = if at_edge { 0 } else { 1 };
        false_count <= tolerance
    }

    /// True if placing `color` on the empty point `pos` would leave the new
    /// string without liberties and capture nothing.
    pub fn is_suicide(&self, pos: Pos, color: Color) -> bool {
        for n in self.neighbors4(pos) {
            match self.stones[n] {
                Stone::Empty => return false,
                Stone::Border => {}
                s if s.color() == Some(color) => {
                    if self.liberties(n) > 1 {
                        return false;
                    }
                }
                _ => {
                    if self.liberties(n) == 1 {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Check whether `color` may play at `pos` (simple ko only).
    pub fn check_legal(&self, pos: Pos, color: Color) -> Result<(), IllegalMove> {
        if pos == PASS {
            return Ok(());
        }
        if !self.is_on_board(pos) {
            return Err(IllegalMove::OffBoard);
        }
        if self.stones[pos] != Stone::Empty {
            return Err(IllegalMove::Occupied);
        }
        if self.ko == Some(pos) && color == self.to_move {
            return Err(IllegalMove::Ko);
        }
        if self.is_suicide(pos, color) {
            return Err(IllegalMove::Suicide);
        }
        Ok(())
    }

    #[inline]
    pub fn is_legal(&self, pos: Pos, color: Color) -> bool {
        self.check_legal(pos, color).is_ok()
    }

    /// Legal moves that do not fill one of `color`'s own true eyes.
    pub fn sensible_moves(&self, color: Color) -> Vec<Pos> {
        self.points()
            .filter(|&p| self.is_legal(p, color) && !self.is_true_eye(p, color))
            .collect()
    }

    // -------------------------------------------------------------------------
    // Moves
    // -------------------------------------------------------------------------

    /// Play a move for `color`, returning the captured stones.
    pub fn play(&mut self, pos: Pos, color: Color) -> Result<MoveOutcome, IllegalMove> {
        if pos == PASS {
            self.pass(color);
            return Ok(MoveOutcome::default());
        }
        self.check_legal(pos, color)?;

        let captured = self.place_stone(pos, color);

        self.ko = None;
        if captured.len() == 1
            && let Some(s) = self.string_at(pos)
            && s.size() == 1
            && s.libs() == 1
        {
            self.ko = Some(captured[0]);
        }
        self.prisoners[color.index()] += captured.len();
        self.captured_last.clone_from(&captured);
        self.pass_count = 0;
        self.finish_move(pos, color);

        Ok(MoveOutcome { captured })
    }

    /// Pass for `color`. Clears the ko.
    pub fn pass(&mut self, color: Color) {
        self.ko = None;
        self.captured_last.clear();
        self.pass_count += 1;
        self.finish_move(PASS, color);
    }

    fn finish_move(&mut self, pos: Pos, color: Color) {
        self.prev_move = self.last_move;
        self.last_move = pos;
        self.last_color = Some(color);
        self.moves += 1;
        self.set_to_move(color.opposite());
    }

    /// Set the side to move, keeping the hash's side bit in sync.
    pub fn set_to_move(&mut self, color: Color) {
        if self.to_move != color {
            self.hash.toggle_side();
            self.to_move = color;
        }
    }

    #[inline]
    fn string_mut(&mut self, id: usize) -> &mut GoString {
        let Some(string) = self.strings[id].as_mut() else {
            panic!("string id {id} does not refer to a live string");
        };
        string
    }

    fn new_string(&mut self, pos: Pos, color: Color) -> usize {
        let string = GoString::new(pos, color);
        let id = match self.free_ids.pop() {
            Some(id) => {
                self.strings[id as usize] = Some(string);
                id as usize
            }
            None => {
                self.strings.push(Some(string));
                self.strings.len() - 1
            }
        };
        self.string_id[pos] = id as u32;
        id
    }

    /// Merge string `other` into string `target`.
    fn merge_strings(&mut self, target: usize, other: usize) {
        let Some(removed) = self.strings[other].take() else {
            panic!("merging dead string {other}");
        };
        for &s in &removed.stones {
            self.string_id[s] = target as u32;
        }
        let string = self.string_mut(target);
        string.stones.extend_from_slice(&removed.stones);
        for &lib in &removed.libs {
            string.add_liberty(lib);
        }
        string.origin = string.origin.min(removed.origin);
        self.free_ids.push(other as u32);
    }

    /// Remove a captured string, giving its points back as liberties.
    fn remove_string(&mut self, id: usize, captured: &mut Vec<Pos>) {
        let Some(removed) = self.strings[id].take() else {
            panic!("removing dead string {id}");
        };
        for &s in &removed.stones {
            self.stones[s] = Stone::Empty;
            self.string_id[s] = NO_STRING;
            self.hash.toggle(s, removed.color);
            captured.push(s);
        }
        for &s in &removed.stones {
            for n in self.neighbors4(s) {
                if let Some(nid) = self.string_id(n) {
                    self.string_mut(nid).add_liberty(s);
                }
            }
        }
        self.free_ids.push(id as u32);
    }

    /// Put a stone on an empty point without legality checks, merging and
    /// capturing as needed. Returns the captured stones.
    fn place_stone(&mut self, pos: Pos, color: Color) -> Vec<Pos> {
        debug_assert_eq!(self.stones[pos], Stone::Empty);

        self.stones[pos] = color.stone();
        self.hash.toggle(pos, color);
        self.birth_move[pos] = self.moves as u32;

        let mut own = Vec::with_capacity(4);
        let mut opponent = Vec::with_capacity(4);
        for id in self.neighbor_strings(pos) {
            let string = self.string_mut(id);
            string.remove_liberty(pos);
            if string.color == color {
                own.push(id);
            } else {
                opponent.push(id);
            }
        }

        let largest = own
            .iter()
            .copied()
            .max_by_key(|&id| self.strings[id].as_ref().map_or(0, GoString::size));
        let id = match largest {
            None => self.new_string(pos, color),
            Some(target) => {
                for &other in own.iter().filter(|&&o| o != target) {
                    self.merge_strings(target, other);
                }
                self.string_id[pos] = target as u32;
                let string = self.string_mut(target);
                string.stones.push(pos);
                string.origin = string.origin.min(pos);
                target
            }
        };
        for n in self.neighbors4(pos) {
            if self.stones[n] == Stone::Empty {
                self.string_mut(id).add_liberty(n);
            }
        }

        let mut captured = Vec::new();
        for other in opponent {
            if self.strings[other].as_ref().is_some_and(|s| s.libs() == 0) {
                self.remove_string(other, &mut captured);
            }
        }
        captured
    }

    // -------------------------------------------------------------------------
    // Coordinates
    // -------------------------------------------------------------------------

    /// Parse a vertex such as `D4` or `pass`.
    ///
    /// Columns use letters A-T skipping I; rows are numbered from the bottom.
    pub fn parse_vertex(&self, s: &str) -> Option<Pos> {
        if s.eq_ignore_ascii_case("pass") {
            return Some(PASS);
        }
        let bytes = s.as_bytes();
        if bytes.len() < 2 {
            return None;
        }
        let col_char = bytes[0].to_ascii_uppercase();
        if !col_char.is_ascii_uppercase() || col_char == b'I' {
            return None;
        }
        let mut col = (col_char - b'A') as usize;
        if col_char > b'I' {
            col -= 1;
        }
        let row: usize = s[1..].parse().ok()?;
        if col >= self.size || row == 0 || row > self.size {
            return None;
        }
        Some(self.point(col, self.size - row))
    }

    /// Convert a point to a vertex string (`pass` for `PASS`).
    pub fn vertex(&self, pos: Pos) -> String {
        if pos == PASS {
            return "pass".into();
        }
        let (x, y) = self.xy(pos);
        let mut c = b'A' + x as u8;
        if c >= b'I' {
            c += 1;
        }
        format!("{}{}", c as char, self.size - y)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..self.size {
            write!(f, "{:>2} ", self.size - y)?;
            for x in 0..self.size {
                let pos = self.point(x, y);
                let ch = match self.stones[pos] {
                    Stone::Black => 'X',
                    Stone::White => 'O',
                    _ => '.',
                };
                write!(f, "{ch} ")?;
            }
            writeln!(f)?;
        }
        write!(f, "   ")?;
        for x in 0..self.size {
            let mut c = b'A' + x as u8;
            if c >= b'I' {
                c += 1;
            }
            write!(f, "{} ", c as char)?;
        }
        writeln!(f)
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}
