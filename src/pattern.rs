//! Local shape patterns for the rollout and tree policies.
//!
//! ## Encoding
//! Every point of a neighbourhood is a 4-bit nibble: two bits of colour
//! relative to the player to move (empty, own, opponent, border) and two
//! bits of liberty class for stones (1, 2, 3 or more).
//!
//! - 3x3 patterns: the 8 neighbours of a point (32 bits).
//! - 12-point diamond (d12): all points within Manhattan distance 2 (48 bits).
//! - Response patterns: the d12 around the previous move, plus the slot of
//!   the candidate move inside that diamond.
//!
//! ## Symmetry
//! A pattern is canonicalised by taking the minimum code over the 8 board
//! symmetries, using permutation tables built once from the slot offsets.
//!
//! ## Hashing
//! Canonical codes are hashed by XOR-ing one random number per
//! (slot, nibble) pair. The hashes index `hash,id` tables loaded from CSV.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::board::{Board, Color, Pos, Stone};
use crate::config::PatternFiles;
use crate::error::PatternError;

/// Offsets of the 3x3 slots, row by row.
pub const X33_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Offsets of the 12-point diamond slots, row by row.
pub const D12_OFFSETS: [(isize, isize); 12] = [
    (0, -2),
    (-1, -1),
    (0, -1),
    (1, -1),
    (-2, 0),
    (-1, 0),
    (1, 0),
    (2, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
    (0, 2),
];

const NIBBLE_VALUES: usize = 16;
const X33_RAND_BASE: usize = 0;
const D12_RAND_BASE: usize = X33_RAND_BASE + X33_OFFSETS.len() * NIBBLE_VALUES;
const RESPONSE_RAND_BASE: usize = D12_RAND_BASE + D12_OFFSETS.len() * NIBBLE_VALUES;

/// Number of random numbers a pattern hash table needs.
pub const PATTERN_RANDS: usize = RESPONSE_RAND_BASE + D12_OFFSETS.len();

/// Bit position of the candidate slot in a response code.
const RESPONSE_SLOT_SHIFT: u32 = 48;

/// Seed of the generated random table when no file is given.
pub const DEFAULT_RAND_SEED: u64 = 0x2545_F491_4F6C_DD1D;

// =============================================================================
// Symmetry tables
// =============================================================================

struct Symmetries {
    x33: [[u8; 8]; 8],
    d12: [[u8; 12]; 8],
}

static SYMMETRIES: OnceLock<Symmetries> = OnceLock::new();

/// Apply symmetry `t` (0..8) to an offset: `t % 4` quarter turns, then a
/// mirror if `t >= 4`.
pub(crate) fn transform(t: usize, (mut x, mut y): (isize, isize)) -> (isize, isize) {
    for _ in 0..t % 4 {
        (x, y) = (-y, x);
    }
    if t >= 4 {
        x = -x;
    }
    (x, y)
}

fn permutation<const N: usize>(offsets: &[(isize, isize); N], t: usize) -> [u8; N] {
    let mut perm = [0u8; N];
    for (i, &off) in offsets.iter().enumerate() {
        let moved = transform(t, off);
        // Offsets are closed under the dihedral group
        let Some(j) = offsets.iter().position(|&o| o == moved) else {
            panic!("offset table not closed under symmetry {t}");
        };
        perm[i] = j as u8;
    }
    perm
}

fn make_symmetries() -> Symmetries {
    let mut x33 = [[0u8; 8]; 8];
    let mut d12 = [[0u8; 12]; 8];
    for t in 0..8 {
        x33[t] = permutation(&X33_OFFSETS, t);
        d12[t] = permutation(&D12_OFFSETS, t);
    }
    Symmetries { x33, d12 }
}

#[inline]
fn symmetries() -> &'static Symmetries {
    SYMMETRIES.get_or_init(make_symmetries)
}

/// Move each nibble `i` of `code` to slot `perm[i]`.
fn permute(code: u64, perm: &[u8]) -> u64 {
    let mut out = 0u64;
    for (i, &j) in perm.iter().enumerate() {
        let nibble = (code >> (4 * i)) & 0xf;
        out |= nibble << (4 * j as usize);
    }
    out
}

/// Canonical form of a 3x3 code.
pub fn canonical_x33(code: u32) -> u32 {
    symmetries()
        .x33
        .iter()
        .map(|perm| permute(code as u64, perm) as u32)
        .min()
        .unwrap_or(code)
}

/// Canonical form of a d12 code.
pub fn canonical_d12(code: u64) -> u64 {
    symmetries()
        .d12
        .iter()
        .map(|perm| permute(code, perm))
        .min()
        .unwrap_or(code)
}

/// Canonical form of a response code: the d12 around the previous move and
/// the candidate slot are transformed together.
pub fn canonical_response(code: u64, slot: usize) -> (u64, usize) {
    symmetries()
        .d12
        .iter()
        .map(|perm| {
            let moved = perm[slot] as usize;
            (permute(code, perm) | ((moved as u64) << RESPONSE_SLOT_SHIFT), moved)
        })
        .min()
        .map(|(c, s)| (c & ((1 << RESPONSE_SLOT_SHIFT) - 1), s))
        .unwrap_or((code, slot))
}

// =============================================================================
// Board encoding
// =============================================================================

/// Encode one point relative to `color`.
#[inline]
pub fn nibble(board: &Board, pos: Pos, color: Color) -> u64 {
    let colour_bits = match board.stone(pos) {
        Stone::Empty => return 0,
        Stone::Border => return 0b1100,
        s if s.color() == Some(color) => 0b01,
        _ => 0b10,
    };
    let lib_class = board.liberties(pos).clamp(1, 3) as u64;
    (colour_bits << 2) | lib_class
}

fn encode(board: &Board, pos: Pos, color: Color, offsets: &[(isize, isize)]) -> u64 {
    let mut code = 0u64;
    for (i, &(dx, dy)) in offsets.iter().enumerate() {
        code |= nibble(board, board.offset(pos, dx, dy), color) << (4 * i);
    }
    code
}

/// Raw (non-canonical) 3x3 code around `pos`.
pub fn x33_code(board: &Board, pos: Pos, color: Color) -> u32 {
    encode(board, pos, color, &X33_OFFSETS) as u32
}

/// Raw (non-canonical) d12 code around `pos`.
pub fn d12_code(board: &Board, pos: Pos, color: Color) -> u64 {
    encode(board, pos, color, &D12_OFFSETS)
}

/// Slot of `pos` in the 12-point diamond centred on `center`.
pub fn d12_slot(board: &Board, center: Pos, pos: Pos) -> Option<usize> {
    D12_OFFSETS
        .iter()
        .position(|&(dx, dy)| board.offset(center, dx, dy) == pos)
}

/// Slot of `pos` among the 8 neighbours of `center`.
pub fn x33_slot(board: &Board, center: Pos, pos: Pos) -> Option<usize> {
    X33_OFFSETS
        .iter()
        .position(|&(dx, dy)| board.offset(center, dx, dy) == pos)
}

// =============================================================================
// Hash tables
// =============================================================================

/// A `hash -> id` table loaded from CSV.
#[derive(Clone, Debug, Default)]
pub struct PatternIds {
    ids: HashMap<u64, usize>,
    len: usize,
}

impl PatternIds {
    /// Parse `hash,id` lines. Blank lines and `#` comments are skipped.
    pub fn parse(text: &str, path: &Path) -> Result<PatternIds, PatternError> {
        let mut ids = HashMap::new();
        let mut len = 0;
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let malformed = |reason: &str| PatternError::Malformed {
                path: path.to_path_buf(),
                line: lineno + 1,
                reason: reason.to_string(),
            };
            let mut fields = line.split(',').map(str::trim);
            let (Some(hash), Some(id), None) = (fields.next(), fields.next(), fields.next()) else {
                return Err(malformed("expected `hash,id`"));
            };
            let hash: u64 = hash.parse().map_err(|_| malformed("bad hash"))?;
            let id: usize = id.parse().map_err(|_| malformed("bad id"))?;
            ids.insert(hash, id);
            len = len.max(id + 1);
        }
        Ok(PatternIds { ids, len })
    }

    pub fn load(path: &Path) -> Result<PatternIds, PatternError> {
        PatternIds::parse(&read(path)?, path)
    }

    #[inline]
    pub fn get(&self, hash: u64) -> Option<usize> {
        self.ids.get(&hash).copied()
    }

    /// One more than the largest id.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

fn read(path: &Path) -> Result<String, PatternError> {
    fs::read_to_string(path).map_err(|source| PatternError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse a whitespace-separated list of random numbers.
pub fn parse_rands(text: &str, path: &Path) -> Result<Vec<u64>, PatternError> {
    let mut rands = Vec::with_capacity(PATTERN_RANDS);
    for (lineno, line) in text.lines().enumerate() {
        for token in line.split_whitespace() {
            let value = token.parse::<u64>().map_err(|_| PatternError::Malformed {
                path: path.to_path_buf(),
                line: lineno + 1,
                reason: format!("bad random number `{token}`"),
            })?;
            rands.push(value);
        }
    }
    if rands.len() < PATTERN_RANDS {
        return Err(PatternError::TooFewRands {
            found: rands.len(),
            needed: PATTERN_RANDS,
        });
    }
    Ok(rands)
}

/// Pattern hashing and id tables, immutable once loaded and shared by all
/// search threads.
#[derive(Clone, Debug)]
pub struct PatternTables {
    rands: Vec<u64>,
    pub x33: PatternIds,
    pub d12: PatternIds,
    pub nonres_d12: PatternIds,
}

impl PatternTables {
    /// Random table generated from `seed`, with empty id tables.
    pub fn from_seed(seed: u64) -> PatternTables {
        let mut rng = fastrand::Rng::with_seed(seed);
        PatternTables {
            rands: (0..PATTERN_RANDS).map(|_| rng.u64(..)).collect(),
            x33: PatternIds::default(),
            d12: PatternIds::default(),
            nonres_d12: PatternIds::default(),
        }
    }

    /// Load every table named in `files`.
    pub fn load(files: &PatternFiles) -> Result<PatternTables, PatternError> {
        let mut tables = match &files.rands {
            Some(path) => PatternTables {
                rands: parse_rands(&read(path)?, path)?,
                ..PatternTables::from_seed(DEFAULT_RAND_SEED)
            },
            None => PatternTables::from_seed(DEFAULT_RAND_SEED),
        };
        let load = |p: &Option<PathBuf>| -> Result<PatternIds, PatternError> {
            p.as_deref().map_or(Ok(PatternIds::default()), PatternIds::load)
        };
        tables.x33 = load(&files.x33)?;
        tables.d12 = load(&files.d12)?;
        tables.nonres_d12 = load(&files.nonres_d12)?;
        log::info!(
            "pattern tables: {} x33, {} d12, {} non-response d12",
            tables.x33.len(),
            tables.d12.len(),
            tables.nonres_d12.len()
        );
        Ok(tables)
    }

    fn hash_code(&self, code: u64, slots: usize, base: usize) -> u64 {
        let mut hash = 0u64;
        for i in 0..slots {
            let nibble = ((code >> (4 * i)) & 0xf) as usize;
            hash ^= self.rands[base + i * NIBBLE_VALUES + nibble];
        }
        hash
    }

    /// Hash of a canonical 3x3 code.
    pub fn x33_hash_from_code(&self, code: u32) -> u64 {
        self.hash_code(canonical_x33(code) as u64, X33_OFFSETS.len(), X33_RAND_BASE)
    }

    /// Hash of the 3x3 pattern around `pos`, seen by `color`.
    pub fn x33_hash(&self, board: &Board, pos: Pos, color: Color) -> u64 {
        self.x33_hash_from_code(x33_code(board, pos, color))
    }

    /// Hash of the d12 pattern around `pos`, seen by `color`.
    pub fn d12_hash(&self, board: &Board, pos: Pos, color: Color) -> u64 {
        let code = canonical_d12(d12_code(board, pos, color));
        self.hash_code(code, D12_OFFSETS.len(), D12_RAND_BASE)
    }

    /// Hash of the response pattern of a candidate in slot `slot` of the d12
    /// around the previous move `last`.
    pub fn response_hash(&self, board: &Board, last: Pos, slot: usize, color: Color) -> u64 {
        let (code, slot) = canonical_response(d12_code(board, last, color), slot);
        self.hash_code(code, D12_OFFSETS.len(), D12_RAND_BASE)
            ^ self.rands[RESPONSE_RAND_BASE + slot]
    }

    pub fn x33_id(&self, board: &Board, pos: Pos, color: Color) -> Option<usize> {
        self.x33.get(self.x33_hash(board, pos, color))
    }

    pub fn d12_id(&self, board: &Board, pos: Pos, color: Color) -> Option<usize> {
        self.nonres_d12.get(self.d12_hash(board, pos, color))
    }

    pub fn response_id(
        &self,
        board: &Board,
        last: Pos,
        slot: usize,
        color: Color,
    ) -> Option<usize> {
        self.d12.get(self.response_hash(board, last, slot, color))
    }
}
