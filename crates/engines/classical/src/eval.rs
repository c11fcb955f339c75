//! Tapered piece-square evaluation with a shared pawn-structure cache.

use std::sync::atomic::{AtomicU64, Ordering};

use chess_core::{Bitboard, Color, Evaluator, PieceKind, Position, Score};

/// Midgame and endgame material, indexed by `PieceKind::idx()`.
const MG_VALUE: [i32; 6] = [82, 337, 365, 477, 1025, 0];
const EG_VALUE: [i32; 6] = [94, 281, 297, 512, 936, 0];

/// Game phase weight per piece; 24 is a full middlegame.
const PHASE: [i32; 6] = [0, 1, 1, 2, 4, 0];
const MAX_PHASE: i32 = 24;

const TEMPO: i32 = 10;
const BISHOP_PAIR: (i32, i32) = (30, 50);
const DOUBLED_PAWN: (i32, i32) = (-10, -20);
const ISOLATED_PAWN: (i32, i32) = (-15, -10);
/// Passed pawn bonus by relative rank.
const PASSED_PAWN: [(i32, i32); 8] = [
    (0, 0),
    (5, 10),
    (10, 15),
    (15, 25),
    (25, 45),
    (40, 75),
    (60, 110),
    (0, 0),
];

// Piece-square tables are laid out as seen from White: the first row is
// rank 8. White pieces look up `sq ^ 56`, Black pieces `sq`.
#[rustfmt::skip]
const PAWN_MG: [i32; 64] = [
     0,  0,  0,  0,  0,  0,  0,  0,
    50, 50, 50, 50, 50, 50, 50, 50,
    10, 10, 20, 30, 30, 20, 10, 10,
     5,  5, 10, 25, 25, 10,  5,  5,
     0,  0,  0, 20, 20,  0,  0,  0,
     5, -5,-10,  0,  0,-10, -5,  5,
     5, 10, 10,-20,-20, 10, 10,  5,
     0,  0,  0,  0,  0,  0,  0,  0,
];

#[rustfmt::skip]
const PAWN_EG: [i32; 64] = [
     0,  0,  0,  0,  0,  0,  0,  0,
    80, 80, 80, 80, 80, 80, 80, 80,
    50, 50, 50, 50, 50, 50, 50, 50,
    30, 30, 30, 30, 30, 30, 30, 30,
    20, 20, 20, 20, 20, 20, 20, 20,
    10, 10, 10, 10, 10, 10, 10, 10,
     0,  0,  0,  0,  0,  0,  0,  0,
     0,  0,  0,  0,  0,  0,  0,  0,
];

#[rustfmt::skip]
const KNIGHT: [i32; 64] = [
    -50,-40,-30,-30,-30,-30,-40,-50,
    -40,-20,  0,  0,  0,  0,-20,-40,
    -30,  0, 10, 15, 15, 10,  0,-30,
    -30,  5, 15, 20, 20, 15,  5,-30,
    -30,  0, 15, 20, 20, 15,  0,-30,
    -30,  5, 10, 15, 15, 10,  5,-30,
    -40,-20,  0,  5,  5,  0,-20,-40,
    -50,-40,-30,-30,-30,-30,-40,-50,
];

#[rustfmt::skip]
const BISHOP: [i32; 64] = [
    -20,-10,-10,-10,-10,-10,-10,-20,
    -10,  0,  0,  0,  0,  0,  0,-10,
    -10,  0,  5, 10, 10,  5,  0,-10,
    -10,  5,  5, 10, 10,  5,  5,-10,
    -10,  0, 10, 10, 10, 10,  0,-10,
    -10, 10, 10, 10, 10, 10, 10,-10,
    -10,  5,  0,  0,  0,  0,  5,-10,
    -20,-10,-10,-10,-10,-10,-10,-20,
];

#[rustfmt::skip]
const ROOK: [i32; 64] = [
     0,  0,  0,  0,  0,  0,  0,  0,
     5, 10, 10, 10, 10, 10, 10,  5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
     0,  0,  0,  5,  5,  0,  0,  0,
];

#[rustfmt::skip]
const QUEEN: [i32; 64] = [
    -20,-10,-10, -5, -5,-10,-10,-20,
    -10,  0,  0,  0,  0,  0,  0,-10,
    -10,  0,  5,  5,  5,  5,  0,-10,
     -5,  0,  5,  5,  5,  5,  0, -5,
      0,  0,  5,  5,  5,  5,  0, -5,
    -10,  5,  5,  5,  5,  5,  0,-10,
    -10,  0,  5,  0,  0,  0,  0,-10,
    -20,-10,-10, -5, -5,-10,-10,-20,
];

#[rustfmt::skip]
const KING_MG: [i32; 64] = [
    -30,-40,-40,-50,-50,-40,-40,-30,
    -30,-40,-40,-50,-50,-40,-40,-30,
    -30,-40,-40,-50,-50,-40,-40,-30,
    -30,-40,-40,-50,-50,-40,-40,-30,
    -20,-30,-30,-40,-40,-30,-30,-20,
    -10,-20,-20,-20,-20,-20,-20,-10,
     20, 20,  0,  0,  0,  0, 20, 20,
     20, 30, 10,  0,  0, 10, 30, 20,
];

#[rustfmt::skip]
const KING_EG: [i32; 64] = [
    -50,-40,-30,-20,-20,-30,-40,-50,
    -30,-20,-10,  0,  0,-10,-20,-30,
    -30,-10, 20, 30, 30, 20,-10,-30,
    -30,-10, 30, 40, 40, 30,-10,-30,
    -30,-10, 30, 40, 40, 30,-10,-30,
    -30,-10, 20, 30, 30, 20,-10,-30,
    -30,-30,  0,  0,  0,  0,-30,-30,
    -50,-30,-30,-30,-30,-30,-30,-50,
];

const MG_PST: [&[i32; 64]; 6] = [&PAWN_MG, &KNIGHT, &BISHOP, &ROOK, &QUEEN, &KING_MG];
const EG_PST: [&[i32; 64]; 6] = [&PAWN_EG, &KNIGHT, &BISHOP, &ROOK, &QUEEN, &KING_EG];

const DEFAULT_PAWN_CACHE_ENTRIES: usize = 1 << 14;

/// Midgame and endgame terms, White minus Black.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Terms {
    pub mg: i32,
    pub eg: i32,
}

impl Terms {
    fn add(&mut self, sign: i32, (mg, eg): (i32, i32)) {
        self.mg += sign * mg;
        self.eg += sign * eg;
    }

    fn negate(self) -> Terms {
        Terms {
            mg: -self.mg,
            eg: -self.eg,
        }
    }

    fn pack(self) -> u64 {
        (self.mg as u32 as u64) | ((self.eg as u32 as u64) << 32)
    }

    fn unpack(data: u64) -> Terms {
        Terms {
            mg: data as u32 as i32,
            eg: (data >> 32) as u32 as i32,
        }
    }
}

struct PawnSlot {
    key_xor: AtomicU64,
    data: AtomicU64,
}

/// Lock-free cache of pawn-structure terms keyed by the pawn hash.
///
/// Entries are validated the same way as the transposition table: the key
/// is stored XORed with the data, so a torn write reads as a miss.
pub struct PawnCache {
    slots: Box<[PawnSlot]>,
}

impl PawnCache {
    pub fn new(entries: usize) -> Self {
        let slots = (0..entries.max(1))
            .map(|_| PawnSlot {
                key_xor: AtomicU64::new(0),
                data: AtomicU64::new(0),
            })
            .collect();
        Self { slots }
    }

    fn slot(&self, key: u64) -> &PawnSlot {
        &self.slots[(key % self.slots.len() as u64) as usize]
    }

    pub fn probe(&self, key: u64) -> Option<Terms> {
        let slot = self.slot(key);
        let data = slot.data.load(Ordering::Relaxed);
        let key_xor = slot.key_xor.load(Ordering::Relaxed);
        (key_xor ^ data == key && (key_xor | data) != 0).then(|| Terms::unpack(data))
    }

    pub fn store(&self, key: u64, terms: Terms) {
        let slot = self.slot(key);
        let data = terms.pack();
        slot.key_xor.store(key ^ data, Ordering::Relaxed);
        slot.data.store(data, Ordering::Relaxed);
    }

    pub fn clear(&self) {
        for slot in self.slots.iter() {
            slot.key_xor.store(0, Ordering::Relaxed);
            slot.data.store(0, Ordering::Relaxed);
        }
    }
}

/// Material, piece-square tables, bishop pair and pawn structure, blended
/// by game phase.
pub struct ClassicalEvaluator {
    pawns: PawnCache,
}

impl Default for ClassicalEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassicalEvaluator {
    pub fn new() -> Self {
        Self::with_pawn_cache(DEFAULT_PAWN_CACHE_ENTRIES)
    }

    pub fn with_pawn_cache(entries: usize) -> Self {
        Self {
            pawns: PawnCache::new(entries),
        }
    }

    pub fn pawn_cache(&self) -> &PawnCache {
        &self.pawns
    }

    /// Pawn terms from the cache, trying the colour-mirrored key before
    /// computing them.
    pub fn pawn_structure(&self, pos: &Position) -> Terms {
        let key = pos.pawn_hash();
        if let Some(terms) = self.pawns.probe(key) {
            return terms;
        }
        if let Some(terms) = self.pawns.probe(pos.mirror_pawn_hash()) {
            return terms.negate();
        }
        let terms = pawn_terms(pos);
        self.pawns.store(key, terms);
        terms
    }
}

fn sign(color: Color) -> i32 {
    match color {
        Color::White => 1,
        Color::Black => -1,
    }
}

fn relative_rank(color: Color, sq: u8) -> usize {
    let rank = (sq / 8) as usize;
    match color {
        Color::White => rank,
        Color::Black => 7 - rank,
    }
}

/// Squares strictly in front of `sq` from `color`'s point of view, on the
/// given files.
fn front_span(color: Color, sq: u8, files: Bitboard) -> Bitboard {
    let rank = sq / 8;
    let mut ahead = Bitboard::EMPTY;
    match color {
        Color::White => {
            for r in rank + 1..8 {
                ahead |= Bitboard::rank(r);
            }
        }
        Color::Black => {
            for r in 0..rank {
                ahead |= Bitboard::rank(r);
            }
        }
    }
    ahead & files
}

fn adjacent_files(file: u8) -> Bitboard {
    let mut files = Bitboard::EMPTY;
    if file > 0 {
        files |= Bitboard::file(file - 1);
    }
    if file < 7 {
        files |= Bitboard::file(file + 1);
    }
    files
}

/// Doubled, isolated and passed pawns for both sides.
pub fn pawn_terms(pos: &Position) -> Terms {
    let mut terms = Terms::default();
    for color in Color::ALL {
        let s = sign(color);
        let ours = pos.pieces_of(color, PieceKind::Pawn);
        let theirs = pos.pieces_of(color.other(), PieceKind::Pawn);

        for file in 0..8 {
            let count = (ours & Bitboard::file(file)).popcount() as i32;
            if count > 1 {
                terms.add(s * (count - 1), DOUBLED_PAWN);
            }
        }

        for sq in ours {
            let file = sq % 8;
            let neighbours = adjacent_files(file);
            if (ours & neighbours).is_empty() {
                terms.add(s, ISOLATED_PAWN);
            }
            let span = front_span(color, sq, neighbours | Bitboard::file(file));
            let blocked_by_own = front_span(color, sq, Bitboard::file(file)) & ours;
            if (theirs & span).is_empty() && blocked_by_own.is_empty() {
                terms.add(s, PASSED_PAWN[relative_rank(color, sq)]);
            }
        }
    }
    terms
}

/// Material and piece-square terms plus the game phase.
fn piece_terms(pos: &Position) -> (Terms, i32) {
    let mut terms = Terms::default();
    let mut phase = 0;
    for color in Color::ALL {
        let s = sign(color);
        for kind in PieceKind::ALL {
            let k = kind.idx();
            for sq in pos.pieces_of(color, kind) {
                let idx = match color {
                    Color::White => (sq ^ 56) as usize,
                    Color::Black => sq as usize,
                };
                terms.add(s, (MG_VALUE[k] + MG_PST[k][idx], EG_VALUE[k] + EG_PST[k][idx]));
                phase += PHASE[k];
            }
        }
        if pos.pieces_of(color, PieceKind::Bishop).more_than_one() {
            terms.add(s, BISHOP_PAIR);
        }
    }
    (terms, phase.min(MAX_PHASE))
}

impl ClassicalEvaluator {
    /// Centipawns from White's point of view, without tempo.
    pub fn white_centipawns(&self, pos: &Position) -> i32 {
        let (mut terms, phase) = piece_terms(pos);
        let pawns = self.pawn_structure(pos);
        terms.mg += pawns.mg;
        terms.eg += pawns.eg;
        (terms.mg * phase + terms.eg * (MAX_PHASE - phase)) / MAX_PHASE
    }
}

impl Evaluator for ClassicalEvaluator {
    fn evaluate(&self, pos: &Position) -> Score {
        let cp = sign(pos.side_to_move()) * self.white_centipawns(pos) + TEMPO;
        Score::from_centipawns(cp)
    }
}

#[cfg(test)]
#[path = "eval_tests.rs"]
mod eval_tests;
