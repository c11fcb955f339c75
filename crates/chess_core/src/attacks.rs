//! Pre-computed attack tables for move generation and attack detection.
//!
//! - Knight, king and pawn attacks are fixed tables built at compile time.
//! - Bishop and rook attacks use magic bitboards: the relevant occupancy
//!   bits are multiplied by a per-square magic number and the high bits of
//!   the product index a shared attack table. Magics are searched for once
//!   at start-up with a seeded generator, so the tables are identical on
//!   every run.
//! - `between` and `line` give the squares joining two aligned squares,
//!   used for check evasion and pin detection.

use std::sync::OnceLock;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::bitboard::Bitboard;
use crate::types::{Color, Piece, PieceKind};

const KNIGHT_DELTAS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

const KING_DELTAS: [(i8, i8); 8] = [
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
];

const WHITE_PAWN_DELTAS: [(i8, i8); 2] = [(-1, 1), (1, 1)];
const BLACK_PAWN_DELTAS: [(i8, i8); 2] = [(-1, -1), (1, -1)];

const ROOK_DIRECTIONS: [(i8, i8); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];
const BISHOP_DIRECTIONS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, -1), (-1, 1)];

/// Seed for the magic number search.
const MAGIC_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

/// Table of single-step attacks for a list of (file, rank) offsets.
const fn leaper_table(deltas: &[(i8, i8)]) -> [Bitboard; 64] {
    let mut table = [Bitboard::EMPTY; 64];
    let mut sq = 0usize;
    while sq < 64 {
        let file = (sq % 8) as i8;
        let rank = (sq / 8) as i8;
        let mut bits = 0u64;
        let mut i = 0;
        while i < deltas.len() {
            let f = file + deltas[i].0;
            let r = rank + deltas[i].1;
            if f >= 0 && f < 8 && r >= 0 && r < 8 {
                bits |= 1u64 << ((r * 8 + f) as u32);
            }
            i += 1;
        }
        table[sq] = Bitboard(bits);
        sq += 1;
    }
    table
}

pub static KNIGHT_ATTACKS: [Bitboard; 64] = leaper_table(&KNIGHT_DELTAS);
pub static KING_ATTACKS: [Bitboard; 64] = leaper_table(&KING_DELTAS);
pub static PAWN_ATTACKS: [[Bitboard; 64]; 2] = [
    leaper_table(&WHITE_PAWN_DELTAS),
    leaper_table(&BLACK_PAWN_DELTAS),
];

/// Squares attacked by a pawn of `color` standing on `sq`.
#[inline(always)]
pub fn pawn_attacks(sq: u8, color: Color) -> Bitboard {
    PAWN_ATTACKS[color.idx()][sq as usize]
}

#[inline(always)]
pub fn knight_attacks(sq: u8) -> Bitboard {
    KNIGHT_ATTACKS[sq as usize]
}

#[inline(always)]
pub fn king_attacks(sq: u8) -> Bitboard {
    KING_ATTACKS[sq as usize]
}

// =============================================================================
// Sliding pieces
// =============================================================================

/// Walks each direction until the board edge or the first blocker (inclusive).
/// Slow; used to fill the magic tables and as a test reference.
pub fn slow_slider_attacks(sq: u8, occupied: Bitboard, directions: &[(i8, i8)]) -> Bitboard {
    let mut attacks = Bitboard::EMPTY;
    let (file, rank) = ((sq % 8) as i8, (sq / 8) as i8);
    for &(df, dr) in directions {
        let (mut f, mut r) = (file + df, rank + dr);
        while (0..8).contains(&f) && (0..8).contains(&r) {
            let target = (r * 8 + f) as u8;
            attacks.set(target);
            if occupied.contains(target) {
                break;
            }
            f += df;
            r += dr;
        }
    }
    attacks
}

/// Occupancy bits that can change a slider's attacks: the rays minus their
/// final edge square.
fn relevant_mask(sq: u8, directions: &[(i8, i8)]) -> Bitboard {
    let mut mask = Bitboard::EMPTY;
    let (file, rank) = ((sq % 8) as i8, (sq / 8) as i8);
    for &(df, dr) in directions {
        let (mut f, mut r) = (file + df, rank + dr);
        while (0..8).contains(&(f + df)) && (0..8).contains(&(r + dr)) {
            mask.set((r * 8 + f) as u8);
            f += df;
            r += dr;
        }
    }
    mask
}

#[derive(Clone, Copy, Debug, Default)]
struct Magic {
    mask: Bitboard,
    magic: u64,
    shift: u32,
    offset: usize,
}

impl Magic {
    #[inline(always)]
    fn index(&self, occupied: Bitboard) -> usize {
        let hashed = (occupied & self.mask).0.wrapping_mul(self.magic) >> self.shift;
        self.offset + hashed as usize
    }
}

/// Finds a collision-free magic for `sq` and appends its attack slice to `table`.
fn find_magic(
    sq: u8,
    directions: &[(i8, i8)],
    rng: &mut StdRng,
    table: &mut Vec<Bitboard>,
) -> Magic {
    let mask = relevant_mask(sq, directions);
    let bits = mask.popcount();
    let size = 1usize << bits;

    // Carry-rippler enumeration of every subset of the mask.
    let mut occupancies = Vec::with_capacity(size);
    let mut reference = Vec::with_capacity(size);
    let mut subset = 0u64;
    loop {
        occupancies.push(Bitboard(subset));
        reference.push(slow_slider_attacks(sq, Bitboard(subset), directions));
        subset = subset.wrapping_sub(mask.0) & mask.0;
        if subset == 0 {
            break;
        }
    }

    let offset = table.len();
    table.resize(offset + size, Bitboard::EMPTY);
    let slots = &mut table[offset..];

    // epoch[i] == attempt marks slot i as written during the current attempt,
    // which avoids clearing the slice between candidates.
    let mut epoch = vec![0u32; size];
    let mut attempt = 0u32;
    loop {
        let magic = rng.next_u64() & rng.next_u64() & rng.next_u64();
        if (mask.0.wrapping_mul(magic) >> 56).count_ones() < 6 {
            continue;
        }
        attempt += 1;

        let candidate = Magic {
            mask,
            magic,
            shift: 64 - bits,
            offset: 0,
        };
        let mut collision = false;
        for (occupied, attacks) in occupancies.iter().zip(&reference) {
            let idx = candidate.index(*occupied);
            if epoch[idx] < attempt {
                epoch[idx] = attempt;
                slots[idx] = *attacks;
            } else if slots[idx] != *attacks {
                collision = true;
                break;
            }
        }

        if !collision {
            return Magic { offset, ..candidate };
        }
    }
}

/// Every table that needs run-time construction.
struct AttackTables {
    bishop: [Magic; 64],
    rook: [Magic; 64],
    sliders: Vec<Bitboard>,
    between: Vec<Bitboard>,
    line: Vec<Bitboard>,
}

impl AttackTables {
    fn build() -> Self {
        let start = Instant::now();
        let mut rng = StdRng::seed_from_u64(MAGIC_SEED);
        let mut sliders = Vec::new();
        let mut bishop = [Magic::default(); 64];
        let mut rook = [Magic::default(); 64];

        for sq in 0..64u8 {
            bishop[sq as usize] = find_magic(sq, &BISHOP_DIRECTIONS, &mut rng, &mut sliders);
        }
        for sq in 0..64u8 {
            rook[sq as usize] = find_magic(sq, &ROOK_DIRECTIONS, &mut rng, &mut sliders);
        }

        let mut between = vec![Bitboard::EMPTY; 64 * 64];
        let mut line = vec![Bitboard::EMPTY; 64 * 64];
        for a in 0..64u8 {
            for directions in [&ROOK_DIRECTIONS[..], &BISHOP_DIRECTIONS[..]] {
                let from_a = slow_slider_attacks(a, Bitboard::EMPTY, directions);
                for b in from_a {
                    let from_b = slow_slider_attacks(b, Bitboard::EMPTY, directions);
                    let idx = a as usize * 64 + b as usize;
                    line[idx] = (from_a & from_b)
                        | Bitboard::from_square(a)
                        | Bitboard::from_square(b);
                    between[idx] = slow_slider_attacks(a, Bitboard::from_square(b), directions)
                        & slow_slider_attacks(b, Bitboard::from_square(a), directions);
                }
            }
        }

        log::debug!(
            "attack tables built: {} slider entries in {:?}",
            sliders.len(),
            start.elapsed()
        );

        Self {
            bishop,
            rook,
            sliders,
            between,
            line,
        }
    }
}

static TABLES: OnceLock<AttackTables> = OnceLock::new();

#[inline(always)]
fn tables() -> &'static AttackTables {
    TABLES.get_or_init(AttackTables::build)
}

/// Build the run-time tables now instead of on first use.
pub fn init() {
    tables();
}

#[inline(always)]
pub fn bishop_attacks(sq: u8, occupied: Bitboard) -> Bitboard {
    let t = tables();
    t.sliders[t.bishop[sq as usize].index(occupied)]
}

#[inline(always)]
pub fn rook_attacks(sq: u8, occupied: Bitboard) -> Bitboard {
    let t = tables();
    t.sliders[t.rook[sq as usize].index(occupied)]
}

#[inline(always)]
pub fn queen_attacks(sq: u8, occupied: Bitboard) -> Bitboard {
    bishop_attacks(sq, occupied) | rook_attacks(sq, occupied)
}

/// Squares strictly between `a` and `b`, empty unless they share a line.
#[inline(always)]
pub fn between(a: u8, b: u8) -> Bitboard {
    tables().between[a as usize * 64 + b as usize]
}

/// The full line through `a` and `b` (both included), empty unless aligned.
#[inline(always)]
pub fn line(a: u8, b: u8) -> Bitboard {
    tables().line[a as usize * 64 + b as usize]
}

/// Squares attacked by `piece` on `sq` given the board occupancy.
#[inline]
pub fn attack_map(piece: Piece, sq: u8, occupied: Bitboard) -> Bitboard {
    match piece.kind {
        PieceKind::Pawn => pawn_attacks(sq, piece.color),
        PieceKind::Knight => knight_attacks(sq),
        PieceKind::Bishop => bishop_attacks(sq, occupied),
        PieceKind::Rook => rook_attacks(sq, occupied),
        PieceKind::Queen => queen_attacks(sq, occupied),
        PieceKind::King => king_attacks(sq),
    }
}

#[cfg(test)]
#[path = "attacks_tests.rs"]
mod attacks_tests;
