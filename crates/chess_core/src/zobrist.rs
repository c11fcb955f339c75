//! Zobrist hashing for chess positions.
//!
//! The position hash is the XOR of random keys for:
//! - each piece on each square (12 × 64 values)
//! - black to move (1 value)
//! - the castling-rights mask (16 values, one per mask)
//! - the en-passant file (8 values)
//!
//! Pawn hashes use the piece keys alone, restricted to pawns and kings.

use crate::types::{Color, Piece, flip_rank};

/// Pre-computed random values for Zobrist hashing, fixed at compile time.
pub struct ZobristKeys {
    /// Indexed by [piece index][square].
    pub pieces: [[u64; 64]; 12],
    /// XORed in when black is to move.
    pub side_to_move: u64,
    /// Indexed by the full castling-rights mask.
    pub castling: [u64; 16],
    /// Indexed by the en-passant file.
    pub en_passant: [u64; 8],
}

impl Default for ZobristKeys {
    fn default() -> Self {
        Self::new()
    }
}

/// splitmix64 step: returns the advanced state and its output.
const fn splitmix64(state: u64) -> (u64, u64) {
    let state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    (state, z ^ (z >> 31))
}

impl ZobristKeys {
    pub const fn new() -> Self {
        let mut state = 0x0123_4567_89AB_CDEFu64;

        let mut pieces = [[0u64; 64]; 12];
        let mut piece = 0;
        while piece < 12 {
            let mut sq = 0;
            while sq < 64 {
                let (next, key) = splitmix64(state);
                state = next;
                pieces[piece][sq] = key;
                sq += 1;
            }
            piece += 1;
        }

        let (next, side_to_move) = splitmix64(state);
        state = next;

        // Mask 0 hashes to nothing so a position without castling rights
        // needs no castling term.
        let mut castling = [0u64; 16];
        let mut i = 1;
        while i < 16 {
            let (next, key) = splitmix64(state);
            state = next;
            castling[i] = key;
            i += 1;
        }

        let mut en_passant = [0u64; 8];
        let mut i = 0;
        while i < 8 {
            let (next, key) = splitmix64(state);
            state = next;
            en_passant[i] = key;
            i += 1;
        }

        ZobristKeys {
            pieces,
            side_to_move,
            castling,
            en_passant,
        }
    }

    #[inline(always)]
    pub fn piece_key(&self, piece: Piece, sq: u8) -> u64 {
        self.pieces[piece.idx()][sq as usize]
    }

    /// Key of the same piece in the colour-flipped, rank-mirrored position.
    #[inline(always)]
    pub fn mirror_piece_key(&self, piece: Piece, sq: u8) -> u64 {
        let mirrored = Piece::new(piece.color.other(), piece.kind);
        self.pieces[mirrored.idx()][flip_rank(sq) as usize]
    }

    #[inline(always)]
    pub fn castling_key(&self, rights: u8) -> u64 {
        self.castling[(rights & 0xF) as usize]
    }

    #[inline(always)]
    pub fn ep_key(&self, file: u8) -> u64 {
        self.en_passant[file as usize]
    }

    #[inline(always)]
    pub fn side_key(&self, side: Color) -> u64 {
        match side {
            Color::White => 0,
            Color::Black => self.side_to_move,
        }
    }
}

pub static ZOBRIST: ZobristKeys = ZobristKeys::new();

#[cfg(test)]
#[path = "zobrist_tests.rs"]
mod zobrist_tests;
