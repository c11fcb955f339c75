//! Bitboard position with reversible move application.
//!
//! Occupancy is kept three ways (per piece kind, per colour, and a mailbox)
//! together with per-piece counts. Every change goes through `put_piece` /
//! `remove_piece`, which also maintain the Zobrist hash and the two pawn
//! hashes, so the representations cannot drift apart.

use std::fmt;

use crate::attacks::{
    bishop_attacks, king_attacks, knight_attacks, pawn_attacks, rook_attacks,
};
use crate::bitboard::Bitboard;
use crate::error::FenError;
use crate::types::*;
use crate::zobrist::ZOBRIST;

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Earlier occurrences of the current position that make it a draw
/// (2 means the third occurrence).
pub const DEFAULT_REPETITION_THRESHOLD: usize = 2;

/// Castling rights as a 4-bit mask.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CastlingRights(pub u8);

impl CastlingRights {
    pub const NONE: CastlingRights = CastlingRights(0);
    pub const WHITE_KING: u8 = 1;
    pub const WHITE_QUEEN: u8 = 2;
    pub const BLACK_KING: u8 = 4;
    pub const BLACK_QUEEN: u8 = 8;
    pub const ALL: CastlingRights = CastlingRights(0b1111);

    #[inline(always)]
    pub fn has(self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    #[inline(always)]
    pub fn kingside(color: Color) -> u8 {
        match color {
            Color::White => Self::WHITE_KING,
            Color::Black => Self::BLACK_KING,
        }
    }

    #[inline(always)]
    pub fn queenside(color: Color) -> u8 {
        match color {
            Color::White => Self::WHITE_QUEEN,
            Color::Black => Self::BLACK_QUEEN,
        }
    }
}

/// Rights that survive a move touching each square.
const CASTLING_KEEP: [u8; 64] = {
    let mut keep = [0b1111u8; 64];
    keep[0] = !CastlingRights::WHITE_QUEEN & 0b1111; // a1
    keep[4] = !(CastlingRights::WHITE_KING | CastlingRights::WHITE_QUEEN) & 0b1111; // e1
    keep[7] = !CastlingRights::WHITE_KING & 0b1111; // h1
    keep[56] = !CastlingRights::BLACK_QUEEN & 0b1111; // a8
    keep[60] = !(CastlingRights::BLACK_KING | CastlingRights::BLACK_QUEEN) & 0b1111; // e8
    keep[63] = !CastlingRights::BLACK_KING & 0b1111; // h8
    keep
};

/// Rook (from, to) for a castling move, keyed by the king's destination.
#[inline]
pub(crate) fn castle_rook_squares(king_to: u8) -> (u8, u8) {
    match king_to {
        6 => (7, 5),
        2 => (0, 3),
        62 => (63, 61),
        _ => (56, 59),
    }
}

/// Everything needed to undo one move exactly.
#[derive(Clone, Copy, Debug)]
struct StateInfo {
    mv: Move,
    captured: Option<Piece>,
    castling: CastlingRights,
    en_passant: Option<u8>,
    halfmove_clock: u16,
    hash: u64,
    pawn_hash: u64,
    mirror_pawn_hash: u64,
}

#[derive(Clone, Debug)]
pub struct Position {
    pieces: [Bitboard; 6],
    colors: [Bitboard; 2],
    counts: [u8; 12],
    board: [Option<Piece>; 64],
    side_to_move: Color,
    castling: CastlingRights,
    en_passant: Option<u8>, // square behind a pawn that just advanced 2
    halfmove_clock: u16,
    fullmove_number: u16,
    hash: u64,
    pawn_hash: u64,
    mirror_pawn_hash: u64,
    history: Vec<StateInfo>,
}

impl Default for Position {
    fn default() -> Self {
        Self::startpos()
    }
}

impl Position {
    fn empty() -> Self {
        Position {
            pieces: [Bitboard::EMPTY; 6],
            colors: [Bitboard::EMPTY; 2],
            counts: [0; 12],
            board: [None; 64],
            side_to_move: Color::White,
            castling: CastlingRights::NONE,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
            hash: 0,
            pawn_hash: 0,
            mirror_pawn_hash: 0,
            history: Vec::with_capacity(256),
        }
    }

    pub fn startpos() -> Self {
        let mut p = Position::empty();
        let back = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ];
        for (f, &kind) in back.iter().enumerate() {
            let f = f as u8;
            p.put_piece(f, Piece::new(Color::White, kind));
            p.put_piece(8 + f, Piece::new(Color::White, PieceKind::Pawn));
            p.put_piece(48 + f, Piece::new(Color::Black, PieceKind::Pawn));
            p.put_piece(56 + f, Piece::new(Color::Black, kind));
        }
        p.castling = CastlingRights::ALL;
        p.hash = p.compute_hash();
        p
    }

    /// Largest move counter accepted from a FEN record, leaving headroom for play.
    pub const MAX_FEN_COUNTER: u16 = 10_000;

    /// Parse a Forsyth-Edwards Notation record. The move counters are optional.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let parts: Vec<&str> = fen.split_whitespace().collect();
        if parts.len() < 4 {
            return Err(FenError::MissingFields(parts.len()));
        }

        let mut p = Position::empty();

        let ranks: Vec<&str> = parts[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(FenError::BadLayout(format!("{} ranks", ranks.len())));
        }
        for (rank_idx, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - rank_idx as u8; // FEN lists rank 8 .. 1
            let mut file = 0u8;
            for ch in rank_str.chars() {
                if let Some(d) = ch.to_digit(10) {
                    if d == 0 || d > 8 {
                        return Err(FenError::BadLayout(format!("skip count {d}")));
                    }
                    file += d as u8;
                } else {
                    let piece = Piece::from_char(ch).ok_or(FenError::BadPiece(ch))?;
                    if file >= 8 {
                        return Err(FenError::BadLayout(format!("rank {} too long", rank + 1)));
                    }
                    p.put_piece(rank * 8 + file, piece);
                    file += 1;
                }
                if file > 8 {
                    return Err(FenError::BadLayout(format!("rank {} too long", rank + 1)));
                }
            }
            if file != 8 {
                return Err(FenError::BadLayout(format!("rank {} too short", rank + 1)));
            }
        }

        for color in Color::ALL {
            let count = p.pieces_of(color, PieceKind::King).popcount();
            if count != 1 {
                let color = match color {
                    Color::White => "white",
                    Color::Black => "black",
                };
                return Err(FenError::KingCount { color, count });
            }
        }

        p.side_to_move = match parts[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(FenError::BadSideToMove(other.to_string())),
        };
        if p.is_king_attacked(p.side_to_move.other()) {
            return Err(FenError::OpponentInCheck);
        }

        if parts[2] != "-" {
            for c in parts[2].chars() {
                p.castling.0 |= match c {
                    'K' => CastlingRights::WHITE_KING,
                    'Q' => CastlingRights::WHITE_QUEEN,
                    'k' => CastlingRights::BLACK_KING,
                    'q' => CastlingRights::BLACK_QUEEN,
                    _ => return Err(FenError::BadCastling(c)),
                };
            }
        }
        // Drop rights whose king or rook is not on its home square.
        for (flag, king_sq, rook_sq, color) in [
            (CastlingRights::WHITE_KING, 4, 7, Color::White),
            (CastlingRights::WHITE_QUEEN, 4, 0, Color::White),
            (CastlingRights::BLACK_KING, 60, 63, Color::Black),
            (CastlingRights::BLACK_QUEEN, 60, 56, Color::Black),
        ] {
            if p.board[king_sq] != Some(Piece::new(color, PieceKind::King))
                || p.board[rook_sq] != Some(Piece::new(color, PieceKind::Rook))
            {
                p.castling.0 &= !flag;
            }
        }

        if parts[3] != "-" {
            // The square behind a pawn that just advanced two ranks
            let ep_rank = match p.side_to_move {
                Color::White => 5,
                Color::Black => 2,
            };
            let ep = coord_to_sq(parts[3])
                .filter(|&s| rank_of(s) == ep_rank)
                .ok_or_else(|| FenError::BadEnPassant(parts[3].to_string()))?;
            p.en_passant = Some(ep);
        }

        let counter = |field: &str| {
            field
                .parse::<u16>()
                .ok()
                .filter(|&n| n <= Self::MAX_FEN_COUNTER)
                .ok_or_else(|| FenError::BadCounter(field.to_string()))
        };
        if let Some(&hm) = parts.get(4) {
            p.halfmove_clock = counter(hm)?;
        }
        if let Some(&fm) = parts.get(5) {
            p.fullmove_number = counter(fm)?;
        }

        p.hash = p.compute_hash();
        Ok(p)
    }

    pub fn to_fen(&self) -> String {
        let mut fen = String::with_capacity(90);
        for rank in (0..8u8).rev() {
            let mut empty = 0;
            for file in 0..8u8 {
                match self.board[(rank * 8 + file) as usize] {
                    Some(piece) => {
                        if empty > 0 {
                            fen.push(char::from(b'0' + empty));
                            empty = 0;
                        }
                        fen.push(piece.to_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                fen.push(char::from(b'0' + empty));
            }
            if rank > 0 {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push(match self.side_to_move {
            Color::White => 'w',
            Color::Black => 'b',
        });

        fen.push(' ');
        if self.castling == CastlingRights::NONE {
            fen.push('-');
        } else {
            for (flag, c) in [
                (CastlingRights::WHITE_KING, 'K'),
                (CastlingRights::WHITE_QUEEN, 'Q'),
                (CastlingRights::BLACK_KING, 'k'),
                (CastlingRights::BLACK_QUEEN, 'q'),
            ] {
                if self.castling.has(flag) {
                    fen.push(c);
                }
            }
        }

        fen.push(' ');
        match self.en_passant {
            Some(ep) => fen.push_str(&sq_to_coord(ep)),
            None => fen.push('-'),
        }

        fen.push_str(&format!(" {} {}", self.halfmove_clock, self.fullmove_number));
        fen
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline(always)]
    pub fn piece_at(&self, sq: u8) -> Option<Piece> {
        self.board[sq as usize]
    }

    #[inline(always)]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    #[inline(always)]
    pub fn castling(&self) -> CastlingRights {
        self.castling
    }

    #[inline(always)]
    pub fn en_passant(&self) -> Option<u8> {
        self.en_passant
    }

    #[inline(always)]
    pub fn halfmove_clock(&self) -> u16 {
        self.halfmove_clock
    }

    #[inline(always)]
    pub fn fullmove_number(&self) -> u16 {
        self.fullmove_number
    }

    #[inline(always)]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Hash of pawns and kings only.
    #[inline(always)]
    pub fn pawn_hash(&self) -> u64 {
        self.pawn_hash
    }

    /// Pawn hash of the colour-flipped, rank-mirrored position.
    #[inline(always)]
    pub fn mirror_pawn_hash(&self) -> u64 {
        self.mirror_pawn_hash
    }

    #[inline(always)]
    pub fn pieces(&self, kind: PieceKind) -> Bitboard {
        self.pieces[kind.idx()]
    }

    #[inline(always)]
    pub fn pieces_of(&self, color: Color, kind: PieceKind) -> Bitboard {
        self.pieces[kind.idx()] & self.colors[color.idx()]
    }

    #[inline(always)]
    pub fn color_bb(&self, color: Color) -> Bitboard {
        self.colors[color.idx()]
    }

    #[inline(always)]
    pub fn occupied(&self) -> Bitboard {
        self.colors[0] | self.colors[1]
    }

    #[inline(always)]
    pub fn piece_count(&self, piece: Piece) -> u32 {
        self.counts[piece.idx()] as u32
    }

    /// Pieces of both colours, kings included.
    #[inline(always)]
    pub fn total_pieces(&self) -> u32 {
        self.occupied().popcount()
    }

    #[inline(always)]
    pub fn king_sq(&self, color: Color) -> u8 {
        self.pieces_of(color, PieceKind::King).first_square()
    }

    /// Number of moves (including null moves) applied since construction.
    #[inline(always)]
    pub fn height(&self) -> usize {
        self.history.len()
    }

    pub fn last_move(&self) -> Option<Move> {
        self.history.last().map(|s| s.mv)
    }

    /// Piece captured by the most recent move.
    pub fn last_captured(&self) -> Option<Piece> {
        self.history.last().and_then(|s| s.captured)
    }

    pub fn has_non_pawn_material(&self, color: Color) -> bool {
        let pawns_and_kings = self.pieces(PieceKind::Pawn) | self.pieces(PieceKind::King);
        (self.colors[color.idx()] & !pawns_and_kings).is_nonempty()
    }

    /// True if `mv` removes an enemy piece (en passant included).
    #[inline]
    pub fn is_capture(&self, mv: Move) -> bool {
        match mv.kind() {
            MoveKind::Capture | MoveKind::EnPassant => true,
            MoveKind::Castle => false,
            _ => self.board[mv.to() as usize].is_some(),
        }
    }

    // =========================================================================
    // Piece placement
    // =========================================================================

    fn put_piece(&mut self, sq: u8, piece: Piece) {
        let bb = Bitboard::from_square(sq);
        self.pieces[piece.kind.idx()] |= bb;
        self.colors[piece.color.idx()] |= bb;
        self.counts[piece.idx()] += 1;
        self.board[sq as usize] = Some(piece);
        self.toggle_hashes(piece, sq);
    }

    fn remove_piece(&mut self, sq: u8) -> Option<Piece> {
        let piece = self.board[sq as usize]?;
        let bb = Bitboard::from_square(sq);
        self.pieces[piece.kind.idx()] ^= bb;
        self.colors[piece.color.idx()] ^= bb;
        self.counts[piece.idx()] -= 1;
        self.board[sq as usize] = None;
        self.toggle_hashes(piece, sq);
        Some(piece)
    }

    fn move_piece(&mut self, from: u8, to: u8) {
        if let Some(piece) = self.remove_piece(from) {
            self.put_piece(to, piece);
        }
    }

    #[inline(always)]
    fn toggle_hashes(&mut self, piece: Piece, sq: u8) {
        self.hash ^= ZOBRIST.piece_key(piece, sq);
        if matches!(piece.kind, PieceKind::Pawn | PieceKind::King) {
            self.pawn_hash ^= ZOBRIST.piece_key(piece, sq);
            self.mirror_pawn_hash ^= ZOBRIST.mirror_piece_key(piece, sq);
        }
    }

    // =========================================================================
    // Make / unmake
    // =========================================================================

    fn push_state(&mut self, mv: Move) {
        self.history.push(StateInfo {
            mv,
            captured: None,
            castling: self.castling,
            en_passant: self.en_passant,
            halfmove_clock: self.halfmove_clock,
            hash: self.hash,
            pawn_hash: self.pawn_hash,
            mirror_pawn_hash: self.mirror_pawn_hash,
        });
    }

    fn finish_turn(&mut self) {
        if self.side_to_move == Color::Black {
            self.fullmove_number = self.fullmove_number.saturating_add(1);
        }
        self.side_to_move = self.side_to_move.other();
        self.hash ^= ZOBRIST.side_to_move;
    }

    /// Apply a legal move. The move must come from this position's generator.
    pub fn make_move(&mut self, mv: Move) {
        let from = mv.from();
        let to = mv.to();
        let Some(moved) = self.board[from as usize] else {
            debug_assert!(false, "make_move {mv}: no piece on {}", sq_to_coord(from));
            self.make_null_move();
            return;
        };
        let us = self.side_to_move;

        self.push_state(mv);

        if let Some(ep) = self.en_passant.take() {
            self.hash ^= ZOBRIST.ep_key(ep % 8);
        }
        self.halfmove_clock = self.halfmove_clock.saturating_add(1);

        let mut captured = None;
        match mv.kind() {
            MoveKind::Castle => {
                let (rook_from, rook_to) = castle_rook_squares(to);
                self.move_piece(from, to);
                self.move_piece(rook_from, rook_to);
            }
            MoveKind::EnPassant => {
                captured = self.remove_piece(to ^ 8);
                self.move_piece(from, to);
            }
            kind => {
                captured = self.remove_piece(to);
                self.move_piece(from, to);
                if let Some(promo) = mv.promotion() {
                    self.remove_piece(to);
                    self.put_piece(to, Piece::new(us, promo));
                }
                if kind == MoveKind::DoublePawnPush {
                    let ep = (from + to) / 2;
                    self.en_passant = Some(ep);
                    self.hash ^= ZOBRIST.ep_key(ep % 8);
                }
            }
        }

        if moved.kind == PieceKind::Pawn || captured.is_some() {
            self.halfmove_clock = 0;
        }

        let rights = CastlingRights(
            self.castling.0 & CASTLING_KEEP[from as usize] & CASTLING_KEEP[to as usize],
        );
        if rights != self.castling {
            self.hash ^= ZOBRIST.castling_key(self.castling.0) ^ ZOBRIST.castling_key(rights.0);
            self.castling = rights;
        }

        if let Some(state) = self.history.last_mut() {
            state.captured = captured;
        }
        self.finish_turn();
    }

    /// Undo the most recent `make_move` or `make_null_move`.
    pub fn unmake_move(&mut self) {
        let Some(state) = self.history.pop() else {
            debug_assert!(false, "unmake_move with empty history");
            return;
        };

        self.side_to_move = self.side_to_move.other();
        if self.side_to_move == Color::Black {
            self.fullmove_number = self.fullmove_number.saturating_sub(1);
        }
        let us = self.side_to_move;

        let mv = state.mv;
        if !mv.is_null() {
            let from = mv.from();
            let to = mv.to();
            match mv.kind() {
                MoveKind::Castle => {
                    let (rook_from, rook_to) = castle_rook_squares(to);
                    self.move_piece(rook_to, rook_from);
                    self.move_piece(to, from);
                }
                MoveKind::EnPassant => {
                    self.move_piece(to, from);
                    if let Some(victim) = state.captured {
                        self.put_piece(to ^ 8, victim);
                    }
                }
                _ => {
                    if mv.is_promotion() {
                        self.remove_piece(to);
                        self.put_piece(to, Piece::new(us, PieceKind::Pawn));
                    }
                    self.move_piece(to, from);
                    if let Some(victim) = state.captured {
                        self.put_piece(to, victim);
                    }
                }
            }
        }

        self.castling = state.castling;
        self.en_passant = state.en_passant;
        self.halfmove_clock = state.halfmove_clock;
        self.hash = state.hash;
        self.pawn_hash = state.pawn_hash;
        self.mirror_pawn_hash = state.mirror_pawn_hash;
    }

    /// Pass the turn: clears en passant and bumps the half-move clock.
    pub fn make_null_move(&mut self) {
        self.push_state(Move::NULL);
        if let Some(ep) = self.en_passant.take() {
            self.hash ^= ZOBRIST.ep_key(ep % 8);
        }
        self.halfmove_clock = self.halfmove_clock.saturating_add(1);
        self.finish_turn();
    }

    pub fn unmake_null_move(&mut self) {
        debug_assert!(self.last_move().is_some_and(|m| m.is_null()));
        self.unmake_move();
    }

    // =========================================================================
    // Attacks
    // =========================================================================

    /// Pieces of either colour attacking `sq` under the given occupancy.
    pub fn attackers_to(&self, sq: u8, occupied: Bitboard) -> Bitboard {
        let bishops_queens = self.pieces(PieceKind::Bishop) | self.pieces(PieceKind::Queen);
        let rooks_queens = self.pieces(PieceKind::Rook) | self.pieces(PieceKind::Queen);
        (pawn_attacks(sq, Color::Black) & self.pieces_of(Color::White, PieceKind::Pawn))
            | (pawn_attacks(sq, Color::White) & self.pieces_of(Color::Black, PieceKind::Pawn))
            | (knight_attacks(sq) & self.pieces(PieceKind::Knight))
            | (king_attacks(sq) & self.pieces(PieceKind::King))
            | (bishop_attacks(sq, occupied) & bishops_queens)
            | (rook_attacks(sq, occupied) & rooks_queens)
    }

    pub fn is_square_attacked(&self, sq: u8, by: Color) -> bool {
        (self.attackers_to(sq, self.occupied()) & self.colors[by.idx()]).is_nonempty()
    }

    /// Enemy pieces giving check to the side to move.
    #[inline]
    pub fn checkers(&self) -> Bitboard {
        let us = self.side_to_move;
        self.attackers_to(self.king_sq(us), self.occupied()) & self.colors[us.other().idx()]
    }

    /// Whether the side to move is in check.
    #[inline]
    pub fn in_check(&self) -> bool {
        self.checkers().is_nonempty()
    }

    /// Whether `color`'s king is attacked, regardless of who is to move.
    pub fn is_king_attacked(&self, color: Color) -> bool {
        self.is_square_attacked(self.king_sq(color), color.other())
    }

    /// Whether `mv` leaves the opponent in check.
    pub fn gives_check(&mut self, mv: Move) -> bool {
        self.make_move(mv);
        let check = self.in_check();
        self.unmake_move();
        check
    }

    // =========================================================================
    // Draw detection
    // =========================================================================

    pub fn is_fifty_move_draw(&self) -> bool {
        self.halfmove_clock >= 100
    }

    /// Earlier positions in the reversible window, at or after `since`, with
    /// the same hash and side to move. Stops at a null move.
    pub fn count_repetitions(&self, since: usize) -> usize {
        let height = self.history.len();
        let window = (self.halfmove_clock as usize).min(height);
        let lowest = since.max(height - window);
        let mut count = 0;
        let mut i = height;
        while i > lowest {
            i -= 1;
            let state = &self.history[i];
            if state.mv.is_null() {
                break;
            }
            if (height - i) % 2 == 0 && state.hash == self.hash {
                count += 1;
            }
        }
        count
    }

    /// Material configurations that cannot be won by either side.
    pub fn is_insufficient_material(&self) -> bool {
        let heavy = self.pieces(PieceKind::Rook) | self.pieces(PieceKind::Queen);
        if heavy.is_nonempty() {
            return false;
        }
        let pawns = self.pieces(PieceKind::Pawn);
        let knights = self.pieces(PieceKind::Knight);
        let bishops = self.pieces(PieceKind::Bishop);
        let minors = knights | bishops;

        if pawns.is_empty() {
            // K v K, K+minor v K
            if minors.popcount() <= 1 {
                return true;
            }
            // K+B v K+B with both bishops on the same square colour
            if knights.is_empty() && bishops.popcount() == 2 {
                let white = self.pieces_of(Color::White, PieceKind::Bishop);
                let light = (bishops & Bitboard::LIGHT_SQUARES).popcount();
                return white.popcount() == 1 && (light == 0 || light == 2);
            }
            return false;
        }

        // Lone rook pawn with the defending king on its promotion path
        if minors.is_empty() && pawns.popcount() == 1 {
            let pawn_sq = pawns.first_square();
            let file = file_of(pawn_sq);
            if file != 0 && file != 7 {
                return false;
            }
            let Some(owner) = self.board[pawn_sq as usize].map(|p| p.color) else {
                return false;
            };
            let defender = self.king_sq(owner.other());
            if file_of(defender) != file {
                return false;
            }
            return match owner {
                Color::White => rank_of(defender) > rank_of(pawn_sq),
                Color::Black => rank_of(defender) < rank_of(pawn_sq),
            };
        }

        false
    }

    /// Draw by the fifty-move rule, by repetition, or by material.
    pub fn is_draw_with(&self, repetition_threshold: usize) -> bool {
        self.is_fifty_move_draw()
            || self.count_repetitions(0) >= repetition_threshold
            || self.is_insufficient_material()
    }

    pub fn is_draw(&self) -> bool {
        self.is_draw_with(DEFAULT_REPETITION_THRESHOLD)
    }

    // =========================================================================
    // Consistency
    // =========================================================================

    /// Hash recomputed from the mailbox and state flags.
    pub fn compute_hash(&self) -> u64 {
        let mut hash = 0;
        for sq in 0..64u8 {
            if let Some(piece) = self.board[sq as usize] {
                hash ^= ZOBRIST.piece_key(piece, sq);
            }
        }
        hash ^= ZOBRIST.side_key(self.side_to_move);
        hash ^= ZOBRIST.castling_key(self.castling.0);
        if let Some(ep) = self.en_passant {
            hash ^= ZOBRIST.ep_key(ep % 8);
        }
        hash
    }

    /// (pawn hash, mirror pawn hash) recomputed from the mailbox.
    pub fn compute_pawn_hashes(&self) -> (u64, u64) {
        let mut pawn = 0;
        let mut mirror = 0;
        for sq in 0..64u8 {
            if let Some(piece) = self.board[sq as usize]
                && matches!(piece.kind, PieceKind::Pawn | PieceKind::King)
            {
                pawn ^= ZOBRIST.piece_key(piece, sq);
                mirror ^= ZOBRIST.mirror_piece_key(piece, sq);
            }
        }
        (pawn, mirror)
    }

    /// Checks that bitboards, counts, mailbox and hashes agree.
    pub fn is_consistent(&self) -> bool {
        let mut pieces = [Bitboard::EMPTY; 6];
        let mut colors = [Bitboard::EMPTY; 2];
        let mut counts = [0u8; 12];
        for sq in 0..64u8 {
            if let Some(piece) = self.board[sq as usize] {
                pieces[piece.kind.idx()].set(sq);
                colors[piece.color.idx()].set(sq);
                counts[piece.idx()] += 1;
            }
        }
        pieces == self.pieces
            && colors == self.colors
            && counts == self.counts
            && (colors[0] & colors[1]).is_empty()
            && self.hash == self.compute_hash()
            && (self.pawn_hash, self.mirror_pawn_hash) == self.compute_pawn_hashes()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..8u8).rev() {
            write!(f, "{} ", rank + 1)?;
            for file in 0..8u8 {
                let c = self.board[(rank * 8 + file) as usize].map_or('.', |p| p.to_char());
                write!(f, " {c}")?;
            }
            writeln!(f)?;
        }
        writeln!(f, "   a b c d e f g h")?;
        writeln!(f)?;
        writeln!(f, "Fen: {}", self.to_fen())?;
        write!(f, "Key: {:016X}", self.hash)
    }
}

#[cfg(test)]
#[path = "board_tests.rs"]
mod board_tests;
