//! Strictly legal move generation.
//!
//! Moves are produced legal by construction rather than filtered by
//! make/unmake:
//! - not in check: every piece may move to any square not holding one of
//!   our own pieces;
//! - single check: non-king moves must capture the checker or block the
//!   line between it and the king;
//! - double check: only king moves are generated.
//!
//! Pinned pieces stay on the line through their king, king moves are tested
//! against the occupancy with the king removed, and en passant is verified
//! by recomputing slider attacks after both pawns leave their squares.

use crate::attacks::{attack_map, between, bishop_attacks, king_attacks, line, pawn_attacks, rook_attacks};
use crate::bitboard::Bitboard;
use crate::board::{CastlingRights, Position};
use crate::types::*;

const PROMOTIONS: [PieceKind; 4] = [
    PieceKind::Queen,
    PieceKind::Knight,
    PieceKind::Rook,
    PieceKind::Bishop,
];

/// Generate all legal moves, returning a freshly allocated vector.
pub fn legal_moves(pos: &Position) -> Vec<Move> {
    let mut out = Vec::with_capacity(64);
    generate_moves(pos, false, &mut out);
    out
}

/// Generate all legal moves into the provided buffer, reusing it across calls.
pub fn legal_moves_into(pos: &Position, out: &mut Vec<Move>) {
    generate_moves(pos, false, out);
}

impl Position {
    /// Legal moves of the side to move; with `quiescent_only` just captures
    /// and promotions.
    pub fn generate_moves(&self, quiescent_only: bool) -> Vec<Move> {
        let mut out = Vec::with_capacity(if quiescent_only { 16 } else { 64 });
        generate_moves(self, quiescent_only, &mut out);
        out
    }

    /// Our pieces that are the only blocker between our king and an enemy slider.
    pub fn pinned(&self, us: Color) -> Bitboard {
        let them = us.other();
        let king = self.king_sq(us);
        let occupied = self.occupied();
        let queens = self.pieces_of(them, PieceKind::Queen);
        let snipers = (rook_attacks(king, Bitboard::EMPTY)
            & (self.pieces_of(them, PieceKind::Rook) | queens))
            | (bishop_attacks(king, Bitboard::EMPTY)
                & (self.pieces_of(them, PieceKind::Bishop) | queens));

        let mut pinned = Bitboard::EMPTY;
        for sniper in snipers {
            let blockers = between(king, sniper) & occupied;
            if blockers.is_nonempty() && !blockers.more_than_one() {
                pinned |= blockers & self.color_bb(us);
            }
        }
        pinned
    }
}

/// Generate legal moves into `out` (cleared first).
pub fn generate_moves(pos: &Position, quiescent_only: bool, out: &mut Vec<Move>) {
    out.clear();

    let us = pos.side_to_move();
    let them = us.other();
    let king = pos.king_sq(us);
    let own = pos.color_bb(us);
    let enemy = pos.color_bb(them);
    let occupied = pos.occupied();
    let checkers = pos.checkers();

    let reachable = if quiescent_only { enemy } else { !own };
    gen_king(pos, king, reachable, enemy, out);

    if checkers.more_than_one() {
        return;
    }

    let targets = match checkers.lsb() {
        None => !own,
        Some(checker) => between(king, checker) | checkers,
    };
    let pinned = pos.pinned(us);

    gen_pawns(pos, us, king, targets, pinned, quiescent_only, out);

    for kind in [
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Rook,
        PieceKind::Queen,
    ] {
        let piece = Piece::new(us, kind);
        for from in pos.pieces_of(us, kind) {
            let mut dests = attack_map(piece, from, occupied) & targets & reachable;
            if pinned.contains(from) {
                dests &= line(king, from);
            }
            for to in dests {
                let kind = if enemy.contains(to) {
                    MoveKind::Capture
                } else {
                    MoveKind::Normal
                };
                out.push(Move::new(from, to, kind));
            }
        }
    }

    if checkers.is_empty() && !quiescent_only {
        gen_castles(pos, us, king, out);
    }
}

fn gen_king(pos: &Position, king: u8, reachable: Bitboard, enemy: Bitboard, out: &mut Vec<Move>) {
    let without_king = pos.occupied() ^ Bitboard::from_square(king);
    for to in king_attacks(king) & reachable {
        if (pos.attackers_to(to, without_king) & enemy).is_nonempty() {
            continue;
        }
        let kind = if enemy.contains(to) {
            MoveKind::Capture
        } else {
            MoveKind::Normal
        };
        out.push(Move::new(king, to, kind));
    }
}

fn push_promotions(from: u8, to: u8, out: &mut Vec<Move>) {
    for kind in PROMOTIONS {
        out.push(Move::new(from, to, MoveKind::promotion(kind)));
    }
}

fn gen_pawns(
    pos: &Position,
    us: Color,
    king: u8,
    targets: Bitboard,
    pinned: Bitboard,
    quiescent_only: bool,
    out: &mut Vec<Move>,
) {
    let enemy = pos.color_bb(us.other());
    let empty = !pos.occupied();
    let (push_rank, last_rank) = match us {
        Color::White => (Bitboard::RANK_3, Bitboard::RANK_8),
        Color::Black => (Bitboard::RANK_6, Bitboard::RANK_1),
    };

    for from in pos.pieces_of(us, PieceKind::Pawn) {
        let allowed = if pinned.contains(from) {
            targets & line(king, from)
        } else {
            targets
        };

        for to in pawn_attacks(from, us) & enemy & allowed {
            if last_rank.contains(to) {
                push_promotions(from, to, out);
            } else {
                out.push(Move::new(from, to, MoveKind::Capture));
            }
        }

        let single = Bitboard::from_square(from).forward(us) & empty;
        let double = (single & push_rank).forward(us) & empty;
        for to in single & allowed {
            if last_rank.contains(to) {
                push_promotions(from, to, out);
            } else if !quiescent_only {
                out.push(Move::new(from, to, MoveKind::Normal));
            }
        }
        if !quiescent_only {
            for to in double & allowed {
                out.push(Move::new(from, to, MoveKind::DoublePawnPush));
            }
        }

        if let Some(ep) = pos.en_passant()
            && pawn_attacks(from, us).contains(ep)
            && en_passant_is_legal(pos, us, king, from, ep)
        {
            out.push(Move::new(from, ep, MoveKind::EnPassant));
        }
    }
}

/// Both pawns vanish from their rank at once, so recompute every attack on
/// the king from scratch.
fn en_passant_is_legal(pos: &Position, us: Color, king: u8, from: u8, ep: u8) -> bool {
    let captured = ep ^ 8;
    let captured_bb = Bitboard::from_square(captured);
    if pos.piece_at(captured) != Some(Piece::new(us.other(), PieceKind::Pawn)) {
        return false;
    }
    let occupied =
        (pos.occupied() ^ Bitboard::from_square(from) ^ captured_bb) | Bitboard::from_square(ep);
    let attackers = pos.attackers_to(king, occupied) & pos.color_bb(us.other()) & !captured_bb;
    attackers.is_empty()
}

fn gen_castles(pos: &Position, us: Color, king: u8, out: &mut Vec<Move>) {
    let rights = pos.castling();
    let occupied = pos.occupied();
    let them = us.other();

    for (flag, rook_from, king_to) in [
        (CastlingRights::kingside(us), king + 3, king + 2),
        (CastlingRights::queenside(us), king.wrapping_sub(4), king.wrapping_sub(2)),
    ] {
        if !rights.has(flag) {
            continue;
        }
        if (between(king, rook_from) & occupied).is_nonempty() {
            continue;
        }
        let mut path = between(king, king_to) | Bitboard::from_square(king_to);
        if path.any(|sq| pos.is_square_attacked(sq, them)) {
            continue;
        }
        out.push(Move::new(king, king_to, MoveKind::Castle));
    }
}

#[cfg(test)]
#[path = "movegen_tests.rs"]
mod movegen_tests;
