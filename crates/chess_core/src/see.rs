//! Static exchange evaluation.
//!
//! Plays out the capture sequence on one square, each side always
//! recapturing with its least valuable attacker, and answers whether the
//! side to move ends up at least `threshold` ahead. Sliders hidden behind a
//! capturing piece join the exchange as it is removed (x-rays).

use crate::attacks::{bishop_attacks, rook_attacks};
use crate::bitboard::Bitboard;
use crate::board::Position;
use crate::types::{Move, MoveKind, PieceKind};

impl Position {
    /// Whether the exchange started by `mv` gains at least `threshold`
    /// centipawns for the side to move. Castling, en passant and promotions
    /// count as an even exchange.
    pub fn see_ge(&self, mv: Move, threshold: i32) -> bool {
        if !matches!(
            mv.kind(),
            MoveKind::Normal | MoveKind::Capture | MoveKind::DoublePawnPush
        ) {
            return 0 >= threshold;
        }

        let from = mv.from();
        let to = mv.to();

        let victim = self.piece_at(to).map_or(0, |p| p.kind.value());
        let mut swap = victim - threshold;
        if swap < 0 {
            return false;
        }

        let Some(mover) = self.piece_at(from) else {
            return false;
        };
        swap = mover.kind.value() - swap;
        if swap <= 0 {
            return true;
        }

        let bishops_queens = self.pieces(PieceKind::Bishop) | self.pieces(PieceKind::Queen);
        let rooks_queens = self.pieces(PieceKind::Rook) | self.pieces(PieceKind::Queen);

        let mut occupied = self.occupied() ^ Bitboard::from_square(from);
        let mut attackers = self.attackers_to(to, occupied);
        let mut stm = self.side_to_move();
        let mut res = 1;

        loop {
            stm = stm.other();
            attackers &= occupied;

            let stm_attackers = attackers & self.color_bb(stm);
            if stm_attackers.is_empty() {
                break;
            }
            res ^= 1;

            let Some(kind) = [
                PieceKind::Pawn,
                PieceKind::Knight,
                PieceKind::Bishop,
                PieceKind::Rook,
                PieceKind::Queen,
            ]
            .into_iter()
            .find(|&k| (stm_attackers & self.pieces(k)).is_nonempty()) else {
                // Only the king is left: it may recapture unless the square
                // is still defended.
                let defended = (attackers & !self.color_bb(stm)).is_nonempty();
                return (if defended { res ^ 1 } else { res }) != 0;
            };

            swap = kind.value() - swap;
            if swap < res {
                break;
            }

            let attacker = (stm_attackers & self.pieces(kind)).first_square();
            occupied ^= Bitboard::from_square(attacker);

            match kind {
                PieceKind::Pawn | PieceKind::Bishop => {
                    attackers |= bishop_attacks(to, occupied) & bishops_queens;
                }
                PieceKind::Rook => {
                    attackers |= rook_attacks(to, occupied) & rooks_queens;
                }
                PieceKind::Queen => {
                    attackers |= (bishop_attacks(to, occupied) & bishops_queens)
                        | (rook_attacks(to, occupied) & rooks_queens);
                }
                _ => {}
            }
        }

        res != 0
    }

    /// Whether the exchange started by `mv` does not lose material.
    #[inline]
    pub fn non_negative_see(&self, mv: Move) -> bool {
        self.see_ge(mv, 0)
    }
}

#[cfg(test)]
#[path = "see_tests.rs"]
mod see_tests;
