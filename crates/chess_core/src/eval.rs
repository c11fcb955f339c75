//! The evaluator seam between the search and position scoring.

use crate::{board::Position, score::Score, types::*};

/// Static evaluation of a position from the side to move's point of view.
///
/// Implementations are shared read-only by every search thread.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, pos: &Position) -> Score;
}

/// Material count only. Handy as a baseline and in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct MaterialEvaluator;

/// Material balance in centipawns from the side to move's point of view.
pub fn material_balance(pos: &Position) -> i32 {
    let mut score = 0i32;
    for kind in [
        PieceKind::Pawn,
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Rook,
        PieceKind::Queen,
    ] {
        let white = pos.piece_count(Piece::new(Color::White, kind)) as i32;
        let black = pos.piece_count(Piece::new(Color::Black, kind)) as i32;
        score += (white - black) * kind.value();
    }
    match pos.side_to_move() {
        Color::White => score,
        Color::Black => -score,
    }
}

impl Evaluator for MaterialEvaluator {
    fn evaluate(&self, pos: &Position) -> Score {
        Score::from_centipawns(material_balance(pos))
    }
}
