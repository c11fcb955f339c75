//! Optional endgame tablebase collaborator.
//!
//! The search only consults a tablebase through this trait; with none
//! configured it falls back to normal search.

use crate::{board::Position, types::Move};

/// Game-theoretic result for the side to move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Wdl {
    Loss,
    Draw,
    Win,
}

pub trait Tablebase: Send + Sync {
    /// Largest total piece count (kings included) the tables cover.
    fn max_pieces(&self) -> u32;

    /// Win/draw/loss for the side to move, `None` if unknown.
    fn probe_wdl(&self, pos: &Position) -> Option<Wdl>;

    /// Moves that preserve the best achievable result, `None` if unknown.
    fn probe_best_moves(&self, pos: &Position) -> Option<Vec<Move>>;
}
