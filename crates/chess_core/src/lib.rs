pub mod attacks;
pub mod bitboard;
pub mod board;
pub mod error;
pub mod eval;
pub mod movegen;
pub mod perft;
pub mod score;
pub mod see;
pub mod tablebase;
pub mod time_control;
pub mod types;
pub mod uci;
pub mod zobrist;

// Re-export core game logic (not engine-specific)
pub use bitboard::*;
pub use board::*;
pub use error::FenError;
pub use eval::{Evaluator, MaterialEvaluator};
pub use movegen::*;
pub use perft::{perft, perft_divide};
pub use score::Score;
pub use tablebase::{Tablebase, Wdl};
pub use time_control::*;
pub use types::*;
pub use uci::*;
pub use zobrist::ZOBRIST;

// =============================================================================
// Engine trait
// =============================================================================

/// Result of a search operation
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The best move found (None if no legal moves)
    pub best_move: Option<Move>,
    /// Score from the side to move's perspective
    pub score: Score,
    /// Deepest completed iteration
    pub depth: u8,
    /// Nodes searched over all threads
    pub nodes: u64,
    /// Whether the search was cut short by a limit or a stop request
    pub stopped: bool,
    /// Principal variation, starting with `best_move`
    pub pv: Vec<Move>,
}

/// Trait for a searching engine driven by a front end.
pub trait Engine: Send {
    /// Search the position with the given search limits.
    fn search(&mut self, pos: &Position, limits: SearchLimits) -> SearchResult;

    /// Returns the engine's name for UCI identification
    fn name(&self) -> &str;

    /// Returns the engine's author for UCI identification
    fn author(&self) -> &str {
        "chess_core authors"
    }

    /// Reset internal state for a new game (clear hash tables, history, etc.)
    fn new_game(&mut self) {}

    /// Set a UCI option. Returns true if the option was recognized.
    fn set_option(&mut self, _name: &str, _value: &str) -> bool {
        false
    }
}
