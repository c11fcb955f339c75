use thiserror::Error;

/// Reasons a FEN record is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FenError {
    #[error("expected at least 4 fields, found {0}")]
    MissingFields(usize),
    #[error("invalid board layout: {0}")]
    BadLayout(String),
    #[error("invalid piece character '{0}'")]
    BadPiece(char),
    #[error("invalid side to move '{0}'")]
    BadSideToMove(String),
    #[error("invalid castling flag '{0}'")]
    BadCastling(char),
    #[error("invalid en passant square '{0}'")]
    BadEnPassant(String),
    #[error("invalid move counter '{0}'")]
    BadCounter(String),
    #[error("{color} must have exactly one king, found {count}")]
    KingCount { color: &'static str, count: u32 },
    #[error("the side not to move is in check")]
    OpponentInCheck,
}
