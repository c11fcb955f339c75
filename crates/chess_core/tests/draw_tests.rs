//! Tests for draw detection in chess
//!
//! This module tests all draw conditions:
//! - Stalemate
//! - Fifty-move rule
//! - Threefold repetition
//! - Insufficient material

use chess_core::{Color, PieceKind, Position, legal_moves, legal_moves_into, parse_uci_move};

fn fen(s: &str) -> Position {
    Position::from_fen(s).unwrap()
}

// =============================================================================
// Stalemate Tests
// =============================================================================

#[test]
fn test_stalemate_king_in_corner() {
    // Black king in corner, white queen stalemates
    // Position: Black king on a8, White queen on b6, White king on c7
    let pos = fen("k7/2K5/1Q6/8/8/8/8/8 b - - 0 1");

    let mut moves = Vec::new();
    legal_moves_into(&pos, &mut moves);

    assert!(moves.is_empty(), "Stalemate position should have no legal moves");
    assert!(
        !pos.in_check() && pos.side_to_move() == Color::Black,
        "Stalemate means king is not in check"
    );
}

#[test]
fn test_stalemate_king_and_pawn_endgame() {
    // Classic king and pawn vs king stalemate
    // White king on g6, white pawn on g7, black king on g8
    let pos = fen("6k1/6P1/6K1/8/8/8/8/8 b - - 0 1");

    let mut moves = Vec::new();
    legal_moves_into(&pos, &mut moves);

    assert!(moves.is_empty(), "Stalemate position should have no legal moves");
    assert!(
        !pos.in_check() && pos.side_to_move() == Color::Black,
        "Stalemate means king is not in check"
    );
}

// =============================================================================
// Fifty-Move Rule Tests
// =============================================================================

#[test]
fn test_fifty_move_rule_at_100_halfmoves() {
    // Position with halfmove clock at 100 (50 full moves without pawn move or capture)
    let pos = fen("8/8/8/4k3/8/4K3/8/8 w - - 100 60");

    assert!(
        pos.is_fifty_move_draw(),
        "Position with halfmove_clock=100 should be a draw"
    );
}

#[test]
fn test_fifty_move_rule_at_99_halfmoves() {
    // Position with halfmove clock at 99 (not yet 50 full moves)
    let pos = fen("8/8/8/4k3/8/4K3/8/8 w - - 99 60");

    assert!(
        !pos.is_fifty_move_draw(),
        "Position with halfmove_clock=99 should not be a draw yet"
    );
}

#[test]
fn test_fifty_move_rule_reset_on_pawn_move() {
    // Position with pawn on e2 and king on d3 (not blocking the pawn)
    let mut pos = fen("8/8/8/4k3/8/3K4/4P3/8 w - - 99 60");

    let moves = legal_moves(&pos);
    let pawn_move = moves
        .iter()
        .find(|m| pos.piece_at(m.from()).is_some_and(|p| p.kind == PieceKind::Pawn))
        .copied()
        .expect("Should have a pawn move available");
    pos.make_move(pawn_move);

    assert!(
        !pos.is_fifty_move_draw(),
        "Pawn move should reset halfmove clock"
    );
    assert_eq!(
        pos.halfmove_clock(),
        0,
        "Halfmove clock should be 0 after pawn move"
    );
}

#[test]
fn test_fifty_move_rule_reached_by_quiet_move() {
    let mut pos = fen("8/8/8/4k3/8/3K4/4P3/8 w - - 99 60");
    let king_move = parse_uci_move(&pos, "d3c3").unwrap();
    pos.make_move(king_move);
    assert!(pos.is_fifty_move_draw());
    assert!(pos.is_draw());
    pos.unmake_move();
    assert!(!pos.is_draw());
}

// =============================================================================
// Insufficient Material Tests
// =============================================================================

#[test]
fn test_insufficient_material_king_vs_king() {
    // Just two kings
    let pos = fen("8/8/8/4k3/8/4K3/8/8 w - - 0 1");

    assert!(
        pos.is_insufficient_material(),
        "King vs King is insufficient material"
    );
}

#[test]
fn test_insufficient_material_king_bishop_vs_king() {
    // King and bishop vs king
    let pos = fen("8/8/8/4k3/8/4KB2/8/8 w - - 0 1");

    assert!(
        pos.is_insufficient_material(),
        "King + Bishop vs King is insufficient material"
    );
}

#[test]
fn test_insufficient_material_king_knight_vs_king() {
    // King and knight vs king
    let pos = fen("8/8/8/4k3/8/4K3/6N1/8 w - - 0 1");

    assert!(
        pos.is_insufficient_material(),
        "King + Knight vs King is insufficient material"
    );
}

#[test]
fn test_insufficient_material_king_vs_king_bishop() {
    // King vs king and bishop (symmetric test)
    let pos = fen("8/8/4b3/4k3/8/4K3/8/8 w - - 0 1");

    assert!(
        pos.is_insufficient_material(),
        "King vs King + Bishop is insufficient material"
    );
}

#[test]
fn test_insufficient_material_king_vs_king_knight() {
    // King vs king and knight (symmetric test)
    let pos = fen("8/8/4n3/4k3/8/4K3/8/8 w - - 0 1");

    assert!(
        pos.is_insufficient_material(),
        "King vs King + Knight is insufficient material"
    );
}

#[test]
fn test_insufficient_material_same_color_bishops() {
    // King + light-squared bishop vs King + light-squared bishop
    // Both bishops on light squares (e.g., c1 and f8)
    let pos = fen("5b2/8/8/4k3/8/4K3/8/2B5 w - - 0 1");

    assert!(
        pos.is_insufficient_material(),
        "K+B vs K+B with same color bishops is insufficient material"
    );
}

#[test]
fn test_sufficient_material_opposite_color_bishops() {
    // King + light-squared bishop vs King + dark-squared bishop
    // White bishop on c1 (dark), Black bishop on c8 (light)
    // c1: file=2, rank=0, sum=2 (even = dark square)
    // c8: file=2, rank=7, sum=9 (odd = light square)
    let pos = fen("2b5/8/8/4k3/8/4K3/8/2B5 w - - 0 1");

    assert!(
        !pos.is_insufficient_material(),
        "K+B vs K+B with opposite color bishops is sufficient material (mate is possible)"
    );
}

#[test]
fn test_sufficient_material_with_pawn() {
    // King + pawn vs King
    let pos = fen("8/8/8/4k3/8/4K3/4P3/8 w - - 0 1");

    assert!(
        !pos.is_insufficient_material(),
        "King + Pawn vs King is sufficient material"
    );
}

#[test]
fn test_sufficient_material_with_rook() {
    // King + rook vs King
    let pos = fen("8/8/8/4k3/8/4K3/8/4R3 w - - 0 1");

    assert!(
        !pos.is_insufficient_material(),
        "King + Rook vs King is sufficient material"
    );
}

#[test]
fn test_sufficient_material_with_queen() {
    // King + queen vs King
    let pos = fen("8/8/8/4k3/8/4K3/8/4Q3 w - - 0 1");

    assert!(
        !pos.is_insufficient_material(),
        "King + Queen vs King is sufficient material"
    );
}

#[test]
fn test_sufficient_material_two_knights() {
    // King + two knights vs King - technically sufficient (though mate is difficult)
    let pos = fen("8/8/8/4k3/8/4K3/3NN3/8 w - - 0 1");

    assert!(
        !pos.is_insufficient_material(),
        "King + 2 Knights vs King is sufficient material (can't force mate but position isn't drawn)"
    );
}

// =============================================================================
// Position Hash Tests (for threefold repetition)
// =============================================================================

#[test]
fn test_position_hash_same_position() {
    let pos1 = Position::startpos();
    let pos2 = Position::startpos();

    assert_eq!(
        pos1.hash(),
        pos2.hash(),
        "Same positions should have same hash"
    );
}

#[test]
fn test_position_hash_different_side_to_move() {
    let pos1 = fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
    let pos2 = fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 0 1");

    assert_ne!(
        pos1.hash(),
        pos2.hash(),
        "Positions with different side to move should have different hashes"
    );
}

#[test]
fn test_position_hash_different_castling_rights() {
    let pos1 = fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
    let pos2 = fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w Kq - 0 1");

    assert_ne!(
        pos1.hash(),
        pos2.hash(),
        "Positions with different castling rights should have different hashes"
    );
}

#[test]
fn test_position_hash_different_en_passant() {
    let pos1 = fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1");
    let pos2 = fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1");

    assert_ne!(
        pos1.hash(),
        pos2.hash(),
        "Positions with different en passant squares should have different hashes"
    );
}

#[test]
fn test_position_hash_same_after_move_sequence() {
    // Test that returning to the same position produces the same hash
    // We'll test knights shuffling back to original position

    // Position after 1.e4 e5 2.Nf3 Nc6
    let pos1 = fen("r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3");
    let hash1 = pos1.hash();

    // Same position reached again after 3.Ng1 Nb8 4.Nf3 Nc6
    // The board is identical, only halfmove clock differs (which should not affect hash)
    let pos2 = fen("r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 6 5");
    let hash2 = pos2.hash();

    // Same position (different halfmove clock but hash ignores that)
    assert_eq!(
        hash1, hash2,
        "Same board position should produce same hash regardless of halfmove clock"
    );
}

#[test]
fn test_threefold_repetition_detection() {
    // Position after 1.e4 e5 2.Nf3 Nc6, then knights shuffle out and back
    let mut pos = fen("r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3");
    let start_hash = pos.hash();
    let shuffle = ["f3g1", "c6b8", "g1f3", "b8c6"];

    for txt in shuffle {
        let mv = parse_uci_move(&pos, txt).unwrap();
        pos.make_move(mv);
    }
    assert_eq!(pos.hash(), start_hash);
    assert_eq!(pos.count_repetitions(0), 1, "Position should appear twice after one repetition");
    assert!(!pos.is_draw());

    for txt in shuffle {
        let mv = parse_uci_move(&pos, txt).unwrap();
        pos.make_move(mv);
    }
    assert_eq!(pos.count_repetitions(0), 2, "Position should appear three times (threefold repetition)");
    assert!(pos.is_draw());
}

#[test]
fn test_repetition_before_root_ignored() {
    let mut pos = fen("r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3");
    for txt in ["f3g1", "c6b8", "g1f3", "b8c6"] {
        let mv = parse_uci_move(&pos, txt).unwrap();
        pos.make_move(mv);
    }
    assert_eq!(pos.count_repetitions(0), 1);
    assert_eq!(pos.count_repetitions(1), 0, "Positions below `since` are not counted");
}

#[test]
fn test_repetition_stops_at_capture() {
    // The capture resets the clock, so nothing before it can repeat
    let mut pos = fen("4k3/8/8/3p4/8/8/8/3QK3 w - - 0 1");
    for txt in ["d1d5", "e8e7", "d5d1", "e7e8", "d1d5", "e8e7", "d5d1", "e7e8"] {
        let mv = parse_uci_move(&pos, txt).unwrap();
        pos.make_move(mv);
    }
    assert_eq!(pos.halfmove_clock(), 7);
    assert_eq!(pos.count_repetitions(0), 1);
}

// =============================================================================
// Integration Tests - Not Checkmate Scenarios
// =============================================================================

#[test]
fn test_checkmate_is_not_stalemate() {
    // Scholar's mate position - this is checkmate, not stalemate
    let pos = fen("r1bqkb1r/pppp1Qpp/2n2n2/4p3/2B1P3/8/PPPP1PPP/RNB1K1NR b KQkq - 0 4");

    let mut moves = Vec::new();
    legal_moves_into(&pos, &mut moves);

    assert!(moves.is_empty(), "Checkmate position should have no legal moves");
    assert!(
        pos.in_check() && pos.side_to_move() == Color::Black,
        "Checkmate means king IS in check"
    );
}

#[test]
fn test_check_is_not_checkmate() {
    // Simple check position - not checkmate
    let pos = fen("rnbqkbnr/ppppp1pp/8/5p1Q/4P3/8/PPPP1PPP/RNB1KBNR b KQkq - 1 2");

    let mut moves = Vec::new();
    legal_moves_into(&pos, &mut moves);

    assert!(!moves.is_empty(), "Check position should have legal moves");
    assert!(
        pos.in_check() && pos.side_to_move() == Color::Black,
        "Black king should be in check"
    );
}
