use super::*;
use crate::movegen::legal_moves;

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

fn find_move(pos: &Position, uci: &str) -> Move {
    legal_moves(pos)
        .into_iter()
        .find(|m| m.to_string() == uci)
        .unwrap_or_else(|| panic!("{uci} is not legal in {}", pos.to_fen()))
}

#[test]
fn test_startpos_matches_start_fen() {
    let start = Position::startpos();
    let parsed = Position::from_fen(START_FEN).unwrap();
    assert_eq!(start.to_fen(), START_FEN);
    assert_eq!(start.hash(), parsed.hash());
    assert!(start.is_consistent());
}

#[test]
fn test_fen_round_trip() {
    for fen in [
        KIWIPETE,
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        "rnbqkbnr/pp1ppppp/8/2p5/4P3/8/PPPP1PPP/RNBQKBNR w KQkq c6 0 2",
        "4k3/8/8/8/8/8/8/4K2R b K - 37 80",
    ] {
        let pos = Position::from_fen(fen).unwrap();
        assert_eq!(pos.to_fen(), fen);
        assert!(pos.is_consistent());
    }
}

#[test]
fn test_fen_errors() {
    assert_eq!(
        Position::from_fen("8/8/8 w").unwrap_err(),
        FenError::MissingFields(2)
    );
    assert!(matches!(
        Position::from_fen("8/8/8/8/8/8/8 w - - 0 1"),
        Err(FenError::BadLayout(_))
    ));
    assert_eq!(
        Position::from_fen("4k3/8/8/8/8/8/8/4X2K w - - 0 1").unwrap_err(),
        FenError::BadPiece('X')
    );
    assert!(matches!(
        Position::from_fen("4k3/8/8/8/8/8/8/4K3 x - - 0 1"),
        Err(FenError::BadSideToMove(_))
    ));
    assert_eq!(
        Position::from_fen("4k3/8/8/8/8/8/8/4K3 w Z - 0 1").unwrap_err(),
        FenError::BadCastling('Z')
    );
    assert!(matches!(
        Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - e4 0 1"),
        Err(FenError::BadEnPassant(_))
    ));
    assert!(matches!(
        Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - - x 1"),
        Err(FenError::BadCounter(_))
    ));
    assert!(matches!(
        Position::from_fen("8/8/8/8/8/8/8/4K3 w - - 0 1"),
        Err(FenError::KingCount { count: 0, .. })
    ));
}

#[test]
fn test_fen_rejects_capturable_king() {
    assert_eq!(
        Position::from_fen("4k3/8/8/8/8/8/8/4R1K1 w - - 0 1").unwrap_err(),
        FenError::OpponentInCheck
    );
    assert_eq!(
        Position::from_fen("4k3/8/8/8/8/8/3p4/4K3 b - - 0 1").unwrap_err(),
        FenError::OpponentInCheck
    );
    // The side to move may be in check
    let pos = Position::from_fen("4k3/8/8/8/8/8/8/4R1K1 b - - 0 1").unwrap();
    assert!(pos.in_check());
    assert!(pos.generate_moves(false).iter().all(|m| pos.piece_at(m.to()).is_none()));
}

#[test]
fn test_fen_en_passant_rank_follows_side_to_move() {
    assert!(Position::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1").is_ok());
    assert!(matches!(
        Position::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d3 0 1"),
        Err(FenError::BadEnPassant(_))
    ));
    assert!(Position::from_fen("4k3/8/8/8/3Pp3/8/8/4K3 b - d3 0 1").is_ok());
    assert!(matches!(
        Position::from_fen("4k3/8/8/8/3Pp3/8/8/4K3 b - d6 0 1"),
        Err(FenError::BadEnPassant(_))
    ));
}

#[test]
fn test_fen_counters_are_bounded() {
    let max = Position::MAX_FEN_COUNTER;
    let mut pos = Position::from_fen(&format!("4k3/8/8/8/8/8/8/4K2R b - - {max} {max}")).unwrap();
    assert_eq!(pos.halfmove_clock(), max);
    assert_eq!(pos.fullmove_number(), max);
    let mv = pos.generate_moves(false)[0];
    pos.make_move(mv);
    assert_eq!(pos.halfmove_clock(), max + 1);
    assert_eq!(pos.fullmove_number(), max + 1);
    pos.unmake_move();
    assert_eq!(pos.fullmove_number(), max);

    for fen in [
        "4k3/8/8/8/8/8/8/4K3 w - - 65535 1",
        "4k3/8/8/8/8/8/8/4K3 w - - 0 65535",
        "4k3/8/8/8/8/8/8/4K3 w - - 0 70000",
    ] {
        assert!(matches!(Position::from_fen(fen), Err(FenError::BadCounter(_))), "{fen}");
    }
}

#[test]
fn test_castling_rights_dropped_without_rook() {
    let pos = Position::from_fen("4k3/8/8/8/8/8/8/4K3 w KQkq - 0 1").unwrap();
    assert_eq!(pos.castling(), CastlingRights::NONE);
}

#[test]
fn test_make_unmake_restores_everything() {
    let mut pos = Position::from_fen(KIWIPETE).unwrap();
    let before = pos.to_fen();
    let hash = pos.hash();
    let pawn_hashes = (pos.pawn_hash(), pos.mirror_pawn_hash());

    for mv in legal_moves(&pos) {
        pos.make_move(mv);
        assert!(pos.is_consistent(), "inconsistent after {mv}");
        pos.unmake_move();
        assert_eq!(pos.to_fen(), before, "fen differs after {mv}");
        assert_eq!(pos.hash(), hash);
        assert_eq!((pos.pawn_hash(), pos.mirror_pawn_hash()), pawn_hashes);
        assert!(pos.is_consistent());
    }
}

#[test]
fn test_incremental_hash_along_random_walk() {
    let mut pos = Position::from_fen(KIWIPETE).unwrap();
    let mut seed = 0x2545F4914F6CDD1Du64;
    for _ in 0..200 {
        let moves = legal_moves(&pos);
        if moves.is_empty() {
            break;
        }
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        let mv = moves[(seed % moves.len() as u64) as usize];
        pos.make_move(mv);
        assert_eq!(pos.hash(), pos.compute_hash(), "hash drift after {mv}");
        assert!(pos.is_consistent());
    }
}

#[test]
fn test_special_moves_update_state() {
    // Castling moves the rook and clears both rights
    let mut pos = Position::from_fen(KIWIPETE).unwrap();
    pos.make_move(find_move(&pos, "e1g1"));
    assert_eq!(pos.piece_at(5), Some(Piece::new(Color::White, PieceKind::Rook)));
    assert!(!pos.castling().has(CastlingRights::WHITE_KING));
    assert!(!pos.castling().has(CastlingRights::WHITE_QUEEN));
    assert!(pos.castling().has(CastlingRights::BLACK_KING));

    // En passant removes the pawn behind the target square
    let mut pos =
        Position::from_fen("rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3")
            .unwrap();
    let ep = find_move(&pos, "e5f6");
    assert_eq!(ep.kind(), MoveKind::EnPassant);
    assert!(pos.is_capture(ep));
    pos.make_move(ep);
    assert_eq!(pos.piece_at(37), None); // f5
    assert_eq!(pos.last_captured(), Some(Piece::new(Color::Black, PieceKind::Pawn)));
    assert_eq!(pos.halfmove_clock(), 0);

    // Promotion with capture
    let mut pos = Position::from_fen("1r2k3/P7/8/8/8/8/8/4K3 w - - 5 40").unwrap();
    let promo = find_move(&pos, "a7b8q");
    assert!(pos.is_capture(promo));
    pos.make_move(promo);
    assert_eq!(pos.piece_at(57), Some(Piece::new(Color::White, PieceKind::Queen)));
    assert_eq!(pos.piece_count(Piece::new(Color::Black, PieceKind::Rook)), 0);
    pos.unmake_move();
    assert_eq!(pos.piece_at(48), Some(Piece::new(Color::White, PieceKind::Pawn)));
    assert_eq!(pos.piece_at(57), Some(Piece::new(Color::Black, PieceKind::Rook)));
}

#[test]
fn test_null_move() {
    let mut pos =
        Position::from_fen("rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2")
            .unwrap();
    let hash = pos.hash();
    pos.make_null_move();
    assert_eq!(pos.side_to_move(), Color::Black);
    assert_eq!(pos.en_passant(), None);
    assert_eq!(pos.halfmove_clock(), 1);
    assert_eq!(pos.hash(), pos.compute_hash());
    assert_eq!(pos.last_move(), Some(Move::NULL));
    pos.unmake_null_move();
    assert_eq!(pos.hash(), hash);
    assert_eq!(pos.en_passant(), Some(44));
}

#[test]
fn test_mirror_pawn_hash_matches_flipped_position() {
    let pos = Position::from_fen("4k3/pp3p2/8/3P4/8/8/5PPP/6K1 w - - 0 1").unwrap();
    let flipped = Position::from_fen("6k1/5ppp/8/8/3p4/8/PP3P2/4K3 b - - 0 1").unwrap();
    assert_eq!(pos.mirror_pawn_hash(), flipped.pawn_hash());
    assert_eq!(flipped.mirror_pawn_hash(), pos.pawn_hash());
}

#[test]
fn test_repetition_counting() {
    let mut pos = Position::startpos();
    let shuffle = ["g1f3", "g8f6", "f3g1", "f6g8"];
    for uci in shuffle {
        pos.make_move(find_move(&pos, uci));
    }
    assert_eq!(pos.count_repetitions(0), 1);
    assert!(!pos.is_draw());
    // Searching from height 2 cannot see the start position
    assert_eq!(pos.count_repetitions(2), 0);

    for uci in shuffle {
        pos.make_move(find_move(&pos, uci));
    }
    assert_eq!(pos.count_repetitions(0), 2);
    assert!(pos.is_draw());
    assert!(!pos.is_draw_with(3));
}

#[test]
fn test_repetition_stops_at_null_move() {
    let mut pos = Position::startpos();
    pos.make_move(find_move(&pos, "g1f3"));
    pos.make_null_move();
    pos.make_move(find_move(&pos, "f3g1"));
    pos.make_null_move();
    assert_eq!(pos.count_repetitions(0), 0);
}

#[test]
fn test_rook_pawn_fortress_is_drawn() {
    // Black king sits in front of the a-pawn
    let pos = Position::from_fen("k7/8/8/P7/8/8/8/4K3 w - - 0 1").unwrap();
    assert!(pos.is_insufficient_material());
    // King beside the path does not hold
    let pos = Position::from_fen("2k5/8/8/P7/8/8/8/4K3 w - - 0 1").unwrap();
    assert!(!pos.is_insufficient_material());
    // Central pawn is never in the table
    let pos = Position::from_fen("4k3/8/8/4P3/8/8/8/4K3 w - - 0 1").unwrap();
    assert!(!pos.is_insufficient_material());
    // Black h-pawn, white king in front
    let pos = Position::from_fen("4k3/8/8/8/7p/8/8/7K b - - 0 1").unwrap();
    assert!(pos.is_insufficient_material());
}

#[test]
fn test_gives_check() {
    let mut pos = Position::from_fen("4k3/8/8/8/8/8/8/R3K3 w Q - 0 1").unwrap();
    assert!(pos.gives_check(find_move(&pos, "a1a8")));
    assert!(!pos.gives_check(find_move(&pos, "a1a2")));
    // Castling rook lands on d1, not on the e-file
    assert!(!pos.gives_check(find_move(&pos, "e1c1")));
    assert_eq!(pos.height(), 0);
}
