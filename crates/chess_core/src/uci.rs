//! UCI text helpers shared by front ends and tests.

use crate::{board::Position, error::FenError, movegen::legal_moves, types::*};

/// Resolve long algebraic text against the legal moves so the move kind
/// (castle, en passant, promotion) comes from the generator.
pub fn parse_uci_move(pos: &Position, txt: &str) -> Option<Move> {
    let txt = txt.trim().to_ascii_lowercase();
    if txt.len() < 4 || txt.len() > 5 {
        return None;
    }
    let from = coord_to_sq(&txt[0..2])?;
    let to = coord_to_sq(&txt[2..4])?;
    let promo = match txt.as_bytes().get(4) {
        Some(&c) => Some(PieceKind::from_char(c as char)?),
        None => None,
    };

    legal_moves(pos)
        .into_iter()
        .find(|m| m.from() == from && m.to() == to && m.promotion() == promo)
}

/// Apply the arguments of a `position` command:
/// `startpos [moves ...]` or `fen <fields> [moves ...]`.
///
/// A malformed FEN leaves `pos` untouched. An illegal move is logged and the
/// remaining moves are dropped.
pub fn set_position_from_uci(pos: &mut Position, args: &[&str]) -> Result<(), FenError> {
    let moves_at = args.iter().position(|&a| a == "moves").unwrap_or(args.len());
    let (setup, moves) = args.split_at(moves_at);

    let mut next = match setup.first() {
        Some(&"fen") => Position::from_fen(&setup[1..].join(" "))?,
        _ => Position::startpos(),
    };

    for txt in moves.iter().skip(1) {
        match parse_uci_move(&next, txt) {
            Some(mv) => next.make_move(mv),
            None => {
                log::warn!("illegal move '{txt}' in position command, ignoring the rest");
                break;
            }
        }
    }

    *pos = next;
    Ok(())
}

#[cfg(test)]
#[path = "uci_tests.rs"]
mod uci_tests;
