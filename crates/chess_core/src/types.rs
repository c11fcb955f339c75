use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub const ALL: [Color; 2] = [Color::White, Color::Black];

    #[inline(always)]
    pub fn other(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    #[inline(always)]
    pub fn idx(self) -> usize {
        self as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    pub const ALL: [PieceKind; 6] = [
        PieceKind::Pawn,
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Rook,
        PieceKind::Queen,
        PieceKind::King,
    ];

    #[inline(always)]
    pub fn idx(self) -> usize {
        self as usize
    }

    /// Exchange value in centipawns, used by SEE and capture ordering.
    #[inline]
    pub fn value(self) -> i32 {
        match self {
            PieceKind::Pawn => 100,
            PieceKind::Knight => 320,
            PieceKind::Bishop => 330,
            PieceKind::Rook => 500,
            PieceKind::Queen => 900,
            PieceKind::King => 20_000,
        }
    }

    pub fn to_char(self) -> char {
        match self {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        }
    }

    pub fn from_char(c: char) -> Option<PieceKind> {
        match c.to_ascii_lowercase() {
            'p' => Some(PieceKind::Pawn),
            'n' => Some(PieceKind::Knight),
            'b' => Some(PieceKind::Bishop),
            'r' => Some(PieceKind::Rook),
            'q' => Some(PieceKind::Queen),
            'k' => Some(PieceKind::King),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Piece {
    pub color: Color,
    pub kind: PieceKind,
}

impl Piece {
    pub const fn new(color: Color, kind: PieceKind) -> Self {
        Self { color, kind }
    }

    /// Dense index in 0..12, white pieces first.
    #[inline(always)]
    pub fn idx(self) -> usize {
        self.color.idx() * 6 + self.kind.idx()
    }

    /// FEN letter: uppercase for white.
    pub fn to_char(self) -> char {
        let c = self.kind.to_char();
        match self.color {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }

    pub fn from_char(c: char) -> Option<Piece> {
        let kind = PieceKind::from_char(c)?;
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        Some(Piece { color, kind })
    }
}

/// What a move does besides relocating a piece.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MoveKind {
    Normal = 0,
    Castle = 1,
    DoublePawnPush = 2,
    EnPassant = 3,
    Capture = 4,
    PromoteKnight = 5,
    PromoteBishop = 6,
    PromoteRook = 7,
    PromoteQueen = 8,
}

impl MoveKind {
    #[inline]
    fn from_bits(bits: u16) -> MoveKind {
        match bits {
            1 => MoveKind::Castle,
            2 => MoveKind::DoublePawnPush,
            3 => MoveKind::EnPassant,
            4 => MoveKind::Capture,
            5 => MoveKind::PromoteKnight,
            6 => MoveKind::PromoteBishop,
            7 => MoveKind::PromoteRook,
            8 => MoveKind::PromoteQueen,
            _ => MoveKind::Normal,
        }
    }

    pub fn promotion(kind: PieceKind) -> MoveKind {
        match kind {
            PieceKind::Knight => MoveKind::PromoteKnight,
            PieceKind::Bishop => MoveKind::PromoteBishop,
            PieceKind::Rook => MoveKind::PromoteRook,
            _ => MoveKind::PromoteQueen,
        }
    }
}

/// A move packed into 16 bits: source (6) | destination (6) | kind (4).
///
/// Promotions that also capture carry a promotion kind; use
/// `Position::is_capture` to ask whether a move removes an enemy piece.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Move(u16);

impl Move {
    /// Sentinel used for null-move pruning and "no move" slots.
    pub const NULL: Move = Move(0);

    #[inline(always)]
    pub fn new(from: u8, to: u8, kind: MoveKind) -> Self {
        Move((from as u16) | ((to as u16) << 6) | ((kind as u16) << 12))
    }

    #[inline(always)]
    pub fn from(self) -> u8 {
        (self.0 & 0x3F) as u8
    }

    #[inline(always)]
    pub fn to(self) -> u8 {
        ((self.0 >> 6) & 0x3F) as u8
    }

    #[inline(always)]
    pub fn kind(self) -> MoveKind {
        MoveKind::from_bits(self.0 >> 12)
    }

    #[inline(always)]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn promotion(self) -> Option<PieceKind> {
        match self.kind() {
            MoveKind::PromoteKnight => Some(PieceKind::Knight),
            MoveKind::PromoteBishop => Some(PieceKind::Bishop),
            MoveKind::PromoteRook => Some(PieceKind::Rook),
            MoveKind::PromoteQueen => Some(PieceKind::Queen),
            _ => None,
        }
    }

    #[inline]
    pub fn is_promotion(self) -> bool {
        self.promotion().is_some()
    }

    #[inline(always)]
    pub fn raw(self) -> u16 {
        self.0
    }

    #[inline(always)]
    pub fn from_raw(raw: u16) -> Self {
        Move(raw)
    }
}

impl fmt::Debug for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return write!(f, "Move(null)");
        }
        write!(f, "Move({} {:?})", self, self.kind())
    }
}

impl fmt::Display for Move {
    /// Long algebraic (UCI) notation, `0000` for the null move.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return write!(f, "0000");
        }
        write!(f, "{}{}", sq_to_coord(self.from()), sq_to_coord(self.to()))?;
        if let Some(p) = self.promotion() {
            write!(f, "{}", p.to_char())?;
        }
        Ok(())
    }
}

// Helpers
pub fn file_of(sq: u8) -> i8 {
    (sq % 8) as i8
}
pub fn rank_of(sq: u8) -> i8 {
    (sq / 8) as i8
}
pub fn sq(file: i8, rank: i8) -> Option<u8> {
    if (0..8).contains(&file) && (0..8).contains(&rank) {
        Some((rank as u8) * 8 + (file as u8))
    } else {
        None
    }
}

/// Square as seen from the other side of the board (a1 <-> a8).
#[inline(always)]
pub fn flip_rank(sq: u8) -> u8 {
    sq ^ 56
}

pub fn sq_to_coord(sq: u8) -> String {
    let f = (b'a' + (sq % 8)) as char;
    let r = (b'1' + (sq / 8)) as char;
    format!("{f}{r}")
}

pub fn coord_to_sq(c: &str) -> Option<u8> {
    let b = c.as_bytes();
    if b.len() != 2 {
        return None;
    }
    let f = b[0];
    let r = b[1];
    if !(b'a'..=b'h').contains(&f) || !(b'1'..=b'8').contains(&r) {
        return None;
    }
    let file = f - b'a';
    let rank = r - b'1';
    Some(rank * 8 + file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_packs_squares_and_kind() {
        let mv = Move::new(12, 28, MoveKind::DoublePawnPush);
        assert_eq!(mv.from(), 12);
        assert_eq!(mv.to(), 28);
        assert_eq!(mv.kind(), MoveKind::DoublePawnPush);
        assert!(!mv.is_null());
        assert_eq!(mv.to_string(), "e2e4");
    }

    #[test]
    fn promotion_moves_report_piece() {
        let mv = Move::new(52, 60, MoveKind::PromoteKnight);
        assert_eq!(mv.promotion(), Some(PieceKind::Knight));
        assert_eq!(mv.to_string(), "e7e8n");
        assert_eq!(Move::new(8, 16, MoveKind::Normal).promotion(), None);
    }

    #[test]
    fn null_move_prints_as_zeroes() {
        assert!(Move::NULL.is_null());
        assert_eq!(Move::NULL.to_string(), "0000");
    }

    #[test]
    fn coordinates_round_trip() {
        assert_eq!(coord_to_sq("e4"), Some(28));
        assert_eq!(sq_to_coord(63), "h8");
        assert_eq!(coord_to_sq("i9"), None);
        assert_eq!(flip_rank(coord_to_sq("e2").unwrap()), coord_to_sq("e7").unwrap());
    }
}
