//! Move ordering heuristics and the per-node move picker.
//!
//! Priority tiers, highest first: the table move, captures that do not
//! lose material (MVV-LVA inside the tier), queen promotions, the two killer
//! moves, the counter move, quiets by history, losing captures, and
//! under-promotions last.

use chess_core::{Color, Move, Piece, PieceKind, Position};

use crate::search::MAX_PLY;

const TT_MOVE: i32 = 1 << 30;
const GOOD_CAPTURE: i32 = 1 << 28;
const KILLER: i32 = 1 << 27;
const COUNTER_MOVE: i32 = 1 << 26;
const BAD_CAPTURE: i32 = -(1 << 28);
const UNDER_PROMOTION: i32 = -(1 << 29);

/// Saturation bound for history scores.
pub const MAX_HISTORY: i32 = 16_384;

/// Bonus for a quiet move that caused a cutoff at `depth`.
#[inline]
pub fn history_bonus(depth: i32) -> i32 {
    (32 * depth * depth).min(2048)
}

/// Move `entry` towards `bonus`, slowing down as it nears the bound.
#[inline]
fn gravity(entry: i32, bonus: i32) -> i32 {
    let bonus = bonus.clamp(-MAX_HISTORY, MAX_HISTORY);
    entry + bonus - entry * bonus.abs() / MAX_HISTORY
}

/// Victim value scaled over attacker value.
#[inline]
pub fn mvv_lva(pos: &Position, mv: Move) -> i32 {
    let victim = match pos.piece_at(mv.to()) {
        Some(p) => p.kind.value(),
        // En passant
        None if pos.is_capture(mv) => PieceKind::Pawn.value(),
        None => 0,
    };
    let attacker = pos.piece_at(mv.from()).map_or(0, |p| p.kind.value().min(1000));
    victim * 16 - attacker / 10
}

/// Butterfly history indexed by colour, from and to square.
pub struct HistoryTable {
    table: Box<[[[i32; 64]; 64]; 2]>,
}

impl HistoryTable {
    pub fn new() -> Self {
        Self {
            table: Box::new([[[0; 64]; 64]; 2]),
        }
    }

    #[inline]
    pub fn get(&self, color: Color, mv: Move) -> i32 {
        self.table[color.idx()][mv.from() as usize][mv.to() as usize]
    }

    pub fn update(&mut self, color: Color, mv: Move, bonus: i32) {
        let entry = &mut self.table[color.idx()][mv.from() as usize][mv.to() as usize];
        *entry = gravity(*entry, bonus);
    }

    pub fn clear(&mut self) {
        self.table.iter_mut().flatten().for_each(|row| row.fill(0));
    }
}

impl Default for HistoryTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Piece and destination of a move, the context key for continuation history.
pub type MoveContext = (Piece, u8);

#[inline]
fn context_index(ctx: MoveContext) -> usize {
    ctx.0.idx() * 64 + ctx.1 as usize
}

/// History of a move given the move played one ply earlier.
pub struct ContinuationHistory {
    table: Box<[i16]>,
}

impl ContinuationHistory {
    const SIDE: usize = 12 * 64;

    pub fn new() -> Self {
        Self {
            table: vec![0; Self::SIDE * Self::SIDE].into_boxed_slice(),
        }
    }

    #[inline]
    pub fn get(&self, prev: MoveContext, current: MoveContext) -> i32 {
        self.table[context_index(prev) * Self::SIDE + context_index(current)] as i32
    }

    pub fn update(&mut self, prev: MoveContext, current: MoveContext, bonus: i32) {
        let entry = &mut self.table[context_index(prev) * Self::SIDE + context_index(current)];
        *entry = gravity(*entry as i32, bonus) as i16;
    }

    pub fn clear(&mut self) {
        self.table.fill(0);
    }
}

impl Default for ContinuationHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a worker learns about move quality during a search.
pub struct Heuristics {
    killers: Box<[[Move; 2]; MAX_PLY + 1]>,
    /// Reply to the opponent's last move, by piece and destination
    counters: Box<[[Move; 64]; 12]>,
    pub history: HistoryTable,
    pub continuation: ContinuationHistory,
}

/// Per-node inputs to move scoring.
#[derive(Debug, Clone, Copy)]
pub struct OrderContext {
    pub tt_move: Option<Move>,
    pub height: usize,
    /// The opponent's previous move, if any
    pub prev: Option<MoveContext>,
}

impl Heuristics {
    pub fn new() -> Self {
        Self {
            killers: Box::new([[Move::NULL; 2]; MAX_PLY + 1]),
            counters: Box::new([[Move::NULL; 64]; 12]),
            history: HistoryTable::new(),
            continuation: ContinuationHistory::new(),
        }
    }

    pub fn clear(&mut self) {
        self.killers.fill([Move::NULL; 2]);
        self.counters.iter_mut().for_each(|row| row.fill(Move::NULL));
        self.history.clear();
        self.continuation.clear();
    }

    /// Killers are only meaningful for the current search's plies.
    pub fn clear_killers(&mut self) {
        self.killers.fill([Move::NULL; 2]);
    }

    #[inline]
    pub fn killers(&self, height: usize) -> [Move; 2] {
        self.killers[height.min(MAX_PLY)]
    }

    #[inline]
    pub fn counter(&self, prev: Option<MoveContext>) -> Move {
        prev.map_or(Move::NULL, |(p, to)| self.counters[p.idx()][to as usize])
    }

    /// Ordering priority of `mv` at a node.
    pub fn score_move(&self, pos: &Position, mv: Move, ctx: &OrderContext) -> i32 {
        if ctx.tt_move == Some(mv) {
            return TT_MOVE;
        }

        match mv.promotion() {
            Some(PieceKind::Queen) => return GOOD_CAPTURE + mvv_lva(pos, mv) + PieceKind::Queen.value(),
            Some(_) => return UNDER_PROMOTION + mvv_lva(pos, mv),
            None => {}
        }

        if pos.is_capture(mv) {
            let tier = if pos.see_ge(mv, 0) { GOOD_CAPTURE } else { BAD_CAPTURE };
            return tier + mvv_lva(pos, mv);
        }

        let killers = self.killers(ctx.height);
        if mv == killers[0] {
            return KILLER + 1;
        }
        if mv == killers[1] {
            return KILLER;
        }
        if mv == self.counter(ctx.prev) {
            return COUNTER_MOVE;
        }

        let us = pos.side_to_move();
        let mut score = self.history.get(us, mv);
        if let (Some(prev), Some(piece)) = (ctx.prev, pos.piece_at(mv.from())) {
            score += self.continuation.get(prev, (piece, mv.to()));
        }
        score
    }

    /// Reward the quiet move that failed high and punish the quiets tried
    /// before it.
    pub fn update_quiet_cutoff(
        &mut self,
        pos: &Position,
        best: Move,
        tried: &[Move],
        depth: i32,
        ctx: &OrderContext,
    ) {
        let height = ctx.height.min(MAX_PLY);
        if self.killers[height][0] != best {
            self.killers[height][1] = self.killers[height][0];
            self.killers[height][0] = best;
        }
        if let Some((p, to)) = ctx.prev {
            self.counters[p.idx()][to as usize] = best;
        }

        let us = pos.side_to_move();
        let bonus = history_bonus(depth);
        self.reward(pos, us, best, bonus, ctx.prev);
        for &mv in tried.iter().filter(|&&m| m != best) {
            self.reward(pos, us, mv, -bonus, ctx.prev);
        }
    }

    fn reward(&mut self, pos: &Position, us: Color, mv: Move, bonus: i32, prev: Option<MoveContext>) {
        self.history.update(us, mv, bonus);
        if let (Some(prev), Some(piece)) = (prev, pos.piece_at(mv.from())) {
            self.continuation.update(prev, (piece, mv.to()), bonus);
        }
    }
}

impl Default for Heuristics {
    fn default() -> Self {
        Self::new()
    }
}

/// Hands out moves best-first by selection sort, so nodes that cut off
/// early never pay for a full sort.
pub struct MovePicker {
    moves: Vec<Move>,
    scores: Vec<i32>,
    current: usize,
}

impl MovePicker {
    pub fn new(pos: &Position, moves: Vec<Move>, heuristics: &Heuristics, ctx: &OrderContext) -> Self {
        let scores = moves
            .iter()
            .map(|&mv| heuristics.score_move(pos, mv, ctx))
            .collect();
        Self {
            moves,
            scores,
            current: 0,
        }
    }

    /// Captures only, ordered by MVV-LVA with the table move first.
    pub fn captures(pos: &Position, moves: Vec<Move>, tt_move: Option<Move>) -> Self {
        let scores = moves
            .iter()
            .map(|&mv| {
                if tt_move == Some(mv) {
                    TT_MOVE
                } else {
                    mvv_lva(pos, mv) + mv.promotion().map_or(0, |k| k.value())
                }
            })
            .collect();
        Self {
            moves,
            scores,
            current: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

impl Iterator for MovePicker {
    type Item = Move;

    fn next(&mut self) -> Option<Move> {
        if self.current >= self.moves.len() {
            return None;
        }
        let mut best = self.current;
        for i in self.current + 1..self.moves.len() {
            if self.scores[i] > self.scores[best] {
                best = i;
            }
        }
        self.moves.swap(self.current, best);
        self.scores.swap(self.current, best);
        self.current += 1;
        Some(self.moves[self.current - 1])
    }
}

#[cfg(test)]
#[path = "ordering_tests.rs"]
mod ordering_tests;
