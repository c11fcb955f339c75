//! Principal variation search.
//!
//! One [`SearchWorker`] per thread runs iterative deepening over its own
//! copy of the root position. Workers share the transposition table, the
//! time control (and with it the stop flag) and the node counters through a
//! [`SearchContext`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chess_core::{Evaluator, Move, Position, Score, Tablebase, TimeControl, Wdl};

use crate::config::SearchParams;
use crate::ordering::{Heuristics, MoveContext, MovePicker, OrderContext};
use crate::tt::{Bound, TranspositionTable};

/// Deepest height a search may reach, quiescence included.
pub const MAX_PLY: usize = 128;

/// Progress after a completed iteration.
#[derive(Debug, Clone)]
pub struct SearchReport {
    pub depth: u8,
    pub seldepth: u8,
    pub score: Score,
    pub nodes: u64,
    pub nps: u64,
    pub elapsed: Duration,
    /// Permille of the transposition table in use
    pub hashfull: u32,
    pub pv: Vec<Move>,
}

pub type Reporter = Arc<dyn Fn(&SearchReport) + Send + Sync>;

#[derive(Default)]
#[repr(align(64))]
struct PaddedCounter(AtomicU64);

/// One node counter per thread, each on its own cache line.
pub struct NodeCounters {
    counters: Box<[PaddedCounter]>,
}

impl NodeCounters {
    pub fn new(threads: usize) -> Self {
        Self {
            counters: (0..threads.max(1)).map(|_| PaddedCounter::default()).collect(),
        }
    }

    #[inline]
    fn publish(&self, id: usize, nodes: u64) {
        if let Some(c) = self.counters.get(id) {
            c.0.store(nodes, Ordering::Relaxed);
        }
    }

    pub fn get(&self, id: usize) -> u64 {
        self.counters.get(id).map_or(0, |c| c.0.load(Ordering::Relaxed))
    }

    pub fn total(&self) -> u64 {
        self.counters.iter().map(|c| c.0.load(Ordering::Relaxed)).sum()
    }
}

/// Everything a worker needs from outside for one search.
#[derive(Clone)]
pub struct SearchContext {
    pub tt: Arc<TranspositionTable>,
    pub evaluator: Arc<dyn Evaluator>,
    pub tablebase: Option<Arc<dyn Tablebase>>,
    pub params: SearchParams,
    pub repetition_threshold: usize,
    pub tablebase_piece_limit: u32,
    pub time: TimeControl,
    pub nodes: Arc<NodeCounters>,
    pub reporter: Option<Reporter>,
    pub max_depth: u8,
    /// Restricts the root to these moves (e.g. tablebase-preserving moves)
    pub root_moves: Option<Vec<Move>>,
}

/// What one worker's iterative deepening settled on.
#[derive(Debug, Clone, Default)]
pub struct WorkerResult {
    pub best_move: Option<Move>,
    pub score: Score,
    /// Deepest completed iteration
    pub depth: u8,
    pub seldepth: u8,
    pub pv: Vec<Move>,
}

#[derive(Clone, Copy, Default)]
struct StackEntry {
    static_eval: Option<Score>,
    /// Move skipped by a singular-extension verification search
    excluded: Move,
    /// Move played from this height, as context for the next ply
    moved: Option<MoveContext>,
}

/// Triangular principal variation table.
struct PvTable {
    moves: Box<[[Move; MAX_PLY + 1]; MAX_PLY + 1]>,
    len: [usize; MAX_PLY + 1],
}

impl PvTable {
    fn new() -> Self {
        Self {
            moves: Box::new([[Move::NULL; MAX_PLY + 1]; MAX_PLY + 1]),
            len: [0; MAX_PLY + 1],
        }
    }

    #[inline]
    fn clear(&mut self, height: usize) {
        self.len[height] = height;
    }

    fn update(&mut self, height: usize, mv: Move) {
        let child_len = self.len[height + 1].max(height + 1);
        self.moves[height][height] = mv;
        for i in height + 1..child_len {
            self.moves[height][i] = self.moves[height + 1][i];
        }
        self.len[height] = child_len;
    }

    fn line(&self) -> Vec<Move> {
        self.moves[0][..self.len[0]].to_vec()
    }
}

fn build_lmr(params: &SearchParams) -> Box<[[i32; 64]; 64]> {
    let mut table = Box::new([[0; 64]; 64]);
    for (depth, row) in table.iter_mut().enumerate().skip(1) {
        for (count, r) in row.iter_mut().enumerate().skip(1) {
            let ln = (depth as f64).ln() * (count as f64).ln();
            *r = (params.lmr_base + ln / params.lmr_divisor) as i32;
        }
    }
    table
}

pub struct SearchWorker {
    id: usize,
    heuristics: Heuristics,
    pv: PvTable,
    stack: Vec<StackEntry>,
    lmr: Box<[[i32; 64]; 64]>,
    root_moves: Vec<Move>,
    nodes: u64,
    /// Excluded-move verification searches this search
    singular_searches: u64,
    seldepth: usize,
    root_height: usize,
    root_depth: i32,
}

impl SearchWorker {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            heuristics: Heuristics::new(),
            pv: PvTable::new(),
            stack: vec![StackEntry::default(); MAX_PLY + 1],
            lmr: build_lmr(&SearchParams::default()),
            root_moves: Vec::new(),
            nodes: 0,
            singular_searches: 0,
            seldepth: 0,
            root_height: 0,
            root_depth: 0,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Forget everything learned in earlier searches.
    pub fn clear(&mut self) {
        self.heuristics.clear();
    }

    fn prepare(&mut self, ctx: &SearchContext, pos: &Position) {
        self.lmr = build_lmr(&ctx.params);
        self.heuristics.clear_killers();
        self.stack.fill(StackEntry::default());
        self.nodes = 0;
        self.singular_searches = 0;
        self.seldepth = 0;
        self.root_height = pos.height();

        let legal = pos.generate_moves(false);
        self.root_moves = match &ctx.root_moves {
            Some(allowed) => {
                let kept: Vec<Move> = legal.iter().copied().filter(|m| allowed.contains(m)).collect();
                if kept.is_empty() { legal } else { kept }
            }
            None => legal,
        };
    }

    /// Iterative deepening from `pos` until the depth limit or a stop.
    pub fn iterate(&mut self, ctx: &SearchContext, pos: &mut Position) -> WorkerResult {
        self.prepare(ctx, pos);
        let mut result = WorkerResult {
            best_move: self.root_moves.first().copied(),
            ..WorkerResult::default()
        };
        if self.root_moves.is_empty() {
            result.score = if pos.in_check() { Score::mated_in(0) } else { Score::DRAW };
            return result;
        }

        let mut last_best = None;
        for depth in 1..=ctx.max_depth.max(1) {
            if self.id > 0 && depth > 3 && (depth as usize + self.id) % (1 + self.id.min(3)) == 0 {
                continue;
            }
            self.root_depth = depth as i32;

            let score = self.aspiration(ctx, pos, depth as i32, result.score);
            let stopped = ctx.time.is_stopped();
            // An interrupted iteration only counts if nothing completed yet
            if stopped && result.depth > 0 {
                break;
            }
            let pv = self.pv.line();
            if let Some(&best) = pv.first() {
                result.best_move = Some(best);
                result.score = score;
                result.pv = pv;
            }
            result.seldepth = self.seldepth.min(u8::MAX as usize) as u8;
            if stopped {
                break;
            }
            result.depth = depth;

            if self.id == 0 {
                self.report(ctx, &result);
                if last_best.is_some() {
                    let factor = if last_best == result.best_move { 0.9 } else { 1.3 };
                    ctx.time.scale_soft(factor);
                }
                last_best = result.best_move;
                if ctx.time.soft_limit().is_some() && self.root_moves.len() == 1 {
                    break;
                }
                if ctx.time.soft_expired() {
                    break;
                }
            }
        }
        result
    }

    fn report(&self, ctx: &SearchContext, result: &WorkerResult) {
        let elapsed = ctx.time.elapsed();
        let nodes = ctx.nodes.total();
        let report = SearchReport {
            depth: result.depth,
            seldepth: result.seldepth,
            score: result.score,
            nodes,
            nps: (nodes as f64 / elapsed.as_secs_f64().max(1e-3)) as u64,
            elapsed,
            hashfull: ctx.tt.hashfull(),
            pv: result.pv.clone(),
        };
        log::debug!(
            "depth {} seldepth {} score {} nodes {} singular {} pv {}",
            report.depth,
            report.seldepth,
            report.score,
            report.nodes,
            self.singular_searches,
            report.pv.iter().map(|m| m.to_string()).collect::<Vec<_>>().join(" ")
        );
        if let Some(reporter) = &ctx.reporter {
            reporter(&report);
        }
    }

    /// Search a window around the previous score, widening it geometrically
    /// until the result falls inside.
    fn aspiration(&mut self, ctx: &SearchContext, pos: &mut Position, depth: i32, prev: Score) -> Score {
        let p = &ctx.params;
        if depth < p.aspiration_min_depth || prev.is_mate_score() {
            return self.alpha_beta(ctx, pos, -Score::INFINITE, Score::INFINITE, depth, true);
        }

        let mut delta = p.aspiration_window;
        let mut alpha = prev.offset(-delta).max(-Score::INFINITE);
        let mut beta = prev.offset(delta).min(Score::INFINITE);
        loop {
            let score = self.alpha_beta(ctx, pos, alpha, beta, depth, true);
            if ctx.time.is_stopped() {
                return score;
            }
            if score <= alpha {
                alpha = score.offset(-delta).max(-Score::INFINITE);
            } else if score >= beta {
                beta = score.offset(delta).min(Score::INFINITE);
            } else {
                return score;
            }
            delta = delta.saturating_mul(2);
            if delta > 2 * Score::SCALE {
                alpha = -Score::INFINITE;
                beta = Score::INFINITE;
            }
        }
    }

    #[inline]
    fn height(&self, pos: &Position) -> usize {
        pos.height() - self.root_height
    }

    #[inline]
    fn count_node(&mut self, ctx: &SearchContext) {
        self.nodes += 1;
        ctx.nodes.publish(self.id, self.nodes);
    }

    /// Only the primary worker looks at the clock; everyone polls the flag.
    #[inline]
    fn should_stop(&self, ctx: &SearchContext) -> bool {
        if self.id == 0 && ctx.time.should_check_time(self.nodes) {
            return ctx.time.check(ctx.nodes.total());
        }
        ctx.time.is_stopped()
    }

    fn is_draw(&self, ctx: &SearchContext, pos: &Position) -> bool {
        pos.is_fifty_move_draw()
            || pos.is_insufficient_material()
            || pos.count_repetitions(self.root_height) >= 1
            || pos.count_repetitions(0) >= ctx.repetition_threshold
    }

    #[inline]
    fn evaluate(&self, ctx: &SearchContext, pos: &Position) -> Score {
        ctx.evaluator.evaluate(pos)
    }

    fn probe_wdl(&self, ctx: &SearchContext, pos: &Position) -> Option<Score> {
        let tb = ctx.tablebase.as_ref()?;
        if pos.total_pieces() > ctx.tablebase_piece_limit.min(tb.max_pieces()) {
            return None;
        }
        Some(match tb.probe_wdl(pos)? {
            Wdl::Win => Score::KNOWN_WIN,
            Wdl::Draw => Score::DRAW,
            Wdl::Loss => Score::KNOWN_LOSS,
        })
    }

    fn alpha_beta(
        &mut self,
        ctx: &SearchContext,
        pos: &mut Position,
        mut alpha: Score,
        mut beta: Score,
        depth: i32,
        pv_node: bool,
    ) -> Score {
        if depth <= 0 {
            return self.quiescence(ctx, pos, alpha, beta, pv_node);
        }

        let height = self.height(pos);
        self.pv.clear(height);
        self.count_node(ctx);
        if self.should_stop(ctx) {
            return Score::DRAW;
        }
        self.seldepth = self.seldepth.max(height);

        let root = height == 0;
        let in_check = pos.in_check();
        if !root {
            if self.is_draw(ctx, pos) {
                return Score::DRAW;
            }
            if height >= MAX_PLY {
                return if in_check { Score::DRAW } else { self.evaluate(ctx, pos) };
            }
            // Mate distance pruning
            alpha = alpha.max(Score::mated_in(height));
            beta = beta.min(Score::mate_in(height + 1));
            if alpha >= beta {
                return alpha;
            }
        }

        let p = &ctx.params;
        let excluded = self.stack[height].excluded;
        let tt_entry = if excluded.is_null() {
            ctx.tt.probe(pos.hash(), height)
        } else {
            None
        };
        let tt_move = tt_entry.and_then(|e| e.mv);
        if let Some(entry) = tt_entry {
            if !pv_node && entry.depth as i32 >= depth && entry.cuts(alpha, beta) {
                return entry.score;
            }
        }

        if !root && excluded.is_null() && pos.halfmove_clock() == 0 {
            if let Some(score) = self.probe_wdl(ctx, pos) {
                let stored_depth = (depth + 6).min(MAX_PLY as i32) as u8;
                ctx.tt.store(pos.hash(), height, None, score, stored_depth, Bound::Exact);
                return score;
            }
        }

        let static_eval = if in_check {
            None
        } else {
            Some(self.evaluate(ctx, pos))
        };
        self.stack[height].static_eval = static_eval;

        if !pv_node && excluded.is_null() && !beta.is_mate_score() {
            if let Some(eval) = static_eval {
                // Reverse futility
                if depth <= p.rfp_max_depth && eval.offset(-p.rfp_margin * depth) >= beta {
                    return eval;
                }

                let us = pos.side_to_move();
                if depth >= p.null_move_min_depth
                    && eval >= beta
                    && pos.has_non_pawn_material(us)
                    && pos.last_move().is_some_and(|m| !m.is_null())
                {
                    let r = p.null_move_base_reduction + depth / p.null_move_depth_divisor;
                    self.stack[height].moved = None;
                    pos.make_null_move();
                    let score = -self.alpha_beta(ctx, pos, -beta, -beta.offset(-1), depth - 1 - r, false);
                    pos.unmake_null_move();
                    if ctx.time.is_stopped() {
                        return Score::DRAW;
                    }
                    if score >= beta {
                        return if score.is_mate() { beta } else { score };
                    }
                }
            }
        }

        let moves = if root {
            self.root_moves.clone()
        } else {
            pos.generate_moves(false)
        };
        if moves.is_empty() {
            return if in_check {
                Score::mated_in(height)
            } else {
                Score::DRAW
            };
        }

        let order_ctx = OrderContext {
            tt_move,
            height,
            prev: height.checked_sub(1).and_then(|h| self.stack[h].moved),
        };
        let killers = self.heuristics.killers(height);
        let counter = self.heuristics.counter(order_ctx.prev);
        let picker = MovePicker::new(pos, moves, &self.heuristics, &order_ctx);

        let singular = tt_entry.filter(|e| {
            !root
                && excluded.is_null()
                && depth >= p.singular_min_depth
                && matches!(e.bound, Bound::Lower | Bound::Exact)
                && e.depth as i32 >= depth - p.singular_tt_depth_slack
                && !e.score.is_mate_score()
        });

        let original_alpha = alpha;
        let mut best = -Score::INFINITE;
        let mut best_move = None;
        let mut move_count = 0i32;
        let mut quiets_tried: Vec<Move> = Vec::new();

        for mv in picker {
            if mv == excluded {
                continue;
            }
            move_count += 1;
            let quiet = !pos.is_capture(mv) && !mv.is_promotion();
            let gives_check = pos.gives_check(mv);

            if !root && !in_check && !best.is_mated() {
                if quiet && !gives_check {
                    if depth <= p.lmp_max_depth
                        && quiets_tried.len() as i32 >= p.lmp_base + depth * depth
                    {
                        continue;
                    }
                    if let Some(eval) = static_eval {
                        if depth <= p.futility_max_depth
                            && eval.offset(p.futility_base + p.futility_margin * depth) <= alpha
                        {
                            continue;
                        }
                    }
                    if depth <= p.see_max_depth && !pos.see_ge(mv, p.see_quiet_margin * depth) {
                        continue;
                    }
                } else if !quiet
                    && depth <= p.see_max_depth
                    && !pos.see_ge(mv, p.see_capture_margin * depth)
                {
                    continue;
                }
            }

            let mut extension = 0;
            if let Some(entry) = singular.filter(|e| e.mv == Some(mv)) {
                let singular_beta = entry.score.offset(-p.singular_margin * depth);
                self.singular_searches += 1;
                self.stack[height].excluded = mv;
                let score = self.alpha_beta(
                    ctx,
                    pos,
                    singular_beta.offset(-1),
                    singular_beta,
                    ((depth - 1) / 2).max(1),
                    false,
                );
                self.stack[height].excluded = Move::NULL;
                if ctx.time.is_stopped() {
                    return Score::DRAW;
                }
                if score < singular_beta {
                    extension = 1;
                } else if singular_beta >= beta {
                    // Several moves beat beta
                    return singular_beta;
                }
            } else if gives_check && (height as i32) < 2 * self.root_depth && pos.non_negative_see(mv) {
                extension = 1;
            }

            self.stack[height].moved = pos.piece_at(mv.from()).map(|piece| (piece, mv.to()));
            pos.make_move(mv);
            let new_depth = depth - 1 + extension;

            let score = if move_count == 1 {
                -self.alpha_beta(ctx, pos, -beta, -alpha, new_depth, pv_node)
            } else {
                let mut reduction = 0;
                if depth >= p.lmr_min_depth
                    && move_count > p.lmr_min_moves
                    && quiet
                    && !in_check
                    && !gives_check
                {
                    reduction = self.lmr[depth.min(63) as usize][move_count.min(63) as usize];
                    if pv_node {
                        reduction -= 1;
                    }
                    if killers.contains(&mv) || mv == counter {
                        reduction -= 1;
                    }
                    reduction = reduction.min(new_depth - 1).max(0);
                }

                let mut score =
                    -self.alpha_beta(ctx, pos, -alpha.offset(1), -alpha, new_depth - reduction, false);
                if reduction > 0 && score > alpha {
                    score = -self.alpha_beta(ctx, pos, -alpha.offset(1), -alpha, new_depth, false);
                }
                if pv_node && score > alpha && score < beta {
                    score = -self.alpha_beta(ctx, pos, -beta, -alpha, new_depth, true);
                }
                score
            };
            pos.unmake_move();

            if ctx.time.is_stopped() {
                return Score::DRAW;
            }

            if score > best {
                best = score;
                if score > alpha {
                    best_move = Some(mv);
                    alpha = score;
                    if pv_node {
                        self.pv.update(height, mv);
                    }
                    if score >= beta {
                        if quiet {
                            self.heuristics
                                .update_quiet_cutoff(pos, mv, &quiets_tried, depth, &order_ctx);
                        }
                        break;
                    }
                }
            }
            if quiet {
                quiets_tried.push(mv);
            }
        }

        // Only the excluded move was legal
        if move_count == 0 {
            return alpha;
        }

        if excluded.is_null() {
            let bound = if best >= beta {
                Bound::Lower
            } else if pv_node && best > original_alpha {
                Bound::Exact
            } else {
                Bound::Upper
            };
            let stored_depth = depth.clamp(0, u8::MAX as i32) as u8;
            ctx.tt
                .store(pos.hash(), height, best_move.or(tt_move), best, stored_depth, bound);
        }
        best
    }

    fn quiescence(
        &mut self,
        ctx: &SearchContext,
        pos: &mut Position,
        mut alpha: Score,
        beta: Score,
        pv_node: bool,
    ) -> Score {
        let height = self.height(pos);
        self.pv.clear(height);
        self.count_node(ctx);
        if self.should_stop(ctx) {
            return Score::DRAW;
        }
        self.seldepth = self.seldepth.max(height);

        if self.is_draw(ctx, pos) {
            return Score::DRAW;
        }
        let in_check = pos.in_check();
        if height >= MAX_PLY {
            return if in_check { Score::DRAW } else { self.evaluate(ctx, pos) };
        }

        let tt_entry = ctx.tt.probe(pos.hash(), height);
        if let Some(entry) = tt_entry {
            if !pv_node && entry.cuts(alpha, beta) {
                return entry.score;
            }
        }
        let tt_move = tt_entry.and_then(|e| e.mv);

        let original_alpha = alpha;
        let mut best = if in_check {
            Score::mated_in(height)
        } else {
            let stand_pat = self.evaluate(ctx, pos);
            if stand_pat >= beta {
                return stand_pat;
            }
            alpha = alpha.max(stand_pat);
            stand_pat
        };

        // In check every evasion is searched, otherwise captures and promotions
        let moves = pos.generate_moves(!in_check);
        let picker = if in_check {
            let order_ctx = OrderContext {
                tt_move,
                height,
                prev: height.checked_sub(1).and_then(|h| self.stack[h].moved),
            };
            MovePicker::new(pos, moves, &self.heuristics, &order_ctx)
        } else {
            MovePicker::captures(pos, moves, tt_move)
        };

        let mut best_move = None;
        for mv in picker {
            if !in_check && !pos.see_ge(mv, 0) {
                continue;
            }

            self.stack[height].moved = pos.piece_at(mv.from()).map(|piece| (piece, mv.to()));
            pos.make_move(mv);
            let score = -self.quiescence(ctx, pos, -beta, -alpha, pv_node);
            pos.unmake_move();

            if ctx.time.is_stopped() {
                return Score::DRAW;
            }

            if score > best {
                best = score;
                if score > alpha {
                    best_move = Some(mv);
                    alpha = score;
                    if pv_node {
                        self.pv.update(height, mv);
                    }
                    if score >= beta {
                        break;
                    }
                }
            }
        }

        let bound = if best >= beta {
            Bound::Lower
        } else if pv_node && best > original_alpha {
            Bound::Exact
        } else {
            Bound::Upper
        };
        ctx.tt.store(pos.hash(), height, best_move.or(tt_move), best, 0, bound);
        best
    }
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod search_tests;
