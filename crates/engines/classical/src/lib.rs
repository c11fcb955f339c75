//! Classical Chess Engine
//!
//! Lazy-SMP alpha-beta search over a shared lock-free transposition table,
//! with a tapered piece-square evaluator by default.
//!
//! Every thread searches the same root with its own move-ordering state and
//! a slightly different depth schedule; they only cooperate through the
//! transposition table. The primary thread owns the clock and its result is
//! the one reported.

pub mod config;
pub mod eval;
pub mod ordering;
pub mod search;
pub mod thread_pool;
pub mod tt;

use std::sync::Arc;

use chess_core::{Engine, Evaluator, Move, Position, SearchLimits, SearchResult, Tablebase};

pub use config::{ConfigError, SearchConfig, SearchParams};
pub use eval::ClassicalEvaluator;
pub use search::{Reporter, SearchReport, MAX_PLY};
pub use tt::TranspositionTable;

use search::{NodeCounters, SearchContext};
use thread_pool::ThreadPool;

/// Classical chess engine using Lazy-SMP principal variation search.
///
/// This engine uses:
/// - Iterative deepening with aspiration windows
/// - Null-move, futility, late-move and SEE pruning, late-move reductions
/// - Singular extensions on the transposition-table move
/// - Killer, counter-move, history and continuation-history ordering
/// - Optional endgame tablebase probing at the root and in the tree
pub struct ClassicalEngine {
    config: SearchConfig,
    tt: Arc<TranspositionTable>,
    evaluator: Arc<dyn Evaluator>,
    tablebase: Option<Arc<dyn Tablebase>>,
    pool: ThreadPool,
    reporter: Option<Reporter>,
}

impl Default for ClassicalEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassicalEngine {
    pub fn new() -> Self {
        Self::build(SearchConfig::default())
    }

    /// Engine with a validated configuration.
    pub fn with_config(config: SearchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: SearchConfig) -> Self {
        Self {
            tt: Arc::new(TranspositionTable::new(config.hash_mb)),
            evaluator: Arc::new(ClassicalEvaluator::new()),
            tablebase: None,
            pool: ThreadPool::new(config.threads),
            reporter: None,
            config,
        }
    }

    /// Replace the position evaluator.
    pub fn with_evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_tablebase(mut self, tablebase: Arc<dyn Tablebase>) -> Self {
        self.tablebase = Some(tablebase);
        self
    }

    /// Called by the primary thread after every completed iteration.
    pub fn set_reporter(&mut self, reporter: Option<Reporter>) {
        self.reporter = reporter;
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn threads(&self) -> usize {
        self.pool.threads()
    }

    pub fn set_threads(&mut self, threads: usize) {
        self.config.threads = threads.clamp(1, SearchConfig::MAX_THREADS);
        self.pool.set_threads(self.config.threads);
    }

    /// Reallocate the transposition table; its contents are lost.
    pub fn set_hash_size(&mut self, hash_mb: usize) {
        self.config.hash_mb = hash_mb.clamp(1, SearchConfig::MAX_HASH_MB);
        self.tt = Arc::new(TranspositionTable::new(self.config.hash_mb));
    }

    pub fn clear_hash(&self) {
        self.tt.clear();
    }

    /// Tablebase moves for the root, when the position is small enough.
    fn tablebase_root_moves(&self, pos: &Position) -> Option<Vec<Move>> {
        let tb = self.tablebase.as_ref()?;
        let limit = self.config.tablebase_piece_limit.min(tb.max_pieces());
        if pos.total_pieces() > limit {
            return None;
        }
        let moves = tb.probe_best_moves(pos)?;
        if moves.is_empty() {
            return None;
        }
        log::debug!("tablebase restricts the root to {} moves", moves.len());
        Some(moves)
    }
}

impl Engine for ClassicalEngine {
    fn search(&mut self, pos: &Position, limits: SearchLimits) -> SearchResult {
        let time = limits.time_control.clone();
        // A stop that arrives before the search starts still applies.
        let stop_requested = time.is_stopped();
        time.start(&limits, self.config.move_overhead());
        if stop_requested {
            time.stop();
        }
        self.tt.new_search();

        let ctx = SearchContext {
            tt: Arc::clone(&self.tt),
            evaluator: Arc::clone(&self.evaluator),
            tablebase: self.tablebase.clone(),
            params: self.config.params.clone(),
            repetition_threshold: self.config.repetition_threshold,
            tablebase_piece_limit: self.config.tablebase_piece_limit,
            time: time.clone(),
            nodes: Arc::new(NodeCounters::new(self.pool.threads())),
            reporter: self.reporter.clone(),
            max_depth: limits.depth.unwrap_or(MAX_PLY as u8 - 1).min(MAX_PLY as u8 - 1),
            root_moves: self.tablebase_root_moves(pos),
        };

        let result = self.pool.search(&ctx, pos);
        let nodes = ctx.nodes.total();
        let stopped = result.best_move.is_some() && result.depth < ctx.max_depth;

        log::info!(
            "search finished: depth {} score {} nodes {} in {:?}",
            result.depth,
            result.score,
            nodes,
            time.elapsed()
        );

        SearchResult {
            best_move: result.best_move,
            score: result.score,
            depth: result.depth,
            nodes,
            stopped,
            pv: result.pv,
        }
    }

    fn name(&self) -> &str {
        "Classical v2.0"
    }

    fn author(&self) -> &str {
        "ML-chess"
    }

    fn new_game(&mut self) {
        self.tt.clear();
        self.pool.clear_histories();
    }

    fn set_option(&mut self, name: &str, value: &str) -> bool {
        match name.to_ascii_lowercase().as_str() {
            "threads" => match value.trim().parse() {
                Ok(n) => {
                    self.set_threads(n);
                    true
                }
                Err(_) => {
                    log::warn!("invalid Threads value '{value}'");
                    false
                }
            },
            "hash" => match value.trim().parse() {
                Ok(mb) => {
                    self.set_hash_size(mb);
                    true
                }
                Err(_) => {
                    log::warn!("invalid Hash value '{value}'");
                    false
                }
            },
            "clear hash" => {
                self.clear_hash();
                true
            }
            _ => false,
        }
    }
}
