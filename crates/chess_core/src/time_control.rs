//! Search limits and the shared time controller.
//!
//! `SearchLimits` describes what the caller asked for (depth, nodes, fixed
//! move time, clock). `TimeControl` turns that into budgets when a search
//! starts and is shared by every search thread plus whoever may send `stop`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// How often (in nodes) the search consults the clock.
pub const CHECK_INTERVAL: u64 = 1024;

/// Moves assumed to remain when the clock does not say.
const DEFAULT_MOVES_TO_GO: u32 = 30;

const UNLIMITED: u64 = u64::MAX;

/// Remaining time on the side-to-move's clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Clock {
    pub time_left: Duration,
    pub increment: Duration,
    pub moves_to_go: Option<u32>,
}

/// Search limits that control when an engine should stop searching.
///
/// Unset fields impose no limit; with nothing set the search runs until
/// stopped.
#[derive(Debug, Clone, Default)]
pub struct SearchLimits {
    /// Maximum search depth in plies
    pub depth: Option<u8>,
    /// Maximum nodes over all threads
    pub nodes: Option<u64>,
    /// Fixed time for this move
    pub move_time: Option<Duration>,
    pub clock: Option<Clock>,
    /// Ignore every budget until stopped externally
    pub infinite: bool,
    /// Shared stop flag and clock; clone it to stop the search from outside.
    pub time_control: TimeControl,
}

impl SearchLimits {
    pub fn depth(depth: u8) -> Self {
        Self {
            depth: Some(depth),
            ..Self::default()
        }
    }

    pub fn nodes(nodes: u64) -> Self {
        Self {
            nodes: Some(nodes),
            ..Self::default()
        }
    }

    pub fn time(move_time: Duration) -> Self {
        Self {
            move_time: Some(move_time),
            ..Self::default()
        }
    }

    pub fn clock(time_left: Duration, increment: Duration, moves_to_go: Option<u32>) -> Self {
        Self {
            clock: Some(Clock {
                time_left,
                increment,
                moves_to_go,
            }),
            ..Self::default()
        }
    }

    pub fn infinite() -> Self {
        Self {
            infinite: true,
            ..Self::default()
        }
    }

    /// (soft, hard) time budgets after subtracting the move overhead.
    ///
    /// The soft budget is checked between iterations, the hard one inside
    /// the search.
    pub fn time_budget(&self, move_overhead: Duration) -> (Option<Duration>, Option<Duration>) {
        const MIN_BUDGET: Duration = Duration::from_millis(1);

        if self.infinite {
            return (None, None);
        }
        if let Some(move_time) = self.move_time {
            let t = move_time.saturating_sub(move_overhead).max(MIN_BUDGET);
            return (Some(t), Some(t));
        }
        if let Some(clock) = self.clock {
            let moves_to_go = clock.moves_to_go.unwrap_or(DEFAULT_MOVES_TO_GO).max(1);
            let soft = clock.time_left / moves_to_go + clock.increment * 3 / 4;
            let hard = (soft * 5).min(clock.time_left / 2);
            let soft = soft.min(hard);
            return (
                Some(soft.saturating_sub(move_overhead).max(MIN_BUDGET)),
                Some(hard.saturating_sub(move_overhead).max(MIN_BUDGET)),
            );
        }
        (None, None)
    }
}

#[derive(Debug)]
struct Shared {
    stopped: AtomicBool,
    start_time: RwLock<Instant>,
    /// Milliseconds; `UNLIMITED` when unset.
    base_soft_ms: AtomicU64,
    soft_ms: AtomicU64,
    hard_ms: AtomicU64,
    node_limit: AtomicU64,
}

/// Thread-safe time controller that tracks whether search should stop.
///
/// Cheap to clone; all clones share the same flag and budgets. The
/// `is_stopped()` check is a relaxed atomic load so it can be polled on
/// every node.
#[derive(Debug, Clone)]
pub struct TimeControl {
    shared: Arc<Shared>,
}

impl Default for TimeControl {
    fn default() -> Self {
        Self::new()
    }
}

fn to_ms(d: Option<Duration>) -> u64 {
    d.map_or(UNLIMITED, |d| d.as_millis().min(UNLIMITED as u128 - 1) as u64)
}

impl TimeControl {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                stopped: AtomicBool::new(false),
                start_time: RwLock::new(Instant::now()),
                base_soft_ms: AtomicU64::new(UNLIMITED),
                soft_ms: AtomicU64::new(UNLIMITED),
                hard_ms: AtomicU64::new(UNLIMITED),
                node_limit: AtomicU64::new(UNLIMITED),
            }),
        }
    }

    /// Start the clock and install the budgets for `limits`.
    pub fn start(&self, limits: &SearchLimits, move_overhead: Duration) {
        let (soft, hard) = limits.time_budget(move_overhead);
        let s = &self.shared;
        s.base_soft_ms.store(to_ms(soft), Ordering::Relaxed);
        s.soft_ms.store(to_ms(soft), Ordering::Relaxed);
        s.hard_ms.store(to_ms(hard), Ordering::Relaxed);
        s.node_limit.store(
            if limits.infinite {
                UNLIMITED
            } else {
                limits.nodes.unwrap_or(UNLIMITED)
            },
            Ordering::Relaxed,
        );
        if let Ok(mut start) = s.start_time.write() {
            *start = Instant::now();
        }
        s.stopped.store(false, Ordering::SeqCst);
        log::debug!("time budget: soft {soft:?}, hard {hard:?}");
    }

    /// Force stop the search immediately.
    pub fn stop(&self) {
        self.shared.stopped.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::Relaxed)
    }

    /// Hard-limit check against the clock and the node budget; sets the stop
    /// flag when either is exhausted.
    pub fn check(&self, nodes: u64) -> bool {
        if self.is_stopped() {
            return true;
        }
        let s = &self.shared;
        let hard = s.hard_ms.load(Ordering::Relaxed);
        if nodes >= s.node_limit.load(Ordering::Relaxed)
            || (hard != UNLIMITED && self.elapsed_ms() >= hard)
        {
            self.stop();
            return true;
        }
        false
    }

    /// Whether the soft budget is used up; checked between iterations.
    pub fn soft_expired(&self) -> bool {
        let soft = self.shared.soft_ms.load(Ordering::Relaxed);
        soft != UNLIMITED && self.elapsed_ms() >= soft
    }

    /// Rescale the soft budget by `factor`, staying between half the
    /// original budget and the hard budget.
    pub fn scale_soft(&self, factor: f64) {
        let s = &self.shared;
        let base = s.base_soft_ms.load(Ordering::Relaxed);
        let current = s.soft_ms.load(Ordering::Relaxed);
        if base == UNLIMITED || current == UNLIMITED {
            return;
        }
        let hard = s.hard_ms.load(Ordering::Relaxed);
        let scaled = ((current as f64 * factor) as u64).clamp(base / 2, hard.max(base / 2));
        s.soft_ms.store(scaled, Ordering::Relaxed);
    }

    pub fn soft_limit(&self) -> Option<Duration> {
        match self.shared.soft_ms.load(Ordering::Relaxed) {
            UNLIMITED => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    pub fn node_limit(&self) -> Option<u64> {
        match self.shared.node_limit.load(Ordering::Relaxed) {
            UNLIMITED => None,
            n => Some(n),
        }
    }

    /// Returns true every `CHECK_INTERVAL` nodes.
    #[inline]
    pub fn should_check_time(&self, nodes: u64) -> bool {
        nodes.is_multiple_of(CHECK_INTERVAL)
    }

    pub fn elapsed(&self) -> Duration {
        self.shared
            .start_time
            .read()
            .map(|s| s.elapsed())
            .unwrap_or(Duration::ZERO)
    }

    fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
#[path = "time_control_tests.rs"]
mod time_control_tests;
