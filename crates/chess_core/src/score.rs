//! Search scores as (win, win-or-draw) probability mass.
//!
//! Both components are out of [`Score::SCALE`]. Ordinary evaluations satisfy
//! `0 <= win <= win_draw <= SCALE`; scores are ordered by `win + win_draw`,
//! so a draw sits in the middle of the range and negation mirrors around it.
//!
//! Mates live outside the ordinary range: a win by mate pushes the total
//! more than `MATE_RANGE / 2` above `2 * SCALE`, a loss by mate pushes it
//! more than `MATE_RANGE / 2` below zero. The distance to mate is encoded in
//! the overshoot so shorter mates order first. Window bounds a little outside
//! the ordinary range (see [`Score::offset`]) are still ordinary scores.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Neg;

/// Centipawn offset of the draw band around an even position.
const DRAW_BAND: f64 = 100.0;
/// Centipawns per unit of logit.
const SLOPE: f64 = 90.0;

#[derive(Clone, Copy, Debug, Default)]
pub struct Score {
    win: i32,
    win_draw: i32,
}

impl Score {
    pub const SCALE: i32 = 4096;
    /// Largest mate distance (in plies) the encoding can express.
    pub const MATE_RANGE: i32 = 1000;
    /// Mate overshoot at which a total stops being an ordinary score.
    const MATE_THRESHOLD: i32 = Self::MATE_RANGE / 2;

    pub const DRAW: Score = Score::new(0, Self::SCALE);
    /// Above every reachable score, including the fastest mate.
    pub const INFINITE: Score = Score::new(Self::SCALE, Self::SCALE + Self::MATE_RANGE + 1);
    /// Certain result without a known mate (e.g. from a tablebase).
    pub const KNOWN_WIN: Score = Score::new(Self::SCALE, Self::SCALE);
    pub const KNOWN_LOSS: Score = Score::new(0, 0);

    pub const fn new(win: i32, win_draw: i32) -> Score {
        Score { win, win_draw }
    }

    #[inline(always)]
    pub const fn win(self) -> i32 {
        self.win
    }

    #[inline(always)]
    pub const fn win_draw(self) -> i32 {
        self.win_draw
    }

    #[inline(always)]
    pub const fn total(self) -> i32 {
        self.win + self.win_draw
    }

    /// Side to move mates in `ply` plies from the root.
    pub const fn mate_in(ply: usize) -> Score {
        Score::new(Self::SCALE, Self::SCALE + Self::MATE_RANGE - ply as i32)
    }

    /// Side to move is mated in `ply` plies from the root.
    pub const fn mated_in(ply: usize) -> Score {
        Score::new(-(Self::MATE_RANGE - ply as i32), 0)
    }

    #[inline(always)]
    pub const fn is_mate(self) -> bool {
        self.total() > 2 * Self::SCALE + Self::MATE_THRESHOLD
    }

    #[inline(always)]
    pub const fn is_mated(self) -> bool {
        self.total() < -Self::MATE_THRESHOLD
    }

    /// Either side is mating.
    #[inline(always)]
    pub const fn is_mate_score(self) -> bool {
        self.is_mate() || self.is_mated()
    }

    /// Shift the ordering total by `delta` (used for null and aspiration windows).
    #[inline(always)]
    pub const fn offset(self, delta: i32) -> Score {
        Score::new(self.win, self.win_draw + delta)
    }

    /// Rebias a mate score from root-relative to node-relative before storing.
    #[inline]
    pub fn to_tt(self, height: usize) -> Score {
        let h = height as i32;
        if self.is_mate() {
            Score::new(self.win, self.win_draw + h)
        } else if self.is_mated() {
            Score::new(self.win - h, self.win_draw)
        } else {
            self
        }
    }

    /// Inverse of [`Score::to_tt`] for a node at `height`.
    #[inline]
    pub fn from_tt(self, height: usize) -> Score {
        let h = height as i32;
        if self.is_mate() {
            Score::new(self.win, self.win_draw - h)
        } else if self.is_mated() {
            Score::new(self.win + h, self.win_draw)
        } else {
            self
        }
    }

    /// Map a centipawn evaluation onto win/loss curves either side of a draw band.
    pub fn from_centipawns(cp: i32) -> Score {
        let curve = |x: f64| {
            let p = 1.0 / (1.0 + (-(x - DRAW_BAND) / SLOPE).exp());
            (p * Self::SCALE as f64).round() as i32
        };
        let cp = cp as f64;
        let win = curve(cp);
        let loss = curve(-cp);
        Score::new(win, Self::SCALE - loss)
    }

    /// Approximate centipawn value; mates map to ±(30000 - plies).
    pub fn centipawns(self) -> i32 {
        if self.is_mate() {
            return 30_000 - self.mate_ply();
        }
        if self.is_mated() {
            return -30_000 + self.mate_ply();
        }
        let logit = |mass: i32| {
            let p = (mass as f64 / Self::SCALE as f64).clamp(1e-4, 1.0 - 1e-4);
            (p / (1.0 - p)).ln()
        };
        let loss = Self::SCALE - self.win_draw;
        (SLOPE * (logit(self.win) - logit(loss)) / 2.0).round() as i32
    }

    pub fn win_probability(self) -> f64 {
        self.win.clamp(0, Self::SCALE) as f64 / Self::SCALE as f64
    }

    pub fn draw_probability(self) -> f64 {
        let win = self.win.clamp(0, Self::SCALE);
        let win_draw = self.win_draw.clamp(0, Self::SCALE);
        (win_draw - win).max(0) as f64 / Self::SCALE as f64
    }

    pub fn loss_probability(self) -> f64 {
        (Self::SCALE - self.win_draw.clamp(0, Self::SCALE)) as f64 / Self::SCALE as f64
    }

    /// Moves to mate: positive when the side to move mates, negative when mated.
    pub fn mate_distance(self) -> Option<i32> {
        if self.is_mate() {
            Some((self.mate_ply() + 1) / 2)
        } else if self.is_mated() {
            Some(-(self.mate_ply() / 2))
        } else {
            None
        }
    }

    /// Plies to mate for a mate score, counted from the root.
    #[inline]
    fn mate_ply(self) -> i32 {
        if self.is_mate() {
            2 * Self::SCALE + Self::MATE_RANGE - self.total()
        } else {
            Self::MATE_RANGE + self.total()
        }
    }
}

impl Neg for Score {
    type Output = Score;

    #[inline(always)]
    fn neg(self) -> Score {
        Score::new(Self::SCALE - self.win_draw, Self::SCALE - self.win)
    }
}

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.total() == other.total()
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.total().cmp(&other.total())
    }
}

impl fmt::Display for Score {
    /// UCI form: `mate N` or `cp N`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mate_distance() {
            Some(moves) => write!(f, "mate {moves}"),
            None => write!(f, "cp {}", self.centipawns()),
        }
    }
}

#[cfg(test)]
#[path = "score_tests.rs"]
mod score_tests;
