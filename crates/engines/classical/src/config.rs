//! Engine configuration, loaded from TOML.
//!
//! Every field has a default, so a config file only needs to name what it
//! changes:
//!
//! ```toml
//! threads = 4
//! hash_mb = 64
//!
//! [params]
//! null_move_min_depth = 4
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Search threads, the primary included
    pub threads: usize,
    /// Transposition table size in MiB
    pub hash_mb: usize,
    /// Earlier occurrences of a position that make it a draw
    pub repetition_threshold: usize,
    /// Subtracted from every time budget to cover I/O latency
    pub move_overhead_ms: u64,
    /// Tablebases are consulted at or below this many pieces
    pub tablebase_piece_limit: u32,
    pub params: SearchParams,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            hash_mb: 16,
            repetition_threshold: chess_core::DEFAULT_REPETITION_THRESHOLD,
            move_overhead_ms: 10,
            tablebase_piece_limit: 5,
            params: SearchParams::default(),
        }
    }
}

impl SearchConfig {
    pub const MAX_THREADS: usize = 256;
    pub const MAX_HASH_MB: usize = 1 << 16;

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: SearchConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threads == 0 || self.threads > Self::MAX_THREADS {
            return Err(ConfigError::Invalid {
                field: "threads",
                reason: format!("{} is outside 1..={}", self.threads, Self::MAX_THREADS),
            });
        }
        if self.hash_mb == 0 || self.hash_mb > Self::MAX_HASH_MB {
            return Err(ConfigError::Invalid {
                field: "hash_mb",
                reason: format!("{} is outside 1..={}", self.hash_mb, Self::MAX_HASH_MB),
            });
        }
        if self.repetition_threshold == 0 {
            return Err(ConfigError::Invalid {
                field: "repetition_threshold",
                reason: "must be at least 1".to_string(),
            });
        }
        self.params.validate()
    }

    pub fn move_overhead(&self) -> Duration {
        Duration::from_millis(self.move_overhead_ms)
    }
}

/// Pruning, reduction and extension constants.
///
/// Margins named `*_margin` are in score units (the ordering total of a
/// [`chess_core::Score`], roughly 17 per centipawn near equality) unless they
/// are SEE thresholds, which are centipawns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    pub aspiration_min_depth: i32,
    pub aspiration_window: i32,

    pub rfp_max_depth: i32,
    pub rfp_margin: i32,

    pub null_move_min_depth: i32,
    pub null_move_base_reduction: i32,
    pub null_move_depth_divisor: i32,

    pub futility_max_depth: i32,
    pub futility_base: i32,
    pub futility_margin: i32,

    pub lmp_max_depth: i32,
    pub lmp_base: i32,

    pub lmr_min_depth: i32,
    pub lmr_min_moves: i32,
    pub lmr_base: f64,
    pub lmr_divisor: f64,

    /// Centipawns per ply
    pub see_quiet_margin: i32,
    /// Centipawns per ply
    pub see_capture_margin: i32,
    pub see_max_depth: i32,

    pub singular_min_depth: i32,
    pub singular_tt_depth_slack: i32,
    pub singular_margin: i32,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            aspiration_min_depth: 5,
            aspiration_window: 200,

            rfp_max_depth: 7,
            rfp_margin: 600,

            null_move_min_depth: 3,
            null_move_base_reduction: 3,
            null_move_depth_divisor: 4,

            futility_max_depth: 6,
            futility_base: 400,
            futility_margin: 500,

            lmp_max_depth: 8,
            lmp_base: 3,

            lmr_min_depth: 3,
            lmr_min_moves: 3,
            lmr_base: 0.75,
            lmr_divisor: 2.25,

            see_quiet_margin: -60,
            see_capture_margin: -100,
            see_max_depth: 6,

            singular_min_depth: 8,
            singular_tt_depth_slack: 3,
            singular_margin: 40,
        }
    }
}

impl SearchParams {
    /// Shallowest depth at which the excluded-move search still runs a full
    /// alpha-beta node rather than dropping into quiescence.
    pub const MIN_SINGULAR_DEPTH: i32 = 3;

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, reason: &str| {
            Err(ConfigError::Invalid {
                field,
                reason: reason.to_string(),
            })
        };
        if self.null_move_depth_divisor <= 0 {
            return invalid("params.null_move_depth_divisor", "must be positive");
        }
        if self.lmr_divisor <= 0.0 {
            return invalid("params.lmr_divisor", "must be positive");
        }
        if self.aspiration_window <= 0 {
            return invalid("params.aspiration_window", "must be positive");
        }
        if self.singular_min_depth < Self::MIN_SINGULAR_DEPTH {
            return Err(ConfigError::Invalid {
                field: "params.singular_min_depth",
                reason: format!(
                    "{} is below {}",
                    self.singular_min_depth,
                    Self::MIN_SINGULAR_DEPTH
                ),
            });
        }
        for (field, value) in [
            ("params.rfp_margin", self.rfp_margin),
            ("params.futility_base", self.futility_base),
            ("params.futility_margin", self.futility_margin),
            ("params.singular_margin", self.singular_margin),
            ("params.singular_tt_depth_slack", self.singular_tt_depth_slack),
            ("params.null_move_base_reduction", self.null_move_base_reduction),
        ] {
            if value < 0 {
                return invalid(field, "must not be negative");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
