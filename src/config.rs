//! Engine configuration.

use serde::{Deserialize, Serialize};

fn default_backlook() -> usize {
    100
}

fn default_forward_limit() -> usize {
    150
}

fn default_rate() -> f64 {
    2.5 // tokens/sec, roughly 150 wpm
}

fn default_idle_timeout_ms() -> u64 {
    5 * 60 * 1_000
}

fn default_fuzzy_threshold() -> f64 {
    0.7
}

fn default_accept_threshold() -> f64 {
    0.6
}

fn default_contextual_bonus() -> f64 {
    0.05
}

fn default_contextual_min_base() -> f64 {
    0.5
}

fn default_min_scroll_ms() -> u64 {
    150
}

fn default_max_scroll_ms() -> u64 {
    1_200
}

fn default_prediction_horizon_ms() -> u64 {
    2_000
}

/// Tunables for matching, rate estimation, prediction and motion.
///
/// All fields have serde defaults so partial configs deserialize cleanly.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EngineConfig {
    /// How many tokens behind the current position the search window extends
    #[serde(default = "default_backlook")]
    pub backlook: usize,

    /// How many tokens ahead of the current position the search window extends
    #[serde(default = "default_forward_limit")]
    pub forward_limit: usize,

    /// Speaking rate assumed before any samples exist, in tokens/sec
    #[serde(default = "default_rate")]
    pub default_rate: f64,

    /// Sessions with no accepted match for this long are considered idle
    /// and eligible for reaping
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    /// Mean per-token score a fuzzy alignment needs for early acceptance
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,

    /// Final score a candidate must exceed to be accepted at all
    #[serde(default = "default_accept_threshold")]
    pub accept_threshold: f64,

    /// Bonus added when a candidate continues the previously matched region
    #[serde(default = "default_contextual_bonus")]
    pub contextual_bonus: f64,

    /// Base score below which the contextual bonus is never applied
    #[serde(default = "default_contextual_min_base")]
    pub contextual_min_base: f64,

    /// Shortest allowed catch-up animation
    #[serde(default = "default_min_scroll_ms")]
    pub min_scroll_ms: u64,

    /// Longest allowed catch-up animation
    #[serde(default = "default_max_scroll_ms")]
    pub max_scroll_ms: u64,

    /// How far past the last confirmed match the predictor may extrapolate
    #[serde(default = "default_prediction_horizon_ms")]
    pub prediction_horizon_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backlook: default_backlook(),
            forward_limit: default_forward_limit(),
            default_rate: default_rate(),
            idle_timeout_ms: default_idle_timeout_ms(),
            fuzzy_threshold: default_fuzzy_threshold(),
            accept_threshold: default_accept_threshold(),
            contextual_bonus: default_contextual_bonus(),
            contextual_min_base: default_contextual_min_base(),
            min_scroll_ms: default_min_scroll_ms(),
            max_scroll_ms: default_max_scroll_ms(),
            prediction_horizon_ms: default_prediction_horizon_ms(),
        }
    }
}
