//! Per-reader session state.
//!
//! A session tracks one reader's progress through one script: the current
//! token position, a ring buffer of speaking-rate samples, and a bounded
//! FIFO of recent raw fragments. Sessions are mutated only by the owning
//! processing path, never concurrently.

use crate::matching::MatchResult;
use crate::script::ScriptIndex;
use log::debug;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Capacity of the speaking-rate ring buffer.
pub const RATE_WINDOW: usize = 10;

/// Capacity of the recent-fragment FIFO.
pub const TRANSCRIPT_BUFFER: usize = 10;

/// Upper bound on a single speaking-rate observation, in tokens/sec.
/// Roughly double the fastest sustained human speech.
pub const MAX_SAMPLE_RATE: f64 = 10.0;

/// Opaque session identifier handed out by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// One observation of speaking rate, taken at an accepted match.
#[derive(Debug, Clone, Copy)]
pub struct RateSample {
    pub tokens_per_second: f64,
    pub observed_at: Instant,
}

/// Smoothed speaking-rate estimate over a bounded sample window.
///
/// The estimate is the arithmetic mean of the current ring-buffer contents.
/// With no samples the rate is undefined and callers fall back to the
/// configured default.
#[derive(Debug, Clone, Default)]
pub struct RateEstimator {
    samples: VecDeque<RateSample>,
}

impl RateEstimator {
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(RATE_WINDOW),
        }
    }

    /// Record one sample, evicting the oldest when the window is full.
    pub fn record(&mut self, sample: RateSample) {
        if self.samples.len() >= RATE_WINDOW {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Mean of the buffered samples, or `default_rate` when empty.
    pub fn current_rate(&self, default_rate: f64) -> f64 {
        if self.samples.is_empty() {
            return default_rate;
        }
        let sum: f64 = self.samples.iter().map(|s| s.tokens_per_second).sum();
        sum / self.samples.len() as f64
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Mutable state for one reader working through one script.
pub struct Session {
    pub id: SessionId,
    script: Arc<ScriptIndex>,
    current_token_index: usize,
    rate: RateEstimator,
    transcript_buffer: VecDeque<String>,
    /// When the position was last advanced by an accepted match (or reset)
    last_update_at: Instant,
    /// End of the previously accepted match, used for continuity checks
    last_match_end: Option<usize>,
}

impl Session {
    pub fn new(id: SessionId, script: Arc<ScriptIndex>, now: Instant) -> Self {
        Self {
            id,
            script,
            current_token_index: 0,
            rate: RateEstimator::new(),
            transcript_buffer: VecDeque::with_capacity(TRANSCRIPT_BUFFER),
            last_update_at: now,
            last_match_end: None,
        }
    }

    pub fn script(&self) -> &Arc<ScriptIndex> {
        &self.script
    }

    pub fn current_token_index(&self) -> usize {
        self.current_token_index
    }

    pub fn last_match_end(&self) -> Option<usize> {
        self.last_match_end
    }

    pub fn last_update_at(&self) -> Instant {
        self.last_update_at
    }

    pub fn rate(&self) -> &RateEstimator {
        &self.rate
    }

    /// Recent raw fragments, oldest first.
    pub fn transcript_buffer(&self) -> impl Iterator<Item = &str> {
        self.transcript_buffer.iter().map(|s| s.as_str())
    }

    /// Record a raw fragment in the bounded FIFO.
    pub fn push_fragment(&mut self, fragment: &str) {
        if self.transcript_buffer.len() >= TRANSCRIPT_BUFFER {
            self.transcript_buffer.pop_front();
        }
        self.transcript_buffer.push_back(fragment.to_string());
    }

    /// Commit an accepted match: advance the position (never backward) and
    /// record a rate sample from the elapsed time and tokens covered.
    pub fn commit_match(&mut self, result: &MatchResult, now: Instant) {
        let advanced = result
            .end_index
            .saturating_sub(self.current_token_index);

        // Until a match lands, last_update_at measures session age rather
        // than the gap between utterances, so the first match yields no
        // sample. Sub-frame gaps between matches are capped instead of
        // recorded as absurd rates.
        let elapsed = now.duration_since(self.last_update_at).as_secs_f64();
        if self.last_match_end.is_some() && advanced > 0 && elapsed > 0.0 {
            self.rate.record(RateSample {
                tokens_per_second: (advanced as f64 / elapsed).min(MAX_SAMPLE_RATE),
                observed_at: now,
            });
        }

        // Backlook matches behind the cursor refresh confidence but never
        // move the position backward.
        self.current_token_index = self.current_token_index.max(result.end_index);
        self.last_match_end = Some(result.end_index);
        self.last_update_at = now;

        debug!(
            "{}: committed match at tokens {}..={} (advanced {}, rate {:.2} tok/s over {} samples)",
            self.id,
            result.start_index,
            result.end_index,
            advanced,
            self.rate.current_rate(0.0),
            self.rate.sample_count(),
        );
    }

    /// Explicitly reposition the session. The one sanctioned way to move
    /// the position backward.
    pub fn reset_position(&mut self, token_index: usize, now: Instant) {
        let clamped = if self.script.is_empty() {
            0
        } else {
            token_index.min(self.script.token_count() - 1)
        };
        debug!("{}: position reset {} -> {}", self.id, self.current_token_index, clamped);
        self.current_token_index = clamped;
        self.last_match_end = None;
        self.last_update_at = now;
    }

    /// Whether no match has been accepted for at least `idle_timeout_ms`.
    pub fn is_idle(&self, now: Instant, idle_timeout_ms: u64) -> bool {
        now.duration_since(self.last_update_at).as_millis() as u64 >= idle_timeout_ms
    }

    /// Extrapolate a fractional token position `horizon_secs` ahead of the
    /// current one at the estimated speaking rate.
    ///
    /// Pure with respect to session state: only accepted matches (or an
    /// explicit reset) move the authoritative position.
    pub fn predict(&self, horizon_secs: f64, default_rate: f64) -> f64 {
        if self.script.is_empty() {
            return 0.0;
        }
        let rate = self.rate.current_rate(default_rate);
        let max_index = (self.script.token_count() - 1) as f64;
        (self.current_token_index as f64 + rate * horizon_secs.max(0.0)).clamp(0.0, max_index)
    }

    /// `predict` rounded down to a concrete token index.
    pub fn predict_token(&self, horizon_secs: f64, default_rate: f64) -> usize {
        self.predict(horizon_secs, default_rate) as usize
    }
}
