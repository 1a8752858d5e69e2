//! Fragment-to-script position matching.
//!
//! Maps a noisy transcript fragment onto token offsets in the script by
//! sliding the spoken token sequence across a bounded window anchored at the
//! session's last known position. Strategies are tried cheapest-first:
//! exact token equality, then fuzzy edit-distance scoring, with phonetic and
//! contextual heuristics adjusting (never solely deciding) the final score.

use crate::config::EngineConfig;
use crate::script::{tokenize, Token};
use crate::session::Session;
use crate::similarity::{sequence_score, sequence_score_with_phonetics};
use log::debug;
use serde::{Deserialize, Serialize};
use std::time::Instant;

const SCORE_EPSILON: f64 = 1e-9;

/// Which matching path produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Contiguous case-insensitive token-for-token equality
    Exact,
    /// Mean per-token edit-distance score over a sliding alignment
    Fuzzy,
    /// Fuzzy score lifted by Soundex equivalence on misheard tokens
    Phonetic,
    /// Accepted because the candidate continues the previous match
    Contextual,
}

/// An accepted (or best-effort) alignment of a fragment against the script.
///
/// Token indices are inclusive. Transient: produced per processed fragment
/// and not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub start_index: usize,
    pub end_index: usize,
    /// Final blended score, always in [0, 1]
    pub score: f64,
    pub strategy: MatchStrategy,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    start_index: usize,
    end_index: usize,
    score: f64,
    strategy: MatchStrategy,
}

/// Windowed fragment matcher. Stateless apart from its tunables; all
/// per-reader state lives in the [`Session`].
pub struct MatchEngine {
    config: EngineConfig,
}

impl MatchEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Match a transcript fragment against the session's script.
    ///
    /// Returns `None` for empty/malformed fragments, empty scripts, and any
    /// attempt whose best score does not exceed the acceptance threshold.
    /// "No match" is an expected, frequent outcome (silence, noise,
    /// disfluency) and never an error. On acceptance the session position
    /// and rate history are updated.
    pub fn match_fragment(
        &self,
        session: &mut Session,
        fragment: &str,
        now: Instant,
    ) -> Option<MatchResult> {
        let script = session.script().clone();
        if script.is_empty() {
            debug!("{}: fragment ignored, script is empty", session.id);
            return None;
        }

        let spoken: Vec<Token> = tokenize(fragment)
            .into_iter()
            .filter(|t| !t.is_punctuation)
            .collect();
        if spoken.is_empty() {
            // Whitespace or punctuation only: treated as "no speech"
            return None;
        }

        session.push_fragment(fragment);

        let current = session.current_token_index();
        let window_start = current.saturating_sub(self.config.backlook);
        let window_end = (current + self.config.forward_limit + 1).min(script.token_count());

        // Alignment runs over the window's matchable tokens; punctuation-only
        // script tokens are skipped but keep their real indices.
        let window: Vec<usize> = (window_start..window_end)
            .filter(|&i| !script.tokens()[i].is_punctuation)
            .collect();

        if window.len() < spoken.len() {
            debug!(
                "{}: fragment of {} tokens exceeds window of {} matchable tokens",
                session.id,
                spoken.len(),
                window.len()
            );
            return None;
        }

        let result = self.search_window(session, &spoken, &window, current)?;
        session.commit_match(&result, now);
        Some(result)
    }

    fn search_window(
        &self,
        session: &Session,
        spoken: &[Token],
        window: &[usize],
        current: usize,
    ) -> Option<MatchResult> {
        let script = session.script();
        let tokens = script.tokens();
        let m = spoken.len();
        let spoken_words: Vec<&str> = spoken.iter().map(|t| t.normalized.as_str()).collect();
        let continuity_anchor = session.last_match_end();

        let mut best_exact: Option<Candidate> = None;
        // Best alignment by raw fuzzy mean, and by the heuristic-adjusted
        // blend; kept separate so the cheaper strategy wins when it clears
        // its own threshold.
        let mut best_fuzzy: Option<Candidate> = None;
        let mut best_blended: Option<Candidate> = None;

        for offset in 0..=(window.len() - m) {
            let indices = &window[offset..offset + m];
            let start_index = indices[0];
            let end_index = indices[m - 1];

            let window_words: Vec<&str> = indices
                .iter()
                .map(|&i| tokens[i].normalized.as_str())
                .collect();

            if spoken_words == window_words {
                let candidate = Candidate {
                    start_index,
                    end_index,
                    score: 1.0,
                    strategy: MatchStrategy::Exact,
                };
                if prefer(&candidate, &best_exact, current) {
                    best_exact = Some(candidate);
                }
                continue;
            }

            // Fuzzy base: mean per-token edit-distance score. The phonetic
            // variant scores Soundex-equal pairs at least the phonetic floor.
            let base = sequence_score(&spoken_words, &window_words);
            let phonetic = sequence_score_with_phonetics(&spoken_words, &window_words);

            let mut candidate_score = base;
            let mut strategy = MatchStrategy::Fuzzy;
            if phonetic > base + SCORE_EPSILON {
                candidate_score = phonetic;
                strategy = MatchStrategy::Phonetic;
            }

            // Contextual adjustment: a candidate that picks up right after
            // the previously accepted match gets a small continuity bonus,
            // but only when the base score already carries real signal.
            if let Some(anchor) = continuity_anchor {
                if start_index == anchor + 1 && base >= self.config.contextual_min_base {
                    let boosted = (candidate_score + self.config.contextual_bonus).min(1.0);
                    if candidate_score <= self.config.accept_threshold
                        && boosted > self.config.accept_threshold
                    {
                        strategy = MatchStrategy::Contextual;
                    }
                    candidate_score = boosted;
                }
            }

            let fuzzy_candidate = Candidate {
                start_index,
                end_index,
                score: base,
                strategy: MatchStrategy::Fuzzy,
            };
            if prefer(&fuzzy_candidate, &best_fuzzy, current) {
                best_fuzzy = Some(fuzzy_candidate);
            }

            let blended = Candidate {
                start_index,
                end_index,
                score: candidate_score,
                strategy,
            };
            if prefer(&blended, &best_blended, current) {
                best_blended = Some(blended);
            }
        }

        // Exact wins outright when present
        if let Some(exact) = best_exact {
            return Some(accept(exact));
        }

        // Fuzzy clears its own, stricter threshold on the raw mean alone
        if let Some(fuzzy) = best_fuzzy {
            if fuzzy.score + SCORE_EPSILON >= self.config.fuzzy_threshold {
                return Some(accept(fuzzy));
            }
        }

        // Otherwise the heuristic-adjusted blend must beat the floor
        let best = best_blended?;
        if best.score > self.config.accept_threshold {
            return Some(accept(best));
        }

        debug!(
            "{}: best candidate at {}..={} scored {:.3} ({:?}), below acceptance",
            session.id, best.start_index, best.end_index, best.score, best.strategy
        );
        None
    }
}

fn accept(candidate: Candidate) -> MatchResult {
    MatchResult {
        start_index: candidate.start_index,
        end_index: candidate.end_index,
        score: candidate.score.clamp(0.0, 1.0),
        strategy: candidate.strategy,
    }
}

/// True when `candidate` beats the incumbent: higher score, or at equal
/// score the smallest forward jump from the current position. Candidates
/// behind the cursor rank below any forward candidate.
fn prefer(candidate: &Candidate, incumbent: &Option<Candidate>, current: usize) -> bool {
    let Some(incumbent) = incumbent else {
        return true;
    };
    if candidate.score > incumbent.score + SCORE_EPSILON {
        return true;
    }
    if candidate.score + SCORE_EPSILON < incumbent.score {
        return false;
    }
    jump_key(candidate.start_index, current) < jump_key(incumbent.start_index, current)
}

fn jump_key(start: usize, current: usize) -> (u8, usize) {
    if start >= current {
        (0, start - current)
    } else {
        (1, current - start)
    }
}
