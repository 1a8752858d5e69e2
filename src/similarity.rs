//! String similarity scoring for transcript-to-script alignment.
//!
//! Combines normalized Levenshtein distance with Soundex phonetic
//! equivalence. Scores are always in [0, 1].

use crate::script::normalize_word;
use natural::phonetics::soundex;
use strsim::levenshtein;

/// Per-token score floor applied when two words are phonetically equivalent
/// but dissimilar as strings ("there"/"their", misheard homophones).
pub const PHONETIC_FLOOR: f64 = 0.8;

/// Normalized string-distance score between two words, in [0, 1].
///
/// Computed as `1 - levenshtein(a, b) / max(len(a), len(b))` over
/// case-folded, punctuation-stripped text. Symmetric, and exactly 1.0 for
/// identical non-empty inputs.
pub fn score(a: &str, b: &str) -> f64 {
    let na = normalize_word(a);
    let nb = normalize_word(b);

    if na.is_empty() && nb.is_empty() {
        // Punctuation-only tokens: identical raw text still counts as a match
        return if !a.is_empty() && a == b { 1.0 } else { 0.0 };
    }

    let max_len = na.chars().count().max(nb.chars().count());
    if max_len == 0 {
        return 0.0;
    }

    let dist = levenshtein(&na, &nb);
    (1.0 - dist as f64 / max_len as f64).clamp(0.0, 1.0)
}

/// Whether two words are Soundex-equivalent after normalization.
///
/// Empty (punctuation-only) words never match phonetically.
pub fn phonetic_match(a: &str, b: &str) -> bool {
    let na = normalize_word(a);
    let nb = normalize_word(b);
    if na.is_empty() || nb.is_empty() {
        return false;
    }
    soundex(&na, &nb)
}

/// Per-token score with the phonetic floor applied.
pub fn score_with_phonetics(a: &str, b: &str) -> f64 {
    let base = score(a, b);
    if base < PHONETIC_FLOOR && phonetic_match(a, b) {
        PHONETIC_FLOOR
    } else {
        base
    }
}

/// Mean per-token score across two equal-length word sequences.
///
/// Returns 0.0 for empty or mismatched-length input.
pub fn sequence_score(a: &[&str], b: &[&str]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let total: f64 = a.iter().zip(b.iter()).map(|(x, y)| score(x, y)).sum();
    total / a.len() as f64
}

/// [`sequence_score`] with the phonetic floor applied per pair.
pub fn sequence_score_with_phonetics(a: &[&str], b: &[&str]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let total: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| score_with_phonetics(x, y))
        .sum();
    total / a.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_words_score_one() {
        assert_eq!(score("hello", "hello"), 1.0);
        assert_eq!(score("Hello,", "hello"), 1.0);
    }

    #[test]
    fn test_score_symmetric() {
        let pairs = [("quick", "quik"), ("brown", "brwn"), ("fox", "box")];
        for (a, b) in pairs {
            assert!((score(a, b) - score(b, a)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_score_in_unit_range() {
        let words = ["", "a", "hello", "world!", "...", "longerword"];
        for a in words {
            for b in words {
                let s = score(a, b);
                assert!((0.0..=1.0).contains(&s), "score({a:?},{b:?}) = {s}");
            }
        }
    }

    #[test]
    fn test_unrelated_words_score_low() {
        assert!(score("xyz", "teleprompter") < 0.3);
    }

    #[test]
    fn test_typo_scores_high() {
        // "quik" vs "quick": one deletion over five chars
        let s = score("quik", "quick");
        assert!((s - 0.8).abs() < 0.01);
    }

    #[test]
    fn test_phonetic_match() {
        assert!(phonetic_match("there", "their"));
        assert!(!phonetic_match("cat", "dog"));
        assert!(!phonetic_match("", "word"));
        assert!(!phonetic_match("...", "word"));
    }

    #[test]
    fn test_phonetic_floor_applied() {
        let base = score("there", "their");
        let boosted = score_with_phonetics("there", "their");
        assert!(boosted >= base);
        assert!(boosted >= PHONETIC_FLOOR);
        assert!(boosted <= 1.0);
    }

    #[test]
    fn test_sequence_score_mean() {
        let a = ["the", "quick", "fox"];
        let b = ["the", "quick", "fox"];
        assert_eq!(sequence_score(&a, &b), 1.0);

        let c = ["the", "quick", "box"];
        let s = sequence_score(&a, &c);
        assert!(s < 1.0 && s > 0.8);
    }

    #[test]
    fn test_sequence_score_empty_or_mismatched() {
        assert_eq!(sequence_score(&[], &[]), 0.0);
        assert_eq!(sequence_score(&["a"], &["a", "b"]), 0.0);
    }

    #[test]
    fn test_sequence_score_with_phonetics_lifts_homophones() {
        let spoken = ["say", "there", "names"];
        let script = ["say", "their", "names"];
        let plain = sequence_score(&spoken, &script);
        let lifted = sequence_score_with_phonetics(&spoken, &script);
        assert!(lifted > plain);
        assert!(lifted <= 1.0);
    }
}
