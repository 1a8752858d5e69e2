//! Script tokenization and indexing.
//!
//! A script is indexed once into an ordered token sequence with original-text
//! offsets, and is read-only afterwards. Edited script text means a new index.

use log::warn;
use serde::{Deserialize, Serialize};

/// A whitespace-delimited unit of the script with position metadata.
///
/// The token's identity within a script is its position in the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    /// The raw token text as it appears in the script
    pub text: String,
    /// Lowercased text with punctuation stripped, used for matching
    pub normalized: String,
    /// Byte offset of the token start in the original script text
    pub start_offset: usize,
    /// Byte offset one past the token end in the original script text
    pub end_offset: usize,
    /// True when the token carries no matchable text (pure punctuation)
    pub is_punctuation: bool,
}

/// Normalize a word for comparison: case-folded, punctuation stripped.
pub fn normalize_word(word: &str) -> String {
    word.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Tokenize text the way the script index does.
///
/// Splits on whitespace runs. Punctuation stays attached to its word and is
/// recorded as a marker rather than producing separate tokens.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;

    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                tokens.push(make_token(text, s, i));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        tokens.push(make_token(text, s, text.len()));
    }

    tokens
}

fn make_token(text: &str, start: usize, end: usize) -> Token {
    let raw = &text[start..end];
    let normalized = normalize_word(raw);
    let is_punctuation = normalized.is_empty();
    Token {
        text: raw.to_string(),
        normalized,
        start_offset: start,
        end_offset: end,
        is_punctuation,
    }
}

/// Preprocessed script: the original text plus its ordered token sequence.
///
/// Built once per script and never mutated; matching against an empty index
/// always yields no match.
#[derive(Debug, Clone)]
pub struct ScriptIndex {
    text: String,
    tokens: Vec<Token>,
}

impl ScriptIndex {
    /// Build an index from script text.
    ///
    /// An empty or whitespace-only script produces a zero-token index. That
    /// is not an error here, but every match against it will fail.
    pub fn build(script_text: &str) -> Self {
        let tokens = tokenize(script_text);
        if tokens.is_empty() {
            warn!("script index built from empty script; matching will never succeed");
        }
        Self {
            text: script_text.to_string(),
            tokens,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn token(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Fraction of the script at or before the given token index, in [0, 1].
    pub fn progress_at(&self, token_index: usize) -> f64 {
        if self.tokens.is_empty() {
            return 0.0;
        }
        let clamped = token_index.min(self.tokens.len() - 1);
        clamped as f64 / (self.tokens.len() - 1).max(1) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_basic() {
        let tokens = tokenize("the quick brown fox");
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[1].text, "quick");
        assert_eq!(tokens[1].normalized, "quick");
        assert_eq!(tokens[1].start_offset, 4);
        assert_eq!(tokens[1].end_offset, 9);
    }

    #[test]
    fn test_tokenize_punctuation_stays_attached() {
        let tokens = tokenize("Hello, world! (yes)");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].text, "Hello,");
        assert_eq!(tokens[0].normalized, "hello");
        assert!(!tokens[0].is_punctuation);
        assert_eq!(tokens[2].normalized, "yes");
    }

    #[test]
    fn test_tokenize_pure_punctuation_token() {
        let tokens = tokenize("wait -- no");
        assert_eq!(tokens.len(), 3);
        assert!(tokens[1].is_punctuation);
        assert_eq!(tokens[1].normalized, "");
    }

    #[test]
    fn test_tokenize_offsets_roundtrip() {
        let text = "  spaced   out\ttext\n";
        for token in tokenize(text) {
            assert_eq!(&text[token.start_offset..token.end_offset], token.text);
        }
    }

    #[test]
    fn test_empty_script_index() {
        let index = ScriptIndex::build("   \n\t ");
        assert!(index.is_empty());
        assert_eq!(index.token_count(), 0);
        assert_eq!(index.progress_at(5), 0.0);
    }

    #[test]
    fn test_progress_at_bounds() {
        let index = ScriptIndex::build("a b c d e");
        assert_eq!(index.progress_at(0), 0.0);
        assert_eq!(index.progress_at(4), 1.0);
        // Out-of-range indices clamp to the last token
        assert_eq!(index.progress_at(100), 1.0);
    }
}
