use unicode_segmentation::UnicodeSegmentation;

use crate::core::config::LexiconConfig;

/// Unicode word tokenizer shared by the index builder and the query path.
///
/// A token qualifies as a term when its pre-trim length is within the
/// configured bounds and more than two characters survive trimming `_`
/// from both ends. Applying the same rule on both sides keeps term
/// lookups byte-exact.
#[derive(Debug, Clone)]
pub struct WordTokenizer {
    pub min_word_len: usize,
    pub max_word_len: usize,
}

impl WordTokenizer {
    pub fn new(config: &LexiconConfig) -> Self {
        WordTokenizer {
            min_word_len: config.min_word_len,
            max_word_len: config.max_word_len,
        }
    }

    /// Split a text range into normalized terms, appending to `out`
    pub fn split_words(&self, text: &str, out: &mut Vec<String>) {
        let lower = text.to_lowercase();
        for word in lower.unicode_words() {
            if let Some(term) = self.normalize_lower(word) {
                out.push(term.to_string());
            }
        }
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let mut out = Vec::new();
        self.split_words(text, &mut out);
        out
    }

    /// Normalize a single raw token exactly the way indexed words are
    /// normalized. Returns None when the token does not qualify as a term.
    pub fn normalize(&self, token: &str) -> Option<String> {
        let lower = token.to_lowercase();
        self.normalize_lower(&lower).map(str::to_string)
    }

    fn normalize_lower<'a>(&self, word: &'a str) -> Option<&'a str> {
        let len = word.chars().count();
        if len < self.min_word_len || len > self.max_word_len {
            return None;
        }
        let trimmed = word.trim_matches('_');
        if trimmed.chars().count() > 2 {
            Some(trimmed)
        } else {
            None
        }
    }
}

impl Default for WordTokenizer {
    fn default() -> Self {
        WordTokenizer::new(&LexiconConfig::default())
    }
}
