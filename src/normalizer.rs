// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Text normalization: raw text → ordered token sequence
//!
//! Steps, in order:
//! - lowercase
//! - strip URLs
//! - treat every non-alphabetic character as a separator
//! - drop short tokens and English stopwords
//! - optionally reduce tokens to Porter stems

use crate::stemmer::PorterStemmer;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;

/// English stopwords (NLTK list, apostrophe forms omitted since they never survive tokenization)
pub const ENGLISH_STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
    "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself",
    "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
    "who", "whom", "this", "that", "these", "those", "am", "is", "are", "was", "were", "be",
    "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
    "the", "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by", "for",
    "with", "about", "against", "between", "into", "through", "during", "before", "after",
    "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over", "under",
    "again", "further", "then", "once", "here", "there", "when", "where", "why", "how", "all",
    "any", "both", "each", "few", "more", "most", "other", "some", "such", "no", "nor", "not",
    "only", "own", "same", "so", "than", "too", "very", "s", "t", "can", "will", "just", "don",
    "should", "now", "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "couldn", "didn",
    "doesn", "hadn", "hasn", "haven", "isn", "ma", "mightn", "mustn", "needn", "shan",
    "shouldn", "wasn", "weren", "won", "wouldn",
];

static STOP_WORDS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| ENGLISH_STOP_WORDS.iter().copied().collect());

pub(crate) static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+|www\.\S+").expect("URL pattern is valid"));

/// Normalization settings; persisted alongside the vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Reduce tokens to Porter stems
    pub stem: bool,
    /// Drop English stopwords
    pub remove_stopwords: bool,
    /// Minimum token length in characters
    pub min_token_len: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            stem: false,
            remove_stopwords: true,
            min_token_len: 1,
        }
    }
}

/// Deterministic, side-effect free text normalizer
#[derive(Debug, Clone, Default)]
pub struct TextNormalizer {
    config: NormalizerConfig,
    stemmer: PorterStemmer,
}

impl TextNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self {
            config,
            stemmer: PorterStemmer::new(),
        }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Normalize raw text into tokens. Empty input yields no tokens.
    ///
    /// With stemming on, stems are filtered again so that normalizing the
    /// joined output reproduces it.
    pub fn normalize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let without_urls = URL_PATTERN.replace_all(&lowered, " ");

        without_urls
            .split(|c: char| !c.is_alphabetic())
            .filter(|token| self.keep(token))
            .filter_map(|token| {
                if !self.config.stem {
                    return Some(token.to_string());
                }
                let stem = self.stemmer.stem_stable(token);
                self.keep(&stem).then_some(stem)
            })
            .collect()
    }

    fn keep(&self, token: &str) -> bool {
        !token.is_empty()
            && token.chars().count() >= self.config.min_token_len
            && !(self.config.remove_stopwords && is_stop_word(token))
    }

    pub fn normalize_batch<T: AsRef<str>>(&self, texts: &[T]) -> Vec<Vec<String>> {
        texts.iter().map(|t| self.normalize(t.as_ref())).collect()
    }
}

/// Whether `token` is in the fixed English stopword set
pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_normalization() {
        let normalizer = TextNormalizer::default();
        let tokens = normalizer.normalize("The Stock-Market CRASHED today!!! 2024");
        assert_eq!(tokens, vec!["stock", "market", "crashed", "today"]);
    }

    #[test]
    fn test_urls_removed() {
        let normalizer = TextNormalizer::default();
        let tokens = normalizer.normalize("Read more at https://example.com/a?b=c or www.fake.net now");
        assert_eq!(tokens, vec!["read"]);
    }

    #[test]
    fn test_empty_input() {
        let normalizer = TextNormalizer::default();
        assert!(normalizer.normalize("").is_empty());
        assert!(normalizer.normalize("   \t\n ").is_empty());
        assert!(normalizer.normalize("1234 !!! ...").is_empty());
        assert!(normalizer.normalize("the and of").is_empty());
    }

    #[test]
    fn test_idempotent_on_normalized_output() {
        let normalizer = TextNormalizer::default();
        let inputs = [
            "Aliens built the pyramids, say EXPERTS!",
            "Ünïcödé Straße and naïve café's",
            "You won't believe what happens next... https://t.co/xyz",
            "",
        ];

        for input in inputs {
            let once = normalizer.normalize(input);
            let twice = normalizer.normalize(&once.join(" "));
            assert_eq!(once, twice, "input: {input}");
        }
    }

    #[test]
    fn test_idempotent_with_stemming() {
        let normalizer = TextNormalizer::new(NormalizerConfig {
            stem: true,
            ..NormalizerConfig::default()
        });
        let inputs = [
            "The parties agreed on funding for universities",
            "Generalization of relational hopping dos",
            "Aliens built the pyramids, say EXPERTS!",
            "Ünïcödé Straße and naïve café's",
        ];

        for input in inputs {
            let once = normalizer.normalize(input);
            let twice = normalizer.normalize(&once.join(" "));
            assert_eq!(once, twice, "input: {input}");
        }
        assert_eq!(normalizer.normalize("agreed"), vec!["agr"]);
    }

    #[test]
    fn test_stems_that_become_stopwords_are_dropped() {
        let normalizer = TextNormalizer::new(NormalizerConfig {
            stem: true,
            ..NormalizerConfig::default()
        });
        // "dos" is not a stopword but stems to "do", which is
        assert!(normalizer.normalize("dos").is_empty());
    }

    #[test]
    fn test_deterministic() {
        let normalizer = TextNormalizer::default();
        let text = "Breaking: shocking secret revealed";
        assert_eq!(normalizer.normalize(text), normalizer.normalize(text));
    }

    #[test]
    fn test_stemming_optional() {
        let normalizer = TextNormalizer::new(NormalizerConfig {
            stem: true,
            ..NormalizerConfig::default()
        });
        let tokens = normalizer.normalize("Running cats hopping");
        assert_eq!(tokens, vec!["run", "cat", "hop"]);
    }

    #[test]
    fn test_keep_stopwords_and_min_len() {
        let normalizer = TextNormalizer::new(NormalizerConfig {
            stem: false,
            remove_stopwords: false,
            min_token_len: 3,
        });
        let tokens = normalizer.normalize("the cat is on a mat");
        assert_eq!(tokens, vec!["the", "cat", "mat"]);
    }

    #[test]
    fn test_stop_word_lookup() {
        assert!(is_stop_word("the"));
        assert!(is_stop_word("wouldn"));
        assert!(!is_stop_word("pyramids"));
    }
}
