//! Word-level tokenizer with a frequency ranked, capped vocabulary.
//!
//! Id `0` is never assigned to a word so it can be used as padding, id `1` is the out-of-vocabulary sentinel and
//! words are numbered from `2` upwards in descending training frequency.
use std::collections::HashMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Characters replaced by whitespace before splitting.
pub const DEFAULT_FILTERS: &str = "!\"#$%&()*+,-./:;<=>?@[\\]^_`{|}~\t\n";
pub const DEFAULT_OOV_TOKEN: &str = "<UNK>";
pub const PADDING_ID: u32 = 0;
pub const OOV_ID: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenizerConfig {
    /// Maximum number of ids handed out, including the padding and OOV ids.
    pub num_words: usize,
    pub oov_token: String,
    pub lowercase: bool,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            num_words: 10_000,
            oov_token: DEFAULT_OOV_TOKEN.to_string(),
            lowercase: true,
        }
    }
}

impl TokenizerConfig {
    /// Build the frozen vocabulary from the given training corpus.
    #[tracing::instrument(skip_all, fields(num_words = self.num_words))]
    pub fn fit<'a>(self, texts: impl IntoIterator<Item = &'a str>) -> TweetTokenizer {
        // word -> (count, first occurrence)
        let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
        for word in texts.into_iter().flat_map(|text| split_words(text, self.lowercase)) {
            let next = counts.len();
            counts.entry(word).or_insert((0, next)).0 += 1;
        }

        let words = std::iter::once(self.oov_token.clone())
            .chain(
                counts
                    .into_iter()
                    .sorted_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
                        count_b.cmp(count_a).then(first_a.cmp(first_b))
                    })
                    .map(|(word, _)| word),
            )
            .collect_vec();

        tracing::debug!(distinct = words.len() - 1, "Fitted tokenizer");
        TweetTokenizer::from_words(self, words)
    }
}

/// A fitted tokenizer. There is no way to refit it, the vocabulary is fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredTokenizer", into = "StoredTokenizer")]
pub struct TweetTokenizer {
    config: TokenizerConfig,
    /// `words[i]` has id `i + 1`, `words[0]` is the OOV token.
    words: Vec<String>,
    word_index: HashMap<String, u32>,
}

#[derive(Serialize, Deserialize)]
struct StoredTokenizer {
    config: TokenizerConfig,
    words: Vec<String>,
}

impl From<StoredTokenizer> for TweetTokenizer {
    fn from(value: StoredTokenizer) -> Self {
        TweetTokenizer::from_words(value.config, value.words)
    }
}

impl From<TweetTokenizer> for StoredTokenizer {
    fn from(value: TweetTokenizer) -> Self {
        StoredTokenizer {
            config: value.config,
            words: value.words,
        }
    }
}

impl TweetTokenizer {
    fn from_words(config: TokenizerConfig, words: Vec<String>) -> Self {
        let word_index = words
            .iter()
            .enumerate()
            .map(|(i, word)| (word.clone(), i as u32 + 1))
            .collect();

        Self {
            config,
            words,
            word_index,
        }
    }

    pub fn config(&self) -> &TokenizerConfig {
        &self.config
    }

    /// Map a single text to ids. Every word yields exactly one id.
    pub fn encode(&self, text: &str) -> Vec<u32> {
        split_words(text, self.config.lowercase)
            .map(|word| match self.word_index.get(&word) {
                Some(&id) if (id as usize) < self.config.num_words => id,
                _ => OOV_ID,
            })
            .collect()
    }

    pub fn texts_to_sequences<'a>(&self, texts: impl IntoIterator<Item = &'a str>) -> Vec<Vec<u32>> {
        texts.into_iter().map(|text| self.encode(text)).collect()
    }

    /// Reverse the encoding, ids without a word (padding, out of range) are skipped.
    pub fn decode(&self, ids: &[u32]) -> String {
        ids.iter().filter_map(|&id| self.index_word(id)).join(" ")
    }

    /// Number of distinct ids that [Self::encode] can produce, including the padding id.
    pub fn vocab_size(&self) -> usize {
        self.config.num_words.min(self.words.len() + 1)
    }

    /// Number of distinct words seen while fitting, not counting the OOV token.
    pub fn num_distinct_words(&self) -> usize {
        self.words.len() - 1
    }

    /// The full word index, including words past the `num_words` cap.
    pub fn word_index(&self) -> &HashMap<String, u32> {
        &self.word_index
    }

    pub fn index_word(&self, id: u32) -> Option<&str> {
        let idx = (id as usize).checked_sub(1)?;
        self.words.get(idx).map(String::as_str)
    }

    /// The `n` most frequent words with their ids.
    pub fn most_frequent(&self, n: usize) -> impl Iterator<Item = (&str, u32)> {
        self.words
            .iter()
            .enumerate()
            .skip(1)
            .take(n)
            .map(|(i, word)| (word.as_str(), i as u32 + 1))
    }
}

fn split_words(text: &str, lowercase: bool) -> impl Iterator<Item = String> + '_ {
    let cleaned: String = text
        .chars()
        .map(|c| if DEFAULT_FILTERS.contains(c) { ' ' } else { c })
        .collect();
    let cleaned = if lowercase { cleaned.to_lowercase() } else { cleaned };

    cleaned
        .split(' ')
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect_vec()
        .into_iter()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fitted(num_words: usize, texts: &[&str]) -> TweetTokenizer {
        TokenizerConfig {
            num_words,
            ..Default::default()
        }
        .fit(texts.iter().copied())
    }

    #[test]
    fn ids_rank_by_frequency_then_first_occurrence() {
        let tok = fitted(100, &["b a", "a c", "c a"]);

        assert_eq!(tok.index_word(OOV_ID), Some(DEFAULT_OOV_TOKEN));
        assert_eq!(tok.word_index()["a"], 2);
        assert_eq!(tok.word_index()["c"], 3);
        assert_eq!(tok.word_index()["b"], 4);
    }

    #[test]
    fn normalises_case_and_punctuation() {
        let tok = fitted(100, &["Hello, WORLD!"]);

        assert_eq!(tok.encode("hello world"), tok.encode("HELLO... world?"));
        assert_eq!(tok.encode("hello world"), vec![2, 3]);
    }

    #[test]
    fn capped_vocabulary_maps_rare_words_to_oov() {
        let tok = fitted(10, &["i am so happy today", "this makes me very angry"]);
        let seqs = tok.texts_to_sequences(["i am so happy today", "this makes me very angry"]);

        assert_eq!(seqs[0], vec![2, 3, 4, 5, 6]);
        assert_eq!(seqs[1], vec![7, 8, 9, OOV_ID, OOV_ID]);
        assert_eq!(tok.vocab_size(), 10);
    }

    #[test]
    fn distinct_words_exclude_the_oov_token() {
        let tok = fitted(100, &["happy happy day", "sad day"]);

        assert_eq!(tok.num_distinct_words(), 3);
        assert_eq!(tok.word_index().len(), 4);
    }

    #[test]
    fn unseen_words_map_to_oov() {
        let tok = fitted(100, &["happy"]);

        assert_eq!(tok.encode("happy zebra"), vec![2, OOV_ID]);
        assert_eq!(tok.vocab_size(), 3);
    }

    #[test]
    fn decode_skips_padding() {
        let tok = fitted(100, &["feel great"]);

        assert_eq!(tok.decode(&[2, 3, PADDING_ID, PADDING_ID]), "feel great");
    }

    #[test]
    fn serialised_tokenizer_keeps_its_index() {
        let tok = fitted(5, &["x y z z"]);
        let json = serde_json::to_string(&tok).unwrap();
        let restored: TweetTokenizer = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, tok);
        assert_eq!(restored.encode("z x"), tok.encode("z x"));
    }
}
