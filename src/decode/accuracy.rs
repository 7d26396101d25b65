//! Word-level accuracy over labelled traces
//!
//! Tracks:
//! - Top-1: the best candidate equals the expected word
//! - Top-k: the expected word appears among the first k candidates
//!
//! Expected words are normalized the way targets are tokenized (uppercase,
//! letters only, at most MAX_WORD_LEN), so "don't" matches "DONT".

use super::pipeline::Prediction;
use crate::vocab::TokenSequence;

#[derive(Clone, Debug)]
pub struct WordAccuracy {
    k: usize,
    total: u32,
    top1: u32,
    topk: u32,
}

impl WordAccuracy {
    pub fn new(k: usize) -> Self {
        WordAccuracy {
            k: k.max(1),
            total: 0,
            top1: 0,
            topk: 0,
        }
    }

    /// Record one decoded trace. Returns whether the best candidate was correct.
    /// An empty prediction list counts as a miss.
    pub fn record(&mut self, expected: &str, predictions: &[Prediction]) -> bool {
        let expected = TokenSequence::from_word(expected).word();
        let hit = predictions
            .first()
            .map_or(false, |best| best.word == expected);
        let in_top_k = predictions
            .iter()
            .take(self.k)
            .any(|p| p.word == expected);

        self.total += 1;
        if hit {
            self.top1 += 1;
        }
        if in_top_k {
            self.topk += 1;
        }
        hit
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// Fraction of traces whose best candidate was correct; 0 before any record.
    pub fn top1_accuracy(&self) -> f32 {
        self.top1 as f32 / self.total.max(1) as f32
    }

    pub fn topk_accuracy(&self) -> f32 {
        self.topk as f32 / self.total.max(1) as f32
    }

    pub fn reset(&mut self) {
        *self = WordAccuracy::new(self.k);
    }
}

impl Default for WordAccuracy {
    fn default() -> Self {
        WordAccuracy::new(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preds(words: &[&str]) -> Vec<Prediction> {
        words
            .iter()
            .enumerate()
            .map(|(i, w)| Prediction {
                word: w.to_string(),
                score: -(i as f32),
            })
            .collect()
    }

    #[test]
    fn test_top1_and_topk() {
        let mut acc = WordAccuracy::new(3);
        assert_eq!(acc.top1_accuracy(), 0.0);

        assert!(acc.record("hello", &preds(&["HELLO", "HELP"])));
        assert!(!acc.record("help", &preds(&["HELLO", "HELP"])));
        assert!(!acc.record("world", &preds(&["WORD", "WORLD", "WOULD", "WORLDS"][..3])));
        assert!(!acc.record("quiz", &preds(&["QUIT", "QUIZZ", "QUILT", "QUIZ"])));
        assert!(!acc.record("gone", &[]));

        assert_eq!(acc.total(), 5);
        assert!((acc.top1_accuracy() - 0.2).abs() < 1e-6);
        assert!((acc.topk_accuracy() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_expected_word_normalized() {
        let mut acc = WordAccuracy::default();
        assert!(acc.record("don't", &preds(&["DONT"])));
        acc.reset();
        assert_eq!(acc.total(), 0);
        assert_eq!(acc.k(), 3);
    }
}
