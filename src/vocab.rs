//! Token vocabulary: PAD, A-Z, SOS, EOS
//!
//! Handles:
//! - Letter ↔ token mapping (A=1 .. Z=26)
//! - Fixed-length target sequences (SOS + letters + EOS + PAD)
//! - Token sequence → word decoding

use crate::keyboard::{index_letter, letter_index};
use candle_core::{Device, Tensor};
use tracing::warn;

pub const PAD_TOKEN: u32 = 0;
pub const SOS_TOKEN: u32 = 27;
pub const EOS_TOKEN: u32 = 28;
/// PAD + 26 letters + SOS + EOS
pub const VOCAB_SIZE: usize = 29;

/// Longest word the model is trained to emit.
pub const MAX_WORD_LEN: usize = 20;
/// Target sequence length: letters plus SOS and EOS.
pub const TARGET_LEN: usize = MAX_WORD_LEN + 2;

/// Convert a letter (either case) to its token.
pub fn char_to_token(c: char) -> Option<u32> {
    letter_index(c).map(|idx| idx as u32 + 1)
}

/// Convert a letter token to its uppercase character.
pub fn token_to_char(token: u32) -> Option<char> {
    if (1..=26).contains(&token) {
        index_letter(token as usize - 1)
    } else {
        None
    }
}

/// Decode tokens to a word: letters only, stopping at EOS, skipping SOS/PAD.
pub fn tokens_to_word(tokens: &[u32]) -> String {
    let mut word = String::new();
    for &token in tokens {
        if token == EOS_TOKEN {
            break;
        }
        if let Some(c) = token_to_char(token) {
            word.push(c);
        }
    }
    word
}

/// SOS-prefixed, EOS-terminated, PAD-filled target of exactly TARGET_LEN tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenSequence {
    tokens: [u32; TARGET_LEN],
    len: usize,
}

impl TokenSequence {
    /// Encode a word. The first MAX_WORD_LEN characters are kept and
    /// anything that is not an A-Z letter is dropped.
    pub fn from_word(word: &str) -> Self {
        let mut tokens = [PAD_TOKEN; TARGET_LEN];
        tokens[0] = SOS_TOKEN;
        let mut len = 1;
        for c in word.chars().take(MAX_WORD_LEN) {
            match char_to_token(c) {
                Some(token) => {
                    tokens[len] = token;
                    len += 1;
                }
                None => warn!(word, skipped = %c, "non-letter dropped from target"),
            }
        }
        tokens[len] = EOS_TOKEN;
        TokenSequence {
            tokens,
            len: len + 1,
        }
    }

    /// All TARGET_LEN tokens, padding included.
    pub fn as_slice(&self) -> &[u32] {
        &self.tokens
    }

    /// Tokens up to and including EOS.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn word(&self) -> String {
        tokens_to_word(&self.tokens)
    }
}

/// Stack target sequences into a (B, TARGET_LEN) u32 tensor.
pub fn target_batch(sequences: &[TokenSequence], device: &Device) -> candle_core::Result<Tensor> {
    let data: Vec<u32> = sequences
        .iter()
        .flat_map(|s| s.as_slice().iter().copied())
        .collect();
    Tensor::from_vec(data, (sequences.len(), TARGET_LEN), device)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let seq = TokenSequence::from_word("HELLO");
        assert_eq!(&seq.as_slice()[..7], &[SOS_TOKEN, 8, 5, 12, 12, 15, EOS_TOKEN]);
        assert!(seq.as_slice()[7..].iter().all(|&t| t == PAD_TOKEN));
        assert_eq!(seq.len(), 7);
        assert_eq!(seq.word(), "HELLO");
    }

    #[test]
    fn test_lowercase_and_non_letters() {
        let seq = TokenSequence::from_word("don't");
        assert_eq!(seq.word(), "DONT");
    }

    #[test]
    fn test_long_word_capped() {
        let word = "PNEUMONOULTRAMICROSCOPIC";
        let seq = TokenSequence::from_word(word);
        assert_eq!(seq.len(), TARGET_LEN);
        assert_eq!(seq.as_slice()[TARGET_LEN - 1], EOS_TOKEN);
        assert_eq!(seq.word(), &word[..MAX_WORD_LEN]);
    }

    #[test]
    fn test_tokens_to_word_stops_at_eos() {
        let tokens = [SOS_TOKEN, 1, PAD_TOKEN, 2, EOS_TOKEN, 3];
        assert_eq!(tokens_to_word(&tokens), "AB");
        assert_eq!(token_to_char(SOS_TOKEN), None);
        assert_eq!(char_to_token('z'), Some(26));
    }

    #[test]
    fn test_target_batch_shape() {
        let seqs = [TokenSequence::from_word("A"), TokenSequence::from_word("BC")];
        let batch = target_batch(&seqs, &Device::Cpu).unwrap();
        assert_eq!(batch.dims(), &[2, TARGET_LEN]);
    }
}
