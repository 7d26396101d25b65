//! Greedy decoding: always take the most likely non-PAD token.

use super::beam::top_k_tokens;
use super::next_token_log_probs;
use crate::error::SwipeResult;
use crate::model::{EncoderMemory, SwipeTransformer};
use crate::vocab::{EOS_TOKEN, SOS_TOKEN, VOCAB_SIZE};

/// Decode single-item memory for at most `max_steps` tokens. The result
/// starts with SOS and ends with EOS unless the step limit was hit first.
pub fn greedy_decode(
    model: &SwipeTransformer,
    memory: &EncoderMemory,
    max_steps: usize,
) -> SwipeResult<Vec<u32>> {
    let mut tokens = Vec::with_capacity(max_steps + 1);
    tokens.push(SOS_TOKEN);
    let mut best = Vec::with_capacity(VOCAB_SIZE);

    for _ in 0..max_steps {
        let rows = next_token_log_probs(model, memory, &tokens, 1)?;
        top_k_tokens(&rows[0], 1, &mut best);
        let token = match best.first() {
            Some(&(token, _)) => token,
            None => break,
        };
        tokens.push(token);
        if token == EOS_TOKEN {
            break;
        }
    }
    Ok(tokens)
}
