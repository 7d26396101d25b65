//! Autoregressive decoding of encoder memory into candidate words
//!
//! # Components
//! - `beam.rs`: batched beam search with length-normalized final ranking
//! - `greedy.rs`: argmax reference decoder
//! - `pipeline.rs`: `SwipeDecoder`, trace in → ranked words out
//! - `accuracy.rs`: top-1 / top-k word accuracy over labelled traces

pub mod accuracy;
pub mod beam;
pub mod greedy;
pub mod pipeline;

pub use accuracy::WordAccuracy;
pub use beam::{BeamSearch, BeamSearchConfig, Candidate, MAX_DECODE_STEPS};
pub use greedy::greedy_decode;
pub use pipeline::{Prediction, SwipeDecoder};

use crate::error::SwipeResult;
use crate::model::ops::log_softmax;
use crate::model::{EncoderMemory, SwipeTransformer};
use candle_core::Tensor;

/// Run the decoder on `rows` equal-length token prefixes (flattened
/// row-major in `tokens`) against single-item memory, returning the
/// log-probabilities of the next token for each prefix.
pub(crate) fn next_token_log_probs(
    model: &SwipeTransformer,
    memory: &EncoderMemory,
    tokens: &[u32],
    rows: usize,
) -> SwipeResult<Vec<Vec<f32>>> {
    let len = tokens.len() / rows;
    let tokens = Tensor::from_slice(tokens, (rows, len), model.device())?;

    let (_, seq_len, d_model) = memory.memory.dims3()?;
    let expanded = memory
        .memory
        .broadcast_as((rows, seq_len, d_model))?
        .contiguous()?;
    let mask = memory
        .padding_mask
        .broadcast_as((rows, 1, 1, seq_len))?
        .contiguous()?;

    let logits = model.decode(&tokens, &expanded, &mask)?;
    let last = logits.narrow(1, len - 1, 1)?.squeeze(1)?;
    Ok(log_softmax(&last)?.to_vec2::<f32>()?)
}
