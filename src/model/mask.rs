//! Attention masks. 1 marks a position that may not be attended to.

use crate::error::SwipeResult;
use candle_core::{Device, Tensor};

/// Key-padding mask of shape (B, 1, 1, seq_len): position j of row b is
/// excluded when j >= lengths[b].
pub fn stroke_padding_mask(lengths: &[usize], seq_len: usize, device: &Device) -> SwipeResult<Tensor> {
    let data: Vec<u8> = lengths
        .iter()
        .flat_map(|&len| (0..seq_len).map(move |j| u8::from(j >= len)))
        .collect();
    Ok(Tensor::from_vec(data, (lengths.len(), 1, 1, seq_len), device)?)
}

/// Causal mask of shape (1, 1, len, len): query i may not see key j > i.
pub fn causal_mask(len: usize, device: &Device) -> SwipeResult<Tensor> {
    let data: Vec<u8> = (0..len)
        .flat_map(|i| (0..len).map(move |j| u8::from(j > i)))
        .collect();
    Ok(Tensor::from_vec(data, (1, 1, len, len), device)?)
}
