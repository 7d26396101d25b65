//! Primitive building blocks shared by the attention stacks.

use crate::error::SwipeResult;
use candle_core::{Tensor, D};
use candle_nn::{Init, Linear, VarBuilder};

/// Softmax over the last dimension with positions where `mask` is 1 forced
/// to -inf first, so they receive exactly zero weight. The row maximum is
/// subtracted before exponentiating.
pub fn masked_softmax(scores: &Tensor, mask: Option<&Tensor>) -> SwipeResult<Tensor> {
    let scores = match mask {
        Some(mask) => {
            let dims = scores.dims();
            let mask = mask.broadcast_as(dims)?;
            let neg_inf = Tensor::new(f32::NEG_INFINITY, scores.device())?.broadcast_as(dims)?;
            mask.where_cond(&neg_inf, scores)?
        }
        None => scores.clone(),
    };
    let max = scores.max_keepdim(D::Minus1)?;
    let exp = scores.broadcast_sub(&max)?.exp()?;
    let sum = exp.sum_keepdim(D::Minus1)?;
    Ok(exp.broadcast_div(&sum)?)
}

/// log(softmax(x)) over the last dimension, computed as x - max - log Σ exp(x - max).
pub fn log_softmax(xs: &Tensor) -> SwipeResult<Tensor> {
    let max = xs.max_keepdim(D::Minus1)?;
    let shifted = xs.broadcast_sub(&max)?;
    let log_sum = shifted.exp()?.sum_keepdim(D::Minus1)?.log()?;
    Ok(shifted.broadcast_sub(&log_sum)?)
}

/// Xavier-uniform bound sqrt(6 / (fan_in + fan_out)).
pub fn xavier_bound(fan_in: usize, fan_out: usize) -> f64 {
    (6.0 / (fan_in + fan_out) as f64).sqrt()
}

/// Xavier-uniform init for a (rows, cols) weight matrix.
pub fn xavier_init(rows: usize, cols: usize) -> Init {
    let bound = xavier_bound(cols, rows);
    Init::Uniform {
        lo: -bound,
        up: bound,
    }
}

/// Linear layer with a Xavier-uniform weight and a U(±1/√fan_in) bias.
pub fn linear(in_dim: usize, out_dim: usize, vb: VarBuilder) -> SwipeResult<Linear> {
    let weight = vb.get_with_hints((out_dim, in_dim), "weight", xavier_init(out_dim, in_dim))?;
    let bound = 1.0 / (in_dim as f64).sqrt();
    let bias = vb.get_with_hints(
        out_dim,
        "bias",
        Init::Uniform {
            lo: -bound,
            up: bound,
        },
    )?;
    Ok(Linear::new(weight, Some(bias)))
}

/// Attention projection: Xavier-uniform weight, zero bias.
pub fn projection(in_dim: usize, out_dim: usize, vb: VarBuilder) -> SwipeResult<Linear> {
    let weight = vb.get_with_hints((out_dim, in_dim), "weight", xavier_init(out_dim, in_dim))?;
    let bias = vb.get_with_hints(out_dim, "bias", Init::Const(0.0))?;
    Ok(Linear::new(weight, Some(bias)))
}
