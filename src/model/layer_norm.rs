//! Layer normalization from elementwise ops.

use crate::error::SwipeResult;
use candle_core::{Tensor, D};
use candle_nn::{Init, VarBuilder};

pub const LAYER_NORM_EPS: f64 = 1e-5;

/// (x - mean) / sqrt(var + eps) * weight + bias over the last dimension.
#[derive(Clone, Debug)]
pub struct LayerNorm {
    weight: Tensor,
    bias: Tensor,
    eps: f64,
}

impl LayerNorm {
    pub fn new(dim: usize, vb: VarBuilder) -> SwipeResult<Self> {
        let weight = vb.get_with_hints(dim, "weight", Init::Const(1.0))?;
        let bias = vb.get_with_hints(dim, "bias", Init::Const(0.0))?;
        Ok(LayerNorm {
            weight,
            bias,
            eps: LAYER_NORM_EPS,
        })
    }

    pub fn forward(&self, x: &Tensor) -> SwipeResult<Tensor> {
        let mean = x.mean_keepdim(D::Minus1)?;
        let centered = x.broadcast_sub(&mean)?;
        let var = centered.sqr()?.mean_keepdim(D::Minus1)?;
        let std = (var + self.eps)?.sqrt()?;
        let normalized = centered.broadcast_div(&std)?;
        Ok(normalized
            .broadcast_mul(&self.weight)?
            .broadcast_add(&self.bias)?)
    }
}
