//! Multi-head attention from primitive ops.
//!
//! Q/K/V projections → split heads → QKᵀ · 1/√d_k → masked softmax → ·V →
//! merge heads → output projection. No fused attention kernel is used, so
//! the same graph serves training and export.

use super::config::ModelConfig;
use super::ops::{masked_softmax, projection};
use crate::error::SwipeResult;
use candle_core::Tensor;
use candle_nn::{Dropout, Linear, Module, VarBuilder};

#[derive(Clone, Debug)]
pub struct MultiHeadAttention {
    q_proj: Linear,
    k_proj: Linear,
    v_proj: Linear,
    out_proj: Linear,
    attn_dropout: Dropout,
    num_heads: usize,
    head_dim: usize,
    scale: f64,
}

impl MultiHeadAttention {
    pub fn new(config: &ModelConfig, vb: VarBuilder) -> SwipeResult<Self> {
        let d = config.d_model;
        let head_dim = config.head_dim();
        Ok(MultiHeadAttention {
            q_proj: projection(d, d, vb.pp("q_proj"))?,
            k_proj: projection(d, d, vb.pp("k_proj"))?,
            v_proj: projection(d, d, vb.pp("v_proj"))?,
            out_proj: projection(d, d, vb.pp("out_proj"))?,
            attn_dropout: Dropout::new(config.dropout),
            num_heads: config.num_heads,
            head_dim,
            scale: 1.0 / (head_dim as f64).sqrt(),
        })
    }

    /// (B, T, d_model) → (B, heads, T, head_dim)
    fn split_heads(&self, x: &Tensor, batch: usize, len: usize) -> SwipeResult<Tensor> {
        Ok(x.reshape((batch, len, self.num_heads, self.head_dim))?
            .transpose(1, 2)?
            .contiguous()?)
    }

    /// Attend from `query` (B, Tq, d) over `key_value` (B, Tk, d).
    ///
    /// `mask` must broadcast to (B, heads, Tq, Tk); entries equal to 1 are excluded.
    /// With `train` set, attention weights go through dropout.
    pub fn forward(
        &self,
        query: &Tensor,
        key_value: &Tensor,
        mask: Option<&Tensor>,
        train: bool,
    ) -> SwipeResult<Tensor> {
        let (batch, q_len, d_model) = query.dims3()?;
        let (_, k_len, _) = key_value.dims3()?;

        let q = self.split_heads(&self.q_proj.forward(query)?, batch, q_len)?;
        let k = self.split_heads(&self.k_proj.forward(key_value)?, batch, k_len)?;
        let v = self.split_heads(&self.v_proj.forward(key_value)?, batch, k_len)?;

        let k_t = k.transpose(2, 3)?.contiguous()?;
        let scores = (q.matmul(&k_t)? * self.scale)?;
        let weights = masked_softmax(&scores, mask)?;
        let weights = self.attn_dropout.forward(&weights, train)?;

        let context = weights
            .matmul(&v)?
            .transpose(1, 2)?
            .contiguous()?
            .reshape((batch, q_len, d_model))?;
        Ok(self.out_proj.forward(&context)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mask::stroke_padding_mask;
    use candle_core::{DType, Device, IndexOp};
    use candle_nn::VarMap;

    fn small_config() -> ModelConfig {
        ModelConfig {
            d_model: 8,
            num_heads: 2,
            num_layers: 1,
            ..ModelConfig::default()
        }
    }

    #[test]
    fn test_output_shape() {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let attn = MultiHeadAttention::new(&small_config(), vb).unwrap();
        let q = Tensor::randn(0f32, 1.0, (2, 3, 8), &Device::Cpu).unwrap();
        let kv = Tensor::randn(0f32, 1.0, (2, 5, 8), &Device::Cpu).unwrap();
        let out = attn.forward(&q, &kv, None, false).unwrap();
        assert_eq!(out.dims(), &[2, 3, 8]);
    }

    #[test]
    fn test_padded_keys_have_no_influence() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let attn = MultiHeadAttention::new(&small_config(), vb).unwrap();

        let q = Tensor::randn(0f32, 1.0, (1, 2, 8), &device).unwrap();
        let kv = Tensor::randn(0f32, 1.0, (1, 6, 8), &device).unwrap();
        let noise = Tensor::randn(0f32, 5.0, (1, 3, 8), &device).unwrap();
        let kv_changed = Tensor::cat(&[&kv.i((.., 0..3, ..)).unwrap(), &noise], 1).unwrap();
        let mask = stroke_padding_mask(&[3], 6, &device).unwrap();

        let a = attn.forward(&q, &kv, Some(&mask), false).unwrap();
        let b = attn.forward(&q, &kv_changed, Some(&mask), false).unwrap();
        let diff = (a - b)
            .unwrap()
            .abs()
            .unwrap()
            .max_keepdim(2)
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1::<f32>()
            .unwrap();
        assert!(diff.iter().all(|&d| d < 1e-6));
    }
}
