//! Token embedding, feed-forward sublayer and the shared transformer block.

use super::attention::MultiHeadAttention;
use super::config::ModelConfig;
use super::layer_norm::LayerNorm;
use super::ops::{linear, xavier_init};
use crate::error::SwipeResult;
use crate::vocab::{PAD_TOKEN, VOCAB_SIZE};
use candle_core::{DType, Tensor};
use candle_nn::{Dropout, Linear, Module, VarBuilder};

/// Vocabulary embedding whose PAD row always contributes zero.
#[derive(Clone, Debug)]
pub struct TokenEmbedding {
    weight: Tensor,
    d_model: usize,
}

impl TokenEmbedding {
    pub fn new(d_model: usize, vb: VarBuilder) -> SwipeResult<Self> {
        let weight =
            vb.get_with_hints((VOCAB_SIZE, d_model), "weight", xavier_init(VOCAB_SIZE, d_model))?;
        Ok(TokenEmbedding { weight, d_model })
    }

    /// (B, T) u32 tokens → (B, T, d_model)
    pub fn forward(&self, tokens: &Tensor) -> SwipeResult<Tensor> {
        let (batch, len) = tokens.dims2()?;
        let flat = tokens.flatten_all()?;
        let embedded = self
            .weight
            .index_select(&flat, 0)?
            .reshape((batch, len, self.d_model))?;
        let keep = flat
            .ne(PAD_TOKEN)?
            .to_dtype(DType::F32)?
            .reshape((batch, len, 1))?;
        Ok(embedded.broadcast_mul(&keep)?)
    }
}

/// Linear(d, 4d) → ReLU → dropout → Linear(4d, d)
#[derive(Clone, Debug)]
pub struct FeedForward {
    linear1: Linear,
    linear2: Linear,
    dropout: Dropout,
}

impl FeedForward {
    pub fn new(config: &ModelConfig, vb: VarBuilder) -> SwipeResult<Self> {
        Ok(FeedForward {
            linear1: linear(config.d_model, config.feedforward_dim(), vb.pp("linear1"))?,
            linear2: linear(config.feedforward_dim(), config.d_model, vb.pp("linear2"))?,
            dropout: Dropout::new(config.dropout),
        })
    }

    pub fn forward(&self, x: &Tensor, train: bool) -> SwipeResult<Tensor> {
        let hidden = self.linear1.forward(x)?.relu()?;
        let hidden = self.dropout.forward(&hidden, train)?;
        Ok(self.linear2.forward(&hidden)?)
    }
}

#[derive(Clone, Debug)]
struct CrossAttention {
    attn: MultiHeadAttention,
    norm: LayerNorm,
}

/// Post-norm transformer block. Encoder blocks carry self-attention and a
/// feed-forward sublayer; decoder blocks add cross-attention over the
/// encoder memory between the two. In training mode every sublayer output
/// passes through dropout before its residual add.
#[derive(Clone, Debug)]
pub struct TransformerBlock {
    self_attn: MultiHeadAttention,
    self_attn_norm: LayerNorm,
    cross_attn: Option<CrossAttention>,
    feed_forward: FeedForward,
    feed_forward_norm: LayerNorm,
    residual_dropout: Dropout,
}

impl TransformerBlock {
    pub fn encoder(config: &ModelConfig, vb: VarBuilder) -> SwipeResult<Self> {
        Self::build(config, vb, false)
    }

    pub fn decoder(config: &ModelConfig, vb: VarBuilder) -> SwipeResult<Self> {
        Self::build(config, vb, true)
    }

    fn build(config: &ModelConfig, vb: VarBuilder, with_cross: bool) -> SwipeResult<Self> {
        let cross_attn = if with_cross {
            Some(CrossAttention {
                attn: MultiHeadAttention::new(config, vb.pp("cross_attn"))?,
                norm: LayerNorm::new(config.d_model, vb.pp("cross_attn_norm"))?,
            })
        } else {
            None
        };
        Ok(TransformerBlock {
            self_attn: MultiHeadAttention::new(config, vb.pp("self_attn"))?,
            self_attn_norm: LayerNorm::new(config.d_model, vb.pp("self_attn_norm"))?,
            cross_attn,
            feed_forward: FeedForward::new(config, vb.pp("feed_forward"))?,
            feed_forward_norm: LayerNorm::new(config.d_model, vb.pp("feed_forward_norm"))?,
            residual_dropout: Dropout::new(config.dropout),
        })
    }

    /// `memory` is the encoder output with its key-padding mask; it is
    /// ignored by blocks without cross-attention.
    pub fn forward(
        &self,
        x: &Tensor,
        self_mask: Option<&Tensor>,
        memory: Option<(&Tensor, &Tensor)>,
        train: bool,
    ) -> SwipeResult<Tensor> {
        let attended = self.self_attn.forward(x, x, self_mask, train)?;
        let attended = self.residual_dropout.forward(&attended, train)?;
        let mut x = self.self_attn_norm.forward(&(x + attended)?)?;

        if let (Some(cross), Some((memory, memory_mask))) = (&self.cross_attn, memory) {
            let attended = cross.attn.forward(&x, memory, Some(memory_mask), train)?;
            let attended = self.residual_dropout.forward(&attended, train)?;
            x = cross.norm.forward(&(&x + attended)?)?;
        }

        let projected = self.feed_forward.forward(&x, train)?;
        let projected = self.residual_dropout.forward(&projected, train)?;
        self.feed_forward_norm.forward(&(&x + projected)?)
    }
}
