//! `SwipeTransformer`: gesture features → per-position vocabulary logits
//!
//! Encoder: Linear(input_dim → d_model) + positional encoding + N blocks
//! with key-padding self-attention. Decoder: token embedding + positional
//! encoding + N blocks with causal self-attention and cross-attention over
//! the encoder memory, then Linear(d_model → VOCAB_SIZE).
//!
//! The `_t` variants take a `train` flag that enables dropout; the plain
//! methods are the deterministic inference path used by decoding.

use super::config::ModelConfig;
use super::layers::{TokenEmbedding, TransformerBlock};
use super::loss::sequence_loss;
use super::mask::{causal_mask, stroke_padding_mask};
use super::ops::linear;
use super::positional::PositionalEncoding;
use crate::error::{SwipeError, SwipeResult};
use crate::vocab::VOCAB_SIZE;
use candle_core::{DType, Device, Tensor};
use candle_nn::{Linear, Module, VarBuilder, VarMap};
use tracing::{debug, info};

/// Encoder output for a batch: one d_model vector per input position, the
/// key-padding mask derived from the valid lengths, and the lengths themselves.
#[derive(Clone, Debug)]
pub struct EncoderMemory {
    pub memory: Tensor,
    pub padding_mask: Tensor,
    pub lengths: Vec<usize>,
}

impl EncoderMemory {
    pub fn batch_size(&self) -> usize {
        self.lengths.len()
    }

    /// Memory of a single batch row, keeping a leading batch dim of 1.
    pub fn item(&self, index: usize) -> SwipeResult<EncoderMemory> {
        let length = *self.lengths.get(index).ok_or_else(|| {
            SwipeError::Config(format!(
                "batch index {} out of range for {} items",
                index,
                self.lengths.len()
            ))
        })?;
        Ok(EncoderMemory {
            memory: self.memory.narrow(0, index, 1)?,
            padding_mask: self.padding_mask.narrow(0, index, 1)?,
            lengths: vec![length],
        })
    }
}

/// Encoder-decoder transformer for swipe-to-text.
///
/// Parameters are owned by an internal `VarMap`; after construction or
/// loading they are only read, so one model can serve many concurrent
/// decode calls.
pub struct SwipeTransformer {
    config: ModelConfig,
    device: Device,
    varmap: VarMap,
    input_proj: Linear,
    enc_pos: PositionalEncoding,
    encoder: Vec<TransformerBlock>,
    token_embed: TokenEmbedding,
    dec_pos: PositionalEncoding,
    decoder: Vec<TransformerBlock>,
    output_proj: Linear,
}

impl SwipeTransformer {
    /// Build a freshly initialized (untrained) model.
    pub fn new(config: ModelConfig, device: &Device) -> SwipeResult<Self> {
        config.validate()?;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);

        let enc_vb = vb.pp("encoder");
        let input_proj = linear(config.input_dim, config.d_model, enc_vb.pp("input_proj"))?;
        let encoder = (0..config.num_layers)
            .map(|i| TransformerBlock::encoder(&config, enc_vb.pp("layers").pp(i)))
            .collect::<SwipeResult<Vec<_>>>()?;

        let dec_vb = vb.pp("decoder");
        let token_embed = TokenEmbedding::new(config.d_model, dec_vb.pp("token_embed"))?;
        let decoder = (0..config.num_layers)
            .map(|i| TransformerBlock::decoder(&config, dec_vb.pp("layers").pp(i)))
            .collect::<SwipeResult<Vec<_>>>()?;
        let output_proj = linear(config.d_model, VOCAB_SIZE, dec_vb.pp("output_proj"))?;

        let enc_pos = PositionalEncoding::new(config.d_model, config.encoder_positions(), device)?;
        let dec_pos = PositionalEncoding::new(config.d_model, config.decoder_positions(), device)?;

        let model = SwipeTransformer {
            config,
            device: device.clone(),
            varmap,
            input_proj,
            enc_pos,
            encoder,
            token_embed,
            dec_pos,
            decoder,
            output_proj,
        };
        info!(
            d_model = model.config.d_model,
            heads = model.config.num_heads,
            layers = model.config.num_layers,
            parameters = model.parameter_count(),
            "swipe transformer initialized"
        );
        Ok(model)
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub(crate) fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    /// Encode a (B, S, input_dim) feature batch; `lengths[b]` rows of item b are real.
    pub fn encode(&self, features: &Tensor, lengths: &[usize]) -> SwipeResult<EncoderMemory> {
        self.encode_t(features, lengths, false)
    }

    pub fn encode_t(
        &self,
        features: &Tensor,
        lengths: &[usize],
        train: bool,
    ) -> SwipeResult<EncoderMemory> {
        let (batch, seq_len, input_dim) = features.dims3()?;
        if input_dim != self.config.input_dim {
            return Err(SwipeError::DimensionMismatch {
                expected: self.config.input_dim,
                actual: input_dim,
            });
        }
        if lengths.len() != batch {
            return Err(SwipeError::Config(format!(
                "{} stroke lengths supplied for a batch of {}",
                lengths.len(),
                batch
            )));
        }
        if let Some(&len) = lengths.iter().find(|&&len| len > seq_len) {
            return Err(SwipeError::Config(format!(
                "stroke length {} exceeds sequence length {}",
                len, seq_len
            )));
        }

        let padding_mask = stroke_padding_mask(lengths, seq_len, &self.device)?;
        let mut x = self.enc_pos.forward(&self.input_proj.forward(features)?)?;
        for block in &self.encoder {
            x = block.forward(&x, Some(&padding_mask), None, train)?;
        }
        debug!(batch, seq_len, "encoded stroke batch");

        Ok(EncoderMemory {
            memory: x,
            padding_mask,
            lengths: lengths.to_vec(),
        })
    }

    /// Decode (B, T) u32 tokens against encoder memory into (B, T, VOCAB_SIZE) logits.
    pub fn decode(&self, tokens: &Tensor, memory: &Tensor, padding_mask: &Tensor) -> SwipeResult<Tensor> {
        self.decode_t(tokens, memory, padding_mask, false)
    }

    pub fn decode_t(
        &self,
        tokens: &Tensor,
        memory: &Tensor,
        padding_mask: &Tensor,
        train: bool,
    ) -> SwipeResult<Tensor> {
        let (_, len) = tokens.dims2()?;
        let self_mask = causal_mask(len, &self.device)?;

        let mut x = self.dec_pos.forward(&self.token_embed.forward(tokens)?)?;
        for block in &self.decoder {
            x = block.forward(&x, Some(&self_mask), Some((memory, padding_mask)), train)?;
        }
        Ok(self.output_proj.forward(&x)?)
    }

    /// Teacher-forced pass: the decoder sees `target` without its last token
    /// and the logits line up with `target` without its first (SOS).
    pub fn forward(&self, features: &Tensor, lengths: &[usize], target: &Tensor) -> SwipeResult<Tensor> {
        self.forward_t(features, lengths, target, false)
    }

    pub fn forward_t(
        &self,
        features: &Tensor,
        lengths: &[usize],
        target: &Tensor,
        train: bool,
    ) -> SwipeResult<Tensor> {
        let (_, target_len) = target.dims2()?;
        if target_len < 2 {
            return Err(SwipeError::Config(format!(
                "target needs at least SOS and one more token, got length {}",
                target_len
            )));
        }
        let encoded = self.encode_t(features, lengths, train)?;
        let decoder_input = target.narrow(1, 0, target_len - 1)?.contiguous()?;
        self.decode_t(&decoder_input, &encoded.memory, &encoded.padding_mask, train)
    }

    /// Cross-entropy of the teacher-forced prediction in training mode
    /// (dropout active), PAD targets ignored.
    pub fn training_loss(&self, features: &Tensor, lengths: &[usize], target: &Tensor) -> SwipeResult<Tensor> {
        let logits = self.forward_t(features, lengths, target, true)?;
        let (_, target_len) = target.dims2()?;
        let expected = target.narrow(1, 1, target_len - 1)?.contiguous()?;
        sequence_loss(&logits, &expected)
    }

    /// Total number of scalar parameters.
    pub fn parameter_count(&self) -> usize {
        self.varmap.all_vars().iter().map(|v| v.elem_count()).sum()
    }

    /// Size of the parameters stored as f32, in MiB.
    pub fn estimated_size_mb(&self) -> f64 {
        (self.parameter_count() * 4) as f64 / (1024.0 * 1024.0)
    }
}
