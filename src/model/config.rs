//! Model hyperparameters

use crate::error::{SwipeError, SwipeResult};
use crate::features::{FEATURE_DIM, MAX_STROKE_LEN};
use crate::vocab::TARGET_LEN;
use serde::{Deserialize, Serialize};

/// Extra encoder positions beyond the stroke length.
const ENCODER_POSITION_SLACK: usize = 10;
/// Extra decoder positions beyond the target length (MAX_WORD_LEN + 10 total).
const DECODER_POSITION_SLACK: usize = 8;

/// Dropout applied in training mode unless configured otherwise.
pub const DEFAULT_DROPOUT: f32 = 0.1;

/// Transformer hyperparameters, shipped alongside every weight bundle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub d_model: usize,
    pub num_heads: usize,
    /// Blocks in each of the encoder and decoder stacks
    pub num_layers: usize,
    pub input_dim: usize,
    #[serde(default = "default_max_stroke_len")]
    pub max_stroke_len: usize,
    #[serde(default = "default_max_target_len")]
    pub max_target_len: usize,
    /// Drop probability on attention weights, sublayer outputs and the
    /// feed-forward hidden layer; only active in training mode
    #[serde(default = "default_dropout")]
    pub dropout: f32,
}

fn default_max_stroke_len() -> usize {
    MAX_STROKE_LEN
}

fn default_max_target_len() -> usize {
    TARGET_LEN
}

fn default_dropout() -> f32 {
    DEFAULT_DROPOUT
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            d_model: 128,
            num_heads: 4,
            num_layers: 3,
            input_dim: FEATURE_DIM,
            max_stroke_len: MAX_STROKE_LEN,
            max_target_len: TARGET_LEN,
            dropout: DEFAULT_DROPOUT,
        }
    }
}

impl ModelConfig {
    pub fn validate(&self) -> SwipeResult<()> {
        if self.d_model == 0 || self.num_heads == 0 || self.num_layers == 0 || self.input_dim == 0
        {
            return Err(SwipeError::Config(format!(
                "all dimensions must be non-zero: {:?}",
                self
            )));
        }
        if self.d_model % self.num_heads != 0 {
            return Err(SwipeError::Config(format!(
                "d_model {} is not divisible by num_heads {}",
                self.d_model, self.num_heads
            )));
        }
        if self.d_model % 2 != 0 {
            return Err(SwipeError::Config(format!(
                "d_model {} must be even for sine/cosine positional channels",
                self.d_model
            )));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(SwipeError::Config(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        Ok(())
    }

    /// True when `other` describes the same parameter shapes and position
    /// limits. Dropout is a training setting and is not compared.
    pub fn same_architecture(&self, other: &ModelConfig) -> bool {
        self.d_model == other.d_model
            && self.num_heads == other.num_heads
            && self.num_layers == other.num_layers
            && self.input_dim == other.input_dim
            && self.max_stroke_len == other.max_stroke_len
            && self.max_target_len == other.max_target_len
    }

    pub fn head_dim(&self) -> usize {
        self.d_model / self.num_heads
    }

    /// Hidden width of each feed-forward sublayer.
    pub fn feedforward_dim(&self) -> usize {
        self.d_model * 4
    }

    /// Rows of the encoder positional table.
    pub fn encoder_positions(&self) -> usize {
        self.max_stroke_len + ENCODER_POSITION_SLACK
    }

    /// Rows of the decoder positional table.
    pub fn decoder_positions(&self) -> usize {
        self.max_target_len + DECODER_POSITION_SLACK
    }
}
