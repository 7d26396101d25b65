//! Error types for the swipe decoder.

use thiserror::Error;

/// Errors raised by the geometry, feature, model and decoding layers.
#[derive(Debug, Error)]
pub enum SwipeError {
    /// Gesture trace failed input validation.
    #[error("Invalid gesture trace: {0}")]
    InvalidTrace(String),

    /// Keyboard layout specification is incomplete or malformed.
    #[error("Invalid keyboard layout: {0}")]
    InvalidLayout(String),

    /// Hyperparameters or decode settings are inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input feature dimension does not match the model.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Sequence is longer than the positional encoding table.
    #[error("Sequence length {len} exceeds positional encoding limit {max}")]
    SequenceTooLong { len: usize, max: usize },

    /// Parameter blob does not fit the constructed model.
    #[error("Weight loading failed: {0}")]
    Weights(String),

    #[error("Tensor operation failed: {0}")]
    Tensor(#[from] candle_core::Error),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] bincode::Error),
}

/// Result type for swipe decoder operations.
pub type SwipeResult<T> = Result<T, SwipeError>;
