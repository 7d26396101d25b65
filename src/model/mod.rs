//! Encoder-decoder transformer for swipe-to-text
//!
//! Every attention and normalization step is spelled out as linear
//! projections, matmuls, masked softmax and elementwise normalization so the
//! graph lowers to runtimes without fused attention kernels.
//!
//! # Components
//! - `config.rs`: hyperparameters
//! - `ops.rs`: masked softmax, log-softmax, Xavier-initialized projections
//! - `layer_norm.rs`: decomposed layer normalization
//! - `attention.rs`: multi-head attention from primitive ops
//! - `mask.rs`: key-padding and causal masks
//! - `positional.rs`: sinusoidal positional encoding
//! - `layers.rs`: token embedding, feed-forward, transformer block
//! - `transformer.rs`: `SwipeTransformer` (encode / decode / teacher-forced forward)
//! - `loss.rs`: PAD-ignoring cross-entropy
//! - `weights.rs`: bincode parameter bundles

pub mod attention;
pub mod config;
pub mod layer_norm;
pub mod layers;
pub mod loss;
pub mod mask;
pub mod ops;
pub mod positional;
pub mod transformer;
pub mod weights;

pub use config::ModelConfig;
pub use transformer::{EncoderMemory, SwipeTransformer};
pub use weights::{ModelBundle, TensorData};
