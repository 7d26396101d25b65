//! Feature encoding: raw gesture trace → fixed-size feature tensor
//!
//! # Components
//! - `trace.rs`: raw input samples (`GesturePoint`) and delta-time samples (`TraceSample`)
//! - `encoder.rs`: validation, subsampling, proximity features, padding
//! - `augment.rs`: training-only position/time jitter

pub mod augment;
pub mod encoder;
pub mod trace;

pub use augment::Augmenter;
pub use encoder::{stack_traces, EncodedTrace, FeatureEncoder, FeatureVector};
pub use trace::{GesturePoint, TraceSample};

/// Fixed number of timesteps fed to the encoder.
pub const MAX_STROKE_LEN: usize = 80;

/// Per-timestep channels: x, y, dt, then one proximity score per letter.
pub const FEATURE_DIM: usize = 3 + crate::keyboard::NUM_KEYS;

/// Upper bound for an inter-sample delta, in seconds.
pub const MAX_DT_SECONDS: f32 = 1.0;
