//! Swipe keyboard decoder
//!
//! Converts a pointer gesture swiped across an on-screen QWERTY keyboard
//! into a ranked list of candidate words.
//!
//! # Components
//! - `keyboard`: key layout geometry, nearest-key lookup, proximity scores
//! - `features`: gesture trace → fixed (80 × 29) feature tensor
//! - `model`: encoder-decoder transformer built from decomposed primitives
//! - `decode`: beam search, greedy reference, end-to-end decoder, evaluation
//! - `vocab`: PAD / A-Z / SOS / EOS tokens and target sequences

pub mod decode;
pub mod error;
pub mod features;
pub mod keyboard;
pub mod model;
pub mod vocab;

pub use decode::{BeamSearch, BeamSearchConfig, Prediction, SwipeDecoder};
pub use error::{SwipeError, SwipeResult};
pub use features::{EncodedTrace, FeatureEncoder, GesturePoint};
pub use keyboard::{KeyLayout, LayoutSpec};
pub use model::{ModelConfig, SwipeTransformer};
