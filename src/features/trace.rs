//! Gesture trace samples.

use serde::{Deserialize, Serialize};

/// One raw pointer sample as delivered by the keyboard: normalized x/y and
/// a millisecond timestamp. Coordinates are optional so that incomplete
/// samples survive deserialization and are rejected by the encoder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GesturePoint {
    #[serde(default)]
    pub x: Option<f32>,
    #[serde(default)]
    pub y: Option<f32>,
    /// Milliseconds, monotonically non-decreasing; absent reads as 0
    #[serde(default)]
    pub t: Option<i64>,
}

impl GesturePoint {
    pub fn new(x: f32, y: f32, t: i64) -> Self {
        GesturePoint {
            x: Some(x),
            y: Some(y),
            t: Some(t),
        }
    }
}

/// A validated sample with its time delta (seconds, already clipped).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraceSample {
    pub x: f32,
    pub y: f32,
    pub dt: f32,
}
