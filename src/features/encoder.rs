//! Gesture trace → fixed (MAX_STROKE_LEN × FEATURE_DIM) features
//!
//! Handles:
//! - Validation (≥2 samples, both coordinates present)
//! - Millisecond timestamps → clipped second deltas
//! - Even subsampling of long traces (endpoints kept)
//! - [x, y, dt] ++ proximity(x, y) per point, zero padding to 80 rows

use super::trace::{GesturePoint, TraceSample};
use super::{FEATURE_DIM, MAX_DT_SECONDS, MAX_STROKE_LEN};
use crate::error::{SwipeError, SwipeResult};
use crate::keyboard::KeyLayout;
use candle_core::{Device, Tensor};

/// One encoder timestep: [x, y, dt, proximity A..Z].
pub type FeatureVector = [f32; FEATURE_DIM];

/// Fixed-length encoder input plus the number of real (unpadded) rows.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedTrace {
    features: Vec<FeatureVector>,
    valid_length: usize,
}

impl EncodedTrace {
    /// All-padding trace; decodes to an empty candidate list.
    pub fn empty() -> Self {
        EncodedTrace {
            features: vec![[0.0; FEATURE_DIM]; MAX_STROKE_LEN],
            valid_length: 0,
        }
    }

    pub fn features(&self) -> &[FeatureVector] {
        &self.features
    }

    pub(crate) fn features_mut(&mut self) -> &mut [FeatureVector] {
        &mut self.features
    }

    /// Number of rows before padding starts.
    pub fn valid_length(&self) -> usize {
        self.valid_length
    }

    fn flat(&self) -> impl Iterator<Item = f32> + '_ {
        self.features.iter().flat_map(|row| row.iter().copied())
    }

    /// Tensor of shape (1, MAX_STROKE_LEN, FEATURE_DIM).
    pub fn to_tensor(&self, device: &Device) -> SwipeResult<Tensor> {
        let data: Vec<f32> = self.flat().collect();
        Ok(Tensor::from_vec(data, (1, MAX_STROKE_LEN, FEATURE_DIM), device)?)
    }
}

/// Stack encoded traces into a (B, MAX_STROKE_LEN, FEATURE_DIM) batch,
/// returning the per-row valid lengths alongside.
pub fn stack_traces(traces: &[EncodedTrace], device: &Device) -> SwipeResult<(Tensor, Vec<usize>)> {
    if traces.is_empty() {
        return Err(SwipeError::InvalidTrace("batch contains no traces".into()));
    }
    let data: Vec<f32> = traces.iter().flat_map(|t| t.flat()).collect();
    let lengths = traces.iter().map(|t| t.valid_length).collect();
    let batch = Tensor::from_vec(data, (traces.len(), MAX_STROKE_LEN, FEATURE_DIM), device)?;
    Ok((batch, lengths))
}

/// Turns gesture traces into encoder features against a shared key layout.
#[derive(Clone, Copy, Debug)]
pub struct FeatureEncoder<'a> {
    layout: &'a KeyLayout,
}

impl<'a> FeatureEncoder<'a> {
    pub fn new(layout: &'a KeyLayout) -> Self {
        FeatureEncoder { layout }
    }

    pub fn layout(&self) -> &KeyLayout {
        self.layout
    }

    /// Validate raw points and convert timestamps to clipped deltas.
    /// The first delta is always 0.
    pub fn to_samples(trace: &[GesturePoint]) -> SwipeResult<Vec<TraceSample>> {
        if trace.len() < 2 {
            return Err(SwipeError::InvalidTrace(format!(
                "need at least 2 samples, got {}",
                trace.len()
            )));
        }

        let mut samples = Vec::with_capacity(trace.len());
        let mut prev_seconds: Option<f64> = None;
        for (i, point) in trace.iter().enumerate() {
            let (x, y) = match (point.x, point.y) {
                (Some(x), Some(y)) => (x, y),
                _ => {
                    return Err(SwipeError::InvalidTrace(format!(
                        "sample {} is missing a coordinate",
                        i
                    )))
                }
            };
            let seconds = point.t.unwrap_or(0) as f64 / 1000.0;
            let dt = prev_seconds.map_or(0.0, |prev| seconds - prev);
            prev_seconds = Some(seconds);
            samples.push(TraceSample {
                x,
                y,
                dt: (dt as f32).clamp(0.0, MAX_DT_SECONDS),
            });
        }
        Ok(samples)
    }

    /// Full inference path: validate, compute deltas, encode.
    pub fn encode(&self, trace: &[GesturePoint]) -> SwipeResult<EncodedTrace> {
        let samples = Self::to_samples(trace)?;
        self.encode_samples(&samples)
    }

    /// Encode samples whose deltas are already computed.
    pub fn encode_samples(&self, samples: &[TraceSample]) -> SwipeResult<EncodedTrace> {
        if samples.len() < 2 {
            return Err(SwipeError::InvalidTrace(format!(
                "need at least 2 samples, got {}",
                samples.len()
            )));
        }

        let mut features = Vec::with_capacity(MAX_STROKE_LEN);
        for idx in subsample_indices(samples.len(), MAX_STROKE_LEN) {
            let s = samples[idx];
            let mut row = [0.0f32; FEATURE_DIM];
            row[0] = s.x;
            row[1] = s.y;
            row[2] = s.dt;
            row[3..].copy_from_slice(&self.layout.proximity(s.x, s.y));
            features.push(row);
        }

        let valid_length = features.len();
        features.resize(MAX_STROKE_LEN, [0.0; FEATURE_DIM]);

        Ok(EncodedTrace {
            features,
            valid_length,
        })
    }
}

/// Indices kept when shrinking `len` points to at most `target`:
/// evenly spaced over [0, len-1], truncated toward zero, endpoints included.
fn subsample_indices(len: usize, target: usize) -> Vec<usize> {
    if len <= target {
        return (0..len).collect();
    }
    if target == 1 {
        return vec![0];
    }
    (0..target).map(|i| i * (len - 1) / (target - 1)).collect()
}
