//! End-to-end decoding: gesture trace → features → encoder → beam search → words

use super::beam::{BeamSearch, BeamSearchConfig, Candidate};
use crate::error::SwipeResult;
use crate::features::{stack_traces, EncodedTrace, FeatureEncoder, GesturePoint};
use crate::keyboard::KeyLayout;
use crate::model::SwipeTransformer;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// One ranked output word with its length-normalized log-probability.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub word: String,
    pub score: f32,
}

impl From<&Candidate> for Prediction {
    fn from(candidate: &Candidate) -> Self {
        Prediction {
            word: candidate.word(),
            score: candidate.score,
        }
    }
}

/// Decoder over a shared layout and read-only model. Cheap to construct;
/// holds no state between calls.
pub struct SwipeDecoder<'a> {
    encoder: FeatureEncoder<'a>,
    model: &'a SwipeTransformer,
    config: BeamSearchConfig,
}

impl<'a> SwipeDecoder<'a> {
    pub fn new(
        layout: &'a KeyLayout,
        model: &'a SwipeTransformer,
        config: BeamSearchConfig,
    ) -> SwipeResult<Self> {
        BeamSearch::new(model, config.clone())?;
        Ok(SwipeDecoder {
            encoder: FeatureEncoder::new(layout),
            model,
            config,
        })
    }

    pub fn config(&self) -> &BeamSearchConfig {
        &self.config
    }

    /// Ranked candidates for one raw trace, best first.
    pub fn decode_trace(&self, trace: &[GesturePoint]) -> SwipeResult<Vec<Prediction>> {
        let encoded = self.encoder.encode(trace)?;
        self.decode_encoded(&encoded)
    }

    pub fn decode_encoded(&self, encoded: &EncodedTrace) -> SwipeResult<Vec<Prediction>> {
        self.run(encoded, || false)
    }

    /// Like `decode_encoded`, but stops expanding beams once `stop` is set.
    pub fn decode_encoded_until(
        &self,
        encoded: &EncodedTrace,
        stop: &AtomicBool,
    ) -> SwipeResult<Vec<Prediction>> {
        self.run(encoded, || stop.load(Ordering::Relaxed))
    }

    fn run<F: Fn() -> bool>(&self, encoded: &EncodedTrace, stop: F) -> SwipeResult<Vec<Prediction>> {
        if encoded.valid_length() == 0 {
            return Ok(Vec::new());
        }
        let features = encoded.to_tensor(self.model.device())?;
        let memory = self.model.encode(&features, &[encoded.valid_length()])?;
        let search = BeamSearch::new(self.model, self.config.clone())?;
        let candidates = search.search_until(&memory, stop)?;
        debug!(
            valid_length = encoded.valid_length(),
            candidates = candidates.len(),
            "decoded trace"
        );
        Ok(candidates.iter().map(Prediction::from).collect())
    }

    /// Decode several raw traces. Fails if any trace is invalid.
    pub fn decode_batch(&self, traces: &[Vec<GesturePoint>]) -> SwipeResult<Vec<Vec<Prediction>>> {
        let encoded = traces
            .iter()
            .map(|trace| self.encoder.encode(trace))
            .collect::<SwipeResult<Vec<_>>>()?;
        self.decode_encoded_batch(&encoded)
    }

    /// One batched encoder pass, then an independent beam search per item.
    pub fn decode_encoded_batch(&self, encoded: &[EncodedTrace]) -> SwipeResult<Vec<Vec<Prediction>>> {
        if encoded.is_empty() {
            return Ok(Vec::new());
        }
        let (features, lengths) = stack_traces(encoded, self.model.device())?;
        let memory = self.model.encode(&features, &lengths)?;
        let search = BeamSearch::new(self.model, self.config.clone())?;

        let results = (0..memory.batch_size())
            .into_par_iter()
            .map(|index| -> SwipeResult<Vec<Prediction>> {
                let item = memory.item(index)?;
                let candidates = search.search(&item)?;
                Ok(candidates.iter().map(Prediction::from).collect())
            })
            .collect::<SwipeResult<Vec<_>>>()?;
        debug!(batch = encoded.len(), "decoded batch");
        Ok(results)
    }
}
