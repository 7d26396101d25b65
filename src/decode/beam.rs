//! Beam search over the decoder
//!
//! Each step runs the decoder once for all active beams, expands every
//! beam by its top-K non-PAD next tokens, and keeps the global top-K by
//! cumulative log-probability. Beams ending in EOS move to the finished
//! set. The final list is re-ranked by length-normalized score.
//!
//! Pruning uses the raw cumulative score while the final ranking uses the
//! normalized one; longer beams can therefore crowd out shorter ones
//! during search. This matches the trained model's reference decoder.

use super::next_token_log_probs;
use crate::error::{SwipeError, SwipeResult};
use crate::model::{EncoderMemory, SwipeTransformer};
use crate::vocab::{tokens_to_word, EOS_TOKEN, PAD_TOKEN, SOS_TOKEN, TARGET_LEN, VOCAB_SIZE};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, trace};

/// Upper bound on decode steps.
pub const MAX_DECODE_STEPS: usize = TARGET_LEN;

/// Token buffer capacity of a beam: SOS plus one token per step.
const BEAM_CAPACITY: usize = MAX_DECODE_STEPS + 1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeamSearchConfig {
    pub beam_width: usize,
    pub max_steps: usize,
}

impl Default for BeamSearchConfig {
    fn default() -> Self {
        BeamSearchConfig {
            beam_width: 5,
            max_steps: MAX_DECODE_STEPS,
        }
    }
}

impl BeamSearchConfig {
    pub fn validate(&self) -> SwipeResult<()> {
        if self.beam_width == 0 || self.beam_width >= VOCAB_SIZE {
            return Err(SwipeError::Config(format!(
                "beam width must be in 1..{}, got {}",
                VOCAB_SIZE,
                self.beam_width
            )));
        }
        if self.max_steps == 0 || self.max_steps > MAX_DECODE_STEPS {
            return Err(SwipeError::Config(format!(
                "max steps must be in 1..={}, got {}",
                MAX_DECODE_STEPS, self.max_steps
            )));
        }
        Ok(())
    }
}

/// Fixed-capacity (token buffer, cumulative log-probability) pair.
#[derive(Clone, Copy, Debug)]
struct Beam {
    tokens: [u32; BEAM_CAPACITY],
    len: usize,
    score: f32,
}

impl Beam {
    fn start() -> Self {
        let mut tokens = [PAD_TOKEN; BEAM_CAPACITY];
        tokens[0] = SOS_TOKEN;
        Beam {
            tokens,
            len: 1,
            score: 0.0,
        }
    }

    fn tokens(&self) -> &[u32] {
        &self.tokens[..self.len]
    }

    fn last(&self) -> u32 {
        self.tokens[self.len - 1]
    }

    fn extended(&self, token: u32, log_prob: f32) -> Beam {
        let mut next = *self;
        next.tokens[next.len] = token;
        next.len += 1;
        next.score += log_prob;
        next
    }

    fn normalized_score(&self) -> f32 {
        self.score / self.len.max(1) as f32
    }
}

/// A finished hypothesis: SOS-prefixed tokens and its length-normalized score.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub tokens: Vec<u32>,
    pub score: f32,
}

impl Candidate {
    pub fn word(&self) -> String {
        tokens_to_word(&self.tokens)
    }
}

/// Descending by score; equal scores keep the lower token first.
fn by_score_desc(a: (u32, f32), b: (u32, f32)) -> Ordering {
    b.1.partial_cmp(&a.1)
        .unwrap_or(Ordering::Equal)
        .then(a.0.cmp(&b.0))
}

/// The `k` best non-PAD tokens of one log-probability row.
pub(crate) fn top_k_tokens(log_probs: &[f32], k: usize, out: &mut Vec<(u32, f32)>) {
    out.clear();
    out.extend(
        log_probs
            .iter()
            .enumerate()
            .filter(|&(token, _)| token as u32 != PAD_TOKEN)
            .map(|(token, &lp)| (token as u32, lp)),
    );
    out.sort_unstable_by(|&a, &b| by_score_desc(a, b));
    out.truncate(k);
}

/// Beam search bound to a model; holds no per-call state.
pub struct BeamSearch<'m> {
    model: &'m SwipeTransformer,
    config: BeamSearchConfig,
}

impl<'m> BeamSearch<'m> {
    /// Fails when the config is out of range or when a full-length beam
    /// (SOS plus `max_steps` tokens) would overrun the model's decoder positions.
    pub fn new(model: &'m SwipeTransformer, config: BeamSearchConfig) -> SwipeResult<Self> {
        config.validate()?;
        let positions = model.config().decoder_positions();
        if config.max_steps + 1 > positions {
            return Err(SwipeError::Config(format!(
                "max steps {} needs {} decoder positions, model has {}",
                config.max_steps,
                config.max_steps + 1,
                positions
            )));
        }
        Ok(BeamSearch { model, config })
    }

    pub fn config(&self) -> &BeamSearchConfig {
        &self.config
    }

    /// Run to completion on single-item encoder memory.
    pub fn search(&self, memory: &EncoderMemory) -> SwipeResult<Vec<Candidate>> {
        self.search_until(memory, || false)
    }

    /// Like `search`, but polls `should_stop` before every step and ranks
    /// whatever beams exist once it returns true.
    pub fn search_until<F>(&self, memory: &EncoderMemory, should_stop: F) -> SwipeResult<Vec<Candidate>>
    where
        F: Fn() -> bool,
    {
        if memory.batch_size() != 1 {
            return Err(SwipeError::Config(format!(
                "beam search runs on one item at a time, got a batch of {}",
                memory.batch_size()
            )));
        }
        if memory.lengths[0] == 0 {
            debug!("empty stroke, no candidates");
            return Ok(Vec::new());
        }

        let k = self.config.beam_width;
        let mut active: Vec<Beam> = Vec::with_capacity(k);
        let mut pool: Vec<Beam> = Vec::with_capacity(k * k);
        let mut finished: Vec<Beam> = Vec::with_capacity(k * self.config.max_steps);
        let mut expansions: Vec<(u32, f32)> = Vec::with_capacity(VOCAB_SIZE);
        let mut token_buf: Vec<u32> = Vec::with_capacity(k * BEAM_CAPACITY);
        active.push(Beam::start());

        for step in 0..self.config.max_steps {
            if active.is_empty() || should_stop() {
                break;
            }

            token_buf.clear();
            for beam in &active {
                token_buf.extend_from_slice(beam.tokens());
            }
            let rows = next_token_log_probs(self.model, memory, &token_buf, active.len())?;

            pool.clear();
            for (beam, row) in active.iter().zip(rows.iter()) {
                top_k_tokens(row, k, &mut expansions);
                pool.extend(expansions.iter().map(|&(token, lp)| beam.extended(token, lp)));
            }

            pool.sort_unstable_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| a.tokens().cmp(b.tokens()))
            });
            pool.truncate(k);

            active.clear();
            for beam in pool.drain(..) {
                if beam.last() == EOS_TOKEN {
                    finished.push(beam);
                } else {
                    active.push(beam);
                }
            }
            trace!(step, active = active.len(), finished = finished.len(), "beam step");
        }

        finished.append(&mut active);
        finished.sort_by(|a, b| {
            b.normalized_score()
                .partial_cmp(&a.normalized_score())
                .unwrap_or(Ordering::Equal)
        });
        finished.truncate(k);

        Ok(finished
            .iter()
            .map(|beam| Candidate {
                tokens: beam.tokens().to_vec(),
                score: beam.normalized_score(),
            })
            .collect())
    }
}
