//! Training-time augmentation of encoded traces.
//!
//! Jitters positions with Gaussian noise and stretches time by one shared
//! factor per trace. Padding rows are never touched. Proximity channels are
//! left as encoded.

use super::encoder::EncodedTrace;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Seedable jitter source.
pub struct Augmenter {
    rng: StdRng,
    position_sigma: f32,
    time_scale: (f32, f32),
}

impl Augmenter {
    /// σ = 0.01 on x/y, dt scaled by a factor drawn from [0.9, 1.1).
    pub fn new(seed: u64) -> Self {
        Augmenter {
            rng: StdRng::seed_from_u64(seed),
            position_sigma: 0.01,
            time_scale: (0.9, 1.1),
        }
    }

    /// Augment the non-padded rows of `trace` in place.
    pub fn apply(&mut self, trace: &mut EncodedTrace) {
        let valid = trace.valid_length();
        let scale = self.rng.gen_range(self.time_scale.0..self.time_scale.1);
        for row in trace.features_mut()[..valid].iter_mut() {
            row[0] += self.jitter();
            row[1] += self.jitter();
            row[2] *= scale;
        }
    }

    fn jitter(&mut self) -> f32 {
        let z: f32 = self.rng.sample(StandardNormal);
        z * self.position_sigma
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureEncoder, GesturePoint};
    use crate::keyboard::KeyLayout;

    fn encoded() -> EncodedTrace {
        let layout = KeyLayout::qwerty();
        let trace: Vec<GesturePoint> = (0..12)
            .map(|i| GesturePoint::new(0.3 + 0.02 * i as f32, 0.4, i * 20))
            .collect();
        FeatureEncoder::new(&layout).encode(&trace).unwrap()
    }

    #[test]
    fn test_padding_untouched_and_jitter_small() {
        let original = encoded();
        let mut augmented = original.clone();
        Augmenter::new(42).apply(&mut augmented);

        let valid = original.valid_length();
        assert!(augmented.features()[valid..]
            .iter()
            .all(|row| row.iter().all(|&v| v == 0.0)));
        for (a, o) in augmented.features()[..valid]
            .iter()
            .zip(original.features()[..valid].iter())
        {
            assert!((a[0] - o[0]).abs() < 0.1);
            assert!((a[1] - o[1]).abs() < 0.1);
            assert_eq!(a[3..], o[3..]);
        }
    }

    #[test]
    fn test_time_scale_is_shared() {
        let original = encoded();
        let mut augmented = original.clone();
        Augmenter::new(3).apply(&mut augmented);

        let ratios: Vec<f32> = (1..original.valid_length())
            .map(|i| augmented.features()[i][2] / original.features()[i][2])
            .collect();
        let first = ratios[0];
        assert!((0.9..1.1).contains(&first));
        assert!(ratios.iter().all(|r| (r - first).abs() < 1e-5));
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let mut a = encoded();
        let mut b = encoded();
        Augmenter::new(11).apply(&mut a);
        Augmenter::new(11).apply(&mut b);
        assert_eq!(a, b);
    }
}
