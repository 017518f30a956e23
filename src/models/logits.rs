//! Logits processing for decoder output.
//!
//! Handles classifier-free guidance and top-k sampling for token generation.

use std::fmt::{Debug, Formatter};

use half::f16;
use ndarray::{s, Array, Array2, Axis, Ix3, IxDyn};
use ort::tensor::ArrayExtensions;
use ort::value::DynValue;
use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::Rng;

use crate::error::{AudioGenError, Result};

/// Default guidance scale.
pub const DEFAULT_GUIDANCE_SCALE: f32 = 3.0;

/// Default top-k value for sampling.
pub const DEFAULT_TOP_K: usize = 250;

/// Decoder logits for one step, shaped `[batch, vocab]`.
pub struct Logits(Array2<f32>);

impl Debug for Logits {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Logits({:?})", self.0.dim())
    }
}

impl Logits {
    /// Wraps a `[batch, vocab]` array.
    pub fn new(values: Array2<f32>) -> Self {
        Self(values)
    }

    /// Shape as `(batch, vocab)`.
    pub fn dim(&self) -> (usize, usize) {
        self.0.dim()
    }

    /// Creates Logits from a 3D DynValue, supporting both f32 and f16.
    ///
    /// The input shape is `[batch, decoder_sequence_length, vocab]` where
    /// the sequence length is always 1 during incremental decoding.
    pub fn from_3d_dyn_value(value: &DynValue) -> Result<Self> {
        let (shape, data): (Vec<usize>, Vec<f32>) =
            if let Ok((shape, data)) = value.try_extract_tensor::<f32>() {
                (shape.iter().map(|&x| x as usize).collect(), data.to_vec())
            } else if let Ok((shape, data)) = value.try_extract_tensor::<f16>() {
                (
                    shape.iter().map(|&x| x as usize).collect(),
                    data.iter().map(|e| f32::from(*e)).collect(),
                )
            } else {
                return Err(AudioGenError::generation_failed("Logits must be f32 or f16"));
            };

        let arr = Array::from_shape_vec(IxDyn(&shape), data)
            .map_err(|e| AudioGenError::generation_failed(format!("Failed to create array: {}", e)))?
            .into_dimensionality::<Ix3>()
            .map_err(|e| AudioGenError::generation_failed(format!("Expected 3D logits: {}", e)))?;

        if arr.dim().1 != 1 {
            return Err(AudioGenError::generation_failed(format!(
                "Expected one decoder position in logits, got {}",
                arr.dim().1
            )));
        }

        Ok(Self(arr.remove_axis(Axis(1))))
    }

    /// Applies classifier-free guidance.
    ///
    /// The first half of the batch holds conditional logits, the second half
    /// unconditional ones: `guided = uncond + (cond - uncond) * scale`.
    pub fn apply_free_guidance(self, guidance_scale: f32) -> Result<Self> {
        let batch = self.0.dim().0;
        if batch % 2 != 0 {
            return Err(AudioGenError::generation_failed(format!(
                "Guidance needs an even batch, got {}",
                batch
            )));
        }

        let half = batch / 2;
        let cond = self.0.slice(s![0..half, ..]);
        let uncond = self.0.slice(s![half.., ..]);
        Ok(Self(&uncond + &((&cond - &uncond) * guidance_scale)))
    }

    /// Samples one token per batch row from the `k` most probable tokens.
    pub fn sample_top_k<R: Rng + ?Sized>(&self, k: usize, rng: &mut R) -> Result<Vec<i64>> {
        let probabilities = self.0.softmax(Axis(1));

        probabilities
            .axis_iter(Axis(0))
            .map(|row| {
                let k = k.clamp(1, row.len().max(1));
                let mut candidates: Vec<(i64, f32)> = row
                    .iter()
                    .enumerate()
                    .map(|(i, &p)| (i as i64, if p.is_finite() { p } else { 0.0 }))
                    .collect();

                candidates.sort_unstable_by(|a, b| b.1.total_cmp(&a.1));
                candidates.truncate(k);

                let distribution = WeightedIndex::new(candidates.iter().map(|c| c.1))
                    .map_err(|e| {
                        AudioGenError::generation_failed(format!(
                            "Cannot sample from logits: {}",
                            e
                        ))
                    })?;

                Ok(candidates[distribution.sample(rng)].0)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn free_guidance_mixes_halves() {
        let arr = Array::from_shape_vec((2, 3), vec![10., -1., 3., -1., 1., 11.]).unwrap();
        let logits = Logits::new(arr).apply_free_guidance(3.0).unwrap();
        assert_eq!(logits.dim(), (1, 3));
        assert_eq!(logits.0.row(0).to_vec(), vec![32., -5., -13.]);
    }

    #[test]
    fn free_guidance_rejects_odd_batch() {
        let arr = Array::from_shape_vec((3, 1), vec![0., 0., 0.]).unwrap();
        assert!(Logits::new(arr).apply_free_guidance(3.0).is_err());
    }

    #[test]
    fn sample_top_k_returns_valid_indices() {
        let arr = Array::from_shape_vec((2, 3), vec![0.1, 0.2, 0.7, 0.3, 0.4, 0.3]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let samples = Logits::new(arr).sample_top_k(2, &mut rng).unwrap();
        assert_eq!(samples.len(), 2);
        assert!(samples.iter().all(|&idx| (0..3).contains(&idx)));
    }

    #[test]
    fn top_1_is_greedy() {
        let arr = Array::from_shape_vec((1, 4), vec![0.0, 5.0, 1.0, -2.0]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let logits = Logits::new(arr);
        for _ in 0..10 {
            assert_eq!(logits.sample_top_k(1, &mut rng).unwrap(), vec![1]);
        }
    }

    #[test]
    fn seeded_sampling_is_reproducible() {
        let arr = Array::from_shape_vec((1, 5), vec![1.0, 1.1, 0.9, 1.0, 1.2]).unwrap();
        let logits = Logits::new(arr);
        let draw = |seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            (0..20)
                .map(|_| logits.sample_top_k(5, &mut rng).unwrap()[0])
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(42), draw(42));
    }
}
